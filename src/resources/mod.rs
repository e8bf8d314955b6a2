//! Loading meshes, materials and sounds from external files.

use std::path::{Path, PathBuf};

use crate::{
    data_structures::model::Model,
    resources::{
        material::MaterialLibrary,
        mesh::build_meshes,
        obj::{LoadOptions, parse_obj},
    },
    services::GeometryService,
};

pub mod material;
pub mod mesh;
pub mod obj;
pub mod sound;
pub mod tokenizer;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("[{path}:{line}] malformed `{directive}` directive: {reason}")]
    Malformed {
        path: String,
        line: usize,
        directive: String,
        reason: String,
    },
    #[error("index count {0} does not describe whole triangles")]
    IndexCount(usize),
}

/// Result of loading an asset whose format is picked by file extension.
///
/// `Unsupported` is distinct from a successful load of an empty asset: the
/// file was not looked at because no loader exists for its extension.
#[derive(Debug)]
pub enum LoadOutcome<T> {
    Loaded(T),
    Unsupported {
        path: PathBuf,
        extension: Option<String>,
    },
}

impl<T> LoadOutcome<T> {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, LoadOutcome::Unsupported { .. })
    }

    pub fn loaded(self) -> Option<T> {
        match self {
            LoadOutcome::Loaded(value) => Some(value),
            LoadOutcome::Unsupported { .. } => None,
        }
    }

    pub(crate) fn unsupported(path: &Path) -> Self {
        let extension = extension(path);
        log::warn!("[{}] Extension not supported!", path.display());
        LoadOutcome::Unsupported {
            path: path.to_path_buf(),
            extension,
        }
    }
}

/// Lower-cased extension of `path`, if any.
pub fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Resolve `relative` against the directory that contains `file`.
pub fn sibling_path(file: &Path, relative: &str) -> PathBuf {
    match file.parent() {
        Some(dir) => dir.join(relative),
        None => PathBuf::from(relative),
    }
}

pub fn load_string(path: &Path) -> anyhow::Result<String> {
    Ok(std::fs::read_to_string(path)?)
}

pub fn load_binary(path: &Path) -> anyhow::Result<Vec<u8>> {
    Ok(std::fs::read(path)?)
}

/// Load a model from disk and upload its meshes.
///
/// Only `.obj` files are understood; `.3ds`, `.fbx` and anything else come
/// back as [`LoadOutcome::Unsupported`]. A file that cannot be read is logged
/// and yields an empty model. Malformed geometry is an error.
pub fn load_model(
    path: impl AsRef<Path>,
    gfx: &mut impl GeometryService,
    options: &LoadOptions,
) -> Result<LoadOutcome<Model>, ModelError> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("obj") => load_model_obj(path, gfx, options).map(LoadOutcome::Loaded),
        _ => Ok(LoadOutcome::unsupported(path)),
    }
}

pub fn load_model_obj(
    path: &Path,
    gfx: &mut impl GeometryService,
    options: &LoadOptions,
) -> Result<Model, ModelError> {
    let label = path.display().to_string();
    let source = match load_string(path) {
        Ok(source) => source,
        Err(e) => {
            log::warn!("[{}] Could not read model file: {}", label, e);
            return Ok(Model::default());
        }
    };

    let parts = parse_obj(&source, &label, options, |mtl| {
        MaterialLibrary::load(sibling_path(path, mtl))
    })?;
    let meshes = build_meshes(gfx, &label, &parts)?;
    Ok(Model::new(meshes))
}
