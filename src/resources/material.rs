//! Material libraries (`.mtl` side files).
//!
//! Only the colour directives matter to the renderer: `newmtl`, `Ka`, `Kd`
//! and `Ks`. Everything else in the file is skipped.

use std::path::Path;

use cgmath::Vector4;

use crate::{
    data_structures::model::Material,
    resources::tokenizer::{Lines, fields},
};

/// Ordered `(name, material)` pairs. Lookup is a linear scan, first match wins.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialLibrary {
    entries: Vec<(String, Material)>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse the library at `path`.
    ///
    /// A missing or unreadable file is not fatal: it is logged and an empty
    /// library comes back, so every later lookup yields the zero material.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(source) => {
                let library = Self::parse(&source, &path.display().to_string());
                log::info!("[{}] Material library loaded!", path.display());
                library
            }
            Err(e) => {
                log::warn!("[{}] Could not read material library: {}", path.display(), e);
                Self::new()
            }
        }
    }

    /// Parse library text. `label` only shows up in diagnostics.
    ///
    /// Each `newmtl` yields exactly one entry, even when no colour directive
    /// follows it. Colour lines that cannot be read are logged and skipped.
    pub fn parse(source: &str, label: &str) -> Self {
        let mut library = Self::new();
        let mut current: Option<(String, Material)> = None;

        for (number, line) in Lines::new(source) {
            let tokens = fields(line);
            let Some(directive) = tokens.first() else {
                continue;
            };
            match *directive {
                "newmtl" => {
                    if let Some((name, material)) = current.take() {
                        library.entries.push((name, material));
                        log::debug!("[{}] .mtl material #{} loaded!", label, library.len());
                    }
                    let name = tokens[1..].join(" ");
                    current = Some((name, Material::zero()));
                }
                "Ka" | "Kd" | "Ks" => {
                    let Some((name, material)) = current.as_mut() else {
                        log::warn!(
                            "[{}:{}] `{}` before any `newmtl`, ignoring it",
                            label,
                            number,
                            directive
                        );
                        continue;
                    };
                    let Some(colour) = parse_colour(&tokens[1..]) else {
                        log::warn!(
                            "[{}:{}] Could not read `{}` colour of material {}",
                            label,
                            number,
                            directive,
                            name
                        );
                        continue;
                    };
                    match *directive {
                        "Ka" => material.ambient = colour,
                        "Kd" => material.diffuse = colour,
                        _ => material.specular = colour,
                    }
                }
                _ => (),
            }
        }

        if let Some(entry) = current {
            library.entries.push(entry);
        }
        library
    }

    /// Look up `name`. A miss is logged and yields the zero material.
    pub fn find(&self, name: &str) -> Material {
        match self.entries.iter().find(|(entry, _)| entry == name) {
            Some((_, material)) => *material,
            None => {
                log::warn!("[{}] Could not find material in library!", name);
                Material::zero()
            }
        }
    }

    pub fn push(&mut self, name: impl Into<String>, material: Material) {
        self.entries.push((name.into(), material));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Material)> {
        self.entries
            .iter()
            .map(|(name, material)| (name.as_str(), material))
    }
}

fn parse_colour(tokens: &[&str]) -> Option<Vector4<f32>> {
    let [r, g, b] = tokens.get(..3)? else {
        return None;
    };
    Some(Vector4::new(
        r.parse().ok()?,
        g.parse().ok()?,
        b.parse().ok()?,
        Material::ALPHA,
    ))
}
