//! Engine data structures: models, textures, shapes and transforms.
//!
//! - `model` contains mesh and material definitions and the vertex stream layouts
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `instance` holds the per-draw transformation
//! - `shapes` builds the builtin cube, sphere and billboard templates

pub mod instance;
pub mod model;
pub mod shapes;
pub mod texture;
