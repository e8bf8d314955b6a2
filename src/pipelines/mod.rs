//! Render pipelines and their WGSL sources.
//!
//! - `basic` holds the model pipeline used by the frame renderer and the shared
//!   pipeline builder

pub mod basic;

/// WGSL source of the default model shader.
pub const MODEL_SHADER: &str = include_str!("model.wgsl");
