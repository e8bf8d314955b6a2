//! flow-batch
//!
//! A small texture-batched render layer with an OBJ/MTL model loader. Draw
//! calls are queued per texture between `begin` and `end` and flushed with one
//! texture bind per group. The graphics driver sits behind a set of service
//! traits so the batching and loading logic runs against any backend; a wgpu
//! implementation is provided.
//!
//! High-level modules
//! - `context`: wgpu device/queue and the service trait implementations
//! - `data_structures`: meshes, materials, transforms, textures, builtin shapes
//! - `pipelines`: the model render pipeline and its shader
//! - `render`: the draw pool and the frame renderer
//! - `resources`: tokenizer, material library, mesh builder, OBJ and sound loaders
//! - `services`: traits the renderer and loaders drive
//!

pub mod context;
pub mod data_structures;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod services;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
