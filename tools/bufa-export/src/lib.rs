//! bufa-export library
//!
//! Turns an authored scene (meshes, skin deformers, joint hierarchy, animation
//! stacks) into the flat `.bufa` / `.mate` text buffers the engine loads.

pub mod animation;
pub mod attribute;
pub mod convert;
pub mod error;
pub mod export;
pub mod formats;
pub mod manifest;
pub mod mesh;
pub mod scene;
pub mod skeleton;
pub mod skin;
pub mod transform;

// Re-export buffer descriptors from shared
pub use bufa_shared::{BufferFormat, BufferKind};

// Re-export the export entry point and its configuration
pub use convert::{Axis, CoordinateConversion};
pub use error::ExportError;
pub use export::{export_scene, ExportOptions, ExportReport, SkippedBuffer};

// Re-export scene loading
pub use scene::{load_scene, Scene};

pub use animation::{list_clips, ClipInfo};
pub use transform::RotationOrder;
