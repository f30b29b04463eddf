//! Shared types for the bufa asset pipeline.
//!
//! Buffer tags, category directories and file naming live here so that the
//! exporter and any engine-side loader agree on one definition.

pub mod buffer_format;

pub use buffer_format::{
    BufferFormat, BufferKind, BUFFER_EXT, EXPORT_ROOT, MATERIAL_EXT,
};
