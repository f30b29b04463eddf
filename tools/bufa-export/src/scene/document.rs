//! JSON scene documents
//!
//! A scene document is the serde form of [`Scene`]. Column-major 4x4
//! matrices are written as 16-element arrays.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::Scene;

/// Read a scene document from disk
pub fn load_scene_document(path: &Path) -> Result<Scene> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read scene: {:?}", path))?;
    let scene: Scene = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse scene document: {:?}", path))?;

    tracing::debug!(
        "Loaded scene document {:?}: {} nodes, {} animation stacks",
        path,
        scene.nodes.len(),
        scene.anim_stacks.len()
    );
    Ok(scene)
}

/// Write a scene document (pretty-printed)
pub fn save_scene_document(scene: &Scene, path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(scene).context("Failed to serialize scene")?;
    fs::write(path, text).with_context(|| format!("Failed to write scene: {:?}", path))?;
    Ok(())
}
