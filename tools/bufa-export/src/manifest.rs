//! Manifest parsing and build orchestration
//!
//! Parses assets.toml and exports every listed scene.
//!
//! ```toml
//! [output]
//! dir = "build"
//!
//! # Optional; unit_scale defaults per source format (0.01 for scene
//! # documents, 1 for glTF)
//! [conversion]
//! mirror_axis = "x"
//! unit_scale = 0.01
//!
//! [materials]
//! texture_extension = "dds"
//!
//! [scenes]
//! church = "models/church.json"
//! dude = { path = "models/dude.glb", skip = ["tex_coord"] }
//! ```

use anyhow::{bail, Context, Result};
use bufa_shared::BufferKind;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::convert::{Axis, CoordinateConversion};
use crate::export::{export_scene, ExportOptions, ExportReport};
use crate::scene::{default_unit_scale, load_scene};

/// Root manifest structure
#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
    #[serde(default)]
    pub materials: MaterialConfig,
    /// Scenes keyed by export name
    #[serde(default)]
    pub scenes: BTreeMap<String, SceneEntry>,
    /// Directory relative scene paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// `[conversion]` overrides; unset fields fall back per scene
#[derive(Debug, Default, Clone, Copy, PartialEq, Deserialize)]
pub struct ConversionConfig {
    #[serde(default)]
    pub mirror_axis: Option<Axis>,
    #[serde(default)]
    pub unit_scale: Option<f32>,
}

impl ConversionConfig {
    /// Conversion for the scene at `source`
    pub fn resolve(&self, source: &Path) -> CoordinateConversion {
        let defaults = CoordinateConversion::default();
        CoordinateConversion::new(
            self.mirror_axis.unwrap_or(defaults.mirror_axis),
            self.unit_scale.unwrap_or_else(|| default_unit_scale(source)),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MaterialConfig {
    /// Replace texture file extensions in material buffers (e.g., "dds")
    #[serde(default)]
    pub texture_extension: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SceneEntry {
    Simple(PathBuf),
    Detailed {
        path: PathBuf,
        #[serde(default)]
        skip: Vec<BufferKind>,
    },
}

impl SceneEntry {
    pub fn path(&self) -> &Path {
        match self {
            SceneEntry::Simple(p) => p,
            SceneEntry::Detailed { path, .. } => path,
        }
    }

    pub fn skip(&self) -> &[BufferKind] {
        match self {
            SceneEntry::Simple(_) => &[],
            SceneEntry::Detailed { skip, .. } => skip,
        }
    }
}

impl Manifest {
    /// Source path of a scene entry, relative to the manifest
    pub fn scene_path(&self, entry: &SceneEntry) -> PathBuf {
        self.base_dir.join(entry.path())
    }

    /// Export options for one scene
    pub fn export_options(&self, name: &str, entry: &SceneEntry, output_dir: &Path) -> ExportOptions {
        ExportOptions {
            output_dir: output_dir.to_path_buf(),
            mesh_name: name.to_string(),
            conversion: self.conversion.resolve(entry.path()),
            texture_extension: self.materials.texture_extension.clone(),
            skip: entry.skip().to_vec(),
        }
    }
}

/// Load and parse a manifest file
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {:?}", path))?;
    let mut manifest: Manifest = toml::from_str(&content)
        .with_context(|| format!("Failed to parse manifest: {:?}", path))?;
    manifest.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(manifest)
}

/// Validate a manifest without building
pub fn validate(manifest: &Manifest) -> Result<()> {
    if let Some(scale) = manifest.conversion.unit_scale {
        if !(scale.is_finite() && scale > 0.0) {
            bail!("Invalid unit_scale {}: must be a positive number", scale);
        }
    }
    for (name, entry) in &manifest.scenes {
        if name.is_empty() || name.contains(['/', '\\']) {
            bail!("Invalid scene name '{}'", name);
        }
        let path = manifest.scene_path(entry);
        if !path.exists() {
            bail!("Scene '{}' source not found: {:?}", name, path);
        }
    }
    Ok(())
}

/// Export every scene of a manifest
///
/// Returns each scene's report, in name order.
pub fn build_all(
    manifest: &Manifest,
    output_override: Option<&Path>,
) -> Result<Vec<(String, ExportReport)>> {
    let output_dir = output_override.unwrap_or(&manifest.output.dir);
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    let mut reports = Vec::with_capacity(manifest.scenes.len());
    for (name, entry) in &manifest.scenes {
        let path = manifest.scene_path(entry);
        tracing::info!("Exporting scene: {} <- {:?}", name, path);

        let mut scene =
            load_scene(&path).with_context(|| format!("Failed to load scene '{}'", name))?;
        let options = manifest.export_options(name, entry, output_dir);
        let report = export_scene(&mut scene, &options)
            .with_context(|| format!("Failed to export scene '{}'", name))?;
        reports.push((name.clone(), report));
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_manifest() {
        let manifest: Manifest = toml::from_str(
            r#"
            [output]
            dir = "build"

            [conversion]
            mirror_axis = "z"
            unit_scale = 1.0

            [materials]
            texture_extension = "dds"

            [scenes]
            church = "models/church.json"
            dude = { path = "models/dude.glb", skip = ["tex_coord", "material"] }
            "#,
        )
        .unwrap();

        assert_eq!(manifest.output.dir, PathBuf::from("build"));
        assert_eq!(
            manifest.conversion.resolve(Path::new("models/church.json")),
            CoordinateConversion::new(Axis::Z, 1.0)
        );
        assert_eq!(manifest.materials.texture_extension.as_deref(), Some("dds"));
        assert_eq!(manifest.scenes.len(), 2);
        assert_eq!(manifest.scenes["church"].path(), Path::new("models/church.json"));
        assert!(manifest.scenes["church"].skip().is_empty());
        assert_eq!(
            manifest.scenes["dude"].skip(),
            &[BufferKind::TexCoord, BufferKind::Material]
        );
    }

    #[test]
    fn test_defaults() {
        let manifest: Manifest = toml::from_str("[scenes]\n").unwrap();
        assert_eq!(manifest.output.dir, PathBuf::from("."));
        assert_eq!(manifest.conversion, ConversionConfig::default());
        assert!(manifest.materials.texture_extension.is_none());

        let manifest: Manifest = toml::from_str("[conversion]\nunit_scale = 2.0\n").unwrap();
        let conversion = manifest.conversion.resolve(Path::new("dude.glb"));
        assert_eq!(conversion.mirror_axis, Axis::X);
        assert_eq!(conversion.unit_scale, 2.0);
    }

    #[test]
    fn test_unit_scale_defaults_per_source_format() {
        let manifest: Manifest = toml::from_str(
            r#"
            [scenes]
            church = "church.json"
            dude = { path = "dude.glb" }
            "#,
        )
        .unwrap();
        let output = Path::new("build");

        let church = manifest.export_options("church", &manifest.scenes["church"], output);
        assert_eq!(church.conversion, CoordinateConversion::default());
        let dude = manifest.export_options("dude", &manifest.scenes["dude"], output);
        assert_eq!(dude.conversion, CoordinateConversion::new(Axis::X, 1.0));

        let manifest: Manifest = toml::from_str("[conversion]\nunit_scale = -1.0\n").unwrap();
        assert!(validate(&manifest).is_err());
    }

    #[test]
    fn test_validate_reports_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assets.toml");
        std::fs::write(&path, "[scenes]\nchurch = \"church.json\"\n").unwrap();
        let manifest = load_manifest(&path).unwrap();

        let err = validate(&manifest).unwrap_err();
        assert!(err.to_string().contains("church"));

        std::fs::write(dir.path().join("church.json"), "{}").unwrap();
        validate(&manifest).unwrap();
    }
}
