//! Buffer format specifications for the bufa text asset files.
//!
//! `BufferFormat` is the single source of truth for every exported buffer:
//! its header tag, the category directory it lands in under
//! `Export/<mesh>/`, and how its file name is built.
//!
//! # Example
//!
//! ```
//! use bufa_shared::BufferKind;
//!
//! let format = BufferKind::Position.format();
//! assert_eq!(format.tag, "POSITION_BUFFER_V1");
//! assert_eq!(format.directory, "PositionBuffers");
//! assert_eq!(BufferKind::Position.file_name("church", Some(2)), "church2_vertex.bufa");
//! assert_eq!(BufferKind::Skeleton.file_name("church", None), "church_skeleton.bufa");
//! ```

use serde::{Deserialize, Serialize};

/// Buffer file extension for geometry, skeleton and animation buffers
pub const BUFFER_EXT: &str = "bufa";

/// Material file extension
pub const MATERIAL_EXT: &str = "mate";

/// Name of the export root directory created under the output directory
pub const EXPORT_ROOT: &str = "Export";

/// Format specification for one buffer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferFormat {
    /// First header line (e.g., "POSITION_BUFFER_V1")
    pub tag: &'static str,

    /// Category directory under `Export/<mesh>/` (e.g., "PositionBuffers")
    pub directory: &'static str,

    /// File name suffix after the mesh name and index (e.g., "vertex")
    pub suffix: &'static str,

    /// File extension without dot
    pub extension: &'static str,
}

impl BufferFormat {
    /// Create a new buffer format specification.
    pub const fn new(
        tag: &'static str,
        directory: &'static str,
        suffix: &'static str,
        extension: &'static str,
    ) -> Self {
        Self {
            tag,
            directory,
            suffix,
            extension,
        }
    }
}

/// Every buffer the exporter produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferKind {
    Position,
    Index,
    Normal,
    Tangent,
    TexCoord,
    SkinWeight,
    Material,
    Skeleton,
    Animation,
}

pub const POSITION_FORMAT: BufferFormat =
    BufferFormat::new("POSITION_BUFFER_V1", "PositionBuffers", "vertex", BUFFER_EXT);
pub const INDEX_FORMAT: BufferFormat =
    BufferFormat::new("INDEX_BUFFER_V1", "IndexBuffers", "index", BUFFER_EXT);
pub const NORMAL_FORMAT: BufferFormat =
    BufferFormat::new("NORMAL_BUFFER", "NormalBuffers", "normal", BUFFER_EXT);
pub const TANGENT_FORMAT: BufferFormat =
    BufferFormat::new("TANGENT_BUFFER", "TangentBuffers", "tangent", BUFFER_EXT);
pub const TEX_COORD_FORMAT: BufferFormat =
    BufferFormat::new("TEX_COORD_BUFFER", "TexCoordBuffers", "texture", BUFFER_EXT);
pub const SKIN_WEIGHT_FORMAT: BufferFormat =
    BufferFormat::new("SKIN_WEIGHT", "SkinWeight", "weight", BUFFER_EXT);
pub const MATERIAL_FORMAT: BufferFormat =
    BufferFormat::new("MATERIAL", "Material", "material", MATERIAL_EXT);
pub const SKELETON_FORMAT: BufferFormat =
    BufferFormat::new("SKELETON", "Skeleton", "skeleton", BUFFER_EXT);
pub const ANIMATION_FORMAT: BufferFormat =
    BufferFormat::new("ANIMATION_CLIP", "Animations", "animation", BUFFER_EXT);

impl BufferKind {
    /// All buffer kinds in export order
    pub const ALL: [BufferKind; 9] = [
        BufferKind::Position,
        BufferKind::Index,
        BufferKind::Normal,
        BufferKind::Tangent,
        BufferKind::TexCoord,
        BufferKind::Material,
        BufferKind::SkinWeight,
        BufferKind::Skeleton,
        BufferKind::Animation,
    ];

    pub const fn format(self) -> BufferFormat {
        match self {
            BufferKind::Position => POSITION_FORMAT,
            BufferKind::Index => INDEX_FORMAT,
            BufferKind::Normal => NORMAL_FORMAT,
            BufferKind::Tangent => TANGENT_FORMAT,
            BufferKind::TexCoord => TEX_COORD_FORMAT,
            BufferKind::SkinWeight => SKIN_WEIGHT_FORMAT,
            BufferKind::Material => MATERIAL_FORMAT,
            BufferKind::Skeleton => SKELETON_FORMAT,
            BufferKind::Animation => ANIMATION_FORMAT,
        }
    }

    /// snake_case name used in manifests and on the command line
    pub const fn name(self) -> &'static str {
        match self {
            BufferKind::Position => "position",
            BufferKind::Index => "index",
            BufferKind::Normal => "normal",
            BufferKind::Tangent => "tangent",
            BufferKind::TexCoord => "tex_coord",
            BufferKind::SkinWeight => "skin_weight",
            BufferKind::Material => "material",
            BufferKind::Skeleton => "skeleton",
            BufferKind::Animation => "animation",
        }
    }

    /// Whether one file is written per mesh node (`<mesh>N_...`) rather than
    /// once per scene (`<mesh>_...`)
    pub const fn is_per_mesh(self) -> bool {
        !matches!(self, BufferKind::Skeleton | BufferKind::Animation)
    }

    /// Build the file name for this buffer.
    ///
    /// `mesh_index` is the mesh node's position among the scene root's
    /// children and is only used by per-mesh buffers.
    pub fn file_name(self, mesh_name: &str, mesh_index: Option<usize>) -> String {
        let format = self.format();
        match (self.is_per_mesh(), mesh_index) {
            (true, Some(n)) => format!(
                "{}{}_{}.{}",
                mesh_name, n, format.suffix, format.extension
            ),
            _ => format!("{}_{}.{}", mesh_name, format.suffix, format.extension),
        }
    }
}

impl std::str::FromStr for BufferKind {
    type Err = String;

    /// Parse a kind by its snake_case name or its file suffix
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        BufferKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s || kind.format().suffix == s)
            .ok_or_else(|| {
                let names: Vec<_> = BufferKind::ALL.iter().map(|k| k.name()).collect();
                format!("unknown buffer kind '{}' (expected one of {})", s, names.join(", "))
            })
    }
}

impl std::fmt::Display for BufferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.format().suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_file_names() {
        assert_eq!(
            BufferKind::Index.file_name("church", Some(0)),
            "church0_index.bufa"
        );
        assert_eq!(
            BufferKind::TexCoord.file_name("church", Some(3)),
            "church3_texture.bufa"
        );
        assert_eq!(
            BufferKind::Material.file_name("church", Some(1)),
            "church1_material.mate"
        );
    }

    #[test]
    fn test_scene_level_file_names_ignore_index() {
        assert_eq!(
            BufferKind::Animation.file_name("dude", Some(4)),
            "dude_animation.bufa"
        );
        assert_eq!(
            BufferKind::Skeleton.file_name("dude", None),
            "dude_skeleton.bufa"
        );
    }

    #[test]
    fn test_tags() {
        assert_eq!(BufferKind::Index.format().tag, "INDEX_BUFFER_V1");
        assert_eq!(BufferKind::Normal.format().tag, "NORMAL_BUFFER");
        assert_eq!(BufferKind::Tangent.format().tag, "TANGENT_BUFFER");
        assert_eq!(BufferKind::TexCoord.format().tag, "TEX_COORD_BUFFER");
        assert_eq!(BufferKind::SkinWeight.format().tag, "SKIN_WEIGHT");
        assert_eq!(BufferKind::Material.format().tag, "MATERIAL");
        assert_eq!(BufferKind::Skeleton.format().tag, "SKELETON");
        assert_eq!(BufferKind::Animation.format().tag, "ANIMATION_CLIP");
    }

    #[test]
    fn test_directories_are_distinct() {
        let mut dirs: Vec<_> = BufferKind::ALL.iter().map(|k| k.format().directory).collect();
        dirs.sort_unstable();
        dirs.dedup();
        assert_eq!(dirs.len(), BufferKind::ALL.len());
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("tex_coord".parse::<BufferKind>(), Ok(BufferKind::TexCoord));
        assert_eq!("vertex".parse::<BufferKind>(), Ok(BufferKind::Position));
        assert_eq!("Weight".parse::<BufferKind>(), Ok(BufferKind::SkinWeight));
        assert!("colors".parse::<BufferKind>().is_err());
    }

    #[test]
    fn test_kind_deserializes_snake_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            skip: Vec<BufferKind>,
        }
        let parsed: Wrapper = toml::from_str(r#"skip = ["tex_coord", "skin_weight"]"#).unwrap();
        assert_eq!(
            parsed.skip,
            vec![BufferKind::TexCoord, BufferKind::SkinWeight]
        );
    }
}
