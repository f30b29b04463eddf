//! Scene export
//!
//! Runs the whole pipeline over one scene and writes every buffer under
//! `<output>/Export/<mesh name>/<category>/`. Each mesh node among the root's
//! children gets its own buffer set, numbered by its child position.
//!
//! Faults are handled by kind:
//! - missing data (material, skin) skips the buffer with a warning
//! - integrity faults skip the affected buffers, are logged as errors and
//!   recorded in the [`ExportReport`]
//! - I/O faults abort the export

use anyhow::Result;
use bufa_shared::{BufferKind, EXPORT_ROOT};
use std::fmt;
use std::path::PathBuf;

use crate::animation::sample_clip;
use crate::convert::CoordinateConversion;
use crate::error::ExportError;
use crate::formats::{self, write_atomic, BufferWriter};
use crate::mesh::{build_vertex_records, MeshBuffers};
use crate::scene::utils::prepare_scene;
use crate::scene::{MeshData, Node, Scene};
use crate::skeleton::Skeleton;
use crate::skin::{build_skin_weights, SkinWeights};

/// Buffers derived from a mesh's vertex records
const GEOMETRY_KINDS: [BufferKind; 6] = [
    BufferKind::Position,
    BufferKind::Index,
    BufferKind::Normal,
    BufferKind::Tangent,
    BufferKind::TexCoord,
    BufferKind::SkinWeight,
];

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub output_dir: PathBuf,
    /// Base name of every buffer file and of the export subdirectory
    pub mesh_name: String,
    pub conversion: CoordinateConversion,
    /// Replacement extension for texture file names in materials
    pub texture_extension: Option<String>,
    /// Buffers not to write
    pub skip: Vec<BufferKind>,
}

impl ExportOptions {
    pub fn new(output_dir: impl Into<PathBuf>, mesh_name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            mesh_name: mesh_name.into(),
            conversion: CoordinateConversion::default(),
            texture_extension: None,
            skip: Vec::new(),
        }
    }

    /// `<output>/Export/<mesh name>`
    pub fn export_root(&self) -> PathBuf {
        self.output_dir.join(EXPORT_ROOT).join(&self.mesh_name)
    }

    /// Path of a buffer; `mesh_index` only applies to per-mesh buffers
    pub fn buffer_path(&self, kind: BufferKind, mesh_index: Option<usize>) -> PathBuf {
        self.export_root()
            .join(kind.format().directory)
            .join(kind.file_name(&self.mesh_name, mesh_index))
    }

    /// Path of the `clip`-th animation buffer
    ///
    /// The first clip uses the plain animation file name, later clips append
    /// their name.
    pub fn animation_path(&self, clip: usize, clip_name: &str) -> PathBuf {
        if clip == 0 {
            return self.buffer_path(BufferKind::Animation, None);
        }
        let format = BufferKind::Animation.format();
        self.export_root().join(format.directory).join(format!(
            "{}_{}_{}.{}",
            self.mesh_name,
            format.suffix,
            sanitize_file_stem(clip_name),
            format.extension
        ))
    }

    fn wants(&self, kind: BufferKind) -> bool {
        !self.skip.contains(&kind)
    }
}

fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// A buffer that was not written
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedBuffer {
    pub kind: BufferKind,
    /// Mesh node or clip the buffer belongs to
    pub subject: String,
    pub reason: String,
}

impl fmt::Display for SkippedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} buffer of '{}': {}", self.kind, self.subject, self.reason)
    }
}

/// Outcome of one export
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<SkippedBuffer>,
}

impl ExportReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn skipped_kinds(&self) -> impl Iterator<Item = BufferKind> + '_ {
        self.skipped.iter().map(|s| s.kind)
    }

    /// Missing authoring data: warn and skip
    fn missing(&mut self, kind: BufferKind, subject: &str, reason: impl fmt::Display) {
        let skipped = SkippedBuffer {
            kind,
            subject: subject.to_string(),
            reason: reason.to_string(),
        };
        tracing::warn!("Skipping {}", skipped);
        self.skipped.push(skipped);
    }

    /// Integrity fault: log an error and skip
    fn fault(&mut self, kind: BufferKind, subject: &str, err: &ExportError) {
        let skipped = SkippedBuffer {
            kind,
            subject: subject.to_string(),
            reason: err.to_string(),
        };
        tracing::error!("Skipping {}", skipped);
        self.skipped.push(skipped);
    }
}

/// Validate and prepare `scene` (triangulation, normals, tangents), then
/// export it. A scene that is not a well-formed tree is rejected before any
/// file is written.
pub fn export_scene(scene: &mut Scene, options: &ExportOptions) -> Result<ExportReport> {
    scene.validate()?;
    prepare_scene(scene);
    let scene: &Scene = scene;

    let mut exporter = Exporter {
        scene,
        options,
        skeleton: Skeleton::from_scene(scene),
        report: ExportReport::default(),
    };

    for (n, &child) in scene.root().children.iter().enumerate() {
        let node = scene.node(child);
        match &node.mesh {
            Some(mesh) => exporter.export_mesh(n, node, mesh)?,
            None => tracing::debug!("Root child {} ('{}') has no mesh", n, node.name),
        }
    }
    exporter.export_skeleton()?;
    exporter.export_animations()?;

    let report = exporter.report;
    tracing::info!(
        "Exported '{}' to {:?}: {} buffers written, {} skipped",
        options.mesh_name,
        options.export_root(),
        report.written.len(),
        report.skipped.len()
    );
    Ok(report)
}

struct Exporter<'a> {
    scene: &'a Scene,
    options: &'a ExportOptions,
    skeleton: Skeleton,
    report: ExportReport,
}

impl Exporter<'_> {
    fn write<F>(&mut self, path: PathBuf, kind: BufferKind, write: F) -> Result<()>
    where
        F: FnOnce(&mut BufferWriter<'_>) -> Result<()>,
    {
        if !self.options.wants(kind) {
            tracing::debug!("Not writing {} buffer {:?} (skipped by options)", kind, path);
            return Ok(());
        }
        write_atomic(&path, write)?;
        self.report.written.push(path);
        Ok(())
    }

    fn export_mesh(&mut self, n: usize, node: &Node, mesh: &MeshData) -> Result<()> {
        tracing::info!(
            "Processing mesh '{}' (child {}): {} control points, {} polygons",
            node.name,
            n,
            mesh.control_point_count(),
            mesh.polygon_count()
        );

        let options = self.options;
        let weights = match &mesh.skin {
            Some(skin) => {
                let result = self
                    .skeleton
                    .bind_clusters(self.scene, &node.name, skin)
                    .and_then(|binding| {
                        build_skin_weights(
                            &node.name,
                            mesh.control_point_count(),
                            skin,
                            &binding.cluster_joints,
                            binding.joint_count,
                        )
                    });
                match result {
                    Ok(weights) => Some(weights),
                    Err(err) => {
                        self.report.fault(BufferKind::SkinWeight, &node.name, &err);
                        None
                    }
                }
            }
            None => None,
        };
        let unskinned;
        let weights_ref = match &weights {
            Some(w) => w,
            None => {
                unskinned = SkinWeights::unskinned(mesh.control_point_count());
                &unskinned
            }
        };

        match build_vertex_records(&node.name, mesh, weights_ref) {
            Ok(records) => {
                let mut buffers = MeshBuffers::from_records(records);
                buffers.apply_conversion(&options.conversion);
                self.write_geometry(n, &buffers, weights.is_some())?;
            }
            Err(err) => {
                for kind in GEOMETRY_KINDS {
                    if kind != BufferKind::SkinWeight || weights.is_some() {
                        self.report.fault(kind, &node.name, &err);
                    }
                }
            }
        }

        match &node.material {
            Some(material) => {
                let extension = options.texture_extension.as_deref();
                let path = options.buffer_path(BufferKind::Material, Some(n));
                self.write(path, BufferKind::Material, |w| {
                    formats::write_material(w, material, extension)
                })?;
            }
            None => self
                .report
                .missing(BufferKind::Material, &node.name, "mesh has no material"),
        }
        Ok(())
    }

    fn write_geometry(&mut self, n: usize, buffers: &MeshBuffers, skinned: bool) -> Result<()> {
        let options = self.options;
        let path = |kind| options.buffer_path(kind, Some(n));
        let vertices = &buffers.vertices;

        self.write(path(BufferKind::Position), BufferKind::Position, |w| {
            formats::write_positions(w, vertices)
        })?;
        self.write(path(BufferKind::Index), BufferKind::Index, |w| {
            formats::write_indices(w, &buffers.triangles)
        })?;
        self.write(path(BufferKind::Normal), BufferKind::Normal, |w| {
            formats::write_normals(w, vertices)
        })?;
        self.write(path(BufferKind::Tangent), BufferKind::Tangent, |w| {
            formats::write_tangents(w, vertices)
        })?;
        self.write(path(BufferKind::TexCoord), BufferKind::TexCoord, |w| {
            formats::write_tex_coords(w, vertices)
        })?;
        if skinned {
            self.write(path(BufferKind::SkinWeight), BufferKind::SkinWeight, |w| {
                formats::write_skin_weights(w, vertices)
            })?;
        }

        tracing::info!(
            "  {} vertices, {} triangles",
            buffers.vertex_count(),
            buffers.triangle_count()
        );
        Ok(())
    }

    fn export_skeleton(&mut self) -> Result<()> {
        let (scene, options) = (self.scene, self.options);
        let subject = options.mesh_name.as_str();
        let Some((_, skin)) = scene.first_skin() else {
            let err = ExportError::MissingSkinDeformer {
                subject: subject.to_string(),
            };
            self.report.missing(BufferKind::Skeleton, subject, err);
            return Ok(());
        };

        match self.skeleton.bind_pose(scene, skin, &options.conversion) {
            Ok(binds) => {
                let joints = self.skeleton.joints().to_vec();
                let path = options.buffer_path(BufferKind::Skeleton, None);
                self.write(path, BufferKind::Skeleton, |w| {
                    formats::write_skeleton(w, &joints, &binds)
                })?;
                tracing::info!("Skeleton: {} joints", joints.len());
            }
            Err(err) => self.report.fault(BufferKind::Skeleton, subject, &err),
        }
        Ok(())
    }

    fn export_animations(&mut self) -> Result<()> {
        let (scene, options) = (self.scene, self.options);
        let skin = scene.first_skin().map(|(_, skin)| skin);
        for (i, stack) in scene.anim_stacks.iter().enumerate() {
            match sample_clip(scene, &self.skeleton, skin, stack, &options.conversion) {
                Ok(clip) => {
                    let path = options.animation_path(i, &clip.name);
                    self.write(path, BufferKind::Animation, |w| {
                        formats::write_animation(w, &clip)
                    })?;
                    tracing::info!(
                        "Animation '{}': {} joints, {} frames",
                        clip.name,
                        clip.tracks.len(),
                        clip.frame_count()
                    );
                }
                Err(err) => self.report.fault(BufferKind::Animation, &stack.name, &err),
            }
        }
        Ok(())
    }
}
