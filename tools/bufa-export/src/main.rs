//! bufa-export - scene to text buffer exporter
//!
//! Converts scene documents (.json) and glTF files (.gltf, .glb) to the
//! engine's text buffers (.bufa, .mate)

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

// Use modules from library
use bufa_export::scene::default_unit_scale;
use bufa_export::skeleton::Skeleton;
use bufa_export::{
    export_scene, list_clips, load_scene, manifest, Axis, BufferKind, ExportOptions, ExportReport,
};

#[derive(Parser)]
#[command(name = "bufa-export")]
#[command(about = "Scene to engine text buffer exporter")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every scene listed in a manifest file
    Build {
        /// Path to assets.toml manifest
        #[arg(default_value = "assets.toml")]
        manifest: PathBuf,

        /// Output directory (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate manifest without building
    Check {
        /// Path to assets.toml manifest
        #[arg(default_value = "assets.toml")]
        manifest: PathBuf,
    },

    /// Export a single scene file
    Export {
        /// Input scene (.json, .gltf or .glb)
        input: PathBuf,

        /// Output directory (Export/<name>/ is created inside)
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Mesh name used for file names (default: input file stem)
        #[arg(short, long)]
        name: Option<String>,

        /// Buffers not to write (e.g., tex_coord, skeleton)
        #[arg(long, value_delimiter = ',')]
        skip: Vec<BufferKind>,

        /// Authoring units -> target units factor (default: 0.01 for scene
        /// documents, 1 for glTF)
        #[arg(long)]
        unit_scale: Option<f32>,

        /// Axis mirrored to switch handedness
        #[arg(long)]
        mirror_axis: Option<Axis>,

        /// Replacement extension for texture file names (e.g., dds)
        #[arg(long)]
        texture_ext: Option<String>,
    },

    /// List meshes, joints and animation clips of a scene
    List {
        /// Input scene (.json, .gltf or .glb)
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            manifest,
            output,
            verbose,
        } => {
            if verbose {
                tracing::info!("Building scenes from {:?}", manifest);
            }
            let config = manifest::load_manifest(&manifest)?;
            manifest::validate(&config)?;
            let reports = manifest::build_all(&config, output.as_deref())?;
            let incomplete = reports
                .iter()
                .filter(|(name, report)| !summarize(name, report))
                .count();
            if incomplete > 0 {
                tracing::warn!("Build complete, {} scene(s) with skipped buffers", incomplete);
            } else {
                tracing::info!("Build complete!");
            }
        }

        Commands::Check { manifest } => {
            tracing::info!("Checking manifest {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            manifest::validate(&config)?;
            tracing::info!("Manifest is valid! ({} scenes)", config.scenes.len());
        }

        Commands::Export {
            input,
            output,
            name,
            skip,
            unit_scale,
            mirror_axis,
            texture_ext,
        } => {
            let name = match name {
                Some(name) => name,
                None => match input.file_stem().and_then(|s| s.to_str()) {
                    Some(stem) => stem.to_string(),
                    None => bail!("Cannot derive a mesh name from {:?}, use --name", input),
                },
            };
            let mut options = ExportOptions::new(output, name);
            let scale = unit_scale.unwrap_or_else(|| default_unit_scale(&input));
            if !(scale.is_finite() && scale > 0.0) {
                bail!("--unit-scale must be a positive number, got {}", scale);
            }
            options.conversion.unit_scale = scale;
            if let Some(axis) = mirror_axis {
                options.conversion.mirror_axis = axis;
            }
            options.texture_extension = texture_ext;
            options.skip = skip;

            tracing::info!("Exporting {:?} -> {:?}", input, options.export_root());
            let mut scene = load_scene(&input)?;
            let report = export_scene(&mut scene, &options)?;
            summarize(&options.mesh_name, &report);
            tracing::info!("Done!");
        }

        Commands::List { input } => {
            let scene = load_scene(&input)?;

            let meshes: Vec<_> = scene
                .root()
                .children
                .iter()
                .enumerate()
                .filter_map(|(n, &id)| {
                    let node = scene.node(id);
                    node.mesh.as_ref().map(|mesh| (n, node, mesh))
                })
                .collect();
            println!("Meshes in {:?}: {}", input, meshes.len());
            for (n, node, mesh) in meshes {
                println!(
                    "  [{}] '{}': {} control points, {} polygons{}",
                    n,
                    node.name,
                    mesh.control_point_count(),
                    mesh.polygon_count(),
                    if mesh.skin.is_some() { ", skinned" } else { "" }
                );
            }

            let skeleton = Skeleton::from_scene(&scene);
            println!("Joints: {}", skeleton.len());
            for (i, joint) in skeleton.joints().iter().enumerate() {
                println!("  [{}] '{}' (parent {})", i, joint.name, joint.parent);
            }

            let clips = list_clips(&scene);
            println!("Animation clips: {}", clips.len());
            for (i, clip) in clips.iter().enumerate() {
                println!(
                    "  [{}] '{}': frames {}..={}, {} animated nodes",
                    i, clip.name, clip.start_frame, clip.end_frame, clip.animated_nodes
                );
            }
        }
    }

    Ok(())
}

/// Log skipped buffers; returns whether the export was complete
fn summarize(name: &str, report: &ExportReport) -> bool {
    for skipped in &report.skipped {
        tracing::warn!("{}: skipped {}", name, skipped);
    }
    report.is_complete()
}
