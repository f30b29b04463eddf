//! Integration tests for bufa-export
//!
//! Tests the full pipeline: build a scene -> export -> verify buffer files

use bufa_export::scene::{
    AnimStack, Cluster, Keyframe, LayerElement, Material, MeshData, Node, NodeCurves, Scene,
    ShadingModel, SkinDeformer, TextureRef, ROOT_NODE,
};
use bufa_export::{export_scene, BufferKind, ExportOptions};
use glam::{Mat4, Vec3};
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn joint(name: &str, translation: Vec3) -> Node {
    let mut node = Node::new(name);
    node.is_skeleton = true;
    node.transform.translation = translation;
    node
}

/// One skinned triangle driven by a two-joint chain, plus an 18 frame clip
fn skinned_scene() -> Scene {
    let mut scene = Scene::default();
    let body = scene.add_node(ROOT_NODE, Node::new("Body"));
    let hips = scene.add_node(ROOT_NODE, joint("Hips", Vec3::new(0.0, 100.0, 0.0)));
    let spine = scene.add_node(hips, joint("Spine", Vec3::new(0.0, 50.0, 0.0)));

    let cluster = |link, indices: Vec<u32>, weights: Vec<f32>, global: Mat4| Cluster {
        link,
        control_point_indices: indices,
        weights,
        transform: Mat4::IDENTITY,
        transform_link: global,
    };
    let hips_global = scene.global_rest_transform(hips);
    let spine_global = scene.global_rest_transform(spine);

    scene.node_mut(body).mesh = Some(MeshData {
        control_points: vec![[0.0, 0.0, 0.0], [100.0, 0.0, 0.0], [0.0, 100.0, 0.0]],
        polygons: vec![vec![0, 1, 2]],
        skin: Some(SkinDeformer {
            clusters: vec![
                cluster(hips, vec![0, 1], vec![1.0, 0.75], hips_global),
                cluster(spine, vec![1, 2], vec![0.25, 1.0], spine_global),
            ],
        }),
        ..Default::default()
    });

    scene.anim_stacks.push(AnimStack {
        name: "walk".into(),
        start: 0.0,
        stop: 17.0 / 30.0,
        curves: vec![NodeCurves {
            node: hips,
            rotation: vec![
                Keyframe {
                    time: 0.0,
                    value: Vec3::ZERO,
                },
                Keyframe {
                    time: 17.0 / 30.0,
                    value: Vec3::new(0.0, 0.0, 90.0),
                },
            ],
            ..Default::default()
        }],
    });
    scene
}

/// A textured quad without skin
fn static_scene() -> Scene {
    let mut scene = Scene::default();
    let mut wall = Node::new("Wall");
    wall.mesh = Some(MeshData {
        control_points: vec![
            [0.0, 0.0, 0.0],
            [100.0, 0.0, 0.0],
            [100.0, 100.0, 0.0],
            [0.0, 100.0, 0.0],
        ],
        polygons: vec![vec![0, 1, 2, 3]],
        uvs: Some(LayerElement::by_control_point(vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
        ])),
        ..Default::default()
    });
    wall.material = Some(Material {
        name: "Brick".into(),
        shading: ShadingModel::Phong,
        emissive: [0.0, 0.0, 0.0],
        diffuse: [0.8, 0.2, 0.1],
        specular: [0.5, 0.5, 0.5],
        shininess: 20.0,
        textures: vec![
            TextureRef {
                channel: "DiffuseColor".into(),
                file_name: "C:\\art\\brick.tga".into(),
            },
            TextureRef {
                channel: "AmbientColor".into(),
                file_name: "ambient.tga".into(),
            },
        ],
    });
    scene.add_node(ROOT_NODE, wall);
    scene
}

fn read(options: &ExportOptions, kind: BufferKind, mesh_index: Option<usize>) -> String {
    let path = options.buffer_path(kind, mesh_index);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read {:?}: {}", path, e))
}

#[test]
fn test_skinned_scene_export() {
    let dir = tempdir().expect("Failed to create temp dir");
    let options = ExportOptions::new(dir.path(), "dude");
    let mut scene = skinned_scene();

    let report = export_scene(&mut scene, &options).expect("Export failed");

    // Six geometry buffers and the skeleton and animation; no material
    assert_eq!(report.written.len(), 8);
    assert_eq!(
        report.skipped_kinds().collect::<Vec<_>>(),
        vec![BufferKind::Material]
    );
    for path in &report.written {
        assert!(path.exists(), "{:?} should exist", path);
    }

    // Mirrored X and centimeters -> meters
    assert_eq!(
        read(&options, BufferKind::Position, Some(0)),
        "POSITION_BUFFER_V1\n3\n\
         0.000000 0.000000 0.000000\n\
         -1.000000 0.000000 0.000000\n\
         0.000000 1.000000 0.000000\n"
    );
    // Winding reversed
    assert_eq!(
        read(&options, BufferKind::Index, Some(0)),
        "INDEX_BUFFER_V1\n3\n1\n0 2 1\n"
    );
    assert_eq!(
        read(&options, BufferKind::Normal, Some(0)),
        "NORMAL_BUFFER\n3\n\
         0.000000 0.000000 1.000000\n\
         0.000000 0.000000 1.000000\n\
         0.000000 0.000000 1.000000\n"
    );
    // No UV layer
    assert_eq!(
        read(&options, BufferKind::TexCoord, Some(0)),
        "TEX_COORD_BUFFER\n3\n0 0\n0 0\n0 0\n"
    );
    let tangents = read(&options, BufferKind::Tangent, Some(0));
    assert!(tangents.starts_with("TANGENT_BUFFER\n3\n"));
    assert_eq!(tangents.lines().count(), 5);

    // Four influences per vertex, joint indices in skeleton order
    assert_eq!(
        read(&options, BufferKind::SkinWeight, Some(0)),
        "SKIN_WEIGHT\n3\n\
         0 1.000000\n0 0.000000\n0 0.000000\n0 0.000000\n\
         0 0.750000\n1 0.250000\n0 0.000000\n0 0.000000\n\
         1 1.000000\n0 0.000000\n0 0.000000\n0 0.000000\n"
    );

    assert_eq!(
        read(&options, BufferKind::Skeleton, None),
        "SKELETON\n2\n\
         Hips\n\
         1.000000 0.000000 0.000000 0.000000 0.000000 1.000000 0.000000 0.000000 \
         0.000000 0.000000 1.000000 0.000000 0.000000 -100.000000 0.000000 1.000000\n\
         -1\n\
         Spine\n\
         1.000000 0.000000 0.000000 0.000000 0.000000 1.000000 0.000000 0.000000 \
         0.000000 0.000000 1.000000 0.000000 0.000000 -150.000000 0.000000 1.000000\n\
         0\n"
    );

    let animation = read(&options, BufferKind::Animation, None);
    let lines: Vec<_> = animation.lines().collect();
    assert_eq!(&lines[..4], ["ANIMATION_CLIP", "walk", "2", "18"]);
    // Per joint: name, then rotation/translation/scale per frame
    assert_eq!(lines.len(), 4 + 2 * (1 + 18 * 3));
    assert_eq!(lines[4], "Hips");
    assert_eq!(lines[5], "0.000000 0.000000 0.000000 1.000000");
    assert_eq!(lines[6], "0.000000 100.000000 0.000000");
    assert_eq!(lines[7], "1.000000");
    assert_eq!(lines[4 + 1 + 18 * 3], "Spine");
}

#[test]
fn test_static_scene_export() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut options = ExportOptions::new(dir.path(), "church");
    options.texture_extension = Some("dds".into());
    options.skip = vec![BufferKind::Normal];
    let mut scene = static_scene();

    let report = export_scene(&mut scene, &options).expect("Export failed");

    // No skin: no weight buffer, the skeleton is reported missing
    assert_eq!(
        report.skipped_kinds().collect::<Vec<_>>(),
        vec![BufferKind::Skeleton]
    );
    assert!(!options.buffer_path(BufferKind::SkinWeight, Some(0)).exists());
    assert!(!options.buffer_path(BufferKind::Normal, Some(0)).exists());
    assert!(!options.buffer_path(BufferKind::Animation, None).exists());

    // Fan triangulation, one vertex per corner
    assert_eq!(
        read(&options, BufferKind::Index, Some(0)),
        "INDEX_BUFFER_V1\n3\n2\n0 2 1\n3 5 4\n"
    );
    let texture = read(&options, BufferKind::TexCoord, Some(0));
    let lines: Vec<_> = texture.lines().collect();
    assert_eq!(lines.len(), 2 + 6);
    // v is flipped
    assert_eq!(lines[2], "0.000000 1.000000");
    assert_eq!(lines[3], "1.000000 1.000000");
    assert_eq!(lines[4], "1.000000 0.000000");

    // Tangents follow +u, mirrored
    let tangents = read(&options, BufferKind::Tangent, Some(0));
    assert!(tangents.lines().skip(2).all(|l| l == "-1.000000 0.000000 0.000000"));

    assert_eq!(
        read(&options, BufferKind::Material, Some(0)),
        "MATERIAL\n\
         0.000000 0.000000 0.000000\n\
         0.800000 0.200000 0.100000\n\
         0.500000 0.500000 0.500000\n\
         20.000000\n\
         1\n\
         DiffuseColor\n\
         brick.dds\n"
    );
}

#[test]
fn test_unbound_cluster_skips_weights_only() {
    let dir = tempdir().expect("Failed to create temp dir");
    let options = ExportOptions::new(dir.path(), "dude");
    let mut scene = skinned_scene();
    // Second cluster now links the mesh node, which is not a joint
    let body = scene.root().children[0];
    if let Some(skin) = scene.node_mut(body).mesh.as_mut().and_then(|m| m.skin.as_mut()) {
        skin.clusters[1].link = body;
    }

    let report = export_scene(&mut scene, &options).expect("Export failed");

    let skipped: Vec<_> = report.skipped_kinds().collect();
    assert!(skipped.contains(&BufferKind::SkinWeight));
    assert!(!options.buffer_path(BufferKind::SkinWeight, Some(0)).exists());
    assert!(options.buffer_path(BufferKind::Position, Some(0)).exists());
    assert!(options.buffer_path(BufferKind::Index, Some(0)).exists());
}

#[test]
fn test_reexport_overwrites_buffers() {
    let dir = tempdir().expect("Failed to create temp dir");
    let options = ExportOptions::new(dir.path(), "church");

    export_scene(&mut static_scene(), &options).expect("First export failed");
    let first = read(&options, BufferKind::Position, Some(0));
    export_scene(&mut static_scene(), &options).expect("Second export failed");
    assert_eq!(read(&options, BufferKind::Position, Some(0)), first);

    // Only final buffer files are left behind
    let dir_entries = std::fs::read_dir(options.export_root().join("PositionBuffers"))
        .unwrap()
        .count();
    assert_eq!(dir_entries, 1);
}

fn bufa_export() -> Command {
    Command::new(env!("CARGO_BIN_EXE_bufa-export"))
}

fn save_scene(scene: &Scene, path: &Path) {
    bufa_export::scene::save_scene_document(scene, path).expect("Failed to save scene");
}

#[test]
fn test_cli_export_scene_document() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("dude.json");
    let output = dir.path().join("out");
    save_scene(&skinned_scene(), &input);

    let status = bufa_export()
        .arg("export")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .args(["--skip", "animation,tex_coord"])
        .status()
        .expect("Failed to run bufa-export");
    assert!(status.success());

    let root = output.join("Export").join("dude");
    assert!(root.join("PositionBuffers/dude0_vertex.bufa").exists());
    assert!(root.join("SkinWeight/dude0_weight.bufa").exists());
    assert!(root.join("Skeleton/dude_skeleton.bufa").exists());
    assert!(!root.join("TexCoordBuffers/dude0_texture.bufa").exists());
    assert!(!root.join("Animations/dude_animation.bufa").exists());
}

#[test]
fn test_cli_build_manifest() {
    let dir = tempdir().expect("Failed to create temp dir");
    save_scene(&static_scene(), &dir.path().join("church.json"));
    save_scene(&skinned_scene(), &dir.path().join("dude.json"));
    let manifest = dir.path().join("assets.toml");
    std::fs::write(
        &manifest,
        r#"
[output]
dir = "build"

[conversion]
mirror_axis = "z"
unit_scale = 1.0

[scenes]
church = "church.json"
dude = { path = "dude.json", skip = ["skeleton"] }
"#,
    )
    .unwrap();

    let status = bufa_export()
        .arg("check")
        .arg(&manifest)
        .status()
        .expect("Failed to run bufa-export");
    assert!(status.success());

    let output = dir.path().join("out");
    let status = bufa_export()
        .arg("build")
        .arg(&manifest)
        .arg("-o")
        .arg(&output)
        .status()
        .expect("Failed to run bufa-export");
    assert!(status.success());

    let church = output.join("Export/church");
    let positions =
        std::fs::read_to_string(church.join("PositionBuffers/church0_vertex.bufa")).unwrap();
    // Mirrored Z, unit scale 1
    assert!(positions.contains("100.000000 100.000000 0.000000\n"));
    assert!(church.join("Material/church0_material.mate").exists());

    let dude = output.join("Export/dude");
    assert!(dude.join("Animations/dude_animation.bufa").exists());
    assert!(!dude.join("Skeleton/dude_skeleton.bufa").exists());
}

#[test]
fn test_cli_list() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("dude.json");
    save_scene(&skinned_scene(), &input);

    let output = bufa_export()
        .arg("list")
        .arg(&input)
        .output()
        .expect("Failed to run bufa-export");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("'Body': 3 control points, 1 polygons, skinned"));
    assert!(stdout.contains("Joints: 2"));
    assert!(stdout.contains("'Spine' (parent 0)"));
    assert!(stdout.contains("'walk': frames 0..=17, 1 animated nodes"));
}

#[test]
fn test_cli_rejects_unknown_format() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("scene.fbx");
    std::fs::write(&input, "").unwrap();

    let status = bufa_export()
        .arg("export")
        .arg(&input)
        .status()
        .expect("Failed to run bufa-export");
    assert!(!status.success());
}
