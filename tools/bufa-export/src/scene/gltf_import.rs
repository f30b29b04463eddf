//! glTF/GLB import into the scene model
//!
//! glTF node `i` becomes arena node `i + 1` below a synthetic root. All
//! triangle primitives of a mesh are merged into one `MeshData` with
//! per-control-point layers. Skins become skin deformers with one cluster per
//! joint, and animation channels become per-node curves (rotations as XYZ
//! Euler degrees).

use anyhow::{Context, Result};
use gltf::animation::util::ReadOutputs;
use glam::{Mat4, Quat, Vec3};
use hashbrown::HashMap;
use std::path::Path;

use super::{
    AnimStack, Cluster, Keyframe, LayerElement, LocalTransform, Material, MeshData, Node,
    NodeCurves, NodeId, Scene, ShadingModel, SkinDeformer, TextureRef, ROOT_NODE,
};
use crate::transform::RotationOrder;

/// Arena id of a glTF node
fn arena_id(gltf_index: usize) -> NodeId {
    gltf_index + 1
}

/// Import a glTF or GLB file
pub fn import_gltf(input: &Path) -> Result<Scene> {
    let (document, buffers, _images) =
        gltf::import(input).with_context(|| format!("Failed to load glTF: {:?}", input))?;

    let mut scene = Scene::default();
    let joint_nodes: Vec<usize> = document
        .skins()
        .flat_map(|skin| skin.joints().map(|j| j.index()).collect::<Vec<_>>())
        .collect();

    for node in document.nodes() {
        let (translation, rotation, scale) = node.transform().decomposed();
        let rotation = RotationOrder::Xyz.euler_from_quat(Quat::from_array(rotation));
        scene.nodes.push(Node {
            name: node
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("node{}", node.index())),
            children: node.children().map(|c| arena_id(c.index())).collect(),
            transform: LocalTransform {
                translation: Vec3::from_array(translation),
                rotation,
                scale: Vec3::from_array(scale),
            },
            rotation_order: RotationOrder::Xyz,
            mesh: None,
            is_skeleton: joint_nodes.contains(&node.index()),
            material: None,
        });
    }

    let gltf_scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .context("glTF has no scenes")?;
    scene.nodes[ROOT_NODE].children = gltf_scene.nodes().map(|n| arena_id(n.index())).collect();

    // Meshes and materials
    for node in document.nodes() {
        let Some(mesh) = node.mesh() else {
            continue;
        };
        let id = arena_id(node.index());
        let (data, material) = read_mesh(&mesh, &buffers)?;
        scene.nodes[id].mesh = Some(data);
        scene.nodes[id].material = material;
    }

    // Skins need global transforms, so they are read once the hierarchy exists
    for node in document.nodes() {
        let Some(skin) = node.skin() else {
            continue;
        };
        let id = arena_id(node.index());
        let mesh_global = scene.global_rest_transform(id);
        let Some(mesh) = scene.nodes[id].mesh.as_mut() else {
            tracing::warn!("Node '{}' has a skin but no mesh", node.name().unwrap_or("unnamed"));
            continue;
        };
        let influences = read_mesh_influences(&node, &buffers);
        mesh.skin = Some(read_skin(&skin, &buffers, mesh_global, &influences));
    }

    for (i, animation) in document.animations().enumerate() {
        scene.anim_stacks.push(read_animation(&animation, i, &buffers));
    }

    tracing::info!(
        "Imported {:?}: {} nodes, {} meshes, {} skins, {} animations",
        input,
        scene.nodes.len() - 1,
        document.meshes().count(),
        document.skins().count(),
        scene.anim_stacks.len()
    );

    Ok(scene)
}

fn read_mesh(
    mesh: &gltf::Mesh,
    buffers: &[gltf::buffer::Data],
) -> Result<(MeshData, Option<Material>)> {
    let name = mesh.name().unwrap_or("unnamed");
    let mut data = MeshData::default();
    let mut normals = Some(Vec::new());
    let mut tangents = Some(Vec::new());
    let mut uvs = Some(Vec::new());
    let mut material = None;

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            tracing::warn!(
                "Mesh '{}': skipping primitive {} with mode {:?}",
                name,
                primitive.index(),
                primitive.mode()
            );
            continue;
        }

        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .with_context(|| format!("Mesh '{}': primitive has no positions", name))?
            .collect();
        let base = data.control_points.len() as u32;
        let count = positions.len();
        data.control_points.extend(positions);

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..count as u32).collect(),
        };
        data.polygons.extend(
            indices
                .chunks_exact(3)
                .map(|tri| tri.iter().map(|&i| base + i).collect()),
        );

        // A layer survives only if every primitive provides it
        normals = normals.zip(reader.read_normals()).map(|(mut acc, n)| {
            acc.extend(n);
            acc
        });
        tangents = tangents.zip(reader.read_tangents()).map(|(mut acc, t)| {
            acc.extend(t.map(|[x, y, z, _]| [x, y, z]));
            acc
        });
        uvs = uvs.zip(reader.read_tex_coords(0)).map(|(mut acc, uv)| {
            // glTF texture space is v-down
            acc.extend(uv.into_f32().map(|[u, v]| [u, 1.0 - v]));
            acc
        });

        if material.is_none() && primitive.material().index().is_some() {
            material = Some(read_material(&primitive.material()));
        }
    }

    let count = data.control_points.len();
    data.normals = complete_layer(normals, count);
    data.tangents = complete_layer(tangents, count);
    data.uvs = complete_layer(uvs, count);

    Ok((data, material))
}

fn complete_layer<T>(values: Option<Vec<T>>, count: usize) -> Option<LayerElement<T>> {
    values
        .filter(|v| v.len() == count)
        .map(LayerElement::by_control_point)
}

/// Per-control-point `(skin joint slot, weight)` pairs of a mesh node
fn read_mesh_influences(node: &gltf::Node, buffers: &[gltf::buffer::Data]) -> Vec<Vec<(u16, f32)>> {
    let Some(mesh) = node.mesh() else {
        return Vec::new();
    };
    let mut influences = Vec::new();
    for primitive in mesh
        .primitives()
        .filter(|p| p.mode() == gltf::mesh::Mode::Triangles)
    {
        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
        let count = reader.read_positions().map(|p| p.count()).unwrap_or(0);
        match (reader.read_joints(0), reader.read_weights(0)) {
            (Some(joints), Some(weights)) => {
                influences.extend(joints.into_u16().zip(weights.into_f32()).map(|(j, w)| {
                    j.into_iter()
                        .zip(w)
                        .filter(|&(_, w)| w > 0.0)
                        .collect::<Vec<_>>()
                }));
            }
            _ => influences.extend(std::iter::repeat_n(Vec::new(), count)),
        }
    }
    influences
}

fn read_skin(
    skin: &gltf::Skin,
    buffers: &[gltf::buffer::Data],
    mesh_global: Mat4,
    influences: &[Vec<(u16, f32)>],
) -> SkinDeformer {
    let reader = skin.reader(|buffer| Some(&buffers[buffer.index()]));
    let inverse_binds: Vec<Mat4> = reader
        .read_inverse_bind_matrices()
        .map(|m| m.map(|cols| Mat4::from_cols_array_2d(&cols)).collect())
        .unwrap_or_default();

    let mut clusters: Vec<Cluster> = skin
        .joints()
        .enumerate()
        .map(|(slot, joint)| {
            let inverse_bind = inverse_binds.get(slot).copied().unwrap_or(Mat4::IDENTITY);
            Cluster {
                link: arena_id(joint.index()),
                control_point_indices: Vec::new(),
                weights: Vec::new(),
                transform: mesh_global,
                transform_link: mesh_global * inverse_bind.inverse(),
            }
        })
        .collect();

    let cluster_count = clusters.len();
    for (control_point, list) in influences.iter().enumerate() {
        for &(slot, weight) in list {
            match clusters.get_mut(slot as usize) {
                Some(cluster) => {
                    cluster.control_point_indices.push(control_point as u32);
                    cluster.weights.push(weight);
                }
                None => tracing::warn!(
                    "Skin '{}': control point {} references joint slot {} (skin has {})",
                    skin.name().unwrap_or("unnamed"),
                    control_point,
                    slot,
                    cluster_count
                ),
            }
        }
    }

    SkinDeformer { clusters }
}

fn read_material(material: &gltf::Material) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, _] = pbr.base_color_factor();

    let mut textures = Vec::new();
    let mut push = |channel: &str, texture: gltf::Texture| {
        textures.push(TextureRef {
            channel: channel.to_string(),
            file_name: texture_file_name(&texture),
        });
    };
    if let Some(info) = pbr.base_color_texture() {
        push("DiffuseColor", info.texture());
    }
    if let Some(normal) = material.normal_texture() {
        push("NormalMap", normal.texture());
    }
    if let Some(info) = material.emissive_texture() {
        push("EmissiveColor", info.texture());
    }

    Material {
        name: material
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("material{}", material.index().unwrap_or(0))),
        shading: ShadingModel::Lambert,
        emissive: material.emissive_factor(),
        diffuse: [r, g, b],
        specular: [0.0; 3],
        shininess: 1.0,
        textures,
    }
}

fn texture_file_name(texture: &gltf::Texture) -> String {
    let image = texture.source();
    match image.source() {
        gltf::image::Source::Uri { uri, .. } => uri.to_string(),
        gltf::image::Source::View { mime_type, .. } => {
            let ext = mime_type.strip_prefix("image/").unwrap_or("png");
            let stem = image
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("image{}", image.index()));
            format!("{}.{}", stem, ext)
        }
    }
}

fn read_animation(
    animation: &gltf::Animation,
    index: usize,
    buffers: &[gltf::buffer::Data],
) -> AnimStack {
    let name = animation
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("animation{}", index));
    let mut curves: HashMap<NodeId, NodeCurves> = HashMap::new();
    let mut stop = 0.0f32;

    for channel in animation.channels() {
        let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));
        let (Some(inputs), Some(outputs)) = (reader.read_inputs(), reader.read_outputs()) else {
            continue;
        };
        let times: Vec<f32> = inputs.collect();
        stop = times.iter().copied().fold(stop, f32::max);
        let cubic =
            channel.sampler().interpolation() == gltf::animation::Interpolation::CubicSpline;

        let node = arena_id(channel.target().node().index());
        let entry = curves.entry(node).or_insert_with(|| NodeCurves {
            node,
            ..Default::default()
        });

        match outputs {
            ReadOutputs::Translations(values) => {
                entry.translation = keyframes(&times, values.map(Vec3::from_array), cubic);
            }
            ReadOutputs::Rotations(values) => {
                let euler = values.into_f32().map(|q| {
                    RotationOrder::Xyz.euler_from_quat(Quat::from_array(q))
                });
                entry.rotation = keyframes(&times, euler, cubic);
                unwrap_degrees(&mut entry.rotation);
            }
            ReadOutputs::Scales(values) => {
                entry.scale = keyframes(&times, values.map(Vec3::from_array), cubic);
            }
            ReadOutputs::MorphTargetWeights(_) => {}
        }
    }

    let mut curves: Vec<NodeCurves> = curves.into_values().collect();
    curves.sort_by_key(|c| c.node);

    AnimStack {
        name,
        start: 0.0,
        stop,
        curves,
    }
}

/// Pair key times with values; cubic-spline outputs are
/// `(in-tangent, value, out-tangent)` triplets
fn keyframes(times: &[f32], values: impl Iterator<Item = Vec3>, cubic: bool) -> Vec<Keyframe> {
    let values: Vec<Vec3> = if cubic {
        values.skip(1).step_by(3).collect()
    } else {
        values.collect()
    };
    times
        .iter()
        .zip(values)
        .map(|(&time, value)| Keyframe { time, value })
        .collect()
}

/// Shift each Euler component by whole turns so that consecutive keys differ
/// by at most 180 degrees. Quaternion-to-Euler conversion wraps at +-180, and
/// the curves are interpolated component-wise.
fn unwrap_degrees(keys: &mut [Keyframe]) {
    for i in 1..keys.len() {
        let previous = keys[i - 1].value;
        let value = &mut keys[i].value;
        for axis in 0..3 {
            let turns = ((value[axis] - previous[axis]) / 360.0).round();
            value[axis] -= turns * 360.0;
        }
    }
}
