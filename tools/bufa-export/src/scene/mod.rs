//! Scene access layer
//!
//! An authoring-tool style scene graph: an arena of nodes (index 0 is the
//! root), meshes with per-layer mapping/reference modes, skin deformers made
//! of clusters, and animation stacks with per-node curves. Loaders fill it
//! from JSON scene documents or glTF files; [`utils`] triangulates and
//! synthesizes missing normal/tangent layers before export.
//!
//! The export pipeline only reads from a `Scene`.

mod document;
mod gltf_import;
pub mod utils;

use anyhow::{bail, Context, Result};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::convert::DEFAULT_UNIT_SCALE;
use crate::transform::RotationOrder;

pub use document::{load_scene_document, save_scene_document};
pub use gltf_import::import_gltf;

/// Index of a node in [`Scene::nodes`]
pub type NodeId = usize;

/// Node id of the scene root
pub const ROOT_NODE: NodeId = 0;

/// How an attribute layer is addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingMode {
    /// One value per control point
    #[default]
    ByControlPoint,
    /// One value per polygon corner
    ByPolygonVertex,
}

/// Whether an attribute value is read directly or through the index array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceMode {
    #[default]
    Direct,
    IndexToDirect,
}

/// One attribute layer (normals, tangents or texture coordinates)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerElement<T> {
    #[serde(default)]
    pub mapping: MappingMode,
    #[serde(default)]
    pub reference: ReferenceMode,
    /// Direct value array
    pub direct: Vec<T>,
    /// Auxiliary index array (only read for `IndexToDirect`)
    #[serde(default)]
    pub index: Vec<u32>,
}

impl<T> LayerElement<T> {
    pub fn new(mapping: MappingMode, reference: ReferenceMode, direct: Vec<T>, index: Vec<u32>) -> Self {
        Self {
            mapping,
            reference,
            direct,
            index,
        }
    }

    /// Layer with one value per control point, read directly
    pub fn by_control_point(direct: Vec<T>) -> Self {
        Self::new(MappingMode::ByControlPoint, ReferenceMode::Direct, direct, Vec::new())
    }

    /// Layer with one value per polygon corner, read directly
    pub fn by_polygon_vertex(direct: Vec<T>) -> Self {
        Self::new(MappingMode::ByPolygonVertex, ReferenceMode::Direct, direct, Vec::new())
    }
}

/// One joint's influence over a mesh's control points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Joint node driving this cluster
    pub link: NodeId,
    pub control_point_indices: Vec<u32>,
    pub weights: Vec<f32>,
    /// Mesh global transform at bind time
    #[serde(default = "identity")]
    pub transform: Mat4,
    /// Joint global transform at bind time
    #[serde(default = "identity")]
    pub transform_link: Mat4,
}

fn identity() -> Mat4 {
    Mat4::IDENTITY
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkinDeformer {
    pub clusters: Vec<Cluster>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub control_points: Vec<[f32; 3]>,
    /// Control point indices per polygon, any vertex count before triangulation
    pub polygons: Vec<Vec<u32>>,
    #[serde(default)]
    pub normals: Option<LayerElement<[f32; 3]>>,
    #[serde(default)]
    pub tangents: Option<LayerElement<[f32; 3]>>,
    #[serde(default)]
    pub uvs: Option<LayerElement<[f32; 2]>>,
    #[serde(default)]
    pub skin: Option<SkinDeformer>,
}

impl MeshData {
    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn control_point_count(&self) -> usize {
        self.control_points.len()
    }

    /// Total number of polygon corners
    pub fn polygon_vertex_count(&self) -> usize {
        self.polygons.iter().map(Vec::len).sum()
    }

    pub fn is_triangulated(&self) -> bool {
        self.polygons.iter().all(|p| p.len() == 3)
    }
}

/// Surface type of a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadingModel {
    /// Diffuse only, no specular or shininess properties
    Lambert,
    #[default]
    Phong,
}

/// Texture connected to a material channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureRef {
    /// Material property name (e.g., "DiffuseColor")
    pub channel: String,
    /// Texture path as authored
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    #[serde(default)]
    pub shading: ShadingModel,
    #[serde(default)]
    pub emissive: [f32; 3],
    #[serde(default = "default_diffuse")]
    pub diffuse: [f32; 3],
    #[serde(default)]
    pub specular: [f32; 3],
    #[serde(default = "default_shininess")]
    pub shininess: f32,
    #[serde(default)]
    pub textures: Vec<TextureRef>,
}

fn default_diffuse() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn default_shininess() -> f32 {
    1.0
}

/// Local transform of a node at rest or at one sampled time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalTransform {
    pub translation: Vec3,
    /// Euler angles in degrees, applied in the node's rotation order
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl LocalTransform {
    /// `T * R * S`
    pub fn to_matrix(&self, order: RotationOrder) -> Mat4 {
        Mat4::from_translation(self.translation)
            * Mat4::from_mat3(order.euler_to_mat3(self.rotation))
            * Mat4::from_scale(self.scale)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub children: Vec<NodeId>,
    #[serde(default)]
    pub transform: LocalTransform,
    #[serde(default)]
    pub rotation_order: RotationOrder,
    #[serde(default)]
    pub mesh: Option<MeshData>,
    /// Node carries a skeleton (joint) attribute
    #[serde(default)]
    pub is_skeleton: bool,
    #[serde(default)]
    pub material: Option<Material>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Time in seconds
    pub time: f32,
    pub value: Vec3,
}

/// Keyed channels of one node within one animation stack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeCurves {
    pub node: NodeId,
    #[serde(default)]
    pub translation: Vec<Keyframe>,
    /// Euler degrees in the node's rotation order
    #[serde(default)]
    pub rotation: Vec<Keyframe>,
    #[serde(default)]
    pub scale: Vec<Keyframe>,
}

/// Animation clip
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimStack {
    pub name: String,
    /// Local time span start, seconds
    pub start: f32,
    /// Local time span stop, seconds
    pub stop: f32,
    #[serde(default)]
    pub curves: Vec<NodeCurves>,
}

impl AnimStack {
    pub fn curves_for(&self, node: NodeId) -> Option<&NodeCurves> {
        self.curves.iter().find(|c| c.node == node)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Node arena, `nodes[ROOT_NODE]` is the root
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub anim_stacks: Vec<AnimStack>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            nodes: vec![Node::new("RootNode")],
            anim_stacks: Vec::new(),
        }
    }
}

impl Scene {
    pub fn root(&self) -> &Node {
        &self.nodes[ROOT_NODE]
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    /// Append a node under `parent` and return its id
    pub fn add_node(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        self.nodes[parent].children.push(id);
        id
    }

    /// Parent of every node (`None` for the root and unreachable nodes)
    pub fn parents(&self) -> Vec<Option<NodeId>> {
        let mut parents = vec![None; self.nodes.len()];
        for (id, node) in self.nodes.iter().enumerate() {
            for &child in &node.children {
                parents[child] = Some(id);
            }
        }
        parents
    }

    /// Global transform of a node in its rest pose
    pub fn global_rest_transform(&self, id: NodeId) -> Mat4 {
        let parents = self.parents();
        let mut transform = Mat4::IDENTITY;
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self.nodes[node_id];
            transform = node.transform.to_matrix(node.rotation_order) * transform;
            current = parents[node_id];
        }
        transform
    }

    /// Evaluate a node's local transform at `time` seconds in `stack`
    ///
    /// Channels without keys keep the node's rest value.
    pub fn evaluate_local_transform(
        &self,
        id: NodeId,
        stack: Option<&AnimStack>,
        time: f32,
    ) -> LocalTransform {
        let rest = self.nodes[id].transform;
        let Some(curves) = stack.and_then(|s| s.curves_for(id)) else {
            return rest;
        };
        LocalTransform {
            translation: sample_curve(&curves.translation, time).unwrap_or(rest.translation),
            rotation: sample_curve(&curves.rotation, time).unwrap_or(rest.rotation),
            scale: sample_curve(&curves.scale, time).unwrap_or(rest.scale),
        }
    }

    /// First mesh node (in depth-first order) carrying a skin deformer
    pub fn first_skin(&self) -> Option<(NodeId, &SkinDeformer)> {
        self.depth_first()
            .into_iter()
            .find_map(|id| Some((id, self.nodes[id].mesh.as_ref()?.skin.as_ref()?)))
    }

    /// All reachable node ids in depth-first pre-order
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![ROOT_NODE];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        order
    }

    /// Check that the node arena forms a tree rooted at [`ROOT_NODE`] and
    /// that clusters and curves reference existing nodes
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            bail!("Scene has no root node");
        }
        let mut seen = vec![false; self.nodes.len()];
        seen[ROOT_NODE] = true;
        for (id, node) in self.nodes.iter().enumerate() {
            for &child in &node.children {
                if child >= self.nodes.len() {
                    bail!("Node '{}' has child {} out of range", node.name, child);
                }
                if child == ROOT_NODE || seen[child] {
                    bail!(
                        "Node {} ('{}') is referenced more than once (scene must be a tree)",
                        child,
                        self.nodes[child].name
                    );
                }
                seen[child] = true;
            }
            if let Some(skin) = node.mesh.as_ref().and_then(|m| m.skin.as_ref()) {
                for (i, cluster) in skin.clusters.iter().enumerate() {
                    if cluster.link >= self.nodes.len() {
                        bail!(
                            "Mesh '{}' (node {}): cluster {} links missing node {}",
                            node.name,
                            id,
                            i,
                            cluster.link
                        );
                    }
                }
            }
        }
        for stack in &self.anim_stacks {
            for curves in &stack.curves {
                if curves.node >= self.nodes.len() {
                    bail!(
                        "Animation '{}' animates missing node {}",
                        stack.name,
                        curves.node
                    );
                }
            }
        }
        Ok(())
    }
}

/// Linear interpolation between keys, clamped at both ends
fn sample_curve(keys: &[Keyframe], time: f32) -> Option<Vec3> {
    let first = keys.first()?;
    let last = keys.last()?;
    if time <= first.time {
        return Some(first.value);
    }
    if time >= last.time {
        return Some(last.value);
    }

    let next = keys.partition_point(|k| k.time <= time);
    let (k0, k1) = (&keys[next - 1], &keys[next]);
    let span = k1.time - k0.time;
    let factor = if span > 0.0 {
        ((time - k0.time) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    Some(k0.value.lerp(k1.value, factor))
}

/// glTF stores meters, which are already target units
pub const GLTF_UNIT_SCALE: f32 = 1.0;

fn scene_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default()
}

/// Unit scale matching the loader `path` dispatches to, used when neither
/// the command line nor the manifest sets one
pub fn default_unit_scale(path: &Path) -> f32 {
    match scene_extension(path).as_str() {
        "gltf" | "glb" => GLTF_UNIT_SCALE,
        _ => DEFAULT_UNIT_SCALE,
    }
}

/// Load a scene by extension (`.json`, `.gltf`, `.glb`)
pub fn load_scene(path: &Path) -> Result<Scene> {
    let ext = scene_extension(path);

    let scene = match ext.as_str() {
        "json" => load_scene_document(path)?,
        "gltf" | "glb" => import_gltf(path)?,
        _ => bail!(
            "Unsupported scene format: {:?} (use .json, .gltf, or .glb)",
            path
        ),
    };
    scene
        .validate()
        .with_context(|| format!("Invalid scene: {:?}", path))?;
    Ok(scene)
}
