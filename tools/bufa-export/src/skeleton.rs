//! Skeleton hierarchy and bind pose
//!
//! Joints are collected with an explicit-stack depth-first walk from the scene
//! root, so a joint's parent always precedes it. Several skeleton roots are
//! flattened into one list in scene order.

use glam::{Mat4, Quat, Vec3};
use hashbrown::{HashMap, HashSet};

use crate::convert::CoordinateConversion;
use crate::error::ExportError;
use crate::scene::{NodeId, Scene, SkinDeformer, ROOT_NODE};
use crate::transform::Trs;

/// Scale values closer to zero than this cannot be inverted
const MIN_ROOT_SCALE: f32 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    /// Index of the parent joint, -1 for a root
    pub parent: i32,
    /// Scene node carrying the joint
    pub node: NodeId,
}

/// Depth-first ordered joint list
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    joints: Vec<Joint>,
    by_node: HashMap<NodeId, u32>,
}

/// Joint index of every cluster of a skin deformer
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterBinding {
    pub cluster_joints: Vec<u32>,
    pub joint_count: usize,
}

/// Local bind transform of one joint in target space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointBind {
    pub rotation: Quat,
    pub translation: Vec3,
    /// Skeletal uniform scale factor
    pub scale: f32,
}

impl JointBind {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), self.rotation, self.translation)
    }
}

impl Skeleton {
    /// Collect every skeleton node of the scene
    ///
    /// Non-skeleton nodes are skipped; their skeleton descendants attach to
    /// the nearest skeleton ancestor (or become roots).
    pub fn from_scene(scene: &Scene) -> Self {
        let mut joints = Vec::new();
        let mut by_node = HashMap::new();
        let mut names = HashSet::new();

        let mut stack: Vec<(NodeId, i32)> = vec![(ROOT_NODE, -1)];
        while let Some((id, parent)) = stack.pop() {
            let node = scene.node(id);
            let mut child_parent = parent;
            if node.is_skeleton {
                let index = joints.len();
                by_node.insert(id, index as u32);
                joints.push(Joint {
                    name: unique_name(&mut names, &node.name, index),
                    parent,
                    node: id,
                });
                child_parent = index as i32;
            }
            // Reverse so the first child is visited first
            for &child in node.children.iter().rev() {
                stack.push((child, child_parent));
            }
        }

        tracing::debug!("Skeleton: {} joints", joints.len());
        Self { joints, by_node }
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn joint_index(&self, node: NodeId) -> Option<u32> {
        self.by_node.get(&node).copied()
    }

    /// Bind each cluster of `skin` to a joint index
    ///
    /// Without any skeleton nodes the cluster index is the joint index.
    pub fn bind_clusters(
        &self,
        scene: &Scene,
        mesh_name: &str,
        skin: &SkinDeformer,
    ) -> Result<ClusterBinding, ExportError> {
        if self.is_empty() {
            return Ok(ClusterBinding {
                cluster_joints: (0..skin.clusters.len() as u32).collect(),
                joint_count: skin.clusters.len(),
            });
        }

        let cluster_joints = skin
            .clusters
            .iter()
            .enumerate()
            .map(|(c, cluster)| {
                self.joint_index(cluster.link)
                    .ok_or_else(|| ExportError::UnboundCluster {
                        node: mesh_name.to_string(),
                        cluster: c,
                        link: scene.node(cluster.link).name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ClusterBinding {
            cluster_joints,
            joint_count: self.len(),
        })
    }

    /// Skeletal uniform scale: inverse of the first joint's rest scale x
    pub fn scale_factor(&self, scene: &Scene) -> f32 {
        let Some(root) = self.joints.first() else {
            return 1.0;
        };
        let scale = scene.node(root.node).transform.scale.x;
        if scale.abs() < MIN_ROOT_SCALE {
            tracing::warn!(
                "Joint '{}' has zero rest scale, using a skeletal scale of 1",
                root.name
            );
            return 1.0;
        }
        1.0 / scale
    }

    /// Bind transform of every joint from the clusters linking it
    ///
    /// A joint no cluster links to binds at its global rest transform.
    pub fn bind_pose(
        &self,
        scene: &Scene,
        skin: &SkinDeformer,
        conversion: &CoordinateConversion,
    ) -> Result<Vec<JointBind>, ExportError> {
        if self.is_empty() {
            return Err(ExportError::EmptySkeleton);
        }
        let factor = self.scale_factor(scene);

        Ok(self
            .joints
            .iter()
            .map(|joint| {
                let (transform, transform_link) =
                    match skin.clusters.iter().find(|c| c.link == joint.node) {
                        Some(cluster) => (cluster.transform, cluster.transform_link),
                        None => {
                            tracing::debug!("Joint '{}' has no cluster, using rest pose", joint.name);
                            (Mat4::IDENTITY, scene.global_rest_transform(joint.node))
                        }
                    };

                let trs = Trs::decompose(transform * transform_link.inverse());
                JointBind {
                    rotation: conversion.rotation(trs.rotation),
                    translation: conversion.translation(trs.translation) * factor,
                    scale: factor,
                }
            })
            .collect())
    }
}

/// Joint names must be unique; a repeated name gets the joint index appended
fn unique_name(taken: &mut HashSet<String>, name: &str, index: usize) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }
    let mut candidate = format!("{}_{}", name, index);
    let mut n = 1;
    while !taken.insert(candidate.clone()) {
        candidate = format!("{}_{}_{}", name, index, n);
        n += 1;
    }
    tracing::warn!(
        "Duplicate joint name '{}' (joint {}), exporting it as '{}'",
        name,
        index,
        candidate
    );
    candidate
}
