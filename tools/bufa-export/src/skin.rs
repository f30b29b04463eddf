//! Skin weight normalization
//!
//! Gathers `(joint, weight)` influences per control point from a skin
//! deformer's clusters and reduces every list to exactly
//! [`MAX_INFLUENCES`] entries.

use crate::error::ExportError;
use crate::scene::SkinDeformer;

/// Influences stored per vertex
pub const MAX_INFLUENCES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Influence {
    pub joint: u32,
    pub weight: f32,
}

impl Influence {
    pub const NONE: Self = Self {
        joint: 0,
        weight: 0.0,
    };

    pub const fn new(joint: u32, weight: f32) -> Self {
        Self { joint, weight }
    }
}

/// Canonical influences of every control point of one mesh
#[derive(Debug, Clone, PartialEq)]
pub struct SkinWeights {
    influences: Vec<[Influence; MAX_INFLUENCES]>,
}

impl SkinWeights {
    /// All control points uninfluenced
    pub fn unskinned(control_point_count: usize) -> Self {
        Self {
            influences: vec![[Influence::NONE; MAX_INFLUENCES]; control_point_count],
        }
    }

    pub fn get(&self, control_point: u32) -> [Influence; MAX_INFLUENCES] {
        self.influences
            .get(control_point as usize)
            .copied()
            .unwrap_or([Influence::NONE; MAX_INFLUENCES])
    }

    pub fn len(&self) -> usize {
        self.influences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.influences.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[Influence; MAX_INFLUENCES]> {
        self.influences.iter()
    }
}

/// Build canonical weights for a mesh
///
/// `cluster_joints[c]` is the joint index bound to cluster `c`. Influences are
/// accumulated in cluster order, then in each cluster's control point order.
pub fn build_skin_weights(
    mesh_name: &str,
    control_point_count: usize,
    skin: &SkinDeformer,
    cluster_joints: &[u32],
    joint_count: usize,
) -> Result<SkinWeights, ExportError> {
    let mut lists: Vec<Vec<Influence>> = vec![Vec::new(); control_point_count];

    for (c, (cluster, &joint)) in skin.clusters.iter().zip(cluster_joints).enumerate() {
        if cluster.control_point_indices.len() != cluster.weights.len() {
            return Err(ExportError::ClusterWeightMismatch {
                node: mesh_name.to_string(),
                cluster: c,
                indices: cluster.control_point_indices.len(),
                weights: cluster.weights.len(),
            });
        }

        for (&control_point, &weight) in cluster.control_point_indices.iter().zip(&cluster.weights) {
            let Some(list) = lists.get_mut(control_point as usize) else {
                return Err(ExportError::ControlPointOutOfRange {
                    node: mesh_name.to_string(),
                    cluster: c,
                    control_point,
                    control_point_count,
                });
            };
            if joint as usize >= joint_count {
                return Err(ExportError::JointIndexOutOfRange {
                    node: mesh_name.to_string(),
                    control_point,
                    joint,
                    joint_count,
                });
            }
            list.push(Influence::new(joint, weight));
        }
    }

    let influences = lists.into_iter().map(canonicalize).collect();
    Ok(SkinWeights { influences })
}

/// Reduce an influence list to exactly [`MAX_INFLUENCES`] entries
///
/// Short lists are padded with `(0, 0.0)` as is. Long lists lose their
/// smallest weight (first occurrence on ties) one at a time, renormalizing
/// the rest to sum 1 after each removal.
pub fn canonicalize(mut list: Vec<Influence>) -> [Influence; MAX_INFLUENCES] {
    while list.len() > MAX_INFLUENCES {
        let mut smallest = 0;
        for (i, influence) in list.iter().enumerate().skip(1) {
            if influence.weight < list[smallest].weight {
                smallest = i;
            }
        }
        list.remove(smallest);

        let total: f32 = list.iter().map(|i| i.weight).sum();
        if total > 0.0 {
            for influence in &mut list {
                influence.weight /= total;
            }
        }
    }

    let mut out = [Influence::NONE; MAX_INFLUENCES];
    out[..list.len()].copy_from_slice(&list);
    out
}
