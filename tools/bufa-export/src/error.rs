//! Integrity faults raised by the export pipeline
//!
//! Each fault is fatal for the buffer it affects and names the offending
//! node or clip. I/O and loader faults are not represented here; they
//! travel as `anyhow::Error` and abort the whole run.

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(
        "Mesh '{node}': control point {control_point} references joint {joint}, but the skeleton has {joint_count} joints"
    )]
    JointIndexOutOfRange {
        node: String,
        control_point: u32,
        joint: u32,
        joint_count: usize,
    },

    #[error(
        "Mesh '{node}': cluster {cluster} references control point {control_point}, but the mesh has {control_point_count}"
    )]
    ControlPointOutOfRange {
        node: String,
        cluster: usize,
        control_point: u32,
        control_point_count: usize,
    },

    #[error(
        "Mesh '{node}': cluster {cluster} has {indices} control point indices but {weights} weights"
    )]
    ClusterWeightMismatch {
        node: String,
        cluster: usize,
        indices: usize,
        weights: usize,
    },

    #[error("Mesh '{node}': cluster {cluster} links node '{link}', which is not a skeleton joint")]
    UnboundCluster {
        node: String,
        cluster: usize,
        link: String,
    },

    #[error("Mesh '{node}': {attribute} lookup resolved to index {index}, but the layer holds {len}")]
    AttributeOutOfRange {
        node: String,
        attribute: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Mesh '{node}': no {attribute} layer (generate it before export)")]
    MissingAttribute {
        node: String,
        attribute: &'static str,
    },

    #[error("Mesh '{node}': polygon {polygon} has {vertex_count} vertices (triangulate before export)")]
    NotTriangulated {
        node: String,
        polygon: usize,
        vertex_count: usize,
    },

    #[error("{subject}: no skin deformer found on any mesh")]
    MissingSkinDeformer { subject: String },

    #[error("Scene has no skeleton nodes")]
    EmptySkeleton,

    #[error("Animation clip '{clip}' has no clusters to sample")]
    NoClusters { clip: String },

    #[error("Animation clip '{clip}' has an empty frame range ({start}..={end})")]
    EmptyClip { clip: String, start: i64, end: i64 },
}
