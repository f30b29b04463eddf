//! Attribute resolution
//!
//! Normals, tangents and texture coordinates may each be stored per control
//! point or per polygon corner, and read either directly or through an index
//! array. Every combination reduces to one [`IndexStrategy`]; resolving a
//! corner is a pure function of the layer and the corner.

use crate::scene::{LayerElement, MappingMode, ReferenceMode};

/// One corner of a triangle in a triangulated mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PolygonCorner {
    pub triangle: usize,
    /// Corner within the triangle (0..3)
    pub corner: usize,
}

impl PolygonCorner {
    pub const fn new(triangle: usize, corner: usize) -> Self {
        Self { triangle, corner }
    }

    /// Running polygon-vertex index (`3 * triangle + corner`)
    pub const fn flat_index(self) -> usize {
        3 * self.triangle + self.corner
    }
}

/// How a corner is turned into a direct-array index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexStrategy {
    /// `direct[control_point]`
    ControlPoint,
    /// `direct[index[control_point]]`
    ControlPointIndirect,
    /// `direct[3 * triangle + corner]`
    PolygonVertex,
    /// `direct[index[3 * triangle + corner]]`
    PolygonVertexIndirect,
}

impl IndexStrategy {
    pub const fn select(mapping: MappingMode, reference: ReferenceMode) -> Self {
        match (mapping, reference) {
            (MappingMode::ByControlPoint, ReferenceMode::Direct) => IndexStrategy::ControlPoint,
            (MappingMode::ByControlPoint, ReferenceMode::IndexToDirect) => {
                IndexStrategy::ControlPointIndirect
            }
            (MappingMode::ByPolygonVertex, ReferenceMode::Direct) => IndexStrategy::PolygonVertex,
            (MappingMode::ByPolygonVertex, ReferenceMode::IndexToDirect) => {
                IndexStrategy::PolygonVertexIndirect
            }
        }
    }

    pub fn of<T>(layer: &LayerElement<T>) -> Self {
        Self::select(layer.mapping, layer.reference)
    }

    /// Position used to address the layer, before any indirection
    pub const fn address(self, corner: PolygonCorner, control_point: u32) -> usize {
        match self {
            IndexStrategy::ControlPoint | IndexStrategy::ControlPointIndirect => {
                control_point as usize
            }
            IndexStrategy::PolygonVertex | IndexStrategy::PolygonVertexIndirect => {
                corner.flat_index()
            }
        }
    }

    pub const fn is_indirect(self) -> bool {
        matches!(
            self,
            IndexStrategy::ControlPointIndirect | IndexStrategy::PolygonVertexIndirect
        )
    }
}

/// Index into `layer.direct` for one corner
///
/// Returns `None` when the index array does not cover the addressed position.
/// The returned index is not checked against `layer.direct`.
pub fn resolve_index<T>(
    layer: &LayerElement<T>,
    corner: PolygonCorner,
    control_point: u32,
) -> Option<usize> {
    let strategy = IndexStrategy::of(layer);
    let address = strategy.address(corner, control_point);
    if strategy.is_indirect() {
        layer.index.get(address).map(|&i| i as usize)
    } else {
        Some(address)
    }
}

/// Result of fetching a value for one corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    /// Resolved index (or index-array position) outside the layer
    OutOfRange { index: usize, len: usize },
}

/// Fetch the attribute value for one corner
pub fn fetch<T: Copy>(layer: &LayerElement<T>, corner: PolygonCorner, control_point: u32) -> Lookup<T> {
    let strategy = IndexStrategy::of(layer);
    let Some(index) = resolve_index(layer, corner, control_point) else {
        return Lookup::OutOfRange {
            index: strategy.address(corner, control_point),
            len: layer.index.len(),
        };
    };
    match layer.direct.get(index) {
        Some(&value) => Lookup::Found(value),
        None => Lookup::OutOfRange {
            index,
            len: layer.direct.len(),
        },
    }
}
