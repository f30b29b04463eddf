//! Vertex expansion (scene mesh -> per-corner vertex records)
//!
//! Every triangle corner becomes its own output vertex; nothing is shared or
//! deduplicated. Records are built in authoring space, converted in place,
//! then handed to the buffer writers.

use crate::attribute::{fetch, Lookup, PolygonCorner};
use crate::convert::CoordinateConversion;
use crate::error::ExportError;
use crate::scene::{LayerElement, MeshData};
use crate::skin::{Influence, SkinWeights, MAX_INFLUENCES};

/// One output vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexRecord {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    /// Missing when the mesh has no UV layer or the lookup falls outside it
    pub tex_coord: Option<[f32; 2]>,
    pub influences: [Influence; MAX_INFLUENCES],
}

/// Expanded vertices and triangles of one mesh
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBuffers {
    pub vertices: Vec<VertexRecord>,
    /// Corner indices per triangle
    pub triangles: Vec<[u32; 3]>,
}

impl MeshBuffers {
    /// Triangle `i` references vertices `3i, 3i + 1, 3i + 2`
    pub fn from_records(vertices: Vec<VertexRecord>) -> Self {
        let triangles = (0..vertices.len() as u32 / 3)
            .map(|i| [3 * i, 3 * i + 1, 3 * i + 2])
            .collect();
        Self {
            vertices,
            triangles,
        }
    }

    /// Mirror, rescale and reverse winding in one step
    pub fn apply_conversion(&mut self, conversion: &CoordinateConversion) {
        for vertex in &mut self.vertices {
            vertex.position = conversion.position(vertex.position);
            vertex.normal = conversion.direction(vertex.normal);
            vertex.tangent = conversion.direction(vertex.tangent);
        }
        for triangle in &mut self.triangles {
            *triangle = conversion.winding(*triangle);
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

/// Build one record per triangle corner
///
/// The mesh must be triangulated and carry normal and tangent layers.
pub fn build_vertex_records(
    mesh_name: &str,
    mesh: &MeshData,
    weights: &SkinWeights,
) -> Result<Vec<VertexRecord>, ExportError> {
    let normals = mesh.normals.as_ref().ok_or_else(|| ExportError::MissingAttribute {
        node: mesh_name.to_string(),
        attribute: "normal",
    })?;
    let tangents = mesh.tangents.as_ref().ok_or_else(|| ExportError::MissingAttribute {
        node: mesh_name.to_string(),
        attribute: "tangent",
    })?;

    let mut records = Vec::with_capacity(mesh.polygons.len() * 3);
    let mut missing_uvs = 0usize;

    for (t, polygon) in mesh.polygons.iter().enumerate() {
        if polygon.len() != 3 {
            return Err(ExportError::NotTriangulated {
                node: mesh_name.to_string(),
                polygon: t,
                vertex_count: polygon.len(),
            });
        }

        for (j, &control_point) in polygon.iter().enumerate() {
            let corner = PolygonCorner::new(t, j);
            let position = mesh
                .control_points
                .get(control_point as usize)
                .copied()
                .ok_or_else(|| ExportError::AttributeOutOfRange {
                    node: mesh_name.to_string(),
                    attribute: "position",
                    index: control_point as usize,
                    len: mesh.control_points.len(),
                })?;

            let tex_coord = match mesh.uvs.as_ref().map(|uvs| fetch(uvs, corner, control_point)) {
                Some(Lookup::Found(uv)) => Some(uv),
                _ => {
                    missing_uvs += 1;
                    None
                }
            };

            records.push(VertexRecord {
                position,
                normal: required(mesh_name, "normal", normals, corner, control_point)?,
                tangent: required(mesh_name, "tangent", tangents, corner, control_point)?,
                tex_coord,
                influences: weights.get(control_point),
            });
        }
    }

    if missing_uvs > 0 {
        tracing::warn!(
            "Mesh '{}': {} of {} corners have no texture coordinate, writing (0, 0)",
            mesh_name,
            missing_uvs,
            records.len()
        );
    }

    Ok(records)
}

fn required(
    mesh_name: &str,
    attribute: &'static str,
    layer: &LayerElement<[f32; 3]>,
    corner: PolygonCorner,
    control_point: u32,
) -> Result<[f32; 3], ExportError> {
    match fetch(layer, corner, control_point) {
        Lookup::Found(value) => Ok(value),
        Lookup::OutOfRange { index, len } => Err(ExportError::AttributeOutOfRange {
            node: mesh_name.to_string(),
            attribute,
            index,
            len,
        }),
    }
}
