//! Mesh preparation: triangulation and missing normal/tangent layers
//!
//! Runs before export so that every mesh reaching the pipeline is made of
//! triangles and carries normal and tangent layers. UV layers are never
//! synthesized.

use glam::{Vec2, Vec3};

use super::{LayerElement, MappingMode, MeshData, ReferenceMode, Scene};
use crate::attribute::{fetch, Lookup, PolygonCorner};

/// Triangulate, then generate normals and tangents where missing
pub fn prepare_scene(scene: &mut Scene) {
    for node in &mut scene.nodes {
        let name = node.name.clone();
        let Some(mesh) = node.mesh.as_mut() else {
            continue;
        };

        if !mesh.is_triangulated() {
            tracing::info!("Triangulating mesh '{}'", name);
            triangulate(mesh);
        }
        if mesh.normals.is_none() {
            tracing::info!("Generating normals for mesh '{}'", name);
            mesh.normals = Some(generate_normals(mesh));
        }
        if mesh.tangents.is_none() {
            tracing::info!("Generating tangents for mesh '{}'", name);
            mesh.tangents = Some(generate_tangents(mesh));
        }
    }
}

/// Fan-triangulate every polygon in place
///
/// Polygon-vertex layers are remapped so each new corner still reads the
/// value of the corner it came from. Polygons with fewer than three vertices
/// are dropped.
pub fn triangulate(mesh: &mut MeshData) {
    let mut polygons = Vec::with_capacity(mesh.polygons.len());
    // Source corner (flat polygon-vertex index) of every new corner
    let mut corner_source = Vec::with_capacity(mesh.polygon_vertex_count());
    let mut offset = 0usize;

    for (i, polygon) in mesh.polygons.iter().enumerate() {
        let n = polygon.len();
        if n < 3 {
            tracing::warn!("Dropping degenerate polygon {} ({} vertices)", i, n);
        } else {
            for k in 1..n - 1 {
                polygons.push(vec![polygon[0], polygon[k], polygon[k + 1]]);
                corner_source.extend([offset, offset + k, offset + k + 1]);
            }
        }
        offset += n;
    }

    mesh.polygons = polygons;
    if let Some(layer) = mesh.normals.as_mut() {
        remap_corners(layer, &corner_source);
    }
    if let Some(layer) = mesh.tangents.as_mut() {
        remap_corners(layer, &corner_source);
    }
    if let Some(layer) = mesh.uvs.as_mut() {
        remap_corners(layer, &corner_source);
    }
}

fn remap_corners<T>(layer: &mut LayerElement<T>, corner_source: &[usize]) {
    if layer.mapping != MappingMode::ByPolygonVertex {
        return;
    }
    layer.index = match layer.reference {
        ReferenceMode::Direct => corner_source.iter().map(|&c| c as u32).collect(),
        ReferenceMode::IndexToDirect => corner_source
            .iter()
            .map(|&c| layer.index.get(c).copied().unwrap_or(u32::MAX))
            .collect(),
    };
    layer.reference = ReferenceMode::IndexToDirect;
}

fn triangle_positions(mesh: &MeshData, polygon: &[u32]) -> Option<[Vec3; 3]> {
    let p = |i: usize| {
        mesh.control_points
            .get(polygon[i] as usize)
            .map(|&v| Vec3::from_array(v))
    };
    Some([p(0)?, p(1)?, p(2)?])
}

/// Area-weighted smooth normals, one per control point
pub fn generate_normals(mesh: &MeshData) -> LayerElement<[f32; 3]> {
    let mut accum = vec![Vec3::ZERO; mesh.control_points.len()];
    for polygon in mesh.polygons.iter().filter(|p| p.len() == 3) {
        let Some([a, b, c]) = triangle_positions(mesh, polygon) else {
            continue;
        };
        // Cross product length is twice the area
        let face = (b - a).cross(c - a);
        for &v in polygon {
            accum[v as usize] += face;
        }
    }

    let direct = accum
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Z).to_array())
        .collect();
    LayerElement::by_control_point(direct)
}

/// Per-corner tangents from the UV layer, orthogonalized against the normal
///
/// Without usable UVs the tangent is any unit vector perpendicular to the
/// normal.
pub fn generate_tangents(mesh: &MeshData) -> LayerElement<[f32; 3]> {
    let mut direct = Vec::with_capacity(mesh.polygons.len() * 3);

    for (t, polygon) in mesh.polygons.iter().enumerate() {
        if polygon.len() != 3 {
            continue;
        }
        let positions = triangle_positions(mesh, polygon);
        let face_normal = positions
            .and_then(|[a, b, c]| (b - a).cross(c - a).try_normalize())
            .unwrap_or(Vec3::Z);

        let from_uvs = match (positions, mesh.uvs.as_ref()) {
            (Some(p), Some(uvs)) => {
                let uv = |j: usize| match fetch(uvs, PolygonCorner::new(t, j), polygon[j]) {
                    Lookup::Found(v) => Some(Vec2::from_array(v)),
                    Lookup::OutOfRange { .. } => None,
                };
                match (uv(0), uv(1), uv(2)) {
                    (Some(w0), Some(w1), Some(w2)) => uv_tangent(p, [w0, w1, w2]),
                    _ => None,
                }
            }
            _ => None,
        };

        for (j, &v) in polygon.iter().enumerate() {
            let normal = mesh
                .normals
                .as_ref()
                .and_then(|normals| match fetch(normals, PolygonCorner::new(t, j), v) {
                    Lookup::Found(n) => Vec3::from_array(n).try_normalize(),
                    Lookup::OutOfRange { .. } => None,
                })
                .unwrap_or(face_normal);

            let tangent = from_uvs
                .and_then(|tan| (tan - normal * normal.dot(tan)).try_normalize())
                .unwrap_or_else(|| normal.any_orthonormal_vector());
            direct.push(tangent.to_array());
        }
    }

    LayerElement::by_polygon_vertex(direct)
}

fn uv_tangent(p: [Vec3; 3], w: [Vec2; 3]) -> Option<Vec3> {
    let e1 = p[1] - p[0];
    let e2 = p[2] - p[0];
    let d1 = w[1] - w[0];
    let d2 = w[2] - w[0];
    let det = d1.x * d2.y - d2.x * d1.y;
    if det.abs() < f32::EPSILON {
        return None;
    }
    ((e1 * d2.y - e2 * d1.y) / det).try_normalize()
}
