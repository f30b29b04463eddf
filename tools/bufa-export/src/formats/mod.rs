//! Text buffer formats (.bufa / .mate)
//!
//! Each writer emits one complete buffer: a tag line from
//! [`bufa_shared::BufferFormat`], a count line, then one line (or block) per
//! element. Floats use six decimals.

mod atomic;

pub use atomic::{write_atomic, BufferWriter};

use anyhow::Result;
use bufa_shared::buffer_format::{
    ANIMATION_FORMAT, INDEX_FORMAT, MATERIAL_FORMAT, NORMAL_FORMAT, POSITION_FORMAT,
    SKELETON_FORMAT, SKIN_WEIGHT_FORMAT, TANGENT_FORMAT, TEX_COORD_FORMAT,
};
use std::fmt;
use std::io::Write;

use crate::animation::AnimationClip;
use crate::mesh::VertexRecord;
use crate::scene::{Material, ShadingModel};
use crate::skeleton::{Joint, JointBind};

/// Material channel never written to material buffers
const AMBIENT_CHANNEL: &str = "AmbientColor";

/// Six-decimal float; negative zero prints as zero
struct F(f32);

impl fmt::Display for F {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = if self.0 == 0.0 { 0.0 } else { self.0 };
        write!(f, "{:.6}", v)
    }
}

fn write_vec3<W: Write>(w: &mut W, v: [f32; 3]) -> Result<()> {
    writeln!(w, "{} {} {}", F(v[0]), F(v[1]), F(v[2]))?;
    Ok(())
}

pub fn write_positions<W: Write>(w: &mut W, vertices: &[VertexRecord]) -> Result<()> {
    writeln!(w, "{}\n{}", POSITION_FORMAT.tag, vertices.len())?;
    for v in vertices {
        write_vec3(w, v.position)?;
    }
    Ok(())
}

/// Index buffer: corner count per primitive (3), triangle count, triangles
pub fn write_indices<W: Write>(w: &mut W, triangles: &[[u32; 3]]) -> Result<()> {
    writeln!(w, "{}\n3\n{}", INDEX_FORMAT.tag, triangles.len())?;
    for [a, b, c] in triangles {
        writeln!(w, "{} {} {}", a, b, c)?;
    }
    Ok(())
}

pub fn write_normals<W: Write>(w: &mut W, vertices: &[VertexRecord]) -> Result<()> {
    writeln!(w, "{}\n{}", NORMAL_FORMAT.tag, vertices.len())?;
    for v in vertices {
        write_vec3(w, v.normal)?;
    }
    Ok(())
}

pub fn write_tangents<W: Write>(w: &mut W, vertices: &[VertexRecord]) -> Result<()> {
    writeln!(w, "{}\n{}", TANGENT_FORMAT.tag, vertices.len())?;
    for v in vertices {
        write_vec3(w, v.tangent)?;
    }
    Ok(())
}

/// Texture coordinates with v flipped; missing coordinates write `0 0`
pub fn write_tex_coords<W: Write>(w: &mut W, vertices: &[VertexRecord]) -> Result<()> {
    writeln!(w, "{}\n{}", TEX_COORD_FORMAT.tag, vertices.len())?;
    for v in vertices {
        match v.tex_coord {
            Some([u, tv]) => writeln!(w, "{} {}", F(u), F(1.0 - tv))?,
            None => writeln!(w, "0 0")?,
        }
    }
    Ok(())
}

/// Four `joint weight` lines per vertex
pub fn write_skin_weights<W: Write>(w: &mut W, vertices: &[VertexRecord]) -> Result<()> {
    writeln!(w, "{}\n{}", SKIN_WEIGHT_FORMAT.tag, vertices.len())?;
    for v in vertices {
        for influence in &v.influences {
            writeln!(w, "{} {}", influence.joint, F(influence.weight))?;
        }
    }
    Ok(())
}

/// File name written for a texture: the path's last component, optionally
/// with its extension replaced
pub fn texture_file_name(path: &str, extension: Option<&str>) -> String {
    let base = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match extension {
        Some(ext) => {
            let stem = base.rsplit_once('.').map_or(base, |(stem, _)| stem);
            format!("{}.{}", stem, ext.trim_start_matches('.'))
        }
        None => base.to_string(),
    }
}

/// Material buffer
///
/// Lambert surfaces have no specular or shininess and write `0 0 0` and `1`.
pub fn write_material<W: Write>(
    w: &mut W,
    material: &Material,
    texture_extension: Option<&str>,
) -> Result<()> {
    writeln!(w, "{}", MATERIAL_FORMAT.tag)?;
    write_vec3(w, material.emissive)?;
    write_vec3(w, material.diffuse)?;
    match material.shading {
        ShadingModel::Phong => {
            write_vec3(w, material.specular)?;
            writeln!(w, "{}", F(material.shininess))?;
        }
        ShadingModel::Lambert => writeln!(w, "0 0 0\n1")?,
    }

    let textures: Vec<_> = material
        .textures
        .iter()
        .filter(|t| t.channel != AMBIENT_CHANNEL)
        .collect();
    writeln!(w, "{}", textures.len())?;
    for texture in textures {
        writeln!(w, "{}", texture.channel)?;
        writeln!(w, "{}", texture_file_name(&texture.file_name, texture_extension))?;
    }
    Ok(())
}

/// Skeleton buffer: per joint its name, 16 matrix values and parent index
///
/// Matrix values are row-major for row vectors (translation in the last row),
/// which is glam's column-major storage order.
pub fn write_skeleton<W: Write>(w: &mut W, joints: &[Joint], binds: &[JointBind]) -> Result<()> {
    writeln!(w, "{}\n{}", SKELETON_FORMAT.tag, joints.len())?;
    for (joint, bind) in joints.iter().zip(binds) {
        writeln!(w, "{}", joint.name)?;
        let values: Vec<String> = bind
            .matrix()
            .to_cols_array()
            .iter()
            .map(|v| F(*v).to_string())
            .collect();
        writeln!(w, "{}", values.join(" "))?;
        writeln!(w, "{}", joint.parent)?;
    }
    Ok(())
}

/// Animation buffer: clip header, then per joint its name followed by
/// rotation, translation and scale lines for every frame
pub fn write_animation<W: Write>(w: &mut W, clip: &AnimationClip) -> Result<()> {
    writeln!(w, "{}", ANIMATION_FORMAT.tag)?;
    writeln!(w, "{}", clip.name)?;
    writeln!(w, "{}", clip.tracks.len())?;
    writeln!(w, "{}", clip.frame_count())?;
    for track in &clip.tracks {
        writeln!(w, "{}", track.name)?;
        for sample in &track.samples {
            let [x, y, z, qw] = sample.rotation;
            writeln!(w, "{} {} {} {}", F(x), F(y), F(z), F(qw))?;
            write_vec3(w, sample.translation)?;
            writeln!(w, "{}", F(sample.scale))?;
        }
    }
    Ok(())
}
