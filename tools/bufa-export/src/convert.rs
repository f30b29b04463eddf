//! Coordinate system conversion
//!
//! The authoring tool is right-handed, the target renderer left-handed. The
//! two differ by a single mirrored axis, and authoring units differ from
//! target units by a constant ratio. Both live in one `CoordinateConversion`
//! value that every spatial component receives explicitly.
//!
//! Mirroring one axis flips triangle winding, so [`CoordinateConversion::winding`]
//! must always be applied together with the vector mirror.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Cartesian axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            other => Err(format!("unknown axis '{}' (expected x, y or z)", other)),
        }
    }
}

/// Authoring units are centimeters, target units meters
pub const DEFAULT_UNIT_SCALE: f32 = 0.01;

/// Authoring -> target coordinate convention
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateConversion {
    /// Axis negated to switch handedness
    pub mirror_axis: Axis,
    /// Factor applied to positions (authoring units -> target units)
    pub unit_scale: f32,
}

impl Default for CoordinateConversion {
    fn default() -> Self {
        Self {
            mirror_axis: Axis::X,
            unit_scale: DEFAULT_UNIT_SCALE,
        }
    }
}

impl CoordinateConversion {
    pub fn new(mirror_axis: Axis, unit_scale: f32) -> Self {
        Self {
            mirror_axis,
            unit_scale,
        }
    }

    /// Diagonal of the mirror matrix (-1 on the mirrored axis)
    pub fn mirror_signs(&self) -> Vec3 {
        let mut signs = Vec3::ONE;
        signs[self.mirror_axis.index()] = -1.0;
        signs
    }

    pub fn mirror_matrix(&self) -> Mat4 {
        Mat4::from_scale(self.mirror_signs())
    }

    /// Mirror and rescale a position
    pub fn position(&self, p: [f32; 3]) -> [f32; 3] {
        (Vec3::from_array(p) * self.mirror_signs() * self.unit_scale).to_array()
    }

    /// Mirror a normal or tangent
    pub fn direction(&self, d: [f32; 3]) -> [f32; 3] {
        (Vec3::from_array(d) * self.mirror_signs()).to_array()
    }

    /// Mirror a joint or animation translation (no unit scale)
    pub fn translation(&self, t: Vec3) -> Vec3 {
        t * self.mirror_signs()
    }

    /// Mirror Euler angles: the two angles about the non-mirrored axes flip sign
    pub fn euler(&self, degrees: Vec3) -> Vec3 {
        -degrees * self.mirror_signs()
    }

    /// Mirror a rotation: the two vector components of the non-mirrored axes
    /// flip sign, the mirrored axis component and `w` are kept
    pub fn rotation(&self, q: Quat) -> Quat {
        let v = -Vec3::new(q.x, q.y, q.z) * self.mirror_signs();
        Quat::from_xyzw(v.x, v.y, v.z, q.w)
    }

    /// Conjugate a full transform by the mirror: `S * M * S`
    pub fn matrix(&self, m: Mat4) -> Mat4 {
        let s = self.mirror_matrix();
        s * m * s
    }

    /// Reverse triangle winding: `(a, b, c) -> (a, c, b)`
    pub fn winding(&self, triangle: [u32; 3]) -> [u32; 3] {
        [triangle[0], triangle[2], triangle[1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::RotationOrder;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_default_mirrors_x_and_scales_to_meters() {
        let conv = CoordinateConversion::default();
        assert_eq!(conv.position([100.0, 200.0, -300.0]), [-1.0, 2.0, -3.0]);
        assert_eq!(conv.direction([0.5, 0.5, 0.0]), [-0.5, 0.5, 0.0]);
        assert_eq!(
            conv.translation(Vec3::new(3.0, 4.0, 5.0)),
            Vec3::new(-3.0, 4.0, 5.0)
        );
    }

    #[test]
    fn test_euler_keeps_mirrored_axis_angle() {
        let conv = CoordinateConversion::new(Axis::X, 1.0);
        assert_eq!(
            conv.euler(Vec3::new(10.0, 20.0, 30.0)),
            Vec3::new(10.0, -20.0, -30.0)
        );
        let conv = CoordinateConversion::new(Axis::Z, 1.0);
        assert_eq!(
            conv.euler(Vec3::new(10.0, 20.0, 30.0)),
            Vec3::new(-10.0, -20.0, 30.0)
        );
    }

    #[test]
    fn test_rotation_mirror_matches_matrix_conjugation() {
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let conv = CoordinateConversion::new(axis, 1.0);
            let q = RotationOrder::Xyz.euler_to_quat(Vec3::new(20.0, -35.0, 50.0));
            let mirrored = Mat4::from_quat(conv.rotation(q));
            let conjugated = conv.matrix(Mat4::from_quat(q));
            let (a, b) = (mirrored.to_cols_array(), conjugated.to_cols_array());
            for i in 0..16 {
                assert!((a[i] - b[i]).abs() < EPSILON, "{:?} element {}", axis, i);
            }
        }
    }

    #[test]
    fn test_euler_mirror_matches_quaternion_mirror() {
        let conv = CoordinateConversion::default();
        let angles = Vec3::new(15.0, 40.0, -70.0);
        for order in RotationOrder::ALL {
            let from_euler = order.euler_to_quat(conv.euler(angles));
            let from_quat = conv.rotation(order.euler_to_quat(angles));
            assert!(
                from_euler.dot(from_quat).abs() > 1.0 - EPSILON,
                "{:?}",
                order
            );
        }
    }

    #[test]
    fn test_mirror_with_winding_keeps_orientation() {
        // Counter-clockwise triangle seen from +Z, normal +Z
        let conv = CoordinateConversion::new(Axis::X, 1.0);
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let normal = Vec3::Z;

        let mirrored: Vec<Vec3> = positions
            .iter()
            .map(|p| Vec3::from_array(conv.position(*p)))
            .collect();
        let [a, b, c] = conv.winding([0, 1, 2]).map(|i| mirrored[i as usize]);
        let face_normal = (b - a).cross(c - a).normalize();
        let mirrored_normal = Vec3::from_array(conv.direction(normal.to_array()));
        assert!((face_normal - mirrored_normal).length() < EPSILON);

        // Undoing the mirror and re-reversing the winding reproduces the source order
        let undone: Vec<Vec3> = mirrored
            .iter()
            .map(|p| Vec3::from_array(conv.position(p.to_array())))
            .collect();
        let [a, b, c] = conv.winding(conv.winding([0, 1, 2])).map(|i| undone[i as usize]);
        let original = (b - a).cross(c - a).normalize();
        assert!((original - normal).length() < EPSILON);
    }

    #[test]
    fn test_axis_from_str() {
        assert_eq!("X".parse::<Axis>().unwrap(), Axis::X);
        assert_eq!("z".parse::<Axis>().unwrap(), Axis::Z);
        assert!("w".parse::<Axis>().is_err());
    }
}
