//! Rotation orders and TRS decomposition
//!
//! Euler angles are stored in degrees, one angle per axis, and applied in the
//! node's rotation order. Matrices use glam's column-vector convention, so
//! "X applied first" for `Xyz` means `Rz * Ry * Rx`.

use glam::{EulerRot, Mat3, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Euler application order of a joint (axis applied first is listed first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RotationOrder {
    #[default]
    Xyz,
    Xzy,
    Yzx,
    Yxz,
    Zxy,
    Zyx,
}

impl RotationOrder {
    pub const ALL: [RotationOrder; 6] = [
        RotationOrder::Xyz,
        RotationOrder::Xzy,
        RotationOrder::Yzx,
        RotationOrder::Yxz,
        RotationOrder::Zxy,
        RotationOrder::Zyx,
    ];

    /// Axis indices (0 = X, 1 = Y, 2 = Z) in application order
    pub const fn axes(self) -> [usize; 3] {
        match self {
            RotationOrder::Xyz => [0, 1, 2],
            RotationOrder::Xzy => [0, 2, 1],
            RotationOrder::Yzx => [1, 2, 0],
            RotationOrder::Yxz => [1, 0, 2],
            RotationOrder::Zxy => [2, 0, 1],
            RotationOrder::Zyx => [2, 1, 0],
        }
    }

    /// Compose per-axis rotation matrices right-to-left in this order
    ///
    /// `XYZ => Rz * Ry * Rx`, `XZY => Ry * Rz * Rx`, `YZX => Rx * Rz * Ry`,
    /// `YXZ => Rz * Rx * Ry`, `ZXY => Ry * Rx * Rz`, `ZYX => Rx * Ry * Rz`.
    pub fn compose(self, rx: Mat3, ry: Mat3, rz: Mat3) -> Mat3 {
        match self {
            RotationOrder::Xyz => rz * ry * rx,
            RotationOrder::Xzy => ry * rz * rx,
            RotationOrder::Yzx => rx * rz * ry,
            RotationOrder::Yxz => rz * rx * ry,
            RotationOrder::Zxy => ry * rx * rz,
            RotationOrder::Zyx => rx * ry * rz,
        }
    }

    /// Build the rotation matrix for Euler angles given in degrees
    pub fn euler_to_mat3(self, degrees: Vec3) -> Mat3 {
        let radians = degrees * (std::f32::consts::PI / 180.0);
        self.compose(
            Mat3::from_rotation_x(radians.x),
            Mat3::from_rotation_y(radians.y),
            Mat3::from_rotation_z(radians.z),
        )
    }

    pub fn euler_to_quat(self, degrees: Vec3) -> Quat {
        Quat::from_mat3(&self.euler_to_mat3(degrees)).normalize()
    }

    /// Extract Euler angles (degrees) for this order from a rotation
    pub fn euler_from_quat(self, rotation: Quat) -> Vec3 {
        // glam lists the outermost (last applied) axis first
        let (c, b, a) = rotation.normalize().to_euler(self.glam_order());
        let [axis_a, axis_b, axis_c] = self.axes();
        let mut radians = [0.0f32; 3];
        radians[axis_a] = a;
        radians[axis_b] = b;
        radians[axis_c] = c;
        Vec3::from_array(radians) * (180.0 / std::f32::consts::PI)
    }

    const fn glam_order(self) -> EulerRot {
        match self {
            RotationOrder::Xyz => EulerRot::ZYX,
            RotationOrder::Xzy => EulerRot::YZX,
            RotationOrder::Yzx => EulerRot::XZY,
            RotationOrder::Yxz => EulerRot::ZXY,
            RotationOrder::Zxy => EulerRot::YXZ,
            RotationOrder::Zyx => EulerRot::XYZ,
        }
    }
}

/// Decomposed transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trs {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Trs {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Split an affine matrix into scale, rotation and translation
    pub fn decompose(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Recompose as `T * R * S`
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Trs {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn assert_mat4_close(a: Mat4, b: Mat4) {
        let (a, b) = (a.to_cols_array(), b.to_cols_array());
        for i in 0..16 {
            assert!(
                (a[i] - b[i]).abs() < EPSILON,
                "element {} differs: {} vs {}",
                i,
                a[i],
                b[i]
            );
        }
    }

    #[test]
    fn test_xyz_applies_x_first() {
        // 90° about X then 90° about Z: +Y -> +Z -> stays +Z
        let m = RotationOrder::Xyz.euler_to_mat3(Vec3::new(90.0, 0.0, 90.0));
        let v = m * Vec3::Y;
        assert!((v - Vec3::Z).length() < EPSILON, "got {:?}", v);

        // Same angles applied Z first: +Y -> -X -> -X
        let m = RotationOrder::Zyx.euler_to_mat3(Vec3::new(90.0, 0.0, 90.0));
        let v = m * Vec3::Y;
        assert!((v - Vec3::NEG_X).length() < EPSILON, "got {:?}", v);
    }

    #[test]
    fn test_orders_disagree_for_compound_rotation() {
        let angles = Vec3::new(30.0, 45.0, 60.0);
        let xyz = RotationOrder::Xyz.euler_to_quat(angles);
        let zyx = RotationOrder::Zyx.euler_to_quat(angles);
        assert!(xyz.dot(zyx).abs() < 0.999);
    }

    #[test]
    fn test_euler_roundtrip_all_orders() {
        let angles = Vec3::new(25.0, -40.0, 65.0);
        for order in RotationOrder::ALL {
            let q = order.euler_to_quat(angles);
            let back = order.euler_from_quat(q);
            assert!(
                (back - angles).length() < 1e-2,
                "{:?}: {:?} != {:?}",
                order,
                back,
                angles
            );
        }
    }

    #[test]
    fn test_trs_roundtrip_all_orders() {
        let angles = Vec3::new(-35.0, 70.0, 15.0);
        let translation = Vec3::new(1.5, -2.0, 0.25);
        for order in RotationOrder::ALL {
            let rotation = Mat4::from_mat3(order.euler_to_mat3(angles));
            let original = Mat4::from_translation(translation)
                * rotation
                * Mat4::from_scale(Vec3::splat(2.5));

            let trs = Trs::decompose(original);
            assert!((trs.scale - Vec3::splat(2.5)).length() < EPSILON);
            assert!((trs.translation - translation).length() < EPSILON);
            assert_mat4_close(trs.to_matrix(), original);
        }
    }

    #[test]
    fn test_identity_decomposes_to_identity() {
        let trs = Trs::decompose(Mat4::IDENTITY);
        assert!((trs.scale - Vec3::ONE).length() < EPSILON);
        assert!(trs.translation.length() < EPSILON);
        assert!(trs.rotation.dot(Quat::IDENTITY).abs() > 1.0 - EPSILON);
    }
}
