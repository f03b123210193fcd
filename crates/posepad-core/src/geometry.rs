//! Rigid transforms and rotations

use glam::{DQuat, DVec3, EulerRot};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::Mul;

use crate::messages::{Header, Point, Pose, PoseStamped, Quaternion};
use crate::name::GraphName;
use crate::time::Time;

const PARALLEL_EPSILON: f64 = 1e-9;

/// A translation followed by a rotation, mapping child coordinates into the
/// parent frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: DVec3,
    pub rotation: DQuat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            translation: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
        }
    }

    pub fn new(translation: DVec3, rotation: DQuat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Pure translation with the default upright orientation
    pub fn from_translation(translation: DVec3) -> Self {
        Self::new(translation, DQuat::IDENTITY)
    }

    /// Planar transform from x, y and a heading about +Z
    pub fn from_xy_yaw(x: f64, y: f64, yaw: f64) -> Self {
        Self::new(DVec3::new(x, y, 0.0), DQuat::from_rotation_z(yaw))
    }

    pub fn set_rotation(&mut self, rotation: DQuat) {
        self.rotation = rotation;
    }

    /// Compose: `self * other` applies `other` first
    pub fn multiply(&self, other: &Transform) -> Transform {
        Transform {
            translation: self.translation + self.rotation * other.translation,
            rotation: (self.rotation * other.rotation).normalize(),
        }
    }

    pub fn invert(&self) -> Transform {
        let rotation = self.rotation.inverse();
        Transform {
            translation: -(rotation * self.translation),
            rotation,
        }
    }

    pub fn apply(&self, point: DVec3) -> DVec3 {
        self.rotation * point + self.translation
    }

    /// Heading about +Z in radians
    pub fn yaw(&self) -> f64 {
        let (yaw, _, _) = self.rotation.to_euler(EulerRot::ZYX);
        yaw
    }

    pub fn approx_eq(&self, other: &Transform, epsilon: f64) -> bool {
        self.translation.abs_diff_eq(other.translation, epsilon)
            && (self.rotation.abs_diff_eq(other.rotation, epsilon)
                || self.rotation.abs_diff_eq(-other.rotation, epsilon))
    }

    pub fn to_pose_message(&self) -> Pose {
        Pose {
            position: Point {
                x: self.translation.x,
                y: self.translation.y,
                z: self.translation.z,
            },
            orientation: Quaternion {
                x: self.rotation.x,
                y: self.rotation.y,
                z: self.rotation.z,
                w: self.rotation.w,
            },
        }
    }

    /// Stamp this pose with a frame and time; `seq` is filled in by the
    /// publisher
    pub fn to_pose_stamped_message(&self, frame_id: &GraphName, stamp: Time) -> PoseStamped {
        PoseStamped {
            header: Header {
                seq: 0,
                stamp,
                frame_id: frame_id.to_string(),
            },
            pose: self.to_pose_message(),
        }
    }

    pub fn from_pose_message(pose: &Pose) -> Transform {
        let p = &pose.position;
        let q = &pose.orientation;
        Transform {
            translation: DVec3::new(p.x, p.y, p.z),
            rotation: DQuat::from_xyzw(q.x, q.y, q.z, q.w),
        }
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        self.multiply(&rhs)
    }
}

/// Rotation that turns `from` onto `to`.
///
/// Returns `None` when either vector has no direction. Opposite vectors
/// rotate half a turn about the axis closest to +Z, which keeps planar
/// headings in the plane.
pub fn rotation_between(from: DVec3, to: DVec3) -> Option<DQuat> {
    let from = from.try_normalize()?;
    let to = to.try_normalize()?;

    if from.dot(to) < -1.0 + PARALLEL_EPSILON {
        let axis = (DVec3::Z - from * from.z)
            .try_normalize()
            .unwrap_or_else(|| from.any_orthonormal_vector());
        return Some(DQuat::from_axis_angle(axis, PI));
    }

    Some(DQuat::from_rotation_arc(from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_compose_and_invert() {
        let a = Transform::from_xy_yaw(1.0, 2.0, FRAC_PI_2);
        let b = Transform::from_xy_yaw(3.0, 0.0, 0.0);

        let ab = a * b;
        // b's origin sits 3m along a's rotated x-axis (world +y)
        assert!(ab.translation.abs_diff_eq(DVec3::new(1.0, 5.0, 0.0), 1e-9));

        let identity = ab.multiply(&ab.invert());
        assert!(identity.approx_eq(&Transform::identity(), 1e-9));
    }

    #[test]
    fn test_apply() {
        let t = Transform::from_xy_yaw(1.0, 0.0, FRAC_PI_2);
        let p = t.apply(DVec3::new(1.0, 0.0, 0.0));
        assert!(p.abs_diff_eq(DVec3::new(1.0, 1.0, 0.0), 1e-9));
    }

    #[test]
    fn test_rotation_between_planar() {
        let q = rotation_between(DVec3::X, DVec3::new(0.0, 2.0, 0.0)).unwrap();
        let t = Transform::new(DVec3::ZERO, q);
        assert!((t.yaw() - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_between_opposite_stays_planar() {
        let q = rotation_between(DVec3::X, DVec3::new(-5.0, 0.0, 0.0)).unwrap();
        let turned = q * DVec3::X;
        assert!(turned.abs_diff_eq(DVec3::new(-1.0, 0.0, 0.0), 1e-9));
        // Half turn about Z, not a flip through the plane
        assert!((q * DVec3::Z).abs_diff_eq(DVec3::Z, 1e-9));
    }

    #[test]
    fn test_rotation_between_zero_vector() {
        assert!(rotation_between(DVec3::X, DVec3::ZERO).is_none());
    }

    #[test]
    fn test_pose_message_conversion() {
        let t = Transform::from_xy_yaw(1.5, -2.0, 0.3);
        let frame = GraphName::new("/map").unwrap();
        let msg = t.to_pose_stamped_message(&frame, Time::new(7, 0));

        assert_eq!(msg.header.frame_id, "/map");
        assert_eq!(msg.header.stamp, Time::new(7, 0));
        assert_eq!(msg.pose.position.x, 1.5);
        assert_eq!(msg.pose.position.y, -2.0);

        let back = Transform::from_pose_message(&msg.pose);
        assert!(back.approx_eq(&t, 1e-12));
    }
}
