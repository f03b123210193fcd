//! Triangle fan markers

use glam::DVec3;
use posepad_core::Transform;

use crate::render::{Color, Renderer};

/// A filled fan placed at a pose and scaled about its hub
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleFanShape {
    vertices: Vec<DVec3>,
    color: Color,
    pose: Transform,
    scale: f64,
}

impl TriangleFanShape {
    pub fn new(vertices: &[[f64; 3]], color: Color) -> Self {
        Self {
            vertices: vertices.iter().map(|v| DVec3::from_array(*v)).collect(),
            color,
            pose: Transform::identity(),
            scale: 1.0,
        }
    }

    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn pose(&self) -> &Transform {
        &self.pose
    }

    pub fn set_pose(&mut self, pose: Transform) {
        self.pose = pose;
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale
    }

    pub fn set_scale_factor(&mut self, scale: f64) {
        self.scale = scale;
    }

    /// Vertices scaled, then placed at the pose
    pub fn transformed_vertices(&self) -> Vec<DVec3> {
        self.vertices
            .iter()
            .map(|v| self.pose.apply(*v * self.scale))
            .collect()
    }

    pub fn draw(&self, renderer: &mut dyn Renderer) {
        renderer.triangle_fan(&self.transformed_vertices(), self.color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_scale_then_pose() {
        let mut shape = TriangleFanShape::new(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            Color::new(1.0, 0.0, 0.0, 1.0),
        );
        shape.set_scale_factor(0.5);
        shape.set_pose(Transform::from_xy_yaw(2.0, 3.0, FRAC_PI_2));

        let vertices = shape.transformed_vertices();
        assert!(vertices[0].abs_diff_eq(DVec3::new(2.0, 3.0, 0.0), 1e-12));
        assert!(vertices[1].abs_diff_eq(DVec3::new(2.0, 3.5, 0.0), 1e-12));
    }
}
