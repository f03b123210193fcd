//! Map camera: projection between screen pixels and the fixed frame
//!
//! The camera looks straight down onto the map plane (z = 0). Screen
//! coordinates have their origin at the top-left corner with y growing
//! downward; world coordinates are meters in the fixed frame with y up.

use glam::{DVec2, DVec3};
use posepad_core::GraphName;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Screen pixels per meter at zoom 1.0
pub const PIXELS_PER_METER: f64 = 100.0;
pub const MIN_ZOOM: f64 = 0.05;
pub const MAX_ZOOM: f64 = 50.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("Viewport has no area ({width}x{height})")]
    EmptyViewport { width: u32, height: u32 },
    #[error("Coordinates are not finite: ({x}, {y})")]
    NonFinite { x: f64, y: f64 },
}

/// A point on screen, in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &ScreenPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn center(&self) -> DVec2 {
        DVec2::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }
}

/// Camera shared between a host and its layers on the UI thread
pub type SharedCamera = Rc<RefCell<Camera>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    viewport: Viewport,
    /// World point shown at the viewport center
    position: DVec2,
    /// Heading of the screen's +x axis in the world, radians
    rotation: f64,
    zoom: f64,
    fixed_frame: GraphName,
}

impl Camera {
    pub fn new(fixed_frame: GraphName) -> Self {
        Self {
            viewport: Viewport::default(),
            position: DVec2::ZERO,
            rotation: 0.0,
            zoom: 1.0,
            fixed_frame,
        }
    }

    pub fn shared(self) -> SharedCamera {
        Rc::new(RefCell::new(self))
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Viewport { width, height };
    }

    pub fn position(&self) -> DVec2 {
        self.position
    }

    pub fn set_position(&mut self, position: DVec2) {
        self.position = position;
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: f64) {
        self.rotation = rotation;
    }

    pub fn rotate(&mut self, angle: f64) {
        self.rotation += angle;
    }

    /// Current zoom; 1.0 shows `PIXELS_PER_METER` pixels per meter
    pub fn scaling_factor(&self) -> f64 {
        self.zoom
    }

    pub fn pixels_per_meter(&self) -> f64 {
        PIXELS_PER_METER * self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() && zoom > 0.0 {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    /// Multiply the zoom by `factor`, clamped to the zoom limits
    pub fn zoom(&mut self, factor: f64) {
        self.set_zoom(self.zoom * factor);
    }

    /// Zoom while keeping the world point under `focus` fixed on screen
    pub fn zoom_about(&mut self, factor: f64, focus: ScreenPoint) {
        let Ok(before) = self.to_world_coordinates(focus) else {
            self.zoom(factor);
            return;
        };
        self.zoom(factor);
        if let Ok(after) = self.to_world_coordinates(focus) {
            self.position += (before - after).truncate();
        }
    }

    /// Move the view so content follows a drag of (dx, dy) pixels
    pub fn pan_screen(&mut self, dx: f64, dy: f64) {
        let delta = DVec2::new(dx, -dy) / self.pixels_per_meter();
        self.position -= DVec2::from_angle(self.rotation).rotate(delta);
    }

    pub fn fixed_frame(&self) -> &GraphName {
        &self.fixed_frame
    }

    pub fn set_fixed_frame(&mut self, frame: GraphName) {
        self.fixed_frame = frame;
    }

    fn check_viewport(&self) -> Result<(), CameraError> {
        if self.viewport.is_empty() {
            return Err(CameraError::EmptyViewport {
                width: self.viewport.width,
                height: self.viewport.height,
            });
        }
        Ok(())
    }

    /// Unproject a screen point onto the map plane
    pub fn to_world_coordinates(&self, point: ScreenPoint) -> Result<DVec3, CameraError> {
        self.check_viewport()?;
        if !point.x.is_finite() || !point.y.is_finite() {
            return Err(CameraError::NonFinite {
                x: point.x,
                y: point.y,
            });
        }

        let center = self.viewport.center();
        let local = DVec2::new(point.x - center.x, center.y - point.y) / self.pixels_per_meter();
        let world = self.position + DVec2::from_angle(self.rotation).rotate(local);
        Ok(world.extend(0.0))
    }

    /// Project a world point onto the screen, ignoring its height
    pub fn to_screen_coordinates(&self, point: DVec3) -> Result<ScreenPoint, CameraError> {
        self.check_viewport()?;
        if !point.x.is_finite() || !point.y.is_finite() {
            return Err(CameraError::NonFinite {
                x: point.x,
                y: point.y,
            });
        }

        let center = self.viewport.center();
        let local = DVec2::from_angle(-self.rotation).rotate(point.truncate() - self.position)
            * self.pixels_per_meter();
        Ok(ScreenPoint::new(center.x + local.x, center.y - local.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn camera() -> Camera {
        let mut camera = Camera::new(GraphName::new("map").unwrap());
        camera.set_viewport(800, 600);
        camera
    }

    #[test]
    fn test_center_maps_to_position() {
        let mut camera = camera();
        camera.set_position(DVec2::new(3.0, -1.0));
        let world = camera.to_world_coordinates(ScreenPoint::new(400.0, 300.0)).unwrap();
        assert!(world.abs_diff_eq(DVec3::new(3.0, -1.0, 0.0), 1e-12));
    }

    #[test]
    fn test_screen_axes() {
        let camera = camera();
        // 100 px right and 100 px up is one meter along +x and +y
        let right = camera.to_world_coordinates(ScreenPoint::new(500.0, 300.0)).unwrap();
        let up = camera.to_world_coordinates(ScreenPoint::new(400.0, 200.0)).unwrap();
        assert!(right.abs_diff_eq(DVec3::X, 1e-12));
        assert!(up.abs_diff_eq(DVec3::Y, 1e-12));
    }

    #[test]
    fn test_zoom_and_rotation() {
        let mut camera = camera();
        camera.set_zoom(2.0);
        camera.set_rotation(FRAC_PI_2);
        let right = camera.to_world_coordinates(ScreenPoint::new(600.0, 300.0)).unwrap();
        // Screen right points along world +y when the view is turned a quarter
        assert!(right.abs_diff_eq(DVec3::Y, 1e-12));
    }

    #[test]
    fn test_round_trip() {
        let mut camera = camera();
        camera.set_zoom(0.7);
        camera.set_rotation(0.4);
        camera.set_position(DVec2::new(-2.0, 5.0));

        let screen = ScreenPoint::new(123.0, 456.0);
        let world = camera.to_world_coordinates(screen).unwrap();
        let back = camera.to_screen_coordinates(world).unwrap();
        assert!((back.x - screen.x).abs() < 1e-9);
        assert!((back.y - screen.y).abs() < 1e-9);
    }

    #[test]
    fn test_projection_errors() {
        let camera = Camera::new(GraphName::new("map").unwrap());
        assert_eq!(
            camera.to_world_coordinates(ScreenPoint::new(1.0, 1.0)),
            Err(CameraError::EmptyViewport { width: 0, height: 0 })
        );

        let camera = self::camera();
        assert!(matches!(
            camera.to_world_coordinates(ScreenPoint::new(f64::NAN, 1.0)),
            Err(CameraError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_zoom_limits() {
        let mut camera = camera();
        camera.zoom(1000.0);
        assert_eq!(camera.scaling_factor(), MAX_ZOOM);
        camera.zoom(0.0);
        assert_eq!(camera.scaling_factor(), MAX_ZOOM);
        camera.set_zoom(0.0001);
        assert_eq!(camera.scaling_factor(), MIN_ZOOM);
    }

    #[test]
    fn test_zoom_about_keeps_focus() {
        let mut camera = camera();
        let focus = ScreenPoint::new(700.0, 100.0);
        let before = camera.to_world_coordinates(focus).unwrap();
        camera.zoom_about(2.5, focus);
        let after = camera.to_world_coordinates(focus).unwrap();
        assert!(before.abs_diff_eq(after, 1e-9));
        assert_eq!(camera.scaling_factor(), 2.5);
    }

    #[test]
    fn test_pan_follows_drag() {
        let mut camera = camera();
        let grabbed = camera.to_world_coordinates(ScreenPoint::new(400.0, 300.0)).unwrap();
        camera.pan_screen(50.0, -20.0);
        let moved = camera.to_screen_coordinates(grabbed).unwrap();
        assert!((moved.x - 450.0).abs() < 1e-9);
        assert!((moved.y - 280.0).abs() < 1e-9);
    }
}
