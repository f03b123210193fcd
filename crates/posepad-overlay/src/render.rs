//! Renderer seam and redraw requests

use glam::DVec3;
use std::cell::Cell;
use std::rc::Rc;

/// RGBA color with components in 0.0-1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// Immediate-mode drawing backend supplied by the host each frame
pub trait Renderer {
    /// Fill a triangle fan; the first vertex is the hub, in fixed-frame
    /// coordinates
    fn triangle_fan(&mut self, vertices: &[DVec3], color: Color);
}

/// Redraw requests raised by layers; clones share state
#[derive(Debug, Clone, Default)]
pub struct RenderRequest {
    pending: Rc<Cell<bool>>,
    total: Rc<Cell<u64>>,
}

impl RenderRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.pending.set(true);
        self.total.set(self.total.get() + 1);
    }

    /// Whether a redraw was requested since the last call
    pub fn take_pending(&self) -> bool {
        self.pending.replace(false)
    }

    pub fn total_requests(&self) -> u64 {
        self.total.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shared_between_clones() {
        let request = RenderRequest::new();
        let layer_side = request.clone();

        assert!(!request.take_pending());
        layer_side.request();
        layer_side.request();
        assert!(request.take_pending());
        assert!(!request.take_pending());
        assert_eq!(request.total_requests(), 2);
    }
}
