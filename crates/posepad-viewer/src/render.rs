//! Gizmo drawing for the map and the overlay layers

use bevy::prelude::*;
use glam::DVec3;
use posepad_overlay::{Color as OverlayColor, Renderer};

use crate::app::{OverlayHost, OverlaySet, ViewSettings};

/// Most grid lines drawn per axis before the grid is skipped
const MAX_GRID_LINES: usize = 400;

pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (draw_grid, draw_layers).chain().in_set(OverlaySet::View),
        );
    }
}

/// `Renderer` backed by Bevy gizmos. Fans are drawn as an outline with
/// spokes from the hub.
pub struct GizmoRenderer<'a, 'w, 's> {
    gizmos: &'a mut Gizmos<'w, 's>,
}

impl<'a, 'w, 's> GizmoRenderer<'a, 'w, 's> {
    pub fn new(gizmos: &'a mut Gizmos<'w, 's>) -> Self {
        Self { gizmos }
    }
}

impl Renderer for GizmoRenderer<'_, '_, '_> {
    fn triangle_fan(&mut self, vertices: &[DVec3], color: OverlayColor) {
        let color = Color::srgba(color.r, color.g, color.b, color.a);
        for (start, end) in fan_segments(vertices) {
            self.gizmos.line_2d(start, end, color);
        }
    }
}

fn planar(v: DVec3) -> Vec2 {
    Vec2::new(v.x as f32, v.y as f32)
}

/// Outline edges between consecutive rim vertices, then a spoke from the
/// hub to every rim vertex
pub fn fan_segments(vertices: &[DVec3]) -> Vec<(Vec2, Vec2)> {
    let Some((hub, rim)) = vertices.split_first() else {
        return Vec::new();
    };
    let hub = planar(*hub);

    let outline = rim.windows(2).map(|pair| (planar(pair[0]), planar(pair[1])));
    let spokes = rim.iter().map(|v| (hub, planar(*v)));
    outline.chain(spokes).collect()
}

/// Multiples of `spacing` inside `[min, max]`
pub fn grid_positions(min: f64, max: f64, spacing: f64) -> Vec<f64> {
    if spacing.is_nan() || spacing <= 0.0 || !min.is_finite() || !max.is_finite() || min > max {
        return Vec::new();
    }
    let first = (min / spacing).ceil() as i64;
    let last = (max / spacing).floor() as i64;
    if last < first || (last - first) as usize >= MAX_GRID_LINES {
        return Vec::new();
    }
    (first..=last).map(|i| i as f64 * spacing).collect()
}

fn draw_grid(host: NonSend<OverlayHost>, settings: Res<ViewSettings>, mut gizmos: Gizmos) {
    if !settings.show_grid {
        return;
    }
    let camera = host.context.camera.borrow();
    let viewport = camera.viewport();

    // World-space bounds of the window, covering any camera rotation
    let corners = [
        (0.0, 0.0),
        (viewport.width as f64, 0.0),
        (0.0, viewport.height as f64),
        (viewport.width as f64, viewport.height as f64),
    ]
    .map(|(x, y)| camera.to_world_coordinates(posepad_overlay::ScreenPoint::new(x, y)));
    let Ok(corners) = corners.into_iter().collect::<Result<Vec<_>, _>>() else {
        return;
    };
    let (min, max) = corners.iter().fold(
        (DVec3::splat(f64::INFINITY), DVec3::splat(f64::NEG_INFINITY)),
        |(min, max), c| (min.min(*c), max.max(*c)),
    );

    let line_color = Color::srgba(1.0, 1.0, 1.0, 0.08);
    for x in grid_positions(min.x, max.x, settings.grid_spacing) {
        gizmos.line_2d(
            Vec2::new(x as f32, min.y as f32),
            Vec2::new(x as f32, max.y as f32),
            line_color,
        );
    }
    for y in grid_positions(min.y, max.y, settings.grid_spacing) {
        gizmos.line_2d(
            Vec2::new(min.x as f32, y as f32),
            Vec2::new(max.x as f32, y as f32),
            line_color,
        );
    }

    // Fixed frame axes, one meter long
    gizmos.line_2d(Vec2::ZERO, Vec2::X, Color::srgb(0.9, 0.2, 0.2));
    gizmos.line_2d(Vec2::ZERO, Vec2::Y, Color::srgb(0.2, 0.9, 0.2));
}

fn draw_layers(mut host: NonSendMut<OverlayHost>, mut gizmos: Gizmos) {
    let mut renderer = GizmoRenderer::new(&mut gizmos);
    host.layers.draw(&mut renderer);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_segments() {
        let vertices = [
            DVec3::ZERO,
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(-1.0, 0.0, 0.0),
        ];
        let segments = fan_segments(&vertices);
        assert_eq!(segments.len(), 2 + 3);
        assert_eq!(segments[0], (Vec2::X, Vec2::Y));
        assert_eq!(segments[2], (Vec2::ZERO, Vec2::X));
        assert!(fan_segments(&[]).is_empty());
        assert!(fan_segments(&vertices[..1]).is_empty());
    }

    #[test]
    fn test_grid_positions() {
        assert_eq!(grid_positions(-1.5, 2.2, 1.0), vec![-1.0, 0.0, 1.0, 2.0]);
        assert_eq!(grid_positions(0.2, 0.8, 1.0), Vec::<f64>::new());
        assert!(grid_positions(0.0, 10.0, 0.0).is_empty());
        assert!(grid_positions(0.0, 1e6, 1.0).is_empty());
    }
}
