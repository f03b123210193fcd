//! Pointer input for the overlay
//!
//! The left mouse button and the first finger on a touch screen both act as
//! the single pointer the overlay layers see. Wheel zoom and right-drag pan
//! move the map camera directly.

use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::input::touch::Touches;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::EguiContexts;
use posepad_overlay::{Action, MotionEvent, ScreenPoint};
use std::time::Duration;
use tracing::{trace, warn};

use crate::app::{OverlayHost, OverlaySet};

/// Zoom change per scroll line
const ZOOM_STEP: f64 = 1.1;
/// Pixels per line when the wheel reports pixel deltas
const PIXELS_PER_LINE: f64 = 40.0;

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PointerTracker>().add_systems(
            Update,
            (dispatch_mouse, dispatch_touches, zoom_and_pan)
                .chain()
                .in_set(OverlaySet::Input),
        );
    }
}

/// Which device currently owns the pointer, and where it was last seen
#[derive(Debug, Default, Resource)]
pub struct PointerTracker {
    mouse: Option<Vec2>,
    touch: Option<(u64, Vec2)>,
}

pub fn motion_event(action: Action, position: Vec2, time: Duration) -> MotionEvent {
    MotionEvent::new(action, position.x as f64, position.y as f64, time)
}

/// Zoom factor for a wheel delta; scrolling up zooms in
pub fn scroll_zoom_factor(unit: MouseScrollUnit, y: f32) -> f64 {
    let lines = match unit {
        MouseScrollUnit::Line => y as f64,
        MouseScrollUnit::Pixel => y as f64 / PIXELS_PER_LINE,
    };
    ZOOM_STEP.powf(lines)
}

fn egui_wants_pointer(contexts: &mut EguiContexts) -> bool {
    contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input())
        .unwrap_or(false)
}

/// Where a tracked finger is this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FingerState {
    Held(Vec2),
    Lifted(Vec2),
    Lost,
}

/// Pointer actions for one frame of left-button state. `start` is a press
/// allowed to begin a gesture. A press and release within the same frame
/// yields `Down` then `Up`.
pub fn mouse_actions(
    tracked: &mut Option<Vec2>,
    cursor: Option<Vec2>,
    start: bool,
    pressed: bool,
    released: bool,
) -> Vec<(Action, Vec2)> {
    let mut actions = Vec::new();
    let position = match (*tracked, cursor) {
        (Some(last), cursor) => {
            let position = cursor.unwrap_or(last);
            if position != last {
                actions.push((Action::Move, position));
            }
            position
        }
        (None, Some(position)) if start => {
            actions.push((Action::Down, position));
            position
        }
        (None, _) => return actions,
    };

    *tracked = Some(position);
    if released {
        *tracked = None;
        actions.push((Action::Up, position));
    } else if !pressed {
        // Released outside the window
        *tracked = None;
        actions.push((Action::Cancel, position));
    }
    actions
}

/// Pointer actions for one frame of touch state. `started` is a new finger
/// allowed to begin a gesture; `state` reports where a finger is now.
pub fn touch_actions(
    tracked: &mut Option<(u64, Vec2)>,
    started: Option<(u64, Vec2)>,
    state: impl Fn(u64) -> FingerState,
) -> Vec<(Action, Vec2)> {
    let mut actions = Vec::new();
    let (id, last) = match (*tracked, started) {
        (Some(finger), _) => finger,
        (None, Some((id, position))) => {
            actions.push((Action::Down, position));
            (id, position)
        }
        (None, None) => return actions,
    };

    match state(id) {
        FingerState::Held(position) => {
            if position != last {
                actions.push((Action::Move, position));
            }
            *tracked = Some((id, position));
        }
        FingerState::Lifted(position) => {
            *tracked = None;
            actions.push((Action::Up, position));
        }
        FingerState::Lost => {
            *tracked = None;
            actions.push((Action::Cancel, last));
        }
    }
    actions
}

fn dispatch(host: &mut OverlayHost, actions: Vec<(Action, Vec2)>, time: Duration) {
    if !host.is_running() {
        return;
    }
    for (action, position) in actions {
        let event = motion_event(action, position, time);
        match host.layers.dispatch_touch(&event) {
            Ok(consumed) => {
                trace!(action = ?event.action, x = event.x, y = event.y, consumed, "Pointer event")
            }
            Err(e) => {
                warn!(action = ?event.action, error = %e, "Layer failed to handle pointer event")
            }
        }
    }
}

fn dispatch_mouse(
    mut host: NonSendMut<OverlayHost>,
    mut tracker: ResMut<PointerTracker>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    time: Res<Time<Real>>,
    mut contexts: EguiContexts,
) {
    if tracker.touch.is_some() {
        return;
    }
    let Ok(window) = windows.single() else {
        return;
    };

    let start = tracker.mouse.is_none()
        && mouse_button.just_pressed(MouseButton::Left)
        && !egui_wants_pointer(&mut contexts);
    let actions = mouse_actions(
        &mut tracker.mouse,
        window.cursor_position(),
        start,
        mouse_button.pressed(MouseButton::Left),
        mouse_button.just_released(MouseButton::Left),
    );
    dispatch(&mut host, actions, time.elapsed());
}

fn dispatch_touches(
    mut host: NonSendMut<OverlayHost>,
    mut tracker: ResMut<PointerTracker>,
    touches: Res<Touches>,
    time: Res<Time<Real>>,
    mut contexts: EguiContexts,
) {
    if tracker.touch.is_none() && tracker.mouse.is_some() {
        return;
    }

    let started = if tracker.touch.is_none() {
        touches
            .iter_just_pressed()
            .next()
            .filter(|_| !egui_wants_pointer(&mut contexts))
            .map(|touch| (touch.id(), touch.position()))
    } else {
        None
    };
    let actions = touch_actions(&mut tracker.touch, started, |id| {
        match (touches.get_pressed(id), touches.get_released(id)) {
            (Some(touch), _) => FingerState::Held(touch.position()),
            (None, Some(touch)) => FingerState::Lifted(touch.position()),
            (None, None) => FingerState::Lost,
        }
    });
    dispatch(&mut host, actions, time.elapsed());
}

fn zoom_and_pan(
    host: NonSend<OverlayHost>,
    mut mouse_wheel: MessageReader<MouseWheel>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut contexts: EguiContexts,
) {
    let egui_wants_pointer = egui_wants_pointer(&mut contexts);
    let mut camera = host.context.camera.borrow_mut();

    let cursor = windows
        .single()
        .ok()
        .and_then(|window| window.cursor_position());
    for scroll in mouse_wheel.read() {
        if egui_wants_pointer {
            continue;
        }
        let factor = scroll_zoom_factor(scroll.unit, scroll.y);
        match cursor {
            Some(focus) => {
                camera.zoom_about(factor, ScreenPoint::new(focus.x as f64, focus.y as f64))
            }
            None => camera.zoom(factor),
        }
        host.context.render_request.request();
    }

    let mut motion = Vec2::ZERO;
    for event in mouse_motion.read() {
        motion += event.delta;
    }
    if mouse_button.pressed(MouseButton::Right) && !egui_wants_pointer && motion != Vec2::ZERO {
        camera.pan_screen(motion.x as f64, motion.y as f64);
        host.context.render_request.request();
    }
}
