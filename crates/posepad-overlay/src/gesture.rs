//! Touch events and gesture recognition

use std::time::Duration;
use tracing::trace;

use crate::camera::ScreenPoint;
use crate::handler::{Handler, Message};

/// Delay before a press is considered more than a tap
pub const TAP_TIMEOUT: Duration = Duration::from_millis(100);
/// Additional hold time before a press becomes a long press
pub const LONG_PRESS_TIMEOUT: Duration = Duration::from_millis(500);
/// Movement in density-independent pixels that turns a press into a scroll
pub const TOUCH_SLOP_DP: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Down,
    Move,
    Up,
    Cancel,
}

/// One pointer event in screen pixels; `event_time` is host uptime
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionEvent {
    pub action: Action,
    pub x: f64,
    pub y: f64,
    pub event_time: Duration,
}

impl MotionEvent {
    pub fn new(action: Action, x: f64, y: f64, event_time: Duration) -> Self {
        Self {
            action,
            x,
            y,
            event_time,
        }
    }

    pub fn point(&self) -> ScreenPoint {
        ScreenPoint::new(self.x, self.y)
    }
}

/// Display properties of the surface a layer is created for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewContext {
    /// Physical pixels per density-independent pixel
    pub density: f64,
}

impl Default for ViewContext {
    fn default() -> Self {
        Self { density: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    pub tap_timeout: Duration,
    pub long_press_timeout: Duration,
    /// Touch slop in screen pixels
    pub touch_slop: f64,
}

impl GestureConfig {
    pub fn for_context(context: &ViewContext) -> Self {
        let density = if context.density.is_finite() && context.density > 0.0 {
            context.density
        } else {
            1.0
        };
        Self {
            tap_timeout: TAP_TIMEOUT,
            long_press_timeout: LONG_PRESS_TIMEOUT,
            touch_slop: TOUCH_SLOP_DP * density,
        }
    }

    /// Hold time from press to long press
    pub fn long_press_delay(&self) -> Duration {
        self.tap_timeout + self.long_press_timeout
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self::for_context(&ViewContext::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    SingleTapUp(ScreenPoint),
    /// `dx`/`dy` are the distance moved since the previous scroll, as
    /// previous minus current
    Scroll {
        at: ScreenPoint,
        dx: f64,
        dy: f64,
    },
    LongPress(ScreenPoint),
}

/// Recognizes taps, scrolls, and long presses from a single pointer.
///
/// Long presses are timed through the UI queue: a press posts
/// `Message::LongPress` and the owner forwards it to
/// [`GestureDetector::on_long_press_timeout`].
#[derive(Debug)]
pub struct GestureDetector {
    config: GestureConfig,
    handler: Handler,
    down: Option<MotionEvent>,
    last: ScreenPoint,
    in_tap_region: bool,
    in_long_press: bool,
}

impl GestureDetector {
    pub fn new(config: GestureConfig, handler: Handler) -> Self {
        Self {
            config,
            handler,
            down: None,
            last: ScreenPoint::default(),
            in_tap_region: false,
            in_long_press: false,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn on_touch_event(&mut self, event: &MotionEvent) -> Option<Gesture> {
        match event.action {
            Action::Down => {
                self.handler.remove_messages(Message::LongPress);
                self.handler.post_at_time(
                    Message::LongPress,
                    event.event_time + self.config.long_press_delay(),
                );
                self.down = Some(*event);
                self.last = event.point();
                self.in_tap_region = true;
                self.in_long_press = false;
                None
            }
            Action::Move => {
                let down = self.down?;
                if self.in_long_press {
                    return None;
                }

                let point = event.point();
                if self.in_tap_region {
                    if down.point().distance(&point) <= self.config.touch_slop {
                        return None;
                    }
                    self.in_tap_region = false;
                    self.handler.remove_messages(Message::LongPress);
                }

                let dx = self.last.x - point.x;
                let dy = self.last.y - point.y;
                self.last = point;
                if dx == 0.0 && dy == 0.0 {
                    return None;
                }
                Some(Gesture::Scroll { at: point, dx, dy })
            }
            Action::Up => {
                self.handler.remove_messages(Message::LongPress);
                let tap = self.down.is_some() && self.in_tap_region && !self.in_long_press;
                self.reset();
                tap.then(|| Gesture::SingleTapUp(event.point()))
            }
            Action::Cancel => {
                self.handler.remove_messages(Message::LongPress);
                self.reset();
                None
            }
        }
    }

    /// Called when `Message::LongPress` comes due; reports the long press if
    /// the pointer is still held inside the tap region
    pub fn on_long_press_timeout(&mut self) -> Option<Gesture> {
        let down = self.down?;
        if !self.in_tap_region || self.in_long_press {
            return None;
        }
        self.in_long_press = true;
        trace!(x = down.x, y = down.y, "Long press");
        Some(Gesture::LongPress(down.point()))
    }

    fn reset(&mut self) {
        self.down = None;
        self.in_tap_region = false;
        self.in_long_press = false;
    }
}
