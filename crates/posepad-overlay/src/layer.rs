//! Visualization layer capability and the stack that dispatches to layers

use posepad_bus::{BusError, Session};
use posepad_core::FrameTree;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::camera::{CameraError, SharedCamera};
use crate::gesture::MotionEvent;
use crate::handler::{Handler, Message};
use crate::render::{RenderRequest, Renderer};

#[derive(Error, Debug)]
pub enum LayerError {
    #[error("Cannot {operation} a layer that is {state}")]
    Lifecycle {
        operation: &'static str,
        state: &'static str,
    },
    #[error("Messaging error: {0}")]
    Bus(#[from] BusError),
    #[error("Projection error: {0}")]
    Camera(#[from] CameraError),
}

pub type SharedFrameTree = Rc<RefCell<FrameTree>>;

/// Collaborators handed to a layer when it is attached to a live session
#[derive(Clone)]
pub struct LayerContext {
    pub session: Rc<dyn Session>,
    pub handler: Handler,
    pub camera: SharedCamera,
    pub frames: SharedFrameTree,
    pub render_request: RenderRequest,
}

/// A renderable, input-handling component of a visualization view.
///
/// All methods run on the UI thread.
pub trait VisualizationLayer {
    /// Draw this layer for the current frame
    fn draw(&mut self, renderer: &mut dyn Renderer);

    /// Handle a pointer event. Returns `true` if the event was consumed and
    /// must not reach layers below.
    fn on_touch_event(&mut self, _event: &MotionEvent) -> Result<bool, LayerError> {
        Ok(false)
    }

    fn on_start(&mut self, context: LayerContext) -> Result<(), LayerError>;

    fn on_shutdown(&mut self) -> Result<(), LayerError>;

    /// Handle a message this layer posted on the UI queue
    fn on_message(&mut self, _message: Message) -> Result<(), LayerError> {
        Ok(())
    }
}

/// Ordered layers; later layers are drawn on top and see input first
#[derive(Default)]
pub struct LayerStack {
    layers: Vec<Box<dyn VisualizationLayer>>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, layer: Box<dyn VisualizationLayer>) {
        self.layers.push(layer);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn start(&mut self, context: &LayerContext) -> Result<(), LayerError> {
        for layer in &mut self.layers {
            layer.on_start(context.clone())?;
        }
        Ok(())
    }

    /// Shut every layer down, returning the first failure
    pub fn shutdown(&mut self) -> Result<(), LayerError> {
        let mut first_error = None;
        for layer in self.layers.iter_mut().rev() {
            if let Err(e) = layer.on_shutdown() {
                warn!(error = %e, "Layer shutdown failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn draw(&mut self, renderer: &mut dyn Renderer) {
        for layer in &mut self.layers {
            layer.draw(renderer);
        }
    }

    /// Offer `event` to layers from the top down until one consumes it
    pub fn dispatch_touch(&mut self, event: &MotionEvent) -> Result<bool, LayerError> {
        for layer in self.layers.iter_mut().rev() {
            if layer.on_touch_event(event)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Deliver messages due at `now` to every layer. Every due message
    /// reaches every layer even if one fails; the first failure is returned.
    pub fn pump(&mut self, handler: &Handler, now: Duration) -> Result<(), LayerError> {
        let mut first_error = None;
        for message in handler.take_due(now) {
            for layer in &mut self.layers {
                if let Err(e) = layer.on_message(message) {
                    warn!(?message, error = %e, "Layer failed to handle message");
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::Action;
    use std::cell::Cell;

    /// Records calls into a shared log; consumes touches when `greedy`
    struct Recorder {
        id: u8,
        greedy: bool,
        log: Rc<RefCell<Vec<(u8, &'static str)>>>,
        fail_shutdown: bool,
        fail_messages: bool,
    }

    impl Recorder {
        fn boxed(id: u8, greedy: bool, log: &Rc<RefCell<Vec<(u8, &'static str)>>>) -> Box<Self> {
            Box::new(Self {
                id,
                greedy,
                log: log.clone(),
                fail_shutdown: false,
                fail_messages: false,
            })
        }
    }

    impl VisualizationLayer for Recorder {
        fn draw(&mut self, _renderer: &mut dyn Renderer) {
            self.log.borrow_mut().push((self.id, "draw"));
        }

        fn on_touch_event(&mut self, _event: &MotionEvent) -> Result<bool, LayerError> {
            self.log.borrow_mut().push((self.id, "touch"));
            Ok(self.greedy)
        }

        fn on_start(&mut self, _context: LayerContext) -> Result<(), LayerError> {
            self.log.borrow_mut().push((self.id, "start"));
            Ok(())
        }

        fn on_shutdown(&mut self) -> Result<(), LayerError> {
            self.log.borrow_mut().push((self.id, "shutdown"));
            if self.fail_shutdown {
                return Err(LayerError::Lifecycle {
                    operation: "shut down",
                    state: "not started",
                });
            }
            Ok(())
        }

        fn on_message(&mut self, _message: Message) -> Result<(), LayerError> {
            self.log.borrow_mut().push((self.id, "message"));
            if self.fail_messages {
                return Err(LayerError::Lifecycle {
                    operation: "handle messages in",
                    state: "not started",
                });
            }
            Ok(())
        }
    }

    struct NullRenderer(Cell<usize>);

    impl Renderer for NullRenderer {
        fn triangle_fan(&mut self, _vertices: &[glam::DVec3], _color: crate::render::Color) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn touch() -> MotionEvent {
        MotionEvent::new(Action::Down, 0.0, 0.0, Duration::ZERO)
    }

    #[test]
    fn test_touch_dispatch_is_top_down() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut stack = LayerStack::new();
        stack.push(Recorder::boxed(1, false, &log));
        stack.push(Recorder::boxed(2, true, &log));
        stack.push(Recorder::boxed(3, false, &log));

        assert!(stack.dispatch_touch(&touch()).unwrap());
        assert_eq!(*log.borrow(), vec![(3, "touch"), (2, "touch")]);
    }

    #[test]
    fn test_unconsumed_touch_reaches_every_layer() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut stack = LayerStack::new();
        stack.push(Recorder::boxed(1, false, &log));
        stack.push(Recorder::boxed(2, false, &log));

        assert!(!stack.dispatch_touch(&touch()).unwrap());
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_draw_bottom_up_and_pump() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut stack = LayerStack::new();
        stack.push(Recorder::boxed(1, false, &log));
        stack.push(Recorder::boxed(2, false, &log));

        let mut renderer = NullRenderer(Cell::new(0));
        stack.draw(&mut renderer);

        let handler = Handler::new();
        handler.post(Message::InstallGestureDetector);
        handler.post_at_time(Message::LongPress, Duration::from_secs(1));
        stack.pump(&handler, Duration::ZERO).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![(1, "draw"), (2, "draw"), (1, "message"), (2, "message")]
        );
        assert_eq!(handler.len(), 1);
    }

    #[test]
    fn test_shutdown_reverse_order_reports_first_error() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut stack = LayerStack::new();
        let mut failing = Recorder::boxed(1, false, &log);
        failing.fail_shutdown = true;
        stack.push(failing);
        stack.push(Recorder::boxed(2, false, &log));

        assert!(matches!(stack.shutdown(), Err(LayerError::Lifecycle { .. })));
        assert_eq!(*log.borrow(), vec![(2, "shutdown"), (1, "shutdown")]);
    }

    #[test]
    fn test_pump_continues_after_layer_error() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut stack = LayerStack::new();
        let mut failing = Recorder::boxed(1, false, &log);
        failing.fail_messages = true;
        stack.push(failing);
        stack.push(Recorder::boxed(2, false, &log));

        let handler = Handler::new();
        handler.post(Message::InstallGestureDetector);
        handler.post(Message::LongPress);

        assert!(matches!(
            stack.pump(&handler, Duration::ZERO),
            Err(LayerError::Lifecycle { .. })
        ));
        assert_eq!(
            *log.borrow(),
            vec![(1, "message"), (2, "message"), (1, "message"), (2, "message")]
        );
        assert!(handler.is_empty());
    }

    #[test]
    fn test_failing_layer_does_not_block_detector_install() {
        use crate::camera::Camera;
        use crate::gesture::ViewContext;
        use crate::pose_publisher::PosePublisherLayer;
        use posepad_bus::{Bus, LocalNode};
        use posepad_core::GraphName;

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut failing = Recorder::boxed(1, false, &log);
        failing.fail_messages = true;

        let mut camera = Camera::new(GraphName::new("map").unwrap());
        camera.set_viewport(100, 100);
        let handler = Handler::new();
        let context = LayerContext {
            session: Rc::new(LocalNode::new(&GraphName::new("/viewer").unwrap(), Bus::new())),
            handler: handler.clone(),
            camera: camera.shared(),
            frames: Rc::new(RefCell::new(FrameTree::new())),
            render_request: RenderRequest::new(),
        };

        let mut stack = LayerStack::new();
        stack.push(failing);
        stack.push(Box::new(PosePublisherLayer::new(
            GraphName::new("/goal").unwrap(),
            ViewContext::default(),
        )));
        stack.start(&context).unwrap();
        assert!(stack.pump(&handler, Duration::ZERO).is_err());

        // The pose layer got its detector: a held press now arms a long press
        let down = MotionEvent::new(Action::Down, 50.0, 50.0, Duration::ZERO);
        assert!(!stack.dispatch_touch(&down).unwrap());
        assert!(handler.has_messages(Message::LongPress));
    }
}
