//! Pose publisher overlay
//!
//! Long-press on the map to drop a pose, drag to aim it, release to publish
//! it as a `geometry_msgs/PoseStamped` in the camera's fixed frame.

use glam::DVec3;
use posepad_bus::{Publisher, Session, SessionExt};
use posepad_core::geometry::rotation_between;
use posepad_core::{GraphName, GraphNameError, PoseStamped, Transform};
use std::rc::Rc;
use tracing::{debug, info, trace};

use crate::camera::{ScreenPoint, SharedCamera};
use crate::gesture::{Action, Gesture, GestureConfig, GestureDetector, MotionEvent, ViewContext};
use crate::handler::{Handler, Message};
use crate::layer::{LayerContext, LayerError, VisualizationLayer};
use crate::render::{Color, RenderRequest, Renderer};
use crate::shape::TriangleFanShape;

/// Arrow marker outline in meters, hub first; +x is the heading
pub const POSE_MARKER_VERTICES: [[f64; 3]; 10] = [
    [0.0, 0.0, 0.0],      // center
    [-0.251, 0.0, 0.0],   // bottom
    [-0.075, -0.075, 0.0], // bottom right
    [0.0, -0.251, 0.0],   // right
    [0.075, -0.075, 0.0], // top right
    [0.510, 0.0, 0.0],    // top
    [0.075, 0.075, 0.0],  // top left
    [0.0, 0.251, 0.0],    // left
    [-0.075, 0.075, 0.0], // bottom left
    [-0.251, 0.0, 0.0],   // bottom again
];

pub const POSE_MARKER_COLOR: Color = Color::new(0.847_058_8, 0.243_137_26, 0.8, 1.0);

/// Whether a pose is being edited
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditState {
    Idle,
    Editing(Transform),
}

struct Attached {
    session: Rc<dyn Session>,
    publisher: Publisher<PoseStamped>,
    camera: SharedCamera,
    handler: Handler,
    render_request: RenderRequest,
    gestures: Option<GestureDetector>,
}

enum Lifecycle {
    Detached,
    Started(Box<Attached>),
    Shutdown,
}

impl Lifecycle {
    fn describe(&self) -> &'static str {
        match self {
            Lifecycle::Detached => "not started",
            Lifecycle::Started(_) => "already started",
            Lifecycle::Shutdown => "shut down",
        }
    }
}

pub struct PosePublisherLayer {
    topic: GraphName,
    context: ViewContext,
    gesture_config: Option<GestureConfig>,
    shape: TriangleFanShape,
    state: EditState,
    lifecycle: Lifecycle,
}

impl PosePublisherLayer {
    pub fn new(topic: GraphName, context: ViewContext) -> Self {
        Self {
            topic,
            context,
            gesture_config: None,
            shape: TriangleFanShape::new(&POSE_MARKER_VERTICES, POSE_MARKER_COLOR),
            state: EditState::Idle,
            lifecycle: Lifecycle::Detached,
        }
    }

    pub fn from_topic(topic: &str, context: ViewContext) -> Result<Self, GraphNameError> {
        Ok(Self::new(GraphName::new(topic)?, context))
    }

    /// Use fixed gesture thresholds instead of ones derived from the display
    pub fn with_gesture_config(mut self, config: GestureConfig) -> Self {
        self.gesture_config = Some(config);
        self
    }

    pub fn topic(&self) -> &GraphName {
        &self.topic
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn is_visible(&self) -> bool {
        matches!(self.state, EditState::Editing(_))
    }

    pub fn pose(&self) -> Option<&Transform> {
        match &self.state {
            EditState::Editing(pose) => Some(pose),
            EditState::Idle => None,
        }
    }

    pub fn shape(&self) -> &TriangleFanShape {
        &self.shape
    }

    pub fn is_started(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Started(_))
    }

    /// Whether the deferred gesture detector install has run
    pub fn has_gesture_detector(&self) -> bool {
        match &self.lifecycle {
            Lifecycle::Started(attached) => attached.gestures.is_some(),
            _ => false,
        }
    }

    fn start_edit(&mut self, point: ScreenPoint) -> Result<(), LayerError> {
        let Lifecycle::Started(attached) = &self.lifecycle else {
            return Ok(());
        };

        let position = attached.camera.borrow().to_world_coordinates(point)?;
        let pose = Transform::from_translation(position);
        self.shape.set_pose(pose);
        self.state = EditState::Editing(pose);
        attached.render_request.request();

        debug!(x = position.x, y = position.y, "Pose edit started");
        Ok(())
    }

    fn handle_long_press(&mut self) -> Result<(), LayerError> {
        let gesture = match &mut self.lifecycle {
            Lifecycle::Started(attached) => attached
                .gestures
                .as_mut()
                .and_then(|gestures| gestures.on_long_press_timeout()),
            _ => None,
        };

        match gesture {
            Some(Gesture::LongPress(_)) if self.is_visible() => {
                trace!("Long press ignored during an edit");
                Ok(())
            }
            Some(Gesture::LongPress(point)) => self.start_edit(point),
            _ => Ok(()),
        }
    }
}

impl VisualizationLayer for PosePublisherLayer {
    fn draw(&mut self, renderer: &mut dyn Renderer) {
        if !self.is_visible() {
            return;
        }
        let Lifecycle::Started(attached) = &self.lifecycle else {
            return;
        };

        let zoom = attached.camera.borrow().scaling_factor();
        self.shape.set_scale_factor(1.0 / zoom);
        self.shape.draw(renderer);
    }

    fn on_touch_event(&mut self, event: &MotionEvent) -> Result<bool, LayerError> {
        let Lifecycle::Started(attached) = &mut self.lifecycle else {
            return Ok(false);
        };

        if let EditState::Editing(pose) = &mut self.state {
            match event.action {
                Action::Move => {
                    let target = attached.camera.borrow().to_world_coordinates(event.point())?;
                    // Keep the previous heading if the pointer is back on the position
                    if let Some(rotation) = rotation_between(DVec3::X, target - pose.translation) {
                        pose.set_rotation(rotation);
                    }
                    self.shape.set_pose(*pose);
                    attached.render_request.request();
                    return Ok(true);
                }
                Action::Up => {
                    let pose = *pose;
                    let frame = attached.camera.borrow().fixed_frame().clone();
                    let stamp = attached.session.current_time();
                    let message = pose.to_pose_stamped_message(&frame, stamp);

                    self.state = EditState::Idle;
                    attached.render_request.request();
                    attached.publisher.publish(&message)?;

                    info!(
                        topic = %attached.publisher.topic(),
                        frame = %frame,
                        x = pose.translation.x,
                        y = pose.translation.y,
                        yaw = pose.yaw(),
                        "Published pose"
                    );
                    return Ok(true);
                }
                _ => {}
            }
        }

        if let Some(gestures) = attached.gestures.as_mut() {
            if let Some(gesture) = gestures.on_touch_event(event) {
                trace!(?gesture, "Gesture passed through");
            }
        }
        Ok(false)
    }

    fn on_start(&mut self, context: LayerContext) -> Result<(), LayerError> {
        if !matches!(self.lifecycle, Lifecycle::Detached) {
            return Err(LayerError::Lifecycle {
                operation: "start",
                state: self.lifecycle.describe(),
            });
        }

        let publisher = context.session.new_publisher::<PoseStamped>(&self.topic)?;
        info!(topic = %publisher.topic(), "Pose publisher layer started");

        // The detector is built on the UI queue once activation returns
        context.handler.post(Message::InstallGestureDetector);

        self.lifecycle = Lifecycle::Started(Box::new(Attached {
            session: context.session,
            publisher,
            camera: context.camera,
            handler: context.handler,
            render_request: context.render_request,
            gestures: None,
        }));
        Ok(())
    }

    fn on_shutdown(&mut self) -> Result<(), LayerError> {
        match std::mem::replace(&mut self.lifecycle, Lifecycle::Shutdown) {
            Lifecycle::Started(mut attached) => {
                attached.publisher.shutdown();
                attached.handler.remove_messages(Message::LongPress);
                attached.handler.remove_messages(Message::InstallGestureDetector);
                self.state = EditState::Idle;
                info!(topic = %self.topic, "Pose publisher layer shut down");
                Ok(())
            }
            other => {
                let state = other.describe();
                self.lifecycle = other;
                Err(LayerError::Lifecycle {
                    operation: "shut down",
                    state,
                })
            }
        }
    }

    fn on_message(&mut self, message: Message) -> Result<(), LayerError> {
        match message {
            Message::InstallGestureDetector => {
                if let Lifecycle::Started(attached) = &mut self.lifecycle {
                    if attached.gestures.is_none() {
                        let config = self
                            .gesture_config
                            .unwrap_or_else(|| GestureConfig::for_context(&self.context));
                        let detector = GestureDetector::new(config, attached.handler.clone());
                        attached.gestures = Some(detector);
                        debug!(touch_slop = config.touch_slop, "Gesture detector installed");
                    }
                }
                Ok(())
            }
            Message::LongPress => self.handle_long_press(),
        }
    }
}
