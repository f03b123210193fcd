//! Posepad Overlay - Interactive layers drawn over a 2D map view
//!
//! This crate provides:
//! - A top-down `Camera` that maps screen pixels onto the map plane
//! - Touch events, gesture recognition, and a UI-thread message queue
//! - The `VisualizationLayer` capability and a `LayerStack` to host layers
//! - `PosePublisherLayer`, which lets the user place and aim a pose and
//!   publishes it as a `geometry_msgs/PoseStamped`

pub mod camera;
pub mod gesture;
pub mod handler;
pub mod layer;
pub mod pose_publisher;
pub mod render;
pub mod shape;

pub use camera::{Camera, CameraError, ScreenPoint, SharedCamera, Viewport};
pub use gesture::{Action, Gesture, GestureConfig, GestureDetector, MotionEvent, ViewContext};
pub use handler::{Handler, Message};
pub use layer::{LayerContext, LayerError, LayerStack, SharedFrameTree, VisualizationLayer};
pub use pose_publisher::{EditState, PosePublisherLayer};
pub use render::{Color, RenderRequest, Renderer};
pub use shape::TriangleFanShape;
