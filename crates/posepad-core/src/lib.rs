//! Posepad Core - Shared types for the pose overlay
//!
//! This crate provides the foundational types used across posepad:
//! - Graph names for topics, namespaces, and coordinate frames
//! - Message timestamps
//! - Rigid transforms and the conversion to pose messages
//! - The `geometry_msgs` message schema carried on the bus
//! - A frame tree for looking up transforms between coordinate frames

pub mod frames;
pub mod geometry;
pub mod messages;
pub mod name;
pub mod time;

pub use frames::FrameTree;
pub use geometry::Transform;
pub use messages::{Header, Message, Point, Pose, PoseStamped, Quaternion};
pub use name::{GraphName, GraphNameError};
pub use time::Time;
