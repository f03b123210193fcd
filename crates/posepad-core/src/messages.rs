//! `geometry_msgs` message schema
//!
//! Field names and nesting match the robotics message definitions so the
//! JSON encoding on the bus reads like any other bridge payload.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::time::Time;

/// A message that can travel over a topic
pub trait Message: Serialize + DeserializeOwned + Clone + Send + 'static {
    /// Fully qualified message type, e.g. `geometry_msgs/PoseStamped`
    const TYPE: &'static str;

    /// Header to stamp with a sequence number, if the message has one
    fn header_mut(&mut self) -> Option<&mut Header> {
        None
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Orientation as a unit quaternion; `w` is the scalar part
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point,
    pub orientation: Quaternion,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Per-publisher sequence number, stamped at publish time
    pub seq: u32,
    pub stamp: Time,
    pub frame_id: String,
}

/// A pose with a reference frame and timestamp
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseStamped {
    pub header: Header,
    pub pose: Pose,
}

impl Message for Pose {
    const TYPE: &'static str = "geometry_msgs/Pose";
}

impl Message for PoseStamped {
    const TYPE: &'static str = "geometry_msgs/PoseStamped";

    fn header_mut(&mut self) -> Option<&mut Header> {
        Some(&mut self.header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pose_stamped_wire_format() {
        let msg = PoseStamped {
            header: Header {
                seq: 3,
                stamp: Time::new(12, 5),
                frame_id: "/map".to_string(),
            },
            pose: Pose {
                position: Point { x: 1.0, y: 2.0, z: 0.0 },
                orientation: Quaternion::default(),
            },
        };

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "header": {
                    "seq": 3,
                    "stamp": { "secs": 12, "nsecs": 5 },
                    "frame_id": "/map"
                },
                "pose": {
                    "position": { "x": 1.0, "y": 2.0, "z": 0.0 },
                    "orientation": { "x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0 }
                }
            })
        );
    }

    #[test]
    fn test_message_types() {
        assert_eq!(PoseStamped::TYPE, "geometry_msgs/PoseStamped");
        assert!(PoseStamped::default().header_mut().is_some());
        assert!(Pose::default().header_mut().is_none());
    }
}
