//! Local node: a `Session` on an in-process bus

use posepad_core::{GraphName, Time};
use std::sync::Arc;
use tracing::info;

use crate::bus::{Bus, BusError};
use crate::clock::{Clock, WallClock};
use crate::session::{RawPublisher, Session};

pub struct LocalNode {
    name: GraphName,
    namespace: GraphName,
    bus: Bus,
    clock: Arc<dyn Clock>,
}

impl LocalNode {
    /// Create a node on `bus`. Relative node names are placed under the root
    /// namespace; the node's namespace is the parent of its name.
    pub fn new(name: &GraphName, bus: Bus) -> Self {
        let name = name.resolve(&GraphName::root(), &GraphName::root());
        let namespace = name.parent().unwrap_or_else(GraphName::root);

        info!(node = %name, namespace = %namespace, "Node created");
        Self {
            name,
            namespace,
            bus,
            clock: Arc::new(WallClock),
        }
    }

    /// Use `clock` for message stamps instead of the wall clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }
}

impl Session for LocalNode {
    fn node_name(&self) -> &GraphName {
        &self.name
    }

    fn namespace(&self) -> &GraphName {
        &self.namespace
    }

    fn new_raw_publisher(
        &self,
        topic: &GraphName,
        message_type: &str,
    ) -> Result<Box<dyn RawPublisher>, BusError> {
        let resolved = self.resolve(topic);
        let publisher = self.bus.advertise(&resolved, message_type)?;
        Ok(Box::new(publisher))
    }

    fn current_time(&self) -> Time {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::session::SessionExt;
    use posepad_core::{PoseStamped, Transform};

    fn name(s: &str) -> GraphName {
        GraphName::new(s).unwrap()
    }

    #[test]
    fn test_namespace_from_name() {
        let node = LocalNode::new(&name("/robot/viewer"), Bus::new());
        assert_eq!(node.node_name().as_str(), "/robot/viewer");
        assert_eq!(node.namespace().as_str(), "/robot");

        let relative = LocalNode::new(&name("viewer"), Bus::new());
        assert_eq!(relative.node_name().as_str(), "/viewer");
        assert_eq!(relative.namespace(), &GraphName::root());
    }

    #[test]
    fn test_publisher_resolves_topic() {
        let bus = Bus::new();
        let node = LocalNode::new(&name("/robot/viewer"), bus.clone());
        let mut subscriber = bus.subscribe::<PoseStamped>(&name("/robot/goal")).unwrap();

        let mut publisher = node.new_publisher::<PoseStamped>(&name("goal")).unwrap();
        assert_eq!(publisher.topic().as_str(), "/robot/goal");

        let msg = Transform::identity().to_pose_stamped_message(&name("map"), node.current_time());
        publisher.publish(&msg).unwrap();
        assert!(subscriber.try_recv().unwrap().is_some());
    }

    #[test]
    fn test_manual_clock_stamps() {
        let clock = ManualClock::new(Time::new(42, 0));
        let node = LocalNode::new(&name("/viewer"), Bus::new()).with_clock(Arc::new(clock.clone()));
        assert_eq!(node.current_time(), Time::new(42, 0));

        clock.set(Time::new(43, 0));
        assert_eq!(node.current_time(), Time::new(43, 0));
    }
}
