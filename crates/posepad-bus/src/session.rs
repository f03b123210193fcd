//! Session and publish handles as seen by a layer

use posepad_core::{GraphName, Message, Time};
use std::marker::PhantomData;
use tracing::{debug, info};

use crate::bus::BusError;

/// An untyped publish handle for one topic
pub trait RawPublisher {
    fn topic(&self) -> &GraphName;

    fn message_type(&self) -> &str;

    /// Send one encoded message
    fn publish_value(&self, payload: serde_json::Value) -> Result<(), BusError>;

    /// Release the handle. Further publishes fail with `BusError::Shutdown`.
    fn shutdown(&mut self);

    fn is_shutdown(&self) -> bool;
}

/// A messaging session a layer is attached to
pub trait Session {
    /// Fully resolved name of this node
    fn node_name(&self) -> &GraphName;

    /// Namespace relative names resolve against
    fn namespace(&self) -> &GraphName;

    fn new_raw_publisher(
        &self,
        topic: &GraphName,
        message_type: &str,
    ) -> Result<Box<dyn RawPublisher>, BusError>;

    /// Current time for message stamps
    fn current_time(&self) -> Time;

    fn resolve(&self, name: &GraphName) -> GraphName {
        name.resolve(self.namespace(), self.node_name())
    }
}

/// Typed helpers on any `Session`, including `dyn Session`
pub trait SessionExt: Session {
    fn new_publisher<M: Message>(&self, topic: &GraphName) -> Result<Publisher<M>, BusError> {
        let raw = self.new_raw_publisher(topic, M::TYPE)?;
        Ok(Publisher::new(raw))
    }
}

impl<S: Session + ?Sized> SessionExt for S {}

/// Publish handle for messages of type `M`
pub struct Publisher<M: Message> {
    raw: Box<dyn RawPublisher>,
    seq: u32,
    _message: PhantomData<fn(M)>,
}

impl<M: Message> Publisher<M> {
    pub fn new(raw: Box<dyn RawPublisher>) -> Self {
        Self {
            raw,
            seq: 0,
            _message: PhantomData,
        }
    }

    pub fn topic(&self) -> &GraphName {
        self.raw.topic()
    }

    /// Encode and send `message`, stamping its header sequence number
    pub fn publish(&mut self, message: &M) -> Result<(), BusError> {
        let mut message = message.clone();
        if let Some(header) = message.header_mut() {
            header.seq = self.seq;
        }

        let payload = serde_json::to_value(&message)?;
        self.raw.publish_value(payload)?;

        debug!(topic = %self.raw.topic(), seq = self.seq, "Published message");
        self.seq = self.seq.wrapping_add(1);
        Ok(())
    }

    pub fn shutdown(&mut self) {
        if !self.raw.is_shutdown() {
            info!(topic = %self.raw.topic(), "Publisher shut down");
        }
        self.raw.shutdown();
    }

    pub fn is_shutdown(&self) -> bool {
        self.raw.is_shutdown()
    }
}

impl<M: Message> std::fmt::Debug for Publisher<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("topic", self.raw.topic())
            .field("message_type", &M::TYPE)
            .field("seq", &self.seq)
            .finish()
    }
}
