//! In-process topic bus
//!
//! Each topic is a broadcast channel carrying JSON envelopes. The first
//! publisher or subscriber fixes a topic's message type; later users must
//! agree with it.

use posepad_core::{GraphName, Message};
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, info, warn};

use crate::session::RawPublisher;

const DEFAULT_CAPACITY: usize = 100;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("Topic {topic} carries {existing}, not {requested}")]
    TypeMismatch {
        topic: GraphName,
        existing: String,
        requested: String,
    },
    #[error("Publisher for {0} has been shut down")]
    Shutdown(GraphName),
    #[error("Subscription to {0} is closed")]
    Closed(GraphName),
    #[error("Message codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("Topic registry lock poisoned")]
    Poisoned,
}

/// One message in flight on a topic
#[derive(Debug, Clone)]
pub struct Envelope {
    pub topic: GraphName,
    pub message_type: String,
    pub payload: Value,
}

struct TopicChannel {
    message_type: String,
    sender: broadcast::Sender<Envelope>,
    publishers: usize,
}

type Registry = Arc<Mutex<HashMap<GraphName, TopicChannel>>>;

/// Shared in-process topic registry; clones refer to the same bus
#[derive(Clone)]
pub struct Bus {
    topics: Registry,
    capacity: usize,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Bus whose topics buffer up to `capacity` messages per subscriber
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<GraphName, TopicChannel>>, BusError> {
        self.topics.lock().map_err(|_| BusError::Poisoned)
    }

    /// Sender for `topic`, creating the topic if it does not exist yet
    fn channel(
        topics: &mut HashMap<GraphName, TopicChannel>,
        topic: &GraphName,
        message_type: &str,
        capacity: usize,
    ) -> Result<broadcast::Sender<Envelope>, BusError> {
        if let Some(channel) = topics.get(topic) {
            if channel.message_type != message_type {
                return Err(BusError::TypeMismatch {
                    topic: topic.clone(),
                    existing: channel.message_type.clone(),
                    requested: message_type.to_string(),
                });
            }
            return Ok(channel.sender.clone());
        }

        let (sender, _) = broadcast::channel(capacity);
        topics.insert(
            topic.clone(),
            TopicChannel {
                message_type: message_type.to_string(),
                sender: sender.clone(),
                publishers: 0,
            },
        );
        debug!(topic = %topic, message_type, "Topic created");
        Ok(sender)
    }

    /// Register a publisher on `topic`
    pub fn advertise(
        &self,
        topic: &GraphName,
        message_type: &str,
    ) -> Result<BusPublisher, BusError> {
        let mut topics = self.lock()?;
        let sender = Self::channel(&mut topics, topic, message_type, self.capacity)?;
        if let Some(channel) = topics.get_mut(topic) {
            channel.publishers += 1;
        }

        info!(topic = %topic, message_type, "Publisher advertised");
        Ok(BusPublisher {
            topic: topic.clone(),
            message_type: message_type.to_string(),
            sender: Some(sender),
            topics: self.topics.clone(),
        })
    }

    /// Receive every message published on `topic` from now on
    pub fn subscribe<M: Message>(&self, topic: &GraphName) -> Result<Subscriber<M>, BusError> {
        let mut topics = self.lock()?;
        let sender = Self::channel(&mut topics, topic, M::TYPE, self.capacity)?;

        debug!(topic = %topic, message_type = M::TYPE, "Subscribed");
        Ok(Subscriber {
            topic: topic.clone(),
            receiver: sender.subscribe(),
            _message: PhantomData,
        })
    }

    /// Known topics with their message types, sorted by name
    pub fn topics(&self) -> Result<Vec<(GraphName, String)>, BusError> {
        let topics = self.lock()?;
        let mut list: Vec<_> = topics
            .iter()
            .map(|(name, channel)| (name.clone(), channel.message_type.clone()))
            .collect();
        list.sort();
        Ok(list)
    }

    /// Number of live publishers on `topic`
    pub fn publisher_count(&self, topic: &GraphName) -> Result<usize, BusError> {
        let topics = self.lock()?;
        Ok(topics.get(topic).map(|c| c.publishers).unwrap_or(0))
    }
}

/// Publish handle on a `Bus` topic
pub struct BusPublisher {
    topic: GraphName,
    message_type: String,
    sender: Option<broadcast::Sender<Envelope>>,
    topics: Registry,
}

impl RawPublisher for BusPublisher {
    fn topic(&self) -> &GraphName {
        &self.topic
    }

    fn message_type(&self) -> &str {
        &self.message_type
    }

    fn publish_value(&self, payload: Value) -> Result<(), BusError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| BusError::Shutdown(self.topic.clone()))?;

        let envelope = Envelope {
            topic: self.topic.clone(),
            message_type: self.message_type.clone(),
            payload,
        };

        // Nobody listening is not an error for pub/sub
        if sender.send(envelope).is_err() {
            debug!(topic = %self.topic, "No subscribers, message dropped");
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        if self.sender.take().is_none() {
            return;
        }
        match self.topics.lock() {
            Ok(mut topics) => {
                if let Some(channel) = topics.get_mut(&self.topic) {
                    channel.publishers = channel.publishers.saturating_sub(1);
                }
            }
            Err(_) => warn!(topic = %self.topic, "Topic registry poisoned during shutdown"),
        }
    }

    fn is_shutdown(&self) -> bool {
        self.sender.is_none()
    }
}

impl Drop for BusPublisher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Typed subscription to one topic
pub struct Subscriber<M: Message> {
    topic: GraphName,
    receiver: broadcast::Receiver<Envelope>,
    _message: PhantomData<fn() -> M>,
}

impl<M: Message> Subscriber<M> {
    pub fn topic(&self) -> &GraphName {
        &self.topic
    }

    fn decode(envelope: Envelope) -> Result<M, BusError> {
        Ok(serde_json::from_value(envelope.payload)?)
    }

    /// Next queued message without waiting, or `None` if nothing is queued
    pub fn try_recv(&mut self) -> Result<Option<M>, BusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(envelope) => return Self::decode(envelope).map(Some),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "Subscriber lagged");
                }
                Err(TryRecvError::Closed) => return Err(BusError::Closed(self.topic.clone())),
            }
        }
    }

    /// Wait for the next message
    pub async fn recv(&mut self) -> Result<M, BusError> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) => return Self::decode(envelope),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "Subscriber lagged");
                }
                Err(RecvError::Closed) => return Err(BusError::Closed(self.topic.clone())),
            }
        }
    }
}
