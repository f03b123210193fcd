//! Posepad Bus - Publish/subscribe messaging for overlay layers
//!
//! This crate provides the messaging collaborators a layer sees when it is
//! attached to a live session:
//! - `Session`, the handle a layer acquires publishers from
//! - typed `Publisher`s and `Subscriber`s carrying JSON-encoded messages
//! - `Bus`, an in-process topic registry built on broadcast channels
//! - `LocalNode`, a `Session` bound to a bus, a namespace, and a clock

pub mod bus;
pub mod clock;
pub mod node;
pub mod session;

pub use bus::{Bus, BusError, BusPublisher, Envelope, Subscriber};
pub use clock::{Clock, ManualClock, WallClock};
pub use node::LocalNode;
pub use session::{Publisher, RawPublisher, Session, SessionExt};
