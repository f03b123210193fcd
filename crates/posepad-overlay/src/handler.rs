//! UI-thread message queue
//!
//! Layers post work here instead of running it inline: the host drains due
//! messages once per frame and hands them to its layers. Times are host
//! uptime, the same clock that stamps `MotionEvent`s.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Work a layer scheduled for itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Message {
    /// Create the layer's gesture detector once activation has finished
    InstallGestureDetector,
    /// A press may have been held long enough to count as a long press
    LongPress,
}

#[derive(Debug)]
struct Scheduled {
    when: Duration,
    seq: u64,
    message: Message,
}

#[derive(Debug, Default)]
struct Queue {
    scheduled: Vec<Scheduled>,
    next_seq: u64,
}

/// Handle to the UI queue; clones post to the same queue
#[derive(Debug, Clone, Default)]
pub struct Handler {
    queue: Rc<RefCell<Queue>>,
}

impl Handler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `message` on the next pump
    pub fn post(&self, message: Message) {
        self.post_at_time(message, Duration::ZERO);
    }

    /// Run `message` on the first pump at or after `when`
    pub fn post_at_time(&self, message: Message, when: Duration) {
        let mut queue = self.queue.borrow_mut();
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.scheduled.push(Scheduled { when, seq, message });
    }

    /// Drop every pending `message`; returns how many were removed
    pub fn remove_messages(&self, message: Message) -> usize {
        let mut queue = self.queue.borrow_mut();
        let before = queue.scheduled.len();
        queue.scheduled.retain(|s| s.message != message);
        before - queue.scheduled.len()
    }

    pub fn has_messages(&self, message: Message) -> bool {
        self.queue
            .borrow()
            .scheduled
            .iter()
            .any(|s| s.message == message)
    }

    /// Remove and return messages due at `now`, earliest first, posting
    /// order breaking ties
    pub fn take_due(&self, now: Duration) -> Vec<Message> {
        let mut queue = self.queue.borrow_mut();
        let (mut due, pending): (Vec<_>, Vec<_>) =
            queue.scheduled.drain(..).partition(|s| s.when <= now);
        queue.scheduled = pending;

        due.sort_by_key(|s| (s.when, s.seq));
        due.into_iter().map(|s| s.message).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().scheduled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_post_runs_on_next_pump() {
        let handler = Handler::new();
        handler.post(Message::InstallGestureDetector);
        assert_eq!(handler.take_due(Duration::ZERO), vec![Message::InstallGestureDetector]);
        assert!(handler.is_empty());
    }

    #[test]
    fn test_delayed_messages_wait() {
        let handler = Handler::new();
        handler.post_at_time(Message::LongPress, ms(600));
        assert!(handler.take_due(ms(599)).is_empty());
        assert_eq!(handler.take_due(ms(600)), vec![Message::LongPress]);
    }

    #[test]
    fn test_order_by_time_then_posting() {
        let handler = Handler::new();
        handler.post_at_time(Message::LongPress, ms(20));
        handler.post_at_time(Message::InstallGestureDetector, ms(10));
        handler.post_at_time(Message::LongPress, ms(10));

        assert_eq!(
            handler.take_due(ms(50)),
            vec![
                Message::InstallGestureDetector,
                Message::LongPress,
                Message::LongPress
            ]
        );
    }

    #[test]
    fn test_remove_messages() {
        let handler = Handler::new();
        let clone = handler.clone();
        clone.post_at_time(Message::LongPress, ms(600));
        handler.post(Message::InstallGestureDetector);

        assert!(handler.has_messages(Message::LongPress));
        assert_eq!(handler.remove_messages(Message::LongPress), 1);
        assert!(!clone.has_messages(Message::LongPress));
        assert_eq!(handler.len(), 1);
    }
}
