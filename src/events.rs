use std::sync::{
    mpsc::{self, Receiver, Sender},
    Arc, Mutex, PoisonError,
};

use crate::alarm::Alarm;

/// what the presentation layer hears about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmEvent {
    Triggered(Alarm),
    Snoozed(Alarm),
    Dismissed(Alarm),
}

impl AlarmEvent {
    #[must_use]
    pub const fn alarm(&self) -> &Alarm {
        match self {
            Self::Triggered(alarm) | Self::Snoozed(alarm) | Self::Dismissed(alarm) => alarm,
        }
    }
}

/// broadcasts [`AlarmEvent`]s to any number of subscribers (including none).
/// clones share the same subscriber list.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Sender<AlarmEvent>>>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<AlarmEvent> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sender);
        receiver
    }

    /// subscribers whose receiver was dropped are forgotten
    pub fn publish(&self, event: &AlarmEvent) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
