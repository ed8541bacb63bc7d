use std::sync::mpsc::{self, Receiver, Sender};

use crate::{
    alarm::{Alarm, AlarmSpec},
    error::{AlarmError, HandleError},
    evaluator::TriggerDecision,
    events::{AlarmEvent, EventBus},
    scheduler::SessionState,
    ticker::Interruption,
};

/// everything the scheduler's owner thread can be asked to do.
/// requests carry the sender their answer goes back on.
#[derive(Debug)]
pub enum Message {
    Schedule(Alarm, Sender<bool>),
    Unschedule(String, Sender<bool>),
    Update(String, AlarmSpec, Sender<Result<bool, AlarmError>>),
    Snooze(Sender<bool>),
    Dismiss(Sender<bool>),
    CancelSnooze(Sender<usize>),
    AllAlarms(Sender<Vec<Alarm>>),
    IsScheduled(String, Sender<bool>),
    State(Sender<SessionState>),
    /// evaluate right away, outside the ticker's schedule
    Tick(Sender<Vec<TriggerDecision>>),
    // reported by the audio and platform layers, nobody waits on these
    PlaybackFinished,
    Interruption(Interruption),
    Shutdown,
}

/// cheap to clone, every clone talks to the same scheduler
#[derive(Debug, Clone)]
pub struct Handle {
    sender: Sender<Message>,
    events: EventBus,
}

/// the handle and the receiving end to give to [`crate::daemon::spawn`]
#[must_use]
pub fn channel(events: EventBus) -> (Handle, Receiver<Message>) {
    let (sender, receiver) = mpsc::channel();
    (Handle { sender, events }, receiver)
}

impl Handle {
    fn send(&self, message: Message) -> Result<(), HandleError> {
        self.sender.send(message).map_err(|_| HandleError::Stopped)
    }

    fn request<T>(&self, message: impl FnOnce(Sender<T>) -> Message) -> Result<T, HandleError> {
        let (reply, answer) = mpsc::channel();
        self.send(message(reply))?;
        answer.recv().map_err(|_| HandleError::Stopped)
    }

    pub fn schedule(&self, alarm: Alarm) -> Result<bool, HandleError> {
        self.request(|reply| Message::Schedule(alarm, reply))
    }

    pub fn unschedule(&self, id: &str) -> Result<bool, HandleError> {
        self.request(|reply| Message::Unschedule(id.to_string(), reply))
    }

    pub fn update(&self, id: &str, spec: AlarmSpec) -> Result<bool, HandleError> {
        self.request(|reply| Message::Update(id.to_string(), spec, reply))?
            .map_err(HandleError::from)
    }

    pub fn snooze(&self) -> Result<bool, HandleError> {
        self.request(Message::Snooze)
    }

    pub fn dismiss(&self) -> Result<bool, HandleError> {
        self.request(Message::Dismiss)
    }

    pub fn cancel_snooze(&self) -> Result<usize, HandleError> {
        self.request(Message::CancelSnooze)
    }

    pub fn all_alarms(&self) -> Result<Vec<Alarm>, HandleError> {
        self.request(Message::AllAlarms)
    }

    pub fn is_scheduled(&self, id: &str) -> Result<bool, HandleError> {
        self.request(|reply| Message::IsScheduled(id.to_string(), reply))
    }

    pub fn state(&self) -> Result<SessionState, HandleError> {
        self.request(Message::State)
    }

    pub fn tick_now(&self) -> Result<Vec<TriggerDecision>, HandleError> {
        self.request(Message::Tick)
    }

    pub fn playback_finished(&self) -> Result<(), HandleError> {
        self.send(Message::PlaybackFinished)
    }

    pub fn audio_interruption(&self, interruption: Interruption) -> Result<(), HandleError> {
        self.send(Message::Interruption(interruption))
    }

    pub fn shutdown(&self) -> Result<(), HandleError> {
        self.send(Message::Shutdown)
    }

    pub fn subscribe(&self) -> Receiver<AlarmEvent> {
        self.events.subscribe()
    }
}
