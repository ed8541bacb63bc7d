//! Keeps the trigger evaluation running on a fixed interval.
//!
//! Some hosts suspend a process that isn't doing anything they consider
//! real work. A [`LivenessKeeper`] is whatever the host needs to keep us
//! awake; [`SilentLoopKeeper`] loops a near silent sound, [`ThreadKeeper`]
//! is for hosts where the owner thread keeps running on its own.

use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use log::{debug, warn};

use crate::audio::{AudioPort, Loops};

/// audio session interruptions reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Began,
    Ended { should_resume: bool },
}

pub trait LivenessKeeper: Send {
    fn start(&mut self);
    /// an interruption began, start again with [`LivenessKeeper::resume`]
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
}

/// for hosts that never suspend the owner thread
#[derive(Debug, Default)]
pub struct ThreadKeeper;

impl LivenessKeeper for ThreadKeeper {
    fn start(&mut self) {}
    fn pause(&mut self) {}
    fn resume(&mut self) {}
    fn stop(&mut self) {}
}

/// loops an inaudible sound on the audio channel
pub struct SilentLoopKeeper {
    audio: Arc<dyn AudioPort>,
    sound: String,
}

impl fmt::Debug for SilentLoopKeeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SilentLoopKeeper")
            .field("sound", &self.sound)
            .finish_non_exhaustive()
    }
}

impl SilentLoopKeeper {
    #[must_use]
    pub fn new(audio: Arc<dyn AudioPort>, sound: impl Into<String>) -> Self {
        Self {
            audio,
            sound: sound.into(),
        }
    }

    fn play(&self) {
        if let Err(err) = self.audio.play(&self.sound, Loops::Forever) {
            warn!("couldn't start keep-alive sound {}: {err}", self.sound);
        }
    }
}

impl LivenessKeeper for SilentLoopKeeper {
    fn start(&mut self) {
        self.play();
    }

    fn pause(&mut self) {
        self.audio.stop();
    }

    fn resume(&mut self) {
        self.play();
    }

    fn stop(&mut self) {
        self.audio.stop();
    }
}

pub struct Ticker {
    interval: Duration,
    keeper: Box<dyn LivenessKeeper>,
    next_due: Option<Instant>,
}

impl fmt::Debug for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticker")
            .field("interval", &self.interval)
            .field("next_due", &self.next_due)
            .finish_non_exhaustive()
    }
}

impl Ticker {
    #[must_use]
    pub fn new(interval: Duration, keeper: Box<dyn LivenessKeeper>) -> Self {
        Self {
            interval,
            keeper,
            next_due: None,
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// starts the keeper and the tick schedule, a running ticker is restarted
    pub fn start(&mut self, now: Instant) {
        if self.is_running() {
            self.keeper.stop();
        }
        self.keeper.start();
        self.next_due = Some(now + self.interval);
        debug!("ticker started, every {:?}", self.interval);
    }

    pub fn stop(&mut self) {
        if self.next_due.take().is_some() {
            self.keeper.stop();
            debug!("ticker stopped");
        }
    }

    pub fn interruption(&mut self, interruption: Interruption) {
        if !self.is_running() {
            return;
        }
        match interruption {
            Interruption::Began => self.keeper.pause(),
            Interruption::Ended { should_resume: true } => self.keeper.resume(),
            Interruption::Ended { should_resume: false } => {}
        }
    }

    /// how long until the next tick, `None` while stopped
    #[must_use]
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }

    /// whether a tick is due at `now`, moving the schedule on if so.
    /// missed ticks are not made up for.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if due <= now => {
                let next = due + self.interval;
                self.next_due = Some(if next <= now { now + self.interval } else { next });
                true
            }
            _ => false,
        }
    }
}
