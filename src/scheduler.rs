//! The alarm state machine.
//!
//! At most one alarm is live at a time: the session is either waiting,
//! ringing one alarm ([`SessionState::Triggered`]) or holding one snoozed
//! alarm ([`SessionState::Snoozed`]). Every transition updates the alarm in
//! the registry, the audio channel, the platform alerts and the event bus
//! together. Failures of those ports are logged and never reach the caller.

use std::{sync::Arc, time::Instant};

use chrono::{Duration, NaiveDateTime};
use log::{debug, info, warn};

use crate::{
    alarm::{Alarm, AlarmSpec},
    audio::{self, AudioPort, Loops},
    config::FinishedAction,
    error::AlarmError,
    evaluator::{self, TriggerDecision},
    events::{AlarmEvent, EventBus},
    notify::{NotificationPort, Notifications},
    registry::Registry,
    ticker::{Interruption, Ticker},
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Waiting,
    /// id of the ringing alarm
    Triggered(String),
    /// id of the snoozed alarm
    Snoozed(String),
}

impl SessionState {
    #[must_use]
    pub fn active_alarm(&self) -> Option<&str> {
        match self {
            Self::Waiting => None,
            Self::Triggered(id) | Self::Snoozed(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub tolerance_seconds: u32,
    pub snooze_minutes: u32,
    pub melody_loops: u32,
    pub on_playback_finished: FinishedAction,
    /// sounds a random melody is picked from
    pub melodies: Vec<String>,
    pub default_sound: String,
}

impl Default for Settings {
    fn default() -> Self {
        crate::config::Config::default().settings()
    }
}

pub struct Scheduler {
    settings: Settings,
    registry: Registry,
    state: SessionState,
    audio: Arc<dyn AudioPort>,
    notifications: Notifications,
    ticker: Ticker,
    events: EventBus,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("settings", &self.settings)
            .field("registry", &self.registry)
            .field("state", &self.state)
            .field("ticker", &self.ticker)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    #[must_use]
    pub fn new(
        settings: Settings,
        registry: Registry,
        audio: Arc<dyn AudioPort>,
        notifier: Box<dyn NotificationPort>,
        ticker: Ticker,
        events: EventBus,
    ) -> Self {
        Self {
            settings,
            registry,
            state: SessionState::Waiting,
            audio,
            notifications: Notifications::new(notifier),
            ticker,
            events,
        }
    }

    /// brings persisted alarms in line with a fresh session and starts ticking.
    /// a snooze left over from a previous run is dropped rather than resumed.
    pub fn init(&mut self) {
        let swept = self.cancel_snooze();
        if swept > 0 {
            info!("dropped {swept} snooze(s) left from the last run");
        }
        for id in self.registry.ids() {
            if let Some(alarm) = self.registry.get(&id).cloned() {
                self.notifications.refresh(self.registry.store_mut(), &alarm);
            }
        }
        self.ticker.start(Instant::now());
        info!("scheduler started with {} alarm(s)", self.registry.len());
    }

    pub fn shutdown(&mut self) {
        self.ticker.stop();
        if matches!(self.state, SessionState::Triggered(_)) {
            self.audio.stop();
        }
        info!("scheduler shut down");
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn triggered_alarm(&self) -> Option<&Alarm> {
        match &self.state {
            SessionState::Triggered(id) => self.registry.get(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn snoozed_alarm(&self) -> Option<&Alarm> {
        match &self.state {
            SessionState::Snoozed(id) => self.registry.get(id),
            _ => None,
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn all_alarms(&self) -> Vec<Alarm> {
        self.registry.all_alarms()
    }

    #[must_use]
    pub fn is_scheduled(&self, id: &str) -> bool {
        self.registry.is_scheduled(id)
    }

    #[must_use]
    pub const fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn ticker_mut(&mut self) -> &mut Ticker {
        &mut self.ticker
    }

    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// adds an alarm, an id that is already scheduled is ignored
    pub fn schedule(&mut self, alarm: Alarm) -> bool {
        let alarm_for_alerts = alarm.clone();
        if !self.registry.schedule(alarm) {
            return false;
        }
        info!("scheduled {alarm_for_alerts} ({})", alarm_for_alerts.id());
        self.notifications
            .register_alarm(self.registry.store_mut(), &alarm_for_alerts);
        true
    }

    pub fn unschedule(&mut self, id: &str) -> bool {
        if !self.registry.is_scheduled(id) {
            return false;
        }
        self.release(id);
        self.notifications.cancel(self.registry.store_mut(), id);
        self.registry.unschedule(id);
        info!("unscheduled alarm {id}");
        true
    }

    /// replaces the alarm's values. `Ok(false)` for an unknown id.
    pub fn update(
        &mut self,
        id: &str,
        spec: AlarmSpec,
        now: NaiveDateTime,
    ) -> Result<bool, AlarmError> {
        spec.validate()?;
        if !self.registry.is_scheduled(id) {
            return Ok(false);
        }
        self.release(id);
        let Some(alarm) = self.registry.update(id, spec, now)?.cloned() else {
            return Ok(false);
        };
        self.notifications.refresh(self.registry.store_mut(), &alarm);
        info!("updated {alarm} ({id})");
        Ok(true)
    }

    /// evaluates every alarm at `now`, acting on each decision before
    /// looking at the next alarm. returns the decisions acted upon.
    pub fn tick(&mut self, now: NaiveDateTime) -> Vec<TriggerDecision> {
        let mut decisions = Vec::new();
        for id in self.registry.ids() {
            let Some(alarm) = self.registry.get(&id) else {
                continue;
            };
            let tolerance = self.settings.tolerance_seconds;
            if let Some(decision) = evaluator::evaluate_alarm(alarm, now, tolerance) {
                self.apply(&decision, now);
                decisions.push(decision);
            }
        }
        if decisions.is_empty() {
            log::trace!("tick at {now}: nothing due");
        }
        decisions
    }

    pub fn apply(&mut self, decision: &TriggerDecision, now: NaiveDateTime) {
        debug!("{decision:?} at {now}");
        self.trigger(decision.alarm_id(), now);
    }

    fn trigger(&mut self, id: &str, now: NaiveDateTime) {
        if !self.registry.is_scheduled(id) {
            return;
        }
        // only one alarm may be live
        match std::mem::take(&mut self.state) {
            SessionState::Snoozed(other) if other != id => {
                debug!("alarm {other} loses its snooze to {id}");
                self.clear_snooze(&other);
            }
            SessionState::Triggered(other) if other != id => {
                debug!("alarm {other} stops ringing for {id}");
                self.audio.stop();
            }
            _ => {}
        }

        let Some(alarm) = self.registry.get_mut(id) else {
            return;
        };
        alarm.last_trigger_date = Some(now);
        alarm.snooze_date = None;
        if alarm.is_one_time() {
            alarm.is_active = false;
        }
        let alarm = alarm.clone();
        self.registry.persist(id);
        self.notifications.refresh(self.registry.store_mut(), &alarm);

        self.state = SessionState::Triggered(id.to_string());
        // the melody gets the audio channel to itself
        self.ticker.stop();
        let melody = audio::resolve_melody(
            &alarm.melody,
            &self.settings.melodies,
            &self.settings.default_sound,
        );
        let played = self
            .audio
            .play(&melody, Loops::Times(self.settings.melody_loops));
        info!("alarm {alarm} ({id}) triggered, playing {melody:?}");
        self.events.publish(&AlarmEvent::Triggered(alarm));
        if let Err(err) = played {
            // a melody that never starts counts as one that already finished
            warn!("couldn't play {melody:?} for alarm {id}: {err}");
            self.playback_finished(now);
        }
    }

    /// snoozes the ringing alarm, a no-op unless an alarm that allows snoozing is ringing
    pub fn snooze(&mut self, now: NaiveDateTime) -> bool {
        let SessionState::Triggered(id) = &self.state else {
            debug!("nothing ringing to snooze");
            return false;
        };
        let id = id.clone();
        let deadline = now + Duration::minutes(i64::from(self.settings.snooze_minutes));
        let Some(alarm) = self.registry.get_mut(&id) else {
            return false;
        };
        if !alarm.snooze_enabled {
            debug!("alarm {id} can't be snoozed");
            return false;
        }
        alarm.snooze_date = Some(deadline);
        let alarm = alarm.clone();
        self.registry.persist(&id);
        self.audio.stop();
        self.state = SessionState::Snoozed(id.clone());
        self.notifications
            .register_snooze(self.registry.store_mut(), &alarm, deadline);
        info!("alarm {id} snoozed until {deadline}");
        self.events.publish(&AlarmEvent::Snoozed(alarm));
        self.ensure_ticking();
        true
    }

    /// stops the ringing alarm or drops the snoozed one
    pub fn dismiss(&mut self) -> bool {
        let alarm = match std::mem::take(&mut self.state) {
            SessionState::Waiting => {
                debug!("nothing to dismiss");
                return false;
            }
            SessionState::Triggered(id) => {
                self.audio.stop();
                self.registry.get(&id).cloned()
            }
            SessionState::Snoozed(id) => {
                self.clear_snooze(&id);
                self.registry.get(&id).cloned()
            }
        };
        if let Some(alarm) = alarm {
            self.notifications.refresh(self.registry.store_mut(), &alarm);
            info!("alarm {} dismissed", alarm.id());
            self.events.publish(&AlarmEvent::Dismissed(alarm));
        }
        self.ensure_ticking();
        true
    }

    /// drops every pending snooze, one-time alarms stay off afterwards.
    /// returns how many alarms were snoozed.
    pub fn cancel_snooze(&mut self) -> usize {
        let snoozed: Vec<String> = self
            .registry
            .iter()
            .filter(|alarm| alarm.is_snoozed())
            .map(|alarm| alarm.id().to_string())
            .collect();
        for id in &snoozed {
            if let Some(alarm) = self.registry.get_mut(id) {
                if alarm.is_one_time() {
                    alarm.is_active = false;
                }
            }
            self.clear_snooze(id);
            if let Some(alarm) = self.registry.get(id).cloned() {
                self.notifications.refresh(self.registry.store_mut(), &alarm);
            }
        }
        if matches!(self.state, SessionState::Snoozed(_)) {
            self.state = SessionState::Waiting;
        }
        if !snoozed.is_empty() {
            info!("cancelled {} snooze(s)", snoozed.len());
        }
        snoozed.len()
    }

    /// the ringing alarm's melody ran out by itself
    pub fn playback_finished(&mut self, now: NaiveDateTime) {
        if !matches!(self.state, SessionState::Triggered(_)) {
            return;
        }
        match self.settings.on_playback_finished {
            FinishedAction::Snooze => {
                if !self.snooze(now) {
                    self.dismiss();
                }
            }
            FinishedAction::Dismiss => {
                self.dismiss();
            }
        }
    }

    pub fn interruption(&mut self, interruption: Interruption) {
        debug!("audio interruption: {interruption:?}");
        self.ticker.interruption(interruption);
    }

    fn clear_snooze(&mut self, id: &str) {
        if let Some(alarm) = self.registry.get_mut(id) {
            alarm.snooze_date = None;
            self.registry.persist(id);
        }
    }

    /// returns to waiting if `id` is the live alarm, without telling anyone
    fn release(&mut self, id: &str) {
        if self.state.active_alarm() != Some(id) {
            return;
        }
        if matches!(self.state, SessionState::Triggered(_)) {
            self.audio.stop();
        }
        self.state = SessionState::Waiting;
        self.ensure_ticking();
    }

    fn ensure_ticking(&mut self) {
        if !self.ticker.is_running() {
            self.ticker.start(Instant::now());
        }
    }
}
