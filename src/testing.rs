//! Recording stand-ins for the ports, shared by the unit tests.

use std::{
    io,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{
    alarm::Alarm,
    audio::{AudioPort, Loops},
    error::{AudioError, NotifyError, StoreError},
    notify::{AlertRequest, NotificationPort},
    store::{AlarmStore, NotificationRecord},
    ticker::LivenessKeeper,
};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct AudioState {
    playing: Option<(String, Loops)>,
    plays: Vec<(String, Loops)>,
    stops: usize,
    fail_next: bool,
}

/// remembers what it was asked to play
#[derive(Debug, Default)]
pub struct RecordingAudio {
    state: Mutex<AudioState>,
}

impl RecordingAudio {
    pub fn playing(&self) -> Option<(String, Loops)> {
        lock(&self.state).playing.clone()
    }

    pub fn plays(&self) -> Vec<(String, Loops)> {
        lock(&self.state).plays.clone()
    }

    pub fn stops(&self) -> usize {
        lock(&self.state).stops
    }

    pub fn fail_next_play(&self) {
        lock(&self.state).fail_next = true;
    }
}

impl AudioPort for RecordingAudio {
    fn play(&self, sound: &str, loops: Loops) -> Result<(), AudioError> {
        let mut state = lock(&self.state);
        if std::mem::take(&mut state.fail_next) {
            return Err(AudioError::UnknownSound(sound.to_string()));
        }
        state.playing = Some((sound.to_string(), loops));
        state.plays.push((sound.to_string(), loops));
        Ok(())
    }

    fn stop(&self) {
        let mut state = lock(&self.state);
        state.playing = None;
        state.stops += 1;
    }
}

#[derive(Debug, Default)]
struct NotifierState {
    delivered: Vec<(String, AlertRequest)>,
    revoked: Vec<String>,
}

/// what a [`RecordingNotifier`] was asked to do, readable after the notifier was moved away
#[derive(Debug, Clone, Default)]
pub struct NotifierLog(Arc<Mutex<NotifierState>>);

impl NotifierLog {
    pub fn delivered(&self) -> Vec<AlertRequest> {
        lock(&self.0)
            .delivered
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }

    pub fn revoked(&self) -> Vec<String> {
        lock(&self.0).revoked.clone()
    }

    /// delivered and not revoked since
    pub fn pending(&self) -> usize {
        let state = lock(&self.0);
        state
            .delivered
            .iter()
            .filter(|(id, _)| !state.revoked.contains(id))
            .count()
    }
}

#[derive(Debug)]
pub struct RecordingNotifier {
    permission: bool,
    next_id: usize,
    log: NotifierLog,
}

impl RecordingNotifier {
    pub fn granted() -> Self {
        Self {
            permission: true,
            next_id: 0,
            log: NotifierLog::default(),
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: false,
            ..Self::granted()
        }
    }

    pub fn log(&self) -> NotifierLog {
        self.log.clone()
    }
}

impl NotificationPort for RecordingNotifier {
    fn permission_granted(&self) -> bool {
        self.permission
    }

    fn deliver(&mut self, request: &AlertRequest) -> Result<String, NotifyError> {
        self.next_id += 1;
        let id = format!("alert-{}", self.next_id);
        lock(&self.log.0).delivered.push((id.clone(), request.clone()));
        Ok(id)
    }

    fn revoke(&mut self, notification_id: &str) -> Result<(), NotifyError> {
        lock(&self.log.0).revoked.push(notification_id.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeeperCall {
    Start,
    Pause,
    Resume,
    Stop,
}

#[derive(Debug, Clone, Default)]
pub struct KeeperCalls(Arc<Mutex<Vec<KeeperCall>>>);

impl KeeperCalls {
    pub fn take(&self) -> Vec<KeeperCall> {
        std::mem::take(&mut *lock(&self.0))
    }
}

#[derive(Debug, Default)]
pub struct RecordingKeeper {
    calls: KeeperCalls,
}

impl RecordingKeeper {
    pub fn calls(&self) -> KeeperCalls {
        self.calls.clone()
    }

    fn record(&self, call: KeeperCall) {
        lock(&self.calls.0).push(call);
    }
}

impl LivenessKeeper for RecordingKeeper {
    fn start(&mut self) {
        self.record(KeeperCall::Start);
    }

    fn pause(&mut self) {
        self.record(KeeperCall::Pause);
    }

    fn resume(&mut self) {
        self.record(KeeperCall::Resume);
    }

    fn stop(&mut self) {
        self.record(KeeperCall::Stop);
    }
}

/// a store whose every operation fails
#[derive(Debug)]
pub struct FailingStore;

fn broken() -> StoreError {
    StoreError::Io {
        path: "/broken/alarms.toml".into(),
        source: io::Error::other("disk unavailable"),
    }
}

impl AlarmStore for FailingStore {
    fn create(&mut self, _alarm: &Alarm) -> Result<(), StoreError> {
        Err(broken())
    }

    fn read(&self, _id: &str) -> Result<Option<Alarm>, StoreError> {
        Err(broken())
    }

    fn read_all(&self) -> Result<Vec<Alarm>, StoreError> {
        Err(broken())
    }

    fn update(&mut self, _id: &str, _alarm: &Alarm) -> Result<(), StoreError> {
        Err(broken())
    }

    fn delete(&mut self, _id: &str) -> Result<(), StoreError> {
        Err(broken())
    }

    fn delete_all(&mut self) -> Result<(), StoreError> {
        Err(broken())
    }

    fn create_notification_record(
        &mut self,
        _record: &NotificationRecord,
    ) -> Result<(), StoreError> {
        Err(broken())
    }

    fn read_notification_records_for_alarm(
        &self,
        _alarm_id: &str,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        Err(broken())
    }

    fn delete_notification_records_for_alarm(&mut self, _alarm_id: &str) -> Result<(), StoreError> {
        Err(broken())
    }

    fn delete_all_notification_records(&mut self) -> Result<(), StoreError> {
        Err(broken())
    }
}
