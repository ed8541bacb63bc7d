//! Platform alerts for alarms that may ring while the app isn't in front.
//!
//! The port itself only knows how to deliver and revoke a single alert.
//! [`Notifications`] decides which alerts an alarm needs and remembers
//! them in the store so they can be cleaned up again.

use std::fmt;

use chrono::NaiveDateTime;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    alarm::Alarm,
    error::NotifyError,
    store::{AlarmStore, NotificationRecord},
    weekday,
};

/// when a platform alert goes off
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertTrigger {
    /// every week on the given weekday marker
    Weekly { weekday: u8, hour: u32, minute: u32 },
    /// the next time the clock shows hour:minute
    Once { hour: u32, minute: u32 },
    /// at an exact instant
    At { at: NaiveDateTime },
}

impl fmt::Display for AlertTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weekly {
                weekday,
                hour,
                minute,
            } => write!(f, "every {} at {hour:02}:{minute:02}", weekday::short_name(*weekday)),
            Self::Once { hour, minute } => write!(f, "once at {hour:02}:{minute:02}"),
            Self::At { at } => write!(f, "at {}", at.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRequest {
    pub alarm_id: String,
    pub title: String,
    pub trigger: AlertTrigger,
}

pub trait NotificationPort: Send {
    fn permission_granted(&self) -> bool;
    /// hands one alert to the platform, returning the platform's id for it
    fn deliver(&mut self, request: &AlertRequest) -> Result<String, NotifyError>;
    fn revoke(&mut self, notification_id: &str) -> Result<(), NotifyError>;
}

/// the alerts an alarm needs: one per repeat day, or a single one for a one-time alarm.
/// inactive alarms need none.
#[must_use]
pub fn plan(alarm: &Alarm) -> Vec<AlertTrigger> {
    if !alarm.is_active {
        return Vec::new();
    }
    let (hour, minute) = (alarm.hour(), alarm.minute());
    if alarm.is_one_time() {
        return vec![AlertTrigger::Once { hour, minute }];
    }
    alarm
        .repeat_on
        .iter()
        .map(|&weekday| AlertTrigger::Weekly {
            weekday,
            hour,
            minute,
        })
        .collect()
}

pub struct Notifications {
    port: Box<dyn NotificationPort>,
}

impl fmt::Debug for Notifications {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifications").finish_non_exhaustive()
    }
}

impl Notifications {
    #[must_use]
    pub fn new(port: Box<dyn NotificationPort>) -> Self {
        Self { port }
    }

    /// registers the recurring (or one-time) alerts of `alarm`
    pub fn register_alarm(&mut self, store: &mut dyn AlarmStore, alarm: &Alarm) {
        for trigger in plan(alarm) {
            self.deliver(store, alarm, trigger);
        }
    }

    /// registers the one-shot alert for a snoozed alarm's deadline
    pub fn register_snooze(
        &mut self,
        store: &mut dyn AlarmStore,
        alarm: &Alarm,
        deadline: NaiveDateTime,
    ) {
        self.deliver(store, alarm, AlertTrigger::At { at: deadline });
    }

    /// revokes every alert created for `alarm_id`
    pub fn cancel(&mut self, store: &mut dyn AlarmStore, alarm_id: &str) {
        let records = match store.read_notification_records_for_alarm(alarm_id) {
            Ok(records) => records,
            Err(err) => {
                warn!("couldn't read notification records of alarm {alarm_id}: {err}");
                return;
            }
        };
        for record in &records {
            if let Err(err) = self.port.revoke(&record.id) {
                warn!("couldn't revoke notification {}: {err}", record.id);
            }
        }
        if let Err(err) = store.delete_notification_records_for_alarm(alarm_id) {
            warn!("couldn't delete notification records of alarm {alarm_id}: {err}");
        }
        debug!("cancelled {} notification(s) of alarm {alarm_id}", records.len());
    }

    /// cancels and registers again, after the alarm changed
    pub fn refresh(&mut self, store: &mut dyn AlarmStore, alarm: &Alarm) {
        self.cancel(store, alarm.id());
        self.register_alarm(store, alarm);
    }

    fn deliver(&mut self, store: &mut dyn AlarmStore, alarm: &Alarm, trigger: AlertTrigger) {
        // without permission the alarm still rings while we're running
        if !self.port.permission_granted() {
            debug!("notification permission not granted, skipping alert for {}", alarm.id());
            return;
        }
        let request = AlertRequest {
            alarm_id: alarm.id().to_string(),
            title: alarm.display_name().to_string(),
            trigger,
        };
        let id = match self.port.deliver(&request) {
            Ok(id) => id,
            Err(err) => {
                warn!("couldn't schedule notification for alarm {}: {err}", alarm.id());
                return;
            }
        };
        let record = NotificationRecord {
            id,
            alarm_id: request.alarm_id,
            trigger,
        };
        if let Err(err) = store.create_notification_record(&record) {
            warn!("couldn't store notification record {}: {err}", record.id);
        }
    }
}

/// a notification port for hosts without a platform alert service:
/// alerts are only written to the log
#[derive(Debug)]
pub struct LogNotifier {
    permission: bool,
}

impl LogNotifier {
    #[must_use]
    pub const fn new(permission: bool) -> Self {
        Self { permission }
    }
}

impl NotificationPort for LogNotifier {
    fn permission_granted(&self) -> bool {
        self.permission
    }

    fn deliver(&mut self, request: &AlertRequest) -> Result<String, NotifyError> {
        if !self.permission {
            return Err(NotifyError::PermissionDenied);
        }
        let id = Uuid::new_v4().to_string();
        info!("notification {id}: {} {}", request.title, request.trigger);
        Ok(id)
    }

    fn revoke(&mut self, notification_id: &str) -> Result<(), NotifyError> {
        info!("notification {notification_id} revoked");
        Ok(())
    }
}
