use std::{collections::BTreeSet, fmt};

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AlarmError,
    weekday::{self, DAYS_IN_WEEK},
};

/// melody reference meaning "pick one of the available sounds when the alarm rings"
pub const RANDOM_MELODY: &str = "random";

#[inline]
#[must_use]
pub const fn always_true() -> bool {
    true
}

fn random_melody() -> String {
    RANDOM_MELODY.to_string()
}

/// represents an alarm
/// contains the wall clock time it should go off at, the days it repeats on
/// (none means it only goes off once) and the bookkeeping of its last ring/snooze.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Alarm {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(with = "toml_datetime_compat")]
    pub time: NaiveTime,
    /// weekday markers, 0 = Monday
    #[serde(default)]
    pub repeat_on: BTreeSet<u8>,
    #[serde(default = "random_melody")]
    pub melody: String,
    #[serde(default = "always_true")]
    pub snooze_enabled: bool,
    #[serde(default = "always_true")]
    pub is_active: bool,
    /// set while this alarm is the snoozed one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snooze_date: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_trigger_date: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_date: Option<NaiveDateTime>,
}

/// the user editable part of an alarm, used both to create and to update one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmSpec {
    pub name: Option<String>,
    pub time: NaiveTime,
    pub repeat_on: BTreeSet<u8>,
    pub melody: String,
    pub snooze_enabled: bool,
    pub is_active: bool,
}

impl AlarmSpec {
    /// an active, snoozable one-time alarm with a random melody
    #[must_use]
    pub fn new(time: NaiveTime) -> Self {
        Self {
            name: None,
            time,
            repeat_on: BTreeSet::new(),
            melody: random_melody(),
            snooze_enabled: true,
            is_active: true,
        }
    }

    /// the time is truncated to the minute
    pub fn at(hour: u32, minute: u32) -> Result<Self, AlarmError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self::new)
            .ok_or_else(|| AlarmError::InvalidTime(format!("{hour:02}:{minute:02}")))
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn repeating_on(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.repeat_on = days.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_melody(mut self, melody: impl Into<String>) -> Self {
        self.melody = melody.into();
        self
    }

    #[must_use]
    pub const fn snoozable(mut self, snooze_enabled: bool) -> Self {
        self.snooze_enabled = snooze_enabled;
        self
    }

    #[must_use]
    pub const fn active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    pub fn validate(&self) -> Result<(), AlarmError> {
        match self.repeat_on.iter().find(|day| **day >= DAYS_IN_WEEK) {
            Some(day) => Err(AlarmError::InvalidWeekday(*day)),
            None => Ok(()),
        }
    }
}

impl Alarm {
    /// creates an alarm with a freshly generated id
    pub fn new(spec: AlarmSpec) -> Result<Self, AlarmError> {
        Self::with_id(Uuid::new_v4().to_string(), spec)
    }

    pub(crate) fn with_id(id: String, spec: AlarmSpec) -> Result<Self, AlarmError> {
        spec.validate()?;
        Ok(Self {
            id,
            name: spec.name,
            // alarms ring on the minute
            time: NaiveTime::from_hms_opt(spec.time.hour(), spec.time.minute(), 0)
                .unwrap_or(spec.time),
            repeat_on: spec.repeat_on,
            melody: spec.melody,
            snooze_enabled: spec.snooze_enabled,
            is_active: spec.is_active,
            snooze_date: None,
            last_trigger_date: None,
            last_update_date: None,
        })
    }

    /// the record that replaces this one after an edit:
    /// same id, no snooze or trigger bookkeeping, stamped with the edit time
    pub(crate) fn replaced_with(
        &self,
        spec: AlarmSpec,
        now: NaiveDateTime,
    ) -> Result<Self, AlarmError> {
        let mut alarm = Self::with_id(self.id.clone(), spec)?;
        alarm.last_update_date = Some(now);
        Ok(alarm)
    }

    /// a copy of this alarm under a new id, active again and never triggered
    #[must_use]
    pub fn rescheduled(&self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            is_active: true,
            snooze_date: None,
            last_trigger_date: None,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn spec(&self) -> AlarmSpec {
        AlarmSpec {
            name: self.name.clone(),
            time: self.time,
            repeat_on: self.repeat_on.clone(),
            melody: self.melody.clone(),
            snooze_enabled: self.snooze_enabled,
            is_active: self.is_active,
        }
    }

    #[must_use]
    pub fn hour(&self) -> u32 {
        self.time.hour()
    }

    #[must_use]
    pub fn minute(&self) -> u32 {
        self.time.minute()
    }

    /// an alarm without repeat days rings once and then turns itself off
    #[must_use]
    pub fn is_one_time(&self) -> bool {
        self.repeat_on.is_empty()
    }

    #[must_use]
    pub const fn is_snoozed(&self) -> bool {
        self.snooze_date.is_some()
    }

    #[must_use]
    pub fn repeats_on(&self, marker: u8) -> bool {
        self.repeat_on.contains(&marker)
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("alarm")
    }
}

impl fmt::Display for Alarm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.display_name(), self.time.format("%H:%M"))?;
        if self.is_one_time() {
            write!(f, " once")?;
        } else {
            let days: Vec<_> = self.repeat_on.iter().map(|day| weekday::short_name(*day)).collect();
            write!(f, " {}", days.join(","))?;
        }
        if !self.is_active {
            write!(f, " (off)")?;
        }
        Ok(())
    }
}

/// parses `HH:MM` (24 hour clock)
pub fn parse_time(input: &str) -> Result<NaiveTime, AlarmError> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M")
        .map_err(|_| AlarmError::InvalidTime(input.to_string()))
}
