//! Decides which alarms are due at a given wall clock instant.
//!
//! Ticks are not guaranteed to land on the exact second, so an alarm is due
//! when the clock shows its hour and minute and fewer than `tolerance`
//! seconds of that minute have passed. A snoozed alarm is due once its
//! deadline passed no more than `tolerance` seconds ago. The day granular
//! `last_trigger_date` check keeps an alarm from ringing twice in one day.

use chrono::{NaiveDateTime, Timelike};

use crate::{alarm::Alarm, weekday};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerDecision {
    /// the alarm's time came up
    FireNew(String),
    /// the alarm's snooze deadline passed
    FireSnoozed(String),
}

impl TriggerDecision {
    #[must_use]
    pub fn alarm_id(&self) -> &str {
        match self {
            Self::FireNew(id) | Self::FireSnoozed(id) => id,
        }
    }
}

/// one-time alarms match every day
fn weekday_matches(alarm: &Alarm, now: NaiveDateTime) -> bool {
    alarm.is_one_time() || alarm.repeats_on(weekday::today(now))
}

fn not_fired_today(alarm: &Alarm, now: NaiveDateTime) -> bool {
    alarm
        .last_trigger_date
        .map_or(true, |last| last.date() != now.date())
}

fn snooze_expired(alarm: &Alarm, now: NaiveDateTime, tolerance: u32) -> bool {
    alarm.snooze_date.is_some_and(|deadline| {
        let remaining = (deadline - now).num_seconds();
        (-i64::from(tolerance)..=0).contains(&remaining)
    })
}

fn minute_matches(alarm: &Alarm, now: NaiveDateTime, tolerance: u32) -> bool {
    alarm.hour() == now.hour() && alarm.minute() == now.minute() && now.second() < tolerance
}

/// the decision for a single alarm, snooze expiry wins over a fresh match
#[must_use]
pub fn evaluate_alarm(
    alarm: &Alarm,
    now: NaiveDateTime,
    tolerance: u32,
) -> Option<TriggerDecision> {
    if snooze_expired(alarm, now, tolerance) {
        return Some(TriggerDecision::FireSnoozed(alarm.id().to_string()));
    }
    let fresh = not_fired_today(alarm, now);
    let eligible = alarm.is_active && weekday_matches(alarm, now) && fresh;
    // a snoozed alarm may come round again, but never twice in one day
    ((eligible || (alarm.is_snoozed() && fresh)) && minute_matches(alarm, now, tolerance))
        .then(|| TriggerDecision::FireNew(alarm.id().to_string()))
}

/// decisions for every alarm due at `now`, in the order given
pub fn evaluate<'a>(
    alarms: impl IntoIterator<Item = &'a Alarm>,
    now: NaiveDateTime,
    tolerance: u32,
) -> Vec<TriggerDecision> {
    alarms
        .into_iter()
        .filter_map(|alarm| evaluate_alarm(alarm, now, tolerance))
        .collect()
}
