use log::{debug, error, warn};

use chrono::NaiveDateTime;

use crate::{
    alarm::{Alarm, AlarmSpec},
    error::{AlarmError, StoreError},
    store::AlarmStore,
};

/// every scheduled alarm, in the order they were scheduled.
///
/// the in memory list is authoritative: when the store fails the failure is
/// logged and the registry carries on with what it has.
pub struct Registry {
    alarms: Vec<Alarm>,
    store: Box<dyn AlarmStore>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("alarms", &self.alarms)
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// loads the alarms kept in `store`, an unreadable store gives an empty registry
    #[must_use]
    pub fn load(store: Box<dyn AlarmStore>) -> Self {
        let alarms = store.read_all().unwrap_or_else(|err| {
            error!("couldn't load alarms, starting without any: {err}");
            Vec::new()
        });
        debug!("loaded {} alarm(s)", alarms.len());
        Self { alarms, store }
    }

    /// adds `alarm` unless one with the same id is already scheduled.
    /// returns whether it was added.
    pub fn schedule(&mut self, alarm: Alarm) -> bool {
        if self.is_scheduled(alarm.id()) {
            debug!("alarm {} already scheduled, ignoring", alarm.id());
            return false;
        }
        if let Err(err) = self.store.create(&alarm) {
            warn!("couldn't persist new alarm {}: {err}", alarm.id());
        }
        self.alarms.push(alarm);
        true
    }

    pub fn unschedule(&mut self, id: &str) -> Option<Alarm> {
        let index = self.alarms.iter().position(|alarm| alarm.id() == id)?;
        let alarm = self.alarms.remove(index);
        if let Err(err) = self.store.delete(id) {
            warn!("couldn't delete alarm {id} from the store: {err}");
        }
        // records of alerts nobody can revoke anymore
        if let Err(err) = self.store.delete_notification_records_for_alarm(id) {
            warn!("couldn't delete notification records of alarm {id}: {err}");
        }
        Some(alarm)
    }

    /// replaces the alarm's user editable values, dropping any snooze and
    /// last trigger it had. `Ok(None)` when `id` isn't scheduled.
    pub fn update(
        &mut self,
        id: &str,
        spec: AlarmSpec,
        now: NaiveDateTime,
    ) -> Result<Option<&Alarm>, AlarmError> {
        let Some(index) = self.alarms.iter().position(|alarm| alarm.id() == id) else {
            return Ok(None);
        };
        self.alarms[index] = self.alarms[index].replaced_with(spec, now)?;
        self.persist(id);
        Ok(self.alarms.get(index))
    }

    /// alarms ordered by time of day, ties keep scheduling order
    #[must_use]
    pub fn all_alarms(&self) -> Vec<Alarm> {
        let mut alarms = self.alarms.clone();
        alarms.sort_by_key(|alarm| alarm.time);
        alarms
    }

    #[must_use]
    pub fn is_scheduled(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Alarm> {
        self.alarms.iter().find(|alarm| alarm.id() == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Alarm> {
        self.alarms.iter_mut().find(|alarm| alarm.id() == id)
    }

    /// alarms in stored (scheduling) order
    pub fn iter(&self) -> impl Iterator<Item = &Alarm> {
        self.alarms.iter()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.alarms.iter().map(|alarm| alarm.id().to_string()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    /// writes the current state of alarm `id` to the store
    pub(crate) fn persist(&mut self, id: &str) {
        let Some(alarm) = self.alarms.iter().find(|alarm| alarm.id() == id) else {
            return;
        };
        let result = match self.store.update(id, alarm) {
            // the create may have failed earlier
            Err(StoreError::NotFound(_)) => self.store.create(alarm),
            other => other,
        };
        if let Err(err) = result {
            warn!("couldn't persist alarm {id}: {err}");
        }
    }

    pub(crate) fn store_mut(&mut self) -> &mut dyn AlarmStore {
        self.store.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{store::MemoryStore, testing::FailingStore};
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> Alarm {
        Alarm::new(AlarmSpec::at(hour, minute).unwrap().repeating_on([0])).unwrap()
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn schedule_ignores_known_ids() {
        let mut registry = Registry::load(Box::new(MemoryStore::new()));
        let alarm = at(7, 0);
        assert!(registry.schedule(alarm.clone()));
        assert!(!registry.schedule(alarm.clone()));
        assert_eq!(registry.len(), 1);
        assert!(registry.is_scheduled(alarm.id()));
    }

    #[test]
    fn unschedule_unknown_is_a_no_op() {
        let mut registry = Registry::load(Box::new(MemoryStore::new()));
        registry.schedule(at(7, 0));
        assert_eq!(registry.unschedule("nope"), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn all_alarms_sorted_by_time_then_insertion() {
        let mut registry = Registry::load(Box::new(MemoryStore::new()));
        let late = at(9, 0);
        let early = at(6, 45);
        let late_too = at(9, 0);
        for alarm in [&late, &early, &late_too] {
            registry.schedule(alarm.clone());
        }
        let ids: Vec<_> = registry.all_alarms().iter().map(|a| a.id().to_string()).collect();
        assert_eq!(ids, vec![early.id(), late.id(), late_too.id()]);
        // stored order untouched
        assert_eq!(registry.ids(), vec![late.id(), early.id(), late_too.id()]);
    }

    #[test]
    fn update_clears_snooze_and_trigger() {
        let mut registry = Registry::load(Box::new(MemoryStore::new()));
        let mut alarm = at(7, 0);
        alarm.snooze_date = Some(now());
        alarm.last_trigger_date = Some(now());
        let id = alarm.id().to_string();
        registry.schedule(alarm);

        let updated = registry
            .update(&id, AlarmSpec::at(7, 30).unwrap(), now())
            .unwrap()
            .unwrap()
            .clone();
        assert_eq!(updated.snooze_date, None);
        assert_eq!(updated.last_trigger_date, None);
        assert_eq!(updated.last_update_date, Some(now()));
        assert_eq!(updated.minute(), 30);

        assert_eq!(registry.update("nope", AlarmSpec::at(1, 0).unwrap(), now()), Ok(None));
    }

    #[test]
    fn update_with_bad_weekday_keeps_the_old_alarm() {
        let mut registry = Registry::load(Box::new(MemoryStore::new()));
        let alarm = at(7, 0);
        registry.schedule(alarm.clone());
        let bad = AlarmSpec::at(7, 0).unwrap().repeating_on([8]);
        assert_eq!(registry.update(alarm.id(), bad, now()), Err(AlarmError::InvalidWeekday(8)));
        assert_eq!(registry.get(alarm.id()), Some(&alarm));
    }

    #[test]
    fn store_failures_leave_memory_authoritative() {
        let mut registry = Registry::load(Box::new(FailingStore));
        assert!(registry.is_empty());
        let alarm = at(7, 0);
        assert!(registry.schedule(alarm.clone()));
        registry.persist(alarm.id());
        assert!(registry.is_scheduled(alarm.id()));
        assert_eq!(registry.unschedule(alarm.id()), Some(alarm));
    }

    #[test]
    fn loads_what_the_store_has() {
        let alarms = vec![at(7, 0), at(8, 0)];
        let registry = Registry::load(Box::new(MemoryStore::with_alarms(alarms.clone())));
        assert_eq!(registry.iter().cloned().collect::<Vec<_>>(), alarms);
    }
}
