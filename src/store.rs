//! Persistence for alarms and for the records of platform alerts created for them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{alarm::Alarm, error::StoreError, notify::AlertTrigger};

/// a platform alert that was handed to the notification port on behalf of an alarm,
/// kept so it can be revoked later
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NotificationRecord {
    pub id: String,
    pub alarm_id: String,
    pub trigger: AlertTrigger,
}

/// CRUD contract the alarm registry persists through
pub trait AlarmStore: Send {
    fn create(&mut self, alarm: &Alarm) -> Result<(), StoreError>;
    fn read(&self, id: &str) -> Result<Option<Alarm>, StoreError>;
    fn read_all(&self) -> Result<Vec<Alarm>, StoreError>;
    fn update(&mut self, id: &str, alarm: &Alarm) -> Result<(), StoreError>;
    fn delete(&mut self, id: &str) -> Result<(), StoreError>;
    fn delete_all(&mut self) -> Result<(), StoreError>;

    fn create_notification_record(&mut self, record: &NotificationRecord) -> Result<(), StoreError>;
    fn read_notification_records_for_alarm(
        &self,
        alarm_id: &str,
    ) -> Result<Vec<NotificationRecord>, StoreError>;
    fn delete_notification_records_for_alarm(&mut self, alarm_id: &str) -> Result<(), StoreError>;
    fn delete_all_notification_records(&mut self) -> Result<(), StoreError>;
}

/// the whole persisted state, also the layout of the alarms file
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct StoreData {
    #[serde(default)]
    pub alarms: Vec<Alarm>,
    #[serde(default)]
    pub notifications: Vec<NotificationRecord>,
}

impl StoreData {
    fn create(&mut self, alarm: &Alarm) -> Result<(), StoreError> {
        if self.alarms.iter().any(|stored| stored.id() == alarm.id()) {
            return Err(StoreError::Duplicate(alarm.id().to_string()));
        }
        self.alarms.push(alarm.clone());
        Ok(())
    }

    fn read(&self, id: &str) -> Option<Alarm> {
        self.alarms.iter().find(|alarm| alarm.id() == id).cloned()
    }

    fn update(&mut self, id: &str, alarm: &Alarm) -> Result<(), StoreError> {
        let stored = self
            .alarms
            .iter_mut()
            .find(|stored| stored.id() == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        *stored = alarm.clone();
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        let before = self.alarms.len();
        self.alarms.retain(|alarm| alarm.id() != id);
        if self.alarms.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn records_for(&self, alarm_id: &str) -> Vec<NotificationRecord> {
        self.notifications
            .iter()
            .filter(|record| record.alarm_id == alarm_id)
            .cloned()
            .collect()
    }
}

/// keeps everything in memory, nothing survives the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: StoreData,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_alarms(alarms: Vec<Alarm>) -> Self {
        Self {
            data: StoreData {
                alarms,
                notifications: Vec::new(),
            },
        }
    }

    #[must_use]
    pub const fn data(&self) -> &StoreData {
        &self.data
    }
}

impl AlarmStore for MemoryStore {
    fn create(&mut self, alarm: &Alarm) -> Result<(), StoreError> {
        self.data.create(alarm)
    }

    fn read(&self, id: &str) -> Result<Option<Alarm>, StoreError> {
        Ok(self.data.read(id))
    }

    fn read_all(&self) -> Result<Vec<Alarm>, StoreError> {
        Ok(self.data.alarms.clone())
    }

    fn update(&mut self, id: &str, alarm: &Alarm) -> Result<(), StoreError> {
        self.data.update(id, alarm)
    }

    fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        self.data.delete(id)
    }

    fn delete_all(&mut self) -> Result<(), StoreError> {
        self.data.alarms.clear();
        Ok(())
    }

    fn create_notification_record(
        &mut self,
        record: &NotificationRecord,
    ) -> Result<(), StoreError> {
        self.data.notifications.push(record.clone());
        Ok(())
    }

    fn read_notification_records_for_alarm(
        &self,
        alarm_id: &str,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        Ok(self.data.records_for(alarm_id))
    }

    fn delete_notification_records_for_alarm(&mut self, alarm_id: &str) -> Result<(), StoreError> {
        self.data.notifications.retain(|record| record.alarm_id != alarm_id);
        Ok(())
    }

    fn delete_all_notification_records(&mut self) -> Result<(), StoreError> {
        self.data.notifications.clear();
        Ok(())
    }
}

/// a toml file holding every alarm and notification record,
/// rewritten in full after each change
#[derive(Debug)]
pub struct TomlStore {
    path: PathBuf,
    data: StoreData,
}

impl TomlStore {
    /// opens the store at `path`, a missing file is an empty store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreData::default(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self { path, data })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), StoreError> {
        let contents = toml::to_string(&self.data)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&self.path, contents).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl AlarmStore for TomlStore {
    fn create(&mut self, alarm: &Alarm) -> Result<(), StoreError> {
        self.data.create(alarm)?;
        self.save()
    }

    fn read(&self, id: &str) -> Result<Option<Alarm>, StoreError> {
        Ok(self.data.read(id))
    }

    fn read_all(&self) -> Result<Vec<Alarm>, StoreError> {
        Ok(self.data.alarms.clone())
    }

    fn update(&mut self, id: &str, alarm: &Alarm) -> Result<(), StoreError> {
        self.data.update(id, alarm)?;
        self.save()
    }

    fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        self.data.delete(id)?;
        self.save()
    }

    fn delete_all(&mut self) -> Result<(), StoreError> {
        self.data.alarms.clear();
        self.save()
    }

    fn create_notification_record(
        &mut self,
        record: &NotificationRecord,
    ) -> Result<(), StoreError> {
        self.data.notifications.push(record.clone());
        self.save()
    }

    fn read_notification_records_for_alarm(
        &self,
        alarm_id: &str,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        Ok(self.data.records_for(alarm_id))
    }

    fn delete_notification_records_for_alarm(&mut self, alarm_id: &str) -> Result<(), StoreError> {
        self.data.notifications.retain(|record| record.alarm_id != alarm_id);
        self.save()
    }

    fn delete_all_notification_records(&mut self) -> Result<(), StoreError> {
        self.data.notifications.clear();
        self.save()
    }
}
