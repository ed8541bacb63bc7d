use std::{io, path::PathBuf};

use thiserror::Error;

/// failures of the persistence port
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("couldn't access alarm store at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("couldn't parse alarm store: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("couldn't serialize alarm store: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("alarm {0} is not stored")]
    NotFound(String),
    #[error("alarm {0} is already stored")]
    Duplicate(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't determine the config directory")]
    NoProjectDirs,
    #[error("couldn't access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("couldn't parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("couldn't serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no sound named {0:?}")]
    UnknownSound(String),
    #[error("couldn't open sound file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("couldn't decode sound file {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("audio output is unavailable")]
    Unavailable,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification permission not granted")]
    PermissionDenied,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlarmError {
    #[error("weekday {0} is out of range (expected 0..=6)")]
    InvalidWeekday(u8),
    #[error("couldn't parse alarm time {0:?} (expected HH:MM)")]
    InvalidTime(String),
}

/// returned by a [`crate::communication::Handle`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandleError {
    #[error("the alarm scheduler is no longer running")]
    Stopped,
    #[error(transparent)]
    Alarm(#[from] AlarmError),
}
