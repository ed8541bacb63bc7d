use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, scheduler::Settings};

/// what happens to a ringing alarm once its melody ran out by itself
#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishedAction {
    #[default]
    Snooze,
    Dismiss,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_time_format")]
    pub time_format: String,
    /// how late (in seconds) a tick may be and still ring an alarm
    #[serde(default = "default_tolerance")]
    pub tolerance_seconds: u32,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: u32,
    /// times a melody is repeated before it counts as finished
    #[serde(default = "default_melody_loops")]
    pub melody_loops: u32,
    #[serde(default)]
    pub on_playback_finished: FinishedAction,
    #[serde(default = "crate::alarm::always_true")]
    pub notifications_enabled: bool,
    /// sound looped quietly to keep the process awake, none on hosts that don't suspend us
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive_sound: Option<String>,
    #[serde(flatten)]
    pub sounds: Sounds,
}

fn default_time_format() -> String {
    "%l:%M %p".to_string()
}

const fn default_tolerance() -> u32 {
    15
}

const fn default_tick_interval() -> u64 {
    5
}

const fn default_snooze_minutes() -> u32 {
    8
}

const fn default_melody_loops() -> u32 {
    6
}

/// the sound library, empty until sounds are added
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Sounds {
    /// played when an alarm's own melody can't be resolved
    #[serde(default)]
    pub default_sound: String,
    #[serde(default)]
    pub sounds: HashMap<String, Sound>,
}

impl Sounds {
    /// sound names in a stable order
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.sounds.keys().cloned().collect();
        names.sort();
        names
    }

    /// the first sound added (or any sound, while the default points nowhere)
    /// becomes the default
    pub fn add(&mut self, sound: Sound) -> Option<Sound> {
        if !self.sounds.contains_key(&self.default_sound) {
            self.default_sound.clone_from(&sound.name);
        }
        self.sounds.insert(sound.name.clone(), sound)
    }

    /// sound name to file
    #[must_use]
    pub fn paths(&self) -> HashMap<String, PathBuf> {
        self.sounds
            .iter()
            .map(|(name, sound)| (name.clone(), sound.path.clone()))
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_format: default_time_format(),
            tolerance_seconds: default_tolerance(),
            tick_interval_secs: default_tick_interval(),
            snooze_minutes: default_snooze_minutes(),
            melody_loops: default_melody_loops(),
            on_playback_finished: FinishedAction::default(),
            notifications_enabled: true,
            keep_alive_sound: None,
            sounds: Sounds::default(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// a missing file gives the default config
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(config) => Ok(toml::from_str(&config)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let config = toml::to_string(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, config).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn project_dirs() -> Result<directories::ProjectDirs, ConfigError> {
        directories::ProjectDirs::from("", "", "wake_engine").ok_or(ConfigError::NoProjectDirs)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    pub fn alarms_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::project_dirs()?.data_dir().join("alarms.toml"))
    }

    /// falls back to `./sounds` when there is no home directory
    #[must_use]
    pub fn sounds_path() -> PathBuf {
        Self::project_dirs().map_or_else(
            |_| PathBuf::from("sounds"),
            |dirs| dirs.data_dir().join("sounds"),
        )
    }

    #[must_use]
    pub fn is_config_present() -> bool {
        Self::config_path().is_ok_and(|path| path.exists())
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }

    /// the part of the config the scheduler works with
    #[must_use]
    pub fn settings(&self) -> Settings {
        Settings {
            tolerance_seconds: self.tolerance_seconds,
            snooze_minutes: self.snooze_minutes,
            melody_loops: self.melody_loops,
            on_playback_finished: self.on_playback_finished,
            melodies: self.sounds.names(),
            default_sound: self.sounds.default_sound.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Sound {
    pub name: String,
    pub path: PathBuf,
}

impl fmt::Display for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.name,
            self.path
                .file_name()
                .map_or_else(|| self.path.to_string_lossy(), |name| name.to_string_lossy())
        )
    }
}

impl Sound {
    #[must_use]
    pub const fn new(name: String, path: PathBuf) -> Self {
        Self { name, path }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }
}
