use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
    sync::mpsc::{self, RecvTimeoutError, Sender},
    thread,
    time::Duration,
};

use log::{debug, error, info, warn};
use rand::seq::SliceRandom;
use rodio::{Decoder, OutputStream, Sink, Source};

use crate::{alarm::RANDOM_MELODY, config::Sounds, error::AudioError};

/// how often a sound is played before playback counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loops {
    Forever,
    Times(u32),
}

/// the single audio channel. starting a sound stops whatever was playing.
pub trait AudioPort: Send + Sync {
    fn play(&self, sound: &str, loops: Loops) -> Result<(), AudioError>;
    fn stop(&self);
}

/// turns an alarm's melody reference into a sound name,
/// picking one of `available` at random for [`RANDOM_MELODY`]
#[must_use]
pub fn resolve_melody(reference: &str, available: &[String], fallback: &str) -> String {
    if reference != RANDOM_MELODY {
        return reference.to_string();
    }
    available
        .choose(&mut rand::thread_rng())
        .map_or_else(|| fallback.to_string(), Clone::clone)
}

enum AudioMessage {
    Play { path: PathBuf, loops: Loops },
    Stop,
}

/// plays sounds from the sound library on a dedicated audio thread
#[derive(Debug)]
pub struct RodioAudio {
    sounds: HashMap<String, PathBuf>,
    sender: Sender<AudioMessage>,
}

impl RodioAudio {
    /// `on_finished` is called (on the audio thread) whenever a sound ends by itself
    /// or couldn't be started, never when it was stopped
    pub fn spawn(sounds: &Sounds, on_finished: impl Fn() + Send + 'static) -> Self {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let stream = match rodio::OutputStreamBuilder::open_default_stream() {
                Ok(stream) => stream,
                Err(err) => {
                    error!("couldn't open audio output: {err}");
                    return;
                }
            };
            let mut current: Option<Sink> = None;
            loop {
                match receiver.recv_timeout(Duration::from_millis(50)) {
                    Ok(AudioMessage::Play { path, loops }) => {
                        if let Some(sink) = current.take() {
                            sink.stop();
                        }
                        match start(&stream, &path, loops) {
                            Ok(sink) => {
                                debug!("playing {} ({loops:?})", path.display());
                                current = Some(sink);
                            }
                            Err(err) => {
                                // reported like a melody that ran out
                                warn!("{err}");
                                on_finished();
                            }
                        }
                    }
                    Ok(AudioMessage::Stop) => {
                        if let Some(sink) = current.take() {
                            sink.stop();
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
                if current.as_ref().is_some_and(Sink::empty) {
                    current = None;
                    on_finished();
                }
            }
            info!("audio thread exiting");
        });
        Self {
            sounds: sounds.paths(),
            sender,
        }
    }
}

fn decode(path: &Path) -> Result<Decoder<BufReader<File>>, AudioError> {
    let file = File::open(path).map_err(|source| AudioError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Decoder::new(BufReader::new(file)).map_err(|err| AudioError::Decode {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

fn start(stream: &OutputStream, path: &Path, loops: Loops) -> Result<Sink, AudioError> {
    let sink = Sink::connect_new(stream.mixer());
    match loops {
        Loops::Forever => sink.append(decode(path)?.repeat_infinite()),
        Loops::Times(count) => {
            for _ in 0..count.max(1) {
                sink.append(decode(path)?);
            }
        }
    }
    sink.play();
    Ok(sink)
}

/// the file behind `sound`, which must be in the library and exist on disk
pub fn locate(sounds: &HashMap<String, PathBuf>, sound: &str) -> Result<PathBuf, AudioError> {
    let path = sounds
        .get(sound)
        .ok_or_else(|| AudioError::UnknownSound(sound.to_string()))?;
    if !path.is_file() {
        return Err(AudioError::Open {
            path: path.clone(),
            source: io::Error::from(io::ErrorKind::NotFound),
        });
    }
    Ok(path.clone())
}

impl AudioPort for RodioAudio {
    fn play(&self, sound: &str, loops: Loops) -> Result<(), AudioError> {
        let path = locate(&self.sounds, sound)?;
        self.sender
            .send(AudioMessage::Play { path, loops })
            .map_err(|_| AudioError::Unavailable)
    }

    fn stop(&self) {
        if self.sender.send(AudioMessage::Stop).is_err() {
            debug!("audio thread is gone, nothing to stop");
        }
    }
}
