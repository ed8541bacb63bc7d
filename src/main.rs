use std::{error::Error, io, path::PathBuf, sync::Arc, thread};

use clap::{Parser, Subcommand};
use wake_engine::{
    alarm::{self, Alarm, AlarmSpec},
    audio::{AudioPort, RodioAudio},
    communication::{self, Handle},
    config::{Config, Sound},
    daemon::{self, SystemClock},
    events::{AlarmEvent, EventBus},
    notify::LogNotifier,
    registry::Registry,
    scheduler::Scheduler,
    store::TomlStore,
    ticker::{LivenessKeeper, SilentLoopKeeper, ThreadKeeper, Ticker},
    weekday,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// write the default config
    Init {
        #[clap(long, short)]
        force: bool,
    },
    NewSound {
        name: String,
        path: PathBuf,
    },
    NewAlarm {
        /// HH:MM
        time: String,
        /// days to repeat on, e.g. `mon,wed` (none for a one-time alarm)
        #[clap(long, short, value_delimiter = ',')]
        days: Vec<String>,
        #[clap(long, short)]
        sound: Option<String>,
        #[clap(long, short)]
        name: Option<String>,
        #[clap(long)]
        no_snooze: bool,
    },
    List,
    Remove {
        id: String,
    },
    /// run the alarm clock (the default)
    Run,
}

fn main() -> Result<(), Box<dyn Error>> {
    // initilize the logger
    simple_file_logger::init_logger!("wake_engine").expect("couldn't initialize logger");

    let args = Args::parse();
    let config_path = Config::config_path()?;
    match args.command {
        Some(Command::Init { force }) => {
            if force || !Config::is_config_present() {
                Config::new().save(&config_path)?;
                std::fs::create_dir_all(Config::sounds_path())?;
                println!("wrote {}", config_path.display());
                println!(
                    "add sounds with `new-sound`, relative paths are looked up in {}",
                    Config::sounds_path().display()
                );
            }
        }
        Some(Command::NewSound { name, path }) => {
            let mut config = Config::load(&config_path)?;
            let path = if path.is_relative() {
                Config::sounds_path().join(path)
            } else {
                path
            };
            if !path.is_file() {
                println!("warning: {} doesn't exist (yet)", path.display());
            }
            config.sounds.add(Sound::new(name, path));
            config.save(&config_path)?;
        }
        Some(Command::NewAlarm {
            time,
            days,
            sound,
            name,
            no_snooze,
        }) => {
            let mut repeat_on = Vec::new();
            for day in &days {
                let marker =
                    weekday::parse(day).ok_or_else(|| format!("unknown weekday {day:?}"))?;
                repeat_on.push(marker);
            }
            let mut spec = AlarmSpec::new(alarm::parse_time(&time)?)
                .repeating_on(repeat_on)
                .snoozable(!no_snooze);
            if let Some(sound) = sound {
                spec = spec.with_melody(sound);
            }
            if let Some(name) = name {
                spec = spec.named(name);
            }
            let alarm = Alarm::new(spec)?;
            let mut registry = Registry::load(Box::new(TomlStore::open(Config::alarms_path()?)?));
            println!("{}", alarm.id());
            registry.schedule(alarm);
        }
        Some(Command::List) => {
            let config = Config::load(&config_path)?;
            let registry = Registry::load(Box::new(TomlStore::open(Config::alarms_path()?)?));
            for alarm in registry.all_alarms() {
                print_alarm(&alarm, &config.time_format);
            }
        }
        Some(Command::Remove { id }) => {
            let mut registry = Registry::load(Box::new(TomlStore::open(Config::alarms_path()?)?));
            if registry.unschedule(&id).is_none() {
                println!("no alarm {id}");
            }
        }
        Some(Command::Run) | None => run(&Config::load(&config_path)?)?,
    }
    Ok(())
}

fn print_alarm(alarm: &Alarm, time_format: &str) {
    println!("{}  {}  {alarm}", alarm.id(), alarm.time.format(time_format));
}

fn run(config: &Config) -> Result<(), Box<dyn Error>> {
    let store = TomlStore::open(Config::alarms_path()?)?;
    let events = EventBus::new();
    let (handle, receiver) = communication::channel(events.clone());

    let finished = handle.clone();
    let audio: Arc<dyn AudioPort> = Arc::new(RodioAudio::spawn(&config.sounds, move || {
        if finished.playback_finished().is_err() {
            log::debug!("melody finished after the scheduler stopped");
        }
    }));
    let keeper: Box<dyn LivenessKeeper> = match &config.keep_alive_sound {
        Some(sound) => Box::new(SilentLoopKeeper::new(audio.clone(), sound.clone())),
        None => Box::new(ThreadKeeper),
    };
    let scheduler = Scheduler::new(
        config.settings(),
        Registry::load(Box::new(store)),
        audio,
        Box::new(LogNotifier::new(config.notifications_enabled)),
        Ticker::new(config.tick_interval(), keeper),
        events,
    );
    let owner = daemon::spawn(scheduler, SystemClock, receiver);

    let printed = handle.subscribe();
    let time_format = config.time_format.clone();
    thread::spawn(move || {
        for event in printed {
            let (what, alarm) = match &event {
                AlarmEvent::Triggered(alarm) => ("ringing", alarm),
                AlarmEvent::Snoozed(alarm) => ("snoozed", alarm),
                AlarmEvent::Dismissed(alarm) => ("dismissed", alarm),
            };
            println!("{what}: {alarm} ({})", alarm.time.format(&time_format));
        }
    });

    println!("s = snooze, d = dismiss, c = cancel snoozes, l = list, q = quit");
    for line in io::stdin().lines() {
        match line?.trim() {
            "s" => report("snoozed", handle.snooze()?),
            "d" => report("dismissed", handle.dismiss()?),
            "c" => println!("cancelled {} snooze(s)", handle.cancel_snooze()?),
            "l" => list(&handle, &config.time_format)?,
            "q" => break,
            _ => println!("s = snooze, d = dismiss, c = cancel snoozes, l = list, q = quit"),
        }
    }

    handle.shutdown()?;
    owner.join().map_err(|_| "scheduler thread panicked")?;
    Ok(())
}

fn report(what: &str, done: bool) {
    if !done {
        println!("nothing {what}");
    }
}

fn list(handle: &Handle, time_format: &str) -> Result<(), Box<dyn Error>> {
    println!("{:?}", handle.state()?);
    for alarm in handle.all_alarms()? {
        print_alarm(&alarm, time_format);
    }
    Ok(())
}
