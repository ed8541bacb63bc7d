//! The thread that owns the scheduler.
//!
//! User requests, audio callbacks and ticks all arrive here and are handled
//! one at a time, so no two of them ever touch the alarms at once. Between
//! messages the thread sleeps until the ticker's next tick is due.

use std::{
    sync::mpsc::{Receiver, RecvTimeoutError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use chrono::NaiveDateTime;
use log::{debug, info};

use crate::{communication::Message, scheduler::Scheduler};

/// how long to wait for a message while the ticker is stopped
const IDLE_WAIT: Duration = Duration::from_secs(60);

/// the wall clock ticks are evaluated against
pub trait Clock: Send {
    fn now(&self) -> NaiveDateTime;
}

/// local time of the machine
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// runs `scheduler` on its own thread until a [`Message::Shutdown`] arrives
/// or every sender is gone
pub fn spawn(
    scheduler: Scheduler,
    clock: impl Clock + 'static,
    receiver: Receiver<Message>,
) -> JoinHandle<()> {
    thread::spawn(move || run(scheduler, &clock, &receiver))
}

fn run(mut scheduler: Scheduler, clock: &dyn Clock, receiver: &Receiver<Message>) {
    scheduler.init();
    loop {
        let wait = scheduler
            .ticker()
            .time_until_due(Instant::now())
            .unwrap_or(IDLE_WAIT);
        match receiver.recv_timeout(wait) {
            Ok(Message::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(message) => handle(&mut scheduler, clock, message),
            Err(RecvTimeoutError::Timeout) => {}
        }
        if scheduler.ticker_mut().poll(Instant::now()) {
            scheduler.tick(clock.now());
        }
    }
    scheduler.shutdown();
    info!("scheduler thread exiting");
}

// a requester that stopped waiting for its answer is not our problem
fn handle(scheduler: &mut Scheduler, clock: &dyn Clock, message: Message) {
    debug!("handling {message:?}");
    match message {
        Message::Schedule(alarm, reply) => {
            reply.send(scheduler.schedule(alarm)).ok();
        }
        Message::Unschedule(id, reply) => {
            reply.send(scheduler.unschedule(&id)).ok();
        }
        Message::Update(id, spec, reply) => {
            reply.send(scheduler.update(&id, spec, clock.now())).ok();
        }
        Message::Snooze(reply) => {
            reply.send(scheduler.snooze(clock.now())).ok();
        }
        Message::Dismiss(reply) => {
            reply.send(scheduler.dismiss()).ok();
        }
        Message::CancelSnooze(reply) => {
            reply.send(scheduler.cancel_snooze()).ok();
        }
        Message::AllAlarms(reply) => {
            reply.send(scheduler.all_alarms()).ok();
        }
        Message::IsScheduled(id, reply) => {
            reply.send(scheduler.is_scheduled(&id)).ok();
        }
        Message::State(reply) => {
            reply.send(scheduler.state().clone()).ok();
        }
        Message::Tick(reply) => {
            reply.send(scheduler.tick(clock.now())).ok();
        }
        Message::PlaybackFinished => scheduler.playback_finished(clock.now()),
        Message::Interruption(interruption) => scheduler.interruption(interruption),
        // handled by the loop
        Message::Shutdown => {}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex, PoisonError};

    use super::*;
    use crate::{
        alarm::{Alarm, AlarmSpec},
        audio::Loops,
        communication::{self, Handle},
        error::{AlarmError, HandleError},
        evaluator::TriggerDecision,
        events::{AlarmEvent, EventBus},
        registry::Registry,
        scheduler::{SessionState, Settings},
        store::MemoryStore,
        testing::{RecordingAudio, RecordingNotifier},
        ticker::{ThreadKeeper, Ticker},
    };
    use chrono::NaiveDate;

    #[derive(Clone)]
    struct FixedClock(Arc<Mutex<NaiveDateTime>>);

    impl FixedClock {
        fn at(now: NaiveDateTime) -> Self {
            Self(Arc::new(Mutex::new(now)))
        }

        fn set(&self, now: NaiveDateTime) {
            *self.0.lock().unwrap_or_else(PoisonError::into_inner) = now;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            *self.0.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    fn monday(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    fn start(
        clock: FixedClock,
        interval: Duration,
    ) -> (Handle, JoinHandle<()>, Arc<RecordingAudio>) {
        let audio = Arc::new(RecordingAudio::default());
        let events = EventBus::new();
        let (handle, receiver) = communication::channel(events.clone());
        let scheduler = Scheduler::new(
            Settings {
                melodies: vec!["ring".to_string()],
                ..Settings::default()
            },
            Registry::load(Box::new(MemoryStore::new())),
            audio.clone(),
            Box::new(RecordingNotifier::granted()),
            Ticker::new(interval, Box::new(ThreadKeeper)),
            events,
        );
        (handle, spawn(scheduler, clock, receiver), audio)
    }

    #[test]
    fn requests_are_answered_in_order() {
        let clock = FixedClock::at(monday(6, 0, 0));
        let (handle, thread, audio) = start(clock.clone(), Duration::from_secs(3600));

        let alarm = Alarm::new(AlarmSpec::at(7, 0).unwrap().repeating_on([0])).unwrap();
        let id = alarm.id().to_string();
        assert_eq!(handle.schedule(alarm.clone()), Ok(true));
        assert_eq!(handle.schedule(alarm), Ok(false));
        assert_eq!(handle.is_scheduled(&id), Ok(true));
        assert_eq!(handle.all_alarms().unwrap().len(), 1);

        assert_eq!(handle.tick_now(), Ok(vec![]));
        clock.set(monday(7, 0, 4));
        assert_eq!(handle.tick_now(), Ok(vec![TriggerDecision::FireNew(id.clone())]));
        assert_eq!(handle.state(), Ok(SessionState::Triggered(id.clone())));
        assert_eq!(audio.plays(), vec![("ring".to_string(), Loops::Times(6))]);

        assert_eq!(handle.snooze(), Ok(true));
        assert_eq!(handle.state(), Ok(SessionState::Snoozed(id.clone())));
        assert_eq!(handle.cancel_snooze(), Ok(1));
        assert_eq!(handle.state(), Ok(SessionState::Waiting));
        assert_eq!(handle.dismiss(), Ok(false));

        let bad = AlarmSpec::at(7, 0).unwrap().repeating_on([9]);
        assert_eq!(
            handle.update(&id, bad),
            Err(HandleError::Alarm(AlarmError::InvalidWeekday(9)))
        );
        assert_eq!(handle.update(&id, AlarmSpec::at(8, 0).unwrap()), Ok(true));
        assert_eq!(handle.unschedule(&id), Ok(true));
        assert_eq!(handle.unschedule(&id), Ok(false));

        handle.shutdown().unwrap();
        thread.join().unwrap();
        assert_eq!(handle.state(), Err(HandleError::Stopped));
    }

    #[test]
    fn the_ticker_drives_evaluation() {
        let clock = FixedClock::at(monday(7, 0, 1));
        let (handle, thread, _audio) = start(clock, Duration::from_millis(10));
        let events = handle.subscribe();

        let alarm = Alarm::new(AlarmSpec::at(7, 0).unwrap()).unwrap();
        handle.schedule(alarm.clone()).unwrap();

        match events.recv_timeout(Duration::from_secs(5)) {
            Ok(AlarmEvent::Triggered(fired)) => assert_eq!(fired.id(), alarm.id()),
            other => panic!("expected the alarm to trigger, got {other:?}"),
        }

        // the finished melody snoozes it
        handle.playback_finished().unwrap();
        assert!(matches!(
            events.recv_timeout(Duration::from_secs(5)),
            Ok(AlarmEvent::Snoozed(_))
        ));
        assert_eq!(handle.state(), Ok(SessionState::Snoozed(alarm.id().to_string())));

        handle.shutdown().unwrap();
        thread.join().unwrap();
    }

    #[test]
    fn a_failed_melody_does_not_stop_the_ticker() {
        let clock = FixedClock::at(monday(7, 0, 1));
        let (handle, thread, audio) = start(clock.clone(), Duration::from_millis(10));
        let events = handle.subscribe();
        audio.fail_next_play();

        let first = Alarm::new(AlarmSpec::at(7, 0).unwrap()).unwrap();
        handle.schedule(first.clone()).unwrap();
        match events.recv_timeout(Duration::from_secs(5)) {
            Ok(AlarmEvent::Triggered(fired)) => assert_eq!(fired.id(), first.id()),
            other => panic!("expected the first alarm to trigger, got {other:?}"),
        }

        clock.set(monday(7, 5, 1));
        let second = Alarm::new(AlarmSpec::at(7, 5).unwrap()).unwrap();
        handle.schedule(second.clone()).unwrap();
        let rang = loop {
            match events.recv_timeout(Duration::from_secs(5)) {
                Ok(AlarmEvent::Triggered(alarm)) if alarm.id() == second.id() => break true,
                Ok(_) => {}
                Err(_) => break false,
            }
        };
        assert!(rang, "the second alarm never rang");
        assert_eq!(handle.state(), Ok(SessionState::Triggered(second.id().to_string())));

        handle.shutdown().unwrap();
        thread.join().unwrap();
    }

    #[test]
    fn dropping_every_handle_stops_the_thread() {
        let (handle, thread, _audio) =
            start(FixedClock::at(monday(6, 0, 0)), Duration::from_secs(1));
        drop(handle);
        thread.join().unwrap();
    }
}
