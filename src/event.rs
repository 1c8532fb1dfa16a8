use crate::train::{Direction, TrainId};
use log::*;
use parking_lot::Mutex;
use std::io;
use std::time::{Duration, Instant};

/// Run clock shared by every emitter. Started when the start gate opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    start: Instant,
}

impl Clock {
    pub fn start() -> Clock {
        Clock {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Ready,
    Entered,
    Exited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub elapsed: Duration,
    pub train: TrainId,
    pub kind: EventKind,
    pub direction: Direction,
}

impl Event {
    pub fn timestamp(&self) -> String {
        format_timestamp(self.elapsed)
    }
}

/// `hh:mm:ss.d`, rounded to the nearest tenth of a second.
pub fn format_timestamp(elapsed: Duration) -> String {
    let tenths = (elapsed.as_millis() + 50) / 100;
    format!(
        "{:02}:{:02}:{:02}.{}",
        tenths / 36_000,
        (tenths / 600) % 60,
        (tenths / 10) % 60,
        tenths % 10
    )
}

/// Where lifecycle events end up. Called with events already in log order.
pub trait EventSink {
    fn append(&mut self, event: &Event) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn append(&mut self, event: &Event) -> io::Result<()> {
        (**self).append(event)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub events: Vec<Event>,
}

impl EventSink for MemorySink {
    fn append(&mut self, event: &Event) -> io::Result<()> {
        self.events.push(*event);
        Ok(())
    }
}

struct LogInner<S> {
    sink: S,
    error: Option<io::Error>,
}

/// Serializes emitters onto one sink.
///
/// The timestamp is taken while the lock is held, so the order of appends
/// and the order of timestamps agree.
pub struct EventLog<S> {
    inner: Mutex<LogInner<S>>,
}

impl<S: EventSink> EventLog<S> {
    pub fn new(sink: S) -> EventLog<S> {
        EventLog {
            inner: Mutex::new(LogInner { sink, error: None }),
        }
    }

    pub fn emit(&self, clock: &Clock, train: TrainId, kind: EventKind, direction: Direction) {
        let mut inner = self.inner.lock();
        let event = Event {
            elapsed: clock.elapsed(),
            train,
            kind,
            direction,
        };
        if let Err(e) = inner.sink.append(&event) {
            warn!("could not log {:?} for train {}: {}", kind, train, e);
            inner.error.get_or_insert(e);
        }
    }

    /// Closes the sink and hands it back, along with the first error seen.
    pub fn close(self) -> (S, Option<io::Error>) {
        let LogInner { mut sink, mut error } = self.inner.into_inner();
        if let Err(e) = sink.close() {
            error.get_or_insert(e);
        }
        (sink, error)
    }
}
