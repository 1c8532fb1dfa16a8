use crate::event::{Event, EventKind, EventSink};
use serde_json::json;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Human readable line for one event, e.g.
/// `00:00:01.0 Train  0 is ready to go East`.
pub fn describe(event: &Event) -> String {
    let what = match event.kind {
        EventKind::Ready => format!("is ready to go {}", event.direction),
        EventKind::Entered => format!("is ON the main track going {}", event.direction),
        EventKind::Exited => format!("is OFF the main track after going {}", event.direction),
    };
    format!("{} Train {:>2} {}", event.timestamp(), event.train, what)
}

pub fn event_json(event: &Event) -> serde_json::Value {
    json!({
        "time": event.timestamp(),
        "elapsed_ms": event.elapsed.as_millis() as u64,
        "train": event.train,
        "event": event.kind,
        "direction": event.direction,
    })
}

pub struct TextSink<W: Write> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> TextSink<W> {
        TextSink { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl TextSink<BufWriter<File>> {
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(TextSink::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> EventSink for TextSink<W> {
    fn append(&mut self, event: &Event) -> io::Result<()> {
        writeln!(self.out, "{}", describe(event))
    }

    fn close(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// One JSON object per line.
pub struct JsonSink<W: Write> {
    out: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> JsonSink<W> {
        JsonSink { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl JsonSink<BufWriter<File>> {
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(JsonSink::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> EventSink for JsonSink<W> {
    fn append(&mut self, event: &Event) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, &event_json(event))?;
        self.out.write_all(b"\n")
    }

    fn close(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Sends every event to several sinks. Every sink sees every event even if
/// an earlier one failed; the first error is returned.
#[derive(Default)]
pub struct Fanout {
    sinks: Vec<Box<dyn EventSink + Send>>,
}

impl Fanout {
    pub fn new() -> Fanout {
        Fanout::default()
    }

    pub fn with(mut self, sink: impl EventSink + Send + 'static) -> Fanout {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for Fanout {
    fn append(&mut self, event: &Event) -> io::Result<()> {
        let mut result = Ok(());
        for sink in self.sinks.iter_mut() {
            let r = sink.append(event);
            if result.is_ok() {
                result = r;
            }
        }
        result
    }

    fn close(&mut self) -> io::Result<()> {
        let mut result = Ok(());
        for sink in self.sinks.iter_mut() {
            let r = sink.close();
            if result.is_ok() {
                result = r;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::train::Direction;
    use std::time::Duration;

    fn event(ms: u64, train: usize, kind: EventKind, direction: Direction) -> Event {
        Event {
            elapsed: Duration::from_millis(ms),
            train,
            kind,
            direction,
        }
    }

    #[test]
    fn text_lines() {
        let mut sink = TextSink::new(Vec::new());
        sink.append(&event(1000, 0, EventKind::Ready, Direction::East)).unwrap();
        sink.append(&event(1000, 0, EventKind::Entered, Direction::East)).unwrap();
        sink.append(&event(1600, 12, EventKind::Exited, Direction::West)).unwrap();
        sink.close().unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            text,
            "00:00:01.0 Train  0 is ready to go East\n\
             00:00:01.0 Train  0 is ON the main track going East\n\
             00:00:01.6 Train 12 is OFF the main track after going West\n"
        );
    }

    #[test]
    fn json_lines() {
        let mut sink = JsonSink::new(Vec::new());
        sink.append(&event(2500, 3, EventKind::Entered, Direction::West)).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let value: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(value["time"], "00:00:02.5");
        assert_eq!(value["elapsed_ms"], 2500);
        assert_eq!(value["train"], 3);
        assert_eq!(value["event"], "entered");
        assert_eq!(value["direction"], "West");
    }

    #[test]
    fn fanout_reaches_every_sink() {
        use crate::event::MemorySink;
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Shared(Arc<Mutex<MemorySink>>);
        impl EventSink for Shared {
            fn append(&mut self, event: &Event) -> io::Result<()> {
                self.0.lock().unwrap().append(event)
            }
        }

        let (a, b) = (Shared::default(), Shared::default());
        let mut fanout = Fanout::new().with(a.clone()).with(b.clone());
        assert_eq!(fanout.len(), 2);
        fanout.append(&event(0, 1, EventKind::Ready, Direction::West)).unwrap();
        fanout.close().unwrap();
        assert_eq!(a.0.lock().unwrap().events.len(), 1);
        assert_eq!(b.0.lock().unwrap().events.len(), 1);
    }
}
