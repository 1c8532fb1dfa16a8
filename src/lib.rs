//! Dispatching trains over a single-track crossing shared by both directions.
//!
//! Every train runs on its own thread: it waits at a common start gate,
//! loads, queues up in one of four (direction, priority) queues and waits to
//! be let onto the crossing. One dispatcher picks the next train from the
//! queues, hands it the crossing and waits for it to leave.

pub mod crossing;
pub mod dispatcher;
pub mod event;
pub mod fairness;
pub mod gate;
pub mod input;
pub mod output;
pub mod queue;
pub mod train;

pub use dispatcher::{run, DispatchConfig, DispatchError, RunSummary};
pub use event::{Event, EventKind, EventSink, MemorySink};
pub use train::{Direction, Priority, TrainId, TrainSpec};
