use crate::crossing::Crossing;
use crate::event::{Clock, EventKind, EventLog, EventSink};
use crate::fairness::{select_next, FairnessTracker, Selection};
use crate::gate::StartGate;
use crate::queue::Queues;
use crate::train::{Train, TrainId, TrainSpec, TrainState};
use log::*;
use std::io;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Wall time of one input tick.
    pub tick: Duration,
    /// Longest the dispatcher sleeps on empty queues before looking again.
    pub idle_poll: Duration,
    /// Abort when the granted train has not left the crossing after this
    /// long. Time spent with every train still loading does not count.
    pub deadline: Option<Duration>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            tick: Duration::from_millis(100),
            idle_poll: Duration::from_millis(50),
            deadline: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no trains to dispatch")]
    NoTrains,
    #[error("train {train} still on the crossing after {waited:?}")]
    Stalled { train: TrainId, waited: Duration },
    #[error("train {0} panicked")]
    TrainPanicked(TrainId),
    #[error("event log failed: {0}")]
    Sink(#[from] io::Error),
}

#[derive(Debug)]
pub struct RunSummary {
    /// Selections in crossing order.
    pub order: Vec<Selection>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn crossed(&self) -> usize {
        self.order.len()
    }

    pub fn forced(&self) -> usize {
        self.order.iter().filter(|s| s.forced).count()
    }
}

/// Everything the train threads and the dispatcher share for one run.
struct Schedule<S> {
    queues: Queues,
    crossing: Crossing,
    gate: StartGate,
    log: EventLog<S>,
}

impl<S: EventSink> Schedule<S> {
    fn new(sink: S) -> Schedule<S> {
        Schedule {
            queues: Queues::new(),
            crossing: Crossing::new(),
            gate: StartGate::new(),
            log: EventLog::new(sink),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    AwaitingStart,
    Selecting,
    HandoffPending(Selection),
    WaitingForCompletion(Selection),
    AllCrossed,
}

/// Runs every train to completion over the crossing and returns the sink
/// with all events appended.
pub fn run<S: EventSink + Send>(
    specs: &[TrainSpec],
    sink: S,
    config: &DispatchConfig,
) -> Result<(RunSummary, S), DispatchError> {
    if specs.is_empty() {
        return Err(DispatchError::NoTrains);
    }

    let schedule = Schedule::new(sink);

    let summary = thread::scope(|s| {
        let handles = specs
            .iter()
            .enumerate()
            .map(|(id, spec)| {
                let train = Train::new(id, spec, config.tick);
                let schedule = &schedule;
                (id, s.spawn(move || run_train(train, schedule)))
            })
            .collect::<Vec<_>>();

        let mut dispatcher = Dispatcher {
            schedule: &schedule,
            fairness: FairnessTracker::default(),
            config,
            total: specs.len(),
        };
        let result = dispatcher.run();
        if result.is_err() {
            schedule.crossing.shutdown();
        }

        let mut panicked = None;
        for (id, handle) in handles {
            if handle.join().is_err() {
                error!("train {} panicked", id);
                panicked.get_or_insert(id);
            }
        }

        match (result, panicked) {
            (Err(e), _) => Err(e),
            (Ok(_), Some(id)) => Err(DispatchError::TrainPanicked(id)),
            (Ok(summary), None) => Ok(summary),
        }
    })?;

    let (sink, error) = schedule.log.close();
    if let Some(e) = error {
        return Err(e.into());
    }
    info!(
        "{} trains crossed in {:.1}s, {} forced by the starvation rule",
        summary.crossed(),
        summary.elapsed.as_secs_f64(),
        summary.forced()
    );
    Ok((summary, sink))
}

fn run_train<S: EventSink>(mut train: Train, schedule: &Schedule<S>) {
    let clock = schedule.gate.register_and_wait();

    train.advance(TrainState::Loading);
    pause(train.load);

    train.advance(TrainState::Ready);
    debug!("train {} ready going {}", train.id, train.direction);
    schedule.log.emit(&clock, train.id, EventKind::Ready, train.direction);
    schedule.queues.push(train.class(), train.id);

    train.advance(TrainState::Waiting);
    let occupancy = match schedule.crossing.enter(train.id) {
        Some(occupancy) => occupancy,
        None => {
            warn!("train {} gave up waiting, the crossing was shut", train.id);
            return;
        }
    };

    train.advance(TrainState::Crossing);
    schedule.log.emit(&clock, train.id, EventKind::Entered, train.direction);
    pause(train.cross);
    schedule.log.emit(&clock, train.id, EventKind::Exited, train.direction);

    train.finish(occupancy);
    debug!("train {} done", train.id);
}

fn pause(d: Duration) {
    if !d.is_zero() {
        thread::sleep(d);
    }
}

struct Dispatcher<'a, S> {
    schedule: &'a Schedule<S>,
    fairness: FairnessTracker,
    config: &'a DispatchConfig,
    total: usize,
}

impl<S: EventSink> Dispatcher<'_, S> {
    fn run(&mut self) -> Result<RunSummary, DispatchError> {
        let mut order = Vec::with_capacity(self.total);
        let mut clock: Option<Clock> = None;
        let mut phase = Phase::AwaitingStart;

        loop {
            trace!("dispatcher {:?}", phase);
            phase = match phase {
                Phase::AwaitingStart => {
                    self.schedule.gate.wait_for_registrations(self.total);
                    let started = self.schedule.gate.open();
                    debug!("all {} trains registered, gate open", self.total);
                    clock = Some(started);
                    Phase::Selecting
                }
                Phase::Selecting => {
                    let queues = &self.schedule.queues;
                    let seen = queues.signal().generation();
                    match select_next(&mut self.fairness, queues) {
                        Some(selection) => Phase::HandoffPending(selection),
                        None => {
                            queues.signal().wait_past(seen, self.config.idle_poll);
                            Phase::Selecting
                        }
                    }
                }
                Phase::HandoffPending(selection) => {
                    self.schedule.crossing.grant(selection.train);
                    Phase::WaitingForCompletion(selection)
                }
                Phase::WaitingForCompletion(selection) => {
                    let deadline = self.config.deadline.map(|d| Instant::now() + d);
                    if let Err(train) = self.schedule.crossing.wait_until_free(deadline) {
                        return Err(DispatchError::Stalled {
                            train,
                            waited: self.config.deadline.unwrap_or_default(),
                        });
                    }
                    order.push(selection);
                    if order.len() == self.total {
                        Phase::AllCrossed
                    } else {
                        Phase::Selecting
                    }
                }
                Phase::AllCrossed => break,
            };
        }

        debug_assert_eq!(self.schedule.queues.total_len(), 0);
        Ok(RunSummary {
            order,
            elapsed: clock.map(|c| c.elapsed()).unwrap_or_default(),
        })
    }
}
