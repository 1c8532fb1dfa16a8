use crate::train::{Class, Direction, Priority, TrainId};
use log::*;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Wakes the dispatcher whenever a train is pushed into any queue.
///
/// The dispatcher reads the generation before it looks at the queues, and
/// only sleeps while the generation is unchanged, so a push that lands
/// between the look and the sleep is never missed.
#[derive(Debug, Default)]
pub struct ReadySignal {
    generation: Mutex<u64>,
    cond: Condvar,
}

impl ReadySignal {
    pub fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    fn bump(&self) {
        *self.generation.lock() += 1;
        self.cond.notify_all();
    }

    /// Blocks until the generation moves past `seen` or `bound` elapses.
    /// Returns true if there was new activity.
    pub fn wait_past(&self, seen: u64, bound: Duration) -> bool {
        let mut generation = self.generation.lock();
        if *generation != seen {
            return true;
        }
        let _ = self.cond.wait_for(&mut generation, bound);
        *generation != seen
    }
}

/// FIFO of ready trains for one (direction, priority) class.
#[derive(Debug)]
pub struct ClassQueue {
    class: Class,
    trains: Mutex<VecDeque<TrainId>>,
    len: AtomicUsize,
}

impl ClassQueue {
    pub fn new(class: Class) -> ClassQueue {
        ClassQueue {
            class,
            trains: Mutex::new(VecDeque::new()),
            len: AtomicUsize::new(0),
        }
    }

    pub fn class(&self) -> Class {
        self.class
    }

    pub fn push(&self, train: TrainId) {
        let mut trains = self.trains.lock();
        debug_assert!(!trains.contains(&train), "train {} queued twice", train);
        trains.push_back(train);
        self.len.store(trains.len(), Ordering::Release);
    }

    pub fn pop_front(&self) -> Option<TrainId> {
        let mut trains = self.trains.lock();
        let train = trains.pop_front();
        self.len.store(trains.len(), Ordering::Release);
        train
    }

    pub fn peek_front(&self) -> Option<TrainId> {
        self.trains.lock().front().copied()
    }

    pub fn peek_second(&self) -> Option<TrainId> {
        self.trains.lock().get(1).copied()
    }

    /// Takes a train out from anywhere in the queue.
    pub fn remove_specific(&self, train: TrainId) -> bool {
        let mut trains = self.trains.lock();
        let removed = match trains.iter().position(|t| *t == train) {
            Some(idx) => trains.remove(idx).is_some(),
            None => false,
        };
        self.len.store(trains.len(), Ordering::Release);
        removed
    }

    pub fn contains(&self, train: TrainId) -> bool {
        self.trains.lock().contains(&train)
    }

    /// May lag behind a concurrent push or pop.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The four class queues plus the signal shared between them.
#[derive(Debug)]
pub struct Queues {
    queues: [ClassQueue; 4],
    signal: ReadySignal,
}

impl Default for Queues {
    fn default() -> Queues {
        Queues::new()
    }
}

impl Queues {
    pub fn new() -> Queues {
        let queues = [
            ClassQueue::new(Class::ALL[0]),
            ClassQueue::new(Class::ALL[1]),
            ClassQueue::new(Class::ALL[2]),
            ClassQueue::new(Class::ALL[3]),
        ];
        debug_assert!(queues.iter().all(|q| Class::ALL[q.class().index()] == q.class()));
        Queues {
            queues,
            signal: ReadySignal::default(),
        }
    }

    pub fn get(&self, direction: Direction, priority: Priority) -> &ClassQueue {
        self.class(Class::new(direction, priority))
    }

    pub fn class(&self, class: Class) -> &ClassQueue {
        &self.queues[class.index()]
    }

    pub fn signal(&self) -> &ReadySignal {
        &self.signal
    }

    /// Pushes a train into its class queue and wakes the dispatcher.
    pub fn push(&self, class: Class, train: TrainId) {
        debug_assert!(
            self.queues.iter().all(|q| !q.contains(train)),
            "train {} is already queued",
            train
        );
        self.class(class).push(train);
        trace!("train {} queued as {:?}", train, class);
        self.signal.bump();
    }

    pub fn total_len(&self) -> usize {
        self.queues.iter().map(|q| q.len()).sum()
    }
}
