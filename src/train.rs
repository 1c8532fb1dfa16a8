use crate::crossing::Occupancy;
use std::convert::TryFrom;
use std::fmt;
use std::time::Duration;

pub type TrainId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    East,
    West,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::East => write!(f, "East"),
            Direction::West => write!(f, "West"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    High,
    Low,
}

/// One of the four (direction, priority) queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Class {
    pub direction: Direction,
    pub priority: Priority,
}

impl Class {
    pub const ALL: [Class; 4] = [
        Class::new(Direction::East, Priority::High),
        Class::new(Direction::East, Priority::Low),
        Class::new(Direction::West, Priority::High),
        Class::new(Direction::West, Priority::Low),
    ];

    pub const fn new(direction: Direction, priority: Priority) -> Class {
        Class { direction, priority }
    }

    pub fn index(self) -> usize {
        let d = match self.direction {
            Direction::East => 0,
            Direction::West => 2,
        };
        let p = match self.priority {
            Priority::High => 0,
            Priority::Low => 1,
        };
        d + p
    }
}

/// A train as described by the input: direction token plus durations in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainSpec {
    pub direction: Direction,
    pub priority: Priority,
    pub load_ticks: u64,
    pub cross_ticks: u64,
}

impl TrainSpec {
    /// Direction and priority both come from the token: `E`/`e` is East,
    /// `W`/`w` is West, uppercase is high priority.
    pub fn from_token(token: char, load_ticks: u64, cross_ticks: u64) -> Option<TrainSpec> {
        let direction = match token {
            'E' | 'e' => Direction::East,
            'W' | 'w' => Direction::West,
            _ => return None,
        };
        let priority = if token.is_ascii_uppercase() {
            Priority::High
        } else {
            Priority::Low
        };
        Some(TrainSpec {
            direction,
            priority,
            load_ticks,
            cross_ticks,
        })
    }

    pub fn class(&self) -> Class {
        Class::new(self.direction, self.priority)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TrainState {
    Created,
    Loading,
    Ready,
    Waiting,
    Crossing,
    Done,
}

#[derive(Debug)]
pub struct Train {
    pub id: TrainId,
    pub direction: Direction,
    pub priority: Priority,
    pub load: Duration,
    pub cross: Duration,
    state: TrainState,
}

impl Train {
    pub fn new(id: TrainId, spec: &TrainSpec, tick: Duration) -> Train {
        Train {
            id,
            direction: spec.direction,
            priority: spec.priority,
            load: scale(tick, spec.load_ticks),
            cross: scale(tick, spec.cross_ticks),
            state: TrainState::Created,
        }
    }

    pub fn class(&self) -> Class {
        Class::new(self.direction, self.priority)
    }

    pub fn state(&self) -> TrainState {
        self.state
    }

    pub fn advance(&mut self, next: TrainState) {
        debug_assert!(
            next > self.state,
            "train {} cannot go from {:?} to {:?}",
            self.id,
            self.state,
            next
        );
        self.state = next;
    }

    /// Gives the crossing back, then marks the train done. A train in state
    /// Done never holds the crossing.
    pub fn finish(&mut self, occupancy: Occupancy<'_>) {
        debug_assert_eq!(occupancy.train(), self.id);
        drop(occupancy);
        self.advance(TrainState::Done);
    }
}

fn scale(tick: Duration, ticks: u64) -> Duration {
    let ticks = u32::try_from(ticks).unwrap_or(u32::MAX);
    tick.checked_mul(ticks).unwrap_or(Duration::MAX)
}
