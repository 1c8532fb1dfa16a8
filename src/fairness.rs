//! Choosing which ready train crosses next.
//!
//! Priority is strict (any High train beats any Low train) and directions
//! alternate when both have trains waiting at the same level. The one
//! exception is the starvation rule: after two crossings in the same
//! direction the opposite direction goes next if it has any train at all,
//! whatever its priority.

use crate::queue::Queues;
use crate::train::{Direction, Priority, TrainId};
use log::*;

/// Remembers the directions of the last two crossings.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FairnessTracker {
    last: Option<Direction>,
    second_last: Option<Direction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub train: TrainId,
    pub direction: Direction,
    pub priority: Priority,
    /// Picked by the starvation rule rather than by priority order.
    pub forced: bool,
}

impl FairnessTracker {
    pub fn last(&self) -> Option<Direction> {
        self.last
    }

    pub fn second_last(&self) -> Option<Direction> {
        self.second_last
    }

    /// The direction that must go next, if the last two crossings agreed.
    pub fn forced_direction(&self) -> Option<Direction> {
        match (self.last, self.second_last) {
            (Some(a), Some(b)) if a == b => Some(a.opposite()),
            _ => None,
        }
    }

    pub fn record(&mut self, direction: Direction) {
        self.second_last = self.last;
        self.last = Some(direction);
    }

    /// Direction to take when both directions have trains at one level.
    fn tie_break(&self) -> Direction {
        self.last.map(Direction::opposite).unwrap_or(Direction::West)
    }
}

/// Pops the next train to cross, updating the history. `None` means no
/// queue had a train when looked at.
pub fn select_next(tracker: &mut FairnessTracker, queues: &Queues) -> Option<Selection> {
    if let Some(direction) = tracker.forced_direction() {
        let popped = [Priority::High, Priority::Low]
            .iter()
            .find_map(|&p| queues.get(direction, p).pop_front().map(|t| (t, p)));
        if let Some((train, priority)) = popped {
            tracker.record(direction);
            trace!("starvation rule forces train {} going {}", train, direction);
            return Some(Selection {
                train,
                direction,
                priority,
                forced: true,
            });
        }
    }

    for &priority in [Priority::High, Priority::Low].iter() {
        let east = !queues.get(Direction::East, priority).is_empty();
        let west = !queues.get(Direction::West, priority).is_empty();
        let first = match (east, west) {
            (true, false) => Direction::East,
            (false, true) => Direction::West,
            (true, true) => tracker.tie_break(),
            (false, false) => continue,
        };

        // Lengths are read without the queue locks; if the chosen queue turned
        // out to be empty, the other direction at this level still gets a try.
        for &direction in [first, first.opposite()].iter() {
            if let Some(train) = queues.get(direction, priority).pop_front() {
                tracker.record(direction);
                trace!("selected train {} going {} ({:?})", train, direction, priority);
                return Some(Selection {
                    train,
                    direction,
                    priority,
                    forced: false,
                });
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::train::Class;
    use crate::train::Direction::*;
    use crate::train::Priority::*;

    fn queue(queues: &Queues, d: Direction, p: Priority, train: TrainId) {
        queues.push(Class::new(d, p), train);
    }

    fn drain(tracker: &mut FairnessTracker, queues: &Queues) -> Vec<TrainId> {
        std::iter::from_fn(|| select_next(tracker, queues).map(|s| s.train)).collect()
    }

    #[test]
    fn nothing_ready() {
        let mut tracker = FairnessTracker::default();
        assert_eq!(select_next(&mut tracker, &Queues::new()), None);
        assert_eq!(tracker, FairnessTracker::default());
    }

    #[test]
    fn west_wins_the_first_tie() {
        let queues = Queues::new();
        queue(&queues, East, High, 0);
        queue(&queues, West, High, 1);
        let mut tracker = FairnessTracker::default();
        let first = select_next(&mut tracker, &queues).unwrap();
        assert_eq!(first.train, 1);
        assert_eq!(first.direction, West);
        assert!(!first.forced);
        assert_eq!(drain(&mut tracker, &queues), vec![0]);
    }

    #[test]
    fn high_before_low() {
        let queues = Queues::new();
        queue(&queues, West, Low, 0);
        queue(&queues, East, High, 1);
        queue(&queues, East, Low, 2);
        let mut tracker = FairnessTracker::default();
        let s = select_next(&mut tracker, &queues).unwrap();
        assert_eq!((s.train, s.priority), (1, High));
    }

    #[test]
    fn alternates_when_both_directions_wait() {
        let queues = Queues::new();
        for t in 0..3 {
            queue(&queues, East, High, t);
        }
        for t in 3..6 {
            queue(&queues, West, High, t);
        }
        let mut tracker = FairnessTracker::default();
        assert_eq!(drain(&mut tracker, &queues), vec![3, 0, 4, 1, 5, 2]);
    }

    #[test]
    fn single_direction_keeps_arrival_order() {
        let queues = Queues::new();
        for t in 0..3 {
            queue(&queues, East, High, t);
        }
        let mut tracker = FairnessTracker::default();
        let picks = std::iter::from_fn(|| select_next(&mut tracker, &queues)).collect::<Vec<_>>();
        assert_eq!(picks.iter().map(|s| s.train).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(picks.iter().all(|s| !s.forced));
    }

    #[test]
    fn starvation_rule_beats_priority() {
        let queues = Queues::new();
        let mut tracker = FairnessTracker::default();
        tracker.record(East);
        tracker.record(East);
        queue(&queues, West, Low, 0);
        queue(&queues, East, High, 1);
        let s = select_next(&mut tracker, &queues).unwrap();
        assert_eq!(s.train, 0);
        assert_eq!(s.direction, West);
        assert!(s.forced);
        assert_eq!(tracker.forced_direction(), None);
    }

    #[test]
    fn starvation_rule_prefers_high_of_forced_direction() {
        let queues = Queues::new();
        let mut tracker = FairnessTracker::default();
        tracker.record(West);
        tracker.record(West);
        queue(&queues, East, Low, 0);
        queue(&queues, East, High, 1);
        queue(&queues, West, High, 2);
        assert_eq!(drain(&mut tracker, &queues), vec![1, 2, 0]);
    }

    #[test]
    fn starvation_rule_falls_through_when_opposite_is_empty() {
        let queues = Queues::new();
        let mut tracker = FairnessTracker::default();
        tracker.record(East);
        tracker.record(East);
        queue(&queues, East, Low, 0);
        let s = select_next(&mut tracker, &queues).unwrap();
        assert_eq!(s.train, 0);
        assert!(!s.forced);
        assert_eq!(tracker.forced_direction(), Some(West));
    }

    #[test]
    fn no_direction_goes_three_times_while_the_other_waits() {
        let queues = Queues::new();
        let mut tracker = FairnessTracker::default();
        // Low priority westbound trains would lose to eastbound high ones
        // forever without the starvation rule.
        for t in 0..6 {
            queue(&queues, East, High, t);
        }
        for t in 6..8 {
            queue(&queues, West, Low, t);
        }
        let order = std::iter::from_fn(|| select_next(&mut tracker, &queues))
            .map(|s| (s.train, s.direction))
            .collect::<Vec<_>>();
        assert_eq!(order.len(), 8);
        for w in order.windows(3) {
            let all_east = w.iter().all(|(_, d)| *d == East);
            let west_left = order.iter().skip_while(|x| **x != w[2]).any(|(_, d)| *d == West);
            assert!(!(all_east && west_left), "{:?}", order);
        }
        assert_eq!(
            order.iter().map(|(t, _)| *t).collect::<Vec<_>>(),
            vec![0, 1, 6, 2, 3, 7, 4, 5]
        );
    }

    #[test]
    fn history_shifts() {
        let mut tracker = FairnessTracker::default();
        assert_eq!(tracker.forced_direction(), None);
        tracker.record(West);
        assert_eq!((tracker.last(), tracker.second_last()), (Some(West), None));
        tracker.record(East);
        assert_eq!((tracker.last(), tracker.second_last()), (Some(East), Some(West)));
        assert_eq!(tracker.forced_direction(), None);
        tracker.record(East);
        assert_eq!(tracker.forced_direction(), Some(West));
    }
}
