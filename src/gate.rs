use crate::event::Clock;
use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct GateState {
    registered: usize,
    opened: Option<Clock>,
}

/// Start barrier. Trains register and sleep here until the dispatcher has
/// seen all of them and opens the gate; the run clock starts at that moment.
#[derive(Debug, Default)]
pub struct StartGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl StartGate {
    pub fn new() -> StartGate {
        StartGate::default()
    }

    pub fn register_and_wait(&self) -> Clock {
        let mut state = self.state.lock();
        state.registered += 1;
        self.changed.notify_all();
        loop {
            if let Some(clock) = state.opened {
                return clock;
            }
            self.changed.wait(&mut state);
        }
    }

    pub fn wait_for_registrations(&self, expected: usize) {
        let mut state = self.state.lock();
        while state.registered < expected {
            self.changed.wait(&mut state);
        }
    }

    pub fn open(&self) -> Clock {
        let mut state = self.state.lock();
        debug_assert!(state.opened.is_none(), "start gate opened twice");
        let clock = Clock::start();
        state.opened = Some(clock);
        drop(state);
        self.changed.notify_all();
        clock
    }

    pub fn registered(&self) -> usize {
        self.state.lock().registered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn everyone_gets_the_same_clock() {
        let gate = StartGate::new();
        thread::scope(|s| {
            let gate = &gate;
            let waiters = (0..5)
                .map(|_| s.spawn(move || gate.register_and_wait()))
                .collect::<Vec<_>>();
            gate.wait_for_registrations(5);
            assert_eq!(gate.registered(), 5);
            let clock = gate.open();
            for w in waiters {
                assert_eq!(w.join().unwrap(), clock);
            }
        });
    }

    #[test]
    fn late_arrival_passes_straight_through() {
        let gate = StartGate::new();
        let clock = gate.open();
        assert_eq!(gate.register_and_wait(), clock);
    }
}
