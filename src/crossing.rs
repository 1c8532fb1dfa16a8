use crate::train::TrainId;
use parking_lot::{Condvar, Mutex};
use std::time::Instant;

#[derive(Debug, Default)]
struct Slot {
    occupant: Option<TrainId>,
    shut: bool,
}

/// The single-occupancy track section.
///
/// Only the dispatcher fills the slot and only the occupant empties it. One
/// condvar carries every "occupant changed" notification; waiting trains
/// re-check whether they are the one that was let in.
#[derive(Debug, Default)]
pub struct Crossing {
    slot: Mutex<Slot>,
    changed: Condvar,
}

impl Crossing {
    pub fn new() -> Crossing {
        Crossing::default()
    }

    pub fn occupant(&self) -> Option<TrainId> {
        self.slot.lock().occupant
    }

    /// Lets `train` onto the crossing. The slot must be empty.
    pub fn grant(&self, train: TrainId) {
        let mut slot = self.slot.lock();
        debug_assert!(
            slot.occupant.is_none(),
            "granting train {} while train {:?} is crossing",
            train,
            slot.occupant
        );
        slot.occupant = Some(train);
        drop(slot);
        self.changed.notify_all();
    }

    /// Blocks until `train` is the occupant. Returns false if the crossing
    /// was shut down first.
    pub fn wait_for_turn(&self, train: TrainId) -> bool {
        let mut slot = self.slot.lock();
        while slot.occupant != Some(train) {
            if slot.shut {
                return false;
            }
            self.changed.wait(&mut slot);
        }
        true
    }

    /// Waits for the turn of `train` and returns a guard that releases the
    /// crossing when dropped, also if the train panics while crossing.
    pub fn enter(&self, train: TrainId) -> Option<Occupancy<'_>> {
        if self.wait_for_turn(train) {
            Some(Occupancy {
                crossing: self,
                train,
            })
        } else {
            None
        }
    }

    pub fn release(&self, train: TrainId) {
        let mut slot = self.slot.lock();
        debug_assert_eq!(slot.occupant, Some(train), "train {} released a crossing it did not hold", train);
        slot.occupant = None;
        drop(slot);
        self.changed.notify_all();
    }

    /// Blocks until the slot is empty again. With a deadline, returns the
    /// occupant that was still crossing when the deadline passed.
    pub fn wait_until_free(&self, deadline: Option<Instant>) -> Result<(), TrainId> {
        let mut slot = self.slot.lock();
        while let Some(occupant) = slot.occupant {
            match deadline {
                Some(deadline) => {
                    if self.changed.wait_until(&mut slot, deadline).timed_out() && slot.occupant.is_some() {
                        return Err(occupant);
                    }
                }
                None => self.changed.wait(&mut slot),
            }
        }
        Ok(())
    }

    /// Turns away every train still waiting for its turn.
    pub fn shutdown(&self) {
        self.slot.lock().shut = true;
        self.changed.notify_all();
    }
}

#[derive(Debug)]
pub struct Occupancy<'a> {
    crossing: &'a Crossing,
    train: TrainId,
}

impl Occupancy<'_> {
    pub fn train(&self) -> TrainId {
        self.train
    }
}

impl Drop for Occupancy<'_> {
    fn drop(&mut self) {
        self.crossing.release(self.train);
    }
}
