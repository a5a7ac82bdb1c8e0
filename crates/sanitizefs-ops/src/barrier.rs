//! Cyclic barrier separating depth phases.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct BarrierState {
    arrived: usize,
    generation: u64,
    broken: bool,
}

/// Reusable barrier for a fixed number of parties.
///
/// Every phase needs exactly `parties` calls to [`arrive`](Self::arrive).
/// The last arrival resets the counter, advances the generation and wakes
/// everyone. A barrier can be broken (see [`break_barrier`](Self::break_barrier))
/// when a party will never show up; from then on `arrive` returns at once.
#[derive(Debug)]
pub struct DepthBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

/// Result of [`DepthBarrier::arrive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierWaitResult {
    leader: bool,
    broken: bool,
    generation: u64,
}

impl BarrierWaitResult {
    /// True for exactly one party per completed phase: the one that
    /// arrived last and released the others.
    pub fn is_leader(&self) -> bool {
        self.leader
    }

    /// True if the barrier was broken instead of completing the phase.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Phase this arrival belonged to.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl DepthBarrier {
    /// Create a barrier for `parties` participants (at least 1).
    pub fn new(parties: usize) -> Self {
        Self {
            parties: parties.max(1),
            state: Mutex::new(BarrierState::default()),
            released: Condvar::new(),
        }
    }

    /// Phases completed so far.
    pub fn phases_completed(&self) -> u64 {
        self.lock().generation
    }

    /// Arrive at the barrier and block until every party has arrived.
    pub fn arrive(&self) -> BarrierWaitResult {
        let mut state = self.lock();
        let generation = state.generation;

        if state.broken {
            return BarrierWaitResult {
                leader: false,
                broken: true,
                generation,
            };
        }

        state.arrived += 1;
        if state.arrived == self.parties {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.released.notify_all();
            return BarrierWaitResult {
                leader: true,
                broken: false,
                generation,
            };
        }

        let state = self
            .released
            .wait_while(state, |s| s.generation == generation && !s.broken)
            .unwrap_or_else(PoisonError::into_inner);

        BarrierWaitResult {
            leader: false,
            broken: state.generation == generation,
            generation,
        }
    }

    /// Release all waiting parties for good.
    ///
    /// Used when a party can no longer arrive (it failed to start or
    /// panicked), so the others do not wait forever.
    pub fn break_barrier(&self) {
        let mut state = self.lock();
        state.broken = true;
        self.released.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, BarrierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
