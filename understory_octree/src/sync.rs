// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Synchronization primitives used by the octree.
//!
//! - [`Lock`]: a value guarded by some lock, accessed through a closure.
//! - [`SyncStrategy`]: picks the lock used for every leaf collection.
//!   [`Blocking`] parks on contention, [`Spinning`] spins with backoff, and
//!   [`Unsynchronized`] does no locking at all (trees using it are not `Sync`).
//! - [`CountDownBarrier`]: a reusable rendezvous where every arrival blocks on
//!   departure until all outstanding arrivals have departed.

use core::cell::RefCell;
use core::fmt::Debug;
use core::sync::atomic::{AtomicBool, Ordering};

use crossbeam_utils::Backoff;
use parking_lot::lock_api::{self, GuardSend, RawMutex};
use parking_lot::{Condvar, Mutex};

/// A value guarded by a lock.
pub trait Lock<T> {
    /// Wrap `value` in a fresh, unlocked lock.
    fn new(value: T) -> Self;

    /// Lock, run `f` on the guarded value, then unlock.
    fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R;

    /// Exclusive access without locking; the borrow checker already proves
    /// there are no other users.
    fn get_mut(&mut self) -> &mut T;
}

impl<R: RawMutex, T> Lock<T> for lock_api::Mutex<R, T> {
    #[inline]
    fn new(value: T) -> Self {
        Self::new(value)
    }

    #[inline]
    fn with<U>(&self, f: impl FnOnce(&mut T) -> U) -> U {
        f(&mut self.lock())
    }

    #[inline]
    fn get_mut(&mut self) -> &mut T {
        Self::get_mut(self)
    }
}

impl<T> Lock<T> for RefCell<T> {
    #[inline]
    fn new(value: T) -> Self {
        Self::new(value)
    }

    #[inline]
    fn with<U>(&self, f: impl FnOnce(&mut T) -> U) -> U {
        f(&mut self.borrow_mut())
    }

    #[inline]
    fn get_mut(&mut self) -> &mut T {
        Self::get_mut(self)
    }
}

/// Chooses the lock type guarding each node's object collection.
pub trait SyncStrategy: Debug + 'static {
    /// The lock wrapping a value of type `T`.
    type Lock<T>: Lock<T>;
}

/// Blocking mutex (`parking_lot::Mutex`). The default.
#[derive(Copy, Clone, Debug, Default)]
pub struct Blocking;

impl SyncStrategy for Blocking {
    type Lock<T> = parking_lot::Mutex<T>;
}

/// Spin lock with exponential backoff. Good when critical sections are tiny.
#[derive(Copy, Clone, Debug, Default)]
pub struct Spinning;

impl SyncStrategy for Spinning {
    type Lock<T> = lock_api::Mutex<RawSpinLock, T>;
}

/// No locking at all.
///
/// Collections live in a `RefCell`, so a tree using this strategy is `!Sync`
/// and can only be used from one thread.
#[derive(Copy, Clone, Debug, Default)]
pub struct Unsynchronized;

impl SyncStrategy for Unsynchronized {
    type Lock<T> = RefCell<T>;
}

/// Raw spin lock: one atomic flag, acquired with a CAS loop.
#[derive(Debug)]
pub struct RawSpinLock {
    locked: AtomicBool,
}

#[allow(
    unsafe_code,
    reason = "lock_api::RawMutex is an unsafe trait; the flag is only cleared by its holder."
)]
unsafe impl RawMutex for RawSpinLock {
    #[allow(
        clippy::declare_interior_mutable_const,
        reason = "lock_api requires an INIT constant."
    )]
    const INIT: Self = Self {
        locked: AtomicBool::new(false),
    };

    type GuardMarker = GuardSend;

    fn lock(&self) {
        let backoff = Backoff::new();
        while !self.try_lock() {
            while self.locked.load(Ordering::Relaxed) {
                backoff.snooze();
            }
        }
    }

    fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
struct BarrierState {
    pending: usize,
    generation: u64,
}

/// A reusable count-down barrier.
///
/// Callers first [`arrive`](Self::arrive), do some work, then
/// [`depart`](Arrival::depart). A departure blocks until every outstanding
/// arrival has also departed; the last one to depart releases everybody.
/// After draining, the barrier is ready for another round.
#[derive(Debug)]
pub struct CountDownBarrier {
    state: Mutex<BarrierState>,
    drained: Condvar,
}

impl Default for CountDownBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl CountDownBarrier {
    /// Create a barrier with no outstanding arrivals.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(BarrierState {
                pending: 0,
                generation: 0,
            }),
            drained: Condvar::new(),
        }
    }

    /// Register an arrival. The returned ticket must be departed.
    ///
    /// Dropping the ticket without departing departs implicitly, so a
    /// panicking participant does not strand the others.
    #[must_use = "an arrival holds the barrier closed until it departs"]
    pub fn arrive(&self) -> Arrival<'_> {
        self.state.lock().pending += 1;
        Arrival {
            barrier: self,
            departed: false,
        }
    }

    /// Number of arrivals that have not departed yet.
    pub fn pending(&self) -> usize {
        self.state.lock().pending
    }

    fn depart<R>(&self, on_drained: impl FnOnce() -> R) -> Option<R> {
        let mut state = self.state.lock();
        debug_assert!(state.pending > 0, "departure without a matching arrival");
        state.pending -= 1;
        if state.pending == 0 {
            // Runs before anyone else can arrive for the next round.
            let out = on_drained();
            state.generation = state.generation.wrapping_add(1);
            self.drained.notify_all();
            return Some(out);
        }
        let generation = state.generation;
        while state.generation == generation {
            self.drained.wait(&mut state);
        }
        None
    }
}

/// Ticket returned by [`CountDownBarrier::arrive`].
#[derive(Debug)]
pub struct Arrival<'a> {
    barrier: &'a CountDownBarrier,
    departed: bool,
}

impl Arrival<'_> {
    /// Depart and wait for the barrier to drain.
    ///
    /// Returns `true` for the caller whose departure drained the barrier.
    pub fn depart(self) -> bool {
        self.depart_and(|| ()).is_some()
    }

    /// Depart; if this departure drains the barrier, run `on_drained` while
    /// the barrier is still held and return its result.
    pub fn depart_and<R>(mut self, on_drained: impl FnOnce() -> R) -> Option<R> {
        self.departed = true;
        self.barrier.depart(on_drained)
    }
}

impl Drop for Arrival<'_> {
    fn drop(&mut self) {
        if !self.departed {
            self.barrier.depart(|| ());
        }
    }
}
