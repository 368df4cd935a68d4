//! A single-writer-lock-free synchronization primitive that lets any number of writer threads
//! mark short critical sections while a coordinating reader waits for every critical section
//! that started before a given point to finish.
//!
//! The phaser is independent of histograms; the interval recorders use it to make their
//! double-buffer swap safe, but it can coordinate any "writers mutate the active structure,
//! reader swaps and then examines the retired structure" scheme.
//!
//! # How it works
//!
//! Writers increment a shared `start_epoch` on entry. The sign of the value they get back tells
//! them which of two end epochs ("even" or "odd") to increment on exit; start and end epochs for
//! a phase therefore advance in lockstep once every writer has exited. When the reader flips the
//! phase it resets the epoch the *next* phase will use, swaps `start_epoch` to the next phase's
//! initial value (capturing how many writers entered during the finished phase), and then waits
//! until the finished phase's end epoch has caught up with that capture — at which point every
//! writer that entered before the flip has provably exited.
//!
//! Writer entry and exit are one atomic fetch-add each: wait-free on architectures with a native
//! atomic add, lock-free elsewhere, and never blocked by the reader. Readers serialize among
//! themselves on an ordinary mutex and bear the whole cost of coordination.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// The writer/reader phase-flip coordination primitive.
///
/// ```
/// use std::time::Duration;
/// use tidemark::phaser::WriterReaderPhaser;
///
/// let phaser = WriterReaderPhaser::new();
///
/// // writer path, any number of threads:
/// {
///     let _section = phaser.writer_critical_section();
///     // ... mutate the active structure ...
/// } // exit happens on drop, even if the section panics
///
/// // reader path, one thread at a time:
/// let guard = phaser.reader_lock();
/// // ... swap active and inactive structures ...
/// guard.flip_phase(Duration::from_micros(500));
/// // every writer that entered before the swap has now exited
/// ```
#[derive(Debug)]
pub struct WriterReaderPhaser {
    start_epoch: AtomicI64,
    even_end_epoch: AtomicI64,
    odd_end_epoch: AtomicI64,
    reader_lock: Mutex<()>,
}

impl Default for WriterReaderPhaser {
    fn default() -> WriterReaderPhaser {
        WriterReaderPhaser::new()
    }
}

impl WriterReaderPhaser {
    /// Create a phaser, starting in the even phase with no writers in flight.
    pub fn new() -> WriterReaderPhaser {
        WriterReaderPhaser {
            start_epoch: AtomicI64::new(0),
            even_end_epoch: AtomicI64::new(0),
            odd_end_epoch: AtomicI64::new(i64::MIN),
            reader_lock: Mutex::new(()),
        }
    }

    /// Enter a writer critical section, returning the token that must be passed to
    /// [`WriterReaderPhaser::writer_critical_section_exit`].
    ///
    /// Prefer [`WriterReaderPhaser::writer_critical_section`], which pairs the two calls
    /// through a guard so the exit also runs on panic.
    pub fn writer_critical_section_enter(&self) -> i64 {
        self.start_epoch.fetch_add(1, Ordering::AcqRel)
    }

    /// Exit a writer critical section entered with the given token.
    pub fn writer_critical_section_exit(&self, token: i64) {
        // The token's sign says which phase this writer entered during, and therefore which end
        // epoch its exit must be counted against.
        if token < 0 {
            self.odd_end_epoch.fetch_add(1, Ordering::Release);
        } else {
            self.even_end_epoch.fetch_add(1, Ordering::Release);
        }
    }

    /// Enter a writer critical section, exiting it when the returned guard drops.
    pub fn writer_critical_section(&self) -> WriterCriticalSection<'_> {
        WriterCriticalSection {
            phaser: self,
            token: self.writer_critical_section_enter(),
        }
    }

    /// Take the reader lock, serializing against other readers. Flipping the phase requires the
    /// returned guard, which guarantees the lock is held for the duration of the flip.
    pub fn reader_lock(&self) -> PhaserReadGuard<'_> {
        PhaserReadGuard {
            phaser: self,
            _guard: self.reader_lock.lock().unwrap(),
        }
    }
}

/// An open writer critical section; dropping it performs the exit. See
/// [`WriterReaderPhaser::writer_critical_section`].
#[derive(Debug)]
pub struct WriterCriticalSection<'a> {
    phaser: &'a WriterReaderPhaser,
    token: i64,
}

impl Drop for WriterCriticalSection<'_> {
    fn drop(&mut self) {
        self.phaser.writer_critical_section_exit(self.token);
    }
}

/// Proof that the reader lock is held. See [`WriterReaderPhaser::reader_lock`].
#[derive(Debug)]
pub struct PhaserReadGuard<'a> {
    phaser: &'a WriterReaderPhaser,
    _guard: MutexGuard<'a, ()>,
}

impl PhaserReadGuard<'_> {
    /// Flip the phase and wait until every writer critical section entered before the flip has
    /// exited.
    ///
    /// While waiting, the reader sleeps in `yield_period` increments; `Duration::ZERO` spins
    /// with [`std::thread::yield_now`] instead. The wait is unbounded: it finishes as soon as,
    /// and only when, the slowest pre-flip writer exits its critical section.
    pub fn flip_phase(&self, yield_period: Duration) {
        let next_phase_is_even = self.phaser.start_epoch.load(Ordering::Acquire) < 0;

        // Clear the next phase's end epoch to its initial value while no writer can be counting
        // against it yet, then flip the start epoch, capturing the number of writer entries the
        // finished phase saw.
        let initial_start_value = if next_phase_is_even { 0 } else { i64::MIN };
        if next_phase_is_even {
            self.phaser
                .even_end_epoch
                .store(initial_start_value, Ordering::Relaxed);
        } else {
            self.phaser
                .odd_end_epoch
                .store(initial_start_value, Ordering::Relaxed);
        }
        let start_value_at_flip = self
            .phaser
            .start_epoch
            .swap(initial_start_value, Ordering::AcqRel);

        // Wait until the finished phase's end epoch catches up with its start count.
        let end_epoch = if next_phase_is_even {
            &self.phaser.odd_end_epoch
        } else {
            &self.phaser.even_end_epoch
        };
        while end_epoch.load(Ordering::Acquire) != start_value_at_flip {
            if yield_period == Duration::from_secs(0) {
                thread::yield_now();
            } else {
                thread::sleep(yield_period);
            }
        }
    }
}
