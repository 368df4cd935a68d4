//! Interval recorders: concurrent recording with stable "everything since the last read"
//! snapshots.
//!
//! A recorder owns the live histogram writers record into. Taking an interval histogram swaps a
//! fresh (or recycled) buffer in as the live histogram, waits — via the
//! [`WriterReaderPhaser`] — until every record call that started against the old buffer has
//! finished, and hands the old buffer out. Writers never block and never observe the swap;
//! every recorded sample lands in exactly one snapshot.

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwap;

use crate::errors::{AdditionError, CreationError, RecordError, SnapshotError};
use crate::phaser::WriterReaderPhaser;
use crate::{AtomicHistogram, DoubleHistogram, Histogram};

/// Process-wide sequencer distinguishing recorder instances, so a snapshot can only be recycled
/// through the recorder that produced it.
static INSTANCE_ID_SEQUENCER: AtomicU64 = AtomicU64::new(1);

fn next_instance_id() -> u64 {
    INSTANCE_ID_SEQUENCER.fetch_add(1, Ordering::Relaxed)
}

fn current_time_msec() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// What the swap protocol needs from a buffer, beyond what the concrete recorder types use.
trait IntervalTarget {
    fn stamp_start(&self, time_msec: i64);
    fn stamp_end(&self, time_msec: i64);
}

impl IntervalTarget for AtomicHistogram {
    fn stamp_start(&self, time_msec: i64) {
        self.set_start_time_msec(time_msec);
    }
    fn stamp_end(&self, time_msec: i64) {
        self.set_end_time_msec(time_msec);
    }
}

impl IntervalTarget for DoubleHistogram {
    fn stamp_start(&self, time_msec: i64) {
        self.set_start_time_msec(time_msec);
    }
    fn stamp_end(&self, time_msec: i64) {
        self.set_end_time_msec(time_msec);
    }
}

/// The phaser-coordinated double-buffer shared by both recorder flavors.
#[derive(Debug)]
struct PhasedRecorder<H> {
    instance_id: u64,
    phaser: WriterReaderPhaser,
    active: ArcSwap<H>,
}

impl<H: IntervalTarget> PhasedRecorder<H> {
    fn new(initial: H) -> PhasedRecorder<H> {
        initial.stamp_start(current_time_msec());
        PhasedRecorder {
            instance_id: next_instance_id(),
            phaser: WriterReaderPhaser::new(),
            active: ArcSwap::from_pointee(initial),
        }
    }

    /// Run `f` against the live histogram inside a writer critical section. The active pointer
    /// is loaded inside the section, so the sample cannot land in a buffer the reader has
    /// already drained.
    fn with_active<R>(&self, f: impl FnOnce(&H) -> R) -> R {
        let _section = self.phaser.writer_critical_section();
        let active = self.active.load();
        f(&**active)
    }

    /// Install `replacement` (which must be empty) as the live histogram and return the
    /// previous one once every in-flight record against it has finished.
    fn sample(&self, replacement: Arc<H>) -> Arc<H> {
        let guard = self.phaser.reader_lock();

        let now = current_time_msec();
        replacement.stamp_start(now);
        let retired = self.active.swap(replacement);
        retired.stamp_end(now);

        // Wait until writers that saw the old buffer have exited their critical sections.
        guard.flip_phase(Duration::from_micros(500));
        retired
    }
}

/// A stable snapshot of one recording interval, as returned by
/// [`IntervalRecorder::get_interval_histogram`].
///
/// The snapshot owns its buffer: it can be queried through its [`AtomicHistogram`] deref,
/// converted to a plain [`Histogram`], or donated back to the recorder as a recycle buffer to
/// make the next snapshot allocation-free.
#[derive(Debug)]
pub struct IntervalHistogram {
    histogram: Arc<AtomicHistogram>,
    instance_id: u64,
}

impl Deref for IntervalHistogram {
    type Target = AtomicHistogram;

    fn deref(&self) -> &AtomicHistogram {
        &self.histogram
    }
}

impl IntervalHistogram {
    /// Copy this snapshot into a plain single-threaded [`Histogram`].
    pub fn to_histogram(&self) -> Histogram<u64> {
        self.histogram.to_histogram()
    }
}

/// A concurrent recorder of `u64` values producing stable interval histograms.
///
/// Taking an interval histogram swaps a fresh (or recycled) buffer in as the live histogram,
/// waits until every record call that started against the old buffer has finished, and hands
/// the old buffer out; every recorded sample lands in exactly one snapshot. Recording calls are
/// wait-free on architectures with atomic fetch-add, and lock-free elsewhere. Snapshot calls
/// are serialized against each other and leave writers undisturbed.
#[derive(Debug)]
pub struct IntervalRecorder {
    core: PhasedRecorder<AtomicHistogram>,
}

impl IntervalRecorder {
    /// Construct a recorder over an auto-resizing histogram; see
    /// [`Histogram::new`](crate::Histogram::new).
    pub fn new(sigfig: u8) -> Result<IntervalRecorder, CreationError> {
        Ok(IntervalRecorder {
            core: PhasedRecorder::new(AtomicHistogram::new(sigfig)?),
        })
    }

    /// Construct a recorder over a fixed-range histogram; see
    /// [`Histogram::new_with_max`](crate::Histogram::new_with_max).
    pub fn new_with_max(high: u64, sigfig: u8) -> Result<IntervalRecorder, CreationError> {
        Ok(IntervalRecorder {
            core: PhasedRecorder::new(AtomicHistogram::new_with_max(high, sigfig)?),
        })
    }

    /// Construct a recorder over a fixed-bounds histogram; see
    /// [`Histogram::new_with_bounds`](crate::Histogram::new_with_bounds).
    pub fn new_with_bounds(
        low: u64,
        high: u64,
        sigfig: u8,
    ) -> Result<IntervalRecorder, CreationError> {
        Ok(IntervalRecorder {
            core: PhasedRecorder::new(AtomicHistogram::new_with_bounds(low, high, sigfig)?),
        })
    }

    /// Record a single occurrence of `value` into the current interval.
    pub fn record(&self, value: u64) -> Result<(), RecordError> {
        self.core.with_active(|h| h.record(value))
    }

    /// Record `count` occurrences of `value` into the current interval.
    pub fn record_n(&self, value: u64, count: u64) -> Result<(), RecordError> {
        self.core.with_active(|h| h.record_n(value, count))
    }

    /// Record `value` into the current interval, correcting for coordinated omission; see
    /// [`Histogram::record_correct`](crate::Histogram::record_correct).
    pub fn record_correct(&self, value: u64, interval: u64) -> Result<(), RecordError> {
        self.core.with_active(|h| h.record_correct(value, interval))
    }

    /// Record `count` occurrences of `value` into the current interval, correcting for
    /// coordinated omission.
    pub fn record_n_correct(&self, value: u64, count: u64, interval: u64) -> Result<(), RecordError> {
        self.core
            .with_active(|h| h.record_n_correct(value, count, interval))
    }

    /// Take a snapshot of everything recorded since the previous snapshot (or since
    /// construction), allocating a fresh buffer to record the next interval into.
    ///
    /// Every record call that returned before this call is reflected in the returned snapshot
    /// or an earlier one; a call racing with the snapshot lands either in this snapshot or the
    /// next, never both.
    pub fn get_interval_histogram(&self) -> IntervalHistogram {
        let fresh = Arc::new(self.core.active.load().fresh_like());
        IntervalHistogram {
            histogram: self.core.sample(fresh),
            instance_id: self.core.instance_id,
        }
    }

    /// Like [`IntervalRecorder::get_interval_histogram`], but reuses a previously returned
    /// snapshot as the next interval's buffer instead of allocating.
    ///
    /// The recycled snapshot must come from this recorder and still match its precision and
    /// range. Recycling the same snapshot into two recorders' calls at once is prevented by the
    /// ownership transfer; recycling a snapshot while separately retaining a handle that reads
    /// it gives unspecified (but memory-safe) readings.
    pub fn get_interval_histogram_with(
        &self,
        recycle: IntervalHistogram,
    ) -> Result<IntervalHistogram, SnapshotError> {
        if recycle.instance_id != self.core.instance_id {
            return Err(SnapshotError::ForeignRecycleBuffer);
        }
        {
            let active = self.core.active.load();
            if recycle.histogram.sigfig() != active.sigfig() {
                return Err(SnapshotError::IncompatiblePrecision);
            }
            if recycle.histogram.low() != active.low() {
                return Err(SnapshotError::IncompatibleRange);
            }
        }
        recycle.histogram.reset();
        Ok(IntervalHistogram {
            histogram: self.core.sample(recycle.histogram),
            instance_id: self.core.instance_id,
        })
    }

    /// Add everything recorded since the previous snapshot into `target`, which keeps its
    /// existing counts. The recorder starts a fresh interval.
    pub fn get_interval_histogram_into(
        &self,
        target: &mut Histogram<u64>,
    ) -> Result<(), AdditionError> {
        let snapshot = self.get_interval_histogram();
        target.add(snapshot.to_histogram())
    }

    /// Discard everything recorded since the previous snapshot and start a fresh interval.
    pub fn reset(&self) {
        let fresh = Arc::new(self.core.active.load().fresh_like());
        drop(self.core.sample(fresh));
    }
}

/// A stable snapshot of one recording interval, as returned by
/// [`DoubleIntervalRecorder::get_interval_histogram`]; see [`IntervalHistogram`].
#[derive(Debug)]
pub struct IntervalDoubleHistogram {
    histogram: Arc<DoubleHistogram>,
    instance_id: u64,
}

impl Deref for IntervalDoubleHistogram {
    type Target = DoubleHistogram;

    fn deref(&self) -> &DoubleHistogram {
        &self.histogram
    }
}

/// A concurrent recorder of `f64` values producing stable interval histograms; the
/// floating-point counterpart of [`IntervalRecorder`].
#[derive(Debug)]
pub struct DoubleIntervalRecorder {
    core: PhasedRecorder<DoubleHistogram>,
}

impl DoubleIntervalRecorder {
    /// Construct a recorder over an auto-resizing double histogram; see
    /// [`DoubleHistogram::new`](crate::DoubleHistogram::new).
    pub fn new(sigfig: u8) -> Result<DoubleIntervalRecorder, CreationError> {
        Ok(DoubleIntervalRecorder {
            core: PhasedRecorder::new(DoubleHistogram::new(sigfig)?),
        })
    }

    /// Construct a recorder over a fixed-ratio double histogram; see
    /// [`DoubleHistogram::new_with_ratio`](crate::DoubleHistogram::new_with_ratio).
    pub fn new_with_ratio(ratio: u64, sigfig: u8) -> Result<DoubleIntervalRecorder, CreationError> {
        Ok(DoubleIntervalRecorder {
            core: PhasedRecorder::new(DoubleHistogram::new_with_ratio(ratio, sigfig)?),
        })
    }

    /// Record a single occurrence of `value` into the current interval.
    pub fn record(&self, value: f64) -> Result<(), RecordError> {
        self.core.with_active(|h| h.record(value))
    }

    /// Record `count` occurrences of `value` into the current interval.
    pub fn record_n(&self, value: f64, count: u64) -> Result<(), RecordError> {
        self.core.with_active(|h| h.record_n(value, count))
    }

    /// Record `value` into the current interval, correcting for coordinated omission; see
    /// [`DoubleHistogram::record_correct`](crate::DoubleHistogram::record_correct).
    pub fn record_correct(&self, value: f64, interval: f64) -> Result<(), RecordError> {
        self.core.with_active(|h| h.record_correct(value, interval))
    }

    /// Record `count` occurrences of `value` into the current interval, correcting for
    /// coordinated omission.
    pub fn record_n_correct(&self, value: f64, count: u64, interval: f64) -> Result<(), RecordError> {
        self.core
            .with_active(|h| h.record_n_correct(value, count, interval))
    }

    /// Take a snapshot of everything recorded since the previous snapshot (or since
    /// construction), allocating a fresh buffer to record the next interval into.
    pub fn get_interval_histogram(&self) -> IntervalDoubleHistogram {
        let fresh = Arc::new(self.core.active.load().fresh_like());
        IntervalDoubleHistogram {
            histogram: self.core.sample(fresh),
            instance_id: self.core.instance_id,
        }
    }

    /// Like [`DoubleIntervalRecorder::get_interval_histogram`], but reuses a previously
    /// returned snapshot as the next interval's buffer instead of allocating; see
    /// [`IntervalRecorder::get_interval_histogram_with`].
    pub fn get_interval_histogram_with(
        &self,
        recycle: IntervalDoubleHistogram,
    ) -> Result<IntervalDoubleHistogram, SnapshotError> {
        if recycle.instance_id != self.core.instance_id {
            return Err(SnapshotError::ForeignRecycleBuffer);
        }
        {
            let active = self.core.active.load();
            if recycle.histogram.sigfig() != active.sigfig() {
                return Err(SnapshotError::IncompatiblePrecision);
            }
            if recycle.histogram.highest_to_lowest_value_ratio()
                != active.highest_to_lowest_value_ratio()
            {
                return Err(SnapshotError::IncompatibleRange);
            }
        }
        recycle.histogram.reset();
        Ok(IntervalDoubleHistogram {
            histogram: self.core.sample(recycle.histogram),
            instance_id: self.core.instance_id,
        })
    }

    /// Add everything recorded since the previous snapshot into `target`, which keeps its
    /// existing counts. The recorder starts a fresh interval.
    pub fn get_interval_histogram_into(&self, target: &DoubleHistogram) -> Result<(), RecordError> {
        let snapshot = self.get_interval_histogram();
        target.add(&snapshot)
    }

    /// Discard everything recorded since the previous snapshot and start a fresh interval.
    pub fn reset(&self) {
        let fresh = Arc::new(self.core.active.load().fresh_like());
        drop(self.core.sample(fresh));
    }
}
