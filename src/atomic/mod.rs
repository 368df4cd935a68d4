//! A histogram with the same bucket layout as [`Histogram`](crate::Histogram) but with atomic
//! counters, so any number of threads can record through a shared reference.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

use crate::bucket::BucketConfig;
use crate::errors::{CreationError, RecordError};
use crate::phaser::WriterReaderPhaser;
use crate::Histogram;

/// The floating-point window a double histogram currently maps onto its integer range.
///
/// For integer histograms this is the identity scale and is never consulted on the record path.
/// It lives inside the count store so that a writer observes the window, the conversion ratios,
/// and the slots they apply to in a single load.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scale {
    pub lowest: f64,
    pub highest_limit: f64,
    pub double_to_integer: f64,
    pub integer_to_double: f64,
}

impl Scale {
    pub fn identity() -> Scale {
        Scale {
            lowest: 0.0,
            highest_limit: f64::INFINITY,
            double_to_integer: 1.0,
            integer_to_double: 1.0,
        }
    }
}

/// One generation of the counter array plus everything needed to interpret it.
#[derive(Debug)]
pub(crate) struct CountStore {
    pub cfg: BucketConfig,
    pub scale: Scale,
    pub slots: Box<[AtomicU64]>,
}

impl CountStore {
    pub fn new(cfg: BucketConfig, scale: Scale) -> CountStore {
        let slots: Vec<AtomicU64> = (0..cfg.counts_len).map(|_| AtomicU64::new(0)).collect();
        CountStore {
            cfg,
            scale,
            slots: slots.into_boxed_slice(),
        }
    }
}

/// Recording failed because the value falls outside the current floating-point window and the
/// window must slide before it can be represented.
pub(crate) struct WindowMiss;

/// A histogram safe for concurrent recording from many threads.
///
/// Recording takes a shared reference and costs a few atomic additions; it is wait-free on
/// architectures with a native atomic fetch-add, except while a structural change (an
/// auto-resize, or a range shift of the [`DoubleHistogram`](crate::DoubleHistogram) wrapper) is
/// replacing the counter array, which is coordinated through an internal
/// [`WriterReaderPhaser`].
///
/// Totals, min, and max may lag the individual counters while records are in flight; they are
/// exact whenever the histogram is quiesced, which is what the interval recorders guarantee for
/// the snapshots they hand out.
#[derive(Debug)]
pub struct AtomicHistogram {
    auto_resize: bool,

    pub(crate) store: ArcSwap<CountStore>,
    pub(crate) store_phaser: WriterReaderPhaser,

    pub(crate) total_count: AtomicU64,
    pub(crate) max_value: AtomicU64,
    pub(crate) min_non_zero_value: AtomicU64,

    start_time_msec: AtomicI64,
    end_time_msec: AtomicI64,
}

// construction

impl AtomicHistogram {
    /// Construct an auto-resizing atomic histogram; see
    /// [`Histogram::new`](crate::Histogram::new).
    pub fn new(sigfig: u8) -> Result<AtomicHistogram, CreationError> {
        let mut h = Self::new_with_bounds(1, 2, sigfig)?;
        h.auto_resize = true;
        Ok(h)
    }

    /// Construct an atomic histogram with a fixed maximum trackable value; see
    /// [`Histogram::new_with_max`](crate::Histogram::new_with_max).
    pub fn new_with_max(high: u64, sigfig: u8) -> Result<AtomicHistogram, CreationError> {
        Self::new_with_bounds(1, high, sigfig)
    }

    /// Construct an atomic histogram with fixed bounds; see
    /// [`Histogram::new_with_bounds`](crate::Histogram::new_with_bounds).
    pub fn new_with_bounds(
        low: u64,
        high: u64,
        sigfig: u8,
    ) -> Result<AtomicHistogram, CreationError> {
        let cfg = BucketConfig::new(low, high, sigfig)?;
        Ok(Self::from_parts(cfg, Scale::identity(), false))
    }

    pub(crate) fn from_parts(cfg: BucketConfig, scale: Scale, auto_resize: bool) -> AtomicHistogram {
        AtomicHistogram {
            auto_resize,
            store: ArcSwap::from_pointee(CountStore::new(cfg, scale)),
            store_phaser: WriterReaderPhaser::new(),
            total_count: AtomicU64::new(0),
            max_value: AtomicU64::new(0),
            min_non_zero_value: AtomicU64::new(u64::MAX),
            start_time_msec: AtomicI64::new(0),
            end_time_msec: AtomicI64::new(0),
        }
    }

    /// An empty histogram with the same current geometry, scale, and resize behavior.
    pub(crate) fn fresh_like(&self) -> AtomicHistogram {
        let store = self.store.load();
        Self::from_parts(store.cfg, store.scale, self.auto_resize)
    }
}

// recording

impl AtomicHistogram {
    /// Record a single occurrence of `value`.
    ///
    /// Fails if `value` exceeds the highest trackable value and auto-resize is disabled.
    pub fn record(&self, value: u64) -> Result<(), RecordError> {
        self.record_n(value, 1)
    }

    /// Record `count` occurrences of `value`.
    pub fn record_n(&self, value: u64, count: u64) -> Result<(), RecordError> {
        loop {
            {
                let _section = self.store_phaser.writer_critical_section();
                let store = self.store.load();
                if let Some(index) = store.cfg.index_for_checked(value) {
                    store.slots[index].fetch_add(count, Ordering::Relaxed);
                    self.update_min_and_max(value, store.cfg.unit_magnitude_mask);
                    self.total_count.fetch_add(count, Ordering::Relaxed);
                    return Ok(());
                }
                if !self.auto_resize {
                    return Err(RecordError::ValueOutOfRangeResizeDisabled);
                }
            }
            // Growing flips the store phaser, which would deadlock against our own open writer
            // section, so the section is closed first and the record retried.
            self.grow_to(value)?;
        }
    }

    /// Record `value`, correcting for coordinated omission; see
    /// [`Histogram::record_correct`](crate::Histogram::record_correct).
    pub fn record_correct(&self, value: u64, interval: u64) -> Result<(), RecordError> {
        self.record_n_correct(value, 1, interval)
    }

    /// Record `count` occurrences of `value`, correcting for coordinated omission; see
    /// [`Histogram::record_correct`](crate::Histogram::record_correct).
    pub fn record_n_correct(&self, value: u64, count: u64, interval: u64) -> Result<(), RecordError> {
        self.record_n(value, count)?;
        if interval == 0 {
            return Ok(());
        }
        let mut missing = value.saturating_sub(interval);
        while missing >= interval {
            self.record_n(missing, count)?;
            missing -= interval;
        }
        Ok(())
    }

    /// Record a floating-point `value` against the store's current scale. Fails with
    /// [`WindowMiss`] when the value lies outside the current window (or raced with a window
    /// shift); the double wrapper owns the shifting policy and retries.
    pub(crate) fn record_f64(&self, value: f64, count: u64) -> Result<(), WindowMiss> {
        let _section = self.store_phaser.writer_critical_section();
        let store = self.store.load();

        if value == 0.0 {
            // Zero needs no scaling and has a dedicated slot.
            store.slots[0].fetch_add(count, Ordering::Relaxed);
            self.total_count.fetch_add(count, Ordering::Relaxed);
            return Ok(());
        }
        if value < store.scale.lowest || value >= store.scale.highest_limit {
            return Err(WindowMiss);
        }

        let integer_value = (value * store.scale.double_to_integer) as u64;
        match store.cfg.index_for_checked(integer_value) {
            Some(index) => {
                store.slots[index].fetch_add(count, Ordering::Relaxed);
                self.update_min_and_max(integer_value, store.cfg.unit_magnitude_mask);
                self.total_count.fetch_add(count, Ordering::Relaxed);
                Ok(())
            }
            None => Err(WindowMiss),
        }
    }

    /// Replace the store with one whose geometry covers `value`, folding the retired counters
    /// in once every writer that could have been recording into them has drained.
    fn grow_to(&self, value: u64) -> Result<(), RecordError> {
        let guard = self.store_phaser.reader_lock();

        let current = self.store.load_full();
        if current.cfg.index_for_checked(value).is_some() {
            // Another thread grew the store while we waited for the lock.
            return Ok(());
        }
        let cfg = current
            .cfg
            .with_coverage(value)
            .map_err(|_| RecordError::ResizeFailedUsizeTypeTooSmall)?;
        let replacement = Arc::new(CountStore::new(cfg, current.scale));
        let retired = self.store.swap(Arc::clone(&replacement));

        guard.flip_phase(Duration::from_secs(0));

        // The retired store is quiesced now. Resizing does not move slots around (the geometry
        // only gains buckets at the top), so the fold is index to index.
        for (index, slot) in retired.slots.iter().enumerate() {
            let count = slot.load(Ordering::Acquire);
            if count > 0 {
                replacement.slots[index].fetch_add(count, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    pub(crate) fn update_min_and_max(&self, value: u64, unit_magnitude_mask: u64) {
        let candidate = value | unit_magnitude_mask; // max unit-equivalent value
        let mut current = self.max_value.load(Ordering::Relaxed);
        while candidate > current {
            match self.max_value.compare_exchange_weak(
                current,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(now) => current = now,
            }
        }

        if value != 0 && value > unit_magnitude_mask {
            let candidate = value & !unit_magnitude_mask; // min unit-equivalent value
            let mut current = self.min_non_zero_value.load(Ordering::Relaxed);
            while candidate < current {
                match self.min_non_zero_value.compare_exchange_weak(
                    current,
                    candidate,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => break,
                    Err(now) => current = now,
                }
            }
        }
    }
}

// administrative

impl AtomicHistogram {
    /// Zero every counter and reset the tracked stats and timestamps.
    ///
    /// This does not synchronize with concurrent writers; callers (the interval recorders) are
    /// expected to only reset a histogram that is quiesced.
    pub fn reset(&self) {
        let store = self.store.load();
        for slot in store.slots.iter() {
            slot.store(0, Ordering::Relaxed);
        }
        self.total_count.store(0, Ordering::Relaxed);
        self.max_value.store(0, Ordering::Relaxed);
        self.min_non_zero_value.store(u64::MAX, Ordering::Relaxed);
        self.start_time_msec.store(0, Ordering::Relaxed);
        self.end_time_msec.store(0, Ordering::Relaxed);
    }

    /// Copy this histogram's contents into a plain single-threaded [`Histogram`].
    ///
    /// The copy is exact when the histogram is quiesced (as interval snapshots are); with
    /// writers still in flight it reflects some recent state of each counter.
    pub fn to_histogram(&self) -> Histogram<u64> {
        let store = self.store.load();
        let mut h = Histogram::<u64>::from_config(store.cfg);
        for (index, slot) in store.slots.iter().enumerate() {
            let count = slot.load(Ordering::Relaxed);
            if count > 0 {
                h.set_count_at_index(index, count);
            }
        }
        h.set_internal_stats(
            self.total_count.load(Ordering::Relaxed),
            self.max_value.load(Ordering::Relaxed),
            self.min_non_zero_value.load(Ordering::Relaxed),
        );
        if let Some(t) = self.start_time_msec() {
            h.set_start_time_msec(t);
        }
        if let Some(t) = self.end_time_msec() {
            h.set_end_time_msec(t);
        }
        h
    }
}

// accessors

impl AtomicHistogram {
    /// Total number of samples recorded so far.
    pub fn len(&self) -> u64 {
        self.total_count.load(Ordering::Relaxed)
    }

    /// Returns true if no samples have been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct counter slots the histogram currently holds.
    pub fn distinct_values(&self) -> usize {
        self.store.load().slots.len()
    }

    /// The configured lowest discernible value.
    pub fn low(&self) -> u64 {
        self.store.load().cfg.lowest_discernible_value
    }

    /// The highest value the histogram can currently track.
    pub fn high(&self) -> u64 {
        self.store.load().cfg.highest_trackable_value
    }

    /// The configured number of significant decimal digits.
    pub fn sigfig(&self) -> u8 {
        self.store.load().cfg.significant_value_digits
    }

    /// Whether the histogram grows its range instead of failing on out-of-range records.
    pub fn is_auto_resize(&self) -> bool {
        self.auto_resize
    }

    /// Start of the interval this histogram covers, in milliseconds since the epoch, if the
    /// recorder stamped one on it.
    pub fn start_time_msec(&self) -> Option<i64> {
        match self.start_time_msec.load(Ordering::Relaxed) {
            0 => None,
            t => Some(t),
        }
    }

    /// End of the interval this histogram covers, in milliseconds since the epoch, if the
    /// recorder stamped one on it.
    pub fn end_time_msec(&self) -> Option<i64> {
        match self.end_time_msec.load(Ordering::Relaxed) {
            0 => None,
            t => Some(t),
        }
    }

    /// Stamp the start of the interval this histogram covers.
    pub fn set_start_time_msec(&self, time_msec: i64) {
        self.start_time_msec.store(time_msec, Ordering::Relaxed);
    }

    /// Stamp the end of the interval this histogram covers.
    pub fn set_end_time_msec(&self, time_msec: i64) {
        self.end_time_msec.store(time_msec, Ordering::Relaxed);
    }
}

// data statistics

impl AtomicHistogram {
    /// Lowest recorded value, or 0 if the histogram is empty.
    pub fn min(&self) -> u64 {
        let store = self.store.load();
        if self.len() == 0 || store.slots[0].load(Ordering::Relaxed) != 0 {
            0
        } else {
            self.min_nz()
        }
    }

    /// Lowest recorded non-zero value, or `u64::MAX` if no non-zero values were recorded.
    pub fn min_nz(&self) -> u64 {
        let min = self.min_non_zero_value.load(Ordering::Relaxed);
        if min == u64::MAX {
            u64::MAX
        } else {
            self.store.load().cfg.lowest_equivalent(min)
        }
    }

    /// Highest recorded value, or 0 if the histogram is empty.
    pub fn max(&self) -> u64 {
        let max = self.max_value.load(Ordering::Relaxed);
        if max == 0 {
            0
        } else {
            self.store.load().cfg.highest_equivalent(max)
        }
    }

    /// Arithmetic mean of all recorded values, at bucket resolution.
    pub fn mean(&self) -> f64 {
        let total = self.len();
        if total == 0 {
            return 0.0;
        }
        let store = self.store.load();
        let mut sum = 0.0_f64;
        for (index, slot) in store.slots.iter().enumerate() {
            let count = slot.load(Ordering::Relaxed);
            if count > 0 {
                let mid = store.cfg.median_equivalent(store.cfg.value_for(index));
                sum += mid as f64 * count as f64;
            }
        }
        sum / total as f64
    }

    /// Standard deviation of all recorded values, at bucket resolution.
    pub fn stdev(&self) -> f64 {
        let total = self.len();
        if total == 0 {
            return 0.0;
        }
        let mean = self.mean();
        let store = self.store.load();
        let mut geometric_deviation_total = 0.0_f64;
        for (index, slot) in store.slots.iter().enumerate() {
            let count = slot.load(Ordering::Relaxed);
            if count > 0 {
                let deviation =
                    store.cfg.median_equivalent(store.cfg.value_for(index)) as f64 - mean;
                geometric_deviation_total += deviation * deviation * count as f64;
            }
        }
        (geometric_deviation_total / total as f64).sqrt()
    }

    /// The value at the given percentile; see
    /// [`Histogram::value_at_percentile`](crate::Histogram::value_at_percentile).
    pub fn value_at_percentile(&self, percentile: f64) -> u64 {
        if percentile >= 100.0 {
            return self.max();
        }

        let total = self.len();
        let requested = (percentile / 100.0) * total as f64;
        let count_at_percentile = ((requested + 0.5) as u64).max(1);

        let store = self.store.load();
        let mut total_to_current_index = 0_u64;
        for (index, slot) in store.slots.iter().enumerate() {
            total_to_current_index =
                total_to_current_index.saturating_add(slot.load(Ordering::Relaxed));
            if total_to_current_index >= count_at_percentile {
                let value_at_index = store.cfg.value_for(index);
                return if percentile == 0.0 {
                    store.cfg.lowest_equivalent(value_at_index)
                } else {
                    store.cfg.highest_equivalent(value_at_index)
                };
            }
        }
        0
    }

    /// Percentage of recorded samples that are smaller than or equivalent to `value`.
    pub fn percentile_below(&self, value: u64) -> f64 {
        let total = self.len();
        if total == 0 {
            return 100.0;
        }
        let store = self.store.load();
        let target = store.cfg.index_for(value).min(store.slots.len() - 1);
        let total_to_target: u64 = store.slots[..=target]
            .iter()
            .map(|slot| slot.load(Ordering::Relaxed))
            .fold(0, u64::saturating_add);
        100.0 * total_to_target as f64 / total as f64
    }

    /// Count of recorded values at `value`, to within the histogram's resolution.
    pub fn count_at(&self, value: u64) -> u64 {
        let store = self.store.load();
        let index = store.cfg.index_for(value).min(store.slots.len() - 1);
        store.slots[index].load(Ordering::Relaxed)
    }

    /// Count of recorded values between `low` and `high` inclusive, each rounded to the
    /// histogram's resolution.
    pub fn count_between(&self, low: u64, high: u64) -> u64 {
        let store = self.store.load();
        let last = store.slots.len() - 1;
        let low_index = store.cfg.index_for(low).min(last);
        let high_index = store.cfg.index_for(high).min(last);
        store.slots[low_index..=high_index]
            .iter()
            .map(|slot| slot.load(Ordering::Relaxed))
            .fold(0, u64::saturating_add)
    }
}
