//! A histogram of `f64` values, built as a sliding power-of-two window over an
//! [`AtomicHistogram`](crate::AtomicHistogram).
//!
//! The dynamic range is configured as a ratio between the largest and smallest value trackable
//! at the same time, rather than as absolute bounds: floating-point measurements rarely have a
//! natural "1". Internally a window `[lowest, lowest * internal_ratio)` of doubles maps linearly
//! onto the integer histogram's range; recording a value outside the window slides the window by
//! whole powers of two, re-homing the already recorded counts, as long as everything recorded so
//! far still fits inside the ratio.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use ieee754::Ieee754;

use crate::atomic::{AtomicHistogram, CountStore, Scale, WindowMiss};
use crate::bucket::BucketConfig;
use crate::errors::{CreationError, RecordError};
use crate::phaser::PhaserReadGuard;

/// The window starts absurdly high so that the first recorded value drags it down into place;
/// auto-ranging towards the low end keeps the top of the range free until it is actually used.
const INITIAL_WINDOW_EXPONENT: i32 = 800;

/// How stored integer values move when the window slides.
#[derive(Debug, Clone, Copy)]
enum Translate {
    None,
    Left(u8),
    Right(u8),
}

/// Smallest `n` such that `2^n >= value`, as computed by the original auto-ranging logic
/// (exact powers of two land one order higher, which only costs a little window headroom).
fn containing_order(value: u64) -> u8 {
    (64 - value.leading_zeros()) as u8
}

/// A histogram of `f64` values safe for concurrent recording from many threads.
///
/// ```
/// use tidemark::DoubleHistogram;
///
/// let h = DoubleHistogram::new_with_ratio(1_000_000_000, 2).unwrap();
/// h.record(1e-3).unwrap();
/// h.record(1e6).unwrap();
/// assert_eq!(h.len(), 2);
/// assert!((h.max() - 1e6).abs() / 1e6 < 0.01);
/// ```
#[derive(Debug)]
pub struct DoubleHistogram {
    highest_to_lowest_value_ratio: u64,
    significant_value_digits: u8,
    auto_resize: bool,
    inner: AtomicHistogram,
}

// construction

impl DoubleHistogram {
    /// Construct an auto-resizing double histogram: the covered ratio starts at 2 and grows to
    /// fit whatever is recorded.
    ///
    /// `sigfig` is the number of significant decimal digits to which the histogram will
    /// maintain value resolution and separation; it must be between 0 and 5.
    pub fn new(sigfig: u8) -> Result<DoubleHistogram, CreationError> {
        let mut h = Self::new_with_ratio(2, sigfig)?;
        h.auto_resize = true;
        Ok(h)
    }

    /// Construct a double histogram able to track values across the given dynamic range:
    /// `ratio` is the highest-to-lowest value ratio that must be representable at the same
    /// time. Must be at least 2.
    pub fn new_with_ratio(ratio: u64, sigfig: u8) -> Result<DoubleHistogram, CreationError> {
        if ratio < 2 {
            return Err(CreationError::HighLessThanTwiceLow);
        }
        if sigfig > 5 {
            return Err(CreationError::SigFigExceedsMax);
        }
        if ratio.saturating_mul(10_u64.pow(u32::from(sigfig))) >= 1_u64 << 61 {
            return Err(CreationError::CannotRepresentSigFigBeyondRatio);
        }

        // The internal range is one binary order of magnitude wider than the configured ratio:
        // a ratio that straddles a power-of-two boundary needs the extra headroom. The bottom
        // half of bucket 0 lacks the required relative precision, so the window maps onto
        // integers starting at sub_bucket_half_count, widening the range by that factor too.
        let internal_ratio = 1_u64 << (containing_order(ratio) + 1);
        let half_count = Self::sub_bucket_half_count(sigfig);
        let internal_range = u64::from(half_count)
            .checked_mul(internal_ratio)
            .ok_or(CreationError::CannotRepresentSigFigBeyondRatio)?;
        let cfg = BucketConfig::new(1, internal_range - 1, sigfig)?;

        let scale = Self::seed_scale(&cfg);
        Ok(DoubleHistogram {
            highest_to_lowest_value_ratio: ratio,
            significant_value_digits: sigfig,
            auto_resize: false,
            inner: AtomicHistogram::from_parts(cfg, scale, false),
        })
    }

    fn sub_bucket_half_count(sigfig: u8) -> u32 {
        let largest_value_with_single_unit_resolution = 2 * 10_u32.pow(u32::from(sigfig));
        let magnitude = f64::from(largest_value_with_single_unit_resolution)
            .log2()
            .ceil() as u32;
        1_u32 << (magnitude.max(1) - 1)
    }

    fn seed_scale(cfg: &BucketConfig) -> Scale {
        let lowest = 2_f64.powi(INITIAL_WINDOW_EXPONENT);
        Self::scale_at(cfg, lowest)
    }

    /// The scale placing the window's bottom at `lowest` for the given geometry.
    fn scale_at(cfg: &BucketConfig, lowest: f64) -> Scale {
        let half_count = f64::from(cfg.sub_bucket_half_count);
        let internal_ratio = ((cfg.highest_trackable_value + 1)
            / u64::from(cfg.sub_bucket_half_count)) as f64;
        let double_to_integer = half_count / lowest;
        Scale {
            lowest,
            highest_limit: lowest * internal_ratio,
            double_to_integer,
            integer_to_double: 1.0 / double_to_integer,
        }
    }

    /// An empty histogram with the same configuration.
    pub(crate) fn fresh_like(&self) -> DoubleHistogram {
        let mut h = DoubleHistogram::new_with_ratio(
            self.highest_to_lowest_value_ratio,
            self.significant_value_digits,
        )
        .expect("ratio and precision were validated when this histogram was built");
        h.auto_resize = self.auto_resize;
        h
    }
}

// recording

impl DoubleHistogram {
    /// Record a single occurrence of `value`.
    ///
    /// Fails for negative or non-finite values, and for values that cannot be covered by the
    /// configured dynamic range together with what has already been recorded.
    pub fn record(&self, value: f64) -> Result<(), RecordError> {
        self.record_n(value, 1)
    }

    /// Record `count` occurrences of `value`.
    pub fn record_n(&self, value: f64, count: u64) -> Result<(), RecordError> {
        if !value.is_finite() || value < 0.0 {
            return Err(RecordError::ValueOutOfRangeResizeDisabled);
        }
        let mut attempts = 0;
        loop {
            match self.inner.record_f64(value, count) {
                Ok(()) => return Ok(()),
                Err(WindowMiss) => self.shift_to_cover(value)?,
            }
            // The window can only move a bounded number of binary orders over the histogram's
            // lifetime; repeated misses mean concurrent recordings are fighting over a range
            // wider than the ratio allows.
            attempts += 1;
            if attempts > 64 {
                return Err(RecordError::ValueOutOfRangeResizeDisabled);
            }
        }
    }

    /// Record `value`, correcting for coordinated omission; see
    /// [`Histogram::record_correct`](crate::Histogram::record_correct). The pacing `interval`
    /// is a value in the same (floating point) units as the samples; an interval of 0 or less
    /// disables the correction.
    pub fn record_correct(&self, value: f64, interval: f64) -> Result<(), RecordError> {
        self.record_n_correct(value, 1, interval)
    }

    /// Record `count` occurrences of `value`, correcting for coordinated omission.
    pub fn record_n_correct(&self, value: f64, count: u64, interval: f64) -> Result<(), RecordError> {
        self.record_n(value, count)?;
        if interval <= 0.0 {
            return Ok(());
        }
        let mut missing = value - interval;
        while missing >= interval {
            self.record_n(missing, count)?;
            missing -= interval;
        }
        Ok(())
    }

    /// Slide (or, for auto-resizing histograms, grow) the window until `value` fits, moving the
    /// counts already recorded along with it.
    fn shift_to_cover(&self, value: f64) -> Result<(), RecordError> {
        let guard = self.inner.store_phaser.reader_lock();
        loop {
            let store = self.inner.store.load_full();
            if value >= store.scale.lowest && value < store.scale.highest_limit {
                // Another thread moved the window while we waited for the reader lock.
                return Ok(());
            }
            if value < store.scale.lowest {
                let demand = (store.scale.lowest / value).ceil() - 1.0;
                let delta = self.capped_order(demand).max(1);
                self.slide_down(&guard, &store, delta)?;
            } else {
                // A value exactly at the limit belongs to the next window position; computing
                // the demand from one ulp above makes exact multiples shift while
                // just-smaller values do not.
                let demand = (value.next() / store.scale.highest_limit).ceil() - 1.0;
                let delta = self.capped_order(demand).max(1);
                self.slide_up(&guard, &store, delta, value)?;
            }
        }
    }

    /// One window adjustment can cover at most the configured ratio's worth of binary orders
    /// (and never more than 50, so the f64 -> u64 conversion below stays exact).
    fn capped_order(&self, demand: f64) -> u8 {
        if demand > self.highest_to_lowest_value_ratio as f64 {
            return containing_order(self.highest_to_lowest_value_ratio);
        }
        if demand > (1_u64 << 50) as f64 {
            return 50;
        }
        containing_order(demand.ceil() as u64)
    }

    /// Move the window towards smaller values: stored integers scale up by `2^delta`.
    fn slide_down(
        &self,
        guard: &PhaserReadGuard<'_>,
        store: &Arc<CountStore>,
        delta: u8,
    ) -> Result<(), RecordError> {
        let mut cfg = store.cfg;
        let min_raw = self.inner.min_non_zero_value.load(Ordering::Relaxed);
        let max_raw = self.inner.max_value.load(Ordering::Relaxed);
        if min_raw != u64::MAX {
            // The largest stored integer must survive the multiply.
            let grown = if u32::from(delta) <= max_raw.leading_zeros() {
                max_raw << delta
            } else {
                u64::MAX
            };
            if grown > cfg.highest_trackable_value {
                if !self.auto_resize {
                    return Err(RecordError::ValueOutOfRangeResizeDisabled);
                }
                if grown == u64::MAX || grown > 1_u64 << 62 {
                    return Err(RecordError::ResizeFailedUsizeTypeTooSmall);
                }
                cfg = cfg
                    .with_coverage(grown)
                    .map_err(|_| RecordError::ResizeFailedUsizeTypeTooSmall)?;
            }
        }
        let factor = 2_f64.powi(i32::from(delta));
        let scale = Self::scale_at(&cfg, store.scale.lowest / factor);
        self.replace_store(guard, cfg, scale, Translate::Left(delta));
        Ok(())
    }

    /// Move the window towards larger values: stored integers scale down by `2^delta`, unless
    /// that would push the smallest recorded sample below the precision floor, in which case an
    /// auto-resizing histogram grows the integer range upward instead.
    fn slide_up(
        &self,
        guard: &PhaserReadGuard<'_>,
        store: &Arc<CountStore>,
        delta: u8,
        value: f64,
    ) -> Result<(), RecordError> {
        let cfg = store.cfg;
        let min_raw = self.inner.min_non_zero_value.load(Ordering::Relaxed);
        if min_raw != u64::MAX && (min_raw >> delta) < u64::from(cfg.sub_bucket_half_count) {
            if !self.auto_resize {
                return Err(RecordError::ValueOutOfRangeResizeDisabled);
            }
            // Grow the top instead of sliding, keeping the scale so nothing moves.
            let needed_integer = (value * store.scale.double_to_integer).ceil();
            if !(needed_integer < (1_u64 << 62) as f64) {
                return Err(RecordError::ResizeFailedUsizeTypeTooSmall);
            }
            let cfg = cfg
                .with_coverage(needed_integer as u64)
                .map_err(|_| RecordError::ResizeFailedUsizeTypeTooSmall)?;
            let scale = Self::scale_at(&cfg, store.scale.lowest);
            self.replace_store(guard, cfg, scale, Translate::None);
            return Ok(());
        }
        let factor = 2_f64.powi(i32::from(delta));
        let scale = Self::scale_at(&cfg, store.scale.lowest * factor);
        self.replace_store(guard, cfg, scale, Translate::Right(delta));
        Ok(())
    }

    /// Publish a store with the new geometry and scale, drain the writers still recording into
    /// the old one, then fold the retired counters in at their translated positions and
    /// re-derive min/max under the new scale.
    fn replace_store(
        &self,
        guard: &PhaserReadGuard<'_>,
        cfg: BucketConfig,
        scale: Scale,
        translate: Translate,
    ) {
        let replacement = Arc::new(CountStore::new(cfg, scale));
        let retired = self.inner.store.swap(Arc::clone(&replacement));

        guard.flip_phase(Duration::from_secs(0));

        let last = replacement.slots.len() - 1;
        for (index, slot) in retired.slots.iter().enumerate() {
            let count = slot.load(Ordering::Acquire);
            if count == 0 {
                continue;
            }
            let old_value = retired.cfg.value_for(index);
            let new_value = match translate {
                Translate::None => old_value,
                Translate::Left(d) => {
                    if u32::from(d) <= old_value.leading_zeros() {
                        old_value << d
                    } else {
                        u64::MAX
                    }
                }
                Translate::Right(d) => old_value >> d,
            };
            // A sample that raced in while the slide was being prepared can land outside the
            // pre-checked bounds; it is clamped to the nearest representable slot.
            let new_index = replacement.cfg.index_for_checked(new_value).unwrap_or(last);
            replacement.slots[new_index].fetch_add(count, Ordering::Relaxed);
        }

        // Pre-slide extremes are meaningless under the new scale; clear them and fold the
        // merged slots back in. Writers that entered after the flip update concurrently, and
        // rescanning their slots is harmless.
        self.inner.max_value.store(0, Ordering::Relaxed);
        self.inner
            .min_non_zero_value
            .store(u64::MAX, Ordering::Relaxed);
        for (index, slot) in replacement.slots.iter().enumerate() {
            let count = slot.load(Ordering::Relaxed);
            if count > 0 {
                let v = replacement.cfg.value_for(index);
                if v != 0 {
                    self.inner.update_min_and_max(
                        replacement.cfg.highest_equivalent(v),
                        replacement.cfg.unit_magnitude_mask,
                    );
                }
            }
        }
    }
}

// add

impl DoubleHistogram {
    /// Add the contents of another double histogram to this one, re-recording each of its
    /// counts at this histogram's resolution and window.
    ///
    /// Fails like [`DoubleHistogram::record_n`] would if the other histogram holds values this
    /// one's dynamic range cannot cover.
    pub fn add(&self, source: &DoubleHistogram) -> Result<(), RecordError> {
        let store = source.inner.store.load();
        for (index, slot) in store.slots.iter().enumerate() {
            let count = slot.load(Ordering::Relaxed);
            if count > 0 {
                // index 0 is the zero-value slot and scales to 0.0 on its own
                let value =
                    store.cfg.value_for(index) as f64 * store.scale.integer_to_double;
                self.record_n(value, count)?;
            }
        }
        Ok(())
    }
}

// administrative

impl DoubleHistogram {
    /// Reset the contents, stats, and window of this histogram, preserving its ratio and
    /// precision.
    ///
    /// Like [`AtomicHistogram::reset`](crate::AtomicHistogram::reset), this does not
    /// synchronize with concurrent writers and should only be applied to a quiesced histogram.
    pub fn reset(&self) {
        let guard = self.inner.store_phaser.reader_lock();
        let store = self.inner.store.load_full();
        let replacement = Arc::new(CountStore::new(store.cfg, Self::seed_scale(&store.cfg)));
        self.inner.store.swap(replacement);
        guard.flip_phase(Duration::from_secs(0));
        self.inner.total_count.store(0, Ordering::Relaxed);
        self.inner.max_value.store(0, Ordering::Relaxed);
        self.inner
            .min_non_zero_value
            .store(u64::MAX, Ordering::Relaxed);
        self.inner.set_start_time_msec(0);
        self.inner.set_end_time_msec(0);
    }
}

// accessors

impl DoubleHistogram {
    /// Total number of samples recorded so far.
    pub fn len(&self) -> u64 {
        self.inner.len()
    }

    /// Returns true if no samples have been recorded.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// The configured number of significant decimal digits.
    pub fn sigfig(&self) -> u8 {
        self.significant_value_digits
    }

    /// The configured dynamic range, as the ratio between the highest and lowest values
    /// simultaneously trackable.
    pub fn highest_to_lowest_value_ratio(&self) -> u64 {
        self.highest_to_lowest_value_ratio
    }

    /// Whether the histogram grows its dynamic range instead of failing on records the current
    /// ratio cannot cover.
    pub fn is_auto_resize(&self) -> bool {
        self.auto_resize
    }

    /// The smallest value the current window position can track.
    pub fn current_lowest_in_range(&self) -> f64 {
        self.inner.store.load().scale.lowest
    }

    /// The value just above the largest the current window position can track.
    pub fn current_highest_limit(&self) -> f64 {
        self.inner.store.load().scale.highest_limit
    }

    /// Start of the interval this histogram covers, in milliseconds since the epoch, if the
    /// recorder stamped one on it.
    pub fn start_time_msec(&self) -> Option<i64> {
        self.inner.start_time_msec()
    }

    /// End of the interval this histogram covers, in milliseconds since the epoch, if the
    /// recorder stamped one on it.
    pub fn end_time_msec(&self) -> Option<i64> {
        self.inner.end_time_msec()
    }

    /// Stamp the start of the interval this histogram covers.
    pub fn set_start_time_msec(&self, time_msec: i64) {
        self.inner.set_start_time_msec(time_msec);
    }

    /// Stamp the end of the interval this histogram covers.
    pub fn set_end_time_msec(&self, time_msec: i64) {
        self.inner.set_end_time_msec(time_msec);
    }
}

// data statistics

impl DoubleHistogram {
    /// Lowest recorded value, or 0 if the histogram is empty (a recorded 0.0 counts).
    pub fn min(&self) -> f64 {
        let store = self.inner.store.load();
        if self.len() == 0 || store.slots[0].load(Ordering::Relaxed) != 0 {
            return 0.0;
        }
        let min = self.inner.min_non_zero_value.load(Ordering::Relaxed);
        if min == u64::MAX {
            0.0
        } else {
            store.cfg.lowest_equivalent(min) as f64 * store.scale.integer_to_double
        }
    }

    /// Lowest recorded non-zero value, or `f64::MAX` if no non-zero values were recorded.
    pub fn min_nz(&self) -> f64 {
        let store = self.inner.store.load();
        let min = self.inner.min_non_zero_value.load(Ordering::Relaxed);
        if min == u64::MAX {
            f64::MAX
        } else {
            store.cfg.lowest_equivalent(min) as f64 * store.scale.integer_to_double
        }
    }

    /// Highest recorded value, or 0 if the histogram is empty.
    pub fn max(&self) -> f64 {
        let store = self.inner.store.load();
        let max = self.inner.max_value.load(Ordering::Relaxed);
        if max == 0 {
            0.0
        } else {
            store.cfg.highest_equivalent(max) as f64 * store.scale.integer_to_double
        }
    }

    /// Arithmetic mean of all recorded values, at bucket resolution.
    pub fn mean(&self) -> f64 {
        let total = self.len();
        if total == 0 {
            return 0.0;
        }
        let store = self.inner.store.load();
        let mut sum = 0.0_f64;
        for (index, slot) in store.slots.iter().enumerate() {
            let count = slot.load(Ordering::Relaxed);
            if count > 0 {
                let mid = store.cfg.median_equivalent(store.cfg.value_for(index));
                sum += mid as f64 * store.scale.integer_to_double * count as f64;
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
        let store = self.inner.store.load();
        let mut geometric_deviation_total = 0.0_f64;
        for (index, slot) in store.slots.iter().enumerate() {
            let count = slot.load(Ordering::Relaxed);
            if count > 0 {
                let mid = store.cfg.median_equivalent(store.cfg.value_for(index)) as f64
                    * store.scale.integer_to_double;
                let deviation = mid - mean;
                geometric_deviation_total += deviation * deviation * count as f64;
            }
        }
        (geometric_deviation_total / total as f64).sqrt()
    }

    /// The value at the given percentile; see
    /// [`Histogram::value_at_percentile`](crate::Histogram::value_at_percentile).
    pub fn value_at_percentile(&self, percentile: f64) -> f64 {
        if percentile >= 100.0 {
            return self.max();
        }

        let total = self.len();
        let requested = (percentile / 100.0) * total as f64;
        let count_at_percentile = ((requested + 0.5) as u64).max(1);

        let store = self.inner.store.load();
        let mut total_to_current_index = 0_u64;
        for (index, slot) in store.slots.iter().enumerate() {
            total_to_current_index =
                total_to_current_index.saturating_add(slot.load(Ordering::Relaxed));
            if total_to_current_index >= count_at_percentile {
                let value_at_index = store.cfg.value_for(index);
                let integer = if percentile == 0.0 {
                    store.cfg.lowest_equivalent(value_at_index)
                } else {
                    store.cfg.highest_equivalent(value_at_index)
                };
                return integer as f64 * store.scale.integer_to_double;
            }
        }
        0.0
    }

    /// Count of recorded values at `value`, to within the histogram's resolution.
    pub fn count_at(&self, value: f64) -> u64 {
        let store = self.inner.store.load();
        if value == 0.0 {
            return store.slots[0].load(Ordering::Relaxed);
        }
        let integer = (value * store.scale.double_to_integer) as u64;
        let index = store.cfg.index_for(integer).min(store.slots.len() - 1);
        store.slots[index].load(Ordering::Relaxed)
    }

    /// Count of recorded values between `low` and `high` inclusive, each rounded to the
    /// histogram's resolution.
    pub fn count_between(&self, low: f64, high: f64) -> u64 {
        let store = self.inner.store.load();
        let last = store.slots.len() - 1;
        let low_index = store
            .cfg
            .index_for((low * store.scale.double_to_integer) as u64)
            .min(last);
        let high_index = store
            .cfg
            .index_for((high * store.scale.double_to_integer) as u64)
            .min(last);
        store.slots[low_index..=high_index]
            .iter()
            .map(|slot| slot.load(Ordering::Relaxed))
            .fold(0, u64::saturating_add)
    }

    /// Lowest value that is equivalent to `value` within the histogram's resolution.
    pub fn lowest_equivalent(&self, value: f64) -> f64 {
        let store = self.inner.store.load();
        let integer = (value * store.scale.double_to_integer) as u64;
        store.cfg.lowest_equivalent(integer) as f64 * store.scale.integer_to_double
    }

    /// Highest value that is equivalent to `value` within the histogram's resolution.
    pub fn highest_equivalent(&self, value: f64) -> f64 {
        let store = self.inner.store.load();
        let integer = (value * store.scale.double_to_integer) as u64;
        store.cfg.highest_equivalent(integer) as f64 * store.scale.integer_to_double
    }

    /// A value in the middle of the range of values equivalent to `value`.
    pub fn median_equivalent(&self, value: f64) -> f64 {
        let store = self.inner.store.load();
        let integer = (value * store.scale.double_to_integer) as u64;
        store.cfg.median_equivalent(integer) as f64 * store.scale.integer_to_double
    }

    /// Whether two values are equivalent within the histogram's resolution.
    pub fn equivalent(&self, a: f64, b: f64) -> bool {
        let store = self.inner.store.load();
        let ia = (a * store.scale.double_to_integer) as u64;
        let ib = (b * store.scale.double_to_integer) as u64;
        store.cfg.lowest_equivalent(ia) == store.cfg.lowest_equivalent(ib)
    }
}
