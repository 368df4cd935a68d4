//! Tidemark records and analyzes sampled value counts across a large, configurable integer value
//! range, with configurable value precision within the range, and can serve stable interval
//! snapshots of live recorded data without stalling the threads doing the recording.
//!
//! # High dynamic range histograms
//!
//! A histogram here is a fixed-memory array of counters laid out so that bucket widths grow
//! geometrically while each bucket is linearly subdivided. Value precision is expressed as a
//! number of significant decimal digits: a histogram configured to track values between 1 and
//! 3,600,000,000 at 3 significant digits will quantize no value by more than 0.1% of its
//! magnitude, whether that value is 12 microseconds or 40 minutes. Recording is O(1) — a handful
//! of integer operations computing a direct array index — with no allocation, and the memory
//! footprint depends only on the configured range and precision, never on how many samples have
//! been recorded. This makes it a good fit for latency measurement in performance sensitive
//! code, where the interesting information lives in the far tail of a decidedly non-normal
//! distribution.
//!
//! # Recording and querying
//!
//! A [`Histogram`] is created with one of the `new` constructors. `new` only fixes the
//! precision and lets the value range grow on demand (resizing the counter array when needed);
//! `new_with_max` fixes an upper bound so that recording never allocates; `new_with_bounds`
//! additionally raises the lowest discernible value, shrinking the array when sub-unit
//! resolution is not needed (e.g. nanosecond timestamps that only need microsecond accuracy).
//!
//! ```
//! use tidemark::Histogram;
//!
//! // one hour in milliseconds, 1% precision
//! let mut hist = Histogram::<u64>::new_with_bounds(1, 60 * 60 * 1000, 2).unwrap();
//!
//! hist.record(54321).expect("value 54321 should be in range");
//!
//! // for ergonomics, samples can also be recorded with +=
//! // (this will panic if the value is out of range)
//! hist += 54321;
//!
//! // if the loop producing values stalls, the self-correcting record method synthesizes
//! // the samples the stall swallowed; here the expected sampling interval is 10 msec:
//! hist.record_correct(54321, 10).expect("value 54321 should be in range");
//!
//! println!("# of samples: {}", hist.len());
//! println!("99.9'th percentile: {}", hist.value_at_percentile(99.9));
//! ```
//!
//! The `u64` annotation picks the per-bucket counter width. Narrower counters shrink the
//! histogram at the risk of saturating a hot bucket.
//!
//! # Interval recording
//!
//! The [`IntervalRecorder`] (and its floating-point sibling [`DoubleIntervalRecorder`]) wraps an
//! [`AtomicHistogram`] so that any number of threads can record through a shared reference while
//! another thread periodically takes a consistent "everything since the last snapshot" interval
//! histogram. Writers never block: the swap-and-drain protocol is built on
//! [`phaser::WriterReaderPhaser`], whose writer side is two atomic additions.
//!
//! ```
//! use tidemark::IntervalRecorder;
//!
//! let recorder = IntervalRecorder::new_with_max(3_600_000_000, 3).unwrap();
//! recorder.record(42).unwrap();
//!
//! let snapshot = recorder.get_interval_histogram();
//! assert_eq!(snapshot.len(), 1);
//!
//! // counts recorded after the snapshot belong to the next interval
//! recorder.record(42).unwrap();
//! let next = recorder.get_interval_histogram_with(snapshot).unwrap();
//! assert_eq!(next.len(), 1);
//! ```
//!
//! # Limitations
//!
//! Serialization, interval log encoding, and the full percentile-iteration family are out of
//! scope for this crate; a snapshot can be converted to a plain [`Histogram`] and walked with
//! [`Histogram::recorded`] for export. The plain `Histogram` is not thread-safe; use
//! [`AtomicHistogram`] or a recorder where concurrent recording is needed.

#![warn(missing_docs)]

use std::borrow::Borrow;
use std::ops::AddAssign;

use crate::bucket::BucketConfig;

mod bucket;
mod core;
pub mod errors;
pub mod phaser;

mod atomic;
mod double;
mod recorder;

pub use crate::atomic::AtomicHistogram;
pub use crate::core::counter::Counter;
pub use crate::double::DoubleHistogram;
pub use crate::errors::{
    AdditionError, CreationError, RecordError, SnapshotError, SubtractionError,
};
pub use crate::recorder::{
    DoubleIntervalRecorder, IntervalDoubleHistogram, IntervalHistogram, IntervalRecorder,
};

/// A single-threaded histogram of `u64` values with counters of type `C`.
///
/// See the [crate level documentation](index.html) for an overview.
#[derive(Debug, Clone)]
pub struct Histogram<C: Counter> {
    auto_resize: bool,

    pub(crate) cfg: BucketConfig,

    total_count: u64,
    max_value: u64,
    min_non_zero_value: u64,

    start_time_msec: Option<i64>,
    end_time_msec: Option<i64>,

    pub(crate) counts: Vec<C>,
}

// construction

impl<C: Counter> Histogram<C> {
    /// Construct an auto-resizing histogram with a lowest discernible value of 1 and an
    /// auto-adjusting highest trackable value.
    ///
    /// `sigfig` is the number of significant decimal digits to which the histogram will maintain
    /// value resolution and separation; it must be between 0 and 5.
    pub fn new(sigfig: u8) -> Result<Histogram<C>, CreationError> {
        let mut h = Self::new_with_bounds(1, 2, sigfig)?;
        h.auto_resize = true;
        Ok(h)
    }

    /// Construct a histogram given the highest value to be tracked and a number of significant
    /// decimal digits. The histogram will track (distinguish from 0) values as low as 1.
    ///
    /// `high` must be at least 2.
    pub fn new_with_max(high: u64, sigfig: u8) -> Result<Histogram<C>, CreationError> {
        Self::new_with_bounds(1, high, sigfig)
    }

    /// Construct a histogram given the lowest and highest values to be tracked and a number of
    /// significant decimal digits.
    ///
    /// Providing a `low` above 1 is useful when the units recorded are much finer than the
    /// accuracy actually required: tracking nanosecond values that only need microsecond
    /// accuracy wants `low == 1000`, which substantially shrinks the counter array. `low` may be
    /// internally rounded down to the nearest power of 2. `high` must be at least `2 * low`.
    pub fn new_with_bounds(low: u64, high: u64, sigfig: u8) -> Result<Histogram<C>, CreationError> {
        let cfg = BucketConfig::new(low, high, sigfig)?;
        Ok(Self::from_config(cfg))
    }

    /// Construct a histogram with the same range and precision as `source`, but no recorded
    /// values.
    pub fn new_from<F: Counter>(source: &Histogram<F>) -> Histogram<C> {
        let mut h = Self::new_with_bounds(
            source.cfg.lowest_discernible_value,
            source.cfg.highest_trackable_value,
            source.cfg.significant_value_digits,
        )
        .expect("source histogram exists, so its configuration is valid");
        h.auto_resize = source.auto_resize;
        h
    }

    pub(crate) fn from_config(cfg: BucketConfig) -> Histogram<C> {
        Histogram {
            auto_resize: false,
            total_count: 0,
            max_value: 0,
            min_non_zero_value: u64::MAX,
            start_time_msec: None,
            end_time_msec: None,
            counts: vec![C::zero(); cfg.counts_len],
            cfg,
        }
    }
}

// accessors

impl<C: Counter> Histogram<C> {
    /// Total number of samples recorded so far.
    pub fn len(&self) -> u64 {
        self.total_count
    }

    /// Returns true if no samples have been recorded.
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    /// Number of distinct counter slots the histogram currently holds.
    pub fn distinct_values(&self) -> usize {
        self.counts.len()
    }

    /// The configured lowest discernible value.
    pub fn low(&self) -> u64 {
        self.cfg.lowest_discernible_value
    }

    /// The highest value the histogram can currently track.
    pub fn high(&self) -> u64 {
        self.cfg.highest_trackable_value
    }

    /// The configured number of significant decimal digits.
    pub fn sigfig(&self) -> u8 {
        self.cfg.significant_value_digits
    }

    /// Whether the histogram grows its range instead of failing on out-of-range records.
    pub fn is_auto_resize(&self) -> bool {
        self.auto_resize
    }

    /// Control whether the histogram grows its range instead of failing on out-of-range
    /// records.
    pub fn set_auto_resize(&mut self, enabled: bool) {
        self.auto_resize = enabled;
    }

    /// Start of the interval this histogram covers, in milliseconds since the epoch, if one was
    /// stamped on it.
    pub fn start_time_msec(&self) -> Option<i64> {
        self.start_time_msec
    }

    /// End of the interval this histogram covers, in milliseconds since the epoch, if one was
    /// stamped on it.
    pub fn end_time_msec(&self) -> Option<i64> {
        self.end_time_msec
    }

    /// Stamp the start of the interval this histogram covers.
    pub fn set_start_time_msec(&mut self, time_msec: i64) {
        self.start_time_msec = Some(time_msec);
    }

    /// Stamp the end of the interval this histogram covers.
    pub fn set_end_time_msec(&mut self, time_msec: i64) {
        self.end_time_msec = Some(time_msec);
    }
}

// recording

impl<C: Counter> Histogram<C> {
    /// Record a single occurrence of `value`.
    ///
    /// Fails if `value` exceeds the highest trackable value and auto-resize is disabled.
    pub fn record(&mut self, value: u64) -> Result<(), RecordError> {
        self.record_n(value, C::one())
    }

    /// Record `count` occurrences of `value`.
    pub fn record_n(&mut self, value: u64, count: C) -> Result<(), RecordError> {
        match self.cfg.index_for_checked(value) {
            Some(index) => {
                self.counts[index] = self.counts[index].saturating_add(count);
            }
            None => {
                if !self.auto_resize {
                    return Err(RecordError::ValueOutOfRangeResizeDisabled);
                }
                self.resize_to_cover(value)
                    .map_err(|_| RecordError::ResizeFailedUsizeTypeTooSmall)?;
                let index = self
                    .cfg
                    .index_for_checked(value)
                    .ok_or(RecordError::ResizeFailedUsizeTypeTooSmall)?;
                self.counts[index] = self.counts[index].saturating_add(count);
            }
        }
        self.update_min_and_max(value);
        self.total_count = self.total_count.saturating_add(count.as_u64());
        Ok(())
    }

    /// Record `value`, clamping it to the trackable range instead of failing.
    pub fn saturating_record(&mut self, value: u64) {
        self.saturating_record_n(value, C::one())
    }

    /// Record `count` occurrences of `value`, clamping the value to the trackable range instead
    /// of failing.
    pub fn saturating_record_n(&mut self, value: u64, count: C) {
        let clamped = value.min(self.cfg.highest_trackable_value);
        self.record_n(clamped, count)
            .expect("clamped value is always in range")
    }

    /// Record `value`, correcting for coordinated omission.
    ///
    /// When the loop producing values stalls for longer than `interval` (the expected pacing
    /// between samples), the samples the stall swallowed never get recorded, biasing the
    /// histogram towards the good cases. This method compensates at record time by synthesizing
    /// one additional sample at each of `value - interval`, `value - 2*interval`, ... while the
    /// remainder stays at or above `interval`. An `interval` of 0 disables the correction.
    ///
    /// This is an at-recording correction; do not also apply a post-recording correction (such
    /// as [`Histogram::add_correct`]) for the same omission on the same data set.
    pub fn record_correct(&mut self, value: u64, interval: u64) -> Result<(), RecordError> {
        self.record_n_correct(value, C::one(), interval)
    }

    /// Record `count` occurrences of `value`, correcting for coordinated omission; see
    /// [`Histogram::record_correct`].
    pub fn record_n_correct(
        &mut self,
        value: u64,
        count: C,
        interval: u64,
    ) -> Result<(), RecordError> {
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

    fn resize_to_cover(&mut self, value: u64) -> Result<(), CreationError> {
        let cfg = self.cfg.with_coverage(value)?;
        self.counts.resize(cfg.counts_len, C::zero());
        self.cfg = cfg;
        Ok(())
    }

    /// Set internally tracked max to `value` if it is greater than the current one.
    fn update_max(&mut self, value: u64) {
        let internal = value | self.cfg.unit_magnitude_mask; // max unit-equivalent value
        if internal > self.max_value {
            self.max_value = internal;
        }
    }

    /// Set internally tracked min to `value` if it is smaller than the current one.
    fn update_min(&mut self, value: u64) {
        if value <= self.cfg.unit_magnitude_mask {
            return; // unit-equivalent to 0
        }
        let internal = value & !self.cfg.unit_magnitude_mask; // min unit-equivalent value
        if internal < self.min_non_zero_value {
            self.min_non_zero_value = internal;
        }
    }

    fn update_min_and_max(&mut self, value: u64) {
        if value > self.max_value {
            self.update_max(value);
        }
        if value < self.min_non_zero_value && value != 0 {
            self.update_min(value);
        }
    }
}

// administrative

impl<C: Counter> Histogram<C> {
    /// Reset the contents and stats of this histogram, preserving its range and precision.
    pub fn reset(&mut self) {
        for c in self.counts.iter_mut() {
            *c = C::zero();
        }
        self.total_count = 0;
        self.max_value = 0;
        self.min_non_zero_value = u64::MAX;
        self.start_time_msec = None;
        self.end_time_msec = None;
    }

    /// Recompute total count, min, and max from the counter array. Needed after operations that
    /// edit counters directly rather than going through `record`.
    fn restat(&mut self) {
        self.total_count = 0;
        self.max_value = 0;
        self.min_non_zero_value = u64::MAX;
        for i in 0..self.counts.len() {
            let count = self.counts[i];
            if count != C::zero() {
                self.total_count = self.total_count.saturating_add(count.as_u64());
                let value = self.cfg.value_for(i);
                self.update_max(self.cfg.highest_equivalent(value));
                if value != 0 {
                    self.update_min(value);
                }
            }
        }
    }
}

// add / subtract

impl<C: Counter> Histogram<C> {
    /// Add the contents of another histogram to this one.
    ///
    /// The two histograms may have different ranges and precisions; counts are transferred at
    /// their equivalent values. Fails if the other histogram holds values that do not fit in
    /// this histogram's range and auto-resize is disabled.
    pub fn add<B: Borrow<Histogram<C>>>(&mut self, source: B) -> Result<(), AdditionError> {
        let source = source.borrow();

        // make sure we can take the values in source
        let top = self
            .cfg
            .highest_equivalent(self.cfg.value_for(self.counts.len() - 1));
        if top < source.max() {
            if !self.auto_resize {
                return Err(AdditionError::OtherAddendValueExceedsRange);
            }
            self.resize_to_cover(source.max())
                .map_err(|_| AdditionError::ResizeFailedUsizeTypeTooSmall)?;
        }

        if self.cfg.bucket_count == source.cfg.bucket_count
            && self.cfg.sub_bucket_count == source.cfg.sub_bucket_count
            && self.cfg.unit_magnitude == source.cfg.unit_magnitude
        {
            // Counts arrays are of the same length and meaning, so we can just iterate and add
            // directly.
            let mut observed_source_total = 0_u64;
            for i in 0..source.counts.len() {
                let count = source.counts[i];
                if count != C::zero() {
                    self.counts[i] = self.counts[i].saturating_add(count);
                    observed_source_total = observed_source_total.saturating_add(count.as_u64());
                }
            }
            self.total_count = self.total_count.saturating_add(observed_source_total);
            let mx = source.max();
            if mx > self.max() {
                self.update_max(mx);
            }
            let mn = source.min_nz();
            if mn < self.min_nz() {
                self.update_min(mn);
            }
        } else {
            // Arrays are not a direct match, so go through the other array and add each count at
            // its equivalent value.
            for i in 0..source.counts.len() {
                let count = source.counts[i];
                if count != C::zero() {
                    self.record_n(source.cfg.value_for(i), count)
                        .map_err(|_| AdditionError::OtherAddendValueExceedsRange)?;
                }
            }
        }

        // widen the stamped interval to cover the source's
        match (self.start_time_msec, source.start_time_msec) {
            (Some(a), Some(b)) if b < a => self.start_time_msec = Some(b),
            (None, b @ Some(_)) => self.start_time_msec = b,
            _ => {}
        }
        match (self.end_time_msec, source.end_time_msec) {
            (Some(a), Some(b)) if b > a => self.end_time_msec = Some(b),
            (None, b @ Some(_)) => self.end_time_msec = b,
            _ => {}
        }
        Ok(())
    }

    /// Add the contents of another histogram to this one while correcting its values for
    /// coordinated omission; see [`Histogram::record_correct`].
    ///
    /// This is a post-recording correction; do not also apply an at-recording correction for
    /// the same omission on the same data set.
    pub fn add_correct<B: Borrow<Histogram<C>>>(
        &mut self,
        source: B,
        interval: u64,
    ) -> Result<(), RecordError> {
        let source = source.borrow();
        for (value, count) in source.recorded() {
            self.record_n_correct(value, count, interval)?;
        }
        Ok(())
    }

    /// Subtract the contents of another histogram from this one.
    ///
    /// Counts are matched at their equivalent values, so the histograms may have different
    /// ranges and precisions. Fails if the subtrahend holds values this histogram cannot
    /// represent, or a count higher than this histogram's count at the same value; in the
    /// latter case some counts may already have been subtracted when the error is returned.
    pub fn subtract<B: Borrow<Histogram<C>>>(
        &mut self,
        subtrahend: B,
    ) -> Result<(), SubtractionError> {
        let subtrahend = subtrahend.borrow();

        let top = self
            .cfg
            .highest_equivalent(self.cfg.value_for(self.counts.len() - 1));
        if top < subtrahend.max() {
            return Err(SubtractionError::SubtrahendValueExceedsMinuendRange);
        }

        for i in 0..subtrahend.counts.len() {
            let count = subtrahend.counts[i];
            if count != C::zero() {
                let value = subtrahend.cfg.value_for(i);
                let index = self
                    .cfg
                    .index_for_checked(value)
                    .ok_or(SubtractionError::SubtrahendValueExceedsMinuendRange)?;
                self.counts[index] = self.counts[index]
                    .checked_sub(&count)
                    .ok_or(SubtractionError::SubtrahendCountExceedsMinuendCount)?;
            }
        }

        self.restat();
        Ok(())
    }
}

// data statistics

impl<C: Counter> Histogram<C> {
    /// Lowest recorded value, or 0 if the histogram is empty.
    pub fn min(&self) -> u64 {
        if self.total_count == 0 || self.counts[0] != C::zero() {
            0
        } else {
            self.min_nz()
        }
    }

    /// Lowest recorded non-zero value, or `u64::MAX` if no non-zero values were recorded.
    pub fn min_nz(&self) -> u64 {
        if self.min_non_zero_value == u64::MAX {
            u64::MAX
        } else {
            self.cfg.lowest_equivalent(self.min_non_zero_value)
        }
    }

    /// Highest recorded value, or 0 if the histogram is empty.
    pub fn max(&self) -> u64 {
        if self.max_value == 0 {
            0
        } else {
            self.cfg.highest_equivalent(self.max_value)
        }
    }

    /// Arithmetic mean of all recorded values, at bucket resolution.
    pub fn mean(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        let total = self.total_count as f64;
        let mut sum = 0.0_f64;
        for i in 0..self.counts.len() {
            let count = self.counts[i];
            if count != C::zero() {
                let mid = self.cfg.median_equivalent(self.cfg.value_for(i));
                sum += mid as f64 * count.as_f64();
            }
        }
        sum / total
    }

    /// Standard deviation of all recorded values, at bucket resolution.
    pub fn stdev(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        let mean = self.mean();
        let mut geometric_deviation_total = 0.0_f64;
        for i in 0..self.counts.len() {
            let count = self.counts[i];
            if count != C::zero() {
                let deviation = self.cfg.median_equivalent(self.cfg.value_for(i)) as f64 - mean;
                geometric_deviation_total += deviation * deviation * count.as_f64();
            }
        }
        (geometric_deviation_total / self.total_count as f64).sqrt()
    }

    /// The value at the given percentile.
    ///
    /// For `percentile > 0` this is the value that the given percentage of recorded samples are
    /// smaller than or equivalent to; `percentile == 0` gives the value all samples are larger
    /// than or equivalent to, and `percentile >= 100` gives the recorded maximum. Values
    /// outside `[0, 100]` are clamped.
    pub fn value_at_percentile(&self, percentile: f64) -> u64 {
        if percentile >= 100.0 {
            return self.max();
        }

        // round to nearest, then make sure we at least reach the first recorded entry
        let requested = (percentile / 100.0) * self.total_count as f64;
        let count_at_percentile = ((requested + 0.5) as u64).max(1);

        let mut total_to_current_index = 0_u64;
        for i in 0..self.counts.len() {
            total_to_current_index = total_to_current_index.saturating_add(self.counts[i].as_u64());
            if total_to_current_index >= count_at_percentile {
                let value_at_index = self.cfg.value_for(i);
                return if percentile == 0.0 {
                    self.cfg.lowest_equivalent(value_at_index)
                } else {
                    self.cfg.highest_equivalent(value_at_index)
                };
            }
        }
        0
    }

    /// Percentage of recorded samples that are smaller than or equivalent to `value`.
    pub fn percentile_below(&self, value: u64) -> f64 {
        if self.total_count == 0 {
            return 100.0;
        }
        let target = self.cfg.index_for(value).min(self.counts.len() - 1);
        let total_to_target: u64 = (0..=target)
            .map(|i| self.counts[i].as_u64())
            .fold(0, u64::saturating_add);
        100.0 * total_to_target as f64 / self.total_count as f64
    }

    /// Count of recorded values at `value`, to within the histogram's resolution.
    pub fn count_at(&self, value: u64) -> C {
        self.counts[self.cfg.index_for(value).min(self.counts.len() - 1)]
    }

    /// Count of recorded values between `low` and `high` inclusive, each rounded to the
    /// histogram's resolution.
    pub fn count_between(&self, low: u64, high: u64) -> u64 {
        let last = self.counts.len() - 1;
        let low_index = self.cfg.index_for(low).min(last);
        let high_index = self.cfg.index_for(high).min(last);
        (low_index..=high_index)
            .map(|i| self.counts[i].as_u64())
            .fold(0, u64::saturating_add)
    }

    /// Iterate over all slots with a nonzero count, yielding `(lowest equivalent value, count)`
    /// pairs in ascending value order.
    pub fn recorded(&self) -> impl Iterator<Item = (u64, C)> + '_ {
        let cfg = self.cfg;
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count != C::zero())
            .map(move |(i, count)| (cfg.value_for(i), *count))
    }
}

// equivalence at the histogram's resolution

impl<C: Counter> Histogram<C> {
    /// Lowest value that is equivalent to `value` within the histogram's resolution.
    /// "Equivalent" means the two values are counted in a common slot.
    pub fn lowest_equivalent(&self, value: u64) -> u64 {
        self.cfg.lowest_equivalent(value)
    }

    /// Highest value that is equivalent to `value` within the histogram's resolution.
    pub fn highest_equivalent(&self, value: u64) -> u64 {
        self.cfg.highest_equivalent(value)
    }

    /// A value in the middle (rounded up) of the range of values equivalent to `value`.
    pub fn median_equivalent(&self, value: u64) -> u64 {
        self.cfg.median_equivalent(value)
    }

    /// The next value that is not equivalent to `value` within the histogram's resolution.
    pub fn next_non_equivalent(&self, value: u64) -> u64 {
        self.cfg.next_non_equivalent(value)
    }

    /// Size (in value units) of the range of values equivalent to `value`.
    pub fn equivalent_range(&self, value: u64) -> u64 {
        self.cfg.equivalent_range(value)
    }

    /// Whether two values are equivalent within the histogram's resolution.
    pub fn equivalent(&self, a: u64, b: u64) -> bool {
        self.cfg.lowest_equivalent(a) == self.cfg.lowest_equivalent(b)
    }
}

// crate-internal helpers used by the atomic variant's plain-histogram conversion

impl<C: Counter> Histogram<C> {
    pub(crate) fn set_count_at_index(&mut self, index: usize, count: C) {
        self.counts[index] = count;
    }

    pub(crate) fn set_internal_stats(
        &mut self,
        total_count: u64,
        max_value: u64,
        min_non_zero_value: u64,
    ) {
        self.total_count = total_count;
        self.max_value = max_value;
        self.min_non_zero_value = min_non_zero_value;
    }
}

// delegates for the geometry unit tests

#[cfg(test)]
impl<C: Counter> Histogram<C> {
    pub(crate) fn bucket_for(&self, value: u64) -> u8 {
        self.cfg.bucket_for(value)
    }

    pub(crate) fn sub_bucket_for(&self, value: u64, bucket: u8) -> u32 {
        self.cfg.sub_bucket_for(value, bucket)
    }

    pub(crate) fn value_from_loc(&self, bucket: u8, sub_bucket: u32) -> u64 {
        self.cfg.value_from_loc(bucket, sub_bucket)
    }

    pub(crate) fn value_for(&self, index: usize) -> u64 {
        self.cfg.value_for(index)
    }
}

// ergonomics

impl<C: Counter> AddAssign<u64> for Histogram<C> {
    /// Record `value`, panicking if it is out of range and auto-resize is disabled.
    fn add_assign(&mut self, value: u64) {
        self.record(value).unwrap();
    }
}

impl<'a, C: Counter> AddAssign<&'a Histogram<C>> for Histogram<C> {
    /// Add `source`, panicking if it holds out-of-range values and auto-resize is disabled.
    fn add_assign(&mut self, source: &'a Histogram<C>) {
        self.add(source).unwrap();
    }
}

impl<C: Counter> PartialEq for Histogram<C> {
    fn eq(&self, other: &Histogram<C>) -> bool {
        if self.cfg.lowest_discernible_value != other.cfg.lowest_discernible_value
            || self.cfg.significant_value_digits != other.cfg.significant_value_digits
        {
            return false;
        }
        if self.total_count != other.total_count
            || self.max() != other.max()
            || self.min_nz() != other.min_nz()
        {
            return false;
        }
        (0..self.counts.len().max(other.counts.len())).all(|i| {
            let a = self.counts.get(i).copied().unwrap_or_else(C::zero);
            let b = other.counts.get(i).copied().unwrap_or_else(C::zero);
            a == b
        })
    }
}

#[cfg(test)]
mod tests;
