//! Bucket geometry: the exponential-bucket / linear-sub-bucket layout shared by every histogram
//! variant, and the arithmetic that maps values to counts-array slots and back.

use crate::errors::CreationError;

/// The derived layout constants for one histogram configuration.
///
/// Buckets cover geometrically growing value ranges; each bucket is divided into
/// `sub_bucket_count` linearly spaced sub-buckets. The bottom half of every bucket except bucket
/// 0 overlaps the whole of the previous bucket (at better precision there), so only the top half
/// of each later bucket gets its own slots. Bucket 0 keeps both halves. With (for example) 2048
/// sub-buckets:
///
/// * bucket 0 covers `0..2048` in steps of 1, using all 2048 slots,
/// * bucket 1 covers `2048..4096` in steps of 2, using the top 1024 slots,
/// * bucket 2 covers `4096..8192` in steps of 4, using the top 1024 slots,
///
/// and so on. This is what keeps the relative quantization error bounded by the configured
/// number of significant digits across the whole range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BucketConfig {
    pub lowest_discernible_value: u64,
    pub highest_trackable_value: u64,
    pub significant_value_digits: u8,

    pub bucket_count: u8,
    pub sub_bucket_count: u32,
    pub sub_bucket_half_count: u32,
    pub sub_bucket_half_count_magnitude: u8,
    pub sub_bucket_mask: u64,

    pub unit_magnitude: u8,
    pub unit_magnitude_mask: u64,

    pub leading_zero_count_base: u8,
    pub counts_len: usize,
}

impl BucketConfig {
    pub fn new(
        lowest_discernible_value: u64,
        highest_trackable_value: u64,
        significant_value_digits: u8,
    ) -> Result<BucketConfig, CreationError> {
        if lowest_discernible_value < 1 {
            return Err(CreationError::LowIsZero);
        }
        if lowest_discernible_value > u64::MAX / 2 {
            return Err(CreationError::LowExceedsMax);
        }
        if highest_trackable_value < 2 * lowest_discernible_value {
            return Err(CreationError::HighLessThanTwiceLow);
        }
        if significant_value_digits > 5 {
            return Err(CreationError::SigFigExceedsMax);
        }

        // Given a 3 decimal point accuracy, the expectation is obviously for "+/- 1 unit at
        // 1000". It also means that it's "ok to be +/- 2 units at 2000". The "tricky" thing is
        // that it is NOT ok to be +/- 2 units at 1999. Only starting at 2000. So internally, we
        // need to maintain single unit resolution to 2x 10^decimal_points.
        let largest_value_with_single_unit_resolution =
            2 * 10_u32.pow(u32::from(significant_value_digits));

        let unit_magnitude = (lowest_discernible_value as f64).log2().floor() as u8;
        let unit_magnitude_mask = (1_u64 << unit_magnitude) - 1;

        // We need to maintain power-of-two sub_bucket_count (for clean direct indexing) that is
        // large enough to provide unit resolution to at least
        // largest_value_with_single_unit_resolution. So figure out its nearest power-of-two
        // (rounded up), and use that.
        let sub_bucket_count_magnitude =
            (f64::from(largest_value_with_single_unit_resolution)).log2().ceil() as u8;
        let sub_bucket_half_count_magnitude = sub_bucket_count_magnitude.max(1) - 1;

        if unit_magnitude + sub_bucket_half_count_magnitude > 62 {
            // The highest value a sub-bucket in the top bucket can express would not fit in u64.
            return Err(CreationError::CannotRepresentSigFigBeyondLow);
        }

        let sub_bucket_count = 1_u32 << (sub_bucket_half_count_magnitude + 1);
        let sub_bucket_half_count = sub_bucket_count / 2;
        let sub_bucket_mask = (u64::from(sub_bucket_count) - 1) << unit_magnitude;

        // Establish leading_zero_count_base, used in bucket_for() fast path: subtract the bits
        // that would be used by the largest value in bucket 0.
        let leading_zero_count_base = 64 - unit_magnitude - sub_bucket_half_count_magnitude - 1;

        let mut cfg = BucketConfig {
            lowest_discernible_value,
            highest_trackable_value,
            significant_value_digits,
            bucket_count: 0,
            sub_bucket_count,
            sub_bucket_half_count,
            sub_bucket_half_count_magnitude,
            sub_bucket_mask,
            unit_magnitude,
            unit_magnitude_mask,
            leading_zero_count_base,
            counts_len: 0,
        };

        cfg.bucket_count = cfg.buckets_to_cover(highest_trackable_value);
        cfg.counts_len = cfg.len_for_buckets(cfg.bucket_count)?;
        Ok(cfg)
    }

    /// Number of buckets needed to track values up to and including `value`.
    fn buckets_to_cover(&self, value: u64) -> u8 {
        // The k'th bucket can express from 0 * 2^k to sub_bucket_count * 2^k in units of 2^k.
        let mut smallest_untrackable_value =
            u64::from(self.sub_bucket_count) << self.unit_magnitude;

        let mut buckets_needed = 1_u8;
        while smallest_untrackable_value <= value {
            if smallest_untrackable_value > u64::MAX / 2 {
                // Next shift would overflow, meaning that bucket could represent values up to
                // ones greater than u64::MAX, so it's the last bucket.
                return buckets_needed + 1;
            }
            smallest_untrackable_value <<= 1;
            buckets_needed += 1;
        }
        buckets_needed
    }

    /// Counts array length for a bucket count: one more half-bucket than buckets, since bucket
    /// 0's lower half is the only lower half with slots of its own.
    fn len_for_buckets(&self, buckets: u8) -> Result<usize, CreationError> {
        (usize::from(buckets) + 1)
            .checked_mul(self.sub_bucket_half_count as usize)
            .ok_or(CreationError::UsizeTypeTooSmall)
    }

    /// The same layout constants, re-derived so the counts array covers `value`. Used for
    /// auto-resizing; only the bucket count, array length, and highest trackable value change.
    pub fn with_coverage(&self, value: u64) -> Result<BucketConfig, CreationError> {
        let mut cfg = *self;
        cfg.bucket_count = self.buckets_to_cover(value);
        cfg.counts_len = cfg.len_for_buckets(cfg.bucket_count)?;
        cfg.highest_trackable_value = cfg.highest_equivalent(cfg.value_for(cfg.counts_len - 1));
        Ok(cfg)
    }

    /// The lowest (and therefore highest precision) bucket that can represent the value.
    #[inline]
    pub fn bucket_for(&self, value: u64) -> u8 {
        // Calculates the number of powers of two by which the value is greater than the biggest
        // value that fits in bucket 0. This is the bucket index since each successive bucket can
        // hold a value 2x greater. The mask maps small values to bucket 0.
        self.leading_zero_count_base - (value | self.sub_bucket_mask).leading_zeros() as u8
    }

    #[inline]
    pub fn sub_bucket_for(&self, value: u64, bucket: u8) -> u32 {
        // For bucket 0, this is just the value (in units); it may land anywhere in
        // 0..sub_bucket_count. For other buckets it always lands in the top half: if it landed in
        // the bottom half of bucket k > 0, the overlap means it would also have been in the top
        // half of bucket k-1, and bucket_for would have returned k-1.
        (value >> (bucket + self.unit_magnitude)) as u32
    }

    /// Slot in the counts array for `value`. Callers must bounds-check against `counts_len`
    /// (or use `index_for_checked`); the arithmetic itself cannot overflow for any `u64` input.
    #[inline]
    pub fn index_for(&self, value: u64) -> usize {
        let bucket = self.bucket_for(value);
        let sub_bucket = self.sub_bucket_for(value, bucket);

        debug_assert!(sub_bucket <= self.sub_bucket_count);
        debug_assert!(bucket == 0 || sub_bucket >= self.sub_bucket_half_count);

        // The first slot the bucket uses, halfway through its sub-buckets; bucket 0's lower half
        // sits below this, in the slots "borrowed" from the (nonexistent) bucket -1. The offset
        // is negative exactly for that lower half, so the sum is computed wrapping.
        let base = (usize::from(bucket) + 1) << self.sub_bucket_half_count_magnitude;
        let offset = (sub_bucket as usize).wrapping_sub(self.sub_bucket_half_count as usize);
        base.wrapping_add(offset)
    }

    #[inline]
    pub fn index_for_checked(&self, value: u64) -> Option<usize> {
        if value > self.highest_trackable_value {
            return None;
        }
        let index = self.index_for(value);
        if index < self.counts_len {
            Some(index)
        } else {
            None
        }
    }

    /// Lowest value that would map to `index`; the inverse of `index_for`.
    pub fn value_for(&self, index: usize) -> u64 {
        let mut bucket = (index >> self.sub_bucket_half_count_magnitude) as isize - 1;
        let mut sub_bucket =
            (index & (self.sub_bucket_half_count as usize - 1)) + self.sub_bucket_half_count as usize;
        if bucket < 0 {
            // Lower half of bucket 0.
            sub_bucket -= self.sub_bucket_half_count as usize;
            bucket = 0;
        }
        self.value_from_loc(bucket as u8, sub_bucket as u32)
    }

    #[inline]
    pub fn value_from_loc(&self, bucket: u8, sub_bucket: u32) -> u64 {
        u64::from(sub_bucket) << (bucket + self.unit_magnitude)
    }

    /// Size (in value units) of the range of values that all map to the same slot as `value`.
    pub fn equivalent_range(&self, value: u64) -> u64 {
        let bucket = self.bucket_for(value);
        let sub_bucket = self.sub_bucket_for(value, bucket);
        let adjusted_bucket = if sub_bucket >= self.sub_bucket_count {
            bucket + 1
        } else {
            bucket
        };
        1_u64 << (adjusted_bucket + self.unit_magnitude)
    }

    /// Lowest value that is equivalent to `value` within the histogram's resolution.
    pub fn lowest_equivalent(&self, value: u64) -> u64 {
        let bucket = self.bucket_for(value);
        let sub_bucket = self.sub_bucket_for(value, bucket);
        self.value_from_loc(bucket, sub_bucket)
    }

    /// Next value that is not equivalent to `value`; saturates at `u64::MAX`.
    pub fn next_non_equivalent(&self, value: u64) -> u64 {
        self.lowest_equivalent(value)
            .saturating_add(self.equivalent_range(value))
    }

    /// Highest value that is equivalent to `value` within the histogram's resolution.
    pub fn highest_equivalent(&self, value: u64) -> u64 {
        if value == u64::MAX {
            return u64::MAX;
        }
        self.next_non_equivalent(value) - 1
    }

    /// A value in the middle (rounded up) of the range of values equivalent to `value`.
    pub fn median_equivalent(&self, value: u64) -> u64 {
        self.lowest_equivalent(value)
            .saturating_add(self.equivalent_range(value) >> 1)
    }
}
