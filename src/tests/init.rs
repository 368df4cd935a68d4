use super::helpers::histo64;

#[test]
fn init_fields_smallest_possible_array() {
    let h = histo64(1, 2, 0);

    assert_eq!(2, h.cfg.highest_trackable_value);
    assert_eq!(1, h.cfg.lowest_discernible_value);
    assert_eq!(0, h.cfg.significant_value_digits);

    assert_eq!(2, h.cfg.sub_bucket_count);
    assert_eq!(1, h.cfg.sub_bucket_half_count);
    assert_eq!(2, h.cfg.bucket_count);
    // bottom full bucket, one more half bucket
    assert_eq!(3, h.counts.len());
    assert_eq!(0, h.cfg.sub_bucket_half_count_magnitude);
    assert_eq!(1, h.cfg.sub_bucket_mask);

    assert_eq!(0, h.cfg.unit_magnitude);
    assert_eq!(0, h.cfg.unit_magnitude_mask);

    assert_eq!(63, h.cfg.leading_zero_count_base);
}

#[test]
fn init_fields_max_value_max_precision_largest_possible_array() {
    let h = histo64(1, u64::MAX, 5);

    assert_eq!(u64::MAX, h.cfg.highest_trackable_value);
    assert_eq!(1, h.cfg.lowest_discernible_value);
    assert_eq!(5, h.cfg.significant_value_digits);

    // 5 sigdigs = 100,000. sub bucket must hold 200,000. 2^18 = 262,144.
    assert_eq!(1 << 18, h.cfg.sub_bucket_count);
    assert_eq!(1 << 17, h.cfg.sub_bucket_half_count);
    // 2^46 * 2^18 = 2^64, so 47 buckets.
    assert_eq!(47, h.cfg.bucket_count);
    assert_eq!(
        46 * h.cfg.sub_bucket_half_count as usize + h.cfg.sub_bucket_count as usize,
        h.counts.len()
    );
    assert_eq!(17, h.cfg.sub_bucket_half_count_magnitude);
    assert_eq!((1 << 18) - 1, h.cfg.sub_bucket_mask);

    assert_eq!(0, h.cfg.unit_magnitude);
    assert_eq!(0, h.cfg.unit_magnitude_mask);

    assert_eq!(64 - 17 - 1, h.cfg.leading_zero_count_base);
}

#[test]
fn init_fields_max_value_medium_precision() {
    let h = histo64(1, u64::MAX, 3);

    // 3 sigdigs = 1,000. sub bucket must hold 2,000. 2^11 = 2048.
    assert_eq!(1 << 11, h.cfg.sub_bucket_count);
    assert_eq!(1 << 10, h.cfg.sub_bucket_half_count);
    // 2^53 * 2048 == 2^64, so that's 54 buckets.
    assert_eq!(54, h.cfg.bucket_count);
    assert_eq!(
        53 * h.cfg.sub_bucket_half_count as usize + h.cfg.sub_bucket_count as usize,
        h.counts.len()
    );
    assert_eq!(10, h.cfg.sub_bucket_half_count_magnitude);
    assert_eq!((1 << 11) - 1, h.cfg.sub_bucket_mask);

    assert_eq!(0, h.cfg.unit_magnitude);
    assert_eq!(0, h.cfg.unit_magnitude_mask);

    assert_eq!(64 - 10 - 1, h.cfg.leading_zero_count_base);
}

#[test]
fn init_fields_unit_magnitude_10() {
    let h = histo64(1024, 1024 * 1024, 3);

    assert_eq!(1 << 11, h.cfg.sub_bucket_count);
    assert_eq!(10, h.cfg.unit_magnitude);
    assert_eq!(1023, h.cfg.unit_magnitude_mask);
    assert_eq!(((1_u64 << 11) - 1) << 10, h.cfg.sub_bucket_mask);
    // 2048 << 10 = 2^21 > 2^20, so one bucket would do, but the loop stops after covering
    // the high value, giving 1 bucket; the array still gets the extra bucket-0 lower half.
    assert_eq!(1, h.cfg.bucket_count);
    assert_eq!(2 * h.cfg.sub_bucket_half_count as usize, h.counts.len());
    assert_eq!(64 - 10 - 10 - 1, h.cfg.leading_zero_count_base);
}

#[test]
fn init_fields_rounds_up_counts_len() {
    // 3 sigfig histogram tracking 1..4095: needs 2 buckets (2048, then 2048..4096 by 2s)
    let h = histo64(1, 4095, 3);
    assert_eq!(2, h.cfg.bucket_count);
    assert_eq!(3 * h.cfg.sub_bucket_half_count as usize, h.counts.len());
}
