//! Auto-resizing behavior for the plain and atomic histograms.

use std::sync::Arc;
use std::thread;

use tidemark::{AtomicHistogram, Histogram};

#[test]
fn plain_histogram_grows_on_demand() {
    let mut h = Histogram::<u64>::new(3).unwrap();
    assert!(h.is_auto_resize());
    let initial_len = h.distinct_values();

    h.record(1).unwrap();
    h.record(1_000_000).unwrap();
    h.record(30_000_000_000).unwrap();

    assert!(h.distinct_values() > initial_len);
    assert!(h.high() >= 30_000_000_000);
    assert_eq!(3, h.len());
    assert_eq!(1, h.count_at(30_000_000_000));
    assert!(h.equivalent(30_000_000_000, h.max()));
}

#[test]
fn growing_preserves_earlier_counts() {
    let mut h = Histogram::<u64>::new(3).unwrap();
    for v in 1..=1000_u64 {
        h.record(v).unwrap();
    }
    h.record(1_u64 << 40).unwrap();

    assert_eq!(1001, h.len());
    assert_eq!(1000, h.count_between(1, 1000));
    assert_eq!(1, h.count_at(1_u64 << 40));
}

#[test]
fn enabling_resize_on_a_bounded_histogram() {
    let mut h = Histogram::<u64>::new_with_max(1000, 3).unwrap();
    assert!(h.record(100_000).is_err());
    h.set_auto_resize(true);
    h.record(100_000).unwrap();
    assert_eq!(1, h.len());
}

#[test]
fn atomic_histogram_grows_on_demand() {
    let h = AtomicHistogram::new(3).unwrap();
    h.record(2).unwrap();
    h.record(5_000_000).unwrap();
    h.record(20_000_000_000).unwrap();

    assert_eq!(3, h.len());
    assert_eq!(1, h.count_at(2));
    assert_eq!(1, h.count_at(5_000_000));
    assert_eq!(1, h.count_at(20_000_000_000));
}

#[test]
fn fixed_range_atomic_histogram_still_errors() {
    let h = AtomicHistogram::new_with_max(1000, 3).unwrap();
    assert!(h.record(100_000).is_err());
    assert_eq!(0, h.len());
}

#[test]
fn concurrent_records_survive_a_grow() {
    // writers hammer small values while one thread forces repeated grows; every sample must
    // still be counted exactly once
    const WRITERS: usize = 4;
    const SAMPLES_PER_WRITER: u64 = 50_000;

    let h = Arc::new(AtomicHistogram::new(2).unwrap());

    let writers: Vec<_> = (0..WRITERS)
        .map(|_| {
            let h = Arc::clone(&h);
            thread::spawn(move || {
                for i in 0..SAMPLES_PER_WRITER {
                    h.record(1 + (i % 500)).unwrap();
                }
            })
        })
        .collect();

    let grower = {
        let h = Arc::clone(&h);
        thread::spawn(move || {
            for magnitude in 10..30 {
                h.record(1_u64 << magnitude).unwrap();
                thread::yield_now();
            }
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    grower.join().unwrap();

    assert_eq!(WRITERS as u64 * SAMPLES_PER_WRITER + 20, h.len());
    assert_eq!(
        WRITERS as u64 * SAMPLES_PER_WRITER,
        h.count_between(1, 500)
    );
}
