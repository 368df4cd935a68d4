//! Unit tests for the bucket geometry and the non-concurrent histogram internals.

mod helpers;
mod index_calculation;
mod init;
mod value_calculation;

use crate::errors::CreationError;
use crate::Histogram;

#[test]
fn new_err_high_not_double_low() {
    let res = Histogram::<u64>::new_with_bounds(10, 15, 0);
    assert_eq!(CreationError::HighLessThanTwiceLow, res.unwrap_err());
}

#[test]
fn new_err_low_zero() {
    let res = Histogram::<u64>::new_with_bounds(0, 1000, 0);
    assert_eq!(CreationError::LowIsZero, res.unwrap_err());
}

#[test]
fn new_err_low_exceeds_max() {
    let res = Histogram::<u64>::new_with_bounds(u64::MAX / 2 + 1, u64::MAX, 0);
    assert_eq!(CreationError::LowExceedsMax, res.unwrap_err());
}

#[test]
fn new_err_sigfig_exceeds_max() {
    let res = Histogram::<u64>::new_with_bounds(1, 1000, 6);
    assert_eq!(CreationError::SigFigExceedsMax, res.unwrap_err());
}
