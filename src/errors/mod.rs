//! Error types returned by fallible histogram and recorder operations.

use std::error::Error;
use std::fmt;

/// Errors that can occur when creating a histogram.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum CreationError {
    /// Lowest discernible value must be >= 1.
    LowIsZero,
    /// Lowest discernible value must be <= `u64::MAX / 2` because the highest value is
    /// a `u64` and the lowest value must be no bigger than half the highest.
    LowExceedsMax,
    /// Highest trackable value must be >= 2 * lowest discernible value for some internal
    /// calculations to work out. In practice, high is typically much higher than 2 * low.
    HighLessThanTwiceLow,
    /// Number of significant digits must be in the range `[0, 5]`. It is capped at 5 because 5
    /// significant digits is already more than almost anyone needs, and memory usage scales
    /// exponentially as this increases.
    SigFigExceedsMax,
    /// Cannot represent sigfig worth of values beyond the lowest discernible value. Decrease the
    /// significant figures, lowest discernible value, or both.
    ///
    /// This could happen if low is very large (like 2^60) and sigfigs is 5, which requires 18
    /// additional bits, which would then require more bits than will fit in a u64. Specifically,
    /// the exponent of the largest power of two that is smaller than the lowest value and the bits
    /// needed to represent the requested significant figures must sum to 63 or less.
    CannotRepresentSigFigBeyondLow,
    /// The requested dynamic range ratio and significant figures together need more bits than an
    /// integer value can carry. Decrease the ratio, the significant figures, or both.
    CannotRepresentSigFigBeyondRatio,
    /// The `usize` type is too small to represent the desired configuration. Use fewer significant
    /// figures or a lower max.
    UsizeTypeTooSmall,
}

impl fmt::Display for CreationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreationError::LowIsZero => write!(f, "lowest discernible value must be >= 1"),
            CreationError::LowExceedsMax => {
                write!(f, "lowest discernible value must be <= u64::MAX / 2")
            }
            CreationError::HighLessThanTwiceLow => write!(
                f,
                "highest trackable value must be >= 2 * lowest discernible value"
            ),
            CreationError::SigFigExceedsMax => {
                write!(f, "number of significant digits must be between 0 and 5")
            }
            CreationError::CannotRepresentSigFigBeyondLow => write!(
                f,
                "cannot represent sigfig worth of values beyond the lowest discernible value"
            ),
            CreationError::CannotRepresentSigFigBeyondRatio => write!(
                f,
                "cannot represent sigfig worth of values across the requested value ratio"
            ),
            CreationError::UsizeTypeTooSmall => {
                write!(f, "usize is too small for the requested configuration")
            }
        }
    }
}

impl Error for CreationError {}

/// Errors that can occur while recording a value and its associated count.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum RecordError {
    /// The value to record is not representable in this histogram and resizing is disabled.
    /// Configure a higher maximum value or enable resizing. Only possible when resizing is
    /// disabled.
    ValueOutOfRangeResizeDisabled,
    /// Auto resizing is enabled and must be used to represent the provided value, but the
    /// histogram cannot be resized because `usize` cannot represent sufficient length. Configure
    /// this histogram to use fewer significant digits. Only possible when resizing is enabled.
    ResizeFailedUsizeTypeTooSmall,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::ValueOutOfRangeResizeDisabled => {
                write!(f, "value outside histogram range and resizing is disabled")
            }
            RecordError::ResizeFailedUsizeTypeTooSmall => {
                write!(f, "resize failed: usize cannot represent the needed length")
            }
        }
    }
}

impl Error for RecordError {}

/// Errors that can occur when adding another histogram.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum AdditionError {
    /// The other histogram includes values that do not fit in this histogram's range.
    /// Only possible when auto resize is disabled.
    OtherAddendValueExceedsRange,
    /// The other histogram includes values that would map to indexes in this histogram that are
    /// not expressible for `usize`. Configure this histogram to use fewer significant digits.
    /// Only possible when resize is enabled.
    ResizeFailedUsizeTypeTooSmall,
}

impl fmt::Display for AdditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdditionError::OtherAddendValueExceedsRange => {
                write!(f, "other histogram has values outside this histogram's range")
            }
            AdditionError::ResizeFailedUsizeTypeTooSmall => {
                write!(f, "resize failed: usize cannot represent the needed length")
            }
        }
    }
}

impl Error for AdditionError {}

/// Errors that can occur when subtracting another histogram.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum SubtractionError {
    /// The other histogram includes values that do not fit in this histogram's range.
    /// Only possible when auto resize is disabled.
    SubtrahendValueExceedsMinuendRange,
    /// The other histogram includes counts that are higher than the current count for a value,
    /// and counts cannot go negative. The subtraction may have been partially applied to some
    /// counts as this error is returned when the first impossible subtraction is detected.
    SubtrahendCountExceedsMinuendCount,
}

impl fmt::Display for SubtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubtractionError::SubtrahendValueExceedsMinuendRange => {
                write!(f, "subtrahend has values outside this histogram's range")
            }
            SubtractionError::SubtrahendCountExceedsMinuendCount => {
                write!(f, "subtrahend count exceeds count at the same value")
            }
        }
    }
}

impl Error for SubtractionError {}

/// Errors that can occur when handing a recycled snapshot back to an interval recorder.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum SnapshotError {
    /// The recycled snapshot was produced by a different recorder instance. Snapshots can only be
    /// recycled through the recorder that originally returned them.
    ForeignRecycleBuffer,
    /// The recycled snapshot does not have the same number of significant digits as the
    /// recorder's histograms.
    IncompatiblePrecision,
    /// The recycled snapshot does not cover the same value range (or, for double recorders, the
    /// same highest-to-lowest value ratio) as the recorder's histograms.
    IncompatibleRange,
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::ForeignRecycleBuffer => {
                write!(f, "recycled snapshot came from a different recorder")
            }
            SnapshotError::IncompatiblePrecision => {
                write!(f, "recycled snapshot has a different precision")
            }
            SnapshotError::IncompatibleRange => {
                write!(f, "recycled snapshot covers a different value range")
            }
        }
    }
}

impl Error for SnapshotError {}
