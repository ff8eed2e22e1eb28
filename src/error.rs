//! Error types returned by fallible quotient filter constructors.

use thiserror::Error;

/// Errors that can occur while constructing a [`QuotientFilter`](crate::quotient::QuotientFilter).
///
/// Every other public operation on an already-constructed filter is infallible: `insert`
/// reports a full filter through its `bool` return value rather than an `Err`, and `remove`
/// reports an out-of-range hash the same way. See the crate-level docs for the rationale.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotientFilterError {
    /// `quotient_bits` or `remainder_bits` was zero, or their sum exceeded 64.
    #[error(
        "invalid quotient filter parameters: quotient_bits = {quotient_bits}, \
         remainder_bits = {remainder_bits} (both must be nonzero and sum to at most 64)"
    )]
    InvalidParameters {
        /// The rejected quotient bit count.
        quotient_bits: u8,
        /// The rejected remainder bit count.
        remainder_bits: u8,
    },

    /// `capacity` was zero, or `fpp` was not in the open interval `(0, 1)`.
    #[error("invalid false-positive target: capacity = {capacity}, fpp = {fpp}")]
    InvalidFalsePositiveTarget {
        /// The rejected capacity.
        capacity: usize,
        /// The rejected false-positive probability.
        fpp: f64,
    },
}

/// Convenience alias for results returned by fallible quotient filter operations.
pub type Result<T> = std::result::Result<T, QuotientFilterError>;
