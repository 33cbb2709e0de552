//! Error type for real closed field operations.

use thiserror::Error;

/// Errors reported by [`RcfManager`](crate::RcfManager) operations.
///
/// All failure modes share a single channel; internal invariant
/// violations (e.g. a polynomial with a zero leading coefficient
/// reaching normalization) are debug assertions, not recoverable
/// errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RcfError {
    /// `inv(0)` or `div(_, 0)`.
    #[error("division by zero")]
    DivisionByZero,
    /// `root(_, 0)`.
    #[error("0-th root is indeterminate")]
    IndeterminateRoot,
    /// `root(a, 2k)` with `sign(a) < 0`.
    #[error("even root of negative number")]
    EvenRootOfNegative,
    /// Cooperative cancellation observed at a checkpoint.
    #[error("canceled")]
    Canceled,
    /// Operation requires algebraic extension support that is not built yet.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    /// Sign determination did not converge before the configured
    /// precision limit. This happens when a user-supplied refinement
    /// procedure converges to a point the tested expression is exactly
    /// zero at, which contradicts the algebraic independence the
    /// refinement loop relies on.
    #[error("sign determination exceeded maximum precision {0}")]
    PrecisionExhausted(u32),
}

/// Result alias used throughout the crate.
pub type RcfResult<T> = Result<T, RcfError>;
