//! Configuration and statistics for the real closed field manager.

/// Configuration for an [`RcfManager`](crate::RcfManager).
#[derive(Debug, Clone)]
pub struct RcfConfig {
    /// Starting precision (in bits) for freshly computed enclosures of
    /// rationals, transcendentals and infinitesimals.
    pub initial_precision: u32,
    /// `2^inf_precision` bounds intervals standing in for infinite
    /// magnitudes: `[2^n, +oo)` and `(-oo, -2^n]`.
    pub inf_precision: u32,
    /// Once an interval's magnitude drops below `-min_mag`, it is saved
    /// before being refined further and restored when the enclosing
    /// public operation finishes.
    pub min_mag: u32,
    /// Hard ceiling on the working precision of the sign-determination
    /// refinement loop. Exceeding it fails with
    /// [`RcfError::PrecisionExhausted`](crate::RcfError::PrecisionExhausted).
    pub max_precision: u32,
}

impl Default for RcfConfig {
    fn default() -> Self {
        Self {
            initial_precision: 24,
            inf_precision: 24,
            min_mag: 64,
            max_precision: 4096,
        }
    }
}

/// Operation counters maintained by the manager.
#[derive(Debug, Clone, Default)]
pub struct RcfStats {
    /// Sign determinations performed on freshly built values.
    pub sign_determinations: u64,
    /// Interval refinements requested.
    pub refinements: u64,
    /// Comparisons performed.
    pub comparisons: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parameters() {
        let config = RcfConfig::default();
        assert_eq!(config.initial_precision, 24);
        assert_eq!(config.inf_precision, 24);
        assert_eq!(config.min_mag, 64);
    }
}
