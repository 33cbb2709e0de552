//! Refinement procedures for computable transcendental numbers.
//!
//! A transcendental extension is driven by an [`IntervalRefiner`]: a
//! procedure that, for any `k`, produces a rational enclosure of the
//! target number of width at most `2^-k`. The crate ships refiners for
//! pi (Machin's formula with alternating-series tail bounds) and e
//! (Taylor series with a factorial tail bound).

use crate::interval::RatInterval;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::One;

/// A procedure producing rational enclosures of a fixed real number.
///
/// The contract: `refine(k)` returns an interval of width at most
/// `2^-k` containing the number, and the number is transcendental over
/// the field generated by the previously created extensions. Sign
/// determination relies on the latter; feeding a refiner that converges
/// to a rational makes comparisons against that rational fail with
/// [`PrecisionExhausted`](crate::RcfError::PrecisionExhausted) instead
/// of looping forever.
pub trait IntervalRefiner {
    /// Return an enclosure of width at most `2^-k`.
    fn refine(&mut self, k: u32) -> RatInterval;
}

impl<F: FnMut(u32) -> RatInterval> IntervalRefiner for F {
    fn refine(&mut self, k: u32) -> RatInterval {
        self(k)
    }
}

/// Enclosures of pi via Machin's formula.
#[derive(Debug, Default, Clone, Copy)]
pub struct PiRefiner;

impl IntervalRefiner for PiRefiner {
    fn refine(&mut self, k: u32) -> RatInterval {
        pi_enclosure(k)
    }
}

/// Enclosures of Euler's number e.
#[derive(Debug, Default, Clone, Copy)]
pub struct ERefiner;

impl IntervalRefiner for ERefiner {
    fn refine(&mut self, k: u32) -> RatInterval {
        e_enclosure(k)
    }
}

fn pow2_inv(k: u32) -> BigRational {
    BigRational::new(BigInt::one(), BigInt::one() << k as usize)
}

/// Enclosure of `arctan(1/x)` of width at most `target`, using the
/// alternating Taylor series. Consecutive partial sums bracket the
/// limit, and the bracket width is the first omitted term.
fn atan_inv(x: u64, target: &BigRational) -> RatInterval {
    let x = BigInt::from(x);
    let x_sq = &x * &x;
    let mut xp = x.clone(); // x^(2i+1)
    let mut s = BigRational::new(BigInt::one(), x); // first term, i = 0
    let mut i: u64 = 0;
    let mut subtract = true;
    loop {
        i += 1;
        xp *= &x_sq;
        let term = BigRational::new(BigInt::one(), BigInt::from(2 * i + 1) * &xp);
        let next = if subtract { &s - &term } else { &s + &term };
        if term <= *target {
            let (lo, hi) = if next < s { (next, s) } else { (s, next) };
            return RatInterval::open(lo, hi);
        }
        s = next;
        subtract = !subtract;
    }
}

/// Enclosure of pi of width at most `2^-k`.
///
/// pi = 16*arctan(1/5) - 4*arctan(1/239); each arctan is enclosed to
/// `2^-(k+5)` so the combined width stays under `2^-k`.
pub fn pi_enclosure(k: u32) -> RatInterval {
    let target = pow2_inv(k + 5);
    let a = atan_inv(5, &target);
    let b = atan_inv(239, &target);
    let sixteen = BigRational::from_integer(BigInt::from(16));
    let four = BigRational::from_integer(BigInt::from(4));
    RatInterval::open(
        &(&sixteen * &a.lower) - &(&four * &b.upper),
        &(&sixteen * &a.upper) - &(&four * &b.lower),
    )
}

/// Enclosure of e of width at most `2^-k`.
///
/// Sums 1/i! until the tail bound `2/(n+1)!` drops below `2^-k`.
pub fn e_enclosure(k: u32) -> RatInterval {
    let target = pow2_inv(k);
    let mut fact = BigInt::one();
    let mut s = BigRational::from_integer(BigInt::from(2)); // 1/0! + 1/1!
    let mut i: u64 = 1;
    loop {
        let tail = BigRational::new(BigInt::from(2), &fact * BigInt::from(i + 1));
        if tail <= target {
            let upper = &s + &tail;
            return RatInterval::open(s, upper);
        }
        i += 1;
        fact *= BigInt::from(i);
        s += BigRational::new(BigInt::one(), fact.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rat(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    #[test]
    fn pi_enclosure_is_tight() {
        for k in [1u32, 8, 24, 64] {
            let i = pi_enclosure(k);
            assert!(i.width() <= pow2_inv(k), "width too large at k={k}");
            assert!(i.lower < i.upper);
            // 3.14159265 < pi < 3.14159266
            if k >= 32 {
                assert!(i.lower > rat(314_159_265, 100_000_000));
                assert!(i.upper < rat(314_159_266, 100_000_000));
            } else {
                assert!(i.lower < rat(314_159_266, 100_000_000));
                assert!(i.upper > rat(314_159_265, 100_000_000));
            }
        }
    }

    #[test]
    fn e_enclosure_is_tight() {
        for k in [1u32, 8, 24, 64] {
            let i = e_enclosure(k);
            assert!(i.width() <= pow2_inv(k));
            if k >= 32 {
                // 2.71828182 < e < 2.71828183
                assert!(i.lower > rat(271_828_182, 100_000_000));
                assert!(i.upper < rat(271_828_183, 100_000_000));
            }
        }
    }

    #[test]
    fn closures_are_refiners() {
        let mut f = |k: u32| RatInterval::open(rat(0, 1), pow2_inv(k));
        let i = f.refine(4);
        assert_eq!(i.upper, rat(1, 16));
    }

    #[test]
    fn atan_brackets_are_ordered() {
        let i = atan_inv(5, &pow2_inv(30));
        assert!(i.lower < i.upper);
        // arctan(1/5) ~ 0.19739555
        assert!(i.lower > rat(19_739_554, 100_000_000));
        assert!(i.upper < rat(19_739_556, 100_000_000));
    }
}
