//! Binary rational (dyadic) numbers.
//!
//! A dyadic number is `m * 2^e` with integer `m`, `e`. Addition,
//! subtraction and multiplication are exact; division is approximate
//! with an explicit precision and rounding direction. Interval
//! endpoints use this form so that all bookkeeping except division
//! stays rounding-free.

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// A binary rational `m * 2^e`, kept normalized: `m` is odd, or zero
/// with `e == 0`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dyadic {
    m: BigInt,
    e: i64,
}

impl Dyadic {
    /// Build `m * 2^e`, normalizing the mantissa.
    pub fn new(m: BigInt, e: i64) -> Self {
        if m.is_zero() {
            return Self::zero();
        }
        let tz = m.trailing_zeros().unwrap_or(0) as i64;
        if tz > 0 {
            Self {
                m: m >> tz as usize,
                e: e + tz,
            }
        } else {
            Self { m, e }
        }
    }

    /// The zero value.
    pub fn zero() -> Self {
        Self {
            m: BigInt::zero(),
            e: 0,
        }
    }

    /// The value one.
    pub fn one() -> Self {
        Self {
            m: BigInt::one(),
            e: 0,
        }
    }

    /// `2^e`.
    pub fn power_of_two(e: i64) -> Self {
        Self {
            m: BigInt::one(),
            e,
        }
    }

    /// Test helper.
    #[cfg(test)]
    pub fn from_int(n: i64) -> Self {
        Self::new(BigInt::from(n), 0)
    }

    pub fn is_zero(&self) -> bool {
        self.m.is_zero()
    }

    pub fn is_pos(&self) -> bool {
        self.m.is_positive()
    }

    pub fn is_neg(&self) -> bool {
        self.m.is_negative()
    }

    /// Sign as -1, 0 or 1.
    pub fn signum(&self) -> i8 {
        if self.m.is_positive() {
            1
        } else if self.m.is_negative() {
            -1
        } else {
            0
        }
    }

    /// True when the value is an integer.
    pub fn is_int(&self) -> bool {
        self.e >= 0 || self.m.is_zero()
    }

    /// Halve the value.
    pub fn div2(&self) -> Self {
        if self.is_zero() {
            self.clone()
        } else {
            Self {
                m: self.m.clone(),
                e: self.e - 1,
            }
        }
    }

    /// Exact conversion from a rational; `None` unless the denominator
    /// is a power of two.
    pub fn from_rational(q: &BigRational) -> Option<Self> {
        let den = q.denom();
        if den.is_one() {
            return Some(Self::new(q.numer().clone(), 0));
        }
        let tz = den.trailing_zeros().unwrap_or(0);
        if (den >> tz as usize).is_one() {
            Some(Self::new(q.numer().clone(), -(tz as i64)))
        } else {
            None
        }
    }

    /// Exact conversion to a rational.
    pub fn to_rational(&self) -> BigRational {
        if self.e >= 0 {
            BigRational::from_integer(&self.m << self.e as usize)
        } else {
            BigRational::new(self.m.clone(), BigInt::one() << (-self.e) as usize)
        }
    }

    /// Largest dyadic of the form `k / 2^prec` that is `<= q`.
    pub fn floor_at(q: &BigRational, prec: u32) -> Self {
        let scaled = q.numer() << prec as usize;
        let f = scaled.div_floor(q.denom());
        Self::new(f, -(prec as i64))
    }

    /// Smallest dyadic of the form `k / 2^prec` that is `>= q`.
    pub fn ceil_at(q: &BigRational, prec: u32) -> Self {
        let scaled = q.numer() << prec as usize;
        let (f, r) = scaled.div_mod_floor(q.denom());
        let c = if r.is_zero() { f } else { f + 1 };
        Self::new(c, -(prec as i64))
    }

    /// Compare against a rational without converting either operand.
    pub fn cmp_rational(&self, q: &BigRational) -> Ordering {
        // m * 2^e  vs  n/d  (d > 0)  <=>  m * d * 2^e  vs  n
        let lhs;
        let rhs;
        if self.e >= 0 {
            lhs = (&self.m << self.e as usize) * q.denom();
            rhs = q.numer().clone();
        } else {
            lhs = &self.m * q.denom();
            rhs = q.numer() << (-self.e) as usize;
        }
        lhs.cmp(&rhs)
    }

    /// `c ~ a / b` with `|c - a/b| <= 2^-prec`, rounded toward plus or
    /// minus infinity. The second component reports whether the result
    /// is exact.
    pub fn approx_div(a: &Dyadic, b: &Dyadic, prec: u32, to_plus_inf: bool) -> (Dyadic, bool) {
        debug_assert!(!b.is_zero());
        if a.is_zero() {
            return (Dyadic::zero(), true);
        }
        // Scale the dividend so the quotient granularity is <= 2^-prec.
        let s = (prec as i64 + a.e - b.e).max(0);
        let scaled = &a.m << s as usize;
        let (q, r) = scaled.div_mod_floor(&b.m);
        let exact = r.is_zero();
        let q = if !exact && to_plus_inf { q + 1 } else { q };
        (Dyadic::new(q, a.e - b.e - s), exact)
    }

    /// Smallest `z` such that `self <= 2^z`. Requires a positive value.
    pub fn magnitude_ub(&self) -> i64 {
        debug_assert!(self.is_pos());
        let bits = self.m.bits() as i64;
        if self.m.is_one() {
            self.e
        } else {
            // mantissa is odd and > 1, so 2^(bits-1) < m < 2^bits
            self.e + bits
        }
    }

    /// True when `self < 2^-k`.
    pub fn lt_1div2k(&self, k: u32) -> bool {
        if !self.is_pos() {
            return true;
        }
        // m * 2^e < 2^-k  <=>  m < 2^(-k - e)
        let t = -(k as i64) - self.e;
        t > 0 && (self.m.bits() as i64) <= t
    }
}

impl Add for &Dyadic {
    type Output = Dyadic;

    fn add(self, rhs: &Dyadic) -> Dyadic {
        if self.is_zero() {
            return rhs.clone();
        }
        if rhs.is_zero() {
            return self.clone();
        }
        let e = self.e.min(rhs.e);
        let m = (&self.m << (self.e - e) as usize) + (&rhs.m << (rhs.e - e) as usize);
        Dyadic::new(m, e)
    }
}

impl Sub for &Dyadic {
    type Output = Dyadic;

    fn sub(self, rhs: &Dyadic) -> Dyadic {
        self + &(-rhs)
    }
}

impl Mul for &Dyadic {
    type Output = Dyadic;

    fn mul(self, rhs: &Dyadic) -> Dyadic {
        if self.is_zero() || rhs.is_zero() {
            return Dyadic::zero();
        }
        Dyadic {
            m: &self.m * &rhs.m,
            e: self.e + rhs.e,
        }
    }
}

impl Neg for &Dyadic {
    type Output = Dyadic;

    fn neg(self) -> Dyadic {
        Dyadic {
            m: -&self.m,
            e: if self.m.is_zero() { 0 } else { self.e },
        }
    }
}

impl PartialOrd for Dyadic {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dyadic {
    fn cmp(&self, other: &Self) -> Ordering {
        let sa = self.signum();
        let sb = other.signum();
        if sa != sb {
            return sa.cmp(&sb);
        }
        if sa == 0 {
            return Ordering::Equal;
        }
        let e = self.e.min(other.e);
        let lhs = &self.m << (self.e - e) as usize;
        let rhs = &other.m << (other.e - e) as usize;
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for Dyadic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rational())
    }
}

/// One bisection step improving the enclosure `(lower, upper)` of `q`
/// from below. Requires `lower < q < upper`.
pub fn refine_lower(q: &BigRational, lower: &mut Dyadic, upper: &mut Dyadic) {
    let mid = (&*lower + &*upper).div2();
    if mid.cmp_rational(q) == Ordering::Less {
        *lower = mid;
    } else {
        *upper = mid;
    }
}

/// One bisection step improving the enclosure `(lower, upper)` of `q`
/// from above. Requires `lower < q < upper`.
pub fn refine_upper(q: &BigRational, lower: &mut Dyadic, upper: &mut Dyadic) {
    let mid = (&*lower + &*upper).div2();
    if mid.cmp_rational(q) == Ordering::Greater {
        *upper = mid;
    } else {
        *lower = mid;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn rat(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    #[test]
    fn normalization() {
        let a = Dyadic::new(BigInt::from(12), 0);
        assert_eq!(a, Dyadic::new(BigInt::from(3), 2));
        assert_eq!(Dyadic::new(BigInt::zero(), 5), Dyadic::zero());
    }

    #[test]
    fn exact_ring_ops() {
        let a = Dyadic::new(BigInt::from(3), -2); // 3/4
        let b = Dyadic::new(BigInt::from(1), -1); // 1/2
        assert_eq!((&a + &b).to_rational(), rat(5, 4));
        assert_eq!((&a - &b).to_rational(), rat(1, 4));
        assert_eq!((&a * &b).to_rational(), rat(3, 8));
        assert_eq!((-&a).to_rational(), rat(-3, 4));
    }

    #[test]
    fn ordering() {
        let a = Dyadic::new(BigInt::from(3), -2);
        let b = Dyadic::new(BigInt::from(1), 0);
        assert!(a < b);
        assert!(Dyadic::from_int(-1) < Dyadic::zero());
        assert_eq!(a.cmp_rational(&rat(3, 4)), Ordering::Equal);
        assert_eq!(a.cmp_rational(&rat(7, 8)), Ordering::Less);
    }

    #[test]
    fn rational_round_trips() {
        assert_eq!(
            Dyadic::from_rational(&rat(5, 8)),
            Some(Dyadic::new(BigInt::from(5), -3))
        );
        assert_eq!(Dyadic::from_rational(&rat(1, 3)), None);
        let q = rat(1, 3);
        let f = Dyadic::floor_at(&q, 8);
        let c = Dyadic::ceil_at(&q, 8);
        assert!(f.cmp_rational(&q) == Ordering::Less);
        assert!(c.cmp_rational(&q) == Ordering::Greater);
        assert_eq!((&c - &f).to_rational(), rat(1, 256));
    }

    #[test]
    fn approximate_division() {
        let a = Dyadic::from_int(1);
        let b = Dyadic::from_int(3);
        let (lo, exact) = Dyadic::approx_div(&a, &b, 20, false);
        assert!(!exact);
        let (hi, _) = Dyadic::approx_div(&a, &b, 20, true);
        let third = rat(1, 3);
        assert!(lo.cmp_rational(&third) == Ordering::Less);
        assert!(hi.cmp_rational(&third) == Ordering::Greater);
        assert!((&hi - &lo).lt_1div2k(19));

        let (q, exact) = Dyadic::approx_div(&Dyadic::from_int(6), &b, 10, false);
        assert!(exact);
        assert_eq!(q, Dyadic::from_int(2));
    }

    #[test]
    fn magnitude_bounds() {
        assert_eq!(Dyadic::from_int(1).magnitude_ub(), 0);
        assert_eq!(Dyadic::from_int(5).magnitude_ub(), 3);
        assert_eq!(Dyadic::new(BigInt::from(1), -4).magnitude_ub(), -4);
        assert!(Dyadic::new(BigInt::from(1), -5).lt_1div2k(4));
        assert!(!Dyadic::new(BigInt::from(1), -4).lt_1div2k(4));
    }

    #[test]
    fn bisection_refinement() {
        let q = rat(1, 3);
        let mut lo = Dyadic::zero();
        let mut hi = Dyadic::one();
        for _ in 0..16 {
            refine_lower(&q, &mut lo, &mut hi);
            refine_upper(&q, &mut lo, &mut hi);
        }
        assert!(lo.cmp_rational(&q) == Ordering::Less);
        assert!(hi.cmp_rational(&q) == Ordering::Greater);
        assert!((&hi - &lo).lt_1div2k(10));
    }
}
