//! Intervals with binary rational endpoints.
//!
//! Each endpoint carries an open flag and an infinite flag, so the
//! full lattice over the extended real line is representable. All
//! operations return an interval that provably contains the pointwise
//! result of the corresponding real operation; addition, subtraction,
//! negation and multiplication are exact, division is approximate with
//! an explicit precision and outward rounding.

use crate::dyadic::{self, Dyadic};
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use std::cmp::Ordering;
use std::fmt;

/// An interval with dyadic endpoints over the extended real line.
#[derive(Clone, Debug)]
pub struct DyadicInterval {
    lower: Dyadic,
    upper: Dyadic,
    lower_inf: bool,
    upper_inf: bool,
    lower_open: bool,
    upper_open: bool,
}

/// An endpoint value drawn from the extended real line.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Ep {
    NegInf,
    Fin(Dyadic),
    PosInf,
}

impl Ep {
    fn signum(&self) -> i8 {
        match self {
            Ep::NegInf => -1,
            Ep::Fin(d) => d.signum(),
            Ep::PosInf => 1,
        }
    }

    fn is_zero(&self) -> bool {
        matches!(self, Ep::Fin(d) if d.is_zero())
    }
}

impl DyadicInterval {
    /// The whole real line `(-oo, +oo)`.
    pub fn full() -> Self {
        Self {
            lower: Dyadic::zero(),
            upper: Dyadic::zero(),
            lower_inf: true,
            upper_inf: true,
            lower_open: true,
            upper_open: true,
        }
    }

    /// The singleton `[d, d]`.
    pub fn point(d: Dyadic) -> Self {
        Self {
            lower: d.clone(),
            upper: d,
            lower_inf: false,
            upper_inf: false,
            lower_open: false,
            upper_open: false,
        }
    }

    /// The open interval `(lower, upper)`.
    pub fn open_pair(lower: Dyadic, upper: Dyadic) -> Self {
        debug_assert!(lower < upper);
        Self {
            lower,
            upper,
            lower_inf: false,
            upper_inf: false,
            lower_open: true,
            upper_open: true,
        }
    }

    /// Build from explicit finite bounds.
    pub fn from_bounds(lower: Dyadic, lower_open: bool, upper: Dyadic, upper_open: bool) -> Self {
        Self {
            lower,
            upper,
            lower_inf: false,
            upper_inf: false,
            lower_open,
            upper_open,
        }
    }

    pub fn lower(&self) -> &Dyadic {
        &self.lower
    }

    pub fn upper(&self) -> &Dyadic {
        &self.upper
    }

    pub fn lower_is_inf(&self) -> bool {
        self.lower_inf
    }

    pub fn upper_is_inf(&self) -> bool {
        self.upper_inf
    }

    pub fn lower_is_open(&self) -> bool {
        self.lower_open
    }

    pub fn upper_is_open(&self) -> bool {
        self.upper_open
    }

    /// `lower <- d`.
    pub fn set_lower(&mut self, d: Dyadic, open: bool) {
        self.lower = d;
        self.lower_inf = false;
        self.lower_open = open;
    }

    /// `upper <- d`.
    pub fn set_upper(&mut self, d: Dyadic, open: bool) {
        self.upper = d;
        self.upper_inf = false;
        self.upper_open = open;
    }

    /// `lower <- -oo`.
    pub fn set_lower_inf(&mut self) {
        self.lower = Dyadic::zero();
        self.lower_inf = true;
        self.lower_open = true;
    }

    /// `upper <- +oo`.
    pub fn set_upper_inf(&mut self) {
        self.upper = Dyadic::zero();
        self.upper_inf = true;
        self.upper_open = true;
    }

    /// Mark both endpoints open, leaving their values untouched.
    pub fn force_open(&mut self) {
        self.lower_open = true;
        self.upper_open = true;
    }

    /// True when zero is a member of the interval.
    pub fn contains_zero(&self) -> bool {
        let below = self.lower_inf
            || self.lower.is_neg()
            || (self.lower.is_zero() && !self.lower_open);
        let above = self.upper_inf
            || self.upper.is_pos()
            || (self.upper.is_zero() && !self.upper_open);
        below && above
    }

    /// True when every member is strictly positive.
    pub fn is_pos(&self) -> bool {
        !self.lower_inf && (self.lower.is_pos() || (self.lower.is_zero() && self.lower_open))
    }

    /// True when every member is strictly negative.
    pub fn is_neg(&self) -> bool {
        !self.upper_inf && (self.upper.is_neg() || (self.upper.is_zero() && self.upper_open))
    }

    /// True when both endpoints are open.
    pub fn is_open(&self) -> bool {
        self.lower_open && self.upper_open
    }

    /// True when every member of `self` is below every member of `other`.
    pub fn before(&self, other: &Self) -> bool {
        if self.upper_inf || other.lower_inf {
            return false;
        }
        self.upper < other.lower
            || (self.upper == other.lower && (self.upper_open || other.lower_open))
    }

    /// Magnitude of the interval: the ceiling of `log2(upper - lower)`,
    /// `i64::MIN` for singletons and `i64::MAX` when an endpoint is
    /// infinite.
    pub fn magnitude(&self) -> i64 {
        if self.lower_inf || self.upper_inf {
            return i64::MAX;
        }
        let w = &self.upper - &self.lower;
        if w.is_zero() {
            i64::MIN
        } else {
            w.magnitude_ub()
        }
    }

    /// True when the width is below `2^-prec`.
    pub fn narrower_than(&self, prec: u32) -> bool {
        if self.lower_inf || self.upper_inf {
            return false;
        }
        (&self.upper - &self.lower).lt_1div2k(prec)
    }

    /// One bisection step of the enclosure around `q`, improving the
    /// lower bound when possible.
    pub fn bisect_lower(&mut self, q: &BigRational) {
        dyadic::refine_lower(q, &mut self.lower, &mut self.upper);
    }

    /// One bisection step of the enclosure around `q`, improving the
    /// upper bound when possible.
    pub fn bisect_upper(&mut self, q: &BigRational) {
        dyadic::refine_upper(q, &mut self.lower, &mut self.upper);
    }

    /// Exact negation.
    pub fn neg(&self) -> Self {
        Self {
            lower: -&self.upper,
            upper: -&self.lower,
            lower_inf: self.upper_inf,
            upper_inf: self.lower_inf,
            lower_open: self.upper_open,
            upper_open: self.lower_open,
        }
    }

    /// Exact addition.
    pub fn add(&self, other: &Self) -> Self {
        let (lower, lower_inf) = if self.lower_inf || other.lower_inf {
            (Dyadic::zero(), true)
        } else {
            (&self.lower + &other.lower, false)
        };
        let (upper, upper_inf) = if self.upper_inf || other.upper_inf {
            (Dyadic::zero(), true)
        } else {
            (&self.upper + &other.upper, false)
        };
        Self {
            lower,
            upper,
            lower_inf,
            upper_inf,
            lower_open: self.lower_open || other.lower_open,
            upper_open: self.upper_open || other.upper_open,
        }
    }

    fn lower_ep(&self) -> (Ep, bool) {
        if self.lower_inf {
            (Ep::NegInf, true)
        } else {
            (Ep::Fin(self.lower.clone()), self.lower_open)
        }
    }

    fn upper_ep(&self) -> (Ep, bool) {
        if self.upper_inf {
            (Ep::PosInf, true)
        } else {
            (Ep::Fin(self.upper.clone()), self.upper_open)
        }
    }

    fn from_eps(lower: (Ep, bool), upper: (Ep, bool)) -> Self {
        let mut r = Self::full();
        match lower.0 {
            Ep::NegInf => r.set_lower_inf(),
            Ep::Fin(d) => r.set_lower(d, lower.1),
            Ep::PosInf => unreachable!("lower bound cannot be +oo"),
        }
        match upper.0 {
            Ep::PosInf => r.set_upper_inf(),
            Ep::Fin(d) => r.set_upper(d, upper.1),
            Ep::NegInf => unreachable!("upper bound cannot be -oo"),
        }
        r
    }

    /// Exact multiplication by endpoint candidate analysis.
    pub fn mul(&self, other: &Self) -> Self {
        let xs = [self.lower_ep(), self.upper_ep()];
        let ys = [other.lower_ep(), other.upper_ep()];
        let mut lower: Option<(Ep, bool)> = None;
        let mut upper: Option<(Ep, bool)> = None;
        for x in &xs {
            for y in &ys {
                let cand = mul_ep(x, y);
                accumulate_lower(&mut lower, cand.clone());
                accumulate_upper(&mut upper, cand);
            }
        }
        let lower = lower.expect("nonempty candidate set");
        let upper = upper.expect("nonempty candidate set");
        Self::from_eps(lower, upper)
    }

    /// Approximate division: the result encloses the quotient set with
    /// endpoints rounded outward at granularity `2^-prec`. The divisor
    /// must not contain zero.
    pub fn div(&self, other: &Self, prec: u32) -> Self {
        debug_assert!(!other.contains_zero());
        let den_pos = other.is_pos();
        let xs = [self.lower_ep(), self.upper_ep()];
        let ys = [other.lower_ep(), other.upper_ep()];
        let mut lower: Option<(Ep, bool)> = None;
        let mut upper: Option<(Ep, bool)> = None;
        for x in &xs {
            for y in &ys {
                accumulate_lower(&mut lower, div_ep(x, y, prec, false, den_pos));
                accumulate_upper(&mut upper, div_ep(x, y, prec, true, den_pos));
            }
        }
        let lower = lower.expect("nonempty candidate set");
        let upper = upper.expect("nonempty candidate set");
        Self::from_eps(lower, upper)
    }

    /// Approximate reciprocal at the given precision.
    pub fn inv(&self, prec: u32) -> Self {
        Self::point(Dyadic::one()).div(self, prec)
    }

    /// Intersection of two overlapping enclosures of the same value.
    /// Keeps the tighter bound on each side, so refinement never
    /// widens an interval even when a refiner's enclosures are not
    /// nested.
    pub fn intersect(&self, other: &Self) -> Self {
        let mut r = Self::full();
        // tighter lower bound
        if self.lower_inf {
            if !other.lower_inf {
                r.set_lower(other.lower.clone(), other.lower_open);
            }
        } else if other.lower_inf || self.lower > other.lower {
            r.set_lower(self.lower.clone(), self.lower_open);
        } else if other.lower > self.lower {
            r.set_lower(other.lower.clone(), other.lower_open);
        } else {
            r.set_lower(self.lower.clone(), self.lower_open || other.lower_open);
        }
        // tighter upper bound
        if self.upper_inf {
            if !other.upper_inf {
                r.set_upper(other.upper.clone(), other.upper_open);
            }
        } else if other.upper_inf || self.upper < other.upper {
            r.set_upper(self.upper.clone(), self.upper_open);
        } else if other.upper < self.upper {
            r.set_upper(other.upper.clone(), other.upper_open);
        } else {
            r.set_upper(self.upper.clone(), self.upper_open || other.upper_open);
        }
        debug_assert!(r.lower_inf || r.upper_inf || r.lower <= r.upper);
        r
    }
}

impl Default for DyadicInterval {
    fn default() -> Self {
        Self::full()
    }
}

/// Product of endpoint candidates. A zero endpoint absorbs infinities:
/// the candidate is zero, attained whenever the zero endpoint is.
fn mul_ep(x: &(Ep, bool), y: &(Ep, bool)) -> (Ep, bool) {
    let (xv, xo) = x;
    let (yv, yo) = y;
    if xv.is_zero() && yv.is_zero() {
        return (Ep::Fin(Dyadic::zero()), *xo && *yo);
    }
    if xv.is_zero() {
        return (Ep::Fin(Dyadic::zero()), *xo);
    }
    if yv.is_zero() {
        return (Ep::Fin(Dyadic::zero()), *yo);
    }
    match (xv, yv) {
        (Ep::Fin(a), Ep::Fin(b)) => (Ep::Fin(a * b), *xo || *yo),
        _ => {
            let s = xv.signum() * yv.signum();
            (if s > 0 { Ep::PosInf } else { Ep::NegInf }, true)
        }
    }
}

/// Quotient endpoint candidate with directed rounding. `den_pos` tells
/// which side of zero the divisor interval lies on, which fixes the
/// sign of the blow-up at an (open) zero endpoint of the divisor.
fn div_ep(x: &(Ep, bool), y: &(Ep, bool), prec: u32, round_up: bool, den_pos: bool) -> (Ep, bool) {
    let (xv, xo) = x;
    let (yv, yo) = y;
    if xv.is_zero() {
        return (Ep::Fin(Dyadic::zero()), *xo);
    }
    if yv.is_zero() {
        let s = xv.signum() * if den_pos { 1 } else { -1 };
        return (if s > 0 { Ep::PosInf } else { Ep::NegInf }, true);
    }
    match (xv, yv) {
        (Ep::Fin(a), Ep::Fin(b)) => {
            let (q, exact) = Dyadic::approx_div(a, b, prec, round_up);
            (Ep::Fin(q), if exact { *xo || *yo } else { true })
        }
        (Ep::Fin(_), _) => (Ep::Fin(Dyadic::zero()), true),
        (_, _) => {
            let s = xv.signum() * yv.signum();
            (if s > 0 { Ep::PosInf } else { Ep::NegInf }, true)
        }
    }
}

/// Track the minimum candidate; on ties the bound is attained if any
/// tying candidate is attained.
fn accumulate_lower(best: &mut Option<(Ep, bool)>, cand: (Ep, bool)) {
    match best.take() {
        None => *best = Some(cand),
        Some((v, o)) => {
            *best = Some(match cand.0.cmp(&v) {
                Ordering::Less => cand,
                Ordering::Equal => (v, o && cand.1),
                Ordering::Greater => (v, o),
            });
        }
    }
}

fn accumulate_upper(best: &mut Option<(Ep, bool)>, cand: (Ep, bool)) {
    match best.take() {
        None => *best = Some(cand),
        Some((v, o)) => {
            *best = Some(match cand.0.cmp(&v) {
                Ordering::Greater => cand,
                Ordering::Equal => (v, o && cand.1),
                Ordering::Less => (v, o),
            });
        }
    }
}

impl fmt::Display for DyadicInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lower_inf {
            write!(f, "(-oo, ")?;
        } else if self.lower_open {
            write!(f, "({}, ", self.lower)?;
        } else {
            write!(f, "[{}, ", self.lower)?;
        }
        if self.upper_inf {
            write!(f, "+oo)")
        } else if self.upper_open {
            write!(f, "{})", self.upper)
        } else {
            write!(f, "{}]", self.upper)
        }
    }
}

/// An interval with rational endpoints; always finite. Used by the
/// transcendental refinement procedures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RatInterval {
    /// Lower endpoint.
    pub lower: BigRational,
    /// Upper endpoint.
    pub upper: BigRational,
    /// True when the lower endpoint is excluded.
    pub lower_open: bool,
    /// True when the upper endpoint is excluded.
    pub upper_open: bool,
}

impl RatInterval {
    /// An open interval `(lower, upper)`.
    pub fn open(lower: BigRational, upper: BigRational) -> Self {
        Self {
            lower,
            upper,
            lower_open: true,
            upper_open: true,
        }
    }

    /// Width of the interval.
    pub fn width(&self) -> BigRational {
        &self.upper - &self.lower
    }

    /// Ceiling-style approximation of `log2(width)`; `i64::MIN` for
    /// empty width.
    pub fn magnitude(&self) -> i64 {
        let w = self.width();
        if w.numer().is_zero() {
            return i64::MIN;
        }
        debug_assert!(w.numer().is_positive());
        w.numer().bits() as i64 + 1 - w.denom().bits() as i64
    }
}
