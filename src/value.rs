//! Values of the real closed field.
//!
//! A value is either the distinguished zero (represented as `None`), a
//! nonzero arbitrary-precision rational, or a rational function over a
//! field extension. Every nonzero value caches a dyadic interval that
//! provably encloses it; the interval of a freshly created rational is
//! initialized lazily. The optional saved interval remembers the
//! enclosure as it was when the current top-level operation started, so
//! over-refinement can be undone.

use crate::extension::Extension;
use crate::interval::DyadicInterval;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A field value; `None` is the zero value.
pub type Value = Option<Rc<ValueCell>>;

/// A dense polynomial over values, low degree first. The leading
/// coefficient is nonzero; interior zero coefficients are `None`.
pub type Poly = Vec<Value>;

/// Payload of a nonzero value.
pub enum ValueKind {
    /// A nonzero rational.
    Rational(BigRational),
    /// A rational function over an extension.
    RatFun(RatFun),
}

/// A rational function `num(alpha) / den(alpha)` over the anchor
/// extension `alpha`. Numerator and denominator are coprime and trimmed
/// of trailing zero coefficients.
pub struct RatFun {
    pub num: Poly,
    pub den: Poly,
    pub ext: Rc<Extension>,
    /// True when the value provably does not depend on infinitesimals.
    pub real: bool,
}

/// A nonzero value with its cached enclosure.
pub struct ValueCell {
    pub kind: ValueKind,
    /// Current enclosure. For rationals a full-line interval marks the
    /// lazy, not-yet-initialized state.
    pub interval: RefCell<DyadicInterval>,
    /// Enclosure saved at the start of the current top-level operation.
    pub saved: RefCell<Option<DyadicInterval>>,
}

impl ValueCell {
    /// Wrap a nonzero rational; the enclosure stays lazy.
    pub fn new_rational(q: BigRational) -> Rc<Self> {
        debug_assert!(!q.numer().is_zero());
        Rc::new(Self {
            kind: ValueKind::Rational(q),
            interval: RefCell::new(DyadicInterval::full()),
            saved: RefCell::new(None),
        })
    }

    pub fn as_rational(&self) -> Option<&BigRational> {
        match &self.kind {
            ValueKind::Rational(q) => Some(q),
            ValueKind::RatFun(_) => None,
        }
    }
}

impl fmt::Debug for ValueCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValueKind::Rational(q) => write!(f, "ValueCell({q})"),
            ValueKind::RatFun(rf) => write!(
                f,
                "ValueCell(rational function over {:?}, deg {}/{})",
                rf.ext,
                rf.num.len().saturating_sub(1),
                rf.den.len().saturating_sub(1)
            ),
        }
    }
}

/// True when `v` is the zero value.
pub fn is_zero(v: &Value) -> bool {
    v.is_none()
}

/// Syntactic check: is `v` represented as the rational one. This does
/// not detect a rational function that happens to equal one.
pub fn is_rational_one(v: &Value) -> bool {
    matches!(v, Some(cell) if cell.as_rational().is_some_and(|q| q.is_one()))
}

/// Syntactic check: is `v` represented as the rational minus one.
pub fn is_rational_minus_one(v: &Value) -> bool {
    matches!(v, Some(cell) if cell.as_rational().is_some_and(|q| (-q).is_one()))
}

/// True when `v` provably denotes a real number (no infinitesimal
/// dependence). One-sided for algebraic anchors.
pub fn is_real_value(v: &Value) -> bool {
    match v {
        None => true,
        Some(cell) => match &cell.kind {
            ValueKind::Rational(_) => true,
            ValueKind::RatFun(rf) => rf.real,
        },
    }
}

/// True when every coefficient of `p` is provably real.
pub fn poly_is_real(p: &[Value]) -> bool {
    p.iter().all(is_real_value)
}

/// True when `p` is the constant polynomial with coefficient one.
pub fn poly_is_rational_one(p: &[Value]) -> bool {
    p.len() == 1 && is_rational_one(&p[0])
}

/// Sign of a nonzero value: rationals from their payload, rational
/// functions from their (zero-free) enclosure.
pub fn value_sign(v: &Value) -> i8 {
    match v {
        None => 0,
        Some(cell) => match &cell.kind {
            ValueKind::Rational(q) => {
                if q.is_positive() {
                    1
                } else {
                    -1
                }
            }
            ValueKind::RatFun(_) => {
                let iv = cell.interval.borrow();
                debug_assert!(!iv.contains_zero());
                if iv.is_pos() {
                    1
                } else {
                    debug_assert!(iv.is_neg());
                    -1
                }
            }
        },
    }
}

/// Remove trailing zero coefficients.
pub fn trim(p: &mut Poly) {
    while matches!(p.last(), Some(None)) {
        p.pop();
    }
}

/// Position of the first nonzero coefficient. The polynomial must not
/// be the zero polynomial.
pub fn first_non_zero(p: &[Value]) -> usize {
    p.iter()
        .position(|c| c.is_some())
        .expect("nonzero polynomial")
}

/// Sign of the first nonzero coefficient at or after `start`.
pub fn sign_of_first_non_zero(p: &[Value], start: usize) -> i8 {
    for c in &p[start..] {
        if c.is_some() {
            return value_sign(c);
        }
    }
    unreachable!("no nonzero coefficient after start")
}
