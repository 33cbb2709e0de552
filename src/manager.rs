//! The real closed field manager and numeral handles.
//!
//! The manager owns the extension registry, the configuration, the
//! cached constants (`1`, pi, e) and the save/restore bookkeeping.
//! Numerals are cheap handles with value semantics; all arithmetic and
//! comparisons go through the manager, and every public operation runs
//! inside a scope that restores over-refined intervals on exit.

use crate::config::{RcfConfig, RcfStats};
use crate::dyadic::Dyadic;
use crate::error::{RcfError, RcfResult};
use crate::extension::{ExtData, ExtKind, Extension, InfinitesimalExt, TranscendentalExt};
use crate::interval::DyadicInterval;
use crate::transcendental::{ERefiner, IntervalRefiner, PiRefiner};
use crate::value::{
    is_rational_minus_one, is_rational_one, is_real_value, is_zero, poly_is_rational_one,
    poly_is_real, value_sign, Poly, RatFun, Value, ValueCell, ValueKind,
};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

/// A numeral of the real closed field.
///
/// Numerals have value semantics: they are `Clone`, `Default` (the zero
/// value), and swappable. All arithmetic, comparisons and printing go
/// through the [`RcfManager`] that created them; mixing numerals from
/// different managers is a logic error.
#[derive(Clone, Default)]
pub struct RcfNum {
    pub(crate) value: Value,
}

impl fmt::Debug for RcfNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            None => write!(f, "RcfNum(0)"),
            Some(cell) => write!(f, "RcfNum({cell:?})"),
        }
    }
}

/// A thread-safe handle for requesting cooperative cancellation.
///
/// Setting the flag makes the worker fail with
/// [`RcfError::Canceled`] at its next checkpoint. Writes are
/// release-ordered, checkpoint reads acquire-ordered.
#[derive(Clone, Debug)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::Release);
    }

    /// Clear a previous cancellation request.
    pub fn clear(&self) {
        self.0.store(false, AtomicOrdering::Release);
    }
}

/// Manager for exact real closed field arithmetic.
///
/// Values are rationals or rational functions over a rank-ordered tower
/// of field extensions (transcendentals, infinitesimals, algebraics).
/// Each nonzero value caches a dyadic interval provably enclosing it;
/// sign determination refines intervals only as far as the operation at
/// hand demands, and the extra precision is dropped again when the
/// operation returns.
pub struct RcfManager {
    pub(crate) config: RcfConfig,
    pub(crate) stats: RcfStats,
    pub(crate) exts: [Vec<Weak<Extension>>; 3],
    pub(crate) one: Rc<ValueCell>,
    pub(crate) pi: Option<Rc<ValueCell>>,
    pub(crate) e: Option<Rc<ValueCell>>,
    pub(crate) to_restore: Vec<Rc<ValueCell>>,
    pub(crate) plus_inf_approx: Dyadic,
    pub(crate) minus_inf_approx: Dyadic,
    cancel: Arc<AtomicBool>,
}

impl Default for RcfManager {
    fn default() -> Self {
        Self::new(RcfConfig::default())
    }
}

/// Precision bumps saturate once the precision is already huge.
pub(crate) fn inc_precision(prec: u32, inc: u32) -> u32 {
    if prec < (1 << 16) {
        prec + inc
    } else {
        prec
    }
}

pub(crate) fn sign_to_ordering(s: i8) -> Ordering {
    s.cmp(&0)
}

impl RcfManager {
    /// Create a manager with the given configuration.
    pub fn new(config: RcfConfig) -> Self {
        let plus_inf_approx = Dyadic::power_of_two(config.inf_precision as i64);
        Self {
            stats: RcfStats::default(),
            exts: [Vec::new(), Vec::new(), Vec::new()],
            one: ValueCell::new_rational(BigRational::one()),
            pi: None,
            e: None,
            to_restore: Vec::new(),
            minus_inf_approx: -&plus_inf_approx,
            plus_inf_approx,
            cancel: Arc::new(AtomicBool::new(false)),
            config,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &RcfConfig {
        &self.config
    }

    /// Replace the parameters. The bounds standing in for infinite
    /// magnitudes are recomputed from the new `inf_precision`.
    pub fn update_config(&mut self, config: RcfConfig) {
        self.plus_inf_approx = Dyadic::power_of_two(config.inf_precision as i64);
        self.minus_inf_approx = -&self.plus_inf_approx;
        self.config = config;
    }

    /// Operation counters.
    pub fn stats(&self) -> &RcfStats {
        &self.stats
    }

    /// Reset the operation counters.
    pub fn reset_stats(&mut self) {
        self.stats = RcfStats::default();
    }

    /// Set or clear the cancellation flag.
    pub fn set_cancel(&self, f: bool) {
        self.cancel.store(f, AtomicOrdering::Release);
    }

    /// A cancellation handle usable from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        CancelToken(self.cancel.clone())
    }

    /// Observe the cancellation flag; every long-running loop passes
    /// through here.
    pub(crate) fn checkpoint(&self) -> RcfResult<()> {
        if self.cancel.load(AtomicOrdering::Acquire) {
            Err(RcfError::Canceled)
        } else {
            Ok(())
        }
    }

    /// Run `f`, then restore every interval saved during it, on success
    /// and on error alike.
    pub(crate) fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> RcfResult<T>) -> RcfResult<T> {
        let r = f(self);
        self.restore_saved_intervals();
        r
    }

    pub(crate) fn too_small(&self, iv: &DyadicInterval) -> bool {
        iv.magnitude() < -(self.config.min_mag as i64)
    }

    /// Remember the current interval of `cell` so it can be restored
    /// when the enclosing public operation finishes.
    pub(crate) fn save_interval(&mut self, cell: &Rc<ValueCell>) {
        if cell.saved.borrow().is_some() {
            return;
        }
        *cell.saved.borrow_mut() = Some(cell.interval.borrow().clone());
        self.to_restore.push(cell.clone());
    }

    pub(crate) fn save_interval_if_too_small(&mut self, cell: &Rc<ValueCell>) {
        let needs_save = self.too_small(&cell.interval.borrow());
        if needs_save {
            self.save_interval(cell);
        }
    }

    /// Undo the over-refinement performed by the finishing operation.
    pub(crate) fn restore_saved_intervals(&mut self) {
        for cell in self.to_restore.drain(..) {
            if let Some(old) = cell.saved.borrow_mut().take() {
                *cell.interval.borrow_mut() = old;
            }
        }
    }

    // ---------------------------------------------------------------
    // Interval plumbing
    // ---------------------------------------------------------------

    /// Dyadic enclosure of a nonzero rational: exact point when the
    /// rational is dyadic, otherwise an open interval of width at most
    /// `2^-k` with nonzero endpoints of the rational's sign.
    pub(crate) fn rational_to_interval(&self, q: &BigRational, k: u32) -> DyadicInterval {
        if let Some(d) = Dyadic::from_rational(q) {
            return DyadicInterval::point(d);
        }
        let mut p = k.max(1);
        loop {
            let l = Dyadic::floor_at(q, p);
            let u = Dyadic::ceil_at(q, p);
            // One-ulp enclosure; both endpoints nonzero forces a fixed
            // sign, since the width is a single step of 2^-p.
            if !l.is_zero() && !u.is_zero() {
                return DyadicInterval::open_pair(l, u);
            }
            p += 8;
        }
    }

    /// Initialize the lazy enclosure of a rational value.
    pub(crate) fn ensure_interval(&self, cell: &Rc<ValueCell>) {
        if let ValueKind::Rational(q) = &cell.kind {
            let uninitialized = cell.interval.borrow().contains_zero();
            if uninitialized {
                *cell.interval.borrow_mut() =
                    self.rational_to_interval(q, self.config.initial_precision);
            }
        }
    }

    /// Current enclosure of a nonzero value.
    pub(crate) fn interval_of(&self, cell: &Rc<ValueCell>) -> DyadicInterval {
        self.ensure_interval(cell);
        cell.interval.borrow().clone()
    }

    // ---------------------------------------------------------------
    // Extension registry
    // ---------------------------------------------------------------

    fn cleanup_extensions(&mut self, kind: ExtKind) {
        let slots = &mut self.exts[kind as usize];
        while slots.last().is_some_and(|w| w.upgrade().is_none()) {
            slots.pop();
        }
    }

    fn next_extension_idx(&mut self, kind: ExtKind) -> u32 {
        self.cleanup_extensions(kind);
        self.exts[kind as usize].len() as u32
    }

    fn register_extension(&mut self, data: ExtData, interval: DyadicInterval) -> Rc<Extension> {
        let kind = match &data {
            ExtData::Transcendental(_) => ExtKind::Transcendental,
            ExtData::Infinitesimal(_) => ExtKind::Infinitesimal,
            ExtData::Algebraic(_) => ExtKind::Algebraic,
        };
        let idx = self.next_extension_idx(kind);
        let ext = Rc::new(Extension::new(idx, interval, data));
        self.exts[kind as usize].push(Rc::downgrade(&ext));
        ext
    }

    /// Number of live extensions of the given kind (diagnostics).
    #[cfg(test)]
    pub(crate) fn live_extensions(&self, kind: ExtKind) -> usize {
        self.exts[kind as usize]
            .iter()
            .filter(|w| w.upgrade().is_some())
            .count()
    }

    // ---------------------------------------------------------------
    // Value constructors
    // ---------------------------------------------------------------

    pub(crate) fn mk_rational_value(&self, q: BigRational) -> Value {
        if q.numer().is_zero() {
            None
        } else {
            Some(ValueCell::new_rational(q))
        }
    }

    pub(crate) fn mk_rf_core(
        &self,
        ext: Rc<Extension>,
        num: Poly,
        den: Poly,
        interval: DyadicInterval,
    ) -> Rc<ValueCell> {
        debug_assert!(matches!(num.last(), Some(Some(_))));
        debug_assert!(matches!(den.last(), Some(Some(_))));
        let real = ext.is_real() && poly_is_real(&num) && poly_is_real(&den);
        Rc::new(ValueCell {
            kind: ValueKind::RatFun(RatFun {
                num,
                den,
                ext,
                real,
            }),
            interval: RefCell::new(interval),
            saved: RefCell::new(None),
        })
    }

    /// The value `alpha/1` for a fresh extension `alpha`, inheriting
    /// the extension's interval.
    fn mk_rf_from_ext(&self, ext: &Rc<Extension>) -> Rc<ValueCell> {
        let num = vec![None, Some(self.one.clone())];
        let den = vec![Some(self.one.clone())];
        let iv = ext.interval.borrow().clone();
        self.mk_rf_core(ext.clone(), num, den, iv)
    }

    // ---------------------------------------------------------------
    // Rank-driven binary dispatch
    // ---------------------------------------------------------------

    pub(crate) fn compare_rank(a: &ValueCell, b: &ValueCell) -> Ordering {
        match (&a.kind, &b.kind) {
            (ValueKind::Rational(_), ValueKind::Rational(_)) => Ordering::Equal,
            (ValueKind::Rational(_), ValueKind::RatFun(_)) => Ordering::Less,
            (ValueKind::RatFun(_), ValueKind::Rational(_)) => Ordering::Greater,
            (ValueKind::RatFun(x), ValueKind::RatFun(y)) => x.ext.rank_cmp(&y.ext),
        }
    }

    fn rat_fun(cell: &ValueCell) -> &RatFun {
        match &cell.kind {
            ValueKind::RatFun(rf) => rf,
            ValueKind::Rational(_) => unreachable!("rational function operand expected"),
        }
    }

    /// Allocate a rational function value for an addition result. The
    /// initial enclosure is the sum of the operand enclosures; sign
    /// determination then sharpens it until zero is excluded.
    fn mk_add_value(
        &mut self,
        a: &Rc<ValueCell>,
        b: &Rc<ValueCell>,
        num: Poly,
        den: Poly,
    ) -> RcfResult<Value> {
        self.mk_combined_value(a, b, num, den, false)
    }

    /// Same as [`Self::mk_add_value`] with a product enclosure.
    fn mk_mul_value(
        &mut self,
        a: &Rc<ValueCell>,
        b: &Rc<ValueCell>,
        num: Poly,
        den: Poly,
    ) -> RcfResult<Value> {
        self.mk_combined_value(a, b, num, den, true)
    }

    fn mk_combined_value(
        &mut self,
        a: &Rc<ValueCell>,
        b: &Rc<ValueCell>,
        mut num: Poly,
        den: Poly,
        product: bool,
    ) -> RcfResult<Value> {
        debug_assert!(!num.is_empty() && !den.is_empty());
        if num.len() == 1 && den.len() == 1 {
            // The normalization rules guarantee a one denominator here.
            debug_assert!(is_rational_one(&den[0]));
            return Ok(num.pop().expect("nonempty numerator"));
        }
        let ext = Self::rat_fun(a).ext.clone();
        let ia = self.interval_of(a);
        let ib = self.interval_of(b);
        let initial = if product { ia.mul(&ib) } else { ia.add(&ib) };
        let cell = self.mk_rf_core(ext, num, den, initial);
        if self.determine_sign(&cell)? {
            Ok(Some(cell))
        } else {
            Ok(None)
        }
    }

    /// `a + b` where `a` is `n/1` and `rank(a) > rank(b)`.
    fn add_p_v(&mut self, a: &Rc<ValueCell>, b: &Rc<ValueCell>) -> RcfResult<Value> {
        let rf = Self::rat_fun(a);
        debug_assert!(poly_is_rational_one(&rf.den));
        debug_assert!(rf.num.len() > 1);
        let b_value = Some(b.clone());
        let num = self.poly_add_scalar(&rf.num, &b_value)?;
        debug_assert_eq!(num.len(), rf.num.len());
        let den = rf.den.clone();
        self.mk_add_value(a, b, num, den)
    }

    /// `a + b` where `a` is `n/d` and `rank(a) > rank(b)`.
    fn add_rf_v(&mut self, a: &Rc<ValueCell>, b: &Rc<ValueCell>) -> RcfResult<Value> {
        let rf = Self::rat_fun(a);
        if poly_is_rational_one(&rf.den) {
            return self.add_p_v(a, b);
        }
        let b_value = Some(b.clone());
        let b_ad = self.poly_mul_scalar(&b_value, &rf.den)?;
        let num = self.poly_add(&rf.num, &b_ad)?;
        if num.is_empty() {
            return Ok(None);
        }
        let (new_num, new_den) = self.normalize_fraction(&num, &rf.den)?;
        self.mk_add_value(a, b, new_num, new_den)
    }

    /// `a + b` where both are `n/1` over the same extension.
    fn add_p_p(&mut self, a: &Rc<ValueCell>, b: &Rc<ValueCell>) -> RcfResult<Value> {
        let ra = Self::rat_fun(a);
        let rb = Self::rat_fun(b);
        debug_assert!(poly_is_rational_one(&ra.den));
        debug_assert!(poly_is_rational_one(&rb.den));
        let num = self.poly_add(&ra.num, &rb.num)?;
        if num.is_empty() {
            return Ok(None);
        }
        let den = ra.den.clone();
        self.mk_add_value(a, b, num, den)
    }

    /// `a + b` where both are `n/d` over the same extension.
    fn add_rf_rf(&mut self, a: &Rc<ValueCell>, b: &Rc<ValueCell>) -> RcfResult<Value> {
        debug_assert_eq!(Self::compare_rank(a, b), Ordering::Equal);
        let ra = Self::rat_fun(a);
        let rb = Self::rat_fun(b);
        if poly_is_rational_one(&ra.den) && poly_is_rational_one(&rb.den) {
            return self.add_p_p(a, b);
        }
        let an_bd = self.poly_mul(&ra.num, &rb.den)?;
        let bn_ad = self.poly_mul(&rb.num, &ra.den)?;
        let num = self.poly_add(&an_bd, &bn_ad)?;
        if num.is_empty() {
            return Ok(None);
        }
        let den = self.poly_mul(&ra.den, &rb.den)?;
        let (new_num, new_den) = self.normalize_fraction(&num, &den)?;
        self.mk_add_value(a, b, new_num, new_den)
    }

    pub(crate) fn add_values(&mut self, a: &Value, b: &Value) -> RcfResult<Value> {
        match (a, b) {
            (None, _) => Ok(b.clone()),
            (_, None) => Ok(a.clone()),
            (Some(ca), Some(cb)) => {
                if let (Some(qa), Some(qb)) = (ca.as_rational(), cb.as_rational()) {
                    return Ok(self.mk_rational_value(qa + qb));
                }
                match Self::compare_rank(ca, cb) {
                    Ordering::Less => self.add_rf_v(cb, ca),
                    Ordering::Equal => self.add_rf_rf(ca, cb),
                    Ordering::Greater => self.add_rf_v(ca, cb),
                }
            }
        }
    }

    pub(crate) fn sub_values(&mut self, a: &Value, b: &Value) -> RcfResult<Value> {
        match (a, b) {
            (_, None) => Ok(a.clone()),
            (None, _) => Ok(self.neg_value(b)),
            (Some(ca), Some(cb)) => {
                if let (Some(qa), Some(qb)) = (ca.as_rational(), cb.as_rational()) {
                    return Ok(self.mk_rational_value(qa - qb));
                }
                let neg_b = self.neg_value(b);
                let cn = neg_b.as_ref().expect("negation of a nonzero value");
                match Self::compare_rank(ca, cn) {
                    Ordering::Less => self.add_rf_v(cn, ca),
                    Ordering::Equal => self.add_rf_rf(ca, cn),
                    Ordering::Greater => self.add_rf_v(ca, cn),
                }
            }
        }
    }

    pub(crate) fn neg_value(&self, v: &Value) -> Value {
        match v {
            None => None,
            Some(cell) => match &cell.kind {
                ValueKind::Rational(q) => Some(ValueCell::new_rational(-q)),
                ValueKind::RatFun(rf) => {
                    let num = self.poly_neg(&rf.num);
                    let iv = cell.interval.borrow().neg();
                    Some(self.mk_rf_core(rf.ext.clone(), num, rf.den.clone(), iv))
                }
            },
        }
    }

    /// `a * b` where `a` is `n/1` and `rank(a) > rank(b)`.
    fn mul_p_v(&mut self, a: &Rc<ValueCell>, b: &Rc<ValueCell>) -> RcfResult<Value> {
        let rf = Self::rat_fun(a);
        debug_assert!(poly_is_rational_one(&rf.den));
        debug_assert!(rf.num.len() > 1);
        let b_value = Some(b.clone());
        let num = self.poly_mul_scalar(&b_value, &rf.num)?;
        debug_assert_eq!(num.len(), rf.num.len());
        let den = rf.den.clone();
        self.mk_mul_value(a, b, num, den)
    }

    /// `a * b` where `a` is `n/d` and `rank(a) > rank(b)`.
    fn mul_rf_v(&mut self, a: &Rc<ValueCell>, b: &Rc<ValueCell>) -> RcfResult<Value> {
        let rf = Self::rat_fun(a);
        if poly_is_rational_one(&rf.den) {
            return self.mul_p_v(a, b);
        }
        let b_value = Some(b.clone());
        let num = self.poly_mul_scalar(&b_value, &rf.num)?;
        debug_assert_eq!(num.len(), rf.num.len());
        let (new_num, new_den) = self.normalize_fraction(&num, &rf.den)?;
        self.mk_mul_value(a, b, new_num, new_den)
    }

    /// `a * b` where both are `n/1` over the same extension.
    fn mul_p_p(&mut self, a: &Rc<ValueCell>, b: &Rc<ValueCell>) -> RcfResult<Value> {
        let ra = Self::rat_fun(a);
        let rb = Self::rat_fun(b);
        let num = self.poly_mul(&ra.num, &rb.num)?;
        debug_assert!(!num.is_empty());
        let den = ra.den.clone();
        self.mk_mul_value(a, b, num, den)
    }

    /// `a * b` where both are `n/d` over the same extension.
    fn mul_rf_rf(&mut self, a: &Rc<ValueCell>, b: &Rc<ValueCell>) -> RcfResult<Value> {
        debug_assert_eq!(Self::compare_rank(a, b), Ordering::Equal);
        let ra = Self::rat_fun(a);
        let rb = Self::rat_fun(b);
        if poly_is_rational_one(&ra.den) && poly_is_rational_one(&rb.den) {
            return self.mul_p_p(a, b);
        }
        let num = self.poly_mul(&ra.num, &rb.num)?;
        let den = self.poly_mul(&ra.den, &rb.den)?;
        debug_assert!(!num.is_empty() && !den.is_empty());
        let (new_num, new_den) = self.normalize_fraction(&num, &den)?;
        self.mk_mul_value(a, b, new_num, new_den)
    }

    pub(crate) fn mul_values(&mut self, a: &Value, b: &Value) -> RcfResult<Value> {
        match (a, b) {
            (None, _) | (_, None) => Ok(None),
            (Some(ca), Some(cb)) => {
                if is_rational_one(a) {
                    return Ok(b.clone());
                }
                if is_rational_one(b) {
                    return Ok(a.clone());
                }
                if is_rational_minus_one(a) {
                    return Ok(self.neg_value(b));
                }
                if is_rational_minus_one(b) {
                    return Ok(self.neg_value(a));
                }
                if let (Some(qa), Some(qb)) = (ca.as_rational(), cb.as_rational()) {
                    return Ok(self.mk_rational_value(qa * qb));
                }
                match Self::compare_rank(ca, cb) {
                    Ordering::Less => self.mul_rf_v(cb, ca),
                    Ordering::Equal => self.mul_rf_rf(ca, cb),
                    Ordering::Greater => self.mul_rf_v(ca, cb),
                }
            }
        }
    }

    pub(crate) fn div_values(&mut self, a: &Value, b: &Value) -> RcfResult<Value> {
        if is_zero(a) {
            if is_zero(b) {
                return Err(RcfError::DivisionByZero);
            }
            return Ok(None);
        }
        if is_zero(b) {
            return Err(RcfError::DivisionByZero);
        }
        if is_rational_one(b) {
            return Ok(a.clone());
        }
        if is_rational_one(a) {
            return self.inv_value(b);
        }
        if is_rational_minus_one(b) {
            return Ok(self.neg_value(a));
        }
        let ca = a.as_ref().expect("nonzero");
        let cb = b.as_ref().expect("nonzero");
        if let (Some(qa), Some(qb)) = (ca.as_rational(), cb.as_rational()) {
            return Ok(self.mk_rational_value(qa / qb));
        }
        let inv_b = self.inv_value(b)?;
        let ci = inv_b.as_ref().expect("inverse of a nonzero value");
        match Self::compare_rank(ca, ci) {
            Ordering::Less => self.mul_rf_v(ci, ca),
            Ordering::Equal => self.mul_rf_rf(ca, ci),
            Ordering::Greater => self.mul_rf_v(ca, ci),
        }
    }

    pub(crate) fn inv_value(&mut self, v: &Value) -> RcfResult<Value> {
        match v {
            None => Err(RcfError::DivisionByZero),
            Some(cell) => match &cell.kind {
                ValueKind::Rational(q) => Ok(Some(ValueCell::new_rational(q.recip()))),
                ValueKind::RatFun(rf) => {
                    let iv = self
                        .interval_of(cell)
                        .inv(self.config.initial_precision);
                    debug_assert!(!iv.contains_zero());
                    Ok(Some(self.mk_rf_core(
                        rf.ext.clone(),
                        rf.den.clone(),
                        rf.num.clone(),
                        iv,
                    )))
                }
            },
        }
    }

    /// Normalization rules keeping numerator and denominator coprime:
    /// a constant denominator is divided out, a constant numerator
    /// forces a `1/d` shape, and otherwise both sides are divided by
    /// their monic gcd (re-applying the first two rules if a quotient
    /// collapses to a constant).
    pub(crate) fn normalize_fraction(
        &mut self,
        p1: &[Value],
        p2: &[Value],
    ) -> RcfResult<(Poly, Poly)> {
        debug_assert!(!p1.is_empty() && !p2.is_empty());
        if p2.len() == 1 {
            let mut num = p1.to_vec();
            self.poly_div_scalar_inplace(&mut num, &p2[0])?;
            Ok((num, vec![Some(self.one.clone())]))
        } else if p1.len() == 1 {
            let mut den = p2.to_vec();
            self.poly_div_scalar_inplace(&mut den, &p1[0])?;
            Ok((vec![Some(self.one.clone())], den))
        } else {
            let g = self.poly_gcd(p1, p2)?;
            if poly_is_rational_one(&g) {
                Ok((p1.to_vec(), p2.to_vec()))
            } else if g.len() == p1.len() || g.len() == p2.len() {
                // One of the quotients collapses to a constant; the
                // first two rules apply to the reduced pair.
                let t1 = self.poly_div(p1, &g)?;
                let t2 = self.poly_div(p2, &g)?;
                if t2.len() == 1 {
                    let mut num = t1;
                    self.poly_div_scalar_inplace(&mut num, &t2[0])?;
                    Ok((num, vec![Some(self.one.clone())]))
                } else if t1.len() == 1 {
                    let scalar = t1[0].clone();
                    let mut den = t2;
                    self.poly_div_scalar_inplace(&mut den, &scalar)?;
                    Ok((vec![Some(self.one.clone())], den))
                } else {
                    unreachable!("gcd degree matches an operand, one quotient must be constant")
                }
            } else {
                let n = self.poly_div(p1, &g)?;
                let d = self.poly_div(p2, &g)?;
                debug_assert!(n.len() > 1 && d.len() > 1);
                Ok((n, d))
            }
        }
    }

    pub(crate) fn power_core(&mut self, a: &Value, k: u32) -> RcfResult<Value> {
        let mut mask: u64 = 1;
        let k = k as u64;
        let mut pw = a.clone();
        let mut b: Value = Some(self.one.clone());
        while mask <= k {
            self.checkpoint()?;
            if mask & k != 0 {
                b = self.mul_values(&b, &pw)?;
            }
            pw = self.mul_values(&pw, &pw)?;
            mask <<= 1;
        }
        Ok(b)
    }

    fn root_core(&mut self, a: &Value, k: u32) -> RcfResult<Value> {
        if k == 0 {
            return Err(RcfError::IndeterminateRoot);
        }
        if k == 1 || is_zero(a) {
            return Ok(a.clone());
        }
        if value_sign(a) < 0 && k % 2 == 0 {
            return Err(RcfError::EvenRootOfNegative);
        }
        // Needs a root of x^k - a, which requires root isolation over
        // the current tower.
        Err(RcfError::NotImplemented("root isolation"))
    }

    pub(crate) fn compare_core(&mut self, a: &Value, b: &Value) -> RcfResult<Ordering> {
        self.stats.comparisons += 1;
        match (a, b) {
            (None, _) => Ok(sign_to_ordering(-value_sign(b))),
            (_, None) => Ok(sign_to_ordering(value_sign(a))),
            (Some(ca), Some(cb)) => {
                if let (Some(qa), Some(qb)) = (ca.as_rational(), cb.as_rational()) {
                    return Ok(qa.cmp(qb));
                }
                let ia = self.interval_of(ca);
                let ib = self.interval_of(cb);
                if ia.before(&ib) {
                    Ok(Ordering::Less)
                } else if ib.before(&ia) {
                    Ok(Ordering::Greater)
                } else {
                    let diff = self.sub_values(a, b)?;
                    Ok(sign_to_ordering(value_sign(&diff)))
                }
            }
        }
    }

    // ---------------------------------------------------------------
    // Numeral construction and lifecycle
    // ---------------------------------------------------------------

    /// Numeral from a machine integer.
    pub fn mk_int(&self, n: i64) -> RcfNum {
        RcfNum {
            value: self.mk_rational_value(BigRational::from_integer(BigInt::from(n))),
        }
    }

    /// Numeral from an unbounded integer.
    pub fn mk_integer(&self, n: &BigInt) -> RcfNum {
        RcfNum {
            value: self.mk_rational_value(BigRational::from_integer(n.clone())),
        }
    }

    /// Numeral from a rational.
    pub fn mk_rational(&self, q: &BigRational) -> RcfNum {
        RcfNum {
            value: self.mk_rational_value(q.clone()),
        }
    }

    /// `a <- b`.
    pub fn assign(&self, a: &mut RcfNum, b: &RcfNum) {
        a.value = b.value.clone();
    }

    /// Exchange two numerals.
    pub fn swap(&self, a: &mut RcfNum, b: &mut RcfNum) {
        std::mem::swap(a, b);
    }

    /// `a <- 0`.
    pub fn reset(&self, a: &mut RcfNum) {
        a.value = None;
    }

    /// Create a fresh positive infinitesimal, smaller than every
    /// positive rational and every previously created infinitesimal
    /// context it is compared in.
    pub fn mk_infinitesimal(&mut self, name: Option<&str>) -> RcfNum {
        let mut iv = DyadicInterval::full();
        iv.set_lower(Dyadic::zero(), true);
        iv.set_upper(
            Dyadic::power_of_two(-(self.config.initial_precision as i64)),
            true,
        );
        let ext = self.register_extension(
            ExtData::Infinitesimal(InfinitesimalExt {
                name: name.map(Into::into),
            }),
            iv,
        );
        let cell = self.mk_rf_from_ext(&ext);
        debug_assert_eq!(value_sign(&Some(cell.clone())), 1);
        debug_assert!(!is_real_value(&Some(cell.clone())));
        RcfNum { value: Some(cell) }
    }

    /// Create a transcendental from a refinement procedure. The initial
    /// interval is refined until it excludes zero.
    pub fn mk_transcendental(
        &mut self,
        name: &str,
        refiner: Box<dyn IntervalRefiner>,
    ) -> RcfResult<RcfNum> {
        let ext = self.register_extension(
            ExtData::Transcendental(TranscendentalExt {
                name: Some(name.to_string()),
                k: Cell::new(0),
                proc_: RefCell::new(refiner),
            }),
            DyadicInterval::full(),
        );
        while ext.interval.borrow().contains_zero() {
            self.checkpoint()?;
            self.refine_transcendental_ext_step(&ext);
        }
        let cell = self.mk_rf_from_ext(&ext);
        debug_assert!(is_real_value(&Some(cell.clone())));
        Ok(RcfNum { value: Some(cell) })
    }

    /// The constant pi; created once and cached for the manager's
    /// lifetime.
    pub fn mk_pi(&mut self) -> RcfResult<RcfNum> {
        if let Some(p) = &self.pi {
            return Ok(RcfNum {
                value: Some(p.clone()),
            });
        }
        let n = self.mk_transcendental("pi", Box::new(PiRefiner))?;
        self.pi = n.value.clone();
        Ok(n)
    }

    /// The constant e; created once and cached for the manager's
    /// lifetime.
    pub fn mk_e(&mut self) -> RcfResult<RcfNum> {
        if let Some(c) = &self.e {
            return Ok(RcfNum {
                value: Some(c.clone()),
            });
        }
        let n = self.mk_transcendental("e", Box::new(ERefiner))?;
        self.e = n.value.clone();
        Ok(n)
    }

    // ---------------------------------------------------------------
    // Arithmetic
    // ---------------------------------------------------------------

    /// `a + b`.
    pub fn add(&mut self, a: &RcfNum, b: &RcfNum) -> RcfResult<RcfNum> {
        self.scoped(|m| {
            Ok(RcfNum {
                value: m.add_values(&a.value, &b.value)?,
            })
        })
    }

    /// `a - b`.
    pub fn sub(&mut self, a: &RcfNum, b: &RcfNum) -> RcfResult<RcfNum> {
        self.scoped(|m| {
            Ok(RcfNum {
                value: m.sub_values(&a.value, &b.value)?,
            })
        })
    }

    /// `a * b`.
    pub fn mul(&mut self, a: &RcfNum, b: &RcfNum) -> RcfResult<RcfNum> {
        self.scoped(|m| {
            Ok(RcfNum {
                value: m.mul_values(&a.value, &b.value)?,
            })
        })
    }

    /// `a / b`; fails on a zero divisor.
    pub fn div(&mut self, a: &RcfNum, b: &RcfNum) -> RcfResult<RcfNum> {
        self.scoped(|m| {
            Ok(RcfNum {
                value: m.div_values(&a.value, &b.value)?,
            })
        })
    }

    /// `-a`.
    pub fn neg(&self, a: &RcfNum) -> RcfNum {
        RcfNum {
            value: self.neg_value(&a.value),
        }
    }

    /// `1/a`; fails on zero.
    pub fn inv(&mut self, a: &RcfNum) -> RcfResult<RcfNum> {
        self.scoped(|m| {
            Ok(RcfNum {
                value: m.inv_value(&a.value)?,
            })
        })
    }

    /// `a^k`. By convention `power(a, 0)` is one for every `a`.
    pub fn power(&mut self, a: &RcfNum, k: u32) -> RcfResult<RcfNum> {
        self.scoped(|m| {
            Ok(RcfNum {
                value: m.power_core(&a.value, k)?,
            })
        })
    }

    /// `k`-th root. Validates the exponent and the operand sign, then
    /// fails with `not implemented` until algebraic extensions land.
    pub fn root(&mut self, a: &RcfNum, k: u32) -> RcfResult<RcfNum> {
        self.scoped(|m| {
            Ok(RcfNum {
                value: m.root_core(&a.value, k)?,
            })
        })
    }

    /// Roots of the polynomial with the given coefficients (low degree
    /// first). Not implemented until algebraic extensions land.
    pub fn isolate_roots(&mut self, _coeffs: &[RcfNum]) -> RcfResult<Vec<RcfNum>> {
        self.scoped(|_| Err(RcfError::NotImplemented("root isolation")))
    }

    /// A value strictly between `prev` and `next`. Not implemented
    /// until algebraic extensions land.
    pub fn select(&mut self, _prev: &RcfNum, _next: &RcfNum) -> RcfResult<RcfNum> {
        self.scoped(|_| Err(RcfError::NotImplemented("select")))
    }

    // ---------------------------------------------------------------
    // Predicates and comparisons
    // ---------------------------------------------------------------

    /// Sign of `a`: -1, 0 or +1.
    pub fn sign(&self, a: &RcfNum) -> i8 {
        value_sign(&a.value)
    }

    /// True when `a` is the zero value.
    pub fn is_zero(&self, a: &RcfNum) -> bool {
        self.sign(a) == 0
    }

    /// True when `a > 0`.
    pub fn is_pos(&self, a: &RcfNum) -> bool {
        self.sign(a) > 0
    }

    /// True when `a < 0`.
    pub fn is_neg(&self, a: &RcfNum) -> bool {
        self.sign(a) < 0
    }

    /// True when `a` is known to be an integer. One-sided: a rational
    /// function that happens to be an integer reports false.
    pub fn is_int(&self, a: &RcfNum) -> bool {
        match &a.value {
            None => true,
            Some(cell) => match &cell.kind {
                ValueKind::Rational(q) => q.is_integer(),
                ValueKind::RatFun(_) => false,
            },
        }
    }

    /// True when `a` provably denotes a real number, i.e. does not
    /// depend on infinitesimals. One-sided for algebraic extensions
    /// whose defining polynomial has infinitesimal coefficients.
    pub fn is_real(&self, a: &RcfNum) -> bool {
        is_real_value(&a.value)
    }

    /// Three-way comparison.
    pub fn compare(&mut self, a: &RcfNum, b: &RcfNum) -> RcfResult<Ordering> {
        self.scoped(|m| m.compare_core(&a.value, &b.value))
    }

    /// `a == b` as field elements.
    pub fn eq(&mut self, a: &RcfNum, b: &RcfNum) -> RcfResult<bool> {
        Ok(self.compare(a, b)? == Ordering::Equal)
    }

    /// `a < b`.
    pub fn lt(&mut self, a: &RcfNum, b: &RcfNum) -> RcfResult<bool> {
        Ok(self.compare(a, b)? == Ordering::Less)
    }

    /// `a > b`.
    pub fn gt(&mut self, a: &RcfNum, b: &RcfNum) -> RcfResult<bool> {
        Ok(self.compare(a, b)? == Ordering::Greater)
    }

    /// `a <= b`.
    pub fn le(&mut self, a: &RcfNum, b: &RcfNum) -> RcfResult<bool> {
        Ok(self.compare(a, b)? != Ordering::Greater)
    }

    /// `a >= b`.
    pub fn ge(&mut self, a: &RcfNum, b: &RcfNum) -> RcfResult<bool> {
        Ok(self.compare(a, b)? != Ordering::Less)
    }
}
