//! Sign determination and adaptive interval refinement.
//!
//! A freshly built rational function value may still have an enclosure
//! containing zero. Sign determination resolves this per anchor kind:
//! transcendental anchors refine until zero is excluded (they are never
//! roots of the defining polynomials), infinitesimal anchors are
//! resolved symbolically from the lowest-order nonzero terms, algebraic
//! anchors are not implemented yet. Refinement saves any interval that
//! is already very narrow so the enclosing public operation can restore
//! it on exit.

use crate::dyadic::Dyadic;
use crate::error::{RcfError, RcfResult};
use crate::extension::{ExtData, ExtKind, Extension};
use crate::interval::DyadicInterval;
use crate::manager::{inc_precision, RcfManager};
use crate::value::{first_non_zero, sign_of_first_non_zero, value_sign, Value, ValueCell, ValueKind};
use crate::value::poly_is_rational_one;
use std::rc::Rc;
use tracing::trace;

impl RcfManager {
    /// Resolve whether the enclosure of a freshly built rational
    /// function value excludes zero. Returns `false` only when the
    /// value is exactly zero, which for the implemented anchor kinds
    /// never happens: transcendentals and infinitesimals are
    /// algebraically independent of the tower below them.
    pub(crate) fn determine_sign(&mut self, cell: &Rc<ValueCell>) -> RcfResult<bool> {
        self.stats.sign_determinations += 1;
        if !cell.interval.borrow().contains_zero() {
            return Ok(true);
        }
        let kind = match &cell.kind {
            ValueKind::RatFun(rf) => rf.ext.kind(),
            ValueKind::Rational(_) => unreachable!("sign of rationals is read off the payload"),
        };
        match kind {
            ExtKind::Transcendental => {
                self.determine_transcendental_sign(cell)?;
                Ok(true)
            }
            ExtKind::Infinitesimal => {
                self.determine_infinitesimal_sign(cell)?;
                Ok(true)
            }
            ExtKind::Algebraic => Err(RcfError::NotImplemented("algebraic sign determination")),
        }
    }

    /// Refine until the enclosure excludes zero, raising the working
    /// precision one bit at a time. Bails out once the precision passes
    /// the configured ceiling; see the [`IntervalRefiner`]
    /// contract.
    ///
    /// [`IntervalRefiner`]: crate::IntervalRefiner
    fn determine_transcendental_sign(&mut self, cell: &Rc<ValueCell>) -> RcfResult<()> {
        let m = cell.interval.borrow().magnitude();
        let mut prec: u32 = if m < 0 && m != i64::MIN {
            (-m).min(u32::MAX as i64) as u32 + 1
        } else {
            1
        };
        loop {
            if !cell.interval.borrow().contains_zero() {
                return Ok(());
            }
            if prec > self.config.max_precision {
                return Err(RcfError::PrecisionExhausted(self.config.max_precision));
            }
            self.refine_transcendental_rf(cell, prec)?;
            prec += 1;
        }
    }

    /// Symbolic sign of an infinitesimal-anchored value, from the
    /// positions `i`, `j` of the lowest-order nonzero terms of the
    /// coprime numerator and denominator (at least one of them is 0).
    fn determine_infinitesimal_sign(&mut self, cell: &Rc<ValueCell>) -> RcfResult<()> {
        let rf = match &cell.kind {
            ValueKind::RatFun(rf) => rf,
            ValueKind::Rational(_) => unreachable!("rational function expected"),
        };
        let num_idx = first_non_zero(&rf.num);
        let den_idx = first_non_zero(&rf.den);
        let ini = self.config.initial_precision;
        let iv = if num_idx == 0 && den_idx == 0 {
            // Finite and nonzero: the ratio of the constant terms,
            // eps-shifted where a closed endpoint would not absorb the
            // higher-order infinitesimal terms.
            let num0 = rf.num[0].as_ref().expect("nonzero constant term");
            let den0 = rf.den[0].as_ref().expect("nonzero constant term");
            let num_i = self.interval_of(num0);
            let den_i = self.interval_of(den0);
            debug_assert!(!num_i.contains_zero() && !den_i.contains_zero());
            if num_i.is_open() && den_i.is_open() {
                num_i.div(&den_i, ini)
            } else {
                let tiny = Dyadic::power_of_two(-(ini as i64));
                let new_num = if rf.num.len() > 1 {
                    self.add_infinitesimal_shift(
                        &num_i,
                        sign_of_first_non_zero(&rf.num, 1) > 0,
                        &tiny,
                    )?
                } else {
                    num_i
                };
                let new_den = if rf.den.len() > 1 {
                    self.add_infinitesimal_shift(
                        &den_i,
                        sign_of_first_non_zero(&rf.den, 1) > 0,
                        &tiny,
                    )?
                } else {
                    den_i
                };
                new_num.div(&new_den, ini)
            }
        } else {
            // Coprimality leaves eps out of one side entirely.
            debug_assert!(num_idx == 0 || den_idx == 0);
            let s = value_sign(&rf.num[num_idx]) * value_sign(&rf.den[den_idx]);
            debug_assert!(s != 0);
            let mut iv = DyadicInterval::full();
            if num_idx == 0 {
                // Larger in magnitude than every binary rational.
                if s > 0 {
                    iv.set_lower(self.plus_inf_approx.clone(), true);
                } else {
                    iv.set_upper(self.minus_inf_approx.clone(), true);
                }
            } else {
                // Infinitely close to zero.
                if s > 0 {
                    iv.set_lower(Dyadic::zero(), true);
                    iv.set_upper(Dyadic::power_of_two(-(ini as i64)), true);
                } else {
                    iv.set_lower(-&Dyadic::power_of_two(-(ini as i64)), true);
                    iv.set_upper(Dyadic::zero(), true);
                }
            }
            iv
        };
        *cell.interval.borrow_mut() = iv;
        debug_assert!(!cell.interval.borrow().contains_zero());
        Ok(())
    }

    /// `out <- in + eps` (or `- eps`): endpoints become open, and a
    /// closed endpoint on the shifted side moves outward by
    /// `tiny / 2^k` for the smallest `k` that keeps the endpoint's
    /// sign (the shift must not cross zero).
    pub(crate) fn add_infinitesimal_shift(
        &self,
        input: &DyadicInterval,
        plus_eps: bool,
        tiny: &Dyadic,
    ) -> RcfResult<DyadicInterval> {
        let mut out = input.clone();
        out.force_open();
        if plus_eps {
            if !input.upper_is_inf() && !input.upper_is_open() {
                let mut tval = tiny.clone();
                loop {
                    let shifted = input.upper() + &tval;
                    if input.upper().is_pos() == shifted.is_pos() {
                        out.set_upper(shifted, true);
                        return Ok(out);
                    }
                    tval = tval.div2();
                    self.checkpoint()?;
                }
            }
        } else if !input.lower_is_inf() && !input.lower_is_open() {
            let mut tval = tiny.clone();
            loop {
                let shifted = input.lower() - &tval;
                if input.lower().is_pos() == shifted.is_pos() {
                    out.set_lower(shifted, true);
                    return Ok(out);
                }
                tval = tval.div2();
                self.checkpoint()?;
            }
        }
        Ok(out)
    }

    // ---------------------------------------------------------------
    // Refinement engine
    // ---------------------------------------------------------------

    /// Narrow the enclosure of `v` until its magnitude is at most
    /// `-prec`. Returns `false` when the interval cannot be refined
    /// (values of infinite magnitude, algebraic anchors).
    pub(crate) fn refine_interval_core(
        &mut self,
        cell: &Rc<ValueCell>,
        prec: u32,
    ) -> RcfResult<bool> {
        self.checkpoint()?;
        self.stats.refinements += 1;
        let m = self.interval_of(cell).magnitude();
        if m == i64::MIN || (m < 0 && (-m) as u64 > prec as u64) {
            return Ok(true);
        }
        self.save_interval_if_too_small(cell);
        match &cell.kind {
            ValueKind::Rational(q) => {
                self.refine_rational_interval(cell, q, prec)?;
                Ok(true)
            }
            ValueKind::RatFun(rf) => match rf.ext.kind() {
                ExtKind::Transcendental => {
                    self.refine_transcendental_rf(cell, prec)?;
                    Ok(true)
                }
                ExtKind::Infinitesimal => self.refine_infinitesimal_interval(cell, prec),
                ExtKind::Algebraic => Ok(false),
            },
        }
    }

    /// Bisect the binary enclosure of a stored rational.
    fn refine_rational_interval(
        &self,
        cell: &Rc<ValueCell>,
        q: &num_rational::BigRational,
        prec: u32,
    ) -> RcfResult<()> {
        self.ensure_interval(cell);
        let mut iv = cell.interval.borrow_mut();
        if !iv.lower_is_open() && !iv.upper_is_open() {
            // the rational is dyadic, the enclosure is already a point
            debug_assert!(iv.lower() == iv.upper());
            return Ok(());
        }
        while !iv.narrower_than(prec) {
            self.checkpoint()?;
            iv.bisect_lower(q);
            iv.bisect_upper(q);
        }
        Ok(())
    }

    /// Refine every nonzero coefficient of `p`.
    fn refine_coeffs(&mut self, p: &[Value], prec: u32) -> RcfResult<bool> {
        for c in p {
            if let Some(cell) = c {
                if !self.refine_interval_core(cell, prec)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Interval of `p(x)` by Horner evaluation with interval
    /// arithmetic.
    pub(crate) fn polynomial_interval(&self, p: &[Value], x: &DyadicInterval) -> DyadicInterval {
        debug_assert!(!p.is_empty());
        if p.len() == 1 {
            return self.interval_of(p[0].as_ref().expect("nonzero constant polynomial"));
        }
        let top = p
            .last()
            .and_then(|c| c.as_ref())
            .expect("nonzero leading coefficient");
        let mut r = self.interval_of(top).mul(x);
        for i in (0..p.len() - 1).rev() {
            if let Some(c) = &p[i] {
                r = r.add(&self.interval_of(c));
            }
            if i > 0 {
                r = r.mul(x);
            }
        }
        r
    }

    /// Recompute the enclosure of a rational function value from its
    /// extension and coefficient enclosures.
    fn update_rf_interval(&self, cell: &Rc<ValueCell>, prec: u32) {
        let rf = match &cell.kind {
            ValueKind::RatFun(rf) => rf,
            ValueKind::Rational(_) => unreachable!("rational function expected"),
        };
        let ext_i = rf.ext.interval.borrow().clone();
        let iv = if poly_is_rational_one(&rf.den) {
            self.polynomial_interval(&rf.num, &ext_i)
        } else {
            let ni = self.polynomial_interval(&rf.num, &ext_i);
            let di = self.polynomial_interval(&rf.den, &ext_i);
            ni.div(&di, inc_precision(prec, 2))
        };
        *cell.interval.borrow_mut() = iv;
    }

    /// Refine a transcendental-anchored rational function to `prec`
    /// bits: coefficients first, then the extension, then the Horner
    /// recomposition, raising the inner precision until it sticks.
    fn refine_transcendental_rf(&mut self, cell: &Rc<ValueCell>, prec: u32) -> RcfResult<()> {
        let rf = match &cell.kind {
            ValueKind::RatFun(rf) => rf,
            ValueKind::Rational(_) => unreachable!("rational function expected"),
        };
        debug_assert_eq!(rf.ext.kind(), ExtKind::Transcendental);
        let mut cur = prec;
        loop {
            // Coefficients of a transcendental-anchored value have
            // strictly lower rank, so they never depend on
            // infinitesimals and these refinements cannot fail.
            let _num_ok = self.refine_coeffs(&rf.num, cur)?;
            debug_assert!(_num_ok);
            let _den_ok = self.refine_coeffs(&rf.den, cur)?;
            debug_assert!(_den_ok);
            self.refine_transcendental_ext(&rf.ext, cur)?;
            self.update_rf_interval(cell, prec);
            trace!(
                magnitude = cell.interval.borrow().magnitude(),
                target = prec,
                "refined transcendental rational function"
            );
            if cell.interval.borrow().narrower_than(prec) {
                return Ok(());
            }
            cur += 1;
        }
    }

    /// Refine the extension's own interval until it is narrower than
    /// `2^-prec`.
    fn refine_transcendental_ext(&mut self, ext: &Rc<Extension>, prec: u32) -> RcfResult<()> {
        loop {
            let done = ext.interval.borrow().narrower_than(prec);
            if done {
                return Ok(());
            }
            self.checkpoint()?;
            self.refine_transcendental_ext_step(ext);
        }
    }

    /// One refinement step: query the procedure at the next `k` and
    /// convert the rational enclosure to dyadic endpoints, at a
    /// precision matched to the enclosure's magnitude.
    pub(crate) fn refine_transcendental_ext_step(&self, ext: &Rc<Extension>) {
        let t = match &ext.data {
            ExtData::Transcendental(t) => t,
            _ => unreachable!("transcendental extension expected"),
        };
        let k = t.k.get() + 1;
        t.k.set(k);
        let ri = t.proc_.borrow_mut().refine(k);
        let m = ri.magnitude();
        let k2 = if m >= 0 {
            self.config.initial_precision
        } else {
            let neg = m.checked_neg().unwrap_or(i64::MAX).min(1 << 20) as u32;
            inc_precision(neg, 8)
        };
        let enc_l = self.rational_to_interval(&ri.lower, k2);
        let enc_u = self.rational_to_interval(&ri.upper, k2);
        let iv = DyadicInterval::from_bounds(
            enc_l.lower().clone(),
            enc_l.lower_is_open(),
            enc_u.upper().clone(),
            enc_u.upper_is_open(),
        );
        trace!(k, magnitude = m, "refined transcendental extension");
        // Keep the tighter bound per side: enclosures from successive
        // refinement calls are not required to be nested.
        let merged = ext.interval.borrow().intersect(&iv);
        *ext.interval.borrow_mut() = merged;
    }

    /// Refine an infinitesimal-anchored rational function. Fails (with
    /// `false`) for values of infinite magnitude, which no interval
    /// with binary rational endpoints can pin down.
    fn refine_infinitesimal_interval(&mut self, cell: &Rc<ValueCell>, prec: u32) -> RcfResult<bool> {
        let rf = match &cell.kind {
            ValueKind::RatFun(rf) => rf,
            ValueKind::Rational(_) => unreachable!("rational function expected"),
        };
        debug_assert_eq!(rf.ext.kind(), ExtKind::Infinitesimal);
        let num_idx = first_non_zero(&rf.num);
        let den_idx = first_non_zero(&rf.den);
        if num_idx == 0 && den_idx == 0 {
            let num0 = rf.num[0].as_ref().expect("nonzero constant term").clone();
            let den0 = rf.den[0].as_ref().expect("nonzero constant term").clone();
            let mut cur = prec;
            loop {
                self.refine_interval_core(&num0, cur)?;
                self.refine_interval_core(&den0, cur)?;
                let num_i = self.interval_of(&num0);
                let den_i = self.interval_of(&den0);
                debug_assert!(!num_i.contains_zero() && !den_i.contains_zero());
                let iv = if num_i.is_open() && den_i.is_open() {
                    num_i.div(&den_i, inc_precision(prec, 2))
                } else {
                    let tiny = Dyadic::power_of_two(-(2 * cur as i64));
                    let new_num = if rf.num.len() > 1 {
                        self.add_infinitesimal_shift(
                            &num_i,
                            sign_of_first_non_zero(&rf.num, 1) > 0,
                            &tiny,
                        )?
                    } else {
                        num_i
                    };
                    let new_den = if rf.den.len() > 1 {
                        self.add_infinitesimal_shift(
                            &den_i,
                            sign_of_first_non_zero(&rf.den, 1) > 0,
                            &tiny,
                        )?
                    } else {
                        den_i
                    };
                    new_num.div(&new_den, inc_precision(prec, 2))
                };
                *cell.interval.borrow_mut() = iv;
                if cell.interval.borrow().narrower_than(prec) {
                    return Ok(true);
                }
                cur += 1;
            }
        } else if num_idx == 0 {
            // Bigger than any binary rational; not refinable.
            Ok(false)
        } else {
            // Infinitely close to zero.
            debug_assert_eq!(den_idx, 0);
            let s = value_sign(&rf.num[num_idx]) * value_sign(&rf.den[den_idx]);
            debug_assert!(s != 0);
            let mut iv = DyadicInterval::full();
            if s > 0 {
                iv.set_lower(Dyadic::zero(), true);
                iv.set_upper(Dyadic::power_of_two(-(prec as i64)), true);
            } else {
                iv.set_lower(-&Dyadic::power_of_two(-(prec as i64)), true);
                iv.set_upper(Dyadic::zero(), true);
            }
            *cell.interval.borrow_mut() = iv;
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use num_rational::BigRational;

    fn rat_value(m: &RcfManager, n: i64, d: i64) -> Value {
        m.mk_rational_value(BigRational::new(BigInt::from(n), BigInt::from(d)))
    }

    #[test]
    fn horner_evaluation_encloses() {
        let m = RcfManager::default();
        // p(x) = 1 + 2x at x in [3, 4] is [7, 9]
        let p: Vec<Value> = vec![rat_value(&m, 1, 1), rat_value(&m, 2, 1)];
        let x = DyadicInterval::from_bounds(
            Dyadic::from_int(3),
            false,
            Dyadic::from_int(4),
            false,
        );
        let r = m.polynomial_interval(&p, &x);
        assert!(r.lower().to_rational() <= BigRational::from_integer(BigInt::from(7)));
        assert!(r.upper().to_rational() >= BigRational::from_integer(BigInt::from(9)));
        assert!(!r.contains_zero());
    }

    #[test]
    fn eps_shift_opens_closed_endpoints() {
        let m = RcfManager::default();
        let iv = DyadicInterval::from_bounds(
            Dyadic::from_int(1),
            false,
            Dyadic::from_int(2),
            false,
        );
        let tiny = Dyadic::power_of_two(-8);
        let shifted = m
            .add_infinitesimal_shift(&iv, true, &tiny)
            .expect("shift");
        assert!(shifted.lower_is_open() && shifted.upper_is_open());
        // Upper moved outward, lower kept its value.
        assert!(shifted.upper().to_rational() > iv.upper().to_rational());
        assert_eq!(shifted.lower(), iv.lower());

        let shifted = m
            .add_infinitesimal_shift(&iv, false, &tiny)
            .expect("shift");
        assert!(shifted.lower().to_rational() < iv.lower().to_rational());
        assert_eq!(shifted.upper(), iv.upper());
    }

    #[test]
    fn shift_never_crosses_zero() {
        let m = RcfManager::default();
        // Upper endpoint -1/4 closed; a shift by 1/2 would cross zero,
        // so the step is halved until it does not.
        let iv = DyadicInterval::from_bounds(
            Dyadic::from_int(-1),
            false,
            Dyadic::new(BigInt::from(-1), -2),
            false,
        );
        let tiny = Dyadic::power_of_two(-1);
        let shifted = m.add_infinitesimal_shift(&iv, true, &tiny).expect("shift");
        // The halved step may land exactly on zero, but only as an
        // open endpoint: the interval still excludes zero.
        assert!(!shifted.upper().is_pos());
        assert!(!shifted.contains_zero());
        assert!(shifted.upper().to_rational() > iv.upper().to_rational());
    }

    #[test]
    fn rational_refinement_narrows() {
        let mut m = RcfManager::default();
        let v = rat_value(&m, 1, 3);
        let cell = v.as_ref().expect("nonzero").clone();
        assert!(m.refine_interval_core(&cell, 80).expect("refine"));
        let iv = cell.interval.borrow();
        assert!(iv.narrower_than(80));
        assert!(!iv.contains_zero());
    }
}
