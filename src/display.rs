//! Printing of numerals.
//!
//! Three forms: exact symbolic (expanded, or compact where algebraic
//! extensions are named `r!idx` and their definitions appended),
//! interval form, and decimal to a digit count (driving interval
//! refinement as needed; a trailing `?` marks a truncated expansion).

use crate::error::RcfResult;
use crate::extension::{ExtData, Extension};
use crate::manager::{RcfManager, RcfNum};
use crate::value::{is_rational_one, poly_is_rational_one, value_sign, Value, ValueKind};
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use rustc_hash::FxHashSet;
use std::fmt::Write;
use std::rc::Rc;

/// How the indeterminate of a displayed polynomial is rendered.
enum VarName<'a> {
    /// The anonymous `#` used inside algebraic definitions.
    Free,
    /// The anchor extension of a rational function.
    Ext(&'a Rc<Extension>),
}

/// Truncated decimal expansion; appends `?` when digits were cut off.
fn rational_decimal(q: &BigRational, digits: u32) -> String {
    let mut out = String::new();
    let mut num = q.numer().clone();
    let den = q.denom();
    if num.is_negative() {
        out.push('-');
        num = -num;
    }
    let (int_part, mut rem) = num.div_mod_floor(den);
    out.push_str(&int_part.to_string());
    if digits > 0 && !rem.is_zero() {
        out.push('.');
        for _ in 0..digits {
            rem *= num_bigint::BigInt::from(10);
            let (d, r) = rem.div_mod_floor(den);
            let _ = write!(out, "{d}");
            rem = r;
            if rem.is_zero() {
                break;
            }
        }
    }
    if !rem.is_zero() {
        out.push('?');
    }
    out
}

impl RcfManager {
    fn use_parenthesis(&self, v: &Value) -> bool {
        match v {
            None => false,
            Some(cell) => match &cell.kind {
                ValueKind::Rational(_) => false,
                ValueKind::RatFun(rf) => rf.num.len() > 1 || !poly_is_rational_one(&rf.den),
            },
        }
    }

    fn push_var(&self, out: &mut String, var: &VarName<'_>, compact: bool) {
        match var {
            VarName::Free => out.push('#'),
            VarName::Ext(ext) => self.push_ext(out, ext, compact),
        }
    }

    fn push_polynomial(&self, out: &mut String, p: &[Value], var: &VarName<'_>, compact: bool) {
        debug_assert!(!p.is_empty());
        let mut first = true;
        for i in (0..p.len()).rev() {
            let c = &p[i];
            if c.is_none() {
                continue;
            }
            if first {
                first = false;
            } else {
                out.push_str(" + ");
            }
            if i == 0 {
                self.push_value(out, c, compact);
            } else {
                if !is_rational_one(c) {
                    if self.use_parenthesis(c) {
                        out.push('(');
                        self.push_value(out, c, compact);
                        out.push_str(")*");
                    } else {
                        self.push_value(out, c, compact);
                        out.push('*');
                    }
                }
                self.push_var(out, var, compact);
                if i > 1 {
                    let _ = write!(out, "^{i}");
                }
            }
        }
    }

    fn push_algebraic_def(&self, out: &mut String, ext: &Rc<Extension>, compact: bool) {
        let alg = match &ext.data {
            ExtData::Algebraic(a) => a,
            _ => unreachable!("algebraic extension expected"),
        };
        out.push_str("root(");
        self.push_polynomial(out, &alg.poly, &VarName::Free, compact);
        let _ = write!(out, ", {}, {{", ext.interval.borrow());
        for (i, (p, s)) in alg.signs.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.push_polynomial(out, p, &VarName::Free, compact);
            out.push_str(match s.cmp(&0) {
                std::cmp::Ordering::Less => " < 0",
                std::cmp::Ordering::Equal => " = 0",
                std::cmp::Ordering::Greater => " > 0",
            });
        }
        out.push_str("})");
    }

    fn push_ext(&self, out: &mut String, ext: &Rc<Extension>, compact: bool) {
        match &ext.data {
            ExtData::Transcendental(t) => match &t.name {
                Some(n) => out.push_str(n),
                None => {
                    let _ = write!(out, "t!{}", ext.idx());
                }
            },
            ExtData::Infinitesimal(i) => match &i.name {
                Some(n) => out.push_str(n),
                None => {
                    let _ = write!(out, "eps!{}", ext.idx());
                }
            },
            ExtData::Algebraic(_) => {
                if compact {
                    let _ = write!(out, "r!{}", ext.idx());
                } else {
                    self.push_algebraic_def(out, ext, compact);
                }
            }
        }
    }

    fn push_value(&self, out: &mut String, v: &Value, compact: bool) {
        match v {
            None => out.push('0'),
            Some(cell) => match &cell.kind {
                ValueKind::Rational(q) => {
                    let _ = write!(out, "{q}");
                }
                ValueKind::RatFun(rf) => {
                    let var = VarName::Ext(&rf.ext);
                    if poly_is_rational_one(&rf.den) {
                        self.push_polynomial(out, &rf.num, &var, compact);
                    } else if poly_is_rational_one(&rf.num) {
                        out.push_str("1/(");
                        self.push_polynomial(out, &rf.den, &var, compact);
                        out.push(')');
                    } else {
                        out.push('(');
                        self.push_polynomial(out, &rf.num, &var, compact);
                        out.push_str(")/(");
                        self.push_polynomial(out, &rf.den, &var, compact);
                        out.push(')');
                    }
                }
            },
        }
    }

    fn collect_algebraic_ext(
        &self,
        ext: &Rc<Extension>,
        visited: &mut FxHashSet<u32>,
        found: &mut Vec<Rc<Extension>>,
    ) {
        if let ExtData::Algebraic(alg) = &ext.data {
            if visited.insert(ext.idx()) {
                found.push(ext.clone());
                for c in &alg.poly {
                    self.collect_algebraic(c, visited, found);
                }
            }
        }
    }

    fn collect_algebraic(
        &self,
        v: &Value,
        visited: &mut FxHashSet<u32>,
        found: &mut Vec<Rc<Extension>>,
    ) {
        if let Some(cell) = v {
            if let ValueKind::RatFun(rf) = &cell.kind {
                self.collect_algebraic_ext(&rf.ext, visited, found);
                for c in rf.num.iter().chain(rf.den.iter()) {
                    self.collect_algebraic(c, visited, found);
                }
            }
        }
    }

    /// Exact symbolic form with algebraic definitions spelled out in
    /// place.
    pub fn to_string_expanded(&self, a: &RcfNum) -> String {
        let mut out = String::new();
        self.push_value(&mut out, &a.value, false);
        out
    }

    /// Compact symbolic form: algebraic extensions are named `r!idx`
    /// and their definitions listed once, in rank order.
    pub fn to_string_compact(&self, a: &RcfNum) -> String {
        let mut visited = FxHashSet::default();
        let mut found = Vec::new();
        self.collect_algebraic(&a.value, &mut visited, &mut found);
        let mut out = String::new();
        if found.is_empty() {
            self.push_value(&mut out, &a.value, true);
        } else {
            found.sort_by(|x, y| x.rank_cmp(y));
            out.push('[');
            self.push_value(&mut out, &a.value, true);
            for ext in &found {
                let _ = write!(out, ", r!{} = ", ext.idx());
                self.push_algebraic_def(&mut out, ext, true);
            }
            out.push(']');
        }
        out
    }

    /// The current enclosing interval, e.g. `(13/4, 29/8)`.
    pub fn interval_string(&self, a: &RcfNum) -> String {
        match &a.value {
            None => "[0, 0]".to_string(),
            Some(cell) => {
                self.ensure_interval(cell);
                format!("{}", cell.interval.borrow())
            }
        }
    }

    /// Decimal approximation to `digits` fractional digits, refining
    /// the enclosure as needed. Values whose interval cannot be
    /// refined (infinite magnitude) print as `?` or `-?` by sign.
    pub fn decimal_string(&mut self, a: &RcfNum, digits: u32) -> RcfResult<String> {
        match &a.value {
            None => Ok("0".to_string()),
            Some(cell) => match &cell.kind {
                ValueKind::Rational(q) => Ok(rational_decimal(q, digits)),
                ValueKind::RatFun(_) => {
                    let cell = cell.clone();
                    self.scoped(|m| {
                        let prec = digits.saturating_mul(4).max(4);
                        if m.refine_interval_core(&cell, prec)? {
                            let iv = cell.interval.borrow();
                            // An integer lower bound prints misleadingly
                            // (e.g. "3" for pi), so fall back to the upper.
                            let d = if iv.lower().is_int() {
                                iv.upper().clone()
                            } else {
                                iv.lower().clone()
                            };
                            Ok(rational_decimal(&d.to_rational(), digits))
                        } else if value_sign(&Some(cell.clone())) > 0 {
                            Ok("?".to_string())
                        } else {
                            Ok("-?".to_string())
                        }
                    })
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dyadic::Dyadic;
    use crate::extension::AlgebraicExt;
    use crate::interval::DyadicInterval;
    use num_bigint::BigInt;

    fn rat(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    #[test]
    fn decimal_of_rationals() {
        assert_eq!(rational_decimal(&rat(1, 4), 5), "0.25");
        assert_eq!(rational_decimal(&rat(1, 3), 5), "0.33333?");
        assert_eq!(rational_decimal(&rat(-7, 2), 3), "-3.5");
        assert_eq!(rational_decimal(&rat(42, 1), 3), "42");
        assert_eq!(rational_decimal(&rat(1, 3), 0), "0?");
    }

    #[test]
    fn symbolic_forms() {
        let mut m = RcfManager::default();
        let eps = m.mk_infinitesimal(None);
        assert_eq!(m.to_string_expanded(&eps), "eps!0");

        let named = m.mk_infinitesimal(Some("delta"));
        assert_eq!(m.to_string_expanded(&named), "delta");

        let pi = m.mk_pi().expect("pi");
        assert_eq!(m.to_string_expanded(&pi), "pi");

        let one = m.mk_int(1);
        let pi_plus_one = m.add(&pi, &one).expect("add");
        assert_eq!(m.to_string_expanded(&pi_plus_one), "pi + 1");

        let two = m.mk_int(2);
        let two_pi = m.mul(&pi, &two).expect("mul");
        assert_eq!(m.to_string_expanded(&two_pi), "2*pi");

        let inv = m.inv(&pi).expect("inv");
        assert_eq!(m.to_string_expanded(&inv), "1/(pi)");
    }

    #[test]
    fn zero_prints_as_zero() {
        let m = RcfManager::default();
        let z = RcfNum::default();
        assert_eq!(m.to_string_expanded(&z), "0");
        assert_eq!(m.interval_string(&z), "[0, 0]");
    }

    #[test]
    fn compact_form_names_algebraic_extensions() {
        let m = RcfManager::default();
        // Hand-built sqrt(2) scaffold: root of #^2 - 2 in [1, 2] with
        // derivative sign witness 2*# > 0.
        let poly: Vec<Value> = vec![
            m.mk_rational_value(rat(-2, 1)),
            None,
            m.mk_rational_value(rat(1, 1)),
        ];
        let deriv: Vec<Value> = vec![None, m.mk_rational_value(rat(2, 1))];
        let iv = DyadicInterval::from_bounds(Dyadic::from_int(1), false, Dyadic::from_int(2), false);
        let ext = Rc::new(Extension::new(
            0,
            iv.clone(),
            ExtData::Algebraic(AlgebraicExt {
                poly,
                signs: vec![(deriv, 1)],
                real: true,
            }),
        ));
        let num = vec![None, m.mk_rational_value(rat(1, 1))];
        let den = vec![m.mk_rational_value(rat(1, 1))];
        let cell = m.mk_rf_core(ext, num, den, iv);
        let n = RcfNum { value: Some(cell) };
        assert_eq!(
            m.to_string_compact(&n),
            "[r!0, r!0 = root(#^2 + -2, [1, 2], {2*# > 0})]"
        );
        assert_eq!(
            m.to_string_expanded(&n),
            "root(#^2 + -2, [1, 2], {2*# > 0})"
        );
    }
}
