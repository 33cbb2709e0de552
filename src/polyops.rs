//! Polynomial arithmetic over field values.
//!
//! Polynomials are dense coefficient sequences, low degree first, with
//! `None` for zero coefficients and a nonzero leading coefficient.
//! Every combining operation trims trailing zeros, and every loop
//! passes through the manager's cancellation checkpoint. The division
//! here is plain long division by the (nonzero, not necessarily
//! rational) leading coefficient; no pseudo-remainders.

// The Sturm and square-free machinery is consumed by root isolation,
// which is not wired up until algebraic extensions land.
#![allow(dead_code)]

use crate::error::RcfResult;
use crate::manager::RcfManager;
use crate::value::{trim, Poly, Value};
use num_bigint::BigInt;
use num_rational::BigRational;
use smallvec::SmallVec;

/// A sequence of polynomials stored as one packed coefficient buffer
/// plus per-polynomial offset and length tables. Used for Sturm
/// sequences.
pub(crate) struct PolySeq {
    coeffs: Vec<Value>,
    begins: SmallVec<[usize; 8]>,
    lens: SmallVec<[usize; 8]>,
}

impl PolySeq {
    pub fn new() -> Self {
        Self {
            coeffs: Vec::new(),
            begins: SmallVec::new(),
            lens: SmallVec::new(),
        }
    }

    /// Append a polynomial to the sequence.
    pub fn push(&mut self, p: &[Value]) {
        self.begins.push(self.coeffs.len());
        self.lens.push(p.len());
        self.coeffs.extend_from_slice(p);
    }

    /// Number of polynomials in the sequence.
    pub fn len(&self) -> usize {
        self.lens.len()
    }

    /// Coefficients of the `i`-th polynomial.
    pub fn poly(&self, i: usize) -> &[Value] {
        let b = self.begins[i];
        &self.coeffs[b..b + self.lens[i]]
    }
}

impl RcfManager {
    /// `p1 + p2`.
    pub(crate) fn poly_add(&mut self, p1: &[Value], p2: &[Value]) -> RcfResult<Poly> {
        let mut r = Vec::with_capacity(p1.len().max(p2.len()));
        let min = p1.len().min(p2.len());
        for i in 0..min {
            r.push(self.add_values(&p1[i], &p2[i])?);
        }
        r.extend_from_slice(&p1[min..]);
        r.extend_from_slice(&p2[min..]);
        trim(&mut r);
        Ok(r)
    }

    /// `p + a` (constant term).
    pub(crate) fn poly_add_scalar(&mut self, p: &[Value], a: &Value) -> RcfResult<Poly> {
        debug_assert!(!p.is_empty());
        let mut r = Vec::with_capacity(p.len());
        r.push(self.add_values(&p[0], a)?);
        r.extend_from_slice(&p[1..]);
        trim(&mut r);
        Ok(r)
    }

    /// `p1 - p2`.
    pub(crate) fn poly_sub(&mut self, p1: &[Value], p2: &[Value]) -> RcfResult<Poly> {
        let mut r = Vec::with_capacity(p1.len().max(p2.len()));
        let min = p1.len().min(p2.len());
        for i in 0..min {
            r.push(self.sub_values(&p1[i], &p2[i])?);
        }
        r.extend_from_slice(&p1[min..]);
        for c in &p2[min..] {
            r.push(self.neg_value(c));
        }
        trim(&mut r);
        Ok(r)
    }

    /// `-p`.
    pub(crate) fn poly_neg(&self, p: &[Value]) -> Poly {
        p.iter().map(|c| self.neg_value(c)).collect()
    }

    /// `a * p` for a scalar `a` (possibly zero).
    pub(crate) fn poly_mul_scalar(&mut self, a: &Value, p: &[Value]) -> RcfResult<Poly> {
        if a.is_none() {
            return Ok(Vec::new());
        }
        let mut r = Vec::with_capacity(p.len());
        for c in p {
            r.push(self.mul_values(a, c)?);
        }
        Ok(r)
    }

    /// `p1 * p2` by convolution.
    pub(crate) fn poly_mul(&mut self, p1: &[Value], p2: &[Value]) -> RcfResult<Poly> {
        if p1.is_empty() || p2.is_empty() {
            return Ok(Vec::new());
        }
        let mut r: Poly = vec![None; p1.len() + p2.len() - 1];
        for (i, ci) in p1.iter().enumerate() {
            self.checkpoint()?;
            if ci.is_none() {
                continue;
            }
            for (j, cj) in p2.iter().enumerate() {
                if cj.is_none() {
                    continue;
                }
                let t = self.mul_values(ci, cj)?;
                r[i + j] = self.add_values(&r[i + j], &t)?;
            }
        }
        trim(&mut r);
        Ok(r)
    }

    /// `p <- p / a` coefficientwise; `a` must be nonzero.
    pub(crate) fn poly_div_scalar_inplace(&mut self, p: &mut Poly, a: &Value) -> RcfResult<()> {
        debug_assert!(a.is_some());
        if crate::value::is_rational_one(a) {
            return Ok(());
        }
        for i in 0..p.len() {
            let c = p[i].clone();
            p[i] = self.div_values(&c, a)?;
        }
        Ok(())
    }

    /// Quotient and remainder of `p1 / p2`; the divisor's leading
    /// coefficient is divided out step by step, no pseudo-division.
    pub(crate) fn poly_div_rem(&mut self, p1: &[Value], p2: &[Value]) -> RcfResult<(Poly, Poly)> {
        debug_assert!(!p2.is_empty());
        if p2.len() == 1 {
            let mut q = p1.to_vec();
            let a = p2[0].clone();
            self.poly_div_scalar_inplace(&mut q, &a)?;
            return Ok((q, Vec::new()));
        }
        let mut q: Poly = Vec::new();
        let mut r: Poly = p1.to_vec();
        if p1.len() > 1 {
            if p1.len() >= p2.len() {
                q = vec![None; p1.len() - p2.len() + 1];
            }
            let b_n = p2[p2.len() - 1].clone();
            debug_assert!(b_n.is_some());
            loop {
                self.checkpoint()?;
                let sz1 = r.len();
                if sz1 < p2.len() {
                    trim(&mut q);
                    break;
                }
                let m_n = sz1 - p2.len();
                let ratio = self.div_values(&r[sz1 - 1], &b_n)?;
                let qc = self.add_values(&q[m_n], &ratio)?;
                q[m_n] = qc;
                for i in 0..p2.len() - 1 {
                    let t = self.mul_values(&ratio, &p2[i])?;
                    let rc = self.sub_values(&r[i + m_n], &t)?;
                    r[i + m_n] = rc;
                }
                r.truncate(sz1 - 1);
                trim(&mut r);
            }
        }
        Ok((q, r))
    }

    /// Quotient of `p1 / p2`.
    pub(crate) fn poly_div(&mut self, p1: &[Value], p2: &[Value]) -> RcfResult<Poly> {
        Ok(self.poly_div_rem(p1, p2)?.0)
    }

    /// Remainder of `p1 / p2`.
    pub(crate) fn poly_rem(&mut self, p1: &[Value], p2: &[Value]) -> RcfResult<Poly> {
        Ok(self.poly_div_rem(p1, p2)?.1)
    }

    /// Signed remainder `-rem(p1, p2)`, the Sturm chain step.
    pub(crate) fn poly_srem(&mut self, p1: &[Value], p2: &[Value]) -> RcfResult<Poly> {
        let r = self.poly_rem(p1, p2)?;
        Ok(self.poly_neg(&r))
    }

    /// Force the leading coefficient to one.
    pub(crate) fn poly_mk_monic(&mut self, p: &mut Poly) -> RcfResult<()> {
        let Some(last) = p.last().cloned() else {
            return Ok(());
        };
        debug_assert!(last.is_some());
        if crate::value::is_rational_one(&last) {
            return Ok(());
        }
        let top = p.len() - 1;
        for i in 0..top {
            let c = p[i].clone();
            p[i] = self.div_values(&c, &last)?;
        }
        p[top] = Some(self.one.clone());
        Ok(())
    }

    /// Monic gcd by the Euclidean remainder sequence.
    pub(crate) fn poly_gcd(&mut self, p1: &[Value], p2: &[Value]) -> RcfResult<Poly> {
        if p1.is_empty() {
            let mut r = p2.to_vec();
            self.poly_mk_monic(&mut r)?;
            return Ok(r);
        }
        if p2.is_empty() {
            let mut r = p1.to_vec();
            self.poly_mk_monic(&mut r)?;
            return Ok(r);
        }
        let mut a = p1.to_vec();
        let mut b = p2.to_vec();
        loop {
            if b.is_empty() {
                self.poly_mk_monic(&mut a)?;
                return Ok(a);
            }
            let r = self.poly_rem(&a, &b)?;
            a = b;
            b = r;
        }
    }

    /// `dp/dx`.
    pub(crate) fn poly_derivative(&mut self, p: &[Value]) -> RcfResult<Poly> {
        if p.len() <= 1 {
            return Ok(Vec::new());
        }
        let mut r = Vec::with_capacity(p.len() - 1);
        for (i, c) in p.iter().enumerate().skip(1) {
            let i_value = self.mk_rational_value(BigRational::from_integer(BigInt::from(i)));
            r.push(self.mul_values(&i_value, c)?);
        }
        trim(&mut r);
        Ok(r)
    }

    /// The square-free part `p / gcd(p, p')` (or `p` itself when the
    /// gcd is constant).
    pub(crate) fn poly_square_free(&mut self, p: &[Value]) -> RcfResult<Poly> {
        if p.len() <= 1 {
            return Ok(p.to_vec());
        }
        let dp = self.poly_derivative(p)?;
        let g = self.poly_gcd(p, &dp)?;
        if g.len() <= 1 {
            Ok(p.to_vec())
        } else {
            self.poly_div(p, &g)
        }
    }

    fn sturm_seq_core(&mut self, seq: &mut PolySeq) -> RcfResult<()> {
        loop {
            let n = seq.len();
            let r = self.poly_srem(seq.poly(n - 2), seq.poly(n - 1))?;
            if r.is_empty() {
                return Ok(());
            }
            seq.push(&r);
        }
    }

    /// The Sturm sequence `p, p', srem(p, p'), ...`.
    pub(crate) fn sturm_seq(&mut self, p: &[Value]) -> RcfResult<PolySeq> {
        let mut seq = PolySeq::new();
        seq.push(p);
        let dp = self.poly_derivative(p)?;
        seq.push(&dp);
        self.sturm_seq_core(&mut seq)?;
        Ok(seq)
    }

    /// The Sturm-Tarski sequence seeded with `p1, p1' * p2`.
    pub(crate) fn sturm_tarski_seq(&mut self, p1: &[Value], p2: &[Value]) -> RcfResult<PolySeq> {
        let mut seq = PolySeq::new();
        seq.push(p1);
        let dp1 = self.poly_derivative(p1)?;
        let seed = self.poly_mul(&dp1, p2)?;
        seq.push(&seed);
        self.sturm_seq_core(&mut seq)?;
        Ok(seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::value_sign;
    use num_traits::Zero;

    fn rat(m: &RcfManager, n: i64, d: i64) -> Value {
        m.mk_rational_value(BigRational::new(BigInt::from(n), BigInt::from(d)))
    }

    /// Polynomial with the given integer coefficients, low degree first.
    fn poly(m: &RcfManager, coeffs: &[i64]) -> Poly {
        let mut p: Poly = coeffs.iter().map(|&c| rat(m, c, 1)).collect();
        trim(&mut p);
        p
    }

    fn as_rationals(p: &[Value]) -> Vec<BigRational> {
        p.iter()
            .map(|c| match c {
                None => BigRational::zero(),
                Some(cell) => cell.as_rational().expect("rational coefficient").clone(),
            })
            .collect()
    }

    fn int_poly(coeffs: &[i64]) -> Vec<BigRational> {
        coeffs
            .iter()
            .map(|&c| BigRational::from_integer(BigInt::from(c)))
            .collect()
    }

    /// Evaluate a rational-coefficient polynomial at a rational point
    /// through the value dispatcher (Horner).
    fn eval(m: &mut RcfManager, p: &[Value], x: i64) -> i8 {
        let xv = rat(m, x, 1);
        let mut acc: Value = None;
        for c in p.iter().rev() {
            acc = m.mul_values(&acc, &xv).expect("mul");
            acc = m.add_values(&acc, c).expect("add");
        }
        value_sign(&acc)
    }

    #[test]
    fn addition_cancels_leading_terms() {
        let mut m = RcfManager::default();
        let p1 = poly(&m, &[1, 0, 2]);
        let p2 = poly(&m, &[3, 1, -2]);
        let s = m.poly_add(&p1, &p2).expect("add");
        assert_eq!(as_rationals(&s), int_poly(&[4, 1]));
        let d = m.poly_sub(&p1, &p1).expect("sub");
        assert!(d.is_empty());
    }

    #[test]
    fn multiplication_convolves() {
        let mut m = RcfManager::default();
        // (x - 3)(x - 4) = 12 - 7x + x^2
        let p1 = poly(&m, &[-3, 1]);
        let p2 = poly(&m, &[-4, 1]);
        let p = m.poly_mul(&p1, &p2).expect("mul");
        assert_eq!(as_rationals(&p), int_poly(&[12, -7, 1]));
    }

    #[test]
    fn division_with_remainder() {
        let mut m = RcfManager::default();
        // (x^2 + 3x + 2) / (x + 1) = (x + 2), rem 0
        let p1 = poly(&m, &[2, 3, 1]);
        let p2 = poly(&m, &[1, 1]);
        let (q, r) = m.poly_div_rem(&p1, &p2).expect("div_rem");
        assert_eq!(as_rationals(&q), int_poly(&[2, 1]));
        assert!(r.is_empty());

        // (x^2 + 1) / (x + 1) = (x - 1), rem 2
        let p1 = poly(&m, &[1, 0, 1]);
        let (q, r) = m.poly_div_rem(&p1, &p2).expect("div_rem");
        assert_eq!(as_rationals(&q), int_poly(&[-1, 1]));
        assert_eq!(as_rationals(&r), int_poly(&[2]));
    }

    #[test]
    fn division_by_non_monic_divisor() {
        let mut m = RcfManager::default();
        // (2x^2 + 4x) / (2x) = x + 2
        let p1 = poly(&m, &[0, 4, 2]);
        let p2 = poly(&m, &[0, 2]);
        let (q, r) = m.poly_div_rem(&p1, &p2).expect("div_rem");
        assert_eq!(as_rationals(&q), int_poly(&[2, 1]));
        assert!(r.is_empty());
    }

    #[test]
    fn gcd_is_monic() {
        let mut m = RcfManager::default();
        // gcd(3(x-1)(x+1), 6(x-1)) = x - 1
        let p1 = poly(&m, &[-3, 0, 3]);
        let p2 = poly(&m, &[-6, 6]);
        let g = m.poly_gcd(&p1, &p2).expect("gcd");
        assert_eq!(as_rationals(&g), int_poly(&[-1, 1]));
    }

    #[test]
    fn derivative_and_square_free() {
        let mut m = RcfManager::default();
        // d/dx (1 + 2x + 3x^2) = 2 + 6x
        let p = poly(&m, &[1, 2, 3]);
        let dp = m.poly_derivative(&p).expect("derivative");
        assert_eq!(as_rationals(&dp), int_poly(&[2, 6]));

        // (x-1)^2 has square-free part proportional to (x-1)
        let sq = poly(&m, &[1, -2, 1]);
        let sf = m.poly_square_free(&sq).expect("square_free");
        assert_eq!(sf.len(), 2);
        let root_sign = eval(&mut m, &sf, 1);
        assert_eq!(root_sign, 0);
    }

    #[test]
    fn sturm_sequence_counts_roots() {
        let mut m = RcfManager::default();
        // x^2 - 2 has two real roots in (-2, 2).
        let p = poly(&m, &[-2, 0, 1]);
        let seq = m.sturm_seq(&p).expect("sturm");
        assert_eq!(seq.len(), 3);

        let variations = |m: &mut RcfManager, x: i64| {
            let mut signs = Vec::new();
            for i in 0..seq.len() {
                let s = eval(m, seq.poly(i), x);
                if s != 0 {
                    signs.push(s);
                }
            }
            signs.windows(2).filter(|w| w[0] != w[1]).count()
        };
        let at_lo = variations(&mut m, -2);
        let at_hi = variations(&mut m, 2);
        assert_eq!(at_lo - at_hi, 2);
    }

    #[test]
    fn sturm_tarski_seed() {
        let mut m = RcfManager::default();
        let p1 = poly(&m, &[-2, 0, 1]);
        let p2 = poly(&m, &[1, 1]);
        let seq = m.sturm_tarski_seq(&p1, &p2).expect("tarski");
        // Seed is p1' * p2 = 2x(x+1) = 2x + 2x^2.
        assert_eq!(as_rationals(seq.poly(1)), int_poly(&[0, 2, 2]));
    }
}
