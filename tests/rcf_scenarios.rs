//! End-to-end scenarios for the real closed field manager:
//! infinitesimal ordering, transcendental comparisons, exact
//! cancellation, error reporting, interval save/restore and
//! cooperative cancellation.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Pow};
use rcf::{RatInterval, RcfConfig, RcfError, RcfManager, RcfNum};
use std::cmp::Ordering;

fn rat(n: i64, d: i64) -> BigRational {
    BigRational::new(BigInt::from(n), BigInt::from(d))
}

#[test]
fn infinitesimal_ordering() {
    let mut m = RcfManager::default();
    let eps = m.mk_infinitesimal(None);
    assert_eq!(m.sign(&eps), 1);
    assert!(!m.is_real(&eps));

    let one = m.mk_int(1);
    let one_minus_eps = m.sub(&one, &eps).expect("1 - eps");
    assert_eq!(m.sign(&one_minus_eps), 1);

    // Smaller than every positive rational, however tiny.
    let tiny = BigRational::new(BigInt::one(), BigInt::from(10).pow(100u32));
    let tiny = m.mk_rational(&tiny);
    assert_eq!(m.compare(&eps, &tiny), Ok(Ordering::Less));

    // Yet an exact field element: eps * eps^-1 = 1.
    let inv = m.inv(&eps).expect("eps^-1");
    let prod = m.mul(&eps, &inv).expect("eps * eps^-1");
    assert_eq!(m.compare(&prod, &one), Ok(Ordering::Equal));
    assert!(m.is_int(&prod));
}

#[test]
fn infinitesimal_inverse_dominates_rationals() {
    let mut m = RcfManager::default();
    let eps = m.mk_infinitesimal(None);
    let inv = m.inv(&eps).expect("1/eps");
    let huge = BigRational::from_integer(BigInt::from(10).pow(100u32));
    let huge = m.mk_rational(&huge);
    assert_eq!(m.compare(&inv, &huge), Ok(Ordering::Greater));
    assert_eq!(m.sign(&inv), 1);
}

#[test]
fn later_infinitesimals_are_smaller() {
    let mut m = RcfManager::default();
    let eps1 = m.mk_infinitesimal(None);
    let eps2 = m.mk_infinitesimal(None);
    assert_eq!(m.compare(&eps2, &eps1), Ok(Ordering::Less));
    assert_eq!(m.sign(&eps2), 1);
}

#[test]
fn pi_basics() {
    let mut m = RcfManager::default();
    let pi = m.mk_pi().expect("pi");
    assert!(m.is_real(&pi));
    assert!(!m.is_int(&pi));

    let three = m.mk_int(3);
    let four = m.mk_int(4);
    assert_eq!(m.compare(&three, &pi), Ok(Ordering::Less));
    assert_eq!(m.compare(&pi, &four), Ok(Ordering::Less));

    let s = m.decimal_string(&pi, 10).expect("decimal");
    assert!(s.starts_with("3.1415926535"), "got {s}");

    // (pi - 3) * (pi - 4) < 0: pi lies between the two roots.
    let a = m.sub(&pi, &three).expect("pi - 3");
    let b = m.sub(&pi, &four).expect("pi - 4");
    let p = m.mul(&a, &b).expect("product");
    assert_eq!(m.sign(&p), -1);

    // Requesting pi twice hands back the cached handle.
    let pi2 = m.mk_pi().expect("pi again");
    assert_eq!(m.compare(&pi, &pi2), Ok(Ordering::Equal));
}

#[test]
fn e_basics() {
    let mut m = RcfManager::default();
    let e = m.mk_e().expect("e");
    let two = m.mk_int(2);
    let three = m.mk_int(3);
    assert!(m.gt(&e, &two).expect("e > 2"));
    assert!(m.lt(&e, &three).expect("e < 3"));
    let s = m.decimal_string(&e, 10).expect("decimal");
    assert!(s.starts_with("2.7182818284"), "got {s}");
}

#[test]
fn mixed_tower_cancellation() {
    let mut m = RcfManager::default();
    let pi = m.mk_pi().expect("pi");
    let eps = m.mk_infinitesimal(None);

    // (pi + eps) - pi = eps, and the difference is positive.
    let sum = m.add(&pi, &eps).expect("pi + eps");
    assert!(!m.is_real(&sum));
    let diff = m.sub(&sum, &pi).expect("(pi + eps) - pi");
    assert_eq!(m.sign(&diff), 1);
    assert_eq!(m.compare(&diff, &eps), Ok(Ordering::Equal));
}

#[test]
fn exact_zero_from_transcendentals() {
    let mut m = RcfManager::default();
    let pi = m.mk_pi().expect("pi");
    let sq1 = m.mul(&pi, &pi).expect("pi^2");
    let sq2 = m.mul(&pi, &pi).expect("pi^2");
    let z = m.sub(&sq1, &sq2).expect("difference");
    assert!(m.is_zero(&z));
    assert_eq!(m.to_string_expanded(&z), "0");
}

#[test]
fn powers() {
    let mut m = RcfManager::default();
    let pi = m.mk_pi().expect("pi");
    let p2 = m.mul(&pi, &pi).expect("pi^2");
    let p4a = m.mul(&p2, &p2).expect("pi^4");
    let p4b = m.power(&pi, 4).expect("pi^4");
    assert_eq!(m.compare(&p4a, &p4b), Ok(Ordering::Equal));

    let nine = m.mk_int(9);
    let ten = m.mk_int(10);
    assert!(m.gt(&p2, &nine).expect("pi^2 > 9"));
    assert!(m.lt(&p2, &ten).expect("pi^2 < 10"));
}

#[test]
fn normalization_keeps_fractions_comparable() {
    let mut m = RcfManager::default();
    let eps = m.mk_infinitesimal(None);
    let one = m.mk_int(1);
    let two = m.mk_int(2);

    let n = m.add(&eps, &one).expect("eps + 1");
    let d = m.sub(&eps, &one).expect("eps - 1");
    let q1 = m.div(&n, &d).expect("(eps+1)/(eps-1)");

    let n2 = m.mul(&two, &n).expect("2eps + 2");
    let d2 = m.mul(&two, &d).expect("2eps - 2");
    let q2 = m.div(&n2, &d2).expect("(2eps+2)/(2eps-2)");

    assert_eq!(m.compare(&q1, &q2), Ok(Ordering::Equal));

    // The same construction lands on the same normalized representative.
    let q3 = m.div(&n, &d).expect("again");
    assert_eq!(m.to_string_expanded(&q1), m.to_string_expanded(&q3));
}

#[test]
fn rational_refiner_is_flagged_inconclusive() {
    let mut m = RcfManager::new(RcfConfig {
        max_precision: 128,
        ..RcfConfig::default()
    });
    // A "transcendental" whose refiner converges to exactly 7/3.
    let target = rat(7, 3);
    let t = {
        let target = target.clone();
        m.mk_transcendental(
            "t",
            Box::new(move |k: u32| {
                let d = BigRational::new(BigInt::one(), BigInt::one() << (k as usize + 1));
                RatInterval::open(&target - &d, &target + &d)
            }),
        )
        .expect("mk_transcendental")
    };

    // Comparisons that genuinely separate still converge...
    let three = m.mk_int(3);
    assert_eq!(m.compare(&t, &three), Ok(Ordering::Less));

    // ...but testing equality against the refiner's own limit runs
    // into the noise floor and is reported as inconclusive.
    let q = m.mk_rational(&target);
    assert_eq!(m.compare(&t, &q), Err(RcfError::PrecisionExhausted(128)));

    // The manager stays usable afterwards.
    assert_eq!(m.compare(&three, &t), Ok(Ordering::Greater));
}

#[test]
fn error_taxonomy() {
    let mut m = RcfManager::default();
    let one = m.mk_int(1);
    let minus_two = m.mk_int(-2);
    let zero = RcfNum::default();

    let err = m.div(&one, &zero).expect_err("division by zero");
    assert_eq!(err.to_string(), "division by zero");

    let err = m.inv(&zero).expect_err("inv of zero");
    assert_eq!(err.to_string(), "division by zero");

    let err = m.root(&one, 0).expect_err("0-th root");
    assert_eq!(err.to_string(), "0-th root is indeterminate");

    let err = m.root(&minus_two, 4).expect_err("even root of negative");
    assert_eq!(err.to_string(), "even root of negative number");

    let err = m.root(&one, 2).expect_err("root is partial");
    assert!(err.to_string().starts_with("not implemented"));

    let err = m.isolate_roots(&[one.clone()]).expect_err("isolate_roots");
    assert!(err.to_string().starts_with("not implemented"));

    let err = m.select(&one, &minus_two).expect_err("select");
    assert!(err.to_string().starts_with("not implemented"));
}

#[test]
fn save_restore_of_deep_refinement() {
    let mut m = RcfManager::default();
    let pi = m.mk_pi().expect("pi");

    // The first deep print refines the interval well below the
    // min_mag threshold; that precision is kept.
    let s = m.decimal_string(&pi, 30).expect("decimal");
    assert!(s.starts_with("3.14159265358979323846"), "got {s}");
    let before = m.interval_string(&pi);

    // A later, deeper print must not permanently inflate precision:
    // its extra refinement is undone on exit.
    let s = m.decimal_string(&pi, 40).expect("decimal");
    assert!(s.starts_with("3.141592653589793238462643383279"), "got {s}");
    let after = m.interval_string(&pi);
    assert_eq!(before, after);
}

#[test]
fn cooperative_cancellation() {
    let mut m = RcfManager::default();
    let two = m.mk_int(2);
    let token = m.cancel_token();

    token.cancel();
    assert_eq!(m.power(&two, 8).expect_err("canceled"), RcfError::Canceled);
    assert_eq!(
        m.mk_transcendental("x", Box::new(rcf::PiRefiner))
            .expect_err("canceled")
            .to_string(),
        "canceled"
    );

    token.clear();
    let p = m.power(&two, 8).expect("power after clear");
    let expected = m.mk_int(256);
    assert_eq!(m.compare(&p, &expected), Ok(Ordering::Equal));

    // set_cancel mirrors the token.
    m.set_cancel(true);
    assert_eq!(m.power(&two, 2).expect_err("canceled"), RcfError::Canceled);
    m.set_cancel(false);
}

#[test]
fn numeral_value_semantics() {
    let mut m = RcfManager::default();
    let mut a = m.mk_int(5);
    let mut b = m.mk_int(7);
    m.swap(&mut a, &mut b);
    let five = m.mk_int(5);
    let seven = m.mk_int(7);
    assert_eq!(m.compare(&a, &seven), Ok(Ordering::Equal));
    assert_eq!(m.compare(&b, &five), Ok(Ordering::Equal));

    let mut c = RcfNum::default();
    m.assign(&mut c, &a);
    assert_eq!(m.compare(&c, &seven), Ok(Ordering::Equal));

    m.reset(&mut c);
    assert!(m.is_zero(&c));

    let d = a.clone();
    assert_eq!(m.compare(&d, &seven), Ok(Ordering::Equal));
}

#[test]
fn interval_and_decimal_of_infinitesimal_quantities() {
    let mut m = RcfManager::default();
    let eps = m.mk_infinitesimal(None);

    // 1/eps has infinite magnitude: decimal printing reports a sign
    // but no digits.
    let inv = m.inv(&eps).expect("1/eps");
    assert_eq!(m.decimal_string(&inv, 10).expect("decimal"), "?");
    let minus_inv = m.neg(&inv);
    assert_eq!(m.decimal_string(&minus_inv, 10).expect("decimal"), "-?");

    // eps itself prints as a vanishing decimal.
    let s = m.decimal_string(&eps, 5).expect("decimal");
    assert!(s.starts_with("0.0000"), "got {s}");

    let iv = m.interval_string(&eps);
    assert!(iv.starts_with("(0, "), "got {iv}");
}

#[test]
fn stats_are_counted() {
    let mut m = RcfManager::default();
    let pi = m.mk_pi().expect("pi");
    // 22/7 lies inside pi's initial enclosure, so this comparison has
    // to build the difference and determine its sign.
    let approx = m.mk_rational(&rat(22, 7));
    assert_eq!(m.compare(&pi, &approx), Ok(Ordering::Less));
    assert!(m.stats().comparisons >= 1);
    assert!(m.stats().sign_determinations >= 1);
    assert!(m.stats().refinements >= 1);
    m.reset_stats();
    assert_eq!(m.stats().comparisons, 0);
}
