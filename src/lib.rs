//! Exact arithmetic over real closed fields.
//!
//! This crate computes with elements of the real closure of the
//! rationals extended with:
//!
//! - **Computable transcendental reals** (pi, e, or any number given by
//!   a rational-interval refinement procedure);
//! - **Positive infinitesimals**, symbolic elements smaller than every
//!   positive rational yet greater than zero, ordered in a tower;
//! - **Algebraic extensions** (scaffolded: representation and display
//!   are wired, root isolation is not implemented yet).
//!
//! Elements are rational functions over a rank-ordered tower of field
//! extensions. Every nonzero value carries a dyadic-rational interval
//! that provably encloses it; sign determination refines intervals only
//! as far as the operation at hand demands, and every public operation
//! restores over-refined intervals on exit so precision cannot
//! accumulate silently.
//!
//! # Examples
//!
//! ```
//! use rcf::RcfManager;
//!
//! let mut m = RcfManager::default();
//!
//! let pi = m.mk_pi().unwrap();
//! let three = m.mk_int(3);
//! let four = m.mk_int(4);
//! assert!(m.gt(&pi, &three).unwrap());
//! assert!(m.lt(&pi, &four).unwrap());
//! assert!(m.decimal_string(&pi, 10).unwrap().starts_with("3.1415926535"));
//!
//! // Infinitesimals participate in exact field arithmetic.
//! let eps = m.mk_infinitesimal(None);
//! let sum = m.add(&pi, &eps).unwrap();
//! let diff = m.sub(&sum, &pi).unwrap();
//! assert!(m.eq(&diff, &eps).unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod display;
mod dyadic;
mod error;
mod extension;
mod interval;
mod manager;
mod polyops;
mod sign;
mod transcendental;
mod value;

pub use config::{RcfConfig, RcfStats};
pub use error::{RcfError, RcfResult};
pub use interval::RatInterval;
pub use manager::{CancelToken, RcfManager, RcfNum};
pub use transcendental::{e_enclosure, pi_enclosure, ERefiner, IntervalRefiner, PiRefiner};
