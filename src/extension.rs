//! Field extensions: transcendental, infinitesimal and algebraic.
//!
//! Extensions are totally ordered by rank, the lexicographic order on
//! `(kind, idx)` with `TRANSCENDENTAL < INFINITESIMAL < ALGEBRAIC`.
//! The rank is the single authority on how arithmetic between values
//! over different extensions is positioned: the operand anchored on the
//! higher-rank extension absorbs the other as a degree-0 coefficient.

use crate::interval::DyadicInterval;
use crate::transcendental::IntervalRefiner;
use crate::value::Poly;
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;

/// The three extension kinds, in rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExtKind {
    /// A computable transcendental real (pi, e, or user-supplied).
    Transcendental = 0,
    /// A positive infinitesimal.
    Infinitesimal = 1,
    /// A root of a polynomial over the prior extensions.
    Algebraic = 2,
}

/// A transcendental extension: a name, a monotone refinement counter
/// and the procedure producing enclosures of width `2^-k`.
pub struct TranscendentalExt {
    pub name: Option<String>,
    /// Refinement counter; `proc` has been queried up to this `k`.
    pub k: Cell<u32>,
    pub proc_: RefCell<Box<dyn IntervalRefiner>>,
}

/// An infinitesimal extension. Its initial interval is `(0, 2^-n)` for
/// the configured initial precision `n`.
pub struct InfinitesimalExt {
    pub name: Option<String>,
}

/// An algebraic extension: a defining polynomial over the prior
/// extensions, together with a sign table witnessing which side of
/// selected polynomials the root lies on. The isolating interval is the
/// extension's current interval.
// Constructed once root isolation lands; display and rank handling are
// already wired.
#[allow(dead_code)]
pub struct AlgebraicExt {
    pub poly: Poly,
    pub signs: Vec<(Poly, i8)>,
    /// True when the defining polynomial has no infinitesimal
    /// coefficients. A false value does not prove the root is not real.
    pub real: bool,
}

/// Kind-specific payload of an extension.
pub enum ExtData {
    Transcendental(TranscendentalExt),
    Infinitesimal(InfinitesimalExt),
    #[allow(dead_code)]
    Algebraic(AlgebraicExt),
}

/// A field extension record. Stored behind `Rc`; the registry keeps
/// only weak handles so an extension dies with its last value.
pub struct Extension {
    idx: u32,
    /// Current enclosure of the extension's value.
    pub interval: RefCell<DyadicInterval>,
    pub data: ExtData,
}

impl Extension {
    pub fn new(idx: u32, interval: DyadicInterval, data: ExtData) -> Self {
        Self {
            idx,
            interval: RefCell::new(interval),
            data,
        }
    }

    pub fn idx(&self) -> u32 {
        self.idx
    }

    pub fn kind(&self) -> ExtKind {
        match &self.data {
            ExtData::Transcendental(_) => ExtKind::Transcendental,
            ExtData::Infinitesimal(_) => ExtKind::Infinitesimal,
            ExtData::Algebraic(_) => ExtKind::Algebraic,
        }
    }

    /// Rank comparison: `(kind, idx)` lexicographic.
    pub fn rank_cmp(&self, other: &Extension) -> Ordering {
        (self.kind(), self.idx).cmp(&(other.kind(), other.idx))
    }

    /// Whether the extension denotes a real value. Transcendentals are
    /// real, infinitesimals are not; for algebraic extensions the flag
    /// is one-sided (a false answer may still be a real root whose
    /// defining polynomial has infinitesimal coefficients).
    pub fn is_real(&self) -> bool {
        match &self.data {
            ExtData::Transcendental(_) => true,
            ExtData::Infinitesimal(_) => false,
            ExtData::Algebraic(a) => a.real,
        }
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.data {
            ExtData::Transcendental(t) => match &t.name {
                Some(n) => format!("transcendental {n}"),
                None => "transcendental".to_string(),
            },
            ExtData::Infinitesimal(_) => "infinitesimal".to_string(),
            ExtData::Algebraic(_) => "algebraic".to_string(),
        };
        write!(f, "Extension({kind}, idx={})", self.idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_is_kind_then_idx() {
        let t = Extension::new(
            7,
            DyadicInterval::full(),
            ExtData::Transcendental(TranscendentalExt {
                name: Some("pi".into()),
                k: Cell::new(0),
                proc_: RefCell::new(Box::new(crate::transcendental::PiRefiner)),
            }),
        );
        let eps = Extension::new(
            0,
            DyadicInterval::full(),
            ExtData::Infinitesimal(InfinitesimalExt { name: None }),
        );
        assert_eq!(t.rank_cmp(&eps), Ordering::Less);
        assert_eq!(eps.rank_cmp(&t), Ordering::Greater);
        assert_eq!(eps.rank_cmp(&eps), Ordering::Equal);
        assert!(t.is_real());
        assert!(!eps.is_real());
    }
}
