//! The two rewrite rules the search applies before every decision. Both return a new formula and
//! leave their input untouched; clauses that pass through unchanged are shared, not copied.

use crate::formula::{Clause, Edit, Formula, Literal, Variable};
use std::collections::{BTreeMap, BTreeSet};

/// How much unit propagation to do per search step.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Propagation {
    /// One pass: units created by the pass are propagated on the next search step.
    SinglePass,
    /// Repeat the pass until no new unit clause appears.
    Fixpoint,
}

impl Default for Propagation {
    fn default() -> Self {
        Propagation::SinglePass
    }
}

/// One round of unit propagation. Multi-literal clauses satisfied by a unit literal are dropped;
/// the others lose every literal falsified by a unit literal (and may become unit or empty). Unit
/// clauses pass through unchanged.
pub fn propagate_units(formula: &Formula) -> Formula {
    let units = formula.unit_literals();
    if units.is_empty() {
        return formula.clone();
    }

    let (mut dropped, mut reduced) = (0, 0);
    let propagated = formula.edit(|clause| {
        if clause.len() <= 1 {
            Edit::Keep
        } else if clause.literals().any(|l| units.contains(l)) {
            dropped += 1;
            Edit::Drop
        } else if clause.literals().any(|l| units.contains(&l.negated())) {
            reduced += 1;
            Edit::Replace(Clause::new(clause.literals().filter(|l| !units.contains(&l.negated())).copied()))
        } else {
            Edit::Keep
        }
    });

    log::trace!("unit propagation: {} units, {} dropped, {} reduced", units.len(), dropped, reduced);
    propagated
}

/// Unit propagation repeated until the set of unit literals stops growing or a clause empties.
pub fn propagate_to_fixpoint(formula: &Formula) -> Formula {
    let mut current = propagate_units(formula);
    loop {
        if current.has_empty_clause() {
            return current;
        }
        let units = current.unit_literals().len();
        let next = propagate_units(&current);
        if next.unit_literals().len() == units && next.len() == current.len() {
            return next;
        }
        current = next;
    }
}

pub fn propagate(formula: &Formula, propagation: Propagation) -> Formula {
    match propagation {
        Propagation::SinglePass => propagate_units(formula),
        Propagation::Fixpoint => propagate_to_fixpoint(formula),
    }
}

/// Literals whose variable occurs with a single polarity in `formula`, in ascending order.
pub fn pure_literals(formula: &Formula) -> BTreeSet<Literal> {
    // (seen positive, seen negative)
    let mut polarity: BTreeMap<Variable, (bool, bool)> = BTreeMap::new();
    for literal in formula.clauses().flat_map(|c| c.literals()) {
        let seen = polarity.entry(*literal.variable()).or_insert((false, false));
        if literal.is_positive() {
            seen.0 = true;
        } else {
            seen.1 = true;
        }
    }

    polarity
        .into_iter()
        .filter_map(|(v, seen)| match seen {
            (true, false) => Some(Literal::Positive(v)),
            (false, true) => Some(Literal::Negative(v)),
            _ => None,
        })
        .collect()
}

/// Drops every clause containing a pure literal, then asserts each pure literal as a unit clause.
/// A pure literal that already has a unit clause keeps its first one rather than getting a fresh
/// copy; duplicates of it are dropped.
pub fn eliminate_pure_literals(formula: &Formula) -> Formula {
    let pure = pure_literals(formula);
    if pure.is_empty() {
        return formula.clone();
    }

    let mut asserted = BTreeSet::new();
    let eliminated = formula.edit(|clause| match clause.unit_literal() {
        Some(l) if pure.contains(l) => {
            if asserted.insert(*l) {
                Edit::Keep
            } else {
                Edit::Drop
            }
        }
        _ if clause.literals().any(|l| pure.contains(l)) => Edit::Drop,
        _ => Edit::Keep,
    });

    log::trace!("pure literal elimination: {} pure, {} already asserted", pure.len(), asserted.len());
    pure.difference(&asserted).fold(eliminated, |f, l| f.with_unit(*l))
}
