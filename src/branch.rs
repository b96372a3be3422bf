use crate::formula::{Formula, Literal};
use std::collections::BTreeSet;

/// Picks the literal to split on next.
///
/// Prefers the smallest literal of `original` that still occurs in a clause with more than one
/// literal. If no such clause is left, falls back to the first variable of `original` that no unit
/// clause pins yet, so that variables which dropped out of the formula still get a value.
pub fn select_literal(original: &BTreeSet<Literal>, formula: &Formula) -> Option<Literal> {
    let open = formula
        .clauses()
        .filter(|c| c.len() > 1)
        .flat_map(|c| c.literals())
        .filter(|l| original.contains(*l))
        .min()
        .copied();
    if open.is_some() {
        return open;
    }

    let pinned: BTreeSet<_> = formula.unit_literals().iter().map(|l| *l.variable()).collect();
    original
        .iter()
        .map(|l| *l.variable())
        .find(|v| !pinned.contains(v))
        .map(Literal::Positive)
}
