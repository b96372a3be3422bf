use crate::formula::{Formula, Literal, Variable};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// A satisfying assignment, ordered by variable.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Model {
    values: BTreeMap<Variable, bool>,
}

impl Model {
    /// Reads every unit clause of a decided formula into an assignment. The search only returns
    /// formulas in which each variable is pinned by a single polarity, so no entry is overwritten
    /// with the opposite value.
    pub fn extract(formula: &Formula) -> Self {
        let mut values = BTreeMap::new();
        for literal in formula.clauses().filter_map(|c| c.unit_literal()) {
            let previous = values.insert(*literal.variable(), literal.is_positive());
            debug_assert!(
                previous.map_or(true, |v| v == literal.is_positive()),
                "contradictory unit clauses for {:?}",
                literal.variable()
            );
        }
        Self { values }
    }

    pub fn value(&self, variable: Variable) -> Option<bool> {
        self.values.get(&variable).copied()
    }

    pub fn literal_value(&self, literal: &Literal) -> Option<bool> {
        self.value(*literal.variable()).map(|v| v == literal.is_positive())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Variable, bool)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True if every clause of `formula` has a literal this model makes true.
    pub fn satisfies(&self, formula: &Formula) -> bool {
        formula
            .clauses()
            .all(|clause| clause.literals().any(|l| self.literal_value(l) == Some(true)))
    }
}

/// Two lines: the variables assigned true, then the variables assigned false as negative literals.
impl Display for Model {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let line = |value: bool| {
            self.iter()
                .filter(|(_, v)| *v == value)
                .map(|(var, v)| Literal::new(v, var).to_string())
                .collect::<Vec<_>>()
                .join(" ")
        };
        writeln!(f, "{}", line(true))?;
        writeln!(f, "{}", line(false))
    }
}
