pub mod branch;
pub mod formula;
pub mod model;
pub mod simplify;
mod solver;

#[cfg(test)]
mod brute_force;

pub use formula::{Clause, Formula, Literal, ParseError, Variable};
pub use model::Model;
pub use simplify::Propagation;
pub use solver::{Solver, SolverConfig, Stats};

#[derive(PartialEq, Clone, Debug)]
pub enum SatResult {
    Satisfiable(Model),
    Unsatisfiable,
    /// The search was interrupted before reaching a verdict.
    Unknown,
}

impl SatResult {
    pub fn is_sat(&self) -> bool {
        matches!(self, SatResult::Satisfiable(_))
    }

    pub fn status(&self) -> &'static str {
        match self {
            SatResult::Satisfiable(_) => "sat",
            SatResult::Unsatisfiable => "unsat",
            SatResult::Unknown => "unknown",
        }
    }
}

/// Parses the line format and solves it with the default configuration.
pub fn solve_str(input: &str) -> Result<SatResult, ParseError> {
    let formula = formula::lines::parse(input.as_bytes())?;
    Ok(Solver::new(formula).solve())
}
