use crate::branch::select_literal;
use crate::formula::{Formula, Literal, Variable};
use crate::model::Model;
use crate::simplify::{eliminate_pure_literals, propagate, Propagation};
use crate::SatResult;
use log::{debug, trace};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Debug, Default)]
pub struct SolverConfig {
    pub propagation: Propagation,
    /// Give up with [`SatResult::Unknown`] once this much time has passed.
    pub timeout: Option<Duration>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub calls: usize,
    pub decisions: usize,
    pub conflicts: usize,
    pub max_depth: usize,
}

pub struct Solver {
    formula: Formula,
    // Computed once from the input; every later snapshot is checked against these.
    literals: BTreeSet<Literal>,
    variables: BTreeSet<Variable>,
    config: SolverConfig,
    interrupt: Option<Arc<AtomicBool>>,
    stats: Stats,
}

#[derive(Debug)]
enum Outcome {
    Sat(Formula),
    Unsat,
    Interrupted,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
enum Decision {
    Conflict,
    Satisfied,
    Open,
}

struct Limits {
    deadline: Option<Instant>,
}

impl Solver {
    pub fn new(formula: Formula) -> Self {
        Self::with_config(formula, SolverConfig::default())
    }

    pub fn with_config(formula: Formula, config: SolverConfig) -> Self {
        let literals = formula.literals();
        let variables = literals.iter().map(|l| *l.variable()).collect();
        Self {
            formula,
            literals,
            variables,
            config,
            interrupt: None,
            stats: Stats::default(),
        }
    }

    /// Stop searching (with [`SatResult::Unknown`]) as soon as `flag` is set.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn solve(&mut self) -> SatResult {
        self.stats = Stats::default();
        let limits = Limits {
            deadline: self.config.timeout.map(|t| Instant::now() + t),
        };
        debug!(
            "solving {} clauses over {} variables ({:?})",
            self.formula.len(),
            self.variables.len(),
            self.config.propagation
        );

        let result = match self.dpll(self.formula.clone(), &limits, 0) {
            Outcome::Sat(formula) => SatResult::Satisfiable(Model::extract(&formula)),
            Outcome::Unsat => SatResult::Unsatisfiable,
            Outcome::Interrupted => SatResult::Unknown,
        };
        debug!("{} after {:?}", result.status(), self.stats);
        result
    }

    fn interrupted(&self, limits: &Limits) -> bool {
        if let Some(flag) = &self.interrupt {
            if flag.load(Ordering::Relaxed) {
                return true;
            }
        }
        limits.deadline.map_or(false, |d| Instant::now() >= d)
    }

    fn dpll(&mut self, formula: Formula, limits: &Limits, depth: usize) -> Outcome {
        self.stats.calls += 1;
        self.stats.max_depth = self.stats.max_depth.max(depth);
        if self.interrupted(limits) {
            debug!("interrupted at depth {}", depth);
            return Outcome::Interrupted;
        }

        let formula = self.simplify(formula);
        trace!("depth {}: {}", depth, formula);

        if formula.has_empty_clause() {
            trace!("conflict: empty clause at depth {}", depth);
            self.stats.conflicts += 1;
            return Outcome::Unsat;
        }

        match self.decide(&formula) {
            Decision::Conflict => {
                trace!("conflict: contradictory units at depth {}", depth);
                self.stats.conflicts += 1;
                return Outcome::Unsat;
            }
            Decision::Satisfied => return Outcome::Sat(formula),
            Decision::Open => {}
        }

        let literal = match select_literal(&self.literals, &formula) {
            Some(literal) => literal,
            None => panic!("no branch candidate for undecided formula {}", formula),
        };
        let variable = *literal.variable();
        self.stats.decisions += 1;
        trace!("decision {} at depth {}", variable.0, depth);

        match self.dpll(formula.with_unit(Literal::Positive(variable)), limits, depth + 1) {
            Outcome::Unsat => {
                trace!("backtrack: -{} at depth {}", variable.0, depth);
                let negative = formula.with_unit(Literal::Negative(variable));
                drop(formula);
                self.dpll(negative, limits, depth + 1)
            }
            done => done,
        }
    }

    /// Propagation then pure-literal elimination. Takes the snapshot by value so that neither it
    /// nor the propagated intermediate outlives this step.
    fn simplify(&self, formula: Formula) -> Formula {
        let propagated = propagate(&formula, self.config.propagation);
        drop(formula);
        eliminate_pure_literals(&propagated)
    }

    /// Only a formula made entirely of unit clauses can be decided. It is a conflict if some
    /// variable is pinned both ways and a model if every variable is pinned exactly once; any
    /// variable left unpinned still needs a decision.
    fn decide(&self, formula: &Formula) -> Decision {
        if !formula.all_unit() {
            return Decision::Open;
        }

        let units = formula.unit_literals();
        let mut unpinned = false;
        for v in &self.variables {
            match (units.contains(&Literal::Positive(*v)), units.contains(&Literal::Negative(*v))) {
                (true, true) => return Decision::Conflict,
                (false, false) => unpinned = true,
                _ => {}
            }
        }

        if unpinned {
            Decision::Open
        } else {
            Decision::Satisfied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brute_force::solve_brute_force;
    use crate::formula::{formula_3sat_strategy, n, p, Clause};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use test_env_log::test;

    fn solve(clauses: Vec<Clause>) -> SatResult {
        Solver::new(Formula::new(clauses)).solve()
    }

    fn model(result: SatResult) -> Model {
        match result {
            SatResult::Satisfiable(model) => model,
            r => panic!("expected a model, got {:?}", r),
        }
    }

    #[test]
    fn unit_clause_forces_value() {
        let m = model(solve(vec![Clause::unit(p(1))]));
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![(Variable(1), true)]);
    }

    #[test]
    fn contradictory_units_unsat() {
        assert_eq!(solve(vec![Clause::unit(p(1)), Clause::unit(n(1))]), SatResult::Unsatisfiable);
    }

    #[test]
    fn empty_clause_unsat() {
        let empty = Clause::new(Vec::<Literal>::new());
        assert_eq!(solve(vec![Clause::new(vec![p(1), p(2)]), empty]), SatResult::Unsatisfiable);
    }

    #[test]
    fn empty_formula_sat() {
        assert!(model(solve(vec![])).is_empty());
    }

    #[test]
    fn all_sign_combinations_unsat() {
        let f = vec![
            Clause::new(vec![p(1), p(2)]),
            Clause::new(vec![n(1), p(2)]),
            Clause::new(vec![p(1), n(2)]),
            Clause::new(vec![n(1), n(2)]),
        ];
        assert_eq!(solve(f), SatResult::Unsatisfiable);
    }

    #[test]
    fn unit_then_implication() {
        let m = model(solve(vec![Clause::unit(p(1)), Clause::new(vec![n(1), p(2)])]));
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![(Variable(1), true), (Variable(2), true)]);
    }

    #[test]
    fn pure_literal_set_true() {
        let f = Formula::new(vec![
            Clause::new(vec![p(1), p(2)]),
            Clause::new(vec![p(1), n(2)]),
            Clause::new(vec![n(2), p(3)]),
        ]);
        let m = model(Solver::new(f.clone()).solve());
        assert_eq!(m.value(Variable(1)), Some(true));
        assert!(m.satisfies(&f));
    }

    #[test]
    fn tautology_still_assigned() {
        // the tautology keeps variable 2 in play even though it never constrains anything
        let f = Formula::new(vec![Clause::unit(n(1)), Clause::new(vec![p(2), n(2)])]);
        let m = model(Solver::new(f).solve());
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![(Variable(1), false), (Variable(2), true)]);
    }

    #[test]
    fn satisfied_clause_variable_still_assigned() {
        // (2 | -3) drops out as soon as 2 propagates; only the tautology keeps 3 in play
        let f = Formula::new(vec![Clause::unit(p(2)), Clause::new(vec![p(2), n(3)]), Clause::new(vec![n(3), p(3)])]);
        let m = model(Solver::new(f.clone()).solve());
        assert_eq!(m.len(), 2);
        assert!(m.satisfies(&f));
    }

    #[test]
    fn solve_bcp_unsat() {
        let c1 = Clause::new(vec![p(1), p(2)]);
        let c2 = Clause::new(vec![n(1)]);
        let c3 = Clause::new(vec![n(2)]);
        assert_eq!(solve(vec![c1, c2, c3]), SatResult::Unsatisfiable);
    }

    #[test]
    fn solve_conflict_sat() {
        let f = Formula::new(vec![
            Clause::new(vec![p(1), p(2), p(3)]),
            Clause::new(vec![n(1), n(2), p(3)]),
            Clause::new(vec![n(2), n(3)]),
        ]);
        let m = model(Solver::new(f.clone()).solve());
        assert!(m.satisfies(&f));
    }

    #[test]
    fn solve_needs_backtracking() {
        // 1 is tried true first and fails; 2 drops out with it and is decided afterwards
        let f = Formula::new(vec![
            Clause::new(vec![n(1), p(2)]),
            Clause::new(vec![n(1), n(2)]),
            Clause::new(vec![p(1), p(3)]),
            Clause::new(vec![p(1), n(3), p(4)]),
        ]);
        let mut solver = Solver::new(f.clone());
        let m = model(solver.solve());
        assert!(m.satisfies(&f));
        assert_eq!(m.value(Variable(1)), Some(false));
        assert!(solver.stats().conflicts > 0);
        assert!(solver.stats().decisions > 1);
    }

    #[test]
    fn fixpoint_propagation_agrees() {
        let f = Formula::new(vec![
            Clause::unit(n(1)),
            Clause::new(vec![p(1), p(2)]),
            Clause::new(vec![n(2), p(3)]),
            Clause::new(vec![n(3), n(4)]),
            Clause::new(vec![p(4), p(5), n(2)]),
        ]);
        let config = SolverConfig {
            propagation: Propagation::Fixpoint,
            ..SolverConfig::default()
        };
        let single = model(Solver::new(f.clone()).solve());
        let fixpoint = model(Solver::with_config(f.clone(), config).solve());
        assert!(single.satisfies(&f));
        assert!(fixpoint.satisfies(&f));
    }

    #[test]
    fn interrupt_flag_stops_search() {
        let flag = Arc::new(AtomicBool::new(true));
        let f = Formula::new(vec![Clause::new(vec![p(1), p(2)])]);
        let mut solver = Solver::new(f).with_interrupt(Arc::clone(&flag));
        assert_eq!(solver.solve(), SatResult::Unknown);
        assert_eq!(solver.stats().calls, 1);

        flag.store(false, Ordering::Relaxed);
        assert!(solver.solve().is_sat());
    }

    #[test]
    fn expired_timeout_is_unknown() {
        let config = SolverConfig {
            timeout: Some(Duration::from_secs(0)),
            ..SolverConfig::default()
        };
        let f = Formula::new(vec![Clause::unit(p(1))]);
        assert_eq!(Solver::with_config(f, config).solve(), SatResult::Unknown);
    }

    #[test]
    fn depth_bounded_by_variables() {
        let f = Formula::new((1..10).map(|i| Clause::new(vec![p(i), n(i + 1), p(i + 2)])));
        let mut solver = Solver::new(f.clone());
        assert!(model(solver.solve()).satisfies(&f));
        assert!(solver.stats().max_depth <= f.variables().len());
    }

    /// Peak number of live formula tree nodes while solving the chain
    /// `(i | i+1 | -(i+2))` for `i` in `1..=len`.
    fn chain_peak_nodes(len: usize) -> usize {
        use crate::formula::NODES;

        let start = NODES.with(|n| {
            let (live, _) = n.get();
            n.set((live, live));
            live
        });
        let f = Formula::new((1..=len).map(|i| Clause::new(vec![p(i), p(i + 1), n(i + 2)])));
        let mut solver = Solver::new(f);
        assert!(solver.solve().is_sat());
        assert!(solver.stats().max_depth > len / 8, "{:?}", solver.stats());
        drop(solver);
        NODES.with(|n| n.get().1) - start
    }

    #[test]
    fn memory_linear_in_chain_length() {
        let short = chain_peak_nodes(600);
        let long = chain_peak_nodes(1200);
        // one snapshot per level would make this quadratic: four times the nodes for twice the chain
        assert!(long < 3 * short, "peak {} nodes for 600 clauses, {} for 1200", short, long);
        assert!(long < 16 * 1200, "peak {} nodes for 1200 clauses", long);
    }

    #[test]
    fn random_3sat_smoke() {
        let mut rng = StdRng::seed_from_u64(0x5a7);
        for _ in 0..50 {
            let num_vars = rng.gen_range(3, 12);
            let num_clauses = rng.gen_range(1, 5 * num_vars);
            let f = Formula::new((0..num_clauses).map(|_| {
                Clause::new((0..3).map(|_| Literal::new(rng.gen(), Variable(rng.gen_range(1, num_vars + 1)))))
            }));
            let result = Solver::new(f.clone()).solve();
            assert_eq!(result.is_sat(), solve_brute_force(&f).is_sat(), "formula {}", f);
            if let SatResult::Satisfiable(m) = result {
                assert!(m.satisfies(&f), "formula {}", f);
            }
        }
    }

    proptest! {
        #[test]
        fn proptest_solve(f in formula_3sat_strategy()) {
            let brute_force = solve_brute_force(&f);
            let solver = Solver::new(f.clone()).solve();
            log::trace!("result = {:?}", solver);
            prop_assert_eq!(solver.is_sat(), brute_force.is_sat());
            if let SatResult::Satisfiable(m) = solver {
                prop_assert!(m.satisfies(&f));
                prop_assert_eq!(m.len(), f.variables().len());
            }
        }

        #[test]
        fn proptest_solve_fixpoint(f in formula_3sat_strategy()) {
            let config = SolverConfig { propagation: Propagation::Fixpoint, ..SolverConfig::default() };
            let solver = Solver::with_config(f.clone(), config).solve();
            prop_assert_eq!(solver.is_sat(), solve_brute_force(&f).is_sat());
            if let SatResult::Satisfiable(m) = solver {
                prop_assert!(m.satisfies(&f));
            }
        }

        #[test]
        fn proptest_pure_positive(f in formula_3sat_strategy()) {
            // force every occurrence of variable 1 positive
            let f = Formula::new(f.clauses().map(|c| {
                Clause::new(c.literals().map(|l| if l.idx() == 1 { p(1) } else { *l }))
            }));
            if let SatResult::Satisfiable(m) = Solver::new(f.clone()).solve() {
                prop_assert!(m.value(Variable(1)) != Some(false));
            }
        }
    }
}
