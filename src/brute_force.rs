use crate::*;

// Exhaustive reference solver for the property tests
pub(crate) fn solve_brute_force(f: &Formula) -> SatResult {
    let variables: Vec<Variable> = f.variables().into_iter().collect();
    assert!(variables.len() <= 15); // just for safety

    let value = |assignment: u32, i: usize| assignment & (1 << i) != 0;

    'search: for assignment in 0..2u32.pow(variables.len() as u32) {
        'clauses: for clause in f.clauses() {
            for literal in clause.literals() {
                // variables is sorted, so the position doubles as the bit index
                let i = variables.binary_search(literal.variable()).unwrap();
                if value(assignment, i) == literal.is_positive() {
                    // this clause is satisfied, let's go to the next one
                    continue 'clauses;
                }
            }
            // if we got here, this clause was not satisfied, so this assignment is bogus
            continue 'search;
        }
        // every clause was satisfied; turn the assignment into a model
        let units = variables
            .iter()
            .enumerate()
            .map(|(i, v)| Clause::unit(Literal::new(value(assignment, i), *v)));
        return SatResult::Satisfiable(Model::extract(&Formula::new(units)));
    }
    // no assignment is valid
    SatResult::Unsatisfiable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::{n, p};

    #[test]
    fn solve_bcp_sat() {
        let c1 = Clause::new(vec![p(1), p(2)]);
        let c2 = Clause::new(vec![n(1)]);
        let f = Formula::new(vec![c1, c2]);

        match solve_brute_force(&f) {
            SatResult::Satisfiable(model) => assert!(model.satisfies(&f)),
            r => panic!("expected sat, got {:?}", r),
        }
    }

    #[test]
    fn solve_bcp_unsat() {
        let c1 = Clause::new(vec![p(1), p(2)]);
        let c2 = Clause::new(vec![n(1)]);
        let c3 = Clause::new(vec![n(2)]);
        let f = Formula::new(vec![c1, c2, c3]);

        assert_eq!(solve_brute_force(&f), SatResult::Unsatisfiable);
    }

    #[test]
    fn empty_clause_unsat() {
        let f = Formula::new(vec![Clause::new(Vec::<Literal>::new())]);
        assert_eq!(solve_brute_force(&f), SatResult::Unsatisfiable);
    }
}
