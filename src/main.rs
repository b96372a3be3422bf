use clap::{App, Arg};
use dpllsat::formula::{dimacs, lines};
use dpllsat::*;
use std::fs::File;
use std::io::Read;
use std::thread;
use std::time::Duration;

// The search recurses once per decision; leave room for long implication chains.
const SOLVER_STACK_SIZE: usize = 256 << 20;

fn main() {
    env_logger::init();

    let matches = App::new("dpllsat")
        .about("DPLL satisfiability solver")
        .arg(Arg::with_name("INPUT").help("input file, one clause per line (stdin if absent)").index(1))
        .arg(Arg::with_name("dimacs").long("dimacs").help("read DIMACS CNF instead of the line format"))
        .arg(
            Arg::with_name("fixpoint")
                .long("fixpoint")
                .help("propagate unit clauses to a fixpoint at every step"),
        )
        .arg(
            Arg::with_name("timeout")
                .long("timeout")
                .value_name("SECONDS")
                .takes_value(true)
                .validator(validate_timeout)
                .help("give up and report 'unknown' after this many seconds"),
        )
        .arg(Arg::with_name("verify").long("verify").help("check the model against the input before printing it"))
        .arg(Arg::with_name("stats").long("stats").help("print search statistics to stderr"))
        .get_matches();

    // already checked by `validate_timeout`
    let timeout = matches
        .value_of("timeout")
        .and_then(|s| s.parse::<f64>().ok())
        .map(Duration::from_secs_f64);
    let config = SolverConfig {
        propagation: if matches.is_present("fixpoint") {
            Propagation::Fixpoint
        } else {
            Propagation::SinglePass
        },
        timeout,
    };

    let run = Run {
        input: matches.value_of("INPUT").map(String::from),
        use_dimacs: matches.is_present("dimacs"),
        verify: matches.is_present("verify"),
        stats: matches.is_present("stats"),
        config,
    };

    let exit_code = thread::Builder::new()
        .name("solver".into())
        .stack_size(SOLVER_STACK_SIZE)
        .spawn(move || run.execute())
        .and_then(|handle| {
            handle
                .join()
                .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "solver thread panicked"))
        })
        .unwrap_or_else(|e| {
            eprintln!("error: {}", e);
            -1
        });
    std::process::exit(exit_code);
}

fn validate_timeout(value: String) -> Result<(), String> {
    match value.parse::<f64>() {
        Ok(secs) if secs >= 0.0 && secs.is_finite() => Ok(()),
        _ => Err(format!("'{}' is not a non-negative number of seconds", value)),
    }
}

/// Everything the solver thread needs from the command line.
struct Run {
    input: Option<String>,
    use_dimacs: bool,
    verify: bool,
    stats: bool,
    config: SolverConfig,
}

impl Run {
    fn execute(self) -> i32 {
        let f = match &self.input {
            Some(path) => parse_from_file(path, self.use_dimacs),
            None => parse(std::io::stdin(), self.use_dimacs),
        };
        let f = match f {
            Ok(f) => f,
            Err(e) => {
                eprintln!("parse error: {}", e);
                return -1;
            }
        };

        let mut solver = Solver::with_config(f.clone(), self.config);
        let result = solver.solve();
        if self.stats {
            eprintln!("{:?}", solver.stats());
        }

        match result {
            SatResult::Satisfiable(model) => {
                if self.verify && !model.satisfies(&f) {
                    eprintln!("internal error: model does not satisfy the input");
                    return -1;
                }
                print!("{}", model);
                0
            }
            SatResult::Unsatisfiable => {
                println!("unsat");
                1
            }
            SatResult::Unknown => {
                println!("unknown");
                2
            }
        }
    }
}

fn parse<R: Read>(reader: R, use_dimacs: bool) -> Result<Formula, ParseError> {
    if use_dimacs {
        dimacs::parse(reader)
    } else {
        lines::parse(reader)
    }
}

fn parse_from_file(path: &str, use_dimacs: bool) -> Result<Formula, ParseError> {
    let file = File::open(path)?;
    parse(file, use_dimacs)
}
