use crate::formula::{Clause, Formula, Literal, ParseError, Variable};
use std::io::{BufRead, BufReader, Read};

pub fn parse<R: Read>(reader: R) -> Result<Formula, ParseError> {
    let reader = BufReader::new(reader);

    let mut clauses = vec![];
    let mut clause = vec![];
    let mut num_clauses = None;

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        let mut line = line.split_whitespace().peekable();

        match line.peek() {
            Some(&"c") | None => continue,
            Some(&"%") => break,
            Some(&"p") => {
                let _ = line.next();

                if line.next() != Some("cnf") {
                    return Err(ParseError::format(line_no, "missing 'cnf'"));
                }

                let _num_variables = line
                    .next()
                    .and_then(|c| c.parse::<usize>().ok())
                    .ok_or_else(|| ParseError::format(line_no, "invalid num_variables"))?;

                num_clauses = Some(
                    line.next()
                        .and_then(|c| c.parse::<usize>().ok())
                        .ok_or_else(|| ParseError::format(line_no, "invalid num_clauses"))?,
                );
            }
            Some(_) => {
                if num_clauses.is_none() {
                    return Err(ParseError::format(line_no, "missing 'p' line before clauses"));
                }

                // clauses may span lines; `0` terminates one
                for x in line {
                    match parse_literal(x).map_err(|m| ParseError::format(line_no, m))? {
                        Some(l) => clause.push(l),
                        None => clauses.push(Clause::new(clause.drain(..))),
                    }
                }
            }
        }
    }

    let num_clauses = num_clauses.ok_or(ParseError::MissingHeader)?;
    if !clause.is_empty() {
        clauses.push(Clause::new(clause));
    }
    if clauses.len() != num_clauses {
        log::warn!("header declares {} clauses, found {}", num_clauses, clauses.len());
    }

    Ok(Formula::new(clauses))
}

fn parse_literal(s: &str) -> Result<Option<Literal>, String> {
    let l = s.parse::<isize>().map_err(|_| format!("invalid literal '{}'", s))?;
    if l > 0 {
        Ok(Some(Literal::Positive(Variable(l as usize))))
    } else if l < 0 {
        Ok(Some(Literal::Negative(Variable(l.unsigned_abs()))))
    } else {
        Ok(None)
    }
}
