//! The plain line format: one clause per line, literals as signed integers separated by spaces.
//! A blank line is an empty clause.

use crate::formula::{Clause, Formula, Literal, ParseError, Variable};
use std::io::{BufRead, BufReader, Read};

pub fn parse<R: Read>(reader: R) -> Result<Formula, ParseError> {
    let reader = BufReader::new(reader);

    let mut clauses = vec![];
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let clause = line
            .split_whitespace()
            .map(|token| parse_literal(token).map_err(|message| ParseError::format(i + 1, message)))
            .collect::<Result<Vec<_>, _>>()?;
        clauses.push(Clause::new(clause));
    }

    log::debug!("parsed {} clauses", clauses.len());
    Ok(Formula::new(clauses))
}

fn parse_literal(token: &str) -> Result<Literal, String> {
    let (positive, digits) = match token.strip_prefix('-') {
        Some(rest) => (false, rest),
        None => (true, token),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid literal '{}'", token));
    }
    let id = digits
        .parse::<usize>()
        .map_err(|_| format!("variable id out of range in '{}'", token))?;
    if id == 0 {
        return Err(format!("variable ids start at 1, got '{}'", token));
    }
    Ok(Literal::new(positive, Variable(id)))
}
