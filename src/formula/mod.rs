pub mod dimacs;
pub mod lines;

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

#[derive(Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, Debug)]
pub struct Variable(pub usize);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Literal {
    Positive(Variable),
    Negative(Variable),
}

impl Literal {
    pub fn new(positive: bool, variable: Variable) -> Self {
        if positive {
            Literal::Positive(variable)
        } else {
            Literal::Negative(variable)
        }
    }

    pub fn variable(&self) -> &Variable {
        match self {
            Literal::Positive(v) => v,
            Literal::Negative(v) => v,
        }
    }

    pub fn is_positive(&self) -> bool {
        match self {
            Literal::Positive(_) => true,
            Literal::Negative(_) => false,
        }
    }

    pub fn idx(&self) -> usize {
        self.variable().0
    }

    pub fn negated(&self) -> Self {
        match self {
            Literal::Positive(v) => Literal::Negative(*v),
            Literal::Negative(v) => Literal::Positive(*v),
        }
    }

    /// Same variable, opposite polarity.
    pub fn is_complement_of(&self, other: &Literal) -> bool {
        self.variable() == other.variable() && self.is_positive() != other.is_positive()
    }

    pub fn equals_any<'a>(&self, literals: impl IntoIterator<Item = &'a Literal>) -> bool {
        literals.into_iter().any(|l| l == self)
    }

    pub fn complements_any<'a>(&self, literals: impl IntoIterator<Item = &'a Literal>) -> bool {
        literals.into_iter().any(|l| self.is_complement_of(l))
    }
}

// Ascending variable, positive before negative. Branch choice and output order depend on this.
impl Ord for Literal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.variable()
            .cmp(other.variable())
            .then_with(|| other.is_positive().cmp(&self.is_positive()))
    }
}

impl PartialOrd for Literal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Literal::Positive(Variable(x)) => write!(f, "{}", x),
            Literal::Negative(Variable(x)) => write!(f, "-{}", x),
        }
    }
}

/// A disjunction of literals. Duplicates are dropped and the literals are kept sorted; a clause
/// holding both polarities of a variable is stored as-is.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Clause {
    literals: Vec<Literal>,
}

impl Clause {
    pub fn new(disjuncts: impl IntoIterator<Item = Literal>) -> Self {
        let mut literals: Vec<Literal> = disjuncts.into_iter().collect();
        literals.sort();
        literals.dedup();
        Self { literals }
    }

    pub fn unit(literal: Literal) -> Self {
        Self {
            literals: vec![literal],
        }
    }

    pub fn literals(&self) -> impl Iterator<Item = &Literal> {
        self.literals.iter()
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn is_unit(&self) -> bool {
        self.literals.len() == 1
    }

    pub fn unit_literal(&self) -> Option<&Literal> {
        match self.literals.as_slice() {
            [l] => Some(l),
            _ => None,
        }
    }

    pub fn contains(&self, literal: &Literal) -> bool {
        self.literals.binary_search(literal).is_ok()
    }

    pub fn variables(&self) -> BTreeSet<Variable> {
        self.literals.iter().map(|l| *l.variable()).collect()
    }
}

impl Display for Clause {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.literals.len() != 1 {
            f.write_str("(")?;
        }
        let mut first_literal = true;
        for literal in &self.literals {
            if first_literal {
                first_literal = false;
            } else {
                f.write_str(" | ")?;
            }
            write!(f, "{}", literal)?;
        }
        if self.literals.len() != 1 {
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// A conjunction of clauses, stored as a persistent binary tree of clause slots. Every snapshot the
/// solver builds shares all untouched subtrees with the one it came from: adding a clause or
/// rewriting a few of them allocates one path per change, never a copy of the formula.
#[derive(Clone, Debug)]
pub struct Formula {
    root: Rc<Node>,
    // the tree has `1 << height` slots, the first `slots` of which have been handed out
    height: u32,
    slots: usize,
}

#[derive(Debug)]
enum Node {
    Empty,
    Leaf(Rc<Clause>),
    Branch { len: usize, left: Rc<Node>, right: Rc<Node> },
}

/// What [`Formula::edit`] does with one clause.
pub(crate) enum Edit {
    Keep,
    Drop,
    Replace(Clause),
}

impl Node {
    fn len(&self) -> usize {
        match self {
            Node::Empty => 0,
            Node::Leaf(_) => 1,
            Node::Branch { len, .. } => *len,
        }
    }
}

#[cfg(test)]
thread_local! {
    // (live, peak) node counts, for the memory tests
    pub(crate) static NODES: std::cell::Cell<(usize, usize)> = std::cell::Cell::new((0, 0));
}

#[cfg(test)]
impl Drop for Node {
    fn drop(&mut self) {
        NODES.with(|n| {
            let (live, peak) = n.get();
            n.set((live - 1, peak));
        });
    }
}

fn node(node: Node) -> Rc<Node> {
    #[cfg(test)]
    NODES.with(|n| {
        let (live, peak) = n.get();
        n.set((live + 1, peak.max(live + 1)));
    });
    Rc::new(node)
}

fn empty() -> Rc<Node> {
    node(Node::Empty)
}

fn branch(left: Rc<Node>, right: Rc<Node>) -> Rc<Node> {
    let len = left.len() + right.len();
    if len == 0 {
        empty()
    } else {
        node(Node::Branch { len, left, right })
    }
}

fn build(clauses: &[Rc<Clause>], height: u32) -> Rc<Node> {
    match clauses {
        [] => empty(),
        [clause] if height == 0 => node(Node::Leaf(Rc::clone(clause))),
        _ => {
            let half = 1usize << (height - 1);
            let (left, right) = clauses.split_at(half.min(clauses.len()));
            branch(build(left, height - 1), build(right, height - 1))
        }
    }
}

fn insert(at: &Rc<Node>, height: u32, index: usize, leaf: Rc<Node>) -> Rc<Node> {
    if height == 0 {
        return leaf;
    }
    let half = 1usize << (height - 1);
    let (left, right) = match at.as_ref() {
        Node::Branch { left, right, .. } => (Rc::clone(left), Rc::clone(right)),
        _ => (Rc::clone(at), Rc::clone(at)),
    };
    if index < half {
        branch(insert(&left, height - 1, index, leaf), right)
    } else {
        branch(left, insert(&right, height - 1, index - half, leaf))
    }
}

fn edit_node<F: FnMut(&Rc<Clause>) -> Edit>(at: &Rc<Node>, f: &mut F) -> Rc<Node> {
    match at.as_ref() {
        Node::Empty => Rc::clone(at),
        Node::Leaf(clause) => match f(clause) {
            Edit::Keep => Rc::clone(at),
            Edit::Drop => empty(),
            Edit::Replace(clause) => node(Node::Leaf(Rc::new(clause))),
        },
        Node::Branch { left, right, .. } => {
            let new_left = edit_node(left, f);
            let new_right = edit_node(right, f);
            if Rc::ptr_eq(&new_left, left) && Rc::ptr_eq(&new_right, right) {
                Rc::clone(at)
            } else {
                branch(new_left, new_right)
            }
        }
    }
}

pub(crate) struct SharedClauses<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for SharedClauses<'a> {
    type Item = &'a Rc<Clause>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(at) = self.stack.pop() {
            match at {
                Node::Empty => {}
                Node::Leaf(clause) => return Some(clause),
                Node::Branch { left, right, .. } => {
                    self.stack.push(right);
                    self.stack.push(left);
                }
            }
        }
        None
    }
}

impl Formula {
    pub fn new(conjuncts: impl IntoIterator<Item = Clause>) -> Self {
        let clauses: Vec<Rc<Clause>> = conjuncts.into_iter().map(Rc::new).collect();
        let mut height = 0;
        while (1usize << height) < clauses.len() {
            height += 1;
        }
        Self {
            root: build(&clauses, height),
            height,
            slots: clauses.len(),
        }
    }

    pub fn clauses(&self) -> impl Iterator<Item = &Clause> {
        self.shared_clauses().map(|c| c.as_ref())
    }

    pub(crate) fn shared_clauses(&self) -> SharedClauses<'_> {
        SharedClauses {
            stack: vec![self.root.as_ref()],
        }
    }

    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A new snapshot holding every clause of `self` plus the unit clause `literal`, appended last.
    pub fn with_unit(&self, literal: Literal) -> Self {
        let (mut root, mut height) = (Rc::clone(&self.root), self.height);
        if self.slots == 1 << height {
            root = branch(root, empty());
            height += 1;
        }
        let leaf = node(Node::Leaf(Rc::new(Clause::unit(literal))));
        Self {
            root: insert(&root, height, self.slots, leaf),
            height,
            slots: self.slots + 1,
        }
    }

    /// Rewrites clauses in place, keeping their order. Subtrees in which every clause is kept are
    /// shared with `self`.
    pub(crate) fn edit<F: FnMut(&Rc<Clause>) -> Edit>(&self, mut f: F) -> Self {
        Self {
            root: edit_node(&self.root, &mut f),
            height: self.height,
            slots: self.slots,
        }
    }

    /// Number of tree nodes `self` holds that `other` does not share.
    #[cfg(test)]
    pub(crate) fn unshared_nodes(&self, other: &Formula) -> usize {
        use std::collections::HashSet;

        fn collect(at: &Rc<Node>, seen: &mut HashSet<*const Node>) {
            seen.insert(Rc::as_ptr(at));
            if let Node::Branch { left, right, .. } = at.as_ref() {
                collect(left, seen);
                collect(right, seen);
            }
        }
        fn count(at: &Rc<Node>, theirs: &HashSet<*const Node>) -> usize {
            if theirs.contains(&Rc::as_ptr(at)) {
                return 0;
            }
            match at.as_ref() {
                Node::Branch { left, right, .. } => 1 + count(left, theirs) + count(right, theirs),
                _ => 1,
            }
        }
        let mut theirs = HashSet::new();
        collect(&other.root, &mut theirs);
        count(&self.root, &theirs)
    }

    pub fn variables(&self) -> BTreeSet<Variable> {
        self.clauses().flat_map(|c| c.literals().map(|l| *l.variable())).collect()
    }

    pub fn literals(&self) -> BTreeSet<Literal> {
        self.clauses().flat_map(|c| c.literals().copied()).collect()
    }

    pub fn unit_literals(&self) -> BTreeSet<Literal> {
        self.clauses().filter_map(|c| c.unit_literal()).copied().collect()
    }

    pub fn has_empty_clause(&self) -> bool {
        self.clauses().any(|c| c.is_empty())
    }

    pub fn all_unit(&self) -> bool {
        self.clauses().all(|c| c.is_unit())
    }
}

impl Default for Formula {
    fn default() -> Self {
        Formula::new(Vec::new())
    }
}

impl Display for Formula {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let mut first_clause = true;
        for clause in self.clauses() {
            if first_clause {
                first_clause = false;
            } else {
                f.write_str(" & ")?;
            }
            write!(f, "{}", clause)?;
        }
        Ok(())
    }
}

/// Errors from the input parsers.
#[derive(Debug)]
pub enum ParseError {
    Io(std::io::Error),
    Format { line: usize, message: String },
    /// DIMACS input that ends without a `p cnf` header.
    MissingHeader,
}

impl ParseError {
    pub(crate) fn format(line: usize, message: impl Into<String>) -> Self {
        Self::Format {
            line,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ParseError::Io(e) => write!(f, "i/o error: {}", e),
            ParseError::Format { line, message } => write!(f, "line {}: {}", line, message),
            ParseError::MissingHeader => f.write_str("missing 'p cnf' header"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Io(e) => Some(e),
            ParseError::Format { .. } | ParseError::MissingHeader => None,
        }
    }
}

#[cfg(test)]
pub(crate) fn p(x: usize) -> Literal {
    Literal::Positive(Variable(x))
}

#[cfg(test)]
pub(crate) fn n(x: usize) -> Literal {
    Literal::Negative(Variable(x))
}

/// Random 3-SAT formulas over variables `1..=8`, small enough for the brute-force checker.
#[cfg(test)]
pub(crate) fn formula_3sat_strategy() -> impl proptest::strategy::Strategy<Value = Formula> {
    use proptest::prelude::*;

    let literal = (1usize..=8, any::<bool>()).prop_map(|(v, positive)| Literal::new(positive, Variable(v)));
    let clause = proptest::collection::vec(literal, 1..=3).prop_map(|literals| Clause::new(literals));
    proptest::collection::vec(clause, 1..24).prop_map(|clauses| Formula::new(clauses))
}
