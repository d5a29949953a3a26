//! Minimal term model: atoms, variables, and compounds over a fixed operator
//! set. Only as much term algebra as link building and query answering need.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::TermError;

/// Name of the placeholder atom used inside images.
pub const PLACEHOLDER: &str = "_";

/// Prefix marking an atom as an executable operator.
pub const OPERATOR_PREFIX: char = '^';

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    Inheritance,
    Similarity,
    Implication,
    Equivalence,
    Conjunction,
    Disjunction,
    Negation,
    Product,
    ImageExt,
    ImageInt,
    SetExt,
    SetInt,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Inheritance => "-->",
            Self::Similarity => "<->",
            Self::Implication => "==>",
            Self::Equivalence => "<=>",
            Self::Conjunction => "&&",
            Self::Disjunction => "||",
            Self::Negation => "--",
            Self::Product => "*",
            Self::ImageExt => "/",
            Self::ImageInt => "\\",
            Self::SetExt => "{}",
            Self::SetInt => "[]",
        }
    }

    pub fn is_statement(self) -> bool {
        matches!(
            self,
            Self::Inheritance | Self::Similarity | Self::Implication | Self::Equivalence
        )
    }

    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            Self::Similarity
                | Self::Equivalence
                | Self::Conjunction
                | Self::Disjunction
                | Self::SetExt
                | Self::SetInt
        )
    }

    pub fn is_image(self) -> bool {
        matches!(self, Self::ImageExt | Self::ImageInt)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VarKind {
    Independent,
    Dependent,
    Query,
}

impl VarKind {
    pub fn prefix(self) -> char {
        match self {
            Self::Independent => '$',
            Self::Dependent => '#',
            Self::Query => '?',
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    pub kind: VarKind,
    pub name: Arc<str>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Compound {
    op: Operator,
    components: Vec<Term>,
    complexity: u32,
    constant: bool,
}

impl Compound {
    pub fn op(&self) -> Operator {
        self.op
    }

    pub fn components(&self) -> &[Term] {
        &self.components
    }
}

/// Query variable bindings produced by [`Term::unify_query`].
pub type Bindings = BTreeMap<Variable, Term>;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Atom(Arc<str>),
    Variable(Variable),
    Compound(Arc<Compound>),
}

impl Term {
    pub fn atom(name: &str) -> Term {
        Term::Atom(Arc::from(name))
    }

    pub fn variable(kind: VarKind, name: &str) -> Term {
        Term::Variable(Variable {
            kind,
            name: Arc::from(name),
        })
    }

    /// Atom or variable from a bare name: `?x`, `$x`, `#x` are variables.
    pub fn named(name: &str) -> Result<Term, TermError> {
        let mut chars = name.chars();
        let kind = match chars.next() {
            None => return Err(TermError::EmptyName),
            Some('?') => VarKind::Query,
            Some('$') => VarKind::Independent,
            Some('#') => VarKind::Dependent,
            Some(_) => return Ok(Term::atom(name)),
        };
        let rest = chars.as_str();
        if rest.is_empty() {
            return Err(TermError::EmptyName);
        }
        Ok(Term::variable(kind, rest))
    }

    pub fn placeholder() -> Term {
        Term::atom(PLACEHOLDER)
    }

    /// Build a compound, validating arity and normalizing commutative
    /// operators (sorted, deduplicated) and double negation.
    pub fn compound(op: Operator, mut components: Vec<Term>) -> Result<Term, TermError> {
        let found = components.len();
        match op {
            _ if op.is_statement() => {
                if found != 2 {
                    return Err(TermError::Arity {
                        op,
                        expected: "exactly 2",
                        found,
                    });
                }
                if components[0] == components[1] {
                    return Err(TermError::InvalidStatement(format!(
                        "subject equals predicate: {}",
                        components[0]
                    )));
                }
            }
            Operator::Negation => {
                if found != 1 {
                    return Err(TermError::Arity {
                        op,
                        expected: "exactly 1",
                        found,
                    });
                }
                if let Term::Compound(c) = &components[0]
                    && c.op == Operator::Negation
                {
                    return Ok(c.components[0].clone());
                }
            }
            Operator::Conjunction | Operator::Disjunction => {
                if found < 2 {
                    return Err(TermError::Arity {
                        op,
                        expected: "at least 2",
                        found,
                    });
                }
            }
            Operator::ImageExt | Operator::ImageInt => {
                if found < 2 {
                    return Err(TermError::Arity {
                        op,
                        expected: "at least 2",
                        found,
                    });
                }
                if components.iter().filter(|t| t.is_placeholder()).count() != 1 {
                    return Err(TermError::InvalidStatement(
                        "image requires exactly one placeholder".to_string(),
                    ));
                }
            }
            _ => {
                if found < 1 {
                    return Err(TermError::Arity {
                        op,
                        expected: "at least 1",
                        found,
                    });
                }
            }
        }

        if op.is_commutative() {
            components.sort();
            components.dedup();
            if components.len() == 1 && matches!(op, Operator::Conjunction | Operator::Disjunction) {
                return Ok(components.remove(0));
            }
        }

        let complexity = 1 + components.iter().map(Term::complexity).sum::<u32>();
        let constant = components.iter().all(Term::is_constant);
        Ok(Term::Compound(Arc::new(Compound {
            op,
            components,
            complexity,
            constant,
        })))
    }

    pub fn inheritance(subject: Term, predicate: Term) -> Result<Term, TermError> {
        Self::compound(Operator::Inheritance, vec![subject, predicate])
    }

    pub fn similarity(a: Term, b: Term) -> Result<Term, TermError> {
        Self::compound(Operator::Similarity, vec![a, b])
    }

    pub fn implication(condition: Term, consequence: Term) -> Result<Term, TermError> {
        Self::compound(Operator::Implication, vec![condition, consequence])
    }

    pub fn equivalence(a: Term, b: Term) -> Result<Term, TermError> {
        Self::compound(Operator::Equivalence, vec![a, b])
    }

    pub fn conjunction(components: Vec<Term>) -> Result<Term, TermError> {
        Self::compound(Operator::Conjunction, components)
    }

    pub fn disjunction(components: Vec<Term>) -> Result<Term, TermError> {
        Self::compound(Operator::Disjunction, components)
    }

    pub fn negation(term: Term) -> Result<Term, TermError> {
        Self::compound(Operator::Negation, vec![term])
    }

    pub fn product(components: Vec<Term>) -> Result<Term, TermError> {
        Self::compound(Operator::Product, components)
    }

    /// `<(*, args..) --> ^name>`
    pub fn operation(name: &str, args: Vec<Term>) -> Result<Term, TermError> {
        let op = if name.starts_with(OPERATOR_PREFIX) {
            Term::atom(name)
        } else {
            Term::atom(&format!("{OPERATOR_PREFIX}{name}"))
        };
        Self::inheritance(Self::product(args)?, op)
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, Term::Compound(_))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Term::Atom(name) if &**name == PLACEHOLDER)
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Term::Compound(c) => Some(c),
            _ => None,
        }
    }

    pub fn operator(&self) -> Option<Operator> {
        self.as_compound().map(Compound::op)
    }

    pub fn components(&self) -> &[Term] {
        match self {
            Term::Compound(c) => &c.components,
            _ => &[],
        }
    }

    pub fn is_statement(&self) -> bool {
        self.operator().is_some_and(Operator::is_statement)
    }

    /// Syntactic complexity: atoms count 1, variables 0, compounds 1 plus
    /// their components.
    pub fn complexity(&self) -> u32 {
        match self {
            Term::Atom(_) => 1,
            Term::Variable(_) => 0,
            Term::Compound(c) => c.complexity,
        }
    }

    /// Contains no variables at any depth.
    pub fn is_constant(&self) -> bool {
        match self {
            Term::Atom(_) => true,
            Term::Variable(_) => false,
            Term::Compound(c) => c.constant,
        }
    }

    pub fn has_query_var(&self) -> bool {
        match self {
            Term::Variable(v) => v.kind == VarKind::Query,
            Term::Atom(_) => false,
            Term::Compound(c) => c.components.iter().any(Term::has_query_var),
        }
    }

    /// Operator name and arguments when this term is `<(*, args..) --> ^op>`.
    pub fn as_operation(&self) -> Option<(&str, &[Term])> {
        let c = self.as_compound()?;
        if c.op != Operator::Inheritance {
            return None;
        }
        let args = c.components[0].as_compound()?;
        if args.op != Operator::Product {
            return None;
        }
        match &c.components[1] {
            Term::Atom(name) if name.starts_with(OPERATOR_PREFIX) => {
                Some((&**name, args.components.as_slice()))
            }
            _ => None,
        }
    }

    /// Match `self` (which may contain query variables) against `other`.
    /// Query variables bind to the corresponding subterm of `other`;
    /// everything else must be equal. Returns `None` on mismatch.
    pub fn unify_query(&self, other: &Term) -> Option<Bindings> {
        let mut bindings = Bindings::new();
        unify_into(self, other, &mut bindings).then_some(bindings)
    }
}

fn unify_into(pattern: &Term, target: &Term, bindings: &mut Bindings) -> bool {
    match (pattern, target) {
        (Term::Variable(v), _) if v.kind == VarKind::Query => match bindings.get(v) {
            Some(bound) => bound == target,
            None => {
                bindings.insert(v.clone(), target.clone());
                true
            }
        },
        (Term::Compound(a), Term::Compound(b)) => {
            if Arc::ptr_eq(a, b) {
                return true;
            }
            a.op == b.op
                && a.components.len() == b.components.len()
                && a.components
                    .iter()
                    .zip(&b.components)
                    .all(|(x, y)| unify_into(x, y, bindings))
        }
        _ => pattern == target,
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Term]) -> fmt::Result {
    for (i, t) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{t}")?;
    }
    Ok(())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atom(name) => f.write_str(name),
            Term::Variable(v) => write!(f, "{}{}", v.kind.prefix(), v.name),
            Term::Compound(c) => {
                match c.op {
                    op if op.is_statement() => write!(
                        f,
                        "<{} {} {}>",
                        c.components[0],
                        op.symbol(),
                        c.components[1]
                    ),
                    Operator::SetExt => {
                        f.write_str("{")?;
                        write_joined(f, &c.components)?;
                        f.write_str("}")
                    }
                    Operator::SetInt => {
                        f.write_str("[")?;
                        write_joined(f, &c.components)?;
                        f.write_str("]")
                    }
                    op => {
                        write!(f, "({},", op.symbol())?;
                        write_joined(f, &c.components)?;
                        f.write_str(")")
                    }
                }
            }
        }
    }
}
