use thiserror::Error;

use crate::term::Operator;

/// Invalid compound construction. These indicate a bug in whoever builds the
/// term, not a runtime condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TermError {
    #[error("{op:?} requires {expected} component(s), got {found}")]
    Arity {
        op: Operator,
        expected: &'static str,
        found: usize,
    },
    #[error("invalid statement: {0}")]
    InvalidStatement(String),
    #[error("term name must not be empty")]
    EmptyName,
}

/// Rejected parameter set.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("{field} must be within [0, 1], got {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
}
