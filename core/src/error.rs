use crate::policy::{ArithmeticOperator, LogicalOperator, QueryOptionKind};
use odataql::{ast::FunctionName, OrderByError, ParseError};
use thiserror::Error;

/// A bound expression that the [`crate::policy::ValidationPolicy`] does not allow.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("query option {0} is not allowed")]
    QueryOptionNotAllowed(QueryOptionKind),
    #[error("logical operator '{0}' is not allowed")]
    LogicalOperatorNotAllowed(LogicalOperator),
    #[error("arithmetic operator '{0}' is not allowed")]
    ArithmeticOperatorNotAllowed(ArithmeticOperator),
    #[error("function '{0}' is not allowed")]
    FunctionNotAllowed(FunctionName),
    #[error("ordering by property '{0}' is not allowed")]
    OrderByPropertyNotAllowed(String),
    #[error("$skip {skip} exceeds the maximum of {max}")]
    SkipTooLarge { skip: u64, max: u64 },
    #[error("$top {top} exceeds the maximum of {max}")]
    TopTooLarge { top: u64, max: u64 },
    /// Raised by caller-supplied validators.
    #[error("{0}")]
    Custom(String),
}

/// A policy that was configured with out-of-range values.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("bits {bits:#x} are not valid {tag} flags")]
    UnknownFlags { tag: &'static str, bits: u64 },
    #[error("{name} must not be negative, got {value}")]
    NegativeBound { name: &'static str, value: i64 },
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("order by error: {0}")]
    OrderBy(#[from] OrderByError),
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{option} must be a non-negative integer, got '{value}'")]
    InvalidPaging { option: QueryOptionKind, value: String },
    #[error("query option {0} is specified more than once")]
    DuplicateOption(QueryOptionKind),
    #[error("query option {0} is empty")]
    EmptyOption(QueryOptionKind),
}

impl QueryError {
    /// True when the request text is at fault, as opposed to how the server was configured.
    pub fn is_client_error(&self) -> bool { !matches!(self, QueryError::Config(_)) }
}
