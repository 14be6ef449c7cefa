use crate::grammar::Rule;
use crate::schema::TypeRef;
use thiserror::Error;

/// Failure to turn query text into a bound AST.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },
    #[error("empty expression")]
    EmptyExpression,
    #[error("unknown property '{name}' on type '{owner}' at position {position}")]
    UnknownProperty { name: String, owner: String, position: usize },
    #[error("unknown type '{name}' at position {position}")]
    UnknownType { name: String, position: usize },
    #[error("type '{target}' is not related to '{source_type}' at position {position}")]
    InvalidCast { source_type: String, target: String, position: usize },
    #[error("unknown function '{name}' at position {position}")]
    UnknownFunction { name: String, position: usize },
    #[error("function '{function}' expects {expected} argument(s), got {found} at position {position}")]
    ArityMismatch { function: String, expected: String, found: usize, position: usize },
    #[error("type mismatch at position {position}: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: TypeRef, position: usize },
    #[error("collection property '{name}' must be followed by any() or all() at position {position}")]
    CollectionNotQuantified { name: String, position: usize },
    #[error("range variable '{name}' is already declared at position {position}")]
    DuplicateRangeVariable { name: String, position: usize },
    #[error("all() requires a range variable and a body at position {position}")]
    MissingLambdaBody { position: usize },
    #[error("invalid {kind} literal '{text}' at position {position}")]
    InvalidLiteral { kind: &'static str, text: String, position: usize },
    #[error("expression nests deeper than {limit} levels at position {position}")]
    TooDeep { limit: usize, position: usize },
}

impl ParseError {
    /// Byte offset into the raw text where the problem was detected.
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::EmptyExpression => None,
            Self::Syntax { position, .. }
            | Self::UnknownProperty { position, .. }
            | Self::UnknownType { position, .. }
            | Self::InvalidCast { position, .. }
            | Self::UnknownFunction { position, .. }
            | Self::ArityMismatch { position, .. }
            | Self::TypeMismatch { position, .. }
            | Self::CollectionNotQuantified { position, .. }
            | Self::DuplicateRangeVariable { position, .. }
            | Self::MissingLambdaBody { position }
            | Self::InvalidLiteral { position, .. }
            | Self::TooDeep { position, .. } => Some(*position),
        }
    }
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(error: pest::error::Error<Rule>) -> Self {
        let position = match error.location {
            pest::error::InputLocation::Pos(pos) => pos,
            pest::error::InputLocation::Span((start, _)) => start,
        };
        ParseError::Syntax { position, message: error.variant.message().into_owned() }
    }
}

/// Failure while declaring a [`crate::schema::Model`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaError {
    #[error("type '{0}' is declared twice")]
    DuplicateType(String),
    #[error("type '{0}' is not declared")]
    UnknownType(String),
    #[error("base type '{base}' of '{derived}' is not declared")]
    UnknownBaseType { derived: String, base: String },
    #[error("property '{property}' of '{owner}' refers to undeclared type '{ty}'")]
    UnknownPropertyType { owner: String, property: String, ty: String },
    #[error("property '{property}' is declared twice in the hierarchy of '{owner}'")]
    DuplicateProperty { owner: String, property: String },
    #[error("inheritance cycle through '{0}'")]
    InheritanceCycle(String),
}
