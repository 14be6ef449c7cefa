//! Signatures of the built-in functions callable from `$filter`.

use crate::ast::FunctionName;
use crate::schema::PrimitiveType as P;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub params: &'static [P],
    /// Trailing parameters that may be omitted.
    pub optional: usize,
    pub returns: P,
}

impl Signature {
    pub fn min_args(&self) -> usize { self.params.len() - self.optional }

    pub fn max_args(&self) -> usize { self.params.len() }

    pub fn accepts_arity(&self, found: usize) -> bool { (self.min_args()..=self.max_args()).contains(&found) }

    /// Human readable arity, e.g. `2` or `2 to 3`.
    pub fn arity(&self) -> String {
        if self.optional == 0 {
            self.max_args().to_string()
        } else {
            format!("{} to {}", self.min_args(), self.max_args())
        }
    }
}

const fn sig(params: &'static [P], returns: P) -> Signature { Signature { params, optional: 0, returns } }

/// `None` for the lambda operators, which are not callable by name.
pub fn signature(function: FunctionName) -> Option<Signature> {
    Some(match function {
        FunctionName::SubstringOf | FunctionName::EndsWith | FunctionName::StartsWith => sig(&[P::String, P::String], P::Boolean),
        FunctionName::Length => sig(&[P::String], P::Int32),
        FunctionName::IndexOf => sig(&[P::String, P::String], P::Int32),
        FunctionName::Replace => sig(&[P::String, P::String, P::String], P::String),
        FunctionName::Substring => Signature { params: &[P::String, P::Int32, P::Int32], optional: 1, returns: P::String },
        FunctionName::ToLower | FunctionName::ToUpper | FunctionName::Trim => sig(&[P::String], P::String),
        FunctionName::Concat => sig(&[P::String, P::String], P::String),
        FunctionName::Year
        | FunctionName::Month
        | FunctionName::Day
        | FunctionName::Hour
        | FunctionName::Minute
        | FunctionName::Second => sig(&[P::DateTime], P::Int32),
        FunctionName::Round | FunctionName::Floor | FunctionName::Ceiling => sig(&[P::Double], P::Double),
        FunctionName::Any | FunctionName::All => return None,
    })
}
