use crate::error::QueryError;
use crate::policy::{QueryOptionKind, ValidationPolicy};
use crate::queryable::Queryable;
use crate::validator::{validate_skip, validate_top};
use tracing::warn;

/// Digits only; a sign, whitespace or a value past `u64::MAX` is rejected.
fn parse_count(option: QueryOptionKind, raw: &str) -> Result<u64, QueryError> {
    let invalid = || QueryError::InvalidPaging { option, value: raw.to_string() };
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    raw.parse().map_err(|_| invalid())
}

fn to_count(value: u64) -> usize { usize::try_from(value).unwrap_or(usize::MAX) }

/// `$skip`: the number of leading elements to drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipQueryOption {
    raw: String,
    value: u64,
}

impl SkipQueryOption {
    pub fn new(raw: impl Into<String>) -> Result<Self, QueryError> {
        let raw = raw.into();
        let value = parse_count(QueryOptionKind::Skip, &raw)?;
        Ok(Self { raw, value })
    }

    pub fn raw(&self) -> &str { &self.raw }

    pub fn value(&self) -> u64 { self.value }

    pub fn validate(&self, policy: &ValidationPolicy) -> Result<(), QueryError> {
        validate_skip(self, policy).inspect_err(|e| warn!("rejected $skip {}: {}", self.value, e))?;
        Ok(())
    }

    pub fn apply_to<Q: Queryable>(&self, queryable: Q) -> Q { queryable.skip(to_count(self.value)) }
}

/// `$top`: the maximum number of elements to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopQueryOption {
    raw: String,
    value: u64,
}

impl TopQueryOption {
    pub fn new(raw: impl Into<String>) -> Result<Self, QueryError> {
        let raw = raw.into();
        let value = parse_count(QueryOptionKind::Top, &raw)?;
        Ok(Self { raw, value })
    }

    pub fn raw(&self) -> &str { &self.raw }

    pub fn value(&self) -> u64 { self.value }

    pub fn validate(&self, policy: &ValidationPolicy) -> Result<(), QueryError> {
        validate_top(self, policy).inspect_err(|e| warn!("rejected $top {}: {}", self.value, e))?;
        Ok(())
    }

    pub fn apply_to<Q: Queryable>(&self, queryable: Q) -> Q { queryable.take(to_count(self.value)) }
}
