//! Validation and execution of OData system query options over [`odataql`] expressions.
//!
//! A request's `$filter`, `$orderby`, `$skip` and `$top` parameters become a [`QueryOptions`], are
//! checked against a [`ValidationPolicy`], and are then applied to any [`Queryable`] data source.

pub mod error;
pub mod policy;
pub mod query;
pub mod queryable;
pub mod translate;
pub mod validator;

#[cfg(test)]
mod test_support;

pub use error::{ConfigError, QueryError, ValidationError};
pub use policy::{AllowedSet, ArithmeticOperator, LogicalOperator, PolicyTag, QueryOptionKind, ValidationPolicy};
pub use query::{FilterQueryOption, OrderByQueryOption, QueryOptions, SkipQueryOption, TopQueryOption};
pub use queryable::{InMemoryQueryable, OrderedInMemoryQueryable, OrderedQueryable, Queryable, Record, SortKey};
pub use validator::{FilterQueryValidator, FilterValidator, OrderByQueryValidator, OrderByValidator};
