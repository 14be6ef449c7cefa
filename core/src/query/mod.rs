//! The four supported system query options, individually and as a set parsed from request parameters.

mod filter;
mod order_by;
mod paging;

pub use filter::FilterQueryOption;
pub use order_by::OrderByQueryOption;
pub use paging::{SkipQueryOption, TopQueryOption};

use crate::error::QueryError;
use crate::policy::{QueryOptionKind, ValidationPolicy};
use crate::queryable::{Queryable, Record};
use odataql::QueryContext;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug)]
pub struct QueryOptions {
    context: QueryContext,
    filter: Option<FilterQueryOption>,
    order_by: Option<OrderByQueryOption>,
    skip: Option<SkipQueryOption>,
    top: Option<TopQueryOption>,
}

impl QueryOptions {
    pub fn new(context: QueryContext) -> Self { Self { context, filter: None, order_by: None, skip: None, top: None } }

    /// Collects `$filter`, `$orderby`, `$skip` and `$top` from decoded request parameters. Other
    /// parameters are ignored. Paging values are checked here; expressions are parsed on first use.
    pub fn from_params<I, K, V>(context: QueryContext, params: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut options = Self::new(context);
        for (key, value) in params {
            let Ok(kind) = QueryOptionKind::from_str(key.as_ref()) else {
                debug!("ignoring query parameter {}", key.as_ref());
                continue;
            };
            let value: String = value.into();
            if value.trim().is_empty() {
                return Err(QueryError::EmptyOption(kind));
            }
            let repeated = match kind {
                QueryOptionKind::Filter => options.filter.replace(FilterQueryOption::new(value, options.context.clone())).is_some(),
                QueryOptionKind::OrderBy => options.order_by.replace(OrderByQueryOption::new(value, options.context.clone())).is_some(),
                QueryOptionKind::Skip => options.skip.replace(SkipQueryOption::new(value)?).is_some(),
                QueryOptionKind::Top => options.top.replace(TopQueryOption::new(value)?).is_some(),
            };
            if repeated {
                return Err(QueryError::DuplicateOption(kind));
            }
        }
        Ok(options)
    }

    pub fn context(&self) -> &QueryContext { &self.context }

    pub fn filter(&self) -> Option<&FilterQueryOption> { self.filter.as_ref() }

    pub fn filter_mut(&mut self) -> Option<&mut FilterQueryOption> { self.filter.as_mut() }

    pub fn order_by(&self) -> Option<&OrderByQueryOption> { self.order_by.as_ref() }

    pub fn order_by_mut(&mut self) -> Option<&mut OrderByQueryOption> { self.order_by.as_mut() }

    pub fn skip(&self) -> Option<&SkipQueryOption> { self.skip.as_ref() }

    pub fn top(&self) -> Option<&TopQueryOption> { self.top.as_ref() }

    /// Validates the options that are present, stopping at the first violation.
    pub fn validate(&self, policy: &ValidationPolicy) -> Result<(), QueryError> {
        if let Some(filter) = &self.filter {
            filter.validate(policy)?;
        }
        if let Some(order_by) = &self.order_by {
            order_by.validate(policy)?;
        }
        if let Some(skip) = &self.skip {
            skip.validate(policy)?;
        }
        if let Some(top) = &self.top {
            top.validate(policy)?;
        }
        Ok(())
    }

    /// Applies filter, ordering, skip and top, in that order. Does not validate.
    pub fn apply_to<Q>(&self, queryable: Q) -> Result<Q, QueryError>
    where
        Q: Queryable,
        Q::Item: Record + 'static,
        Q::Ordered: Into<Q>,
    {
        let mut queryable = queryable;
        if let Some(filter) = &self.filter {
            queryable = filter.apply_to(queryable)?;
        }
        if let Some(order_by) = &self.order_by {
            queryable = order_by.apply_to(queryable)?.into();
        }
        if let Some(skip) = &self.skip {
            queryable = skip.apply_to(queryable);
        }
        if let Some(top) = &self.top {
            queryable = top.apply_to(queryable);
        }
        Ok(queryable)
    }
}
