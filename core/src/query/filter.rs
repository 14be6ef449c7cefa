use crate::error::QueryError;
use crate::policy::ValidationPolicy;
use crate::queryable::{Queryable, Record};
use crate::translate;
use crate::validator::{FilterQueryValidator, FilterValidator};
use odataql::ast::Node;
use odataql::{parse_filter, ParseError, QueryContext};
use std::cell::OnceCell;
use std::fmt;
use tracing::{debug, warn};

/// A `$filter` query option. The expression is parsed on first use and kept; an option is built and
/// consumed within a single request, so the cache is not shared between threads.
pub struct FilterQueryOption {
    raw: String,
    context: QueryContext,
    node: OnceCell<Node>,
    validator: Box<dyn FilterValidator>,
}

impl FilterQueryOption {
    pub fn new(raw: impl Into<String>, context: QueryContext) -> Self {
        Self { raw: raw.into(), context, node: OnceCell::new(), validator: Box::new(FilterQueryValidator) }
    }

    pub fn raw(&self) -> &str { &self.raw }

    pub fn context(&self) -> &QueryContext { &self.context }

    /// The bound expression. A parse failure is returned on every call and never cached.
    pub fn node(&self) -> Result<&Node, ParseError> {
        if let Some(node) = self.node.get() {
            return Ok(node);
        }
        let node = parse_filter(&self.raw, &self.context)?;
        Ok(self.node.get_or_init(|| node))
    }

    /// Replaces the stock validator, e.g. with one that overrides individual node hooks.
    pub fn set_validator(&mut self, validator: impl FilterValidator + 'static) -> &mut Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn validate(&self, policy: &ValidationPolicy) -> Result<(), QueryError> {
        debug!("FilterQueryOption::validate: {}", self.raw);
        self.validator.validate(self, policy).inspect_err(|e| warn!("rejected $filter '{}': {}", self.raw, e))
    }

    pub fn apply_to<Q>(&self, queryable: Q) -> Result<Q, QueryError>
    where
        Q: Queryable,
        Q::Item: Record + 'static,
    {
        Ok(translate::apply_filter(queryable, self.node()?, &self.context))
    }
}

impl fmt::Debug for FilterQueryOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterQueryOption").field("raw", &self.raw).field("parsed", &self.node.get().is_some()).finish()
    }
}
