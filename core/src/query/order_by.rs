use crate::error::QueryError;
use crate::policy::ValidationPolicy;
use crate::queryable::{Queryable, Record};
use crate::translate;
use crate::validator::{OrderByQueryValidator, OrderByValidator};
use odataql::ast::OrderByClause;
use odataql::{extract_order_by_properties, parse_order_by, OrderByPropertyNode, ParseError, QueryContext};
use std::cell::OnceCell;
use std::fmt;
use tracing::{debug, warn};

/// A `$orderby` query option. Like [`super::FilterQueryOption`], it caches the parsed clause and its
/// property nodes for the lifetime of one request.
pub struct OrderByQueryOption {
    raw: String,
    context: QueryContext,
    clause: OnceCell<OrderByClause>,
    property_nodes: OnceCell<Vec<OrderByPropertyNode>>,
    validator: Box<dyn OrderByValidator>,
}

impl OrderByQueryOption {
    pub fn new(raw: impl Into<String>, context: QueryContext) -> Self {
        Self {
            raw: raw.into(),
            context,
            clause: OnceCell::new(),
            property_nodes: OnceCell::new(),
            validator: Box::new(OrderByQueryValidator::default()),
        }
    }

    pub fn raw(&self) -> &str { &self.raw }

    pub fn context(&self) -> &QueryContext { &self.context }

    pub fn clause(&self) -> Result<&OrderByClause, ParseError> {
        if let Some(clause) = self.clause.get() {
            return Ok(clause);
        }
        let clause = parse_order_by(&self.raw, &self.context)?;
        Ok(self.clause.get_or_init(|| clause))
    }

    /// One node per term, in clause order.
    pub fn property_nodes(&self) -> Result<&[OrderByPropertyNode], QueryError> {
        if let Some(nodes) = self.property_nodes.get() {
            return Ok(nodes.as_slice());
        }
        let nodes = extract_order_by_properties(self.clause()?)?;
        Ok(self.property_nodes.get_or_init(|| nodes).as_slice())
    }

    pub fn set_validator(&mut self, validator: impl OrderByValidator + 'static) -> &mut Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn validate(&self, policy: &ValidationPolicy) -> Result<(), QueryError> {
        debug!("OrderByQueryOption::validate: {}", self.raw);
        self.validator.validate(self, policy).inspect_err(|e| warn!("rejected $orderby '{}': {}", self.raw, e))
    }

    pub fn apply_to<Q>(&self, queryable: Q) -> Result<Q::Ordered, QueryError>
    where
        Q: Queryable,
        Q::Item: Record + 'static,
    {
        Ok(translate::apply_order_by(queryable, self.property_nodes()?)?)
    }
}

impl fmt::Debug for OrderByQueryOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderByQueryOption").field("raw", &self.raw).field("parsed", &self.clause.get().is_some()).finish()
    }
}
