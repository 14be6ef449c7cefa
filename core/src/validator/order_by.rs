use super::{FilterQueryValidator, FilterValidator};
use crate::error::{QueryError, ValidationError};
use crate::policy::{QueryOptionKind, ValidationPolicy};
use crate::query::OrderByQueryOption;
use odataql::OrderByPropertyNode;

/// Validates an `$orderby` option. Term expressions are visited with [`OrderByValidator::node_validator`],
/// so per-node hooks written for `$filter` apply here too.
pub trait OrderByValidator: Send + Sync {
    fn validate(&self, option: &OrderByQueryOption, policy: &ValidationPolicy) -> Result<(), QueryError> {
        walk_order_by_option(self, option, policy)
    }

    fn node_validator(&self) -> &dyn FilterValidator;

    fn validate_property(&self, node: &OrderByPropertyNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
        walk_order_by_property(self, node, policy)
    }
}

pub struct OrderByQueryValidator {
    nodes: Box<dyn FilterValidator>,
}

impl OrderByQueryValidator {
    pub fn new(nodes: impl FilterValidator + 'static) -> Self { Self { nodes: Box::new(nodes) } }
}

impl Default for OrderByQueryValidator {
    fn default() -> Self { Self::new(FilterQueryValidator) }
}

impl OrderByValidator for OrderByQueryValidator {
    fn node_validator(&self) -> &dyn FilterValidator { self.nodes.as_ref() }
}

pub fn walk_order_by_option<V: OrderByValidator + ?Sized>(
    validator: &V,
    option: &OrderByQueryOption,
    policy: &ValidationPolicy,
) -> Result<(), QueryError> {
    if !policy.allowed_query_options().contains(QueryOptionKind::OrderBy) {
        return Err(ValidationError::QueryOptionNotAllowed(QueryOptionKind::OrderBy).into());
    }
    let clause = option.clause()?;
    let nodes = option.property_nodes()?;
    for (term, node) in clause.terms.iter().zip(nodes) {
        validator.validate_property(node, policy)?;
        validator.node_validator().validate_node(&term.expr, policy)?;
    }
    Ok(())
}

/// Rejects properties outside a non-empty allow-list.
pub fn walk_order_by_property<V: OrderByValidator + ?Sized>(
    _validator: &V,
    node: &OrderByPropertyNode,
    policy: &ValidationPolicy,
) -> Result<(), ValidationError> {
    let allowed = policy.allowed_order_by_properties();
    let name = node.property().name();
    if !allowed.is_empty() && !allowed.contains(name) {
        return Err(ValidationError::OrderByPropertyNotAllowed(name.to_string()));
    }
    Ok(())
}
