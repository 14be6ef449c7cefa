use crate::ast::{NodeKind, OrderByClause, OrderDirection, IT};
use crate::schema::PropertyRef;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderByError {
    #[error("$orderby term {index} ('{term}') is not a property")]
    NotAProperty { index: usize, term: String },
    #[error("duplicate property '{0}' in $orderby")]
    DuplicateProperty(String),
    #[error("$orderby has no terms")]
    NoProperties,
}

/// One `$orderby` sort key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderByPropertyNode {
    property: PropertyRef,
    direction: OrderDirection,
}

impl OrderByPropertyNode {
    pub fn new(property: PropertyRef, direction: OrderDirection) -> Self { Self { property, direction } }

    pub fn property(&self) -> &PropertyRef { &self.property }

    pub fn direction(&self) -> OrderDirection { self.direction }
}

/// Flattens an order-by clause into its property nodes, in clause order. Every term must be a
/// primitive property of the element (optionally through a type cast); anything else, including
/// nested paths such as `Address/City`, is rejected.
pub fn extract_order_by_properties(clause: &OrderByClause) -> Result<Vec<OrderByPropertyNode>, OrderByError> {
    if clause.terms.is_empty() {
        return Err(OrderByError::NoProperties);
    }
    clause
        .terms
        .iter()
        .enumerate()
        .map(|(index, term)| {
            let not_a_property = || OrderByError::NotAProperty { index, term: term.expr.to_string() };
            match &term.expr.kind {
                NodeKind::PropertyAccess(access) if access.property.ty().as_primitive().is_some() && is_element(&access.source.kind) => {
                    Ok(OrderByPropertyNode::new(access.property.clone(), term.direction))
                }
                _ => Err(not_a_property()),
            }
        })
        .collect()
}

fn is_element(kind: &NodeKind) -> bool {
    match kind {
        NodeKind::RangeVariable(var) => var.name == IT,
        NodeKind::TypeCast(cast) => is_element(&cast.source.kind),
        _ => false,
    }
}
