//! Turns bound query options into queryable operations.

mod evaluate;

pub use evaluate::{evaluate, evaluate_predicate};

use crate::queryable::{OrderedQueryable, Predicate, Queryable, Record, SortKey};
use odataql::ast::Node;
use odataql::{OrderByError, OrderByPropertyNode, QueryContext, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Compiles a bound `$filter` expression into a predicate over records of the context's element type.
pub fn compile_filter<T: Record + 'static>(node: &Node, context: &QueryContext) -> Predicate<T> {
    let node = node.clone();
    let model = context.model().clone();
    Arc::new(move |record: &T| evaluate_predicate(record, &node, &model))
}

pub fn apply_filter<Q>(queryable: Q, node: &Node, context: &QueryContext) -> Q
where
    Q: Queryable,
    Q::Item: Record + 'static,
{
    debug!("apply_filter: {}", node);
    queryable.filter(compile_filter(node, context))
}

/// The first node starts the ordering and each later node only breaks its ties.
/// A property may appear at most once, however it was spelled.
pub fn apply_order_by<Q>(queryable: Q, nodes: &[OrderByPropertyNode]) -> Result<Q::Ordered, OrderByError>
where
    Q: Queryable,
    Q::Item: Record + 'static,
{
    let mut seen = HashSet::new();
    for node in nodes {
        if !seen.insert(node.property()) {
            return Err(OrderByError::DuplicateProperty(node.property().name().to_string()));
        }
    }

    let (first, rest) = nodes.split_first().ok_or(OrderByError::NoProperties)?;
    debug!("apply_order_by: {} key(s), first {} {:?}", nodes.len(), first.property().name(), first.direction());
    let mut ordered = queryable.order_by(sort_key(first));
    for node in rest {
        ordered = ordered.then_by(sort_key(node));
    }
    Ok(ordered)
}

fn sort_key<T: Record>(node: &OrderByPropertyNode) -> SortKey<T> {
    let name = node.property().name().to_string();
    SortKey::new(node.direction(), move |record: &T| record.value(&name).unwrap_or(Value::Null))
}
