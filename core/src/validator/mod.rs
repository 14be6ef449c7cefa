//! Policy checks over bound expressions.
//!
//! [`FilterValidator`] has one method per node kind. Each default method calls the matching `walk_*`
//! function, which performs the stock check and then visits the children by calling back into the
//! validator. Override a method to add checks, and call its `walk_*` function to keep the traversal.
//! Traversal is depth first: sources before lambda bodies, left operands before right, arguments in order.

mod order_by;
mod paging;

pub use order_by::{walk_order_by_option, walk_order_by_property, OrderByQueryValidator, OrderByValidator};
pub use paging::{validate_skip, validate_top};

use crate::error::{QueryError, ValidationError};
use crate::policy::{ArithmeticOperator, LogicalOperator, QueryOptionKind, UnaryTag, ValidationPolicy};
use crate::query::FilterQueryOption;
use odataql::ast::{
    AllNode, AnyNode, BinaryNode, ConvertNode, FunctionCallNode, FunctionName, Node, NodeKind, PropertyAccessNode, RangeVariableNode,
    TypeCastNode, UnaryNode,
};
use odataql::Value;

pub trait FilterValidator: Send + Sync {
    /// Entry point for a `$filter` option: checks the option kind, then visits the whole tree.
    fn validate(&self, option: &FilterQueryOption, policy: &ValidationPolicy) -> Result<(), QueryError> {
        walk_filter_option(self, option, policy)
    }

    fn validate_node(&self, node: &Node, policy: &ValidationPolicy) -> Result<(), ValidationError> { walk_node(self, node, policy) }

    fn validate_binary_operator(&self, node: &BinaryNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
        walk_binary_operator(self, node, policy)
    }

    fn validate_logical_operator(&self, node: &BinaryNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
        walk_logical_operator(self, node, policy)
    }

    fn validate_arithmetic_operator(&self, node: &BinaryNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
        walk_arithmetic_operator(self, node, policy)
    }

    fn validate_unary_operator(&self, node: &UnaryNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
        walk_unary_operator(self, node, policy)
    }

    fn validate_function_call(&self, node: &FunctionCallNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
        walk_function_call(self, node, policy)
    }

    fn validate_single_value_property_access(&self, node: &PropertyAccessNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
        walk_property_access(self, node, policy)
    }

    fn validate_collection_property_access(&self, node: &PropertyAccessNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
        walk_property_access(self, node, policy)
    }

    fn validate_constant(&self, _value: &Value, _policy: &ValidationPolicy) -> Result<(), ValidationError> { Ok(()) }

    /// Called for every reference to a range variable, including the implicit `$it` at the start of a path.
    fn validate_range_variable(&self, _node: &RangeVariableNode, _policy: &ValidationPolicy) -> Result<(), ValidationError> { Ok(()) }

    fn validate_any(&self, node: &AnyNode, policy: &ValidationPolicy) -> Result<(), ValidationError> { walk_any(self, node, policy) }

    fn validate_all(&self, node: &AllNode, policy: &ValidationPolicy) -> Result<(), ValidationError> { walk_all(self, node, policy) }

    fn validate_convert(&self, node: &ConvertNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
        self.validate_node(&node.operand, policy)
    }

    fn validate_type_cast(&self, node: &TypeCastNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
        self.validate_node(&node.source, policy)
    }
}

/// The stock validator: every method keeps its default.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterQueryValidator;

impl FilterValidator for FilterQueryValidator {}

pub fn walk_filter_option<V: FilterValidator + ?Sized>(
    validator: &V,
    option: &FilterQueryOption,
    policy: &ValidationPolicy,
) -> Result<(), QueryError> {
    if !policy.allowed_query_options().contains(QueryOptionKind::Filter) {
        return Err(ValidationError::QueryOptionNotAllowed(QueryOptionKind::Filter).into());
    }
    let node = option.node()?;
    validator.validate_node(node, policy)?;
    Ok(())
}

/// Dispatches on the node kind.
pub fn walk_node<V: FilterValidator + ?Sized>(validator: &V, node: &Node, policy: &ValidationPolicy) -> Result<(), ValidationError> {
    match &node.kind {
        NodeKind::Constant(value) => validator.validate_constant(value, policy),
        NodeKind::PropertyAccess(access) if access.property.is_collection() => {
            validator.validate_collection_property_access(access, policy)
        }
        NodeKind::PropertyAccess(access) => validator.validate_single_value_property_access(access, policy),
        NodeKind::RangeVariable(var) => validator.validate_range_variable(var, policy),
        NodeKind::TypeCast(cast) => validator.validate_type_cast(cast, policy),
        NodeKind::Binary(binary) => validator.validate_binary_operator(binary, policy),
        NodeKind::Unary(unary) => validator.validate_unary_operator(unary, policy),
        NodeKind::FunctionCall(call) => validator.validate_function_call(call, policy),
        NodeKind::Convert(convert) => validator.validate_convert(convert, policy),
        NodeKind::Any(any) => validator.validate_any(any, policy),
        NodeKind::All(all) => validator.validate_all(all, policy),
    }
}

pub fn walk_binary_operator<V: FilterValidator + ?Sized>(
    validator: &V,
    node: &BinaryNode,
    policy: &ValidationPolicy,
) -> Result<(), ValidationError> {
    if node.op.is_arithmetic() {
        validator.validate_arithmetic_operator(node, policy)
    } else {
        validator.validate_logical_operator(node, policy)
    }
}

pub fn walk_logical_operator<V: FilterValidator + ?Sized>(
    validator: &V,
    node: &BinaryNode,
    policy: &ValidationPolicy,
) -> Result<(), ValidationError> {
    if let Some(op) = LogicalOperator::from_binary(node.op) {
        if !policy.allowed_logical_operators().contains(op) {
            return Err(ValidationError::LogicalOperatorNotAllowed(op));
        }
    }
    validator.validate_node(&node.left, policy)?;
    validator.validate_node(&node.right, policy)
}

pub fn walk_arithmetic_operator<V: FilterValidator + ?Sized>(
    validator: &V,
    node: &BinaryNode,
    policy: &ValidationPolicy,
) -> Result<(), ValidationError> {
    if let Some(op) = ArithmeticOperator::from_binary(node.op) {
        if !policy.allowed_arithmetic_operators().contains(op) {
            return Err(ValidationError::ArithmeticOperatorNotAllowed(op));
        }
    }
    validator.validate_node(&node.left, policy)?;
    validator.validate_node(&node.right, policy)
}

pub fn walk_unary_operator<V: FilterValidator + ?Sized>(
    validator: &V,
    node: &UnaryNode,
    policy: &ValidationPolicy,
) -> Result<(), ValidationError> {
    match UnaryTag::from(node.op) {
        UnaryTag::Logical(op) if !policy.allowed_logical_operators().contains(op) => {
            return Err(ValidationError::LogicalOperatorNotAllowed(op));
        }
        UnaryTag::Arithmetic(op) if !policy.allowed_arithmetic_operators().contains(op) => {
            return Err(ValidationError::ArithmeticOperatorNotAllowed(op))
        }
        _ => {}
    }
    validator.validate_node(&node.operand, policy)
}

pub fn walk_function_call<V: FilterValidator + ?Sized>(
    validator: &V,
    node: &FunctionCallNode,
    policy: &ValidationPolicy,
) -> Result<(), ValidationError> {
    if !policy.allowed_functions().contains(node.function) {
        return Err(ValidationError::FunctionNotAllowed(node.function));
    }
    node.args.iter().try_for_each(|arg| validator.validate_node(arg, policy))
}

/// Property accesses carry no policy of their own; visiting the source reaches the range variable.
pub fn walk_property_access<V: FilterValidator + ?Sized>(
    validator: &V,
    node: &PropertyAccessNode,
    policy: &ValidationPolicy,
) -> Result<(), ValidationError> {
    validator.validate_node(&node.source, policy)
}

pub fn walk_any<V: FilterValidator + ?Sized>(validator: &V, node: &AnyNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
    if !policy.allowed_functions().contains(FunctionName::Any) {
        return Err(ValidationError::FunctionNotAllowed(FunctionName::Any));
    }
    validator.validate_node(&node.source, policy)?;
    match &node.body {
        Some(body) => validator.validate_node(body, policy),
        None => Ok(()),
    }
}

pub fn walk_all<V: FilterValidator + ?Sized>(validator: &V, node: &AllNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
    if !policy.allowed_functions().contains(FunctionName::All) {
        return Err(ValidationError::FunctionNotAllowed(FunctionName::All));
    }
    validator.validate_node(&node.source, policy)?;
    validator.validate_node(&node.body, policy)
}
