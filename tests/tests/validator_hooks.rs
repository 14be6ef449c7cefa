//! Overriding individual validator hooks while keeping the stock traversal.

mod common;
use common::*;

use anyhow::Result;
use odataql::ast::{AnyNode, BinaryNode, ConvertNode, FunctionCallNode, OrderDirection, PropertyAccessNode, RangeVariableNode, UnaryNode};
use odataql::{OrderByPropertyNode, ParseError, Value};
use odataql_core::validator::{
    walk_any, walk_binary_operator, walk_filter_option, walk_function_call, walk_logical_operator, walk_order_by_property,
    walk_property_access, walk_unary_operator,
};
use odataql_core::{
    FilterQueryOption, FilterQueryValidator, FilterValidator, OrderByQueryOption, OrderByQueryValidator, OrderByValidator, QueryError,
    ValidationError, ValidationPolicy,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Counts every hook invocation, then defers to the default behavior.
#[derive(Default, Clone)]
struct CountingValidator {
    visits: Arc<Mutex<BTreeMap<&'static str, usize>>>,
}

impl CountingValidator {
    fn visit(&self, hook: &'static str) { *self.visits.lock().unwrap().entry(hook).or_default() += 1; }

    fn counts(&self) -> BTreeMap<&'static str, usize> { self.visits.lock().unwrap().clone() }
}

impl FilterValidator for CountingValidator {
    fn validate(&self, option: &FilterQueryOption, policy: &ValidationPolicy) -> Result<(), QueryError> {
        self.visit("Validate");
        walk_filter_option(self, option, policy)
    }

    fn validate_binary_operator(&self, node: &BinaryNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
        self.visit("BinaryOperator");
        walk_binary_operator(self, node, policy)
    }

    fn validate_logical_operator(&self, node: &BinaryNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
        self.visit("LogicalOperator");
        walk_logical_operator(self, node, policy)
    }

    fn validate_unary_operator(&self, node: &UnaryNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
        self.visit("UnaryOperator");
        walk_unary_operator(self, node, policy)
    }

    fn validate_function_call(&self, node: &FunctionCallNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
        self.visit("FunctionCall");
        walk_function_call(self, node, policy)
    }

    fn validate_single_value_property_access(&self, node: &PropertyAccessNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
        self.visit("SingleValuePropertyAccess");
        walk_property_access(self, node, policy)
    }

    fn validate_collection_property_access(&self, node: &PropertyAccessNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
        self.visit("CollectionPropertyAccess");
        walk_property_access(self, node, policy)
    }

    fn validate_constant(&self, _value: &Value, _policy: &ValidationPolicy) -> Result<(), ValidationError> {
        self.visit("Constant");
        Ok(())
    }

    fn validate_range_variable(&self, _node: &RangeVariableNode, _policy: &ValidationPolicy) -> Result<(), ValidationError> {
        self.visit("RangeVariable");
        Ok(())
    }

    fn validate_any(&self, node: &AnyNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
        self.visit("Any");
        walk_any(self, node, policy)
    }

    fn validate_convert(&self, node: &ConvertNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
        self.visit("Convert");
        self.validate_node(&node.operand, policy)
    }
}

fn visit_counts(filter: &str) -> Result<BTreeMap<&'static str, usize>> {
    let counter = CountingValidator::default();
    let mut option = FilterQueryOption::new(filter, customer_context());
    option.set_validator(counter.clone());
    option.validate(&ValidationPolicy::default())?;
    Ok(counter.counts())
}

#[test]
fn test_any_visits() -> Result<()> {
    let expected = BTreeMap::from([
        ("Any", 1),
        ("BinaryOperator", 1),
        ("CollectionPropertyAccess", 1),
        ("Constant", 1),
        ("LogicalOperator", 1),
        // `$it` before `Tags`, and `t` inside the body
        ("RangeVariable", 2),
        ("Validate", 1),
    ]);
    assert_eq!(visit_counts("Tags/any(t: t eq '42')")?, expected);
    Ok(())
}

#[test]
fn test_single_value_visits() -> Result<()> {
    let expected = BTreeMap::from([
        ("BinaryOperator", 1),
        ("Constant", 1),
        ("LogicalOperator", 1),
        ("RangeVariable", 1),
        ("SingleValuePropertyAccess", 1),
        ("Validate", 1),
    ]);
    assert_eq!(visit_counts("Id eq 1")?, expected);
    Ok(())
}

#[test]
fn test_convert_and_unary_visits() -> Result<()> {
    let counts = visit_counts("not (-Id eq AmountSpent) and length(Name) gt 2")?;
    assert_eq!(counts.get("UnaryOperator"), Some(&2));
    assert_eq!(counts.get("Convert"), Some(&1));
    assert_eq!(counts.get("FunctionCall"), Some(&1));
    assert_eq!(counts.get("LogicalOperator"), Some(&3));
    assert_eq!(counts.get("SingleValuePropertyAccess"), Some(&3));
    Ok(())
}

/// Rejects numeric constants above a limit, on top of the policy checks.
struct MaxConstant(i64);

impl FilterValidator for MaxConstant {
    fn validate_constant(&self, value: &Value, _policy: &ValidationPolicy) -> Result<(), ValidationError> {
        match value.as_i64() {
            Some(n) if n > self.0 => Err(ValidationError::Custom(format!("constant {} exceeds {}", n, self.0))),
            _ => Ok(()),
        }
    }
}

#[test]
fn test_custom_hook_rejects() {
    let mut option = FilterQueryOption::new("Id eq 1 or Tags/any(t: length(t) gt 1000)", customer_context());
    option.set_validator(MaxConstant(100));
    let err = option.validate(&ValidationPolicy::default()).unwrap_err();
    assert!(matches!(err, QueryError::Validation(ValidationError::Custom(ref message)) if message == "constant 1000 exceeds 100"));
    assert!(err.is_client_error());
}

/// Only allows descending order on `AmountSpent`.
struct DescendingSpend;

impl OrderByValidator for DescendingSpend {
    fn node_validator(&self) -> &dyn FilterValidator { &FilterQueryValidator }

    fn validate_property(&self, node: &OrderByPropertyNode, policy: &ValidationPolicy) -> Result<(), ValidationError> {
        if node.property().name() == "AmountSpent" && node.direction() != OrderDirection::Descending {
            return Err(ValidationError::Custom("AmountSpent must be sorted descending".into()));
        }
        walk_order_by_property(self, node, policy)
    }
}

#[test]
fn test_custom_order_by_validator() {
    let policy = ValidationPolicy::default();
    let mut option = OrderByQueryOption::new("Name, AmountSpent", customer_context());
    option.set_validator(DescendingSpend);
    assert!(matches!(option.validate(&policy), Err(QueryError::Validation(ValidationError::Custom(_)))));

    let mut option = OrderByQueryOption::new("Name, AmountSpent desc", customer_context());
    option.set_validator(DescendingSpend);
    option.validate(&policy).unwrap();

    // the stock validator routes terms through the same node hooks
    let counter = CountingValidator::default();
    let mut option = OrderByQueryOption::new("Name, Id desc", customer_context());
    option.set_validator(OrderByQueryValidator::new(counter.clone()));
    option.validate(&policy).unwrap();
    assert_eq!(counter.counts().get("SingleValuePropertyAccess"), Some(&2));
    assert_eq!(counter.counts().get("RangeVariable"), Some(&2));
}

#[test]
fn test_parse_errors_surface_through_validate() {
    let option = FilterQueryOption::new("Tags eq 'x'", customer_context());
    let err = option.validate(&ValidationPolicy::default()).unwrap_err();
    assert!(matches!(err, QueryError::Parse(ParseError::CollectionNotQuantified { .. })));
    assert!(option.node().is_err());
}
