mod common;
use common::*;

use anyhow::Result;
use odataql::ast::FunctionName;
use odataql::{OrderByError, ParseError};
use odataql_core::{InMemoryQueryable, QueryError, QueryOptionKind, QueryOptions, ValidationError, ValidationPolicy};

fn customers() -> Vec<Customer> {
    vec![
        Customer { rank: 2, ..customer(1, "Alice", 120.0) },
        Customer { rank: 1, nickname: Some("Bobby".into()), ..customer(2, "Bob", 35.5) },
        Customer { rank: 2, ..customer(3, "Carol", 80.0) },
        Customer { rank: 1, ..customer(4, "Dave", 80.0) },
        Customer { rank: 3, ..customer(5, "Erin", 250.25) },
    ]
}

fn restrictive_policy() -> Result<ValidationPolicy> {
    Ok(serde_json::from_str(
        r#"{
            "allowed_functions": ["startswith", "any"],
            "allowed_arithmetic_operators": [],
            "allowed_order_by_properties": ["Name", "AmountSpent", "Rank"],
            "max_top": 3
        }"#,
    )?)
}

#[test]
fn test_end_to_end() -> Result<()> {
    let params = vec![
        ("$filter", "AmountSpent ge 80 or Nickname ne null"),
        ("$orderby", "Rank, AmountSpent desc"),
        ("$skip", "1"),
        ("$top", "3"),
    ];
    let options = QueryOptions::from_params(customer_context(), params)?;
    options.validate(&restrictive_policy()?)?;

    // Rank 1: Dave 80, Bob 35.5; Rank 2: Alice 120, Carol 80; Rank 3: Erin
    let result = options.apply_to(InMemoryQueryable::new(customers()))?.execute();
    assert_eq!(ids(&result), vec![2, 1, 3]);
    Ok(())
}

#[test]
fn test_policy_violations() -> Result<()> {
    let policy = restrictive_policy()?;
    let check = |params: Vec<(&str, &str)>| -> Result<Result<(), QueryError>> {
        Ok(QueryOptions::from_params(customer_context(), params)?.validate(&policy))
    };

    assert!(matches!(
        check(vec![("$filter", "tolower(Name) eq 'bob'")])?,
        Err(QueryError::Validation(ValidationError::FunctionNotAllowed(FunctionName::ToLower)))
    ));
    assert!(matches!(
        check(vec![("$filter", "Id add 1 eq 2")])?,
        Err(QueryError::Validation(ValidationError::ArithmeticOperatorNotAllowed(_)))
    ));
    assert!(matches!(check(vec![("$orderby", "Id")])?, Err(QueryError::Validation(ValidationError::OrderByPropertyNotAllowed(_)))));
    assert!(matches!(check(vec![("$top", "4")])?, Err(QueryError::Validation(ValidationError::TopTooLarge { top: 4, max: 3 }))));
    assert!(check(vec![("$filter", "startswith(Name, 'A')"), ("$top", "3"), ("$skip", "1000")])?.is_ok());
    Ok(())
}

#[test]
fn test_request_errors() {
    let from_params = |params: Vec<(&str, &str)>| QueryOptions::from_params(customer_context(), params);

    let err = from_params(vec![("$orderby", "Name"), ("$orderby", "Id")]).unwrap_err();
    assert!(matches!(err, QueryError::DuplicateOption(QueryOptionKind::OrderBy)));
    assert_eq!(err.to_string(), "query option $orderby is specified more than once");

    assert!(matches!(from_params(vec![("$orderby", "")]), Err(QueryError::EmptyOption(QueryOptionKind::OrderBy))));
    assert!(matches!(from_params(vec![("$skip", "two")]), Err(QueryError::InvalidPaging { option: QueryOptionKind::Skip, .. })));
    assert!(from_params(vec![("$select", "Name"), ("filter", "Id eq 1")]).unwrap().filter().is_none());

    // expression errors surface when the option is first used
    let options = from_params(vec![("$orderby", "Name, Name desc"), ("$filter", "Id eq")]).unwrap();
    let err = options.validate(&ValidationPolicy::default()).unwrap_err();
    assert!(matches!(err, QueryError::Parse(ParseError::Syntax { .. })));
    assert!(err.is_client_error());

    let options = from_params(vec![("$orderby", "Name, Name desc")]).unwrap();
    options.validate(&ValidationPolicy::default()).unwrap();
    let err = options.apply_to(InMemoryQueryable::new(customers())).err();
    assert!(matches!(err, Some(QueryError::OrderBy(OrderByError::DuplicateProperty(_)))));
}

#[test]
fn test_invalid_policy_config() {
    let err = serde_json::from_str::<ValidationPolicy>(r#"{"max_top": -1}"#).unwrap_err();
    assert!(err.to_string().contains("max_top must not be negative"), "{}", err);
    assert!(serde_json::from_str::<ValidationPolicy>(r#"{"allowed_query_options": ["$expand"]}"#).is_err());
    assert!(serde_json::from_str::<ValidationPolicy>(r#"{"max_depth": 3}"#).is_err());
}
