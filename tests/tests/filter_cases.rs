//! Filter evaluation over a fixed set of customers.
//!
//! Test cases are loaded from `tests/filter_cases.json`. Every case is checked twice: through the
//! queryable pipeline and record by record through the predicate evaluator.

mod common;
use common::*;

use anyhow::Result;
use odataql_core::translate::evaluate_predicate;
use odataql_core::{FilterQueryOption, InMemoryQueryable, ValidationPolicy};
use serde::Deserialize;

const FILTER_CASES_JSON: &str = include_str!("../filter_cases.json");

#[derive(Debug, Deserialize)]
struct FilterCases {
    customers: Vec<Customer>,
    suites: Vec<TestSuite>,
}
#[derive(Debug, Deserialize)]
struct TestSuite {
    name: String,
    cases: Vec<TestCase>,
}
#[derive(Debug, Deserialize)]
struct TestCase {
    filter: String,
    matches: Vec<i32>,
}

#[test]
fn test_filter_cases() -> Result<()> {
    let cases: FilterCases = serde_json::from_str(FILTER_CASES_JSON)?;
    let context = customer_context();
    let policy = ValidationPolicy::default();

    for suite in &cases.suites {
        for case in &suite.cases {
            let option = FilterQueryOption::new(case.filter.as_str(), context.clone());
            option.validate(&policy)?;

            let result = option.apply_to(InMemoryQueryable::new(cases.customers.clone()))?.execute();
            assert_eq!(ids(&result), case.matches, "[Queryable] suite={} filter='{}'", suite.name, case.filter);

            let node = option.node()?;
            for customer in &cases.customers {
                let matches = evaluate_predicate(customer, node, context.model());
                let should = case.matches.contains(&customer.id);
                assert_eq!(matches, should, "[Evaluator] suite={} customer={} filter='{}'", suite.name, customer.id, case.filter);
            }
        }
    }
    Ok(())
}
