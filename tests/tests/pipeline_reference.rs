//! Randomized filter/orderby/skip/top pipelines checked against a plain iterator implementation.

mod common;
use common::*;

use anyhow::Result;
use itertools::Itertools;
use odataql_core::{InMemoryQueryable, QueryOptions, ValidationPolicy};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;

const NAMES: &[&str] = &["Alice", "Bob", "Carol", "Dave", "Erin", "Frank"];
const TAGS: &[&str] = &["vip", "early", "late", "new"];

fn random_customers(rng: &mut StdRng, count: i32) -> Vec<Customer> {
    (1..=count)
        .map(|id| {
            let tag_count = rng.gen_range(0..=2);
            Customer {
                id,
                name: NAMES.choose(rng).unwrap().to_string(),
                nickname: rng.gen_bool(0.3).then(|| NAMES.choose(rng).unwrap().to_lowercase()),
                city: None,
                tags: TAGS.choose_multiple(rng, tag_count).map(|t| t.to_string()).collect(),
                amount_spent: rng.gen_range(0..30_000) as f64 / 100.0,
                rank: rng.gen_range(0..10),
                level: None,
            }
        })
        .collect()
}

type Reference = Box<dyn Fn(&Customer) -> bool>;

fn random_filter(rng: &mut StdRng) -> (String, Reference) {
    match rng.gen_range(0..4) {
        0 => {
            let threshold = rng.gen_range(0..300);
            (format!("AmountSpent gt {}", threshold), Box::new(move |c: &Customer| c.amount_spent > threshold as f64) as Reference)
        }
        1 => {
            let (rank, letter) = (rng.gen_range(0..10), NAMES.choose(rng).unwrap()[..1].to_string());
            let filter = format!("Rank le {} and startswith(Name, '{}')", rank, letter);
            (filter, Box::new(move |c: &Customer| c.rank <= rank && c.name.starts_with(&letter)) as Reference)
        }
        2 => {
            let tag = TAGS.choose(rng).unwrap().to_string();
            (format!("Tags/any(t: t eq '{}')", tag), Box::new(move |c: &Customer| c.tags.contains(&tag)) as Reference)
        }
        _ => {
            let modulus = rng.gen_range(2..5);
            let filter = format!("Nickname eq null or Id mod {} eq 0", modulus);
            (filter, Box::new(move |c: &Customer| c.nickname.is_none() || c.id % modulus == 0) as Reference)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Key {
    Id,
    Name,
    Nickname,
    AmountSpent,
    Rank,
}

impl Key {
    const ALL: [Key; 5] = [Key::Id, Key::Name, Key::Nickname, Key::AmountSpent, Key::Rank];

    fn property(self) -> &'static str {
        match self {
            Key::Id => "Id",
            Key::Name => "Name",
            Key::Nickname => "Nickname",
            Key::AmountSpent => "AmountSpent",
            Key::Rank => "Rank",
        }
    }

    /// `None` orders before `Some`, which is where nulls sort ascending.
    fn compare(self, a: &Customer, b: &Customer) -> Ordering {
        match self {
            Key::Id => a.id.cmp(&b.id),
            Key::Name => a.name.cmp(&b.name),
            Key::Nickname => a.nickname.cmp(&b.nickname),
            Key::AmountSpent => a.amount_spent.total_cmp(&b.amount_spent),
            Key::Rank => a.rank.cmp(&b.rank),
        }
    }
}

#[test]
fn test_pipeline_matches_reference() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(0x0da7a);
    let customers = random_customers(&mut rng, 120);
    let policy = ValidationPolicy::default();

    for _ in 0..200 {
        let (filter, reference) = random_filter(&mut rng);
        let key_count = rng.gen_range(1..=3);
        let keys: Vec<(Key, bool)> = Key::ALL.choose_multiple(&mut rng, key_count).map(|key| (*key, rng.gen_bool(0.5))).collect();
        let order_by = keys
            .iter()
            .map(|(key, desc)| if *desc { format!("{} desc", key.property()) } else { key.property().to_string() })
            .join(", ");
        let (skip, top) = (rng.gen_range(0..20u64), rng.gen_range(0..30u64));

        let params = [("$filter", filter.clone()), ("$orderby", order_by.clone()), ("$skip", skip.to_string()), ("$top", top.to_string())];
        let options = QueryOptions::from_params(customer_context(), params)?;
        options.validate(&policy)?;
        let actual = options.apply_to(InMemoryQueryable::new(customers.clone()))?.execute();

        let expected: Vec<i32> = customers
            .iter()
            .filter(|c| reference(*c))
            .sorted_by(|a, b| {
                keys.iter()
                    .map(|(key, desc)| if *desc { key.compare(a, b).reverse() } else { key.compare(a, b) })
                    .find(|o| o.is_ne())
                    .unwrap_or(Ordering::Equal)
            })
            .skip(skip as usize)
            .take(top as usize)
            .map(|c| c.id)
            .collect();

        assert_eq!(ids(&actual), expected, "filter='{}' orderby='{}' skip={} top={}", filter, order_by, skip, top);
    }
    Ok(())
}
