//! A composable data source that query options are applied to, and an in-memory implementation.

use odataql::ast::OrderDirection;
use odataql::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Property values of one element, read by compiled predicates and sort keys.
pub trait Record {
    /// Value of the named property. `None` means the element does not carry it and reads as null.
    fn value(&self, property: &str) -> Option<Value>;

    /// Runtime type of the element, consulted by type-cast path segments. `None` means the element is
    /// exactly the declared element type.
    fn type_name(&self) -> Option<&str> { None }
}

impl Record for BTreeMap<String, Value> {
    fn value(&self, property: &str) -> Option<Value> { self.get(property).cloned() }
}

impl<R: Record> Record for &R {
    fn value(&self, property: &str) -> Option<Value> { (**self).value(property) }

    fn type_name(&self) -> Option<&str> { (**self).type_name() }
}

pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// One ordering key: a projection of the element and a direction.
pub struct SortKey<T> {
    key: Arc<dyn Fn(&T) -> Value + Send + Sync>,
    direction: OrderDirection,
}

impl<T> SortKey<T> {
    pub fn new(direction: OrderDirection, key: impl Fn(&T) -> Value + Send + Sync + 'static) -> Self {
        Self { key: Arc::new(key), direction }
    }

    pub fn direction(&self) -> OrderDirection { self.direction }

    /// Nulls sort first ascending and last descending.
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        let ordering = (self.key)(a).sort_cmp(&(self.key)(b));
        match self.direction {
            OrderDirection::Ascending => ordering,
            OrderDirection::Descending => ordering.reverse(),
        }
    }
}

impl<T> Clone for SortKey<T> {
    fn clone(&self) -> Self { Self { key: self.key.clone(), direction: self.direction } }
}

impl<T> fmt::Debug for SortKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.debug_struct("SortKey").field("direction", &self.direction).finish() }
}

pub trait Queryable: Sized {
    type Item;
    type Ordered: OrderedQueryable<Item = Self::Item>;

    fn filter(self, predicate: Predicate<Self::Item>) -> Self;

    /// Starts a new ordering; any earlier ordering is replaced.
    fn order_by(self, key: SortKey<Self::Item>) -> Self::Ordered;

    fn skip(self, count: usize) -> Self;

    fn take(self, count: usize) -> Self;
}

/// A queryable with an established ordering that can be refined.
pub trait OrderedQueryable: Queryable {
    /// Breaks ties of the existing ordering without disturbing it.
    fn then_by(self, key: SortKey<Self::Item>) -> Self;
}

enum Operation<T> {
    Filter(Predicate<T>),
    Order(Vec<SortKey<T>>),
    Skip(usize),
    Take(usize),
}

/// Records operations and runs them in order on [`InMemoryQueryable::execute`].
pub struct InMemoryQueryable<T> {
    source: Vec<T>,
    operations: Vec<Operation<T>>,
}

impl<T> InMemoryQueryable<T> {
    pub fn new(source: impl IntoIterator<Item = T>) -> Self { Self { source: source.into_iter().collect(), operations: Vec::new() } }

    pub fn execute(self) -> Vec<T> {
        let mut items = self.source;
        for operation in self.operations {
            match operation {
                Operation::Filter(predicate) => items.retain(|item| predicate(item)),
                // stable: elements equal on every key keep their previous relative order
                Operation::Order(keys) => {
                    items.sort_by(|a, b| keys.iter().map(|key| key.compare(a, b)).find(|o| o.is_ne()).unwrap_or(Ordering::Equal))
                }
                Operation::Skip(count) => {
                    items.drain(..count.min(items.len()));
                }
                Operation::Take(count) => items.truncate(count),
            }
        }
        items
    }

    fn push(mut self, operation: Operation<T>) -> Self {
        self.operations.push(operation);
        self
    }
}

impl<T> Queryable for InMemoryQueryable<T> {
    type Item = T;
    type Ordered = OrderedInMemoryQueryable<T>;

    fn filter(self, predicate: Predicate<T>) -> Self { self.push(Operation::Filter(predicate)) }

    fn order_by(self, key: SortKey<T>) -> Self::Ordered {
        OrderedInMemoryQueryable { inner: self.push(Operation::Order(vec![key.clone()])), keys: vec![key] }
    }

    fn skip(self, count: usize) -> Self { self.push(Operation::Skip(count)) }

    fn take(self, count: usize) -> Self { self.push(Operation::Take(count)) }
}

/// An [`InMemoryQueryable`] with an established ordering. `keys` is that ordering, primary key first.
pub struct OrderedInMemoryQueryable<T> {
    inner: InMemoryQueryable<T>,
    keys: Vec<SortKey<T>>,
}

impl<T> OrderedInMemoryQueryable<T> {
    pub fn execute(self) -> Vec<T> { self.inner.execute() }

    fn map(self, f: impl FnOnce(InMemoryQueryable<T>) -> InMemoryQueryable<T>) -> Self {
        Self { inner: f(self.inner), keys: self.keys }
    }
}

impl<T> Queryable for OrderedInMemoryQueryable<T> {
    type Item = T;
    type Ordered = Self;

    fn filter(self, predicate: Predicate<T>) -> Self { self.map(|inner| inner.filter(predicate)) }

    fn order_by(self, key: SortKey<T>) -> Self { self.inner.order_by(key) }

    fn skip(self, count: usize) -> Self { self.map(|inner| inner.skip(count)) }

    fn take(self, count: usize) -> Self { self.map(|inner| inner.take(count)) }
}

impl<T> OrderedQueryable for OrderedInMemoryQueryable<T> {
    fn then_by(mut self, key: SortKey<T>) -> Self {
        self.keys.push(key);
        match self.inner.operations.last_mut() {
            Some(Operation::Order(keys)) => *keys = self.keys.clone(),
            // items were filtered or paged since the ordering; a stable sort on the full key list only breaks ties
            _ => self.inner.operations.push(Operation::Order(self.keys.clone())),
        }
        self
    }
}

impl<T> From<OrderedInMemoryQueryable<T>> for InMemoryQueryable<T> {
    fn from(ordered: OrderedInMemoryQueryable<T>) -> Self { ordered.inner }
}
