//! Evaluate bound expressions against records. Used to compile `$filter` into a queryable predicate.

use crate::queryable::Record;
use chrono::{Datelike, Timelike};
use odataql::ast::{BinaryOperator, FunctionName, Node, NodeKind, UnaryOperator, IT};
use odataql::{Model, PrimitiveType, Value};

/// Range variables bound by enclosing lambdas. `$it` is the record itself and is never stored here.
enum Scope<'a> {
    Root,
    Bound { name: &'a str, value: &'a Value, parent: &'a Scope<'a> },
}

impl<'a> Scope<'a> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        match self {
            Scope::Root => None,
            Scope::Bound { name: bound, value, parent } => {
                if *bound == name {
                    Some(*value)
                } else {
                    parent.lookup(name)
                }
            }
        }
    }
}

/// What a path segment resolves to: the record being filtered, or a value reached through it.
enum Subject<'r, R> {
    Record(&'r R),
    Value(Value),
}

struct Evaluator<'a, R> {
    record: &'a R,
    model: &'a Model,
}

/// True when `node` evaluates to `true` for `record`. Null and false both reject.
pub fn evaluate_predicate<R: Record>(record: &R, node: &Node, model: &Model) -> bool {
    matches!(Evaluator { record, model }.evaluate(node, &Scope::Root), Value::Bool(true))
}

/// Evaluates any expression to a value; errors such as overflow or division by zero produce null.
pub fn evaluate<R: Record>(record: &R, node: &Node, model: &Model) -> Value { Evaluator { record, model }.evaluate(node, &Scope::Root) }

fn truthy(value: &Value) -> bool { matches!(value, Value::Bool(true)) }

impl<'a, R: Record> Evaluator<'a, R> {
    fn evaluate(&self, node: &Node, scope: &Scope) -> Value {
        match &node.kind {
            NodeKind::Constant(value) => value.clone(),
            NodeKind::RangeVariable(var) => scope.lookup(&var.name).cloned().unwrap_or(Value::Null),
            NodeKind::PropertyAccess(_) | NodeKind::TypeCast(_) => match self.subject(node, scope) {
                Subject::Value(value) => value,
                Subject::Record(_) => Value::Null,
            },
            NodeKind::Binary(binary) => match binary.op {
                BinaryOperator::And => {
                    Value::Bool(truthy(&self.evaluate(&binary.left, scope)) && truthy(&self.evaluate(&binary.right, scope)))
                }
                BinaryOperator::Or => {
                    Value::Bool(truthy(&self.evaluate(&binary.left, scope)) || truthy(&self.evaluate(&binary.right, scope)))
                }
                op => {
                    let left = self.evaluate(&binary.left, scope);
                    let right = self.evaluate(&binary.right, scope);
                    if op.is_comparison() {
                        compare(op, &left, &right)
                    } else {
                        arithmetic(op, &left, &right, node.ty.as_primitive())
                    }
                }
            },
            NodeKind::Unary(unary) => match (unary.op, self.evaluate(&unary.operand, scope)) {
                (UnaryOperator::Not, Value::Bool(b)) => Value::Bool(!b),
                (UnaryOperator::Negate, Value::I16(n)) => n.checked_neg().map(Value::I16).unwrap_or(Value::Null),
                (UnaryOperator::Negate, Value::I32(n)) => n.checked_neg().map(Value::I32).unwrap_or(Value::Null),
                (UnaryOperator::Negate, Value::I64(n)) => n.checked_neg().map(Value::I64).unwrap_or(Value::Null),
                (UnaryOperator::Negate, Value::F64(n)) => Value::F64(-n),
                _ => Value::Null,
            },
            NodeKind::FunctionCall(call) => {
                let args: Vec<Value> = call.args.iter().map(|arg| self.evaluate(arg, scope)).collect();
                if args.iter().any(Value::is_null) {
                    return Value::Null;
                }
                call_function(call.function, &args)
            }
            NodeKind::Convert(convert) => self.evaluate(&convert.operand, scope).cast_to(convert.target).unwrap_or(Value::Null),
            NodeKind::Any(any) => {
                let items = collection(self.evaluate(&any.source, scope));
                match (&any.variable, &any.body) {
                    (Some(var), Some(body)) => Value::Bool(items.iter().any(|item| {
                        let inner = Scope::Bound { name: &var.name, value: item, parent: scope };
                        truthy(&self.evaluate(body, &inner))
                    })),
                    _ => Value::Bool(!items.is_empty()),
                }
            }
            NodeKind::All(all) => {
                let items = collection(self.evaluate(&all.source, scope));
                Value::Bool(items.iter().all(|item| {
                    let inner = Scope::Bound { name: &all.variable.name, value: item, parent: scope };
                    truthy(&self.evaluate(&all.body, &inner))
                }))
            }
        }
    }

    /// Resolves a path node. Casts of the record check its runtime type; casts of nested values
    /// pass through since values carry no runtime type.
    fn subject(&self, node: &Node, scope: &Scope) -> Subject<'a, R> {
        match &node.kind {
            NodeKind::RangeVariable(var) if var.name == IT => Subject::Record(self.record),
            NodeKind::TypeCast(cast) => match self.subject(&cast.source, scope) {
                Subject::Record(record) => match record.type_name() {
                    Some(actual) if !self.model.is_subtype_of(actual, &cast.target) => Subject::Value(Value::Null),
                    _ => Subject::Record(record),
                },
                value => value,
            },
            NodeKind::PropertyAccess(access) => {
                let name = access.property.name();
                match self.subject(&access.source, scope) {
                    Subject::Record(record) => Subject::Value(record.value(name).unwrap_or(Value::Null)),
                    Subject::Value(value) => Subject::Value(value.member(name).cloned().unwrap_or(Value::Null)),
                }
            }
            _ => Subject::Value(self.evaluate(node, scope)),
        }
    }
}

/// A null collection quantifies like an empty one.
fn collection(value: Value) -> Vec<Value> {
    match value {
        Value::Collection(items) => items,
        _ => Vec::new(),
    }
}

fn compare(op: BinaryOperator, left: &Value, right: &Value) -> Value {
    let result = match op {
        BinaryOperator::Eq => left.loosely_equals(right),
        BinaryOperator::Ne => !left.loosely_equals(right),
        _ => match left.compare(right) {
            Some(ordering) => match op {
                BinaryOperator::Gt => ordering.is_gt(),
                BinaryOperator::Ge => ordering.is_ge(),
                BinaryOperator::Lt => ordering.is_lt(),
                BinaryOperator::Le => ordering.is_le(),
                _ => false,
            },
            // ordering against null is never satisfied
            None => false,
        },
    };
    Value::Bool(result)
}

fn arithmetic(op: BinaryOperator, left: &Value, right: &Value, ty: Option<PrimitiveType>) -> Value {
    if left.is_null() || right.is_null() {
        return Value::Null;
    }
    if ty == Some(PrimitiveType::Double) {
        let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) else { return Value::Null };
        return Value::F64(match op {
            BinaryOperator::Add => l + r,
            BinaryOperator::Sub => l - r,
            BinaryOperator::Mul => l * r,
            BinaryOperator::Div => l / r,
            BinaryOperator::Mod => l % r,
            _ => return Value::Null,
        });
    }
    let (Some(l), Some(r)) = (left.as_i64(), right.as_i64()) else { return Value::Null };
    let result = match op {
        BinaryOperator::Add => l.checked_add(r),
        BinaryOperator::Sub => l.checked_sub(r),
        BinaryOperator::Mul => l.checked_mul(r),
        BinaryOperator::Div => l.checked_div(r),
        BinaryOperator::Mod => l.checked_rem(r),
        _ => None,
    };
    // computed in i64, then narrowed back to the operand width
    match (result, ty) {
        (Some(n), Some(target)) => Value::I64(n).cast_to(target).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn call_function(function: FunctionName, args: &[Value]) -> Value {
    let text = |i: usize| args.get(i).and_then(Value::as_str).unwrap_or_default();
    let datetime = || match args.first() {
        Some(Value::DateTime(dt)) => Some(*dt),
        _ => None,
    };
    let number = || args.first().and_then(Value::as_f64);

    match function {
        FunctionName::SubstringOf => Value::Bool(text(1).contains(text(0))),
        FunctionName::EndsWith => Value::Bool(text(0).ends_with(text(1))),
        FunctionName::StartsWith => Value::Bool(text(0).starts_with(text(1))),
        FunctionName::Length => i32::try_from(text(0).chars().count()).map(Value::I32).unwrap_or(Value::Null),
        FunctionName::IndexOf => {
            let haystack = text(0);
            let index = haystack.find(text(1)).map(|byte| haystack[..byte].chars().count() as i64).unwrap_or(-1);
            Value::I64(index).cast_to(PrimitiveType::Int32).unwrap_or(Value::Null)
        }
        FunctionName::Replace => Value::String(text(0).replace(text(1), text(2))),
        FunctionName::Substring => substring(text(0), args.get(1).and_then(Value::as_i64), args.get(2).and_then(Value::as_i64)),
        FunctionName::ToLower => Value::String(text(0).to_lowercase()),
        FunctionName::ToUpper => Value::String(text(0).to_uppercase()),
        FunctionName::Trim => Value::String(text(0).trim().to_string()),
        FunctionName::Concat => Value::String(format!("{}{}", text(0), text(1))),
        FunctionName::Year => datetime().map(|dt| Value::I32(dt.year())).unwrap_or(Value::Null),
        FunctionName::Month => datetime().map(|dt| Value::I32(dt.month() as i32)).unwrap_or(Value::Null),
        FunctionName::Day => datetime().map(|dt| Value::I32(dt.day() as i32)).unwrap_or(Value::Null),
        FunctionName::Hour => datetime().map(|dt| Value::I32(dt.hour() as i32)).unwrap_or(Value::Null),
        FunctionName::Minute => datetime().map(|dt| Value::I32(dt.minute() as i32)).unwrap_or(Value::Null),
        FunctionName::Second => datetime().map(|dt| Value::I32(dt.second() as i32)).unwrap_or(Value::Null),
        FunctionName::Round => number().map(|n| Value::F64(n.round_ties_even())).unwrap_or(Value::Null),
        FunctionName::Floor => number().map(|n| Value::F64(n.floor())).unwrap_or(Value::Null),
        FunctionName::Ceiling => number().map(|n| Value::F64(n.ceil())).unwrap_or(Value::Null),
        FunctionName::Any | FunctionName::All => Value::Null,
    }
}

/// Character based. A start outside the string or a negative length yields null.
fn substring(text: &str, start: Option<i64>, length: Option<i64>) -> Value {
    let Some(start) = start.and_then(|s| usize::try_from(s).ok()) else { return Value::Null };
    let count = text.chars().count();
    if start > count {
        return Value::Null;
    }
    let rest = text.chars().skip(start);
    match length {
        None => Value::String(rest.collect()),
        Some(length) => match usize::try_from(length) {
            Ok(length) => Value::String(rest.take(length).collect()),
            Err(_) => Value::Null,
        },
    }
}
