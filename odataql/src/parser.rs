use crate::ast::{
    AllNode, AnyNode, BinaryNode, BinaryOperator, FunctionCallNode, FunctionName, Node, NodeKind, OrderByClause, OrderByTerm,
    OrderDirection, PropertyAccessNode, RangeVariableNode, TypeCastNode, UnaryNode, UnaryOperator, IT,
};
use crate::error::ParseError;
use crate::functions;
use crate::grammar::{ODataParser, Rule};
use crate::schema::{PrimitiveType, QueryContext, TypeRef};
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use pest::iterators::Pair;
use pest::Parser;
use std::str::FromStr;
use tracing::debug;

/// Deepest nesting accepted, both of parentheses in the raw text and of the bound tree.
pub const MAX_DEPTH: usize = 100;

/// Parse a `$filter` expression and bind it against the context's element type.
/// The result is always Boolean-typed.
pub fn parse_filter(input: &str, context: &QueryContext) -> Result<Node, ParseError> {
    debug!("parse_filter: {}", input);
    if input.trim().is_empty() {
        return Err(ParseError::EmptyExpression);
    }
    check_nesting(input)?;
    let filter = ODataParser::parse(Rule::Filter, input)?.next().ok_or(ParseError::EmptyExpression)?;
    let expr = filter.into_inner().next().ok_or(ParseError::EmptyExpression)?;
    let position = expr.as_span().start();

    let node = Binder::new(context).bind(expr)?;
    if !node.ty.is_boolean() {
        return Err(ParseError::TypeMismatch { expected: PrimitiveType::Boolean.edm_name().into(), found: node.ty, position });
    }
    Ok(node)
}

/// Parse a comma separated `$orderby` clause. Terms keep their source order.
pub fn parse_order_by(input: &str, context: &QueryContext) -> Result<OrderByClause, ParseError> {
    debug!("parse_order_by: {}", input);
    if input.trim().is_empty() {
        return Err(ParseError::EmptyExpression);
    }
    check_nesting(input)?;
    let order_by = ODataParser::parse(Rule::OrderBy, input)?.next().ok_or(ParseError::EmptyExpression)?;

    let mut binder = Binder::new(context);
    let mut terms = Vec::new();
    for term in order_by.into_inner().filter(|p| p.as_rule() == Rule::OrderByTerm) {
        let mut inner = term.into_inner();
        let expr = inner.next().ok_or(ParseError::EmptyExpression)?;
        let direction = match inner.next().map(|p| p.as_rule()) {
            Some(Rule::Desc) => OrderDirection::Descending,
            _ => OrderDirection::Ascending,
        };
        terms.push(OrderByTerm { expr: binder.bind(expr)?, direction });
    }
    Ok(OrderByClause { terms })
}

/// Rejects parenthesis nesting past [`MAX_DEPTH`] before pest recurses into it. Quoted literals are skipped.
fn check_nesting(input: &str) -> Result<(), ParseError> {
    let (mut depth, mut quoted) = (0usize, false);
    for (position, c) in input.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '(' if !quoted => {
                depth += 1;
                if depth > MAX_DEPTH {
                    return Err(ParseError::TooDeep { limit: MAX_DEPTH, position });
                }
            }
            ')' if !quoted => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

fn limit_depth(node: Node, position: usize) -> Result<Node, ParseError> {
    if node.depth() > MAX_DEPTH {
        return Err(ParseError::TooDeep { limit: MAX_DEPTH, position });
    }
    Ok(node)
}

/// Steps through precedence levels and parentheses that wrap a single operand.
fn collapse(mut pair: Pair<Rule>) -> Pair<Rule> {
    loop {
        match pair.as_rule() {
            Rule::Expr
            | Rule::AndExpr
            | Rule::CmpExpr
            | Rule::AddExpr
            | Rule::MulExpr
            | Rule::UnaryExpr
            | Rule::ExpressionInParentheses => {
                let mut inner = pair.clone().into_inner();
                match (inner.next(), inner.next()) {
                    (Some(only), None) => pair = only,
                    _ => return pair,
                }
            }
            _ => return pair,
        }
    }
}

fn syntax(position: usize, message: impl Into<String>) -> ParseError { ParseError::Syntax { position, message: message.into() } }

fn mismatch(expected: impl Into<String>, found: &TypeRef, position: usize) -> ParseError {
    ParseError::TypeMismatch { expected: expected.into(), found: found.clone(), position }
}

/// Resolves names against the model while walking the pest parse tree.
struct Binder<'a> {
    context: &'a QueryContext,
    /// Range variables visible at the current point, innermost last. `$it` is always at the bottom.
    scope: Vec<(String, TypeRef)>,
}

impl<'a> Binder<'a> {
    fn new(context: &'a QueryContext) -> Self {
        let root = TypeRef::structured(context.element_type().name());
        Self { context, scope: vec![(IT.to_string(), root)] }
    }

    fn lookup(&self, name: &str) -> Option<&TypeRef> { self.scope.iter().rev().find(|(n, _)| n == name).map(|(_, ty)| ty) }

    fn bind(&mut self, pair: Pair<Rule>) -> Result<Node, ParseError> {
        let pair = collapse(pair);
        let position = pair.as_span().start();
        match pair.as_rule() {
            Rule::Expr | Rule::AndExpr | Rule::CmpExpr | Rule::AddExpr | Rule::MulExpr => self.bind_binary_chain(pair),
            Rule::UnaryExpr => self.bind_unary(pair),
            Rule::Null => Ok(Node::constant(Value::Null)),
            Rule::True => Ok(Node::constant(Value::Bool(true))),
            Rule::False => Ok(Node::constant(Value::Bool(false))),
            Rule::StringLiteral => {
                let body = pair.into_inner().next().map(|b| b.as_str()).unwrap_or_default();
                Ok(Node::constant(Value::String(body.replace("''", "'"))))
            }
            Rule::GuidLiteral => {
                let body = pair.into_inner().next().map(|b| b.as_str()).unwrap_or_default();
                let guid = uuid::Uuid::parse_str(body)
                    .map_err(|_| ParseError::InvalidLiteral { kind: "guid", text: body.to_string(), position })?;
                Ok(Node::constant(Value::Guid(guid)))
            }
            Rule::DateTimeLiteral => {
                let body = pair.into_inner().next().map(|b| b.as_str()).unwrap_or_default();
                let datetime =
                    parse_datetime(body).ok_or_else(|| ParseError::InvalidLiteral { kind: "datetime", text: body.to_string(), position })?;
                Ok(Node::constant(Value::DateTime(datetime)))
            }
            Rule::Number => parse_number(pair.as_str(), position).map(Node::constant),
            Rule::FunctionCall => self.bind_function_call(pair),
            Rule::MemberPath => self.bind_member_path(pair),
            other => Err(syntax(position, format!("unexpected {:?}", other))),
        }
    }

    /// Left-folds one precedence level: `operand (op operand)*`.
    fn bind_binary_chain(&mut self, pair: Pair<Rule>) -> Result<Node, ParseError> {
        let position = pair.as_span().start();
        let mut inner = pair.into_inner();
        let first = inner.next().ok_or_else(|| syntax(position, "missing operand"))?;
        let mut left = self.bind(first)?;

        while let Some(op) = inner.next() {
            let op_position = op.as_span().start();
            let operator = binary_operator(op.as_rule()).ok_or_else(|| syntax(op_position, format!("unexpected {:?}", op.as_rule())))?;
            let right = inner.next().ok_or_else(|| syntax(op_position, format!("missing right operand of '{}'", operator)))?;
            let right = self.bind(right)?;
            left = limit_depth(bind_binary(operator, left, right, op_position)?, op_position)?;
        }
        Ok(left)
    }

    fn bind_unary(&mut self, pair: Pair<Rule>) -> Result<Node, ParseError> {
        let position = pair.as_span().start();
        let mut prefixes = Vec::new();
        let mut primary = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::Not => prefixes.push((UnaryOperator::Not, inner.as_span().start())),
                Rule::Neg => prefixes.push((UnaryOperator::Negate, inner.as_span().start())),
                _ => primary = Some(inner),
            }
        }
        let mut node = self.bind(primary.ok_or_else(|| syntax(position, "missing operand"))?)?;

        // innermost prefix applies first
        for (op, op_position) in prefixes.into_iter().rev() {
            node = match op {
                UnaryOperator::Not => {
                    let operand = expect_boolean(node, op_position)?;
                    Node::new(NodeKind::Unary(UnaryNode { op, operand: Box::new(operand) }), PrimitiveType::Boolean)
                }
                UnaryOperator::Negate => match node.ty.as_primitive() {
                    Some(p) if p.is_numeric() => Node::new(NodeKind::Unary(UnaryNode { op, operand: Box::new(node) }), p),
                    _ => return Err(mismatch("a numeric operand", &node.ty, op_position)),
                },
            };
            node = limit_depth(node, op_position)?;
        }
        Ok(node)
    }

    fn bind_function_call(&mut self, pair: Pair<Rule>) -> Result<Node, ParseError> {
        let position = pair.as_span().start();
        let mut inner = pair.into_inner();
        let name = inner.next().map(|p| p.as_str()).ok_or_else(|| syntax(position, "missing function name"))?;
        let (function, signature) = FunctionName::from_str(name)
            .ok()
            .and_then(|f| functions::signature(f).map(|s| (f, s)))
            .ok_or_else(|| ParseError::UnknownFunction { name: name.to_string(), position })?;

        let args: Vec<Pair<Rule>> = inner.collect();
        if !signature.accepts_arity(args.len()) {
            return Err(ParseError::ArityMismatch {
                function: name.to_string(),
                expected: signature.arity(),
                found: args.len(),
                position,
            });
        }

        let mut bound = Vec::with_capacity(args.len());
        for (arg, param) in args.into_iter().zip(signature.params) {
            let arg_position = arg.as_span().start();
            let node = self.bind(arg)?;
            bound.push(coerce(node, *param, arg_position)?);
        }
        limit_depth(Node::new(NodeKind::FunctionCall(FunctionCallNode { function, args: bound }), signature.returns), position)
    }

    fn bind_member_path(&mut self, pair: Pair<Rule>) -> Result<Node, ParseError> {
        let mut segments = pair.into_inner().peekable();

        // A path starts at a range variable in scope, or implicitly at `$it`.
        let mut current = match segments.peek() {
            Some(first) if first.as_rule() == Rule::Identifier && self.lookup(first.as_str()).is_some() => {
                let name = first.as_str();
                let ty = self.lookup(name).cloned().unwrap_or(TypeRef::Null);
                segments.next();
                Node::range_variable(name, ty)
            }
            _ => Node::range_variable(IT, TypeRef::structured(self.context.element_type().name())),
        };
        let (mut last_segment, mut last_position) = (String::new(), 0);

        for segment in segments {
            let position = segment.as_span().start();
            let text = segment.as_str();
            match segment.as_rule() {
                Rule::QualifiedName => {
                    let owner = current.ty.structured_name().ok_or_else(|| ParseError::InvalidCast {
                        source_type: current.ty.to_string(),
                        target: text.to_string(),
                        position,
                    })?;
                    let target = self.context.model().resolve_cast(owner, text, position)?;
                    let ty = match current.ty {
                        TypeRef::Collection(_) => TypeRef::collection(TypeRef::structured(target.name())),
                        _ => TypeRef::structured(target.name()),
                    };
                    let cast = TypeCastNode { source: Box::new(current), target: target.name().to_string() };
                    current = Node::new(NodeKind::TypeCast(cast), ty);
                }
                Rule::Identifier => {
                    if current.ty.is_collection() {
                        return Err(ParseError::CollectionNotQuantified { name: last_segment, position });
                    }
                    let owner = match &current.ty {
                        TypeRef::Structured(owner) => owner.clone(),
                        other => {
                            return Err(ParseError::UnknownProperty { name: text.to_string(), owner: other.to_string(), position });
                        }
                    };
                    let property = self.context.model().resolve_property(&owner, text).ok_or_else(|| ParseError::UnknownProperty {
                        name: text.to_string(),
                        owner,
                        position,
                    })?;
                    let ty = property.ty().clone();
                    current = Node::new(NodeKind::PropertyAccess(PropertyAccessNode { source: Box::new(current), property }), ty);
                }
                Rule::Lambda => {
                    current = self.bind_lambda(current, segment)?;
                }
                other => return Err(syntax(position, format!("unexpected {:?}", other))),
            }
            current = limit_depth(current, position)?;
            last_segment = text.to_string();
            last_position = position;
        }

        if current.ty.is_collection() {
            return Err(ParseError::CollectionNotQuantified { name: last_segment, position: last_position });
        }
        Ok(current)
    }

    fn bind_lambda(&mut self, source: Node, pair: Pair<Rule>) -> Result<Node, ParseError> {
        let position = pair.as_span().start();
        let element = match source.ty.element_type() {
            Some(element) => element.clone(),
            None => return Err(mismatch("a collection", &source.ty, position)),
        };

        let mut inner = pair.into_inner();
        let quantifier = inner.next().map(|p| p.as_rule()).ok_or_else(|| syntax(position, "missing lambda operator"))?;
        let lambda = match (inner.next(), inner.next()) {
            (Some(variable), Some(body)) => {
                let name = variable.as_str().to_string();
                if self.lookup(&name).is_some() {
                    return Err(ParseError::DuplicateRangeVariable { name, position: variable.as_span().start() });
                }
                let body_position = body.as_span().start();
                self.scope.push((name.clone(), element));
                let body = self.bind(body);
                self.scope.pop();
                Some((RangeVariableNode { name }, Box::new(expect_boolean(body?, body_position)?)))
            }
            _ => None,
        };

        let kind = match (quantifier, lambda) {
            (Rule::Any, Some((variable, body))) => {
                NodeKind::Any(AnyNode { source: Box::new(source), variable: Some(variable), body: Some(body) })
            }
            (Rule::Any, None) => NodeKind::Any(AnyNode { source: Box::new(source), variable: None, body: None }),
            (Rule::All, Some((variable, body))) => NodeKind::All(AllNode { source: Box::new(source), variable, body }),
            (Rule::All, None) => return Err(ParseError::MissingLambdaBody { position }),
            (other, _) => return Err(syntax(position, format!("unexpected {:?}", other))),
        };
        Ok(Node::new(kind, PrimitiveType::Boolean))
    }
}

fn binary_operator(rule: Rule) -> Option<BinaryOperator> {
    Some(match rule {
        Rule::Or => BinaryOperator::Or,
        Rule::And => BinaryOperator::And,
        Rule::Eq => BinaryOperator::Eq,
        Rule::Ne => BinaryOperator::Ne,
        Rule::Gt => BinaryOperator::Gt,
        Rule::Ge => BinaryOperator::Ge,
        Rule::Lt => BinaryOperator::Lt,
        Rule::Le => BinaryOperator::Le,
        Rule::Add => BinaryOperator::Add,
        Rule::Sub => BinaryOperator::Sub,
        Rule::Mul => BinaryOperator::Mul,
        Rule::Div => BinaryOperator::Div,
        Rule::Mod => BinaryOperator::Mod,
        _ => return None,
    })
}

fn bind_binary(op: BinaryOperator, left: Node, right: Node, position: usize) -> Result<Node, ParseError> {
    let (left, right, ty) = match op {
        BinaryOperator::And | BinaryOperator::Or => {
            (expect_boolean(left, position)?, expect_boolean(right, position)?, TypeRef::from(PrimitiveType::Boolean))
        }
        _ if op.is_comparison() => {
            let (left, right) = unify(left, right, position)?;
            (left, right, TypeRef::from(PrimitiveType::Boolean))
        }
        _ => {
            let (left, right) = unify(left, right, position)?;
            match left.ty.as_primitive() {
                Some(p) if p.is_numeric() => (left, right, TypeRef::from(p)),
                _ => return Err(mismatch("numeric operands", &left.ty, position)),
            }
        }
    };
    Ok(Node::new(NodeKind::Binary(BinaryNode { op, left: Box::new(left), right: Box::new(right) }), ty))
}

/// Brings both operands to one primitive type, widening the narrower numeric side through a `Convert`
/// node. An untyped `null` takes the type of the other side.
fn unify(left: Node, right: Node, position: usize) -> Result<(Node, Node), ParseError> {
    match (&left.ty, &right.ty) {
        (TypeRef::Null, TypeRef::Null) => Ok((left, right)),
        (TypeRef::Null, TypeRef::Primitive(p)) => {
            let p = *p;
            Ok((Node { ty: p.into(), ..left }, right))
        }
        (TypeRef::Primitive(p), TypeRef::Null) => {
            let p = *p;
            Ok((left, Node { ty: p.into(), ..right }))
        }
        (TypeRef::Primitive(a), TypeRef::Primitive(b)) if a == b => Ok((left, right)),
        (TypeRef::Primitive(a), TypeRef::Primitive(b)) => match PrimitiveType::promote(*a, *b) {
            Some(target) => Ok((widen(left, target), widen(right, target))),
            None => Err(mismatch(a.edm_name(), &right.ty, position)),
        },
        (TypeRef::Primitive(_) | TypeRef::Null, other) | (other, _) => Err(mismatch("a primitive operand", other, position)),
    }
}

fn widen(node: Node, target: PrimitiveType) -> Node {
    if node.ty.as_primitive() == Some(target) {
        node
    } else {
        node.convert(target)
    }
}

/// Fits a function argument to its declared parameter type.
fn coerce(node: Node, param: PrimitiveType, position: usize) -> Result<Node, ParseError> {
    match node.ty {
        TypeRef::Null => Ok(Node { ty: param.into(), ..node }),
        TypeRef::Primitive(p) if p == param => Ok(node),
        TypeRef::Primitive(p) if p.widens_to(param) => Ok(node.convert(param)),
        _ => Err(mismatch(param.edm_name(), &node.ty, position)),
    }
}

fn expect_boolean(node: Node, position: usize) -> Result<Node, ParseError> {
    match node.ty {
        TypeRef::Primitive(PrimitiveType::Boolean) => Ok(node),
        TypeRef::Null => Ok(Node { ty: PrimitiveType::Boolean.into(), ..node }),
        _ => Err(mismatch(PrimitiveType::Boolean.edm_name(), &node.ty, position)),
    }
}

/// Integers are Int32 unless they do not fit or carry an `L` suffix. A fraction, an exponent, or a
/// `d` suffix makes a Double.
fn parse_number(text: &str, position: usize) -> Result<Value, ParseError> {
    let invalid = || ParseError::InvalidLiteral { kind: "number", text: text.to_string(), position };
    if let Some(digits) = text.strip_suffix(['L', 'l']) {
        return digits.parse::<i64>().map(Value::I64).map_err(|_| invalid());
    }
    if let Some(digits) = text.strip_suffix(['d', 'D']) {
        return digits.parse::<f64>().map(Value::F64).map_err(|_| invalid());
    }
    if text.contains(['.', 'e', 'E']) {
        return text.parse::<f64>().map(Value::F64).map_err(|_| invalid());
    }
    match text.parse::<i32>() {
        Ok(n) => Ok(Value::I32(n)),
        Err(_) => text.parse::<i64>().map(Value::I64).map_err(|_| invalid()),
    }
}

/// RFC 3339 with an offset, or a naive date/time which is taken as UTC.
fn parse_datetime(text: &str) -> Option<DateTime<chrono::FixedOffset>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().and_then(|date| date.and_hms_opt(0, 0, 0)))
        .map(|naive| naive.and_utc().fixed_offset())
}
