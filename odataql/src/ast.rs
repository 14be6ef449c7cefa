//! Schema-bound syntax tree produced by [`crate::parser`].
//!
//! Every [`Node`] carries the [`TypeRef`] it was resolved to, so later stages never look names up again.

use crate::schema::{PrimitiveType, PropertyRef, TypeRef};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Name of the implicit range variable bound to the element being filtered.
pub const IT: &str = "$it";

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Constant(Value),
    PropertyAccess(PropertyAccessNode),
    RangeVariable(RangeVariableNode),
    TypeCast(TypeCastNode),
    Binary(BinaryNode),
    Unary(UnaryNode),
    FunctionCall(FunctionCallNode),
    Convert(ConvertNode),
    Any(AnyNode),
    All(AllNode),
}

/// Access of `property` on the value produced by `source`. Collection-valued when the property is.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyAccessNode {
    pub source: Box<Node>,
    pub property: PropertyRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeVariableNode {
    pub name: String,
}

/// A `Namespace.Type` path segment. Elements not of the target type evaluate to null.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeCastNode {
    pub source: Box<Node>,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryNode {
    pub op: BinaryOperator,
    pub left: Box<Node>,
    pub right: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryNode {
    pub op: UnaryOperator,
    pub operand: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallNode {
    pub function: FunctionName,
    pub args: Vec<Node>,
}

/// Implicit widening inserted by the binder; the target is the node's type.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertNode {
    pub operand: Box<Node>,
    pub target: PrimitiveType,
}

/// `source/any()` or `source/any(variable: body)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnyNode {
    pub source: Box<Node>,
    pub variable: Option<RangeVariableNode>,
    pub body: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllNode {
    pub source: Box<Node>,
    pub variable: RangeVariableNode,
    pub body: Box<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum BinaryOperator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOperator {
    /// Comparisons and boolean connectives.
    pub fn is_logical(self) -> bool { !self.is_arithmetic() }

    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinaryOperator::Add | BinaryOperator::Sub | BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::Mod)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq | BinaryOperator::Ne | BinaryOperator::Gt | BinaryOperator::Ge | BinaryOperator::Lt | BinaryOperator::Le
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum UnaryOperator {
    Not,
    Negate,
}

/// Built-in functions. `Any` and `All` are lambda operators rather than callable names, but live here
/// so a policy can restrict them alongside the other functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FunctionName {
    SubstringOf,
    EndsWith,
    StartsWith,
    Length,
    IndexOf,
    Replace,
    Substring,
    ToLower,
    ToUpper,
    Trim,
    Concat,
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Round,
    Floor,
    Ceiling,
    Any,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum OrderDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByTerm {
    pub expr: Node,
    pub direction: OrderDirection,
}

/// `$orderby` terms in clause order; the first term is the primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByClause {
    pub terms: Vec<OrderByTerm>,
}

impl Node {
    pub fn new(kind: NodeKind, ty: impl Into<TypeRef>) -> Self { Self { kind, ty: ty.into() } }

    pub fn constant(value: Value) -> Self {
        let ty = value.primitive_type().map(TypeRef::Primitive).unwrap_or(TypeRef::Null);
        Self { kind: NodeKind::Constant(value), ty }
    }

    pub fn range_variable(name: impl Into<String>, ty: TypeRef) -> Self {
        Self { kind: NodeKind::RangeVariable(RangeVariableNode { name: name.into() }), ty }
    }

    pub fn convert(self, target: PrimitiveType) -> Self {
        Self { kind: NodeKind::Convert(ConvertNode { operand: Box::new(self), target }), ty: TypeRef::Primitive(target) }
    }

    /// Nodes on the longest path from this node down to a leaf, counting this one.
    pub fn depth(&self) -> usize {
        let children: Vec<&Node> = match &self.kind {
            NodeKind::Constant(_) | NodeKind::RangeVariable(_) => Vec::new(),
            NodeKind::PropertyAccess(access) => vec![&*access.source],
            NodeKind::TypeCast(cast) => vec![&*cast.source],
            NodeKind::Binary(binary) => vec![&*binary.left, &*binary.right],
            NodeKind::Unary(unary) => vec![&*unary.operand],
            NodeKind::FunctionCall(call) => call.args.iter().collect(),
            NodeKind::Convert(convert) => vec![&*convert.operand],
            NodeKind::Any(any) => std::iter::once(&*any.source).chain(any.body.as_deref()).collect(),
            NodeKind::All(all) => vec![&*all.source, &*all.body],
        };
        1 + children.into_iter().map(Node::depth).max().unwrap_or(0)
    }

    /// True for a property access whose property is collection-valued.
    pub fn is_collection_access(&self) -> bool {
        matches!(&self.kind, NodeKind::PropertyAccess(access) if access.property.is_collection())
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            NodeKind::Constant(value) => write!(f, "{}", value),
            NodeKind::PropertyAccess(access) => match &access.source.kind {
                NodeKind::RangeVariable(var) if var.name == IT => write!(f, "{}", access.property.name()),
                _ => write!(f, "{}/{}", access.source, access.property.name()),
            },
            NodeKind::RangeVariable(var) => write!(f, "{}", var.name),
            NodeKind::TypeCast(cast) => match &cast.source.kind {
                NodeKind::RangeVariable(var) if var.name == IT => write!(f, "{}", cast.target),
                _ => write!(f, "{}/{}", cast.source, cast.target),
            },
            NodeKind::Binary(binary) => write!(f, "({} {} {})", binary.left, binary.op, binary.right),
            NodeKind::Unary(unary) => match unary.op {
                UnaryOperator::Not => write!(f, "not {}", unary.operand),
                UnaryOperator::Negate => write!(f, "-{}", unary.operand),
            },
            NodeKind::FunctionCall(call) => {
                write!(f, "{}(", call.function)?;
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            NodeKind::Convert(convert) => write!(f, "{}", convert.operand),
            NodeKind::Any(any) => match (&any.variable, &any.body) {
                (Some(var), Some(body)) => write!(f, "{}/any({}: {})", any.source, var.name, body),
                _ => write!(f, "{}/any()", any.source),
            },
            NodeKind::All(all) => write!(f, "{}/all({}: {})", all.source, all.variable.name, all.body),
        }
    }
}
