//! What a query may contain: operator, function and option allow-lists plus paging bounds.

use crate::error::ConfigError;
use odataql::ast::{BinaryOperator, FunctionName, UnaryOperator};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt::{self, Display};
use std::marker::PhantomData;
use std::str::FromStr;
use strum::{EnumIter, EnumString, IntoEnumIterator};

/// An enumerated tag that can be allowed or disallowed by a policy. Each tag owns one bit,
/// assigned in declaration order.
pub trait PolicyTag: Copy + PartialEq + fmt::Debug + Display + FromStr + IntoEnumIterator + Send + Sync + 'static {
    const NAME: &'static str;

    fn bit(self) -> u64 { Self::iter().position(|tag| tag == self).map(|i| 1 << i).unwrap_or(0) }

    fn all_bits() -> u64 { Self::iter().fold(0, |bits, tag| bits | tag.bit()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ArithmeticOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// Unary minus
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum LogicalOperator {
    Or,
    And,
    Not,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, EnumString, EnumIter)]
pub enum QueryOptionKind {
    #[strum(serialize = "$filter")]
    Filter,
    #[strum(serialize = "$orderby")]
    OrderBy,
    #[strum(serialize = "$skip")]
    Skip,
    #[strum(serialize = "$top")]
    Top,
}

impl PolicyTag for ArithmeticOperator {
    const NAME: &'static str = "arithmetic operator";
}
impl PolicyTag for LogicalOperator {
    const NAME: &'static str = "logical operator";
}
impl PolicyTag for FunctionName {
    const NAME: &'static str = "function";
}
impl PolicyTag for QueryOptionKind {
    const NAME: &'static str = "query option";
}

impl ArithmeticOperator {
    pub fn from_binary(op: BinaryOperator) -> Option<Self> {
        Some(match op {
            BinaryOperator::Add => Self::Add,
            BinaryOperator::Sub => Self::Sub,
            BinaryOperator::Mul => Self::Mul,
            BinaryOperator::Div => Self::Div,
            BinaryOperator::Mod => Self::Mod,
            _ => return None,
        })
    }
}

impl LogicalOperator {
    pub fn from_binary(op: BinaryOperator) -> Option<Self> {
        Some(match op {
            BinaryOperator::Or => Self::Or,
            BinaryOperator::And => Self::And,
            BinaryOperator::Eq => Self::Eq,
            BinaryOperator::Ne => Self::Ne,
            BinaryOperator::Gt => Self::Gt,
            BinaryOperator::Ge => Self::Ge,
            BinaryOperator::Lt => Self::Lt,
            BinaryOperator::Le => Self::Le,
            _ => return None,
        })
    }
}

/// Which policy tag gates a unary operator.
pub enum UnaryTag {
    Logical(LogicalOperator),
    Arithmetic(ArithmeticOperator),
}

impl From<UnaryOperator> for UnaryTag {
    fn from(op: UnaryOperator) -> Self {
        match op {
            UnaryOperator::Not => UnaryTag::Logical(LogicalOperator::Not),
            UnaryOperator::Negate => UnaryTag::Arithmetic(ArithmeticOperator::Negate),
        }
    }
}

/// A set of allowed tags, stored as one bit per tag.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AllowedSet<T: PolicyTag> {
    bits: u64,
    _tag: PhantomData<T>,
}

impl<T: PolicyTag> AllowedSet<T> {
    pub fn all() -> Self { Self { bits: T::all_bits(), _tag: PhantomData } }

    pub fn none() -> Self { Self { bits: 0, _tag: PhantomData } }

    pub fn only(tags: impl IntoIterator<Item = T>) -> Self {
        let mut set = Self::none();
        for tag in tags {
            set.insert(tag);
        }
        set
    }

    /// Every tag except the given ones.
    pub fn except(tags: impl IntoIterator<Item = T>) -> Self {
        let mut set = Self::all();
        for tag in tags {
            set.remove(tag);
        }
        set
    }

    /// Builds a set from raw bits, rejecting bits that do not belong to any tag.
    pub fn from_bits(bits: u64) -> Result<Self, ConfigError> {
        if bits & !T::all_bits() != 0 {
            return Err(ConfigError::UnknownFlags { tag: T::NAME, bits: bits & !T::all_bits() });
        }
        Ok(Self { bits, _tag: PhantomData })
    }

    pub fn bits(&self) -> u64 { self.bits }

    pub fn contains(&self, tag: T) -> bool { self.bits & tag.bit() != 0 }

    pub fn insert(&mut self, tag: T) { self.bits |= tag.bit(); }

    pub fn remove(&mut self, tag: T) { self.bits &= !tag.bit(); }

    pub fn is_empty(&self) -> bool { self.bits == 0 }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ { T::iter().filter(move |tag| self.contains(*tag)) }
}

impl<T: PolicyTag> Default for AllowedSet<T> {
    fn default() -> Self { Self::all() }
}

impl<T: PolicyTag> fmt::Debug for AllowedSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.debug_set().entries(self.iter()).finish() }
}

impl<T: PolicyTag> FromIterator<T> for AllowedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self { Self::only(iter) }
}

// Sets are written as lists of tag names so configuration files stay readable.
impl<T: PolicyTag> Serialize for AllowedSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(|tag| tag.to_string()))
    }
}

impl<'de, T: PolicyTag> Deserialize<'de> for AllowedSet<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        names
            .iter()
            .map(|name| T::from_str(name).map_err(|_| de::Error::custom(format!("unknown {} '{}'", T::NAME, name))))
            .collect()
    }
}

/// Limits applied by the validators. The default allows everything and sets no bounds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "PolicyConfig")]
pub struct ValidationPolicy {
    allowed_arithmetic_operators: AllowedSet<ArithmeticOperator>,
    allowed_logical_operators: AllowedSet<LogicalOperator>,
    allowed_functions: AllowedSet<FunctionName>,
    allowed_query_options: AllowedSet<QueryOptionKind>,
    /// Empty means any property may be ordered by.
    allowed_order_by_properties: BTreeSet<String>,
    max_skip: Option<u64>,
    max_top: Option<u64>,
}

impl ValidationPolicy {
    pub fn new() -> Self { Self::default() }

    pub fn allowed_arithmetic_operators(&self) -> &AllowedSet<ArithmeticOperator> { &self.allowed_arithmetic_operators }

    pub fn allowed_logical_operators(&self) -> &AllowedSet<LogicalOperator> { &self.allowed_logical_operators }

    pub fn allowed_functions(&self) -> &AllowedSet<FunctionName> { &self.allowed_functions }

    pub fn allowed_query_options(&self) -> &AllowedSet<QueryOptionKind> { &self.allowed_query_options }

    pub fn allowed_order_by_properties(&self) -> &BTreeSet<String> { &self.allowed_order_by_properties }

    pub fn max_skip(&self) -> Option<u64> { self.max_skip }

    pub fn max_top(&self) -> Option<u64> { self.max_top }

    pub fn set_allowed_arithmetic_operators(&mut self, set: AllowedSet<ArithmeticOperator>) -> &mut Self {
        self.allowed_arithmetic_operators = set;
        self
    }

    pub fn set_allowed_logical_operators(&mut self, set: AllowedSet<LogicalOperator>) -> &mut Self {
        self.allowed_logical_operators = set;
        self
    }

    pub fn set_allowed_functions(&mut self, set: AllowedSet<FunctionName>) -> &mut Self {
        self.allowed_functions = set;
        self
    }

    pub fn set_allowed_query_options(&mut self, set: AllowedSet<QueryOptionKind>) -> &mut Self {
        self.allowed_query_options = set;
        self
    }

    pub fn allow_order_by_property(&mut self, name: impl Into<String>) -> &mut Self {
        self.allowed_order_by_properties.insert(name.into());
        self
    }

    pub fn set_max_skip(&mut self, max: Option<i64>) -> Result<&mut Self, ConfigError> {
        self.max_skip = non_negative("max_skip", max)?;
        Ok(self)
    }

    pub fn set_max_top(&mut self, max: Option<i64>) -> Result<&mut Self, ConfigError> {
        self.max_top = non_negative("max_top", max)?;
        Ok(self)
    }
}

fn non_negative(name: &'static str, value: Option<i64>) -> Result<Option<u64>, ConfigError> {
    value.map(|v| u64::try_from(v).map_err(|_| ConfigError::NegativeBound { name, value: v })).transpose()
}

/// Deserialized form of [`ValidationPolicy`], range checked on conversion.
#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PolicyConfig {
    allowed_arithmetic_operators: AllowedSet<ArithmeticOperator>,
    allowed_logical_operators: AllowedSet<LogicalOperator>,
    allowed_functions: AllowedSet<FunctionName>,
    allowed_query_options: AllowedSet<QueryOptionKind>,
    allowed_order_by_properties: BTreeSet<String>,
    max_skip: Option<i64>,
    max_top: Option<i64>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allowed_arithmetic_operators: AllowedSet::all(),
            allowed_logical_operators: AllowedSet::all(),
            allowed_functions: AllowedSet::all(),
            allowed_query_options: AllowedSet::all(),
            allowed_order_by_properties: BTreeSet::new(),
            max_skip: None,
            max_top: None,
        }
    }
}

impl TryFrom<PolicyConfig> for ValidationPolicy {
    type Error = ConfigError;

    fn try_from(config: PolicyConfig) -> Result<Self, Self::Error> {
        Ok(ValidationPolicy {
            allowed_arithmetic_operators: config.allowed_arithmetic_operators,
            allowed_logical_operators: config.allowed_logical_operators,
            allowed_functions: config.allowed_functions,
            allowed_query_options: config.allowed_query_options,
            allowed_order_by_properties: config.allowed_order_by_properties,
            max_skip: non_negative("max_skip", config.max_skip)?,
            max_top: non_negative("max_top", config.max_top)?,
        })
    }
}
