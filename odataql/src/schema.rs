//! Entity and complex type metadata that query text is bound against.
//!
//! A [`Model`] is declared once through [`ModelBuilder`] and shared behind an `Arc`.
//! [`QueryContext`] pins the element type a query option is evaluated over.

use crate::error::{ParseError, SchemaError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    Boolean,
    Int16,
    Int32,
    Int64,
    Double,
    String,
    Guid,
    DateTime,
}

impl PrimitiveType {
    fn numeric_rank(self) -> Option<u8> {
        match self {
            PrimitiveType::Int16 => Some(0),
            PrimitiveType::Int32 => Some(1),
            PrimitiveType::Int64 => Some(2),
            PrimitiveType::Double => Some(3),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool { self.numeric_rank().is_some() }

    /// The narrowest numeric type both operands widen to, if any.
    pub fn promote(a: PrimitiveType, b: PrimitiveType) -> Option<PrimitiveType> {
        let (ra, rb) = (a.numeric_rank()?, b.numeric_rank()?);
        Some(if ra >= rb { a } else { b })
    }

    /// True when a value of `self` can be widened to `target` without loss of range.
    pub fn widens_to(self, target: PrimitiveType) -> bool {
        self == target || PrimitiveType::promote(self, target) == Some(target)
    }

    pub fn edm_name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "Edm.Boolean",
            PrimitiveType::Int16 => "Edm.Int16",
            PrimitiveType::Int32 => "Edm.Int32",
            PrimitiveType::Int64 => "Edm.Int64",
            PrimitiveType::Double => "Edm.Double",
            PrimitiveType::String => "Edm.String",
            PrimitiveType::Guid => "Edm.Guid",
            PrimitiveType::DateTime => "Edm.DateTime",
        }
    }
}

/// The resolved type of a property or AST node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    /// An untyped `null` literal that has not been bound to an operand type yet.
    Null,
    Primitive(PrimitiveType),
    Structured(String),
    Collection(Box<TypeRef>),
}

impl TypeRef {
    pub fn structured(name: impl Into<String>) -> Self { TypeRef::Structured(name.into()) }

    pub fn collection(element: impl Into<TypeRef>) -> Self { TypeRef::Collection(Box::new(element.into())) }

    pub fn is_collection(&self) -> bool { matches!(self, TypeRef::Collection(_)) }

    pub fn is_boolean(&self) -> bool { matches!(self, TypeRef::Primitive(PrimitiveType::Boolean)) }

    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            TypeRef::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn element_type(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Collection(element) => Some(element),
            _ => None,
        }
    }

    /// Name of the structured type, looking through one level of collection.
    pub fn structured_name(&self) -> Option<&str> {
        match self {
            TypeRef::Structured(name) => Some(name),
            TypeRef::Collection(element) => match element.as_ref() {
                TypeRef::Structured(name) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<PrimitiveType> for TypeRef {
    fn from(value: PrimitiveType) -> Self { TypeRef::Primitive(value) }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Null => write!(f, "null"),
            TypeRef::Primitive(p) => write!(f, "{}", p.edm_name()),
            TypeRef::Structured(name) => write!(f, "{}", name),
            TypeRef::Collection(element) => write!(f, "Collection({})", element),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    Entity,
    Complex,
}

/// A declared property. Identity is (declaring type, name), so the same property reached
/// through a derived type compares equal to itself reached through its declaring type.
#[derive(Debug, Clone)]
pub struct Property {
    name: String,
    ty: TypeRef,
    declaring_type: String,
}

pub type PropertyRef = Arc<Property>;

impl Property {
    pub fn name(&self) -> &str { &self.name }

    pub fn ty(&self) -> &TypeRef { &self.ty }

    pub fn declaring_type(&self) -> &str { &self.declaring_type }

    pub fn is_collection(&self) -> bool { self.ty.is_collection() }
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool { self.declaring_type == other.declaring_type && self.name == other.name }
}

impl Eq for Property {}

impl Hash for Property {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.declaring_type.hash(state);
        self.name.hash(state);
    }
}

#[derive(Debug, Clone)]
pub struct StructuredType {
    name: String,
    kind: TypeKind,
    base: Option<String>,
    properties: Vec<PropertyRef>,
}

impl StructuredType {
    pub fn name(&self) -> &str { &self.name }

    pub fn kind(&self) -> TypeKind { self.kind }

    pub fn base(&self) -> Option<&str> { self.base.as_deref() }

    /// Properties declared directly on this type (inherited ones are not included).
    pub fn declared_properties(&self) -> &[PropertyRef] { &self.properties }
}

/// An immutable set of structured types keyed by their namespace-qualified name.
#[derive(Debug, Clone, Default)]
pub struct Model {
    types: BTreeMap<String, Arc<StructuredType>>,
}

impl Model {
    pub fn builder() -> ModelBuilder { ModelBuilder::default() }

    pub fn find_type(&self, name: &str) -> Option<&Arc<StructuredType>> { self.types.get(name) }

    /// The type itself followed by its base types, most derived first.
    pub fn hierarchy<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Arc<StructuredType>> + 'a {
        let mut next = self.types.get(name);
        std::iter::from_fn(move || {
            let current = next?;
            next = current.base.as_deref().and_then(|base| self.types.get(base));
            Some(current)
        })
    }

    /// Reflexive: every type is a subtype of itself.
    pub fn is_subtype_of(&self, derived: &str, base: &str) -> bool { self.hierarchy(derived).any(|t| t.name == base) }

    /// Looks `name` up on `owner` and then on each of its base types.
    pub fn resolve_property(&self, owner: &str, name: &str) -> Option<PropertyRef> {
        self.hierarchy(owner).find_map(|t| t.properties.iter().find(|p| p.name == name).cloned())
    }

    /// Validates a cast path segment: the target must be declared and share a hierarchy with `from`.
    pub fn resolve_cast(&self, from: &str, target: &str, position: usize) -> Result<Arc<StructuredType>, ParseError> {
        let target_type =
            self.find_type(target).ok_or_else(|| ParseError::UnknownType { name: target.to_string(), position })?;
        if self.is_subtype_of(target, from) || self.is_subtype_of(from, target) {
            Ok(target_type.clone())
        } else {
            Err(ParseError::InvalidCast { source_type: from.to_string(), target: target.to_string(), position })
        }
    }

    /// Resolves a `/`-separated property path from `owner`, returning one descriptor per property
    /// segment. Segments containing a `.` are type casts and yield no descriptor.
    pub fn resolve_property_chain(&self, owner: &str, path: &str) -> Result<Vec<PropertyRef>, ParseError> {
        let mut current = TypeRef::structured(owner);
        let mut chain = Vec::new();
        let mut position = 0;
        for segment in path.split('/') {
            if let Some(last) = chain.last().filter(|_| current.is_collection() && !segment.contains('.')) {
                let last: &PropertyRef = last;
                return Err(ParseError::CollectionNotQuantified { name: last.name.clone(), position });
            }
            let owner_name = current
                .structured_name()
                .ok_or_else(|| ParseError::UnknownProperty { name: segment.to_string(), owner: current.to_string(), position })?
                .to_string();
            if segment.contains('.') {
                let target = self.resolve_cast(&owner_name, segment, position)?;
                current = match current {
                    TypeRef::Collection(_) => TypeRef::collection(TypeRef::structured(target.name())),
                    _ => TypeRef::structured(target.name()),
                };
            } else {
                let property = self.resolve_property(&owner_name, segment).ok_or_else(|| ParseError::UnknownProperty {
                    name: segment.to_string(),
                    owner: owner_name.clone(),
                    position,
                })?;
                current = property.ty.clone();
                chain.push(property);
            }
            position += segment.len() + 1;
        }
        Ok(chain)
    }
}

/// Declares one structured type for [`ModelBuilder`].
#[derive(Debug, Clone)]
pub struct TypeBuilder {
    name: String,
    kind: TypeKind,
    base: Option<String>,
    properties: Vec<(String, TypeRef)>,
}

impl TypeBuilder {
    pub fn derives_from(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn property(mut self, name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        self.properties.push((name.into(), ty.into()));
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    types: Vec<TypeBuilder>,
}

impl ModelBuilder {
    pub fn entity(self, name: impl Into<String>, declare: impl FnOnce(TypeBuilder) -> TypeBuilder) -> Self {
        self.declare(name.into(), TypeKind::Entity, declare)
    }

    pub fn complex(self, name: impl Into<String>, declare: impl FnOnce(TypeBuilder) -> TypeBuilder) -> Self {
        self.declare(name.into(), TypeKind::Complex, declare)
    }

    fn declare(mut self, name: String, kind: TypeKind, declare: impl FnOnce(TypeBuilder) -> TypeBuilder) -> Self {
        self.types.push(declare(TypeBuilder { name, kind, base: None, properties: Vec::new() }));
        self
    }

    pub fn build(self) -> Result<Model, SchemaError> {
        let mut types = BTreeMap::new();
        for declared in &self.types {
            let properties = declared
                .properties
                .iter()
                .map(|(name, ty)| {
                    Arc::new(Property { name: name.clone(), ty: ty.clone(), declaring_type: declared.name.clone() })
                })
                .collect();
            let ty = StructuredType { name: declared.name.clone(), kind: declared.kind, base: declared.base.clone(), properties };
            if types.insert(declared.name.clone(), Arc::new(ty)).is_some() {
                return Err(SchemaError::DuplicateType(declared.name.clone()));
            }
        }
        let model = Model { types };
        for ty in model.types.values() {
            model.check_type(ty)?;
        }
        Ok(model)
    }

    pub fn build_shared(self) -> Result<Arc<Model>, SchemaError> { self.build().map(Arc::new) }
}

impl Model {
    fn check_type(&self, ty: &StructuredType) -> Result<(), SchemaError> {
        let mut seen_types = HashSet::new();
        let mut seen_properties = HashSet::new();
        let mut current = Some(ty);
        while let Some(t) = current {
            if !seen_types.insert(t.name.as_str()) {
                return Err(SchemaError::InheritanceCycle(ty.name.clone()));
            }
            for property in &t.properties {
                if !seen_properties.insert(property.name.as_str()) {
                    return Err(SchemaError::DuplicateProperty { owner: ty.name.clone(), property: property.name.clone() });
                }
                if let Some(name) = property.ty.structured_name() {
                    if !self.types.contains_key(name) {
                        return Err(SchemaError::UnknownPropertyType {
                            owner: t.name.clone(),
                            property: property.name.clone(),
                            ty: name.to_string(),
                        });
                    }
                }
            }
            current = match &t.base {
                Some(base) => Some(self.types.get(base).map(|b| b.as_ref()).ok_or_else(|| SchemaError::UnknownBaseType {
                    derived: t.name.clone(),
                    base: base.clone(),
                })?),
                None => None,
            };
        }
        Ok(())
    }
}

/// The model plus the element type that query options are bound against.
#[derive(Debug, Clone)]
pub struct QueryContext {
    model: Arc<Model>,
    element_type: Arc<StructuredType>,
}

impl QueryContext {
    pub fn new(model: Arc<Model>, element_type: &str) -> Result<Self, SchemaError> {
        let element_type = model.find_type(element_type).cloned().ok_or_else(|| SchemaError::UnknownType(element_type.to_string()))?;
        Ok(Self { model, element_type })
    }

    pub fn model(&self) -> &Arc<Model> { &self.model }

    pub fn element_type(&self) -> &Arc<StructuredType> { &self.element_type }
}
