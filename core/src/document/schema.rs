#![deny(missing_docs)]

//! # Schema Nodes
//!
//! The recursive schema tree owned by a [`SchemaDocument`](super::SchemaDocument).
//!
//! Nodes are plain data. `$ref`s to `#/components/schemas/*` stay symbolic
//! (see [`SchemaNode::reference`]) so recursive schemas need no cycles in the tree;
//! [`Components::resolve`] follows them at validation time.

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::fmt;

/// Maximum number of chained `$ref` hops followed before giving up.
const MAX_REF_HOPS: usize = 32;

/// The primitive JSON types an OpenAPI 3.0 schema can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaType {
    /// `object`
    Object,
    /// `array`
    Array,
    /// `string`
    String,
    /// `number`
    Number,
    /// `integer`
    Integer,
    /// `boolean`
    Boolean,
    /// `null`
    Null,
}

impl SchemaType {
    /// Parses the value of a `type` keyword.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "null" => Some(Self::Null),
            _ => None,
        }
    }

    /// The keyword spelling of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }

    /// Classifies a runtime JSON value.
    ///
    /// Whole numbers report `integer` even when stored as floats.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    Self::Integer
                } else if n.as_f64().is_some_and(is_whole) {
                    Self::Integer
                } else {
                    Self::Number
                }
            }
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    /// Whether `value` is an instance of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, Self::of(value)) {
            (Self::Number, Self::Integer) => true,
            (expected, actual) => *expected == actual,
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn is_whole(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0
}

/// Policy for properties not listed under `properties`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AdditionalProperties {
    /// Absent or `true`: anything goes.
    #[default]
    Allowed,
    /// `false`: extra properties are findings.
    Denied,
    /// A schema every extra property must satisfy.
    Schema(Box<SchemaNode>),
}

/// A compiled `pattern` keyword.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compiles a pattern.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Self)
    }

    /// Unanchored search, as JSON Schema defines `pattern`.
    pub fn is_match(&self, s: &str) -> bool {
        self.0.is_match(s)
    }

    /// The original source text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// Numeric, length and size constraints.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Constraints {
    /// `minimum`
    pub minimum: Option<f64>,
    /// `maximum`
    pub maximum: Option<f64>,
    /// `exclusiveMinimum: true`
    pub exclusive_minimum: bool,
    /// `exclusiveMaximum: true`
    pub exclusive_maximum: bool,
    /// `multipleOf`
    pub multiple_of: Option<f64>,
    /// `minLength`
    pub min_length: Option<usize>,
    /// `maxLength`
    pub max_length: Option<usize>,
    /// `pattern`
    pub pattern: Option<Pattern>,
    /// `minItems`
    pub min_items: Option<usize>,
    /// `maxItems`
    pub max_items: Option<usize>,
    /// `uniqueItems`
    pub unique_items: bool,
    /// `minProperties`
    pub min_properties: Option<usize>,
    /// `maxProperties`
    pub max_properties: Option<usize>,
}

/// One node of a schema tree.
///
/// A node with `reference` set stands for the named component and its other
/// fields are ignored, matching OpenAPI 3.0 where `$ref` siblings are ignored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaNode {
    /// Name of a `#/components/schemas` entry this node refers to.
    pub reference: Option<String>,
    /// Declared type; `None` accepts any type.
    pub schema_type: Option<SchemaType>,
    /// OpenAPI 3.0 `nullable`.
    pub nullable: bool,
    /// Allowed literal values.
    pub enum_values: Option<Vec<Value>>,
    /// Semantic format name (`date-time`, `email`, ...).
    pub format: Option<String>,
    /// Declared object properties.
    pub properties: IndexMap<String, SchemaNode>,
    /// Property names that must be present.
    pub required: Vec<String>,
    /// Policy for undeclared properties.
    pub additional_properties: AdditionalProperties,
    /// Element schema for arrays.
    pub items: Option<Box<SchemaNode>>,
    /// Every sub-schema must match.
    pub all_of: Vec<SchemaNode>,
    /// At least one sub-schema must match.
    pub any_of: Vec<SchemaNode>,
    /// Exactly one sub-schema must match.
    pub one_of: Vec<SchemaNode>,
    /// Numeric/length/size constraints.
    pub constraints: Constraints,
    /// Property may only appear in responses.
    pub read_only: bool,
    /// Property may only appear in requests.
    pub write_only: bool,
}

impl SchemaNode {
    /// A schema without a `type`: any value except `null` unless made `nullable`.
    pub fn any() -> Self {
        Self::default()
    }

    /// A schema of the given type.
    pub fn of_type(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Self::default()
        }
    }

    /// `type: string`
    pub fn string() -> Self {
        Self::of_type(SchemaType::String)
    }

    /// `type: integer`
    pub fn integer() -> Self {
        Self::of_type(SchemaType::Integer)
    }

    /// `type: number`
    pub fn number() -> Self {
        Self::of_type(SchemaType::Number)
    }

    /// `type: boolean`
    pub fn boolean() -> Self {
        Self::of_type(SchemaType::Boolean)
    }

    /// `type: object`
    pub fn object() -> Self {
        Self::of_type(SchemaType::Object)
    }

    /// `type: array` with the given item schema.
    pub fn array(items: SchemaNode) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::of_type(SchemaType::Array)
        }
    }

    /// `$ref: '#/components/schemas/{name}'`
    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            reference: Some(name.into()),
            ..Self::default()
        }
    }

    /// `oneOf: [...]`
    pub fn one_of(schemas: Vec<SchemaNode>) -> Self {
        Self {
            one_of: schemas,
            ..Self::default()
        }
    }

    /// `anyOf: [...]`
    pub fn any_of(schemas: Vec<SchemaNode>) -> Self {
        Self {
            any_of: schemas,
            ..Self::default()
        }
    }

    /// `allOf: [...]`
    pub fn all_of(schemas: Vec<SchemaNode>) -> Self {
        Self {
            all_of: schemas,
            ..Self::default()
        }
    }

    /// Sets `nullable: true`.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets `format`.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Sets `enum`.
    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }

    /// Adds a property.
    pub fn with_property(mut self, name: impl Into<String>, schema: SchemaNode) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Adds required property names.
    pub fn with_required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(names.into_iter().map(Into::into));
        self
    }

    /// Sets `additionalProperties`.
    pub fn with_additional(mut self, policy: AdditionalProperties) -> Self {
        self.additional_properties = policy;
        self
    }

    /// Sets the constraint block.
    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Sets `readOnly: true`.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Sets `writeOnly: true`.
    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    /// Whether the node has a composition keyword.
    pub fn is_composite(&self) -> bool {
        !self.all_of.is_empty() || !self.any_of.is_empty() || !self.one_of.is_empty()
    }

    /// Visits this node and every nested node, depth-first.
    ///
    /// References are not followed.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a SchemaNode)) {
        visit(self);
        for child in self.properties.values() {
            child.walk(visit);
        }
        if let AdditionalProperties::Schema(child) = &self.additional_properties {
            child.walk(visit);
        }
        if let Some(items) = &self.items {
            items.walk(visit);
        }
        for child in self.all_of.iter().chain(&self.any_of).chain(&self.one_of) {
            child.walk(visit);
        }
    }
}

/// The `#/components/schemas` table of a document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Components {
    schemas: IndexMap<String, SchemaNode>,
}

impl Components {
    /// Wraps a schema table.
    pub fn new(schemas: IndexMap<String, SchemaNode>) -> Self {
        Self { schemas }
    }

    /// Looks up a component by name.
    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.schemas.get(name)
    }

    /// Iterates over `(name, schema)` pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &SchemaNode)> {
        self.schemas.iter()
    }

    /// Follows `schema` through any chain of references.
    ///
    /// Returns `None` for a dangling reference or a reference loop.
    pub fn resolve<'a>(&'a self, schema: &'a SchemaNode) -> Option<&'a SchemaNode> {
        let mut current = schema;
        for _ in 0..MAX_REF_HOPS {
            match &current.reference {
                None => return Some(current),
                Some(name) => current = self.schemas.get(name)?,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_of_whole_float_is_integer() {
        assert_eq!(SchemaType::of(&json!(3.0)), SchemaType::Integer);
        assert_eq!(SchemaType::of(&json!(3.5)), SchemaType::Number);
        assert_eq!(SchemaType::of(&json!(-7)), SchemaType::Integer);
    }

    #[test]
    fn test_number_accepts_integer_but_not_reverse() {
        assert!(SchemaType::Number.accepts(&json!(1)));
        assert!(SchemaType::Integer.accepts(&json!(2.0)));
        assert!(!SchemaType::Integer.accepts(&json!(2.5)));
        assert!(!SchemaType::String.accepts(&json!(null)));
    }

    #[test]
    fn test_resolve_follows_chain() {
        let mut table = IndexMap::new();
        table.insert("Alias".to_string(), SchemaNode::reference("User"));
        table.insert("User".to_string(), SchemaNode::object());
        let components = Components::new(table);

        let alias = SchemaNode::reference("Alias");
        let resolved = components.resolve(&alias).unwrap();
        assert_eq!(resolved.schema_type, Some(SchemaType::Object));
        let missing = SchemaNode::reference("Missing");
        assert!(components.resolve(&missing).is_none());
    }

    #[test]
    fn test_resolve_detects_loop() {
        let mut table = IndexMap::new();
        table.insert("A".to_string(), SchemaNode::reference("B"));
        table.insert("B".to_string(), SchemaNode::reference("A"));
        let components = Components::new(table);
        assert!(components.resolve(&SchemaNode::reference("A")).is_none());
    }

    #[test]
    fn test_walk_visits_nested_nodes() {
        let schema = SchemaNode::object()
            .with_property("tags", SchemaNode::array(SchemaNode::reference("Tag")))
            .with_additional(AdditionalProperties::Schema(Box::new(SchemaNode::integer())));
        let mut refs = Vec::new();
        let mut count = 0;
        schema.walk(&mut |node| {
            count += 1;
            if let Some(r) = &node.reference {
                refs.push(r.clone());
            }
        });
        assert_eq!(count, 4);
        assert_eq!(refs, vec!["Tag".to_string()]);
    }
}
