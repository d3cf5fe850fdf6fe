#![deny(missing_docs)]

//! # Schema Validation
//!
//! Recursive, depth-first validation of a JSON value against a [`SchemaNode`].
//!
//! Every keyword of a node is checked and every child is visited; findings are
//! accumulated rather than short-circuited, so one report carries all
//! violations. The only early exit is a type mismatch: once the value has the
//! wrong type, its keywords say nothing useful.

mod formats;

use crate::document::{AdditionalProperties, Components, SchemaNode, SchemaType};
use crate::report::{Location, Rule, ValidationReport};
use formats::FormatCheck;
use serde_json::{Map, Value};
use tracing::debug;

/// Nesting bound for schemas that recurse without consuming the value.
const MAX_DEPTH: usize = 128;

/// Which side of the exchange a value belongs to.
///
/// Controls `readOnly`/`writeOnly` handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// No access-mode rules.
    #[default]
    Neutral,
    /// Request payload: `readOnly` properties are forbidden and never required.
    Request,
    /// Response payload: `writeOnly` properties are forbidden and never required.
    Response,
}

/// Validates values against schemas, resolving `$ref`s through a component table.
#[derive(Debug, Clone, Copy)]
pub struct SchemaValidator<'d> {
    components: &'d Components,
    direction: Direction,
}

impl<'d> SchemaValidator<'d> {
    /// Creates a validator with no access-mode rules.
    pub fn new(components: &'d Components) -> Self {
        Self {
            components,
            direction: Direction::Neutral,
        }
    }

    /// Returns a copy that applies `direction`'s access-mode rules.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Validates `value` against `schema`; findings are located under `location`.
    pub fn validate(
        &self,
        value: &Value,
        schema: &SchemaNode,
        location: &Location,
    ) -> ValidationReport {
        let mut report = ValidationReport::new();
        self.visit(value, schema, location, 0, &mut report);
        report
    }

    fn visit(
        &self,
        value: &Value,
        schema: &SchemaNode,
        location: &Location,
        depth: usize,
        report: &mut ValidationReport,
    ) {
        if depth > MAX_DEPTH {
            report.add(
                location.clone(),
                Rule::CompositionViolation,
                "Schema nesting is too deep to validate",
            );
            return;
        }
        let Some(schema) = self.resolve(schema, location, report) else {
            return;
        };

        if value.is_null() {
            if !schema.nullable && schema.schema_type != Some(SchemaType::Null) {
                let message = match schema.schema_type {
                    Some(expected) => type_mismatch_message(expected, value),
                    None => "Expected a value, got null (schema is not nullable)".to_string(),
                };
                report.add(location.clone(), Rule::TypeMismatch, message);
            }
            return;
        }

        if let Some(expected) = schema.schema_type {
            if !expected.accepts(value) {
                report.add(
                    location.clone(),
                    Rule::TypeMismatch,
                    type_mismatch_message(expected, value),
                );
                return;
            }
        }

        if let Some(allowed) = &schema.enum_values {
            if !allowed.iter().any(|candidate| json_equal(candidate, value)) {
                report.add(
                    location.clone(),
                    Rule::EnumViolation,
                    format!(
                        "Value {} is not one of the allowed values [{}]",
                        value,
                        allowed
                            .iter()
                            .map(Value::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                );
            }
        }

        if let Some(format) = &schema.format {
            self.check_format(format, value, location, report);
        }

        match value {
            Value::Number(_) => check_number(value, schema, location, report),
            Value::String(s) => check_string(s, schema, location, report),
            Value::Array(items) => self.check_array(items, schema, location, depth, report),
            Value::Object(map) => self.check_object(map, schema, location, depth, report),
            Value::Null | Value::Bool(_) => {}
        }

        self.check_composition(value, schema, location, depth, report);
    }

    fn resolve<'s>(
        &self,
        schema: &'s SchemaNode,
        location: &Location,
        report: &mut ValidationReport,
    ) -> Option<&'s SchemaNode>
    where
        'd: 's,
    {
        if schema.reference.is_none() {
            return Some(schema);
        }
        let resolved = self.components.resolve(schema);
        if resolved.is_none() {
            report.add(
                location.clone(),
                Rule::UnresolvedReference,
                format!(
                    "Schema reference '#/components/schemas/{}' cannot be resolved",
                    schema.reference.as_deref().unwrap_or_default()
                ),
            );
        }
        resolved
    }

    fn check_format(
        &self,
        format: &str,
        value: &Value,
        location: &Location,
        report: &mut ValidationReport,
    ) {
        match formats::check_format(format, value) {
            FormatCheck::Invalid => report.add(
                location.clone(),
                Rule::FormatViolation,
                format!("Value {} is not a valid '{}'", value, format),
            ),
            FormatCheck::Skipped if !formats::is_known(format) => {
                debug!(format, "skipping unknown format");
            }
            FormatCheck::Valid | FormatCheck::Skipped => {}
        }
    }

    fn check_array(
        &self,
        items: &[Value],
        schema: &SchemaNode,
        location: &Location,
        depth: usize,
        report: &mut ValidationReport,
    ) {
        let c = &schema.constraints;
        if let Some(min) = c.min_items {
            if items.len() < min {
                report.add(
                    location.clone(),
                    Rule::LengthViolation,
                    format!("Array has {} items, fewer than the minimum of {}", items.len(), min),
                );
            }
        }
        if let Some(max) = c.max_items {
            if items.len() > max {
                report.add(
                    location.clone(),
                    Rule::LengthViolation,
                    format!("Array has {} items, more than the maximum of {}", items.len(), max),
                );
            }
        }
        if c.unique_items {
            'outer: for (i, a) in items.iter().enumerate() {
                for (j, b) in items.iter().enumerate().skip(i + 1) {
                    if json_equal(a, b) {
                        report.add(
                            location.clone(),
                            Rule::UniqueItemsViolation,
                            format!("Array items at index {} and {} are equal", i, j),
                        );
                        break 'outer;
                    }
                }
            }
        }

        if let Some(item_schema) = &schema.items {
            for (i, item) in items.iter().enumerate() {
                self.visit(item, item_schema, &location.index(i), depth + 1, report);
            }
        }
    }

    fn check_object(
        &self,
        map: &Map<String, Value>,
        schema: &SchemaNode,
        location: &Location,
        depth: usize,
        report: &mut ValidationReport,
    ) {
        let c = &schema.constraints;
        if let Some(min) = c.min_properties {
            if map.len() < min {
                report.add(
                    location.clone(),
                    Rule::LengthViolation,
                    format!(
                        "Object has {} properties, fewer than the minimum of {}",
                        map.len(),
                        min
                    ),
                );
            }
        }
        if let Some(max) = c.max_properties {
            if map.len() > max {
                report.add(
                    location.clone(),
                    Rule::LengthViolation,
                    format!(
                        "Object has {} properties, more than the maximum of {}",
                        map.len(),
                        max
                    ),
                );
            }
        }

        for name in &schema.required {
            if map.contains_key(name) {
                continue;
            }
            let exempt = schema
                .properties
                .get(name)
                .and_then(|p| self.components.resolve(p))
                .is_some_and(|p| self.access_exempts_required(p));
            if !exempt {
                report.add(
                    location.property(name),
                    Rule::MissingRequired,
                    format!("Required property '{}' must be present in the object", name),
                );
            }
        }

        for (name, property) in map {
            let child = location.property(name);
            if let Some(property_schema) = schema.properties.get(name) {
                if let Some(resolved) = self.components.resolve(property_schema) {
                    self.check_access_mode(name, resolved, &child, report);
                }
                self.visit(property, property_schema, &child, depth + 1, report);
                continue;
            }
            match &schema.additional_properties {
                AdditionalProperties::Allowed => {}
                AdditionalProperties::Denied => report.add(
                    child,
                    Rule::AdditionalPropertyNotAllowed,
                    format!(
                        "Property '{}' is not defined in the schema and additional properties are not allowed",
                        name
                    ),
                ),
                AdditionalProperties::Schema(extra) => {
                    self.visit(property, extra, &child, depth + 1, report)
                }
            }
        }
    }

    fn access_exempts_required(&self, property: &SchemaNode) -> bool {
        match self.direction {
            Direction::Neutral => false,
            Direction::Request => property.read_only,
            Direction::Response => property.write_only,
        }
    }

    fn check_access_mode(
        &self,
        name: &str,
        property: &SchemaNode,
        location: &Location,
        report: &mut ValidationReport,
    ) {
        let message = match self.direction {
            Direction::Request if property.read_only => {
                format!("Property '{}' is read-only and must not be sent in a request", name)
            }
            Direction::Response if property.write_only => {
                format!("Property '{}' is write-only and must not be returned in a response", name)
            }
            _ => return,
        };
        report.add(location.clone(), Rule::AccessModeViolation, message);
    }

    fn check_composition(
        &self,
        value: &Value,
        schema: &SchemaNode,
        location: &Location,
        depth: usize,
        report: &mut ValidationReport,
    ) {
        for sub in &schema.all_of {
            self.visit(value, sub, location, depth + 1, report);
        }

        if !schema.any_of.is_empty() {
            let outcomes = self.try_each(value, &schema.any_of, location, depth);
            if outcomes.iter().all(|r| !r.is_empty()) {
                report.add(
                    location.clone(),
                    Rule::CompositionViolation,
                    format!(
                        "Value does not match any of the {} schemas in anyOf: {}",
                        outcomes.len(),
                        summarize(&outcomes)
                    ),
                );
            }
        }

        if !schema.one_of.is_empty() {
            let outcomes = self.try_each(value, &schema.one_of, location, depth);
            let passing: Vec<usize> = outcomes
                .iter()
                .enumerate()
                .filter(|(_, r)| r.is_empty())
                .map(|(i, _)| i)
                .collect();
            match passing.len() {
                1 => {}
                0 => report.add(
                    location.clone(),
                    Rule::CompositionViolation,
                    format!(
                        "Value does not match any of the {} schemas in oneOf: {}",
                        outcomes.len(),
                        summarize(&outcomes)
                    ),
                ),
                n => report.add(
                    location.clone(),
                    Rule::CompositionViolation,
                    format!(
                        "Value matches {} schemas in oneOf (indices {}) but must match exactly one",
                        n,
                        passing
                            .iter()
                            .map(usize::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                ),
            }
        }
    }

    fn try_each(
        &self,
        value: &Value,
        schemas: &[SchemaNode],
        location: &Location,
        depth: usize,
    ) -> Vec<ValidationReport> {
        schemas
            .iter()
            .map(|sub| {
                let mut scratch = ValidationReport::new();
                self.visit(value, sub, location, depth + 1, &mut scratch);
                scratch
            })
            .collect()
    }
}

fn summarize(outcomes: &[ValidationReport]) -> String {
    outcomes
        .iter()
        .enumerate()
        .map(|(i, report)| {
            let reasons = report
                .iter()
                .map(|f| f.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            format!("[{}] {}", i, reasons)
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

fn type_mismatch_message(expected: SchemaType, value: &Value) -> String {
    if value.is_null() {
        return format!("Expected {}, got null (schema is not nullable)", expected);
    }
    format!("Expected {}, got {}", expected, SchemaType::of(value))
}

fn check_number(
    value: &Value,
    schema: &SchemaNode,
    location: &Location,
    report: &mut ValidationReport,
) {
    let Some(n) = value.as_f64() else {
        return;
    };
    let c = &schema.constraints;
    if let Some(min) = c.minimum {
        let violated = if c.exclusive_minimum { n <= min } else { n < min };
        if violated {
            let bound = if c.exclusive_minimum { "greater than" } else { "at least" };
            report.add(
                location.clone(),
                Rule::RangeViolation,
                format!("Value {} must be {} {}", value, bound, min),
            );
        }
    }
    if let Some(max) = c.maximum {
        let violated = if c.exclusive_maximum { n >= max } else { n > max };
        if violated {
            let bound = if c.exclusive_maximum { "less than" } else { "at most" };
            report.add(
                location.clone(),
                Rule::RangeViolation,
                format!("Value {} must be {} {}", value, bound, max),
            );
        }
    }
    if let Some(step) = c.multiple_of {
        if step > 0.0 {
            let quotient = n / step;
            if (quotient - quotient.round()).abs() > 1e-9 {
                report.add(
                    location.clone(),
                    Rule::RangeViolation,
                    format!("Value {} is not a multiple of {}", value, step),
                );
            }
        }
    }
}

fn check_string(s: &str, schema: &SchemaNode, location: &Location, report: &mut ValidationReport) {
    let c = &schema.constraints;
    let length = s.chars().count();
    if let Some(min) = c.min_length {
        if length < min {
            report.add(
                location.clone(),
                Rule::LengthViolation,
                format!(
                    "String is {} characters long, shorter than the minimum of {}",
                    length, min
                ),
            );
        }
    }
    if let Some(max) = c.max_length {
        if length > max {
            report.add(
                location.clone(),
                Rule::LengthViolation,
                format!("String is {} characters long, longer than the maximum of {}", length, max),
            );
        }
    }
    if let Some(pattern) = &c.pattern {
        if !pattern.is_match(s) {
            report.add(
                location.clone(),
                Rule::PatternViolation,
                format!("String '{}' does not match pattern '{}'", s, pattern.as_str()),
            );
        }
    }
}

/// Deep equality where `1` and `1.0` are the same number.
pub(crate) fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => i == j,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(i), Some(j)) => i == j,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| json_equal(v, w)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Constraints, Pattern};
    use crate::report::Segment;
    use indexmap::IndexMap;
    use serde_json::json;

    fn validate(value: Value, schema: &SchemaNode) -> ValidationReport {
        let components = Components::default();
        SchemaValidator::new(&components).validate(&value, schema, &Location::root())
    }

    fn rules(report: &ValidationReport) -> Vec<Rule> {
        report.iter().map(|f| f.rule).collect()
    }

    fn user_schema() -> SchemaNode {
        SchemaNode::object()
            .with_property("id", SchemaNode::integer())
            .with_property("name", SchemaNode::string())
            .with_required(["name"])
    }

    #[test]
    fn test_type_mismatch_names_both_types() {
        let report = validate(json!({"id": 1, "name": 123}), &user_schema());
        assert_eq!(report.len(), 1);
        let finding = &report.findings()[0];
        assert_eq!(finding.rule, Rule::TypeMismatch);
        assert_eq!(finding.location.to_string(), "name");
        assert!(finding.message.contains("string"));
        assert!(finding.message.contains("integer"));
    }

    #[test]
    fn test_nullable_accepts_null() {
        assert!(validate(json!(null), &SchemaNode::string().nullable()).is_empty());
        let report = validate(json!(null), &SchemaNode::string());
        assert_eq!(rules(&report), vec![Rule::TypeMismatch]);
    }

    #[test]
    fn test_untyped_schema_accepts_any_non_null_value() {
        assert!(validate(json!({"a": [1, "b"]}), &SchemaNode::any()).is_empty());
        assert!(validate(json!(false), &SchemaNode::any()).is_empty());
        assert!(validate(json!(null), &SchemaNode::any().nullable()).is_empty());

        let report = validate(json!(null), &SchemaNode::any());
        assert_eq!(rules(&report), vec![Rule::TypeMismatch]);
        assert_eq!(
            report.findings()[0].message,
            "Expected a value, got null (schema is not nullable)"
        );
    }

    #[test]
    fn test_nullable_parent_covers_composed_branches() {
        let mut table = IndexMap::new();
        table.insert("Address".to_string(), SchemaNode::object());
        let components = Components::new(table);
        let mut schema = SchemaNode::any().nullable();
        schema.all_of = vec![SchemaNode::reference("Address")];

        let validator = SchemaValidator::new(&components);
        assert!(validator.validate(&json!(null), &schema, &Location::root()).is_empty());

        schema.nullable = false;
        let report = validator.validate(&json!(null), &schema, &Location::root());
        assert_eq!(rules(&report), vec![Rule::TypeMismatch]);
    }

    #[test]
    fn test_integer_accepts_whole_float() {
        assert!(validate(json!(4.0), &SchemaNode::integer()).is_empty());
        assert_eq!(rules(&validate(json!(4.5), &SchemaNode::integer())), vec![Rule::TypeMismatch]);
        assert!(validate(json!(4), &SchemaNode::number()).is_empty());
    }

    #[test]
    fn test_enum_uses_deep_equality() {
        let schema = SchemaNode::any().with_enum(vec![json!({"a": [1, 2]}), json!(3)]);
        assert!(validate(json!({"a": [1.0, 2]}), &schema).is_empty());
        assert!(validate(json!(3.0), &schema).is_empty());
        assert_eq!(rules(&validate(json!("3"), &schema)), vec![Rule::EnumViolation]);
    }

    #[test]
    fn test_format_violation_and_unknown_format() {
        let email = SchemaNode::string().with_format("email");
        assert_eq!(rules(&validate(json!("nope"), &email)), vec![Rule::FormatViolation]);
        let custom = SchemaNode::string().with_format("x-snowflake");
        assert!(validate(json!("anything"), &custom).is_empty());
    }

    #[test]
    fn test_missing_required_nested_location() {
        let schema = SchemaNode::object().with_property(
            "address",
            SchemaNode::object()
                .with_property("zip", SchemaNode::string())
                .with_required(["zip"]),
        );
        let report = validate(json!({"address": {}}), &schema);
        assert_eq!(report.len(), 1);
        let finding = &report.findings()[0];
        assert_eq!(finding.rule, Rule::MissingRequired);
        assert_eq!(
            finding.location.segments(),
            &[
                Segment::Property("address".into()),
                Segment::Property("zip".into())
            ]
        );
    }

    #[test]
    fn test_empty_required_never_fails() {
        let schema = SchemaNode::object().with_required(Vec::<String>::new());
        assert!(validate(json!({}), &schema).is_empty());
    }

    #[test]
    fn test_additional_properties_policies() {
        let base = SchemaNode::object().with_property("a", SchemaNode::integer());

        assert!(validate(json!({"a": 1, "b": "x"}), &base).is_empty());

        let denied = base.clone().with_additional(AdditionalProperties::Denied);
        let report = validate(json!({"a": 1, "b": "x"}), &denied);
        assert_eq!(rules(&report), vec![Rule::AdditionalPropertyNotAllowed]);
        assert_eq!(report.findings()[0].location.to_string(), "b");

        let typed =
            base.with_additional(AdditionalProperties::Schema(Box::new(SchemaNode::integer())));
        let report = validate(json!({"a": 1, "b": "x", "c": 2}), &typed);
        assert_eq!(rules(&report), vec![Rule::TypeMismatch]);
        assert_eq!(report.findings()[0].location.to_string(), "b");
    }

    #[test]
    fn test_array_items_located_by_index() {
        let schema = SchemaNode::array(SchemaNode::integer());
        let report = validate(json!([1, "two", 3, "four"]), &schema);
        let locations: Vec<String> = report.iter().map(|f| f.location.to_string()).collect();
        assert_eq!(locations, vec!["[1]", "[3]"]);
    }

    #[test]
    fn test_accumulates_across_siblings() {
        let schema = SchemaNode::object()
            .with_property("a", SchemaNode::integer())
            .with_property("b", SchemaNode::boolean())
            .with_required(["a", "b", "c"]);
        let report = validate(json!({"a": "x", "b": "y"}), &schema);
        assert_eq!(
            rules(&report),
            vec![Rule::MissingRequired, Rule::TypeMismatch, Rule::TypeMismatch]
        );
    }

    #[test]
    fn test_all_of_concatenates_findings() {
        let schema = SchemaNode::all_of(vec![
            SchemaNode::object()
                .with_property("a", SchemaNode::string())
                .with_required(["a"]),
            SchemaNode::object()
                .with_property("b", SchemaNode::string())
                .with_required(["b"]),
        ]);
        let report = validate(json!({}), &schema);
        assert_eq!(rules(&report), vec![Rule::MissingRequired, Rule::MissingRequired]);
    }

    #[test]
    fn test_any_of() {
        let schema = SchemaNode::any_of(vec![SchemaNode::string(), SchemaNode::integer()]);
        assert!(validate(json!("x"), &schema).is_empty());
        assert!(validate(json!(7), &schema).is_empty());
        let report = validate(json!(true), &schema);
        assert_eq!(rules(&report), vec![Rule::CompositionViolation]);
        assert!(report.findings()[0].message.contains("[0] Expected string, got boolean"));
    }

    #[test]
    fn test_one_of_ambiguous_match_is_single_finding() {
        let schema = SchemaNode::one_of(vec![SchemaNode::number(), SchemaNode::integer()]);
        let report = validate(json!(5), &schema);
        assert_eq!(rules(&report), vec![Rule::CompositionViolation]);
        assert!(report.findings()[0].message.contains("matches 2 schemas"));

        let none = validate(json!("5"), &schema);
        assert_eq!(rules(&none), vec![Rule::CompositionViolation]);
        assert!(none.findings()[0].message.contains("does not match any"));

        assert!(validate(json!(5.5), &schema).is_empty());
    }

    #[test]
    fn test_constraints() {
        let schema = SchemaNode::integer().with_constraints(Constraints {
            minimum: Some(1.0),
            maximum: Some(10.0),
            exclusive_maximum: true,
            multiple_of: Some(2.0),
            ..Constraints::default()
        });
        assert!(validate(json!(4), &schema).is_empty());
        assert_eq!(rules(&validate(json!(0), &schema)), vec![Rule::RangeViolation]);
        assert_eq!(rules(&validate(json!(10), &schema)), vec![Rule::RangeViolation]);
        assert_eq!(rules(&validate(json!(3), &schema)), vec![Rule::RangeViolation]);

        let code = SchemaNode::string().with_constraints(Constraints {
            max_length: Some(4),
            pattern: Some(Pattern::new("^[A-Z]+$").unwrap()),
            ..Constraints::default()
        });
        assert_eq!(
            rules(&validate(json!("abcdef"), &code)),
            vec![Rule::LengthViolation, Rule::PatternViolation]
        );

        let tags = SchemaNode::array(SchemaNode::string()).with_constraints(Constraints {
            unique_items: true,
            min_items: Some(1),
            ..Constraints::default()
        });
        assert_eq!(rules(&validate(json!([]), &tags)), vec![Rule::LengthViolation]);
        assert_eq!(
            rules(&validate(json!(["a", "b", "a"]), &tags)),
            vec![Rule::UniqueItemsViolation]
        );
    }

    #[test]
    fn test_references_and_recursion() {
        let mut table = IndexMap::new();
        table.insert(
            "Node".to_string(),
            SchemaNode::object()
                .with_property("value", SchemaNode::integer())
                .with_property("children", SchemaNode::array(SchemaNode::reference("Node"))),
        );
        let components = Components::new(table);
        let validator = SchemaValidator::new(&components);
        let tree = json!({"value": 1, "children": [{"value": 2, "children": [{"value": "x"}]}]});
        let report = validator.validate(&tree, &SchemaNode::reference("Node"), &Location::root());
        assert_eq!(report.len(), 1);
        assert_eq!(report.findings()[0].location.to_string(), "children[0].children[0].value");
    }

    #[test]
    fn test_unresolved_reference_is_a_finding() {
        let report = validate(json!({}), &SchemaNode::reference("Ghost"));
        assert_eq!(rules(&report), vec![Rule::UnresolvedReference]);
    }

    #[test]
    fn test_self_referencing_all_of_is_bounded() {
        let mut table = IndexMap::new();
        table.insert(
            "Loop".to_string(),
            SchemaNode::all_of(vec![SchemaNode::reference("Loop")]),
        );
        let components = Components::new(table);
        let report = SchemaValidator::new(&components).validate(
            &json!({}),
            &SchemaNode::reference("Loop"),
            &Location::root(),
        );
        assert!(!report.is_empty());
    }

    #[test]
    fn test_access_modes_follow_direction() {
        let components = Components::default();
        let schema = SchemaNode::object()
            .with_property("id", SchemaNode::integer().read_only())
            .with_property("password", SchemaNode::string().write_only())
            .with_required(["id", "password"]);

        let request = SchemaValidator::new(&components).with_direction(Direction::Request);
        let report = request.validate(&json!({"password": "s3cret"}), &schema, &Location::root());
        assert!(report.is_empty());
        let report =
            request.validate(&json!({"id": 1, "password": "x"}), &schema, &Location::root());
        assert_eq!(rules(&report), vec![Rule::AccessModeViolation]);

        let response = SchemaValidator::new(&components).with_direction(Direction::Response);
        let report = response.validate(&json!({"id": 1}), &schema, &Location::root());
        assert!(report.is_empty());
        let report =
            response.validate(&json!({"id": 1, "password": "x"}), &schema, &Location::root());
        assert_eq!(rules(&report), vec![Rule::AccessModeViolation]);

        let neutral = SchemaValidator::new(&components);
        let report = neutral.validate(&json!({}), &schema, &Location::root());
        assert_eq!(report.count(Rule::MissingRequired), 2);
    }

    #[test]
    fn test_revalidating_serialized_value_is_stable() {
        let schema = user_schema().with_additional(AdditionalProperties::Denied);
        let value = json!({"id": 12, "name": "Ada"});
        assert!(validate(value.clone(), &schema).is_empty());
        let reparsed: Value =
            serde_json::from_str(&serde_json::to_string(&value).unwrap()).unwrap();
        assert!(validate(reparsed, &schema).is_empty());
    }
}
