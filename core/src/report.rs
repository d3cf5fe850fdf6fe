#![deny(missing_docs)]

//! # Validation Reports
//!
//! Findings with their locations, collected into a [`ValidationReport`].
//! An empty report means the exchange conforms.

use derive_more::Display;
use serde::{Serialize, Serializer};
use std::fmt;

/// The rule a finding violates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
pub enum Rule {
    /// Runtime type differs from the declared type (or unexpected `null`).
    TypeMismatch,
    /// A required property, parameter, header or body is absent.
    MissingRequired,
    /// Value is not one of the `enum` members.
    EnumViolation,
    /// Undeclared property where `additionalProperties: false`.
    AdditionalPropertyNotAllowed,
    /// Value fails its `format`.
    FormatViolation,
    /// `oneOf`/`anyOf` not satisfied.
    CompositionViolation,
    /// Response status has no documented response.
    UndocumentedStatusCode,
    /// Raw parameter text cannot be decoded under its style.
    ParameterEncoding,
    /// `minimum`/`maximum`/`multipleOf` violated.
    RangeViolation,
    /// Length or size bound violated.
    LengthViolation,
    /// String does not match `pattern`.
    PatternViolation,
    /// Array with `uniqueItems` has duplicates.
    UniqueItemsViolation,
    /// `readOnly` property in a request or `writeOnly` property in a response.
    AccessModeViolation,
    /// Body media type is not declared by the operation.
    UnsupportedMediaType,
    /// Body cannot be parsed for its media type.
    MalformedBody,
    /// A schema `$ref` has no target.
    UnresolvedReference,
}

/// One step of a finding's location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// The request as a whole.
    Request,
    /// The response as a whole.
    Response,
    /// The request body.
    RequestBody,
    /// The response body.
    ResponseBody,
    /// A request parameter.
    Parameter(String),
    /// A response header.
    Header(String),
    /// An object property.
    Property(String),
    /// An array index.
    Index(usize),
}

impl Segment {
    fn pointer_token(&self) -> String {
        let raw = match self {
            Self::Request => "request".to_string(),
            Self::Response => "response".to_string(),
            Self::RequestBody => "requestBody".to_string(),
            Self::ResponseBody => "responseBody".to_string(),
            Self::Parameter(name) => format!("parameter:{}", name),
            Self::Header(name) => format!("header:{}", name),
            Self::Property(name) => name.clone(),
            Self::Index(i) => i.to_string(),
        };
        raw.replace('~', "~0").replace('/', "~1")
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => f.write_str("request"),
            Self::Response => f.write_str("response"),
            Self::RequestBody => f.write_str("requestBody"),
            Self::ResponseBody => f.write_str("responseBody"),
            Self::Parameter(name) => write!(f, "parameter:{}", name),
            Self::Header(name) => write!(f, "header:{}", name),
            Self::Property(name) => f.write_str(name),
            Self::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// Ordered path from the exchange root to the offending value.
///
/// Displayed dotted (`requestBody.items[2].name`); see [`Location::json_pointer`]
/// for the RFC 6901 form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Location(Vec<Segment>);

impl Location {
    /// The empty location.
    pub fn root() -> Self {
        Self::default()
    }

    /// A location with a single segment.
    pub fn at(segment: Segment) -> Self {
        Self(vec![segment])
    }

    /// This location extended by one segment.
    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    /// Shorthand for `child(Segment::Property(name))`.
    pub fn property(&self, name: &str) -> Self {
        self.child(Segment::Property(name.to_string()))
    }

    /// Shorthand for `child(Segment::Index(index))`.
    pub fn index(&self, index: usize) -> Self {
        self.child(Segment::Index(index))
    }

    /// The segments.
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the root location.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// RFC 6901 rendering, e.g. `/requestBody/items/2/name`.
    pub fn json_pointer(&self) -> String {
        self.0
            .iter()
            .map(|s| format!("/{}", s.pointer_token()))
            .collect()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 && !matches!(segment, Segment::Index(_)) {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One detected deviation between a value and its contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationFinding {
    /// Where the deviation is.
    pub location: Location,
    /// Human readable explanation.
    pub message: String,
    /// Which rule was violated.
    pub rule: Rule,
}

impl ValidationFinding {
    /// Creates a finding.
    pub fn new(location: Location, rule: Rule, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
            rule,
        }
    }
}

impl fmt::Display for ValidationFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Ordered findings of one check. Empty means pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ValidationReport {
    findings: Vec<ValidationFinding>,
}

impl ValidationReport {
    /// An empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finding.
    pub fn push(&mut self, finding: ValidationFinding) {
        self.findings.push(finding);
    }

    /// Appends a finding built from its parts.
    pub fn add(&mut self, location: Location, rule: Rule, message: impl Into<String>) {
        self.push(ValidationFinding::new(location, rule, message));
    }

    /// Moves every finding of `other` to the end of this report.
    pub fn merge(&mut self, other: ValidationReport) {
        self.findings.extend(other.findings);
    }

    /// Whether the check passed.
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Number of findings.
    pub fn len(&self) -> usize {
        self.findings.len()
    }

    /// Iterates over the findings in order.
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationFinding> {
        self.findings.iter()
    }

    /// The findings in order.
    pub fn findings(&self) -> &[ValidationFinding] {
        &self.findings
    }

    /// Number of findings for `rule`.
    pub fn count(&self, rule: Rule) -> usize {
        self.findings.iter().filter(|f| f.rule == rule).count()
    }

    /// One line per finding, each prefixed by its location.
    pub fn describe(&self) -> String {
        self.findings
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// `Ok(())` when empty, otherwise the report itself.
    pub fn into_result(self) -> Result<(), ValidationReport> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl std::error::Error for ValidationReport {}

impl IntoIterator for ValidationReport {
    type Item = ValidationFinding;
    type IntoIter = std::vec::IntoIter<ValidationFinding>;

    fn into_iter(self) -> Self::IntoIter {
        self.findings.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationReport {
    type Item = &'a ValidationFinding;
    type IntoIter = std::slice::Iter<'a, ValidationFinding>;

    fn into_iter(self) -> Self::IntoIter {
        self.findings.iter()
    }
}

impl Extend<ValidationFinding> for ValidationReport {
    fn extend<T: IntoIterator<Item = ValidationFinding>>(&mut self, iter: T) {
        self.findings.extend(iter);
    }
}
