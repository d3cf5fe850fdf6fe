#![deny(missing_docs)]

//! # Schema Document
//!
//! In-memory, read-only representation of an OpenAPI 3.0 document.
//!
//! - **schema**: the recursive [`SchemaNode`] tree and the component table.
//! - **loader**: YAML/JSON text to [`SchemaDocument`].
//! - **refs**: local `$ref` pointer helpers.
//!
//! A [`SchemaDocument`] can only be obtained from [`SchemaDocumentBuilder::build`]
//! (directly or through the loader), which runs the consistency checks once. After
//! that nothing hands out `&mut`, so one document can back any number of
//! concurrent checks.

pub mod loader;
pub(crate) mod refs;
pub mod schema;

pub use loader::load_document;
pub use schema::{AdditionalProperties, Components, Constraints, Pattern, SchemaNode, SchemaType};

use crate::error::{AppError, AppResult};
use crate::routing::PathTemplate;
use derive_more::Display;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::str::FromStr;

/// HTTP methods an operation can be declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum Method {
    /// `GET`
    #[display("GET")]
    Get,
    /// `PUT`
    #[display("PUT")]
    Put,
    /// `POST`
    #[display("POST")]
    Post,
    /// `DELETE`
    #[display("DELETE")]
    Delete,
    /// `OPTIONS`
    #[display("OPTIONS")]
    Options,
    /// `HEAD`
    #[display("HEAD")]
    Head,
    /// `PATCH`
    #[display("PATCH")]
    Patch,
    /// `TRACE`
    #[display("TRACE")]
    Trace,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
            Self::Patch => "PATCH",
            Self::Trace => "TRACE",
        }
    }
}

impl FromStr for Method {
    type Err = AppError;

    /// Case-insensitive; accepts both `get` (path item keys) and `GET`.
    fn from_str(s: &str) -> AppResult<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "PUT" => Ok(Self::Put),
            "POST" => Ok(Self::Post),
            "DELETE" => Ok(Self::Delete),
            "OPTIONS" => Ok(Self::Options),
            "HEAD" => Ok(Self::Head),
            "PATCH" => Ok(Self::Patch),
            "TRACE" => Ok(Self::Trace),
            _ => Err(AppError::General(format!("Unsupported HTTP method '{}'", s))),
        }
    }
}

/// Where a parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ParamLocation {
    /// Path placeholder.
    #[display("path")]
    Path,
    /// URL query string.
    #[display("query")]
    Query,
    /// Request or response header.
    #[display("header")]
    Header,
    /// `Cookie` header entry.
    #[display("cookie")]
    Cookie,
}

impl ParamLocation {
    /// Parses an `in` value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }

    /// Style used when a parameter declares none.
    pub fn default_style(&self) -> ParamStyle {
        match self {
            Self::Path | Self::Header => ParamStyle::Simple,
            Self::Query | Self::Cookie => ParamStyle::Form,
        }
    }

    /// Styles OpenAPI 3.0 permits in this location.
    pub fn allows(&self, style: ParamStyle) -> bool {
        match self {
            Self::Path => matches!(
                style,
                ParamStyle::Matrix | ParamStyle::Label | ParamStyle::Simple
            ),
            Self::Query => matches!(
                style,
                ParamStyle::Form
                    | ParamStyle::SpaceDelimited
                    | ParamStyle::PipeDelimited
                    | ParamStyle::DeepObject
            ),
            Self::Header => matches!(style, ParamStyle::Simple),
            Self::Cookie => matches!(style, ParamStyle::Form),
        }
    }
}

/// Parameter serialization style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ParamStyle {
    /// `matrix`
    #[display("matrix")]
    Matrix,
    /// `label`
    #[display("label")]
    Label,
    /// `form`
    #[display("form")]
    Form,
    /// `simple`
    #[display("simple")]
    Simple,
    /// `spaceDelimited`
    #[display("spaceDelimited")]
    SpaceDelimited,
    /// `pipeDelimited`
    #[display("pipeDelimited")]
    PipeDelimited,
    /// `deepObject`
    #[display("deepObject")]
    DeepObject,
}

impl ParamStyle {
    /// Parses a `style` value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "matrix" => Some(Self::Matrix),
            "label" => Some(Self::Label),
            "form" => Some(Self::Form),
            "simple" => Some(Self::Simple),
            "spaceDelimited" => Some(Self::SpaceDelimited),
            "pipeDelimited" => Some(Self::PipeDelimited),
            "deepObject" => Some(Self::DeepObject),
            _ => None,
        }
    }

    /// `explode` default: `true` for `form`, otherwise `false`.
    pub fn default_explode(&self) -> bool {
        matches!(self, Self::Form)
    }
}

/// A declared parameter (or response header).
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    /// Parameter name.
    pub name: String,
    /// Location.
    pub location: ParamLocation,
    /// Whether the parameter must be present. Always `true` for path parameters.
    pub required: bool,
    /// Value schema.
    pub schema: SchemaNode,
    /// Serialization style.
    pub style: ParamStyle,
    /// Explode modifier.
    pub explode: bool,
}

impl ParameterSpec {
    /// Creates a parameter with the location's default style and explode.
    pub fn new(name: impl Into<String>, location: ParamLocation, schema: SchemaNode) -> Self {
        let style = location.default_style();
        Self {
            name: name.into(),
            location,
            required: location == ParamLocation::Path,
            schema,
            style,
            explode: style.default_explode(),
        }
    }

    /// Sets `required`. Ignored for path parameters.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required || self.location == ParamLocation::Path;
        self
    }

    /// Sets the style and resets `explode` to that style's default.
    pub fn with_style(mut self, style: ParamStyle) -> Self {
        self.style = style;
        self.explode = style.default_explode();
        self
    }

    /// Sets `explode`.
    pub fn with_explode(mut self, explode: bool) -> Self {
        self.explode = explode;
        self
    }
}

/// Declared request body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestBodySpec {
    /// Whether a body must be sent.
    pub required: bool,
    /// Schema per media type (or media range). Media types without a schema map to
    /// [`SchemaNode::any`].
    pub content: IndexMap<String, SchemaNode>,
}

impl RequestBodySpec {
    /// A body with a single media type.
    pub fn new(media_type: impl Into<String>, schema: SchemaNode) -> Self {
        let mut content = IndexMap::new();
        content.insert(media_type.into(), schema);
        Self {
            required: false,
            content,
        }
    }

    /// Sets `required`.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

/// Declared response for one status-code pattern.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResponseSpec {
    /// Declared headers, keyed by name.
    pub headers: IndexMap<String, ParameterSpec>,
    /// Schema per media type.
    pub content: IndexMap<String, SchemaNode>,
}

impl ResponseSpec {
    /// A response with no body.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A response with a single media type.
    pub fn new(media_type: impl Into<String>, schema: SchemaNode) -> Self {
        Self::empty().with_content(media_type, schema)
    }

    /// Adds a media type.
    pub fn with_content(mut self, media_type: impl Into<String>, schema: SchemaNode) -> Self {
        self.content.insert(media_type.into(), schema);
        self
    }

    /// Adds a header.
    pub fn with_header(
        mut self,
        name: impl Into<String>,
        required: bool,
        schema: SchemaNode,
    ) -> Self {
        let name = name.into();
        let header =
            ParameterSpec::new(name.clone(), ParamLocation::Header, schema).required(required);
        self.headers.insert(name, header);
        self
    }
}

/// One `(path template, method)` pair and its contract.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    template: String,
    method: Method,
    operation_id: Option<String>,
    parameters: Vec<ParameterSpec>,
    request_body: Option<RequestBodySpec>,
    responses: IndexMap<String, ResponseSpec>,
}

impl Operation {
    /// Starts an operation declaration.
    pub fn new(method: Method, template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            method,
            operation_id: None,
            parameters: Vec::new(),
            request_body: None,
            responses: IndexMap::new(),
        }
    }

    /// Sets `operationId`.
    pub fn with_operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    /// Appends a parameter.
    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Sets the request body.
    pub fn with_request_body(mut self, body: RequestBodySpec) -> Self {
        self.request_body = Some(body);
        self
    }

    /// Declares a response for a status pattern (`"200"`, `"4XX"`, `"default"`).
    pub fn with_response(mut self, status: impl Into<String>, response: ResponseSpec) -> Self {
        self.responses.insert(status.into(), response);
        self
    }

    /// The path template, e.g. `/users/{id}`.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// `operationId`, if declared.
    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    /// Parameters in declaration order.
    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    /// Request body, if declared.
    pub fn request_body(&self) -> Option<&RequestBodySpec> {
        self.request_body.as_ref()
    }

    /// Responses keyed by status pattern.
    pub fn responses(&self) -> &IndexMap<String, ResponseSpec> {
        &self.responses
    }

    fn schemas(&self) -> impl Iterator<Item = &SchemaNode> {
        let params = self.parameters.iter().map(|p| &p.schema);
        let body = self
            .request_body
            .iter()
            .flat_map(|b| b.content.values());
        let responses = self.responses.values().flat_map(|r| {
            r.content
                .values()
                .chain(r.headers.values().map(|h| &h.schema))
        });
        params.chain(body).chain(responses)
    }
}

/// A path template and the operations declared on it.
#[derive(Debug, Clone, PartialEq)]
pub struct PathEntry {
    template: PathTemplate,
    operations: IndexMap<Method, Operation>,
}

impl PathEntry {
    /// The parsed template.
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// The operation for `method`, if declared.
    pub fn operation(&self, method: Method) -> Option<&Operation> {
        self.operations.get(&method)
    }

    /// Declared methods in document order.
    pub fn methods(&self) -> Vec<Method> {
        self.operations.keys().copied().collect()
    }

    /// Declared operations in document order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }
}

/// A sealed OpenAPI document.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    paths: Vec<PathEntry>,
    components: Components,
}

impl SchemaDocument {
    /// Starts building a document.
    pub fn builder() -> SchemaDocumentBuilder {
        SchemaDocumentBuilder::default()
    }

    /// Path entries in document order.
    pub fn paths(&self) -> &[PathEntry] {
        &self.paths
    }

    /// Every operation, path by path.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.paths.iter().flat_map(|p| p.operations())
    }

    /// Looks up an operation by its literal template and method.
    pub fn operation(&self, template: &str, method: Method) -> Option<&Operation> {
        self.paths
            .iter()
            .find(|p| p.template.as_str() == template)
            .and_then(|p| p.operation(method))
    }

    /// The schema component table.
    pub fn components(&self) -> &Components {
        &self.components
    }
}

/// Collects operations and components, then seals them into a [`SchemaDocument`].
#[derive(Debug, Default)]
pub struct SchemaDocumentBuilder {
    operations: Vec<Operation>,
    components: IndexMap<String, SchemaNode>,
}

impl SchemaDocumentBuilder {
    /// Adds an operation.
    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Adds a `#/components/schemas` entry.
    pub fn component(mut self, name: impl Into<String>, schema: SchemaNode) -> Self {
        self.components.insert(name.into(), schema);
        self
    }

    /// Validates and seals the document.
    ///
    /// Fails when:
    /// - an operation is declared twice for the same template and method,
    /// - a template's placeholders and its path parameters disagree,
    /// - two templates can match the same concrete path with equal specificity,
    /// - a schema `$ref` has no target or refs form a loop.
    pub fn build(self) -> AppResult<SchemaDocument> {
        let components = Components::new(self.components);
        let mut paths: Vec<PathEntry> = Vec::new();

        for operation in self.operations {
            check_path_parameters(&operation)?;
            for schema in operation.schemas() {
                check_references(schema, &components)?;
            }

            let index = match paths
                .iter()
                .position(|p| p.template.as_str() == operation.template)
            {
                Some(index) => index,
                None => {
                    paths.push(PathEntry {
                        template: PathTemplate::parse(&operation.template)?,
                        operations: IndexMap::new(),
                    });
                    paths.len() - 1
                }
            };
            let entry = &mut paths[index];
            if entry.operations.contains_key(&operation.method) {
                return Err(AppError::Document(format!(
                    "Operation {} {} is declared twice",
                    operation.method, operation.template
                )));
            }
            entry.operations.insert(operation.method, operation);
        }

        for (_, schema) in components.iter() {
            check_references(schema, &components)?;
        }

        for (i, left) in paths.iter().enumerate() {
            for right in &paths[i + 1..] {
                if left.template.overlaps(&right.template) {
                    return Err(AppError::Document(format!(
                        "Path templates '{}' and '{}' are ambiguous: both match the same paths with equal specificity",
                        left.template.as_str(),
                        right.template.as_str()
                    )));
                }
            }
        }

        Ok(SchemaDocument { paths, components })
    }
}

fn check_path_parameters(operation: &Operation) -> AppResult<()> {
    let template = PathTemplate::parse(&operation.template)?;
    let placeholders: HashSet<&str> = template.placeholders().collect();

    let mut declared = HashSet::new();
    for param in &operation.parameters {
        if !declared.insert((param.location, param.name.as_str())) {
            return Err(AppError::Document(format!(
                "Duplicate parameter '{}' in location '{}' on {} {}",
                param.name, param.location, operation.method, operation.template
            )));
        }
        if !param.location.allows(param.style) {
            return Err(AppError::Document(format!(
                "Parameter '{}' uses style '{}' which is not allowed for {}",
                param.name, param.style, param.location
            )));
        }
        if param.location != ParamLocation::Path {
            continue;
        }
        if !param.required {
            return Err(AppError::Document(format!(
                "Path parameter '{}' must set required: true",
                param.name
            )));
        }
        if !placeholders.contains(param.name.as_str()) {
            return Err(AppError::Document(format!(
                "Path parameter '{}' has no placeholder in '{}'",
                param.name, operation.template
            )));
        }
    }

    for name in placeholders {
        if !declared.contains(&(ParamLocation::Path, name)) {
            return Err(AppError::Document(format!(
                "Placeholder '{{{}}}' in {} {} has no path parameter",
                name, operation.method, operation.template
            )));
        }
    }
    Ok(())
}

fn check_references(schema: &SchemaNode, components: &Components) -> AppResult<()> {
    let mut result = Ok(());
    schema.walk(&mut |node| {
        if result.is_err() {
            return;
        }
        if let Some(name) = &node.reference {
            if components.resolve(node).is_none() {
                result = Err(AppError::Document(format!(
                    "Schema reference '#/components/schemas/{}' cannot be resolved",
                    name
                )));
            }
        }
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_by_id(method: Method) -> Operation {
        Operation::new(method, "/users/{id}").with_parameter(ParameterSpec::new(
            "id",
            ParamLocation::Path,
            SchemaNode::integer(),
        ))
    }

    #[test]
    fn test_method_parse_case_insensitive() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("PATCH".parse::<Method>().unwrap(), Method::Patch);
        assert!("BREW".parse::<Method>().is_err());
    }

    #[test]
    fn test_parameter_defaults_per_location() {
        let query = ParameterSpec::new("q", ParamLocation::Query, SchemaNode::string());
        assert_eq!(query.style, ParamStyle::Form);
        assert!(query.explode);
        assert!(!query.required);

        let path =
            ParameterSpec::new("id", ParamLocation::Path, SchemaNode::string()).required(false);
        assert_eq!(path.style, ParamStyle::Simple);
        assert!(!path.explode);
        assert!(path.required);
    }

    #[test]
    fn test_build_groups_operations_by_template() {
        let doc = SchemaDocument::builder()
            .operation(user_by_id(Method::Get))
            .operation(user_by_id(Method::Delete))
            .build()
            .unwrap();
        assert_eq!(doc.paths().len(), 1);
        assert_eq!(doc.paths()[0].methods(), vec![Method::Get, Method::Delete]);
        assert!(doc.operation("/users/{id}", Method::Delete).is_some());
        assert!(doc.operation("/users/{id}", Method::Post).is_none());
    }

    #[test]
    fn test_build_rejects_duplicate_operation() {
        let err = SchemaDocument::builder()
            .operation(user_by_id(Method::Get))
            .operation(user_by_id(Method::Get))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_build_rejects_missing_path_parameter() {
        let err = SchemaDocument::builder()
            .operation(Operation::new(Method::Get, "/users/{id}"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("has no path parameter"));
    }

    #[test]
    fn test_build_rejects_illegal_style() {
        let op = Operation::new(Method::Get, "/items").with_parameter(
            ParameterSpec::new(
                "ids",
                ParamLocation::Query,
                SchemaNode::array(SchemaNode::integer()),
            )
            .with_style(ParamStyle::Matrix),
        );
        let err = SchemaDocument::builder().operation(op).build().unwrap_err();
        assert!(err.to_string().contains("not allowed for query"));
    }

    #[test]
    fn test_build_rejects_ambiguous_templates() {
        let other = Operation::new(Method::Get, "/users/{name}").with_parameter(
            ParameterSpec::new("name", ParamLocation::Path, SchemaNode::string()),
        );
        let err = SchemaDocument::builder()
            .operation(user_by_id(Method::Get))
            .operation(other)
            .build()
            .unwrap_err();
        assert!(matches!(err, AppError::Document(msg) if msg.contains("ambiguous")));
    }

    #[test]
    fn test_build_accepts_literal_beside_placeholder() {
        let doc = SchemaDocument::builder()
            .operation(user_by_id(Method::Get))
            .operation(Operation::new(Method::Get, "/users/me"))
            .build();
        assert!(doc.is_ok());
    }

    #[test]
    fn test_build_rejects_dangling_reference() {
        let op = Operation::new(Method::Post, "/users").with_request_body(RequestBodySpec::new(
            "application/json",
            SchemaNode::reference("User"),
        ));
        let err = SchemaDocument::builder().operation(op).build().unwrap_err();
        assert!(err.to_string().contains("#/components/schemas/User"));
    }

    #[test]
    fn test_document_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SchemaDocument>();
    }
}
