#![deny(missing_docs)]

//! # Document Loader
//!
//! Parses OpenAPI 3.0 YAML or JSON text into a sealed [`SchemaDocument`].
//!
//! The text is read into shim structs that mirror only the OpenAPI objects a
//! conformance check needs; every other field is ignored. Slots that may hold
//! a `$ref` are [`RefOr`]s. Parameter, request body, response and header
//! references are inlined here. Schema references stay symbolic and are
//! resolved through [`Components`](super::Components) during validation, so
//! recursive schemas load fine.

use super::refs::{component_name, Section};
use super::schema::{AdditionalProperties, Constraints, Pattern, SchemaNode, SchemaType};
use super::{
    Method, Operation, ParamLocation, ParamStyle, ParameterSpec, RequestBodySpec, ResponseSpec,
    SchemaDocument,
};
use crate::error::{AppError, AppResult};
use indexmap::IndexMap;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use utoipa::openapi::RefOr;

/// Root document.
#[derive(Deserialize)]
struct ShimOpenApi {
    openapi: Option<Value>,
    swagger: Option<Value>,
    #[serde(default)]
    paths: ShimPaths,
    #[serde(default)]
    components: ShimComponents,
}

/// Paths Object, minus `x-` extensions.
#[derive(Default)]
struct ShimPaths(IndexMap<String, ShimPathItem>);

impl<'de> Deserialize<'de> for ShimPaths {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = IndexMap::<String, Value>::deserialize(deserializer)?;
        let mut items = IndexMap::new();
        for (key, value) in raw {
            if key.starts_with("x-") {
                continue;
            }
            let item = serde_json::from_value::<ShimPathItem>(value).map_err(|e| {
                DeError::custom(format!("Failed to parse path item '{}': {}", key, e))
            })?;
            items.insert(key, item);
        }
        Ok(Self(items))
    }
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShimComponents {
    #[serde(default)]
    schemas: IndexMap<String, ShimSchema>,
    #[serde(default)]
    parameters: IndexMap<String, RefOr<ShimParameter>>,
    #[serde(default)]
    request_bodies: IndexMap<String, RefOr<ShimRequestBody>>,
    #[serde(default)]
    responses: IndexMap<String, RefOr<ShimResponse>>,
    #[serde(default)]
    headers: IndexMap<String, RefOr<ShimHeader>>,
}

#[derive(Deserialize)]
struct ShimPathItem {
    #[serde(rename = "$ref")]
    reference: Option<String>,
    #[serde(default)]
    parameters: Vec<RefOr<ShimParameter>>,
    get: Option<ShimOperation>,
    put: Option<ShimOperation>,
    post: Option<ShimOperation>,
    delete: Option<ShimOperation>,
    options: Option<ShimOperation>,
    head: Option<ShimOperation>,
    patch: Option<ShimOperation>,
    trace: Option<ShimOperation>,
}

impl ShimPathItem {
    fn operations(&self) -> impl Iterator<Item = (Method, &ShimOperation)> {
        [
            (Method::Get, &self.get),
            (Method::Put, &self.put),
            (Method::Post, &self.post),
            (Method::Delete, &self.delete),
            (Method::Options, &self.options),
            (Method::Head, &self.head),
            (Method::Patch, &self.patch),
            (Method::Trace, &self.trace),
        ]
        .into_iter()
        .filter_map(|(method, operation)| operation.as_ref().map(|op| (method, op)))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShimOperation {
    operation_id: Option<String>,
    #[serde(default)]
    parameters: Vec<RefOr<ShimParameter>>,
    request_body: Option<RefOr<ShimRequestBody>>,
    #[serde(default)]
    responses: IndexMap<String, RefOr<ShimResponse>>,
}

#[derive(Deserialize)]
struct ShimParameter {
    name: String,
    #[serde(rename = "in")]
    location: String,
    #[serde(default)]
    required: bool,
    schema: Option<ShimSchema>,
    content: Option<IndexMap<String, ShimMediaType>>,
    style: Option<String>,
    explode: Option<bool>,
}

/// Header Object: a parameter without `name` and `in`.
#[derive(Deserialize)]
struct ShimHeader {
    #[serde(default)]
    required: bool,
    schema: Option<ShimSchema>,
    content: Option<IndexMap<String, ShimMediaType>>,
    style: Option<String>,
    explode: Option<bool>,
}

#[derive(Deserialize)]
struct ShimRequestBody {
    #[serde(default)]
    required: bool,
    #[serde(default)]
    content: IndexMap<String, ShimMediaType>,
}

#[derive(Deserialize)]
struct ShimResponse {
    #[serde(default)]
    headers: IndexMap<String, RefOr<ShimHeader>>,
    #[serde(default)]
    content: IndexMap<String, ShimMediaType>,
}

#[derive(Deserialize)]
struct ShimMediaType {
    schema: Option<ShimSchema>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShimSchema {
    #[serde(rename = "$ref")]
    reference: Option<String>,
    #[serde(rename = "type")]
    schema_type: Option<ShimType>,
    #[serde(default)]
    nullable: bool,
    #[serde(rename = "enum")]
    enum_values: Option<Vec<Value>>,
    format: Option<String>,
    #[serde(default)]
    properties: IndexMap<String, ShimSchema>,
    #[serde(default)]
    required: Vec<String>,
    additional_properties: Option<ShimAdditional>,
    items: Option<Box<ShimSchema>>,
    #[serde(default)]
    all_of: Vec<ShimSchema>,
    #[serde(default)]
    any_of: Vec<ShimSchema>,
    #[serde(default)]
    one_of: Vec<ShimSchema>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    exclusive_minimum: Option<ShimExclusive>,
    exclusive_maximum: Option<ShimExclusive>,
    multiple_of: Option<f64>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<String>,
    min_items: Option<usize>,
    max_items: Option<usize>,
    #[serde(default)]
    unique_items: bool,
    min_properties: Option<usize>,
    max_properties: Option<usize>,
    #[serde(default)]
    read_only: bool,
    #[serde(default)]
    write_only: bool,
}

/// `type` as a single name, or the 3.1 list form (`[string, "null"]`).
#[derive(Deserialize)]
#[serde(untagged)]
enum ShimType {
    Single(String),
    Multiple(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ShimAdditional {
    Flag(bool),
    Schema(Box<ShimSchema>),
}

/// OAS 3.0 boolean modifier, or the 3.1 numeric bound.
#[derive(Deserialize)]
#[serde(untagged)]
enum ShimExclusive {
    Flag(bool),
    Bound(f64),
}

/// Parses an OpenAPI 3.0 document (YAML or JSON) and seals it.
///
/// Every failure, from malformed text to a dangling `$ref` or ambiguous
/// path templates, is an [`AppError::Document`].
pub fn load_document(source: &str) -> AppResult<SchemaDocument> {
    let raw: Value = serde_yaml::from_str(source)
        .map_err(|e| AppError::Document(format!("Failed to parse OpenAPI document: {}", e)))?;
    let shim: ShimOpenApi = serde_json::from_value(raw)
        .map_err(|e| AppError::Document(format!("Invalid OpenAPI document: {}", e)))?;
    check_version(&shim)?;

    let loader = Loader {
        components: &shim.components,
    };
    let mut builder = SchemaDocument::builder();
    for (name, schema) in &shim.components.schemas {
        builder = builder.component(name.clone(), convert_schema(schema)?);
    }
    for (template, item) in &shim.paths.0 {
        if let Some(reference) = &item.reference {
            return Err(AppError::Document(format!(
                "Path item '{}' uses '$ref: {}'; path item references are not supported",
                template, reference
            )));
        }
        for (method, operation) in item.operations() {
            builder = builder.operation(loader.operation(template, method, item, operation)?);
        }
    }

    let document = builder.build()?;
    info!(
        paths = document.paths().len(),
        operations = document.operations().count(),
        schemas = document.components().iter().count(),
        "loaded OpenAPI document"
    );
    Ok(document)
}

fn check_version(shim: &ShimOpenApi) -> AppResult<()> {
    let text = |v: &Value| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    match (&shim.openapi, &shim.swagger) {
        (Some(version), _) => {
            let version = text(version);
            if !version.starts_with("3.") {
                return Err(AppError::Document(format!(
                    "Unsupported OpenAPI version '{}'",
                    version
                )));
            }
            if !version.starts_with("3.0") {
                warn!(%version, "reading document with OpenAPI 3.0 semantics");
            }
            Ok(())
        }
        (None, Some(version)) => Err(AppError::Document(format!(
            "Swagger {} documents are not supported; convert to OpenAPI 3.0 first",
            text(version)
        ))),
        (None, None) => Err(AppError::Document(
            "Missing 'openapi' version field".to_string(),
        )),
    }
}

/// Follows a `RefOr` slot through its component table.
fn follow<'s, T>(
    section: Section,
    table: &'s IndexMap<String, RefOr<T>>,
    slot: &'s RefOr<T>,
) -> AppResult<&'s T> {
    let mut current = slot;
    let mut seen = HashSet::new();
    loop {
        match current {
            RefOr::T(value) => return Ok(value),
            RefOr::Ref(reference) => {
                let name = component_name(&reference.ref_location, section)?;
                if !seen.insert(name.clone()) {
                    return Err(AppError::Document(format!(
                        "Reference cycle through '#/components/{}/{}'",
                        section.as_str(),
                        name
                    )));
                }
                current = table.get(&name).ok_or_else(|| {
                    AppError::Document(format!(
                        "Reference '{}' cannot be resolved",
                        reference.ref_location
                    ))
                })?;
            }
        }
    }
}

struct Loader<'a> {
    components: &'a ShimComponents,
}

impl Loader<'_> {
    fn operation(
        &self,
        template: &str,
        method: Method,
        item: &ShimPathItem,
        shim: &ShimOperation,
    ) -> AppResult<Operation> {
        let mut operation = Operation::new(method, template);
        if let Some(id) = &shim.operation_id {
            operation = operation.with_operation_id(id.clone());
        }

        let own = self.parameters(&shim.parameters)?;
        let mut merged: Vec<ParameterSpec> = self
            .parameters(&item.parameters)?
            .into_iter()
            .filter(|p| !own.iter().any(|o| o.name == p.name && o.location == p.location))
            .collect();
        merged.extend(own);
        for parameter in merged {
            operation = operation.with_parameter(parameter);
        }

        if let Some(slot) = &shim.request_body {
            let body = follow(Section::RequestBodies, &self.components.request_bodies, slot)?;
            operation = operation.with_request_body(RequestBodySpec {
                required: body.required,
                content: convert_content(&body.content)?,
            });
        }

        for (status, slot) in &shim.responses {
            if status.starts_with("x-") {
                continue;
            }
            let response = follow(Section::Responses, &self.components.responses, slot)?;
            operation = operation.with_response(status.clone(), self.response(response)?);
        }
        Ok(operation)
    }

    fn parameters(&self, slots: &[RefOr<ShimParameter>]) -> AppResult<Vec<ParameterSpec>> {
        let mut parameters = Vec::new();
        for slot in slots {
            let shim = follow(Section::Parameters, &self.components.parameters, slot)?;
            if let Some(parameter) = convert_parameter(shim)? {
                parameters.push(parameter);
            }
        }
        Ok(parameters)
    }

    fn response(&self, shim: &ShimResponse) -> AppResult<ResponseSpec> {
        let mut response = ResponseSpec {
            headers: IndexMap::new(),
            content: convert_content(&shim.content)?,
        };
        for (name, slot) in &shim.headers {
            // Response `Content-Type` headers are described by `content`.
            if name.eq_ignore_ascii_case("content-type") {
                continue;
            }
            let header = follow(Section::Headers, &self.components.headers, slot)?;
            response
                .headers
                .insert(name.clone(), convert_header(name, header)?);
        }
        Ok(response)
    }
}

/// `Accept`, `Content-Type` and `Authorization` are governed by other parts of the document.
fn is_reserved_header(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "accept" | "content-type" | "authorization"
    )
}

fn convert_parameter(shim: &ShimParameter) -> AppResult<Option<ParameterSpec>> {
    let location = ParamLocation::parse(&shim.location).ok_or_else(|| {
        AppError::Document(format!(
            "Parameter '{}' has unsupported location '{}'",
            shim.name, shim.location
        ))
    })?;
    if location == ParamLocation::Header && is_reserved_header(&shim.name) {
        debug!(name = %shim.name, "ignoring reserved header parameter");
        return Ok(None);
    }
    if location == ParamLocation::Path && !shim.required {
        return Err(AppError::Document(format!(
            "Path parameter '{}' must set required: true",
            shim.name
        )));
    }

    let schema = parameter_schema(&shim.name, shim.schema.as_ref(), shim.content.as_ref())?;
    let mut parameter =
        ParameterSpec::new(shim.name.clone(), location, schema).required(shim.required);
    if let Some(style) = &shim.style {
        parameter = parameter.with_style(parse_style(&shim.name, style)?);
    }
    if let Some(explode) = shim.explode {
        parameter = parameter.with_explode(explode);
    }
    Ok(Some(parameter))
}

fn convert_header(name: &str, shim: &ShimHeader) -> AppResult<ParameterSpec> {
    if let Some(style) = &shim.style {
        if parse_style(name, style)? != ParamStyle::Simple {
            return Err(AppError::Document(format!(
                "Header '{}' must use style 'simple', found '{}'",
                name, style
            )));
        }
    }
    let schema = parameter_schema(name, shim.schema.as_ref(), shim.content.as_ref())?;
    let mut header =
        ParameterSpec::new(name, ParamLocation::Header, schema).required(shim.required);
    if let Some(explode) = shim.explode {
        header = header.with_explode(explode);
    }
    Ok(header)
}

fn parse_style(name: &str, style: &str) -> AppResult<ParamStyle> {
    ParamStyle::parse(style).ok_or_else(|| {
        AppError::Document(format!(
            "Parameter '{}' has unknown style '{}'",
            name, style
        ))
    })
}

/// `schema`, else the schema of the single `content` entry, else anything.
fn parameter_schema(
    name: &str,
    schema: Option<&ShimSchema>,
    content: Option<&IndexMap<String, ShimMediaType>>,
) -> AppResult<SchemaNode> {
    match (schema, content) {
        (Some(_), Some(_)) => Err(AppError::Document(format!(
            "Parameter '{}' cannot specify both 'schema' and 'content'",
            name
        ))),
        (Some(schema), None) => convert_schema(schema),
        (None, Some(content)) => match content.values().next().and_then(|m| m.schema.as_ref()) {
            Some(schema) => convert_schema(schema),
            None => Ok(SchemaNode::any()),
        },
        (None, None) => Ok(SchemaNode::any()),
    }
}

fn convert_content(
    content: &IndexMap<String, ShimMediaType>,
) -> AppResult<IndexMap<String, SchemaNode>> {
    content
        .iter()
        .map(|(media_type, media)| {
            let schema = match &media.schema {
                Some(schema) => convert_schema(schema)?,
                None => SchemaNode::any(),
            };
            Ok((media_type.clone(), schema))
        })
        .collect()
}

fn convert_schema(shim: &ShimSchema) -> AppResult<SchemaNode> {
    if let Some(reference) = &shim.reference {
        return Ok(SchemaNode::reference(component_name(reference, Section::Schemas)?));
    }

    let (schema_type, null_in_type) = match &shim.schema_type {
        None => (None, false),
        Some(ShimType::Single(name)) => (Some(parse_type(name)?), false),
        Some(ShimType::Multiple(names)) => {
            let concrete: Vec<&String> = names.iter().filter(|n| *n != "null").collect();
            match concrete.as_slice() {
                [] => (Some(SchemaType::Null), true),
                [single] => (Some(parse_type(single)?), concrete.len() < names.len()),
                _ => {
                    return Err(AppError::Document(format!(
                        "Schema type list {:?} is not supported; use oneOf",
                        names
                    )))
                }
            }
        }
    };

    let additional_properties = match &shim.additional_properties {
        None | Some(ShimAdditional::Flag(true)) => AdditionalProperties::Allowed,
        Some(ShimAdditional::Flag(false)) => AdditionalProperties::Denied,
        Some(ShimAdditional::Schema(schema)) => {
            AdditionalProperties::Schema(Box::new(convert_schema(schema)?))
        }
    };

    let mut properties = IndexMap::new();
    for (name, property) in &shim.properties {
        properties.insert(name.clone(), convert_schema(property)?);
    }

    Ok(SchemaNode {
        reference: None,
        schema_type,
        nullable: shim.nullable || null_in_type,
        enum_values: shim.enum_values.clone(),
        format: shim.format.clone(),
        properties,
        required: shim.required.clone(),
        additional_properties,
        items: shim
            .items
            .as_deref()
            .map(convert_schema)
            .transpose()?
            .map(Box::new),
        all_of: convert_all(&shim.all_of)?,
        any_of: convert_all(&shim.any_of)?,
        one_of: convert_all(&shim.one_of)?,
        constraints: convert_constraints(shim)?,
        read_only: shim.read_only,
        write_only: shim.write_only,
    })
}

fn convert_all(schemas: &[ShimSchema]) -> AppResult<Vec<SchemaNode>> {
    schemas.iter().map(convert_schema).collect()
}

fn parse_type(name: &str) -> AppResult<SchemaType> {
    SchemaType::parse(name)
        .ok_or_else(|| AppError::Document(format!("Unknown schema type '{}'", name)))
}

fn convert_constraints(shim: &ShimSchema) -> AppResult<Constraints> {
    let (minimum, exclusive_minimum) = bound(shim.minimum, shim.exclusive_minimum.as_ref());
    let (maximum, exclusive_maximum) = bound(shim.maximum, shim.exclusive_maximum.as_ref());
    if let Some(divisor) = shim.multiple_of {
        if divisor <= 0.0 {
            return Err(AppError::Document(format!(
                "multipleOf must be greater than zero, found {}",
                divisor
            )));
        }
    }
    let pattern = shim
        .pattern
        .as_deref()
        .map(Pattern::new)
        .transpose()
        .map_err(|e| AppError::Document(format!("Invalid schema pattern: {}", e)))?;

    Ok(Constraints {
        minimum,
        maximum,
        exclusive_minimum,
        exclusive_maximum,
        multiple_of: shim.multiple_of,
        min_length: shim.min_length,
        max_length: shim.max_length,
        pattern,
        min_items: shim.min_items,
        max_items: shim.max_items,
        unique_items: shim.unique_items,
        min_properties: shim.min_properties,
        max_properties: shim.max_properties,
    })
}

fn bound(value: Option<f64>, exclusive: Option<&ShimExclusive>) -> (Option<f64>, bool) {
    match exclusive {
        Some(ShimExclusive::Flag(flag)) => (value, *flag),
        Some(ShimExclusive::Bound(limit)) => (Some(*limit), true),
        None => (value, false),
    }
}
