#![deny(missing_docs)]

//! # Conformance Checker
//!
//! Checks one captured HTTP exchange against the operation it targets.
//!
//! Resolution failures ([`NoMatchError`](crate::error::NoMatchError)) abort a
//! check; content violations never do. Every parameter, header and body is
//! checked so one report carries every finding of the exchange.

use crate::document::{
    Method, Operation, ParamLocation, ParamStyle, ParameterSpec, ResponseSpec, SchemaDocument,
    SchemaNode,
};
use crate::error::AppResult;
use crate::media;
use crate::params::{ParameterCoercer, RawValue};
use crate::report::{Location, Rule, Segment, ValidationReport};
use crate::routing::{PathMatcher, RouteMatch};
use crate::validation::{Direction, SchemaValidator};
use indexmap::IndexMap;
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

/// A captured request. Query and header values are raw wire text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRequest {
    /// Request method.
    pub method: Method,
    /// Concrete path, routing prefix already stripped.
    pub path: String,
    /// Query pairs in wire order, still percent-encoded.
    pub query: Vec<(String, String)>,
    /// Header pairs; a repeated header appears once per occurrence.
    pub headers: Vec<(String, String)>,
    /// Body bytes, if any were sent.
    pub body: Option<Vec<u8>>,
}

impl ExchangeRequest {
    /// A request for `path`. A `?query` suffix is split into [`Self::query`].
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path.to_string(), parse_query(query)),
            None => (path, Vec::new()),
        };
        Self {
            method,
            path,
            query,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Appends a raw query pair.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Appends a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the body and its `Content-Type`.
    pub fn with_body(self, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        let mut request = self.with_header("Content-Type", content_type);
        request.body = Some(body.into());
        request
    }

    /// Sets a JSON body.
    pub fn with_json_body(self, body: &Value) -> Self {
        self.with_body("application/json", body.to_string())
    }

    /// Values of header `name`, case-insensitively, in order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        header_values(&self.headers, name)
    }
}

/// A captured response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeResponse {
    /// Status code.
    pub status: u16,
    /// Header pairs; a repeated header appears once per occurrence.
    pub headers: Vec<(String, String)>,
    /// Body bytes, if any were sent.
    pub body: Option<Vec<u8>>,
}

impl ExchangeResponse {
    /// A response with `status` and nothing else.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Appends a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the body and its `Content-Type`.
    pub fn with_body(self, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        let mut response = self.with_header("Content-Type", content_type);
        response.body = Some(body.into());
        response
    }

    /// Sets a JSON body.
    pub fn with_json_body(self, body: &Value) -> Self {
        self.with_body("application/json", body.to_string())
    }

    /// Values of header `name`, case-insensitively, in order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        header_values(&self.headers, name)
    }
}

/// Which checks run. Passed per call; the checker itself holds no flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CheckOptions {
    /// Coerce and validate declared parameters.
    pub validate_parameters: bool,
    /// Validate the request body.
    pub validate_request_body: bool,
    /// Validate the response body.
    pub validate_response_body: bool,
    /// Validate declared response headers.
    pub validate_response_headers: bool,
    /// Report bodies whose media type the operation does not declare.
    pub reject_undocumented_media_types: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            validate_parameters: true,
            validate_request_body: true,
            validate_response_body: true,
            validate_response_headers: true,
            reject_undocumented_media_types: true,
        }
    }
}

impl CheckOptions {
    /// Every check off. Routes are still resolved.
    pub fn disabled() -> Self {
        Self {
            validate_parameters: false,
            validate_request_body: false,
            validate_response_body: false,
            validate_response_headers: false,
            reject_undocumented_media_types: false,
        }
    }

    fn checks_request(&self) -> bool {
        self.validate_parameters || self.validate_request_body
    }

    fn checks_response(&self) -> bool {
        self.validate_response_body || self.validate_response_headers
    }
}

/// Per-call state: the matched operation and the request it was matched for.
struct ExchangeContext<'d, 'x> {
    operation: &'d Operation,
    bindings: IndexMap<String, String>,
    request: &'x ExchangeRequest,
}

/// Validates exchanges against a sealed [`SchemaDocument`].
///
/// Holds only a shared reference, so one checker (or many) can run on any
/// number of threads at once.
#[derive(Debug, Clone, Copy)]
pub struct ConformanceChecker<'d> {
    document: &'d SchemaDocument,
}

impl<'d> ConformanceChecker<'d> {
    /// Creates a checker for `document`.
    pub fn new(document: &'d SchemaDocument) -> Self {
        Self { document }
    }

    /// Resolves the operation `request` targets.
    pub fn resolve(&self, request: &ExchangeRequest) -> AppResult<RouteMatch<'d>> {
        PathMatcher::new(self.document).resolve(&request.path, request.method)
    }

    /// Checks parameters and body of `request`.
    ///
    /// Fails only when no operation can be resolved.
    pub fn check_request(
        &self,
        request: &ExchangeRequest,
        options: &CheckOptions,
    ) -> AppResult<ValidationReport> {
        let route = self.resolve(request)?;
        Ok(self.request_report(route, request, options))
    }

    /// Checks `response` against the responses `operation` declares.
    pub fn check_response(
        &self,
        operation: &Operation,
        response: &ExchangeResponse,
        options: &CheckOptions,
    ) -> ValidationReport {
        let mut report = ValidationReport::new();
        if !options.checks_response() {
            return report;
        }

        let Some((pattern, spec)) = select_response(operation, response.status) else {
            report.add(
                Location::at(Segment::Response),
                Rule::UndocumentedStatusCode,
                format!(
                    "Status code {} is not documented for {} {} (documented: {})",
                    response.status,
                    operation.method(),
                    operation.template(),
                    operation
                        .responses()
                        .keys()
                        .map(String::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            );
            return report;
        };
        debug!(
            status = response.status,
            pattern,
            operation = operation.template(),
            "selected response"
        );

        if options.validate_response_headers {
            self.check_response_headers(spec, response, &mut report);
        }
        if options.validate_response_body {
            if let Some(body) = response.body.as_deref().filter(|b| !b.is_empty()) {
                let content_type = response.header_values("content-type").first().copied();
                self.check_body(
                    &spec.content,
                    content_type,
                    body,
                    Location::at(Segment::ResponseBody),
                    Direction::Response,
                    options,
                    &mut report,
                );
            }
        }

        trace!(findings = report.len(), "checked response");
        report
    }

    /// Resolves once, then checks both sides. Request findings come first.
    pub fn check_exchange(
        &self,
        request: &ExchangeRequest,
        response: &ExchangeResponse,
        options: &CheckOptions,
    ) -> AppResult<ValidationReport> {
        let route = self.resolve(request)?;
        let operation = route.operation;
        let mut report = self.request_report(route, request, options);
        report.merge(self.check_response(operation, response, options));
        Ok(report)
    }

    fn request_report(
        &self,
        route: RouteMatch<'d>,
        request: &ExchangeRequest,
        options: &CheckOptions,
    ) -> ValidationReport {
        let mut report = ValidationReport::new();
        if !options.checks_request() {
            return report;
        }

        let context = ExchangeContext {
            operation: route.operation,
            bindings: route.bindings,
            request,
        };
        if options.validate_parameters {
            self.check_parameters(&context, &mut report);
        }
        if options.validate_request_body {
            self.check_request_body(&context, options, &mut report);
        }

        trace!(findings = report.len(), "checked request");
        report
    }

    fn coercer(&self) -> ParameterCoercer<'d> {
        ParameterCoercer::new(self.document.components())
    }

    fn validator(&self, direction: Direction) -> SchemaValidator<'d> {
        SchemaValidator::new(self.document.components()).with_direction(direction)
    }

    fn check_parameters(&self, context: &ExchangeContext<'_, '_>, report: &mut ValidationReport) {
        let coercer = self.coercer();
        let validator = self.validator(Direction::Request);

        for spec in context.operation.parameters() {
            let location = Location::at(Segment::Parameter(spec.name.clone()));
            let Some(raw) = self.raw_parameter(context, spec) else {
                if spec.required {
                    report.add(
                        location,
                        Rule::MissingRequired,
                        format!(
                            "Required {} parameter '{}' is missing",
                            spec.location, spec.name
                        ),
                    );
                }
                continue;
            };
            match coercer.coerce(spec, &raw) {
                Ok(value) => report.merge(validator.validate(&value, &spec.schema, &location)),
                Err(err) => report.add(location, Rule::ParameterEncoding, err.to_string()),
            }
        }
    }

    fn raw_parameter(
        &self,
        context: &ExchangeContext<'_, '_>,
        spec: &ParameterSpec,
    ) -> Option<RawValue> {
        let request = context.request;
        match spec.location {
            ParamLocation::Path => context
                .bindings
                .get(&spec.name)
                .map(|value| RawValue::single(value.clone())),
            ParamLocation::Query => self.raw_query(context, spec),
            ParamLocation::Header => {
                let values: Vec<String> = request
                    .header_values(&spec.name)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                (!values.is_empty()).then_some(RawValue::Values(values))
            }
            ParamLocation::Cookie => request
                .header_values("cookie")
                .into_iter()
                .flat_map(|header| header.split(';'))
                .filter_map(|cookie| cookie.trim().split_once('='))
                .find(|(name, _)| *name == spec.name)
                .map(|(_, value)| RawValue::single(value)),
        }
    }

    fn raw_query(
        &self,
        context: &ExchangeContext<'_, '_>,
        spec: &ParameterSpec,
    ) -> Option<RawValue> {
        let query = &context.request.query;
        if spec.style == ParamStyle::DeepObject {
            let prefix = format!("{}[", spec.name);
            let pairs: Vec<(String, String)> = query
                .iter()
                .filter_map(|(key, value)| {
                    let key = decode_query(key);
                    let inner = key.strip_prefix(&prefix)?.strip_suffix(']')?.to_string();
                    Some((inner, decode_query(value)))
                })
                .collect();
            return (!pairs.is_empty()).then_some(RawValue::Pairs(pairs));
        }

        let values: Vec<String> = query
            .iter()
            .filter(|(key, _)| decode_query(key) == spec.name)
            .map(|(_, value)| value.replace('+', " "))
            .collect();
        if !values.is_empty() {
            return Some(RawValue::Values(values));
        }

        // Exploded form objects spread their properties over the query string.
        if spec.style == ParamStyle::Form
            && spec.explode
            && self.coercer().expects_object(spec)
        {
            let claimed: Vec<&str> = context
                .operation
                .parameters()
                .iter()
                .filter(|p| p.location == ParamLocation::Query)
                .map(|p| p.name.as_str())
                .collect();
            let pairs: Vec<(String, String)> = query
                .iter()
                .map(|(key, value)| (decode_query(key), value))
                .filter(|(key, _)| !claimed.contains(&key.as_str()))
                .map(|(key, value)| (key, decode_query(value)))
                .collect();
            return (!pairs.is_empty()).then_some(RawValue::Pairs(pairs));
        }
        None
    }

    fn check_request_body(
        &self,
        context: &ExchangeContext<'_, '_>,
        options: &CheckOptions,
        report: &mut ValidationReport,
    ) {
        let Some(spec) = context.operation.request_body() else {
            return;
        };
        let location = Location::at(Segment::RequestBody);
        let Some(body) = context.request.body.as_deref().filter(|b| !b.is_empty()) else {
            if spec.required {
                report.add(
                    location,
                    Rule::MissingRequired,
                    "Request body is required but none was sent",
                );
            }
            return;
        };
        let content_type = context.request.header_values("content-type").first().copied();
        self.check_body(
            &spec.content,
            content_type,
            body,
            location,
            Direction::Request,
            options,
            report,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn check_body(
        &self,
        content: &IndexMap<String, SchemaNode>,
        content_type: Option<&str>,
        body: &[u8],
        location: Location,
        direction: Direction,
        options: &CheckOptions,
        report: &mut ValidationReport,
    ) {
        if content.is_empty() {
            return;
        }
        let selected = match content_type {
            Some(content_type) => media::lookup(content, content_type),
            None => content.first().map(|(declared, schema)| (declared.as_str(), schema)),
        };
        let Some((declared, schema)) = selected else {
            if options.reject_undocumented_media_types {
                report.add(
                    location,
                    Rule::UnsupportedMediaType,
                    format!(
                        "Media type '{}' is not declared (expected one of: {})",
                        content_type.unwrap_or_default(),
                        content.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
                    ),
                );
            }
            return;
        };

        let essence = media::essence(content_type.unwrap_or(declared));
        let value = if media::is_json(&essence) {
            match serde_json::from_slice::<Value>(body) {
                Ok(value) => value,
                Err(err) => {
                    report.add(
                        location,
                        Rule::MalformedBody,
                        format!("Body is not valid JSON: {}", err),
                    );
                    return;
                }
            }
        } else if media::is_form(&essence) {
            self.coercer().coerce_form_fields(&form_fields(body), schema)
        } else if media::is_text(&essence) {
            match std::str::from_utf8(body) {
                Ok(text) => Value::String(text.to_string()),
                Err(err) => {
                    report.add(
                        location,
                        Rule::MalformedBody,
                        format!("Body is not valid UTF-8: {}", err),
                    );
                    return;
                }
            }
        } else {
            debug!(media_type = %essence, "no decoder for media type, skipping body schema");
            return;
        };

        report.merge(self.validator(direction).validate(&value, schema, &location));
    }

    fn check_response_headers(
        &self,
        spec: &ResponseSpec,
        response: &ExchangeResponse,
        report: &mut ValidationReport,
    ) {
        let coercer = self.coercer();
        let validator = self.validator(Direction::Response);

        for (name, header) in &spec.headers {
            let location = Location::at(Segment::Header(name.clone()));
            let values: Vec<String> = response
                .header_values(name)
                .into_iter()
                .map(str::to_string)
                .collect();
            if values.is_empty() {
                if header.required {
                    report.add(
                        location,
                        Rule::MissingRequired,
                        format!("Required header '{}' is missing", name),
                    );
                }
                continue;
            }
            match coercer.coerce(header, &RawValue::Values(values)) {
                Ok(value) => report.merge(validator.validate(&value, &header.schema, &location)),
                Err(err) => report.add(location, Rule::ParameterEncoding, err.to_string()),
            }
        }
    }
}

/// Exact code, then `NXX` range, then `default`.
fn select_response(operation: &Operation, status: u16) -> Option<(&str, &ResponseSpec)> {
    let responses = operation.responses();
    let exact = status.to_string();
    let range = format!("{}XX", status / 100);

    responses
        .get_key_value(exact.as_str())
        .or_else(|| {
            responses
                .iter()
                .find(|(pattern, _)| pattern.eq_ignore_ascii_case(&range))
        })
        .or_else(|| responses.get_key_value("default"))
        .map(|(pattern, spec)| (pattern.as_str(), spec))
}

fn header_values<'a>(headers: &'a [(String, String)], name: &str) -> Vec<&'a str> {
    headers
        .iter()
        .filter(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
        .collect()
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

fn decode_lossy(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

/// Decodes one `application/x-www-form-urlencoded` token, `+` read as space.
fn decode_query(token: &str) -> String {
    decode_lossy(&token.replace('+', " "))
}

fn form_fields(body: &[u8]) -> Vec<(String, String)> {
    parse_query(&String::from_utf8_lossy(body))
        .into_iter()
        .map(|(key, value)| (decode_query(&key), decode_query(&value)))
        .collect()
}
