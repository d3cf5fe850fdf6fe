#![deny(missing_docs)]

//! # Check Command
//!
//! Checks one recorded exchange file against an OpenAPI document.
//!
//! The exchange file is JSON:
//!
//! ```json
//! {
//!   "request": {
//!     "method": "POST", "path": "/api/users/7", "query": {}, "headers": {}, "body": {}
//!   },
//!   "response": { "status": 201, "headers": {}, "body": {} }
//! }
//! ```
//!
//! `query` and `headers` map names to a string or a list of strings. A string
//! `body` sent with a non-JSON `Content-Type` is passed through as text; any
//! other body is serialized as JSON.

use std::fs;
use std::path::PathBuf;

use oas_conform_core::{
    load_document, CheckOptions, ConformanceChecker, ExchangeRequest, ExchangeResponse, Method,
    ValidationReport,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{CliError, CliResult};

/// Arguments for the check command.
#[derive(clap::Args, Debug, Clone)]
pub struct CheckArgs {
    /// Path to the OpenAPI document (YAML or JSON).
    #[clap(long, env = "OAS_CONFORM_SPEC")]
    pub spec: PathBuf,

    /// Path to the recorded exchange (JSON).
    #[clap(long)]
    pub exchange: PathBuf,

    /// Routing prefix to strip from the request path (e.g. `/api/v1`).
    #[clap(long)]
    pub prefix: Option<String>,

    /// Skip parameter and request body checks.
    #[clap(long)]
    pub skip_request: bool,

    /// Skip response status, header and body checks.
    #[clap(long)]
    pub skip_response: bool,

    /// Print findings as JSON instead of text.
    #[clap(long)]
    pub json: bool,
}

impl CheckArgs {
    fn options(&self) -> CheckOptions {
        CheckOptions {
            validate_parameters: !self.skip_request,
            validate_request_body: !self.skip_request,
            validate_response_body: !self.skip_response,
            validate_response_headers: !self.skip_response,
            ..CheckOptions::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExchangeFile {
    request: RequestFile,
    response: Option<ResponseFile>,
}

#[derive(Debug, Deserialize)]
struct RequestFile {
    method: String,
    path: String,
    #[serde(default)]
    query: Map<String, Value>,
    #[serde(default)]
    headers: Map<String, Value>,
    body: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ResponseFile {
    status: u16,
    #[serde(default)]
    headers: Map<String, Value>,
    body: Option<Value>,
}

/// Runs the check and returns its findings.
///
/// # Arguments
///
/// * `args` - Command arguments.
pub fn execute(args: &CheckArgs) -> CliResult<ValidationReport> {
    let source = fs::read_to_string(&args.spec)
        .map_err(|e| CliError::General(format!("Failed to read {:?}: {}", args.spec, e)))?;
    let document = load_document(&source)?;

    let exchange: ExchangeFile = serde_json::from_str(&fs::read_to_string(&args.exchange)?)?;
    let request = build_request(exchange.request, args.prefix.as_deref())?;
    debug!(method = %request.method, path = %request.path, "checking exchange");

    let checker = ConformanceChecker::new(&document);
    let options = args.options();
    let report = match exchange.response {
        Some(response) => checker.check_exchange(&request, &build_response(response), &options)?,
        None => checker.check_request(&request, &options)?,
    };
    Ok(report)
}

/// Renders the report for the terminal.
pub fn render(report: &ValidationReport, json: bool) -> CliResult<String> {
    if json {
        return Ok(serde_json::to_string_pretty(report)?);
    }
    Ok(report.describe())
}

fn build_request(file: RequestFile, prefix: Option<&str>) -> CliResult<ExchangeRequest> {
    let method: Method = file.method.parse()?;
    let path = strip_prefix(&file.path, prefix)?;

    let mut request = ExchangeRequest::new(method, path);
    for (name, value) in &file.query {
        for value in values(value) {
            request = request.with_query(name.clone(), value);
        }
    }
    for (name, value) in &file.headers {
        for value in values(value) {
            request = request.with_header(name.clone(), value);
        }
    }
    if let Some(body) = file.body {
        let (headers, bytes) = body_bytes(request.headers, &body);
        request.headers = headers;
        request.body = Some(bytes);
    }
    Ok(request)
}

fn build_response(file: ResponseFile) -> ExchangeResponse {
    let mut response = ExchangeResponse::new(file.status);
    for (name, value) in &file.headers {
        for value in values(value) {
            response = response.with_header(name.clone(), value);
        }
    }
    if let Some(body) = file.body {
        let (headers, bytes) = body_bytes(response.headers, &body);
        response.headers = headers;
        response.body = Some(bytes);
    }
    response
}

/// Removes the literal `prefix`; a path outside the prefix is an error.
fn strip_prefix(path: &str, prefix: Option<&str>) -> CliResult<String> {
    let Some(prefix) = prefix.filter(|p| !p.is_empty()) else {
        return Ok(path.to_string());
    };
    let rest = path.strip_prefix(prefix).ok_or_else(|| {
        CliError::General(format!(
            "Path '{}' does not start with prefix '{}'",
            path, prefix
        ))
    })?;
    if rest.is_empty() || rest.starts_with('?') {
        return Ok(format!("/{}", rest));
    }
    Ok(rest.to_string())
}

fn values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().flat_map(values).collect(),
        Value::String(s) => vec![s.clone()],
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

/// Serializes a recorded body, defaulting `Content-Type` to JSON.
fn body_bytes(
    mut headers: Vec<(String, String)>,
    body: &Value,
) -> (Vec<(String, String)>, Vec<u8>) {
    let content_type = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
        .map(|(_, value)| value.to_ascii_lowercase());
    let bytes = match (body, content_type.as_deref()) {
        (Value::String(text), Some(ct)) if !ct.contains("json") => text.clone().into_bytes(),
        _ => body.to_string().into_bytes(),
    };
    if content_type.is_none() {
        headers.push(("Content-Type".to_string(), "application/json".to_string()));
    }
    (headers, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SPEC: &str = r#"
openapi: 3.0.3
info: {title: T, version: "1"}
paths:
  /users/{id}:
    post:
      parameters:
        - name: id
          in: path
          required: true
          schema: {type: integer}
      requestBody:
        required: true
        content:
          application/json:
            schema:
              type: object
              required: [name]
              properties:
                name: {type: string}
      responses:
        "201":
          description: created
          content:
            application/json:
              schema:
                type: object
                properties:
                  id: {type: integer}
"#;

    fn args(dir: &std::path::Path, exchange: &str, prefix: Option<&str>) -> CheckArgs {
        let spec = dir.join("openapi.yaml");
        let exchange_path = dir.join("exchange.json");
        fs::write(&spec, SPEC).unwrap();
        fs::write(&exchange_path, exchange).unwrap();
        CheckArgs {
            spec,
            exchange: exchange_path,
            prefix: prefix.map(str::to_string),
            skip_request: false,
            skip_response: false,
            json: false,
        }
    }

    #[test]
    fn test_execute_conforming_exchange() {
        let dir = tempdir().unwrap();
        let exchange = r#"{
            "request": {"method": "POST", "path": "/api/users/7", "body": {"name": "Ada"}},
            "response": {"status": 201, "body": {"id": 7}}
        }"#;
        let report = execute(&args(dir.path(), exchange, Some("/api"))).unwrap();
        assert!(report.is_empty(), "{}", report.describe());
    }

    #[test]
    fn test_execute_reports_findings() {
        let dir = tempdir().unwrap();
        let exchange = r#"{
            "request": {"method": "post", "path": "/users/7", "body": {}},
            "response": {"status": 201, "body": {"id": "7"}}
        }"#;
        let report = execute(&args(dir.path(), exchange, None)).unwrap();
        assert_eq!(
            report.describe(),
            "requestBody.name: Required property 'name' must be present in the object\n\
             responseBody.id: Expected integer, got string"
        );
    }

    #[test]
    fn test_skip_flags() {
        let dir = tempdir().unwrap();
        let exchange = r#"{
            "request": {"method": "POST", "path": "/users/7", "body": {}},
            "response": {"status": 500}
        }"#;
        let mut args = args(dir.path(), exchange, None);
        args.skip_request = true;
        args.skip_response = true;
        assert!(execute(&args).unwrap().is_empty());
    }

    #[test]
    fn test_path_outside_prefix_is_an_error() {
        let dir = tempdir().unwrap();
        let exchange = r#"{"request": {"method": "POST", "path": "/users/7"}}"#;
        let err = execute(&args(dir.path(), exchange, Some("/api"))).unwrap_err();
        assert!(err.to_string().contains("does not start with prefix '/api'"));
    }

    #[test]
    fn test_unknown_route_is_an_error() {
        let dir = tempdir().unwrap();
        let exchange = r#"{"request": {"method": "GET", "path": "/orders"}}"#;
        let err = execute(&args(dir.path(), exchange, None)).unwrap_err();
        assert!(matches!(err, CliError::Core(_)));
    }

    #[test]
    fn test_strip_prefix_keeps_root() {
        assert_eq!(strip_prefix("/api", Some("/api")).unwrap(), "/");
        assert_eq!(strip_prefix("/api?x=1", Some("/api")).unwrap(), "/?x=1");
        assert_eq!(strip_prefix("/api/a", Some("")).unwrap(), "/api/a");
    }

    #[test]
    fn test_text_body_passes_through() {
        let headers = vec![("Content-Type".to_string(), "text/plain".to_string())];
        let (_, bytes) = body_bytes(headers, &Value::from("hello"));
        assert_eq!(bytes, b"hello".to_vec());

        let (headers, bytes) = body_bytes(Vec::new(), &Value::from("hello"));
        assert_eq!(bytes, b"\"hello\"".to_vec());
        assert_eq!(headers[0].1, "application/json");
    }

    #[test]
    fn test_render_json() {
        let dir = tempdir().unwrap();
        let exchange = r#"{"request": {"method": "POST", "path": "/users/7", "body": {}}}"#;
        let report = execute(&args(dir.path(), exchange, None)).unwrap();
        let rendered: Value = serde_json::from_str(&render(&report, true).unwrap()).unwrap();
        assert_eq!(rendered[0]["rule"], "MissingRequired");
        assert_eq!(rendered[0]["location"], "requestBody.name");
    }
}
