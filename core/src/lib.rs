#![deny(missing_docs)]

//! # OAS Conform Core
//!
//! Checks captured HTTP exchanges against an OpenAPI 3.0 document.
//!
//! ```no_run
//! use oas_conform_core::{
//!     load_document, CheckOptions, ConformanceChecker, ExchangeRequest, Method,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let document = load_document(&std::fs::read_to_string("openapi.yaml")?)?;
//! let checker = ConformanceChecker::new(&document);
//! let request = ExchangeRequest::new(Method::Get, "/users/42?verbose=true");
//! let report = checker.check_request(&request, &CheckOptions::default())?;
//! if !report.is_empty() {
//!     eprintln!("{}", report.describe());
//! }
//! # Ok(())
//! # }
//! ```

/// Shared error types.
pub mod error;

/// The sealed OpenAPI document model and its loader.
pub mod document;

/// Path template matching.
pub mod routing;

/// Parameter style decoding.
pub mod params;

/// Schema validation.
pub mod validation;

/// Findings and reports.
pub mod report;

/// Request/response orchestration.
pub mod checker;

mod media;

pub use checker::{CheckOptions, ConformanceChecker, ExchangeRequest, ExchangeResponse};
pub use document::{
    load_document, AdditionalProperties, Components, Method, Operation, ParamLocation, ParamStyle,
    ParameterSpec, RequestBodySpec, ResponseSpec, SchemaDocument, SchemaDocumentBuilder,
    SchemaNode, SchemaType,
};
pub use error::{AppError, AppResult, NoMatchError, ParameterEncodingError};
pub use params::{ParameterCoercer, RawValue};
pub use report::{Location, Rule, Segment, ValidationFinding, ValidationReport};
pub use routing::{PathMatcher, PathTemplate, RouteMatch};
pub use validation::{Direction, SchemaValidator};
