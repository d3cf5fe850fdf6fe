//! # Error Handling
//!
//! Provides the `AppError` enum for failures that make a conformance check
//! impossible. Content violations are never errors; they are findings in a
//! [`ValidationReport`](crate::report::ValidationReport).

use crate::document::Method;
use derive_more::{Display, From};

/// The Global Error Enum.
///
/// We use `derive_more` for boilerplate.
/// Note: String errors default to `General`.
#[derive(Debug, Display, From)]
pub enum AppError {
    /// Wrapper for standard IO errors.
    #[display("IO Error: {_0}")]
    Io(std::io::Error),

    /// The document is malformed or inconsistent (dangling `$ref`, illegal
    /// parameter style, ambiguous templates, ...).
    #[from(ignore)]
    #[display("Document Error: {_0}")]
    Document(String),

    /// No operation exists for the concrete request.
    #[display("Route Error: {_0}")]
    NoMatch(NoMatchError),

    /// Two templates matched a concrete path with equal specificity.
    #[from(ignore)]
    #[display("Ambiguous Route: {_0}")]
    AmbiguousRoute(String),

    /// Generic errors.
    #[display("General Error: {_0}")]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AppError {}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;

/// Raised when a concrete request cannot be resolved to an operation.
///
/// The two variants keep "path unknown" apart from "method not allowed on a
/// known path" so a failing test says which half of the route is wrong.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum NoMatchError {
    /// No path template matches the concrete path.
    #[display("no path template matches {method} {path}")]
    UnknownPath {
        /// Request method.
        method: Method,
        /// Concrete request path.
        path: String,
    },
    /// A template matches but declares no operation for the method.
    #[display(
        "{method} is not allowed on {path} (template '{template}' allows {})",
        display_methods(allowed)
    )]
    MethodNotAllowed {
        /// Request method.
        method: Method,
        /// Concrete request path.
        path: String,
        /// The template that matched.
        template: String,
        /// Methods the template does declare.
        allowed: Vec<Method>,
    },
}

impl std::error::Error for NoMatchError {}

fn display_methods(methods: &[Method]) -> String {
    methods
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A raw parameter value that cannot be decoded under its declared style.
///
/// Never fatal: the checker records it as a finding and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("Parameter '{parameter}' is not encoded correctly: {reason}")]
pub struct ParameterEncodingError {
    /// Parameter name.
    pub parameter: String,
    /// What went wrong.
    pub reason: String,
}

impl ParameterEncodingError {
    /// Creates a new encoding error for `parameter`.
    pub fn new(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

impl std::error::Error for ParameterEncodingError {}
