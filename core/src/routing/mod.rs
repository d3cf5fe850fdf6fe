#![deny(missing_docs)]

//! # Request Routing
//!
//! Resolves a concrete request path and method to the declared [`Operation`].

mod template;

pub use template::{PathTemplate, TemplateSegment};

use crate::document::{Method, Operation, PathEntry, SchemaDocument};
use crate::error::{AppError, AppResult, NoMatchError};
use indexmap::IndexMap;
use tracing::debug;

/// A resolved operation and the raw values bound to its placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch<'d> {
    /// The matched operation.
    pub operation: &'d Operation,
    /// Placeholder name to raw (still percent-encoded) segment.
    pub bindings: IndexMap<String, String>,
}

/// Maps concrete paths to path templates.
///
/// When several templates match, the one with the fewest placeholders wins.
/// A tie is reported as [`AppError::AmbiguousRoute`]; documents built through
/// [`SchemaDocumentBuilder`](crate::document::SchemaDocumentBuilder) already
/// reject such pairs.
#[derive(Debug, Clone, Copy)]
pub struct PathMatcher<'d> {
    document: &'d SchemaDocument,
}

impl<'d> PathMatcher<'d> {
    /// Creates a matcher over a sealed document.
    pub fn new(document: &'d SchemaDocument) -> Self {
        Self { document }
    }

    /// Resolves `path` and `method` to an operation.
    pub fn resolve(&self, path: &str, method: Method) -> AppResult<RouteMatch<'d>> {
        let (entry, bindings) = self.best_template(path, method)?;

        let Some(operation) = entry.operation(method) else {
            return Err(NoMatchError::MethodNotAllowed {
                method,
                path: path.to_string(),
                template: entry.template().as_str().to_string(),
                allowed: entry.methods(),
            }
            .into());
        };

        debug!(
            %method,
            path,
            template = entry.template().as_str(),
            "resolved operation"
        );
        Ok(RouteMatch {
            operation,
            bindings,
        })
    }

    fn best_template(
        &self,
        path: &str,
        method: Method,
    ) -> AppResult<(&'d PathEntry, IndexMap<String, String>)> {
        let concrete = template::split_path(path);
        let mut best: Option<(&'d PathEntry, IndexMap<String, String>)> = None;
        let mut tied: Option<&'d PathEntry> = None;

        for entry in self.document.paths() {
            let Some(bindings) = entry.template().match_segments(&concrete) else {
                continue;
            };
            match &best {
                Some((current, _))
                    if current.template().placeholder_count()
                        < entry.template().placeholder_count() => {}
                Some((current, _))
                    if current.template().placeholder_count()
                        == entry.template().placeholder_count() =>
                {
                    tied = Some(entry);
                }
                _ => {
                    best = Some((entry, bindings));
                    tied = None;
                }
            }
        }

        let Some((entry, bindings)) = best else {
            return Err(NoMatchError::UnknownPath {
                method,
                path: path.to_string(),
            }
            .into());
        };
        if let Some(other) = tied {
            return Err(AppError::AmbiguousRoute(format!(
                "'{}' matches both '{}' and '{}'",
                path,
                entry.template().as_str(),
                other.template().as_str()
            )));
        }
        Ok((entry, bindings))
    }
}
