#![deny(missing_docs)]

//! # Path Templates
//!
//! Parses `/users/{id}/posts` style templates into segments and matches concrete
//! paths against them.

use crate::error::{AppError, AppResult};
use indexmap::IndexMap;

/// One `/`-separated piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSegment {
    /// Must equal the concrete segment exactly.
    Literal(String),
    /// Binds a non-empty run of the concrete segment.
    ///
    /// `prefix`/`suffix` hold literal text around the placeholder, e.g.
    /// `{name}.json` has suffix `.json`.
    Placeholder {
        /// Placeholder name.
        name: String,
        /// Literal text before the placeholder.
        prefix: String,
        /// Literal text after the placeholder.
        suffix: String,
    },
}

impl TemplateSegment {
    fn parse(raw: &str, template: &str) -> AppResult<Self> {
        let Some(open) = raw.find('{') else {
            if raw.contains('}') {
                return Err(malformed(template, "unbalanced '}'"));
            }
            return Ok(Self::Literal(raw.to_string()));
        };
        let close = raw[open..]
            .find('}')
            .map(|i| open + i)
            .ok_or_else(|| malformed(template, "unclosed '{'"))?;

        let name = &raw[open + 1..close];
        let prefix = &raw[..open];
        let suffix = &raw[close + 1..];
        if name.is_empty() {
            return Err(malformed(template, "empty placeholder name"));
        }
        if suffix.contains(['{', '}']) || prefix.contains('}') {
            return Err(malformed(
                template,
                "only one placeholder is allowed per segment",
            ));
        }

        Ok(Self::Placeholder {
            name: name.to_string(),
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// Returns the bound text when `concrete` matches this segment.
    fn bind<'p>(&self, concrete: &'p str) -> Option<&'p str> {
        match self {
            Self::Literal(lit) => (lit == concrete).then_some(""),
            Self::Placeholder { prefix, suffix, .. } => {
                let inner = concrete.strip_prefix(prefix.as_str())?;
                let inner = inner.strip_suffix(suffix.as_str())?;
                (!inner.is_empty()).then_some(inner)
            }
        }
    }

    /// Whether some concrete segment can match both `self` and `other`.
    fn compatible(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Literal(lit), placeholder @ Self::Placeholder { .. })
            | (placeholder @ Self::Placeholder { .. }, Self::Literal(lit)) => {
                placeholder.bind(lit).is_some()
            }
            (
                Self::Placeholder {
                    prefix: p1,
                    suffix: s1,
                    ..
                },
                Self::Placeholder {
                    prefix: p2,
                    suffix: s2,
                    ..
                },
            ) => {
                (p1.starts_with(p2.as_str()) || p2.starts_with(p1.as_str()))
                    && (s1.ends_with(s2.as_str()) || s2.ends_with(s1.as_str()))
            }
        }
    }
}

fn malformed(template: &str, reason: &str) -> AppError {
    AppError::Document(format!("Malformed path template '{}': {}", template, reason))
}

/// Splits a path into segments, ignoring any query string.
pub(crate) fn split_path(path: &str) -> Vec<&str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.strip_prefix('/').unwrap_or(path).split('/').collect()
}

/// A parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    segments: Vec<TemplateSegment>,
}

impl PathTemplate {
    /// Parses a template. It must start with `/`.
    pub fn parse(source: &str) -> AppResult<Self> {
        if !source.starts_with('/') {
            return Err(malformed(source, "must start with '/'"));
        }
        let segments = split_path(source)
            .into_iter()
            .map(|raw| TemplateSegment::parse(raw, source))
            .collect::<AppResult<Vec<_>>>()?;

        let mut seen = std::collections::HashSet::new();
        for segment in &segments {
            if let TemplateSegment::Placeholder { name, .. } = segment {
                if !seen.insert(name.as_str()) {
                    return Err(malformed(source, &format!("placeholder '{}' repeats", name)));
                }
            }
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The template as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Parsed segments.
    pub fn segments(&self) -> &[TemplateSegment] {
        &self.segments
    }

    /// Placeholder names in order.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            TemplateSegment::Placeholder { name, .. } => Some(name.as_str()),
            TemplateSegment::Literal(_) => None,
        })
    }

    /// Number of placeholder segments. Fewer means more specific.
    pub fn placeholder_count(&self) -> usize {
        self.placeholders().count()
    }

    /// Matches a concrete path, returning the raw placeholder bindings.
    pub fn matches(&self, path: &str) -> Option<IndexMap<String, String>> {
        self.match_segments(&split_path(path))
    }

    pub(crate) fn match_segments(&self, concrete: &[&str]) -> Option<IndexMap<String, String>> {
        if concrete.len() != self.segments.len() {
            return None;
        }
        let mut bindings = IndexMap::new();
        for (segment, actual) in self.segments.iter().zip(concrete) {
            let bound = segment.bind(actual)?;
            if let TemplateSegment::Placeholder { name, .. } = segment {
                bindings.insert(name.clone(), bound.to_string());
            }
        }
        Some(bindings)
    }

    /// Whether some concrete path matches both templates with equal specificity.
    ///
    /// Such a pair can never be resolved deterministically.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len()
            && self.placeholder_count() == other.placeholder_count()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.compatible(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segments() {
        let t = PathTemplate::parse("/users/{id}/files/{name}.json").unwrap();
        assert_eq!(t.segments().len(), 4);
        assert_eq!(t.placeholders().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(
            t.segments()[3],
            TemplateSegment::Placeholder {
                name: "name".into(),
                prefix: String::new(),
                suffix: ".json".into()
            }
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(PathTemplate::parse("users").is_err());
        assert!(PathTemplate::parse("/users/{id").is_err());
        assert!(PathTemplate::parse("/users/{}").is_err());
        assert!(PathTemplate::parse("/a/{x}{y}").is_err());
        assert!(PathTemplate::parse("/a/{x}/b/{x}").is_err());
    }

    #[test]
    fn test_matches_binds_raw_segments() {
        let t = PathTemplate::parse("/users/{id}/posts/{post}").unwrap();
        let bindings = t.matches("/users/42/posts/a%20b").unwrap();
        assert_eq!(bindings["id"], "42");
        assert_eq!(bindings["post"], "a%20b");
    }

    #[test]
    fn test_matches_requires_equal_length_and_literals() {
        let t = PathTemplate::parse("/users/{id}").unwrap();
        assert!(t.matches("/users").is_none());
        assert!(t.matches("/users/1/posts").is_none());
        assert!(t.matches("/people/1").is_none());
        assert!(t.matches("/users/").is_none());
    }

    #[test]
    fn test_matches_ignores_query_string() {
        let t = PathTemplate::parse("/search").unwrap();
        assert!(t.matches("/search?q=rust").is_some());
    }

    #[test]
    fn test_matches_prefix_suffix() {
        let t = PathTemplate::parse("/files/{name}.json").unwrap();
        assert_eq!(t.matches("/files/report.json").unwrap()["name"], "report");
        assert!(t.matches("/files/.json").is_none());
        assert!(t.matches("/files/report.xml").is_none());
    }

    #[test]
    fn test_overlaps() {
        let id = PathTemplate::parse("/users/{id}").unwrap();
        let name = PathTemplate::parse("/users/{name}").unwrap();
        let me = PathTemplate::parse("/users/me").unwrap();
        let json = PathTemplate::parse("/users/{id}.json").unwrap();
        let xml = PathTemplate::parse("/users/{id}.xml").unwrap();
        let crossed_a = PathTemplate::parse("/{kind}/me").unwrap();
        let crossed_b = PathTemplate::parse("/users/{who}").unwrap();

        assert!(id.overlaps(&name));
        assert!(!id.overlaps(&me));
        assert!(!json.overlaps(&xml));
        assert!(id.overlaps(&json));
        assert!(crossed_a.overlaps(&crossed_b));
    }
}
