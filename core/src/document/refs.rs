#![deny(missing_docs)]

//! # Reference Utilities
//!
//! Helpers for local `$ref` pointers of the form `#/components/{section}/{name}`.
//!
//! Documents are loaded in isolation: references into other documents are
//! reported, never fetched.

use crate::error::{AppError, AppResult};
use percent_encoding::percent_decode_str;

/// Component sections a `$ref` may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Section {
    Schemas,
    Parameters,
    RequestBodies,
    Responses,
    Headers,
}

impl Section {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Schemas => "schemas",
            Self::Parameters => "parameters",
            Self::RequestBodies => "requestBodies",
            Self::Responses => "responses",
            Self::Headers => "headers",
        }
    }
}

/// Extracts the component name from `#/components/{section}/{name}`.
///
/// Remote references and references into another section are document errors.
pub(crate) fn component_name(ref_str: &str, section: Section) -> AppResult<String> {
    let Some(pointer) = ref_str.strip_prefix("#/") else {
        return Err(AppError::Document(format!(
            "Reference '{}' is not local to this document",
            ref_str
        )));
    };

    let segments: Vec<&str> = pointer.split('/').collect();
    match segments.as_slice() {
        ["components", found, name] if *found == section.as_str() => {
            let name = decode_pointer_segment(name);
            if name.is_empty() {
                return Err(AppError::Document(format!(
                    "Reference '{}' has an empty component name",
                    ref_str
                )));
            }
            Ok(name)
        }
        _ => Err(AppError::Document(format!(
            "Reference '{}' must point into '#/components/{}'",
            ref_str,
            section.as_str()
        ))),
    }
}

/// Decodes a JSON Pointer segment (`~1`, `~0`, then percent-escapes).
pub(crate) fn decode_pointer_segment(segment: &str) -> String {
    let decoded = segment.replace("~1", "/").replace("~0", "~");
    percent_decode_str(&decoded).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_name_local() {
        assert_eq!(
            component_name("#/components/schemas/User", Section::Schemas).unwrap(),
            "User"
        );
        assert_eq!(
            component_name("#/components/requestBodies/NewUser", Section::RequestBodies).unwrap(),
            "NewUser"
        );
    }

    #[test]
    fn test_component_name_wrong_section() {
        let err = component_name("#/components/schemas/User", Section::Parameters).unwrap_err();
        assert!(err.to_string().contains("#/components/parameters"));
    }

    #[test]
    fn test_component_name_rejects_remote() {
        let err = component_name("other.yaml#/components/schemas/User", Section::Schemas)
            .unwrap_err();
        assert!(err.to_string().contains("not local"));
    }

    #[test]
    fn test_decode_pointer_segment() {
        assert_eq!(decode_pointer_segment("a~1b~0c"), "a/b~c");
        assert_eq!(decode_pointer_segment("User%20Profile"), "User Profile");
    }
}
