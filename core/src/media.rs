//! # Media Types
//!
//! Media type matching for `content` maps.

use indexmap::IndexMap;

/// `type/subtype` without parameters, lower-cased.
pub(crate) fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Finds the declared entry for `media_type`: exact, then `type/*`, then `*/*`.
pub(crate) fn lookup<'a, V>(
    content: &'a IndexMap<String, V>,
    media_type: &str,
) -> Option<(&'a str, &'a V)> {
    let wanted = essence(media_type);
    let range = wanted
        .split_once('/')
        .map(|(kind, _)| format!("{}/*", kind))
        .unwrap_or_default();

    let found = [wanted.as_str(), range.as_str(), "*/*"]
        .into_iter()
        .filter(|candidate| !candidate.is_empty())
        .find_map(|candidate| {
            content
                .iter()
                .find(|(declared, _)| essence(declared) == candidate)
                .map(|(declared, value)| (declared.as_str(), value))
        });
    found
}

pub(crate) fn is_json(essence: &str) -> bool {
    essence == "application/json" || essence.ends_with("+json")
}

pub(crate) fn is_form(essence: &str) -> bool {
    essence == "application/x-www-form-urlencoded"
}

pub(crate) fn is_text(essence: &str) -> bool {
    essence.starts_with("text/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> IndexMap<String, u8> {
        let mut content = IndexMap::new();
        content.insert("application/json".to_string(), 1);
        content.insert("text/*".to_string(), 2);
        content.insert("*/*".to_string(), 3);
        content
    }

    #[test]
    fn test_essence_strips_parameters() {
        assert_eq!(essence("Application/JSON; charset=utf-8"), "application/json");
    }

    #[test]
    fn test_lookup_precedence() {
        let content = content();
        assert_eq!(
            lookup(&content, "application/json; charset=utf-8"),
            Some(("application/json", &1))
        );
        assert_eq!(lookup(&content, "text/plain"), Some(("text/*", &2)));
        assert_eq!(lookup(&content, "image/png"), Some(("*/*", &3)));
    }

    #[test]
    fn test_lookup_without_fallback() {
        let mut content = IndexMap::new();
        content.insert("application/json".to_string(), 1);
        assert_eq!(lookup(&content, "application/xml"), None);
    }

    #[test]
    fn test_media_classes() {
        assert!(is_json("application/problem+json"));
        assert!(!is_json("application/xml"));
        assert!(is_form("application/x-www-form-urlencoded"));
        assert!(is_text("text/csv"));
    }
}
