//! # Formats
//!
//! Semantic checks behind the `format` keyword. Unknown formats pass.

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::Value;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::OnceLock;
use url::Url;

/// Outcome of a format check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FormatCheck {
    /// The value satisfies the format.
    Valid,
    /// The value violates the format.
    Invalid,
    /// The format is unknown or does not apply to the value's type.
    Skipped,
}

impl From<bool> for FormatCheck {
    fn from(valid: bool) -> Self {
        if valid {
            Self::Valid
        } else {
            Self::Invalid
        }
    }
}

pub(crate) fn check_format(format: &str, value: &Value) -> FormatCheck {
    match value {
        Value::String(s) => check_string_format(format, s),
        Value::Number(n) => match format {
            "int32" => n
                .as_i64()
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| crate::document::schema::is_whole(*f) && f.abs() < 1e15)
                        .map(|f| f as i64)
                })
                .is_some_and(|i| i32::try_from(i).is_ok())
                .into(),
            "int64" => (n.is_i64() || n.as_u64().is_some_and(|u| i64::try_from(u).is_ok())).into(),
            _ => FormatCheck::Skipped,
        },
        _ => FormatCheck::Skipped,
    }
}

pub(crate) fn is_known(format: &str) -> bool {
    matches!(
        format,
        "date-time"
            | "date"
            | "email"
            | "uuid"
            | "uri"
            | "ipv4"
            | "ipv6"
            | "hostname"
            | "byte"
            | "int32"
            | "int64"
            | "float"
            | "double"
            | "binary"
            | "password"
    )
}

fn check_string_format(format: &str, s: &str) -> FormatCheck {
    match format {
        "date-time" => DateTime::parse_from_rfc3339(s).is_ok().into(),
        "date" => is_full_date(s).into(),
        "email" => is_valid_email(s).into(),
        "uuid" => uuid::Uuid::try_parse(s).is_ok().into(),
        "uri" => Url::parse(s).is_ok().into(),
        "ipv4" => s.parse::<Ipv4Addr>().is_ok().into(),
        "ipv6" => s.parse::<Ipv6Addr>().is_ok().into(),
        "hostname" => is_hostname(s).into(),
        "byte" => is_base64(s).into(),
        _ => FormatCheck::Skipped,
    }
}

fn is_full_date(s: &str) -> bool {
    s.len() == 10 && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn is_valid_email(value: &str) -> bool {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !local.contains('@')
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn is_hostname(s: &str) -> bool {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    let label = LABEL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("static regex")
    });
    let trimmed = s.strip_suffix('.').unwrap_or(s);
    !trimmed.is_empty() && trimmed.len() <= 253 && trimmed.split('.').all(|l| label.is_match(l))
}

fn is_base64(s: &str) -> bool {
    static BASE64: OnceLock<Regex> = OnceLock::new();
    let re = BASE64.get_or_init(|| {
        Regex::new(r"^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=)?$")
            .expect("static regex")
    });
    re.is_match(s)
}
