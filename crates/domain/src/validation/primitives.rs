//! Format primitives for CloudEvents envelope attributes.
//!
//! Pure predicate functions; the schema layer turns failures into issues.

use chrono::DateTime;

/// RFC 2046 top-level media types, discrete and composite.
const TOP_LEVEL_MEDIA_TYPES: &[&str] = &[
    "text",
    "image",
    "audio",
    "video",
    "application",
    "message",
    "multipart",
];

/// RFC 3986 §4.1 URI-reference: an absolute URI or a relative reference.
///
/// Relative references must not look like they start with a scheme, which
/// is exactly the case where the string has a `:` before any `/`, `?` or
/// `#`; such strings must then parse as absolute URIs.
pub fn is_uri_reference(value: &str) -> bool {
    if value.is_empty() || has_forbidden_chars(value) {
        return false;
    }
    match scheme_candidate(value) {
        Some(_) => is_absolute_uri(value),
        None => true,
    }
}

/// RFC 3986 absolute URI: `scheme ":" hier-part [...]` with a valid scheme.
pub fn is_absolute_uri(value: &str) -> bool {
    if value.is_empty() || has_forbidden_chars(value) {
        return false;
    }
    let Some(scheme) = scheme_candidate(value) else {
        return false;
    };
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// RFC 3339 timestamp with date, time, and offset; invalid calendar dates
/// (e.g. February 30th) are rejected by the parse.
pub fn is_rfc3339_datetime(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
}

/// RFC 2046 media type: `type/subtype` with optional `; key=value`
/// parameters. The top-level type must be one of the discrete/composite
/// types or an `x-` extension token.
pub fn is_media_type(value: &str) -> bool {
    let mut parts = value.split(';');
    let Some(essence) = parts.next() else {
        return false;
    };
    let Some((main, sub)) = essence.trim().split_once('/') else {
        return false;
    };

    let main = main.to_ascii_lowercase();
    let main_ok = TOP_LEVEL_MEDIA_TYPES.contains(&main.as_str())
        || (main.starts_with("x-") && is_token(&main["x-".len()..]));
    if !main_ok || !is_token(sub) {
        return false;
    }

    parts.all(|param| {
        matches!(
            param.trim().split_once('='),
            Some((key, val)) if is_token(key) && !val.is_empty()
        )
    })
}

/// The part before the first `:`, if that `:` comes before any `/`, `?`
/// or `#`. This is the only position where a scheme can legally sit.
fn scheme_candidate(value: &str) -> Option<&str> {
    let colon = value.find(':')?;
    match value.find(['/', '?', '#']) {
        Some(stop) if stop < colon => None,
        _ => Some(&value[..colon]),
    }
}

fn has_forbidden_chars(value: &str) -> bool {
    value.chars().any(|c| c.is_whitespace() || c.is_control())
}

/// RFC 2045 token: printable ASCII minus tspecials.
fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '.' | '^' | '_' | '`' | '|' | '~')
        })
}
