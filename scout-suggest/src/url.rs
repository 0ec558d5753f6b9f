//! Normalisation of typed request URLs into cache keys.
//!
//! Both functions are pure. [`sanitize`] turns whatever the user typed into a
//! signature that is stable across concrete identifiers, and [`parse`] splits
//! a signature into the API version and the request path.

use regex::Regex;

lazy_static! {
    /// A GUID, such as a user or group object id.
    static ref GUID: Regex =
        Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
            .expect("GUID pattern is valid");
}

/// Placeholder substituted for identifier segments.
pub const ID_PLACEHOLDER: &str = "{id}";

/// The pieces of a sanitized request URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    /// The request path without the version, and without leading or trailing
    /// slashes.
    pub request_url: String,

    /// The API version named in the URL, if any.
    pub query_version: Option<String>,
}

/// Normalise a raw URL into a signature suitable for comparing cache keys.
///
/// The scheme and host are removed, the query string and fragment are
/// dropped, and path segments that identify a specific resource are replaced
/// by `{id}`. A trailing slash is kept.
pub fn sanitize(raw: &str) -> String {
    let path = strip_origin(raw.trim());
    let path = path.split(|c: char| c == '?' || c == '#').next().unwrap_or("");

    path.split('/')
        .map(sanitize_segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// Split a signature produced by [`sanitize`] into its version and path.
///
/// The first segment is taken as the version only if it is one of
/// `known_versions` (compared case-insensitively), in which case the version
/// is reported as spelled in `known_versions`.
pub fn parse<S: AsRef<str>>(signature: &str, known_versions: &[S]) -> ParsedUrl {
    let path = signature.split('?').next().unwrap_or("");
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let query_version = segments.first().and_then(|first| {
        known_versions
            .iter()
            .map(|version| version.as_ref())
            .find(|version| version.eq_ignore_ascii_case(first))
            .map(|version| version.to_string())
    });
    if query_version.is_some() {
        segments.remove(0);
    }

    ParsedUrl {
        request_url: segments.join("/"),
        query_version,
    }
}

/// Drop `scheme://host` from the front of `raw`, if present.
fn strip_origin(raw: &str) -> &str {
    match raw.find("://") {
        Some(idx) => {
            let rest = &raw[idx + 3..];
            rest.find('/').map_or("", |slash| &rest[slash..])
        }
        None => raw,
    }
}

/// Replace a segment by the id placeholder if it names a concrete resource.
fn sanitize_segment(segment: &str) -> String {
    if is_identifier(segment) {
        return ID_PLACEHOLDER.to_string();
    }

    // Key and function call syntax, like `users('abc')` or `range(address='A1')`.
    if let (Some(open), true) = (segment.find('('), segment.ends_with(')')) {
        let inner = &segment[open + 1..segment.len() - 1];
        if !inner.is_empty() {
            return format!("{}({})", &segment[..open], ID_PLACEHOLDER);
        }
    }

    segment.to_string()
}

/// Whether `segment` looks like a resource identifier rather than a path
/// keyword.
fn is_identifier(segment: &str) -> bool {
    if segment.is_empty() {
        return false;
    }

    let quoted = segment.len() >= 2
        && ((segment.starts_with('\'') && segment.ends_with('\''))
            || (segment.starts_with('"') && segment.ends_with('"')));

    GUID.is_match(segment)
        || segment.chars().all(|c| c.is_ascii_digit())
        || segment.contains('@')
        || quoted
}
