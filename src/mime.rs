//! Content-type classification.
//!
//! Every predicate ignores media-type parameters (`; charset=utf-8`) and
//! compares case-insensitively. Unrecognized input is simply `false`.

const JSON_TYPES: &[&str] = &[
    "application/json",
    "application/x-json",
    "text/json",
    "text/x-json",
];

const XML_TYPES: &[&str] = &[
    "application/xml",
    "application/xml-external-parsed-entity",
    "application/xml-dtd",
    "text/xml",
    "text/xml-external-parsed-entity",
];

const MULTIPART_TYPES: &[&str] = &[
    "multipart/mixed",
    "multipart/related",
    "multipart/form-data",
    "multipart/alternative",
];

fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// `application/json`, its `x-json`/`text/json` aliases, or any `+json` suffix.
#[must_use]
pub fn is_json_like(content_type: &str) -> bool {
    let mime = essence(content_type);
    JSON_TYPES.contains(&mime.as_str()) || mime.ends_with("+json")
}

/// `application/xml` and friends, or any `+xml` suffix.
#[must_use]
pub fn is_xml_like(content_type: &str) -> bool {
    let mime = essence(content_type);
    XML_TYPES.contains(&mime.as_str()) || mime.ends_with("+xml")
}

#[must_use]
pub fn is_form_urlencoded(content_type: &str) -> bool {
    essence(content_type) == "application/x-www-form-urlencoded"
}

#[must_use]
pub fn is_multipart(content_type: &str) -> bool {
    MULTIPART_TYPES.contains(&essence(content_type).as_str())
}

#[must_use]
pub fn is_wildcard(content_type: &str) -> bool {
    essence(content_type) == "*/*"
}
