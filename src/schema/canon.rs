//! The schema this application expects and the rules for comparing it with
//! the schema reported by Dgraph.

use std::sync::LazyLock;

use regex::Regex;

use super::{InvalidReason, SchemaError};


/// The GraphQL schema of all types this application stores in Dgraph.
pub(crate) const CANON: &str = include_str!("schema.graphql");

/// The serialized response of the schema query starts with this, followed by
/// the (JSON escaped) schema document and `"}}`. This is tied to the exact
/// serialization `Synchronizer::retrieve` produces and has to be adjusted if
/// Dgraph ever changes the shape of that response.
pub(crate) const ENVELOPE_PREFIX: &str = r#"{"getGQLSchema":{"schema":""#;

/// Serialized responses of the schema query when no schema is installed.
pub(crate) const NO_SCHEMA_ENVELOPES: &[&str] = &[
    r#"{"getGQLSchema":null}"#,
    r#"{"getGQLSchema":{"schema":""}}"#,
];

/// Reduces a schema document to the sequence of its ASCII letters and digits,
/// in order. Escaped newlines and tabs (`\n`, `\t` as two characters, as they
/// appear in JSON strings) are dropped first so that their letters do not end
/// up in the result.
///
/// Two documents that only differ in whitespace, punctuation or indentation
/// canonicalize to the same string. Renaming, adding, removing or reordering
/// any identifier changes the result.
pub(crate) fn canonicalize(text: &str) -> String {
    static NON_ALPHANUMERIC: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new("[^a-zA-Z0-9]+").expect("invalid regex")
    });

    let text = text.replace(r"\n", "").replace(r"\t", "");
    NON_ALPHANUMERIC.replace_all(&text, "").into_owned()
}

/// Compares the serialized schema query response `live` with the `expected`
/// document.
///
/// Returns `Ok(())` if they match, `Err(NoSchema)` if Dgraph has no schema,
/// and `Err(Invalid(_))` otherwise.
pub(crate) fn classify(expected: &str, live: &str) -> Result<(), SchemaError> {
    if NO_SCHEMA_ENVELOPES.contains(&live) {
        return Err(SchemaError::NoSchema);
    }

    if live.len() < ENVELOPE_PREFIX.len() {
        return Err(SchemaError::Invalid(InvalidReason::TooShort));
    }

    // Slicing bytes since the prefix length is not necessarily a char boundary
    // in arbitrary input. Anything non-ASCII is dropped by `canonicalize` anyway.
    let body = String::from_utf8_lossy(&live.as_bytes()[ENVELOPE_PREFIX.len()..]);
    if canonicalize(expected) != canonicalize(&body) {
        return Err(SchemaError::Invalid(InvalidReason::Mismatch));
    }

    Ok(())
}
