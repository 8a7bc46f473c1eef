//! Validated SQL identifiers.
//!
//! Every schema, table, sequence and index name that reaches a generated
//! statement is an [`Ident`]. The only way to build one is through
//! [`Ident::parse`], which accepts plain identifiers (`[A-Za-z_][A-Za-z0-9_]*`,
//! at most 63 bytes). Configuration loading is the sole producer, so the set of
//! names a run can touch is exactly the set the configuration supplies.

use crate::error::{CoreError, CoreResult};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// PostgreSQL truncates identifiers longer than this.
const MAX_IDENT_LEN: usize = 63;

fn ident_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is a valid regex")
    })
}

/// A plain, validated SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(String);

impl Ident {
    /// Validate `value` as the identifier configured under `key`.
    ///
    /// `key` is only used for error reporting.
    pub fn parse(key: &str, value: &str) -> CoreResult<Self> {
        if value.len() > MAX_IDENT_LEN || !ident_pattern().is_match(value) {
            return Err(CoreError::InvalidIdentifier {
                key: key.to_string(),
                value: value.to_string(),
            });
        }
        Ok(Self(value.to_string()))
    }

    /// Derive a new identifier from validated parts joined by `_`.
    ///
    /// Used for index names such as `sidx_<schema>_<table>_<column>`.
    /// The result is truncated to the PostgreSQL identifier limit.
    pub fn derived(parts: &[&str]) -> CoreResult<Self> {
        let joined = parts.join("_");
        let truncated: String = joined.chars().take(MAX_IDENT_LEN).collect();
        Self::parse("derived identifier", &truncated)
    }

    /// Return the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render the identifier double-quoted for statement text.
    pub fn quoted(&self) -> String {
        quote_ident(&self.0)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A schema-qualified relation name (`schema.name`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    schema: Ident,
    name: Ident,
}

impl QualifiedName {
    /// Combine a schema and a relation name.
    pub fn new(schema: Ident, name: Ident) -> Self {
        Self { schema, name }
    }

    /// Schema part.
    pub fn schema(&self) -> &Ident {
        &self.schema
    }

    /// Relation part.
    pub fn name(&self) -> &Ident {
        &self.name
    }

    /// Render as a single-quoted string literal, for functions that take a
    /// relation name as text (`nextval('...')`).
    pub fn literal(&self) -> String {
        format!("'{}'", escape_sql_string(&self.to_string()))
    }
}

/// Renders `"schema"."name"`.
impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema.quoted(), self.name.quoted())
    }
}

/// Quote a SQL identifier, doubling embedded double quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Escape a value for use inside a single-quoted SQL string literal.
pub fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
#[path = "ident_test.rs"]
mod tests;
