//! The document envelope.
//!
//! Every test document, whatever its type, starts with the same handful of
//! keys. The loader decodes only these to decide which parser gets the rest.

use crate::error::ParseError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Test type used when a document does not declare one.
pub const DEFAULT_TYPE: &str = "exec";

/// Keys shared by every test document.
///
/// Unknown keys are ignored here; they belong to the type-specific schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Envelope {
    /// Test type, matched case-insensitively against the type registry.
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,

    /// Display name. Defaults to the file's basename.
    #[serde(default)]
    pub name: Option<String>,

    /// Longer description. Defaults to the name.
    #[serde(default)]
    pub description: Option<String>,

    /// Fixtures that must be registered and started before the document runs.
    #[serde(default)]
    pub require: Vec<String>,
}

impl Envelope {
    /// Decode the envelope from a raw document.
    ///
    /// A blank document decodes as an empty envelope. Anything that is not
    /// YAML, or whose top level is not a mapping, is `InvalidYaml`.
    pub fn parse(contents: &[u8]) -> Result<Self, ParseError> {
        if is_blank(contents) {
            return Ok(Self::default());
        }
        let value: serde_yaml::Value =
            serde_yaml::from_slice(contents).map_err(ParseError::InvalidYaml)?;
        match value {
            serde_yaml::Value::Null => Ok(Self::default()),
            serde_yaml::Value::Mapping(_) => Ok(serde_yaml::from_value(value)?),
            other => Err(ParseError::InvalidYaml(
                serde_yaml::from_value::<Self>(other)
                    .err()
                    .unwrap_or_else(|| serde::de::Error::custom("top level is not a mapping")),
            )),
        }
    }

    /// The declared type, or `fallback` when none is declared.
    pub fn type_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self.type_name.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => fallback,
        }
    }
}

/// True when a document holds nothing but whitespace and comments.
pub(crate) fn is_blank(contents: &[u8]) -> bool {
    String::from_utf8_lossy(contents)
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#'))
}

/// Generate the JSON Schema for the document envelope.
pub fn envelope_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(Envelope)
}
