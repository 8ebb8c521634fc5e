//! Error types shared across the engine.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Boxed error returned by plugin code (fixture start, custom parsers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to turn a declarative document into a [`File`](crate::File).
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document is not valid YAML, or its top level is not a mapping.
    #[error("file contents not valid YAML: {0}")]
    InvalidYaml(#[source] serde_yaml::Error),

    /// The document's `type` has no registered parser.
    #[error("unknown test type '{0}'")]
    UnknownType(String),

    /// A type-specific parser failed to decode its schema.
    #[error("failed to decode test document: {0}")]
    Decode(#[from] serde_yaml::Error),

    /// The document decoded but describes an invalid test.
    #[error("invalid test: {0}")]
    Invalid(String),
}

/// Error type for loading documents from disk, readers or byte buffers.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to open or read a path.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a document from an in-memory reader.
    #[error("failed to read test document: {0}")]
    Read(#[source] std::io::Error),

    /// Failed while walking a suite directory.
    #[error("failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// A document failed to parse.
    #[error("{}{source}", path_prefix(.path.as_deref()))]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: ParseError,
    },
}

impl LoadError {
    /// The parse error behind this load error, if any.
    pub fn parse_error(&self) -> Option<&ParseError> {
        match self {
            LoadError::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn path_prefix(path: Option<&Path>) -> String {
    match path {
        Some(p) => format!("{}: ", p.display()),
        None => String::new(),
    }
}

/// Failure to activate a File's required fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// A required fixture name is not registered.
    #[error("required fixture '{0}' not found")]
    NotFound(String),

    /// A fixture's start hook failed.
    #[error("failed to start fixture '{name}': {source}")]
    Start {
        name: String,
        #[source]
        source: BoxError,
    },
}

/// A single failure collected from a run, attributed to the node it came from.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Failure {
    /// Slash-separated names from the root of the run to the failing node.
    pub location: String,
    pub message: String,
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Error returned by [`Runnable::run`](crate::Runnable::run) when anything failed.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("{} failure(s):\n{}", .0.len(), format_failures(.0))]
    Failed(Vec<Failure>),
}

impl RunError {
    pub fn failures(&self) -> &[Failure] {
        match self {
            RunError::Failed(failures) => failures,
        }
    }
}

fn format_failures(failures: &[Failure]) -> String {
    failures
        .iter()
        .map(|f| format!("  {f}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_message_is_attributed_to_path() {
        let err = LoadError::Parse {
            path: Some(PathBuf::from("/tests/a.yaml")),
            source: ParseError::UnknownType("bogus".to_string()),
        };
        assert_eq!(err.to_string(), "/tests/a.yaml: unknown test type 'bogus'");
    }

    #[test]
    fn parse_error_without_path_has_no_prefix() {
        let err = LoadError::Parse {
            path: None,
            source: ParseError::UnknownType("bogus".to_string()),
        };
        assert_eq!(err.to_string(), "unknown test type 'bogus'");
        assert!(matches!(
            err.parse_error(),
            Some(ParseError::UnknownType(t)) if t == "bogus"
        ));
    }

    #[test]
    fn missing_fixture_message() {
        let err = FixtureError::NotFound("books_api".to_string());
        assert_eq!(err.to_string(), "required fixture 'books_api' not found");
    }

    #[test]
    fn run_error_lists_every_failure() {
        let err = RunError::Failed(vec![
            Failure {
                location: "suite/a".to_string(),
                message: "boom".to_string(),
            },
            Failure {
                location: "suite/b/unit".to_string(),
                message: "bang".to_string(),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("2 failure(s)"));
        assert!(msg.contains("suite/a: boom"));
        assert!(msg.contains("suite/b/unit: bang"));
        assert_eq!(err.failures().len(), 2);
    }
}
