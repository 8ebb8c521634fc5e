//! Schema of `exec` test documents.

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// A complete `exec` document, envelope keys included.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExecDocument {
    /// Test type; `exec` or absent.
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Fixtures that must be started before the tests run.
    #[serde(default)]
    pub require: Vec<String>,

    /// Settings applied to every test in the document.
    #[serde(default)]
    pub defaults: Defaults,

    /// Tests, run in order.
    #[serde(default)]
    pub tests: Vec<ExecTest>,
}

/// Document-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Defaults {
    /// Timeout in seconds for each test (default: 3).
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Whether commands inherit the host environment (default: true).
    #[serde(default = "default_true")]
    pub inherit_env: bool,

    /// Environment variables for every command.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Working directory, relative to the document's directory.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: None,
            inherit_env: true,
            env: HashMap::new(),
            cwd: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A single test. Exactly one of `exec` and `run` must be given.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExecTest {
    /// Test name. Defaults to the command line.
    #[serde(default)]
    pub name: Option<String>,

    /// Shorthand command line, split on whitespace.
    #[serde(default)]
    pub exec: Option<String>,

    /// Full command description.
    #[serde(default)]
    pub run: Option<Run>,

    /// Timeout in seconds, overriding the document default.
    #[serde(default)]
    pub timeout: Option<u64>,

    #[serde(default)]
    pub expect: Expect,
}

/// Command to execute for a test.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Run {
    /// The command/binary to execute.
    pub cmd: String,

    /// Command arguments. Arguments naming fixture state are substituted.
    #[serde(default)]
    pub args: Vec<String>,

    /// Standard input to provide. `$PREV_STDOUT` feeds the previous test's
    /// stdout.
    #[serde(default)]
    pub stdin: Option<String>,

    /// Additional environment variables for this command.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Working directory, overriding the document default.
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Run through `sh -c` (default: false).
    #[serde(default)]
    pub shell: bool,
}

/// Expected outcomes from a test execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Expect {
    /// Expected exit code (default: 0 if no signal expected).
    #[serde(default)]
    pub exit: Option<i32>,

    /// Expected signal that terminated the process (Unix only).
    #[serde(default)]
    pub signal: Option<i32>,

    #[serde(default)]
    pub stdout: Option<OutputMatch>,

    #[serde(default)]
    pub stderr: Option<OutputMatch>,
}

/// Matching rules for stdout/stderr.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum OutputMatch {
    /// Exact string match.
    Exact(String),

    /// Structured match with multiple options.
    Structured(OutputMatchStructured),
}

/// Structured output matching. Every rule given must hold.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct OutputMatchStructured {
    #[serde(default)]
    pub equals: Option<String>,

    #[serde(default)]
    pub contains: Option<String>,

    #[serde(default)]
    pub regex: Option<String>,
}

impl OutputMatch {
    /// Check `actual`, the captured `stream`, returning one message for each
    /// rule it breaks.
    pub fn mismatches(&self, stream: &str, actual: &str) -> Vec<String> {
        match self {
            OutputMatch::Exact(expected) => exact(stream, expected, actual).into_iter().collect(),
            OutputMatch::Structured(rules) => rules.mismatches(stream, actual),
        }
    }
}

impl OutputMatchStructured {
    pub fn mismatches(&self, stream: &str, actual: &str) -> Vec<String> {
        let mut found = Vec::new();
        if let Some(expected) = &self.equals {
            found.extend(exact(stream, expected, actual));
        }
        if let Some(needle) = &self.contains
            && !actual.contains(needle.as_str())
        {
            found.push(format!("{stream}: expected to contain {needle:?}\n  got: {actual:?}"));
        }
        if let Some(pattern) = &self.regex {
            match Regex::new(pattern) {
                Ok(re) if re.is_match(actual) => {}
                Ok(_) => found.push(format!(
                    "{stream}: expected to match regex {pattern:?}\n  got: {actual:?}"
                )),
                Err(e) => found.push(format!("{stream}: invalid regex {pattern:?}: {e}")),
            }
        }
        found
    }
}

fn exact(stream: &str, expected: &str, actual: &str) -> Option<String> {
    (expected != actual).then(|| {
        format!("{stream}: expected exact match\n  expected: {expected:?}\n  got: {actual:?}")
    })
}

/// Generate the JSON Schema for `exec` documents.
pub fn document_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(ExecDocument)
}
