//! The built-in `exec` test type.
//!
//! Each entry under `tests` runs one process and checks its exit status and
//! output. Arguments and environment values naming fixture state are
//! substituted, then `${VAR}` references are interpolated. A test can feed
//! the previous test's stdout to its stdin with `stdin: $PREV_STDOUT`.

mod command;
mod document;
mod env;

pub use command::{ExecOutput, Invocation, check_expectations, run_command};
pub use document::{
    Defaults, ExecDocument, ExecTest, Expect, OutputMatch, OutputMatchStructured, Run,
    document_schema,
};

use crate::context::Context;
use crate::error::ParseError;
use crate::file::TestUnit;
use crate::parser::{ParseTarget, Parser, TypeRegistry};
use crate::report::UnitReport;
use crate::schema;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Name the plugin registers under.
pub const TYPE_NAME: &str = "exec";

/// Context key holding the [`ExecOutput`] of the last command run.
pub const PREVIOUS_OUTPUT: &str = "exec.previous_output";

/// Stdin sentinel replaced by the previous command's stdout.
pub const PREV_STDOUT: &str = "$PREV_STDOUT";

/// Default timeout per test in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 3;

/// Register the `exec` parser with `registry`.
pub fn register(registry: &mut TypeRegistry) {
    registry.register(ExecParser, &[TYPE_NAME]);
}

/// Parser for `exec` documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecParser;

impl Parser for ExecParser {
    fn parse(&self, target: &mut ParseTarget<'_>, contents: &[u8]) -> Result<(), ParseError> {
        if schema::is_blank(contents) {
            return Ok(());
        }
        let value: serde_yaml::Value = serde_yaml::from_slice(contents)?;
        if value.is_null() {
            return Ok(());
        }
        let doc: ExecDocument = serde_yaml::from_value(value)?;

        let base_dir = target.path().and_then(Path::parent).map(Path::to_path_buf);
        for (index, test) in doc.tests.into_iter().enumerate() {
            let unit = ExecUnit::new(index, test, &doc.defaults, base_dir.as_deref())?;
            target.append(unit);
        }
        debug!(file = %target.name(), units = target.units_len(), "parsed exec document");
        Ok(())
    }
}

/// One command to run and check.
#[derive(Debug, Clone)]
pub struct ExecUnit {
    name: String,
    cmd: String,
    args: Vec<String>,
    stdin: Option<String>,
    env: HashMap<String, String>,
    inherit_env: bool,
    cwd: Option<PathBuf>,
    shell: bool,
    timeout: Duration,
    expect: Expect,
}

impl ExecUnit {
    /// Build the unit for the `index`th test of a document.
    ///
    /// Relative working directories resolve against `base_dir`, the
    /// document's directory, when known.
    pub fn new(
        index: usize,
        test: ExecTest,
        defaults: &Defaults,
        base_dir: Option<&Path>,
    ) -> Result<Self, ParseError> {
        let invalid = |msg: &str| ParseError::Invalid(format!("test {}: {msg}", index + 1));

        let run = match (test.exec, test.run) {
            (Some(line), None) => {
                let mut words = line.split_whitespace().map(String::from);
                let cmd = words.next().ok_or_else(|| invalid("empty exec command"))?;
                Run {
                    cmd,
                    args: words.collect(),
                    ..Run::default()
                }
            }
            (None, Some(run)) => run,
            (Some(_), Some(_)) => return Err(invalid("'exec' and 'run' are mutually exclusive")),
            (None, None) => return Err(invalid("one of 'exec' or 'run' is required")),
        };
        if run.cmd.trim().is_empty() {
            return Err(invalid("empty command"));
        }

        let name = test.name.unwrap_or_else(|| {
            std::iter::once(run.cmd.as_str())
                .chain(run.args.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(" ")
        });

        let mut env = defaults.env.clone();
        env.extend(run.env);

        let cwd = run.cwd.or_else(|| defaults.cwd.clone()).map(|dir| match base_dir {
            Some(base) if dir.is_relative() => base.join(dir),
            _ => dir,
        });

        let timeout_secs = test
            .timeout
            .or(defaults.timeout)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            name,
            cmd: run.cmd,
            args: run.args,
            stdin: run.stdin,
            env,
            inherit_env: defaults.inherit_env,
            cwd,
            shell: run.shell,
            timeout: Duration::from_secs(timeout_secs),
            expect: test.expect,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Resolve fixture state, `${VAR}` references and `$PREV_STDOUT`
    /// against `ctx`.
    pub fn prepare(&self, ctx: &Context) -> Result<Invocation, String> {
        let fixtures = ctx.fixtures();
        let vars = env::resolve_env(&self.env, fixtures)?;
        let args = self
            .args
            .iter()
            .map(|arg| env::resolve(arg, fixtures, &vars))
            .collect::<Result<Vec<_>, _>>()?;

        let stdin = match self.stdin.as_deref() {
            Some(PREV_STDOUT) => {
                let previous = ctx
                    .value::<ExecOutput>(PREVIOUS_OUTPUT)
                    .ok_or_else(|| format!("{PREV_STDOUT} used before any command ran"))?;
                Some(previous.stdout.clone())
            }
            other => other.map(String::from),
        };

        Ok(Invocation {
            cmd: self.cmd.clone(),
            args,
            stdin,
            env: vars,
            inherit_env: self.inherit_env,
            cwd: self.cwd.clone(),
            shell: self.shell,
        })
    }
}

impl TestUnit for ExecUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: Context, report: &mut UnitReport) -> Context {
        let invocation = match self.prepare(&ctx) {
            Ok(invocation) => invocation,
            Err(e) => {
                report.fail(e);
                return ctx;
            }
        };

        debug!(unit = %self.name, cmd = %invocation.cmd, args = ?invocation.args, "running command");
        match run_command(&invocation, self.timeout) {
            Ok(output) => {
                for failure in check_expectations(&self.expect, &output) {
                    report.fail(failure);
                }
                ctx.with_value(PREVIOUS_OUTPUT, output)
            }
            Err(e) => {
                report.fail(format!("command execution failed: {e}"));
                ctx
            }
        }
    }
}
