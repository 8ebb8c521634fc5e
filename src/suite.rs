//! Suites and the runnable tree.

use crate::context::Context;
use crate::error::RunError;
use crate::file::File;
use crate::report::RunReport;
use crate::runner;
use std::path::{Path, PathBuf};

/// An ordered collection of Files (or nested Suites) discovered from a
/// directory.
#[derive(Debug)]
pub struct Suite {
    path: PathBuf,
    name: Option<String>,
    description: Option<String>,
    children: Vec<Runnable>,
}

impl Suite {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name: None,
            description: None,
            children: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn append(&mut self, child: impl Into<Runnable>) {
        self.children.push(child.into());
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The declared name, else the directory path.
    pub fn name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn description(&self) -> String {
        self.description.clone().unwrap_or_else(|| self.name())
    }

    pub fn children(&self) -> &[Runnable] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// A node of the test tree.
#[derive(Debug)]
pub enum Runnable {
    File(File),
    Suite(Suite),
}

impl Runnable {
    pub fn name(&self) -> String {
        match self {
            Runnable::File(f) => f.name().to_string(),
            Runnable::Suite(s) => s.name(),
        }
    }

    /// Run the tree and record every outcome. Never fails; inspect the
    /// report.
    pub fn execute(&self, ctx: &Context) -> RunReport {
        runner::execute(self, ctx)
    }

    /// Run the tree, failing with every collected failure if anything did
    /// not pass.
    pub fn run(&self, ctx: &Context) -> Result<RunReport, RunError> {
        let report = self.execute(ctx);
        let failures = report.failures();
        if failures.is_empty() {
            Ok(report)
        } else {
            Err(RunError::Failed(failures))
        }
    }
}

impl From<File> for Runnable {
    fn from(file: File) -> Self {
        Runnable::File(file)
    }
}

impl From<Suite> for Runnable {
    fn from(suite: Suite) -> Self {
        Runnable::Suite(suite)
    }
}
