//! A parsed test document and the units it holds.

use crate::context::Context;
use crate::report::UnitReport;
use std::path::{Path, PathBuf};

/// The smallest executable test step.
///
/// A unit signals pass/fail only through `report`. It receives the Context
/// left by the unit before it and returns the Context for the unit after it;
/// returning `ctx` unchanged is the common case.
pub trait TestUnit {
    fn name(&self) -> &str;

    fn run(&self, ctx: Context, report: &mut UnitReport) -> Context;
}

/// One parsed declarative document.
pub struct File {
    type_name: String,
    name: Option<String>,
    description: Option<String>,
    path: Option<PathBuf>,
    require: Vec<String>,
    units: Vec<Box<dyn TestUnit>>,
}

impl File {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            name: None,
            description: None,
            path: None,
            require: Vec::new(),
            units: Vec::new(),
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

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_require<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.require = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn append(&mut self, unit: impl TestUnit + 'static) {
        self.units.push(Box::new(unit));
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The declared name, else the basename of the path, else empty.
    pub fn name(&self) -> &str {
        if let Some(name) = &self.name {
            return name;
        }
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// The declared description, else the name.
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| self.name())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn require(&self) -> &[String] {
        &self.require
    }

    pub fn units(&self) -> &[Box<dyn TestUnit>] {
        &self.units
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("type_name", &self.type_name)
            .field("name", &self.name())
            .field("path", &self.path)
            .field("require", &self.require)
            .field(
                "units",
                &self.units.iter().map(|u| u.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
