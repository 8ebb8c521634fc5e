//! Run results and their JUnit rendering.

use crate::error::Failure;
use std::fmt::Write;
use std::path::PathBuf;
use std::time::Duration;

/// Reporting handle given to a unit while it runs.
///
/// Failures are collected, not thrown: a unit records every problem it
/// finds and keeps going.
#[derive(Debug, Default)]
pub struct UnitReport {
    failures: Vec<String>,
}

impl UnitReport {
    pub fn fail(&mut self, message: impl Into<String>) {
        self.failures.push(message.into());
    }

    pub fn failed(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    pub(crate) fn into_failures(self) -> Vec<String> {
        self.failures
    }
}

/// Result of running a single unit.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UnitResult {
    pub name: String,
    pub passed: bool,
    #[serde(serialize_with = "serialize_duration")]
    pub duration: Duration,
    pub failures: Vec<String>,
}

/// Result of running a File.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FileResult {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Set when the File failed before any unit ran, e.g. a missing fixture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub units: Vec<UnitResult>,
    #[serde(serialize_with = "serialize_duration")]
    pub duration: Duration,
}

impl FileResult {
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.units.iter().all(|u| u.passed)
    }
}

/// Result of running a Suite.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SuiteResult {
    pub name: String,
    pub path: PathBuf,
    pub children: Vec<RunReport>,
    #[serde(serialize_with = "serialize_duration")]
    pub duration: Duration,
}

/// Outcome of a run, shaped like the tree that ran.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunReport {
    File(FileResult),
    Suite(SuiteResult),
}

/// Totals over a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Counts {
    pub files: usize,
    pub units: usize,
    pub failed_units: usize,
    /// Files that failed before running any unit.
    pub file_errors: usize,
}

impl RunReport {
    pub fn name(&self) -> &str {
        match self {
            RunReport::File(f) => &f.name,
            RunReport::Suite(s) => &s.name,
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            RunReport::File(f) => f.duration,
            RunReport::Suite(s) => s.duration,
        }
    }

    pub fn passed(&self) -> bool {
        match self {
            RunReport::File(f) => f.passed(),
            RunReport::Suite(s) => s.children.iter().all(RunReport::passed),
        }
    }

    /// Every failure in the tree, in run order.
    ///
    /// Locations are slash-separated names from this node down.
    pub fn failures(&self) -> Vec<Failure> {
        let mut out = Vec::new();
        self.collect_failures("", &mut out);
        out
    }

    fn collect_failures(&self, parent: &str, out: &mut Vec<Failure>) {
        let location = join(parent, self.name());
        match self {
            RunReport::File(f) => {
                if let Some(error) = &f.error {
                    out.push(Failure {
                        location: location.clone(),
                        message: error.clone(),
                    });
                }
                for unit in &f.units {
                    for message in &unit.failures {
                        out.push(Failure {
                            location: join(&location, &unit.name),
                            message: message.clone(),
                        });
                    }
                }
            }
            RunReport::Suite(s) => {
                for child in &s.children {
                    child.collect_failures(&location, out);
                }
            }
        }
    }

    /// Every File result in the tree, in run order.
    pub fn files(&self) -> Vec<&FileResult> {
        match self {
            RunReport::File(f) => vec![f],
            RunReport::Suite(s) => s.children.iter().flat_map(RunReport::files).collect(),
        }
    }

    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for file in self.files() {
            counts.files += 1;
            counts.units += file.units.len();
            counts.failed_units += file.units.iter().filter(|u| !u.passed).count();
            if file.error.is_some() {
                counts.file_errors += 1;
            }
        }
        counts
    }

    /// Render the report as JUnit XML, one `<testsuite>` per File.
    pub fn to_junit_xml(&self) -> String {
        let counts = self.counts();
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

        let _ = writeln!(
            xml,
            "<testsuites name=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"{}\" time=\"{:.3}\">",
            escape_xml(self.name()),
            counts.units + counts.file_errors,
            counts.failed_units,
            counts.file_errors,
            self.duration().as_secs_f64()
        );

        let mut files = Vec::new();
        self.collect_files("", &mut files);
        for (location, file) in files {
            let failures = file.units.iter().filter(|u| !u.passed).count();
            let errors = usize::from(file.error.is_some());

            let _ = writeln!(
                xml,
                "  <testsuite name=\"{}\" tests=\"{}\" failures=\"{failures}\" errors=\"{errors}\" time=\"{:.3}\">",
                escape_xml(&location),
                file.units.len() + errors,
                file.duration.as_secs_f64()
            );

            if let Some(error) = &file.error {
                xml.push_str("    <testcase name=\"&lt;require&gt;\" time=\"0.000\">\n");
                let _ = writeln!(xml, "      <error message=\"{}\"/>", escape_xml(error));
                xml.push_str("    </testcase>\n");
            }

            for unit in &file.units {
                let _ = writeln!(
                    xml,
                    "    <testcase name=\"{}\" time=\"{:.3}\">",
                    escape_xml(&unit.name),
                    unit.duration.as_secs_f64()
                );

                if !unit.passed {
                    let message = unit
                        .failures
                        .first()
                        .map(|s| s.as_str())
                        .unwrap_or("Test failed");
                    let _ = writeln!(xml, "      <failure message=\"{}\">", escape_xml(message));
                    for failure in &unit.failures {
                        let _ = writeln!(xml, "{}", escape_xml(failure));
                    }
                    xml.push_str("      </failure>\n");
                }

                xml.push_str("    </testcase>\n");
            }

            xml.push_str("  </testsuite>\n");
        }

        xml.push_str("</testsuites>\n");
        xml
    }

    fn collect_files<'a>(&'a self, parent: &str, out: &mut Vec<(String, &'a FileResult)>) {
        let location = join(parent, self.name());
        match self {
            RunReport::File(f) => out.push((location, f)),
            RunReport::Suite(s) => {
                for child in &s.children {
                    child.collect_files(&location, out);
                }
            }
        }
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
