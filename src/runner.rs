//! Test execution engine.
//!
//! Walks a [`Runnable`] tree depth-first and in declaration order. Each File
//! activates its required fixtures, runs its units one after another while
//! threading the [`Context`] from unit to unit, and releases the fixtures
//! before returning.

use crate::context::Context;
use crate::file::{File, TestUnit};
use crate::fixture::ActiveFixtures;
use crate::report::{FileResult, RunReport, SuiteResult, UnitReport, UnitResult};
use crate::suite::{Runnable, Suite};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Run any node of the tree.
pub fn execute(node: &Runnable, ctx: &Context) -> RunReport {
    match node {
        Runnable::File(file) => RunReport::File(run_file(file, ctx)),
        Runnable::Suite(suite) => RunReport::Suite(run_suite(suite, ctx)),
    }
}

/// Run every child of a Suite in order.
///
/// A failing child never stops its siblings. Each child starts from `ctx`,
/// so nothing a File stores in its Context reaches the next one.
pub fn run_suite(suite: &Suite, ctx: &Context) -> SuiteResult {
    let start = Instant::now();
    let name = suite.name();
    info!(suite = %name, children = suite.len(), "running suite");

    let children = suite
        .children()
        .iter()
        .map(|child| execute(child, ctx))
        .collect();

    SuiteResult {
        name,
        path: suite.path().to_path_buf(),
        children,
        duration: start.elapsed(),
    }
}

/// Run a File: activate fixtures, run units, release fixtures.
///
/// If any required fixture is missing or fails to start, no unit runs and
/// the error is recorded on the result.
pub fn run_file(file: &File, ctx: &Context) -> FileResult {
    let start = Instant::now();
    info!(file = %file.name(), units = file.units().len(), "running file");

    let active = match ActiveFixtures::activate(ctx.fixtures(), file.require()) {
        Ok(active) => active,
        Err(e) => {
            warn!(file = %file.name(), error = %e, "fixture activation failed");
            return FileResult {
                name: file.name().to_string(),
                path: file.path().map(|p| p.to_path_buf()),
                error: Some(e.to_string()),
                units: Vec::new(),
                duration: start.elapsed(),
            };
        }
    };

    let mut ctx = ctx.clone();
    let mut units = Vec::with_capacity(file.units().len());
    for unit in file.units() {
        let (next, result) = run_unit(unit.as_ref(), ctx);
        ctx = next;
        units.push(result);
    }
    drop(active);

    FileResult {
        name: file.name().to_string(),
        path: file.path().map(|p| p.to_path_buf()),
        error: None,
        units,
        duration: start.elapsed(),
    }
}

/// Run one unit, catching a panic as a failure.
///
/// A panicking unit hands on the Context it was given.
fn run_unit(unit: &dyn TestUnit, ctx: Context) -> (Context, UnitResult) {
    let start = Instant::now();
    let mut report = UnitReport::default();
    let fallback = ctx.clone();

    debug!(unit = %unit.name(), "running unit");
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| unit.run(ctx, &mut report)));
    let ctx = match outcome {
        Ok(next) => next,
        Err(payload) => {
            report.fail(format!("unit panicked: {}", panic_message(&*payload)));
            fallback
        }
    };

    let failures = report.into_failures();
    let passed = failures.is_empty();
    if passed {
        debug!(unit = %unit.name(), "unit passed");
    } else {
        warn!(unit = %unit.name(), failures = failures.len(), "unit failed");
    }

    let result = UnitResult {
        name: unit.name().to_string(),
        passed,
        duration: start.elapsed(),
        failures,
    };
    (ctx, result)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
