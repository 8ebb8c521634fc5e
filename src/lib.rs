//! Declarative YAML test documents, turned into runnable test trees.
//!
//! A document names its test type and the fixtures it needs:
//!
//! ```yaml
//! type: exec
//! name: listing
//! require: [books_data]
//! tests:
//!   - run: { cmd: echo, args: [books_data.authors[0].id] }
//!     expect: { stdout: "a-123\n" }
//! ```
//!
//! Loading resolves the type against the [`Context`]'s [`TypeRegistry`] and
//! hands the document to that type's [`Parser`]. Running a [`Runnable`]
//! starts each File's fixtures, runs its units in order while threading the
//! Context from one unit to the next, and stops the fixtures again.
//!
//! ```no_run
//! use docket::{Context, JsonFixture};
//!
//! let books = JsonFixture::from_path("tests/data/books.json".as_ref())
//!     .expect("books data")
//!     .with_prefix("books_data");
//! let ctx = Context::new().register_fixture("books_data", books);
//! let tree = docket::from_path(&ctx, "tests/docs").expect("load");
//! let report = tree.run(&ctx).expect("all tests pass");
//! println!("{}", report.to_junit_xml());
//! ```

pub mod context;
pub mod error;
pub mod exec;
pub mod file;
pub mod fixture;
pub mod fixtures;
pub mod loader;
pub mod parser;
pub mod report;
pub mod runner;
pub mod schema;
pub mod substitute;
pub mod suite;

pub use context::Context;
pub use error::{BoxError, Failure, FixtureError, LoadError, ParseError, RunError};
pub use file::{File, TestUnit};
pub use fixture::{ActiveFixtures, Fixture, FixtureRegistry, default_fixtures, register_fixture};
pub use fixtures::{JsonFixture, StateFixture};
pub use loader::{Loader, from_bytes, from_path, from_reader};
pub use parser::{ParseTarget, Parser, TypeRegistry, default_types, register_parser};
pub use report::{Counts, FileResult, RunReport, SuiteResult, UnitReport, UnitResult};
pub use schema::{DEFAULT_TYPE, Envelope};
pub use substitute::substitute;
pub use suite::{Runnable, Suite};
