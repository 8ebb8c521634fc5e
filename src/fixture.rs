//! Fixtures and the fixture registry.
//!
//! A fixture is an externally-managed resource (a test server, a data set)
//! with a start/stop lifecycle and a queryable state map. Files declare the
//! fixtures they need by name; the runner activates them through
//! [`ActiveFixtures`] for the duration of the File.

use crate::error::{BoxError, FixtureError};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// An externally-managed resource exposing key/value state.
pub trait Fixture: Send + Sync {
    /// Set up the fixture. Called immediately before a File that requires it.
    fn start(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Tear down the fixture. Called once the requiring File has finished,
    /// on every exit path.
    fn stop(&self) {}

    /// Whether the fixture controls state under `key`.
    fn has_state(&self, key: &str) -> bool;

    /// The state under `key`, or `Value::Null` for keys the fixture does not
    /// control.
    fn state(&self, key: &str) -> Value;
}

/// Case-insensitive name to fixture store.
///
/// Entries keep registration order, so [`list`](Self::list) and
/// [`find_state`](Self::find_state) are deterministic.
#[derive(Clone, Default)]
pub struct FixtureRegistry {
    entries: IndexMap<String, Arc<dyn Fixture>>,
}

impl FixtureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `fixture` under `name`.
    ///
    /// Registration is an upsert: a name that collides case-insensitively
    /// with an existing entry replaces it in place, and the replaced fixture
    /// is returned.
    pub fn register(
        &mut self,
        name: &str,
        fixture: impl Fixture + 'static,
    ) -> Option<Arc<dyn Fixture>> {
        self.register_arc(name, Arc::new(fixture))
    }

    /// Register an already shared fixture.
    pub fn register_arc(
        &mut self,
        name: &str,
        fixture: Arc<dyn Fixture>,
    ) -> Option<Arc<dyn Fixture>> {
        let key = name.to_lowercase();
        let previous = self.entries.insert(key, fixture);
        if previous.is_some() {
            debug!(fixture = %name, "replaced registered fixture");
        }
        previous
    }

    /// Case-insensitive lookup. `None` means "not registered".
    pub fn get(&self, name: &str) -> Option<Arc<dyn Fixture>> {
        self.entries.get(&name.to_lowercase()).cloned()
    }

    /// Snapshot of every registered fixture, in registration order.
    pub fn list(&self) -> Vec<Arc<dyn Fixture>> {
        self.entries.values().cloned().collect()
    }

    /// Registered names (lower-cased), in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// State under `key` from the first fixture that controls it.
    pub fn find_state(&self, key: &str) -> Option<Value> {
        self.entries
            .values()
            .find(|f| f.has_state(key))
            .map(|f| f.state(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for FixtureRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixtureRegistry")
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

static DEFAULT_FIXTURES: Lazy<RwLock<FixtureRegistry>> =
    Lazy::new(|| RwLock::new(FixtureRegistry::new()));

/// Register a fixture with the process-wide default registry.
///
/// All registration must happen before any run that reads the defaults
/// through [`Context::from_defaults`](crate::Context::from_defaults); a
/// context takes a snapshot and never observes later registrations.
pub fn register_fixture(name: &str, fixture: impl Fixture + 'static) {
    DEFAULT_FIXTURES.write().register(name, fixture);
}

/// Snapshot of the process-wide default fixture registry.
pub fn default_fixtures() -> FixtureRegistry {
    DEFAULT_FIXTURES.read().clone()
}

/// The started fixtures of one File.
///
/// Dropping the value stops every started fixture in reverse start order,
/// whether the File finished, failed or is unwinding from a panic.
pub struct ActiveFixtures {
    started: Vec<(String, Arc<dyn Fixture>)>,
}

impl ActiveFixtures {
    /// Resolve and start the fixtures named in `require`.
    ///
    /// Every name is resolved before anything starts: if one is missing,
    /// no fixture is started at all. Names are started in declared order and
    /// a name repeated in `require` is started once. If a start hook fails,
    /// the fixtures already started are stopped before the error returns.
    pub fn activate(registry: &FixtureRegistry, require: &[String]) -> Result<Self, FixtureError> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(require.len());
        for name in require {
            if !seen.insert(name.to_lowercase()) {
                continue;
            }
            let fixture = registry
                .get(name)
                .ok_or_else(|| FixtureError::NotFound(name.clone()))?;
            resolved.push((name.clone(), fixture));
        }

        let mut active = Self {
            started: Vec::with_capacity(resolved.len()),
        };
        for (name, fixture) in resolved {
            debug!(fixture = %name, "starting fixture");
            if let Err(source) = fixture.start() {
                warn!(fixture = %name, error = %source, "fixture failed to start");
                return Err(FixtureError::Start { name, source });
            }
            active.started.push((name, fixture));
        }
        Ok(active)
    }

    /// Names of the started fixtures, in start order.
    pub fn names(&self) -> Vec<&str> {
        self.started.iter().map(|(n, _)| n.as_str()).collect()
    }
}

impl Drop for ActiveFixtures {
    fn drop(&mut self) {
        while let Some((name, fixture)) = self.started.pop() {
            debug!(fixture = %name, "stopping fixture");
            fixture.stop();
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording fixture shared by the crate's unit tests.

    use super::*;
    use parking_lot::Mutex;

    pub type Journal = Arc<Mutex<Vec<String>>>;

    pub struct Recorder {
        pub name: String,
        pub journal: Journal,
        pub state: Vec<(String, Value)>,
        pub fail_start: bool,
    }

    impl Recorder {
        pub fn new(name: &str, journal: &Journal) -> Self {
            Self {
                name: name.to_string(),
                journal: journal.clone(),
                state: Vec::new(),
                fail_start: false,
            }
        }

        pub fn with_state(mut self, key: &str, value: Value) -> Self {
            self.state.push((key.to_string(), value));
            self
        }
    }

    impl Fixture for Recorder {
        fn start(&self) -> Result<(), BoxError> {
            if self.fail_start {
                return Err(format!("{} refused to start", self.name).into());
            }
            self.journal.lock().push(format!("start:{}", self.name));
            Ok(())
        }

        fn stop(&self) {
            self.journal.lock().push(format!("stop:{}", self.name));
        }

        fn has_state(&self, key: &str) -> bool {
            self.state.iter().any(|(k, _)| k == key)
        }

        fn state(&self, key: &str) -> Value {
            self.state
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or(Value::Null)
        }
    }
}
