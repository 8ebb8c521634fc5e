//! The value threaded through a run.
//!
//! A [`Context`] carries the fixture registry in effect, the type registry
//! used while loading documents, and keyed values that one unit leaves for
//! the units after it. It is cheap to clone and never mutated in place:
//! every "with" method returns a new Context and leaves the receiver as it
//! was.

use crate::fixture::{self, Fixture, FixtureRegistry};
use crate::parser::{self, TypeRegistry};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

type Values = HashMap<String, Arc<dyn Any + Send + Sync>>;

#[derive(Clone)]
pub struct Context {
    fixtures: Arc<FixtureRegistry>,
    types: Arc<TypeRegistry>,
    values: Arc<Values>,
}

impl Context {
    /// A context with an empty fixture registry and the built-in test types.
    pub fn new() -> Self {
        Self {
            fixtures: Arc::new(FixtureRegistry::new()),
            types: Arc::new(TypeRegistry::with_builtins()),
            values: Arc::default(),
        }
    }

    /// A context over snapshots of the process-wide default registries.
    pub fn from_defaults() -> Self {
        Self {
            fixtures: Arc::new(fixture::default_fixtures()),
            types: Arc::new(parser::default_types()),
            values: Arc::default(),
        }
    }

    pub fn with_fixtures(&self, fixtures: FixtureRegistry) -> Self {
        Self {
            fixtures: Arc::new(fixtures),
            ..self.clone()
        }
    }

    pub fn with_types(&self, types: TypeRegistry) -> Self {
        Self {
            types: Arc::new(types),
            ..self.clone()
        }
    }

    /// A context whose fixture registry also holds `fixture` under `name`.
    ///
    /// The registry is copied on write; contexts sharing the old registry do
    /// not see the new entry.
    pub fn register_fixture(&self, name: &str, fixture: impl Fixture + 'static) -> Self {
        let mut next = self.clone();
        Arc::make_mut(&mut next.fixtures).register(name, fixture);
        next
    }

    /// A context with `value` stored under `key`, replacing any earlier value.
    pub fn with_value<T: Any + Send + Sync>(&self, key: &str, value: T) -> Self {
        let mut next = self.clone();
        Arc::make_mut(&mut next.values).insert(key.to_string(), Arc::new(value));
        next
    }

    /// The value under `key`, if one is stored and has type `T`.
    pub fn value<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| (**v).downcast_ref::<T>())
    }

    pub fn has_value(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn fixtures(&self) -> &FixtureRegistry {
        &self.fixtures
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("Context")
            .field("fixtures", &self.fixtures)
            .field("types", &self.types)
            .field("values", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::StateFixture;
    use serde_json::json;

    #[test]
    fn with_value_leaves_receiver_untouched() {
        let base = Context::new();
        let next = base.with_value("last", 42u32);

        assert!(!base.has_value("last"));
        assert_eq!(next.value::<u32>("last"), Some(&42));
        assert_eq!(next.value::<String>("last"), None);
        assert_eq!(next.value::<u32>("other"), None);
    }

    #[test]
    fn later_values_replace_earlier_ones() {
        let ctx = Context::new()
            .with_value("k", "first".to_string())
            .with_value("k", "second".to_string());
        assert_eq!(ctx.value::<String>("k").map(String::as_str), Some("second"));
    }

    #[test]
    fn register_fixture_copies_on_write() {
        let base = Context::new();
        let next = base.register_fixture("data", StateFixture::new().with_state("k", "v"));

        assert!(base.fixtures().is_empty());
        assert_eq!(next.fixtures().len(), 1);
        assert_eq!(next.fixtures().find_state("k"), Some(json!("v")));
    }

    #[test]
    fn clones_share_values_until_written() {
        let a = Context::new().with_value("x", 1i64);
        let b = a.clone().with_value("y", 2i64);
        assert!(!a.has_value("y"));
        assert_eq!(b.value::<i64>("x"), Some(&1));
    }

    #[test]
    fn new_context_knows_builtin_types() {
        let ctx = Context::new();
        assert!(ctx.types().get("exec").is_some());
        let bare = ctx.with_types(TypeRegistry::new());
        assert!(bare.types().get("exec").is_none());
    }
}
