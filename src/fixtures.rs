//! Stock fixtures: closure-adapted fixtures and JSON data sets.

use crate::error::BoxError;
use crate::fixture::Fixture;
use serde_json::Value;
use serde_json_path::JsonPath;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

type Hook = Box<dyn Fn() + Send + Sync>;

/// Adapts start/stop closures and a static state map into a [`Fixture`].
///
/// State keys are matched case-insensitively.
#[derive(Default)]
pub struct StateFixture {
    starter: Option<Hook>,
    stopper: Option<Hook>,
    state: HashMap<String, Value>,
}

impl StateFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.starter = Some(Box::new(f));
        self
    }

    pub fn with_stop(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.stopper = Some(Box::new(f));
        self
    }

    pub fn with_state(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.state.insert(key.to_lowercase(), value.into());
        self
    }
}

impl Fixture for StateFixture {
    fn start(&self) -> Result<(), BoxError> {
        if let Some(f) = &self.starter {
            f();
        }
        Ok(())
    }

    fn stop(&self) {
        if let Some(f) = &self.stopper {
            f();
        }
    }

    fn has_state(&self, key: &str) -> bool {
        self.state.contains_key(&key.to_lowercase())
    }

    fn state(&self, key: &str) -> Value {
        self.state
            .get(&key.to_lowercase())
            .cloned()
            .unwrap_or(Value::Null)
    }
}

/// A fixture backed by a JSON document, queried with JSONPath.
///
/// Keys are JSONPath expressions such as `$.authors[0].id`. A key controls
/// state only when it parses and selects exactly one node. With a prefix
/// set, keys may also be written `<prefix>.<path>`, e.g.
/// `books_data.authors[0].id`.
#[derive(Debug, Clone)]
pub struct JsonFixture {
    data: Value,
    prefix: Option<String>,
}

impl JsonFixture {
    pub fn from_value(data: Value) -> Self {
        Self { data, prefix: None }
    }

    pub fn from_reader(r: impl std::io::Read) -> Result<Self, serde_json::Error> {
        Ok(Self::from_value(serde_json::from_reader(r)?))
    }

    pub fn from_path(path: &Path) -> Result<Self, BoxError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(contents.parse::<Self>()?)
    }

    /// Accept `<prefix>.<path>` keys in addition to `$`-rooted JSONPath.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    fn path_for(&self, key: &str) -> Option<JsonPath> {
        let expr = if key.starts_with("$.") || key.starts_with("$[") {
            key.to_string()
        } else {
            let prefix = self.prefix.as_deref()?;
            let rest = key.strip_prefix(prefix)?;
            if rest.starts_with('.') || rest.starts_with('[') {
                format!("${rest}")
            } else {
                return None;
            }
        };
        JsonPath::parse(&expr).ok()
    }

    /// A node holding `null` is treated as absent.
    fn lookup(&self, key: &str) -> Option<&Value> {
        let path = self.path_for(key)?;
        path.query(&self.data)
            .exactly_one()
            .ok()
            .filter(|node| !node.is_null())
    }
}

impl FromStr for JsonFixture {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_value(serde_json::from_str(s)?))
    }
}

impl Fixture for JsonFixture {
    fn has_state(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    fn state(&self, key: &str) -> Value {
        self.lookup(key).cloned().unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn books() -> JsonFixture {
        JsonFixture::from_value(json!({
            "authors": [
                {"id": "a-123", "name": "Ursula"},
                {"id": "a-456", "name": "Iain"}
            ],
            "publishers": [{"id": 7}]
        }))
    }

    #[test]
    fn state_fixture_runs_hooks() {
        let starts = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));
        let (s1, s2) = (starts.clone(), stops.clone());
        let fixture = StateFixture::new()
            .with_start(move || {
                s1.fetch_add(1, Ordering::SeqCst);
            })
            .with_stop(move || {
                s2.fetch_add(1, Ordering::SeqCst);
            });

        fixture.start().unwrap();
        fixture.stop();
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn state_fixture_keys_ignore_case() {
        let fixture = StateFixture::new().with_state("HTTP.Base_URL", "http://localhost:8080");
        assert!(fixture.has_state("http.base_url"));
        assert_eq!(fixture.state("http.BASE_url"), json!("http://localhost:8080"));
        assert!(!fixture.has_state("http.client"));
        assert_eq!(fixture.state("http.client"), Value::Null);
    }

    #[test]
    fn json_fixture_answers_jsonpath_queries() {
        let fixture = books();
        assert!(fixture.has_state("$.authors[0].id"));
        assert_eq!(fixture.state("$.authors[1].id"), json!("a-456"));
        assert_eq!(fixture.state("$.publishers[0].id"), json!(7));
    }

    #[test]
    fn json_fixture_ignores_plain_strings_and_ambiguous_paths() {
        let fixture = books();
        assert!(!fixture.has_state("hello"));
        assert!(!fixture.has_state("$"));
        assert!(!fixture.has_state("$.authors[*].id"));
        assert!(!fixture.has_state("$.nope"));
        assert!(!fixture.has_state("$.[[["));
        assert_eq!(fixture.state("$.nope"), Value::Null);
    }

    #[test]
    fn json_fixture_treats_null_nodes_as_absent() {
        let fixture = JsonFixture::from_value(json!({"author": {"id": null, "name": "Ursula"}}));
        assert!(!fixture.has_state("$.author.id"));
        assert_eq!(fixture.state("$.author.id"), Value::Null);
        assert!(fixture.has_state("$.author.name"));

        let mut registry = crate::fixture::FixtureRegistry::new();
        registry.register("authors", fixture);
        let mut payload = json!({"id": "$.author.id"});
        assert_eq!(crate::substitute(&mut payload, &registry), 0);
        assert_eq!(payload, json!({"id": "$.author.id"}));
    }

    #[test]
    fn json_fixture_prefix_keys() {
        let fixture = books().with_prefix("books_data");
        assert!(fixture.has_state("books_data.authors[0].id"));
        assert_eq!(fixture.state("books_data.authors[0].id"), json!("a-123"));
        assert!(!fixture.has_state("books_datax.authors[0].id"));
        assert!(!fixture.has_state("other.authors[0].id"));
    }

    #[test]
    fn json_fixture_parses_from_text() {
        assert!("{not json".parse::<JsonFixture>().is_err());
        assert!(r#"{"a": 1}"#.parse::<JsonFixture>().unwrap().has_state("$.a"));
    }
}
