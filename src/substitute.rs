//! Rewrites declared payload data with fixture state.
//!
//! A payload may name fixture state in place of a literal, e.g.
//! `author_id: books_data.authors[0].id`. Before a plugin uses the payload,
//! [`substitute`] replaces every map key and string leaf that some fixture
//! controls with that fixture's state. Strings no fixture controls pass
//! through untouched.

use crate::fixture::FixtureRegistry;
use serde_json::Value;
use tracing::{trace, warn};

/// Substitute fixture state into `value` in place, returning how many keys
/// and values were replaced.
///
/// When several fixtures control the same key, the first registered wins.
/// Replacement values are not scanned again. A map key rewritten to a name
/// its object already holds replaces that entry, and a warning is logged.
pub fn substitute(value: &mut Value, fixtures: &FixtureRegistry) -> usize {
    if fixtures.is_empty() {
        return 0;
    }
    walk(value, fixtures)
}

fn walk(value: &mut Value, fixtures: &FixtureRegistry) -> usize {
    match value {
        Value::String(s) => match fixtures.find_state(s) {
            Some(state) => {
                trace!(key = %s, "substituted fixture state");
                *value = state;
                1
            }
            None => 0,
        },
        Value::Array(items) => items.iter_mut().map(|v| walk(v, fixtures)).sum(),
        Value::Object(map) => {
            let mut count = 0;
            let mut renamed = Vec::new();
            for (key, mut v) in std::mem::take(map) {
                count += walk(&mut v, fixtures);
                match fixtures.find_state(&key) {
                    Some(state) => {
                        trace!(key = %key, "substituted fixture state in key");
                        count += 1;
                        renamed.push((key, state_string(state), v));
                    }
                    None => {
                        map.insert(key, v);
                    }
                }
            }
            for (declared, key, v) in renamed {
                if map.insert(key.clone(), v).is_some() {
                    warn!(declared = %declared, key = %key, "substituted key replaced an existing entry");
                }
            }
            count
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => 0,
    }
}

/// Substitute a single string, returning whether it was replaced.
///
/// Non-string state is rendered as JSON text.
pub fn substitute_str(s: &mut String, fixtures: &FixtureRegistry) -> bool {
    match fixtures.find_state(s) {
        Some(state) => {
            trace!(key = %s, "substituted fixture state");
            *s = state_string(state);
            true
        }
        None => false,
    }
}

fn state_string(state: Value) -> String {
    match state {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
