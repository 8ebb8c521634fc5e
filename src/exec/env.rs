//! Resolution of declared argument and environment values.
//!
//! A declared value that names fixture state becomes that state. `${VAR}`
//! references left in the result are then expanded from the command's own
//! environment, falling back to the process environment.

use crate::fixture::FixtureRegistry;
use crate::substitute::substitute_str;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// `${NAME}`, with the closing brace optional so unclosed references are
/// caught rather than passed through.
static REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]*)(\})?").expect("variable reference pattern"));

/// Resolve a command's environment.
///
/// Every value is substituted first, so a reference to a sibling variable
/// sees its fixture state rather than the declared key.
pub fn resolve_env(
    declared: &HashMap<String, String>,
    fixtures: &FixtureRegistry,
) -> Result<HashMap<String, String>, String> {
    let mut substituted = declared.clone();
    for value in substituted.values_mut() {
        substitute_str(value, fixtures);
    }
    substituted
        .iter()
        .map(|(key, value)| Ok((key.clone(), expand(value, &substituted)?)))
        .collect()
}

/// Resolve one argument against the fixtures and the resolved environment.
pub fn resolve(
    declared: &str,
    fixtures: &FixtureRegistry,
    vars: &HashMap<String, String>,
) -> Result<String, String> {
    let mut value = declared.to_string();
    substitute_str(&mut value, fixtures);
    expand(&value, vars)
}

fn expand(text: &str, vars: &HashMap<String, String>) -> Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    for caps in REFERENCE.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if caps.get(2).is_none() {
            return Err(format!("unclosed variable reference: {}", whole.as_str()));
        }
        out.push_str(&text[copied..whole.start()]);
        out.push_str(&lookup(name.as_str(), vars)?);
        copied = whole.end();
    }
    out.push_str(&text[copied..]);
    Ok(out)
}

fn lookup(name: &str, vars: &HashMap<String, String>) -> Result<String, String> {
    vars.get(name)
        .cloned()
        .or_else(|| std::env::var(name).ok())
        .ok_or_else(|| format!("variable '{name}' is not set"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::StateFixture;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn fixtures() -> FixtureRegistry {
        let mut registry = FixtureRegistry::new();
        registry.register(
            "api",
            StateFixture::new()
                .with_state("api.host", "127.0.0.1")
                .with_state("api.port", 8080),
        );
        registry
    }

    #[test]
    fn expands_references_in_place() {
        let vars = vars(&[("NAME", "world")]);
        assert_eq!(expand("${NAME}", &vars).unwrap(), "world");
        assert_eq!(expand("hello_${NAME}_${NAME}!", &vars).unwrap(), "hello_world_world!");
        assert_eq!(expand("$NAME stays", &vars).unwrap(), "$NAME stays");
        assert_eq!(expand("", &vars).unwrap(), "");
    }

    #[test]
    fn command_env_shadows_process_env() {
        let Ok(path) = std::env::var("PATH") else {
            return;
        };
        assert_eq!(expand("${PATH}", &HashMap::new()).unwrap(), path);
        assert_eq!(expand("${PATH}", &vars(&[("PATH", "/nowhere")])).unwrap(), "/nowhere");
    }

    #[test]
    fn unset_and_unclosed_references_fail() {
        let err = expand("x ${DOCKET_NONEXISTENT_VAR_12345}", &HashMap::new()).unwrap_err();
        assert!(err.contains("DOCKET_NONEXISTENT_VAR_12345"));

        let err = expand("${OPEN", &vars(&[("OPEN", "x")])).unwrap_err();
        assert_eq!(err, "unclosed variable reference: ${OPEN");
    }

    #[test]
    fn env_values_see_substituted_siblings() {
        let declared = vars(&[("HOST", "api.host"), ("URL", "http://${HOST}:${PORT}"), ("PORT", "api.port")]);
        let env = resolve_env(&declared, &fixtures()).unwrap();
        assert_eq!(env["HOST"], "127.0.0.1");
        assert_eq!(env["PORT"], "8080");
        assert_eq!(env["URL"], "http://127.0.0.1:8080");
    }

    #[test]
    fn arguments_substitute_then_expand() {
        let env = vars(&[("GREETING", "hi")]);
        let registry = fixtures();
        assert_eq!(resolve("api.port", &registry, &env).unwrap(), "8080");
        assert_eq!(resolve("${GREETING}-x", &registry, &env).unwrap(), "hi-x");
        assert_eq!(resolve("api.host:${GREETING}", &registry, &env).unwrap(), "api.host:hi");
    }
}
