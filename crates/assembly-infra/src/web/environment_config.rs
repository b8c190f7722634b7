use config::{ConfigError, Map, Source, Value, ValueKind};
use std::env;

const PREFIX: &str = "assembly--";
const SEPARATOR: &str = "--";

/// Configuration source of the `ASSEMBLY--SECTION--SOME_KEY=value` environment variables.
/// Each segment is converted from snake case into camel case, the example maps to `section.someKey`.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    source: Option<Map<String, String>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given variables instead of the process environment.
    pub fn with_source(source: Map<String, String>) -> Self {
        Self { source: Some(source) }
    }

    fn convert_key(segment: &str) -> String {
        segment
            .split('_')
            .filter(|s| !s.is_empty())
            .enumerate()
            .map(|(i, s)| {
                let s = s.to_lowercase();
                if i == 0 {
                    s
                } else {
                    let mut chars = s.chars();
                    chars
                        .next()
                        .map(|c| c.to_uppercase().collect::<String>() + chars.as_str())
                        .unwrap_or_default()
                }
            })
            .collect()
    }

    fn config_key(env_key: &str) -> Option<String> {
        let lower = env_key.to_lowercase();
        if !lower.starts_with(PREFIX) {
            return None;
        }

        let path = env_key[PREFIX.len()..]
            .split(SEPARATOR)
            .map(Self::convert_key)
            .collect::<Vec<_>>();
        if path.iter().any(|segment| segment.is_empty()) {
            return None;
        }
        Some(path.join("."))
    }
}

impl Source for Environment {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new((*self).clone())
    }

    fn collect(&self) -> Result<Map<String, Value>, ConfigError> {
        let uri: String = "environment".into();
        let variables = match &self.source {
            Some(source) => source.clone().into_iter().collect::<Vec<_>>(),
            None => env::vars().collect::<Vec<_>>(),
        };

        let mut m = Map::new();
        for (env_key, value) in variables {
            if let Some(key) = Self::config_key(&env_key) {
                log::trace!("Config from environment: {key}");
                m.insert(key, Value::new(Some(&uri), ValueKind::String(value)));
            }
        }

        Ok(m)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assembly_test::test;

    #[test]
    fn environment_keys_are_camel_cased() {
        assert_eq!(
            Environment::config_key("ASSEMBLY--SERVICE--FULL_PROBLEM_RESPONSE").as_deref(),
            Some("service.fullProblemResponse")
        );
        assert_eq!(
            Environment::config_key("assembly--voting--DEFAULT_ALLOWED_VALUES").as_deref(),
            Some("voting.defaultAllowedValues")
        );
        assert_eq!(Environment::config_key("ASSEMBLY--PORT").as_deref(), Some("port"));
        assert_eq!(Environment::config_key("OTHER--SERVICE--PORT"), None);
        assert_eq!(Environment::config_key("ASSEMBLY----PORT"), None);
    }
}
