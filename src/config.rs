use serde::{Deserialize, Serialize};
use std::env;

/// Application settings, loaded from environment variables with sensible
/// defaults for local development.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub ollama_timeout_secs: u64,

    pub mistral_api_key: Option<String>,
    pub mistral_model: String,
    pub mistral_timeout_secs: u64,

    /// Cap on concurrently in-flight tasks in parallel mode.
    pub max_parallel_tasks: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "mistral".to_string(),
            ollama_timeout_secs: 300,
            mistral_api_key: None,
            mistral_model: "mistral-small".to_string(),
            mistral_timeout_secs: 60,
            max_parallel_tasks: 4,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            ollama_base_url: env::var("OLLAMA_BASE_URL").unwrap_or(defaults.ollama_base_url),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
            ollama_timeout_secs: env_parse("OLLAMA_TIMEOUT_SECS", defaults.ollama_timeout_secs),
            mistral_api_key: env::var("MISTRAL_API_KEY").ok().filter(|k| !k.is_empty()),
            mistral_model: env::var("MISTRAL_MODEL").unwrap_or(defaults.mistral_model),
            mistral_timeout_secs: env_parse("MISTRAL_TIMEOUT_SECS", defaults.mistral_timeout_secs),
            max_parallel_tasks: env_parse("MAX_PARALLEL_TASKS", defaults.max_parallel_tasks)
                .max(1),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.ollama_base_url, "http://localhost:11434");
        assert_eq!(settings.max_parallel_tasks, 4);
        assert!(settings.mistral_api_key.is_none());
    }

    #[test]
    fn test_env_parse_fallback() {
        assert_eq!(env_parse("AGENTFLOW_TEST_UNSET_VAR", 7usize), 7);
    }
}
