use std::env;
use std::time::Duration;

use tera::Tera;
use tokio::sync::RwLock;

use crate::backend::BackendClient;
use crate::desk::DeskState;

/// Application configuration from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Address to bind the HTTP server to.
    pub bind_address: String,
    /// Base URL of the indemnity backend.
    pub backend_url: String,
    /// Glob the page templates are loaded from.
    pub templates_glob: String,
    /// Directory served under `/static`.
    pub static_dir: String,
    /// Per-request timeout for backend calls; none when unset.
    pub backend_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8201".into(),
            backend_url: "http://localhost:5000".into(),
            templates_glob: "templates/**/*.html".into(),
            static_dir: "static".into(),
            backend_timeout: None,
        }
    }
}

impl Config {
    /// Creates Config from environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind_address: lookup("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            backend_url: lookup("BACKEND_URL").unwrap_or(defaults.backend_url),
            templates_glob: lookup("TEMPLATES_GLOB").unwrap_or(defaults.templates_glob),
            static_dir: lookup("STATIC_DIR").unwrap_or(defaults.static_dir),
            backend_timeout: lookup("BACKEND_TIMEOUT_SECS")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }
}

/// Shared application state passed to all request handlers.
#[derive(Debug)]
pub struct AppState {
    /// Template engine for rendering HTML pages.
    pub tera: Tera,
    /// Client for the indemnity backend.
    pub backend: BackendClient,
    /// Operator state, never held across a backend call.
    pub desk: RwLock<DeskState>,
}

impl AppState {
    pub fn new(tera: Tera, backend: BackendClient) -> Self {
        Self {
            tera,
            backend,
            desk: RwLock::new(DeskState::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_environment() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_values_are_read_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("BACKEND_URL", "http://backend:5555"),
            ("BACKEND_TIMEOUT_SECS", "30"),
        ]);
        let config = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.backend_url, "http://backend:5555");
        assert_eq!(config.backend_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.bind_address, "0.0.0.0:8201");
    }

    #[test]
    fn test_bad_timeout_means_no_timeout() {
        let config = Config::from_lookup(|k| (k == "BACKEND_TIMEOUT_SECS").then(|| "soon".into()));
        assert_eq!(config.backend_timeout, None);
    }
}
