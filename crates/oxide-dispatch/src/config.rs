//! Engine configuration.

use serde::Deserialize;

/// Settings that shape how an [`Engine`](crate::Engine) logs and answers
/// requests it cannot route.
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log one line per registered route.
    pub log_routes: bool,
    /// Body written by [`Engine::handle`](crate::Engine::handle) when nothing
    /// matched. `{path}` is replaced with the request path.
    pub not_found_body: String,
    /// Body written by the recovery middleware after a panic.
    pub recovery_body: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_routes: true,
            not_found_body: "404 NOT FOUND: {path}".to_string(),
            recovery_body: "Internal Server Error".to_string(),
        }
    }
}

impl EngineConfig {
    /// Renders the not-found body for `path`.
    #[must_use]
    pub fn not_found_body_for(&self, path: &str) -> String {
        self.not_found_body.replace("{path}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config: EngineConfig = serde_json::from_str(r#"{"log_routes": false}"#).unwrap();
        assert!(!config.log_routes);
        assert_eq!(config.recovery_body, "Internal Server Error");
    }

    #[test]
    fn test_not_found_body() {
        let config = EngineConfig::default();
        assert_eq!(config.not_found_body_for("/nope"), "404 NOT FOUND: /nope");
    }
}
