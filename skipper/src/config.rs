use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-module adaptor configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdaptorConfig {
    /// Whether descriptors from this module are admitted to the registry.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for AdaptorConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Configuration consulted while the engine loads adaptor modules.
///
/// Entries are keyed by module name; modules without an entry are enabled.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Per-module settings, keyed by [`AdaptorModule::name`](crate::AdaptorModule::name).
    #[serde(default)]
    pub adaptors: HashMap<String, AdaptorConfig>,
}

impl EngineConfig {
    /// Create a configuration with every module enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable the named adaptor module.
    pub fn disable(mut self, module: impl Into<String>) -> Self {
        self.adaptors
            .insert(module.into(), AdaptorConfig { enabled: false });
        self
    }

    /// Whether the named module is enabled. Defaults to true.
    pub fn adaptor_enabled(&self, module: &str) -> bool {
        self.adaptors.get(module).map_or(true, |cfg| cfg.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modules_are_enabled_by_default() {
        let config = EngineConfig::new();
        assert!(config.adaptor_enabled("skipper.adaptor.local"));
    }

    #[test]
    fn disable_scopes_to_the_named_module() {
        let config = EngineConfig::new().disable("skipper.adaptor.local");
        assert!(!config.adaptor_enabled("skipper.adaptor.local"));
        assert!(config.adaptor_enabled("skipper.adaptor.myproxy"));
    }

    #[test]
    fn missing_enabled_field_defaults_to_true() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"adaptors": {"skipper.adaptor.local": {}}}"#).unwrap();
        assert!(config.adaptor_enabled("skipper.adaptor.local"));
    }

    #[test]
    fn enabled_false_round_trips() {
        let config = EngineConfig::new().disable("skipper.adaptor.myproxy");
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert!(!parsed.adaptor_enabled("skipper.adaptor.myproxy"));
    }
}
