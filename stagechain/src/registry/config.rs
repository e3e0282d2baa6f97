//! Configuration for builder lifetimes.

use crate::errors::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How long a resolved builder instance is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Lifetime {
    /// A fresh builder on every resolution.
    PerCall,
    /// One builder per [`BuilderScope`](super::BuilderScope).
    #[default]
    PerScope,
    /// One builder for the lifetime of the registry.
    ///
    /// A builder can only be built once, so after the first caller builds
    /// it every later resolution returns the same, already frozen builder.
    /// Share the resulting [`Pipeline`](crate::pipeline::Pipeline) instead
    /// of rebuilding.
    Singleton,
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PerCall => f.write_str("per-call"),
            Self::PerScope => f.write_str("per-scope"),
            Self::Singleton => f.write_str("singleton"),
        }
    }
}

impl std::str::FromStr for Lifetime {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "per-call" => Ok(Self::PerCall),
            "per-scope" => Ok(Self::PerScope),
            "singleton" => Ok(Self::Singleton),
            other => Err(PipelineError::config(format!("unknown lifetime '{other}'"))),
        }
    }
}

/// Registry configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Lifetime used for registrations without an override.
    #[serde(default)]
    pub default_lifetime: Lifetime,
    /// Per-registration overrides, keyed by registration name.
    #[serde(default)]
    pub lifetimes: HashMap<String, Lifetime>,
}

impl RegistryConfig {
    /// Creates a configuration with the default (per-scope) lifetime.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| PipelineError::config(e.to_string()))
    }

    /// Sets the default lifetime.
    #[must_use]
    pub fn with_default_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.default_lifetime = lifetime;
        self
    }

    /// Overrides the lifetime for one registration name.
    #[must_use]
    pub fn with_lifetime(mut self, name: impl Into<String>, lifetime: Lifetime) -> Self {
        self.lifetimes.insert(name.into(), lifetime);
        self
    }

    /// Returns the lifetime that applies to `name`.
    #[must_use]
    pub fn lifetime_for(&self, name: &str) -> Lifetime {
        self.lifetimes
            .get(name)
            .copied()
            .unwrap_or(self.default_lifetime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_is_per_scope() {
        let config = RegistryConfig::default();
        assert_eq!(config.default_lifetime, Lifetime::PerScope);
        assert_eq!(config.lifetime_for("anything"), Lifetime::PerScope);
    }

    #[test]
    fn test_from_json_with_overrides() {
        let config = RegistryConfig::from_json(
            r#"{"default_lifetime": "per-call", "lifetimes": {"jobs": "singleton"}}"#,
        )
        .unwrap();

        assert_eq!(config.lifetime_for("jobs"), Lifetime::Singleton);
        assert_eq!(config.lifetime_for("requests"), Lifetime::PerCall);
    }

    #[test]
    fn test_from_json_empty_object_uses_defaults() {
        let config = RegistryConfig::from_json("{}").unwrap();
        assert_eq!(config, RegistryConfig::new());
    }

    #[test]
    fn test_from_json_rejects_unknown_lifetime() {
        let err = RegistryConfig::from_json(r#"{"default_lifetime": "forever"}"#).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_lifetime_parse_and_display() {
        for lifetime in [Lifetime::PerCall, Lifetime::PerScope, Lifetime::Singleton] {
            assert_eq!(lifetime.to_string().parse::<Lifetime>().unwrap(), lifetime);
        }
        assert!("transient".parse::<Lifetime>().is_err());
    }

    #[test]
    fn test_builder_style_config() {
        let config = RegistryConfig::new()
            .with_default_lifetime(Lifetime::Singleton)
            .with_lifetime("scratch", Lifetime::PerCall);

        assert_eq!(config.lifetime_for("scratch"), Lifetime::PerCall);
        assert_eq!(config.lifetime_for("other"), Lifetime::Singleton);
        assert_eq!(
            serde_json::to_value(&config).unwrap()["default_lifetime"],
            serde_json::json!("singleton")
        );
    }
}
