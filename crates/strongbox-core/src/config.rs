//! Access-control configuration.
//!
//! The whitelists of permitted ACO and ARO model kinds and the identifier
//! strategy are process-wide settings. They are read once, validated, and
//! handed to the engine at construction; nothing mutates them at runtime.
//!
//! ```toml
//! id_strategy = "random"
//!
//! [registry]
//! aco_kinds = ["Resource", "Category"]
//! aro_kinds = ["User", "Group"]
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ids::IdStrategy;

/// Environment variable that overrides [`AclConfig::id_strategy`].
pub const ID_STRATEGY_ENV: &str = "STRONGBOX_ACL_ID_STRATEGY";

/// Model kinds an ACO may name.
pub const KNOWN_ACO_KINDS: &[&str] = &["Resource", "Category"];

/// Model kinds an ARO may name.
pub const KNOWN_ARO_KINDS: &[&str] = &["User", "Group"];

/// Closed sets of model kinds permitted on either side of a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Permitted ACO kinds, e.g. `Resource`, `Category`.
    pub aco_kinds: BTreeSet<String>,
    /// Permitted ARO kinds, e.g. `User`, `Group`.
    pub aro_kinds: BTreeSet<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            aco_kinds: KNOWN_ACO_KINDS.iter().map(|k| (*k).to_string()).collect(),
            aro_kinds: KNOWN_ARO_KINDS.iter().map(|k| (*k).to_string()).collect(),
        }
    }
}

impl RegistryConfig {
    /// Build a registry config from explicit kind lists.
    pub fn new<A, R, S>(aco_kinds: A, aro_kinds: R) -> Self
    where
        A: IntoIterator<Item = S>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            aco_kinds: aco_kinds.into_iter().map(Into::into).collect(),
            aro_kinds: aro_kinds.into_iter().map(Into::into).collect(),
        }
    }

    /// Reject kind names the engine has no model for.
    pub fn validate(&self) -> Result<()> {
        for kind in &self.aco_kinds {
            if !KNOWN_ACO_KINDS.contains(&kind.as_str()) {
                return Err(Error::config(format!(
                    "unknown ACO kind '{kind}' in registry.aco_kinds"
                )));
            }
        }
        for kind in &self.aro_kinds {
            if !KNOWN_ARO_KINDS.contains(&kind.as_str()) {
                return Err(Error::config(format!(
                    "unknown ARO kind '{kind}' in registry.aro_kinds"
                )));
            }
        }
        Ok(())
    }
}

/// Top-level access-control configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AclConfig {
    /// How new permission ids are minted.
    pub id_strategy: IdStrategy,
    /// Kind whitelists.
    pub registry: RegistryConfig,
}

impl AclConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AclConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, env_lookup)
    }

    /// Load a config file, then apply overrides resolved through `lookup`.
    pub fn load_with(
        path: impl AsRef<Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_overrides_from(lookup)?;
        log::debug!(
            "Loaded ACL config from {} (id strategy: {})",
            path.display(),
            config.id_strategy
        );
        Ok(config)
    }

    /// Load from `path` when given, otherwise start from defaults.
    ///
    /// Environment overrides apply in both cases.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        Self::load_or_default_with(path, env_lookup)
    }

    /// [`load_or_default`](Self::load_or_default) with an explicit override source.
    pub fn load_or_default_with(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        match path {
            Some(path) => Self::load_with(path, lookup),
            None => {
                let mut config = Self::default();
                config.apply_overrides_from(lookup)?;
                Ok(config)
            }
        }
    }

    /// Apply `STRONGBOX_ACL_ID_STRATEGY` if it is set.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(env_lookup)
    }

    /// Apply overrides whose values `lookup` returns for each variable name.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup(ID_STRATEGY_ENV) {
            self.id_strategy = value.parse()?;
            log::info!("{ID_STRATEGY_ENV} overrides id strategy: {}", self.id_strategy);
        }
        Ok(())
    }

    /// Validate the whole configuration.
    pub fn validate(&self) -> Result<()> {
        self.registry.validate()
    }

    /// Convenience: default config with deterministic ids, for tests.
    pub fn deterministic() -> Self {
        Self {
            id_strategy: IdStrategy::Deterministic,
            ..Self::default()
        }
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
