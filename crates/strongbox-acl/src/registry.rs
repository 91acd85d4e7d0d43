//! Identifier and type registry.
//!
//! Decides whether a model kind may appear on either side of a grant and
//! whether a level may be stored. Every check is pure and fails closed:
//! anything unknown is simply not valid.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strongbox_core::RegistryConfig;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{Aco, AcoKind, Aro, AroKind, PrivilegeLevel, Scope};

/// Whitelists of permitted ACO and ARO kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindRegistry {
    aco_kinds: BTreeSet<String>,
    aro_kinds: BTreeSet<String>,
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl KindRegistry {
    /// Build a registry from configuration.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            aco_kinds: config.aco_kinds,
            aro_kinds: config.aro_kinds,
        }
    }

    /// Whether `kind` is a permitted model name for `scope`.
    pub fn is_valid_kind(&self, scope: Scope, kind: &str) -> bool {
        match scope {
            Scope::Aco => self.aco_kinds.contains(kind),
            Scope::Aro => self.aro_kinds.contains(kind),
        }
    }

    /// Whether ACO kind `kind` is enabled.
    pub fn is_valid_aco(&self, kind: AcoKind) -> bool {
        self.is_valid_kind(Scope::Aco, kind.as_str())
    }

    /// Whether ARO kind `kind` is enabled.
    pub fn is_valid_aro(&self, kind: AroKind) -> bool {
        self.is_valid_kind(Scope::Aro, kind.as_str())
    }

    /// Whether `level` may be stored on a grant.
    pub fn is_valid_level(&self, level: PrivilegeLevel) -> bool {
        level.is_grantable()
    }

    /// Whether `level` (name or serial) names a storable level.
    pub fn is_valid_level_name(&self, level: &str) -> bool {
        level
            .parse::<PrivilegeLevel>()
            .is_ok_and(|parsed| self.is_valid_level(parsed))
    }

    /// Whether `serial` is the serial of a storable level.
    pub fn is_valid_serial(&self, serial: u8) -> bool {
        PrivilegeLevel::from_serial(serial).is_some_and(|level| self.is_valid_level(level))
    }

    /// Check a typed object reference against the whitelist.
    pub fn check_aco(&self, aco: &Aco) -> Result<()> {
        if self.is_valid_aco(aco.kind()) {
            Ok(())
        } else {
            Err(Error::invalid_kind(Scope::Aco, aco.kind().as_str()))
        }
    }

    /// Check a typed requestor reference against the whitelist.
    pub fn check_aro(&self, aro: &Aro) -> Result<()> {
        if self.is_valid_aro(aro.kind()) {
            Ok(())
        } else {
            Err(Error::invalid_kind(Scope::Aro, aro.kind().as_str()))
        }
    }

    /// Check that a level may be stored.
    pub fn check_level(&self, level: PrivilegeLevel) -> Result<()> {
        if self.is_valid_level(level) {
            Ok(())
        } else {
            Err(Error::invalid_level(level))
        }
    }

    /// Parse an untyped object reference.
    pub fn parse_aco(&self, kind: &str, foreign_key: &str) -> Result<Aco> {
        let parsed = AcoKind::parse(kind)
            .filter(|k| self.is_valid_aco(*k))
            .ok_or_else(|| Error::invalid_kind(Scope::Aco, kind))?;
        let id = parse_foreign_key(Scope::Aco, foreign_key)?;
        Ok(Aco::new(parsed, id))
    }

    /// Parse an untyped requestor reference.
    pub fn parse_aro(&self, kind: &str, foreign_key: &str) -> Result<Aro> {
        let parsed = AroKind::parse(kind)
            .filter(|k| self.is_valid_aro(*k))
            .ok_or_else(|| Error::invalid_kind(Scope::Aro, kind))?;
        let id = parse_foreign_key(Scope::Aro, foreign_key)?;
        Ok(Aro::new(parsed, id))
    }

    /// Parse a storable level from a name or serial.
    pub fn parse_level(&self, level: &str) -> Result<PrivilegeLevel> {
        let parsed: PrivilegeLevel = level.parse()?;
        if self.is_valid_level(parsed) {
            Ok(parsed)
        } else {
            Err(Error::invalid_level(level))
        }
    }

    /// Validate a raw request in field order, returning the typed grant.
    pub fn parse_request(&self, request: &PermissionRequest) -> Result<ParsedRequest> {
        let aco = self.parse_aco(&request.aco, &request.aco_foreign_key)?;
        let aro = self.parse_aro(&request.aro, &request.aro_foreign_key)?;
        let level = self.parse_level(&request.level)?;
        Ok(ParsedRequest { aco, aro, level })
    }
}

fn parse_foreign_key(scope: Scope, value: &str) -> Result<Uuid> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidForeignKey {
            field: scope.foreign_key_field(),
            value: value.to_string(),
        });
    }
    Uuid::parse_str(trimmed).map_err(|_| Error::InvalidForeignKey {
        field: scope.foreign_key_field(),
        value: value.to_string(),
    })
}

/// Untyped grant request, as submitted by a form or API caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequest {
    /// ACO model name.
    pub aco: String,
    /// ACO id.
    pub aco_foreign_key: String,
    /// ARO model name.
    pub aro: String,
    /// ARO id.
    pub aro_foreign_key: String,
    /// Level name or serial.
    #[serde(rename = "type")]
    pub level: String,
}

/// A request that passed registry validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedRequest {
    /// Object side.
    pub aco: Aco,
    /// Requestor side.
    pub aro: Aro,
    /// Storable level.
    pub level: PrivilegeLevel,
}
