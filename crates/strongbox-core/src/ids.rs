//! Identifier types and identifier-generation strategies.
//!
//! Grants are identified by a [`PermissionId`]. How a new id is minted is
//! decided by an [`IdStrategy`]: random UUIDs in normal operation, or a
//! stable hash of the grant's two foreign keys so that test runs reproduce
//! the same identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Prefix mixed into deterministic permission ids.
const PERMISSION_SEED_PREFIX: &str = "permission.id.";

/// Unique identifier for a stored permission (grant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionId(Uuid);

impl PermissionId {
    /// Creates a new random permission ID.
    ///
    /// # Examples
    ///
    /// ```
    /// use strongbox_core::PermissionId;
    ///
    /// let a = PermissionId::new();
    /// let b = PermissionId::new();
    /// assert_ne!(a, b);
    /// ```
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a permission ID from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PermissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for PermissionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for PermissionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// How new permission identifiers are generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Random UUID v4 per grant.
    #[default]
    Random,
    /// Stable hash of the ACO and ARO foreign keys.
    Deterministic,
}

impl IdStrategy {
    /// Mint an id for a new grant between `aco_foreign_key` and
    /// `aro_foreign_key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use strongbox_core::IdStrategy;
    /// use uuid::Uuid;
    ///
    /// let aco = Uuid::from_u128(1);
    /// let aro = Uuid::from_u128(2);
    /// let first = IdStrategy::Deterministic.permission_id(&aco, &aro);
    /// let again = IdStrategy::Deterministic.permission_id(&aco, &aro);
    /// assert_eq!(first, again);
    /// ```
    pub fn permission_id(&self, aco_foreign_key: &Uuid, aro_foreign_key: &Uuid) -> PermissionId {
        match self {
            IdStrategy::Random => PermissionId::new(),
            IdStrategy::Deterministic => {
                let seed =
                    format!("{PERMISSION_SEED_PREFIX}{aco_foreign_key}-{aro_foreign_key}");
                PermissionId(uuid_from_seed(&seed))
            }
        }
    }

    /// Returns the configuration name of this strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdStrategy::Random => "random",
            IdStrategy::Deterministic => "deterministic",
        }
    }
}

impl fmt::Display for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdStrategy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "random" => Ok(IdStrategy::Random),
            "deterministic" => Ok(IdStrategy::Deterministic),
            other => Err(crate::Error::config(format!(
                "unknown id strategy '{other}' (expected 'random' or 'deterministic')"
            ))),
        }
    }
}

/// Derive a well-formed UUID from an arbitrary seed string.
///
/// The first 16 bytes of the BLAKE3 digest are stamped with the RFC 4122
/// version and variant bits, so the result parses like any other UUID.
pub fn uuid_from_seed(seed: &str) -> Uuid {
    let digest = blake3::hash(seed.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest.as_bytes()[..16]);
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}
