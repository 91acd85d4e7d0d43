//! Core data types: privilege levels, object/requestor references, grants.
//!
//! ACOs (access control objects) and AROs (access control requestors) are
//! modelled as tagged unions over the closed set of model kinds, so every
//! match over them is checked for exhaustiveness.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strongbox_core::PermissionId;
use uuid::Uuid;

use crate::error::{Error, Result};

// ============================================================================
// PrivilegeLevel
// ============================================================================

/// Ordered privilege level: `None < Read < Update < Admin`.
///
/// `None` is the outcome of a check that found no applicable grant; it is
/// never stored on a grant.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PrivilegeLevel {
    /// No access.
    #[default]
    None,
    /// Can see the object and its secret.
    Read,
    /// Can modify the object.
    Update,
    /// Can modify the object and who has access to it.
    Admin,
}

impl PrivilegeLevel {
    /// Every level, lowest first.
    pub const ALL: [PrivilegeLevel; 4] = [
        PrivilegeLevel::None,
        PrivilegeLevel::Read,
        PrivilegeLevel::Update,
        PrivilegeLevel::Admin,
    ];

    /// Levels that may be stored on a grant.
    pub const GRANTABLE: [PrivilegeLevel; 3] = [
        PrivilegeLevel::Read,
        PrivilegeLevel::Update,
        PrivilegeLevel::Admin,
    ];

    /// Permission-type serial used by the persisted schema.
    pub fn serial(&self) -> u8 {
        match self {
            PrivilegeLevel::None => 0,
            PrivilegeLevel::Read => 1,
            PrivilegeLevel::Update => 7,
            PrivilegeLevel::Admin => 15,
        }
    }

    /// Look up a level by its serial.
    pub fn from_serial(serial: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.serial() == serial)
    }

    /// Lowercase display name.
    pub fn name(&self) -> &'static str {
        match self {
            PrivilegeLevel::None => "none",
            PrivilegeLevel::Read => "read",
            PrivilegeLevel::Update => "update",
            PrivilegeLevel::Admin => "admin",
        }
    }

    /// Whether this level may be stored on a grant.
    pub fn is_grantable(&self) -> bool {
        !matches!(self, PrivilegeLevel::None)
    }

    /// Whether this level satisfies `required`.
    pub fn satisfies(&self, required: PrivilegeLevel) -> bool {
        *self >= required
    }
}

impl fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PrivilegeLevel {
    type Err = Error;

    /// Accepts a level name (any case) or its numeric serial.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Ok(serial) = trimmed.parse::<u8>() {
            return Self::from_serial(serial).ok_or_else(|| Error::invalid_level(s));
        }
        match trimmed.to_lowercase().as_str() {
            "none" => Ok(PrivilegeLevel::None),
            "read" => Ok(PrivilegeLevel::Read),
            "update" => Ok(PrivilegeLevel::Update),
            "admin" | "own" => Ok(PrivilegeLevel::Admin),
            _ => Err(Error::invalid_level(s)),
        }
    }
}

/// Serial and name of a level, embedded in views when eager-loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionTypeInfo {
    /// Numeric serial.
    pub serial: u8,
    /// Display name.
    pub name: &'static str,
}

impl From<PrivilegeLevel> for PermissionTypeInfo {
    fn from(level: PrivilegeLevel) -> Self {
        Self {
            serial: level.serial(),
            name: level.name(),
        }
    }
}

// ============================================================================
// Scope and kinds
// ============================================================================

/// Which side of a grant a kind name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Access control object side.
    Aco,
    /// Access control requestor side.
    Aro,
}

impl Scope {
    /// Form field holding the kind for this scope.
    pub fn kind_field(&self) -> &'static str {
        match self {
            Scope::Aco => "aco",
            Scope::Aro => "aro",
        }
    }

    /// Form field holding the foreign key for this scope.
    pub fn foreign_key_field(&self) -> &'static str {
        match self {
            Scope::Aco => "aco_foreign_key",
            Scope::Aro => "aro_foreign_key",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Aco => write!(f, "ACO"),
            Scope::Aro => write!(f, "ARO"),
        }
    }
}

/// Model kinds an ACO can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AcoKind {
    /// A stored secret.
    Resource,
    /// A folder in the category tree.
    Category,
}

impl AcoKind {
    /// Model name as used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            AcoKind::Resource => "Resource",
            AcoKind::Category => "Category",
        }
    }

    /// Parse a model name.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "Resource" => Some(AcoKind::Resource),
            "Category" => Some(AcoKind::Category),
            _ => None,
        }
    }
}

impl fmt::Display for AcoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model kinds an ARO can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AroKind {
    /// A single user.
    User,
    /// A group of users.
    Group,
}

impl AroKind {
    /// Model name as used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            AroKind::User => "User",
            AroKind::Group => "Group",
        }
    }

    /// Parse a model name.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "User" => Some(AroKind::User),
            "Group" => Some(AroKind::Group),
            _ => None,
        }
    }
}

impl fmt::Display for AroKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// References
// ============================================================================

/// Reference to an access control object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "aco", content = "aco_foreign_key")]
pub enum Aco {
    /// A resource by id.
    Resource(Uuid),
    /// A category by id.
    Category(Uuid),
}

impl Aco {
    /// Build a reference from a kind and id.
    pub fn new(kind: AcoKind, id: Uuid) -> Self {
        match kind {
            AcoKind::Resource => Aco::Resource(id),
            AcoKind::Category => Aco::Category(id),
        }
    }

    /// The kind of object referenced.
    pub fn kind(&self) -> AcoKind {
        match self {
            Aco::Resource(_) => AcoKind::Resource,
            Aco::Category(_) => AcoKind::Category,
        }
    }

    /// The foreign key.
    pub fn id(&self) -> Uuid {
        match self {
            Aco::Resource(id) | Aco::Category(id) => *id,
        }
    }
}

impl fmt::Display for Aco {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// Reference to an access control requestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "aro", content = "aro_foreign_key")]
pub enum Aro {
    /// A user by id.
    User(Uuid),
    /// A group by id.
    Group(Uuid),
}

impl Aro {
    /// Build a reference from a kind and id.
    pub fn new(kind: AroKind, id: Uuid) -> Self {
        match kind {
            AroKind::User => Aro::User(id),
            AroKind::Group => Aro::Group(id),
        }
    }

    /// The kind of requestor referenced.
    pub fn kind(&self) -> AroKind {
        match self {
            Aro::User(_) => AroKind::User,
            Aro::Group(_) => AroKind::Group,
        }
    }

    /// The foreign key.
    pub fn id(&self) -> Uuid {
        match self {
            Aro::User(id) | Aro::Group(id) => *id,
        }
    }
}

impl fmt::Display for Aro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// Uniqueness key of a grant: one grant per (object, requestor) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GrantKey {
    /// Object side.
    pub aco: Aco,
    /// Requestor side.
    pub aro: Aro,
}

impl GrantKey {
    /// Pair an object with a requestor.
    pub fn new(aco: Aco, aro: Aro) -> Self {
        Self { aco, aro }
    }
}

impl fmt::Display for GrantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.aro, self.aco)
    }
}

// ============================================================================
// Permission
// ============================================================================

/// A stored grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Identity.
    pub id: PermissionId,
    /// Object the grant applies to.
    #[serde(flatten)]
    pub aco: Aco,
    /// Requestor the grant is given to.
    #[serde(flatten)]
    pub aro: Aro,
    /// Granted level; never `None`.
    #[serde(rename = "type")]
    pub level: PrivilegeLevel,
    /// When the grant was created.
    pub created: DateTime<Utc>,
    /// When the grant was last changed.
    pub modified: DateTime<Utc>,
    /// Who created the grant, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uuid>,
    /// Who last changed the grant, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_by: Option<Uuid>,
}

impl Permission {
    /// The grant's uniqueness key.
    pub fn key(&self) -> GrantKey {
        GrantKey::new(self.aco, self.aro)
    }
}

/// Related data to eager-load alongside permissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Contain {
    /// Embed the level's serial and name.
    pub permission_type: bool,
}

impl Contain {
    /// Load nothing extra.
    pub fn none() -> Self {
        Self::default()
    }

    /// Embed permission-type details.
    pub fn with_permission_type() -> Self {
        Self {
            permission_type: true,
        }
    }
}

/// A permission plus whatever was eager-loaded with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PermissionView {
    /// The grant itself.
    #[serde(flatten)]
    pub permission: Permission,
    /// Level details, present when requested.
    #[serde(rename = "PermissionType", skip_serializing_if = "Option::is_none")]
    pub permission_type: Option<PermissionTypeInfo>,
}

impl PermissionView {
    /// Build a view honouring `contain`.
    pub fn new(permission: Permission, contain: Contain) -> Self {
        let permission_type = contain
            .permission_type
            .then(|| PermissionTypeInfo::from(permission.level));
        Self {
            permission,
            permission_type,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // PrivilegeLevel
    // -------------------------------------------------------------------------

    #[test]
    fn test_level_total_order() {
        assert!(PrivilegeLevel::None < PrivilegeLevel::Read);
        assert!(PrivilegeLevel::Read < PrivilegeLevel::Update);
        assert!(PrivilegeLevel::Update < PrivilegeLevel::Admin);
        assert_eq!(
            PrivilegeLevel::ALL.iter().max(),
            Some(&PrivilegeLevel::Admin)
        );
    }

    #[test]
    fn test_level_serials_round_trip() {
        for level in PrivilegeLevel::ALL {
            assert_eq!(PrivilegeLevel::from_serial(level.serial()), Some(level));
        }
        assert_eq!(PrivilegeLevel::from_serial(3), None);
    }

    #[test]
    fn test_level_parse_names_and_serials() {
        assert_eq!("READ".parse::<PrivilegeLevel>().unwrap(), PrivilegeLevel::Read);
        assert_eq!("7".parse::<PrivilegeLevel>().unwrap(), PrivilegeLevel::Update);
        assert_eq!("own".parse::<PrivilegeLevel>().unwrap(), PrivilegeLevel::Admin);
        assert!(matches!(
            "write".parse::<PrivilegeLevel>(),
            Err(Error::InvalidLevel { .. })
        ));
        assert!("2".parse::<PrivilegeLevel>().is_err());
    }

    #[test]
    fn test_level_satisfies() {
        assert!(PrivilegeLevel::Admin.satisfies(PrivilegeLevel::Read));
        assert!(PrivilegeLevel::Update.satisfies(PrivilegeLevel::Update));
        assert!(!PrivilegeLevel::Read.satisfies(PrivilegeLevel::Update));
        assert!(PrivilegeLevel::None.satisfies(PrivilegeLevel::None));
    }

    #[test]
    fn test_none_is_not_grantable() {
        assert!(!PrivilegeLevel::None.is_grantable());
        assert!(PrivilegeLevel::GRANTABLE.iter().all(|l| l.is_grantable()));
    }

    // -------------------------------------------------------------------------
    // References
    // -------------------------------------------------------------------------

    #[test]
    fn test_aco_kind_and_id() {
        let id = Uuid::from_u128(9);
        let aco = Aco::new(AcoKind::Category, id);
        assert_eq!(aco, Aco::Category(id));
        assert_eq!(aco.kind(), AcoKind::Category);
        assert_eq!(aco.id(), id);
        assert_eq!(aco.to_string(), format!("Category:{id}"));
    }

    #[test]
    fn test_aro_kind_and_id() {
        let id = Uuid::from_u128(4);
        let aro = Aro::new(AroKind::Group, id);
        assert_eq!(aro.kind(), AroKind::Group);
        assert_eq!(aro.id(), id);
    }

    #[test]
    fn test_kind_parse_is_exact() {
        assert_eq!(AcoKind::parse("Resource"), Some(AcoKind::Resource));
        assert_eq!(AcoKind::parse("resource"), None);
        assert_eq!(AroKind::parse("Group"), Some(AroKind::Group));
        assert_eq!(AroKind::parse("Role"), None);
    }

    #[test]
    fn test_scope_fields() {
        assert_eq!(Scope::Aco.kind_field(), "aco");
        assert_eq!(Scope::Aro.foreign_key_field(), "aro_foreign_key");
        assert_eq!(Scope::Aco.to_string(), "ACO");
    }

    // -------------------------------------------------------------------------
    // Permission serialization
    // -------------------------------------------------------------------------

    fn sample_permission() -> Permission {
        let now = Utc::now();
        Permission {
            id: PermissionId::from_uuid(Uuid::from_u128(1)),
            aco: Aco::Resource(Uuid::from_u128(2)),
            aro: Aro::User(Uuid::from_u128(3)),
            level: PrivilegeLevel::Update,
            created: now,
            modified: now,
            created_by: None,
            modified_by: None,
        }
    }

    #[test]
    fn test_permission_serializes_with_schema_columns() {
        let json = serde_json::to_value(sample_permission()).unwrap();
        assert_eq!(json["aco"], "Resource");
        assert_eq!(json["aco_foreign_key"], Uuid::from_u128(2).to_string());
        assert_eq!(json["aro"], "User");
        assert_eq!(json["aro_foreign_key"], Uuid::from_u128(3).to_string());
        assert_eq!(json["type"], "update");
        assert!(json.get("created_by").is_none());
    }

    #[test]
    fn test_view_contains_permission_type_on_request() {
        let view = PermissionView::new(sample_permission(), Contain::with_permission_type());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["PermissionType"]["serial"], 7);
        assert_eq!(json["PermissionType"]["name"], "update");

        let bare = PermissionView::new(sample_permission(), Contain::none());
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json.get("PermissionType").is_none());
    }
}
