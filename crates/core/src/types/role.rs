//! Account roles.
//!
//! Every approved account lives in exactly one role partition of the
//! directory. The partition name in the store is the role's name.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known role.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid role '{0}' (expected one of: Admin, ContentCreator, MarketingLead, GraphicDesigner)")]
pub struct RoleError(pub String);

/// Role of an account.
///
/// Serialized with its exact name (`"ContentCreator"`), which is also the name
/// of the role's partition in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Salon administrator. Not self-registrable; created by operators.
    Admin,
    ContentCreator,
    MarketingLead,
    GraphicDesigner,
}

impl Role {
    /// Every role in directory search priority order (Admin first).
    pub const ALL: [Self; 4] = [
        Self::Admin,
        Self::ContentCreator,
        Self::MarketingLead,
        Self::GraphicDesigner,
    ];

    /// Roles a user may pick when registering, in search order.
    pub const REGISTRABLE: [Self; 3] = [
        Self::ContentCreator,
        Self::MarketingLead,
        Self::GraphicDesigner,
    ];

    /// The role's name, as stored and as sent over the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::ContentCreator => "ContentCreator",
            Self::MarketingLead => "MarketingLead",
            Self::GraphicDesigner => "GraphicDesigner",
        }
    }

    /// Name of the store node holding this role's accounts.
    #[must_use]
    pub const fn partition(&self) -> &'static str {
        self.as_str()
    }

    /// Whether users may choose this role during self-registration.
    #[must_use]
    pub const fn is_self_registrable(&self) -> bool {
        !matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| RoleError(s.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_roundtrips_every_role() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_from_str_is_exact() {
        assert!("contentcreator".parse::<Role>().is_err());
        assert!("Stylist".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn test_admin_is_not_registrable() {
        assert!(!Role::Admin.is_self_registrable());
        assert!(!Role::REGISTRABLE.contains(&Role::Admin));
        assert!(Role::REGISTRABLE.iter().all(Role::is_self_registrable));
    }

    #[test]
    fn test_search_order_starts_with_admin() {
        assert_eq!(Role::ALL.first(), Some(&Role::Admin));
    }

    #[test]
    fn test_serde_uses_partition_names() {
        let json = serde_json::to_string(&Role::GraphicDesigner).unwrap();
        assert_eq!(json, "\"GraphicDesigner\"");
        let role: Role = serde_json::from_str("\"MarketingLead\"").unwrap();
        assert_eq!(role, Role::MarketingLead);
    }
}
