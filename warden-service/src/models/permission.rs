//! Permission model - the wildcard/hierarchy-aware permission tuple.
//!
//! A permission serializes as `Service::OwnershipLevel::Action::Seg1::Seg2...`
//! where everything after the third `::` is the resource hierarchy. Matching
//! is done entirely in process: a stored permission covers a requested one
//! when service and action match (either exactly or by `*`), the ownership
//! rule holds, and the stored hierarchy is one of the requested hierarchy's
//! ancestor patterns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

/// Wildcard token accepted for service, action, and hierarchy segments.
pub const WILDCARD: &str = "*";

/// Service name under which warden's own route-guard permissions live.
pub const WARDEN_SERVICE: &str = "Warden";

/// Raised when a permission string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Incomplete permission. Expected format: Service::OwnershipLevel::Action::{{ResourceHierarchy}}")]
pub struct MalformedPermissionError {
    pub input: String,
}

impl From<MalformedPermissionError> for service_core::error::AppError {
    fn from(err: MalformedPermissionError) -> Self {
        service_core::error::AppError::Validation(anyhow::Error::new(err))
    }
}

/// Strength of a grant. Owner can moderate/delegate, Lender is usage-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnershipLevel {
    #[serde(rename = "RO")]
    Owner,
    #[serde(rename = "RL")]
    Lender,
}

impl OwnershipLevel {
    /// Wire token as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnershipLevel::Owner => "RO",
            OwnershipLevel::Lender => "RL",
        }
    }

    /// Case-insensitive parse of the wire token or the spelled-out name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ro" | "owner" => Some(OwnershipLevel::Owner),
            "rl" | "lender" => Some(OwnershipLevel::Lender),
            _ => None,
        }
    }
}

impl std::fmt::Display for OwnershipLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered path of scope segments. A trailing `*` means "this segment and
/// everything beneath it".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceHierarchy(String);

impl ResourceHierarchy {
    pub fn new(s: impl Into<String>) -> Self {
        ResourceHierarchy(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Every stored pattern that would legitimately cover this hierarchy,
    /// from most specific to the universal wildcard: the hierarchy itself,
    /// each truncated prefix suffixed with `::*` (bare `*` at the empty
    /// truncation), and `*`. Deduplicated.
    pub fn ancestor_matches(&self) -> Vec<String> {
        let segments: Vec<&str> = self.0.split("::").collect();
        let concrete_len = if segments.last() == Some(&WILDCARD) {
            segments.len() - 1
        } else {
            segments.len()
        };

        let mut matches = vec![self.0.clone()];
        for k in (0..concrete_len).rev() {
            let pattern = if k == 0 {
                WILDCARD.to_string()
            } else {
                format!("{}::{}", segments[..k].join("::"), WILDCARD)
            };
            if !matches.contains(&pattern) {
                matches.push(pattern);
            }
        }
        if !matches.contains(&WILDCARD.to_string()) {
            matches.push(WILDCARD.to_string());
        }
        matches
    }
}

impl std::fmt::Display for ResourceHierarchy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Permission tuple. `id`/`role_id` are set only for persisted rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_id: Option<Uuid>,
    pub service: String,
    pub ownership_level: OwnershipLevel,
    pub action: String,
    pub resource_hierarchy: ResourceHierarchy,
}

impl Permission {
    pub fn new(
        service: impl Into<String>,
        ownership_level: OwnershipLevel,
        action: impl Into<String>,
        resource_hierarchy: impl Into<String>,
    ) -> Self {
        Permission {
            id: None,
            role_id: None,
            service: service.into(),
            ownership_level,
            action: action.into(),
            resource_hierarchy: ResourceHierarchy::new(resource_hierarchy),
        }
    }

    /// Parse the canonical `Service::OwnershipLevel::Action::Hierarchy` form.
    pub fn parse(s: &str) -> Result<Self, MalformedPermissionError> {
        let malformed = || MalformedPermissionError {
            input: s.to_string(),
        };
        let parts: Vec<&str> = s.split("::").collect();
        if parts.len() < 4 {
            return Err(malformed());
        }
        let (service, level, action) = (parts[0], parts[1], parts[2]);
        if service.is_empty() || level.is_empty() || action.is_empty() {
            return Err(malformed());
        }
        let ownership_level = OwnershipLevel::parse(level).ok_or_else(malformed)?;
        let hierarchy = parts[3..].join("::");
        if hierarchy.is_empty() {
            return Err(malformed());
        }
        Ok(Permission::new(service, ownership_level, action, hierarchy))
    }

    /// Parse a batch of permission strings, failing on the first bad one.
    pub fn parse_many(strings: &[String]) -> Result<Vec<Permission>, MalformedPermissionError> {
        strings.iter().map(|s| Permission::parse(s)).collect()
    }

    /// Whether this (stored) permission covers `requested`.
    ///
    /// Owner strictly subsumes Lender; Lender never subsumes Owner. The
    /// hierarchy test is membership of this permission's hierarchy in the
    /// requested hierarchy's ancestor set, so broad stored scopes cover
    /// narrower requests but never the reverse.
    pub fn covers(&self, requested: &Permission) -> bool {
        if self.service != WILDCARD && self.service != requested.service {
            return false;
        }
        if self.action != WILDCARD && self.action != requested.action {
            return false;
        }
        if requested.ownership_level == OwnershipLevel::Owner
            && self.ownership_level != OwnershipLevel::Owner
        {
            return false;
        }
        requested
            .resource_hierarchy
            .ancestor_matches()
            .iter()
            .any(|m| m == self.resource_hierarchy.as_str())
    }

    /// Same permission with ownership coerced to Owner, as required when
    /// checking moderation authority over a requested scope.
    pub fn as_owner(&self) -> Permission {
        let mut p = self.clone();
        p.ownership_level = OwnershipLevel::Owner;
        p
    }

    /// Lender-level guard permission under warden's own namespace.
    pub fn warden_lender(action: &str, resource_hierarchy: &str) -> Permission {
        Permission::new(
            WARDEN_SERVICE,
            OwnershipLevel::Lender,
            action,
            resource_hierarchy,
        )
    }

    /// Owner-level guard permission under warden's own namespace.
    pub fn warden_owner(action: &str, resource_hierarchy: &str) -> Permission {
        Permission::new(
            WARDEN_SERVICE,
            OwnershipLevel::Owner,
            action,
            resource_hierarchy,
        )
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}::{}::{}::{}",
            self.service, self.ownership_level, self.action, self.resource_hierarchy
        )
    }
}

/// Raw `permissions` row; ownership level is decoded after the fetch.
#[derive(Debug, Clone, FromRow)]
pub struct PermissionRow {
    pub id: Uuid,
    pub role_id: Uuid,
    pub service: String,
    pub ownership_level: String,
    pub action: String,
    pub resource_hierarchy: String,
    pub created_utc: DateTime<Utc>,
}

impl TryFrom<PermissionRow> for Permission {
    type Error = MalformedPermissionError;

    fn try_from(row: PermissionRow) -> Result<Self, Self::Error> {
        let ownership_level =
            OwnershipLevel::parse(&row.ownership_level).ok_or(MalformedPermissionError {
                input: row.ownership_level.clone(),
            })?;
        Ok(Permission {
            id: Some(row.id),
            role_id: Some(row.role_id),
            service: row.service,
            ownership_level,
            action: row.action,
            resource_hierarchy: ResourceHierarchy::new(row.resource_hierarchy),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_permission() {
        let p = Permission::parse("Service1::RO::Do1::x::y::z").unwrap();
        assert_eq!(p.service, "Service1");
        assert_eq!(p.ownership_level, OwnershipLevel::Owner);
        assert_eq!(p.action, "Do1");
        assert_eq!(p.resource_hierarchy.as_str(), "x::y::z");
    }

    #[test]
    fn test_parse_accepts_spelled_out_ownership() {
        let p = Permission::parse("Service1::Lender::Do1::x").unwrap();
        assert_eq!(p.ownership_level, OwnershipLevel::Lender);
        let p = Permission::parse("Service1::owner::Do1::x").unwrap();
        assert_eq!(p.ownership_level, OwnershipLevel::Owner);
    }

    #[test]
    fn test_parse_rejects_incomplete() {
        assert!(Permission::parse("").is_err());
        assert!(Permission::parse("X").is_err());
        assert!(Permission::parse("Service::RO::Action").is_err());
        assert!(Permission::parse("::RO::Action::x").is_err());
        assert!(Permission::parse("Service::::Action::x").is_err());
        assert!(Permission::parse("Service::RO::::x").is_err());
        assert!(Permission::parse("Service::RO::Action::").is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_ownership_level() {
        assert!(Permission::parse("Service::RW::Action::x").is_err());
    }

    #[test]
    fn test_display_round_trips() {
        let s = "Service1::RL::Do1::x::*";
        assert_eq!(Permission::parse(s).unwrap().to_string(), s);
    }

    #[test]
    fn test_ancestor_matches_concrete_hierarchy() {
        let rh = ResourceHierarchy::new("x::y::z");
        assert_eq!(
            rh.ancestor_matches(),
            vec!["x::y::z", "x::y::*", "x::*", "*"]
        );
    }

    #[test]
    fn test_ancestor_matches_wildcard_tail() {
        let rh = ResourceHierarchy::new("x::y::*");
        assert_eq!(rh.ancestor_matches(), vec!["x::y::*", "x::*", "*"]);
    }

    #[test]
    fn test_ancestor_matches_single_segment() {
        let rh = ResourceHierarchy::new("x");
        assert_eq!(rh.ancestor_matches(), vec!["x", "*"]);
    }

    #[test]
    fn test_ancestor_matches_bare_wildcard() {
        let rh = ResourceHierarchy::new("*");
        assert_eq!(rh.ancestor_matches(), vec!["*"]);
    }

    #[test]
    fn test_ancestor_matches_always_contains_self_and_star() {
        for rh in ["a", "a::b", "a::b::c::d", "a::*", "*"] {
            let matches = ResourceHierarchy::new(rh).ancestor_matches();
            assert!(matches.contains(&rh.to_string()), "missing self for {rh}");
            assert!(matches.contains(&"*".to_string()), "missing * for {rh}");
        }
    }

    fn covers(stored: &str, requested: &str) -> bool {
        Permission::parse(stored)
            .unwrap()
            .covers(&Permission::parse(requested).unwrap())
    }

    #[test]
    fn test_covers_exact_match() {
        assert!(covers("Service1::RL::Do1::x::*", "Service1::RL::Do1::x::*"));
    }

    #[test]
    fn test_covers_rejects_different_service() {
        assert!(!covers("Service1::RL::Do1::x::*", "Service2::RL::Do1::x::*"));
    }

    #[test]
    fn test_covers_rejects_different_action() {
        assert!(!covers("Service1::RL::Do2::x::*", "Service1::RL::Do1::x::*"));
    }

    #[test]
    fn test_covers_wildcard_service() {
        assert!(covers("*::RL::Do1::x::*", "Service1::RL::Do1::x::*"));
    }

    #[test]
    fn test_covers_wildcard_action() {
        assert!(covers("Service1::RL::*::x::*", "Service1::RL::Do1::x::*"));
    }

    #[test]
    fn test_covers_broader_hierarchy() {
        assert!(covers("Service1::RL::Do1::*", "Service1::RL::Do1::x::*"));
        assert!(covers("Service1::RL::Do1::x::*", "Service1::RL::Do1::x::z"));
    }

    #[test]
    fn test_covers_narrowing_not_widening() {
        assert!(covers("Service1::RL::Do1::x::y::*", "Service1::RL::Do1::x::y::z"));
        assert!(!covers("Service1::RL::Do1::x::y::z", "Service1::RL::Do1::x::y::*"));
        assert!(!covers("Service1::RL::Do1::x::y::z", "Service1::RL::Do1::x::*"));
        assert!(!covers("Service1::RL::Do1::x::y", "Service1::RL::Do1::x::z"));
    }

    #[test]
    fn test_covers_owner_strictness() {
        // Lender grant never satisfies an Owner request.
        assert!(!covers("Service1::RL::Do1::x::*", "Service1::RO::Do1::x::*"));
        // Owner grant satisfies both levels.
        assert!(covers("Service1::RO::Do1::*", "Service1::RL::Do1::x::*"));
        assert!(covers("Service1::RO::Do1::x::*", "Service1::RL::Do1::x::*"));
        assert!(!covers("Service1::RO::Do1::y::*", "Service1::RL::Do1::x::*"));
    }

    #[test]
    fn test_root_permission_covers_everything() {
        for requested in [
            "Service1::RO::Do1::x::y::z",
            "Other::RL::Anything::*",
            "*::RO::*::*",
        ] {
            assert!(covers("*::RO::*::*", requested));
        }
    }

    #[test]
    fn test_as_owner_coercion() {
        let p = Permission::parse("Service1::RL::Do1::x").unwrap();
        assert_eq!(p.as_owner().ownership_level, OwnershipLevel::Owner);
        assert_eq!(p.as_owner().service, "Service1");
    }
}
