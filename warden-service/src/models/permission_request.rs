//! Permission request model - the request/grant/deny state machine rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{MalformedPermissionError, OwnershipLevel, Permission, ResourceHierarchy};

/// Request lifecycle. `Open` transitions exactly once to `Granted` or
/// `Denied`; both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionRequestState {
    Open,
    Granted,
    Denied,
}

impl PermissionRequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionRequestState::Open => "open",
            PermissionRequestState::Granted => "granted",
            PermissionRequestState::Denied => "denied",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(PermissionRequestState::Open),
            "granted" => Some(PermissionRequestState::Granted),
            "denied" => Some(PermissionRequestState::Denied),
            _ => None,
        }
    }
}

/// A pending or resolved ask for a permission grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub id: Uuid,
    pub service: String,
    pub ownership_level: OwnershipLevel,
    pub action: String,
    pub resource_hierarchy: ResourceHierarchy,
    pub message: String,
    pub state: PermissionRequestState,
    pub service_account_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester_picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderator_service_account_id: Option<Uuid>,
}

impl PermissionRequest {
    /// New open request for `permission` on behalf of `service_account_id`.
    pub fn open(service_account_id: Uuid, permission: &Permission, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            service: permission.service.clone(),
            ownership_level: permission.ownership_level,
            action: permission.action.clone(),
            resource_hierarchy: permission.resource_hierarchy.clone(),
            message: message.into(),
            state: PermissionRequestState::Open,
            service_account_id,
            requester_name: None,
            requester_picture: None,
            moderator_service_account_id: None,
        }
    }

    /// The requested permission as a value tuple.
    pub fn permission(&self) -> Permission {
        Permission::new(
            self.service.clone(),
            self.ownership_level,
            self.action.clone(),
            self.resource_hierarchy.as_str(),
        )
    }
}

/// Raw `permissions_requests` row joined with requester display fields.
#[derive(Debug, Clone, FromRow)]
pub struct PermissionRequestRow {
    pub id: Uuid,
    pub service: String,
    pub ownership_level: String,
    pub action: String,
    pub resource_hierarchy: String,
    pub message: String,
    pub state: String,
    pub service_account_id: Uuid,
    pub requester_name: Option<String>,
    pub requester_picture: Option<String>,
    pub moderator_service_account_id: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl TryFrom<PermissionRequestRow> for PermissionRequest {
    type Error = MalformedPermissionError;

    fn try_from(row: PermissionRequestRow) -> Result<Self, Self::Error> {
        let ownership_level =
            OwnershipLevel::parse(&row.ownership_level).ok_or(MalformedPermissionError {
                input: row.ownership_level.clone(),
            })?;
        let state = PermissionRequestState::parse(&row.state).ok_or(MalformedPermissionError {
            input: row.state.clone(),
        })?;
        Ok(PermissionRequest {
            id: row.id,
            service: row.service,
            ownership_level,
            action: row.action,
            resource_hierarchy: ResourceHierarchy::new(row.resource_hierarchy),
            message: row.message,
            state,
            service_account_id: row.service_account_id,
            requester_name: row.requester_name,
            requester_picture: row.requester_picture,
            moderator_service_account_id: row.moderator_service_account_id,
        })
    }
}
