//! Role model - named permission holders bound to service accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Permission;

/// Role entity. Owns permissions; reaches accounts through role bindings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_utc: now,
            updated_utc: now,
        }
    }

    /// Name of the base role provisioned for a service account.
    pub fn base_role_name(service_account_id: Uuid) -> String {
        format!("service-account:{}", service_account_id)
    }
}

/// Many-to-many association between roles and service accounts.
#[derive(Debug, Clone, FromRow)]
pub struct RoleBinding {
    pub role_id: Uuid,
    pub service_account_id: Uuid,
}

/// Role with its permissions for detailed responses.
#[derive(Debug, Clone, Serialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_role_name_embeds_account_id() {
        let id = Uuid::new_v4();
        assert_eq!(Role::base_role_name(id), format!("service-account:{}", id));
    }
}
