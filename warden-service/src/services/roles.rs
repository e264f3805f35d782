//! Role operations: thin wrappers over the store, plus the base-role guard.

use service_core::error::AppError;
use uuid::Uuid;

use super::database::Database;
use crate::models::{ListOptions, Permission, Role, RoleWithPermissions};

#[derive(Clone)]
pub struct RoleService {
    db: Database,
}

impl RoleService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a role with initial permissions and account bindings.
    pub async fn create(
        &self,
        name: &str,
        permissions: &[Permission],
        account_ids: &[Uuid],
    ) -> Result<Role, AppError> {
        let role = Role::new(name);
        self.db.create_role(&role, permissions, account_ids).await?;
        Ok(role)
    }

    pub async fn get(&self, id: Uuid) -> Result<RoleWithPermissions, AppError> {
        let role = self
            .db
            .find_role(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("role {} not found", id)))?;
        let permissions = self.db.role_permissions(id).await?;
        Ok(RoleWithPermissions { role, permissions })
    }

    /// Rename a role and optionally replace its bindings. Base roles keep
    /// their one-to-one binding: rebinding them is refused.
    pub async fn update(
        &self,
        id: Uuid,
        name: &str,
        account_ids: Option<&[Uuid]>,
    ) -> Result<(), AppError> {
        self.db
            .find_role(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("role {} not found", id)))?;

        if let Some(account_ids) = account_ids {
            if self.db.is_base_role(id).await? {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "cannot rebind a base role"
                )));
            }
            self.db.replace_role_bindings(id, account_ids).await?;
        }

        self.db.update_role_name(id, name).await
    }

    pub async fn list(&self, lo: &ListOptions) -> Result<(Vec<Role>, i64), AppError> {
        let roles = self.db.list_roles(lo).await?;
        let count = self.db.list_roles_count().await?;
        Ok((roles, count))
    }

    pub async fn search(
        &self,
        term: &str,
        lo: &ListOptions,
    ) -> Result<(Vec<Role>, i64), AppError> {
        let roles = self.db.search_roles(term, lo).await?;
        let count = self.db.search_roles_count(term).await?;
        Ok((roles, count))
    }

    /// Attach a permission to an existing role.
    pub async fn attach_permission(
        &self,
        role_id: Uuid,
        permission: &Permission,
    ) -> Result<(), AppError> {
        self.db
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("role {} not found", role_id)))?;
        self.db.insert_permission(role_id, permission).await
    }

    pub async fn permissions(&self, role_id: Uuid) -> Result<Vec<Permission>, AppError> {
        self.db.role_permissions(role_id).await
    }
}
