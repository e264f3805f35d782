//! Service account operations: lifecycle, authentication entry points, and
//! the authorization engine.
//!
//! `has_permission` is a pure function of the snapshot read from the store:
//! fetch the account's effective permissions, test each against the request
//! in process. Nothing is cached between calls.

use rand::RngCore;
use service_core::error::AppError;
use std::sync::Arc;
use uuid::Uuid;

use super::database::Database;
use super::oauth::Provider;
use crate::models::{ListOptions, Permission, Role, ServiceAccount};

/// Result of a successful key-pair authentication.
#[derive(Debug, Clone)]
pub struct KeyPairAuth {
    pub service_account_id: Uuid,
    pub name: String,
}

/// Result of a successful bearer authentication. `access_token` differs from
/// the presented token when the provider refreshed it.
#[derive(Debug, Clone)]
pub struct AccessTokenAuth {
    pub service_account_id: Uuid,
    pub email: String,
    pub access_token: String,
}

#[derive(Clone)]
pub struct AccountService {
    db: Database,
    provider: Arc<dyn Provider>,
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

impl AccountService {
    pub fn new(db: Database, provider: Arc<dyn Provider>) -> Self {
        Self { db, provider }
    }

    // ==================== Lifecycle ====================

    /// Create an OAuth2-type account. Provisions the base role and binding
    /// atomically with the account row.
    pub async fn create_oauth2_type(
        &self,
        name: &str,
        email: &str,
        picture: Option<String>,
    ) -> Result<ServiceAccount, AppError> {
        self.create_with_permissions(name, Some(email), picture, &[])
            .await
    }

    /// Create a key-pair-type account. The generated secret is returned on
    /// the account and shown exactly once by the caller.
    pub async fn create_key_pair_type(&self, name: &str) -> Result<ServiceAccount, AppError> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();
        let account = ServiceAccount {
            id,
            name: name.to_string(),
            email: None,
            key_id: Some(random_hex(16)),
            key_secret: Some(random_hex(32)),
            picture: None,
            base_role_id: Uuid::new_v4(),
            created_utc: now,
            updated_utc: now,
        };
        self.db.create_account(&account, &[]).await?;
        Ok(account)
    }

    /// Create an account with initial permissions on its base role.
    pub async fn create_with_permissions(
        &self,
        name: &str,
        email: Option<&str>,
        picture: Option<String>,
        permissions: &[Permission],
    ) -> Result<ServiceAccount, AppError> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();
        let account = ServiceAccount {
            id,
            name: name.to_string(),
            email: email.map(String::from),
            key_id: None,
            key_secret: None,
            picture,
            base_role_id: Uuid::new_v4(),
            created_utc: now,
            updated_utc: now,
        };
        self.db.create_account(&account, permissions).await?;
        Ok(account)
    }

    pub async fn get(&self, id: Uuid) -> Result<ServiceAccount, AppError> {
        self.db
            .find_account(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("service account {} not found", id)))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<ServiceAccount>, AppError> {
        self.db.find_account_by_email(email).await
    }

    pub async fn update(&self, account: &ServiceAccount) -> Result<(), AppError> {
        // Existence check keeps a blind UPDATE from silently doing nothing.
        self.get(account.id).await?;
        self.db.update_account(account).await
    }

    pub async fn list(&self, lo: &ListOptions) -> Result<(Vec<ServiceAccount>, i64), AppError> {
        let accounts = self.db.list_accounts(lo).await?;
        let count = self.db.list_accounts_count().await?;
        Ok((accounts, count))
    }

    pub async fn search(
        &self,
        term: &str,
        lo: &ListOptions,
    ) -> Result<(Vec<ServiceAccount>, i64), AppError> {
        let accounts = self.db.search_accounts(term, lo).await?;
        let count = self.db.search_accounts_count(term).await?;
        Ok((accounts, count))
    }

    /// Remove every binding except the base role's.
    pub async fn drop_bindings(&self, account_id: Uuid) -> Result<(), AppError> {
        self.get(account_id).await?;
        self.db.drop_bindings(account_id).await
    }

    pub async fn get_roles(&self, account_id: Uuid) -> Result<Vec<Role>, AppError> {
        self.db.account_roles(account_id).await
    }

    /// All permissions the account effectively holds.
    pub async fn get_permissions(&self, account_id: Uuid) -> Result<Vec<Permission>, AppError> {
        self.db.effective_permissions(account_id).await
    }

    /// Attach a permission to the account's base role.
    pub async fn create_permission(
        &self,
        account_id: Uuid,
        permission: &Permission,
    ) -> Result<(), AppError> {
        let account = self.get(account_id).await?;
        self.db
            .insert_permission(account.base_role_id, permission)
            .await
    }

    /// Attach one permission to many accounts' base roles.
    pub async fn attribute_permission(
        &self,
        account_ids: &[Uuid],
        permission: &Permission,
    ) -> Result<(), AppError> {
        for account_id in account_ids {
            self.create_permission(*account_id, permission).await?;
        }
        Ok(())
    }

    // ==================== Authorization Engine ====================

    /// Whether the account effectively holds `requested`.
    pub async fn has_permission(
        &self,
        account_id: Uuid,
        requested: &Permission,
    ) -> Result<bool, AppError> {
        let effective = self.db.effective_permissions(account_id).await?;
        Ok(effective.iter().any(|p| p.covers(requested)))
    }

    /// Parse-then-check convenience; malformed strings surface as 422
    /// before any authorization decision is attempted.
    pub async fn has_permission_str(
        &self,
        account_id: Uuid,
        permission: &str,
    ) -> Result<bool, AppError> {
        let requested = Permission::parse(permission)?;
        self.has_permission(account_id, &requested).await
    }

    /// Accounts holding a permission matching `requested`, ordered by name,
    /// with the parallel total count.
    pub async fn list_with_permission(
        &self,
        lo: &ListOptions,
        requested: &Permission,
    ) -> Result<(Vec<ServiceAccount>, i64), AppError> {
        let accounts = self.db.accounts_with_permission(lo, requested).await?;
        let count = self.db.accounts_with_permission_count(requested).await?;
        Ok((accounts, count))
    }

    // ==================== Authentication ====================

    /// Resolve a key pair to an identity.
    pub async fn authenticate_key_pair(
        &self,
        key_id: &str,
        key_secret: &str,
    ) -> Result<KeyPairAuth, AppError> {
        let account = self
            .db
            .find_account_by_key_pair(key_id, key_secret)
            .await?
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("invalid key pair")))?;
        Ok(KeyPairAuth {
            service_account_id: account.id,
            name: account.name,
        })
    }

    /// Resolve a bearer token to an identity via the OAuth2 provider.
    pub async fn authenticate_access_token(
        &self,
        access_token: &str,
    ) -> Result<AccessTokenAuth, AppError> {
        let auth = self.provider.authenticate(access_token).await?;
        let account = self
            .db
            .find_account_by_email(&auth.email)
            .await?
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!(
                    "no service account for email {}",
                    auth.email
                ))
            })?;
        Ok(AccessTokenAuth {
            service_account_id: account.id,
            email: auth.email,
            access_token: auth.access_token,
        })
    }
}
