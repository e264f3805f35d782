//! PostgreSQL store for identities, roles, bindings, permissions, and
//! permission requests.
//!
//! Matching logic does not live here: queries only fetch rows or test
//! membership of precomputed ancestor patterns (`resource_hierarchy =
//! ANY(...)`), so the authorization algorithm stays in process and
//! unit-testable. Multi-step writes run inside a single transaction.

use service_core::error::AppError;
use sqlx::postgres::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{
    ListOptions, Permission, PermissionRequest, PermissionRequestRow, PermissionRequestState,
    PermissionRow, Role, ServiceAccount, Token,
};

const ACCOUNT_COLUMNS: &str =
    "id, name, email, key_id, key_secret, picture, base_role_id, created_utc, updated_utc";

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

fn db_err(e: impl std::fmt::Display) -> AppError {
    AppError::Database(anyhow::anyhow!("{}", e))
}

fn permission_from_row(row: PermissionRow) -> Result<Permission, AppError> {
    Permission::try_from(row).map_err(|e| AppError::Database(anyhow::Error::new(e)))
}

fn request_from_row(row: PermissionRequestRow) -> Result<PermissionRequest, AppError> {
    PermissionRequest::try_from(row).map_err(|e| AppError::Database(anyhow::Error::new(e)))
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check - ping the database.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                db_err(e)
            })?;
        Ok(())
    }

    // ==================== Service Account Operations ====================

    /// Find service account by ID.
    pub async fn find_account(&self, id: Uuid) -> Result<Option<ServiceAccount>, AppError> {
        sqlx::query_as::<_, ServiceAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM service_accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Find service account by ID inside an open transaction.
    pub async fn find_account_tx(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<ServiceAccount>, AppError> {
        sqlx::query_as::<_, ServiceAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM service_accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(db_err)
    }

    /// Find service account by email (OAuth2 identities).
    pub async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ServiceAccount>, AppError> {
        sqlx::query_as::<_, ServiceAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM service_accounts WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Find service account by key pair (key-pair identities).
    pub async fn find_account_by_key_pair(
        &self,
        key_id: &str,
        key_secret: &str,
    ) -> Result<Option<ServiceAccount>, AppError> {
        sqlx::query_as::<_, ServiceAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM service_accounts WHERE key_id = $1 AND key_secret = $2"
        ))
        .bind(key_id)
        .bind(key_secret)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Create a service account with its base role and binding, plus any
    /// initial permissions on the base role, atomically.
    pub async fn create_account(
        &self,
        account: &ServiceAccount,
        permissions: &[Permission],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("INSERT INTO roles (id, name, created_utc, updated_utc) VALUES ($1, $2, now(), now())")
            .bind(account.base_role_id)
            .bind(Role::base_role_name(account.id))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        sqlx::query(
            r#"
            INSERT INTO service_accounts (id, name, email, key_id, key_secret, picture, base_role_id, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, now(), now())
            "#,
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.key_id)
        .bind(&account.key_secret)
        .bind(&account.picture)
        .bind(account.base_role_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query("INSERT INTO role_bindings (role_id, service_account_id) VALUES ($1, $2)")
            .bind(account.base_role_id)
            .bind(account.id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for permission in permissions {
            Self::insert_permission_tx(&mut *tx, account.base_role_id, permission).await?;
        }

        tx.commit().await.map_err(db_err)
    }

    /// Update mutable service account fields.
    pub async fn update_account(&self, account: &ServiceAccount) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE service_accounts
            SET name = $1, email = $2, key_id = $3, key_secret = $4, picture = $5, updated_utc = now()
            WHERE id = $6
            "#,
        )
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.key_id)
        .bind(&account.key_secret)
        .bind(&account.picture)
        .bind(account.id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// List service accounts ordered by name.
    pub async fn list_accounts(&self, lo: &ListOptions) -> Result<Vec<ServiceAccount>, AppError> {
        sqlx::query_as::<_, ServiceAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM service_accounts ORDER BY name ASC LIMIT $1 OFFSET $2"
        ))
        .bind(lo.limit())
        .bind(lo.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn list_accounts_count(&self) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT count(*) FROM service_accounts")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Search service accounts by name or email fragment.
    pub async fn search_accounts(
        &self,
        term: &str,
        lo: &ListOptions,
    ) -> Result<Vec<ServiceAccount>, AppError> {
        sqlx::query_as::<_, ServiceAccount>(&format!(
            r#"
            SELECT {ACCOUNT_COLUMNS} FROM service_accounts
            WHERE name ILIKE $1 OR email ILIKE $1
            ORDER BY name ASC LIMIT $2 OFFSET $3
            "#
        ))
        .bind(format!("%{}%", term))
        .bind(lo.limit())
        .bind(lo.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn search_accounts_count(&self, term: &str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM service_accounts WHERE name ILIKE $1 OR email ILIKE $1",
        )
        .bind(format!("%{}%", term))
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Delete every role binding for an account except its base role.
    pub async fn drop_bindings(&self, account_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            DELETE FROM role_bindings
            WHERE service_account_id = $1
              AND role_id <> (SELECT base_role_id FROM service_accounts WHERE id = $1)
            "#,
        )
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    // ==================== Permission Operations ====================

    /// Every stored permission bound to any role reachable from the account.
    pub async fn effective_permissions(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<Permission>, AppError> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, role_id, service, ownership_level, action, resource_hierarchy, created_utc
            FROM permissions
            WHERE role_id IN (SELECT role_id FROM role_bindings WHERE service_account_id = $1)
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(permission_from_row).collect()
    }

    /// Transaction-scoped variant of [`Database::effective_permissions`].
    pub async fn effective_permissions_tx(
        conn: &mut PgConnection,
        account_id: Uuid,
    ) -> Result<Vec<Permission>, AppError> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, role_id, service, ownership_level, action, resource_hierarchy, created_utc
            FROM permissions
            WHERE role_id IN (SELECT role_id FROM role_bindings WHERE service_account_id = $1)
            "#,
        )
        .bind(account_id)
        .fetch_all(conn)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(permission_from_row).collect()
    }

    pub async fn find_permission(&self, id: Uuid) -> Result<Option<Permission>, AppError> {
        let row = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, role_id, service, ownership_level, action, resource_hierarchy, created_utc
            FROM permissions WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(permission_from_row).transpose()
    }

    /// Attach a permission to a role; a second identical attach is a no-op.
    pub async fn insert_permission(
        &self,
        role_id: Uuid,
        permission: &Permission,
    ) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        Self::insert_permission_tx(&mut conn, role_id, permission).await
    }

    /// Transaction-scoped permission insert.
    pub async fn insert_permission_tx(
        conn: &mut PgConnection,
        role_id: Uuid,
        permission: &Permission,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO permissions (id, role_id, service, ownership_level, action, resource_hierarchy, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, now())
            ON CONFLICT (role_id, service, ownership_level, action, resource_hierarchy) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(role_id)
        .bind(&permission.service)
        .bind(permission.ownership_level.as_str())
        .bind(&permission.action)
        .bind(permission.resource_hierarchy.as_str())
        .execute(conn)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn delete_permission(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Accounts holding at least one stored permission matching `permission`
    /// under the subsumption rule, ordered by name. The hierarchy test is
    /// membership of the stored pattern in the request's ancestor set.
    pub async fn accounts_with_permission(
        &self,
        lo: &ListOptions,
        permission: &Permission,
    ) -> Result<Vec<ServiceAccount>, AppError> {
        let matches = permission.resource_hierarchy.ancestor_matches();
        sqlx::query_as::<_, ServiceAccount>(&format!(
            r#"
            SELECT DISTINCT sas.id, sas.name, sas.email, sas.key_id, sas.key_secret,
                   sas.picture, sas.base_role_id, sas.created_utc, sas.updated_utc
            FROM service_accounts sas
            INNER JOIN role_bindings rb ON rb.service_account_id = sas.id
            WHERE rb.role_id IN (
                SELECT DISTINCT role_id FROM permissions
                WHERE (service = $1 OR service = '{w}') AND (action = $2 OR action = '{w}')
                AND CASE WHEN $3 = 'RO' THEN ownership_level = 'RO' ELSE TRUE END
                AND resource_hierarchy = ANY($4)
            )
            ORDER BY sas.name ASC LIMIT $5 OFFSET $6
            "#,
            w = crate::models::WILDCARD
        ))
        .bind(&permission.service)
        .bind(&permission.action)
        .bind(permission.ownership_level.as_str())
        .bind(&matches)
        .bind(lo.limit())
        .bind(lo.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn accounts_with_permission_count(
        &self,
        permission: &Permission,
    ) -> Result<i64, AppError> {
        let matches = permission.resource_hierarchy.ancestor_matches();
        sqlx::query_scalar::<_, i64>(&format!(
            r#"
            SELECT count(DISTINCT sas.id)
            FROM service_accounts sas
            INNER JOIN role_bindings rb ON rb.service_account_id = sas.id
            WHERE rb.role_id IN (
                SELECT DISTINCT role_id FROM permissions
                WHERE (service = $1 OR service = '{w}') AND (action = $2 OR action = '{w}')
                AND CASE WHEN $3 = 'RO' THEN ownership_level = 'RO' ELSE TRUE END
                AND resource_hierarchy = ANY($4)
            )
            "#,
            w = crate::models::WILDCARD
        ))
        .bind(&permission.service)
        .bind(&permission.action)
        .bind(permission.ownership_level.as_str())
        .bind(&matches)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    // ==================== Role Operations ====================

    pub async fn find_role(&self, id: Uuid) -> Result<Option<Role>, AppError> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Create a role with permissions and account bindings atomically.
    pub async fn create_role(
        &self,
        role: &Role,
        permissions: &[Permission],
        account_ids: &[Uuid],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("INSERT INTO roles (id, name, created_utc, updated_utc) VALUES ($1, $2, now(), now())")
            .bind(role.id)
            .bind(&role.name)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for permission in permissions {
            Self::insert_permission_tx(&mut *tx, role.id, permission).await?;
        }

        for account_id in account_ids {
            sqlx::query(
                "INSERT INTO role_bindings (role_id, service_account_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(role.id)
            .bind(account_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)
    }

    pub async fn update_role_name(&self, id: Uuid, name: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE roles SET name = $1, updated_utc = now() WHERE id = $2")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Replace all bindings of a role with the given accounts, atomically.
    pub async fn replace_role_bindings(
        &self,
        role_id: Uuid,
        account_ids: &[Uuid],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("DELETE FROM role_bindings WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for account_id in account_ids {
            sqlx::query(
                "INSERT INTO role_bindings (role_id, service_account_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(role_id)
            .bind(account_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)
    }

    /// Bind a role to an account; already-bound is a no-op.
    pub async fn bind_role(&self, role_id: Uuid, account_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO role_bindings (role_id, service_account_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(role_id)
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn list_roles(&self, lo: &ListOptions) -> Result<Vec<Role>, AppError> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY name ASC LIMIT $1 OFFSET $2")
            .bind(lo.limit())
            .bind(lo.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn list_roles_count(&self) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT count(*) FROM roles")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    pub async fn search_roles(
        &self,
        term: &str,
        lo: &ListOptions,
    ) -> Result<Vec<Role>, AppError> {
        sqlx::query_as::<_, Role>(
            "SELECT * FROM roles WHERE name ILIKE $1 ORDER BY name ASC LIMIT $2 OFFSET $3",
        )
        .bind(format!("%{}%", term))
        .bind(lo.limit())
        .bind(lo.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn search_roles_count(&self, term: &str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT count(*) FROM roles WHERE name ILIKE $1")
            .bind(format!("%{}%", term))
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Permissions attached directly to a role.
    pub async fn role_permissions(&self, role_id: Uuid) -> Result<Vec<Permission>, AppError> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, role_id, service, ownership_level, action, resource_hierarchy, created_utc
            FROM permissions WHERE role_id = $1
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(permission_from_row).collect()
    }

    /// Roles bound to an account, base role included.
    pub async fn account_roles(&self, account_id: Uuid) -> Result<Vec<Role>, AppError> {
        sqlx::query_as::<_, Role>(
            r#"
            SELECT r.* FROM roles r
            INNER JOIN role_bindings rb ON rb.role_id = r.id
            WHERE rb.service_account_id = $1
            ORDER BY r.name ASC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Whether the role is some account's base role.
    pub async fn is_base_role(&self, role_id: Uuid) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM service_accounts WHERE base_role_id = $1)",
        )
        .bind(role_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    // ==================== Permission Request Operations ====================

    /// Insert an open request under the upsert-or-ignore constraint. Returns
    /// `None` when an identical open request already exists.
    pub async fn insert_permission_request_tx(
        conn: &mut PgConnection,
        request: &PermissionRequest,
    ) -> Result<Option<Uuid>, AppError> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO permissions_requests
                (id, service, ownership_level, action, resource_hierarchy, message, state, service_account_id, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now(), now())
            ON CONFLICT (service, ownership_level, action, resource_hierarchy, service_account_id)
                WHERE state = 'open' DO NOTHING
            RETURNING id
            "#,
        )
        .bind(request.id)
        .bind(&request.service)
        .bind(request.ownership_level.as_str())
        .bind(&request.action)
        .bind(request.resource_hierarchy.as_str())
        .bind(&request.message)
        .bind(request.state.as_str())
        .bind(request.service_account_id)
        .fetch_optional(conn)
        .await
        .map_err(db_err)
    }

    /// Load a request and lock its row until the transaction settles.
    pub async fn find_permission_request_tx(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<PermissionRequest>, AppError> {
        let row = sqlx::query_as::<_, PermissionRequestRow>(
            r#"
            SELECT pr.id, pr.service, pr.ownership_level, pr.action, pr.resource_hierarchy,
                   pr.message, pr.state, pr.service_account_id,
                   NULL::text AS requester_name, NULL::text AS requester_picture,
                   pr.moderator_service_account_id, pr.created_utc, pr.updated_utc
            FROM permissions_requests pr
            WHERE pr.id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(db_err)?;
        row.map(request_from_row).transpose()
    }

    /// Flip a request into a terminal state, recording the moderator.
    pub async fn resolve_permission_request_tx(
        conn: &mut PgConnection,
        id: Uuid,
        state: PermissionRequestState,
        moderator_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE permissions_requests
            SET state = $1, moderator_service_account_id = $2, updated_utc = now()
            WHERE id = $3
            "#,
        )
        .bind(state.as_str())
        .bind(moderator_id)
        .bind(id)
        .execute(conn)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// All open requests with requester display fields, ordered by
    /// (service, action, resource hierarchy).
    pub async fn list_open_requests(&self) -> Result<Vec<PermissionRequest>, AppError> {
        let rows = sqlx::query_as::<_, PermissionRequestRow>(
            r#"
            SELECT pr.id, pr.service, pr.ownership_level, pr.action, pr.resource_hierarchy,
                   pr.message, pr.state, pr.service_account_id,
                   sas.name AS requester_name, sas.picture AS requester_picture,
                   pr.moderator_service_account_id, pr.created_utc, pr.updated_utc
            FROM permissions_requests pr
            INNER JOIN service_accounts sas ON sas.id = pr.service_account_id
            WHERE pr.state = 'open'
            ORDER BY pr.service ASC, pr.action ASC, pr.resource_hierarchy ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(request_from_row).collect()
    }

    // ==================== Token Operations ====================

    /// Persist a provider token, updating the row when the access token is
    /// already known.
    pub async fn save_token(&self, token: &Token) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO tokens (access_token, refresh_token, token_type, expiry, email, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, now(), now())
            ON CONFLICT (access_token) DO UPDATE
                SET refresh_token = EXCLUDED.refresh_token,
                    token_type = EXCLUDED.token_type,
                    expiry = EXCLUDED.expiry,
                    email = EXCLUDED.email,
                    updated_utc = now()
            "#,
        )
        .bind(&token.access_token)
        .bind(&token.refresh_token)
        .bind(&token.token_type)
        .bind(token.expiry)
        .bind(&token.email)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn find_token(&self, access_token: &str) -> Result<Option<Token>, AppError> {
        sqlx::query_as::<_, Token>(
            "SELECT access_token, refresh_token, token_type, expiry, email FROM tokens WHERE access_token = $1",
        )
        .bind(access_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Swap a refreshed access token in place of the stale one.
    pub async fn replace_token(
        &self,
        old_access_token: &str,
        token: &Token,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE tokens
            SET access_token = $1, expiry = $2, updated_utc = now()
            WHERE access_token = $3
            "#,
        )
        .bind(&token.access_token)
        .bind(token.expiry)
        .bind(old_access_token)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
