//! Permission request workflow: Open -> Granted | Denied, moderated by
//! identities holding Owner authority over the requested scope.
//!
//! Every mutation runs inside one transaction spanning its authorization
//! check and its writes, so the "already has it" check cannot race the
//! insert and a grant/deny cannot half-apply.

use service_core::error::AppError;
use uuid::Uuid;

use super::database::Database;
use crate::models::{
    ListOptions, OwnershipLevel, Permission, PermissionRequest, PermissionRequestState,
};

/// Outcome of a create call. Both non-created outcomes are reported to the
/// caller as accepted-without-effect rather than failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateRequestOutcome {
    /// A new open request was persisted.
    Created(Uuid),
    /// The requester already effectively holds the permission.
    AlreadyHeld,
    /// An identical open request already exists; no new row.
    DuplicateOpen,
}

#[derive(Clone)]
pub struct RequestService {
    db: Database,
}

fn db_err(e: sqlx::Error) -> AppError {
    AppError::Database(anyhow::anyhow!("{}", e))
}

/// Open requests whose scope is covered by at least one of the moderator's
/// Owner-level permissions. Pure so the subsumption behavior is testable
/// without a database.
pub fn visible_to(
    owner_permissions: &[Permission],
    requests: Vec<PermissionRequest>,
) -> Vec<PermissionRequest> {
    requests
        .into_iter()
        .filter(|pr| {
            let wanted = pr.permission().as_owner();
            owner_permissions.iter().any(|p| p.covers(&wanted))
        })
        .collect()
}

fn page_slice<T>(items: Vec<T>, lo: &ListOptions) -> Vec<T> {
    match lo.limit() {
        None => items,
        Some(limit) => items
            .into_iter()
            .skip(lo.offset() as usize)
            .take(limit as usize)
            .collect(),
    }
}

impl RequestService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open a request unless the requester already holds the permission or
    /// an identical open request exists.
    pub async fn create(
        &self,
        requester_id: Uuid,
        permission: &Permission,
        message: &str,
    ) -> Result<CreateRequestOutcome, AppError> {
        let mut tx = self.db.pool().begin().await.map_err(db_err)?;

        let effective = Database::effective_permissions_tx(&mut *tx, requester_id).await?;
        if effective.iter().any(|p| p.covers(permission)) {
            return Ok(CreateRequestOutcome::AlreadyHeld);
        }

        let request = PermissionRequest::open(requester_id, permission, message);
        let inserted = Database::insert_permission_request_tx(&mut *tx, &request).await?;
        tx.commit().await.map_err(db_err)?;

        Ok(match inserted {
            Some(id) => CreateRequestOutcome::Created(id),
            None => CreateRequestOutcome::DuplicateOpen,
        })
    }

    /// Grant an open request: materialize the permission on the requester's
    /// base role, then close the request.
    pub async fn grant(&self, moderator_id: Uuid, request_id: Uuid) -> Result<(), AppError> {
        self.resolve(moderator_id, request_id, PermissionRequestState::Granted)
            .await
    }

    /// Deny an open request; no permission is materialized.
    pub async fn deny(&self, moderator_id: Uuid, request_id: Uuid) -> Result<(), AppError> {
        self.resolve(moderator_id, request_id, PermissionRequestState::Denied)
            .await
    }

    async fn resolve(
        &self,
        moderator_id: Uuid,
        request_id: Uuid,
        target: PermissionRequestState,
    ) -> Result<(), AppError> {
        let mut tx = self.db.pool().begin().await.map_err(db_err)?;

        let request = Database::find_permission_request_tx(&mut *tx, request_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "permission request {} not found",
                    request_id
                ))
            })?;

        if request.state != PermissionRequestState::Open {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "permission request is closed"
            )));
        }

        let wanted = request.permission().as_owner();
        let effective = Database::effective_permissions_tx(&mut *tx, moderator_id).await?;
        if !effective.iter().any(|p| p.covers(&wanted)) {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "not owner of requested permission"
            )));
        }

        if target == PermissionRequestState::Granted {
            let requester = Database::find_account_tx(&mut *tx, request.service_account_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(anyhow::anyhow!(
                        "service account {} not found",
                        request.service_account_id
                    ))
                })?;
            Database::insert_permission_tx(&mut *tx, requester.base_role_id, &request.permission())
                .await?;
        }

        Database::resolve_permission_request_tx(&mut *tx, request_id, target, moderator_id).await?;
        tx.commit().await.map_err(db_err)
    }

    /// Open requests visible to the moderator, ordered by (service, action,
    /// resource hierarchy), paginated, with the parallel total count.
    pub async fn list_open_visible_to(
        &self,
        lo: &ListOptions,
        moderator_id: Uuid,
    ) -> Result<(Vec<PermissionRequest>, i64), AppError> {
        let owner_permissions: Vec<Permission> = self
            .db
            .effective_permissions(moderator_id)
            .await?
            .into_iter()
            .filter(|p| p.ownership_level == OwnershipLevel::Owner)
            .collect();

        if owner_permissions.is_empty() {
            return Ok((Vec::new(), 0));
        }

        let visible = visible_to(&owner_permissions, self.db.list_open_requests().await?);
        let count = visible.len() as i64;
        Ok((page_slice(visible, lo), count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perms(strings: &[&str]) -> Vec<Permission> {
        strings
            .iter()
            .map(|s| Permission::parse(s).unwrap())
            .collect()
    }

    fn request(service: &str, action: &str, rh: &str) -> PermissionRequest {
        let p = Permission::new(service, OwnershipLevel::Lender, action, rh);
        PermissionRequest::open(Uuid::new_v4(), &p, "Please I need it")
    }

    #[test]
    fn test_visible_to_owner_of_broader_scope() {
        let owned = perms(&["*::RO::Do::x::*"]);
        let visible = visible_to(&owned, vec![request("SomeService", "Do", "x::y")]);
        assert_eq!(visible.len(), 1);
    }

    #[test]
    fn test_visible_to_requires_owner_level() {
        let owned = perms(&["*::RL::Do::x::*"]);
        let visible = visible_to(&owned, vec![request("SomeService", "Do", "x::y")]);
        assert!(visible.is_empty());
    }

    #[test]
    fn test_visible_to_wildcard_action() {
        let owned = perms(&["*::RO::*::x::*"]);
        let visible = visible_to(&owned, vec![request("SomeService", "Do", "x::y")]);
        assert_eq!(visible.len(), 1);
    }

    #[test]
    fn test_visible_to_action_mismatch() {
        let owned = perms(&["*::RO::XX::x::*"]);
        let visible = visible_to(&owned, vec![request("SomeService", "Do", "x::y")]);
        assert!(visible.is_empty());
    }

    #[test]
    fn test_visible_to_filters_per_request() {
        let reqs = vec![
            request("SomeOther", "YY", "x::y"),
            request("SomeService", "XX", "x::y"),
        ];

        let all_actions = perms(&["*::RO::*::x::*"]);
        let visible = visible_to(&all_actions, reqs.clone());
        assert_eq!(visible.len(), 2);

        let one_action = perms(&["*::RO::XX::x::*"]);
        let visible = visible_to(&one_action, reqs);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].action, "XX");
    }

    #[test]
    fn test_visible_to_root_sees_everything() {
        let owned = perms(&["*::RO::*::*"]);
        let visible = visible_to(
            &owned,
            vec![
                request("A", "Do", "x"),
                request("B", "Other", "deep::scope::here"),
            ],
        );
        assert_eq!(visible.len(), 2);
    }

    #[test]
    fn test_page_slice() {
        let items: Vec<i32> = (0..10).collect();
        let page = page_slice(items.clone(), &ListOptions::new(1, 4));
        assert_eq!(page, vec![4, 5, 6, 7]);
        let all = page_slice(items, &ListOptions::new(0, 0));
        assert_eq!(all.len(), 10);
    }
}
