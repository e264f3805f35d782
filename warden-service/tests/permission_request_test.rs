//! Integration tests for the permission request workflow.

mod common;

use common::TestHarness;
use warden_service::models::{ListOptions, Permission, PermissionRequestState};
use warden_service::services::CreateRequestOutcome;

fn requested() -> Permission {
    Permission::parse("SomeService::RL::Do::x::y").unwrap()
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn create_opens_a_request() {
    let harness = TestHarness::spawn().await;
    let requester = harness
        .accounts
        .create_oauth2_type("some name", "test@domain.com", None)
        .await
        .unwrap();

    let outcome = harness
        .requests
        .create(requester.id, &requested(), "Please I need it")
        .await
        .unwrap();
    assert!(matches!(outcome, CreateRequestOutcome::Created(_)));

    let root = harness.create_root("root", "root@test.com").await;
    let (open, count) = harness
        .requests
        .list_open_visible_to(&ListOptions::default(), root.id)
        .await
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(open[0].state, PermissionRequestState::Open);
    assert_eq!(open[0].service_account_id, requester.id);
    assert_eq!(open[0].service, "SomeService");
    assert_eq!(open[0].action, "Do");
    assert_eq!(open[0].resource_hierarchy.as_str(), "x::y");
    assert_eq!(open[0].message, "Please I need it");
    assert_eq!(open[0].requester_name.as_deref(), Some("some name"));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn duplicate_open_request_is_idempotent() {
    let harness = TestHarness::spawn().await;
    let requester = harness
        .accounts
        .create_oauth2_type("some name", "test@domain.com", None)
        .await
        .unwrap();

    let first = harness
        .requests
        .create(requester.id, &requested(), "Please I need it")
        .await
        .unwrap();
    assert!(matches!(first, CreateRequestOutcome::Created(_)));

    let second = harness
        .requests
        .create(requester.id, &requested(), "Please I need it")
        .await
        .unwrap();
    assert_eq!(second, CreateRequestOutcome::DuplicateOpen);

    let root = harness.create_root("root", "root@test.com").await;
    let (_, count) = harness
        .requests
        .list_open_visible_to(&ListOptions::default(), root.id)
        .await
        .unwrap();
    assert_eq!(count, 1, "second identical request must not add a row");
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn create_rejects_already_held_permission() {
    let harness = TestHarness::spawn().await;
    let requester = harness
        .create_account_with_permissions("sa", "sa@domain.com", &["SomeService::RL::Do::x::*"])
        .await;

    // x::* already covers x::y.
    let outcome = harness
        .requests
        .create(requester.id, &requested(), "Please I need it")
        .await
        .unwrap();
    assert_eq!(outcome, CreateRequestOutcome::AlreadyHeld);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn grant_materializes_access() {
    let harness = TestHarness::spawn().await;
    let requester = harness
        .accounts
        .create_oauth2_type("requester", "req@domain.com", None)
        .await
        .unwrap();
    let moderator = harness
        .create_account_with_permissions(
            "moderator",
            "mod@domain.com",
            &["SomeService::RO::Do::x::*"],
        )
        .await;

    let CreateRequestOutcome::Created(request_id) = harness
        .requests
        .create(requester.id, &requested(), "Please I need it")
        .await
        .unwrap()
    else {
        panic!("expected a created request");
    };

    assert!(!harness
        .accounts
        .has_permission(requester.id, &requested())
        .await
        .unwrap());

    harness.requests.grant(moderator.id, request_id).await.unwrap();

    assert!(harness
        .accounts
        .has_permission(requester.id, &requested())
        .await
        .unwrap());

    // Terminal: a second resolution is a conflict.
    let err = harness.requests.grant(moderator.id, request_id).await;
    assert!(err.is_err(), "granting a closed request must fail");
    let err = harness.requests.deny(moderator.id, request_id).await;
    assert!(err.is_err(), "denying a granted request must fail");
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn deny_leaves_no_access_and_is_terminal() {
    let harness = TestHarness::spawn().await;
    let requester = harness
        .accounts
        .create_oauth2_type("requester", "req@domain.com", None)
        .await
        .unwrap();
    let moderator = harness
        .create_account_with_permissions(
            "moderator",
            "mod@domain.com",
            &["SomeService::RO::Do::x::*"],
        )
        .await;

    let CreateRequestOutcome::Created(request_id) = harness
        .requests
        .create(requester.id, &requested(), "Please I need it")
        .await
        .unwrap()
    else {
        panic!("expected a created request");
    };

    harness.requests.deny(moderator.id, request_id).await.unwrap();

    assert!(!harness
        .accounts
        .has_permission(requester.id, &requested())
        .await
        .unwrap());

    let err = harness.requests.grant(moderator.id, request_id).await;
    assert!(err.is_err(), "a denied request can never be granted");
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn moderation_requires_owner_authority() {
    let harness = TestHarness::spawn().await;
    let requester = harness
        .accounts
        .create_oauth2_type("requester", "req@domain.com", None)
        .await
        .unwrap();
    // Lender over the right scope, and owner over the wrong scope: neither
    // may moderate.
    let lender = harness
        .create_account_with_permissions(
            "lender",
            "lender@domain.com",
            &["SomeService::RL::Do::x::*"],
        )
        .await;
    let wrong_scope_owner = harness
        .create_account_with_permissions(
            "other-owner",
            "other@domain.com",
            &["SomeService::RO::Do::y::*"],
        )
        .await;

    let CreateRequestOutcome::Created(request_id) = harness
        .requests
        .create(requester.id, &requested(), "Please I need it")
        .await
        .unwrap()
    else {
        panic!("expected a created request");
    };

    assert!(harness.requests.grant(lender.id, request_id).await.is_err());
    assert!(harness
        .requests
        .grant(wrong_scope_owner.id, request_id)
        .await
        .is_err());

    // The request stays open for an actual owner.
    let root = harness.create_root("root", "root@test.com").await;
    harness.requests.grant(root.id, request_id).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn open_requests_visible_only_to_covering_owners() {
    let harness = TestHarness::spawn().await;
    let requester = harness
        .accounts
        .create_oauth2_type("requester", "req@domain.com", None)
        .await
        .unwrap();

    for (service, action, rh) in [
        ("SomeOther", "YY", "x::y"),
        ("SomeService", "XX", "x::y"),
    ] {
        let p = Permission::parse(&format!("{}::RL::{}::{}", service, action, rh)).unwrap();
        let outcome = harness
            .requests
            .create(requester.id, &p, "Please I need it")
            .await
            .unwrap();
        assert!(matches!(outcome, CreateRequestOutcome::Created(_)));
    }

    let broad = harness
        .create_account_with_permissions("broad", "broad@domain.com", &["*::RO::*::x::*"])
        .await;
    let (visible, count) = harness
        .requests
        .list_open_visible_to(&ListOptions::default(), broad.id)
        .await
        .unwrap();
    assert_eq!(count, 2);
    // Ordered by (service, action, resource hierarchy).
    assert_eq!(visible[0].service, "SomeOther");
    assert_eq!(visible[1].service, "SomeService");

    let narrow = harness
        .create_account_with_permissions("narrow", "narrow@domain.com", &["*::RO::XX::x::*"])
        .await;
    let (visible, count) = harness
        .requests
        .list_open_visible_to(&ListOptions::default(), narrow.id)
        .await
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(visible[0].action, "XX");

    let lender = harness
        .create_account_with_permissions("l", "l@domain.com", &["*::RL::*::x::*"])
        .await;
    let (_, count) = harness
        .requests
        .list_open_visible_to(&ListOptions::default(), lender.id)
        .await
        .unwrap();
    assert_eq!(count, 0, "lender-level permissions grant no visibility");
}
