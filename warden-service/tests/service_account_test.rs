//! Integration tests for account provisioning and the authorization engine.

mod common;

use common::TestHarness;
use warden_service::models::Permission;

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn create_provisions_base_role_and_binding() {
    let harness = TestHarness::spawn().await;

    let account = harness
        .accounts
        .create_oauth2_type("some name", "test@domain.com", None)
        .await
        .unwrap();

    let roles = harness.accounts.get_roles(account.id).await.unwrap();
    assert_eq!(roles.len(), 1, "exactly one role binding expected");
    assert_eq!(roles[0].id, account.base_role_id);
    assert_eq!(roles[0].name, format!("service-account:{}", account.id));
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn key_pair_account_authenticates() {
    let harness = TestHarness::spawn().await;

    let account = harness
        .accounts
        .create_key_pair_type("machine")
        .await
        .unwrap();
    let key_id = account.key_id.clone().unwrap();
    let key_secret = account.key_secret.clone().unwrap();

    let auth = harness
        .accounts
        .authenticate_key_pair(&key_id, &key_secret)
        .await
        .unwrap();
    assert_eq!(auth.service_account_id, account.id);
    assert_eq!(auth.name, "machine");

    let err = harness
        .accounts
        .authenticate_key_pair(&key_id, "wrong-secret")
        .await;
    assert!(err.is_err(), "wrong secret must not authenticate");
}

struct HasPermissionCase {
    name: &'static str,
    held: &'static [&'static str],
    test: &'static str,
    expected: bool,
}

const HAS_PERMISSION_CASES: &[HasPermissionCase] = &[
    HasPermissionCase {
        name: "no permissions",
        held: &[],
        test: "Service1::RL::Do1::x::*",
        expected: false,
    },
    HasPermissionCase {
        name: "different service",
        held: &["Service1::RL::Do1::x::*"],
        test: "Service2::RL::Do1::x::*",
        expected: false,
    },
    HasPermissionCase {
        name: "exact match",
        held: &["Service1::RL::Do1::x::*"],
        test: "Service1::RL::Do1::x::*",
        expected: true,
    },
    HasPermissionCase {
        name: "different action",
        held: &["Service1::RL::Do2::x::*"],
        test: "Service1::RL::Do1::x::*",
        expected: false,
    },
    HasPermissionCase {
        name: "one of many matches",
        held: &["Service1::RL::Do2::x::*", "Service1::RL::Do1::x::*"],
        test: "Service1::RL::Do1::x::*",
        expected: true,
    },
    HasPermissionCase {
        name: "broader hierarchy matches",
        held: &["Service1::RL::Do2::x::*", "Service1::RL::Do1::*"],
        test: "Service1::RL::Do1::x::*",
        expected: true,
    },
    HasPermissionCase {
        name: "wildcard action",
        held: &["Service1::RL::*::x::*"],
        test: "Service1::RL::Do1::x::*",
        expected: true,
    },
    HasPermissionCase {
        name: "wildcard action and hierarchy",
        held: &["Service1::RL::*::*"],
        test: "Service1::RL::Do1::x::*",
        expected: true,
    },
    HasPermissionCase {
        name: "narrow grant does not widen",
        held: &["Service1::RL::Do1::*"],
        test: "Service1::RL::Do2::*",
        expected: false,
    },
    HasPermissionCase {
        name: "lender grant never satisfies owner request",
        held: &["Service1::RL::Do1::x::*"],
        test: "Service1::RO::Do1::x::*",
        expected: false,
    },
    HasPermissionCase {
        name: "owner grant satisfies lender request",
        held: &["Service1::RO::Do1::*"],
        test: "Service1::RL::Do1::x::*",
        expected: true,
    },
    HasPermissionCase {
        name: "owner grant on sibling scope does not match",
        held: &["Service1::RO::Do1::y::*"],
        test: "Service1::RL::Do1::x::*",
        expected: false,
    },
];

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn has_permission_with_permissions_on_base_role() {
    for case in HAS_PERMISSION_CASES {
        let harness = TestHarness::spawn().await;
        let account = harness
            .create_account_with_permissions("sa1", "sa1@domain.com", case.held)
            .await;

        let has = harness
            .accounts
            .has_permission_str(account.id, case.test)
            .await
            .unwrap();
        assert_eq!(has, case.expected, "case: {}", case.name);
    }
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn has_permission_with_permissions_on_non_base_role() {
    for case in HAS_PERMISSION_CASES {
        let harness = TestHarness::spawn().await;
        let account = harness
            .accounts
            .create_oauth2_type("sa1", "sa1@domain.com", None)
            .await
            .unwrap();

        let held: Vec<Permission> = case
            .held
            .iter()
            .map(|s| Permission::parse(s).unwrap())
            .collect();
        harness
            .roles
            .create("role1", &held, &[account.id])
            .await
            .unwrap();

        let has = harness
            .accounts
            .has_permission_str(account.id, case.test)
            .await
            .unwrap();
        assert_eq!(has, case.expected, "case: {}", case.name);
    }
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn list_with_permission_orders_and_filters() {
    let harness = TestHarness::spawn().await;

    let root = harness.create_root("user", "user@test.com").await;
    let sa0 = harness
        .create_account_with_permissions("sa0", "sa0@domain.com", &["Service1::RL::Do1::x::*"])
        .await;
    let _sa1 = harness
        .create_account_with_permissions("sa1", "sa1@domain.com", &["Service1::RL::Do1::x::y"])
        .await;
    let sa2 = harness
        .create_account_with_permissions("sa2", "sa2@domain.com", &["Service1::RL::Do1::x::z"])
        .await;

    let requested = Permission::parse("Service1::RL::Do1::x::z").unwrap();
    let (list, count) = harness
        .accounts
        .list_with_permission(&Default::default(), &requested)
        .await
        .unwrap();

    assert_eq!(count, 3);
    let names: Vec<&str> = list.iter().map(|sa| sa.name.as_str()).collect();
    assert_eq!(names, vec!["sa0", "sa2", "user"]);
    assert_eq!(list[0].id, sa0.id);
    assert_eq!(list[1].id, sa2.id);
    assert_eq!(list[2].id, root.id);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn list_with_permission_owner_request_excludes_lenders() {
    let harness = TestHarness::spawn().await;

    harness.create_root("user", "user@test.com").await;
    harness
        .create_account_with_permissions("sa0", "sa0@domain.com", &["Service1::RL::Do1::x::*"])
        .await;
    harness
        .create_account_with_permissions("sa1", "sa1@domain.com", &["Service1::RL::Do1::x::y"])
        .await;
    harness
        .create_account_with_permissions("sa2", "sa2@domain.com", &["Service1::RO::Do1::x::z"])
        .await;

    let requested = Permission::parse("Service1::RO::Do1::x::z").unwrap();
    let (list, count) = harness
        .accounts
        .list_with_permission(&Default::default(), &requested)
        .await
        .unwrap();

    assert_eq!(count, 2);
    let names: Vec<&str> = list.iter().map(|sa| sa.name.as_str()).collect();
    assert_eq!(names, vec!["sa2", "user"]);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn drop_bindings_keeps_base_role() {
    let harness = TestHarness::spawn().await;

    let account = harness
        .accounts
        .create_oauth2_type("sa", "sa@domain.com", None)
        .await
        .unwrap();
    let extra = Permission::parse("Service1::RL::Do1::x").unwrap();
    harness
        .roles
        .create("extra-role", &[extra], &[account.id])
        .await
        .unwrap();

    assert_eq!(harness.accounts.get_roles(account.id).await.unwrap().len(), 2);

    harness.accounts.drop_bindings(account.id).await.unwrap();

    let roles = harness.accounts.get_roles(account.id).await.unwrap();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].id, account.base_role_id);
}
