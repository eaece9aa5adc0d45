mod support;

use insta::assert_snapshot;
use redgrant::catalog::CatalogReader;
use redgrant::model::{GrantKey, ObjectType, Principal, PrivilegeType};
use redgrant::reconcile::{PassState, ReconcileError, ReconciliationContext};
use serde_json::json;

use support::{load_submission, load_warehouse, plan, reconcile, sql, submission};

#[test]
fn granting_one_more_privilege_emits_a_single_grant() {
    let mut catalog = load_warehouse();
    let alice = Principal::user("alice");
    let desired = submission(json!({
        "priv-sales-orders-SELECT": true,
        "priv-sales-orders-INSERT": true,
    }));

    let result = reconcile(&mut catalog, &alice, &desired);

    assert_eq!(result.granted, 1);
    assert_eq!(result.revoked, 0);
    assert!(result.failed.is_empty());
    assert_eq!(
        sql(&result.executed),
        vec!["GRANT INSERT ON sales.orders TO alice;"]
    );

    let snapshot = result.snapshot.expect("state should be re-read");
    let insert = GrantKey::new("sales", "orders", PrivilegeType::Insert);
    let held = snapshot
        .privileges
        .iter()
        .find(|grant| grant.matches(&insert))
        .expect("insert should now be held");
    assert_eq!(held.object_type, ObjectType::Table);
}

#[test]
fn second_pass_with_same_submission_is_a_noop() {
    let mut catalog = load_warehouse();
    let alice = Principal::user("alice");
    let desired = load_submission("alice_desired.json");

    let first = reconcile(&mut catalog, &alice, &desired);
    assert!(first.granted > 0);
    assert!(!first.has_failures(), "failed: {:?}", first.failed);

    let second = reconcile(&mut catalog, &alice, &desired);
    assert_eq!(second.granted, 0);
    assert_eq!(second.revoked, 0);
    assert!(second.is_noop(), "unexpected statements: {:?}", second.executed);
}

#[test]
fn self_named_schema_selection_keeps_existing_usage() {
    let mut catalog = load_warehouse();
    let reader = Principal::role("reader");
    let desired = submission(json!({ "priv-sales-sales-USAGE": "on" }));

    let result = reconcile(&mut catalog, &reader, &desired);

    assert_eq!((result.granted, result.revoked), (0, 0));
    assert!(result.is_noop(), "unexpected statements: {:?}", result.executed);
    assert!(result.uncertain.is_empty());
}

#[test]
fn full_submission_plan() {
    let mut catalog = load_warehouse();
    let statements = plan(
        &mut catalog,
        &Principal::user("alice"),
        &load_submission("alice_desired.json"),
    );

    assert_snapshot!(statements.join("\n"), @r"
    GRANT USAGE ON SCHEMA sales TO alice;
    GRANT SELECT ON sales.daily_totals TO alice;
    GRANT INSERT ON sales.orders TO alice;
    GRANT EXECUTE ON PROCEDURE sales.p_load TO alice;
    REVOKE ROLE reader FROM alice;
    ALTER GROUP finance ADD USER alice;
    ALTER USER alice WITH VALID UNTIL 'infinity' CONNECTION LIMIT UNLIMITED SYSLOG ACCESS UNRESTRICTED;
    ");
}

#[test]
fn revokes_run_before_grants() {
    let mut catalog = load_warehouse();
    let bob = Principal::user("bob");
    let desired = submission(json!({
        "priv-sales-customers-SELECT": "on",
        "priv-finance-ledger-SELECT": "on",
    }));

    let result = reconcile(&mut catalog, &bob, &desired);

    assert_eq!(
        sql(&result.executed),
        vec![
            "REVOKE UPDATE ON sales.customers FROM bob;",
            "GRANT SELECT ON sales.customers TO bob;",
        ]
    );
    assert_eq!((result.granted, result.revoked), (1, 1));
}

#[test]
fn failed_statement_does_not_stop_the_pass() {
    let mut catalog = load_warehouse().fail_on("sales.orders");
    let alice = Principal::user("alice");
    let desired = submission(json!({
        "priv-sales-orders-INSERT": "on",
        "priv-sales-customers-SELECT": "on",
    }));

    let result = reconcile(&mut catalog, &alice, &desired);

    assert_eq!(result.revoked, 0);
    assert_eq!(result.granted, 1);
    assert_eq!(
        sql(&result.failed),
        vec![
            "REVOKE SELECT ON sales.orders FROM alice;",
            "GRANT INSERT ON sales.orders TO alice;",
        ]
    );
    assert_eq!(
        catalog.executed(),
        ["GRANT SELECT ON sales.customers TO alice;"]
    );

    let held = catalog.privileges(&alice).unwrap();
    assert!(held
        .iter()
        .any(|g| g.matches(&GrantKey::new("sales", "orders", PrivilegeType::Select))));
}

#[test]
fn read_failure_aborts_before_any_statement() {
    let mut catalog = load_warehouse();
    catalog.set_unreadable(true);

    let context = ReconciliationContext::new(&mut catalog);
    assert_eq!(context.state(), PassState::Pending);
    let err = context
        .reconcile(
            &Principal::user("alice"),
            &submission(json!({ "priv-sales-orders-INSERT": "on" })),
        )
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Catalog(_)));
    assert!(catalog.executed().is_empty());
}

#[test]
fn unknown_principal_is_a_read_failure() {
    let mut catalog = load_warehouse();
    let err = ReconciliationContext::new(&mut catalog)
        .reconcile(&Principal::user("mallory"), &submission(json!({})))
        .unwrap_err();
    assert_eq!(err.to_string(), "USER mallory not found in catalog");
}

#[test]
fn malformed_keys_have_no_effect() {
    let mut catalog = load_warehouse();
    let result = reconcile(
        &mut catalog,
        &Principal::user("alice"),
        &submission(json!({ "priv-sales-orders": "on" })),
    );
    assert!(result.is_noop());
    assert_eq!(result.snapshot.unwrap().privileges.len(), 1);
}

#[test]
fn group_membership_is_reconciled_from_the_group_side() {
    let mut catalog = load_warehouse();
    let analysts = Principal::group("analysts");

    let result = reconcile(
        &mut catalog,
        &analysts,
        &submission(json!({ "users": ["bob"] })),
    );

    assert_eq!(
        sql(&result.executed),
        vec![
            "ALTER GROUP analysts DROP USER alice;",
            "ALTER GROUP analysts ADD USER bob;",
        ]
    );
    assert_eq!((result.members_added, result.members_removed), (1, 1));
    let alice = catalog.membership(&Principal::user("alice")).unwrap();
    assert!(alice.groups.is_empty());
}

#[test]
fn roles_nest_into_roles() {
    let mut catalog = load_warehouse();
    let etl = Principal::role("etl");

    let result = reconcile(
        &mut catalog,
        &etl,
        &submission(json!({ "roles": "reader", "users": "bob" })),
    );

    assert_eq!(
        sql(&result.executed),
        vec!["GRANT ROLE etl TO bob;", "GRANT ROLE reader TO ROLE etl;"]
    );
    let nested = catalog.membership(&etl).unwrap();
    assert!(nested.roles.contains("reader"));
}

#[test]
fn equivalent_attribute_values_produce_no_alter() {
    let mut catalog = load_warehouse();
    let result = reconcile(
        &mut catalog,
        &Principal::user("bob"),
        &submission(json!({
            "connection_limit": "",
            "syslog_access": "",
            "session_timeout": "0",
        })),
    );
    assert!(result.is_noop());
}

#[test]
fn attribute_changes_are_one_alter_statement() {
    let mut catalog = load_warehouse();
    let result = reconcile(
        &mut catalog,
        &Principal::user("alice"),
        &submission(json!({ "connection_limit": "0", "can_create_db": "on" })),
    );
    assert_eq!(
        sql(&result.executed),
        vec!["ALTER USER alice WITH CREATEDB CONNECTION LIMIT UNLIMITED;"]
    );
    assert_eq!(result.attributes_altered, 2);
    let attributes = result.snapshot.unwrap().attributes.unwrap();
    assert!(attributes.can_create_db);
    assert_eq!(attributes.effective_connection_limit(), None);
}

#[test]
fn attributes_submitted_for_groups_are_ignored() {
    let mut catalog = load_warehouse();
    let result = reconcile(
        &mut catalog,
        &Principal::group("finance"),
        &submission(json!({ "super_user": "on" })),
    );
    assert!(result.is_noop());
}
