mod support;

use redgrant::model::{
    GrantKey, ObjectType, Principal, PrivilegeType, Resolution, SchemaInventory,
};
use redgrant::reconcile::ReconciliationContext;
use redgrant::resolver::object_type::resolve;
use serde_json::json;

use support::{load_warehouse, sql, submission};

fn sales() -> SchemaInventory {
    load_warehouse().snapshot().schemas["sales"].clone()
}

#[test]
fn table_wins_when_a_view_shares_its_name() {
    assert_eq!(
        resolve("sales", "orders", PrivilegeType::Select, Some(&sales())),
        Resolution::Confirmed(ObjectType::Table)
    );
}

#[test]
fn routine_kinds_come_from_the_inventory() {
    assert_eq!(
        resolve("sales", "f_total", PrivilegeType::Execute, Some(&sales())),
        Resolution::Confirmed(ObjectType::Function)
    );
    assert_eq!(
        resolve("sales", "p_load", PrivilegeType::Execute, Some(&sales())),
        Resolution::Confirmed(ObjectType::Procedure)
    );
}

#[test]
fn stale_inventory_is_refreshed_once_on_miss() {
    let mut catalog = load_warehouse();
    let desired = submission(json!({
        "priv-sales-daily_totals-SELECT": "on",
        "priv-sales-p_load-EXECUTE": "on",
        "priv-sales-orders-SELECT": "on",
    }));

    let statements = ReconciliationContext::new(&mut catalog)
        .with_inventory("sales", SchemaInventory::default())
        .plan(&Principal::user("alice"), &desired)
        .expect("planning should succeed");

    assert_eq!(
        sql(&statements),
        vec![
            "GRANT SELECT ON sales.daily_totals TO alice;",
            "GRANT EXECUTE ON PROCEDURE sales.p_load TO alice;",
        ]
    );
    assert_eq!(catalog.inventory_reads(), 1);
}

#[test]
fn preloaded_inventory_needs_no_refresh() {
    let mut catalog = load_warehouse();
    let mut context = ReconciliationContext::new(&mut catalog);
    assert_eq!(context.preload_inventory().expect("preload should succeed"), 2);

    let statements = context
        .plan(
            &Principal::user("bob"),
            &submission(json!({
                "priv-finance-ledger-SELECT": "on",
                "priv-sales-customers-UPDATE": "on",
                "priv-sales-daily_totals-SELECT": "on",
            })),
        )
        .expect("planning should succeed");

    assert_eq!(
        sql(&statements),
        vec!["GRANT SELECT ON sales.daily_totals TO bob;"]
    );
    assert_eq!(catalog.inventory_reads(), 2);
}

#[test]
fn unknown_objects_are_granted_as_uncertain_tables() {
    let mut catalog = load_warehouse();
    let result = ReconciliationContext::new(&mut catalog)
        .reconcile(
            &Principal::user("bob"),
            &submission(json!({
                "priv-sales-customers-UPDATE": "on",
                "priv-finance-ledger-SELECT": "on",
                "priv-finance-forecast-SELECT": "on",
            })),
        )
        .expect("pass should complete");

    assert_eq!(
        sql(&result.executed),
        vec!["GRANT SELECT ON finance.forecast TO bob;"]
    );
    assert_eq!(
        result.uncertain,
        vec![GrantKey::new("finance", "forecast", PrivilegeType::Select)]
    );
}

#[test]
fn schema_named_object_is_a_schema_grant() {
    let mut catalog = load_warehouse();
    let statements = ReconciliationContext::new(&mut catalog)
        .plan(
            &Principal::role("etl"),
            &submission(json!({ "priv-finance-finance-CREATE": "on" })),
        )
        .expect("planning should succeed");
    assert_eq!(
        sql(&statements),
        vec!["GRANT CREATE ON SCHEMA finance TO ROLE etl;"]
    );
}
