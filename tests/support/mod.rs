#![allow(dead_code)]

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use redgrant::catalog::memory::MemoryCatalog;
use redgrant::generator::statement::Statement;
use redgrant::model::Principal;
use redgrant::reconcile::{ReconciliationContext, ReconciliationResult};
use redgrant::request::form::{parse_submission, SubmissionKeys};
use redgrant::request::DesiredState;

pub(crate) fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from("tests/fixtures").join(name)
}

pub(crate) fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|e| panic!("fixture {name} should be readable: {e}"))
}

pub(crate) fn load_warehouse() -> MemoryCatalog {
    MemoryCatalog::from_json(&read_fixture("warehouse.json")).expect("fixture catalog should parse")
}

pub(crate) fn submission(body: serde_json::Value) -> DesiredState {
    parse_submission(&body, &SubmissionKeys::default()).expect("submission should parse")
}

pub(crate) fn load_submission(name: &str) -> DesiredState {
    let body: serde_json::Value =
        serde_json::from_str(&read_fixture(name)).expect("fixture submission should be JSON");
    submission(body)
}

pub(crate) fn reconcile(
    catalog: &mut MemoryCatalog,
    principal: &Principal,
    desired: &DesiredState,
) -> ReconciliationResult {
    ReconciliationContext::new(catalog)
        .reconcile(principal, desired)
        .expect("reconciliation pass should complete")
}

pub(crate) fn plan(
    catalog: &mut MemoryCatalog,
    principal: &Principal,
    desired: &DesiredState,
) -> Vec<String> {
    sql(&ReconciliationContext::new(catalog)
        .plan(principal, desired)
        .expect("planning should succeed"))
}

pub(crate) fn sql(statements: &[Statement]) -> Vec<String> {
    statements.iter().map(|s| s.sql.clone()).collect()
}

pub(crate) fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}_{nanos}"));
    std::fs::create_dir_all(&dir).expect("should create temp dir");
    dir
}
