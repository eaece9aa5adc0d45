use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::generator::statement::format_plan;
use crate::model::Principal;
use crate::output::report;
use crate::reconcile::ReconciliationResult;

/// Failure to write pass artifacts.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The artifact name is not a plain file stem.
    #[error("Invalid output name '{name}': {reason}")]
    InvalidName {
        /// Rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },
    /// The output directory could not be created.
    #[error("Failed to create output directory: {0}")]
    CreateDir(#[source] std::io::Error),
    /// An artifact could not be written.
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        /// Artifact path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

fn write_file(path: PathBuf, contents: &str) -> Result<(), OutputError> {
    std::fs::write(&path, contents).map_err(|source| OutputError::Write { path, source })
}

/// Write `{name}_plan.sql` and `{name}_report.md` for a pass over `principal`.
///
/// The plan holds every statement the pass attempted, executed ones first.
pub fn write_output(
    output_dir: &Path,
    name: &str,
    principal: &Principal,
    result: &ReconciliationResult,
) -> Result<(), OutputError> {
    validate_output_name(name)?;
    std::fs::create_dir_all(output_dir).map_err(OutputError::CreateDir)?;

    let attempted: Vec<_> = result
        .executed
        .iter()
        .chain(&result.failed)
        .cloned()
        .collect();
    let mut plan = format_plan(&attempted);
    if !plan.is_empty() {
        plan.push('\n');
    }
    write_file(output_dir.join(format!("{name}_plan.sql")), &plan)?;
    write_file(
        output_dir.join(format!("{name}_report.md")),
        &report::build_report(principal, result),
    )
}

/// Check that `name` can serve as an artifact file stem inside the output directory.
pub fn validate_output_name(name: &str) -> Result<(), OutputError> {
    let invalid = |reason| OutputError::InvalidName {
        name: name.to_string(),
        reason,
    };
    if name.trim().is_empty() {
        return Err(invalid("must not be empty"));
    }
    let candidate = Path::new(name);
    if candidate.is_absolute() {
        return Err(invalid("absolute paths are not allowed"));
    }
    if candidate.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    }) {
        return Err(invalid("traversal segments are not allowed"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(invalid("path separators are not allowed"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::statement::grant_statement;
    use crate::model::{GrantKey, ObjectType, PrivilegeGrant, PrivilegeType};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_path(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be monotonic")
            .as_nanos();
        std::env::temp_dir().join(format!("{prefix}_{nanos}"))
    }

    fn granted() -> ReconciliationResult {
        let grant = PrivilegeGrant::from_key(
            GrantKey::new("sales", "orders", PrivilegeType::Insert),
            ObjectType::Table,
        );
        ReconciliationResult {
            granted: 1,
            executed: vec![grant_statement(&Principal::user("alice"), &grant)],
            ..ReconciliationResult::default()
        }
    }

    #[test]
    fn write_output_reports_directory_creation_errors() {
        let path = unique_path("redgrant_formatter_file");
        std::fs::write(&path, "not a directory").expect("should create marker file");

        let err = write_output(&path, "alice", &Principal::user("alice"), &granted())
            .expect_err("directory creation should fail");
        assert!(err.to_string().contains("Failed to create output directory"));
    }

    #[test]
    fn write_output_rejects_unsafe_name_paths() {
        let dir = unique_path("redgrant_formatter_dir");
        let alice = Principal::user("alice");

        for name in ["nested/output", "../escape", "  "] {
            let err = write_output(&dir, name, &alice, &granted())
                .expect_err("unsafe output name should fail validation");
            assert!(matches!(err, OutputError::InvalidName { .. }));
        }
    }

    #[test]
    fn write_output_writes_plan_and_report() {
        let dir = unique_path("redgrant_formatter_ok");
        write_output(&dir, "alice", &Principal::user("alice"), &granted())
            .expect("write_output should succeed");

        let plan = std::fs::read_to_string(dir.join("alice_plan.sql")).expect("plan should exist");
        let report =
            std::fs::read_to_string(dir.join("alice_report.md")).expect("report should exist");

        assert_eq!(plan, "GRANT INSERT ON sales.orders TO alice;\n");
        assert!(report.contains("Privileges granted successfully! Count: 1"));
    }
}
