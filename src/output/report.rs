use std::fmt::{self, Write};

use serde::Serialize;

use crate::generator::statement::Statement;
use crate::model::Principal;
use crate::reconcile::ReconciliationResult;

/// Severity of a pass summary, as shown to an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLevel {
    /// Everything requested was applied.
    Success,
    /// Nothing needed to change.
    Info,
    /// Some statements failed, some succeeded.
    Warning,
    /// Every attempted statement failed.
    Error,
}

impl fmt::Display for SummaryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryLevel::Success => write!(f, "success"),
            SummaryLevel::Info => write!(f, "info"),
            SummaryLevel::Warning => write!(f, "warning"),
            SummaryLevel::Error => write!(f, "error"),
        }
    }
}

/// One-line, user-facing outcome of a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Severity.
    pub level: SummaryLevel,
    /// Message text.
    pub message: String,
}

impl Summary {
    fn new(level: SummaryLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Summarize a pass the way the admin UI reports it.
pub fn summarize(result: &ReconciliationResult) -> Summary {
    let granted = result.granted;
    let revoked = result.revoked;
    let other = result.members_added + result.members_removed + result.attributes_altered;

    if result.has_failures() {
        return if granted > 0 || revoked > 0 || other > 0 {
            Summary::new(
                SummaryLevel::Warning,
                format!(
                    "Some privileges updated successfully, but errors occurred. \
                     Granted: {granted}, Revoked: {revoked}"
                ),
            )
        } else {
            Summary::new(SummaryLevel::Error, "Error updating privileges!")
        };
    }

    match (granted, revoked) {
        (0, 0) if other > 0 => Summary::new(
            SummaryLevel::Success,
            format!(
                "Access updated successfully! Members added: {}, Members removed: {}, \
                 Attribute changes: {}",
                result.members_added, result.members_removed, result.attributes_altered
            ),
        ),
        (0, 0) => Summary::new(SummaryLevel::Info, "No privilege changes were needed."),
        (g, 0) => Summary::new(
            SummaryLevel::Success,
            format!("Privileges granted successfully! Count: {g}"),
        ),
        (0, r) => Summary::new(
            SummaryLevel::Success,
            format!("Privileges revoked successfully! Count: {r}"),
        ),
        (g, r) => Summary::new(
            SummaryLevel::Success,
            format!("Privileges updated successfully! Granted: {g}, Revoked: {r}"),
        ),
    }
}

fn write_statements(report: &mut String, title: &str, statements: &[Statement]) -> fmt::Result {
    if statements.is_empty() {
        return Ok(());
    }
    writeln!(report)?;
    writeln!(report, "## {title}")?;
    writeln!(report)?;
    writeln!(report, "```sql")?;
    for statement in statements {
        writeln!(report, "{statement}")?;
    }
    writeln!(report, "```")
}

fn render(principal: &Principal, result: &ReconciliationResult) -> Result<String, fmt::Error> {
    let mut report = String::new();
    let summary = summarize(result);

    writeln!(report, "# redgrant Reconciliation Report: {principal}")?;
    writeln!(report)?;
    writeln!(report, "**{}**: {}", summary.level, summary.message)?;
    writeln!(report)?;
    writeln!(report, "| Change | Count |")?;
    writeln!(report, "|--------|-------|")?;
    writeln!(report, "| Granted | {} |", result.granted)?;
    writeln!(report, "| Revoked | {} |", result.revoked)?;
    writeln!(report, "| Members added | {} |", result.members_added)?;
    writeln!(report, "| Members removed | {} |", result.members_removed)?;
    writeln!(report, "| Attribute changes | {} |", result.attributes_altered)?;
    writeln!(report, "| Failed statements | {} |", result.failed.len())?;

    write_statements(&mut report, "Executed", &result.executed)?;
    write_statements(&mut report, "Failed", &result.failed)?;

    if !result.uncertain.is_empty() {
        writeln!(report)?;
        writeln!(report, "## Unverified Object Kinds")?;
        writeln!(report)?;
        for key in &result.uncertain {
            writeln!(
                report,
                "- `{key}`: not found in the schema inventory, kind was assumed"
            )?;
        }
    }

    if result.snapshot.is_none() {
        writeln!(report)?;
        writeln!(
            report,
            "> State could not be re-read after execution; refresh before editing again."
        )?;
    }

    Ok(report)
}

/// Build a markdown report of a pass.
pub fn build_report(principal: &Principal, result: &ReconciliationResult) -> String {
    render(principal, result).unwrap_or_default()
}
