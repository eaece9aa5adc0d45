/// Writes the executed plan and report to disk.
pub mod formatter;
/// Builds the pass summary and a Markdown report.
pub mod report;
