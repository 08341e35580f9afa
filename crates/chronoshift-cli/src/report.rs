use serde::Serialize;

use chronoshift_engine::{ExtendReport, RebaseReport};

/// Per-run artifact written to the run directory.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub phase: String,
    pub tables: Vec<TableOutcome>,
    pub failures: u64,
}

/// Outcome of one table's operation; a degraded success (skipped scopes)
/// stays distinguishable from a clean one.
#[derive(Debug, Serialize)]
pub struct TableOutcome {
    pub table: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_written: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rebase: Option<RebaseReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extend: Option<ExtendReport>,
}

impl TableOutcome {
    pub fn rebased(table: &str, report: RebaseReport, bytes_written: u64) -> Self {
        Self {
            table: table.to_string(),
            status: "rebased".to_string(),
            error: None,
            bytes_written: Some(bytes_written),
            rebase: Some(report),
            extend: None,
        }
    }

    pub fn extended(table: &str, report: ExtendReport, bytes_written: u64) -> Self {
        let status = if report.already_current {
            "already_current"
        } else if report.skipped_scopes > 0 {
            "extended_with_skips"
        } else {
            "extended"
        };
        Self {
            table: table.to_string(),
            status: status.to_string(),
            error: None,
            bytes_written: Some(bytes_written),
            rebase: None,
            extend: Some(report),
        }
    }

    pub fn failed(table: &str, error: String) -> Self {
        Self {
            table: table.to_string(),
            status: "failed".to_string(),
            error: Some(error),
            bytes_written: None,
            rebase: None,
            extend: None,
        }
    }
}
