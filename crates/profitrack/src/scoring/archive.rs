//! Turns a finalized method run into report rows.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use super::domain::{Algorithm, FinalScore, MethodId, NewReport, Report, ReportDetail};

static REPORT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Produces `{prefix}-{ALGORITHM}-{YYYYMMDDHHMMSS}-{seq:04}` codes.
#[derive(Debug, Clone)]
pub struct ReportCodeGenerator {
    prefix: String,
}

impl ReportCodeGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn next_code(&self, algorithm: Algorithm, at: DateTime<Utc>) -> String {
        let sequence = REPORT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}-{}-{}-{sequence:04}",
            self.prefix,
            algorithm.label(),
            at.format("%Y%m%d%H%M%S")
        )
    }
}

impl Default for ReportCodeGenerator {
    fn default() -> Self {
        Self::new("RPT")
    }
}

/// Human readable reporting period, e.g. "October 2026".
pub fn report_period(at: DateTime<Utc>) -> String {
    at.format("%B %Y").to_string()
}

/// Header for the report archiving `scores`; `None` when there is nothing to archive.
pub fn report_header(
    method: MethodId,
    report_code: String,
    scores: &[FinalScore],
    at: DateTime<Utc>,
) -> Option<NewReport> {
    if scores.is_empty() {
        return None;
    }

    Some(NewReport {
        method_id: method,
        report_code,
        period: report_period(at),
        total_data: scores.len(),
        created_at: at,
    })
}

/// One detail row per final score, carrying the score forward unchanged.
pub fn report_details(report: &Report, scores: &[FinalScore]) -> Vec<ReportDetail> {
    scores
        .iter()
        .map(|score| ReportDetail {
            report_id: report.id,
            product_id: score.product_id,
            method_id: report.method_id,
            final_score: score.final_score,
            created_at: report.created_at,
        })
        .collect()
}
