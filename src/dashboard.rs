// src/dashboard.rs
//! Pure aggregation of stored analyses into dashboard state.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::analysis::AnalysisData;

/// How many bars the recent-activity graph shows.
const RECENT_SERIES_LEN: usize = 7;

/// One bar of the recent-activity graph, carrying enough identity for
/// click-through navigation back to the detail view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphPoint {
    pub score: i64,
    pub analysis_id: String,
    pub created_at: DateTime<Utc>,
}

/// One row of the history list. The version label is a presentation
/// artifact recomputed on every aggregation, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryItem {
    pub analysis_id: String,
    pub version_label: String,
    pub suggestion_count: i64,
    pub score: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total_edits: usize,
    pub total_corrections: i64,
    /// Truncated mean of all scores; 0 for a new user with no records.
    pub ai_checker_percent: i64,
    /// Up to the last 7 analyses, oldest first.
    pub recent_series: Vec<GraphPoint>,
    /// All analyses, newest first, labeled Resume_Version_{N} counting
    /// down so the most recent record carries the highest number.
    pub history: Vec<HistoryItem>,
}

/// Fold a user's stored analyses into dashboard state. Pure and
/// stateless; safe to call repeatedly (pull-to-refresh, live updates).
/// Ties on `created_at` keep input order: both sorts are stable.
pub fn aggregate(records: &[AnalysisData]) -> DashboardSummary {
    let total_edits = records.len();
    let total_corrections: i64 = records.iter().map(|r| r.suggestion_count).sum();

    let ai_checker_percent = if records.is_empty() {
        0
    } else {
        records.iter().map(|r| r.score).sum::<i64>() / records.len() as i64
    };

    let mut ascending = records.to_vec();
    ascending.sort_by_key(|r| r.created_at);

    let start = ascending.len().saturating_sub(RECENT_SERIES_LEN);
    let recent_series = ascending[start..]
        .iter()
        .map(|r| GraphPoint {
            score: r.score,
            analysis_id: r.analysis_id.clone(),
            created_at: r.created_at,
        })
        .collect();

    let mut descending = records.to_vec();
    descending.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let history = descending
        .iter()
        .enumerate()
        .map(|(index, r)| HistoryItem {
            analysis_id: r.analysis_id.clone(),
            version_label: format!("Resume_Version_{}", total_edits - index),
            suggestion_count: r.suggestion_count,
            score: r.score,
            created_at: r.created_at,
        })
        .collect();

    DashboardSummary {
        total_edits,
        total_corrections,
        ai_checker_percent,
        recent_series,
        history,
    }
}
