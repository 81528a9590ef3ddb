// src/types/response.rs
//! Wire types for the extract/analyze backend.

use serde::{Deserialize, Serialize};

use crate::types::analysis::Suggestion;

/// Response from `POST /extract` and `POST /extract_pdf`.
#[derive(Debug, Clone, Deserialize)]
pub struct OcrResponse {
    pub extracted_text: String,
}

/// Request body for `POST /analyze`. The role is currently always
/// omitted; the backend treats it as optional.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub resume_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_role: Option<String>,
}

/// Response from `POST /analyze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub score: i64,
    pub summary: String,
    pub suggestions: Vec<Suggestion>,
}
