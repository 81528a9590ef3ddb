// src/error.rs
//! User-facing error taxonomy for the analysis pipeline.

use thiserror::Error;

const GENERIC_REMOTE_ERROR: &str = "An error occurred. Please try again.";

/// Every failure surfaced to the presentation layer maps onto one of
/// these variants. Display strings are short and user-readable; raw
/// transport internals never leak through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("Network error. Please check your connection and try again.")]
    NetworkUnavailable,

    /// Remote 4xx/5xx. Carries the server's `detail` field when the
    /// error body exposed one, else a fixed fallback message.
    #[error("{0}")]
    RemoteRejected(String),

    #[error("User not authenticated")]
    Unauthenticated,

    #[error("Analysis not found")]
    NotFound,

    #[error("Unable to process your request. Please try again.")]
    MalformedResponse,

    #[error("{0}")]
    Unknown(String),
}

impl AnalysisError {
    /// Build a `RemoteRejected` from a raw error body. Structured
    /// bodies expose an optional `detail` string; anything unparsable
    /// falls back to a generic message rather than propagating.
    pub fn rejected(body: &str) -> Self {
        AnalysisError::RemoteRejected(rejection_detail(body))
    }
}

/// Extract the `detail` field from a structured JSON error body,
/// falling back to a generic human-readable string.
pub fn rejection_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.get("detail")
                .and_then(|d| d.as_str())
                .map(|d| d.to_string())
        })
        .filter(|detail| !detail.is_empty())
        .unwrap_or_else(|| GENERIC_REMOTE_ERROR.to_string())
}

impl From<reqwest::Error> for AnalysisError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            AnalysisError::NetworkUnavailable
        } else if err.is_decode() {
            AnalysisError::MalformedResponse
        } else {
            AnalysisError::Unknown(format!(
                "An unexpected error occurred. Please try again. ({})",
                err
            ))
        }
    }
}

impl From<sqlx::Error> for AnalysisError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AnalysisError::NotFound,
            other => AnalysisError::Unknown(format!("Storage error: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_extracted_from_structured_body() {
        let body = r#"{"detail": "Image could not be read"}"#;
        assert_eq!(rejection_detail(body), "Image could not be read");
    }

    #[test]
    fn malformed_body_falls_back_to_generic_message() {
        for body in ["not json at all", "", "{\"detail\": 42}", "{}"] {
            let detail = rejection_detail(body);
            assert!(!detail.is_empty());
            assert_eq!(detail, GENERIC_REMOTE_ERROR);
        }
    }

    #[test]
    fn rejected_error_displays_detail() {
        let err = AnalysisError::rejected(r#"{"detail": "PDF too large"}"#);
        assert_eq!(err.to_string(), "PDF too large");
    }

    #[test]
    fn every_variant_has_a_nonempty_message() {
        let variants = [
            AnalysisError::NetworkUnavailable,
            AnalysisError::RemoteRejected("rejected".into()),
            AnalysisError::Unauthenticated,
            AnalysisError::NotFound,
            AnalysisError::MalformedResponse,
            AnalysisError::Unknown("boom".into()),
        ];
        for v in variants {
            assert!(!v.to_string().is_empty());
        }
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert_eq!(
            AnalysisError::from(sqlx::Error::RowNotFound),
            AnalysisError::NotFound
        );
    }
}
