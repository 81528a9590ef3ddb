// src/types/analysis.rs
//! Persisted analysis documents and their tolerant decoding.
//!
//! Stored documents are loosely-typed JSON and have gone through schema
//! changes: early records lack `source` and `suggestionCount`, and
//! `createdAt` has been written both as epoch milliseconds and as an
//! RFC 3339 string. Decoding never assumes a field's presence beyond
//! the required identity/score/timestamp triple.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::response::AnalysisResponse;

/// Submission channel that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Image,
    Pdf,
}

impl AnalysisSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisSource::Image => "image",
            AnalysisSource::Pdf => "pdf",
        }
    }
}

/// One actionable piece of feedback from the analyze endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub category: String,
    pub issue: String,
    pub recommendation: String,
}

/// The persisted, immutable outcome of one successful extract+analyze
/// round trip. Written exactly once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub analysis_id: String,
    pub source: AnalysisSource,
    pub score: i64,
    pub summary: String,
    pub resume_text: String,
    pub suggestions: Vec<Suggestion>,
    /// Denormalized cache of `suggestions.len()`. Always written, but
    /// readers fall back to the list length for historical records.
    pub suggestion_count: i64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("stored record is missing required field '{0}'")]
    MissingField(&'static str),
    #[error("stored record is not a JSON object")]
    NotAnObject,
}

impl AnalysisRecord {
    /// Assemble a fresh record from a completed round trip. The id is
    /// the creation wall-clock in milliseconds, which doubles as the
    /// chronological sort proxy. The timestamp is held at millisecond
    /// precision, matching how it is stored.
    pub fn new(source: AnalysisSource, resume_text: String, analysis: AnalysisResponse) -> Self {
        let millis = Utc::now().timestamp_millis();
        let created_at = DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now);
        Self {
            analysis_id: millis.to_string(),
            source,
            score: analysis.score,
            summary: analysis.summary,
            resume_text,
            suggestion_count: analysis.suggestions.len() as i64,
            suggestions: analysis.suggestions,
            created_at,
        }
    }

    /// Encode for storage. The inverse of [`AnalysisRecord::from_document`]
    /// for records written by this version of the client.
    pub fn to_document(&self) -> Value {
        serde_json::to_value(self).expect("analysis record serializes to JSON")
    }

    /// Decode a stored document, tolerating old shapes. Fails only when
    /// one of the identity fields is unusable; everything else degrades
    /// to a default.
    pub fn from_document(doc: &Value) -> Result<Self, DecodeError> {
        let obj = doc.as_object().ok_or(DecodeError::NotAnObject)?;

        let analysis_id = obj
            .get("analysisId")
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingField("analysisId"))?
            .to_string();
        let score = obj
            .get("score")
            .and_then(Value::as_i64)
            .ok_or(DecodeError::MissingField("score"))?;
        let created_at = obj
            .get("createdAt")
            .and_then(decode_created_at)
            .ok_or(DecodeError::MissingField("createdAt"))?;

        // Records written before the source tag existed default to the
        // image channel.
        let source = match obj.get("source").and_then(Value::as_str) {
            Some("pdf") => AnalysisSource::Pdf,
            _ => AnalysisSource::Image,
        };

        let suggestions = obj
            .get("suggestions")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value::<Suggestion>(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            analysis_id,
            source,
            score,
            summary: obj
                .get("summary")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            resume_text: obj
                .get("resumeText")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            suggestion_count: decode_suggestion_count(obj),
            suggestions,
            created_at,
        })
    }
}

/// The slice of a record the dashboard needs. Batch reads decode into
/// this slim shape so a record with a missing summary or suggestion
/// list still counts toward the aggregates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisData {
    pub analysis_id: String,
    pub score: i64,
    pub suggestion_count: i64,
    pub created_at: DateTime<Utc>,
}

impl AnalysisData {
    pub fn from_document(doc: &Value) -> Result<Self, DecodeError> {
        let obj = doc.as_object().ok_or(DecodeError::NotAnObject)?;

        Ok(Self {
            analysis_id: obj
                .get("analysisId")
                .and_then(Value::as_str)
                .ok_or(DecodeError::MissingField("analysisId"))?
                .to_string(),
            score: obj
                .get("score")
                .and_then(Value::as_i64)
                .ok_or(DecodeError::MissingField("score"))?,
            suggestion_count: decode_suggestion_count(obj),
            created_at: obj
                .get("createdAt")
                .and_then(decode_created_at)
                .ok_or(DecodeError::MissingField("createdAt"))?,
        })
    }
}

/// `suggestionCount` when present, else the raw length of the
/// `suggestions` array, else 0.
fn decode_suggestion_count(obj: &serde_json::Map<String, Value>) -> i64 {
    obj.get("suggestionCount")
        .and_then(Value::as_i64)
        .or_else(|| {
            obj.get("suggestions")
                .and_then(Value::as_array)
                .map(|items| items.len() as i64)
        })
        .unwrap_or(0)
}

/// `createdAt` has been stored both as epoch milliseconds and as an
/// RFC 3339 string.
fn decode_created_at(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(millis) = value.as_i64() {
        return Utc.timestamp_millis_opt(millis).single();
    }
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_response() -> AnalysisResponse {
        AnalysisResponse {
            score: 85,
            summary: "Solid resume with room to grow.".to_string(),
            suggestions: vec![
                Suggestion {
                    category: "Formatting".to_string(),
                    issue: "Inconsistent bullet styles".to_string(),
                    recommendation: "Pick one bullet style".to_string(),
                },
                Suggestion {
                    category: "Content".to_string(),
                    issue: "No metrics".to_string(),
                    recommendation: "Quantify achievements".to_string(),
                },
            ],
        }
    }

    #[test]
    fn document_round_trip_preserves_all_fields() {
        let record = AnalysisRecord::new(
            AnalysisSource::Pdf,
            "extracted resume text".to_string(),
            sample_response(),
        );
        let decoded = AnalysisRecord::from_document(&record.to_document()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn new_record_denormalizes_suggestion_count() {
        let record = AnalysisRecord::new(
            AnalysisSource::Image,
            "text".to_string(),
            sample_response(),
        );
        assert_eq!(record.suggestion_count, 2);
        assert_eq!(record.analysis_id, record.created_at.timestamp_millis().to_string());
    }

    #[test]
    fn missing_suggestion_count_falls_back_to_list_length() {
        let doc = json!({
            "analysisId": "1700000000000",
            "score": 70,
            "createdAt": 1_700_000_000_000_i64,
            "suggestions": [
                {"category": "a", "issue": "b", "recommendation": "c"},
                {"category": "d", "issue": "e", "recommendation": "f"},
                {"category": "g", "issue": "h", "recommendation": "i"}
            ]
        });
        assert_eq!(AnalysisData::from_document(&doc).unwrap().suggestion_count, 3);
    }

    #[test]
    fn missing_count_and_suggestions_decodes_with_zero() {
        let doc = json!({
            "analysisId": "1700000000001",
            "score": 55,
            "createdAt": 1_700_000_000_001_i64
        });
        let data = AnalysisData::from_document(&doc).unwrap();
        assert_eq!(data.suggestion_count, 0);
        assert_eq!(data.score, 55);
        assert_eq!(data.analysis_id, "1700000000001");
    }

    #[test]
    fn malformed_suggestion_entries_are_skipped() {
        let doc = json!({
            "analysisId": "1700000000002",
            "score": 40,
            "createdAt": 1_700_000_000_002_i64,
            "suggestions": [
                {"category": "a", "issue": "b", "recommendation": "c"},
                {"category": "only-a-category"},
                "not even an object"
            ]
        });
        let record = AnalysisRecord::from_document(&doc).unwrap();
        assert_eq!(record.suggestions.len(), 1);
        // The denormalized count reflects the raw stored array.
        assert_eq!(record.suggestion_count, 3);
    }

    #[test]
    fn created_at_accepts_rfc3339_strings() {
        let doc = json!({
            "analysisId": "1700000000003",
            "score": 90,
            "createdAt": "2023-11-14T22:13:20Z"
        });
        let data = AnalysisData::from_document(&doc).unwrap();
        assert_eq!(data.created_at, Utc.timestamp_millis_opt(1_700_000_000_000).unwrap());
    }

    #[test]
    fn missing_required_fields_fail_decode() {
        let missing_id = json!({"score": 1, "createdAt": 0});
        assert_eq!(
            AnalysisData::from_document(&missing_id),
            Err(DecodeError::MissingField("analysisId"))
        );

        let missing_score = json!({"analysisId": "x", "createdAt": 0});
        assert_eq!(
            AnalysisData::from_document(&missing_score),
            Err(DecodeError::MissingField("score"))
        );

        let missing_created = json!({"analysisId": "x", "score": 1});
        assert_eq!(
            AnalysisData::from_document(&missing_created),
            Err(DecodeError::MissingField("createdAt"))
        );
    }

    #[test]
    fn records_without_source_default_to_image() {
        let doc = json!({
            "analysisId": "1700000000004",
            "score": 65,
            "createdAt": 1_700_000_000_004_i64
        });
        let record = AnalysisRecord::from_document(&doc).unwrap();
        assert_eq!(record.source, AnalysisSource::Image);
    }

    #[test]
    fn out_of_range_scores_are_carried_verbatim() {
        let doc = json!({
            "analysisId": "1700000000005",
            "score": 140,
            "createdAt": 1_700_000_000_005_i64
        });
        assert_eq!(AnalysisData::from_document(&doc).unwrap().score, 140);
    }
}
