// src/types/mod.rs
pub mod analysis;
pub mod response;

pub use analysis::{AnalysisData, AnalysisRecord, AnalysisSource, DecodeError, Suggestion};
pub use response::{AnalysisRequest, AnalysisResponse, OcrResponse};
