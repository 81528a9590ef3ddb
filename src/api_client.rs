// src/api_client.rs
//! HTTP client for the remote extract/analyze backend.

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use tracing::{info, warn};

use crate::error::AnalysisError;
use crate::types::response::{AnalysisRequest, AnalysisResponse, OcrResponse};

const EXTRACT_ENDPOINT: &str = "/extract";
const EXTRACT_PDF_ENDPOINT: &str = "/extract_pdf";
const ANALYZE_ENDPOINT: &str = "/analyze";

pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    /// OCR an image of a resume page. The payload is forwarded as-is;
    /// unusable bytes surface only as a remote rejection.
    pub async fn extract_image(&self, bytes: Vec<u8>) -> Result<OcrResponse, AnalysisError> {
        self.extract(EXTRACT_ENDPOINT, bytes, "resume.jpg", "image/jpeg")
            .await
    }

    /// Extract text from a resume PDF.
    pub async fn extract_pdf(&self, bytes: Vec<u8>) -> Result<OcrResponse, AnalysisError> {
        self.extract(EXTRACT_PDF_ENDPOINT, bytes, "resume.pdf", "application/pdf")
            .await
    }

    async fn extract(
        &self,
        endpoint: &str,
        bytes: Vec<u8>,
        file_name: &str,
        content_type: &str,
    ) -> Result<OcrResponse, AnalysisError> {
        let url = format!("{}{}", self.base_url, endpoint);

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|_| AnalysisError::Unknown("Failed to build upload".to_string()))?;
        let form = Form::new().part("file", part);

        info!("Calling extract service: {}", url);

        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        if status.is_success() {
            response.json::<OcrResponse>().await.map_err(|e| {
                warn!("Failed to parse extract response: {}", e);
                AnalysisError::MalformedResponse
            })
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!("Extract service error ({}): {}", status, body);
            Err(AnalysisError::rejected(&body))
        }
    }

    /// Score the extracted text. The text is sent verbatim, with no
    /// trimming or length cap.
    pub async fn analyze(
        &self,
        resume_text: &str,
        target_role: Option<String>,
    ) -> Result<AnalysisResponse, AnalysisError> {
        let url = format!("{}{}", self.base_url, ANALYZE_ENDPOINT);
        let request = AnalysisRequest {
            resume_text: resume_text.to_string(),
            target_role,
        };

        info!("Calling analyze service: {}", url);

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if status.is_success() {
            response.json::<AnalysisResponse>().await.map_err(|e| {
                warn!("Failed to parse analyze response: {}", e);
                AnalysisError::MalformedResponse
            })
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!("Analyze service error ({}): {}", status, body);
            Err(AnalysisError::rejected(&body))
        }
    }
}
