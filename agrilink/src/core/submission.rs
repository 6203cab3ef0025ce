//! Uploading a completed analysis form.
//!
//! The draft is validated locally first; a draft with any required input
//! missing never reaches the network.

use log::{debug, info, warn};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

use crate::Result;
use crate::api::models::{AgriError, AnalysisDraft, AnalysisReport, AnalysisRequest, AnalysisResult};
use crate::types::constants::endpoints;

const NO_RESPONSE: &str = "No response from server. Check your connection.";
const REQUEST_SETUP: &str = "Error setting up request";

/// Client for the herbicide analysis endpoint.
#[derive(Debug, Clone)]
pub struct AnalysisSubmission {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl AnalysisSubmission {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Full URL of the analysis endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, endpoints::HERBICIDE_ANALYSIS)
    }

    /// Validates `draft` and uploads it.
    ///
    /// The draft is only borrowed, so after a failure the same inputs can be
    /// submitted again unchanged.
    ///
    /// # Errors
    ///
    /// - [`AgriError::Validation`] if an input is missing; nothing is sent.
    /// - [`AgriError::SubmissionFailure`] on transport failure, non-2xx status
    ///   or an unparseable response body.
    pub async fn submit(&self, draft: &AnalysisDraft) -> Result<AnalysisResult> {
        let request = draft.to_request()?;
        self.send(&request).await
    }

    /// Uploads an already validated request.
    pub async fn send(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let url = self.endpoint();
        let form = build_form(request)?;
        debug!(
            "Submitting {} ({} bytes) to {url}",
            request.image().file_name,
            request.image().bytes.len()
        );

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                warn!("Analysis upload to {url} failed: {e}");
                if e.is_builder() {
                    AgriError::SubmissionFailure(REQUEST_SETUP.into())
                } else {
                    AgriError::SubmissionFailure(NO_RESPONSE.into())
                }
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            warn!("Reading analysis response failed: {e}");
            AgriError::SubmissionFailure(NO_RESPONSE.into())
        })?;

        if !status.is_success() {
            let message = server_message(&body).unwrap_or_else(|| format!("Server error ({status})"));
            warn!("Analysis service answered {status}: {message}");
            return Err(AgriError::SubmissionFailure(message));
        }

        let report: AnalysisReport = serde_json::from_slice(&body).map_err(|e| {
            AgriError::SubmissionFailure(format!("Unexpected response from server: {e}"))
        })?;

        info!(
            "Analysis complete: {}",
            report.weed_name.as_deref().unwrap_or("no classification")
        );

        Ok(AnalysisResult {
            report,
            captured_image_uri: request.image().uri.clone(),
        })
    }
}

/// Multipart body: the image plus one text part per scalar input.
fn build_form(request: &AnalysisRequest) -> Result<Form> {
    let image = request.image();
    let part = Part::bytes(image.bytes.clone())
        .file_name(image.file_name.clone())
        .mime_str(&image.mime_type)
        .map_err(|e| {
            AgriError::SubmissionFailure(format!("{REQUEST_SETUP}: {e}"))
        })?;

    let reading = request.sensor().reading;
    let mut form = Form::new()
        .part("image", part)
        .text("soilType", request.soil_type().as_str())
        .text("growthStage", request.growth_stage().as_str())
        .text("useNewModel", request.use_new_model().to_string())
        .text("temperature", reading.temperature.to_string())
        .text("humidity", reading.humidity.to_string());

    if let Some(location) = request.sensor().location {
        form = form
            .text("latitude", location.latitude.to_string())
            .text("longitude", location.longitude.to_string());
    }

    Ok(form)
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Extracts `{"message": ...}` from an error body, if present.
fn server_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()?
        .message
        .filter(|m| !m.trim().is_empty())
}
