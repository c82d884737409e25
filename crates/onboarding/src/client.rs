use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::CauseId,
    error::ApiError,
    protocol::{CauseSummary, LocationCatalogResponse, SponsorshipReceipt, SponsorshipSubmission},
};
use tracing::{info, warn};
use url::Url;

use crate::error::{OnboardingError, Result};

/// Read-only cause metadata used to decorate the wizard header.
#[async_trait]
pub trait CauseDirectory: Send + Sync {
    async fn fetch_cause(&self, cause_id: CauseId) -> Result<CauseSummary>;
}

/// Receives finished submissions.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn submit(&self, submission: &SponsorshipSubmission) -> Result<SponsorshipReceipt>;
}

#[derive(Clone)]
pub struct SponsorshipClient {
    http: Client,
    server_url: Url,
}

impl SponsorshipClient {
    pub fn new(server_url: &str) -> Result<Self> {
        let mut parsed = Url::parse(server_url).map_err(|source| OnboardingError::InvalidServerUrl {
            url: server_url.to_string(),
            source,
        })?;
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            server_url: parsed,
        })
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.server_url
            .join(path)
            .map_err(|source| OnboardingError::InvalidServerUrl {
                url: format!("{}{path}", self.server_url),
                source,
            })
    }

    pub async fn fetch_location_catalog(&self) -> Result<LocationCatalogResponse> {
        let url = self.endpoint("locations")?;
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| http_error(&url, source))?;
        decode(&url, response).await
    }
}

#[async_trait]
impl CauseDirectory for SponsorshipClient {
    async fn fetch_cause(&self, cause_id: CauseId) -> Result<CauseSummary> {
        let url = self.endpoint(&format!("causes/{}", cause_id.0))?;
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| http_error(&url, source))?;
        decode(&url, response).await
    }
}

#[async_trait]
impl SubmissionSink for SponsorshipClient {
    async fn submit(&self, submission: &SponsorshipSubmission) -> Result<SponsorshipReceipt> {
        let url = self.endpoint("sponsorships")?;
        let response = self
            .http
            .post(url.clone())
            .json(submission)
            .send()
            .await
            .map_err(|source| http_error(&url, source))?;
        let receipt: SponsorshipReceipt = decode(&url, response).await?;
        info!(
            sponsorship_id = receipt.sponsorship_id.0,
            points = submission.distribution_points.len(),
            "sponsorship submitted"
        );
        Ok(receipt)
    }
}

fn http_error(url: &Url, source: reqwest::Error) -> OnboardingError {
    OnboardingError::Http {
        endpoint: url.to_string(),
        source,
    }
}

async fn decode<T: DeserializeOwned>(url: &Url, response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response.json().await.map_err(|source| http_error(url, source));
    }

    let body = response.text().await.unwrap_or_default();
    let error = serde_json::from_str::<ApiError>(&body).unwrap_or_else(|_| {
        ApiError::new(
            shared::error::ErrorCode::Internal,
            format!("unexpected status {status}: {body}"),
        )
    });
    warn!(endpoint = %url, %status, message = %error.message, "request rejected");
    Err(OnboardingError::Api {
        endpoint: url.to_string(),
        error,
    })
}

#[cfg(test)]
#[path = "tests/client_tests.rs"]
mod tests;
