use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{Result, SolarAdvisorError};
use crate::models::{CompletionRequest, CompletionResponse};

const MAX_RETRIES: u8 = 5;
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[async_trait]
pub trait Transport: Send + Sync {
    async fn chat(&self, req: &CompletionRequest) -> Result<CompletionResponse>;
}

/// Chat completions over any OpenAI-compatible endpoint (Gemini, Groq, ...)
pub struct OpenAiTransport {
    client: Client,
    api_key: String,
    url: String,
}

impl OpenAiTransport {
    pub fn new(api_key: String, url: String) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            api_key,
            url,
        })
    }
}

/// Exponential backoff with jitter, capped at `MAX_BACKOFF`
fn backoff_delay(attempt: u8) -> Duration {
    let base_delay = Duration::from_millis(200 * 2u64.pow(attempt.saturating_sub(1) as u32));
    let jitter = rand::thread_rng().gen_range(0.8..=1.2);
    let delay = Duration::from_millis((base_delay.as_millis() as f64 * jitter) as u64);
    std::cmp::min(delay, MAX_BACKOFF)
}

#[async_trait]
impl Transport for OpenAiTransport {
    async fn chat(&self, req: &CompletionRequest) -> Result<CompletionResponse> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let failure = match self
                .client
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(req)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    return response.json().await.map_err(|e| {
                        SolarAdvisorError::Generation(format!(
                            "Failed to parse completion response: {e}"
                        ))
                    });
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    // Client errors other than rate limiting will not improve on retry
                    if status.is_client_error() && status.as_u16() != 429 {
                        return Err(SolarAdvisorError::Generation(format!(
                            "Completion API rejected request ({status}): {body}"
                        )));
                    }
                    format!("status {status}: {body}")
                }
                Err(e) => e.to_string(),
            };

            if attempts >= MAX_RETRIES {
                return Err(SolarAdvisorError::Generation(format!(
                    "Completion API failed after {attempts} attempts: {failure}"
                )));
            }

            let delay = backoff_delay(attempts);
            tracing::warn!(
                "Completion attempt {} failed ({}), retrying in {:?}",
                attempts,
                failure,
                delay
            );
            sleep(delay).await;
        }
    }
}
