use async_trait::async_trait;
use std::sync::Arc;

use crate::config::GenerationConfig;
use crate::error::{Result, SolarAdvisorError};
use crate::models::{ChatMessage, CompletionRequest};
use crate::transport::Transport;

/// Produces the assistant's reply text for a fully assembled prompt
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

pub struct ChatGenerator {
    tx: Arc<dyn Transport>,
    model: String,
    temperature: f32,
    max_tokens: i32,
}

impl ChatGenerator {
    pub fn new(tx: Arc<dyn Transport>, cfg: &GenerationConfig) -> Self {
        Self {
            tx,
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        }
    }
}

#[async_trait]
impl TextGenerator for ChatGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        tracing::debug!(
            "Generating reply with {} ({} prompt chars)",
            self.model,
            prompt.len()
        );

        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self.tx.chat(&request).await?;

        match response.choices.first() {
            Some(choice) if !choice.message.content.trim().is_empty() => {
                Ok(choice.message.content.trim().to_string())
            }
            Some(_) => Err(SolarAdvisorError::Generation(
                "Completion API returned an empty reply".to_string(),
            )),
            None => Err(SolarAdvisorError::Generation(
                "Completion API returned empty choices".to_string(),
            )),
        }
    }
}
