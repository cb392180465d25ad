use serde::{Deserialize, Serialize};
use std::fmt;

use crate::slots::Slots;

/// Maximum number of turns kept in a session transcript
pub const MAX_HISTORY: usize = 12;

/// Speaker of a single turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message exchanged by either side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The two languages the advisor speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Vi,
    En,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Vi => "vi",
            Language::En => "en",
        }
    }

    /// Parse a client-supplied hint such as `vi`, `EN` or `en-US`.
    /// Anything else is treated as no hint at all.
    pub fn from_hint(hint: &str) -> Option<Self> {
        let primary = hint
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "vi" => Some(Language::Vi),
            "en" => Some(Language::En),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Production statistics returned by the energy estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarStats {
    pub average_daily_energy: f64,
    pub yearly_total_energy: f64,
    pub average_daily_gii: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_efficiency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_daily_energy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_daily_energy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yearly_total_gii: Option<f64>,
    /// Fields the estimator returns that the advisor does not interpret
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Persisted conversational state for one session id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub history: Vec<Turn>,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub introduced: bool,
    #[serde(default)]
    pub slots: Slots,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SolarStats>,
}

impl Session {
    /// Append a turn and drop the oldest entries beyond `MAX_HISTORY`
    pub fn push_turn(&mut self, turn: Turn) {
        self.history.push(turn);
        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history.drain(..excess);
        }
    }
}

/// Inbound chat request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub create_new_session: Option<bool>,
}

/// Outbound chat reply
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub message: String,
    pub chat_history: Vec<Turn>,
    pub language: Language,
    pub session_id: String,
}

// OpenAI-compatible chat message format
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

// OpenAI-compatible chat completion request
#[derive(Debug, Serialize, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: i32,
}

// OpenAI-compatible chat completion response
#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChatMessage,
}
