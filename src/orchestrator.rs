//! Per-message coordination of the advisory dialogue.
//!
//! Each call loads the session, resolves the language, records the user turn,
//! and either answers with the canned greeting (first turn) or extracts
//! parameters, refreshes production stats when the parameter set is complete,
//! and asks the generator for a reply. The session is persisted exactly once
//! per successful call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::Result;
use crate::estimator::StatsRefresher;
use crate::generation::TextGenerator;
use crate::language;
use crate::models::{ChatReply, ChatRequest, Language, Session, Turn};
use crate::prompt::PromptBuilder;
use crate::session_store::SessionStore;
use crate::slots;

const GREETING_VI: &str = "Chào bạn! Tôi là chuyên gia tư vấn điện mặt trời. \
                           Bạn cần tư vấn cho hộ gia đình hay nhà máy điện?";
const GREETING_EN: &str = "Hi! I'm your solar energy expert. \
                           Are you looking for household or industrial plant consultation?";

pub fn greeting(language: Language) -> &'static str {
    match language {
        Language::Vi => GREETING_VI,
        Language::En => GREETING_EN,
    }
}

/// Result of one processed message
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub reply: String,
    pub history: Vec<Turn>,
    pub language: Language,
}

/// In-process mutual exclusion per session id.
///
/// Serializes read-modify-write cycles for the same session inside one
/// process. Entries are dropped once no request holds or awaits them.
#[derive(Default)]
struct SessionLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

struct SessionGuard<'a> {
    locks: &'a SessionLocks,
    session_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SessionLocks {
    async fn acquire(&self, session_id: &str) -> SessionGuard<'_> {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.entry(session_id.to_string()).or_default().clone()
        };
        let guard = mutex.lock_owned().await;
        SessionGuard {
            locks: self,
            session_id: session_id.to_string(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut map = self.locks.inner.lock().unwrap_or_else(|e| e.into_inner());
        if map
            .get(&self.session_id)
            .is_some_and(|m| Arc::strong_count(m) == 1)
        {
            map.remove(&self.session_id);
        }
    }
}

/// Top-level coordinator; owns its collaborators
pub struct DialogueOrchestrator {
    store: Arc<dyn SessionStore>,
    generator: Arc<dyn TextGenerator>,
    refresher: StatsRefresher,
    prompts: PromptBuilder,
    ttl: Duration,
    locks: SessionLocks,
}

impl DialogueOrchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        generator: Arc<dyn TextGenerator>,
        refresher: StatsRefresher,
        prompts: PromptBuilder,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            generator,
            refresher,
            prompts,
            ttl,
            locks: SessionLocks::default(),
        }
    }

    /// Handle an inbound request: allocate or reset the session id as asked,
    /// then process the message.
    pub async fn handle(&self, request: ChatRequest) -> Result<ChatReply> {
        let reset = request.create_new_session.unwrap_or(false);
        let session_id = match request.session_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => id,
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                tracing::info!("Allocated new session {}", id);
                id
            }
        };
        let hint = request.language.as_deref().and_then(Language::from_hint);

        let outcome = self
            .run_turn(&request.message, &session_id, hint, reset)
            .await?;

        Ok(ChatReply {
            message: outcome.reply,
            chat_history: outcome.history,
            language: outcome.language,
            session_id,
        })
    }

    pub async fn process_message(
        &self,
        message: &str,
        session_id: &str,
        language_hint: Option<Language>,
    ) -> Result<TurnOutcome> {
        self.run_turn(message, session_id, language_hint, false)
            .await
    }

    async fn run_turn(
        &self,
        message: &str,
        session_id: &str,
        language_hint: Option<Language>,
        reset: bool,
    ) -> Result<TurnOutcome> {
        let _guard = self.locks.acquire(session_id).await;

        let mut session = if reset {
            tracing::info!("Resetting session {}", session_id);
            Session::default()
        } else {
            self.store.get(session_id).await?
        };

        let language =
            language_hint.unwrap_or_else(|| language::detect(message, Some(session.language)));
        session.language = language;

        session.push_turn(Turn::user(message));

        if session.history.len() == 1 && !session.introduced {
            let intro = greeting(language);
            session.introduced = true;
            session.push_turn(Turn::assistant(intro));
            self.store.put(session_id, &session, self.ttl).await?;
            tracing::info!("Greeted new session {} ({})", session_id, language);
            return Ok(TurnOutcome {
                reply: intro.to_string(),
                history: session.history,
                language,
            });
        }

        let extracted = slots::extract(message);
        if !extracted.is_empty() {
            tracing::debug!("Session {} extracted {:?}", session_id, extracted);
        }
        session.slots.merge(extracted);

        if session.slots.is_complete() {
            session = self.refresher.maybe_refresh(session).await;
        } else {
            tracing::debug!(
                "Session {} still missing {:?}",
                session_id,
                session.slots.missing()
            );
        }

        let prompt = self
            .prompts
            .build(&session.history, language, session.stats.as_ref());
        let reply = self.generator.generate(&prompt).await?;

        session.push_turn(Turn::assistant(reply.clone()));
        self.store.put(session_id, &session, self.ttl).await?;

        Ok(TurnOutcome {
            reply,
            history: session.history,
            language,
        })
    }
}
