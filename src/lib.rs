pub mod config;
pub mod error;
pub mod estimator;
pub mod generation;
pub mod language;
pub mod models;
pub mod orchestrator;
pub mod panels;
pub mod prompt;
pub mod redis;
pub mod routes;
pub mod session_store;
pub mod slots;
pub mod transport;

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::estimator::{HttpEnergyEstimator, StatsRefresher};
use crate::generation::ChatGenerator;
use crate::orchestrator::DialogueOrchestrator;
use crate::panels::load_panel_inventory;
use crate::prompt::PromptBuilder;
use crate::redis::RedisManager;
use crate::session_store::{MemorySessionStore, RedisSessionStore, SessionStore};
use crate::transport::{OpenAiTransport, Transport};

/// Construct the orchestrator and its collaborators from configuration.
///
/// Fails when the generation credential is missing or the session store
/// cannot be reached; a missing panel table only degrades the persona.
pub async fn build_orchestrator(cfg: &Config) -> Result<DialogueOrchestrator> {
    cfg.validate()?;

    let store: Arc<dyn SessionStore> = match cfg.session.backend.as_str() {
        "memory" => {
            tracing::warn!("Using in-memory session store; sessions are lost on restart");
            Arc::new(MemorySessionStore::new())
        }
        _ => {
            let redis_manager = Arc::new(RedisManager::new_with_config(cfg).await?);
            Arc::new(RedisSessionStore::new(
                redis_manager,
                cfg.session.key_prefix.clone(),
            ))
        }
    };

    let transport = Arc::new(OpenAiTransport::new(
        cfg.generation.api_key.clone(),
        cfg.generation.base_url.clone(),
    )?);
    let generator = Arc::new(ChatGenerator::new(
        Arc::clone(&transport) as Arc<dyn Transport>,
        &cfg.generation,
    ));

    let estimator = Arc::new(HttpEnergyEstimator::new(&cfg.estimator.base_url)?);
    let panels = load_panel_inventory(&cfg.panels.csv_path);

    Ok(DialogueOrchestrator::new(
        store,
        generator,
        StatsRefresher::new(estimator),
        PromptBuilder::new(&panels),
        cfg.session_ttl(),
    ))
}
