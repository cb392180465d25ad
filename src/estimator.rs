use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{Result, SolarAdvisorError};
use crate::models::{Session, SolarStats};
use crate::slots::Slots;

/// Inputs of one production estimate, coerced to the types the estimator takes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateRequest {
    pub capacity: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    #[serde(rename = "model")]
    pub module: String,
    pub surface_tilt: f64,
    pub surface_azimuth: i64,
    pub performance_ratio: f64,
}

impl EstimateRequest {
    /// Build from a complete slot set; `None` while any slot is unknown
    pub fn from_slots(slots: &Slots) -> Option<Self> {
        Some(Self {
            capacity: slots.capacity?,
            latitude: slots.latitude?,
            longitude: slots.longitude?,
            timezone: slots.timezone.clone()?,
            module: slots.model.clone()?,
            surface_tilt: slots.surface_tilt?,
            surface_azimuth: slots.surface_azimuth?.trunc() as i64,
            performance_ratio: slots.performance_ratio?,
        })
    }
}

/// External numeric collaborator producing solar production statistics
#[async_trait]
pub trait EnergyEstimator: Send + Sync {
    async fn estimate(&self, request: &EstimateRequest) -> Result<SolarStats>;
}

/// Calls the statistics endpoint of the estimation service
pub struct HttpEnergyEstimator {
    client: Client,
    url: String,
}

impl HttpEnergyEstimator {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            url: format!("{}/statistics/", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl EnergyEstimator for HttpEnergyEstimator {
    async fn estimate(&self, request: &EstimateRequest) -> Result<SolarStats> {
        let response = self.client.get(&self.url).query(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SolarAdvisorError::Estimator(format!(
                "estimator returned {status}: {body}"
            )));
        }

        let mut stats: SolarStats = response.json().await?;
        // Per-day and per-month series are not used in prompts; keep sessions small
        stats.extra.remove("daily_values");
        stats.extra.remove("monthly_values");
        Ok(stats)
    }
}

/// Refreshes the cached statistics of a session whose slots are complete
#[derive(Clone)]
pub struct StatsRefresher {
    estimator: Arc<dyn EnergyEstimator>,
}

impl StatsRefresher {
    pub fn new(estimator: Arc<dyn EnergyEstimator>) -> Self {
        Self { estimator }
    }

    /// Never fails: on any estimator error the session comes back unchanged,
    /// keeping whatever stats were cached before.
    pub async fn maybe_refresh(&self, mut session: Session) -> Session {
        let Some(request) = EstimateRequest::from_slots(&session.slots) else {
            return session;
        };

        match self.estimator.estimate(&request).await {
            Ok(stats) => {
                tracing::info!(
                    "Refreshed stats for module {} ({} kWh/day)",
                    request.module,
                    stats.average_daily_energy
                );
                session.stats = Some(stats);
            }
            Err(e) => {
                tracing::warn!("Stats refresh failed, keeping previous stats: {}", e);
            }
        }
        session
    }
}
