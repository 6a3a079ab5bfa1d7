// Community pulse: a fire-and-forget report of generated numbers keyed by ISO
// calendar week.
//
// Failures are logged and swallowed. Generation never waits on the pulse;
// the session keeps the task handles so callers can flush before exit.

use crate::config::PulseConfig;
use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Payload sent to the pulse endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pulse {
    pub week: String,
    pub numbers: Vec<u8>,
}

impl Pulse {
    pub fn new(numbers: Vec<u8>, date: NaiveDate) -> Self {
        Pulse {
            week: week_key(date),
            numbers,
        }
    }
}

/// ISO week key such as "2026-W42". The year is the ISO week-based year.
pub fn week_key(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

#[async_trait]
pub trait PulseSink: Send + Sync {
    async fn record(&self, pulse: &Pulse) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// HTTP sink
// ---------------------------------------------------------------------------

pub struct HttpPulseSink {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpPulseSink {
    pub fn new(endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PulseSink for HttpPulseSink {
    async fn record(&self, pulse: &Pulse) -> anyhow::Result<()> {
        let response = self.http.post(&self.endpoint).json(pulse).send().await?;
        response.error_for_status()?;
        debug!(week = %pulse.week, "pulse recorded");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PulseClient wrapper
// ---------------------------------------------------------------------------

/// Either a configured HTTP sink or a no-op.
pub enum PulseClient {
    Active(HttpPulseSink),
    Disabled,
}

impl PulseClient {
    /// `Active` when an endpoint is configured and non-empty.
    pub fn from_config(config: &PulseConfig) -> Self {
        match &config.endpoint {
            Some(endpoint) if !endpoint.trim().is_empty() => {
                PulseClient::Active(HttpPulseSink::new(endpoint.trim().to_string()))
            }
            _ => PulseClient::Disabled,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, PulseClient::Active(_))
    }
}

#[async_trait]
impl PulseSink for PulseClient {
    async fn record(&self, pulse: &Pulse) -> anyhow::Result<()> {
        match self {
            PulseClient::Active(sink) => sink.record(pulse).await,
            PulseClient::Disabled => Ok(()),
        }
    }
}

/// Send a pulse for `numbers` in the background.
///
/// Returns `None` without sending when called outside a tokio runtime.
pub fn fire(sink: Arc<dyn PulseSink>, numbers: Vec<u8>) -> Option<JoinHandle<()>> {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        debug!("no async runtime; pulse skipped");
        return None;
    };
    let pulse = Pulse::new(numbers, Local::now().date_naive());
    Some(handle.spawn(async move {
        if let Err(e) = sink.record(&pulse).await {
            warn!("pulse failed: {e:#}");
        }
    }))
}
