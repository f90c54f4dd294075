use std::sync::Arc;
use std::time::Duration;

use crate::renewal::health::{HealthSnapshot, HealthStatus};
use crate::renewal::manager::RenewalManager;

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

/// Display severity derived from the health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Warning,
    Critical,
}

/// Read-only display shape combining cached-token validity and the health
/// record. Never feeds back into core state.
#[derive(Debug, Clone, Serialize)]
pub struct TokenStatusView {
    pub status: HealthStatus,
    pub is_valid: bool,
    pub seconds_remaining: i64,
    pub severity: Severity,
    pub refresh_count: u64,
    pub error_count: u64,
}

pub fn project(snapshot: &HealthSnapshot) -> TokenStatusView {
    let severity = match snapshot.status {
        HealthStatus::Healthy | HealthStatus::Renewed => Severity::Ok,
        HealthStatus::Unknown | HealthStatus::RenewalNeeded => Severity::Warning,
        HealthStatus::Expired | HealthStatus::Error | HealthStatus::NoToken => Severity::Critical,
    };
    TokenStatusView {
        status: snapshot.status,
        is_valid: snapshot.is_valid,
        seconds_remaining: snapshot.time_to_expiry.unwrap_or(0).max(0),
        severity,
        refresh_count: snapshot.refresh_count,
        error_count: snapshot.error_count,
    }
}

/// Publishes a fresh projection on a fixed poll interval and immediately on
/// renewal events.
pub async fn spawn_status_poller(
    manager: Arc<RenewalManager>,
    poll_interval: Duration,
) -> watch::Receiver<TokenStatusView> {
    let initial = project(&manager.snapshot().await);
    let (tx, rx) = watch::channel(initial);

    tokio::spawn(async move {
        let mut events = manager.subscribe();
        let mut tick = tokio::time::interval(poll_interval);
        loop {
            tokio::select! {
                _ = tick.tick() => {}
                event = events.next() => {
                    debug!(immediate = event.is_some(), "status poller woken by event");
                }
            }
            let view = project(&manager.snapshot().await);
            if tx.send(view).is_err() {
                // all displays are gone
                return;
            }
        }
    });

    rx
}
