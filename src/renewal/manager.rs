use std::sync::Arc;
use std::time::Duration;

use crate::acquisition::coordinator::TokenCoordinator;
use crate::helpers::time::now_i64;
use crate::observability::metrics::get_metrics;
use crate::renewal::events::{AuthEvent, EventBus, EventStream};
use crate::renewal::health::{HealthRecord, HealthSnapshot, HealthStatus};

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RenewalSettings {
    /// Recurring health-check tick.
    pub check_interval: Duration,
    /// Renewal fires this long before expiry.
    pub renewal_buffer_seconds: i64,
    /// Fixed delay before retrying a failed renewal, independent of the tick.
    pub retry_delay: Duration,
}

impl Default for RenewalSettings {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(300),
            renewal_buffer_seconds: 900,
            retry_delay: Duration::from_secs(60),
        }
    }
}

/// Keeps the coordinator's token warm by renewing it ahead of expiry.
///
/// Owns the health record. Renewal reuses the coordinator's broker-then-direct
/// path, so its failure semantics match foreground acquisition, but failures
/// here only land in the health record: a request still served by a valid
/// cached token never sees a background renewal error.
pub struct RenewalManager {
    coordinator: TokenCoordinator,
    events: EventBus,
    record: RwLock<HealthRecord>,
    settings: RenewalSettings,
    started_at: i64,
}

impl RenewalManager {
    pub fn new(coordinator: TokenCoordinator, settings: RenewalSettings) -> Arc<Self> {
        Arc::new(Self {
            coordinator,
            events: EventBus::new(),
            record: RwLock::new(HealthRecord::default()),
            settings,
            started_at: now_i64(),
        })
    }

    pub fn subscribe(&self) -> EventStream {
        self.events.subscribe()
    }

    /// Starts the background health-check loop.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run().await })
    }

    async fn run(self: Arc<Self>) {
        let mut tick = tokio::time::interval(self.settings.check_interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // One-shot deadline for the next proactive renewal or error retry.
        let mut scheduled: Option<Instant> = None;

        loop {
            let fire_scheduled = match scheduled {
                Some(deadline) => tokio::select! {
                    _ = tick.tick() => false,
                    _ = tokio::time::sleep_until(deadline) => true,
                },
                None => {
                    tick.tick().await;
                    false
                }
            };

            scheduled = if fire_scheduled {
                self.renew("scheduled renewal").await
            } else {
                // A tick that triggers no renewal leaves any pending one-shot
                // schedule in place.
                self.check_once().await.or(scheduled)
            };
        }
    }

    /// One health-check tick. Returns the next one-shot renewal deadline when
    /// this tick triggered a renewal.
    pub async fn check_once(&self) -> Option<Instant> {
        match self.coordinator.cached_token().await {
            None => {
                self.transition(HealthStatus::NoToken, "no cached token".to_string())
                    .await;
                None
            }
            Some(token) => {
                let tte = token.time_to_expiry();
                if tte <= 0 {
                    self.transition(
                        HealthStatus::Expired,
                        format!("token expired {}s ago", -tte),
                    )
                    .await;
                    self.renew("token expired").await
                } else if tte <= self.settings.renewal_buffer_seconds {
                    self.transition(
                        HealthStatus::RenewalNeeded,
                        format!("token expires in {tte}s"),
                    )
                    .await;
                    self.renew("inside renewal window").await
                } else {
                    self.transition(HealthStatus::Healthy, format!("token valid for {tte}s"))
                        .await;
                    None
                }
            }
        }
    }

    /// Combined health record + cached token view for projections and the
    /// status endpoint.
    pub async fn snapshot(&self) -> HealthSnapshot {
        let record = self.record.read().await.clone();
        let token = self.coordinator.cached_token().await;
        HealthSnapshot {
            status: record.status,
            is_valid: self.coordinator.has_usable_token().await,
            expires_at: token.as_ref().map(|t| t.expires_at),
            time_to_expiry: token.as_ref().map(|t| t.time_to_expiry()),
            refresh_count: record.refresh_count,
            error_count: record.error_count,
            last_error: record.last_error,
            uptime: (now_i64() - self.started_at).max(0) as u64,
        }
    }

    async fn renew(&self, trigger: &str) -> Option<Instant> {
        info!(trigger, "proactive renewal starting");
        let metrics = get_metrics().await;

        match self.coordinator.refresh_token().await {
            Ok(token) => {
                metrics.renewal_successes.inc();
                self.record.write().await.refresh_count += 1;
                self.transition(HealthStatus::Renewed, "renewal succeeded".to_string())
                    .await;
                self.events.publish(AuthEvent::TokenRenewed {
                    timestamp: now_i64(),
                    method: token.acquired_via.to_string(),
                    token_info: token.info(),
                });
                let delay =
                    seconds_until_renewal(token.expires_at, self.settings.renewal_buffer_seconds);
                debug!(delay, "next renewal scheduled");
                Some(Instant::now() + Duration::from_secs(delay))
            }
            Err(e) => {
                metrics.renewal_failures.inc();
                {
                    let mut record = self.record.write().await;
                    record.error_count += 1;
                    record.last_error = Some(e.to_string());
                }
                self.transition(HealthStatus::Error, format!("renewal failed: {e}"))
                    .await;
                warn!(
                    retry_in = self.settings.retry_delay.as_secs(),
                    "renewal failed: {e}"
                );
                Some(Instant::now() + self.settings.retry_delay)
            }
        }
    }

    /// Records the check and emits a status-change event, but only on an
    /// actual transition.
    async fn transition(&self, next: HealthStatus, message: String) {
        let previous = {
            let mut record = self.record.write().await;
            record.last_check_at = Some(now_i64());
            if record.status == next {
                return;
            }
            let previous = record.status;
            record.status = next;
            previous
        };
        info!(previous = previous.as_str(), current = next.as_str(), "token health transition");
        self.events.publish(AuthEvent::StatusChange {
            previous,
            current: next,
            message,
            timestamp: now_i64(),
        });
    }
}

/// Seconds from now until the one-shot renewal for a token expiring at
/// `expires_at` should fire: exactly `renewal_buffer` before expiry, clamped
/// at zero for tokens already inside the window.
fn seconds_until_renewal(expires_at: i64, renewal_buffer: i64) -> u64 {
    (expires_at - renewal_buffer - now_i64()).max(0) as u64
}
