use std::sync::Arc;
use std::time::Duration;

use crate::acquisition::broker::{BrokerClient, BrokerGrant};
use crate::acquisition::direct::{DirectExchange, DirectGrant};
use crate::acquisition::token::CachedToken;
use crate::credentials::store::CredentialStore;
use crate::error::{AcquireError, Strategy};
use crate::helpers::time::{get_instant, now_i64};
use crate::observability::metrics::get_metrics;
use crate::validator::TokenValidator;

use reqwest::Client;
use tokio::sync::{broadcast, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Outcome of one acquisition cycle, fanned out identically to every caller
/// queued on it.
pub type AcquireOutcome = Result<CachedToken, AcquireError>;

#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Lead time before nominal expiry after which the cache is not served.
    pub safety_buffer_seconds: u64,
    /// Hard staleness ceiling independent of provider-declared expiry.
    pub max_age_seconds: u64,
    /// Lifetime assumed when neither broker metadata nor claims carry one.
    pub assumed_lifetime_seconds: i64,
    /// Upper bound for one broker or direct exchange.
    pub exchange_timeout: Duration,
    /// Trusted broker endpoint. Unset skips straight to direct exchange.
    pub broker_url: Option<String>,
    /// Overrides the region-derived provider token endpoint.
    pub direct_token_url: Option<String>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            safety_buffer_seconds: 300,
            max_age_seconds: 3600,
            assumed_lifetime_seconds: 3600,
            exchange_timeout: Duration::from_secs(30),
            broker_url: None,
            direct_token_url: None,
        }
    }
}

struct CoordinatorState {
    cached: Option<CachedToken>,
    inflight: Option<broadcast::Sender<AcquireOutcome>>,
}

struct Inner {
    config: AcquisitionConfig,
    store: Arc<CredentialStore>,
    validator: TokenValidator,
    broker: Option<BrokerClient>,
    direct: DirectExchange,
    state: Mutex<CoordinatorState>,
}

/// Coordinates token acquisition so at most one exchange is in flight.
///
/// Callers hitting a valid cache return immediately without I/O. Callers
/// arriving during an acquisition subscribe to its outcome instead of
/// starting their own. The cycle itself runs on a spawned task, so a caller
/// dropping its future cannot strand the other waiters.
#[derive(Clone)]
pub struct TokenCoordinator {
    inner: Arc<Inner>,
}

impl TokenCoordinator {
    pub fn new(
        client: Client,
        store: Arc<CredentialStore>,
        validator: TokenValidator,
        config: AcquisitionConfig,
    ) -> Self {
        let broker = config
            .broker_url
            .clone()
            .map(|url| BrokerClient::new(client.clone(), url));
        let direct = match config.direct_token_url.clone() {
            Some(url) => DirectExchange::with_token_url(client, url),
            None => DirectExchange::new(client),
        };
        Self {
            inner: Arc::new(Inner {
                config,
                store,
                validator,
                broker,
                direct,
                state: Mutex::new(CoordinatorState {
                    cached: None,
                    inflight: None,
                }),
            }),
        }
    }

    /// Returns a usable token: from cache when valid, otherwise from the
    /// single shared acquisition cycle. Never returns an expired token.
    pub async fn get_token(&self) -> AcquireOutcome {
        let config = &self.inner.config;
        let mut rx = {
            let mut state = self.inner.state.lock().await;
            if let Some(token) = state
                .cached
                .as_ref()
                .filter(|t| t.is_usable(config.safety_buffer_seconds, config.max_age_seconds))
            {
                get_metrics().await.cache_hits.inc();
                debug!("serving token from cache");
                return Ok(token.clone());
            }
            self.join_or_start_cycle(&mut state)
        };
        recv_outcome(&mut rx).await
    }

    /// Runs an acquisition cycle regardless of cache validity, still honoring
    /// the one-in-flight invariant. Used by the proactive renewal path.
    pub async fn refresh_token(&self) -> AcquireOutcome {
        let mut rx = {
            let mut state = self.inner.state.lock().await;
            self.join_or_start_cycle(&mut state)
        };
        recv_outcome(&mut rx).await
    }

    /// Snapshot of the cached token, for health checks and projections.
    pub async fn cached_token(&self) -> Option<CachedToken> {
        self.inner.state.lock().await.cached.clone()
    }

    /// Whether the cached token currently passes the validity check.
    pub async fn has_usable_token(&self) -> bool {
        let config = &self.inner.config;
        self.inner
            .state
            .lock()
            .await
            .cached
            .as_ref()
            .map(|t| t.is_usable(config.safety_buffer_seconds, config.max_age_seconds))
            .unwrap_or(false)
    }

    /// Drops the cached token so the next caller starts a fresh cycle.
    pub async fn clear_cache(&self) {
        self.inner.state.lock().await.cached = None;
    }

    #[cfg(test)]
    pub(crate) async fn inject_cached_token(&self, token: CachedToken) {
        self.inner.state.lock().await.cached = Some(token);
    }

    fn join_or_start_cycle(
        &self,
        state: &mut CoordinatorState,
    ) -> broadcast::Receiver<AcquireOutcome> {
        if let Some(tx) = &state.inflight {
            debug!("acquisition already in flight, joining as waiter");
            return tx.subscribe();
        }
        let (tx, rx) = broadcast::channel(1);
        state.inflight = Some(tx.clone());
        let this = self.clone();
        tokio::spawn(async move { this.run_cycle(tx).await });
        rx
    }

    async fn run_cycle(self, tx: broadcast::Sender<AcquireOutcome>) {
        let outcome = self.acquire_once().await;

        // Publish under the state lock: anyone who saw the in-flight slot
        // occupied already holds a receiver, anyone locking after us sees the
        // slot free and the cache updated.
        let mut state = self.inner.state.lock().await;
        match &outcome {
            Ok(token) => {
                info!(expires_at = token.expires_at, "acquisition cycle succeeded");
                state.cached = Some(token.clone());
            }
            Err(e) => {
                warn!("acquisition cycle failed: {e}");
                state.cached = None;
            }
        }
        state.inflight = None;
        let _ = tx.send(outcome);
    }

    async fn acquire_once(&self) -> AcquireOutcome {
        let config = &self.inner.config;
        let metrics = get_metrics().await;
        let credentials = self.inner.store.get().await;

        let broker_failure = match &self.inner.broker {
            Some(broker) => {
                let tenant_id = credentials
                    .as_ref()
                    .map(|c| c.tenant_id.as_str())
                    .unwrap_or_default();
                metrics
                    .acquisition_attempts
                    .with_label_values(&[Strategy::Broker.as_str()])
                    .inc();
                let start = get_instant();
                let attempt = timeout(config.exchange_timeout, broker.request_token(tenant_id)).await;
                metrics
                    .acquisition_duration
                    .with_label_values(&[Strategy::Broker.as_str()])
                    .observe(start.elapsed().as_secs_f64());
                match attempt {
                    Ok(Ok(grant)) => {
                        let token = self.token_from_broker(grant);
                        metrics.token_expiry_unix.set(token.expires_at);
                        return Ok(token);
                    }
                    Ok(Err(e)) => e.to_string(),
                    Err(_) => format!(
                        "timed out after {}s",
                        config.exchange_timeout.as_secs()
                    ),
                }
            }
            None => "broker not configured".to_string(),
        };

        metrics
            .acquisition_failures
            .with_label_values(&[Strategy::Broker.as_str()])
            .inc();
        warn!("broker unavailable ({broker_failure}), falling back to direct exchange");

        let Some(credentials) = credentials else {
            return Err(AcquireError::Configuration(
                "no usable credentials for direct exchange".to_string(),
            ));
        };

        metrics
            .acquisition_attempts
            .with_label_values(&[Strategy::Direct.as_str()])
            .inc();
        let start = get_instant();
        let attempt = timeout(
            config.exchange_timeout,
            self.inner.direct.request_token(&credentials),
        )
        .await;
        metrics
            .acquisition_duration
            .with_label_values(&[Strategy::Direct.as_str()])
            .observe(start.elapsed().as_secs_f64());

        match attempt {
            Ok(Ok(grant)) => {
                let token = self.token_from_direct(grant);
                metrics.token_expiry_unix.set(token.expires_at);
                Ok(token)
            }
            Ok(Err(e)) => {
                metrics
                    .acquisition_failures
                    .with_label_values(&[Strategy::Direct.as_str()])
                    .inc();
                Err(AcquireError::Terminal {
                    broker: broker_failure,
                    direct: e.to_string(),
                })
            }
            Err(_) => {
                metrics
                    .acquisition_failures
                    .with_label_values(&[Strategy::Direct.as_str()])
                    .inc();
                Err(AcquireError::Terminal {
                    broker: broker_failure,
                    direct: format!("timed out after {}s", config.exchange_timeout.as_secs()),
                })
            }
        }
    }

    /// Broker replies may omit structured metadata; the validator then
    /// supplies expiry from the token claims, and an assumed lifetime covers
    /// opaque tokens.
    fn token_from_broker(&self, grant: BrokerGrant) -> CachedToken {
        let config = &self.inner.config;
        let (expires_at, token_type) = match grant.token_info {
            Some(info) => (info.expires_at, info.token_type),
            None => {
                let exp = self
                    .inner
                    .validator
                    .decode_claims(&grant.token)
                    .and_then(|claims| claims.exp)
                    .unwrap_or_else(|| now_i64() + config.assumed_lifetime_seconds);
                (exp, "Bearer".to_string())
            }
        };
        CachedToken::new(grant.token, token_type, expires_at, Strategy::Broker)
    }

    fn token_from_direct(&self, grant: DirectGrant) -> CachedToken {
        let config = &self.inner.config;
        let lifetime = grant.expires_in.unwrap_or(config.assumed_lifetime_seconds);
        CachedToken::new(
            grant.access_token,
            grant.token_type.unwrap_or_else(|| "Bearer".to_string()),
            now_i64() + lifetime,
            Strategy::Direct,
        )
    }
}

async fn recv_outcome(rx: &mut broadcast::Receiver<AcquireOutcome>) -> AcquireOutcome {
    match rx.recv().await {
        Ok(outcome) => outcome,
        // The cycle task publishes exactly once; losing the sender without a
        // value means the runtime tore the task down mid-cycle.
        Err(_) => Err(AcquireError::transient(
            Strategy::Broker,
            "acquisition cycle aborted before resolving",
        )),
    }
}
