
// Proactive renewal: window detection, one-shot scheduling relative to the
// new expiry, fixed-delay retry on failure, and status-change dedup.

#[cfg(test)]
mod test {

    use std::time::Duration;

    use axum::{routing::post, Json, Router};
    use serde_json::json;
    use tokio::time::Instant;

    use crate::acquisition::token::CachedToken;
    use crate::error::Strategy;
    use crate::helpers::time::now_i64;
    use crate::renewal::events::AuthEvent;
    use crate::renewal::health::HealthStatus;
    use crate::renewal::manager::{RenewalManager, RenewalSettings};
    use crate::tests::common::{build_coordinator, empty_store, spawn_axum, store_with_credentials};

    fn settings() -> RenewalSettings {
        RenewalSettings {
            check_interval: Duration::from_secs(300),
            renewal_buffer_seconds: 900,
            retry_delay: Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn unchanged_status_is_never_reemitted() {
        let coordinator = build_coordinator(empty_store(), None, None);
        let manager = RenewalManager::new(coordinator, settings());
        let mut events = manager.subscribe();

        manager.check_once().await;
        manager.check_once().await;
        manager.check_once().await;

        match events.try_next() {
            Some(AuthEvent::StatusChange {
                previous, current, ..
            }) => {
                assert_eq!(previous, HealthStatus::Unknown);
                assert_eq!(current, HealthStatus::NoToken);
            }
            other => panic!("expected one status change, got {other:?}"),
        }
        assert!(events.try_next().is_none(), "no repeat for unchanged status");

        let snapshot = manager.snapshot().await;
        assert_eq!(snapshot.status, HealthStatus::NoToken);
        assert!(!snapshot.is_valid);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn renewal_window_renews_and_schedules_buffer_before_new_expiry() {
        let new_expiry = now_i64() + 3600;
        let router = Router::new().route(
            "/issueToken",
            post(move |Json(_): Json<serde_json::Value>| async move {
                Json(json!({
                    "success": true,
                    "token": "tok-renewed",
                    "tokenInfo": { "expiresAt": new_expiry, "tokenType": "Bearer" }
                }))
            }),
        );
        let (handle, addr) = spawn_axum(router).await;

        let coordinator = build_coordinator(
            store_with_credentials().await,
            Some(format!("http://{addr}/issueToken")),
            None,
        );
        // inside the 900s renewal window, but not yet expired
        coordinator
            .inject_cached_token(CachedToken::new(
                "tok-aging",
                "Bearer",
                now_i64() + 600,
                Strategy::Broker,
            ))
            .await;

        let manager = RenewalManager::new(coordinator.clone(), settings());
        let mut events = manager.subscribe();

        let deadline = manager.check_once().await.expect("renewal scheduled");
        let delay = deadline.saturating_duration_since(Instant::now()).as_secs();
        assert!(
            (2695..=2700).contains(&delay),
            "next renewal ~900s before the new expiry, got {delay}s"
        );

        let snapshot = manager.snapshot().await;
        assert_eq!(snapshot.status, HealthStatus::Renewed);
        assert_eq!(snapshot.refresh_count, 1);
        assert_eq!(snapshot.error_count, 0);
        assert_eq!(coordinator.cached_token().await.unwrap().value, "tok-renewed");

        // transition trail: -> renewal_needed -> renewed, plus the renewal event
        match events.try_next() {
            Some(AuthEvent::StatusChange { current, .. }) => {
                assert_eq!(current, HealthStatus::RenewalNeeded)
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match events.try_next() {
            Some(AuthEvent::StatusChange { current, .. }) => {
                assert_eq!(current, HealthStatus::Renewed)
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match events.try_next() {
            Some(AuthEvent::TokenRenewed { method, token_info, .. }) => {
                assert_eq!(method, "broker");
                assert_eq!(token_info.expires_at, new_expiry);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        // next tick re-evaluates the renewed token as healthy
        assert!(manager.check_once().await.is_none());
        assert_eq!(manager.snapshot().await.status, HealthStatus::Healthy);

        handle.abort();
    }

    #[tokio::test]
    async fn failed_renewal_records_error_and_schedules_fixed_retry() {
        // no broker, no credentials: the renewal cycle can only fail
        let coordinator = build_coordinator(empty_store(), None, None);
        coordinator
            .inject_cached_token(CachedToken::new(
                "tok-dead",
                "Bearer",
                now_i64() - 10,
                Strategy::Direct,
            ))
            .await;

        let manager = RenewalManager::new(coordinator.clone(), settings());

        let deadline = manager.check_once().await.expect("retry scheduled");
        let delay = deadline.saturating_duration_since(Instant::now()).as_secs();
        assert!((55..=60).contains(&delay), "fixed retry delay, got {delay}s");

        let snapshot = manager.snapshot().await;
        assert_eq!(snapshot.status, HealthStatus::Error);
        assert_eq!(snapshot.error_count, 1);
        assert!(snapshot.last_error.is_some());

        // the failed cycle also cleared the cache
        assert!(coordinator.cached_token().await.is_none());
    }
}
