use crate::acquisition::token::TokenInfo;
use crate::renewal::health::HealthStatus;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// Events emitted by the renewal manager. Status changes fire only on actual
/// transitions, never repeatedly for an unchanged status.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthEvent {
    StatusChange {
        previous: HealthStatus,
        current: HealthStatus,
        message: String,
        timestamp: i64,
    },
    TokenRenewed {
        timestamp: i64,
        method: String,
        token_info: TokenInfo,
    },
}

/// Explicit observer seam: subscribers get their own ordered stream instead
/// of hooking callbacks into the manager.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AuthEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream {
            rx: self.tx.subscribe(),
        }
    }

    pub fn publish(&self, event: AuthEvent) {
        debug!(?event, "publishing auth event");
        // No subscribers is fine; events are advisory.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// In-order event stream for one subscriber.
#[derive(Debug)]
pub struct EventStream {
    rx: broadcast::Receiver<AuthEvent>,
}

impl EventStream {
    /// Next event, or `None` once the publisher is gone. A slow subscriber
    /// that lagged past the buffer skips ahead rather than erroring out.
    pub async fn next(&mut self) -> Option<AuthEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "event subscriber lagged, skipping ahead");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking drain, used by pollers that only want what is pending.
    pub fn try_next(&mut self) -> Option<AuthEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe();

        bus.publish(AuthEvent::StatusChange {
            previous: HealthStatus::Unknown,
            current: HealthStatus::NoToken,
            message: "first".into(),
            timestamp: 1,
        });
        bus.publish(AuthEvent::StatusChange {
            previous: HealthStatus::NoToken,
            current: HealthStatus::Healthy,
            message: "second".into(),
            timestamp: 2,
        });

        match stream.next().await {
            Some(AuthEvent::StatusChange { message, .. }) => assert_eq!(message, "first"),
            other => panic!("unexpected event: {other:?}"),
        }
        match stream.next().await {
            Some(AuthEvent::StatusChange { message, .. }) => assert_eq!(message, "second"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_harmless() {
        let bus = EventBus::new();
        bus.publish(AuthEvent::StatusChange {
            previous: HealthStatus::Unknown,
            current: HealthStatus::NoToken,
            message: "nobody listening".into(),
            timestamp: 1,
        });
    }
}
