//! Best-effort customer notifications for committed status changes.
//!
//! Nothing here reports an error to the rider-facing caller. Every failure
//! is logged and counted, then dropped without retry.

pub mod push;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::error::NotificationError;
use crate::models::event::TransitionEvent;
use crate::models::order::OrderStatus;
use crate::observability::metrics::Metrics;
use crate::store::NotificationTargets;

pub use push::{PushClient, PushPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Delivered,
    NoTarget,
    Disabled,
    Failed,
}

impl NotifyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyOutcome::Delivered => "delivered",
            NotifyOutcome::NoTarget => "no_target",
            NotifyOutcome::Disabled => "disabled",
            NotifyOutcome::Failed => "failed",
        }
    }
}

pub struct NotificationDispatcher {
    targets: Arc<dyn NotificationTargets>,
    push: Option<PushClient>,
}

impl NotificationDispatcher {
    /// `push` is `None` when no push credentials are configured.
    pub fn new(targets: Arc<dyn NotificationTargets>, push: Option<PushClient>) -> Self {
        Self { targets, push }
    }

    pub async fn notify(
        &self,
        customer_id: &str,
        order_id: &str,
        status: OrderStatus,
        restaurant_name: &str,
    ) -> NotifyOutcome {
        let outcome = match self
            .try_notify(customer_id, order_id, status, restaurant_name)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, customer_id, order_id, "status notification failed");
                NotifyOutcome::Failed
            }
        };

        if outcome == NotifyOutcome::Delivered {
            info!(customer_id, order_id, status = %status, "status notification sent");
        }
        outcome
    }

    async fn try_notify(
        &self,
        customer_id: &str,
        order_id: &str,
        status: OrderStatus,
        restaurant_name: &str,
    ) -> Result<NotifyOutcome, NotificationError> {
        let token = self
            .targets
            .push_token(customer_id)
            .await
            .map_err(|err| NotificationError::Lookup(err.to_string()))?;

        let Some(token) = token else {
            warn!(customer_id, order_id, "customer has no registered device");
            return Ok(NotifyOutcome::NoTarget);
        };

        let Some(push) = &self.push else {
            info!(customer_id, order_id, "push delivery disabled; skipping notification");
            return Ok(NotifyOutcome::Disabled);
        };

        let payload = PushPayload::status_update(
            push.app_id(),
            &token,
            order_id,
            status.as_str(),
            restaurant_name,
        );
        push.send(&payload).await?;

        Ok(NotifyOutcome::Delivered)
    }
}

/// Consumes committed transitions and notifies the customer for each.
pub async fn run_notification_dispatcher(
    dispatcher: Arc<NotificationDispatcher>,
    metrics: Metrics,
    mut event_rx: mpsc::Receiver<TransitionEvent>,
) {
    info!("notification dispatcher started");

    while let Some(event) = event_rx.recv().await {
        metrics.notification_queue_depth.dec();

        let outcome = dispatcher
            .notify(
                &event.customer_id,
                &event.order_id,
                event.status,
                &event.restaurant_name,
            )
            .await;

        metrics
            .notifications_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    warn!("notification dispatcher stopped: event channel closed");
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use chrono::Utc;
    use secrecy::SecretString;
    use serde_json::Value;
    use tokio::sync::mpsc;

    use super::{NotificationDispatcher, NotifyOutcome, PushClient, run_notification_dispatcher};
    use crate::config::PushSettings;
    use crate::models::event::TransitionEvent;
    use crate::models::order::OrderStatus;
    use crate::observability::metrics::Metrics;
    use crate::store::{MemoryStore, NotificationTargets};

    #[derive(Clone, Default)]
    struct Captured {
        requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    }

    async fn capture(
        State((captured, status)): State<(Captured, StatusCode)>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, &'static str) {
        let auth = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        captured.requests.lock().unwrap().push((auth, body));
        (status, "{\"id\":\"n-1\"}")
    }

    async fn push_endpoint(status: StatusCode) -> (String, Captured) {
        let captured = Captured::default();
        let app = Router::new()
            .route("/notifications", post(capture))
            .with_state((captured.clone(), status));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/notifications"), captured)
    }

    fn client(endpoint: String) -> PushClient {
        PushClient::new(&PushSettings {
            app_id: "app-123".to_string(),
            api_key: SecretString::from("service-key".to_string()),
            endpoint,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    async fn targets_with_token() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new(16));
        store
            .register_push_token("customer-1", "player-abc")
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn posts_status_update_with_basic_auth() {
        let (endpoint, captured) = push_endpoint(StatusCode::OK).await;
        let dispatcher =
            NotificationDispatcher::new(targets_with_token().await, Some(client(endpoint)));

        let outcome = dispatcher
            .notify("customer-1", "order-1", OrderStatus::Accepted, "Chillox")
            .await;

        assert_eq!(outcome, NotifyOutcome::Delivered);
        let requests = captured.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);

        let (auth, body) = &requests[0];
        assert_eq!(auth.as_deref(), Some("Basic service-key"));
        assert_eq!(body["app_id"], "app-123");
        assert_eq!(body["include_player_ids"][0], "player-abc");
        assert_eq!(body["headings"]["en"], "Order Status Update");
        assert_eq!(
            body["contents"]["en"],
            "Your order from Chillox (ID: order-1) is now Accepted."
        );
        assert_eq!(body["data"]["orderId"], "order-1");
    }

    #[tokio::test]
    async fn missing_token_is_not_an_error() {
        let (endpoint, captured) = push_endpoint(StatusCode::OK).await;
        let store = Arc::new(MemoryStore::new(16));
        let dispatcher = NotificationDispatcher::new(store, Some(client(endpoint)));

        let outcome = dispatcher
            .notify("nobody", "order-1", OrderStatus::Delivered, "Chillox")
            .await;

        assert_eq!(outcome, NotifyOutcome::NoTarget);
        assert!(captured.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_request_is_swallowed() {
        let (endpoint, captured) = push_endpoint(StatusCode::BAD_REQUEST).await;
        let dispatcher =
            NotificationDispatcher::new(targets_with_token().await, Some(client(endpoint)));

        let outcome = dispatcher
            .notify("customer-1", "order-1", OrderStatus::OnTheWay, "Chillox")
            .await;

        assert_eq!(outcome, NotifyOutcome::Failed);
        // Not retried.
        assert_eq!(captured.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_swallowed() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dispatcher = NotificationDispatcher::new(
            targets_with_token().await,
            Some(client(format!("http://{addr}/notifications"))),
        );

        let outcome = dispatcher
            .notify("customer-1", "order-1", OrderStatus::OnTheWay, "Chillox")
            .await;

        assert_eq!(outcome, NotifyOutcome::Failed);
    }

    #[tokio::test]
    async fn disabled_push_skips_delivery() {
        let dispatcher = NotificationDispatcher::new(targets_with_token().await, None);

        let outcome = dispatcher
            .notify("customer-1", "order-1", OrderStatus::Accepted, "Chillox")
            .await;

        assert_eq!(outcome, NotifyOutcome::Disabled);
    }

    #[tokio::test]
    async fn dispatcher_loop_counts_outcomes() {
        let metrics = Metrics::new();
        let dispatcher = Arc::new(NotificationDispatcher::new(
            Arc::new(MemoryStore::new(16)),
            None,
        ));
        let (tx, rx) = mpsc::channel(8);

        metrics.notification_queue_depth.inc();
        tx.send(TransitionEvent {
            order_id: "order-1".to_string(),
            customer_id: "customer-1".to_string(),
            restaurant_name: "Chillox".to_string(),
            status: OrderStatus::Accepted,
            rider_id: Some("rider-1".to_string()),
            committed_at: Utc::now(),
        })
        .await
        .unwrap();
        drop(tx);

        run_notification_dispatcher(dispatcher, metrics.clone(), rx).await;

        assert_eq!(metrics.notification_queue_depth.get(), 0);
        assert_eq!(
            metrics
                .notifications_total
                .with_label_values(&["no_target"])
                .get(),
            1
        );
    }
}
