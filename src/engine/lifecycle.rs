use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{error, warn};

use crate::engine::transition::TransitionAuthority;
use crate::error::AppError;
use crate::models::event::TransitionEvent;
use crate::models::order::{Order, OrderStatus};
use crate::observability::metrics::Metrics;
use crate::store::{OrderStore, RiderStore};

const UNKNOWN_RESTAURANT: &str = "Unknown Restaurant";

/// Runs one rider action end to end: fetch the order, apply the transition,
/// then hand a [`TransitionEvent`] to the notification queue.
#[derive(Clone)]
pub struct OrderLifecycle {
    orders: Arc<dyn OrderStore>,
    riders: Arc<dyn RiderStore>,
    authority: TransitionAuthority,
    event_tx: mpsc::Sender<TransitionEvent>,
    metrics: Metrics,
}

impl OrderLifecycle {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        riders: Arc<dyn RiderStore>,
        authority: TransitionAuthority,
        event_tx: mpsc::Sender<TransitionEvent>,
        metrics: Metrics,
    ) -> Self {
        Self {
            orders,
            riders,
            authority,
            event_tx,
            metrics,
        }
    }

    pub fn authority(&self) -> &TransitionAuthority {
        &self.authority
    }

    pub async fn accept(&self, order_id: &str, rider_id: &str) -> Result<Order, AppError> {
        let rider = self
            .riders
            .get_rider(rider_id)
            .await
            .map_err(|err| AppError::WriteFailed(err.to_string()))?
            .ok_or_else(|| AppError::RiderNotFound(rider_id.to_string()))?;

        let before = self.fetch(order_id).await?;
        let order = self
            .authority
            .accept_order(order_id, &rider.id, &rider.name)
            .await?;

        self.publish(&before, &order);
        Ok(order)
    }

    pub async fn advance(&self, order_id: &str, status: OrderStatus) -> Result<Order, AppError> {
        let before = self.fetch(order_id).await?;
        let order = self.authority.advance_status(order_id, status).await?;

        self.publish(&before, &order);
        Ok(order)
    }

    async fn fetch(&self, order_id: &str) -> Result<Order, AppError> {
        self.orders
            .get_order(order_id)
            .await
            .map_err(|err| AppError::WriteFailed(err.to_string()))?
            .ok_or_else(|| AppError::OrderNotFound(order_id.to_string()))
    }

    /// Only called after the store acknowledged the write. Never fails the
    /// caller: the transition is already committed.
    fn publish(&self, before: &Order, after: &Order) {
        let Some(customer_id) = before.customer_id.clone() else {
            warn!(order_id = %after.id, "order has no customer; skipping notification");
            return;
        };

        let event = TransitionEvent {
            order_id: after.id.clone(),
            customer_id,
            restaurant_name: before
                .restaurant_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_RESTAURANT.to_string()),
            status: after.status,
            rider_id: after.rider_id.clone(),
            committed_at: Utc::now(),
        };

        // Counted before the send so the dispatcher never decrements first.
        self.metrics.notification_queue_depth.inc();

        if let Err(err) = self.event_tx.try_send(event) {
            match &err {
                TrySendError::Full(event) => {
                    warn!(order_id = %event.order_id, "notification queue full; dropping event");
                }
                TrySendError::Closed(event) => {
                    error!(order_id = %event.order_id, "notification queue closed; dropping event");
                }
            }

            self.metrics.notification_queue_depth.dec();
            self.metrics
                .notifications_total
                .with_label_values(&["dropped"])
                .inc();
        }
    }
}
