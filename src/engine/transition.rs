use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::error::{AppError, StoreError};
use crate::models::order::{Order, OrderStatus};
use crate::observability::metrics::Metrics;
use crate::store::{OrderStore, OrderUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPolicy {
    /// Conditional writes and the forward-only transition table.
    Strict,
    /// Unconditional last-writer-wins writes with no current-state check.
    Permissive,
}

impl std::str::FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(TransitionPolicy::Strict),
            "permissive" => Ok(TransitionPolicy::Permissive),
            other => Err(format!("expected strict or permissive, got {other}")),
        }
    }
}

/// Sole writer of `orderStatus`, `riderId` and `riderName`.
#[derive(Clone)]
pub struct TransitionAuthority {
    orders: Arc<dyn OrderStore>,
    policy: TransitionPolicy,
    metrics: Metrics,
}

impl TransitionAuthority {
    pub fn new(orders: Arc<dyn OrderStore>, policy: TransitionPolicy, metrics: Metrics) -> Self {
        Self {
            orders,
            policy,
            metrics,
        }
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    pub async fn accept_order(
        &self,
        order_id: &str,
        rider_id: &str,
        rider_name: &str,
    ) -> Result<Order, AppError> {
        if rider_id.trim().is_empty() {
            return Err(AppError::BadRequest("rider_id cannot be empty".to_string()));
        }

        let start = Instant::now();
        let result = self.write_acceptance(order_id, rider_id, rider_name).await;
        self.record("accept", start, &result);

        if let Ok(order) = &result {
            info!(order_id = %order.id, rider_id, "order accepted");
        }
        result
    }

    pub async fn advance_status(
        &self,
        order_id: &str,
        new_status: OrderStatus,
    ) -> Result<Order, AppError> {
        if !matches!(new_status, OrderStatus::OnTheWay | OrderStatus::Delivered) {
            return Err(AppError::BadRequest(format!(
                "status {new_status} cannot be set by a rider"
            )));
        }

        let start = Instant::now();
        let result = self.write_advance(order_id, new_status).await;
        self.record("advance", start, &result);

        if let Ok(order) = &result {
            info!(order_id = %order.id, status = %new_status, "order status advanced");
        }
        result
    }

    async fn write_acceptance(
        &self,
        order_id: &str,
        rider_id: &str,
        rider_name: &str,
    ) -> Result<Order, AppError> {
        let update = OrderUpdate::accept(rider_id, rider_name);

        let expected = match self.policy {
            TransitionPolicy::Strict => Some(OrderStatus::Pending),
            TransitionPolicy::Permissive => None,
        };

        match self.orders.update_order(order_id, update, expected).await {
            Ok(order) => Ok(order),
            Err(StoreError::PreconditionFailed { current }) => {
                let held_by_caller = current.status == OrderStatus::Accepted
                    && current.rider_id.as_deref() == Some(rider_id);

                if held_by_caller {
                    info!(order_id, rider_id, "acceptance replayed by holding rider");
                    Ok(*current)
                } else {
                    warn!(
                        order_id,
                        rider_id,
                        status = %current.status,
                        "acceptance lost to a concurrent change"
                    );
                    Err(AppError::AlreadyAccepted {
                        order_id: order_id.to_string(),
                        status: current.status,
                    })
                }
            }
            Err(err) => Err(write_error(order_id, err)),
        }
    }

    async fn write_advance(
        &self,
        order_id: &str,
        new_status: OrderStatus,
    ) -> Result<Order, AppError> {
        let update = OrderUpdate::status(new_status);

        if self.policy == TransitionPolicy::Permissive {
            return self
                .orders
                .update_order(order_id, update, None)
                .await
                .map_err(|err| write_error(order_id, err));
        }

        let current = self
            .orders
            .get_order(order_id)
            .await
            .map_err(|err| write_error(order_id, err))?
            .ok_or_else(|| AppError::OrderNotFound(order_id.to_string()))?;

        if !current.status.can_transition_to(new_status) {
            return Err(AppError::InvalidTransition {
                order_id: order_id.to_string(),
                from: current.status,
                to: new_status,
            });
        }

        match self
            .orders
            .update_order(order_id, update, Some(current.status))
            .await
        {
            Ok(order) => Ok(order),
            Err(StoreError::PreconditionFailed { current }) => Err(AppError::InvalidTransition {
                order_id: order_id.to_string(),
                from: current.status,
                to: new_status,
            }),
            Err(err) => Err(write_error(order_id, err)),
        }
    }

    fn record(&self, kind: &str, start: Instant, result: &Result<Order, AppError>) {
        let outcome = if result.is_ok() { "success" } else { "error" };

        self.metrics
            .transition_latency_seconds
            .with_label_values(&[kind])
            .observe(start.elapsed().as_secs_f64());
        self.metrics
            .transitions_total
            .with_label_values(&[kind, outcome])
            .inc();
    }
}

fn write_error(order_id: &str, err: StoreError) -> AppError {
    match err {
        StoreError::NotFound(_) => AppError::OrderNotFound(order_id.to_string()),
        other => AppError::WriteFailed(other.to_string()),
    }
}
