use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::order::{Order, OrderStatus, OrderType};
use crate::models::rider::RiderProfile;
use crate::observability::metrics::Metrics;
use crate::store::{OrderChange, OrderQuery, OrderStore, SortDirection};

const SUBSCRIPTION_BUFFER: usize = 16;

pub type QueryUpdate = Result<Vec<Order>, AppError>;

/// Live query handle. Every item is the full current result set; an `Err`
/// is terminal. Cancelling (or dropping) the handle stops delivery.
pub struct Subscription {
    rx: mpsc::Receiver<QueryUpdate>,
    task: Option<JoinHandle<()>>,
    idle_tx: Option<mpsc::Sender<QueryUpdate>>,
    metrics: Metrics,
}

impl Subscription {
    fn live(rx: mpsc::Receiver<QueryUpdate>, task: JoinHandle<()>, metrics: Metrics) -> Self {
        metrics.live_subscriptions.inc();
        Self {
            rx,
            task: Some(task),
            idle_tx: None,
            metrics,
        }
    }

    /// Emits one empty result set and then stays open without touching the store.
    fn empty(metrics: Metrics) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.try_send(Ok(Vec::new()));
        metrics.live_subscriptions.inc();
        Self {
            rx,
            task: None,
            idle_tx: Some(tx),
            metrics,
        }
    }

    pub async fn next(&mut self) -> Option<QueryUpdate> {
        self.rx.recv().await
    }

    /// Resolves the current result set and tears the subscription down.
    pub async fn snapshot(mut self) -> QueryUpdate {
        match self.next().await {
            Some(update) => update,
            None => Err(AppError::QueryFailed("subscription closed".to_string())),
        }
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Stream for Subscription {
    type Item = QueryUpdate;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.idle_tx.take();
        self.rx.close();
        self.metrics.live_subscriptions.dec();
    }
}

/// Read-only live queries over the order store.
#[derive(Clone)]
pub struct OrderQueryService {
    orders: Arc<dyn OrderStore>,
    metrics: Metrics,
}

impl OrderQueryService {
    pub fn new(orders: Arc<dyn OrderStore>, metrics: Metrics) -> Self {
        Self { orders, metrics }
    }

    /// Pending instant orders in the rider's serviceable locations, newest first.
    pub fn list_available_orders(&self, rider: &RiderProfile) -> Subscription {
        self.subscribe(available_query(rider))
    }

    /// Orders the rider holds that are not yet delivered, oldest first.
    pub fn list_active_orders(&self, rider_id: &str) -> Subscription {
        self.subscribe(OrderQuery {
            status_in: vec![OrderStatus::Accepted, OrderStatus::OnTheWay],
            order_type: None,
            base_location_in: None,
            rider_id: Some(rider_id.to_string()),
            sort: SortDirection::Ascending,
        })
    }

    pub fn list_history(&self, rider_id: &str) -> Subscription {
        self.subscribe(OrderQuery {
            status_in: vec![OrderStatus::Delivered],
            order_type: None,
            base_location_in: None,
            rider_id: Some(rider_id.to_string()),
            sort: SortDirection::Descending,
        })
    }

    fn subscribe(&self, query: OrderQuery) -> Subscription {
        if query.matches_nothing() {
            debug!("query matches nothing; skipping store subscription");
            return Subscription::empty(self.metrics.clone());
        }

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        // Subscribe before the first read so no change between the two is missed.
        let changes = self.orders.watch_orders();
        let task = tokio::spawn(run_query(self.orders.clone(), query, changes, tx));

        Subscription::live(rx, task, self.metrics.clone())
    }
}

fn available_query(rider: &RiderProfile) -> OrderQuery {
    OrderQuery {
        status_in: vec![OrderStatus::Pending],
        order_type: Some(OrderType::Instant),
        base_location_in: Some(rider.serviceable_locations.clone()),
        rider_id: None,
        sort: SortDirection::Descending,
    }
}

async fn run_query(
    orders: Arc<dyn OrderStore>,
    query: OrderQuery,
    mut changes: broadcast::Receiver<OrderChange>,
    tx: mpsc::Sender<QueryUpdate>,
) {
    let mut last: Option<Vec<Order>> = None;

    loop {
        match orders.query_orders(&query).await {
            Ok(result) => {
                if last.as_ref() != Some(&result) {
                    if tx.send(Ok(result.clone())).await.is_err() {
                        return;
                    }
                    last = Some(result);
                }
            }
            Err(err) => {
                warn!(error = %err, "live order query failed");
                let _ = tx.send(Err(AppError::QueryFailed(err.to_string()))).await;
                return;
            }
        }

        match changes.recv().await {
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "order change feed lagged; re-reading");
            }
            Err(RecvError::Closed) => {
                warn!("order change feed closed");
                let _ = tx
                    .send(Err(AppError::QueryFailed(
                        "order change feed closed".to_string(),
                    )))
                    .await;
                return;
            }
        }
    }
}
