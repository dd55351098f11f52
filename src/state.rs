use std::sync::Arc;

use tokio::sync::mpsc;

use crate::engine::lifecycle::OrderLifecycle;
use crate::engine::query::OrderQueryService;
use crate::engine::transition::{TransitionAuthority, TransitionPolicy};
use crate::models::event::TransitionEvent;
use crate::observability::metrics::Metrics;
use crate::store::{MemoryStore, NotificationTargets, OrderStore, RiderStore};

pub struct AppState {
    pub orders: Arc<dyn OrderStore>,
    pub riders: Arc<dyn RiderStore>,
    pub targets: Arc<dyn NotificationTargets>,
    pub lifecycle: OrderLifecycle,
    pub queries: OrderQueryService,
    pub metrics: Metrics,
}

impl AppState {
    /// In-memory backends for all three collaborators.
    pub fn new(
        policy: TransitionPolicy,
        notification_queue_size: usize,
        event_buffer_size: usize,
    ) -> (Self, mpsc::Receiver<TransitionEvent>) {
        let store = Arc::new(MemoryStore::new(event_buffer_size));
        Self::with_backends(
            store.clone(),
            store.clone(),
            store,
            policy,
            notification_queue_size,
        )
    }

    pub fn with_backends(
        orders: Arc<dyn OrderStore>,
        riders: Arc<dyn RiderStore>,
        targets: Arc<dyn NotificationTargets>,
        policy: TransitionPolicy,
        notification_queue_size: usize,
    ) -> (Self, mpsc::Receiver<TransitionEvent>) {
        let (event_tx, event_rx) = mpsc::channel(notification_queue_size);
        let metrics = Metrics::new();

        let authority = TransitionAuthority::new(orders.clone(), policy, metrics.clone());
        let lifecycle = OrderLifecycle::new(
            orders.clone(),
            riders.clone(),
            authority,
            event_tx,
            metrics.clone(),
        );
        let queries = OrderQueryService::new(orders.clone(), metrics.clone());

        (
            Self {
                orders,
                riders,
                targets,
                lifecycle,
                queries,
                metrics,
            },
            event_rx,
        )
    }
}
