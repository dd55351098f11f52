use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::models::order::{Order, OrderStatus};
use crate::models::rider::{RiderProfile, RiderUpdate};
use crate::store::{
    NotificationTargets, OrderChange, OrderQuery, OrderStore, OrderUpdate, RiderChange,
    RiderStore,
};

/// In-process document store backing all three collaborators.
pub struct MemoryStore {
    orders: DashMap<String, Order>,
    riders: DashMap<String, RiderProfile>,
    push_tokens: DashMap<String, String>,
    order_changes: broadcast::Sender<OrderChange>,
    rider_changes: broadcast::Sender<RiderChange>,
}

impl MemoryStore {
    pub fn new(event_buffer_size: usize) -> Self {
        let (order_changes, _unused_rx) = broadcast::channel(event_buffer_size);
        let (rider_changes, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            orders: DashMap::new(),
            riders: DashMap::new(),
            push_tokens: DashMap::new(),
            order_changes,
            rider_changes,
        }
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: Order) -> Result<(), StoreError> {
        let order_id = order.id.clone();
        self.orders.insert(order_id.clone(), order);
        let _ = self.order_changes.send(OrderChange { order_id });
        Ok(())
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.get(order_id).map(|entry| entry.value().clone()))
    }

    async fn query_orders(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError> {
        if query.matches_nothing() {
            return Ok(Vec::new());
        }

        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| query.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        query.sort(&mut orders);
        Ok(orders)
    }

    async fn update_order(
        &self,
        order_id: &str,
        update: OrderUpdate,
        expected: Option<OrderStatus>,
    ) -> Result<Order, StoreError> {
        let updated = {
            let mut order = self
                .orders
                .get_mut(order_id)
                .ok_or_else(|| StoreError::NotFound(order_id.to_string()))?;

            if let Some(expected) = expected {
                if order.status != expected {
                    return Err(StoreError::PreconditionFailed {
                        current: Box::new(order.clone()),
                    });
                }
            }

            update.apply(&mut order);
            order.clone()
        };

        let _ = self.order_changes.send(OrderChange {
            order_id: order_id.to_string(),
        });
        Ok(updated)
    }

    fn watch_orders(&self) -> broadcast::Receiver<OrderChange> {
        self.order_changes.subscribe()
    }
}

#[async_trait]
impl RiderStore for MemoryStore {
    async fn create_rider(&self, rider: RiderProfile) -> Result<(), StoreError> {
        let rider_id = rider.id.clone();
        match self.riders.entry(rider_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(StoreError::AlreadyExists(rider_id));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(rider);
            }
        }

        let _ = self.rider_changes.send(RiderChange { rider_id });
        Ok(())
    }

    async fn get_rider(&self, rider_id: &str) -> Result<Option<RiderProfile>, StoreError> {
        Ok(self.riders.get(rider_id).map(|entry| entry.value().clone()))
    }

    async fn update_rider(
        &self,
        rider_id: &str,
        update: RiderUpdate,
    ) -> Result<RiderProfile, StoreError> {
        let updated = {
            let mut rider = self
                .riders
                .get_mut(rider_id)
                .ok_or_else(|| StoreError::NotFound(rider_id.to_string()))?;
            update.apply(&mut rider);
            rider.clone()
        };

        let _ = self.rider_changes.send(RiderChange {
            rider_id: rider_id.to_string(),
        });
        Ok(updated)
    }

    fn watch_riders(&self) -> broadcast::Receiver<RiderChange> {
        self.rider_changes.subscribe()
    }
}

#[async_trait]
impl NotificationTargets for MemoryStore {
    async fn push_token(&self, customer_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .push_tokens
            .get(customer_id)
            .map(|entry| entry.value().clone()))
    }

    async fn register_push_token(
        &self,
        customer_id: &str,
        token: &str,
    ) -> Result<(), StoreError> {
        self.push_tokens
            .insert(customer_id.to_string(), token.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::MemoryStore;
    use crate::error::StoreError;
    use crate::models::order::{DeliveryAddress, Order, OrderStatus, OrderType};
    use crate::store::{OrderStore, OrderUpdate};

    fn pending(id: &str) -> Order {
        Order {
            id: id.to_string(),
            restaurant_name: None,
            customer_id: None,
            customer_name: "Nadia".to_string(),
            customer_phone: "01800000000".to_string(),
            address: DeliveryAddress::default(),
            items: Vec::new(),
            total_price: 120.5,
            created_at: Utc::now(),
            order_type: OrderType::Instant,
            status: OrderStatus::Pending,
            rider_id: None,
            rider_name: None,
        }
    }

    #[tokio::test]
    async fn conditional_write_reports_current_document() {
        let store = MemoryStore::new(16);
        store.insert_order(pending("o-1")).await.unwrap();

        store
            .update_order(
                "o-1",
                OrderUpdate::accept("rider-1", "Karim"),
                Some(OrderStatus::Pending),
            )
            .await
            .unwrap();

        let err = store
            .update_order(
                "o-1",
                OrderUpdate::accept("rider-2", "Sumi"),
                Some(OrderStatus::Pending),
            )
            .await
            .unwrap_err();

        match err {
            StoreError::PreconditionFailed { current } => {
                assert_eq!(current.rider_id.as_deref(), Some("rider-1"));
                assert_eq!(current.status, OrderStatus::Accepted);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unconditional_write_is_last_writer_wins() {
        let store = MemoryStore::new(16);
        store.insert_order(pending("o-1")).await.unwrap();

        store
            .update_order("o-1", OrderUpdate::accept("rider-1", "Karim"), None)
            .await
            .unwrap();
        let order = store
            .update_order("o-1", OrderUpdate::accept("rider-2", "Sumi"), None)
            .await
            .unwrap();

        assert_eq!(order.rider_id.as_deref(), Some("rider-2"));
        assert_eq!(order.rider_name.as_deref(), Some("Sumi"));
    }

    #[tokio::test]
    async fn writes_publish_change_events() {
        let store = MemoryStore::new(16);
        let mut changes = store.watch_orders();

        store.insert_order(pending("o-9")).await.unwrap();

        let change = changes.recv().await.unwrap();
        assert_eq!(change.order_id, "o-9");
    }

    #[tokio::test]
    async fn update_of_missing_order_is_not_found() {
        let store = MemoryStore::new(16);
        let err = store
            .update_order("missing", OrderUpdate::status(OrderStatus::Delivered), None)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound(id) if id == "missing"));
    }
}
