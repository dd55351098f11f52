//! Collaborator seams for the document stores the workflow reads and writes.
//!
//! The workflow never holds a lock over a store. Atomicity is limited to what
//! a single-document write gives: every field of one [`OrderUpdate`] commits
//! together or not at all.

pub mod memory;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::models::order::{Order, OrderStatus, OrderType};
use crate::models::rider::{RiderProfile, RiderUpdate};

pub use memory::MemoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Equality and membership filters over the order collection, sorted on
/// `createdAt`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderQuery {
    pub status_in: Vec<OrderStatus>,
    pub order_type: Option<OrderType>,
    pub base_location_in: Option<Vec<String>>,
    pub rider_id: Option<String>,
    pub sort: SortDirection,
}

impl OrderQuery {
    pub fn matches(&self, order: &Order) -> bool {
        if !self.status_in.contains(&order.status) {
            return false;
        }

        if let Some(order_type) = self.order_type {
            if order.order_type != order_type {
                return false;
            }
        }

        // An empty membership list matches nothing.
        if let Some(locations) = &self.base_location_in {
            if !locations.iter().any(|l| l == order.base_location()) {
                return false;
            }
        }

        if let Some(rider_id) = &self.rider_id {
            if order.rider_id.as_deref() != Some(rider_id.as_str()) {
                return false;
            }
        }

        true
    }

    /// True when no document can ever satisfy the query.
    pub fn matches_nothing(&self) -> bool {
        self.status_in.is_empty()
            || self
                .base_location_in
                .as_ref()
                .is_some_and(|locations| locations.is_empty())
    }

    pub fn sort(&self, orders: &mut [Order]) {
        match self.sort {
            SortDirection::Ascending => orders.sort_by(|a, b| {
                a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
            }),
            SortDirection::Descending => orders.sort_by(|a, b| {
                b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id))
            }),
        }
    }
}

/// Fields a transition writes. Applied as one document write.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderUpdate {
    pub status: OrderStatus,
    pub rider: Option<RiderBinding>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiderBinding {
    pub rider_id: String,
    pub rider_name: String,
}

impl OrderUpdate {
    pub fn accept(rider_id: &str, rider_name: &str) -> Self {
        Self {
            status: OrderStatus::Accepted,
            rider: Some(RiderBinding {
                rider_id: rider_id.to_string(),
                rider_name: rider_name.to_string(),
            }),
        }
    }

    pub fn status(status: OrderStatus) -> Self {
        Self {
            status,
            rider: None,
        }
    }

    pub fn apply(&self, order: &mut Order) {
        order.status = self.status;
        if let Some(binding) = &self.rider {
            order.rider_id = Some(binding.rider_id.clone());
            order.rider_name = Some(binding.rider_name.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderChange {
    pub order_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiderChange {
    pub rider_id: String,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Full-document replace.
    async fn insert_order(&self, order: Order) -> Result<(), StoreError>;

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, StoreError>;

    async fn query_orders(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError>;

    /// Partial write. With `expected` set the write only lands if the stored
    /// status still equals it; otherwise `PreconditionFailed` carries the
    /// current document.
    async fn update_order(
        &self,
        order_id: &str,
        update: OrderUpdate,
        expected: Option<OrderStatus>,
    ) -> Result<Order, StoreError>;

    fn watch_orders(&self) -> broadcast::Receiver<OrderChange>;
}

#[async_trait]
pub trait RiderStore: Send + Sync {
    async fn create_rider(&self, rider: RiderProfile) -> Result<(), StoreError>;

    async fn get_rider(&self, rider_id: &str) -> Result<Option<RiderProfile>, StoreError>;

    async fn update_rider(
        &self,
        rider_id: &str,
        update: RiderUpdate,
    ) -> Result<RiderProfile, StoreError>;

    fn watch_riders(&self) -> broadcast::Receiver<RiderChange>;
}

/// Customer id to push-token mapping owned by the customer-facing system.
#[async_trait]
pub trait NotificationTargets: Send + Sync {
    async fn push_token(&self, customer_id: &str) -> Result<Option<String>, StoreError>;

    async fn register_push_token(&self, customer_id: &str, token: &str)
    -> Result<(), StoreError>;
}
