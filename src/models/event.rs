use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::order::OrderStatus;

/// Published once a status write has been acknowledged by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionEvent {
    pub order_id: String,
    pub customer_id: String,
    pub restaurant_name: String,
    pub status: OrderStatus,
    pub rider_id: Option<String>,
    pub committed_at: DateTime<Utc>,
}
