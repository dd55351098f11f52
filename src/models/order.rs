use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    Accepted,
    #[serde(rename = "On the way")]
    OnTheWay,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Accepted => "Accepted",
            OrderStatus::OnTheWay => "On the way",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Forward-only lifecycle table. Acceptance is the only way out of
    /// `Pending` and is handled separately because it binds a rider.
    pub fn allowed_next(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Accepted],
            OrderStatus::Accepted => &[OrderStatus::OnTheWay],
            OrderStatus::OnTheWay => &[OrderStatus::Delivered],
            OrderStatus::Delivered | OrderStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    /// Statuses in which an order must carry a rider binding.
    pub fn requires_rider(&self) -> bool {
        matches!(
            self,
            OrderStatus::Accepted | OrderStatus::OnTheWay | OrderStatus::Delivered
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "Accepted" => Ok(OrderStatus::Accepted),
            "On the way" => Ok(OrderStatus::OnTheWay),
            "Delivered" => Ok(OrderStatus::Delivered),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderType {
    Instant,
    Scheduled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    pub building: String,
    pub floor: String,
    pub room: String,
    pub sub_location: String,
    pub base_location: String,
}

impl DeliveryAddress {
    pub fn full_address(&self) -> String {
        format!(
            "Building: {}, Floor: {}, Room: {}\n{}, {}",
            self.building, self.floor, self.room, self.sub_location, self.base_location
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub restaurant_name: Option<String>,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: String,
    pub address: DeliveryAddress,
    pub items: Vec<LineItem>,
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
    pub order_type: OrderType,
    #[serde(rename = "orderStatus")]
    pub status: OrderStatus,
    pub rider_id: Option<String>,
    pub rider_name: Option<String>,
}

impl Order {
    pub fn base_location(&self) -> &str {
        &self.address.base_location
    }

    /// `riderId` is present exactly when the status requires a rider.
    pub fn is_binding_consistent(&self) -> bool {
        self.rider_id.is_some() == self.status.requires_rider()
    }
}

#[cfg(test)]
mod tests {
    use super::{DeliveryAddress, OrderStatus};

    #[test]
    fn lifecycle_table_is_linear() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Accepted));
        assert!(OrderStatus::Accepted.can_transition_to(OrderStatus::OnTheWay));
        assert!(OrderStatus::OnTheWay.can_transition_to(OrderStatus::Delivered));

        assert!(!OrderStatus::Accepted.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::OnTheWay));
        assert!(OrderStatus::Delivered.allowed_next().is_empty());
    }

    #[test]
    fn on_the_way_uses_store_spelling() {
        let json = serde_json::to_string(&OrderStatus::OnTheWay).unwrap();
        assert_eq!(json, "\"On the way\"");

        let parsed: OrderStatus = "On the way".parse().unwrap();
        assert_eq!(parsed, OrderStatus::OnTheWay);
        assert!("on the way".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn full_address_joins_components() {
        let address = DeliveryAddress {
            building: "B4".to_string(),
            floor: "2".to_string(),
            room: "207".to_string(),
            sub_location: "Hall C".to_string(),
            base_location: "NSU".to_string(),
        };

        assert_eq!(
            address.full_address(),
            "Building: B4, Floor: 2, Room: 207\nHall C, NSU"
        );
    }
}
