use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

use crate::models::order::Order;

/// Client-side narrowing of active orders and delivery history.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub q: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl OrderFilter {
    pub fn is_empty(&self) -> bool {
        self.search_text().is_none() && self.from.is_none() && self.to.is_none()
    }

    pub fn apply(&self, orders: Vec<Order>) -> Vec<Order> {
        if self.is_empty() {
            return orders;
        }

        orders
            .into_iter()
            .filter(|order| self.matches(order))
            .collect()
    }

    pub fn matches(&self, order: &Order) -> bool {
        // Date bounds cover whole days: from 00:00:00.000 to 23:59:59.999 UTC.
        if let Some(from) = self.from {
            if order.created_at < from.and_time(NaiveTime::MIN).and_utc() {
                return false;
            }
        }

        if let Some(to) = self.to {
            let end_of_day = to
                .succ_opt()
                .map(|next| next.and_time(NaiveTime::MIN).and_utc());
            if let Some(end) = end_of_day {
                if order.created_at >= end {
                    return false;
                }
            }
        }

        match self.search_text() {
            Some(needle) => {
                let needle = needle.to_lowercase();
                let address = order.address.full_address();
                [
                    order.customer_name.as_str(),
                    order.customer_phone.as_str(),
                    address.as_str(),
                    order.restaurant_name.as_deref().unwrap_or_default(),
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }

    fn search_text(&self) -> Option<&str> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::OrderFilter;
    use crate::models::order::{DeliveryAddress, Order, OrderStatus, OrderType};

    fn delivered(id: &str, day: u32, hour: u32) -> Order {
        Order {
            id: id.to_string(),
            restaurant_name: Some("Chillox".to_string()),
            customer_id: Some("c-1".to_string()),
            customer_name: "Farhan Hossain".to_string(),
            customer_phone: "01712345678".to_string(),
            address: DeliveryAddress {
                building: "Tower 2".to_string(),
                floor: "5".to_string(),
                room: "502".to_string(),
                sub_location: "North Gate".to_string(),
                base_location: "NSU".to_string(),
            },
            items: Vec::new(),
            total_price: 410.0,
            created_at: Utc.with_ymd_and_hms(2025, 3, day, hour, 30, 0).unwrap(),
            order_type: OrderType::Instant,
            status: OrderStatus::Delivered,
            rider_id: Some("r-1".to_string()),
            rider_name: Some("Rimi".to_string()),
        }
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let orders = vec![delivered("o-1", 10, 12)];

        for needle in ["farhan", "CHILLOX", "0171234", "north gate", "tower 2"] {
            let filter = OrderFilter {
                q: Some(needle.to_string()),
                ..OrderFilter::default()
            };
            assert_eq!(filter.apply(orders.clone()).len(), 1, "needle {needle}");
        }

        let filter = OrderFilter {
            q: Some("daffodil".to_string()),
            ..OrderFilter::default()
        };
        assert!(filter.apply(orders).is_empty());
    }

    #[test]
    fn date_range_is_inclusive_of_whole_days() {
        let orders = vec![
            delivered("early", 9, 23),
            delivered("start", 10, 0),
            delivered("end", 12, 23),
            delivered("late", 13, 0),
        ];

        let filter = OrderFilter {
            q: None,
            from: NaiveDate::from_ymd_opt(2025, 3, 10),
            to: NaiveDate::from_ymd_opt(2025, 3, 12),
        };

        let kept: Vec<String> = filter.apply(orders).into_iter().map(|o| o.id).collect();
        assert_eq!(kept, vec!["start", "end"]);
    }

    #[test]
    fn blank_search_keeps_everything() {
        let filter = OrderFilter {
            q: Some("   ".to_string()),
            ..OrderFilter::default()
        };

        assert!(filter.is_empty());
        assert_eq!(filter.apply(vec![delivered("o-1", 1, 1)]).len(), 1);
    }
}
