use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiderProfile {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub vehicle: String,
    pub serviceable_locations: Vec<String>,
    pub is_available: bool,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile write. `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderUpdate {
    pub is_available: Option<bool>,
    pub phone: Option<String>,
    pub vehicle: Option<String>,
    pub serviceable_locations: Option<Vec<String>>,
}

impl RiderUpdate {
    pub fn availability(is_available: bool) -> Self {
        Self {
            is_available: Some(is_available),
            ..Self::default()
        }
    }

    pub fn apply(self, rider: &mut RiderProfile) {
        if let Some(is_available) = self.is_available {
            rider.is_available = is_available;
        }
        if let Some(phone) = self.phone {
            rider.phone = phone;
        }
        if let Some(vehicle) = self.vehicle {
            rider.vehicle = vehicle;
        }
        if let Some(mut locations) = self.serviceable_locations {
            locations.sort();
            locations.dedup();
            rider.serviceable_locations = locations;
        }
        rider.updated_at = Utc::now();
    }
}
