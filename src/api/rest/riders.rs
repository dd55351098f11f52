use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::engine::filter::OrderFilter;
use crate::error::{AppError, StoreError};
use crate::models::order::Order;
use crate::models::rider::{RiderProfile, RiderUpdate};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/riders", post(create_rider))
        .route("/riders/:id", get(get_rider).patch(update_rider))
        .route("/riders/:id/availability", put(update_availability))
        .route("/riders/:id/orders/available", get(available_orders))
        .route("/riders/:id/orders/active", get(active_orders))
        .route("/riders/:id/orders/history", get(history))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRiderRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub vehicle: String,
    #[serde(default)]
    pub serviceable_locations: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRiderRequest {
    pub phone: Option<String>,
    pub vehicle: Option<String>,
    pub serviceable_locations: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub is_available: bool,
}

async fn create_rider(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRiderRequest>,
) -> Result<Json<RiderProfile>, AppError> {
    if payload.id.trim().is_empty() {
        return Err(AppError::BadRequest("id cannot be empty".to_string()));
    }

    let name = if payload.name.trim().is_empty() {
        "Rider".to_string()
    } else {
        payload.name
    };

    let mut rider = RiderProfile {
        id: payload.id,
        name,
        phone: String::new(),
        vehicle: String::new(),
        serviceable_locations: Vec::new(),
        is_available: false,
        updated_at: Utc::now(),
    };
    RiderUpdate {
        is_available: None,
        phone: Some(payload.phone),
        vehicle: Some(payload.vehicle),
        serviceable_locations: Some(payload.serviceable_locations),
    }
    .apply(&mut rider);

    state
        .riders
        .create_rider(rider.clone())
        .await
        .map_err(|err| match err {
            StoreError::AlreadyExists(id) => {
                AppError::Conflict(format!("rider {id} already exists"))
            }
            other => AppError::WriteFailed(other.to_string()),
        })?;

    Ok(Json(rider))
}

async fn get_rider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RiderProfile>, AppError> {
    Ok(Json(load_rider(&state, &id).await?))
}

async fn update_rider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateRiderRequest>,
) -> Result<Json<RiderProfile>, AppError> {
    let update = RiderUpdate {
        is_available: None,
        phone: payload.phone,
        vehicle: payload.vehicle,
        serviceable_locations: payload.serviceable_locations,
    };

    write_rider(&state, &id, update).await.map(Json)
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<AvailabilityRequest>,
) -> Result<Json<RiderProfile>, AppError> {
    let rider = write_rider(&state, &id, RiderUpdate::availability(payload.is_available)).await?;
    info!(
        rider_id = %rider.id,
        is_available = rider.is_available,
        "rider availability changed"
    );
    Ok(Json(rider))
}

async fn available_orders(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Order>>, AppError> {
    let rider = load_rider(&state, &id).await?;

    // Offline riders are shown nothing; the query itself does not gate on it.
    if !rider.is_available {
        return Ok(Json(Vec::new()));
    }

    let orders = state.queries.list_available_orders(&rider).snapshot().await?;
    Ok(Json(orders))
}

async fn active_orders(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = state.queries.list_active_orders(&id).snapshot().await?;
    Ok(Json(filter.apply(orders)))
}

async fn history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = state.queries.list_history(&id).snapshot().await?;
    Ok(Json(filter.apply(orders)))
}

pub(crate) async fn load_rider(state: &AppState, id: &str) -> Result<RiderProfile, AppError> {
    state
        .riders
        .get_rider(id)
        .await
        .map_err(|err| AppError::QueryFailed(err.to_string()))?
        .ok_or_else(|| AppError::RiderNotFound(id.to_string()))
}

async fn write_rider(
    state: &AppState,
    id: &str,
    update: RiderUpdate,
) -> Result<RiderProfile, AppError> {
    state
        .riders
        .update_rider(id, update)
        .await
        .map_err(|err| match err {
            StoreError::NotFound(_) => AppError::RiderNotFound(id.to_string()),
            other => AppError::WriteFailed(other.to_string()),
        })
}
