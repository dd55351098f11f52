use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{DeliveryAddress, LineItem, Order, OrderStatus, OrderType};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/accept", post(accept_order))
        .route("/orders/:id/status", post(update_order_status))
        .route("/customers/:id/push-token", put(register_push_token))
}

/// Ingest from the upstream ordering system.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub id: Option<String>,
    pub restaurant_name: Option<String>,
    pub customer_id: Option<String>,
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    pub address: DeliveryAddress,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub total_price: f64,
    pub order_type: OrderType,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptOrderRequest {
    pub rider_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushTokenRequest {
    pub token: String,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    if payload.address.base_location.trim().is_empty() {
        return Err(AppError::BadRequest(
            "address.baseLocation cannot be empty".to_string(),
        ));
    }

    if payload.total_price < 0.0 {
        return Err(AppError::BadRequest("totalPrice must be >= 0".to_string()));
    }

    let order = Order {
        id: payload
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        restaurant_name: payload.restaurant_name,
        customer_id: payload.customer_id,
        customer_name: payload.customer_name,
        customer_phone: payload.customer_phone,
        address: payload.address,
        items: payload.items,
        total_price: payload.total_price,
        created_at: Utc::now(),
        order_type: payload.order_type,
        status: OrderStatus::Pending,
        rider_id: None,
        rider_name: None,
    };

    state
        .orders
        .insert_order(order.clone())
        .await
        .map_err(|err| AppError::WriteFailed(err.to_string()))?;

    Ok(Json(order))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .get_order(&id)
        .await
        .map_err(|err| AppError::QueryFailed(err.to_string()))?
        .ok_or_else(|| AppError::OrderNotFound(id.clone()))?;

    Ok(Json(order))
}

async fn accept_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<AcceptOrderRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state.lifecycle.accept(&id, &payload.rider_id).await?;
    Ok(Json(order))
}

async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state.lifecycle.advance(&id, payload.status).await?;
    Ok(Json(order))
}

async fn register_push_token(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<String>,
    Json(payload): Json<PushTokenRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if payload.token.trim().is_empty() {
        return Err(AppError::BadRequest("token cannot be empty".to_string()));
    }

    state
        .targets
        .register_push_token(&customer_id, &payload.token)
        .await
        .map_err(|err| AppError::WriteFailed(err.to_string()))?;

    Ok(Json(serde_json::json!({ "customer_id": customer_id })))
}
