use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::api::rest::riders::load_rider;
use crate::engine::query::{QueryUpdate, Subscription};
use crate::error::AppError;
use crate::models::order::Order;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Available,
    Active,
    History,
}

pub async fn feed_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path((rider_id, kind)): Path<(String, FeedKind)>,
) -> Result<impl IntoResponse, AppError> {
    let rider = load_rider(&state, &rider_id).await?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, rider.id, kind)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, rider_id: String, kind: FeedKind) {
    let (mut sender, mut receiver) = socket.split();

    info!(rider_id = %rider_id, feed = ?kind, "feed client connected");

    let feed_rider_id = rider_id.clone();
    let mut send_task = tokio::spawn(async move {
        match kind {
            FeedKind::Active => {
                let subscription = state.queries.list_active_orders(&feed_rider_id);
                forward(&mut sender, subscription).await;
            }
            FeedKind::History => {
                let subscription = state.queries.list_history(&feed_rider_id);
                forward(&mut sender, subscription).await;
            }
            FeedKind::Available => follow_available(&mut sender, state, feed_rider_id).await,
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    // Whichever side ends first tears the other down, which drops the
    // subscription and stops its query task.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!(rider_id = %rider_id, "feed client disconnected");
}

async fn forward<S>(sender: &mut S, mut subscription: Subscription)
where
    S: Sink<Message> + Unpin,
{
    while let Some(update) = subscription.next().await {
        if !push_update(sender, update).await {
            break;
        }
    }
}

/// Available orders for a rider, re-subscribed whenever the rider's profile
/// changes. Offline riders get an empty set.
async fn follow_available<S>(sender: &mut S, state: Arc<AppState>, rider_id: String)
where
    S: Sink<Message> + Unpin,
{
    // Watch before reading the profile so no change in between is missed.
    let mut rider_changes = BroadcastStream::new(state.riders.watch_riders());
    let mut rider = match load_rider(&state, &rider_id).await {
        Ok(rider) => rider,
        Err(err) => {
            warn!(rider_id = %rider_id, error = %err, "failed to load rider profile");
            let _ = push(sender, error_message(&err.to_string())).await;
            return;
        }
    };

    'profile: loop {
        let mut subscription = if rider.is_available {
            Some(state.queries.list_available_orders(&rider))
        } else {
            None
        };

        if subscription.is_none() && !push(sender, orders_message(&[])).await {
            return;
        }

        loop {
            tokio::select! {
                update = next_update(&mut subscription) => {
                    let Some(update) = update else { return };
                    if !push_update(sender, update).await {
                        return;
                    }
                }
                change = rider_changes.next() => {
                    let reload = match change {
                        Some(Ok(change)) => change.rider_id == rider.id,
                        Some(Err(BroadcastStreamRecvError::Lagged(_))) => true,
                        None => {
                            let _ = push(sender, error_message("rider feed closed")).await;
                            return;
                        }
                    };

                    if !reload {
                        continue;
                    }

                    match load_rider(&state, &rider.id).await {
                        Ok(updated) => {
                            rider = updated;
                            continue 'profile;
                        }
                        Err(err) => {
                            warn!(rider_id = %rider.id, error = %err, "failed to reload rider profile");
                            let _ = push(sender, error_message(&err.to_string())).await;
                            return;
                        }
                    }
                }
            }
        }
    }
}

async fn next_update(subscription: &mut Option<Subscription>) -> Option<QueryUpdate> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}

/// Returns false once nothing more should be sent.
async fn push_update<S>(sender: &mut S, update: QueryUpdate) -> bool
where
    S: Sink<Message> + Unpin,
{
    match update {
        Ok(orders) => push(sender, orders_message(&orders)).await,
        Err(err) => {
            warn!(error = %err, "live feed query failed");
            let _ = push(sender, error_message(&err.to_string())).await;
            false
        }
    }
}

async fn push<S>(sender: &mut S, message: Value) -> bool
where
    S: Sink<Message> + Unpin,
{
    sender.send(Message::Text(message.to_string())).await.is_ok()
}

fn orders_message(orders: &[Order]) -> Value {
    json!({ "type": "orders", "orders": orders })
}

fn error_message(error: &str) -> Value {
    json!({ "type": "error", "error": error })
}
