use std::sync::Arc;

use rider_dispatch::config::{Config, LogFormat};
use rider_dispatch::error::AppError;
use rider_dispatch::notify::{run_notification_dispatcher, NotificationDispatcher, PushClient};
use rider_dispatch::{api, state};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);
    match config.log_format {
        LogFormat::Compact => subscriber.compact().init(),
        LogFormat::Json => subscriber.json().init(),
    }

    let (app_state, event_rx) = state::AppState::new(
        config.transition_policy,
        config.notification_queue_size,
        config.event_buffer_size,
    );
    let shared_state = Arc::new(app_state);

    let push = match &config.push {
        Some(settings) => Some(PushClient::new(settings)?),
        None => {
            tracing::warn!("PUSH_APP_ID/PUSH_API_KEY not set; customer notifications disabled");
            None
        }
    };
    let dispatcher = Arc::new(NotificationDispatcher::new(shared_state.targets.clone(), push));

    tokio::spawn(run_notification_dispatcher(
        dispatcher,
        shared_state.metrics.clone(),
        event_rx,
    ));

    let app = api::rest::router(shared_state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(
        http_port = config.http_port,
        transition_policy = ?config.transition_policy,
        "http server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
