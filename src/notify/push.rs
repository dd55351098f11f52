use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;

use crate::config::PushSettings;
use crate::error::{AppError, NotificationError};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LocalizedText {
    pub en: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PushData {
    #[serde(rename = "orderId")]
    pub order_id: String,
}

/// Request body accepted by the push-delivery endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PushPayload {
    pub app_id: String,
    pub include_player_ids: Vec<String>,
    pub headings: LocalizedText,
    pub contents: LocalizedText,
    pub data: PushData,
}

impl PushPayload {
    pub fn status_update(
        app_id: &str,
        token: &str,
        order_id: &str,
        status: &str,
        restaurant_name: &str,
    ) -> Self {
        Self {
            app_id: app_id.to_string(),
            include_player_ids: vec![token.to_string()],
            headings: LocalizedText {
                en: "Order Status Update".to_string(),
            },
            contents: LocalizedText {
                en: format!(
                    "Your order from {restaurant_name} (ID: {order_id}) is now {status}."
                ),
            },
            data: PushData {
                order_id: order_id.to_string(),
            },
        }
    }
}

pub struct PushClient {
    http: reqwest::Client,
    endpoint: String,
    app_id: String,
    api_key: SecretString,
}

impl PushClient {
    pub fn new(settings: &PushSettings) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| AppError::Internal(format!("failed to build push client: {err}")))?;

        Ok(Self {
            http,
            endpoint: settings.endpoint.clone(),
            app_id: settings.app_id.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Posts one payload. Any non-2xx response is a failure; the response
    /// body is returned for logging only.
    pub async fn send(&self, payload: &PushPayload) -> Result<String, NotificationError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Basic {}", self.api_key.expose_secret()),
            )
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), body = %body, "push endpoint responded");

        if status.is_success() {
            Ok(body)
        } else {
            Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
