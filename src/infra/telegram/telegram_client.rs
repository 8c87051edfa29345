use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::telegram_models::{ApiResponse, ChatMember, Update};
use crate::core::moderation::{ActionError, ChatActions, ChatPermissions, MemberStatus};

const API_BASE: &str = "https://api.telegram.org";
const POLL_HEADROOM: Duration = Duration::from_secs(10);

/// Minimal Telegram Bot API client. It only exposes the calls the bot needs.
///
/// Every request carries the configured timeout; long polls get the poll
/// window on top of it so the server can hold the connection open.
pub struct TelegramApiClient {
    client: Client,
    base_url: String,
    poll_timeout: Duration,
}

impl TelegramApiClient {
    pub fn new(
        token: &str,
        request_timeout: Duration,
        poll_timeout: Duration,
    ) -> Result<Self, ActionError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent("Cerberek/0.2")
            .build()
            .map_err(|e| ActionError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", API_BASE, token),
            poll_timeout,
        })
    }

    /// POST one Bot API method and unwrap the response envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: Value,
        timeout: Option<Duration>,
    ) -> Result<T, ActionError> {
        let url = format!("{}/{}", self.base_url, method);

        let mut request = self.client.post(&url).json(&payload);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        // Strip the URL from transport errors; it contains the bot token.
        let response = request
            .send()
            .await
            .map_err(|e| ActionError::Http(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ActionError::Http(e.without_url().to_string()))?;

        let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            ActionError::Decode(format!("{} returned {}: {}", method, status, e))
        })?;

        Self::into_result(method, envelope)
    }

    fn into_result<T>(method: &str, envelope: ApiResponse<T>) -> Result<T, ActionError> {
        if !envelope.ok {
            let mut description = envelope
                .description
                .unwrap_or_else(|| format!("{} failed", method));
            if let Some(retry_after) = envelope.parameters.and_then(|p| p.retry_after) {
                description.push_str(&format!(" (retry after {}s)", retry_after));
            }
            return Err(ActionError::Api {
                code: envelope.error_code,
                description,
            });
        }

        envelope
            .result
            .ok_or_else(|| ActionError::Decode(format!("{} returned ok without a result", method)))
    }

    /// Long-poll for new message updates starting at `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, ActionError> {
        let mut payload = json!({
            "timeout": self.poll_timeout.as_secs(),
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            payload["offset"] = json!(offset);
        }

        // Give the server the whole poll window plus some headroom.
        let timeout = self.poll_timeout.saturating_add(POLL_HEADROOM);
        self.call("getUpdates", payload, Some(timeout)).await
    }
}

#[async_trait]
impl ChatActions for TelegramApiClient {
    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), ActionError> {
        let payload = json!({ "chat_id": chat_id, "message_id": message_id });
        self.call::<bool>("deleteMessage", payload, None).await?;
        Ok(())
    }

    async fn restrict_member(
        &self,
        chat_id: i64,
        user_id: i64,
        permissions: &ChatPermissions,
        until_epoch_secs: i64,
    ) -> Result<(), ActionError> {
        let payload = json!({
            "chat_id": chat_id,
            "user_id": user_id,
            "permissions": permissions,
            "use_independent_chat_permissions": true,
            "until_date": until_epoch_secs,
        });
        self.call::<bool>("restrictChatMember", payload, None).await?;
        Ok(())
    }

    async fn ban_member(
        &self,
        chat_id: i64,
        user_id: i64,
        revoke_messages: bool,
    ) -> Result<(), ActionError> {
        let payload = json!({
            "chat_id": chat_id,
            "user_id": user_id,
            "revoke_messages": revoke_messages,
        });
        self.call::<bool>("banChatMember", payload, None).await?;
        Ok(())
    }

    async fn get_member_status(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<MemberStatus, ActionError> {
        let payload = json!({ "chat_id": chat_id, "user_id": user_id });
        let member: ChatMember = self.call("getChatMember", payload, None).await?;
        Ok(MemberStatus::from_api(&member.status))
    }
}
