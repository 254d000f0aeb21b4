//! LINE Messaging API client: the outbound half of the bot.

use std::time::Duration;

use async_trait::async_trait;
use parley_core::OutgoingMessage;
use parley_router::{MessageSender, SenderError};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// LINE user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub display_name: String,
    pub picture_url: Option<String>,
    pub status_message: Option<String>,
}

/// LINE Messaging API client
#[derive(Debug, Clone)]
pub struct LineClient {
    http: Client,
    api_base_url: String,
    channel_token: String,
}

impl LineClient {
    pub fn new(
        api_base_url: impl Into<String>,
        channel_token: impl Into<String>,
    ) -> Result<Self, SenderError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SenderError::Config(e.to_string()))?;

        Ok(Self {
            http,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            channel_token: channel_token.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.channel_token)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, SenderError> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| SenderError::Http(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(SenderError::Api {
            status: status.as_u16(),
            body,
        })
    }

    /// 获取用户资料
    pub async fn get_profile(&self, user_id: &str) -> Result<UserProfile, SenderError> {
        let url = self.endpoint(&format!("/v2/bot/profile/{}", user_id));
        let response = self.send(self.http.get(url)).await?;
        response
            .json::<UserProfile>()
            .await
            .map_err(|e| SenderError::Http(e.to_string()))
    }
}

#[async_trait]
impl MessageSender for LineClient {
    async fn reply(
        &self,
        reply_token: &str,
        messages: Vec<OutgoingMessage>,
    ) -> Result<(), SenderError> {
        debug!("Replying with {} message(s)", messages.len());
        let body = json!({
            "replyToken": reply_token,
            "messages": messages,
        });
        self.send(self.http.post(self.endpoint("/v2/bot/message/reply")).json(&body))
            .await?;
        Ok(())
    }

    async fn push(&self, user_id: &str, message: OutgoingMessage) -> Result<(), SenderError> {
        debug!("Pushing message to {}", user_id);
        let body = json!({
            "to": user_id,
            "messages": [message],
        });
        self.send(self.http.post(self.endpoint("/v2/bot/message/push")).json(&body))
            .await?;
        Ok(())
    }
}
