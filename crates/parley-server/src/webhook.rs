//! LINE webhook: payload parsing and the POST handler.
//!
//! The handler acknowledges as soon as the signature and JSON check out; each
//! event is then processed on its own task.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{TimeZone, Utc};
use parley_core::{EventKind, InboundEvent, MessageContent, SourceKind};
use parley_observability::{create_request_span, create_user_span};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use crate::signature::{verify_signature, SignatureError, SIGNATURE_HEADER};
use crate::state::AppState;

/// Webhook request body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub events: Vec<LineEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub webhook_event_id: Option<String>,
    pub reply_token: Option<String>,
    /// 毫秒时间戳
    pub timestamp: Option<i64>,
    pub source: Option<LineSource>,
    pub message: Option<LineMessage>,
    pub postback: Option<LinePostback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    pub room_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub id: Option<String>,
    pub text: Option<String>,
    pub package_id: Option<String>,
    pub sticker_id: Option<String>,
    pub file_name: Option<String>,
    pub title: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinePostback {
    #[serde(default)]
    pub data: String,
}

impl LineMessage {
    fn into_content(self) -> MessageContent {
        match self.message_type.as_str() {
            "text" => MessageContent::text(self.text.unwrap_or_default()),
            "sticker" => MessageContent::Sticker {
                package_id: self.package_id.unwrap_or_default(),
                sticker_id: self.sticker_id.unwrap_or_default(),
            },
            "image" => MessageContent::Image,
            "video" => MessageContent::Video,
            "audio" => MessageContent::Audio,
            "file" => MessageContent::File {
                file_name: self.file_name.unwrap_or_default(),
            },
            "location" => MessageContent::Location {
                title: self.title,
                address: self.address,
                latitude: self.latitude.unwrap_or_default(),
                longitude: self.longitude.unwrap_or_default(),
            },
            other => MessageContent::Unsupported {
                kind: other.to_string(),
            },
        }
    }
}

impl LineEvent {
    /// Normalize into an [`InboundEvent`]
    ///
    /// Returns `None` for event types the bot does not handle and for events
    /// without a `source.userId`.
    pub fn into_inbound(self) -> Option<InboundEvent> {
        let source = self.source?;
        let user_id = source.user_id?;
        let source_kind = match source.source_type.as_str() {
            "group" => SourceKind::Group,
            "room" => SourceKind::Room,
            _ => SourceKind::User,
        };

        let kind = match self.event_type.as_str() {
            "message" => EventKind::Message {
                message: self.message?.into_content(),
            },
            "follow" => EventKind::Follow,
            "unfollow" => EventKind::Unfollow,
            "join" => EventKind::Join,
            "leave" => EventKind::Leave,
            "postback" => EventKind::Postback {
                data: self.postback.map(|p| p.data).unwrap_or_default(),
            },
            _ => return None,
        };

        let mut event = InboundEvent::new(user_id, kind).with_source(source_kind);
        if let Some(id) = self.webhook_event_id {
            event = event.with_id(id);
        }
        if let Some(token) = self.reply_token.filter(|t| !t.is_empty()) {
            event = event.with_reply_token(token);
        }
        if let Some(ts) = self
            .timestamp
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        {
            event = event.with_timestamp(ts);
        }
        Some(event)
    }
}

/// 解析 webhook JSON 并转换为事件列表，跳过无法处理的事件
pub fn parse_events(body: &[u8]) -> Result<Vec<InboundEvent>, serde_json::Error> {
    let payload: WebhookPayload = serde_json::from_slice(body)?;
    debug!(
        "Webhook for {} with {} event(s)",
        payload.destination,
        payload.events.len()
    );

    Ok(payload
        .events
        .into_iter()
        .filter_map(|event| {
            let event_type = event.event_type.clone();
            let inbound = event.into_inbound();
            if inbound.is_none() {
                debug!("Skipping unsupported webhook event: {}", event_type);
            }
            inbound
        })
        .collect())
}

fn rejection(status: StatusCode, message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(json!({ "status": "error", "message": message })))
}

/// POST /webhook, /callback
pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    if let Err(e) = verify_signature(&state.channel_secret, &body, signature) {
        warn!("Webhook signature verification failed: {}", e);
        let status = match e {
            SignatureError::Missing => StatusCode::BAD_REQUEST,
            _ => StatusCode::UNAUTHORIZED,
        };
        return rejection(status, "Invalid signature");
    }

    let events = match parse_events(&body) {
        Ok(events) => events,
        Err(e) => {
            warn!("Invalid webhook payload: {}", e);
            return rejection(StatusCode::BAD_REQUEST, "Invalid JSON payload");
        }
    };

    let request_id = Uuid::new_v4().to_string();
    create_request_span(&request_id).in_scope(|| {
        for event in events {
            info!(
                "Dispatching {} event {} from {}",
                event.kind_name(),
                event.id,
                event.user_id
            );

            let handler = Arc::clone(&state.handler);
            let cancel = state.shutdown.child_token();
            let span = create_user_span(&event.user_id);
            tokio::spawn(
                async move {
                    let event_id = event.id.clone();
                    if let Err(e) = handler.handle_event(event, &cancel).await {
                        error!("Failed to handle event {}: {}", event_id, e);
                    }
                }
                .instrument(span),
            );
        }
    });

    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_event() {
        let body = br#"{
            "destination": "Ubot",
            "events": [{
                "type": "message",
                "webhookEventId": "01FZ74A0TDDPYRVKNK77XKC3ZR",
                "replyToken": "rt-1",
                "timestamp": 1625665242211,
                "source": {"type": "user", "userId": "U123"},
                "message": {"type": "text", "id": "444", "text": "Hello"}
            }]
        }"#;

        let events = parse_events(body).unwrap();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.id, "01FZ74A0TDDPYRVKNK77XKC3ZR");
        assert_eq!(event.user_id, "U123");
        assert_eq!(event.reply_token.as_deref(), Some("rt-1"));
        assert_eq!(event.source, SourceKind::User);
        assert_eq!(event.timestamp.timestamp_millis(), 1625665242211);
        assert_eq!(
            event.kind,
            EventKind::Message {
                message: MessageContent::text("Hello")
            }
        );
    }

    #[test]
    fn test_parse_lifecycle_and_media_events() {
        let body = br#"{"events": [
            {"type": "follow", "replyToken": "rt", "source": {"type": "user", "userId": "U1"}},
            {"type": "unfollow", "source": {"type": "user", "userId": "U1"}},
            {"type": "message", "replyToken": "rt2",
             "source": {"type": "group", "groupId": "G1", "userId": "U2"},
             "message": {"type": "sticker", "id": "1", "packageId": "446", "stickerId": "1988"}},
            {"type": "message", "source": {"type": "room", "roomId": "R1", "userId": "U3"},
             "message": {"type": "location", "id": "2", "title": "Tower",
                         "latitude": 35.65, "longitude": 139.74}},
            {"type": "postback", "source": {"type": "user", "userId": "U4"},
             "postback": {"data": "action=buy"}}
        ]}"#;

        let events = parse_events(body).unwrap();
        assert_eq!(events.len(), 5);
        assert_eq!(events[0].kind, EventKind::Follow);
        assert_eq!(events[1].kind, EventKind::Unfollow);
        assert!(events[1].reply_token.is_none());
        assert_eq!(events[2].source, SourceKind::Group);
        assert_eq!(
            events[2].kind,
            EventKind::Message {
                message: MessageContent::Sticker {
                    package_id: "446".to_string(),
                    sticker_id: "1988".to_string(),
                }
            }
        );
        assert_eq!(events[3].source, SourceKind::Room);
        assert!(matches!(
            &events[3].kind,
            EventKind::Message { message: MessageContent::Location { title: Some(t), .. } } if t == "Tower"
        ));
        assert_eq!(
            events[4].kind,
            EventKind::Postback {
                data: "action=buy".to_string()
            }
        );
    }

    #[test]
    fn test_skips_unknown_and_anonymous_events() {
        let body = br#"{"events": [
            {"type": "unsend", "source": {"type": "user", "userId": "U1"}},
            {"type": "message", "source": {"type": "group", "groupId": "G1"},
             "message": {"type": "text", "id": "1", "text": "hi"}},
            {"type": "message", "source": {"type": "user", "userId": "U1"},
             "message": {"type": "imagemap", "id": "2"}}
        ]}"#;

        let events = parse_events(body).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].kind,
            EventKind::Message {
                message: MessageContent::Unsupported {
                    kind: "imagemap".to_string()
                }
            }
        );
    }

    #[test]
    fn test_empty_and_invalid_payloads() {
        assert!(parse_events(br#"{"destination": "U0", "events": []}"#)
            .unwrap()
            .is_empty());
        assert!(parse_events(b"not json").is_err());
    }
}
