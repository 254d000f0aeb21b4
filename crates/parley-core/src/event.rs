//! Platform-neutral inbound events and outbound message units.
//!
//! The webhook adapter turns raw platform payloads into [`InboundEvent`]s
//! after signature verification; the orchestrator only ever sees these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where an event originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    User,
    Group,
    Room,
}

/// Message payload carried by a message event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text {
        text: String,
    },
    Sticker {
        package_id: String,
        sticker_id: String,
    },
    Image,
    Video,
    Audio,
    File {
        file_name: String,
    },
    Location {
        title: Option<String>,
        address: Option<String>,
        latitude: f64,
        longitude: f64,
    },
    /// A message type this bot does not know about
    Unsupported {
        kind: String,
    },
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Event type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventKind {
    Message { message: MessageContent },
    Follow,
    Unfollow,
    Join,
    Leave,
    Postback { data: String },
}

/// Normalized inbound event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub id: String,
    pub user_id: String,
    /// Token for the reply channel; absent for events that cannot be replied to
    pub reply_token: Option<String>,
    pub source: SourceKind,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
}

impl InboundEvent {
    pub fn new(user_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            reply_token: None,
            source: SourceKind::User,
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Shortcut for a text message event
    pub fn text(
        user_id: impl Into<String>,
        reply_token: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(
            user_id,
            EventKind::Message {
                message: MessageContent::text(text),
            },
        )
        .with_reply_token(reply_token)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_reply_token(mut self, token: impl Into<String>) -> Self {
        self.reply_token = Some(token.into());
        self
    }

    pub fn with_source(mut self, source: SourceKind) -> Self {
        self.source = source;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Event type as a short string, for logging
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            EventKind::Message { .. } => "message",
            EventKind::Follow => "follow",
            EventKind::Unfollow => "unfollow",
            EventKind::Join => "join",
            EventKind::Leave => "leave",
            EventKind::Postback { .. } => "postback",
        }
    }
}

/// One delivery unit handed to the outbound sender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutgoingMessage {
    Text { text: String },
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> &str {
        match self {
            Self::Text { text } => text,
        }
    }
}
