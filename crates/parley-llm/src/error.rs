use thiserror::Error;

/// Longest response body kept inside an error
const BODY_EXCERPT_LEN: usize = 512;

/// Unified error type for backend operations
#[derive(Error, Debug)]
pub enum LLMError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    /// 5xx from the backend, retried
    #[error("server error: {status} - {body}")]
    Server { status: u16, body: String },

    /// 4xx from the backend, never retried
    #[error("invalid request: {status} - {body}")]
    InvalidRequest { status: u16, body: String },

    #[error("unexpected response status: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("backend unavailable after {attempts} attempts: {source}")]
    Unavailable {
        attempts: u32,
        #[source]
        source: Box<LLMError>,
    },

    #[error("request cancelled")]
    Cancelled,

    #[error("transform error: {0}")]
    Transform(#[from] ConversionError),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("no models available on the backend")]
    NoModels,

    #[error("config error: {0}")]
    Config(String),
}

impl LLMError {
    /// Whether a single failed attempt is worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_) | Self::Server { .. })
    }

    /// Map a non-success HTTP status to its error kind
    pub fn from_status(status: u16, body: &str) -> Self {
        let body = excerpt(body);
        match status {
            500..=599 => Self::Server { status, body },
            400..=499 => Self::InvalidRequest { status, body },
            _ => Self::Api { status, body },
        }
    }
}

impl From<reqwest::Error> for LLMError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_decode() {
            Self::Transform(ConversionError::InvalidFormat(e.to_string()))
        } else if e.is_builder() {
            Self::Config(e.to_string())
        } else {
            // connect, request and body failures are all transport level
            Self::Network(e.to_string())
        }
    }
}

fn excerpt(body: &str) -> String {
    if body.chars().count() <= BODY_EXCERPT_LEN {
        body.to_string()
    } else {
        let mut cut: String = body.chars().take(BODY_EXCERPT_LEN).collect();
        cut.push_str("...");
        cut
    }
}

/// Error during schema transformation
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, LLMError>;
