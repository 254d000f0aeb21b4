/// Chat stream chunk
///
/// A stream is a run of `Content` chunks closed by exactly one terminal
/// chunk, either `Finish` or `Error`.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatChunk {
    /// Text content delta
    Content { text: String },
    /// Stream finished
    Finish { reason: FinishReason },
    /// Error occurred
    Error { message: String },
}

impl ChatChunk {
    /// Create a content chunk
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content { text: text.into() }
    }

    /// Create an error chunk
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Create a finish chunk
    pub fn finish(reason: FinishReason) -> Self {
        Self::Finish { reason }
    }

    /// Check if this is an error chunk
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Check if this is a finish chunk
    pub fn is_finish(&self) -> bool {
        matches!(self, Self::Finish { .. })
    }

    pub fn is_terminal(&self) -> bool {
        self.is_error() || self.is_finish()
    }
}

/// Reason for finishing the generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Completed naturally
    Stop,
    /// Hit token limit
    Length,
    /// Content was filtered
    ContentFilter,
}

impl FinishReason {
    /// Convert from the wire value; unknown reasons count as `Stop`
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "length" => Self::Length,
            "content_filter" => Self::ContentFilter,
            _ => Self::Stop,
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ContentFilter => "content_filter",
        }
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
