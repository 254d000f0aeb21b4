//! Streaming completion: a producer task decodes SSE records into a bounded
//! channel; the consumer reads them through [`CompletionStream`].
//!
//! The producer always ends the stream with exactly one terminal chunk
//! (`Finish` or `Error`) and then drops its sender, which closes the channel.

use std::pin::Pin;
use std::task::{Context, Poll};

use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use parley_core::{ChatChunk, FinishReason};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{LLMError, Result};
use crate::transformer::{OpenAiTransformer, StreamEvent};

/// Capacity of the producer/consumer buffer, in chunks
pub const STREAM_BUFFER_SIZE: usize = 100;

/// Message carried by the terminal chunk on cancellation
pub const CANCELLED_MESSAGE: &str = "cancelled";

/// Consumer half of a streaming completion
#[derive(Debug)]
pub struct CompletionStream {
    rx: mpsc::Receiver<ChatChunk>,
}

impl CompletionStream {
    pub fn new(rx: mpsc::Receiver<ChatChunk>) -> Self {
        Self { rx }
    }

    /// A bounded sender/stream pair, for custom producers
    pub fn channel() -> (mpsc::Sender<ChatChunk>, Self) {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER_SIZE);
        (tx, Self::new(rx))
    }

    /// Next chunk, or `None` once the producer has closed the stream
    pub async fn next_chunk(&mut self) -> Option<ChatChunk> {
        self.rx.recv().await
    }

    /// Drain the stream and concatenate all content
    pub async fn collect_text(mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(chunk) = self.rx.recv().await {
            match chunk {
                ChatChunk::Content { text: delta } => text.push_str(&delta),
                ChatChunk::Finish { .. } => return Ok(text),
                ChatChunk::Error { message } if message == CANCELLED_MESSAGE => {
                    return Err(LLMError::Cancelled)
                }
                ChatChunk::Error { message } => return Err(LLMError::Stream(message)),
            }
        }
        Err(LLMError::Stream("stream closed without a terminal chunk".to_string()))
    }
}

impl Stream for CompletionStream {
    type Item = ChatChunk;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Spawn the producer for an established SSE response
pub(crate) fn spawn_producer(response: reqwest::Response, cancel: CancellationToken) -> CompletionStream {
    let (tx, stream) = CompletionStream::channel();

    tokio::spawn(async move {
        let events = Box::pin(
            response
                .bytes_stream()
                .eventsource()
                .map(|record| record.map(|event| event.data)),
        );
        if let Some(terminal) = pump(events, &tx, &cancel).await {
            // consumer may already be gone
            let _ = tx.send(terminal).await;
        }
        debug!("Completion stream producer finished");
    });

    stream
}

/// Forward content chunks until a terminal condition; returns the terminal
/// chunk, or `None` when the consumer has hung up.
async fn pump<S, E>(
    mut events: S,
    tx: &mpsc::Sender<ChatChunk>,
    cancel: &CancellationToken,
) -> Option<ChatChunk>
where
    S: Stream<Item = std::result::Result<String, E>> + Unpin,
    E: std::fmt::Display,
{
    let transformer = OpenAiTransformer::new();
    let mut reason = FinishReason::Stop;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Some(ChatChunk::error(CANCELLED_MESSAGE)),
            next = events.next() => next,
        };

        let data = match next {
            // EOF without [DONE] counts as a normal finish
            None => return Some(ChatChunk::finish(reason)),
            Some(Err(e)) => return Some(ChatChunk::error(format!("stream read error: {}", e))),
            Some(Ok(data)) => data,
        };

        if data.trim().is_empty() {
            continue;
        }

        match transformer.parse_stream_data(&data) {
            Ok(StreamEvent::Done) => return Some(ChatChunk::finish(reason)),
            Ok(StreamEvent::Delta {
                content,
                finish_reason,
            }) => {
                if let Some(r) = finish_reason {
                    reason = r;
                }
                if let Some(text) = content {
                    let sent = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Some(ChatChunk::error(CANCELLED_MESSAGE)),
                        sent = tx.send(ChatChunk::content(text)) => sent,
                    };
                    if sent.is_err() {
                        debug!("Completion stream consumer dropped");
                        return None;
                    }
                }
            }
            Err(e) => {
                warn!("Skipping malformed stream record: {} (data: {})", e, data);
            }
        }
    }
}
