use std::time::Duration;

use ask_logging::{ask_debug, ask_trace, ask_warn};
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use reqwest::StatusCode;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::decode::Utf8StreamDecoder;
use crate::orchestrator::EventSink;
use crate::sse::{SseItem, SseParser};
use crate::{AnswerMode, AnswerSummary, EngineEvent, FailureKind, FetchError, TurnId};

/// Status the answer endpoint uses to return a finished answer as plain text.
pub const PRECOMPUTED_STATUS: StatusCode = StatusCode::ACCEPTED;

const FRAME_ENVELOPE_BYTES: u64 = 256;

#[derive(Debug, Clone)]
pub struct AnswerSettings {
    /// Longest wait for the response head or for the next body chunk.
    pub idle_timeout: Duration,
    /// Upper bound on delivered answer text, in UTF-8 bytes.
    pub max_answer_bytes: u64,
}

impl AnswerSettings {
    /// Upper bound on event-stream text buffered for one line or one event.
    ///
    /// Leaves room for JSON escaping (at most six bytes per text byte) and
    /// the payload envelope around the largest allowed answer.
    pub fn max_frame_bytes(&self) -> u64 {
        self.max_answer_bytes
            .saturating_mul(6)
            .saturating_add(FRAME_ENVELOPE_BYTES)
    }
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(60),
            max_answer_bytes: 1024 * 1024,
        }
    }
}

/// Extracts the text delta carried by one event payload.
///
/// Returns `None` when the payload is not a JSON object. A missing or null
/// `text` yields an empty delta; numbers and booleans yield their JSON text.
pub fn extract_delta(data: &str) -> Option<String> {
    let value: Value = serde_json::from_str(data).ok()?;
    let object = value.as_object()?;
    let delta = match object.get("text") {
        Some(Value::String(text)) => text.clone(),
        Some(other @ (Value::Number(_) | Value::Bool(_))) => other.to_string(),
        Some(Value::Null | Value::Array(_) | Value::Object(_)) | None => String::new(),
    };
    Some(delta)
}

/// Drains a successful answer response into `sink` as answer events.
///
/// Status 202 bodies are delivered verbatim as one `AnswerPrecomputed`
/// event; every other success status is consumed as an event stream.
pub async fn consume_answer(
    response: reqwest::Response,
    turn: TurnId,
    settings: &AnswerSettings,
    sink: &dyn EventSink,
    cancel: &CancellationToken,
) -> Result<AnswerSummary, FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ));
    }

    if let Some(content_len) = response.content_length() {
        if status == PRECOMPUTED_STATUS && content_len > settings.max_answer_bytes {
            return Err(too_large(settings.max_answer_bytes, content_len));
        }
    }

    let mut stream = std::pin::pin!(response.bytes_stream());
    if status == PRECOMPUTED_STATUS {
        read_precomputed(&mut stream, turn, settings, sink, cancel).await
    } else {
        read_event_stream(&mut stream, turn, settings, sink, cancel).await
    }
}

async fn read_precomputed<S>(
    stream: &mut S,
    turn: TurnId,
    settings: &AnswerSettings,
    sink: &dyn EventSink,
    cancel: &CancellationToken,
) -> Result<AnswerSummary, FetchError>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    let mut body = BytesMut::new();
    while let Some(chunk) = next_chunk(stream, settings.idle_timeout, cancel).await? {
        let next_len = body.len() as u64 + chunk.len() as u64;
        if next_len > settings.max_answer_bytes {
            return Err(too_large(settings.max_answer_bytes, next_len));
        }
        body.extend_from_slice(&chunk);
    }

    let mut decoder = Utf8StreamDecoder::new();
    let mut text = decoder.decode(&body);
    text.push_str(&decoder.finish());
    if decoder.had_errors() {
        ask_warn!(turn = turn; "precomputed answer contained invalid UTF-8");
    }

    let summary = AnswerSummary {
        mode: AnswerMode::Precomputed,
        bytes: text.len() as u64,
        events: 0,
        malformed_events: 0,
    };
    ask_debug!(turn = turn; "precomputed answer received ({} bytes)", summary.bytes);
    sink.emit(EngineEvent::AnswerPrecomputed { turn, text });
    Ok(summary)
}

async fn read_event_stream<S>(
    stream: &mut S,
    turn: TurnId,
    settings: &AnswerSettings,
    sink: &dyn EventSink,
    cancel: &CancellationToken,
) -> Result<AnswerSummary, FetchError>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    let mut decoder = Utf8StreamDecoder::new();
    let mut parser = SseParser::new();
    let max_frame_bytes = settings.max_frame_bytes();
    let mut delivery = Delivery {
        turn,
        max_bytes: settings.max_answer_bytes,
        max_frame_bytes,
        sink,
        summary: AnswerSummary {
            mode: AnswerMode::Streamed,
            bytes: 0,
            events: 0,
            malformed_events: 0,
        },
    };

    while let Some(chunk) = next_chunk(stream, settings.idle_timeout, cancel).await? {
        ask_trace!(turn = turn; "answer chunk of {} bytes", chunk.len());
        let text = decoder.decode(&chunk);
        delivery.deliver(parser.feed(&text))?;
        let buffered = parser.buffered_len() as u64;
        if buffered > max_frame_bytes {
            return Err(frame_too_large(max_frame_bytes, buffered));
        }
    }

    let tail = decoder.finish();
    if !tail.is_empty() {
        delivery.deliver(parser.feed(&tail))?;
    }
    if decoder.had_errors() {
        ask_warn!(turn = turn; "answer stream contained invalid UTF-8");
    }

    let summary = delivery.summary;
    ask_debug!(
        turn = turn;
        "answer stream ended: {} events ({} malformed), {} bytes",
        summary.events,
        summary.malformed_events,
        summary.bytes
    );
    Ok(summary)
}

struct Delivery<'a> {
    turn: TurnId,
    max_bytes: u64,
    max_frame_bytes: u64,
    sink: &'a dyn EventSink,
    summary: AnswerSummary,
}

impl Delivery<'_> {
    fn deliver(&mut self, items: Vec<SseItem>) -> Result<(), FetchError> {
        for item in items {
            let event = match item {
                SseItem::Event(event) => event,
                SseItem::ReconnectInterval(millis) => {
                    ask_trace!(turn = self.turn; "ignoring reconnect interval {}ms", millis);
                    continue;
                }
            };
            self.summary.events += 1;
            let data_len = event.data.len() as u64;
            if data_len > self.max_frame_bytes {
                return Err(frame_too_large(self.max_frame_bytes, data_len));
            }

            let Some(text) = extract_delta(&event.data) else {
                self.summary.malformed_events += 1;
                ask_warn!(
                    turn = self.turn;
                    "skipping malformed answer event ({} bytes of data)",
                    event.data.len()
                );
                continue;
            };
            if text.is_empty() {
                continue;
            }

            let next_len = self.summary.bytes + text.len() as u64;
            if next_len > self.max_bytes {
                return Err(too_large(self.max_bytes, next_len));
            }
            self.summary.bytes = next_len;
            self.sink.emit(EngineEvent::AnswerDelta {
                turn: self.turn,
                text,
            });
        }
        Ok(())
    }
}

/// Waits for the next body chunk, racing cancellation and the idle timer.
async fn next_chunk<S>(
    stream: &mut S,
    idle_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Option<Bytes>, FetchError>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FetchError::cancelled()),
        next = tokio::time::timeout(idle_timeout, stream.next()) => match next {
            Err(_) => Err(FetchError::new(
                FailureKind::IdleTimeout,
                format!("no answer data for {idle_timeout:?}"),
            )),
            Ok(None) => Ok(None),
            Ok(Some(Ok(chunk))) => Ok(Some(chunk)),
            Ok(Some(Err(err))) => Err(stream_error(err)),
        },
    }
}

// Body bytes are decoded here, not by reqwest, so a failed read is always
// the connection's fault even when reqwest labels it a decode error.
fn stream_error(err: reqwest::Error) -> FetchError {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else {
        FailureKind::Network
    };
    FetchError::new(kind, err.to_string())
}

fn too_large(max_bytes: u64, actual: u64) -> FetchError {
    FetchError::new(
        FailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        },
        "answer too large",
    )
}

fn frame_too_large(max_bytes: u64, actual: u64) -> FetchError {
    FetchError::new(
        FailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        },
        "answer event too large",
    )
}

#[cfg(test)]
mod tests {
    use super::{extract_delta, AnswerSettings};

    #[test]
    fn frame_bound_scales_with_answer_bound() {
        let settings = AnswerSettings {
            max_answer_bytes: 10,
            ..AnswerSettings::default()
        };
        assert_eq!(settings.max_frame_bytes(), 316);

        let unbounded = AnswerSettings {
            max_answer_bytes: u64::MAX,
            ..AnswerSettings::default()
        };
        assert_eq!(unbounded.max_frame_bytes(), u64::MAX);
    }

    #[test]
    fn string_text_is_the_delta() {
        assert_eq!(extract_delta(r#"{"text":"TCP is "}"#).as_deref(), Some("TCP is "));
    }

    #[test]
    fn missing_or_null_text_is_empty() {
        assert_eq!(extract_delta(r#"{"other":1}"#).as_deref(), Some(""));
        assert_eq!(extract_delta(r#"{"text":null}"#).as_deref(), Some(""));
    }

    #[test]
    fn scalar_text_is_stringified() {
        assert_eq!(extract_delta(r#"{"text":42}"#).as_deref(), Some("42"));
        assert_eq!(extract_delta(r#"{"text":true}"#).as_deref(), Some("true"));
    }

    #[test]
    fn non_object_payloads_are_malformed() {
        assert_eq!(extract_delta("not json"), None);
        assert_eq!(extract_delta("[DONE]"), None);
        assert_eq!(extract_delta("null"), None);
        assert_eq!(extract_delta(r#""text""#), None);
    }
}
