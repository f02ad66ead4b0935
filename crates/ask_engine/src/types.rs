use serde::{Deserialize, Serialize};
use std::fmt;

pub type TurnId = u64;

/// A retrieved reference, as exchanged with the sources and answer endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerMode {
    /// Status 202; the body was the whole answer.
    Precomputed,
    /// Server-sent event stream of text deltas.
    Streamed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSummary {
    pub mode: AnswerMode,
    /// UTF-8 length of the delivered answer text.
    pub bytes: u64,
    /// Dispatched SSE events, including malformed ones.
    pub events: usize,
    pub malformed_events: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    SourcesLoaded {
        turn: TurnId,
        result: Result<Vec<Source>, FetchError>,
    },
    AnswerRequested {
        turn: TurnId,
    },
    AnswerPrecomputed {
        turn: TurnId,
        text: String,
    },
    AnswerDelta {
        turn: TurnId,
        text: String,
    },
    AnswerCompleted {
        turn: TurnId,
        result: Result<AnswerSummary, FetchError>,
    },
    SimilarQuestionsLoaded {
        turn: TurnId,
        result: Result<Vec<String>, FetchError>,
    },
    TurnSettled {
        turn: TurnId,
    },
}

impl EngineEvent {
    pub fn turn(&self) -> TurnId {
        match self {
            EngineEvent::SourcesLoaded { turn, .. }
            | EngineEvent::AnswerRequested { turn }
            | EngineEvent::AnswerPrecomputed { turn, .. }
            | EngineEvent::AnswerDelta { turn, .. }
            | EngineEvent::AnswerCompleted { turn, .. }
            | EngineEvent::SimilarQuestionsLoaded { turn, .. }
            | EngineEvent::TurnSettled { turn } => *turn,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "turn cancelled")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    /// No bytes arrived on an open answer stream within the idle window.
    IdleTimeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    /// Response body did not have the expected JSON shape.
    Decode,
    Cancelled,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::IdleTimeout => write!(f, "stream idle timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "answer too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Decode => write!(f, "malformed response body"),
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid base url {url}: {message}")]
    InvalidBaseUrl { url: String, message: String },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("failed to start engine runtime: {0}")]
    Runtime(#[from] std::io::Error),
}
