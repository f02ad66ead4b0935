//! Ask engine: HTTP requests, answer streaming and turn orchestration.
mod answer;
mod client;
mod decode;
mod engine;
mod orchestrator;
mod sse;
mod types;

pub use answer::{consume_answer, extract_delta, AnswerSettings, PRECOMPUTED_STATUS};
pub use client::{AssistantApi, ClientSettings, ReqwestApi};
pub use decode::Utf8StreamDecoder;
pub use engine::EngineHandle;
pub use orchestrator::{run_turn, EventSink};
pub use sse::{SseEvent, SseItem, SseParser};
pub use types::{
    AnswerMode, AnswerSummary, EngineError, EngineEvent, FailureKind, FetchError, Source, TurnId,
};
