use ask_logging::{ask_debug, ask_info, ask_warn};
use tokio_util::sync::CancellationToken;

use crate::client::AssistantApi;
use crate::{EngineEvent, FailureKind, FetchError, TurnId};

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Sink that drops events once the turn is cancelled.
struct TurnSink<'a> {
    inner: &'a dyn EventSink,
    cancel: &'a CancellationToken,
}

impl EventSink for TurnSink<'_> {
    fn emit(&self, event: EngineEvent) {
        if !self.cancel.is_cancelled() {
            self.inner.emit(event);
        }
    }
}

/// Runs both request chains of one turn and reports progress to `sink`.
///
/// The answer chain (sources, then answer with those sources) and the
/// similar-questions chain run concurrently; neither failure cuts the other
/// short. `TurnSettled` is emitted once both have finished, unless the turn
/// was cancelled, in which case nothing further is emitted at all.
pub async fn run_turn(
    api: &dyn AssistantApi,
    turn: TurnId,
    question: &str,
    sink: &dyn EventSink,
    cancel: &CancellationToken,
) {
    ask_info!(turn = turn; "starting turn ({} chars)", question.chars().count());
    let sink = TurnSink {
        inner: sink,
        cancel,
    };

    tokio::join!(
        answer_chain(api, turn, question, &sink, cancel),
        similar_chain(api, turn, question, &sink, cancel),
    );

    if cancel.is_cancelled() {
        ask_info!(turn = turn; "turn cancelled");
        return;
    }
    sink.emit(EngineEvent::TurnSettled { turn });
    ask_info!(turn = turn; "turn settled");
}

async fn answer_chain(
    api: &dyn AssistantApi,
    turn: TurnId,
    question: &str,
    sink: &dyn EventSink,
    cancel: &CancellationToken,
) {
    let sources_result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        result = api.sources(question) => result,
    };
    let sources = match &sources_result {
        Ok(sources) => {
            ask_debug!(turn = turn; "retrieved {} sources", sources.len());
            sources.clone()
        }
        Err(err) => {
            ask_warn!(turn = turn; "sources unavailable, continuing without: {}", err);
            Vec::new()
        }
    };
    sink.emit(EngineEvent::SourcesLoaded {
        turn,
        result: sources_result,
    });

    sink.emit(EngineEvent::AnswerRequested { turn });
    let result = api.answer(turn, question, &sources, sink, cancel).await;
    match &result {
        Ok(summary) => ask_debug!(turn = turn; "answer finished: {:?}", summary),
        Err(FetchError {
            kind: FailureKind::Cancelled,
            ..
        }) => return,
        Err(err) => ask_warn!(turn = turn; "answer failed: {}", err),
    }
    sink.emit(EngineEvent::AnswerCompleted { turn, result });
}

async fn similar_chain(
    api: &dyn AssistantApi,
    turn: TurnId,
    question: &str,
    sink: &dyn EventSink,
    cancel: &CancellationToken,
) {
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        result = api.similar_questions(question) => result,
    };
    match &result {
        Ok(questions) => ask_debug!(turn = turn; "retrieved {} similar questions", questions.len()),
        Err(err) => ask_warn!(turn = turn; "similar questions unavailable: {}", err),
    }
    sink.emit(EngineEvent::SimilarQuestionsLoaded { turn, result });
}
