use std::sync::{mpsc, Arc};

use ask_core::{AnswerEnd, Effect, Msg, Source};
use ask_engine::{ClientSettings, EngineError, EngineEvent, EngineHandle, EventSink};
use ask_logging::{ask_debug, ask_info};

use super::app::LoopEvent;

pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(settings: ClientSettings, tx: mpsc::Sender<LoopEvent>) -> Result<Self, EngineError> {
        let sink = Arc::new(MsgSink { tx });
        let engine = EngineHandle::new(settings, sink)?;
        Ok(Self { engine })
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartTurn { turn, question } => {
                    ask_info!(turn = turn; "StartTurn question_len={}", question.len());
                    self.engine.start_turn(turn, question);
                }
                Effect::CancelTurn { turn } => {
                    ask_debug!(turn = turn; "CancelTurn");
                    self.engine.cancel_turn(turn);
                }
            }
        }
    }
}

/// Forwards engine events into the app loop as core messages.
struct MsgSink {
    tx: mpsc::Sender<LoopEvent>,
}

impl EventSink for MsgSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(LoopEvent::Msg(to_msg(event)));
    }
}

fn to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::SourcesLoaded { turn, result } => Msg::SourcesLoaded {
            turn,
            result: result
                .map(|sources| sources.into_iter().map(map_source).collect())
                .map_err(|err| err.to_string()),
        },
        EngineEvent::AnswerRequested { turn } => Msg::AnswerRequested { turn },
        EngineEvent::AnswerPrecomputed { turn, text } => Msg::AnswerPrecomputed { turn, text },
        EngineEvent::AnswerDelta { turn, text } => Msg::AnswerDelta { turn, text },
        EngineEvent::AnswerCompleted { turn, result } => Msg::AnswerFinished {
            turn,
            end: match result {
                Ok(_) => AnswerEnd::Complete,
                Err(err) => AnswerEnd::Failed(err.to_string()),
            },
        },
        EngineEvent::SimilarQuestionsLoaded { turn, result } => Msg::SimilarQuestionsLoaded {
            turn,
            result: result.map_err(|err| err.to_string()),
        },
        EngineEvent::TurnSettled { turn } => Msg::TurnSettled { turn },
    }
}

fn map_source(source: ask_engine::Source) -> Source {
    Source {
        name: source.name,
        url: source.url,
    }
}
