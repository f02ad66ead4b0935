use crate::{AnswerEnd, AnswerPhase, AppState, Effect, Msg, SubFetch};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    // Events from a superseded or reset turn must never touch the current one.
    if let Some(turn) = msg.turn() {
        if state.current_turn() != Some(turn) {
            return (state, Vec::new());
        }
    }

    let effects = match msg {
        Msg::InputChanged(text) => {
            state.set_input(text);
            Vec::new()
        }
        Msg::Submitted => {
            let question = state.input().to_string();
            submit(&mut state, question)
        }
        Msg::FollowUpSelected(question) => submit(&mut state, question),
        Msg::ResetClicked => {
            let effects = cancel_in_flight(&state);
            state.reset();
            effects
        }
        Msg::SourcesLoaded { turn, result } => {
            if let Some(current) = state.turn_mut(turn) {
                if current.phase == AnswerPhase::SourcesPending {
                    match result {
                        Ok(sources) => {
                            current.sources = SubFetch::Ready(sources);
                            current.phase = AnswerPhase::SourcesReady;
                        }
                        Err(reason) => {
                            current.sources = SubFetch::Degraded {
                                value: Vec::new(),
                                reason,
                            };
                            current.phase = AnswerPhase::SourcesFailed;
                        }
                    }
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::AnswerRequested { turn } => {
            if let Some(current) = state.turn_mut(turn) {
                if matches!(
                    current.phase,
                    AnswerPhase::SourcesReady | AnswerPhase::SourcesFailed
                ) {
                    current.phase = AnswerPhase::AnswerRequested;
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::AnswerPrecomputed { turn, text } => {
            if let Some(current) = state.turn_mut(turn) {
                if current.phase == AnswerPhase::AnswerRequested {
                    current.answer = text;
                    current.phase = AnswerPhase::Precomputed;
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::AnswerDelta { turn, text } => {
            if let Some(current) = state.turn_mut(turn) {
                let chunks = match current.phase {
                    AnswerPhase::AnswerRequested => Some(0),
                    AnswerPhase::Streaming { chunks } => Some(chunks),
                    _ => None,
                };
                if let Some(chunks) = chunks {
                    current.answer.push_str(&text);
                    current.phase = AnswerPhase::Streaming { chunks: chunks + 1 };
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::AnswerFinished { turn, end } => {
            if let Some(current) = state.turn_mut(turn) {
                if !current.phase.is_terminal() {
                    current.phase = match end {
                        AnswerEnd::Complete => AnswerPhase::Complete,
                        AnswerEnd::Failed(reason) => AnswerPhase::Failed { reason },
                    };
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::SimilarQuestionsLoaded { turn, result } => {
            if let Some(current) = state.turn_mut(turn) {
                if current.similar.is_pending() {
                    current.similar = match result {
                        Ok(questions) => SubFetch::Ready(questions),
                        Err(reason) => SubFetch::Failed { reason },
                    };
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::TurnSettled { turn } => {
            if let Some(current) = state.turn_mut(turn) {
                if !current.settled {
                    current.settled = true;
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn submit(state: &mut AppState, question: String) -> Vec<Effect> {
    if question.trim().is_empty() {
        return Vec::new();
    }
    let mut effects = cancel_in_flight(state);
    let turn = state.begin_turn(question.clone());
    effects.push(Effect::StartTurn { turn, question });
    effects
}

fn cancel_in_flight(state: &AppState) -> Vec<Effect> {
    state
        .in_flight_turn()
        .map(|turn| Effect::CancelTurn { turn })
        .into_iter()
        .collect()
}
