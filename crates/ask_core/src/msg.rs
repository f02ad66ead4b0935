use crate::{Source, TurnId};

/// How a finished answer stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerEnd {
    Complete,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User edited the question input.
    InputChanged(String),
    /// User submitted the current input buffer.
    Submitted,
    /// User picked a similar question as a follow-up.
    FollowUpSelected(String),
    /// User asked to start over.
    ResetClicked,
    /// Sources lookup settled; `Err` carries the failure reason.
    SourcesLoaded {
        turn: TurnId,
        result: Result<Vec<Source>, String>,
    },
    /// Answer request has been issued with the retrieved sources.
    AnswerRequested { turn: TurnId },
    /// Server returned the whole answer at once.
    AnswerPrecomputed { turn: TurnId, text: String },
    /// One streamed text delta.
    AnswerDelta { turn: TurnId, text: String },
    /// Answer chain finished.
    AnswerFinished { turn: TurnId, end: AnswerEnd },
    /// Similar-questions lookup settled.
    SimilarQuestionsLoaded {
        turn: TurnId,
        result: Result<Vec<String>, String>,
    },
    /// Both chains of the turn have settled.
    TurnSettled { turn: TurnId },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}

impl Msg {
    /// Turn an engine-originated message belongs to, if any.
    pub fn turn(&self) -> Option<TurnId> {
        match self {
            Msg::SourcesLoaded { turn, .. }
            | Msg::AnswerRequested { turn }
            | Msg::AnswerPrecomputed { turn, .. }
            | Msg::AnswerDelta { turn, .. }
            | Msg::AnswerFinished { turn, .. }
            | Msg::SimilarQuestionsLoaded { turn, .. }
            | Msg::TurnSettled { turn } => Some(*turn),
            Msg::InputChanged(_)
            | Msg::Submitted
            | Msg::FollowUpSelected(_)
            | Msg::ResetClicked
            | Msg::Tick
            | Msg::NoOp => None,
        }
    }
}
