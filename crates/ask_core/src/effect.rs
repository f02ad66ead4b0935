use crate::TurnId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Run both request chains for a freshly submitted question.
    StartTurn { turn: TurnId, question: String },
    /// Abandon an in-flight turn; the engine drops its streams.
    CancelTurn { turn: TurnId },
}
