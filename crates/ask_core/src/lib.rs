//! Ask core: pure state machine and view-model helpers.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::{AnswerEnd, Msg};
pub use state::{AnswerPhase, AnswerStatus, AppState, Source, SubFetch, TurnId, ViewMode};
pub use update::update;
pub use view_model::{AppViewModel, Notice, NoticeKind, SourceView};
