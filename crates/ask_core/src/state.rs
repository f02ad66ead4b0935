use crate::view_model::{AppViewModel, Notice, NoticeKind, SourceView};

pub type TurnId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub url: String,
}

/// Which screen the front-end shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Landing prompt, nothing asked yet.
    #[default]
    Hero,
    /// Question, sources, answer and follow-ups.
    Result,
}

/// Outcome of one independent sub-request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubFetch<T> {
    #[default]
    Pending,
    Ready(T),
    /// Failed, but a usable fallback value stands in.
    Degraded { value: T, reason: String },
    Failed { reason: String },
}

impl<T> SubFetch<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, SubFetch::Pending)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            SubFetch::Ready(value) | SubFetch::Degraded { value, .. } => Some(value),
            SubFetch::Pending | SubFetch::Failed { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            SubFetch::Degraded { reason, .. } | SubFetch::Failed { reason } => Some(reason),
            SubFetch::Pending | SubFetch::Ready(_) => None,
        }
    }
}

/// Progress of the sources-then-answer chain for one turn.
///
/// Transitions only move forward; `Complete` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AnswerPhase {
    #[default]
    Idle,
    SourcesPending,
    SourcesReady,
    SourcesFailed,
    AnswerRequested,
    Precomputed,
    Streaming { chunks: usize },
    Complete,
    Failed { reason: String },
}

impl AnswerPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnswerPhase::Complete | AnswerPhase::Failed { .. })
    }
}

/// Render-facing summary of the answer buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AnswerStatus {
    /// Nothing received yet (or no turn).
    #[default]
    Waiting,
    Streaming { chunks: usize },
    Precomputed,
    Complete,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Turn {
    pub(crate) id: TurnId,
    pub(crate) question: String,
    pub(crate) sources: SubFetch<Vec<Source>>,
    pub(crate) answer: String,
    pub(crate) phase: AnswerPhase,
    pub(crate) similar: SubFetch<Vec<String>>,
    pub(crate) settled: bool,
}

impl Turn {
    fn new(id: TurnId, question: String) -> Self {
        Self {
            id,
            question,
            sources: SubFetch::Pending,
            answer: String::new(),
            phase: AnswerPhase::SourcesPending,
            similar: SubFetch::Pending,
            settled: false,
        }
    }

    fn answer_status(&self) -> AnswerStatus {
        match &self.phase {
            AnswerPhase::Idle
            | AnswerPhase::SourcesPending
            | AnswerPhase::SourcesReady
            | AnswerPhase::SourcesFailed
            | AnswerPhase::AnswerRequested => AnswerStatus::Waiting,
            AnswerPhase::Precomputed => AnswerStatus::Precomputed,
            AnswerPhase::Streaming { chunks } => AnswerStatus::Streaming { chunks: *chunks },
            AnswerPhase::Complete => AnswerStatus::Complete,
            AnswerPhase::Failed { reason } => AnswerStatus::Failed {
                reason: reason.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    input: String,
    mode: ViewMode,
    next_turn: TurnId,
    turn: Option<Turn>,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            input: String::new(),
            mode: ViewMode::Hero,
            next_turn: 1,
            turn: None,
            dirty: false,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        let turn = self.turn.as_ref();
        let loading = turn.is_some_and(|t| !t.settled);
        AppViewModel {
            mode: self.mode,
            input: self.input.clone(),
            turn: turn.map(|t| t.id),
            question: turn.map(|t| t.question.clone()).unwrap_or_default(),
            sources: turn
                .and_then(|t| t.sources.value())
                .map(|sources| sources.iter().map(SourceView::from_source).collect())
                .unwrap_or_default(),
            sources_loading: turn.is_some_and(|t| t.sources.is_pending()),
            answer: turn.map(|t| t.answer.clone()).unwrap_or_default(),
            answer_status: turn.map(Turn::answer_status).unwrap_or_default(),
            similar_questions: turn
                .and_then(|t| t.similar.value())
                .cloned()
                .unwrap_or_default(),
            loading,
            input_enabled: !loading,
            notices: turn.map(collect_notices).unwrap_or_default(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, clearing the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Turn currently bound to the view, settled or not.
    pub fn current_turn(&self) -> Option<TurnId> {
        self.turn.as_ref().map(|t| t.id)
    }

    /// Turn whose chains are still running.
    pub fn in_flight_turn(&self) -> Option<TurnId> {
        self.turn.as_ref().filter(|t| !t.settled).map(|t| t.id)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_input(&mut self, input: String) {
        if self.input != input {
            self.input = input;
            self.mark_dirty();
        }
    }

    /// Starts a fresh turn, discarding everything bound to the previous one.
    pub(crate) fn begin_turn(&mut self, question: String) -> TurnId {
        let id = self.next_turn;
        self.next_turn += 1;
        self.mode = ViewMode::Result;
        self.input.clear();
        self.turn = Some(Turn::new(id, question));
        self.mark_dirty();
        id
    }

    pub(crate) fn reset(&mut self) {
        self.input.clear();
        self.mode = ViewMode::Hero;
        self.turn = None;
        self.mark_dirty();
    }

    /// Mutable access to the turn with `id`; `None` for stale or unknown turns.
    pub(crate) fn turn_mut(&mut self, id: TurnId) -> Option<&mut Turn> {
        self.turn.as_mut().filter(|t| t.id == id)
    }
}

fn collect_notices(turn: &Turn) -> Vec<Notice> {
    let mut notices = Vec::new();
    if let Some(reason) = turn.sources.reason() {
        notices.push(Notice {
            kind: NoticeKind::SourcesUnavailable,
            message: format!("Sources unavailable: {reason}"),
        });
    }
    if let AnswerPhase::Failed { reason } = &turn.phase {
        notices.push(Notice {
            kind: NoticeKind::AnswerFailed,
            message: format!("Answer failed: {reason}"),
        });
    }
    if let Some(reason) = turn.similar.reason() {
        notices.push(Notice {
            kind: NoticeKind::SimilarQuestionsUnavailable,
            message: format!("Similar questions unavailable: {reason}"),
        });
    }
    notices
}
