use crate::{AnswerStatus, Source, TurnId, ViewMode};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub mode: ViewMode,
    pub input: String,
    pub turn: Option<TurnId>,
    pub question: String,
    pub sources: Vec<SourceView>,
    pub sources_loading: bool,
    pub answer: String,
    pub answer_status: AnswerStatus,
    pub similar_questions: Vec<String>,
    pub loading: bool,
    pub input_enabled: bool,
    pub notices: Vec<Notice>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceView {
    pub name: String,
    pub url: String,
    /// Host part of `url`, lowercased; `None` when the url does not parse.
    pub host: Option<String>,
}

impl SourceView {
    pub(crate) fn from_source(source: &Source) -> Self {
        let host = url::Url::parse(source.url.trim())
            .ok()
            .and_then(|parsed| parsed.host_str().map(|h| h.to_ascii_lowercase()));
        Self {
            name: source.name.clone(),
            url: source.url.clone(),
            host,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    SourcesUnavailable,
    AnswerFailed,
    SimilarQuestionsUnavailable,
}

/// User-visible report of a degraded or failed sub-request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}
