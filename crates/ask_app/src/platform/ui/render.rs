use std::fmt::Write as _;

use ask_core::{AnswerStatus, AppViewModel, SourceView, TurnId, ViewMode};

const HERO_TEXT: &str = "Ask anything. Type a question and press Enter.\n\
Commands: /N asks a related question, /reset starts over, /quit exits.\n";
const PROMPT: &str = "> ";

/// What has already been written for the visible turn.
#[derive(Debug, Default)]
struct Shown {
    mode: Option<ViewMode>,
    turn: Option<TurnId>,
    sources: bool,
    answer_len: usize,
    answer_closed: bool,
    notices: usize,
    similar: bool,
    prompt: bool,
}

/// Append-only terminal renderer.
///
/// Each call writes only what changed since the previous frame, so a
/// streaming answer appears as a growing paragraph instead of being redrawn.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    shown: Shown,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, view: &AppViewModel) -> String {
        let mut out = String::new();

        if self.shown.mode != Some(view.mode) || self.shown.turn != view.turn {
            self.shown = Shown {
                mode: Some(view.mode),
                turn: view.turn,
                ..Shown::default()
            };
            match view.mode {
                ViewMode::Hero => out.push_str(HERO_TEXT),
                ViewMode::Result => {
                    let _ = writeln!(out, "\nQuestion: \"{}\"", view.question);
                    if view.sources_loading {
                        out.push_str("Sources: searching...\n");
                    }
                }
            }
        }

        if view.mode == ViewMode::Result {
            self.render_turn(view, &mut out);
        }

        if view.input_enabled && !self.shown.prompt {
            out.push_str(PROMPT);
            self.shown.prompt = true;
        }
        out
    }

    fn render_turn(&mut self, view: &AppViewModel, out: &mut String) {
        if !view.sources_loading && !self.shown.sources {
            render_sources(&view.sources, out);
            self.shown.sources = true;
        }

        if view.answer.len() < self.shown.answer_len
            || !view.answer.is_char_boundary(self.shown.answer_len)
        {
            // Only a precomputed answer replaces text; restart the paragraph.
            out.push('\n');
            self.shown.answer_len = 0;
        }
        if view.answer.len() > self.shown.answer_len {
            if self.shown.answer_len == 0 {
                out.push_str("Answer:\n");
            }
            out.push_str(&view.answer[self.shown.answer_len..]);
            self.shown.answer_len = view.answer.len();
        }
        if !self.shown.answer_closed && answer_finished(&view.answer_status) {
            if self.shown.answer_len > 0 {
                out.push('\n');
            }
            self.shown.answer_closed = true;
        }

        for notice in view.notices.iter().skip(self.shown.notices) {
            let _ = writeln!(out, "! {}", notice.message);
        }
        self.shown.notices = self.shown.notices.max(view.notices.len());

        if !view.loading && !self.shown.similar {
            if !view.similar_questions.is_empty() {
                out.push_str("Related:\n");
                for (idx, question) in view.similar_questions.iter().enumerate() {
                    let _ = writeln!(out, "  /{} {}", idx + 1, question);
                }
            }
            self.shown.similar = true;
        }
    }
}

fn answer_finished(status: &AnswerStatus) -> bool {
    matches!(status, AnswerStatus::Complete | AnswerStatus::Failed { .. })
}

fn render_sources(sources: &[SourceView], out: &mut String) {
    if sources.is_empty() {
        out.push_str("Sources: none\n");
        return;
    }
    out.push_str("Sources:\n");
    for (idx, source) in sources.iter().enumerate() {
        match &source.host {
            Some(host) => {
                let _ = writeln!(out, "  [{}] {} ({}) {}", idx + 1, source.name, host, source.url);
            }
            None => {
                let _ = writeln!(out, "  [{}] {} {}", idx + 1, source.name, source.url);
            }
        }
    }
}
