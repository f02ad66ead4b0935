use ask_core::{AppViewModel, Msg};

/// One line of terminal input, interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Ask(String),
    /// 1-based index into the similar-questions list.
    FollowUp(usize),
    Reset,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse(line: &str) -> UserCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return UserCommand::Empty;
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return UserCommand::Ask(line.trim_end_matches(['\r', '\n']).to_string());
    };
    match command {
        "reset" => UserCommand::Reset,
        "quit" | "exit" => UserCommand::Quit,
        other => match other.parse::<usize>() {
            Ok(index) if index > 0 => UserCommand::FollowUp(index),
            _ => UserCommand::Unknown(trimmed.to_string()),
        },
    }
}

/// Translates a command into core messages given what is on screen.
///
/// `Err` carries a hint for the user when the command cannot apply.
pub fn to_messages(command: UserCommand, view: &AppViewModel) -> Result<Vec<Msg>, String> {
    match command {
        UserCommand::Ask(text) => {
            if !view.input_enabled {
                return Err("Still answering. Pick a follow-up or /reset first.".to_string());
            }
            Ok(vec![Msg::InputChanged(text), Msg::Submitted])
        }
        UserCommand::FollowUp(index) => view
            .similar_questions
            .get(index - 1)
            .map(|question| vec![Msg::FollowUpSelected(question.clone())])
            .ok_or_else(|| format!("No related question /{index}.")),
        UserCommand::Reset => Ok(vec![Msg::ResetClicked]),
        UserCommand::Empty => Ok(Vec::new()),
        UserCommand::Unknown(raw) => Err(format!(
            "Unknown command {raw}. Use /reset, /quit or /N for a related question."
        )),
        UserCommand::Quit => Ok(Vec::new()),
    }
}
