//! Incremental parser for `text/event-stream` bodies.
//!
//! Input may arrive in arbitrary fragments; partial lines are buffered until
//! their terminator shows up. Events are dispatched on blank lines following
//! the WHATWG event-stream interpretation rules.

const BOM: char = '\u{feff}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Last event id seen on the stream, if any.
    pub id: Option<String>,
    /// Value of the `event` field; `None` means the default message type.
    pub event: Option<String>,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseItem {
    Event(SseEvent),
    /// Server-requested reconnection delay in milliseconds.
    ReconnectInterval(u64),
}

#[derive(Debug, Default)]
pub struct SseParser {
    line: String,
    pending_cr: bool,
    started: bool,
    data: String,
    event_type: Option<String>,
    last_event_id: Option<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one text fragment, returning every item completed by it.
    pub fn feed(&mut self, fragment: &str) -> Vec<SseItem> {
        let mut items = Vec::new();
        let mut rest = fragment;
        if rest.is_empty() {
            return items;
        }

        if !self.started {
            self.started = true;
            rest = rest.strip_prefix(BOM).unwrap_or(rest);
        }

        // A `\r` ending the previous fragment may be the first half of `\r\n`.
        if self.pending_cr {
            self.pending_cr = false;
            rest = rest.strip_prefix('\n').unwrap_or(rest);
        }

        while let Some(pos) = rest.find(&['\r', '\n'][..]) {
            self.line.push_str(&rest[..pos]);
            let line = std::mem::take(&mut self.line);
            self.process_line(&line, &mut items);

            let terminator = rest.as_bytes()[pos];
            rest = &rest[pos + 1..];
            if terminator == b'\r' {
                if rest.is_empty() {
                    self.pending_cr = true;
                } else {
                    rest = rest.strip_prefix('\n').unwrap_or(rest);
                }
            }
        }
        self.line.push_str(rest);

        items
    }

    /// Bytes held for the unterminated line and the event being assembled.
    pub fn buffered_len(&self) -> usize {
        self.line.len() + self.data.len()
    }

    /// Drops any buffered partial line and event state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn process_line(&mut self, line: &str, items: &mut Vec<SseItem>) {
        if line.is_empty() {
            self.dispatch(items);
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.find(':') {
            Some(idx) => {
                let value = &line[idx + 1..];
                (&line[..idx], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };

        match field {
            "event" => {
                self.event_type = (!value.is_empty()).then(|| value.to_string());
            }
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            "id" => {
                if !value.contains('\0') {
                    self.last_event_id = Some(value.to_string());
                }
            }
            "retry" => {
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(millis) = value.parse() {
                        items.push(SseItem::ReconnectInterval(millis));
                    }
                }
            }
            _ => {}
        }
    }

    fn dispatch(&mut self, items: &mut Vec<SseItem>) {
        let event = self.event_type.take();
        if self.data.is_empty() {
            return;
        }
        let mut data = std::mem::take(&mut self.data);
        if data.ends_with('\n') {
            data.pop();
        }
        items.push(SseItem::Event(SseEvent {
            id: self.last_event_id.clone(),
            event,
            data,
        }));
    }
}
