//! Chat-style broadcasts and the legacy color code formatting they use.

use std::sync::{Arc, Mutex};

use crate::types::EntityId;

pub const COLOR_CHAR: char = '§';
pub const ALT_COLOR_CHAR: char = '&';

pub const DARK_RED: &str = "§4";
pub const RED: &str = "§c";
pub const GREEN: &str = "§a";
pub const AQUA: &str = "§b";
pub const BLUE: &str = "§9";
pub const RESET: &str = "§r";

const COLOR_CODES: &str = "0123456789AaBbCcDdEeFfKkLlMmNnOoRrXx";

/// Translates `&`-prefixed color codes into the section-sign form. An `&`
/// not followed by a known code is left alone.
pub fn colorize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match chars.peek() {
            Some(next) if ch == ALT_COLOR_CHAR && COLOR_CODES.contains(*next) => {
                out.push(COLOR_CHAR);
                out.push(next.to_ascii_lowercase());
                chars.next();
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Replaces `{0}`, `{1}`, ... with the matching argument. Placeholders
/// without an argument are kept verbatim.
pub fn format_template(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substituted = after.find('}').and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            let arg = args.get(index)?;
            Some((arg, close))
        });
        match substituted {
            Some((arg, close)) => {
                out.push_str(arg);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Delivers a message to every viewer that can currently see `about`.
pub trait MessageSink: Send + Sync {
    fn broadcast(&self, about: &str, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub about: EntityId,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingMessageSink {
    sent: Arc<Mutex<Vec<SentMessage>>>,
}

impl RecordingMessageSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().expect("lock messages").clone()
    }

    pub fn take(&self) -> Vec<SentMessage> {
        std::mem::take(&mut *self.sent.lock().expect("lock messages"))
    }
}

impl MessageSink for RecordingMessageSink {
    fn broadcast(&self, about: &str, message: &str) {
        self.sent.lock().expect("lock messages").push(SentMessage {
            about: about.to_string(),
            message: message.to_string(),
        });
    }
}
