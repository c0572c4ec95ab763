//! Coded worksheet messages.
//!
//! Every message carries a code whose first letter is its severity:
//! - `E-`: an error the user must fix (structural or validation)
//! - `I-`: informational
//! - `A-`: an internal invariant violation (a bug, never caused by user input)
//!
//! The list is derived output of one load; hosts render it in a message pane and may use the
//! character range for underlining.

use std::fmt;

/// A half-open character-offset range (`start..end`) in the worksheet text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRange {
    /// Range start offset (inclusive), in characters from the start of the worksheet.
    pub start: usize,
    /// Range end offset (exclusive), in characters from the start of the worksheet.
    pub end: usize,
}

impl MessageRange {
    /// Create a new message range.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Message severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational (`I-`).
    Info,
    /// User-facing error (`E-`).
    Error,
    /// Internal fault (`A-`).
    Abort,
}

impl Severity {
    /// Severity implied by the leading letter of a message code.
    pub fn from_code(code: &str) -> Self {
        match code.as_bytes().first() {
            Some(b'I') => Severity::Info,
            Some(b'A') => Severity::Abort,
            _ => Severity::Error,
        }
    }
}

/// A single coded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message severity, derived from the code.
    pub severity: Severity,
    /// Stable message code, e.g. `E-PA-0203`.
    pub code: &'static str,
    /// Human-readable text, already carrying theorem/step/position context.
    pub text: String,
    /// Optional character range the message refers to.
    pub range: Option<MessageRange>,
}

impl Message {
    /// Create a message; the severity follows from `code`.
    pub fn new(code: &'static str, text: impl Into<String>) -> Self {
        Self {
            severity: Severity::from_code(code),
            code,
            text: text.into(),
            range: None,
        }
    }

    /// Attach a character range.
    pub fn with_range(mut self, range: MessageRange) -> Self {
        self.range = Some(range);
        self
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.text)
    }
}

/// Ordered list of messages produced while loading or editing a worksheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Messages {
    items: Vec<Message>,
}

impl Messages {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message.
    pub fn push(&mut self, message: Message) {
        match message.severity {
            Severity::Info => tracing::info!(code = message.code, "{}", message.text),
            Severity::Error => tracing::debug!(code = message.code, "{}", message.text),
            Severity::Abort => tracing::error!(code = message.code, "{}", message.text),
        }
        self.items.push(message);
    }

    /// Iterate messages in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.items.iter()
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if there are no messages.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of `E-` and `A-` messages.
    pub fn error_count(&self) -> usize {
        self.items
            .iter()
            .filter(|m| m.severity >= Severity::Error)
            .count()
    }

    /// Returns `true` if any `A-` message was recorded.
    pub fn has_abort(&self) -> bool {
        self.items.iter().any(|m| m.severity == Severity::Abort)
    }

    /// Find the first message with `code`.
    pub fn find(&self, code: &str) -> Option<&Message> {
        self.items.iter().find(|m| m.code == code)
    }
}

/// One message per line, the way the message pane shows them.
impl fmt::Display for Messages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for message in &self.items {
            writeln!(f, "{message}")?;
        }
        Ok(())
    }
}
