// Clock source and strftime pattern rendering
use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local};
use thiserror::Error;

/// Source of "now". Every tool call reads it exactly once.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Local wall clock, carrying the UTC offset in effect at the time of the read.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("Invalid format string '{pattern}'. {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl FormatError {
    fn invalid(pattern: &str, reason: impl Into<String>) -> Self {
        FormatError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

/// Renders `instant` with a strftime-style `pattern`.
///
/// The whole pattern is validated before anything is written, so a bad
/// specifier never yields partial output.
pub fn render(instant: &DateTime<FixedOffset>, pattern: &str) -> Result<String, FormatError> {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(FormatError::invalid(pattern, describe_invalid(pattern)));
    }

    let mut rendered = String::with_capacity(pattern.len() * 2);
    write!(rendered, "{}", instant.format_with_items(items.iter())).map_err(|_| {
        FormatError::invalid(pattern, "the pattern could not be rendered for this instant")
    })?;
    Ok(rendered)
}

fn describe_invalid(pattern: &str) -> String {
    match first_invalid_specifier(pattern) {
        Some((_, "%")) => "the pattern ends with an incomplete '%' specifier".to_string(),
        Some((position, token)) => {
            format!("unsupported specifier '{token}' at position {position}")
        }
        None => "the pattern contains a malformed specifier".to_string(),
    }
}

// Specifiers never contain '%' except the "%%" escape, so every other '%'
// starts a specifier that can be checked on its own.
fn first_invalid_specifier(pattern: &str) -> Option<(usize, &str)> {
    let mut chars = pattern.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if ch != '%' {
            continue;
        }
        if let Some(&(_, '%')) = chars.peek() {
            chars.next();
            continue;
        }
        if let Some(Item::Error) = StrftimeItems::new(&pattern[idx..]).next() {
            let end = chars
                .peek()
                .map_or(pattern.len(), |&(next, c)| next + c.len_utf8());
            return Some((idx, &pattern[idx..end]));
        }
    }
    None
}
