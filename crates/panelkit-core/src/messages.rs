// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::VecDeque;
use std::fmt;
use time::OffsetDateTime;
use time::macros::format_description;

pub const DEFAULT_MESSAGE_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageLevel {
    Info,
    Warn,
    Error,
}

impl MessageLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub level: MessageLevel,
    pub text: String,
    pub at: OffsetDateTime,
}

impl Message {
    pub fn clock(&self) -> String {
        self.at
            .format(&format_description!("[hour]:[minute]:[second]"))
            .unwrap_or_else(|_| "--:--:--".to_owned())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:<5} {}", self.clock(), self.level.label(), self.text)
    }
}

/// Bounded log shown in the message panel. Oldest entries fall off first.
#[derive(Debug, Clone)]
pub struct MessageLog {
    entries: VecDeque<Message>,
    capacity: usize,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MESSAGE_CAPACITY)
    }
}

impl MessageLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, level: MessageLevel, text: impl Into<String>) {
        self.push_at(level, text, OffsetDateTime::now_utc());
    }

    pub fn push_at(&mut self, level: MessageLevel, text: impl Into<String>, at: OffsetDateTime) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(Message {
            level,
            text: text.into(),
            at,
        });
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(MessageLevel::Info, text);
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.push(MessageLevel::Warn, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(MessageLevel::Error, text);
    }

    pub fn latest(&self) -> Option<&Message> {
        self.entries.back()
    }

    /// Newest `count` entries, oldest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &Message> {
        self.entries.iter().skip(self.entries.len().saturating_sub(count))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{MessageLevel, MessageLog};
    use time::macros::datetime;

    #[test]
    fn oldest_messages_are_evicted() {
        let mut log = MessageLog::with_capacity(2);
        log.info("one");
        log.warn("two");
        log.error("three");
        let texts = log.recent(10).map(|m| m.text.as_str()).collect::<Vec<_>>();
        assert_eq!(texts, vec!["two", "three"]);
        assert_eq!(log.latest().map(|m| m.level), Some(MessageLevel::Error));
    }

    #[test]
    fn recent_returns_newest_in_order() {
        let mut log = MessageLog::default();
        for text in ["a", "b", "c", "d"] {
            log.info(text);
        }
        let texts = log.recent(2).map(|m| m.text.as_str()).collect::<Vec<_>>();
        assert_eq!(texts, vec!["c", "d"]);
    }

    #[test]
    fn message_renders_clock_and_level() {
        let mut log = MessageLog::default();
        log.push_at(
            MessageLevel::Warn,
            "loading in progress",
            datetime!(2026-03-01 09:05:07 UTC),
        );
        let rendered = log.latest().map(ToString::to_string).unwrap_or_default();
        assert_eq!(rendered, "09:05:07 warn  loading in progress");
    }
}
