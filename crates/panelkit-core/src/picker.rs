// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::filter::fuzzy_matches;

/// Quick-pick list: a fixed candidate set narrowed by a fuzzy query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picker {
    title: String,
    candidates: Vec<String>,
    query: String,
    matches: Vec<usize>,
    cursor: usize,
}

impl Picker {
    pub fn new(title: impl Into<String>, candidates: Vec<String>) -> Self {
        let matches = (0..candidates.len()).collect();
        Self {
            title: title.into(),
            candidates,
            query: String::new(),
            matches,
            cursor: 0,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn push_char(&mut self, ch: char) {
        self.query.push(ch);
        self.rematch();
    }

    pub fn pop_char(&mut self) {
        if self.query.pop().is_some() {
            self.rematch();
        }
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_owned();
        self.rematch();
    }

    /// Candidates that survive the query, in their original order.
    pub fn visible(&self) -> impl Iterator<Item = &str> {
        self.matches
            .iter()
            .filter_map(|index| self.candidates.get(*index))
            .map(String::as_str)
    }

    pub fn visible_len(&self) -> usize {
        self.matches.len()
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.matches.len() {
            self.cursor += 1;
        }
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn selected(&self) -> Option<&str> {
        let index = *self.matches.get(self.cursor)?;
        self.candidates.get(index).map(String::as_str)
    }

    fn rematch(&mut self) {
        let query = self.query.trim();
        self.matches = self
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, candidate)| fuzzy_matches(candidate, query))
            .map(|(index, _)| index)
            .collect();
        self.cursor = self.cursor.min(self.matches.len().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::Picker;

    fn contexts() -> Picker {
        Picker::new(
            "switch context",
            vec![
                "containers".to_owned(),
                "processes".to_owned(),
                "repos".to_owned(),
            ],
        )
    }

    #[test]
    fn empty_query_shows_everything() {
        let picker = contexts();
        assert_eq!(picker.visible_len(), 3);
        assert_eq!(picker.selected(), Some("containers"));
    }

    #[test]
    fn query_narrows_by_subsequence() {
        let mut picker = contexts();
        picker.set_query("rps");
        assert_eq!(picker.visible().collect::<Vec<_>>(), vec!["repos"]);
        assert_eq!(picker.selected(), Some("repos"));
    }

    #[test]
    fn cursor_is_clamped_when_matches_shrink() {
        let mut picker = contexts();
        picker.move_down();
        picker.move_down();
        picker.move_down();
        assert_eq!(picker.selected(), Some("repos"));

        picker.push_char('p');
        picker.push_char('r');
        picker.push_char('o');
        picker.push_char('c');
        assert_eq!(picker.selected(), Some("processes"));
        picker.move_up();
        assert_eq!(picker.cursor(), 0);
    }

    #[test]
    fn no_match_selects_nothing() {
        let mut picker = contexts();
        picker.set_query("zzz");
        assert_eq!(picker.selected(), None);
        picker.pop_char();
        picker.pop_char();
        picker.pop_char();
        assert_eq!(picker.visible_len(), 3);
    }
}
