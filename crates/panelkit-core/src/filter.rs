// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::row::Row;

/// Read-only projection of the raw rows under the active query.
///
/// `source_indices` is `None` for the identity view (no query); otherwise it
/// is parallel to `rows` and maps each filtered position to its raw position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilteredView {
    rows: Vec<Row>,
    source_indices: Option<Vec<usize>>,
}

impl FilteredView {
    pub fn identity(raw: &[Row]) -> Self {
        Self {
            rows: raw.to_vec(),
            source_indices: None,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_identity(&self) -> bool {
        self.source_indices.is_none()
    }

    pub fn source_indices(&self) -> Option<&[usize]> {
        self.source_indices.as_deref()
    }

    pub fn source_index(&self, index: usize) -> Option<usize> {
        match &self.source_indices {
            Some(indices) => indices.get(index).copied(),
            None if index < self.rows.len() => Some(index),
            None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterStatus {
    Applied { query: String, shown: usize, total: usize },
    Cleared { total: usize },
    Busy,
}

impl FilterStatus {
    pub fn message(&self) -> String {
        match self {
            Self::Applied { query, shown, total } => {
                format!("filter {query:?}: {shown} of {total} rows")
            }
            Self::Cleared { total } => format!("filter cleared: {total} rows"),
            Self::Busy => "loading in progress; filter unchanged".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterEngine {
    query: String,
    needle: String,
}

impl FilterEngine {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    /// Stores the trimmed query. Returns `false` when it did not change.
    pub fn set_query(&mut self, query: &str) -> bool {
        let trimmed = query.trim();
        if trimmed == self.query {
            return false;
        }
        self.query = trimmed.to_owned();
        self.needle = trimmed.to_lowercase();
        true
    }

    pub fn clear(&mut self) -> bool {
        self.set_query("")
    }

    pub fn apply(&self, raw: &[Row]) -> FilteredView {
        if self.needle.is_empty() {
            return FilteredView::identity(raw);
        }

        let mut rows = Vec::new();
        let mut source_indices = Vec::new();
        for (index, row) in raw.iter().enumerate() {
            if row_matches(row, &self.needle) {
                rows.push(row.clone());
                source_indices.push(index);
            }
        }
        FilteredView {
            rows,
            source_indices: Some(source_indices),
        }
    }
}

/// Substring match against every cell. `needle` must already be lowercase.
pub fn row_matches(row: &[String], needle: &str) -> bool {
    needle.is_empty()
        || row
            .iter()
            .any(|cell| cell.to_lowercase().contains(needle))
}

/// Quick-pick matching: contiguous substring or in-order subsequence,
/// case-insensitive. The table filter uses `row_matches` instead.
pub fn fuzzy_matches(candidate: &str, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }

    let candidate_lc = candidate.to_lowercase();
    let query_lc = query.to_lowercase();
    if candidate_lc.contains(&query_lc) {
        return true;
    }

    let mut query_chars = query_lc.chars();
    let mut current = query_chars.next();
    for ch in candidate_lc.chars() {
        let Some(needle) = current else {
            return true;
        };
        if ch == needle {
            current = query_chars.next();
        }
    }
    current.is_none()
}

#[cfg(test)]
mod tests {
    use super::{FilterEngine, FilterStatus, fuzzy_matches, row_matches};
    use crate::row::{Row, row};

    fn fruit() -> Vec<Row> {
        vec![
            row(["1", "apple"]),
            row(["2", "banana"]),
            row(["3", "cherry"]),
        ]
    }

    #[test]
    fn empty_query_is_identity() {
        let engine = FilterEngine::default();
        let view = engine.apply(&fruit());
        assert!(view.is_identity());
        assert_eq!(view.rows(), fruit().as_slice());
        assert_eq!(view.source_index(2), Some(2));
        assert_eq!(view.source_index(3), None);
    }

    #[test]
    fn substring_filter_keeps_matching_rows_with_indices() {
        let mut engine = FilterEngine::default();
        engine.set_query("an");
        let view = engine.apply(&fruit());
        assert_eq!(view.rows(), &[row(["2", "banana"])]);
        assert_eq!(view.source_indices(), Some(&[1][..]));
    }

    #[test]
    fn matching_ignores_case_and_surrounding_whitespace() {
        let mut engine = FilterEngine::default();
        engine.set_query("  CHER ");
        assert_eq!(engine.query(), "CHER");
        let view = engine.apply(&fruit());
        assert_eq!(view.rows(), &[row(["3", "cherry"])]);
    }

    #[test]
    fn any_cell_may_match() {
        let mut engine = FilterEngine::default();
        engine.set_query("2");
        let view = engine.apply(&fruit());
        assert_eq!(view.source_indices(), Some(&[1][..]));
    }

    #[test]
    fn index_map_points_back_at_raw_rows() {
        let raw = vec![
            row(["a1", "x"]),
            row(["b", "y"]),
            row(["a2", "z"]),
            row(["c", "a3"]),
        ];
        let mut engine = FilterEngine::default();
        engine.set_query("a");
        let view = engine.apply(&raw);
        for (k, filtered) in view.rows().iter().enumerate() {
            let source = view.source_index(k).expect("mapped index");
            assert_eq!(&raw[source], filtered);
        }
        assert_eq!(view.len(), 3);
    }

    #[test]
    fn set_query_reports_changes_only() {
        let mut engine = FilterEngine::default();
        assert!(engine.set_query("an"));
        assert!(!engine.set_query(" an "));
        assert!(engine.clear());
        assert!(!engine.is_active());
    }

    #[test]
    fn substring_filter_rejects_subsequences() {
        assert!(!row_matches(&row(["banana"]), "bnn"));
        assert!(row_matches(&row(["banana"]), "nan"));
    }

    #[test]
    fn fuzzy_accepts_substring_and_subsequence() {
        assert!(fuzzy_matches("production", "duct"));
        assert!(fuzzy_matches("production", "PRDN"));
        assert!(fuzzy_matches("anything", ""));
        assert!(!fuzzy_matches("staging", "prod"));
        assert!(!fuzzy_matches("abc", "cba"));
    }

    #[test]
    fn busy_status_message_mentions_loading() {
        assert!(FilterStatus::Busy.message().contains("loading in progress"));
    }
}
