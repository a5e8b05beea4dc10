// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::filter::FilteredView;
use crate::signature::{SelectionKey, Signature, find_signature, signature};

/// Selection captured before the view is regenerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionAnchor {
    pub signature: Signature,
    pub index: usize,
}

/// Tracks the selected row by filtered-view index and re-resolves it by
/// signature after every view regeneration. Re-resolution is a linear scan.
///
/// An explicit `select(None)` sticks: later regenerations keep the view
/// deselected until a row is selected again.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionTracker {
    key: SelectionKey,
    selected: Option<usize>,
    deselected: bool,
}

impl SelectionTracker {
    pub fn new(key: SelectionKey) -> Self {
        Self {
            key,
            selected: None,
            deselected: false,
        }
    }

    pub fn key(&self) -> &SelectionKey {
        &self.key
    }

    pub fn set_key(&mut self, key: SelectionKey) {
        self.key = key;
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Selects a filtered-view index, clamped into the view. An empty view
    /// always ends up with no selection.
    pub fn select(&mut self, index: Option<usize>, view: &FilteredView) -> Option<usize> {
        self.deselected = index.is_none();
        self.selected = match index {
            Some(_) if view.is_empty() => None,
            Some(index) => Some(index.min(view.len() - 1)),
            None => None,
        };
        self.selected
    }

    pub fn anchor(&self, header: &[String], view: &FilteredView) -> Option<SelectionAnchor> {
        let index = self.selected?;
        let row = view.row(index)?;
        Some(SelectionAnchor {
            signature: signature(header, &self.key, row),
            index,
        })
    }

    /// Restores selection into a freshly computed view: the first row with
    /// the anchored signature wins, otherwise the old index is clamped.
    /// Without an anchor the first row is selected, like a table cursor,
    /// unless the caller deselected explicitly.
    pub fn restore(
        &mut self,
        anchor: Option<SelectionAnchor>,
        header: &[String],
        view: &FilteredView,
    ) -> Option<usize> {
        if view.is_empty() {
            self.selected = None;
            return None;
        }

        self.selected = match anchor {
            Some(anchor) => find_signature(header, &self.key, view.rows(), &anchor.signature)
                .or(Some(anchor.index.min(view.len() - 1))),
            None if self.deselected => None,
            None => Some(0),
        };
        self.selected
    }

    pub fn selected_raw_index(&self, view: &FilteredView) -> Option<usize> {
        view.source_index(self.selected?)
    }
}
