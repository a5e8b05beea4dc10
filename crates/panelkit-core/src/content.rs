// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::ops::Range;

use crate::filter::FilteredView;

/// Lazy cell provider. Renderers ask for cells of the rows they draw and
/// nothing else.
pub trait TableContent {
    fn column_count(&self) -> usize;
    fn row_count(&self) -> usize;
    fn header(&self, col: usize) -> Option<&str>;
    /// `None` outside the table; an in-range row shorter than the header
    /// yields `Some("")`.
    fn cell(&self, row: usize, col: usize) -> Option<&str>;
}

/// Content backed by the current filtered view.
#[derive(Debug, Clone, Copy)]
pub struct ViewContent<'a> {
    header: &'a [String],
    view: &'a FilteredView,
}

impl<'a> ViewContent<'a> {
    pub fn new(header: &'a [String], view: &'a FilteredView) -> Self {
        Self { header, view }
    }
}

impl TableContent for ViewContent<'_> {
    fn column_count(&self) -> usize {
        self.header.len()
    }

    fn row_count(&self) -> usize {
        self.view.len()
    }

    fn header(&self, col: usize) -> Option<&str> {
        self.header.get(col).map(String::as_str)
    }

    fn cell(&self, row: usize, col: usize) -> Option<&str> {
        if col >= self.column_count() {
            return None;
        }
        let cells = self.view.row(row)?;
        Some(cells.get(col).map(String::as_str).unwrap_or(""))
    }
}

/// Receiver of structural table changes. The renderer pulls cells through
/// `TableContent`; this only carries the shape and the selection.
pub trait TableSurface {
    fn set_headers(&mut self, headers: &[String]);
    fn set_row_count(&mut self, rows: usize);
    fn set_selected(&mut self, selected: Option<usize>);
}

/// Scroll window over the table that keeps the selection visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    offset: usize,
    height: usize,
}

impl Viewport {
    pub fn new(height: usize) -> Self {
        Self { offset: 0, height }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resize(&mut self, height: usize) {
        self.height = height;
    }

    /// Scrolls the minimum distance needed to show `selected`, then clamps
    /// so the window never hangs past the last row.
    pub fn follow(&mut self, selected: Option<usize>, row_count: usize) {
        if let Some(selected) = selected
            && self.height > 0
        {
            if selected < self.offset {
                self.offset = selected;
            } else if selected >= self.offset + self.height {
                self.offset = selected + 1 - self.height;
            }
        }
        let max_offset = row_count.saturating_sub(self.height);
        self.offset = self.offset.min(max_offset);
    }

    pub fn window(&self, row_count: usize) -> Range<usize> {
        let start = self.offset.min(row_count);
        let end = (start + self.height).min(row_count);
        start..end
    }
}

#[cfg(test)]
mod tests {
    use super::{TableContent, ViewContent, Viewport};
    use crate::filter::FilterEngine;
    use crate::row::row;

    #[test]
    fn view_content_pads_short_rows() {
        let header = row(["name", "state", "ports"]);
        let raw = vec![row(["web", "running"]), row(["db", "exited", "5432"])];
        let view = FilterEngine::default().apply(&raw);
        let content = ViewContent::new(&header, &view);

        assert_eq!(content.column_count(), 3);
        assert_eq!(content.row_count(), 2);
        assert_eq!(content.header(2), Some("ports"));
        assert_eq!(content.cell(0, 2), Some(""));
        assert_eq!(content.cell(1, 2), Some("5432"));
        assert_eq!(content.cell(2, 0), None);
        assert_eq!(content.cell(0, 3), None);
    }

    #[test]
    fn view_content_reads_filtered_rows() {
        let header = row(["name"]);
        let raw = vec![row(["apple"]), row(["banana"]), row(["cherry"])];
        let mut filter = FilterEngine::default();
        filter.set_query("ch");
        let view = filter.apply(&raw);
        let content = ViewContent::new(&header, &view);
        assert_eq!(content.row_count(), 1);
        assert_eq!(content.cell(0, 0), Some("cherry"));
    }

    #[test]
    fn viewport_scrolls_down_and_back_up() {
        let mut viewport = Viewport::new(3);
        viewport.follow(Some(4), 10);
        assert_eq!(viewport.window(10), 2..5);

        viewport.follow(Some(1), 10);
        assert_eq!(viewport.window(10), 1..4);
    }

    #[test]
    fn viewport_clamps_when_rows_shrink() {
        let mut viewport = Viewport::new(4);
        viewport.follow(Some(9), 10);
        assert_eq!(viewport.offset(), 6);

        viewport.follow(Some(1), 2);
        assert_eq!(viewport.window(2), 0..2);
    }

    #[test]
    fn zero_height_window_is_empty() {
        let mut viewport = Viewport::default();
        viewport.follow(Some(3), 5);
        assert!(viewport.window(5).is_empty());
    }
}
