// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::filter::{FilterEngine, FilterStatus, FilteredView};
use crate::row::{Header, Row};
use crate::selection::SelectionTracker;
use crate::signature::SelectionKey;

pub const DEFAULT_PAGE_SIZE: usize = 50;

pub type RefreshSource = Arc<dyn Fn() -> Result<Vec<Row>> + Send + Sync>;
pub type PageLoader = Arc<dyn Fn(usize, usize) -> Result<Vec<Row>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshState {
    pub is_loading: bool,
    pub offset: usize,
    pub page_size: usize,
    pub has_more: bool,
}

impl Default for RefreshState {
    fn default() -> Self {
        Self {
            is_loading: false,
            offset: 0,
            page_size: DEFAULT_PAGE_SIZE,
            has_more: true,
        }
    }
}

/// Why a fetch could not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchRejection {
    Busy,
    Exhausted,
    NoLoader,
    NoSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Replace,
    ReplacePage,
    AppendPage,
}

/// A fetch that was admitted under the lock and must run outside it.
#[derive(Clone)]
pub struct FetchPlan {
    job: FetchJob,
    generation: u64,
    pub mode: FetchMode,
    pub timeout: Option<Duration>,
}

#[derive(Clone)]
enum FetchJob {
    Full(RefreshSource),
    Page {
        loader: PageLoader,
        offset: usize,
        limit: usize,
    },
}

impl FetchPlan {
    pub fn run(&self) -> Result<Vec<Row>> {
        match &self.job {
            FetchJob::Full(source) => source(),
            FetchJob::Page {
                loader,
                offset,
                limit,
            } => loader(*offset, *limit),
        }
    }
}

impl fmt::Debug for FetchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("FetchPlan");
        out.field("mode", &self.mode)
            .field("timeout", &self.timeout)
            .field("generation", &self.generation);
        if let FetchJob::Page { offset, limit, .. } = &self.job {
            out.field("offset", offset).field("limit", limit);
        }
        out.finish()
    }
}

/// Result of committing a fetch back into the view state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitSummary {
    Replaced { rows: usize },
    Appended { rows: usize, has_more: bool },
    /// The header, rows or data source were replaced while the fetch ran;
    /// its rows were dropped.
    Discarded,
}

/// Everything guarded by the single data lock: raw rows, paging state,
/// filter query, derived view and selection.
#[derive(Default)]
pub struct ViewState {
    header: Header,
    raw: Vec<Row>,
    refresh: RefreshState,
    filter: FilterEngine,
    view: FilteredView,
    selection: SelectionTracker,
    source: Option<RefreshSource>,
    loader: Option<PageLoader>,
    fetch_timeout: Option<Duration>,
    generation: u64,
}

impl fmt::Debug for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewState")
            .field("header", &self.header)
            .field("raw_rows", &self.raw.len())
            .field("refresh", &self.refresh)
            .field("filter", &self.filter.query())
            .field("view_rows", &self.view.len())
            .field("selection", &self.selection.selected())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl ViewState {
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn raw(&self) -> &[Row] {
        &self.raw
    }

    pub fn view(&self) -> &FilteredView {
        &self.view
    }

    pub fn refresh_state(&self) -> RefreshState {
        self.refresh
    }

    pub fn filter_query(&self) -> &str {
        self.filter.query()
    }

    pub fn is_filtered(&self) -> bool {
        self.filter.is_active()
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn has_loader(&self) -> bool {
        self.loader.is_some()
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout
    }

    pub fn selection_key(&self) -> &SelectionKey {
        self.selection.key()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selection.selected()
    }

    pub fn selected_raw_index(&self) -> Option<usize> {
        self.selection.selected_raw_index(&self.view)
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.raw.get(self.selected_raw_index()?)
    }

    pub fn set_header(&mut self, header: Header) {
        self.invalidate_in_flight("header replaced");
        self.header = header;
        self.recompute();
    }

    pub fn set_selection_key(&mut self, key: SelectionKey) {
        self.selection.set_key(key);
    }

    pub fn set_source(&mut self, source: RefreshSource) {
        self.invalidate_in_flight("refresh source replaced");
        self.source = Some(source);
    }

    pub fn set_loader(&mut self, page_size: usize, loader: PageLoader) {
        self.invalidate_in_flight("page loader replaced");
        self.loader = Some(loader);
        self.refresh.page_size = page_size.max(1);
        self.refresh.offset = 0;
        self.refresh.has_more = true;
    }

    pub fn set_fetch_timeout(&mut self, timeout: Option<Duration>) {
        self.fetch_timeout = timeout;
    }

    pub fn replace_rows(&mut self, rows: Vec<Row>) {
        self.invalidate_in_flight("rows replaced");
        self.store_rows(rows);
    }

    fn store_rows(&mut self, rows: Vec<Row>) {
        self.refresh.offset = rows.len();
        self.raw = rows;
        self.recompute();
    }

    /// Orphans any fetch admitted before this call. Its commit or abandon
    /// becomes a no-op and the loading flag is released so the new data can
    /// be fetched right away.
    fn invalidate_in_flight(&mut self, reason: &str) {
        self.generation = self.generation.wrapping_add(1);
        if self.refresh.is_loading {
            debug!(reason, generation = self.generation, "in-flight fetch orphaned");
            self.refresh.is_loading = false;
        }
    }

    fn is_current(&self, plan: &FetchPlan) -> bool {
        plan.generation == self.generation
    }

    pub fn append_rows(&mut self, rows: Vec<Row>) {
        self.refresh.offset += rows.len();
        self.raw.extend(rows);
        self.recompute();
    }

    pub fn set_query(&mut self, query: &str) -> FilterStatus {
        if self.refresh.is_loading {
            debug!(query, "filter change rejected: loading in progress");
            return FilterStatus::Busy;
        }
        self.filter.set_query(query);
        self.recompute();
        if self.filter.is_active() {
            FilterStatus::Applied {
                query: self.filter.query().to_owned(),
                shown: self.view.len(),
                total: self.raw.len(),
            }
        } else {
            FilterStatus::Cleared {
                total: self.raw.len(),
            }
        }
    }

    pub fn select(&mut self, index: Option<usize>) -> Option<usize> {
        self.selection.select(index, &self.view)
    }

    /// Regenerates the filtered view and carries the selection across it.
    pub fn recompute(&mut self) {
        let anchor = self.selection.anchor(&self.header, &self.view);
        self.view = self.filter.apply(&self.raw);
        self.selection.restore(anchor, &self.header, &self.view);
    }

    /// Admits a full refresh. With a paginated loader the refresh reloads
    /// the first page instead of calling the full-refresh source.
    pub fn begin_refresh(&mut self) -> Result<FetchPlan, FetchRejection> {
        if self.refresh.is_loading {
            return Err(FetchRejection::Busy);
        }
        let (job, mode) = if let Some(loader) = &self.loader {
            (
                FetchJob::Page {
                    loader: Arc::clone(loader),
                    offset: 0,
                    limit: self.refresh.page_size,
                },
                FetchMode::ReplacePage,
            )
        } else if let Some(source) = &self.source {
            (FetchJob::Full(Arc::clone(source)), FetchMode::Replace)
        } else {
            return Err(FetchRejection::NoSource);
        };
        self.refresh.is_loading = true;
        Ok(FetchPlan {
            job,
            generation: self.generation,
            mode,
            timeout: self.fetch_timeout,
        })
    }

    pub fn begin_load_more(&mut self) -> Result<FetchPlan, FetchRejection> {
        let Some(loader) = &self.loader else {
            return Err(FetchRejection::NoLoader);
        };
        if self.refresh.is_loading {
            return Err(FetchRejection::Busy);
        }
        if !self.refresh.has_more {
            return Err(FetchRejection::Exhausted);
        }
        let job = FetchJob::Page {
            loader: Arc::clone(loader),
            offset: self.refresh.offset,
            limit: self.refresh.page_size,
        };
        self.refresh.is_loading = true;
        Ok(FetchPlan {
            job,
            generation: self.generation,
            mode: FetchMode::AppendPage,
            timeout: self.fetch_timeout,
        })
    }

    pub fn commit(&mut self, plan: &FetchPlan, rows: Vec<Row>) -> CommitSummary {
        if !self.is_current(plan) {
            debug!(rows = rows.len(), ?plan, "dropping rows from orphaned fetch");
            return CommitSummary::Discarded;
        }
        let count = rows.len();
        let page_size = self.refresh.page_size;
        let summary = match plan.mode {
            FetchMode::Replace => {
                self.store_rows(rows);
                CommitSummary::Replaced { rows: count }
            }
            FetchMode::ReplacePage => {
                self.store_rows(rows);
                self.refresh.has_more = count >= page_size;
                CommitSummary::Replaced { rows: count }
            }
            FetchMode::AppendPage => {
                self.append_rows(rows);
                if count < page_size {
                    self.refresh.has_more = false;
                }
                CommitSummary::Appended {
                    rows: count,
                    has_more: self.refresh.has_more,
                }
            }
        };
        self.refresh.is_loading = false;
        summary
    }

    /// Ends a fetch that produced no rows to commit. The raw rows are
    /// untouched, and an orphaned plan leaves the loading flag alone since it
    /// may belong to a newer fetch.
    pub fn abandon(&mut self, plan: &FetchPlan) {
        if self.is_current(plan) {
            self.refresh.is_loading = false;
        }
    }
}
