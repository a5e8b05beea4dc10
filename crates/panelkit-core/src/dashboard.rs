// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::fmt;
use std::sync::{Arc, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::action::{Action, ActionDelegate, Payload, payload};
use crate::content::{TableSurface, ViewContent};
use crate::filter::FilterStatus;
use crate::keys::{
    BuiltIn, DispatchContext, Key, KeyBinding, KeyDispatcher, KeyHandler, KeyOutcome, Resolution,
};
use crate::messages::MessageLog;
use crate::navigation::NavigationStack;
use crate::refresh::{RefreshEngine, RefreshNotice, RefreshOutcome, Trigger};
use crate::row::{Header, Row};
use crate::signature::{SelectionKey, signature};
use crate::state::ViewState;

/// Receives the raw-row index of the new selection.
pub type RowSelectedCallback = Box<dyn FnMut(Option<usize>)>;

/// Receives keys the dispatcher forwarded. Returns whether it consumed the
/// key. It gets the dashboard back so it can move the selection or push
/// views.
pub type OuterHandler = Box<dyn FnMut(&mut DashboardCore, Key) -> bool>;

/// UI-thread state touched by built-in key defaults.
#[derive(Debug, Default)]
struct Overlays {
    help_expanded: bool,
    filter_draft: Option<String>,
    messages: MessageLog,
}

/// Snapshot for the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub breadcrumb: String,
    pub shown: usize,
    pub total: usize,
    pub filter: Option<String>,
    pub loading: bool,
    pub more_available: bool,
}

impl StatusLine {
    pub fn render(&self) -> String {
        let mut parts = vec![self.breadcrumb.clone()];
        if self.shown == self.total {
            parts.push(format!("{} rows", self.total));
        } else {
            parts.push(format!("{}/{} rows", self.shown, self.total));
        }
        if let Some(filter) = &self.filter {
            parts.push(format!("filter: {filter}"));
        }
        if self.more_available {
            parts.push("more: pgdn".to_owned());
        }
        if self.loading {
            parts.push("loading...".to_owned());
        }
        parts.join("  |  ")
    }
}

/// The view-state engine as a plugin sees it: data, filtering, selection,
/// navigation, key dispatch and refresh scheduling behind one object.
pub struct DashboardCore {
    engine: RefreshEngine,
    navigation: NavigationStack,
    keys: KeyDispatcher,
    delegate: Option<ActionDelegate>,
    row_selected: Option<RowSelectedCallback>,
    outer: Option<OuterHandler>,
    overlays: Overlays,
    last_selected: Option<usize>,
}

impl fmt::Debug for DashboardCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashboardCore")
            .field("engine", &self.engine)
            .field("navigation", &self.navigation)
            .field("keys", &self.keys)
            .field("delegate", &self.delegate.is_some())
            .field("overlays", &self.overlays)
            .finish_non_exhaustive()
    }
}

impl DashboardCore {
    pub fn new(root_view: impl Into<String>) -> Self {
        let mut core = Self {
            engine: RefreshEngine::new(),
            navigation: NavigationStack::new(root_view),
            keys: KeyDispatcher::default(),
            delegate: None,
            row_selected: None,
            outer: None,
            overlays: Overlays::default(),
            last_selected: None,
        };
        core.bind_builtins();
        core
    }

    fn bind_builtins(&mut self) {
        for builtin in BuiltIn::ALL {
            self.keys.bind(builtin.key(), builtin.description(), None);
        }
    }

    pub fn engine(&self) -> &RefreshEngine {
        &self.engine
    }

    /// Locks the shared view state. Keep the guard short; fetch workers
    /// commit through the same lock.
    pub fn state(&self) -> MutexGuard<'_, ViewState> {
        self.engine.state()
    }

    // data

    pub fn set_headers(&mut self, headers: Header) {
        self.engine.state().set_header(headers);
        self.sync_selection();
    }

    pub fn set_data(&mut self, rows: Vec<Row>) {
        self.engine.state().replace_rows(rows);
        self.sync_selection();
    }

    pub fn append_data(&mut self, rows: Vec<Row>) {
        self.engine.state().append_rows(rows);
        self.sync_selection();
    }

    pub fn set_refresh_source<F>(&mut self, source: F)
    where
        F: Fn() -> Result<Vec<Row>> + Send + Sync + 'static,
    {
        self.engine.state().set_source(Arc::new(source));
    }

    /// Enables lazy loading. Page-down then requests the next page instead
    /// of being forwarded.
    pub fn set_lazy_loader<F>(&mut self, page_size: usize, loader: F)
    where
        F: Fn(usize, usize) -> Result<Vec<Row>> + Send + Sync + 'static,
    {
        self.engine.state().set_loader(page_size, Arc::new(loader));
    }

    pub fn set_fetch_timeout(&mut self, timeout: Option<Duration>) {
        self.engine.state().set_fetch_timeout(timeout);
    }

    pub fn set_selection_key(&mut self, key: SelectionKey) {
        self.engine.state().set_selection_key(key);
    }

    // filter

    pub fn set_filter_query(&mut self, query: &str) -> FilterStatus {
        let status = self.engine.state().set_query(query);
        match &status {
            FilterStatus::Busy => self.overlays.messages.warn(status.message()),
            _ => debug!(status = %status.message(), "filter updated"),
        }
        self.sync_selection();
        status
    }

    pub fn clear_filter(&mut self) -> FilterStatus {
        self.set_filter_query("")
    }

    pub fn is_filtered(&self) -> bool {
        self.engine.state().is_filtered()
    }

    pub fn filter_query(&self) -> String {
        self.engine.state().filter_query().to_owned()
    }

    // keys

    pub fn add_key_binding(
        &mut self,
        key: impl Into<String>,
        description: impl Into<String>,
        handler: Option<KeyHandler>,
    ) {
        self.keys.bind(key, description, handler);
    }

    /// Drops every plugin binding. The built-in keys stay registered.
    pub fn clear_key_bindings(&mut self) {
        self.keys.clear();
        self.bind_builtins();
    }

    pub fn key_bindings(&self) -> &[KeyBinding] {
        self.keys.bindings()
    }

    pub fn set_action_delegate(&mut self, delegate: ActionDelegate) {
        self.delegate = Some(delegate);
    }

    pub fn set_row_selected_callback(&mut self, callback: RowSelectedCallback) {
        self.row_selected = Some(callback);
    }

    pub fn set_outer_handler(&mut self, handler: OuterHandler) {
        self.outer = Some(handler);
    }

    /// Routes a key: the open filter prompt first, then the help overlay,
    /// then the dispatcher, then the outer handler.
    pub fn handle_key(&mut self, key: Key) -> KeyOutcome {
        if self.overlays.filter_draft.is_some() {
            self.handle_prompt_key(key);
            return KeyOutcome::Consumed(Resolution::Prompt);
        }
        if self.overlays.help_expanded && key == Key::Esc {
            self.overlays.help_expanded = false;
            return KeyOutcome::Consumed(Resolution::Dismissed);
        }

        let mut ctx = CoreContext {
            engine: &self.engine,
            navigation: &mut self.navigation,
            delegate: &mut self.delegate,
            overlays: &mut self.overlays,
        };
        let outcome = self.keys.dispatch(key, &mut ctx);
        if let KeyOutcome::Consumed(Resolution::NavigatedBack { from, to }) = &outcome {
            debug!(from = %from, to = %to, "navigated back");
        }

        match outcome {
            KeyOutcome::Forwarded(key) => self.forward(key),
            consumed => consumed,
        }
    }

    fn forward(&mut self, key: Key) -> KeyOutcome {
        let Some(mut handler) = self.outer.take() else {
            return KeyOutcome::Forwarded(key);
        };
        let consumed = handler(self, key);
        if self.outer.is_none() {
            self.outer = Some(handler);
        }
        if consumed {
            KeyOutcome::Consumed(Resolution::Outer)
        } else {
            KeyOutcome::Forwarded(key)
        }
    }

    fn handle_prompt_key(&mut self, key: Key) {
        let Some(draft) = self.overlays.filter_draft.as_mut() else {
            return;
        };
        match key {
            Key::Esc => {
                self.overlays.filter_draft = None;
            }
            Key::Enter => {
                let query = std::mem::take(draft);
                self.overlays.filter_draft = None;
                let status = self.set_filter_query(&query);
                if status != FilterStatus::Busy {
                    self.overlays.messages.info(status.message());
                }
            }
            Key::Backspace => {
                draft.pop();
            }
            Key::Char(ch) => draft.push(ch),
            _ => {}
        }
    }

    pub fn open_filter_prompt(&mut self) {
        open_filter_prompt(&self.engine, &mut self.overlays);
    }

    pub fn filter_prompt(&self) -> Option<&str> {
        self.overlays.filter_draft.as_deref()
    }

    pub fn help_expanded(&self) -> bool {
        self.overlays.help_expanded
    }

    pub fn toggle_help(&mut self) {
        self.overlays.help_expanded = !self.overlays.help_expanded;
    }

    pub fn messages(&self) -> &MessageLog {
        &self.overlays.messages
    }

    pub fn messages_mut(&mut self) -> &mut MessageLog {
        &mut self.overlays.messages
    }

    // navigation

    pub fn push_view(&mut self, name: impl Into<String>) {
        self.navigation.push(name);
    }

    pub fn pop_view(&mut self) -> Option<String> {
        self.navigation.pop()
    }

    pub fn clear_views(&mut self) {
        self.navigation.clear();
    }

    pub fn set_view_stack(&mut self, entries: Vec<String>) {
        self.navigation.set_stack(entries);
    }

    pub fn current_view(&self) -> &str {
        self.navigation.current()
    }

    pub fn navigation(&self) -> &NavigationStack {
        &self.navigation
    }

    pub fn breadcrumb(&self) -> String {
        self.navigation.breadcrumb()
    }

    // refresh

    pub fn start_auto_refresh(&mut self, interval: Duration) {
        self.engine.start_auto_refresh(interval);
    }

    pub fn stop_auto_refresh(&mut self) {
        self.engine.stop_auto_refresh();
    }

    /// Starts a refresh on a worker thread. The outcome also arrives through
    /// `poll_notices`.
    pub fn refresh(&self) -> JoinHandle<RefreshOutcome> {
        self.engine.refresh()
    }

    pub fn load_more(&self) -> JoinHandle<RefreshOutcome> {
        self.engine.load_more()
    }

    /// Drains finished refresh notices into the message panel and fires
    /// the row-selected callback if a commit moved the selection.
    pub fn poll_notices(&mut self) -> Vec<RefreshNotice> {
        let notices = self.engine.drain_notices();
        for notice in &notices {
            self.record_notice(notice);
        }
        if !notices.is_empty() {
            self.sync_selection();
        }
        notices
    }

    fn record_notice(&mut self, notice: &RefreshNotice) {
        let text = format!("{}: {}", notice.trigger.label(), notice.outcome.message());
        match &notice.outcome {
            outcome if outcome.is_error() => self.overlays.messages.error(text),
            RefreshOutcome::Busy if notice.trigger == Trigger::AutoRefresh => {
                debug!("auto refresh tick dropped while loading");
            }
            RefreshOutcome::Busy | RefreshOutcome::NoLoader | RefreshOutcome::NoSource => {
                self.overlays.messages.warn(text);
            }
            RefreshOutcome::Refreshed { .. } if notice.trigger == Trigger::AutoRefresh => {}
            RefreshOutcome::Discarded => debug!(trigger = notice.trigger.label(), "{text}"),
            _ => self.overlays.messages.info(text),
        }
    }

    // selection

    /// Raw-row index of the selection, resolved through the active filter.
    pub fn selected_row_index(&self) -> Option<usize> {
        self.engine.state().selected_raw_index()
    }

    /// Cursor position within the filtered view.
    pub fn selected_view_index(&self) -> Option<usize> {
        self.engine.state().selected()
    }

    pub fn selected_row_data(&self) -> Option<Row> {
        self.engine.state().selected_row().cloned()
    }

    /// Moves the selection to a filtered-view index (clamped) and notifies
    /// the row callback and the delegate when the selected raw row changed.
    /// Returns the new view index. `None` deselects, and the selection stays
    /// empty across later data changes until a row is selected again.
    pub fn select_row(&mut self, index: Option<usize>) -> Option<usize> {
        self.engine.state().select(index);
        self.sync_selection();
        self.selected_view_index()
    }

    pub fn move_selection(&mut self, delta: isize) -> Option<usize> {
        let (current, len) = {
            let state = self.engine.state();
            (state.selected(), state.view().len())
        };
        if len == 0 {
            return None;
        }
        let target = match current {
            Some(current) => current.saturating_add_signed(delta),
            None => 0,
        };
        self.select_row(Some(target.min(len - 1)))
    }

    pub fn select_first(&mut self) -> Option<usize> {
        self.select_row(Some(0))
    }

    pub fn select_last(&mut self) -> Option<usize> {
        let len = self.engine.state().view().len();
        let last = len.checked_sub(1)?;
        self.select_row(Some(last))
    }

    fn sync_selection(&mut self) {
        let (selected, body) = {
            let state = self.engine.state();
            let selected = state.selected_raw_index();
            let body = state.selected_row().map(|row| {
                let sig = signature(state.header(), state.selection_key(), row);
                payload([
                    ("index", selected.map(|i| i.to_string()).unwrap_or_default()),
                    ("signature", sig.as_str().to_owned()),
                ])
            });
            (selected, body)
        };
        if selected == self.last_selected {
            return;
        }
        self.last_selected = selected;

        if let Some(callback) = self.row_selected.as_mut() {
            callback(selected);
        }
        if let (Some(delegate), Some(body)) = (self.delegate.as_mut(), body)
            && let Err(error) = delegate(Action::RowSelected, &body)
        {
            warn!(error = %error, "row selection notification failed");
        }
    }

    // rendering

    /// Lends the renderer a lazy view of the current rows.
    pub fn with_content<R>(&self, render: impl FnOnce(&ViewContent<'_>) -> R) -> R {
        let state = self.engine.state();
        let content = ViewContent::new(state.header(), state.view());
        render(&content)
    }

    pub fn sync_surface(&self, surface: &mut dyn TableSurface) {
        let state = self.engine.state();
        surface.set_headers(state.header());
        surface.set_row_count(state.view().len());
        surface.set_selected(state.selected());
    }

    pub fn status(&self) -> StatusLine {
        let state = self.engine.state();
        let refresh = state.refresh_state();
        StatusLine {
            breadcrumb: self.navigation.breadcrumb(),
            shown: state.view().len(),
            total: state.raw().len(),
            filter: state
                .is_filtered()
                .then(|| state.filter_query().to_owned()),
            loading: refresh.is_loading,
            more_available: state.has_loader() && refresh.has_more,
        }
    }
}

fn open_filter_prompt(engine: &RefreshEngine, overlays: &mut Overlays) {
    let current = engine.state().filter_query().to_owned();
    overlays.filter_draft = Some(current);
}

/// Split borrow of the dashboard handed to the dispatcher while the key
/// table itself is borrowed mutably.
struct CoreContext<'a> {
    engine: &'a RefreshEngine,
    navigation: &'a mut NavigationStack,
    delegate: &'a mut Option<ActionDelegate>,
    overlays: &'a mut Overlays,
}

impl DispatchContext for CoreContext<'_> {
    fn navigation(&mut self) -> &mut NavigationStack {
        self.navigation
    }

    fn delegate(&mut self, action: Action, payload: &Payload) -> Option<Result<()>> {
        let delegate = self.delegate.as_mut()?;
        Some(delegate(action, payload))
    }

    fn lazy_loading(&self) -> bool {
        self.engine.state().has_loader()
    }

    fn load_more(&mut self) {
        drop(self.engine.load_more());
    }

    fn run_builtin(&mut self, builtin: BuiltIn) {
        match builtin {
            BuiltIn::Refresh => {
                info!("manual refresh requested");
                drop(self.engine.refresh());
            }
            BuiltIn::OpenFilter => open_filter_prompt(self.engine, self.overlays),
            BuiltIn::ToggleHelp => {
                self.overlays.help_expanded = !self.overlays.help_expanded;
            }
        }
    }
}
