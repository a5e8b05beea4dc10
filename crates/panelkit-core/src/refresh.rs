// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::row::Row;
use crate::state::{CommitSummary, FetchPlan, FetchRejection, ViewState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Manual,
    AutoRefresh,
    LoadMore,
}

impl Trigger {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Manual => "refresh",
            Self::AutoRefresh => "auto refresh",
            Self::LoadMore => "load more",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed { rows: usize },
    Appended { rows: usize, has_more: bool },
    Busy,
    Exhausted,
    NoLoader,
    NoSource,
    Discarded,
    Failed(String),
    TimedOut(Duration),
}

impl RefreshOutcome {
    pub fn message(&self) -> String {
        match self {
            Self::Refreshed { rows } => format!("loaded {rows} rows"),
            Self::Appended { rows, has_more } if *has_more => format!("loaded {rows} more rows"),
            Self::Appended { rows, .. } => format!("loaded {rows} more rows; end of data"),
            Self::Busy => "loading in progress".to_owned(),
            Self::Exhausted => "no more rows".to_owned(),
            Self::NoLoader => "load more unavailable: no paginated loader".to_owned(),
            Self::NoSource => "refresh unavailable: no data source".to_owned(),
            Self::Discarded => "stale load dropped: data source changed".to_owned(),
            Self::Failed(error) => format!("load failed: {error}"),
            Self::TimedOut(after) => format!("load timed out after {after:?}"),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::TimedOut(_))
    }

    /// Whether the raw rows were changed by this operation.
    pub fn mutated(&self) -> bool {
        matches!(self, Self::Refreshed { .. } | Self::Appended { .. })
    }

    fn rejected(rejection: FetchRejection) -> Self {
        match rejection {
            FetchRejection::Busy => Self::Busy,
            FetchRejection::Exhausted => Self::Exhausted,
            FetchRejection::NoLoader => Self::NoLoader,
            FetchRejection::NoSource => Self::NoSource,
        }
    }
}

impl From<CommitSummary> for RefreshOutcome {
    fn from(summary: CommitSummary) -> Self {
        match summary {
            CommitSummary::Replaced { rows } => Self::Refreshed { rows },
            CommitSummary::Appended { rows, has_more } => Self::Appended { rows, has_more },
            CommitSummary::Discarded => Self::Discarded,
        }
    }
}

/// Published on the engine's notice channel after every refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshNotice {
    pub trigger: Trigger,
    pub outcome: RefreshOutcome,
}

pub(crate) fn lock_state(state: &Mutex<ViewState>) -> MutexGuard<'_, ViewState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Cloneable entry point shared by the UI thread, spawned workers and the
/// auto-refresh timer. The busy flag is checked and set under the data lock,
/// the fetch runs unlocked, and the lock is taken again only to commit.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    state: Arc<Mutex<ViewState>>,
    notices: Sender<RefreshNotice>,
}

impl RefreshHandle {
    pub fn refresh(&self) -> RefreshOutcome {
        self.run(Trigger::Manual)
    }

    pub fn load_more(&self) -> RefreshOutcome {
        self.run(Trigger::LoadMore)
    }

    pub fn spawn(&self, trigger: Trigger) -> JoinHandle<RefreshOutcome> {
        let handle = self.clone();
        thread::spawn(move || handle.run(trigger))
    }

    pub fn is_loading(&self) -> bool {
        lock_state(&self.state).refresh_state().is_loading
    }

    pub fn run(&self, trigger: Trigger) -> RefreshOutcome {
        let admitted = {
            let mut state = lock_state(&self.state);
            match trigger {
                Trigger::LoadMore => state.begin_load_more(),
                Trigger::Manual | Trigger::AutoRefresh => state.begin_refresh(),
            }
        };

        let outcome = match admitted {
            Err(rejection) => {
                let outcome = RefreshOutcome::rejected(rejection);
                info!(trigger = trigger.label(), "{}", outcome.message());
                outcome
            }
            Ok(plan) => {
                debug!(trigger = trigger.label(), ?plan, "fetch started");
                let fetched = fetch(&plan);
                let mut state = lock_state(&self.state);
                match fetched {
                    FetchResult::Rows(rows) => RefreshOutcome::from(state.commit(&plan, rows)),
                    FetchResult::Failed(error) => {
                        state.abandon(&plan);
                        warn!(trigger = trigger.label(), error = %format!("{error:#}"), "fetch failed");
                        RefreshOutcome::Failed(format!("{error:#}"))
                    }
                    FetchResult::TimedOut(after) => {
                        state.abandon(&plan);
                        warn!(trigger = trigger.label(), ?after, "fetch timed out; late result will be discarded");
                        RefreshOutcome::TimedOut(after)
                    }
                }
            }
        };

        debug!(trigger = trigger.label(), outcome = %outcome.message(), "refresh finished");
        let _ = self.notices.send(RefreshNotice {
            trigger,
            outcome: outcome.clone(),
        });
        outcome
    }
}

enum FetchResult {
    Rows(Vec<Row>),
    Failed(anyhow::Error),
    TimedOut(Duration),
}

impl From<Result<Vec<Row>>> for FetchResult {
    fn from(result: Result<Vec<Row>>) -> Self {
        match result {
            Ok(rows) => Self::Rows(rows),
            Err(error) => Self::Failed(error),
        }
    }
}

/// Runs the fetch on the current thread, or on a helper thread with a
/// deadline when a timeout is configured. A timed-out fetch is not cancelled:
/// its helper thread keeps running the source to completion while the loading
/// flag is already released, so a later refresh may call the source
/// concurrently with it. Its result goes into a dropped channel and is lost.
fn fetch(plan: &FetchPlan) -> FetchResult {
    let Some(timeout) = plan.timeout else {
        return plan.run().into();
    };

    let (tx, rx) = mpsc::channel();
    let job = plan.clone();
    thread::spawn(move || {
        let _ = tx.send(job.run());
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => result.into(),
        Err(RecvTimeoutError::Timeout) => FetchResult::TimedOut(timeout),
        Err(RecvTimeoutError::Disconnected) => {
            FetchResult::Failed(anyhow!("fetch worker exited without a result"))
        }
    }
}

#[derive(Debug)]
struct AutoRefreshTimer {
    interval: Duration,
    _stop: Sender<()>,
}

/// Owns the shared view state, the notice channel and the auto-refresh
/// timer.
#[derive(Debug)]
pub struct RefreshEngine {
    handle: RefreshHandle,
    notices: Receiver<RefreshNotice>,
    timer: Option<AutoRefreshTimer>,
}

impl Default for RefreshEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshEngine {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            handle: RefreshHandle {
                state: Arc::new(Mutex::new(ViewState::default())),
                notices: tx,
            },
            notices: rx,
            timer: None,
        }
    }

    pub fn handle(&self) -> RefreshHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> MutexGuard<'_, ViewState> {
        lock_state(&self.handle.state)
    }

    pub fn refresh(&self) -> JoinHandle<RefreshOutcome> {
        self.handle.spawn(Trigger::Manual)
    }

    pub fn load_more(&self) -> JoinHandle<RefreshOutcome> {
        self.handle.spawn(Trigger::LoadMore)
    }

    pub fn start_auto_refresh(&mut self, interval: Duration) {
        self.stop_auto_refresh();
        if interval.is_zero() {
            warn!("auto refresh interval must be positive; timer not started");
            return;
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = self.handle.clone();
        thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        handle.run(Trigger::AutoRefresh);
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("auto refresh timer stopped");
        });
        info!(?interval, "auto refresh started");
        self.timer = Some(AutoRefreshTimer {
            interval,
            _stop: stop_tx,
        });
    }

    /// Dropping the stop sender disconnects the timer thread's channel, which
    /// ends its loop at the next wakeup.
    pub fn stop_auto_refresh(&mut self) {
        if let Some(timer) = self.timer.take() {
            debug!(interval = ?timer.interval, "stopping auto refresh");
        }
    }

    pub fn auto_refresh_interval(&self) -> Option<Duration> {
        self.timer.as_ref().map(|timer| timer.interval)
    }

    pub fn drain_notices(&self) -> Vec<RefreshNotice> {
        self.notices.try_iter().collect()
    }

    pub fn wait_notice(&self, timeout: Duration) -> Option<RefreshNotice> {
        self.notices.recv_timeout(timeout).ok()
    }
}

impl Drop for RefreshEngine {
    fn drop(&mut self) {
        self.stop_auto_refresh();
    }
}

#[cfg(test)]
mod tests {
    use super::{RefreshEngine, RefreshOutcome, Trigger};
    use crate::row::row;
    use anyhow::anyhow;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn refresh_without_source_reports_no_source() {
        let engine = RefreshEngine::new();
        assert_eq!(engine.handle().refresh(), RefreshOutcome::NoSource);
        assert!(!engine.handle().is_loading());
    }

    #[test]
    fn refresh_commits_rows_and_publishes_notice() {
        let engine = RefreshEngine::new();
        engine
            .state()
            .set_source(Arc::new(|| Ok(vec![row(["1"]), row(["2"])])));

        assert_eq!(
            engine.handle().refresh(),
            RefreshOutcome::Refreshed { rows: 2 }
        );
        assert_eq!(engine.state().raw().len(), 2);

        let notices = engine.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].trigger, Trigger::Manual);
    }

    #[test]
    fn failed_refresh_keeps_previous_rows() {
        let engine = RefreshEngine::new();
        engine.state().replace_rows(vec![row(["stale"])]);
        engine
            .state()
            .set_source(Arc::new(|| Err(anyhow!("engine unreachable"))));

        let outcome = engine.handle().refresh();
        assert!(outcome.is_error());
        assert!(outcome.message().contains("engine unreachable"));
        assert_eq!(engine.state().raw(), &[row(["stale"])]);
        assert!(!engine.state().refresh_state().is_loading);
    }

    #[test]
    fn timeout_releases_the_loading_flag() {
        let engine = RefreshEngine::new();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = std::sync::Mutex::new(release_rx);
        engine.state().set_source(Arc::new(move || {
            let _ = release_rx.lock().map(|rx| rx.recv());
            Ok(vec![row(["late"])])
        }));
        engine
            .state()
            .set_fetch_timeout(Some(Duration::from_millis(20)));

        assert_eq!(
            engine.handle().refresh(),
            RefreshOutcome::TimedOut(Duration::from_millis(20))
        );
        assert!(!engine.handle().is_loading());
        let _ = release_tx.send(());
        thread::sleep(Duration::from_millis(20));
        assert!(engine.state().raw().is_empty());
    }

    #[test]
    fn refresh_is_admitted_while_a_timed_out_fetch_still_runs() {
        let engine = RefreshEngine::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = std::sync::Mutex::new(release_rx);
        engine.state().set_source(Arc::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                let _ = release_rx.lock().map(|rx| rx.recv());
            }
            Ok(vec![row(["fresh"])])
        }));
        engine
            .state()
            .set_fetch_timeout(Some(Duration::from_millis(200)));

        assert!(engine.handle().refresh().is_error());
        assert_eq!(
            engine.handle().refresh(),
            RefreshOutcome::Refreshed { rows: 1 }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(engine.state().raw(), &[row(["fresh"])]);
        let _ = release_tx.send(());
    }

    #[test]
    fn orphaned_fetch_reports_discarded() {
        let engine = RefreshEngine::new();
        let (entered_tx, entered_rx) = mpsc::channel::<()>();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let gate = std::sync::Mutex::new((entered_tx, release_rx));
        engine.state().set_source(Arc::new(move || {
            if let Ok(gate) = gate.lock() {
                let _ = gate.0.send(());
                let _ = gate.1.recv();
            }
            Ok(vec![row(["old"])])
        }));

        let worker = engine.handle().spawn(Trigger::Manual);
        entered_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("fetch should start");
        engine.state().replace_rows(vec![row(["new"])]);
        assert!(!engine.handle().is_loading());
        let _ = release_tx.send(());

        let outcome = worker.join().expect("worker should not panic");
        assert_eq!(outcome, RefreshOutcome::Discarded);
        assert!(!outcome.mutated());
        assert_eq!(engine.state().raw(), &[row(["new"])]);
    }

    #[test]
    fn auto_refresh_ticks_until_stopped() {
        let mut engine = RefreshEngine::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        engine.state().set_source(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }));

        engine.start_auto_refresh(Duration::from_millis(10));
        assert_eq!(
            engine.auto_refresh_interval(),
            Some(Duration::from_millis(10))
        );
        let notice = engine
            .wait_notice(Duration::from_secs(2))
            .expect("timer should fire");
        assert_eq!(notice.trigger, Trigger::AutoRefresh);

        engine.stop_auto_refresh();
        assert_eq!(engine.auto_refresh_interval(), None);
        thread::sleep(Duration::from_millis(30));
        let settled = calls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(calls.load(Ordering::SeqCst), settled);
    }

    #[test]
    fn restarting_auto_refresh_replaces_the_timer() {
        let mut engine = RefreshEngine::new();
        engine.start_auto_refresh(Duration::from_secs(60));
        engine.start_auto_refresh(Duration::from_secs(30));
        assert_eq!(engine.auto_refresh_interval(), Some(Duration::from_secs(30)));
        engine.stop_auto_refresh();
        engine.stop_auto_refresh();
        assert_eq!(engine.auto_refresh_interval(), None);
    }

    #[test]
    fn zero_interval_does_not_start_a_timer() {
        let mut engine = RefreshEngine::new();
        engine.start_auto_refresh(Duration::ZERO);
        assert_eq!(engine.auto_refresh_interval(), None);
    }
}
