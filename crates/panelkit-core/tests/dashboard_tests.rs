// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use panelkit_core::{
    Action, DashboardCore, FilterStatus, Key, KeyOutcome, MessageLevel, RefreshOutcome,
    Resolution, SelectionKey, TableContent, Trigger, row,
};
use panelkit_testkit::{
    GatedSource, PagedSource, RecordingDelegate, fruit_header, fruit_rows, numbered_rows,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn join(handle: JoinHandle<RefreshOutcome>) -> Result<RefreshOutcome> {
    handle.join().map_err(|_| anyhow!("refresh worker panicked"))
}

fn numbered_dashboard() -> DashboardCore {
    let mut core = DashboardCore::new("numbers");
    core.set_headers(row(["n"]));
    core
}

#[test]
fn concurrent_refresh_and_load_more_are_mutually_exclusive() -> Result<()> {
    let gated = GatedSource::new(numbered_rows(6));
    let mut core = numbered_dashboard();
    core.set_lazy_loader(2, gated.loader());

    let first = core.refresh();
    assert!(gated.wait_entered(1, WAIT), "first fetch never started");

    assert_eq!(join(core.load_more())?, RefreshOutcome::Busy);
    assert_eq!(join(core.refresh())?, RefreshOutcome::Busy);
    assert!(core.status().loading);

    gated.release();
    assert_eq!(join(first)?, RefreshOutcome::Refreshed { rows: 2 });
    assert_eq!(gated.entered(), 1);
    assert!(!core.status().loading);
    assert_eq!(core.state().raw().len(), 2);
    Ok(())
}

#[test]
fn filter_change_is_rejected_while_loading() -> Result<()> {
    let gated = GatedSource::new(fruit_rows());
    let mut core = DashboardCore::new("fruit");
    core.set_headers(fruit_header());
    core.set_refresh_source(gated.source());

    let pending = core.refresh();
    assert!(gated.wait_entered(1, WAIT));
    assert_eq!(core.set_filter_query("an"), FilterStatus::Busy);
    assert!(!core.is_filtered());
    let warned = core.messages().latest().map(|message| message.level);
    assert_eq!(warned, Some(MessageLevel::Warn));

    gated.release();
    join(pending)?;
    assert!(matches!(
        core.set_filter_query("an"),
        FilterStatus::Applied { shown: 1, .. }
    ));
    Ok(())
}

#[test]
fn swapping_the_source_mid_fetch_drops_the_old_rows() -> Result<()> {
    let gated = GatedSource::new(fruit_rows());
    let mut core = DashboardCore::new("fruit");
    core.set_headers(fruit_header());
    core.set_refresh_source(gated.source());
    let stale = core.refresh();
    assert!(gated.wait_entered(1, WAIT), "first fetch never started");

    let pages = PagedSource::new(numbered_rows(3));
    core.set_headers(row(["n"]));
    core.set_data(Vec::new());
    core.set_lazy_loader(2, pages.loader());
    assert!(!core.status().loading);
    assert_eq!(join(core.refresh())?, RefreshOutcome::Refreshed { rows: 2 });

    gated.release();
    assert_eq!(join(stale)?, RefreshOutcome::Discarded);
    let state = core.state();
    assert_eq!(state.header(), &["n".to_owned()][..]);
    assert_eq!(state.raw(), &numbered_rows(2)[..]);
    assert!(!state.refresh_state().is_loading);
    Ok(())
}

#[test]
fn pagination_terminates_on_short_page() -> Result<()> {
    let source = PagedSource::new(numbered_rows(5));
    let mut core = numbered_dashboard();
    core.set_lazy_loader(2, source.loader());

    assert_eq!(join(core.refresh())?, RefreshOutcome::Refreshed { rows: 2 });
    assert_eq!(
        join(core.load_more())?,
        RefreshOutcome::Appended {
            rows: 2,
            has_more: true
        }
    );
    assert_eq!(
        join(core.load_more())?,
        RefreshOutcome::Appended {
            rows: 1,
            has_more: false
        }
    );
    assert_eq!(join(core.load_more())?, RefreshOutcome::Exhausted);

    assert_eq!(source.calls(), 3);
    let state = core.state();
    assert_eq!(state.raw().len(), 5);
    assert_eq!(state.refresh_state().offset, 5);
    assert!(!state.refresh_state().has_more);
    Ok(())
}

#[test]
fn exact_multiple_ends_with_empty_page() -> Result<()> {
    let source = PagedSource::new(numbered_rows(4));
    let mut core = numbered_dashboard();
    core.set_lazy_loader(2, source.loader());

    join(core.refresh())?;
    join(core.load_more())?;
    assert_eq!(
        join(core.load_more())?,
        RefreshOutcome::Appended {
            rows: 0,
            has_more: false
        }
    );
    assert_eq!(core.state().raw().len(), 4);
    Ok(())
}

#[test]
fn failed_page_keeps_rows_and_reports_error() -> Result<()> {
    let source = PagedSource::failing_at(numbered_rows(6), 2);
    let mut core = numbered_dashboard();
    core.set_lazy_loader(2, source.loader());

    join(core.refresh())?;
    let outcome = join(core.load_more())?;
    assert!(matches!(outcome, RefreshOutcome::Failed(ref message) if message.contains("offset 2")));

    let state = core.state();
    assert_eq!(state.raw().len(), 2);
    assert_eq!(state.refresh_state().offset, 2);
    assert!(state.refresh_state().has_more);
    assert!(!state.refresh_state().is_loading);
    drop(state);

    core.poll_notices();
    let latest = core.messages().latest().map(|message| message.level);
    assert_eq!(latest, Some(MessageLevel::Error));
    Ok(())
}

#[test]
fn selection_follows_key_column_across_reorder() -> Result<()> {
    let mut core = DashboardCore::new("fruit");
    core.set_headers(fruit_header());
    core.set_selection_key(SelectionKey::column("id"));
    core.set_data(fruit_rows());
    core.select_row(Some(1));

    let selections = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&selections);
    core.set_row_selected_callback(Box::new(move |index| seen.borrow_mut().push(index)));

    core.set_refresh_source(|| {
        Ok(vec![
            row(["3", "cherry"]),
            row(["1", "apple"]),
            row(["2", "banana"]),
        ])
    });
    join(core.refresh())?;
    core.poll_notices();

    assert_eq!(core.selected_row_index(), Some(2));
    assert_eq!(core.selected_row_data(), Some(row(["2", "banana"])));
    assert_eq!(*selections.borrow(), vec![Some(2)]);
    Ok(())
}

#[test]
fn filter_survives_refresh() -> Result<()> {
    let mut core = DashboardCore::new("fruit");
    core.set_headers(fruit_header());
    core.set_filter_query("an");
    core.set_refresh_source(|| Ok(fruit_rows()));

    join(core.refresh())?;
    assert!(core.is_filtered());
    let names = core.with_content(|content| {
        (0..content.row_count())
            .filter_map(|row| content.cell(row, 1).map(str::to_owned))
            .collect::<Vec<_>>()
    });
    assert_eq!(names, vec!["banana"]);
    Ok(())
}

#[test]
fn escape_notifies_delegate_in_order() {
    let recorder = RecordingDelegate::new();
    let mut core = DashboardCore::new("containers");
    core.set_action_delegate(recorder.delegate());
    core.push_view("logs");
    core.push_view("line 12");

    core.handle_key(Key::Esc);
    assert_eq!(core.current_view(), "logs");
    let records = recorder.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].0, Action::Back);
    assert_eq!(records[0].1.get("from").map(String::as_str), Some("line 12"));
    assert_eq!(records[0].1.get("to").map(String::as_str), Some("logs"));
    assert_eq!(records[1].0, Action::NavigateBack);
    assert_eq!(
        records[1].1.get("current_view").map(String::as_str),
        Some("logs")
    );
}

#[test]
fn escape_at_root_reaches_outer_handler_unchanged() {
    let recorder = RecordingDelegate::new();
    let mut core = DashboardCore::new("containers");
    core.set_action_delegate(recorder.delegate());
    let forwarded = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&forwarded);
    core.set_outer_handler(Box::new(move |_: &mut DashboardCore, key: Key| {
        seen.borrow_mut().push(key);
        false
    }));

    assert_eq!(core.handle_key(Key::Esc), KeyOutcome::Forwarded(Key::Esc));
    assert_eq!(*forwarded.borrow(), vec![Key::Esc]);
    assert!(recorder.records().is_empty());
}

#[test]
fn declined_keypress_falls_back_to_refresh() -> Result<()> {
    let recorder = RecordingDelegate::declining_keys();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut core = DashboardCore::new("repos");
    core.set_action_delegate(recorder.delegate());
    core.set_refresh_source(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    });

    let outcome = core.handle_key(Key::Char('R'));
    assert_eq!(
        outcome,
        KeyOutcome::Consumed(Resolution::BuiltIn(panelkit_core::BuiltIn::Refresh))
    );
    let notice = core
        .engine()
        .wait_notice(WAIT)
        .ok_or_else(|| anyhow!("no refresh notice"))?;
    assert_eq!(notice.trigger, Trigger::Manual);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.actions(), vec![Action::KeyPress]);
    Ok(())
}

#[test]
fn page_down_loads_next_page() -> Result<()> {
    let source = PagedSource::new(numbered_rows(3));
    let mut core = numbered_dashboard();
    core.set_lazy_loader(2, source.loader());
    join(core.refresh())?;

    assert_eq!(
        core.handle_key(Key::PageDown),
        KeyOutcome::Consumed(Resolution::LoadMore)
    );
    let mut appended = None;
    while appended.is_none() {
        let notice = core
            .engine()
            .wait_notice(WAIT)
            .ok_or_else(|| anyhow!("no load-more notice"))?;
        if notice.trigger == Trigger::LoadMore {
            appended = Some(notice.outcome);
        }
    }
    assert_eq!(
        appended,
        Some(RefreshOutcome::Appended {
            rows: 1,
            has_more: false
        })
    );
    Ok(())
}

#[test]
fn auto_refresh_picks_up_new_rows() -> Result<()> {
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ticks);
    let mut core = numbered_dashboard();
    core.set_refresh_source(move || {
        let tick = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(numbered_rows(tick))
    });

    core.start_auto_refresh(Duration::from_millis(10));
    let notice = core
        .engine()
        .wait_notice(WAIT)
        .ok_or_else(|| anyhow!("auto refresh never fired"))?;
    core.stop_auto_refresh();

    assert_eq!(notice.trigger, Trigger::AutoRefresh);
    assert!(!core.state().raw().is_empty());
    Ok(())
}
