// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use panelkit_core::{
    Action, ActionDelegate, DashboardCore, Payload, Row, SelectionKey, Trigger, column_index,
};
use panelkit_testkit::{CONTAINER_COLUMNS, PROCESS_COLUMNS, REPO_COLUMNS, RowFaker, header};
use panelkit_tui::DashboardRuntime;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

const DEMO_ROWS: usize = 240;
const ACTIVE_ONLY_KEY: &str = "a";
const YANK_KEY: &str = "y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    Containers,
    Processes,
    Repos,
}

impl PluginKind {
    pub const ALL: [Self; 3] = [Self::Containers, Self::Processes, Self::Repos];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Containers => "containers",
            Self::Processes => "processes",
            Self::Repos => "repos",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == value)
            .ok_or_else(|| {
                anyhow!(
                    "unknown plugin {value:?}; choose one of: {}",
                    Self::ALL.map(Self::name).join(", ")
                )
            })
    }

    fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Containers => &CONTAINER_COLUMNS,
            Self::Processes => &PROCESS_COLUMNS,
            Self::Repos => &REPO_COLUMNS,
        }
    }

    /// Column that identifies a row when no selection key is configured.
    fn identity_column(self) -> &'static str {
        match self {
            Self::Containers => "id",
            Self::Processes => "pid",
            Self::Repos => "name",
        }
    }

    /// Column and values counted as active by the `a` toggle.
    fn active_filter(self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::Containers => ("state", &["running"]),
            Self::Processes => ("user", &["root"]),
            Self::Repos => ("status", &["modified", "untracked"]),
        }
    }

    fn generate(self, seed: u64, count: usize) -> Vec<Row> {
        let mut faker = RowFaker::new(seed);
        match self {
            Self::Containers => faker.containers(count),
            Self::Processes => faker.processes(count),
            Self::Repos => faker.repos(count),
        }
    }
}

/// Demo data plugin backed by seeded fake rows served page by page.
#[derive(Debug)]
pub struct DemoPlugin {
    kind: PluginKind,
    page_size: usize,
    selection_key: SelectionKey,
    seed: u64,
    auto_refresh: Option<Duration>,
    active_only: Arc<AtomicBool>,
    yanked: Rc<RefCell<Vec<String>>>,
}

impl DemoPlugin {
    pub fn new(kind: PluginKind, page_size: usize, selection_key: SelectionKey) -> Self {
        Self {
            kind,
            page_size: page_size.max(1),
            selection_key,
            seed: 7,
            auto_refresh: None,
            active_only: Arc::new(AtomicBool::new(false)),
            yanked: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn with_auto_refresh(mut self, interval: Option<Duration>) -> Self {
        self.auto_refresh = interval;
        self
    }

    pub fn kind(&self) -> PluginKind {
        self.kind
    }

    /// Signatures copied with `y`, oldest first.
    pub fn yanked(&self) -> Vec<String> {
        self.yanked.borrow().clone()
    }

    fn install_loader(&self, core: &mut DashboardCore) {
        let columns = self.kind.columns();
        let rows = Arc::new(self.kind.generate(self.seed, DEMO_ROWS));
        let (column, values) = self.kind.active_filter();
        let active_column = columns.iter().position(|name| *name == column);
        let active_only = Arc::clone(&self.active_only);

        core.set_lazy_loader(self.page_size, move |offset, limit| {
            let filter_active = active_only.load(Ordering::SeqCst);
            Ok(rows
                .iter()
                .filter(|row| {
                    !filter_active
                        || active_column
                            .and_then(|index| row.get(index))
                            .is_some_and(|value| values.contains(&value.as_str()))
                })
                .skip(offset)
                .take(limit)
                .cloned()
                .collect())
        });
    }

    fn install_keys(&self, core: &mut DashboardCore) {
        let active_only = Arc::clone(&self.active_only);
        let refresh = core.engine().handle();
        core.add_key_binding(
            ACTIVE_ONLY_KEY,
            "toggle active rows only",
            Some(Box::new(move || {
                let enabled = !active_only.fetch_xor(true, Ordering::SeqCst);
                info!(enabled, "active-only toggled");
                drop(refresh.spawn(Trigger::Manual));
            })),
        );
        core.add_key_binding(YANK_KEY, "copy selected row id", None);
    }

    fn delegate(&self) -> ActionDelegate {
        let selected: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));
        let yanked = Rc::clone(&self.yanked);
        let plugin = self.kind.name();
        Box::new(move |action: Action, body: &Payload| match action {
            Action::RowSelected => {
                *selected.borrow_mut() = body.get("signature").cloned();
                Ok(())
            }
            Action::KeyPress if body.get("key").map(String::as_str) == Some(YANK_KEY) => {
                let Some(signature) = selected.borrow().clone() else {
                    bail!("nothing selected to copy");
                };
                info!(plugin, signature = %signature, "row copied");
                yanked.borrow_mut().push(signature);
                Ok(())
            }
            Action::KeyPress => bail!("{plugin} does not handle this key"),
            Action::Back | Action::NavigateBack => {
                info!(plugin, action = action.as_str(), ?body, "navigated back");
                Ok(())
            }
        })
    }

    fn effective_selection_key(&self) -> SelectionKey {
        match &self.selection_key {
            SelectionKey::Composite => SelectionKey::column(self.kind.identity_column()),
            configured => configured.clone(),
        }
    }
}

impl DashboardRuntime for DemoPlugin {
    fn title(&self) -> &str {
        self.kind.name()
    }

    fn install(&mut self, core: &mut DashboardCore) -> Result<()> {
        core.set_headers(header(self.kind.columns()));
        core.set_selection_key(self.effective_selection_key());
        self.install_loader(core);
        self.install_keys(core);
        core.set_action_delegate(self.delegate());
        Ok(())
    }

    fn contexts(&self) -> Vec<String> {
        PluginKind::ALL
            .into_iter()
            .map(|kind| kind.name().to_owned())
            .collect()
    }

    fn switch_context(&mut self, core: &mut DashboardCore, name: &str) -> Result<()> {
        let kind = PluginKind::parse(name)?;
        self.kind = kind;
        self.active_only.store(false, Ordering::SeqCst);
        core.clear_key_bindings();
        core.clear_filter();
        core.set_data(Vec::new());
        self.install(core)?;
        core.set_view_stack(vec![kind.name().to_owned()]);
        drop(core.refresh());
        Ok(())
    }

    fn open_row(&mut self, core: &mut DashboardCore, row: &[String]) -> Result<bool> {
        let identity = {
            let state = core.state();
            column_index(state.header(), self.kind.identity_column())
                .and_then(|index| row.get(index))
                .cloned()
        };
        let Some(identity) = identity.filter(|value| !value.is_empty()) else {
            return Ok(false);
        };
        core.push_view(identity);
        Ok(true)
    }

    fn auto_refresh(&self) -> Option<Duration> {
        self.auto_refresh
    }
}
