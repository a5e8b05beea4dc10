// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use panelkit_core::{Action, ActionDelegate, Header, Payload, Row, row};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

pub const CONTAINER_COLUMNS: [&str; 5] = ["id", "name", "image", "state", "cpu"];
pub const PROCESS_COLUMNS: [&str; 5] = ["pid", "command", "user", "cpu", "mem"];
pub const REPO_COLUMNS: [&str; 5] = ["name", "branch", "status", "ahead", "updated"];

const IMAGES: [&str; 10] = [
    "nginx:1.27",
    "postgres:16",
    "redis:7",
    "grafana/grafana:11",
    "prom/prometheus:v2",
    "traefik:3.1",
    "minio/minio:latest",
    "rabbitmq:3-management",
    "mongo:7",
    "caddy:2",
];
const CONTAINER_STATES: [&str; 4] = ["running", "running", "exited", "paused"];
const SERVICE_WORDS: [&str; 12] = [
    "api", "web", "worker", "cache", "db", "queue", "proxy", "metrics", "auth", "search", "cron",
    "gateway",
];

const COMMANDS: [&str; 12] = [
    "bash", "sshd", "postgres", "nginx", "cargo", "rust-analyzer", "node", "python3", "systemd",
    "containerd", "tmux", "vim",
];
const USERS: [&str; 5] = ["root", "www-data", "postgres", "avery", "jordan"];

const REPO_PREFIXES: [&str; 8] = [
    "core", "infra", "docs", "tools", "web", "mobile", "data", "ops",
];
const REPO_SUFFIXES: [&str; 6] = ["service", "kit", "cli", "site", "lib", "config"];
const BRANCHES: [&str; 6] = [
    "main",
    "develop",
    "fix/login-timeout",
    "feat/pagination",
    "release/1.4",
    "chore/deps",
];
const REPO_STATUSES: [&str; 4] = ["clean", "clean", "modified", "untracked"];
const UPDATED: [&str; 6] = ["just now", "5m ago", "1h ago", "3h ago", "yesterday", "2d ago"];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator of demo table rows. The same seed always yields the
/// same rows.
#[derive(Debug, Clone)]
pub struct RowFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl RowFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn container(&mut self, index: usize) -> Row {
        let image = self.pick(&IMAGES);
        let service = self.pick(&SERVICE_WORDS);
        let id = format!("{:012x}", self.rng.next_u64() & 0xFFFF_FFFF_FFFF);
        vec![
            id,
            format!("{service}-{index}"),
            image.to_owned(),
            self.pick(&CONTAINER_STATES).to_owned(),
            format!("{}.{}%", self.int_n(100), self.int_n(10)),
        ]
    }

    pub fn process(&mut self, index: usize) -> Row {
        let pid = 100 + index * 7 + self.int_n(7);
        vec![
            pid.to_string(),
            self.pick(&COMMANDS).to_owned(),
            self.pick(&USERS).to_owned(),
            format!("{}.{}", self.int_n(100), self.int_n(10)),
            format!("{}M", 4 + self.int_n(2048)),
        ]
    }

    pub fn repo(&mut self, index: usize) -> Row {
        let name = format!(
            "{}-{}-{index}",
            self.pick(&REPO_PREFIXES),
            self.pick(&REPO_SUFFIXES)
        );
        vec![
            name,
            self.pick(&BRANCHES).to_owned(),
            self.pick(&REPO_STATUSES).to_owned(),
            self.int_n(12).to_string(),
            self.pick(&UPDATED).to_owned(),
        ]
    }

    pub fn containers(&mut self, count: usize) -> Vec<Row> {
        (0..count).map(|index| self.container(index)).collect()
    }

    pub fn processes(&mut self, count: usize) -> Vec<Row> {
        (0..count).map(|index| self.process(index)).collect()
    }

    pub fn repos(&mut self, count: usize) -> Vec<Row> {
        (0..count).map(|index| self.repo(index)).collect()
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

pub fn header(columns: &[&str]) -> Header {
    columns.iter().map(|column| (*column).to_owned()).collect()
}

pub fn fruit_header() -> Header {
    row(["id", "name"])
}

pub fn fruit_rows() -> Vec<Row> {
    vec![
        row(["1", "apple"]),
        row(["2", "banana"]),
        row(["3", "cherry"]),
    ]
}

/// Numbered single-column rows `"0"..total`, handy for paging checks.
pub fn numbered_rows(total: usize) -> Vec<Row> {
    (0..total).map(|index| vec![index.to_string()]).collect()
}

#[derive(Debug)]
struct PagedInner {
    rows: Vec<Row>,
    calls: AtomicUsize,
    fail_at: Option<usize>,
}

/// Offset/limit loader over a fixed row set that counts its calls.
#[derive(Debug, Clone)]
pub struct PagedSource {
    inner: Arc<PagedInner>,
}

impl PagedSource {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            inner: Arc::new(PagedInner {
                rows,
                calls: AtomicUsize::new(0),
                fail_at: None,
            }),
        }
    }

    /// Same rows, but a request starting at `offset` fails.
    pub fn failing_at(rows: Vec<Row>, offset: usize) -> Self {
        Self {
            inner: Arc::new(PagedInner {
                rows,
                calls: AtomicUsize::new(0),
                fail_at: Some(offset),
            }),
        }
    }

    pub fn fetch(&self, offset: usize, limit: usize) -> Result<Vec<Row>> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_at == Some(offset) {
            return Err(anyhow!("backend unavailable at offset {offset}"));
        }
        let rows = &self.inner.rows;
        let start = offset.min(rows.len());
        let end = offset.saturating_add(limit).min(rows.len());
        Ok(rows[start..end].to_vec())
    }

    pub fn loader(&self) -> impl Fn(usize, usize) -> Result<Vec<Row>> + Send + Sync + 'static {
        let source = self.clone();
        move |offset, limit| source.fetch(offset, limit)
    }

    /// Full-refresh view of the same data.
    pub fn source(&self) -> impl Fn() -> Result<Vec<Row>> + Send + Sync + 'static {
        let source = self.clone();
        move || source.fetch(0, usize::MAX)
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.inner.rows.len()
    }
}

#[derive(Debug, Default)]
struct GateState {
    entered: usize,
    open: bool,
}

#[derive(Debug, Default)]
struct Gate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl Gate {
    fn lock(&self) -> MutexGuard<'_, GateState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Fetch source that blocks every call until `release` is called, so tests
/// can hold a fetch in flight.
#[derive(Debug, Clone)]
pub struct GatedSource {
    rows: Arc<Vec<Row>>,
    gate: Arc<Gate>,
}

impl GatedSource {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: Arc::new(rows),
            gate: Arc::default(),
        }
    }

    fn pass(&self) {
        let mut state = self.gate.lock();
        state.entered += 1;
        self.gate.changed.notify_all();
        while !state.open {
            state = match self.gate.changed.wait(state) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    pub fn source(&self) -> impl Fn() -> Result<Vec<Row>> + Send + Sync + 'static {
        let gated = self.clone();
        move || {
            gated.pass();
            Ok(gated.rows.to_vec())
        }
    }

    pub fn loader(&self) -> impl Fn(usize, usize) -> Result<Vec<Row>> + Send + Sync + 'static {
        let gated = self.clone();
        move |offset, limit| {
            gated.pass();
            let start = offset.min(gated.rows.len());
            let end = offset.saturating_add(limit).min(gated.rows.len());
            Ok(gated.rows[start..end].to_vec())
        }
    }

    /// Waits until `count` calls are blocked at (or past) the gate.
    pub fn wait_entered(&self, count: usize, timeout: Duration) -> bool {
        let state = self.gate.lock();
        let result = self
            .gate
            .changed
            .wait_timeout_while(state, timeout, |state| state.entered < count);
        match result {
            Ok((state, _)) => state.entered >= count,
            Err(poisoned) => poisoned.into_inner().0.entered >= count,
        }
    }

    pub fn entered(&self) -> usize {
        self.gate.lock().entered
    }

    pub fn release(&self) {
        self.gate.lock().open = true;
        self.gate.changed.notify_all();
    }
}

/// Action delegate that records every call. Keypresses can be declined to
/// exercise the built-in fallback.
#[derive(Debug, Clone, Default)]
pub struct RecordingDelegate {
    records: Arc<Mutex<Vec<(Action, Payload)>>>,
    decline_keys: bool,
}

impl RecordingDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declining_keys() -> Self {
        Self {
            records: Arc::default(),
            decline_keys: true,
        }
    }

    pub fn delegate(&self) -> ActionDelegate {
        let records = Arc::clone(&self.records);
        let decline_keys = self.decline_keys;
        Box::new(move |action, payload| {
            match records.lock() {
                Ok(mut guard) => guard.push((action, payload.clone())),
                Err(poisoned) => poisoned.into_inner().push((action, payload.clone())),
            }
            if decline_keys && action == Action::KeyPress {
                return Err(anyhow!("key not handled"));
            }
            Ok(())
        })
    }

    pub fn records(&self) -> Vec<(Action, Payload)> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn actions(&self) -> Vec<Action> {
        self.records().into_iter().map(|(action, _)| action).collect()
    }
}
