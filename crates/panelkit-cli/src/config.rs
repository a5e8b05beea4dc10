// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use panelkit_core::{DEFAULT_PAGE_SIZE, SelectionKey};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "panelkit";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_REFRESH_INTERVAL: &str = "5s";
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub refresh: Refresh,
    #[serde(default)]
    pub table: Table,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            refresh: Refresh::default(),
            table: Table::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Refresh {
    pub interval: Option<String>,
    pub page_size: Option<i64>,
    pub fetch_timeout: Option<String>,
}

impl Default for Refresh {
    fn default() -> Self {
        Self {
            interval: Some(DEFAULT_REFRESH_INTERVAL.to_owned()),
            page_size: Some(DEFAULT_PAGE_SIZE as i64),
            fetch_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Table {
    pub selection_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub path: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            path: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("PANELKIT_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set PANELKIT_CONFIG_PATH to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and put values under [refresh], [table], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(interval) = &self.refresh.interval {
            parse_duration(interval)
                .with_context(|| format!("refresh.interval in {}", path.display()))?;
        }

        if let Some(page_size) = self.refresh.page_size
            && page_size <= 0
        {
            bail!(
                "refresh.page_size in {} must be positive, got {}",
                path.display(),
                page_size
            );
        }

        if let Some(timeout) = &self.refresh.fetch_timeout {
            let parsed = parse_duration(timeout)
                .with_context(|| format!("refresh.fetch_timeout in {}", path.display()))?;
            if parsed.is_zero() {
                bail!(
                    "refresh.fetch_timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(key) = &self.table.selection_key
            && key.trim().is_empty()
        {
            bail!(
                "table.selection_key in {} must name a column; remove it to use the first three cells",
                path.display()
            );
        }

        if let Some(level) = &self.log.level
            && !LOG_LEVELS.contains(&level.as_str())
        {
            bail!(
                "log.level in {} must be one of {}, got {:?}",
                path.display(),
                LOG_LEVELS.join(", "),
                level
            );
        }

        Ok(())
    }

    /// `None` disables auto refresh.
    pub fn refresh_interval(&self) -> Result<Option<Duration>> {
        let interval = parse_duration(
            self.refresh
                .interval
                .as_deref()
                .unwrap_or(DEFAULT_REFRESH_INTERVAL),
        )?;
        Ok((!interval.is_zero()).then_some(interval))
    }

    pub fn page_size(&self) -> usize {
        self.refresh
            .page_size
            .and_then(|size| usize::try_from(size).ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn fetch_timeout(&self) -> Result<Option<Duration>> {
        self.refresh
            .fetch_timeout
            .as_deref()
            .map(parse_duration)
            .transpose()
    }

    pub fn selection_key(&self) -> SelectionKey {
        SelectionKey::from_config(self.table.selection_key.as_deref())
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log.path {
            return Ok(PathBuf::from(path));
        }
        let data_root = dirs::data_local_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [log].path in the config file")
        })?;
        Ok(data_root.join(APP_NAME).join("panelkit.log"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# panelkit config\n# Place this file at: {}\n\nversion = 1\n\n[refresh]\n# <N>ms, <N>s or <N>m; \"0s\" disables auto refresh\ninterval = \"{}\"\npage_size = {}\n# Optional. Abandon a fetch that takes longer than this.\n# fetch_timeout = \"30s\"\n\n[table]\n# Optional. Column used to keep the selection across refreshes.\n# selection_key = \"id\"\n\n[log]\nlevel = \"{}\"\n# Optional. Default is the platform data dir (for example ~/.local/share/panelkit/panelkit.log)\n# path = \"/absolute/path/to/panelkit.log\"\n",
            path.display(),
            DEFAULT_REFRESH_INTERVAL,
            DEFAULT_PAGE_SIZE,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    let invalid = || {
        anyhow!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
    };
    let trimmed = raw.trim();
    let (digits, unit) = trimmed.split_at(
        trimmed
            .find(|ch: char| !ch.is_ascii_digit())
            .unwrap_or(trimmed.len()),
    );
    let scale: fn(u64) -> Duration = match unit {
        "ms" => Duration::from_millis,
        "s" => Duration::from_secs,
        "m" => |mins: u64| Duration::from_secs(mins.saturating_mul(60)),
        _ => return Err(invalid()),
    };
    let amount: u64 = digits.parse().map_err(|_| invalid())?;
    Ok(scale(amount))
}
