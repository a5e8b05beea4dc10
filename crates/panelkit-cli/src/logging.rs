// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// The terminal owns stdout while the dashboard runs, so log lines go to a
/// file. `RUST_LOG` overrides the configured level.
pub fn init_logging(level: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(build_filter(level)?)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|error| anyhow::anyhow!("install log subscriber: {error}"))
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    level_filter(level)
}

fn level_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(format!("panelkit={level},panelkit_core={level},panelkit_tui={level}"))
        .with_context(|| format!("invalid log level {level:?}"))
}

#[cfg(test)]
mod tests {
    use super::level_filter;
    use anyhow::Result;

    #[test]
    fn configured_levels_build_filters() -> Result<()> {
        for level in ["error", "warn", "info", "debug", "trace"] {
            let filter = level_filter(level)?;
            assert!(filter.to_string().contains(level));
        }
        Ok(())
    }

    #[test]
    fn unknown_level_is_rejected() {
        assert!(level_filter("loud").is_err());
    }
}
