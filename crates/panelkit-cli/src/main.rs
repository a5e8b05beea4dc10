// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod plugins;

use anyhow::{Context, Result, bail};
use config::Config;
use panelkit_core::DashboardCore;
use plugins::{DemoPlugin, PluginKind};
use std::env;
use std::path::PathBuf;
use tracing::info;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `panelkit --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let kind = options.plugin;
    let interval = config.refresh_interval()?;
    let fetch_timeout = config.fetch_timeout()?;
    let log_path = config.log_path()?;
    if options.check_only {
        println!(
            "config ok: plugin={} page_size={} log={}",
            kind.name(),
            config.page_size(),
            log_path.display()
        );
        return Ok(());
    }

    logging::init_logging(config.log_level(), &log_path)?;
    info!(
        config = %options.config_path.display(),
        plugin = kind.name(),
        "starting panelkit"
    );

    let mut core = DashboardCore::new(kind.name());
    core.set_fetch_timeout(fetch_timeout);
    let mut plugin = DemoPlugin::new(kind, config.page_size(), config.selection_key())
        .with_auto_refresh(interval);
    panelkit_tui::run_app(&mut core, &mut plugin)?;
    info!(
        plugin = plugin.kind().name(),
        copied = plugin.yanked().len(),
        "panelkit stopped"
    );
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    plugin: PluginKind,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

impl CliOptions {
    fn with_config_path(config_path: PathBuf) -> Self {
        Self {
            config_path,
            plugin: PluginKind::Containers,
            print_config_path: false,
            print_example: false,
            check_only: false,
            show_help: false,
        }
    }
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions::with_config_path(default_config_path);
    let mut args = args.into_iter();
    while let Some(flag) = args.next() {
        let flag = flag.as_ref();
        match flag {
            "--config" | "--plugin" => {
                let Some(value) = args.next() else {
                    bail!("{flag} requires a value; run with --help to see supported options");
                };
                let value = value.as_ref();
                if flag == "--config" {
                    options.config_path = PathBuf::from(value);
                } else {
                    options.plugin = PluginKind::parse(value)?;
                }
            }
            "--print-config-path" => options.print_config_path = true,
            "--print-example-config" => options.print_example = true,
            "--check" => options.check_only = true,
            "--help" | "-h" => options.show_help = true,
            unknown => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options")
            }
        }
    }
    Ok(options)
}

fn print_help() {
    println!(
        "panelkit: terminal dashboard over demo data sources

usage: panelkit [options]

  --config <path>          Config file (default: $PANELKIT_CONFIG_PATH or the platform config dir)
  --plugin <name>          Data source: containers, processes or repos
  --print-config-path      Print the resolved config path and exit
  --print-example-config   Print a version 1 config template and exit
  --check                  Load and validate the config, then exit
  -h, --help               Show this help"
    );
}
