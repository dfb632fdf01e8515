// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

mod config;
mod logger;

use std::path::PathBuf;
use std::{fs, process};

use anyhow::Context;
use clap::{ArgAction, Parser};
use modfold_format::Module;
use modfold_linker::{Action, DependencyStatus, Linker, evaluate};

use crate::config::LinkConfig;

/// Helper for passing VERSION to opt.
/// If `CARGO_VERSION_INFO` is set, use it, otherwise use `CARGO_PKG_VERSION`.
fn version() -> &'static str {
    option_env!("CARGO_VERSION_INFO").unwrap_or(env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Parser)]
#[clap(version = version())]
struct Modfold {
    #[clap(subcommand)]
    cmd: ModfoldCommand,
    #[clap(flatten)]
    common: Common,
}

#[derive(Debug, Parser)]
struct Common {
    /// Enables verbose logging
    #[clap(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Parser)]
enum ModfoldCommand {
    /// Folds the configured dependencies into the host module
    Link {
        /// Path to the link configuration file, in TOML.
        cfg: PathBuf,
    },
    /// Shows which action the policy picks for each dependency, without
    /// touching anything
    Explain {
        /// Path to the link configuration file, in TOML.
        cfg: PathBuf,
    },
}

fn main() {
    if let Err(err) = run() {
        log::error!("{err:?}");
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let modfold = Modfold::parse();

    logger::init(modfold.common.verbose);

    match modfold.cmd {
        ModfoldCommand::Link { cfg } => link(&cfg),
        ModfoldCommand::Explain { cfg } => explain(&cfg),
    }
}

fn link(cfg_path: &std::path::Path) -> anyhow::Result<()> {
    let cfg = LinkConfig::from_file(cfg_path)?;

    let mut host = Module::load(&cfg.host)
        .with_context(|| format!("failed to read host module {}", cfg.host.display()))?;
    log::info!(action = "linking"; "{} ({})", host.identity(), cfg.host.display());

    let linker = Linker::new(&cfg.configuration, cfg.directives.clone());
    let outcome = linker.process(&mut host, &cfg.host, &cfg.dependencies);

    for report in &outcome.reports {
        match report.status {
            DependencyStatus::Merged => log::info!(action = "merged"; "{}", report.name),
            DependencyStatus::Embedded => log::info!(action = "embedded"; "{}", report.name),
            DependencyStatus::ExcludedNoRule => {
                log::debug!(action = "excluded"; "{} (no matching rule)", report.name);
            }
            DependencyStatus::ExcludedByRule => {
                log::debug!(action = "excluded"; "{}", report.name);
            }
            DependencyStatus::Failed => {
                let detail = report.detail.as_deref().unwrap_or("unknown error");
                log::warn!(action = "failed"; "{}: {detail}", report.name);
            }
        }
    }

    if !outcome.changed {
        log::info!("nothing to do");
        return Ok(());
    }

    host.write(&cfg.host)
        .with_context(|| format!("failed to write host module {}", cfg.host.display()))?;
    log::info!(action = "wrote"; "{}", cfg.host.display());

    // merged inputs only disappear once the host is safely on disk
    for path in &outcome.delete_after_write {
        if let Err(e) = fs::remove_file(path) {
            log::warn!("could not delete merged input {}: {e}", path.display());
        }
    }

    Ok(())
}

fn explain(cfg_path: &std::path::Path) -> anyhow::Result<()> {
    let cfg = LinkConfig::from_file(cfg_path)?;

    for dep in &cfg.dependencies {
        let action = evaluate(
            &cfg.directives,
            &dep.simple_name,
            dep.private,
            &cfg.configuration,
        );
        let verdict = match action {
            Some(Action::Merge) => "merge",
            Some(Action::Embed) => "embed",
            Some(Action::None) => "none (excluded by rule)",
            None => "none (no matching rule)",
        };
        let scope = if dep.private { "private" } else { "non-private" };
        log::info!(action = verdict; "{} ({scope}, {})", dep.simple_name, dep.identity);
    }

    Ok(())
}
