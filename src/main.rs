// SPDX-FileCopyrightText: 2026 Dotup Contributors
// SPDX-License-Identifier: MIT

use dotup::{default_backup_parent, Bootstrap, Manifest};

use anyhow::{Context, Result};
use clap::Parser;
use inquire::Confirm;
use std::{fs, path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "dotup [options] [manifest]",
    version
)]
struct Cli {
    /// Path to the bootstrap manifest.
    #[arg(value_name = "manifest", default_value = "bootstrap.toml")]
    pub manifest: PathBuf,

    /// Skip the confirmation prompt.
    #[arg(short = 'y', long)]
    pub assume_yes: bool,

    /// Directory to collect per-run backup roots under.
    #[arg(short, long, value_name = "path")]
    pub backup_dir: Option<PathBuf>,
}

impl Cli {
    fn run(self) -> Result<()> {
        let data = fs::read_to_string(&self.manifest)
            .with_context(|| format!("failed to read manifest at {:?}", self.manifest.display()))?;
        let manifest: Manifest = data.parse()?;

        if !self.assume_yes {
            let proceed = Confirm::new(&format!(
                "bootstrap {:?}: install packages and replace files under your home directory?",
                manifest.settings.description
            ))
            .with_default(false)
            .prompt()?;

            if !proceed {
                info!("aborted by user");
                return Ok(());
            }
        }

        let backup_parent = match self.backup_dir {
            Some(path) => path,
            None => default_backup_parent()?,
        };

        let report = Bootstrap::from_manifest(manifest, backup_parent).run()?;
        info!(
            "done: {} linked, {} replaced, {} relinked, {} unchanged",
            report.created, report.replaced, report.relinked, report.unchanged
        );

        Ok(())
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}
