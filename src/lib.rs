// SPDX-FileCopyrightText: 2026 Dotup Contributors
// SPDX-License-Identifier: MIT

//! Bootstrap a personal development environment in one run.
//!
//! Dotup reads a single TOML manifest and executes it top to bottom: it makes
//! sure the package manager exists (fetching its upstream installer when
//! missing), installs the declared packages, clones the configuration
//! repository to a fixed checkout path, and symlinks the declared files into
//! the user's home directory. Anything a symlink would overwrite is moved
//! into a per-run, timestamped backup directory first.
//!
//! The run is strictly sequential and fail-fast: the first failing step
//! aborts everything, and steps already completed stay in place. There is no
//! rollback. Rerunning after a fix is safe, because the backup-and-link
//! routine is idempotent and an existing checkout is reused instead of
//! recloned.

pub mod bootstrap;
pub mod config;
pub mod path;

pub use bootstrap::{
    linker::{BackupRoot, Linker, LinkOutcome, LinkRequest},
    pkg::{PackageInstall, ShellInstaller},
    Bootstrap, BootstrapError, BootstrapReport,
};
pub use config::Manifest;
pub use path::default_backup_parent;
