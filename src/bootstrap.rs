// SPDX-FileCopyrightText: 2026 Dotup Contributors
// SPDX-License-Identifier: MIT

//! Bootstrap run orchestration.
//!
//! A __bootstrap run__ sets up a development environment from nothing in one
//! strictly sequential pass: check the platform, make sure the package
//! manager exists, install the declared package set, clone the configuration
//! repository, and symlink its files into place. Every step shells out to, or
//! links against, an existing tool. There is no rollback. The first failing
//! step aborts the run, leaving everything already done in place.
//!
//! # Run Order
//!
//! 1. Platform check. The manifest pins the operating system the run is
//!    allowed on. Running anywhere else is the one precondition failure the
//!    binary reports with its dedicated exit code.
//! 2. Package manager. Skipped entirely when the manifest has no
//!    `package_manager` section. Otherwise the manager is probed, installed
//!    through its upstream installer when missing, and then asked to install
//!    the declared packages.
//! 3. Repository. Cloned to the checkout path when absent. An existing
//!    checkout is trusted as-is so reruns work offline.
//! 4. Links. Every manifest entry is resolved against the checkout and fed
//!    through one [`Linker`] sharing one per-run [`BackupRoot`].
//!
//! # See Also
//!
//! - [`linker`] for the backup-and-link contract.

pub mod linker;
pub mod pkg;

use crate::{
    bootstrap::{
        linker::{BackupRoot, Linker, LinkOutcome, LinkRequest},
        pkg::{PackageInstall, ShellInstaller},
    },
    config::Manifest,
};

use auth_git2::{GitAuthenticator, Prompter};
use git2::{build::RepoBuilder, Config, FetchOptions, RemoteCallbacks};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Password, Text};
use std::{env, path::{Path, PathBuf}, time};
use tracing::{debug, info, instrument, warn};

/// One full bootstrap run.
#[derive(Debug)]
pub struct Bootstrap<I = ShellInstaller>
where
    I: PackageInstall,
{
    manifest: Manifest,
    installer: Option<I>,
    backup_parent: PathBuf,
}

impl Bootstrap<ShellInstaller> {
    /// Construct bootstrap run from a manifest alone.
    ///
    /// The package manager section of the manifest, when present, is driven
    /// through interactive shell-outs.
    pub fn from_manifest(manifest: Manifest, backup_parent: impl Into<PathBuf>) -> Self {
        let installer = manifest
            .package_manager
            .as_ref()
            .map(|pm| ShellInstaller::new(pm.bin.clone(), pm.installer_url.clone()));

        Self {
            manifest,
            installer,
            backup_parent: backup_parent.into(),
        }
    }
}

impl<I> Bootstrap<I>
where
    I: PackageInstall,
{
    /// Construct bootstrap run with a caller-provided installer.
    pub fn new(
        manifest: Manifest,
        installer: Option<I>,
        backup_parent: impl Into<PathBuf>,
    ) -> Self {
        Self {
            manifest,
            installer,
            backup_parent: backup_parent.into(),
        }
    }

    /// Execute the run top to bottom.
    ///
    /// Fail-fast: the first failing step aborts with an error, and nothing
    /// already done is rolled back.
    ///
    /// # Errors
    ///
    /// - Return [`BootstrapError::UnsupportedPlatform`] if the manifest pins
    ///   a different operating system.
    /// - Return [`BootstrapError::Pkg`] if any package manager shell-out
    ///   fails.
    /// - Return [`BootstrapError::Git2`] if cloning the configuration
    ///   repository fails.
    /// - Return [`BootstrapError::MissingLinkSource`] if a non-glob link
    ///   source does not exist in the checkout.
    /// - Return [`BootstrapError::Link`] if the backup-and-link routine
    ///   fails.
    pub fn run(&self) -> Result<BootstrapReport> {
        // INVARIANT: The backup root is named with the run's start timestamp,
        // not with whenever the link phase happens to begin.
        let backup_root = BackupRoot::new(&self.backup_parent);

        self.check_platform()?;
        self.prepare_packages()?;
        self.fetch_repository()?;
        self.deploy_links(backup_root)
    }

    fn check_platform(&self) -> Result<()> {
        let expected = self.manifest.settings.platform.as_str();
        if expected != env::consts::OS {
            return Err(BootstrapError::UnsupportedPlatform {
                expected: expected.to_string(),
                actual: env::consts::OS,
            });
        }

        debug!("platform check passed for {expected}");
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn prepare_packages(&self) -> Result<()> {
        let Some(installer) = &self.installer else {
            debug!("no package manager configured, skipping");
            return Ok(());
        };

        if installer.is_installed() {
            info!("package manager already installed");
        } else {
            installer.install_self()?;
        }

        if let Some(pm) = &self.manifest.package_manager {
            installer.install_packages(&pm.packages)?;
        }

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn fetch_repository(&self) -> Result<()> {
        let checkout = self.manifest.settings.checkout.as_path();
        if checkout.exists() {
            info!("checkout already exists at {}, skipping clone", checkout.display());
            return Ok(());
        }

        if let Some(parent) = checkout.parent() {
            mkdirp::mkdirp(parent)?;
        }

        clone_repository(&self.manifest.settings.repository, checkout)?;
        info!("cloned {} to {}", self.manifest.settings.repository, checkout.display());

        Ok(())
    }

    fn deploy_links(&self, backup_root: BackupRoot) -> Result<BootstrapReport> {
        let linker = Linker::new(backup_root);
        let mut report = BootstrapReport::default();

        for request in self.resolve_links()? {
            let outcome = linker.link(&request)?;
            match outcome {
                LinkOutcome::Created => {
                    info!("linked {} -> {}", request.target.display(), request.source.display());
                    report.created += 1;
                }
                LinkOutcome::Replaced { backup } => {
                    info!(
                        "linked {} -> {} (original saved to {})",
                        request.target.display(),
                        request.source.display(),
                        backup.display()
                    );
                    report.replaced += 1;
                }
                LinkOutcome::Relinked => {
                    info!("relinked {} -> {}", request.target.display(), request.source.display());
                    report.relinked += 1;
                }
                LinkOutcome::Unchanged => {
                    debug!("{} already in place", request.target.display());
                    report.unchanged += 1;
                }
            }
        }

        Ok(report)
    }

    /// Resolve manifest link entries into concrete link requests.
    ///
    /// Plain sources must exist in the checkout. Glob sources are optional
    /// resources: each match is linked under the entry's target directory by
    /// base name, and zero matches only warrants a warning.
    fn resolve_links(&self) -> Result<Vec<LinkRequest>> {
        let checkout = self.manifest.settings.checkout.as_path();
        let mut requests = Vec::new();

        for entry in &self.manifest.links {
            if entry.source.chars().any(|c| matches!(c, '*' | '?' | '[')) {
                let pattern = checkout.join(&entry.source);
                let mut matched_any = false;
                for matched in glob::glob(pattern.to_string_lossy().as_ref())? {
                    let source = matched?;
                    let name = source.file_name().ok_or_else(|| {
                        BootstrapError::MissingLinkSource {
                            source_path: source.clone(),
                        }
                    })?;
                    requests.push(LinkRequest::new(source.clone(), entry.target.join(name)));
                    matched_any = true;
                }
                if !matched_any {
                    warn!("glob {:?} matched nothing in the checkout, skipping", entry.source);
                }
            } else {
                let source = checkout.join(&entry.source);
                if !source.exists() {
                    return Err(BootstrapError::MissingLinkSource {
                        source_path: source,
                    });
                }
                requests.push(LinkRequest::new(source, entry.target.clone()));
            }
        }

        Ok(requests)
    }
}

/// Tally of what one run did to the file system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Symlinks created where nothing existed before.
    pub created: usize,

    /// Symlinks that displaced an original into the backup root.
    pub replaced: usize,

    /// Stale symlinks repointed without backup.
    pub relinked: usize,

    /// Symlinks that were already correct.
    pub unchanged: usize,
}

/// Clone the configuration repository with progress and credential prompts.
///
/// The progress bar tracks received objects. When the remote asks for
/// credentials, the bar is suspended and the user is prompted on the
/// terminal.
fn clone_repository(url: &str, path: &Path) -> Result<()> {
    let bar = ProgressBar::no_length();
    let style = ProgressStyle::with_template(
        "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}]",
    )?
    .progress_chars("-=> ");
    bar.set_style(style);
    bar.set_message(url.to_string());
    bar.enable_steady_tick(time::Duration::from_millis(100));

    let prompter = ClonePrompter::new(bar);
    let authenticator = GitAuthenticator::default().set_prompter(prompter.clone());
    let config = Config::open_default()?;

    let mut throttle = time::Instant::now();
    let mut rc = RemoteCallbacks::new();
    rc.credentials(authenticator.credentials(&config));
    rc.transfer_progress(|progress| {
        let stats = progress.to_owned();
        if throttle.elapsed() > time::Duration::from_millis(10) {
            throttle = time::Instant::now();
            prompter.bar.set_length(stats.total_objects() as u64);
            prompter.bar.set_position(stats.received_objects() as u64);
        }
        true
    });

    let mut fo = FetchOptions::new();
    fo.remote_callbacks(rc);
    RepoBuilder::new().fetch_options(fo).clone(url, path)?;
    prompter.bar.finish_and_clear();

    Ok(())
}

/// Credential prompter that plays nice with the clone progress bar.
#[derive(Debug, Clone)]
struct ClonePrompter {
    bar: ProgressBar,
}

impl ClonePrompter {
    fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }

    fn ask_password(&self) -> Option<String> {
        Password::new("password").without_confirmation().prompt().ok()
    }
}

impl Prompter for ClonePrompter {
    #[instrument(skip(self, url, _config), level = "debug")]
    fn prompt_username_password(
        &mut self,
        url: &str,
        _config: &git2::Config,
    ) -> Option<(String, String)> {
        info!("authentication required at {url}");
        self.bar.suspend(|| {
            let username = Text::new("username").prompt().ok()?;
            let password = self.ask_password()?;
            Some((username, password))
        })
    }

    #[instrument(skip(self, username, url, _config), level = "debug")]
    fn prompt_password(
        &mut self,
        username: &str,
        url: &str,
        _config: &git2::Config,
    ) -> Option<String> {
        info!("authentication required at {url} for user {username}");
        self.bar.suspend(|| self.ask_password())
    }

    #[instrument(skip(self, ssh_key_path, _config), level = "debug")]
    fn prompt_ssh_key_passphrase(
        &mut self,
        ssh_key_path: &Path,
        _config: &git2::Config,
    ) -> Option<String> {
        info!(
            "authentication required with ssh key at {}",
            ssh_key_path.display()
        );
        self.bar.suspend(|| self.ask_password())
    }
}

/// All possible error types of a bootstrap run.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Manifest pins a different operating system.
    #[error("manifest targets platform {expected:?}, but this is {actual:?}")]
    UnsupportedPlatform {
        expected: String,
        actual: &'static str,
    },

    /// Non-glob link source does not exist in the checkout.
    #[error("link source {:?} does not exist in the checkout", source_path.display())]
    MissingLinkSource { source_path: PathBuf },

    /// Backup-and-link routine fails.
    #[error(transparent)]
    Link(#[from] linker::LinkError),

    /// Package manager shell-out fails.
    #[error(transparent)]
    Pkg(#[from] pkg::PkgError),

    /// Manifest parsing fails.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// Glob pattern in a link source cannot be parsed.
    #[error(transparent)]
    GlobPattern(#[from] glob::PatternError),

    /// Glob expansion cannot read a matched path.
    #[error(transparent)]
    Glob(#[from] glob::GlobError),

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),

    /// Plain file system interaction fails.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = BootstrapError> = std::result::Result<T, E>;
