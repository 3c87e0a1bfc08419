// SPDX-FileCopyrightText: 2026 Dotup Contributors
// SPDX-License-Identifier: MIT

//! Package manager shell-outs.
//!
//! The package manager is an opaque external collaborator. Dotup only ever
//! probes for it, fetches its upstream installer when it is missing, and
//! hands it a list of packages to install. All of that happens through plain
//! system calls so the user sees the manager's own output and prompts.

use std::{
    ffi::{OsStr, OsString},
    process::Command,
};
use tracing::{debug, info, instrument};

/// Layer of indirection for package manager interaction.
pub trait PackageInstall {
    /// Check if the package manager binary is usable.
    fn is_installed(&self) -> bool;

    /// Install the package manager itself through its upstream installer.
    fn install_self(&self) -> Result<()>;

    /// Install target packages through the package manager.
    fn install_packages(&self, packages: &[String]) -> Result<()>;
}

/// Package manager interaction through interactive shell-outs.
#[derive(Clone, Debug)]
pub struct ShellInstaller {
    bin: String,
    installer_url: Option<String>,
}

impl ShellInstaller {
    /// Construct new shell-out installer.
    pub fn new(bin: impl Into<String>, installer_url: Option<String>) -> Self {
        Self {
            bin: bin.into(),
            installer_url,
        }
    }
}

impl PackageInstall for ShellInstaller {
    /// Check if the package manager binary is usable.
    ///
    /// Probes the binary with "--version". Any failure to spawn or any
    /// non-zero exit is treated as not installed.
    fn is_installed(&self) -> bool {
        syscall_non_interactive(&self.bin, ["--version"]).is_ok()
    }

    /// Install the package manager itself through its upstream installer.
    ///
    /// Pipes the installer script from curl into bash with inherited stdio,
    /// so the installer can prompt the user directly.
    ///
    /// # Errors
    ///
    /// - Return [`PkgError::NoInstaller`] if no installer URL was configured.
    /// - Return [`PkgError::CommandFailed`] if the installer exits non-zero.
    #[instrument(skip(self), level = "debug")]
    fn install_self(&self) -> Result<()> {
        let url = self.installer_url.as_deref().ok_or(PkgError::NoInstaller {
            bin: self.bin.clone(),
        })?;

        info!("installing {} from {url}", self.bin);
        syscall_interactive(
            "/bin/bash",
            ["-c".into(), format!("curl -fsSL {url} | /bin/bash")],
        )
    }

    /// Install target packages through the package manager.
    ///
    /// # Errors
    ///
    /// - Return [`PkgError::CommandFailed`] if the install command exits
    ///   non-zero.
    #[instrument(skip(self, packages), level = "debug")]
    fn install_packages(&self, packages: &[String]) -> Result<()> {
        if packages.is_empty() {
            debug!("no packages to install");
            return Ok(());
        }

        info!("installing packages: {}", packages.join(" "));
        let mut args: Vec<OsString> = vec!["install".into()];
        args.extend(packages.iter().map(OsString::from));
        syscall_interactive(&self.bin, args)
    }
}

/// Run external command with inherited stdio, blocking until it finishes.
pub(crate) fn syscall_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<()> {
    let status = Command::new(cmd.as_ref()).args(args).spawn()?.wait()?;
    if !status.success() {
        return Err(PkgError::CommandFailed {
            command: cmd.as_ref().to_string_lossy().into_owned(),
            detail: status.to_string(),
        });
    }

    Ok(())
}

/// Run external command with captured output, returning trimmed stdout.
pub(crate) fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let output = Command::new(cmd.as_ref()).args(args).output()?;
    if !output.status.success() {
        return Err(PkgError::CommandFailed {
            command: cmd.as_ref().to_string_lossy().into_owned(),
            detail: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
}

/// Package manager interaction error types.
#[derive(Debug, thiserror::Error)]
pub enum PkgError {
    /// No installer URL configured for a missing package manager.
    #[error("package manager {bin:?} is missing and no installer_url is configured")]
    NoInstaller { bin: String },

    /// External command exited non-zero.
    #[error("command {command:?} failed: {detail}")]
    CommandFailed { command: String, detail: String },

    /// External command could not be spawned at all.
    #[error(transparent)]
    Syscall(#[from] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = PkgError> = std::result::Result<T, E>;
