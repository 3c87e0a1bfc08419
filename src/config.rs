// SPDX-FileCopyrightText: 2026 Dotup Contributors
// SPDX-License-Identifier: MIT

//! Bootstrap manifest layout.
//!
//! Specify the layout for the manifest file that Dotup uses to simplify the
//! process of serialization and deserialization. File I/O is left to the
//! caller to figure out.
//!
//! # General Layout
//!
//! A manifest is composed of three basic parts: settings, an optional package
//! manager section, and a listing of link entries. The settings section pins
//! down the platform the run is allowed on, the configuration repository to
//! clone, and where to clone it. The package manager section names the
//! manager binary, the upstream installer to fetch it with when missing, and
//! the packages to install. Each link entry pairs a file inside the checkout
//! with the place it should be symlinked to in the user's home directory.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Bootstrap manifest layout.
///
/// One manifest fully describes one bootstrap run. Parsing performs shell
/// expansion (`~` and `$VAR`) on the checkout path and on every link target,
/// so downstream code only ever sees absolute paths for both.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Manifest {
    /// Settings for the bootstrap run.
    pub settings: ManifestSettings,

    /// Package manager to ensure and drive, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<PackageManager>,

    /// Listing of files to symlink out of the checkout.
    #[serde(rename = "link", default)]
    pub links: Vec<LinkEntry>,
}

impl FromStr for Manifest {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut manifest: Manifest = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on checkout path and link targets.
        manifest.settings.checkout = CheckoutDir::new(
            shellexpand::full(manifest.settings.checkout.to_string().as_str())
                .map_err(ConfigError::ShellExpansion)?
                .into_owned(),
        );
        for link in &mut manifest.links {
            link.target = PathBuf::from(
                shellexpand::full(link.target.to_string_lossy().as_ref())
                    .map_err(ConfigError::ShellExpansion)?
                    .into_owned(),
            );
        }

        Ok(manifest)
    }
}

impl Display for Manifest {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Manifest run settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ManifestSettings {
    /// Brief description of what the manifest sets up.
    pub description: String,

    /// Operating system the run is allowed on, e.g., "macos" or "linux".
    pub platform: String,

    /// Remote URL of the configuration repository to clone.
    pub repository: String,

    /// Checkout path to clone the configuration repository to.
    pub checkout: CheckoutDir,
}

/// Package manager settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct PackageManager {
    /// Name of the package manager binary, e.g., "brew".
    pub bin: String,

    /// Upstream installer script to pipe through bash when the binary is
    /// missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installer_url: Option<String>,

    /// Packages to install.
    #[serde(default)]
    pub packages: Vec<String>,
}

/// One file to symlink out of the checkout.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct LinkEntry {
    /// Path of the source relative to the checkout. May contain a glob
    /// pattern, in which case the entry is treated as optional and each match
    /// is linked under the target directory by base name.
    pub source: String,

    /// Absolute path the symlink should live at after expansion.
    pub target: PathBuf,
}

/// Path acting as the checkout location of the configuration repository.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct CheckoutDir(PathBuf);

impl CheckoutDir {
    /// Construct new checkout directory path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Treat checkout directory as [`Path`] slice.
    pub fn as_path(&self) -> &Path {
        self.0.as_path()
    }
}

impl Display for CheckoutDir {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_path().to_string_lossy().as_ref())
    }
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize manifest.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize manifest.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on manifest.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
