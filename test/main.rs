// SPDX-FileCopyrightText: 2026 Dotup Contributors
// SPDX-License-Identifier: MIT

mod integration;

use dotup::bootstrap::pkg::{self, PackageInstall};

use anyhow::Result;
use std::{cell::RefCell, fs, path::Path, rc::Rc};

/// Package installer stand-in that records what it was asked to install.
#[derive(Clone, Debug, Default)]
pub(crate) struct StubInstaller {
    pub(crate) installed: Rc<RefCell<Vec<String>>>,
}

impl PackageInstall for StubInstaller {
    fn is_installed(&self) -> bool {
        true
    }

    fn install_self(&self) -> pkg::Result<()> {
        Ok(())
    }

    fn install_packages(&self, packages: &[String]) -> pkg::Result<()> {
        self.installed.borrow_mut().extend_from_slice(packages);
        Ok(())
    }
}

/// Lay out a file tree under `root` from (relative path, contents) pairs.
pub(crate) fn write_tree(root: impl AsRef<Path>, files: &[(&str, &str)]) -> Result<()> {
    for (path, contents) in files {
        let full = root.as_ref().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(full, contents)?;
    }

    Ok(())
}
