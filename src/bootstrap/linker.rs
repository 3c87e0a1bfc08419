// SPDX-FileCopyrightText: 2026 Dotup Contributors
// SPDX-License-Identifier: MIT

//! Backup-and-link routine.
//!
//! Utilities to make a target path become a symbolic link to a source path
//! without losing whatever the user already had at the target.
//!
//! # Backup Root
//!
//! Each bootstrap run owns a single __backup root__: a directory named with
//! the run's start timestamp, nested under a backup parent directory. Every
//! regular file or directory displaced during the run is moved into the
//! backup root, keyed by its base name. The backup root is only created on
//! the first displacement, so a run that touches nothing leaves nothing
//! behind.
//!
//! Two displaced originals that share a base name would land on the same
//! backup path. Instead of silently overwriting the first one, the second
//! displacement fails the run with [`LinkError::BackupCollision`].
//!
//! # Symlink Handling
//!
//! A target that is already a symlink is simply repointed: the stale link is
//! removed without backup, since the file content it refers to still lives at
//! the old link destination. A symlink that already points at the requested
//! source is left untouched, which makes the routine idempotent.

use chrono::Local;
use std::{
    fs,
    io::ErrorKind,
    os::unix::fs::symlink,
    path::{Path, PathBuf},
};
use tracing::debug;

/// A single request to symlink `target` to `source`.
///
/// Callers ensure that `source` exists before handing the request to
/// [`Linker::link`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkRequest {
    /// Path the symlink should resolve to.
    pub source: PathBuf,

    /// Path the symlink should live at.
    pub target: PathBuf,
}

impl LinkRequest {
    /// Construct new link request.
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Per-run directory collecting displaced originals.
#[derive(Clone, Debug)]
pub struct BackupRoot {
    dir: PathBuf,
}

impl BackupRoot {
    /// Construct new backup root under target parent directory.
    ///
    /// The backup root is named with the current timestamp, and is not
    /// created on the file system until the first displacement happens.
    pub fn new(parent: impl Into<PathBuf>) -> Self {
        let stamp = Local::now().format("%Y-%m-%d-%H%M%S").to_string();
        Self {
            dir: parent.into().join(stamp),
        }
    }

    /// Absolute path of the backup root.
    pub fn path(&self) -> &Path {
        self.dir.as_path()
    }

    /// Move `original` into the backup root under its base name.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::CreateBackupRoot`] if the backup root cannot be
    ///   created.
    /// - Return [`LinkError::NoBaseName`] if the original has no base name to
    ///   key the backup under.
    /// - Return [`LinkError::BackupCollision`] if a same-named backup already
    ///   exists in this run.
    /// - Return [`LinkError::Backup`] if the original cannot be moved.
    fn store(&self, original: &Path) -> Result<PathBuf> {
        mkdirp::mkdirp(&self.dir).map_err(|err| LinkError::CreateBackupRoot {
            source: err,
            backup_root: self.dir.clone(),
        })?;

        let name = original.file_name().ok_or_else(|| LinkError::NoBaseName {
            target: original.to_path_buf(),
        })?;
        let backup = self.dir.join(name);

        // INVARIANT: Never overwrite a backup taken earlier in the same run.
        if backup.symlink_metadata().is_ok() {
            return Err(LinkError::BackupCollision { backup });
        }

        fs::rename(original, &backup).map_err(|err| LinkError::Backup {
            source: err,
            original: original.to_path_buf(),
            backup: backup.clone(),
        })?;

        Ok(backup)
    }
}

/// What [`Linker::link`] did to the target path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Target did not exist. Symlink was created fresh.
    Created,

    /// Target was a regular file or directory. It was moved into the backup
    /// root before the symlink was created.
    Replaced {
        /// Where the displaced original now lives.
        backup: PathBuf,
    },

    /// Target was a symlink pointing elsewhere. It was repointed without
    /// backup.
    Relinked,

    /// Target was already a symlink to the requested source. Nothing to do.
    Unchanged,
}

/// Ensure targets become symbolic links to sources, preserving originals.
#[derive(Clone, Debug)]
pub struct Linker {
    backup_root: BackupRoot,
}

impl Linker {
    /// Construct new linker that displaces originals into `backup_root`.
    pub fn new(backup_root: BackupRoot) -> Self {
        Self { backup_root }
    }

    /// Backup root the linker displaces originals into.
    pub fn backup_root(&self) -> &BackupRoot {
        &self.backup_root
    }

    /// Make the request's target a symlink to the request's source.
    ///
    /// Creates the target's parent directory when absent. Any pre-existing
    /// regular file or directory at the target is moved into the backup root
    /// first. A pre-existing symlink is repointed without backup.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::CreateParentDir`] if the target's parent
    ///   directory cannot be created.
    /// - Return [`LinkError::BackupCollision`] if a same-named backup already
    ///   exists in this run.
    /// - Return [`LinkError::Backup`] if the original cannot be moved into
    ///   the backup root.
    /// - Return [`LinkError::RemoveStaleLink`] if a stale symlink cannot be
    ///   removed.
    /// - Return [`LinkError::CreateSymlink`] if the symlink itself cannot be
    ///   created.
    pub fn link(&self, request: &LinkRequest) -> Result<LinkOutcome> {
        let LinkRequest { source, target } = request;

        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                mkdirp::mkdirp(parent).map_err(|err| LinkError::CreateParentDir {
                    source: err,
                    parent: parent.to_path_buf(),
                })?;
            }
        }

        match target.symlink_metadata() {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                if fs::read_link(target).map(|dest| &dest == source).unwrap_or(false) {
                    debug!("{} already links to {}", target.display(), source.display());
                    return Ok(LinkOutcome::Unchanged);
                }

                // INVARIANT: Stale symlinks are replaced without backup.
                fs::remove_file(target).map_err(|err| LinkError::RemoveStaleLink {
                    source: err,
                    target: target.clone(),
                })?;
                self.place(source, target)?;

                Ok(LinkOutcome::Relinked)
            }
            Ok(_) => {
                let backup = self.backup_root.store(target)?;
                self.place(source, target)?;

                Ok(LinkOutcome::Replaced { backup })
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.place(source, target)?;

                Ok(LinkOutcome::Created)
            }
            Err(err) => Err(LinkError::Inspect {
                source: err,
                target: target.clone(),
            }),
        }
    }

    fn place(&self, source: &Path, target: &Path) -> Result<()> {
        symlink(source, target).map_err(|err| LinkError::CreateSymlink {
            source: err,
            link_source: source.to_path_buf(),
            target: target.to_path_buf(),
        })
    }
}

/// Backup-and-link error types.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Target's parent directory cannot be created.
    #[error("failed to create parent directory at {:?}", parent.display())]
    CreateParentDir {
        #[source]
        source: std::io::Error,
        parent: PathBuf,
    },

    /// Backup root directory cannot be created.
    #[error("failed to create backup root at {:?}", backup_root.display())]
    CreateBackupRoot {
        #[source]
        source: std::io::Error,
        backup_root: PathBuf,
    },

    /// A same-named backup already exists in this run.
    #[error("backup already exists at {:?}", backup.display())]
    BackupCollision { backup: PathBuf },

    /// Target has no base name to key the backup under.
    #[error("target {:?} has no base name", target.display())]
    NoBaseName { target: PathBuf },

    /// Original cannot be moved into the backup root.
    #[error("failed to move {:?} to backup at {:?}", original.display(), backup.display())]
    Backup {
        #[source]
        source: std::io::Error,
        original: PathBuf,
        backup: PathBuf,
    },

    /// Stale symlink cannot be removed from target path.
    #[error("failed to remove stale symlink at {:?}", target.display())]
    RemoveStaleLink {
        #[source]
        source: std::io::Error,
        target: PathBuf,
    },

    /// Symlink cannot be created at target path.
    #[error("failed to symlink {:?} to {:?}", target.display(), link_source.display())]
    CreateSymlink {
        #[source]
        source: std::io::Error,
        link_source: PathBuf,
        target: PathBuf,
    },

    /// Target path cannot be inspected at all.
    #[error("failed to inspect {:?}", target.display())]
    Inspect {
        #[source]
        source: std::io::Error,
        target: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = LinkError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::{env, fs, os::unix::fs::symlink, path::PathBuf};

    fn fixture() -> anyhow::Result<(PathBuf, Linker)> {
        let cwd = env::current_dir()?;
        fs::create_dir_all(cwd.join("repo"))?;
        fs::write(cwd.join("repo/vimrc"), "set number")?;
        let linker = Linker::new(BackupRoot::new(cwd.join("backups")));
        Ok((cwd, linker))
    }

    #[sealed_test]
    fn link_creates_fresh_symlink_with_parent_dirs() -> anyhow::Result<()> {
        let (cwd, linker) = fixture()?;

        let request = LinkRequest::new(cwd.join("repo/vimrc"), cwd.join("home/nested/.vimrc"));
        let outcome = linker.link(&request)?;

        assert_eq!(outcome, LinkOutcome::Created);
        assert_eq!(fs::read_link(&request.target)?, request.source);
        assert_eq!(fs::read_to_string(&request.target)?, "set number");

        Ok(())
    }

    #[sealed_test]
    fn link_backs_up_regular_file() -> anyhow::Result<()> {
        let (cwd, linker) = fixture()?;
        fs::create_dir_all(cwd.join("home"))?;
        fs::write(cwd.join("home/.vimrc"), "old settings")?;

        let request = LinkRequest::new(cwd.join("repo/vimrc"), cwd.join("home/.vimrc"));
        let outcome = linker.link(&request)?;

        let backup = match outcome {
            LinkOutcome::Replaced { backup } => backup,
            other => panic!("expected Replaced, got {other:?}"),
        };
        assert_eq!(fs::read_to_string(&backup)?, "old settings");
        assert_eq!(fs::read_link(&request.target)?, request.source);

        Ok(())
    }

    #[sealed_test]
    fn link_backs_up_directory() -> anyhow::Result<()> {
        let (cwd, linker) = fixture()?;
        fs::create_dir_all(cwd.join("repo/nvim"))?;
        fs::create_dir_all(cwd.join("home/nvim"))?;
        fs::write(cwd.join("home/nvim/init.lua"), "old init")?;

        let request = LinkRequest::new(cwd.join("repo/nvim"), cwd.join("home/nvim"));
        let outcome = linker.link(&request)?;

        let backup = match outcome {
            LinkOutcome::Replaced { backup } => backup,
            other => panic!("expected Replaced, got {other:?}"),
        };
        assert_eq!(fs::read_to_string(backup.join("init.lua"))?, "old init");
        assert_eq!(fs::read_link(&request.target)?, request.source);

        Ok(())
    }

    #[sealed_test]
    fn link_repoints_stale_symlink_without_backup() -> anyhow::Result<()> {
        let (cwd, linker) = fixture()?;
        fs::write(cwd.join("repo/other"), "somewhere else")?;
        fs::create_dir_all(cwd.join("home"))?;
        symlink(cwd.join("repo/other"), cwd.join("home/.vimrc"))?;

        let request = LinkRequest::new(cwd.join("repo/vimrc"), cwd.join("home/.vimrc"));
        let outcome = linker.link(&request)?;

        assert_eq!(outcome, LinkOutcome::Relinked);
        assert_eq!(fs::read_link(&request.target)?, request.source);
        // No displacement happened, so no backup root either.
        assert!(!linker.backup_root().path().exists());

        Ok(())
    }

    #[sealed_test]
    fn link_is_idempotent() -> anyhow::Result<()> {
        let (cwd, linker) = fixture()?;

        let request = LinkRequest::new(cwd.join("repo/vimrc"), cwd.join("home/.vimrc"));
        assert_eq!(linker.link(&request)?, LinkOutcome::Created);
        assert_eq!(linker.link(&request)?, LinkOutcome::Unchanged);
        assert_eq!(fs::read_link(&request.target)?, request.source);
        assert!(!linker.backup_root().path().exists());

        Ok(())
    }

    #[sealed_test]
    fn link_rejects_backup_collision() -> anyhow::Result<()> {
        let (cwd, linker) = fixture()?;
        fs::create_dir_all(cwd.join("home/a"))?;
        fs::create_dir_all(cwd.join("home/b"))?;
        fs::write(cwd.join("home/a/.vimrc"), "first original")?;
        fs::write(cwd.join("home/b/.vimrc"), "second original")?;

        let first = LinkRequest::new(cwd.join("repo/vimrc"), cwd.join("home/a/.vimrc"));
        let second = LinkRequest::new(cwd.join("repo/vimrc"), cwd.join("home/b/.vimrc"));
        linker.link(&first)?;
        let result = linker.link(&second);

        assert!(matches!(result, Err(LinkError::BackupCollision { .. })));
        // First backup must survive intact.
        let backup = linker.backup_root().path().join(".vimrc");
        assert_eq!(fs::read_to_string(backup)?, "first original");
        // Second original must remain in place.
        assert_eq!(fs::read_to_string(cwd.join("home/b/.vimrc"))?, "second original");

        Ok(())
    }
}
