// SPDX-FileCopyrightText: 2026 Dotup Contributors
// SPDX-License-Identifier: MIT

use crate::{write_tree, StubInstaller};

use dotup::{Bootstrap, BootstrapError, BootstrapReport, Manifest};

use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::{env, fs, path::PathBuf};

fn manifest_for(cwd: &PathBuf, platform: &str) -> anyhow::Result<Manifest> {
    let manifest = format!(
        r#"
        [settings]
        description = "integration fixture"
        platform = "{platform}"
        repository = "https://example.org/dotfiles.git"
        checkout = "{checkout}"

        [package_manager]
        bin = "stub"
        packages = ["git", "tmux"]

        [[link]]
        source = "vimrc"
        target = "{home}/.vimrc"

        [[link]]
        source = "config/*"
        target = "{home}/.config"

        [[link]]
        source = "themes/*"
        target = "{home}/.themes"
        "#,
        checkout = cwd.join("checkout").display(),
        home = cwd.join("home").display(),
    )
    .parse()?;

    Ok(manifest)
}

#[sealed_test]
fn bootstrap_links_manifest_entries() -> anyhow::Result<()> {
    let cwd = env::current_dir()?;
    write_tree(
        cwd.join("checkout"),
        &[
            ("vimrc", "set number"),
            ("config/alacritty.toml", "[font]"),
            ("config/kitty.conf", "font_size 12"),
        ],
    )?;
    // Pre-existing original that must survive as a backup.
    write_tree(cwd.join("home"), &[(".vimrc", "old settings")])?;

    let manifest = manifest_for(&cwd, env::consts::OS)?;
    let installer = StubInstaller::default();
    let packages = installer.installed.clone();
    let bootstrap = Bootstrap::new(manifest, Some(installer), cwd.join("backups"));

    let report = bootstrap.run()?;
    assert_eq!(
        report,
        BootstrapReport {
            created: 2,
            replaced: 1,
            relinked: 0,
            unchanged: 0,
        }
    );

    // Declared packages reached the installer.
    assert_eq!(*packages.borrow(), vec!["git".to_string(), "tmux".to_string()]);

    // Targets are symlinks resolving to checkout content.
    assert_eq!(fs::read_to_string(cwd.join("home/.vimrc"))?, "set number");
    assert_eq!(
        fs::read_link(cwd.join("home/.vimrc"))?,
        cwd.join("checkout/vimrc")
    );
    assert_eq!(
        fs::read_to_string(cwd.join("home/.config/alacritty.toml"))?,
        "[font]"
    );
    assert_eq!(
        fs::read_to_string(cwd.join("home/.config/kitty.conf"))?,
        "font_size 12"
    );

    // Displaced original landed under the per-run backup root.
    let mut runs = fs::read_dir(cwd.join("backups"))?.collect::<Result<Vec<_>, _>>()?;
    assert_eq!(runs.len(), 1);
    let backup_root = runs.remove(0).path();
    assert_eq!(
        fs::read_to_string(backup_root.join(".vimrc"))?,
        "old settings"
    );

    Ok(())
}

#[sealed_test]
fn bootstrap_collects_one_backup_root_per_run() -> anyhow::Result<()> {
    let cwd = env::current_dir()?;
    write_tree(
        cwd.join("checkout"),
        &[("vimrc", "set number"), ("config/kitty.conf", "font_size 12")],
    )?;
    write_tree(
        cwd.join("home"),
        &[(".vimrc", "old vimrc"), (".config/kitty.conf", "old kitty")],
    )?;

    let manifest = manifest_for(&cwd, env::consts::OS)?;
    let bootstrap = Bootstrap::new(manifest, Some(StubInstaller::default()), cwd.join("backups"));

    let report = bootstrap.run()?;
    assert_eq!(report.replaced, 2);

    // Both displacements share one backup root named with the run's start
    // timestamp.
    let mut runs = fs::read_dir(cwd.join("backups"))?.collect::<Result<Vec<_>, _>>()?;
    assert_eq!(runs.len(), 1);
    let backup_root = runs.remove(0).path();
    let stamp = backup_root.file_name().unwrap().to_string_lossy().into_owned();
    assert!(chrono::NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%d-%H%M%S").is_ok());
    assert_eq!(fs::read_to_string(backup_root.join(".vimrc"))?, "old vimrc");
    assert_eq!(
        fs::read_to_string(backup_root.join("kitty.conf"))?,
        "old kitty"
    );

    Ok(())
}

#[sealed_test]
fn bootstrap_rerun_is_idempotent() -> anyhow::Result<()> {
    let cwd = env::current_dir()?;
    write_tree(
        cwd.join("checkout"),
        &[("vimrc", "set number"), ("config/kitty.conf", "font_size 12")],
    )?;

    let manifest = manifest_for(&cwd, env::consts::OS)?;
    let first = Bootstrap::new(
        manifest.clone(),
        Some(StubInstaller::default()),
        cwd.join("backups"),
    );
    first.run()?;

    let second = Bootstrap::new(manifest, Some(StubInstaller::default()), cwd.join("backups"));
    let report = second.run()?;

    assert_eq!(
        report,
        BootstrapReport {
            created: 0,
            replaced: 0,
            relinked: 0,
            unchanged: 2,
        }
    );

    Ok(())
}

#[sealed_test]
fn bootstrap_rejects_wrong_platform() -> anyhow::Result<()> {
    let cwd = env::current_dir()?;
    write_tree(cwd.join("checkout"), &[("vimrc", "set number")])?;

    let manifest = manifest_for(&cwd, "plan9")?;
    let bootstrap = Bootstrap::new(manifest, Some(StubInstaller::default()), cwd.join("backups"));

    let result = bootstrap.run();
    assert!(matches!(
        result,
        Err(BootstrapError::UnsupportedPlatform { .. })
    ));
    // Fail-fast: nothing was linked.
    assert!(!cwd.join("home").exists());

    Ok(())
}

#[sealed_test]
fn bootstrap_rejects_missing_link_source() -> anyhow::Result<()> {
    let cwd = env::current_dir()?;
    // Checkout exists, but the plain "vimrc" entry is missing from it.
    write_tree(cwd.join("checkout"), &[("config/kitty.conf", "font_size 12")])?;

    let manifest = manifest_for(&cwd, env::consts::OS)?;
    let bootstrap = Bootstrap::new(manifest, Some(StubInstaller::default()), cwd.join("backups"));

    let result = bootstrap.run();
    assert!(matches!(
        result,
        Err(BootstrapError::MissingLinkSource { .. })
    ));

    Ok(())
}
