//! Symlink reconciliation between live locations and the storage tree.
//!
//! For every (domain, family) pair the declared paths are classified into
//! one of four states, and `import` closes the gap: live content is copied
//! into storage once, then the live path is replaced by a symlink pointing
//! at the stored copy. Stored content is the source of truth; it is never
//! overwritten by a later import.

use anyhow::{Context, Result};
use chrono::Utc;
use colored::*;
use std::fs;
use std::os::unix::fs as unix_fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::domain::Domain;
use crate::paths::PathContext;
use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// No paths declared for this family.
    Incompatible,
    /// None of the declared paths exist under storage.
    NotImported,
    /// Some, but not all, declared paths exist under storage.
    PartiallyImported,
    /// Every declared path exists under storage.
    FullyImported,
}

impl LinkStatus {
    pub fn label(&self) -> ColoredString {
        match self {
            LinkStatus::Incompatible => "incompatible".dimmed(),
            LinkStatus::NotImported => "not imported".red(),
            LinkStatus::PartiallyImported => "partial".yellow(),
            LinkStatus::FullyImported => "imported".green(),
        }
    }
}

/// Classification result for one (domain, family) pair.
#[derive(Debug, Clone)]
pub struct LinkReport {
    pub status: LinkStatus,
    pub imported: Vec<String>,
    pub missing: Vec<String>,
}

impl LinkReport {
    pub fn total(&self) -> usize {
        self.imported.len() + self.missing.len()
    }

    pub fn imported_count(&self) -> usize {
        self.imported.len()
    }
}

#[derive(Debug, Clone)]
pub struct ImportOpts {
    /// Back up a live file before discarding it in favor of stored content.
    pub backup: bool,
}

impl Default for ImportOpts {
    fn default() -> Self {
        ImportOpts { backup: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Linked,
    AlreadyLinked,
    Failed,
}

impl ImportOutcome {
    pub fn label(&self) -> ColoredString {
        match self {
            ImportOutcome::Linked => "Linked".green(),
            ImportOutcome::AlreadyLinked => "Already linked".dimmed(),
            ImportOutcome::Failed => "Failed".red(),
        }
    }
}

/// Outcome of one declared path's import.
#[derive(Debug, Clone)]
pub struct ImportAction {
    pub entry: String,
    pub live: PathBuf,
    pub stored: PathBuf,
    pub outcome: ImportOutcome,
    pub reason: Option<String>,
    pub backup_created: bool,
}

fn domain_root(ctx: &PathContext, domain: &Domain) -> PathBuf {
    ctx.storage_root
        .join(domain.kind.storage_dir())
        .join(&domain.name)
}

/// Classify the link state of a domain for one OS family.
///
/// A declared path counts as imported when its storage location exists,
/// whether or not the live path has been converted to a link yet.
/// Side-effect free; recomputed from the filesystem on every call.
pub fn classify(ctx: &PathContext, domain: &Domain, family: &str) -> LinkReport {
    let Some(declared) = domain.paths_for(family) else {
        return LinkReport {
            status: LinkStatus::Incompatible,
            imported: Vec::new(),
            missing: Vec::new(),
        };
    };

    let root = domain_root(ctx, domain);
    let mut imported = Vec::new();
    let mut missing = Vec::new();

    for entry in declared {
        let live = ctx.expand(entry);
        let stored = ctx.storage_path_under(&root, &live);
        if fs::symlink_metadata(&stored).is_ok() {
            imported.push(entry.clone());
        } else {
            missing.push(entry.clone());
        }
    }

    let status = if imported.is_empty() {
        LinkStatus::NotImported
    } else if missing.is_empty() {
        LinkStatus::FullyImported
    } else {
        LinkStatus::PartiallyImported
    };

    LinkReport {
        status,
        imported,
        missing,
    }
}

/// Import declared paths into storage and link the live locations back.
///
/// `selection` empty means every declared path. Per-path failures are
/// recorded in the returned actions and never abort the batch; an unknown
/// selection entry or an incompatible family fails the whole call before
/// anything is touched.
pub fn import(
    ctx: &PathContext,
    domain: &Domain,
    family: &str,
    selection: &[String],
    opts: &ImportOpts,
) -> Result<Vec<ImportAction>> {
    let Some(declared) = domain.paths_for(family) else {
        anyhow::bail!(
            "Domain {} has no managed paths for family {}",
            domain.name,
            family
        );
    };

    for entry in selection {
        if !declared.contains(entry) {
            anyhow::bail!("Path {} is not declared for domain {}", entry, domain.name);
        }
    }

    let entries: Vec<&String> = declared
        .iter()
        .filter(|entry| selection.is_empty() || selection.contains(*entry))
        .collect();

    let root = domain_root(ctx, domain);
    let mut actions = Vec::new();
    for entry in entries {
        actions.push(import_entry(ctx, &root, entry, opts));
    }
    Ok(actions)
}

fn failed_action(entry: &str, live: &Path, stored: &Path, reason: String) -> ImportAction {
    ImportAction {
        entry: entry.to_string(),
        live: live.to_path_buf(),
        stored: stored.to_path_buf(),
        outcome: ImportOutcome::Failed,
        reason: Some(reason),
        backup_created: false,
    }
}

fn import_entry(ctx: &PathContext, root: &Path, entry: &str, opts: &ImportOpts) -> ImportAction {
    let live = ctx.expand(entry);
    let stored = ctx.storage_path_under(root, &live);

    let Ok(live_meta) = fs::symlink_metadata(&live) else {
        return failed_action(entry, &live, &stored, "source not found".to_string());
    };

    if live_meta.file_type().is_symlink() {
        match fs::canonicalize(&live) {
            Ok(resolved) => {
                let stored_canon = fs::canonicalize(&stored).unwrap_or_else(|_| stored.clone());
                if resolved == stored_canon {
                    return ImportAction {
                        entry: entry.to_string(),
                        live,
                        stored,
                        outcome: ImportOutcome::AlreadyLinked,
                        reason: None,
                        backup_created: false,
                    };
                }
                // A link elsewhere: its target's content is imported below.
            }
            Err(_) => {
                return failed_action(
                    entry,
                    &live,
                    &stored,
                    "broken or circular symbolic link".to_string(),
                )
            }
        }
    }

    let stored_exists = fs::symlink_metadata(&stored).is_ok();
    if !stored_exists {
        // Copy must complete before the live path is touched, so a crash
        // in between leaves the original file intact.
        if let Err(e) = copy_into_storage(&live, &stored) {
            return failed_action(entry, &live, &stored, format!("copy failed: {:#}", e));
        }
    }

    // Stored content wins from here on; the live path only changes shape.
    let backup = opts.backup && stored_exists && !live_meta.file_type().is_symlink();
    match replace_with_link(&live, &stored, backup) {
        Ok(backup_created) => ImportAction {
            entry: entry.to_string(),
            live,
            stored,
            outcome: ImportOutcome::Linked,
            reason: None,
            backup_created,
        },
        Err(e) => failed_action(entry, &live, &stored, format!("link failed: {:#}", e)),
    }
}

fn copy_into_storage(live: &Path, stored: &Path) -> Result<()> {
    if let Some(parent) = stored.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create storage directory {}", parent.display())
        })?;
    }

    let metadata = fs::metadata(live)
        .with_context(|| format!("Failed to stat {}", live.display()))?;
    if metadata.is_dir() {
        copy_dir_recursive(live, stored)
    } else {
        copy_file_with_metadata(live, stored)
    }
}

// Mirrors a directory tree into storage. Per-entry failures are reported
// and do not stop sibling entries. Directory permission bits are applied
// after the walk so a read-only source directory cannot block its own
// children from being written.
fn copy_dir_recursive(source: &Path, target: &Path) -> Result<()> {
    let mut dir_permissions: Vec<(PathBuf, fs::Permissions)> = Vec::new();

    for entry in WalkDir::new(source).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                ui::warn(&format!("Skipping unreadable entry: {}", e));
                continue;
            }
        };
        let Ok(rel) = entry.path().strip_prefix(source) else {
            continue;
        };
        let dest = target.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if let Err(e) = fs::create_dir_all(&dest) {
                ui::warn(&format!("Failed to create {}: {}", dest.display(), e));
                continue;
            }
            if let Ok(metadata) = entry.metadata() {
                dir_permissions.push((dest, metadata.permissions()));
            }
        } else if file_type.is_symlink() {
            // Inner links are preserved as links rather than resolved.
            match fs::read_link(entry.path()) {
                Ok(link_target) => {
                    if fs::symlink_metadata(&dest).is_ok() {
                        let _ = fs::remove_file(&dest);
                    }
                    if let Err(e) = unix_fs::symlink(&link_target, &dest) {
                        ui::warn(&format!("Failed to link {}: {}", dest.display(), e));
                    }
                }
                Err(e) => {
                    ui::warn(&format!(
                        "Failed to read link {}: {}",
                        entry.path().display(),
                        e
                    ));
                }
            }
        } else if let Err(e) = copy_file_with_metadata(entry.path(), &dest) {
            ui::warn(&format!(
                "Failed to copy {}: {:#}",
                entry.path().display(),
                e
            ));
        }
    }

    for (dir, permissions) in dir_permissions.into_iter().rev() {
        if let Err(e) = fs::set_permissions(&dir, permissions) {
            ui::warn(&format!(
                "Failed to set permissions on {}: {}",
                dir.display(),
                e
            ));
        }
    }

    Ok(())
}

fn copy_file_with_metadata(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::copy(source, target).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            source.display(),
            target.display()
        )
    })?;

    let metadata = source.metadata()?;
    fs::set_permissions(target, metadata.permissions())?;

    // Preserve modification time (best effort)
    if let Ok(mtime) = metadata.modified() {
        filetime::set_file_mtime(target, filetime::FileTime::from_system_time(mtime))?;
    }

    Ok(())
}

fn replace_with_link(live: &Path, stored: &Path, backup: bool) -> Result<bool> {
    let metadata = fs::symlink_metadata(live)?;
    let mut backup_created = false;

    if backup {
        create_backup(live)?;
        backup_created = true;
    }

    if metadata.is_dir() {
        fs::remove_dir_all(live)
            .with_context(|| format!("Failed to remove {}", live.display()))?;
    } else {
        fs::remove_file(live)
            .with_context(|| format!("Failed to remove {}", live.display()))?;
    }

    unix_fs::symlink(stored, live).with_context(|| {
        format!(
            "Failed to symlink {} -> {}",
            live.display(),
            stored.display()
        )
    })?;

    Ok(backup_created)
}

fn create_backup(path: &Path) -> Result<()> {
    let timestamp = Utc::now().format("%Y%m%d-%H%M%S");
    let backup_path = PathBuf::from(format!("{}.bak.{}", path.display(), timestamp));

    if path.is_dir() {
        let mut options = fs_extra::dir::CopyOptions::new();
        options.copy_inside = true;
        fs_extra::dir::copy(path, &backup_path, &options)
            .with_context(|| format!("Failed to backup directory {}", path.display()))?;
    } else {
        fs::copy(path, &backup_path)
            .with_context(|| format!("Failed to backup file {}", path.display()))?;
    }

    ui::info(&format!("Backed up to {}", backup_path.display()));
    Ok(())
}
