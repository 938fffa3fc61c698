//! Package reconciliation against declarative per-manager lists.
//!
//! The declared list is a plain newline-delimited text file under the
//! storage root. Installation state is queried from the external package
//! manager each time; nothing is cached or persisted.

use anyhow::{Context, Result};
use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use crate::domain::{PackageManagerConfig, PKG_PLACEHOLDER};

#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub installed: Vec<String>,
    pub not_installed: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkgOp {
    Install,
    Remove,
}

impl PkgOp {
    pub fn verb(&self) -> &'static str {
        match self {
            PkgOp::Install => "install",
            PkgOp::Remove => "remove",
        }
    }
}

/// Outcome of one package's install/remove invocation.
#[derive(Debug, Clone)]
pub struct PkgAction {
    pub package: String,
    pub op: PkgOp,
    pub success: bool,
    pub detail: Option<String>,
}

/// Parse the declared package list: trimmed lines, blanks and `#` comments
/// dropped, order preserved, duplicates kept.
pub fn load_declared(list_path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(list_path).with_context(|| {
        format!("Failed to read package list {}", list_path.display())
    })?;
    Ok(parse_list(&contents))
}

fn parse_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Create the list file with its default content if it does not exist yet.
pub fn ensure_list(list_path: &Path, default_content: &str) -> Result<()> {
    if list_path.exists() {
        return Ok(());
    }
    if let Some(parent) = list_path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create package list directory {}", parent.display())
        })?;
    }
    fs::write(list_path, default_content).with_context(|| {
        format!("Failed to create package list {}", list_path.display())
    })?;
    Ok(())
}

fn render(template: &str, package: &str) -> String {
    let quoted = shell_escape::escape(Cow::from(package));
    template.replace(PKG_PLACEHOLDER, &quoted)
}

fn run_template(template: &str, package: &str) -> std::io::Result<Output> {
    Command::new("sh")
        .arg("-c")
        .arg(render(template, package))
        .output()
}

/// A package counts as installed when the status command succeeds and
/// prints something. Execution errors (non-zero exit, manager absent)
/// degrade to "not installed" instead of propagating.
pub fn is_installed(package: &str, manager: &PackageManagerConfig) -> bool {
    match run_template(&manager.status, package) {
        Ok(output) => {
            output.status.success()
                && !String::from_utf8_lossy(&output.stdout).trim().is_empty()
        }
        Err(_) => false,
    }
}

/// Split the declared packages by installation state, preserving input
/// order within each group.
pub fn partition(packages: &[String], manager: &PackageManagerConfig, progress: bool) -> Partition {
    let pb = if progress {
        Some(crate::ui::progress_bar(
            packages.len() as u64,
            "Querying package status",
        ))
    } else {
        None
    };

    let mut partition = Partition::default();
    for package in packages {
        if is_installed(package, manager) {
            partition.installed.push(package.clone());
        } else {
            partition.not_installed.push(package.clone());
        }
        if let Some(ref pb) = pb {
            pb.inc(1);
        }
    }

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    partition
}

pub fn install(packages: &[String], manager: &PackageManagerConfig) -> Vec<PkgAction> {
    run_batch(packages, &manager.install, PkgOp::Install)
}

pub fn remove(packages: &[String], manager: &PackageManagerConfig) -> Vec<PkgAction> {
    run_batch(packages, &manager.remove, PkgOp::Remove)
}

// One package at a time, strictly ordered; a failure is recorded and the
// batch moves on.
fn run_batch(packages: &[String], template: &str, op: PkgOp) -> Vec<PkgAction> {
    let mut actions = Vec::new();
    for package in packages {
        let action = match run_template(template, package) {
            Ok(output) if output.status.success() => PkgAction {
                package: package.clone(),
                op,
                success: true,
                detail: None,
            },
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let detail = match stderr.trim().lines().last() {
                    Some(line) if !line.is_empty() => line.to_string(),
                    _ => output.status.to_string(),
                };
                PkgAction {
                    package: package.clone(),
                    op,
                    success: false,
                    detail: Some(detail),
                }
            }
            Err(e) => PkgAction {
                package: package.clone(),
                op,
                success: false,
                detail: Some(e.to_string()),
            },
        };
        actions.push(action);
    }
    actions
}

/// Whether the manager's binary is on PATH. Used by diagnostics; the
/// reconciliation itself degrades gracefully without it.
pub fn manager_available(name: &str) -> bool {
    which::which(name).is_ok()
}
