use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

/// Portable stand-in for the user's home directory inside stored paths.
///
/// Stored paths never contain a real home prefix, so the storage tree can
/// move between users and hosts unchanged.
pub const HOME_TOKEN: &str = "@home";

/// Explicit path context threaded through reconciliation calls.
///
/// Carries the home directory and the storage root instead of reading them
/// from the environment at each call site, so tests can run against
/// temporary directories.
#[derive(Debug, Clone)]
pub struct PathContext {
    pub home: PathBuf,
    pub storage_root: PathBuf,
}

impl PathContext {
    pub fn new(home: PathBuf, storage_root: PathBuf) -> Self {
        PathContext { home, storage_root }
    }

    /// Context for the real environment: home from the OS, storage root
    /// from configuration.
    pub fn from_env(storage_root: PathBuf) -> Result<Self> {
        let home = dirs::home_dir().context("Failed to find home directory")?;
        Ok(PathContext { home, storage_root })
    }

    /// Expand the `~` shorthand or the portable home token into a live
    /// absolute path. Anything else passes through unchanged.
    pub fn expand(&self, input: &str) -> PathBuf {
        if let Some(rest) = input.strip_prefix(HOME_TOKEN) {
            if rest.is_empty() {
                return self.home.clone();
            }
            if let Some(rel) = rest.strip_prefix('/') {
                return self.home.join(rel);
            }
        }

        let home = self.home.to_string_lossy();
        let expanded = shellexpand::tilde_with_context(input, || Some(home.as_ref()));
        PathBuf::from(expanded.into_owned())
    }

    /// Canonical display form: a leading home prefix becomes the portable
    /// token. Left inverse of [`expand`](Self::expand) for paths under home.
    pub fn display(&self, live: &Path) -> String {
        match live.strip_prefix(&self.home) {
            Ok(rel) if rel.as_os_str().is_empty() => HOME_TOKEN.to_string(),
            Ok(rel) => format!("{}/{}", HOME_TOKEN, rel.display()),
            Err(_) => live.display().to_string(),
        }
    }

    /// Where a live path is stored under the storage root.
    pub fn storage_path(&self, live: &Path) -> PathBuf {
        self.storage_path_under(&self.storage_root, live)
    }

    /// Where a live path is stored under an arbitrary subtree root.
    ///
    /// Paths under home land in `<root>/@home/<rel>`; other absolute paths
    /// are mirrored with their full directory structure, which keeps the
    /// mapping injective for a fixed root.
    pub fn storage_path_under(&self, root: &Path, live: &Path) -> PathBuf {
        match live.strip_prefix(&self.home) {
            Ok(rel) => root.join(HOME_TOKEN).join(rel),
            Err(_) => {
                let mut out = root.to_path_buf();
                for component in live.components() {
                    if let Component::Normal(part) = component {
                        out.push(part);
                    }
                }
                out
            }
        }
    }
}
