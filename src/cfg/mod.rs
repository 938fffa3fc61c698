use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::domain::DomainKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,

    /// Back up live files before they are replaced by links.
    #[serde(default = "default_backup")]
    pub backup: bool,

    /// Pin the OS family instead of detecting it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_override: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_root: default_storage_root(),
            backup: default_backup(),
            family_override: None,
        }
    }
}

fn default_storage_root() -> PathBuf {
    dirs::home_dir()
        .expect("Could not find home directory")
        .join(".dotkeep")
        .join("storage")
}

fn default_backup() -> bool {
    true
}

pub fn init(config_path: &Path, storage_root: Option<PathBuf>, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    let mut config = Config::default();
    if let Some(root) = storage_root {
        config.storage_root = root;
    }

    let toml_string = toml::to_string_pretty(&config).context("Failed to serialize config")?;
    fs::write(config_path, toml_string).context("Failed to write config file")?;

    // Storage skeleton, one subtree per domain kind
    for kind in [DomainKind::Os, DomainKind::Ide, DomainKind::Terminal] {
        fs::create_dir_all(config.storage_root.join(kind.storage_dir()))
            .context("Failed to create storage directory")?;
    }

    Ok(())
}

pub fn load(config_path: &Path) -> Result<Config> {
    if !config_path.exists() {
        anyhow::bail!(
            "Config not found at {}. Run 'dotkeep init' first.",
            config_path.display()
        );
    }

    let contents = fs::read_to_string(config_path).context("Failed to read config file")?;
    let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
    Ok(config)
}

pub fn save(config_path: &Path, config: &Config) -> Result<()> {
    let toml_string = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(config_path, toml_string).context("Failed to write config file")?;
    Ok(())
}

pub fn edit(config_path: &Path) -> Result<()> {
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    Ok(())
}

pub fn check_exists(config_path: &Path) -> Result<()> {
    if config_path.exists() {
        Ok(())
    } else {
        anyhow::bail!("Config file not found")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_config_and_skeleton() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");
        let storage = temp.path().join("storage");

        init(&config_path, Some(storage.clone()), false).unwrap();

        let config = load(&config_path).unwrap();
        assert_eq!(config.storage_root, storage);
        assert!(config.backup);
        assert!(storage.join("os").is_dir());
        assert!(storage.join("ide").is_dir());
        assert!(storage.join("terminal").is_dir());
    }

    #[test]
    fn test_init_refuses_to_overwrite_without_force() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");
        fs::write(&config_path, "storage_root = \"/tmp/x\"").unwrap();

        assert!(init(&config_path, None, false).is_err());
        assert!(init(&config_path, Some(temp.path().join("s")), true).is_ok());
    }

    #[test]
    fn test_load_missing_config_is_a_setup_error() {
        let temp = TempDir::new().unwrap();
        let err = load(&temp.path().join("config.toml")).unwrap_err();
        assert!(err.to_string().contains("Run 'dotkeep init' first"));
    }
}
