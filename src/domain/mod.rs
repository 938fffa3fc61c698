//! Static catalog of managed environments.
//!
//! A [`Domain`] describes one environment dotkeep knows how to manage: an
//! OS distribution with its package managers, or an IDE/terminal with the
//! configuration files it owns. The catalog is plain data, validated once
//! when the [`DomainRegistry`] is built, and immutable afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use thiserror::Error;

use crate::platform;

/// Substitution placeholder for a package name in command templates.
pub const PKG_PLACEHOLDER: &str = "{pkg}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainKind {
    Os,
    Ide,
    Terminal,
}

impl DomainKind {
    /// Subdirectory of the storage root holding this kind's domains.
    pub fn storage_dir(&self) -> &'static str {
        match self {
            DomainKind::Os => "os",
            DomainKind::Ide => "ide",
            DomainKind::Terminal => "terminal",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DomainKind::Os => "OS",
            DomainKind::Ide => "IDE",
            DomainKind::Terminal => "terminal",
        }
    }

    pub fn parse(input: &str) -> Option<DomainKind> {
        match input.to_ascii_lowercase().as_str() {
            "os" => Some(DomainKind::Os),
            "ide" => Some(DomainKind::Ide),
            "terminal" | "term" => Some(DomainKind::Terminal),
            _ => None,
        }
    }
}

/// How one package manager is driven for an OS domain.
#[derive(Debug, Clone)]
pub struct PackageManagerConfig {
    /// Storage-relative path of the declarative package list.
    pub list_file: PathBuf,
    /// Command templates, each containing exactly one `{pkg}` placeholder.
    pub install: String,
    pub remove: String,
    pub status: String,
    /// Written when the list file is first created.
    pub default_content: String,
}

#[derive(Debug, Clone)]
pub struct Domain {
    pub name: String,
    pub kind: DomainKind,
    pub compatible_families: BTreeSet<String>,
    pub package_managers: BTreeMap<String, PackageManagerConfig>,
    /// Family tag -> ordered list of home-relative paths (`~/` shorthand).
    pub symlink_paths: BTreeMap<String, Vec<String>>,
}

impl Domain {
    pub fn supports(&self, family: &str) -> bool {
        self.compatible_families.contains(family)
    }

    /// Declared paths for a family. Distribution tags fall back to the
    /// generic `linux` table when no exact entry exists.
    pub fn paths_for(&self, family: &str) -> Option<&[String]> {
        if let Some(paths) = self.symlink_paths.get(family) {
            return Some(paths.as_slice());
        }
        if platform::is_linux_family(family) {
            return self.symlink_paths.get("linux").map(|v| v.as_slice());
        }
        None
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate domain name: {0}")]
    DuplicateName(String),
    #[error("domain {0} declares neither package managers nor symlink paths")]
    EmptyDomain(String),
    #[error("domain {domain}: symlink path list for family {family} is empty")]
    EmptyPathList { domain: String, family: String },
    #[error("domain {domain}, manager {manager}: {command} template must contain exactly one {placeholder} placeholder", placeholder = PKG_PLACEHOLDER)]
    BadTemplate {
        domain: String,
        manager: String,
        command: &'static str,
    },
}

/// Immutable lookup table over every known domain.
#[derive(Debug)]
pub struct DomainRegistry {
    domains: Vec<Domain>,
}

impl DomainRegistry {
    pub fn new(domains: Vec<Domain>) -> Result<Self, RegistryError> {
        let mut seen = BTreeSet::new();
        for domain in &domains {
            if !seen.insert(domain.name.clone()) {
                return Err(RegistryError::DuplicateName(domain.name.clone()));
            }
            if domain.package_managers.is_empty() && domain.symlink_paths.is_empty() {
                return Err(RegistryError::EmptyDomain(domain.name.clone()));
            }
            for (family, paths) in &domain.symlink_paths {
                if paths.is_empty() {
                    return Err(RegistryError::EmptyPathList {
                        domain: domain.name.clone(),
                        family: family.clone(),
                    });
                }
            }
            for (manager, config) in &domain.package_managers {
                for (command, template) in [
                    ("install", &config.install),
                    ("remove", &config.remove),
                    ("status", &config.status),
                ] {
                    if template.matches(PKG_PLACEHOLDER).count() != 1 {
                        return Err(RegistryError::BadTemplate {
                            domain: domain.name.clone(),
                            manager: manager.clone(),
                            command,
                        });
                    }
                }
            }
        }
        Ok(DomainRegistry { domains })
    }

    /// The compiled-in catalog.
    pub fn builtin() -> Self {
        DomainRegistry::new(builtin_domains()).expect("builtin domain catalog is valid")
    }

    pub fn by_name(&self, name: &str) -> Option<&Domain> {
        self.domains.iter().find(|d| d.name == name)
    }

    /// Domains of one kind, in registration order.
    pub fn by_kind(&self, kind: DomainKind) -> Vec<&Domain> {
        self.domains.iter().filter(|d| d.kind == kind).collect()
    }

    pub fn by_family(&self, family: &str) -> Vec<&Domain> {
        self.domains.iter().filter(|d| d.supports(family)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Domain> {
        self.domains.iter()
    }
}

fn families(tags: &[&str]) -> BTreeSet<String> {
    tags.iter().map(|t| t.to_string()).collect()
}

fn manager(
    list_file: &str,
    install: &str,
    remove: &str,
    status: &str,
    default_content: &str,
) -> PackageManagerConfig {
    PackageManagerConfig {
        list_file: PathBuf::from(list_file),
        install: install.to_string(),
        remove: remove.to_string(),
        status: status.to_string(),
        default_content: default_content.to_string(),
    }
}

fn os_domain(name: &str, tags: &[&str], managers: Vec<(&str, PackageManagerConfig)>) -> Domain {
    Domain {
        name: name.to_string(),
        kind: DomainKind::Os,
        compatible_families: families(tags),
        package_managers: managers
            .into_iter()
            .map(|(n, c)| (n.to_string(), c))
            .collect(),
        symlink_paths: BTreeMap::new(),
    }
}

fn file_domain(name: &str, kind: DomainKind, paths: Vec<(&str, Vec<&str>)>) -> Domain {
    Domain {
        name: name.to_string(),
        kind,
        compatible_families: families(&["linux", "ubuntu", "arch", "fedora", "macos"]),
        package_managers: BTreeMap::new(),
        symlink_paths: paths
            .into_iter()
            .map(|(family, list)| {
                (
                    family.to_string(),
                    list.into_iter().map(|p| p.to_string()).collect(),
                )
            })
            .collect(),
    }
}

fn builtin_domains() -> Vec<Domain> {
    vec![
        os_domain(
            "ubuntu",
            &["ubuntu", "linux"],
            vec![
                (
                    "apt",
                    manager(
                        "os/ubuntu/apt.txt",
                        "sudo apt-get install -y {pkg}",
                        "sudo apt-get remove -y {pkg}",
                        "dpkg-query -W {pkg}",
                        "# apt packages installed by dotkeep\ngit\ncurl\n",
                    ),
                ),
                (
                    "snap",
                    manager(
                        "os/ubuntu/snap.txt",
                        "sudo snap install {pkg}",
                        "sudo snap remove {pkg}",
                        "snap list {pkg}",
                        "# snap packages installed by dotkeep\n",
                    ),
                ),
            ],
        ),
        os_domain(
            "arch",
            &["arch", "linux"],
            vec![(
                "pacman",
                manager(
                    "os/arch/pacman.txt",
                    "sudo pacman -S --noconfirm {pkg}",
                    "sudo pacman -R --noconfirm {pkg}",
                    "pacman -Q {pkg}",
                    "# pacman packages installed by dotkeep\ngit\ncurl\n",
                ),
            )],
        ),
        os_domain(
            "fedora",
            &["fedora", "linux"],
            vec![(
                "dnf",
                manager(
                    "os/fedora/dnf.txt",
                    "sudo dnf install -y {pkg}",
                    "sudo dnf remove -y {pkg}",
                    "rpm -q {pkg}",
                    "# dnf packages installed by dotkeep\ngit\ncurl\n",
                ),
            )],
        ),
        os_domain(
            "macos",
            &["macos"],
            vec![(
                "brew",
                manager(
                    "os/macos/brew.txt",
                    "brew install {pkg}",
                    "brew uninstall {pkg}",
                    "brew list --versions {pkg}",
                    "# homebrew packages installed by dotkeep\ngit\ncurl\n",
                ),
            )],
        ),
        file_domain(
            "vscode",
            DomainKind::Ide,
            vec![
                (
                    "linux",
                    vec![
                        "~/.config/Code/User/settings.json",
                        "~/.config/Code/User/keybindings.json",
                    ],
                ),
                (
                    "macos",
                    vec![
                        "~/Library/Application Support/Code/User/settings.json",
                        "~/Library/Application Support/Code/User/keybindings.json",
                    ],
                ),
            ],
        ),
        file_domain(
            "neovim",
            DomainKind::Ide,
            vec![
                ("linux", vec!["~/.config/nvim"]),
                ("macos", vec!["~/.config/nvim"]),
            ],
        ),
        file_domain(
            "bash",
            DomainKind::Terminal,
            vec![
                ("linux", vec!["~/.bashrc", "~/.profile"]),
                ("macos", vec!["~/.bash_profile", "~/.profile"]),
            ],
        ),
        file_domain(
            "zsh",
            DomainKind::Terminal,
            vec![
                ("linux", vec!["~/.zshrc"]),
                ("macos", vec!["~/.zshrc", "~/.zprofile"]),
            ],
        ),
        file_domain(
            "tmux",
            DomainKind::Terminal,
            vec![
                ("linux", vec!["~/.tmux.conf"]),
                ("macos", vec!["~/.tmux.conf"]),
            ],
        ),
    ]
}
