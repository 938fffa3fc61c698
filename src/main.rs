mod cfg;
mod domain;
mod links;
mod paths;
mod pkg;
mod platform;
mod ui;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use domain::{Domain, DomainKind, DomainRegistry, PackageManagerConfig};
use links::{ImportOpts, LinkStatus};
use paths::PathContext;

/// Dotkeep - keep editor, shell and OS package configuration linked into one portable tree
#[derive(Parser)]
#[command(name = "dotkeep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (defaults to ~/.dotkeep/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the detected OS family (ubuntu, arch, fedora, macos, linux)
    #[arg(long, global = true)]
    family: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the config file and the storage tree
    Init {
        /// Force initialization even if config exists
        #[arg(short, long)]
        force: bool,

        /// Storage tree location (defaults to ~/.dotkeep/storage)
        #[arg(long)]
        storage_root: Option<PathBuf>,
    },

    /// List known domains
    Domains {
        /// Only show domains of this kind (os, ide, terminal)
        #[arg(long)]
        kind: Option<String>,
    },

    /// Show symlink status of domains for the current OS family
    Status {
        /// Restrict to a single domain
        domain: Option<String>,
    },

    /// Import a domain's files into storage and link them back
    Import {
        /// Domain to import
        domain: String,

        /// Only import specific declared paths (comma-separated)
        #[arg(long)]
        only: Option<String>,

        /// Pick paths interactively
        #[arg(short, long)]
        interactive: bool,

        /// Skip backups of live files replaced by stored content
        #[arg(long)]
        no_backup: bool,
    },

    /// Reconcile declared packages for an OS domain
    #[command(subcommand)]
    Pkg(PkgCommands),

    /// Edit or view configuration
    Config {
        /// Open config in editor
        #[arg(long)]
        edit: bool,

        /// Pin the OS family in the config file
        #[arg(long)]
        set_family: Option<String>,

        /// Show current configuration
        #[arg(long)]
        show: bool,
    },

    /// Run diagnostics and check system health
    Doctor,
}

#[derive(Subcommand)]
enum PkgCommands {
    /// Show the declared package list
    List {
        domain: String,

        /// Package manager (needed when the domain has several)
        #[arg(long)]
        manager: Option<String>,
    },

    /// Partition declared packages into installed / missing
    Status {
        domain: String,

        #[arg(long)]
        manager: Option<String>,
    },

    /// Install every declared package that is not installed yet
    Sync {
        domain: String,

        #[arg(long)]
        manager: Option<String>,
    },

    /// Install the named packages
    Install {
        domain: String,

        names: Vec<String>,

        #[arg(long)]
        manager: Option<String>,
    },

    /// Remove the named packages
    Remove {
        domain: String,

        names: Vec<String>,

        #[arg(long)]
        manager: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(|| {
        dirs::home_dir()
            .expect("Could not find home directory")
            .join(".dotkeep")
            .join("config.toml")
    });

    let result = match cli.command {
        Commands::Init { force, storage_root } => cmd_init(&config_path, storage_root, force),
        Commands::Domains { kind } => cmd_domains(kind),
        Commands::Status { domain } => cmd_status(&config_path, cli.family, domain),
        Commands::Import {
            domain,
            only,
            interactive,
            no_backup,
        } => cmd_import(&config_path, cli.family, &domain, only, interactive, no_backup),
        Commands::Pkg(subcmd) => cmd_pkg(&config_path, cli.family, subcmd),
        Commands::Config { edit, set_family, show } => {
            cmd_config(&config_path, edit, set_family, show)
        }
        Commands::Doctor => cmd_doctor(&config_path, cli.family),
    };

    if let Err(e) = result {
        ui::error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

/// Config, path context and OS family for one invocation. The explicit
/// context keeps reconciliation calls free of ambient globals.
fn resolve(config_path: &Path, family_flag: Option<String>) -> Result<(cfg::Config, PathContext, String)> {
    let config = cfg::load(config_path)?;
    let ctx = PathContext::from_env(config.storage_root.clone())?;
    let family = family_flag
        .or_else(|| config.family_override.clone())
        .unwrap_or_else(platform::detect_family);
    Ok((config, ctx, family))
}

fn cmd_init(config_path: &Path, storage_root: Option<PathBuf>, force: bool) -> Result<()> {
    ui::info("Initializing dotkeep...");
    cfg::init(config_path, storage_root, force)?;
    ui::success("Dotkeep initialized successfully!");
    ui::hint("Run 'dotkeep status' to see which domains can be imported");
    Ok(())
}

fn cmd_domains(kind: Option<String>) -> Result<()> {
    let registry = DomainRegistry::builtin();

    let domains: Vec<&Domain> = match kind {
        Some(ref input) => {
            let kind = DomainKind::parse(input)
                .with_context(|| format!("Unknown kind: {} (expected os, ide or terminal)", input))?;
            registry.by_kind(kind)
        }
        None => registry.iter().collect(),
    };

    let rows: Vec<Vec<String>> = domains
        .iter()
        .map(|d| {
            let families = d
                .compatible_families
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            let manages = if d.package_managers.is_empty() {
                let count = d.symlink_paths.values().map(Vec::len).max().unwrap_or(0);
                format!("{} config path(s)", count)
            } else {
                let managers = d
                    .package_managers
                    .keys()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("packages via {}", managers)
            };
            vec![d.name.clone(), d.kind.label().to_string(), families, manages]
        })
        .collect();

    ui::print_table(&["Domain", "Kind", "Families", "Manages"], rows);
    Ok(())
}

fn cmd_status(config_path: &Path, family_flag: Option<String>, domain: Option<String>) -> Result<()> {
    let (_config, ctx, family) = resolve(config_path, family_flag)?;
    let registry = DomainRegistry::builtin();

    ui::info(&format!("OS family: {}", family.bold()));

    if let Some(name) = domain {
        let domain = registry
            .by_name(&name)
            .with_context(|| format!("Unknown domain: {}", name))?;
        let report = links::classify(&ctx, domain, &family);

        if report.status == LinkStatus::Incompatible {
            ui::warn(&format!(
                "{} declares no managed paths for family {}",
                domain.name, family
            ));
            return Ok(());
        }

        ui::section(&format!(
            "{} — {} ({}/{})",
            domain.name,
            report.status.label(),
            report.imported_count(),
            report.total()
        ));
        for entry in &report.imported {
            let stored = ctx.storage_path_under(
                &ctx.storage_root
                    .join(domain.kind.storage_dir())
                    .join(&domain.name),
                &ctx.expand(entry),
            );
            println!("  {} {} {} {}", "✓".green(), entry, "→".dimmed(), stored.display());
        }
        for entry in &report.missing {
            println!("  {} {}", "✗".red(), entry);
        }
        if !report.missing.is_empty() {
            ui::hint(&format!("Run 'dotkeep import {}' to import missing files", domain.name));
        }
        return Ok(());
    }

    let rows: Vec<Vec<String>> = registry
        .iter()
        .map(|d| {
            let report = links::classify(&ctx, d, &family);
            let files = match report.status {
                LinkStatus::Incompatible => "-".to_string(),
                _ => format!("{}/{}", report.imported_count(), report.total()),
            };
            vec![
                d.name.clone(),
                d.kind.label().to_string(),
                report.status.label().to_string(),
                files,
            ]
        })
        .collect();

    ui::print_table(&["Domain", "Kind", "Status", "Files"], rows);
    Ok(())
}

fn cmd_import(
    config_path: &Path,
    family_flag: Option<String>,
    name: &str,
    only: Option<String>,
    interactive: bool,
    no_backup: bool,
) -> Result<()> {
    let (config, ctx, family) = resolve(config_path, family_flag)?;
    let registry = DomainRegistry::builtin();
    let domain = registry
        .by_name(name)
        .with_context(|| format!("Unknown domain: {}", name))?;

    let selection: Vec<String> = if let Some(only) = only {
        only.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    } else if interactive {
        let declared = domain.paths_for(&family).with_context(|| {
            format!("Domain {} has no managed paths for family {}", name, family)
        })?;
        let report = links::classify(&ctx, domain, &family);
        let preselected: Vec<bool> = declared
            .iter()
            .map(|entry| report.missing.contains(entry))
            .collect();
        let picked = ui::prompt_multi_select("Paths to import", declared, &preselected);
        if picked.is_empty() {
            ui::info("Nothing selected");
            return Ok(());
        }
        picked.into_iter().map(|i| declared[i].clone()).collect()
    } else {
        Vec::new()
    };

    let opts = ImportOpts {
        backup: config.backup && !no_backup,
    };

    ui::info(&format!("Importing {} for family {}...", name, family));
    let actions = links::import(&ctx, domain, &family, &selection, &opts)?;

    let mut linked = 0;
    let mut already = 0;
    let mut failed = 0;
    for action in &actions {
        match &action.reason {
            Some(reason) => {
                println!("  {} {} ({})", action.outcome.label(), action.entry, reason.dimmed())
            }
            None => println!(
                "  {} {} {} {}",
                action.outcome.label(),
                action.entry,
                "→".dimmed(),
                action.stored.display()
            ),
        }
        match action.outcome {
            links::ImportOutcome::Linked => linked += 1,
            links::ImportOutcome::AlreadyLinked => already += 1,
            links::ImportOutcome::Failed => failed += 1,
        }
    }

    if failed > 0 {
        ui::warn(&format!(
            "{} linked, {} already linked, {} failed",
            linked, already, failed
        ));
    } else {
        ui::success(&format!("{} linked, {} already linked", linked, already));
    }
    Ok(())
}

fn resolve_manager<'a>(
    domain: &'a Domain,
    manager: Option<&str>,
) -> Result<(&'a str, &'a PackageManagerConfig)> {
    if domain.package_managers.is_empty() {
        anyhow::bail!("Domain {} manages no packages", domain.name);
    }

    match manager {
        Some(name) => domain
            .package_managers
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .with_context(|| {
                format!("Domain {} has no package manager named {}", domain.name, name)
            }),
        None => {
            let mut iter = domain.package_managers.iter();
            match (iter.next(), iter.next()) {
                (Some((k, v)), None) => Ok((k.as_str(), v)),
                _ => {
                    let names = domain
                        .package_managers
                        .keys()
                        .map(String::as_str)
                        .collect::<Vec<_>>()
                        .join(", ");
                    anyhow::bail!(
                        "Domain {} has several package managers ({}); pick one with --manager",
                        domain.name,
                        names
                    )
                }
            }
        }
    }
}

fn cmd_pkg(config_path: &Path, family_flag: Option<String>, subcmd: PkgCommands) -> Result<()> {
    let (_config, ctx, _family) = resolve(config_path, family_flag)?;
    let registry = DomainRegistry::builtin();

    let (name, manager_flag, names) = match &subcmd {
        PkgCommands::List { domain, manager } => (domain.clone(), manager.clone(), Vec::new()),
        PkgCommands::Status { domain, manager } => (domain.clone(), manager.clone(), Vec::new()),
        PkgCommands::Sync { domain, manager } => (domain.clone(), manager.clone(), Vec::new()),
        PkgCommands::Install { domain, manager, names } => {
            (domain.clone(), manager.clone(), names.clone())
        }
        PkgCommands::Remove { domain, manager, names } => {
            (domain.clone(), manager.clone(), names.clone())
        }
    };

    let domain = registry
        .by_name(&name)
        .with_context(|| format!("Unknown domain: {}", name))?;
    let (manager_name, manager) = resolve_manager(domain, manager_flag.as_deref())?;

    let list_path = ctx.storage_root.join(&manager.list_file);
    pkg::ensure_list(&list_path, &manager.default_content)?;

    match subcmd {
        PkgCommands::List { .. } => {
            let declared = pkg::load_declared(&list_path)?;
            ui::section(&format!("{} packages via {}", name, manager_name));
            if declared.is_empty() {
                ui::info("No packages declared");
            }
            for package in &declared {
                println!("  {}", package);
            }
            ui::hint(&format!("Edit {} to change the list", list_path.display()));
        }
        PkgCommands::Status { .. } => {
            let declared = pkg::load_declared(&list_path)?;
            if declared.is_empty() {
                ui::info("No packages declared");
                return Ok(());
            }
            let partition = pkg::partition(&declared, manager, true);
            ui::section(&format!(
                "{} via {}: {} installed, {} missing",
                name,
                manager_name,
                partition.installed.len(),
                partition.not_installed.len()
            ));
            for package in &partition.installed {
                println!("  {} {}", "✓".green(), package);
            }
            for package in &partition.not_installed {
                println!("  {} {}", "✗".red(), package);
            }
            if !partition.not_installed.is_empty() {
                ui::hint(&format!("Run 'dotkeep pkg sync {}' to install missing packages", name));
            }
        }
        PkgCommands::Sync { .. } => {
            let declared = pkg::load_declared(&list_path)?;
            let partition = pkg::partition(&declared, manager, true);
            if partition.not_installed.is_empty() {
                ui::success("All declared packages are installed");
                return Ok(());
            }
            if !ui::prompt_confirm(
                &format!(
                    "Install {} package(s) via {}?",
                    partition.not_installed.len(),
                    manager_name
                ),
                true,
            ) {
                ui::info("Aborted");
                return Ok(());
            }
            let actions = pkg::install(&partition.not_installed, manager);
            report_pkg_actions(&actions);
        }
        PkgCommands::Install { .. } => {
            if names.is_empty() {
                anyhow::bail!("No packages named");
            }
            let actions = pkg::install(&names, manager);
            report_pkg_actions(&actions);
        }
        PkgCommands::Remove { .. } => {
            if names.is_empty() {
                anyhow::bail!("No packages named");
            }
            let actions = pkg::remove(&names, manager);
            report_pkg_actions(&actions);
        }
    }

    Ok(())
}

fn report_pkg_actions(actions: &[pkg::PkgAction]) {
    let mut failed = 0;
    for action in actions {
        if action.success {
            println!("  {} {} {}", "✓".green(), action.op.verb(), action.package);
        } else {
            failed += 1;
            let detail = action.detail.as_deref().unwrap_or("failed");
            println!(
                "  {} {} {} ({})",
                "✗".red(),
                action.op.verb(),
                action.package,
                detail.dimmed()
            );
        }
    }
    if failed > 0 {
        ui::warn(&format!("{} of {} action(s) failed", failed, actions.len()));
    } else {
        ui::success(&format!("{} action(s) completed", actions.len()));
    }
}

fn cmd_config(
    config_path: &Path,
    edit: bool,
    set_family: Option<String>,
    show: bool,
) -> Result<()> {
    if edit {
        return cfg::edit(config_path);
    }

    if let Some(family) = set_family {
        if !platform::is_known_family(&family) {
            anyhow::bail!(
                "Unknown family: {} (expected one of {})",
                family,
                platform::FAMILIES.join(", ")
            );
        }
        let mut config = cfg::load(config_path)?;
        config.family_override = Some(family.clone());
        cfg::save(config_path, &config)?;
        ui::success(&format!("Pinned OS family to {}", family));
        return Ok(());
    }

    if show {
        let config = cfg::load(config_path)?;
        let rendered = toml::to_string_pretty(&config).context("Failed to serialize config")?;
        println!("{}", rendered);
        return Ok(());
    }

    ui::hint("Use --show, --edit or --set-family <family>");
    Ok(())
}

fn cmd_doctor(config_path: &Path, family_flag: Option<String>) -> Result<()> {
    ui::info("Running diagnostics...");

    let mut checks: Vec<(String, Result<()>)> = vec![
        ("Config file exists".to_string(), cfg::check_exists(config_path)),
        (
            "Home directory resolvable".to_string(),
            dirs::home_dir()
                .map(|_| ())
                .ok_or_else(|| anyhow!("not found")),
        ),
    ];

    if let Ok((_config, ctx, family)) = resolve(config_path, family_flag) {
        checks.push((
            "Storage tree present".to_string(),
            if ctx.storage_root.is_dir() {
                Ok(())
            } else {
                Err(anyhow!(
                    "{} missing; run 'dotkeep init'",
                    ctx.storage_root.display()
                ))
            },
        ));

        let registry = DomainRegistry::builtin();
        for domain in registry.by_family(&family) {
            for manager_name in domain.package_managers.keys() {
                checks.push((
                    format!("Package manager {} available", manager_name),
                    if pkg::manager_available(manager_name) {
                        Ok(())
                    } else {
                        Err(anyhow!("{} not found on PATH", manager_name))
                    },
                ));
            }
        }
    }

    let mut has_issues = false;
    for (check, result) in checks {
        match result {
            Ok(_) => ui::success(&check),
            Err(e) => {
                has_issues = true;
                ui::error(&format!("{}: {}", check, e));
            }
        }
    }

    if !has_issues {
        ui::success("All checks passed!");
    } else {
        ui::hint("Fix the issues above, then re-run 'dotkeep doctor'");
    }

    Ok(())
}
