//! End-to-end workflow over an isolated home and storage root: classify,
//! import, re-classify, re-import.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use tempfile::TempDir;

use dotkeep::domain::{Domain, DomainKind};
use dotkeep::links::{self, ImportOpts, ImportOutcome, LinkStatus};
use dotkeep::paths::PathContext;

fn bash_domain() -> Domain {
    Domain {
        name: "bash".to_string(),
        kind: DomainKind::Terminal,
        compatible_families: ["linux".to_string()].into_iter().collect::<BTreeSet<_>>(),
        package_managers: BTreeMap::new(),
        symlink_paths: [("linux".to_string(), vec!["~/.bashrc".to_string()])]
            .into_iter()
            .collect(),
    }
}

#[test]
fn test_full_import_workflow() {
    let temp = TempDir::new().unwrap();
    let home = temp.path().join("home");
    let storage = temp.path().join("storage");
    fs::create_dir_all(&home).unwrap();
    fs::create_dir_all(&storage).unwrap();

    let ctx = PathContext::new(home.clone(), storage.clone());
    let domain = bash_domain();

    // nothing imported yet
    let report = links::classify(&ctx, &domain, "linux");
    assert_eq!(report.status, LinkStatus::NotImported);
    assert_eq!((report.imported_count(), report.total()), (0, 1));

    // a live rc file appears and gets imported
    let live = home.join(".bashrc");
    fs::write(&live, "export EDITOR=vim\n").unwrap();

    let actions = links::import(&ctx, &domain, "linux", &[], &ImportOpts::default()).unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].outcome, ImportOutcome::Linked);

    // the live path is now a symlink into storage with the original content
    let metadata = fs::symlink_metadata(&live).unwrap();
    assert!(metadata.file_type().is_symlink());
    let target = fs::read_link(&live).unwrap();
    assert!(target.starts_with(&storage));
    assert_eq!(fs::read_to_string(&live).unwrap(), "export EDITOR=vim\n");
    assert_eq!(fs::read_to_string(&target).unwrap(), "export EDITOR=vim\n");

    let report = links::classify(&ctx, &domain, "linux");
    assert_eq!(report.status, LinkStatus::FullyImported);
    assert_eq!((report.imported_count(), report.total()), (1, 1));

    // a second import changes nothing
    let actions = links::import(&ctx, &domain, "linux", &[], &ImportOpts::default()).unwrap();
    assert_eq!(actions[0].outcome, ImportOutcome::AlreadyLinked);
    assert_eq!(fs::read_to_string(&live).unwrap(), "export EDITOR=vim\n");

    let report = links::classify(&ctx, &domain, "linux");
    assert_eq!(report.status, LinkStatus::FullyImported);
}

#[test]
fn test_storage_survives_live_file_loss() {
    let temp = TempDir::new().unwrap();
    let home = temp.path().join("home");
    let storage = temp.path().join("storage");
    fs::create_dir_all(&home).unwrap();
    fs::create_dir_all(&storage).unwrap();

    let ctx = PathContext::new(home.clone(), storage);
    let domain = bash_domain();

    let live = home.join(".bashrc");
    fs::write(&live, "export LANG=C\n").unwrap();
    links::import(&ctx, &domain, "linux", &[], &ImportOpts::default()).unwrap();

    // the live link goes away; storage still holds the canonical copy
    fs::remove_file(&live).unwrap();
    let report = links::classify(&ctx, &domain, "linux");
    assert_eq!(report.status, LinkStatus::FullyImported);

    // a fresh live file re-imports against the stored copy, which wins
    fs::write(&live, "export LANG=en_US.UTF-8\n").unwrap();
    let actions = links::import(&ctx, &domain, "linux", &[], &ImportOpts { backup: false }).unwrap();
    assert_eq!(actions[0].outcome, ImportOutcome::Linked);
    assert_eq!(fs::read_to_string(&live).unwrap(), "export LANG=C\n");
}
