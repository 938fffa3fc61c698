//! Dotkeep - centralize environment configuration into one portable tree.
//!
//! This library provides the core functionality for dotkeep, including:
//! - The domain catalog (which OSes, IDEs and terminals are managed)
//! - Path translation between live locations and portable storage
//! - Symlink reconciliation (classify, import, repair)
//! - Package reconciliation against declarative per-manager lists

pub mod cfg;
pub mod domain;
pub mod links;
pub mod paths;
pub mod pkg;
pub mod platform;
pub mod ui;
