#![forbid(unsafe_code)]

//! Core domain model and advisory engine for Glate.
//!
//! This crate provides:
//! - Domain types (substances, interaction rules, doses, conflicts)
//! - Substance catalog and dose ledger
//! - Decay calculator (first-order elimination kinetics)
//! - Advisor (interaction conflict detection)
//! - Session monitor (periodic background re-evaluation)

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod decay;
pub mod ledger;
pub mod advisor;
pub mod status;
pub mod monitor;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog, Catalog, DefinitionLookup};
pub use config::Config;
pub use ledger::{DoseLedger, InMemoryLedger};
pub use advisor::Advisor;
pub use monitor::{Monitor, MonitorHandle, MonitorMetrics, ScanReport};
