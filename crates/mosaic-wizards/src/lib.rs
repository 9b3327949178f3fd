//!
//! Mosaic Wizards - the deal builder's concrete wizards
//!
//! Contract, scoring, inventory, signature and multi-listing wizards, the
//! provider interfaces they call, and the default module catalog.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod fields;

/// External provider interfaces
pub mod providers;

/// Default module catalog and session builder
pub mod catalog;

/// Rental contract wizard
pub mod contract;

/// Tenant scoring wizard
pub mod scoring;

/// Property inventory wizard
pub mod inventory;

/// Electronic signature wizard
pub mod signature;

/// Multi-listing wizard
pub mod multilisting;

/// Deterministic fake providers
#[cfg(feature = "testing")]
pub mod testing;

pub use catalog::{build_session, default_graph, default_modules, Providers};
