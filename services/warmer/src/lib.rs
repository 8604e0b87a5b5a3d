//! Warmer service library crate.
//!
//! # Purpose
//! Bootstraps the shared tenancy cache at deploy time and exports the cache
//! library's metrics. Exposed as a library so the binary stays thin and the
//! startup sequence is testable.
pub mod app;
pub mod config;
pub mod observability;
