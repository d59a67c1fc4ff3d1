//! Loader domain: manifests, errors, run reports.

pub mod config;
pub mod errors;
pub mod manifest;
pub mod report;
