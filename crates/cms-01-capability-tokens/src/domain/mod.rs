//! Issuance policy and errors.

pub mod errors;
pub mod policy;
