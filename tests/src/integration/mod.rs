//! # Integration Flows
//!
//! Every flow builds its own kernel; nothing is shared between tests.

#[cfg(test)]
pub(crate) mod fixtures;

mod module_loading;
mod token_flows;
mod trust_kernel;
