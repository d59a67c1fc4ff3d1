//! Plugin sources and kernel adapters.

pub mod bus;
pub mod catalog;
pub mod plugin_kernel;
