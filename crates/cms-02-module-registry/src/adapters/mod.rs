//! Storage backends and kernel adapters.

pub mod bus;
pub mod client;
pub mod file;
pub mod memory;
