//! Adapters connecting the token service to the kernel.

pub mod bus;
