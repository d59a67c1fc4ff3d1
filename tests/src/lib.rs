//! # CMS Trust Bus Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── bus_benchmarks.rs   # Kernel dispatch and token verification cost
//! └── src/
//!     └── integration/        # Cross-crate flows through a real kernel
//!         ├── fixtures.rs
//!         ├── trust_kernel.rs
//!         ├── token_flows.rs
//!         └── module_loading.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p cms-tests
//!
//! # By area
//! cargo test -p cms-tests integration::trust_kernel::
//! cargo test -p cms-tests integration::module_loading::
//!
//! # Benchmarks
//! cargo bench -p cms-tests
//! ```

pub mod integration;
