//! Registry domain.

pub mod errors;
