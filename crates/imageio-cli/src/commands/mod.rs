//! CLI command implementations

pub mod brands;
pub mod export;
pub mod import;
