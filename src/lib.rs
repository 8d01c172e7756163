// Library root: re-exports all modules for use by the binary and tests.

pub mod config;
pub mod optimizer;
pub mod slate;
