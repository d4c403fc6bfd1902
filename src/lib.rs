// ABOUTME: Library root for clawlog — re-exports all modules for integration testing.
// ABOUTME: The binary entry point is in main.rs, which uses this crate as a library.

pub mod config;
pub mod logging;
pub mod session;
