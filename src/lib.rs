//! MATCHDAY: daily football matches digest
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod http;
pub mod providers;
pub mod engine;
pub mod notify;
