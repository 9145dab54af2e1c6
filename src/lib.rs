//! bid-adjuster: portfolio bidding strategy adjustments
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod service;
pub mod engine;
