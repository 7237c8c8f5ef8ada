//! Bracket contest: closest-bracket winner selection with timed expiry.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod error;
pub mod types;
pub mod storage;
pub mod contest;
pub mod api;
