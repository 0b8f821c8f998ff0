//! Contest API client library
//!
//! This module exposes the cache, API and CLI modules for use in the binary
//! and in integration tests.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
