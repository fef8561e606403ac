//! File-backed inputs: protocol configuration and scenarios.

pub mod config;
pub mod scenario;
