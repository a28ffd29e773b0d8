//! CLI command implementations.

pub mod browse;
pub mod common;
pub mod config;
pub mod download;
pub mod source;
