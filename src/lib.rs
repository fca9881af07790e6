// ABOUTME: Library root for lookout - exposes the update core and its daemon plumbing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod docker;
pub mod error;
pub mod output;
pub mod runtime;
pub mod schedule;
pub mod types;
pub mod update;
