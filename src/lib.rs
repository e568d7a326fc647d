//! GitBrowser Archive: moves idle tabs out of live windows into an archive
//! and deletes archived tabs once they outlive the retention window.
//!
//! This library crate exposes all modules for use by the RPC binary and integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
