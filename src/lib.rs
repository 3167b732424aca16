//! brakewatch - watch-folder transcoding daemon
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod conversion;
pub mod hub;
pub mod library;
pub mod server;
pub mod watch;
