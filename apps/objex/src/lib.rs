//! # Objex Daemon Library
//!
//! Library surface of the objex daemon. The HTTP API, CLI, and
//! configuration layers live here so integration tests can drive the
//! router directly instead of spawning a process.

pub mod api;
pub mod cli;
pub mod config;
