//! doctalk-cli library root.
//!
//! The binary is a thin REPL over these modules; integration tests use them
//! directly.

pub mod commands;
pub mod config;
pub mod state;
