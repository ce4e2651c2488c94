//! doctalk-core
//!
//! Pure domain types, the upload content-type allow-list, and backend path
//! conventions. No network dependency; this is the shared vocabulary of the
//! doctalk system.

pub mod content_type;
pub mod error;
pub mod ids;
pub mod models;
pub mod routes;
