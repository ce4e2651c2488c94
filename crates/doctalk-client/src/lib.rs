//! doctalk-client
//!
//! The request contract of the inference backend: a dyn-compatible
//! [`Backend`] trait and its HTTP implementation.

pub mod backend;
pub mod error;
pub mod http;
pub mod wire;

pub use backend::{Backend, BoxFuture, PromptRequest};
pub use error::{ClientError, Result};
pub use http::HttpBackend;
