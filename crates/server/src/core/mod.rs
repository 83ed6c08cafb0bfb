//! Core Service Layer
//!
//! Shared infrastructure for the Agrovale server: database, sessions,
//! authentication, audit trail, and the request context.

pub mod audit;
pub mod auth;
pub mod ctx;
pub mod db;
pub mod error;
pub mod forms;
pub mod router;
pub mod session;

// Re-exports for convenience
pub use ctx::Ctx;
pub use error::{Error, Result};
pub use router::router;
