//! Local HTTP/JSON API for the browser client.
//!
//! Routes live under `/api/`. Store and router calls are blocking and run
//! on the blocking pool; the Ollama passthrough streams on the executor.

pub mod endpoints;
pub mod error;
pub mod proxy;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{serve, ApiServer};
pub use types::ApiContext;
