//! JSON HTTP API.
//!
//! Routes are nested under `/api/`. Everything except health, register
//! and login sits behind the middleware stack: Auth → Audit → Handler.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::build_router;
pub use server::{start_api_server, ApiServer};
pub use types::ApiContext;
