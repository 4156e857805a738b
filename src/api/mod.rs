//! API Module
//!
//! HTTP handlers and routing for the cache admin surface. Every endpoint
//! adapts one call on the [`AppContext`](crate::context::AppContext);
//! see [`create_router`] for the endpoint list.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
