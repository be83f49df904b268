//! Vertex AI prediction client.
//!
//! Provides the REST wrapper for publisher-model `:predict` calls with
//! bounded retry, access-token resolution, and the high-level try-on and
//! background-generation operations shared by the CLI and the HTTP server.

pub mod api;
pub mod auth;
pub mod tryon;
