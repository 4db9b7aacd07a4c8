//! API module
//!
//! HTTP server and clients for driving an outline from another process.

pub mod client;
pub mod server;

// Re-export commonly used types
pub use client::{Client, ClientConfig, ClientError, CoreClient, HttpClient};
pub use server::{router, serve, ServerConfig};
