//! Multi-pool reads and the client facade.
//!
//! This crate provides:
//! - Chunked simulated reads with bounded concurrency and key-wise merging
//! - A facade that wires the registry, pool and oracle clients to one
//!   deployment configuration

/// Prelude module for convenient imports.
pub mod prelude;

/// Chunked batch reads.
pub mod batch;
/// Deployment and batching configuration.
pub mod config;
/// Error types.
pub mod error;
/// Client facade.
pub mod facade;
