//! Conformance Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer, and loads run configuration
//! from the environment.

pub mod adapters;
pub mod config;

pub use adapters::ReqwestHttpClient;
pub use config::{load_config, load_config_from};
