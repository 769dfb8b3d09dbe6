//! Shared, pre-configured HTTP client for the Invflask connectors API.
//!
//! [`shared_client`] returns the process-wide instance: every request it
//! builds targets [`DEFAULT_BASE_URL`], carries `Content-Type:
//! application/json`, and is sent with credentials included.

pub mod client;
pub mod config;
pub mod http;

pub use client::{ApiClient, ApiRequestBuilder, ClientError, CredentialsMode, PreparedRequest};
pub use config::{ClientConfig, ConfigError, ConfigManager, DEFAULT_BASE_URL};
pub use http::{client_for, shared_client};
