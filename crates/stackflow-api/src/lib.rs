//! stackflow CloudStack API gateway
//!
//! This crate is the only place that talks to the CloudStack API. It
//! provides:
//!
//! - [`Gateway`]: command dispatch with uniform error normalization and a
//!   pagination-aware listing helper
//! - [`Args`]: the flat argument mapping of one command
//! - [`HttpTransport`]: signed HTTP(S) requests, configured by [`ApiConfig`]
//! - [`lookup`]: read-only pass-through queries
//!
//! # Example
//!
//! ```ignore
//! use stackflow_api::{ApiConfig, Args, Gateway};
//!
//! let gateway = Gateway::http(ApiConfig::from_env()?)?;
//! let zones = gateway.list("listZones", &Args::new()).await?;
//! ```

pub mod args;
pub mod config;
pub mod error;
pub mod gateway;
pub mod lookup;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod transport;

pub use args::Args;
pub use config::{ApiConfig, HttpMethod};
pub use error::{ApiError, Result};
pub use gateway::Gateway;
pub use lookup::lookup;
pub use transport::{HttpTransport, Transport};
