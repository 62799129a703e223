//! HTTP client for the contract drafting agent.
//!
//! [`AgentApiClient`] implements the transport seams declared in
//! `draftsmith-core` (`AgentChannel` for the conversational workflow,
//! `IntakeChannel` for document intake) plus the catalog CRUD surface.

pub mod api;
pub mod config;

pub use api::{AgentApiClient, HealthStatus};
pub use config::ClientConfig;
