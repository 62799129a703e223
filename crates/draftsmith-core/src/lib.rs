//! Core domain for Draftsmith: the conversation state store, the workflow
//! driver that talks to the remote drafting agent, and the contract data
//! model they share.
//!
//! The crate is transport-agnostic: the driver reaches the agent through the
//! [`driver::AgentChannel`] and [`intake::IntakeChannel`] traits, which the
//! HTTP client crate implements.

pub mod catalog;
pub mod driver;
pub mod error;
pub mod intake;
pub mod protocol;
pub mod session;
pub mod user_context;

// Re-export common error type
pub use error::{DraftError, Result};
pub use session::{ConversationStore, DraftRegistry, SubmitOutcome, WorkflowStage};
pub use user_context::UserContext;
