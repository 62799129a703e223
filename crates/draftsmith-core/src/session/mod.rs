//! Conversation session domain: workflow stage, transcript, contract
//! structure, draft registry and the state store that owns them.

pub mod registry;
pub mod section;
pub mod stage;
pub mod store;
pub mod turn;

pub use registry::DraftRegistry;
pub use section::{ContractSection, ContractStructure, Subsection};
pub use stage::WorkflowStage;
pub use store::{ConversationStore, SubmitOutcome};
pub use turn::{ConversationTurn, TurnRole};
