use thiserror::Error;

use crate::types::AgentId;

/// Errors that can occur while driving an agent.
///
/// Nothing here is fatal to a simulation: the scheduler logs these per agent
/// and keeps the remaining agents running.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Agent already exists: {0}")]
    AgentAlreadyExists(AgentId),

    #[error("Agent panicked: {0}")]
    AgentPanicked(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Unknown recipient: {0}")]
    UnknownRecipient(AgentId),

    #[error("Mailbox full: {0}")]
    MailboxFull(AgentId),

    #[error("Mailbox disconnected: {0}")]
    Disconnected(AgentId),
}

/// Reasons an inbound message is rejected by a sense rule.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SenseError {
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// Body parsed, but names a task this role does not perform
    #[error("Unknown task: {0}")]
    UnknownTask(String),
}

impl From<serde_json::Error> for SenseError {
    fn from(e: serde_json::Error) -> Self {
        SenseError::Malformed(e.to_string())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Missing video reference")]
    MissingReference,

    #[error("No analysis kinds requested")]
    NothingRequested,

    #[error("Unsupported analysis kind: {0}")]
    UnsupportedKind(String),
}
