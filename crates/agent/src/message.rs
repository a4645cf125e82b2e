use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SenseError;
use crate::types::AgentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Performative {
    Inform,
    Request,
    Agree,
    Refuse,
    Failure,
    Propose,
}

impl fmt::Display for Performative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Performative::Inform => "inform",
            Performative::Request => "request",
            Performative::Agree => "agree",
            Performative::Refuse => "refuse",
            Performative::Failure => "failure",
            Performative::Propose => "propose",
        };
        f.write_str(s)
    }
}

pub mod ontology {
    pub const VIDEO_ANALYSIS: &str = "video-analysis";
    pub const TASK_REQUEST: &str = "task-request";
    pub const BDI_STATE: &str = "bdi-state";
    pub const FEEDBACK_SOURCE: &str = "feedback-source";
}

pub mod language {
    pub const JSON: &str = "application/json";
    pub const SL: &str = "text/sl";
}

/// Envelope exchanged between agents. The body is opaque to the engine and
/// parsed by the receiving role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub to: AgentId,
    pub sender: Option<AgentId>,
    pub performative: Performative,
    pub ontology: String,
    pub language: String,
    pub thread: Option<String>,
    pub body: String,
}

impl Message {
    pub fn new(to: AgentId, performative: Performative, ontology: impl Into<String>) -> Self {
        Self {
            to,
            sender: None,
            performative,
            ontology: ontology.into(),
            language: language::JSON.to_string(),
            thread: None,
            body: String::new(),
        }
    }

    pub fn from_sender(mut self, sender: AgentId) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_thread(mut self, thread: impl Into<String>) -> Self {
        self.thread = Some(thread.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_json<T: Serialize>(mut self, body: &T) -> Self {
        self.body = serde_json::to_string(body).unwrap_or_default();
        self.language = language::JSON.to_string();
        self
    }

    pub fn json_body<T: DeserializeOwned>(&self) -> Result<T, SenseError> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Reply addressed to this message's sender on the same thread and ontology.
    pub fn reply(&self, performative: Performative) -> Option<Message> {
        let to = self.sender.clone()?;
        let mut reply = Message::new(to, performative, self.ontology.clone());
        reply.sender = Some(self.to.clone());
        reply.thread = self.thread.clone();
        Some(reply)
    }

    pub fn matches(&self, performative: Performative, ontology: &str) -> bool {
        self.performative == performative && self.ontology == ontology
    }
}
