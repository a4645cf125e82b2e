//! Turns inbound messages into beliefs and desires.

use crate::belief::BeliefStore;
use crate::desire::DesireSet;
use crate::directory::Directory;
use crate::error::SenseError;
use crate::message::{Message, Performative};
use crate::types::AgentId;

/// State a sense rule may change.
pub struct SenseContext<'a> {
    pub agent: &'a AgentId,
    pub beliefs: &'a mut BeliefStore,
    pub desires: &'a mut DesireSet,
    pub directory: &'a Directory,
}

pub type SenseFn = fn(&Message, &mut SenseContext<'_>) -> Result<(), SenseError>;

/// Applies to messages with a given performative and ontology.
#[derive(Clone)]
pub struct SenseRule {
    pub name: &'static str,
    pub performative: Performative,
    pub ontology: &'static str,
    pub apply: SenseFn,
}

impl SenseRule {
    pub fn new(
        name: &'static str,
        performative: Performative,
        ontology: &'static str,
        apply: SenseFn,
    ) -> Self {
        Self {
            name,
            performative,
            ontology,
            apply,
        }
    }
}

impl std::fmt::Debug for SenseRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenseRule")
            .field("name", &self.name)
            .field("performative", &self.performative)
            .field("ontology", &self.ontology)
            .finish()
    }
}

/// Per-role sense rules, checked in order. The first rule for a message's
/// `(performative, ontology)` handles it.
#[derive(Debug, Clone, Default)]
pub struct SenseTable {
    rules: Vec<SenseRule>,
}

impl SenseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: SenseRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn find(&self, message: &Message) -> Option<&SenseRule> {
        self.rules
            .iter()
            .find(|rule| message.matches(rule.performative, rule.ontology))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
