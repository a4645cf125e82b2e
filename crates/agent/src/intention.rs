use serde::Serialize;

use crate::desire::Desire;
use crate::plan::Plan;
use crate::types::{IntentionId, Timestamp};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum IntentionStatus {
    Active,
    Achieved,
    Failed { reason: String },
}

impl IntentionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, IntentionStatus::Active)
    }

    pub fn label(&self) -> &'static str {
        match self {
            IntentionStatus::Active => "active",
            IntentionStatus::Achieved => "achieved",
            IntentionStatus::Failed { .. } => "failed",
        }
    }
}

/// A desire the agent committed to, bound to the plan chosen for it.
#[derive(Debug, Clone)]
pub struct Intention {
    pub id: IntentionId,
    pub desire: Desire,
    pub plan: Plan,
    pub status: IntentionStatus,
    pub created_at: Timestamp,
    stall_reported: bool,
}

impl Intention {
    pub fn new(desire: Desire, plan: Plan) -> Self {
        Self {
            id: IntentionId::new(),
            desire,
            plan,
            status: IntentionStatus::Active,
            created_at: Timestamp::now(),
            stall_reported: false,
        }
    }

    pub fn goal(&self) -> &str {
        self.desire.goal()
    }

    pub fn is_active(&self) -> bool {
        self.status == IntentionStatus::Active
    }

    /// Marks the intention as stalled. Returns true only the first time.
    pub(crate) fn report_stall(&mut self) -> bool {
        !std::mem::replace(&mut self.stall_reported, true)
    }

    pub fn view(&self) -> IntentionView {
        IntentionView {
            id: self.id,
            goal: self.goal().to_string(),
            priority: self.desire.priority(),
            plan: self.plan.name.clone(),
            status: self.status.clone(),
        }
    }
}

impl PartialEq for Intention {
    fn eq(&self, other: &Self) -> bool {
        self.desire == other.desire && self.status == other.status
    }
}

/// Serializable copy of an intention for monitoring.
#[derive(Debug, Clone, Serialize)]
pub struct IntentionView {
    pub id: IntentionId,
    pub goal: String,
    pub priority: f64,
    pub plan: String,
    pub status: IntentionStatus,
}

/// Intentions of a single agent, in creation order.
#[derive(Debug, Clone, Default)]
pub struct IntentionTable {
    intentions: Vec<Intention>,
}

impl IntentionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an intention unless one with the same (desire, status) exists.
    pub fn insert(&mut self, intention: Intention) -> bool {
        if self.intentions.iter().any(|i| *i == intention) {
            return false;
        }
        self.intentions.push(intention);
        true
    }

    pub fn has_active(&self, goal: &str) -> bool {
        self.intentions
            .iter()
            .any(|i| i.is_active() && i.goal() == goal)
    }

    pub fn get(&self, id: &IntentionId) -> Option<&Intention> {
        self.intentions.iter().find(|i| i.id == *id)
    }

    pub fn get_mut(&mut self, id: &IntentionId) -> Option<&mut Intention> {
        self.intentions.iter_mut().find(|i| i.id == *id)
    }

    pub fn active_ids(&self) -> Vec<IntentionId> {
        self.intentions
            .iter()
            .filter(|i| i.is_active())
            .map(|i| i.id)
            .collect()
    }

    pub fn active_goals(&self) -> impl Iterator<Item = &str> {
        self.intentions
            .iter()
            .filter(|i| i.is_active())
            .map(|i| i.goal())
    }

    /// Removes every intention that is no longer active and returns them.
    pub fn prune(&mut self) -> Vec<Intention> {
        let (done, active): (Vec<_>, Vec<_>) = std::mem::take(&mut self.intentions)
            .into_iter()
            .partition(|i| i.status.is_terminal());
        self.intentions = active;
        done
    }

    pub fn iter(&self) -> impl Iterator<Item = &Intention> {
        self.intentions.iter()
    }

    pub fn views(&self) -> Vec<IntentionView> {
        self.intentions.iter().map(Intention::view).collect()
    }

    pub fn len(&self) -> usize {
        self.intentions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intentions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intention(goal: &str) -> Intention {
        Intention::new(Desire::new(goal, 1.0), Plan::new("P", "p"))
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut table = IntentionTable::new();
        assert!(table.insert(intention("p(1)")));
        assert!(!table.insert(intention("p(1)")));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_prune_removes_terminal() {
        let mut table = IntentionTable::new();
        let a = intention("p(1)");
        let b = intention("p(2)");
        let c = intention("p(3)");
        let (a_id, b_id) = (a.id, b.id);
        table.insert(a);
        table.insert(b);
        table.insert(c);

        if let Some(i) = table.get_mut(&a_id) {
            i.status = IntentionStatus::Achieved;
        }
        if let Some(i) = table.get_mut(&b_id) {
            i.status = IntentionStatus::Failed {
                reason: "boom".into(),
            };
        }

        let done = table.prune();
        assert_eq!(done.len(), 2);
        assert_eq!(table.len(), 1);
        assert!(table.has_active("p(3)"));
        assert!(!table.has_active("p(1)"));
    }

    #[test]
    fn test_stall_reported_once() {
        let mut i = intention("unknown(1)");
        assert!(i.report_stall());
        assert!(!i.report_stall());
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(IntentionStatus::Active.label(), "active");
        assert!(IntentionStatus::Achieved.is_terminal());
        assert!(!IntentionStatus::Active.is_terminal());
    }
}
