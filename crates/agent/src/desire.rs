use serde::Serialize;
use std::collections::HashSet;

use crate::predicate::GoalPredicate;

/// A goal the agent wants achieved but has not committed to.
///
/// Identity is the goal string. The predicate is parsed once on creation.
#[derive(Debug, Clone, Serialize)]
pub struct Desire {
    goal: String,
    priority: f64,
    #[serde(skip)]
    predicate: GoalPredicate,
}

impl Desire {
    pub fn new(goal: impl Into<String>, priority: f64) -> Self {
        let goal = goal.into();
        let predicate = GoalPredicate::parse(&goal);
        Self {
            goal,
            priority,
            predicate,
        }
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }

    pub fn predicate(&self) -> &GoalPredicate {
        &self.predicate
    }
}

impl PartialEq for Desire {
    fn eq(&self, other: &Self) -> bool {
        self.goal == other.goal
    }
}

impl Eq for Desire {}

impl std::hash::Hash for Desire {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.goal.hash(state);
    }
}

/// Desires keyed by goal. Insertion order is kept so priority ties resolve
/// the same way every cycle.
#[derive(Debug, Clone, Default)]
pub struct DesireSet {
    desires: Vec<Desire>,
    index: HashSet<String>,
}

impl DesireSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a desire. Re-adding a goal is a no-op and keeps the first priority.
    pub fn add(&mut self, goal: impl Into<String>, priority: f64) -> bool {
        let goal = goal.into();
        if self.index.contains(&goal) {
            return false;
        }
        self.index.insert(goal.clone());
        self.desires.push(Desire::new(goal, priority));
        true
    }

    pub fn remove(&mut self, goal: &str) -> bool {
        if !self.index.remove(goal) {
            return false;
        }
        self.desires.retain(|d| d.goal != goal);
        true
    }

    pub fn contains(&self, goal: &str) -> bool {
        self.index.contains(goal)
    }

    pub fn all(&self) -> Vec<Desire> {
        self.desires.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Desire> {
        self.desires.iter()
    }

    pub fn len(&self) -> usize {
        self.desires.len()
    }

    pub fn is_empty(&self) -> bool {
        self.desires.is_empty()
    }
}
