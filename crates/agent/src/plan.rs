use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::desire::Desire;
use crate::predicate::GoalPredicate;

/// A named recipe for a goal predicate.
///
/// `steps` is descriptive only; execution dispatches on the trigger predicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub name: String,
    pub goal_predicate: String,
    pub steps: Vec<String>,
    #[serde(skip)]
    trigger: GoalPredicate,
}

impl Plan {
    pub fn new(name: impl Into<String>, goal_predicate: impl Into<String>) -> Self {
        let goal_predicate = goal_predicate.into();
        let trigger = GoalPredicate::parse(&goal_predicate);
        Self {
            name: name.into(),
            goal_predicate,
            steps: Vec::new(),
            trigger,
        }
    }

    pub fn with_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps = steps.into_iter().map(Into::into).collect();
        self
    }

    pub fn trigger(&self) -> &GoalPredicate {
        &self.trigger
    }

    pub fn matches(&self, desire: &Desire, mode: MatchMode) -> bool {
        match mode {
            MatchMode::Substring => desire.goal().contains(&self.goal_predicate),
            MatchMode::Structured => {
                let goal = desire.predicate();
                // A trigger without arguments accepts any arity.
                goal.name() == self.trigger.name()
                    && (self.trigger.arity() == 0 || self.trigger.arity() == goal.arity())
            }
        }
    }
}

/// How desires are matched against plan triggers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Predicate name equality plus arity check.
    #[default]
    Structured,
    /// Plan predicate contained anywhere in the goal text. A predicate that is a
    /// substring of another (`upload_video` in `request_upload_video(..)`) will
    /// absorb it, so definition order decides.
    Substring,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Structured => f.write_str("structured"),
            MatchMode::Substring => f.write_str("substring"),
        }
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "structured" => Ok(MatchMode::Structured),
            "substring" => Ok(MatchMode::Substring),
            other => Err(format!("unknown match mode: {other}")),
        }
    }
}

/// Per-role plans in definition order. The first matching plan wins.
#[derive(Debug, Clone, Default)]
pub struct PlanLibrary {
    plans: Vec<Plan>,
}

impl PlanLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plans.push(plan);
        self
    }

    pub fn add(&mut self, plan: Plan) {
        self.plans.push(plan);
    }

    pub fn find_plan(&self, desire: &Desire, mode: MatchMode) -> Option<&Plan> {
        self.plans.iter().find(|plan| plan.matches(desire, mode))
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
