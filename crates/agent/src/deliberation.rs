//! Promotes desires to intentions.

use tracing::{debug, info};

use crate::desire::DesireSet;
use crate::intention::{Intention, IntentionTable};
use crate::plan::{MatchMode, PlanLibrary};
use crate::types::AgentId;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliberationReport {
    pub formed: Vec<String>,
    /// Goals with no matching plan. They stay desires.
    pub unplannable: Vec<String>,
}

/// Runs one deliberation pass over `desires`.
///
/// Desires are visited by descending priority, ties in insertion order. A
/// desire that already has an active intention is skipped. Every goal bound
/// to an active intention afterwards is removed from `desires`.
pub fn deliberate(
    agent: &AgentId,
    desires: &mut DesireSet,
    intentions: &mut IntentionTable,
    library: &PlanLibrary,
    mode: MatchMode,
) -> DeliberationReport {
    let mut report = DeliberationReport::default();

    let mut candidates = desires.all();
    candidates.sort_by(|a, b| b.priority().total_cmp(&a.priority()));

    for desire in candidates {
        if intentions.has_active(desire.goal()) {
            continue;
        }

        match library.find_plan(&desire, mode) {
            Some(plan) => {
                info!(
                    agent_id = %agent,
                    goal = %desire.goal(),
                    plan = %plan.name,
                    "Formed intention"
                );
                let goal = desire.goal().to_string();
                if intentions.insert(Intention::new(desire, plan.clone())) {
                    report.formed.push(goal);
                }
            }
            None => {
                debug!(agent_id = %agent, goal = %desire.goal(), "No plan for desire");
                report.unplannable.push(desire.goal().to_string());
            }
        }
    }

    let bound: Vec<String> = intentions.active_goals().map(str::to_string).collect();
    for goal in bound {
        desires.remove(&goal);
    }

    report
}
