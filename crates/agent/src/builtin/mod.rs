//! Content-creator roles: plans, handlers, sense rules and the initial state
//! of each scenario agent.

pub mod analyzer;
pub mod audience;
pub mod creator;
pub mod feedback;

use serde::{Deserialize, Serialize};

use crate::belief::BeliefStore;
use crate::desire::DesireSet;
use crate::directory::Role;
use crate::error::SenseError;
use crate::execution::{ExecContext, HandlerRegistry, StepOutcome};
use crate::plan::PlanLibrary;
use crate::predicate::GoalPredicate;
use crate::sense::SenseTable;

pub mod task {
    pub const GET_SUGGESTIONS: &str = "get_suggestions";
    pub const GET_RECOMMENDATIONS: &str = "get_recommendations";
    pub const GET_INSIGHTS: &str = "get_insights";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub task: String,
    pub video_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
}

impl TaskRequest {
    pub fn new(task: &str, video_id: &str) -> Self {
        Self {
            task: task.to_string(),
            video_id: video_id.to_string(),
            platform: None,
            audience: None,
            goal: None,
        }
    }

    pub fn with_platform(mut self, platform: &str) -> Self {
        self.platform = Some(platform.to_string());
        self
    }

    pub fn with_audience(mut self, audience: &str) -> Self {
        self.audience = Some(audience.to_string());
        self
    }

    pub fn with_goal(mut self, goal: &str) -> Self {
        self.goal = Some(goal.to_string());
        self
    }
}

#[derive(Debug)]
pub struct RoleKit {
    pub role: Role,
    pub plans: PlanLibrary,
    pub handlers: HandlerRegistry,
    pub sense: SenseTable,
}

impl RoleKit {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Creator => Self {
                role,
                plans: creator::plans(),
                handlers: creator::handlers(),
                sense: creator::sense(),
            },
            Role::Analyzer => Self {
                role,
                plans: analyzer::plans(),
                handlers: analyzer::handlers(),
                sense: analyzer::sense(),
            },
            Role::Audience => Self {
                role,
                plans: audience::plans(),
                handlers: audience::handlers(),
                sense: audience::sense(),
            },
            Role::Feedback => Self {
                role,
                plans: feedback::plans(),
                handlers: feedback::handlers(),
                sense: feedback::sense(),
            },
        }
    }
}

/// Initial beliefs and desires of the role's scenario agent.
pub fn seed(role: Role, beliefs: &mut BeliefStore, desires: &mut DesireSet) {
    match role {
        Role::Creator => creator::seed(beliefs, desires),
        Role::Analyzer => analyzer::seed(beliefs, desires),
        Role::Audience => audience::seed(beliefs, desires),
        Role::Feedback => feedback::seed(beliefs, desires),
    }
}

type FallibleStep = fn(&GoalPredicate, &mut ExecContext<'_>) -> Result<StepOutcome, String>;

/// Adapts a handler that reports missing arguments through `?`.
fn step(
    f: FallibleStep,
) -> impl Fn(&GoalPredicate, &mut ExecContext<'_>) -> StepOutcome + Send + Sync + 'static {
    move |goal, ctx| f(goal, ctx).unwrap_or_else(StepOutcome::Failed)
}

fn register(registry: &mut HandlerRegistry, predicate: &str, f: FallibleStep) {
    registry.register(predicate, step(f));
}

fn arg<'g>(goal: &'g GoalPredicate, index: usize) -> Result<&'g str, String> {
    goal.arg(index)
        .ok_or_else(|| format!("{} is missing argument {}", goal.name(), index + 1))
}

/// Rejects values that would break the goal strings they are spliced into.
fn token<'v>(value: &'v str, field: &str) -> Result<&'v str, SenseError> {
    let value = value.trim();
    if value.is_empty() || value.contains([',', '(', ')', '[', ']', '{', '}', '\'', '"']) {
        return Err(SenseError::Malformed(format!("invalid {field}: {value:?}")));
    }
    Ok(value)
}

fn require<'v>(value: &'v Option<String>, field: &str) -> Result<&'v str, SenseError> {
    match value {
        Some(v) => token(v, field),
        None => Err(SenseError::Malformed(format!("missing {field}"))),
    }
}

/// Single-quotes free text. Quotes and backslashes are dropped so the text
/// cannot end the quoted run early.
fn quote(text: &str) -> String {
    let inner: String = text.chars().filter(|c| !matches!(c, '\'' | '\\')).collect();
    format!("'{inner}'")
}

fn unquote(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .unwrap_or(text)
}

/// Finds `name(lead.., value, ..)` among the beliefs and returns the argument
/// right after the given leading arguments.
fn belief_arg(beliefs: &BeliefStore, name: &str, lead: &[&str]) -> Option<String> {
    let prefix = format!("{name}(");
    let found = beliefs.matching(&prefix).find_map(|belief| {
        let parsed = GoalPredicate::parse(&belief.content);
        let matches = lead
            .iter()
            .enumerate()
            .all(|(i, expected)| parsed.arg(i) == Some(*expected));
        if matches {
            parsed.arg(lead.len()).map(str::to_string)
        } else {
            None
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_plan_has_a_handler() {
        for role in Role::ALL {
            let kit = RoleKit::for_role(role);
            for plan in kit.plans.plans() {
                assert!(
                    kit.handlers.contains(plan.trigger().name()),
                    "{role}: {} has no handler",
                    plan.name
                );
            }
        }
    }

    #[test]
    fn test_token_validation() {
        assert_eq!(token(" v1 ", "video_id"), Ok("v1"));
        assert!(token("", "video_id").is_err());
        assert!(token("a,b", "video_id").is_err());
        for nested in ["v[1", "v]1", "{v1", "v1}"] {
            assert!(token(nested, "video_id").is_err(), "{nested}");
        }
        assert!(require(&None, "platform").is_err());
    }

    #[test]
    fn test_quote_round_trip() {
        assert_eq!(unquote(&quote("/videos/a.mp4")), "/videos/a.mp4");
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(quote(r"it's C:\clip"), r"'its C:clip'");
    }

    #[test]
    fn test_belief_arg() {
        let mut beliefs = BeliefStore::new();
        beliefs.add("audience_demographics(tiktok, genz)");
        beliefs.add("audience_demographics(youtube, general)");
        assert_eq!(
            belief_arg(&beliefs, "audience_demographics", &["youtube"]),
            Some("general".to_string())
        );
        assert_eq!(belief_arg(&beliefs, "audience_demographics", &["vimeo"]), None);
    }

    #[test]
    fn test_task_request_optional_fields() {
        let body = serde_json::to_string(&TaskRequest::new(task::GET_SUGGESTIONS, "v1")).unwrap();
        assert_eq!(body, r#"{"task":"get_suggestions","video_id":"v1"}"#);
    }
}
