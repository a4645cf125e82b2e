use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::{arg, quote, task, token, TaskRequest};
use crate::belief::BeliefStore;
use crate::desire::DesireSet;
use crate::directory::Role;
use crate::error::SenseError;
use crate::execution::{ExecContext, HandlerRegistry, StepOutcome};
use crate::message::{ontology, Message, Performative};
use crate::plan::{Plan, PlanLibrary};
use crate::predicate::{goal, GoalPredicate};
use crate::sense::{SenseContext, SenseRule, SenseTable};

const SUGGESTIONS: &str = "suggestions_received";
const COMMENTS: &str = "comments_received";

/// Feedback that may trickle in while collecting.
const FEEDBACK_POOL: [(&str, &str); 5] = [
    (SUGGESTIONS, "Looks good!"),
    (SUGGESTIONS, "Could improve audio."),
    (COMMENTS, "Loved it!"),
    (COMMENTS, "What software did you use?"),
    (SUGGESTIONS, "Try a different hook."),
];

/// Body of an `inform` / `feedback-source` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub kind: FeedbackKind,
    pub video_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Comment,
    Suggestion,
}

impl FeedbackKind {
    fn predicate(&self) -> &'static str {
        match self {
            FeedbackKind::Comment => COMMENTS,
            FeedbackKind::Suggestion => SUGGESTIONS,
        }
    }
}

pub fn plans() -> PlanLibrary {
    PlanLibrary::new()
        .with_plan(Plan::new("CollectFeedbackPlan", "collect_all_feedback").with_steps([
            "monitor_feedback_sources",
            "receive_suggestions",
            "receive_comments",
        ]))
        .with_plan(
            Plan::new("ConsolidateFeedbackPlan", "consolidate_feedback").with_steps([
                "gather_feedback_beliefs",
                "structure_feedback",
                "send_feedback_to_creator",
            ]),
        )
}

pub fn handlers() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    super::register(&mut registry, "collect_all_feedback", collect_all_feedback);
    super::register(&mut registry, "consolidate_feedback", consolidate_feedback);
    registry
}

pub fn sense() -> SenseTable {
    SenseTable::new()
        .with_rule(SenseRule::new(
            "task",
            Performative::Request,
            ontology::TASK_REQUEST,
            on_task,
        ))
        .with_rule(SenseRule::new(
            "feedback_source",
            Performative::Inform,
            ontology::FEEDBACK_SOURCE,
            on_feedback,
        ))
}

/// The feedback agent starts empty and reacts to requests.
pub fn seed(_beliefs: &mut BeliefStore, _desires: &mut DesireSet) {}

fn feedback_belief(kind: &str, video: &str, text: &str) -> String {
    goal(kind, [video.to_string(), format!("[{}]", quote(text))])
}

fn feedback_for<'b>(beliefs: &'b BeliefStore, video: &str) -> Vec<&'b str> {
    let suggestions = format!("{SUGGESTIONS}({video},");
    let comments = format!("{COMMENTS}({video},");
    beliefs
        .matching("")
        .filter(|b| b.content.starts_with(&suggestions) || b.content.starts_with(&comments))
        .map(|b| b.content.as_str())
        .collect()
}

fn collect_all_feedback(g: &GoalPredicate, ctx: &mut ExecContext<'_>) -> Result<StepOutcome, String> {
    let video = arg(g, 0)?;

    let arrival = ctx.tuning.feedback_arrival_probability;
    if ctx.chance(arrival) {
        if let Some((kind, text)) = ctx.pick(&FEEDBACK_POOL).copied() {
            let content = feedback_belief(kind, video, text);
            if ctx.beliefs.add(content.clone()) {
                debug!(agent_id = %ctx.agent, video, feedback = %content, "New feedback arrived");
            }
        }
    }

    let received = feedback_for(ctx.beliefs, video).len();
    if received < ctx.tuning.feedback_threshold {
        return Ok(StepOutcome::Pending);
    }

    ctx.desires.add(goal("consolidate_feedback", [video]), 1.0);
    info!(agent_id = %ctx.agent, video, received, "Enough feedback collected");
    Ok(StepOutcome::Achieved)
}

fn consolidate_feedback(g: &GoalPredicate, ctx: &mut ExecContext<'_>) -> Result<StepOutcome, String> {
    let video = arg(g, 0)?;
    let consolidated: Vec<String> = feedback_for(ctx.beliefs, video)
        .into_iter()
        .map(str::to_string)
        .collect();

    let to = ctx.address(Role::Creator);
    ctx.send(
        Message::new(to, Performative::Inform, ontology::VIDEO_ANALYSIS)
            .with_thread(format!("suggestions-{video}"))
            .with_json(&json!({
                "type": "feedback",
                "video_id": video,
                "feedback": consolidated,
            })),
    );
    info!(agent_id = %ctx.agent, video, items = consolidated.len(), "Sent consolidated feedback");
    Ok(StepOutcome::Achieved)
}

fn on_task(msg: &Message, ctx: &mut SenseContext<'_>) -> Result<(), SenseError> {
    let request: TaskRequest = msg.json_body()?;
    if request.task != task::GET_SUGGESTIONS {
        return Err(SenseError::UnknownTask(request.task));
    }
    let video = token(&request.video_id, "video_id")?;
    ctx.desires.add(goal("collect_all_feedback", [video]), 1.0);
    Ok(())
}

fn on_feedback(msg: &Message, ctx: &mut SenseContext<'_>) -> Result<(), SenseError> {
    let item: FeedbackItem = msg.json_body()?;
    let video = token(&item.video_id, "video_id")?;
    ctx.beliefs
        .add(feedback_belief(item.kind.predicate(), video, &item.text));
    Ok(())
}
