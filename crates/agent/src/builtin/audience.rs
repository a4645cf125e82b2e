use serde_json::{json, Value};
use tracing::info;

use super::{arg, belief_arg, register, require, task, token, TaskRequest};
use crate::belief::BeliefStore;
use crate::desire::DesireSet;
use crate::directory::Role;
use crate::error::SenseError;
use crate::execution::{ExecContext, HandlerRegistry, StepOutcome};
use crate::message::{ontology, Message, Performative};
use crate::plan::{Plan, PlanLibrary};
use crate::predicate::{goal, GoalPredicate};
use crate::sense::{SenseContext, SenseRule, SenseTable};

const UNKNOWN: &str = "unknown";

pub fn plans() -> PlanLibrary {
    PlanLibrary::new()
        .with_plan(
            Plan::new("GenerateAudienceInsightsPlan", "generate_audience_insights").with_steps([
                "analyze_video_potential",
                "consult_beliefs",
                "formulate_insights",
                "send_insights_to_creator",
            ]),
        )
        .with_plan(
            Plan::new("AnalyzeEngagementTrendsPlan", "analyze_engagement_trends").with_steps([
                "collect_recent_engagement_data",
                "identify_trends",
                "update_beliefs_with_trends",
            ]),
        )
        .with_plan(
            Plan::new(
                "PredictFutureContentPreferencesPlan",
                "predict_future_content_preferences",
            )
            .with_steps([
                "analyze_historical_data",
                "apply_prediction_model",
                "update_beliefs_with_predictions",
            ]),
        )
        .with_plan(
            Plan::new(
                "EvaluateContentStylesPlan",
                "evaluate_effectiveness_of_content_styles",
            )
            .with_steps([
                "gather_style_performance_data",
                "analyze_effectiveness",
                "record_style_evaluation",
            ]),
        )
        .with_plan(
            Plan::new(
                "IdentifyInfluentialSegmentsPlan",
                "identify_influential_audience_segments",
            )
            .with_steps([
                "collect_audience_interaction_data",
                "identify_key_segments",
                "update_beliefs_with_segments",
            ]),
        )
        .with_plan(
            Plan::new("TrackEmergingTrendsPlan", "track_emerging_trends").with_steps([
                "monitor_new_content",
                "identify_new_trends",
                "update_beliefs_with_emerging_trends",
            ]),
        )
}

pub fn handlers() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    register(&mut registry, "generate_audience_insights", generate_audience_insights);
    register(&mut registry, "analyze_engagement_trends", analyze_engagement_trends);
    register(
        &mut registry,
        "predict_future_content_preferences",
        predict_future_content_preferences,
    );
    register(
        &mut registry,
        "evaluate_effectiveness_of_content_styles",
        evaluate_content_styles,
    );
    register(
        &mut registry,
        "identify_influential_audience_segments",
        identify_influential_segments,
    );
    register(&mut registry, "track_emerging_trends", track_emerging_trends);
    registry
}

pub fn sense() -> SenseTable {
    SenseTable::new().with_rule(SenseRule::new(
        "task",
        Performative::Request,
        ontology::TASK_REQUEST,
        on_task,
    ))
}

pub fn seed(beliefs: &mut BeliefStore, desires: &mut DesireSet) {
    for fact in [
        "audience_demographics(tiktok, genz)",
        "audience_demographics(instagram, millennials_genz)",
        "audience_demographics(youtube, general)",
        "audience_content_preferences(genz, tiktok, [dance, challenges, memes])",
        "audience_content_preferences(millennials_genz, instagram, [lifestyle, aesthetics, stories])",
        "audience_content_preferences(general, youtube, [educational, vlogs, tutorials])",
        "audience_engagement_patterns(genz, tiktok, short_attention_span)",
        "audience_engagement_patterns(general, youtube, longer_watch_time)",
        "audience_trending_topics(tiktok, ['music_challenges', 'viral_dances'])",
        "audience_trending_topics(youtube, ['tech_reviews', 'travel_vlogs'])",
        "audience_trending_topics(instagram, ['fashion_trends', 'wellness_tips'])",
    ] {
        beliefs.add(fact);
    }

    desires.add("analyze_engagement_trends(tiktok, genz)", 0.8);
    desires.add("predict_future_content_preferences(youtube, general)", 0.7);
    desires.add(
        "evaluate_effectiveness_of_content_styles(instagram, millennials_genz)",
        0.6,
    );
    desires.add("identify_influential_audience_segments(tiktok)", 0.9);
    desires.add("track_emerging_trends(youtube)", 0.85);
}

/// Insight table keyed by audience and goal. Unknown pairs get `{}`.
pub fn insights_for(audience: &str, purpose: &str) -> Value {
    match (audience, purpose) {
        ("genz", "virality") => json!({
            "engagement_pattern": "short_attention_span",
            "preferred_content": ["dance", "challenges", "memes"],
        }),
        ("general", "retention") => json!({
            "engagement_pattern": "longer_watch_time",
            "preferred_content": ["educational", "vlogs", "tutorials"],
        }),
        ("millennials_genz", "branding") => json!({
            "engagement_pattern": "visual_engagement",
            "preferred_content": ["lifestyle", "aesthetics", "stories"],
        }),
        _ => json!({}),
    }
}

fn generate_audience_insights(
    g: &GoalPredicate,
    ctx: &mut ExecContext<'_>,
) -> Result<StepOutcome, String> {
    let video = arg(g, 0)?;
    let audience = arg(g, 1)?;
    let purpose = arg(g, 2)?;

    let to = ctx.address(Role::Creator);
    ctx.send(
        Message::new(to, Performative::Inform, ontology::VIDEO_ANALYSIS)
            .with_thread(format!("insights-{video}"))
            .with_json(&json!({
                "type": "insights",
                "video_id": video,
                "audience": audience,
                "goal": purpose,
                "insights": insights_for(audience, purpose),
            })),
    );
    info!(agent_id = %ctx.agent, video, audience, goal = purpose, "Sent audience insights");
    Ok(StepOutcome::Achieved)
}

fn analyze_engagement_trends(
    g: &GoalPredicate,
    ctx: &mut ExecContext<'_>,
) -> Result<StepOutcome, String> {
    let platform = arg(g, 0)?;
    let audience = arg(g, 1)?;
    let pattern = belief_arg(ctx.beliefs, "audience_engagement_patterns", &[audience, platform])
        .unwrap_or_else(|| UNKNOWN.to_string());
    ctx.beliefs.add(goal(
        "engagement_trends_analyzed",
        [platform, audience, pattern.as_str()],
    ));
    Ok(StepOutcome::Achieved)
}

fn predict_future_content_preferences(
    g: &GoalPredicate,
    ctx: &mut ExecContext<'_>,
) -> Result<StepOutcome, String> {
    let platform = arg(g, 0)?;
    let audience = arg(g, 1)?;
    let preferences =
        belief_arg(ctx.beliefs, "audience_content_preferences", &[audience, platform])
            .unwrap_or_else(|| "[]".to_string());
    ctx.beliefs.add(goal(
        "predicted_content_preferences",
        [platform, audience, preferences.as_str()],
    ));
    Ok(StepOutcome::Achieved)
}

fn evaluate_content_styles(
    g: &GoalPredicate,
    ctx: &mut ExecContext<'_>,
) -> Result<StepOutcome, String> {
    let platform = arg(g, 0)?;
    let audience = arg(g, 1)?;
    let effective = belief_arg(ctx.beliefs, "audience_content_preferences", &[audience, platform])
        .map_or("low", |_| "high");
    ctx.beliefs.add(goal(
        "content_styles_evaluated",
        [platform, audience, effective],
    ));
    Ok(StepOutcome::Achieved)
}

fn identify_influential_segments(
    g: &GoalPredicate,
    ctx: &mut ExecContext<'_>,
) -> Result<StepOutcome, String> {
    let platform = arg(g, 0)?;
    let segment = belief_arg(ctx.beliefs, "audience_demographics", &[platform])
        .unwrap_or_else(|| UNKNOWN.to_string());
    ctx.beliefs
        .add(goal("influential_segment", [platform, segment.as_str()]));
    Ok(StepOutcome::Achieved)
}

fn track_emerging_trends(
    g: &GoalPredicate,
    ctx: &mut ExecContext<'_>,
) -> Result<StepOutcome, String> {
    let platform = arg(g, 0)?;
    let topics = belief_arg(ctx.beliefs, "audience_trending_topics", &[platform])
        .unwrap_or_else(|| "[]".to_string());
    ctx.beliefs
        .add(goal("emerging_trends", [platform, topics.as_str()]));
    Ok(StepOutcome::Achieved)
}

fn on_task(msg: &Message, ctx: &mut SenseContext<'_>) -> Result<(), SenseError> {
    let request: TaskRequest = msg.json_body()?;
    if request.task != task::GET_INSIGHTS {
        return Err(SenseError::UnknownTask(request.task));
    }

    let video = token(&request.video_id, "video_id")?;
    let audience = require(&request.audience, "audience")?;
    let purpose = require(&request.goal, "goal")?;
    ctx.desires
        .add(goal("generate_audience_insights", [video, audience, purpose]), 1.0);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::RandomAnalyzer;
    use crate::deliberation::deliberate;
    use crate::directory::Directory;
    use crate::execution::{execute, Tuning};
    use crate::intention::IntentionTable;
    use crate::plan::MatchMode;
    use crate::types::AgentId;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_seed_goals_all_complete() {
        let agent = AgentId::new("audience");
        let directory = Directory::default();
        let tuning = Tuning::default();
        let analyzer = RandomAnalyzer::new(0);
        let mut rng = StdRng::seed_from_u64(0);
        let mut beliefs = BeliefStore::new();
        let mut desires = DesireSet::new();
        let mut intentions = IntentionTable::new();
        seed(&mut beliefs, &mut desires);

        let formed = deliberate(&agent, &mut desires, &mut intentions, &plans(), MatchMode::Structured);
        assert_eq!(formed.formed.len(), 5);
        // Highest priority first.
        assert_eq!(formed.formed[0], "identify_influential_audience_segments(tiktok)");

        let handlers = handlers();
        let mut ctx = ExecContext::new(
            &agent,
            &mut beliefs,
            &mut desires,
            &directory,
            &tuning,
            &analyzer,
            &mut rng,
        );
        let report = execute(&mut intentions, &handlers, &mut ctx);
        assert_eq!(report.achieved.len(), 5);
        assert!(intentions.is_empty());

        assert!(beliefs.has("influential_segment(tiktok, genz)"));
        assert!(beliefs.has("engagement_trends_analyzed(tiktok, genz, short_attention_span)"));
        assert!(beliefs.has("predicted_content_preferences(youtube, general, [educational, vlogs, tutorials])"));
        assert!(beliefs.has("content_styles_evaluated(instagram, millennials_genz, high)"));
        assert!(beliefs.has("emerging_trends(youtube, ['tech_reviews', 'travel_vlogs'])"));
    }

    #[test]
    fn test_insight_table() {
        assert_eq!(insights_for("genz", "virality")["engagement_pattern"], "short_attention_span");
        assert_eq!(
            insights_for("millennials_genz", "branding")["engagement_pattern"],
            "visual_engagement"
        );
        assert_eq!(insights_for("boomers", "virality"), json!({}));
    }

    #[test]
    fn test_get_insights_task() {
        let agent = AgentId::new("audience");
        let directory = Directory::default();
        let mut beliefs = BeliefStore::new();
        let mut desires = DesireSet::new();
        let msg = Message::new(agent.clone(), Performative::Request, ontology::TASK_REQUEST)
            .with_json(
                &TaskRequest::new(task::GET_INSIGHTS, "dance_video_01")
                    .with_audience("genz")
                    .with_goal("virality"),
            );
        let mut ctx = SenseContext {
            agent: &agent,
            beliefs: &mut beliefs,
            desires: &mut desires,
            directory: &directory,
        };
        assert!(on_task(&msg, &mut ctx).is_ok());
        assert!(desires.contains("generate_audience_insights(dance_video_01, genz, virality)"));
    }
}
