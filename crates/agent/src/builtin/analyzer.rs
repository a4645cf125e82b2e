use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{arg, quote, register, require, task, token, unquote, TaskRequest};
use crate::analysis::AnalysisKind;
use crate::belief::BeliefStore;
use crate::desire::DesireSet;
use crate::directory::Role;
use crate::error::{AnalysisError, SenseError};
use crate::execution::{ExecContext, HandlerRegistry, StepOutcome};
use crate::message::{ontology, Message, Performative};
use crate::plan::{Plan, PlanLibrary};
use crate::predicate::{goal, GoalPredicate};
use crate::sense::{SenseContext, SenseRule, SenseTable};
use crate::types::AgentId;

pub fn plans() -> PlanLibrary {
    PlanLibrary::new()
        .with_plan(
            Plan::new("GenerateRecommendationsPlan", "generate_recommendations").with_steps([
                "analyze_video",
                "consult_beliefs",
                "formulate_recommendations",
                "send_recommendations_to_creator",
            ]),
        )
        .with_plan(Plan::new("AnalyzeVideoPlan", "analyze_video").with_steps([
            "run_requested_analyses",
            "send_results_to_requester",
        ]))
}

pub fn handlers() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    register(&mut registry, "generate_recommendations", generate_recommendations);
    register(&mut registry, "analyze_video", analyze_video);
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
            "analysis_request",
            Performative::Request,
            ontology::VIDEO_ANALYSIS,
            on_analysis_request,
        ))
}

pub fn seed(beliefs: &mut BeliefStore, _desires: &mut DesireSet) {
    for fact in [
        "platform_requirements(tiktok, short_video, vertical)",
        "platform_requirements(instagram, visual_focus, varied_formats)",
        "platform_requirements(youtube, longer_form, horizontal)",
        "platform_algorithm_factors(tiktok, [trend_participation, watch_time, sound_usage])",
        "platform_algorithm_factors(instagram, [visual_appeal, engagement, hashtags])",
        "platform_algorithm_factors(youtube, [watch_time, SEO, topic_authority])",
        "current_trends(tiktok, [dance_challenges, lip_syncs])",
        "current_trends(youtube, [vlogs, educational_snippets])",
        "current_trends(instagram, [lifestyle_posts, reels])",
    ] {
        beliefs.add(fact);
    }
}

/// Recommendation table keyed by platform and goal. Unknown pairs get `{}`.
pub fn recommendations_for(platform: &str, purpose: &str) -> Value {
    match (platform, purpose) {
        ("tiktok", "virality") => json!({
            "resolution": "1080x1920",
            "style": "fast-paced",
            "sound": "trending_track",
            "duration": "15s",
        }),
        ("youtube", "retention") => json!({
            "resolution": "1920x1080",
            "style": "detailed",
            "SEO": "keywords",
        }),
        ("instagram", "branding") => json!({
            "format": "reel",
            "style": "aesthetic",
            "hashtags": "relevant_tags",
        }),
        _ => json!({}),
    }
}

fn generate_recommendations(
    g: &GoalPredicate,
    ctx: &mut ExecContext<'_>,
) -> Result<StepOutcome, String> {
    let video = arg(g, 0)?;
    let platform = arg(g, 1)?;
    let purpose = arg(g, 2)?;

    let to = ctx.address(Role::Creator);
    ctx.send(
        Message::new(to, Performative::Inform, ontology::VIDEO_ANALYSIS)
            .with_thread(format!("recommendations-{video}"))
            .with_json(&json!({
                "type": "recommendations",
                "video_id": video,
                "platform": platform,
                "goal": purpose,
                "recommendations": recommendations_for(platform, purpose),
            })),
    );
    info!(agent_id = %ctx.agent, video, platform, goal = purpose, "Sent recommendations");
    Ok(StepOutcome::Achieved)
}

fn parse_kinds(raw: &str) -> Result<Vec<AnalysisKind>, AnalysisError> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::parse::<AnalysisKind>)
        .collect()
}

/// `analyze_video(reference, requester, thread, [kinds])`
fn analyze_video(g: &GoalPredicate, ctx: &mut ExecContext<'_>) -> Result<StepOutcome, String> {
    let reference = unquote(arg(g, 0)?);
    let requester = AgentId::new(arg(g, 1)?);
    let thread = arg(g, 2)?;
    let kinds = arg(g, 3)?;

    let outcome = parse_kinds(kinds).and_then(|kinds| ctx.analyzer.analyze(reference, &kinds));

    match outcome {
        Ok(result) => {
            info!(
                agent_id = %ctx.agent,
                reference,
                objects = result.objects.len(),
                "Video analysis complete"
            );
            ctx.send(
                Message::new(requester, Performative::Inform, ontology::VIDEO_ANALYSIS)
                    .with_thread(thread)
                    .with_json(&result),
            );
            ctx.beliefs.add(goal("video_analyzed", [quote(reference)]));
            Ok(StepOutcome::Achieved)
        }
        Err(e) => {
            warn!(agent_id = %ctx.agent, reference, error = %e, "Video analysis failed");
            ctx.send(
                Message::new(requester, Performative::Failure, ontology::VIDEO_ANALYSIS)
                    .with_thread(thread)
                    .with_json(&json!({ "error": e.to_string() })),
            );
            Ok(StepOutcome::Failed(e.to_string()))
        }
    }
}

fn on_task(msg: &Message, ctx: &mut SenseContext<'_>) -> Result<(), SenseError> {
    let request: TaskRequest = msg.json_body()?;
    if request.task != task::GET_RECOMMENDATIONS {
        return Err(SenseError::UnknownTask(request.task));
    }

    let video = token(&request.video_id, "video_id")?;
    let platform = require(&request.platform, "platform")?;
    let purpose = require(&request.goal, "goal")?;
    ctx.desires
        .add(goal("generate_recommendations", [video, platform, purpose]), 1.0);
    Ok(())
}

#[derive(Debug, Deserialize)]
struct AnalysisRequest {
    video_reference: String,
    #[serde(default)]
    analysis_types: Vec<String>,
}

fn on_analysis_request(msg: &Message, ctx: &mut SenseContext<'_>) -> Result<(), SenseError> {
    let request: AnalysisRequest = msg.json_body()?;
    let requester = msg
        .sender
        .as_ref()
        .ok_or_else(|| SenseError::Malformed("analysis request without sender".into()))?;

    let kinds = request
        .analysis_types
        .iter()
        .map(|kind| token(kind, "analysis_type"))
        .collect::<Result<Vec<_>, _>>()?;

    let thread = match &msg.thread {
        Some(t) => token(t, "thread")?.to_string(),
        None => format!("analysis-{}", uuid::Uuid::new_v4().simple()),
    };

    ctx.desires.add(
        goal(
            "analyze_video",
            [
                quote(&request.video_reference),
                token(requester.as_str(), "sender")?.to_string(),
                thread,
                format!("[{}]", kinds.join(", ")),
            ],
        ),
        1.0,
    );
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
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_recommendation_table() {
        assert_eq!(recommendations_for("tiktok", "virality")["style"], "fast-paced");
        assert_eq!(
            recommendations_for("youtube", "retention"),
            json!({"resolution": "1920x1080", "style": "detailed", "SEO": "keywords"})
        );
        assert_eq!(
            recommendations_for("instagram", "branding"),
            json!({"format": "reel", "style": "aesthetic", "hashtags": "relevant_tags"})
        );
        assert_eq!(recommendations_for("vimeo", "virality"), json!({}));
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!(
            parse_kinds("[object_detection, color_analysis]").unwrap(),
            vec![AnalysisKind::ObjectDetection, AnalysisKind::ColorAnalysis]
        );
        assert!(parse_kinds("[]").unwrap().is_empty());
        assert!(parse_kinds("[depth]").is_err());
    }

    /// Applies the matching sense rule only.
    fn sense_only(msg: &Message) -> (Result<(), SenseError>, DesireSet) {
        let agent = AgentId::new("analyzer");
        let directory = Directory::default();
        let mut beliefs = BeliefStore::new();
        let mut desires = DesireSet::new();
        let mut ctx = SenseContext {
            agent: &agent,
            beliefs: &mut beliefs,
            desires: &mut desires,
            directory: &directory,
        };
        let sensed = match sense().find(msg) {
            Some(rule) => (rule.apply)(msg, &mut ctx),
            None => Ok(()),
        };
        (sensed, desires)
    }

    #[test]
    fn test_recommendation_request_adds_desire() {
        let msg = Message::new(AgentId::new("analyzer"), Performative::Request, ontology::TASK_REQUEST)
            .with_json(
                &TaskRequest::new(task::GET_RECOMMENDATIONS, "v1")
                    .with_platform("tiktok")
                    .with_goal("virality"),
            );
        let (sensed, desires) = sense_only(&msg);
        assert!(sensed.is_ok());
        assert_eq!(desires.len(), 1);
        assert!(desires.contains("generate_recommendations(v1, tiktok, virality)"));
    }

    #[test]
    fn test_bracketed_thread_is_malformed() {
        for thread in ["a[1]", "{a}"] {
            let msg = Message::new(AgentId::new("analyzer"), Performative::Request, ontology::VIDEO_ANALYSIS)
                .from_sender(AgentId::new("creator"))
                .with_thread(thread)
                .with_json(&json!({
                    "video_reference": "/videos/v1.mp4",
                    "analysis_types": ["object_detection"],
                }));
            let (sensed, desires) = sense_only(&msg);
            assert!(matches!(sensed, Err(SenseError::Malformed(_))), "{thread}");
            assert!(desires.is_empty(), "{thread}");
        }
    }

    /// Runs sense, deliberate and execute once over a single message.
    fn handle(msg: &Message) -> (Result<(), SenseError>, Vec<Message>, BeliefStore) {
        let agent = AgentId::new("analyzer");
        let directory = Directory::default();
        let tuning = Tuning::default();
        let analyzer = RandomAnalyzer::new(3);
        let mut rng = StdRng::seed_from_u64(3);
        let mut beliefs = BeliefStore::new();
        let mut desires = DesireSet::new();
        let mut intentions = IntentionTable::new();

        let sensed = {
            let mut ctx = SenseContext {
                agent: &agent,
                beliefs: &mut beliefs,
                desires: &mut desires,
                directory: &directory,
            };
            match sense().find(msg) {
                Some(rule) => (rule.apply)(msg, &mut ctx),
                None => Ok(()),
            }
        };

        deliberate(&agent, &mut desires, &mut intentions, &plans(), MatchMode::Structured);
        let handlers = handlers();
        let mut ctx = crate::execution::ExecContext::new(
            &agent,
            &mut beliefs,
            &mut desires,
            &directory,
            &tuning,
            &analyzer,
            &mut rng,
        );
        let report = execute(&mut intentions, &handlers, &mut ctx);
        (sensed, report.outbox, beliefs)
    }

    #[test]
    fn test_unknown_task_refused() {
        let msg = Message::new(AgentId::new("analyzer"), Performative::Request, ontology::TASK_REQUEST)
            .with_json(&TaskRequest::new("get_lunch", "v1"));
        let (sensed, outbox, _) = handle(&msg);
        assert_eq!(sensed, Err(SenseError::UnknownTask("get_lunch".into())));
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_missing_platform_is_malformed() {
        let msg = Message::new(AgentId::new("analyzer"), Performative::Request, ontology::TASK_REQUEST)
            .with_json(&TaskRequest::new(task::GET_RECOMMENDATIONS, "v1").with_goal("virality"));
        let (sensed, _, _) = handle(&msg);
        assert!(matches!(sensed, Err(SenseError::Malformed(_))));
    }

    #[test]
    fn test_video_analysis_inform() {
        let msg = Message::new(AgentId::new("analyzer"), Performative::Request, ontology::VIDEO_ANALYSIS)
            .from_sender(AgentId::new("creator"))
            .with_thread("analysis-v1")
            .with_json(&json!({
                "video_reference": "/videos/v1.mp4",
                "analysis_types": ["object_detection", "color_analysis"],
            }));
        let (sensed, outbox, beliefs) = handle(&msg);
        assert!(sensed.is_ok());
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].performative, Performative::Inform);
        assert_eq!(outbox[0].to, AgentId::new("creator"));
        assert_eq!(outbox[0].thread.as_deref(), Some("analysis-v1"));
        let body: Value = outbox[0].json_body().unwrap();
        assert!(body["objects"].as_array().is_some_and(|o| o.len() >= 3));
        assert!(beliefs.has("video_analyzed('/videos/v1.mp4')"));
    }

    #[test]
    fn test_video_analysis_failure() {
        let msg = Message::new(AgentId::new("analyzer"), Performative::Request, ontology::VIDEO_ANALYSIS)
            .from_sender(AgentId::new("creator"))
            .with_thread("analysis-v2")
            .with_json(&json!({
                "video_reference": "/videos/v2.mp4",
                "analysis_types": ["depth_estimation"],
            }));
        let (sensed, outbox, _) = handle(&msg);
        assert!(sensed.is_ok());
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].performative, Performative::Failure);
        let body: Value = outbox[0].json_body().unwrap();
        assert_eq!(body["error"], "Unsupported analysis kind: depth_estimation");
    }
}
