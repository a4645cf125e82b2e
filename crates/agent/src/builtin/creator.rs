use serde_json::{json, Value};
use tracing::info;

use super::{arg, quote, register, task, token, unquote, TaskRequest};
use crate::analysis::{AnalysisKind, AnalysisResult};
use crate::belief::BeliefStore;
use crate::desire::DesireSet;
use crate::directory::Role;
use crate::error::SenseError;
use crate::execution::{ExecContext, HandlerRegistry, StepOutcome};
use crate::message::{ontology, Message, Performative};
use crate::plan::{Plan, PlanLibrary};
use crate::predicate::{goal, GoalPredicate};
use crate::sense::{SenseContext, SenseRule, SenseTable};

const ADAPT_PRIORITY: f64 = 0.7;
const PROCESS_FEEDBACK_PRIORITY: f64 = 0.8;
const REQUEST_SUGGESTIONS_PRIORITY: f64 = 0.7;

pub fn plans() -> PlanLibrary {
    PlanLibrary::new()
        .with_plan(Plan::new("UploadVideoPlan", "upload_video").with_steps(["perform_upload_action"]))
        .with_plan(
            Plan::new("RequestSuggestionsPlan", "request_suggestions")
                .with_steps(["send_request_to_feedback_agent"]),
        )
        .with_plan(
            Plan::new("GetSuggestionsPlan", "get_suggestions").with_steps(["form_request_desire"]),
        )
        .with_plan(
            Plan::new("ConsultPlatformAgentPlan", "consult_platform_agent")
                .with_steps(["send_consult_message_to_platform_agent"]),
        )
        .with_plan(
            Plan::new("ConsultAudienceAgentPlan", "consult_audience_agent")
                .with_steps(["send_consult_message_to_audience_agent"]),
        )
        .with_plan(
            Plan::new("RequestVideoAnalysisPlan", "request_video_analysis")
                .with_steps(["send_analysis_request_to_analyzer"]),
        )
        .with_plan(
            Plan::new("ProcessFeedbackPlan", "process_feedback")
                .with_steps(["analyze_feedback", "form_adaptation_desire"]),
        )
        .with_plan(
            Plan::new("AdaptContentPlan", "adapt_content")
                .with_steps(["perform_editing_action", "update_content_belief"]),
        )
        .with_plan(Plan::new("AchieveViralityPlan", "achieve_virality").with_steps([
            "consult_platform_agent_for_virality",
            "consult_audience_agent_for_virality",
            "wait_for_recommendations_and_insights",
            "adapt_content_based_on_recommendations_and_insights",
            "monitor_performance",
        ]))
        .with_plan(Plan::new("OptimizeForPlatformPlan", "optimize_for_platform").with_steps([
            "consult_platform_agent_for_optimization",
            "wait_for_recommendations",
            "adapt_content_based_on_recommendations",
        ]))
        .with_plan(Plan::new("BuildBrandingPlan", "build_branding").with_steps([
            "consistently_create_content",
            "engage_with_audience",
            "analyze_brand_perception",
        ]))
}

pub fn handlers() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    register(&mut registry, "upload_video", upload_video);
    register(&mut registry, "get_suggestions", get_suggestions);
    register(&mut registry, "request_suggestions", request_suggestions);
    register(&mut registry, "consult_platform_agent", consult_platform_agent);
    register(&mut registry, "consult_audience_agent", consult_audience_agent);
    register(&mut registry, "request_video_analysis", request_video_analysis);
    register(&mut registry, "process_feedback", process_feedback);
    register(&mut registry, "adapt_content", adapt_content);
    register(&mut registry, "achieve_virality", achieve_virality);
    register(&mut registry, "optimize_for_platform", optimize_for_platform);
    registry.register("build_branding", |_, _| StepOutcome::Pending);
    registry
}

pub fn sense() -> SenseTable {
    SenseTable::new()
        .with_rule(SenseRule::new(
            "result",
            Performative::Inform,
            ontology::VIDEO_ANALYSIS,
            on_result,
        ))
        .with_rule(SenseRule::new(
            "analysis_failure",
            Performative::Failure,
            ontology::VIDEO_ANALYSIS,
            on_failure,
        ))
        .with_rule(SenseRule::new(
            "task_failure",
            Performative::Failure,
            ontology::TASK_REQUEST,
            on_failure,
        ))
        .with_rule(SenseRule::new(
            "task_refused",
            Performative::Refuse,
            ontology::TASK_REQUEST,
            on_refuse,
        ))
        .with_rule(SenseRule::new(
            "task_agreed",
            Performative::Agree,
            ontology::TASK_REQUEST,
            on_agree,
        ))
        .with_rule(SenseRule::new(
            "analysis_agreed",
            Performative::Agree,
            ontology::VIDEO_ANALYSIS,
            on_agree,
        ))
}

pub fn seed(beliefs: &mut BeliefStore, desires: &mut DesireSet) {
    for fact in [
        "tiktok_popular_genz",
        "instagram_popular_millennials",
        "youtube_popular_general",
        "platform_optimization_agent_available",
        "audience_analysis_agent_available",
        "feedback_agent_available",
    ] {
        beliefs.add(fact);
    }

    // Dance video virality on TikTok.
    desires.add("achieve_virality(dance_video_01, tiktok)", 0.9);
    desires.add("consult_platform_agent(dance_video_01, tiktok, virality)", 0.85);
    desires.add("consult_audience_agent(dance_video_01, genz, virality)", 0.85);
    desires.add("upload_video(dance_video_01, tiktok)", 0.8);
    desires.add("get_suggestions(dance_video_01)", 0.7);
    desires.add(
        "request_video_analysis(dance_video_01, '/videos/dance_video_01.mp4')",
        0.65,
    );

    // Educational snippet feedback on YouTube.
    desires.add("upload_video(edu_snippet_01, youtube)", 0.6);
    desires.add("get_suggestions(edu_snippet_01)", 0.5);

    // Cross-platform branding for a vlog already on YouTube.
    desires.add("build_branding", 1.0);
    desires.add("consult_platform_agent(vlog_highlight_01, instagram, branding)", 0.45);
    desires.add("optimize_for_platform(vlog_highlight_01, instagram)", 0.4);
    desires.add("optimize_for_platform(vlog_highlight_01, tiktok)", 0.3);
    beliefs.add("video_uploaded(vlog_highlight_01, youtube)");

    // No plan exists for this one.
    desires.add("monetize_content", 0.2);
}

fn upload_video(g: &GoalPredicate, ctx: &mut ExecContext<'_>) -> Result<StepOutcome, String> {
    let video = arg(g, 0)?;
    let platform = arg(g, 1)?;
    ctx.beliefs.add(goal("video_uploaded", [video, platform]));
    info!(agent_id = %ctx.agent, video, platform, "Uploaded video");
    Ok(StepOutcome::Achieved)
}

fn get_suggestions(g: &GoalPredicate, ctx: &mut ExecContext<'_>) -> Result<StepOutcome, String> {
    let video = arg(g, 0)?;
    ctx.desires
        .add(goal("request_suggestions", [video]), REQUEST_SUGGESTIONS_PRIORITY);
    Ok(StepOutcome::Achieved)
}

fn request_suggestions(g: &GoalPredicate, ctx: &mut ExecContext<'_>) -> Result<StepOutcome, String> {
    let video = arg(g, 0)?;
    let to = ctx.address(Role::Feedback);
    ctx.send(
        Message::new(to, Performative::Request, ontology::TASK_REQUEST)
            .with_thread(format!("suggestions-{video}"))
            .with_json(&TaskRequest::new(task::GET_SUGGESTIONS, video)),
    );
    info!(agent_id = %ctx.agent, video, "Requested suggestions");
    Ok(StepOutcome::Achieved)
}

fn consult_platform_agent(g: &GoalPredicate, ctx: &mut ExecContext<'_>) -> Result<StepOutcome, String> {
    let video = arg(g, 0)?;
    let platform = arg(g, 1)?;
    let purpose = arg(g, 2)?;
    let to = ctx.address(Role::Analyzer);
    ctx.send(
        Message::new(to, Performative::Request, ontology::TASK_REQUEST)
            .with_thread(format!("recommendations-{video}"))
            .with_json(
                &TaskRequest::new(task::GET_RECOMMENDATIONS, video)
                    .with_platform(platform)
                    .with_goal(purpose),
            ),
    );
    info!(agent_id = %ctx.agent, video, platform, goal = purpose, "Consulted platform agent");
    Ok(StepOutcome::Achieved)
}

fn consult_audience_agent(g: &GoalPredicate, ctx: &mut ExecContext<'_>) -> Result<StepOutcome, String> {
    let video = arg(g, 0)?;
    let audience = arg(g, 1)?;
    let purpose = arg(g, 2)?;
    let to = ctx.address(Role::Audience);
    ctx.send(
        Message::new(to, Performative::Request, ontology::TASK_REQUEST)
            .with_thread(format!("insights-{video}"))
            .with_json(
                &TaskRequest::new(task::GET_INSIGHTS, video)
                    .with_audience(audience)
                    .with_goal(purpose),
            ),
    );
    info!(agent_id = %ctx.agent, video, audience, goal = purpose, "Consulted audience agent");
    Ok(StepOutcome::Achieved)
}

fn request_video_analysis(g: &GoalPredicate, ctx: &mut ExecContext<'_>) -> Result<StepOutcome, String> {
    let video = arg(g, 0)?;
    let reference = unquote(arg(g, 1)?);
    let to = ctx.address(Role::Analyzer);
    ctx.send(
        Message::new(to, Performative::Request, ontology::VIDEO_ANALYSIS)
            .with_thread(format!("analysis-{video}"))
            .with_json(&json!({
                "video_reference": reference,
                "analysis_types": [
                    AnalysisKind::ObjectDetection.as_str(),
                    AnalysisKind::ColorAnalysis.as_str(),
                ],
            })),
    );
    ctx.beliefs.add(goal("video_analysis_requested", [video]));
    Ok(StepOutcome::Achieved)
}

fn process_feedback(g: &GoalPredicate, ctx: &mut ExecContext<'_>) -> Result<StepOutcome, String> {
    let video = arg(g, 0)?;
    ctx.desires.add(
        goal("adapt_content", [video.to_string(), quote("based_on_feedback")]),
        1.0,
    );
    info!(agent_id = %ctx.agent, video, "Processed feedback");
    Ok(StepOutcome::Achieved)
}

fn adapt_content(g: &GoalPredicate, ctx: &mut ExecContext<'_>) -> Result<StepOutcome, String> {
    let video = arg(g, 0)?;
    ctx.beliefs.add(goal("content_adapted", [video]));
    info!(agent_id = %ctx.agent, video, "Content adapted");
    Ok(StepOutcome::Achieved)
}

fn achieve_virality(g: &GoalPredicate, ctx: &mut ExecContext<'_>) -> Result<StepOutcome, String> {
    let video = arg(g, 0)?;
    if !ctx.beliefs.has(&goal("content_adapted", [video])) {
        return Ok(StepOutcome::Pending);
    }
    let probability = ctx.tuning.virality_probability;
    if !ctx.chance(probability) {
        return Ok(StepOutcome::Pending);
    }
    ctx.beliefs.add(goal("content_viral", [video]));
    info!(agent_id = %ctx.agent, video, "Video went viral");
    Ok(StepOutcome::Achieved)
}

fn optimize_for_platform(g: &GoalPredicate, ctx: &mut ExecContext<'_>) -> Result<StepOutcome, String> {
    let video = arg(g, 0)?;
    let platform = arg(g, 1)?;
    if !ctx.beliefs.has(&goal("content_adapted", [video])) {
        return Ok(StepOutcome::Pending);
    }
    ctx.beliefs.add(goal("content_optimized", [video, platform]));
    info!(agent_id = %ctx.agent, video, platform, "Optimized for platform");
    Ok(StepOutcome::Achieved)
}

fn thread_of(msg: &Message) -> &str {
    msg.thread.as_deref().unwrap_or("unknown")
}

fn video_of(body: &Value) -> Result<&str, SenseError> {
    let video = body
        .get("video_id")
        .and_then(Value::as_str)
        .ok_or_else(|| SenseError::Malformed("missing video_id".into()))?;
    token(video, "video_id")
}

fn on_result(msg: &Message, ctx: &mut SenseContext<'_>) -> Result<(), SenseError> {
    let body: Value = msg.json_body()?;

    let Some(kind) = body.get("type").and_then(Value::as_str) else {
        return on_analysis_result(msg, ctx);
    };

    let video = video_of(&body)?;
    match kind {
        "recommendations" => {
            let recommendations = body.get("recommendations").cloned().unwrap_or(json!({}));
            let rendered = recommendations.to_string();
            ctx.beliefs
                .add(goal("recommendations_received", [video, rendered.as_str()]));
            ctx.desires
                .add(goal("adapt_content", [video, rendered.as_str()]), ADAPT_PRIORITY);
        }
        "insights" => {
            let insights = body.get("insights").cloned().unwrap_or(json!({}));
            ctx.beliefs
                .add(goal("insights_received", [video.to_string(), insights.to_string()]));
        }
        "feedback" => {
            let feedback = body.get("feedback").cloned().unwrap_or(json!([]));
            let rendered = feedback.to_string();
            ctx.beliefs
                .add(goal("feedback_received", [video, rendered.as_str()]));
            ctx.desires.add(
                goal("process_feedback", [video, rendered.as_str()]),
                PROCESS_FEEDBACK_PRIORITY,
            );
        }
        other => {
            return Err(SenseError::Malformed(format!("unknown result type: {other}")));
        }
    }
    Ok(())
}

fn on_analysis_result(msg: &Message, ctx: &mut SenseContext<'_>) -> Result<(), SenseError> {
    let result: AnalysisResult = msg.json_body()?;
    let colors = result
        .colors
        .map(|c| c.dominant_colors.join(", "))
        .unwrap_or_default();
    ctx.beliefs.add(goal(
        "video_analysis_received",
        [
            thread_of(msg).to_string(),
            format!("{} objects", result.objects.len()),
            format!("[{colors}]"),
        ],
    ));
    Ok(())
}

fn on_failure(msg: &Message, ctx: &mut SenseContext<'_>) -> Result<(), SenseError> {
    ctx.beliefs.add(goal("request_failed", [thread_of(msg)]));
    Ok(())
}

fn on_refuse(msg: &Message, ctx: &mut SenseContext<'_>) -> Result<(), SenseError> {
    ctx.beliefs.add(goal("request_refused", [thread_of(msg)]));
    Ok(())
}

fn on_agree(msg: &Message, ctx: &mut SenseContext<'_>) -> Result<(), SenseError> {
    ctx.beliefs.add(goal("request_acknowledged", [thread_of(msg)]));
    Ok(())
}
