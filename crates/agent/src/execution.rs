//! Advances active intentions through per-role handlers.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::analysis::VideoAnalyzer;
use crate::belief::BeliefStore;
use crate::desire::DesireSet;
use crate::directory::{Directory, Role};
use crate::intention::{IntentionStatus, IntentionTable};
use crate::message::Message;
use crate::predicate::GoalPredicate;
use crate::types::AgentId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    pub virality_probability: f64,
    pub feedback_arrival_probability: f64,
    pub feedback_threshold: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            virality_probability: 0.4,
            feedback_arrival_probability: 0.2,
            feedback_threshold: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Achieved,
    Pending,
    Failed(String),
}

/// Everything a handler may read or change while advancing one intention.
pub struct ExecContext<'a> {
    pub agent: &'a AgentId,
    pub beliefs: &'a mut BeliefStore,
    pub desires: &'a mut DesireSet,
    pub directory: &'a Directory,
    pub tuning: &'a Tuning,
    pub analyzer: &'a dyn VideoAnalyzer,
    rng: &'a mut dyn RngCore,
    outbox: Vec<Message>,
}

impl<'a> ExecContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agent: &'a AgentId,
        beliefs: &'a mut BeliefStore,
        desires: &'a mut DesireSet,
        directory: &'a Directory,
        tuning: &'a Tuning,
        analyzer: &'a dyn VideoAnalyzer,
        rng: &'a mut dyn RngCore,
    ) -> Self {
        Self {
            agent,
            beliefs,
            desires,
            directory,
            tuning,
            analyzer,
            rng,
            outbox: Vec::new(),
        }
    }

    pub fn roll(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    pub fn chance(&mut self, p: f64) -> bool {
        self.roll() < p
    }

    pub fn pick<'s, T>(&mut self, items: &'s [T]) -> Option<&'s T> {
        if items.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..items.len());
        items.get(index)
    }

    pub fn address(&self, role: Role) -> AgentId {
        self.directory.address(role)
    }

    /// Queue a message. Queued messages go out once every intention was visited.
    pub fn send(&mut self, message: Message) {
        let mut message = message;
        if message.sender.is_none() {
            message.sender = Some(self.agent.clone());
        }
        self.outbox.push(message);
    }

    pub fn take_outbox(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbox)
    }
}

type Handler = Box<dyn Fn(&GoalPredicate, &mut ExecContext<'_>) -> StepOutcome + Send + Sync>;

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, predicate: impl Into<String>, handler: F)
    where
        F: Fn(&GoalPredicate, &mut ExecContext<'_>) -> StepOutcome + Send + Sync + 'static,
    {
        self.handlers.insert(predicate.into(), Box::new(handler));
    }

    pub fn with<F>(mut self, predicate: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&GoalPredicate, &mut ExecContext<'_>) -> StepOutcome + Send + Sync + 'static,
    {
        self.register(predicate, handler);
        self
    }

    pub fn contains(&self, predicate: &str) -> bool {
        self.handlers.contains_key(predicate)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    fn get(&self, predicate: &str) -> Option<&Handler> {
        self.handlers.get(predicate)
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &names)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    pub achieved: Vec<String>,
    pub failed: Vec<(String, String)>,
    /// Goals that stalled for the first time this cycle.
    pub stalled: Vec<String>,
    pub outbox: Vec<Message>,
}

/// Runs one execution pass over the active intentions, then prunes finished ones.
///
/// Dispatch uses the predicate name of the bound plan; the handler receives
/// the desire's parsed goal.
pub fn execute(
    intentions: &mut IntentionTable,
    handlers: &HandlerRegistry,
    ctx: &mut ExecContext<'_>,
) -> ExecutionReport {
    let mut report = ExecutionReport::default();
    let agent = ctx.agent.clone();

    for id in intentions.active_ids() {
        let Some(intention) = intentions.get_mut(&id) else {
            continue;
        };

        let Some(handler) = handlers.get(intention.plan.trigger().name()) else {
            if intention.report_stall() {
                warn!(
                    agent_id = %agent,
                    goal = %intention.goal(),
                    plan = %intention.plan.name,
                    "No handler for intention, it will stay active"
                );
                report.stalled.push(intention.goal().to_string());
            } else {
                debug!(agent_id = %agent, goal = %intention.goal(), "Intention still stalled");
            }
            continue;
        };

        let goal = intention.desire.predicate().clone();
        match handler(&goal, ctx) {
            StepOutcome::Achieved => {
                info!(agent_id = %agent, goal = %intention.goal(), "Intention achieved");
                intention.status = IntentionStatus::Achieved;
                report.achieved.push(intention.goal().to_string());
            }
            StepOutcome::Pending => {}
            StepOutcome::Failed(reason) => {
                warn!(agent_id = %agent, goal = %intention.goal(), reason = %reason, "Intention failed");
                report
                    .failed
                    .push((intention.goal().to_string(), reason.clone()));
                intention.status = IntentionStatus::Failed { reason };
            }
        }
    }

    let retired = intentions.prune();
    if !retired.is_empty() {
        debug!(agent_id = %agent, count = retired.len(), "Retired intentions");
    }

    report.outbox = ctx.take_outbox();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::RandomAnalyzer;
    use crate::desire::Desire;
    use crate::intention::Intention;
    use crate::message::{ontology, Performative};
    use crate::plan::Plan;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Fixture {
        agent: AgentId,
        beliefs: BeliefStore,
        desires: DesireSet,
        directory: Directory,
        tuning: Tuning,
        analyzer: RandomAnalyzer,
        rng: StdRng,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                agent: AgentId::new("tester"),
                beliefs: BeliefStore::new(),
                desires: DesireSet::new(),
                directory: Directory::default(),
                tuning: Tuning::default(),
                analyzer: RandomAnalyzer::new(0),
                rng: StdRng::seed_from_u64(0),
            }
        }

        fn ctx(&mut self) -> ExecContext<'_> {
            ExecContext::new(
                &self.agent,
                &mut self.beliefs,
                &mut self.desires,
                &self.directory,
                &self.tuning,
                &self.analyzer,
                &mut self.rng,
            )
        }
    }

    fn bind(table: &mut IntentionTable, goal: &str, predicate: &str) {
        table.insert(Intention::new(
            Desire::new(goal, 1.0),
            Plan::new("P", predicate),
        ));
    }

    fn registry() -> HandlerRegistry {
        HandlerRegistry::new()
            .with("mark", |goal, ctx| {
                ctx.beliefs.add(format!("marked({})", goal.arg(0).unwrap_or("")));
                StepOutcome::Achieved
            })
            .with("wait", |_, _| StepOutcome::Pending)
            .with("break", |_, _| StepOutcome::Failed("broken".into()))
            .with("notify", |_, ctx| {
                let to = ctx.address(Role::Creator);
                ctx.send(Message::new(to, Performative::Inform, ontology::VIDEO_ANALYSIS));
                StepOutcome::Achieved
            })
    }

    #[test]
    fn test_outcomes_and_pruning() {
        let mut fx = Fixture::new();
        let mut table = IntentionTable::new();
        bind(&mut table, "mark(v1)", "mark");
        bind(&mut table, "wait(v1)", "wait");
        bind(&mut table, "break(v1)", "break");

        let handlers = registry();
        let report = execute(&mut table, &handlers, &mut fx.ctx());

        assert_eq!(report.achieved, vec!["mark(v1)"]);
        assert_eq!(report.failed, vec![("break(v1)".to_string(), "broken".to_string())]);
        assert_eq!(table.len(), 1);
        assert!(table.has_active("wait(v1)"));
        assert!(fx.beliefs.has("marked(v1)"));
    }

    #[test]
    fn test_stall_reported_once() {
        let mut fx = Fixture::new();
        let mut table = IntentionTable::new();
        bind(&mut table, "mystery(1)", "mystery");
        let handlers = registry();

        let first = execute(&mut table, &handlers, &mut fx.ctx());
        let second = execute(&mut table, &handlers, &mut fx.ctx());

        assert_eq!(first.stalled, vec!["mystery(1)"]);
        assert!(second.stalled.is_empty());
        assert!(table.has_active("mystery(1)"));
    }

    #[test]
    fn test_dispatch_uses_bound_plan() {
        let mut fx = Fixture::new();
        let mut table = IntentionTable::new();
        // Bound the way substring matching would bind it.
        bind(&mut table, "remark(v2)", "mark");
        let report = execute(&mut table, &registry(), &mut fx.ctx());
        assert_eq!(report.achieved, vec!["remark(v2)"]);
        assert!(fx.beliefs.has("marked(v2)"));
    }

    #[test]
    fn test_outbox_collected_with_sender() {
        let mut fx = Fixture::new();
        let mut table = IntentionTable::new();
        bind(&mut table, "notify", "notify");
        let report = execute(&mut table, &registry(), &mut fx.ctx());
        assert_eq!(report.outbox.len(), 1);
        assert_eq!(report.outbox[0].to, AgentId::new("creator"));
        assert_eq!(report.outbox[0].sender, Some(AgentId::new("tester")));
    }

    #[test]
    fn test_chance_bounds() {
        let mut fx = Fixture::new();
        let mut ctx = fx.ctx();
        assert!(!ctx.chance(0.0));
        assert!(ctx.chance(1.0));
        assert!(ctx.pick::<u8>(&[]).is_none());
    }
}
