//! One agent's Sense → Deliberate → Execute loop.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::analysis::{RandomAnalyzer, VideoAnalyzer};
use crate::belief::{Belief, BeliefStore};
use crate::builtin::{self, RoleKit};
use crate::deliberation::deliberate;
use crate::desire::{Desire, DesireSet};
use crate::directory::{Directory, Role};
use crate::error::{Result, SenseError, TransportError};
use crate::execution::{execute, ExecContext, Tuning};
use crate::intention::{IntentionTable, IntentionView};
use crate::message::{ontology, Message, Performative};
use crate::plan::MatchMode;
use crate::sense::SenseContext;
use crate::transport::Transport;
use crate::types::{AgentId, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeConfig {
    /// Longest wait for the first inbound message of a tick.
    pub receive_timeout: Duration,
    /// Messages drained without waiting after the first one.
    pub max_messages_per_tick: usize,
    pub match_mode: MatchMode,
    /// Answer task requests with agree / refuse / failure.
    pub acknowledge_requests: bool,
    pub tuning: Tuning,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            receive_timeout: Duration::from_millis(10),
            max_messages_per_tick: 32,
            match_mode: MatchMode::Structured,
            acknowledge_requests: true,
            tuning: Tuning::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgentStats {
    pub ticks: u64,
    pub messages_received: u64,
    pub messages_dropped: u64,
    pub messages_ignored: u64,
    pub messages_sent: u64,
    pub intentions_formed: u64,
    pub intentions_achieved: u64,
    pub intentions_failed: u64,
    pub stalled: u64,
    pub transport_errors: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub role: Role,
    pub tick: u64,
    pub taken_at: Timestamp,
    pub beliefs: Vec<Belief>,
    pub desires: Vec<Desire>,
    pub intentions: Vec<IntentionView>,
    pub stats: AgentStats,
}

impl AgentSnapshot {
    pub fn has_belief(&self, content: &str) -> bool {
        self.beliefs.iter().any(|b| b.content == content)
    }

    pub fn has_desire(&self, goal: &str) -> bool {
        self.desires.iter().any(|d| d.goal() == goal)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub tick: u64,
    pub received: usize,
    pub dropped: usize,
    pub ignored: usize,
    pub formed: Vec<String>,
    pub unplannable: Vec<String>,
    pub achieved: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub stalled: Vec<String>,
    pub sent: usize,
    pub transport_errors: Vec<TransportError>,
    /// The tick was interrupted while waiting for messages.
    pub cancelled: bool,
}

pub struct AgentBuilder {
    role: Role,
    id: Option<AgentId>,
    transport: Box<dyn Transport>,
    directory: Directory,
    config: RuntimeConfig,
    rng: Option<Box<dyn RngCore + Send>>,
    analyzer: Option<Arc<dyn VideoAnalyzer>>,
    seeded: bool,
}

impl AgentBuilder {
    pub fn id(mut self, id: AgentId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn directory(mut self, directory: Directory) -> Self {
        self.directory = directory;
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.rng = Some(rng);
        self
    }

    pub fn seed(self, seed: u64) -> Self {
        self.rng(Box::new(StdRng::seed_from_u64(seed)))
    }

    pub fn analyzer(mut self, analyzer: Arc<dyn VideoAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Start with empty beliefs and desires instead of the role's scenario.
    pub fn without_seed(mut self) -> Self {
        self.seeded = false;
        self
    }

    pub fn build(self) -> AgentRuntime {
        let id = self
            .id
            .unwrap_or_else(|| self.directory.address(self.role));
        let mut rng = self
            .rng
            .unwrap_or_else(|| Box::new(StdRng::from_entropy()));
        let analyzer = self
            .analyzer
            .unwrap_or_else(|| Arc::new(RandomAnalyzer::new(rng.next_u64())));

        let mut beliefs = BeliefStore::new();
        let mut desires = DesireSet::new();
        if self.seeded {
            builtin::seed(self.role, &mut beliefs, &mut desires);
        }

        info!(
            agent_id = %id,
            role = %self.role,
            beliefs = beliefs.len(),
            desires = desires.len(),
            "Agent created"
        );

        AgentRuntime {
            id,
            role: self.role,
            beliefs,
            desires,
            intentions: IntentionTable::new(),
            kit: RoleKit::for_role(self.role),
            directory: self.directory,
            transport: self.transport,
            rng,
            analyzer,
            config: self.config,
            tick: 0,
            stats: AgentStats::default(),
        }
    }
}

pub struct AgentRuntime {
    id: AgentId,
    role: Role,
    beliefs: BeliefStore,
    desires: DesireSet,
    intentions: IntentionTable,
    kit: RoleKit,
    directory: Directory,
    transport: Box<dyn Transport>,
    rng: Box<dyn RngCore + Send>,
    analyzer: Arc<dyn VideoAnalyzer>,
    config: RuntimeConfig,
    tick: u64,
    stats: AgentStats,
}

impl AgentRuntime {
    pub fn builder(role: Role, transport: impl Transport + 'static) -> AgentBuilder {
        AgentBuilder {
            role,
            id: None,
            transport: Box::new(transport),
            directory: Directory::default(),
            config: RuntimeConfig::default(),
            rng: None,
            analyzer: None,
            seeded: true,
        }
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn beliefs(&self) -> &BeliefStore {
        &self.beliefs
    }

    pub fn desires(&self) -> &DesireSet {
        &self.desires
    }

    pub fn intentions(&self) -> &IntentionTable {
        &self.intentions
    }

    pub fn stats(&self) -> &AgentStats {
        &self.stats
    }

    pub fn add_belief(&mut self, content: impl Into<String>) -> bool {
        self.beliefs.add(content)
    }

    pub fn add_desire(&mut self, goal: impl Into<String>, priority: f64) -> bool {
        self.desires.add(goal, priority)
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id.clone(),
            role: self.role,
            tick: self.tick,
            taken_at: Timestamp::now(),
            beliefs: self.beliefs.all(),
            desires: self.desires.all(),
            intentions: self.intentions.views(),
            stats: self.stats.clone(),
        }
    }

    /// Runs one Sense → Deliberate → Execute tick.
    ///
    /// Waiting for the first message is the only suspension that observes
    /// `cancel`. A cancelled tick returns early with `cancelled` set and leaves
    /// desires and intentions untouched.
    pub async fn run_cycle(&mut self, cancel: &CancellationToken) -> Result<CycleReport> {
        let mut report = CycleReport {
            tick: self.tick + 1,
            ..CycleReport::default()
        };

        let timeout = self.config.receive_timeout;
        let first = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            received = self.transport.receive(timeout) => Some(received),
        };
        let Some(first) = first else {
            debug!(agent_id = %self.id, "Cycle cancelled while sensing");
            report.cancelled = true;
            return Ok(report);
        };

        let mut replies = Vec::new();
        match first {
            Ok(Some(message)) => {
                self.sense(message, &mut report, &mut replies)?;
                self.drain(&mut report, &mut replies).await?;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(agent_id = %self.id, error = %e, "Receive failed");
                report.transport_errors.push(e);
            }
        }
        self.dispatch(replies, &mut report).await;

        let deliberation = deliberate(
            &self.id,
            &mut self.desires,
            &mut self.intentions,
            &self.kit.plans,
            self.config.match_mode,
        );
        report.formed = deliberation.formed;
        report.unplannable = deliberation.unplannable;

        let execution = {
            let mut ctx = ExecContext::new(
                &self.id,
                &mut self.beliefs,
                &mut self.desires,
                &self.directory,
                &self.config.tuning,
                self.analyzer.as_ref(),
                self.rng.as_mut(),
            );
            execute(&mut self.intentions, &self.kit.handlers, &mut ctx)
        };
        report.achieved = execution.achieved;
        report.failed = execution.failed;
        report.stalled = execution.stalled;
        self.dispatch(execution.outbox, &mut report).await;

        self.tick = report.tick;
        self.record(&report);
        Ok(report)
    }

    async fn drain(&mut self, report: &mut CycleReport, replies: &mut Vec<Message>) -> Result<()> {
        for _ in 0..self.config.max_messages_per_tick {
            match self.transport.receive(Duration::ZERO).await {
                Ok(Some(message)) => self.sense(message, report, replies)?,
                Ok(None) => break,
                Err(e) => {
                    warn!(agent_id = %self.id, error = %e, "Receive failed");
                    report.transport_errors.push(e);
                    break;
                }
            }
        }
        Ok(())
    }

    fn sense(
        &mut self,
        message: Message,
        report: &mut CycleReport,
        replies: &mut Vec<Message>,
    ) -> Result<()> {
        report.received += 1;

        if message.matches(Performative::Request, ontology::BDI_STATE) {
            if let Some(reply) = message.reply(Performative::Inform) {
                let body = serde_json::to_string(&self.snapshot())?;
                replies.push(reply.with_body(body));
            }
            return Ok(());
        }

        let Some(rule) = self.kit.sense.find(&message) else {
            debug!(
                agent_id = %self.id,
                performative = %message.performative,
                ontology = %message.ontology,
                "No sense rule for message"
            );
            report.ignored += 1;
            return Ok(());
        };
        let (rule_name, apply) = (rule.name, rule.apply);

        let mut ctx = SenseContext {
            agent: &self.id,
            beliefs: &mut self.beliefs,
            desires: &mut self.desires,
            directory: &self.directory,
        };
        let outcome = apply(&message, &mut ctx);

        let acknowledge =
            self.config.acknowledge_requests && message.performative == Performative::Request;
        let reply = match outcome {
            Ok(()) => {
                debug!(agent_id = %self.id, rule = rule_name, "Message sensed");
                acknowledge
                    .then(|| message.reply(Performative::Agree))
                    .flatten()
            }
            Err(SenseError::Malformed(reason)) => {
                warn!(agent_id = %self.id, rule = rule_name, reason = %reason, "Dropping malformed message");
                report.dropped += 1;
                acknowledge
                    .then(|| message.reply(Performative::Failure))
                    .flatten()
                    .map(|r| r.with_json(&serde_json::json!({ "error": reason })))
            }
            Err(SenseError::UnknownTask(task)) => {
                warn!(agent_id = %self.id, rule = rule_name, task = %task, "Refusing unknown task");
                report.dropped += 1;
                acknowledge
                    .then(|| message.reply(Performative::Refuse))
                    .flatten()
                    .map(|r| r.with_json(&serde_json::json!({ "error": format!("unknown task: {task}") })))
            }
        };
        replies.extend(reply);
        Ok(())
    }

    async fn dispatch(&mut self, outbox: Vec<Message>, report: &mut CycleReport) {
        for message in outbox {
            let to = message.to.clone();
            match self.transport.send(message).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    warn!(agent_id = %self.id, to = %to, error = %e, "Send failed");
                    report.transport_errors.push(e);
                }
            }
        }
    }

    fn record(&mut self, report: &CycleReport) {
        let stats = &mut self.stats;
        stats.ticks += 1;
        stats.messages_received += report.received as u64;
        stats.messages_dropped += report.dropped as u64;
        stats.messages_ignored += report.ignored as u64;
        stats.messages_sent += report.sent as u64;
        stats.intentions_formed += report.formed.len() as u64;
        stats.intentions_achieved += report.achieved.len() as u64;
        stats.intentions_failed += report.failed.len() as u64;
        stats.stalled += report.stalled.len() as u64;
        stats.transport_errors += report.transport_errors.len() as u64;
    }
}

impl std::fmt::Debug for AgentRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRuntime")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("tick", &self.tick)
            .field("beliefs", &self.beliefs.len())
            .field("desires", &self.desires.len())
            .field("intentions", &self.intentions.len())
            .finish()
    }
}
