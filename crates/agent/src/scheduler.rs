//! Drives every agent's cycle, in one task or one task per agent.

use futures::future::join_all;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{AgentError, Result};
use crate::runtime::{AgentRuntime, AgentSnapshot, CycleReport};
use crate::types::AgentId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMode {
    /// Round-robin in a single task. Every agent finishes a tick before the
    /// next tick starts.
    #[default]
    Cooperative,
    /// One task per agent, each counting its own ticks.
    Concurrent,
}

impl fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleMode::Cooperative => f.write_str("cooperative"),
            ScheduleMode::Concurrent => f.write_str("concurrent"),
        }
    }
}

impl FromStr for ScheduleMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cooperative" => Ok(ScheduleMode::Cooperative),
            "concurrent" => Ok(ScheduleMode::Concurrent),
            other => Err(format!("unknown schedule mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub tick_interval: Duration,
    /// Stop after this many ticks. `None` runs until cancelled.
    pub max_ticks: Option<u64>,
    pub mode: ScheduleMode,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            max_ticks: None,
            mode: ScheduleMode::Cooperative,
        }
    }
}

impl SchedulerConfig {
    fn more_ticks(&self, done: u64) -> bool {
        self.max_ticks.map_or(true, |max| done < max)
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerReport {
    /// Ticks completed by the scheduler (cooperative) or the busiest agent (concurrent).
    pub ticks: u64,
    pub snapshots: Vec<AgentSnapshot>,
    pub failures: Vec<(AgentId, String)>,
}

impl SchedulerReport {
    pub fn snapshot(&self, id: &AgentId) -> Option<&AgentSnapshot> {
        self.snapshots.iter().find(|s| &s.id == id)
    }
}

struct Scheduled {
    runtime: AgentRuntime,
    monitor: watch::Sender<AgentSnapshot>,
}

pub struct Scheduler {
    config: SchedulerConfig,
    agents: Vec<Scheduled>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            agents: Vec::new(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Registers an agent and returns a receiver for its per-tick snapshots.
    pub fn add(&mut self, runtime: AgentRuntime) -> Result<watch::Receiver<AgentSnapshot>> {
        if self.agents.iter().any(|a| a.runtime.id() == runtime.id()) {
            return Err(AgentError::AgentAlreadyExists(runtime.id().clone()));
        }

        info!(agent_id = %runtime.id(), role = %runtime.role(), "Agent scheduled");
        let (monitor, rx) = watch::channel(runtime.snapshot());
        self.agents.push(Scheduled { runtime, monitor });
        Ok(rx)
    }

    pub fn monitors(&self) -> Vec<(AgentId, watch::Receiver<AgentSnapshot>)> {
        self.agents
            .iter()
            .map(|a| (a.runtime.id().clone(), a.monitor.subscribe()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub async fn run(self, cancel: CancellationToken) -> SchedulerReport {
        info!(
            agents = self.agents.len(),
            mode = %self.config.mode,
            max_ticks = ?self.config.max_ticks,
            "Scheduler starting"
        );

        let report = match self.config.mode {
            ScheduleMode::Cooperative => run_cooperative(self.agents, self.config, cancel).await,
            ScheduleMode::Concurrent => run_concurrent(self.agents, self.config, cancel).await,
        };

        info!(ticks = report.ticks, failures = report.failures.len(), "Scheduler stopped");
        report
    }
}

/// Sleeps for `interval` unless cancelled first. Returns false on cancellation.
async fn pause(interval: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(interval) => true,
    }
}

fn log_cycle(id: &AgentId, result: &Result<CycleReport>) {
    match result {
        Ok(report) => debug!(
            agent_id = %id,
            tick = report.tick,
            received = report.received,
            formed = report.formed.len(),
            achieved = report.achieved.len(),
            sent = report.sent,
            "Cycle complete"
        ),
        Err(e) => error!(agent_id = %id, error = %e, "Cycle failed"),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

async fn run_cooperative(
    mut agents: Vec<Scheduled>,
    config: SchedulerConfig,
    cancel: CancellationToken,
) -> SchedulerReport {
    let mut ticks = 0u64;
    let mut failures = Vec::new();
    let mut failed = vec![false; agents.len()];

    'ticks: while config.more_ticks(ticks) && !cancel.is_cancelled() {
        for (index, agent) in agents.iter_mut().enumerate() {
            if failed[index] {
                continue;
            }

            let id = agent.runtime.id().clone();
            let cycle = AssertUnwindSafe(agent.runtime.run_cycle(&cancel))
                .catch_unwind()
                .await;

            match cycle {
                Ok(result) => {
                    log_cycle(&id, &result);
                    if matches!(&result, Ok(report) if report.cancelled) {
                        break 'ticks;
                    }
                    agent.monitor.send_replace(agent.runtime.snapshot());
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(agent_id = %id, panic = %message, "Agent panicked, removing it from the rotation");
                    failures.push((id, message));
                    failed[index] = true;
                }
            }
        }

        ticks += 1;
        if config.more_ticks(ticks) && !pause(config.tick_interval, &cancel).await {
            break;
        }
    }

    SchedulerReport {
        ticks,
        snapshots: agents.iter().map(|a| a.runtime.snapshot()).collect(),
        failures,
    }
}

async fn drive(mut agent: Scheduled, config: SchedulerConfig, cancel: CancellationToken) -> AgentSnapshot {
    let id = agent.runtime.id().clone();
    let mut ticks = 0u64;

    while config.more_ticks(ticks) && !cancel.is_cancelled() {
        let result = agent.runtime.run_cycle(&cancel).await;
        log_cycle(&id, &result);
        if matches!(&result, Ok(report) if report.cancelled) {
            break;
        }
        ticks += 1;
        agent.monitor.send_replace(agent.runtime.snapshot());

        if config.more_ticks(ticks) && !pause(config.tick_interval, &cancel).await {
            break;
        }
    }

    debug!(agent_id = %id, ticks, "Agent loop finished");
    agent.runtime.snapshot()
}

async fn run_concurrent(
    agents: Vec<Scheduled>,
    config: SchedulerConfig,
    cancel: CancellationToken,
) -> SchedulerReport {
    let mut watchers = Vec::with_capacity(agents.len());
    let mut tasks = Vec::with_capacity(agents.len());

    for agent in agents {
        watchers.push((agent.runtime.id().clone(), agent.monitor.subscribe()));
        tasks.push(tokio::spawn(drive(agent, config.clone(), cancel.clone())));
    }

    let mut snapshots = Vec::with_capacity(tasks.len());
    let mut failures = Vec::new();

    for ((id, watcher), joined) in watchers.into_iter().zip(join_all(tasks).await) {
        match joined {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => {
                let message = if e.is_panic() {
                    panic_message(e.into_panic().as_ref())
                } else {
                    e.to_string()
                };
                warn!(agent_id = %id, error = %message, "Agent task ended abnormally");
                // Last state the agent published before it died.
                snapshots.push(watcher.borrow().clone());
                failures.push((id, message));
            }
        }
    }

    SchedulerReport {
        ticks: snapshots.iter().map(|s| s.tick).max().unwrap_or(0),
        snapshots,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::Role;
    use crate::transport::MessageRouter;

    #[test]
    fn test_mode_parse() {
        assert_eq!("Concurrent".parse::<ScheduleMode>(), Ok(ScheduleMode::Concurrent));
        assert!("parallel".parse::<ScheduleMode>().is_err());
        assert_eq!(ScheduleMode::default().to_string(), "cooperative");
    }

    #[test]
    fn test_duplicate_agent_rejected() {
        let router = MessageRouter::default();
        let mut scheduler = Scheduler::new(SchedulerConfig::default());
        let a = AgentRuntime::builder(Role::Feedback, router.register(AgentId::new("feedback"))).build();
        let b = AgentRuntime::builder(Role::Feedback, router.register(AgentId::new("feedback"))).build();

        assert!(scheduler.add(a).is_ok());
        assert!(matches!(scheduler.add(b), Err(AgentError::AgentAlreadyExists(_))));
        assert_eq!(scheduler.len(), 1);
    }

    #[tokio::test]
    async fn test_max_ticks_respected() {
        let router = MessageRouter::default();
        let mut scheduler = Scheduler::new(SchedulerConfig {
            tick_interval: Duration::ZERO,
            max_ticks: Some(3),
            mode: ScheduleMode::Cooperative,
        });
        let agent = AgentRuntime::builder(Role::Feedback, router.register(AgentId::new("feedback")))
            .config(crate::runtime::RuntimeConfig {
                receive_timeout: Duration::from_millis(1),
                ..Default::default()
            })
            .build();
        let rx = scheduler.add(agent).unwrap();

        let report = scheduler.run(CancellationToken::new()).await;
        assert_eq!(report.ticks, 3);
        assert_eq!(report.snapshots[0].tick, 3);
        assert_eq!(rx.borrow().tick, 3);
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_does_nothing() {
        let router = MessageRouter::default();
        let mut scheduler = Scheduler::new(SchedulerConfig {
            mode: ScheduleMode::Concurrent,
            ..SchedulerConfig::default()
        });
        let agent = AgentRuntime::builder(Role::Feedback, router.register(AgentId::new("feedback"))).build();
        scheduler.add(agent).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = scheduler.run(cancel).await;
        assert_eq!(report.ticks, 0);
        assert_eq!(report.snapshots.len(), 1);
        assert!(report.failures.is_empty());
    }
}
