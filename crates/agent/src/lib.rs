pub mod analysis;
pub mod belief;
pub mod builtin;
pub mod deliberation;
pub mod desire;
pub mod directory;
pub mod error;
pub mod execution;
pub mod intention;
pub mod message;
pub mod plan;
pub mod predicate;
pub mod runtime;
pub mod scheduler;
pub mod sense;
pub mod transport;
pub mod types;

pub use analysis::{AnalysisKind, AnalysisResult, RandomAnalyzer, VideoAnalyzer};
pub use belief::{Belief, BeliefStore};
pub use deliberation::{deliberate, DeliberationReport};
pub use desire::{Desire, DesireSet};
pub use directory::{Directory, Role};
pub use error::{AgentError, AnalysisError, Result, SenseError, TransportError};
pub use execution::{execute, ExecContext, ExecutionReport, HandlerRegistry, StepOutcome, Tuning};
pub use intention::{Intention, IntentionStatus, IntentionTable, IntentionView};
pub use message::{Message, Performative};
pub use plan::{MatchMode, Plan, PlanLibrary};
pub use predicate::GoalPredicate;
pub use runtime::{AgentBuilder, AgentRuntime, AgentSnapshot, AgentStats, CycleReport, RuntimeConfig};
pub use scheduler::{ScheduleMode, Scheduler, SchedulerConfig, SchedulerReport};
pub use sense::{SenseContext, SenseRule, SenseTable};
pub use transport::{Mailbox, MessageRouter, Transport};
pub use types::{AgentId, IntentionId, Timestamp};

pub mod prelude {
    pub use crate::builtin::RoleKit;
    pub use crate::directory::{Directory, Role};
    pub use crate::error::AgentError;
    pub use crate::message::{language, ontology, Message, Performative};
    pub use crate::plan::MatchMode;
    pub use crate::runtime::{AgentRuntime, AgentSnapshot, RuntimeConfig};
    pub use crate::scheduler::{ScheduleMode, Scheduler, SchedulerConfig};
    pub use crate::transport::{MessageRouter, Transport};
    pub use crate::types::AgentId;
    pub use tokio_util::sync::CancellationToken;
}
