use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use bdisim_agent::prelude::*;
use bdisim_agent::SchedulerReport;

mod config;

use config::SimConfig;

#[derive(Parser)]
#[command(name = "bdisimd")]
#[command(about = "Content creator BDI agents simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Ticks to run, 0 runs until Ctrl+C
    #[arg(short, long, default_value = "20")]
    ticks: u64,

    /// Pause between ticks in milliseconds
    #[arg(long, default_value = "100")]
    tick_ms: u64,

    /// Scheduling mode (cooperative, concurrent)
    #[arg(short, long, default_value = "cooperative")]
    mode: ScheduleMode,

    /// Base random seed (falls back to BDISIM_SEED)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Plan matching (structured, substring)
    #[arg(long, default_value = "structured")]
    match_mode: MatchMode,

    /// Longest wait for an inbound message per tick, in milliseconds
    #[arg(long, default_value = "10")]
    receive_timeout_ms: u64,

    #[arg(long)]
    virality_probability: Option<f64>,

    #[arg(long)]
    feedback_probability: Option<f64>,

    /// Print final snapshots as JSON
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the four-agent simulation (default)
    Run,
    /// List every role's plan library
    Plans,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Some(Commands::Plans) => {
            print_plans();
            Ok(())
        }
        Some(Commands::Run) | None => {
            let config = SimConfig::new(
                cli.seed,
                cli.ticks,
                cli.tick_ms,
                cli.mode,
                cli.match_mode,
                cli.receive_timeout_ms,
                cli.virality_probability,
                cli.feedback_probability,
            )?;
            run(config, cli.json).await
        }
    }
}

async fn run(config: SimConfig, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        seed = config.seed,
        mode = %config.scheduler.mode,
        max_ticks = ?config.scheduler.max_ticks,
        match_mode = %config.runtime.match_mode,
        "Starting simulation"
    );

    let router = MessageRouter::default();
    let directory = Directory::default();
    let mut scheduler = Scheduler::new(config.scheduler.clone());

    for (index, role) in Role::ALL.into_iter().enumerate() {
        let mailbox = router.register(directory.address(role));
        let runtime = AgentRuntime::builder(role, mailbox)
            .directory(directory.clone())
            .config(config.runtime.clone())
            .seed(config.agent_seed(index))
            .build();
        scheduler.add(runtime)?;
    }

    for (id, monitor) in scheduler.monitors() {
        tokio::spawn(watch_agent(id, monitor));
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down...");
            shutdown.cancel();
        }
    });

    let report = scheduler.run(cancel).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.snapshots)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

async fn watch_agent(id: AgentId, mut monitor: watch::Receiver<AgentSnapshot>) {
    while monitor.changed().await.is_ok() {
        let snapshot = monitor.borrow_and_update().clone();
        debug!(
            agent_id = %id,
            tick = snapshot.tick,
            beliefs = snapshot.beliefs.len(),
            desires = snapshot.desires.len(),
            intentions = snapshot.intentions.len(),
            "Agent state"
        );
    }
}

fn print_summary(report: &SchedulerReport) {
    println!();
    println!("Simulation finished after {} ticks", report.ticks);

    for snapshot in &report.snapshots {
        let stats = &snapshot.stats;
        println!();
        println!("[{}] {} (tick {})", snapshot.role, snapshot.id, snapshot.tick);
        println!(
            "  messages: {} received, {} sent, {} dropped, {} ignored",
            stats.messages_received, stats.messages_sent, stats.messages_dropped, stats.messages_ignored
        );
        println!(
            "  intentions: {} formed, {} achieved, {} failed, {} stalled",
            stats.intentions_formed, stats.intentions_achieved, stats.intentions_failed, stats.stalled
        );

        println!("  beliefs:");
        for belief in &snapshot.beliefs {
            println!("    {}", belief.content);
        }
        if !snapshot.desires.is_empty() {
            println!("  desires:");
            for desire in &snapshot.desires {
                println!("    {} ({:.2})", desire.goal(), desire.priority());
            }
        }
        if !snapshot.intentions.is_empty() {
            println!("  intentions:");
            for intention in &snapshot.intentions {
                println!("    {} via {} [{}]", intention.goal, intention.plan, intention.status.label());
            }
        }
    }

    for (id, reason) in &report.failures {
        warn!(agent_id = %id, reason = %reason, "Agent failed during the run");
    }
}

fn print_plans() {
    for role in Role::ALL {
        let kit = RoleKit::for_role(role);
        println!("{role}:");
        for plan in kit.plans.plans() {
            println!("  {} <- {}", plan.name, plan.goal_predicate);
            for step in &plan.steps {
                println!("      - {step}");
            }
        }
    }
}
