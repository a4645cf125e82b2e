use std::time::Duration;

use bdisim_agent::prelude::*;
use bdisim_agent::{SchedulerReport, Tuning};

fn simulation(mode: ScheduleMode, max_ticks: Option<u64>, tick_interval: Duration) -> Scheduler {
    let router = MessageRouter::default();
    let directory = Directory::default();
    let mut scheduler = Scheduler::new(SchedulerConfig {
        tick_interval,
        max_ticks,
        mode,
    });

    let config = RuntimeConfig {
        receive_timeout: Duration::from_millis(1),
        tuning: Tuning {
            virality_probability: 1.0,
            ..Tuning::default()
        },
        ..RuntimeConfig::default()
    };

    for (index, role) in Role::ALL.into_iter().enumerate() {
        let mailbox = router.register(directory.address(role));
        let runtime = AgentRuntime::builder(role, mailbox)
            .directory(directory.clone())
            .config(config.clone())
            .seed(100 + index as u64)
            .build();
        scheduler.add(runtime).unwrap();
    }
    scheduler
}

fn creator(report: &SchedulerReport) -> &AgentSnapshot {
    report.snapshot(&AgentId::new("creator")).expect("creator snapshot")
}

#[tokio::test]
async fn test_cooperative_run_reaches_virality() {
    let scheduler = simulation(ScheduleMode::Cooperative, Some(6), Duration::ZERO);
    let report = scheduler.run(CancellationToken::new()).await;

    assert_eq!(report.ticks, 6);
    assert!(report.failures.is_empty());
    assert_eq!(report.snapshots.len(), 4);
    assert!(report.snapshots.iter().all(|s| s.tick == 6));

    let creator = creator(&report);
    assert!(creator.has_belief("video_uploaded(dance_video_01, tiktok)"));
    assert!(creator.has_belief("content_adapted(dance_video_01)"));
    assert!(creator.has_belief("content_viral(dance_video_01)"));
    assert!(creator.has_belief("content_adapted(vlog_highlight_01)"));
    assert!(creator.has_belief("content_optimized(vlog_highlight_01, instagram)"));
    assert!(creator.has_belief("request_acknowledged(insights-dance_video_01)"));
    assert!(creator
        .beliefs
        .iter()
        .any(|b| b.content.starts_with("insights_received(dance_video_01, ")));
    assert!(creator
        .beliefs
        .iter()
        .any(|b| b.content.starts_with("video_analysis_received(analysis-dance_video_01, ")));

    // No plan exists, so it stays desired
    assert!(creator.has_desire("monetize_content"));
    // Polling goal never completes
    assert!(creator.intentions.iter().any(|i| i.goal == "build_branding"));
    assert_eq!(creator.stats.stalled, 0);
}

#[tokio::test]
async fn test_cooperative_monitors_publish_each_tick() {
    let scheduler = simulation(ScheduleMode::Cooperative, Some(2), Duration::ZERO);
    let monitors = scheduler.monitors();
    assert_eq!(monitors.len(), 4);

    let report = scheduler.run(CancellationToken::new()).await;
    for (id, monitor) in monitors {
        let published = monitor.borrow();
        assert_eq!(published.tick, 2, "monitor for {id}");
        assert_eq!(Some(published.stats.ticks), report.snapshot(&id).map(|s| s.stats.ticks));
    }
}

#[tokio::test]
async fn test_concurrent_run_completes_every_agent() {
    let scheduler = simulation(ScheduleMode::Concurrent, Some(5), Duration::from_millis(2));
    let report = scheduler.run(CancellationToken::new()).await;

    assert!(report.failures.is_empty());
    assert_eq!(report.ticks, 5);
    assert_eq!(report.snapshots.len(), 4);
    for snapshot in &report.snapshots {
        assert_eq!(snapshot.tick, 5, "{} ticks", snapshot.id);
        assert_eq!(snapshot.stats.ticks, 5);
    }
    assert!(creator(&report).has_belief("video_uploaded(edu_snippet_01, youtube)"));
}

#[tokio::test]
async fn test_cancellation_stops_unbounded_run() {
    for mode in [ScheduleMode::Cooperative, ScheduleMode::Concurrent] {
        let scheduler = simulation(mode, None, Duration::from_millis(5));
        let cancel = CancellationToken::new();

        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            stopper.cancel();
        });

        let report = tokio::time::timeout(Duration::from_secs(5), scheduler.run(cancel))
            .await
            .expect("scheduler stops after cancellation");
        assert!(report.failures.is_empty(), "{mode}");
        assert_eq!(report.snapshots.len(), 4, "{mode}");
    }
}
