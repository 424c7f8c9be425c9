//! End-to-end discovery runs against the in-memory graph.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use reach_common::DiscoveryConfig;
use reach_scout::scheduling::CancellationController;
use reach_scout::testing::{fast_config, Call, MockGraph, RecordingCheckpointWriter};
use reach_scout::traits::CheckpointReason;
use reach_scout::{Collaborators, DiscoveryEngine, DiscoveryReport, Termination};

async fn run_with(
    graph: &MockGraph,
    writer: &RecordingCheckpointWriter,
    config: DiscoveryConfig,
    topic: &str,
    cancel: CancellationController,
) -> DiscoveryReport {
    let engine = DiscoveryEngine::new(
        config,
        topic,
        Collaborators {
            resolver: graph,
            neighbors: graph,
            seeds: graph,
            checkpoints: writer,
        },
        cancel,
    );
    engine.run().await
}

async fn run(graph: &MockGraph, config: DiscoveryConfig) -> DiscoveryReport {
    let writer = RecordingCheckpointWriter::new();
    run_with(graph, &writer, config, "luxury", CancellationController::new()).await
}

fn identifiers(report: &DiscoveryReport) -> Vec<&str> {
    report
        .results
        .iter()
        .map(|r| r.profile.identifier.as_str())
        .collect()
}

#[tokio::test]
async fn breadth_first_run_finds_qualifying_neighbors() {
    let graph = MockGraph::new()
        .seed_pages("luxury", &[&["a", "b", "c"]])
        .profile("a", 60_000)
        .profile("b", 1_000)
        .profile("d", 70_000)
        .profile("e", 10_000)
        .neighbors("a", &["d", "e"]);

    let report = run(&graph, fast_config(3, 50_000)).await;

    assert_eq!(identifiers(&report), vec!["a", "d"]);
    assert_eq!(report.termination, Termination::SeedsExhausted);
    assert_eq!(graph.resolved(), vec!["a", "b", "c", "d", "e"]);
    // e is low tier at depth 1, past its depth limit
    assert_eq!(graph.neighbor_requests(), vec!["a", "b", "d"]);
    assert_eq!(report.results[1].discovery_depth, 1);
    assert_eq!(report.results[1].discovery_path, "#luxury > @a > @d");
    assert_eq!(report.stats.unresolvable, 1);
    assert_eq!(report.stats.below_threshold, 2);
}

#[tokio::test]
async fn stops_as_soon_as_target_is_met() {
    let graph = MockGraph::new()
        .seed_pages("luxury", &[&["a", "b"]])
        .profile("a", 80_000)
        .profile("b", 90_000)
        .neighbors("a", &["c"]);
    let writer = RecordingCheckpointWriter::new();

    let report = run_with(
        &graph,
        &writer,
        fast_config(1, 50_000),
        "luxury",
        CancellationController::new(),
    )
    .await;

    assert_eq!(report.termination, Termination::TargetReached);
    assert_eq!(identifiers(&report), vec!["a"]);
    assert_eq!(graph.resolved(), vec!["a"]);
    assert!(graph.neighbor_requests().is_empty());
    assert_eq!(writer.reasons(), vec![CheckpointReason::Completed]);
    assert!(report.checkpoint.is_some());
}

#[tokio::test]
async fn each_account_is_resolved_once() {
    let graph = MockGraph::new()
        .seed_pages("luxury", &[&["a", "b"]])
        .profile("a", 60_000)
        .profile("b", 60_000)
        .neighbors("a", &["b", "c"])
        .neighbors("b", &["a", "c"]);

    let report = run(&graph, fast_config(100, 50_000)).await;

    let resolved = graph.resolved();
    let unique: HashSet<_> = resolved.iter().collect();
    assert_eq!(resolved.len(), unique.len());
    assert_eq!(resolved, vec!["a", "b", "c"]);
    assert!(report.stats.already_visited >= 2);
}

#[tokio::test]
async fn near_target_stops_expansion() {
    let graph = MockGraph::new()
        .seed_pages("luxury", &[&["x", "a"]])
        .profile("a", 60_000)
        .profile("x", 1_000)
        .neighbors("a", &["n1"])
        .neighbors("x", &["n2"]);
    let config = DiscoveryConfig {
        near_target_ratio: 0.5,
        ..fast_config(2, 50_000)
    };

    let report = run(&graph, config).await;

    assert_eq!(graph.neighbor_requests(), vec!["x"]);
    assert_eq!(report.stats.skipped_near_target, 1);
    assert!(graph.resolved().contains(&"n2".to_string()));
    assert!(!graph.resolved().contains(&"n1".to_string()));
}

#[tokio::test]
async fn high_tier_chain_stops_at_max_depth() {
    let graph = MockGraph::new()
        .seed_pages("luxury", &[&["a"]])
        .profile("a", 60_000)
        .profile("b", 60_000)
        .profile("c", 60_000)
        .profile("d", 60_000)
        .profile("e", 60_000)
        .neighbors("a", &["b"])
        .neighbors("b", &["c"])
        .neighbors("c", &["d"])
        .neighbors("d", &["e"]);

    let report = run(&graph, fast_config(100, 50_000)).await;

    assert_eq!(identifiers(&report), vec!["a", "b", "c", "d"]);
    assert_eq!(report.results[3].discovery_depth, 3);
    assert!(!graph.resolved().contains(&"e".to_string()));
    assert_eq!(report.stats.skipped_max_depth, 1);
}

#[tokio::test]
async fn expansion_width_and_depth_follow_tier() {
    let graph = MockGraph::new()
        .seed_pages("luxury", &[&["h", "m", "l"]])
        .profile("h", 60_000)
        .profile("m", 30_000)
        .profile("l", 10_000)
        .profile("h1", 60_000)
        .profile("m1", 30_000)
        .profile("l1", 10_000)
        .neighbors("h", &["h1"])
        .neighbors("m", &["m1"])
        .neighbors("l", &["l1"])
        .neighbors("m1", &["deep"]);

    let report = run(&graph, fast_config(100, 50_000)).await;

    assert_eq!(
        graph.neighbor_widths(),
        vec![
            ("h".to_string(), 25),
            ("m".to_string(), 15),
            ("l".to_string(), 8),
            ("h1".to_string(), 25),
        ]
    );
    // m1 and l1 sit at depth 1, already at their tiers' depth limit
    assert!(!graph.resolved().contains(&"deep".to_string()));
    assert_eq!(report.stats.skipped_max_depth, 2);
    assert_eq!(identifiers(&report), vec!["h", "h1"]);
}

#[tokio::test]
async fn timed_out_lookups_count_as_unresolvable() {
    let graph = MockGraph::new()
        .seed_pages("luxury", &[&["a", "b"]])
        .profile("a", 60_000)
        .profile("b", 60_000)
        .neighbors("a", &["c"])
        .resolve_delay(Duration::from_millis(200));
    let config = DiscoveryConfig {
        call_timeout_ms: 20,
        ..fast_config(10, 50_000)
    };

    let report = run(&graph, config).await;

    assert_eq!(report.termination, Termination::SeedsExhausted);
    assert!(report.results.is_empty());
    assert_eq!(report.stats.unresolvable, 2);
    // no retries and no expansion of an account that never resolved
    assert_eq!(graph.resolved(), vec!["a", "b"]);
    assert!(graph.neighbor_requests().is_empty());
}

#[tokio::test]
async fn panicking_collaborator_still_gets_emergency_export() {
    let graph = MockGraph::new()
        .seed_pages("luxury", &[&["a", "b", "c"]])
        .profile("a", 60_000)
        .profile("c", 60_000)
        .panic_on_resolve("b");
    let writer = RecordingCheckpointWriter::new();

    let report = run_with(
        &graph,
        &writer,
        fast_config(10, 50_000),
        "luxury",
        CancellationController::new(),
    )
    .await;

    assert!(
        matches!(&report.termination, Termination::Failed(reason) if reason.contains("resolver blew up on b")),
        "{:?}",
        report.termination
    );
    assert_eq!(identifiers(&report), vec!["a"]);
    assert_eq!(writer.reasons(), vec![CheckpointReason::Emergency]);
    assert_eq!(writer.last().unwrap().identifiers, vec!["a"]);
    assert!(!graph.resolved().contains(&"c".to_string()));
}

#[tokio::test]
async fn given_accounts_expand_without_topic_search() {
    let graph = MockGraph::new()
        .profile("start", 80_000)
        .profile("n1", 70_000)
        .profile("n2", 1_000)
        .neighbors("start", &["n1", "n2"]);
    let writer = RecordingCheckpointWriter::new();
    let engine = DiscoveryEngine::from_accounts(
        fast_config(10, 50_000),
        vec!["@start".to_string(), "not valid!".to_string()],
        Collaborators {
            resolver: &graph,
            neighbors: &graph,
            seeds: &graph,
            checkpoints: &writer,
        },
        CancellationController::new(),
    );

    let report = engine.run().await;

    assert_eq!(report.termination, Termination::SeedsExhausted);
    assert_eq!(report.topic, None);
    assert_eq!(identifiers(&report), vec!["start", "n1"]);
    assert_eq!(report.results[1].discovery_path, "@start > @n1");
    assert_eq!(report.stats.seeds_admitted, 1);
    assert_eq!(report.stats.validation_rejected, 1);
    assert!(graph
        .calls()
        .iter()
        .all(|c| !matches!(c, Call::SeedPage { .. })));
    assert_eq!(writer.reasons(), vec![CheckpointReason::Completed]);
}

#[tokio::test]
async fn given_accounts_go_before_topic_seeds() {
    let graph = MockGraph::new()
        .seed_pages("luxury", &[&["t1"]])
        .profile("g", 60_000)
        .profile("t1", 60_000);
    let writer = RecordingCheckpointWriter::new();
    let engine = DiscoveryEngine::new(
        fast_config(10, 50_000),
        "luxury",
        Collaborators {
            resolver: &graph,
            neighbors: &graph,
            seeds: &graph,
            checkpoints: &writer,
        },
        CancellationController::new(),
    )
    .with_seed_accounts(vec!["g".to_string()]);

    let report = engine.run().await;

    assert_eq!(graph.resolved(), vec!["g", "t1"]);
    assert_eq!(report.results[0].discovery_path, "@g");
    assert_eq!(report.results[1].discovery_path, "#luxury > @t1");
}

#[tokio::test]
async fn cancellation_allows_no_further_remote_calls() {
    let cancel = CancellationController::new();
    let graph = MockGraph::new()
        .seed_pages("luxury", &[&["a", "b", "c"]])
        .profile("a", 60_000)
        .profile("b", 60_000)
        .profile("c", 60_000)
        .neighbors("a", &["x", "y"])
        .neighbors("b", &["z"])
        .cancel_on_resolve("b", cancel.clone());
    let writer = RecordingCheckpointWriter::new();

    let report = run_with(&graph, &writer, fast_config(100, 50_000), "luxury", cancel).await;

    assert_eq!(report.termination, Termination::Cancelled);
    assert_eq!(graph.calls().last(), Some(&Call::Resolve("b".into())));
    assert_eq!(identifiers(&report), vec!["a", "b"]);
    assert_eq!(report.stats.skipped_cancelled, 1);
    assert_eq!(writer.reasons(), vec![CheckpointReason::Cancelled]);
    assert_eq!(writer.last().unwrap().identifiers, vec!["a", "b"]);
}

#[tokio::test]
async fn periodic_checkpoints_follow_cadence() {
    let graph = MockGraph::new()
        .seed_pages("luxury", &[&["a", "b", "c", "d", "e"]])
        .profile("a", 60_000)
        .profile("b", 60_000)
        .profile("c", 60_000)
        .profile("d", 60_000)
        .profile("e", 60_000);
    let writer = RecordingCheckpointWriter::new();
    let config = DiscoveryConfig {
        checkpoint_every: 2,
        ..fast_config(5, 50_000)
    };

    let report = run_with(&graph, &writer, config, "luxury", CancellationController::new()).await;

    assert_eq!(report.termination, Termination::TargetReached);
    assert_eq!(
        writer.reasons(),
        vec![
            CheckpointReason::Periodic,
            CheckpointReason::Periodic,
            CheckpointReason::Completed
        ]
    );
    let exports = writer.exports();
    assert_eq!(exports[0].identifiers.len(), 2);
    assert_eq!(exports[1].identifiers.len(), 4);
    assert_eq!(exports[2].identifiers.len(), 5);
    assert_eq!(report.stats.checkpoints_written, 3);
}

#[tokio::test]
async fn failed_export_does_not_end_the_run() {
    let graph = MockGraph::new()
        .seed_pages("luxury", &[&["a", "b"]])
        .profile("a", 60_000)
        .profile("b", 60_000);
    let writer = RecordingCheckpointWriter::failing();
    let config = DiscoveryConfig {
        checkpoint_every: 1,
        ..fast_config(2, 50_000)
    };

    let report = run_with(&graph, &writer, config, "luxury", CancellationController::new()).await;

    assert_eq!(report.termination, Termination::TargetReached);
    assert_eq!(identifiers(&report), vec!["a", "b"]);
    assert!(report.checkpoint.is_none());
    assert_eq!(report.stats.checkpoints_failed, 3);
    assert_eq!(report.stats.checkpoints_written, 0);
}

#[tokio::test]
async fn private_profiles_are_dead_ends_by_default() {
    let graph = MockGraph::new()
        .seed_pages("luxury", &[&["p"]])
        .private_profile("p", 900_000)
        .neighbors("p", &["q"]);

    let report = run(&graph, fast_config(10, 50_000)).await;
    assert!(report.results.is_empty());
    assert_eq!(report.stats.private_skipped, 1);
    assert!(graph.neighbor_requests().is_empty());

    let graph = MockGraph::new()
        .seed_pages("luxury", &[&["p"]])
        .private_profile("p", 900_000);
    let config = DiscoveryConfig {
        private_is_unresolvable: false,
        ..fast_config(10, 50_000)
    };
    let report = run(&graph, config).await;
    assert_eq!(identifiers(&report), vec!["p"]);
}

#[tokio::test]
async fn neighbor_failure_is_an_empty_expansion() {
    let graph = MockGraph::new()
        .seed_pages("luxury", &[&["a", "b"]])
        .profile("a", 60_000)
        .profile("b", 60_000)
        .fail_neighbors("a")
        .neighbors("b", &["c"])
        .profile("c", 60_000);

    let report = run(&graph, fast_config(10, 50_000)).await;

    assert_eq!(report.termination, Termination::SeedsExhausted);
    assert_eq!(identifiers(&report), vec!["a", "b", "c"]);
    assert_eq!(report.stats.neighbor_failures, 1);
}

#[tokio::test]
async fn invalid_candidates_never_reach_the_resolver() {
    let graph = MockGraph::new()
        .seed_pages("luxury", &[&["a", "has space"]])
        .profile("a", 60_000)
        .neighbors("a", &["July", "ok_one", "x-y"]);

    let report = run(&graph, fast_config(10, 50_000)).await;

    assert_eq!(graph.resolved(), vec!["a", "ok_one"]);
    assert_eq!(report.stats.validation_rejected, 3);
}

#[tokio::test]
async fn falls_back_to_related_topic_when_primary_is_empty() {
    let graph = MockGraph::new()
        .seed_pages("fashion", &[&["f1"]])
        .profile("f1", 120_000);

    let report = run(&graph, fast_config(10, 50_000)).await;

    assert_eq!(identifiers(&report), vec!["f1"]);
    assert_eq!(report.results[0].discovery_path, "#fashion > @f1");
    assert_eq!(report.termination, Termination::SeedsExhausted);
    // luxury plus its four related topics
    assert_eq!(report.stats.topics_searched, 5);
}

#[tokio::test]
async fn no_seeds_at_all_still_exports() {
    let graph = MockGraph::new();
    let writer = RecordingCheckpointWriter::new();

    let report = run_with(
        &graph,
        &writer,
        fast_config(10, 50_000),
        "#pottery",
        CancellationController::new(),
    )
    .await;

    assert_eq!(report.termination, Termination::SeedsExhausted);
    assert!(report.results.is_empty());
    assert_eq!(report.topic.as_deref(), Some("pottery"));
    assert_eq!(writer.reasons(), vec![CheckpointReason::Completed]);
    assert!(writer.last().unwrap().identifiers.is_empty());
}

#[tokio::test]
async fn full_frontier_drops_candidates() {
    let graph = MockGraph::new()
        .seed_pages("luxury", &[&["a", "b", "c"]])
        .profile("a", 60_000)
        .profile("b", 60_000);
    let mut config = fast_config(10, 50_000);
    config.frontier.capacity = 2;

    let report = run(&graph, config).await;

    assert_eq!(graph.resolved(), vec!["a", "b"]);
    assert_eq!(report.stats.dropped_at_capacity, 1);
}

#[tokio::test]
async fn parallel_workers_never_overshoot_target() {
    let ids: Vec<String> = (0..12).map(|i| format!("acct{i}")).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let mut graph = MockGraph::new()
        .seed_pages("luxury", &[refs.as_slice()])
        .resolve_delay(Duration::from_millis(5));
    for id in &ids {
        graph = graph.profile(id, 75_000);
    }
    let config = DiscoveryConfig {
        workers: 4,
        ..fast_config(3, 50_000)
    };

    let report = run(&graph, config).await;

    assert_eq!(report.termination, Termination::TargetReached);
    assert_eq!(report.results.len(), 3);
    let resolved = graph.resolved();
    let unique: HashSet<_> = resolved.iter().collect();
    assert_eq!(resolved.len(), unique.len());
    assert!(resolved.len() <= 6, "resolved {resolved:?}");
}

#[tokio::test]
async fn failures_are_paced_like_successes() {
    let graph = MockGraph::new().seed_pages("luxury", &[&["x", "y", "z"]]);
    let config = DiscoveryConfig {
        request_delay_ms: 25,
        ..fast_config(10, 50_000)
    };

    let start = Instant::now();
    let report = run(&graph, config).await;

    assert_eq!(report.stats.unresolvable, 3);
    // first slot is free, the other two wait a full interval each
    assert!(start.elapsed() >= Duration::from_millis(45));
}

#[tokio::test]
async fn report_lists_top_profiles() {
    let graph = MockGraph::new()
        .seed_pages("luxury", &[&["a", "b"]])
        .profile("a", 60_000)
        .profile("b", 2_500_000);

    let report = run(&graph, fast_config(2, 50_000)).await;
    let text = report.to_string();

    assert!(text.contains("Termination: target reached"));
    let b = text.find("1. @b").unwrap();
    let a = text.find("2. @a").unwrap();
    assert!(b < a);
    assert!(text.contains("2.5M followers"));
}
