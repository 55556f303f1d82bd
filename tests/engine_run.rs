// tests/engine_run.rs

mod common;

use stagedag::dag::DependencyGraph;
use stagedag::engine::{execute, Engine};
use stagedag::errors::{StagedagError, PIPELINE_FAILURE_EXIT_CODE};
use stagedag::record::{read_ledger, LedgerEvent, RunLedger, TimingStore};
use stagedag::types::{LedgerMode, StageResult};
use stagedag_test_utils::fake_runnable::{invocation_log, invoked, FakeRunnable};
use tempfile::tempdir;

use common::{init_tracing, ledger_events};

#[tokio::test]
async fn successful_chain_writes_full_ledger_and_timings() {
    init_tracing();
    let dir = tempdir().unwrap();
    let log = invocation_log();

    let mut graph = DependencyGraph::builder()
        .node("a", Vec::<String>::new(), FakeRunnable::success("a", log.clone()))
        .node("b", ["a"], FakeRunnable::success("b", log.clone()))
        .build()
        .unwrap();

    let ledger = RunLedger::open(dir.path().join("STATE"), LedgerMode::Truncate).unwrap();
    let timing = TimingStore::new(dir.path().join("timing.txt"));
    let report = execute(&mut graph, "b", ledger, Some(timing.clone()))
        .await
        .unwrap();

    assert_eq!(invoked(&log), vec!["a", "b"]);
    assert_eq!(report.order, vec!["a", "b"]);
    assert_eq!(report.result_of("b"), Some(StageResult::Success));
    assert_eq!(
        ledger_events(&dir.path().join("STATE")),
        vec![
            "START_PIPELINE",
            "START a",
            "END a",
            "START b",
            "END b",
            "PIPELINE_SUCCESS",
        ]
    );
    assert_eq!(timing.samples("a").unwrap().len(), 1);
    assert_eq!(timing.samples("b").unwrap().len(), 1);
}

#[tokio::test]
async fn failing_stage_aborts_the_run_and_maps_to_pipeline_exit_code() {
    init_tracing();
    let dir = tempdir().unwrap();
    let log = invocation_log();

    let mut graph = DependencyGraph::builder()
        .node("a", Vec::<String>::new(), FakeRunnable::success("a", log.clone()))
        .node("b", ["a"], FakeRunnable::new("b", StageResult::Failed(2), log.clone()))
        .node("c", ["b"], FakeRunnable::success("c", log.clone()))
        .build()
        .unwrap();

    let ledger_path = dir.path().join("STATE");
    let ledger = RunLedger::open(&ledger_path, LedgerMode::Truncate).unwrap();
    let timing = TimingStore::new(dir.path().join("timing.txt"));
    let err = execute(&mut graph, "c", ledger, Some(timing.clone()))
        .await
        .unwrap_err();

    match &err {
        StagedagError::StageFailed { stage, code } => {
            assert_eq!(stage, "b");
            assert_eq!(*code, 2);
        }
        other => panic!("expected StageFailed, got {:?}", other),
    }
    assert_eq!(err.exit_code(), PIPELINE_FAILURE_EXIT_CODE);
    assert_eq!(invoked(&log), vec!["a", "b"]);
    assert_eq!(
        ledger_events(&ledger_path),
        vec![
            "START_PIPELINE",
            "START a",
            "END a",
            "START b",
            "FAIL b",
            "PIPELINE_FAILURE",
        ]
    );
    // Failed stages leave no timing sample.
    assert!(timing.samples("b").unwrap().is_empty());
}

#[tokio::test]
async fn failure_stops_independent_siblings_too() {
    init_tracing();
    let dir = tempdir().unwrap();
    let log = invocation_log();

    // Order is [y, x, t]; y fails first and x must not be attempted.
    let mut graph = DependencyGraph::builder()
        .node("x", Vec::<String>::new(), FakeRunnable::success("x", log.clone()))
        .node("y", Vec::<String>::new(), FakeRunnable::new("y", StageResult::Failed(1), log.clone()))
        .node("t", ["x", "y"], FakeRunnable::success("t", log.clone()))
        .build()
        .unwrap();

    let ledger = RunLedger::open(dir.path().join("STATE"), LedgerMode::Truncate).unwrap();
    let mut engine = Engine::new(ledger);
    let err = engine.run(&mut graph, "t").await.unwrap_err();

    assert!(matches!(err, StagedagError::StageFailed { ref stage, .. } if stage == "y"));
    assert_eq!(invoked(&log), vec!["y"]);
}

#[tokio::test]
async fn skipped_stage_is_recorded_as_end_without_run() {
    init_tracing();
    let dir = tempdir().unwrap();
    let log = invocation_log();

    let mut graph = DependencyGraph::builder()
        .node("a", Vec::<String>::new(), FakeRunnable::new("a", StageResult::Skipped, log.clone()))
        .node("b", ["a"], FakeRunnable::success("b", log.clone()))
        .build()
        .unwrap();

    let ledger_path = dir.path().join("STATE");
    let ledger = RunLedger::open(&ledger_path, LedgerMode::Truncate).unwrap();
    let timing = TimingStore::new(dir.path().join("timing.txt"));
    let report = execute(&mut graph, "b", ledger, Some(timing.clone()))
        .await
        .unwrap();

    assert_eq!(report.skipped().collect::<Vec<_>>(), vec!["a"]);
    assert_eq!(report.succeeded().collect::<Vec<_>>(), vec!["b"]);
    assert_eq!(
        ledger_events(&ledger_path),
        vec![
            "START_PIPELINE",
            "START a",
            "END_WITHOUT_RUN a",
            "START b",
            "END b",
            "PIPELINE_SUCCESS",
        ]
    );
    assert!(timing.samples("a").unwrap().is_empty());
}

#[tokio::test]
async fn runnable_error_is_recorded_as_failure() {
    init_tracing();
    let dir = tempdir().unwrap();
    let log = invocation_log();

    let mut graph = DependencyGraph::builder()
        .node("a", Vec::<String>::new(), FakeRunnable::unspawnable("a", log.clone()))
        .build()
        .unwrap();

    let ledger_path = dir.path().join("STATE");
    let ledger = RunLedger::open(&ledger_path, LedgerMode::Truncate).unwrap();
    let err = execute(&mut graph, "a", ledger, None).await.unwrap_err();

    assert!(matches!(err, StagedagError::StageFailed { code: -1, .. }), "{err:?}");
    let entries = read_ledger(&ledger_path).unwrap();
    let events: Vec<LedgerEvent> = entries.into_iter().map(|e| e.event).collect();
    assert_eq!(
        events,
        vec![
            LedgerEvent::StartPipeline,
            LedgerEvent::Start("a".into()),
            LedgerEvent::Fail("a".into()),
            LedgerEvent::PipelineFailure,
        ]
    );
}

#[tokio::test]
async fn unknown_target_writes_nothing() {
    init_tracing();
    let dir = tempdir().unwrap();
    let log = invocation_log();

    let mut graph = DependencyGraph::builder()
        .node("a", Vec::<String>::new(), FakeRunnable::success("a", log.clone()))
        .build()
        .unwrap();

    let ledger_path = dir.path().join("STATE");
    let ledger = RunLedger::open(&ledger_path, LedgerMode::Truncate).unwrap();
    let mut engine = Engine::new(ledger);
    let err = engine.run(&mut graph, "nope").await.unwrap_err();

    assert!(matches!(err, StagedagError::StageNotFound(_)));
    assert!(engine.ledger().entries().is_empty());
    assert!(invoked(&log).is_empty());
}

#[tokio::test]
async fn unwritable_timing_file_does_not_fail_the_run() {
    init_tracing();
    let dir = tempdir().unwrap();
    let log = invocation_log();

    // The timing file's parent is a regular file, so every write fails.
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();

    let mut graph = DependencyGraph::builder()
        .node("a", Vec::<String>::new(), FakeRunnable::success("a", log.clone()))
        .node("b", ["a"], FakeRunnable::success("b", log.clone()))
        .build()
        .unwrap();

    let ledger = RunLedger::open(dir.path().join("STATE"), LedgerMode::Truncate).unwrap();
    let timing = TimingStore::new(blocker.join("timing.txt"));
    let report = execute(&mut graph, "b", ledger, Some(timing)).await.unwrap();

    assert_eq!(invoked(&log), vec!["a", "b"]);
    assert_eq!(report.result_of("b"), Some(StageResult::Success));
    assert_eq!(
        ledger_events(&dir.path().join("STATE")),
        vec![
            "START_PIPELINE",
            "START a",
            "END a",
            "START b",
            "END b",
            "PIPELINE_SUCCESS",
        ]
    );
}
