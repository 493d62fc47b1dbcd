mod common;

use std::fs;

use common::{config_in, cwd_lock, CloneBehavior, Reply, StubRuntime, StubVcs};
use pungi::{Orchestrator, ProvisionError, ToolFault, WorkdirMode};

#[test]
fn test_scenario_runs_script_with_run_python_prefix() {
    let td = tempfile::tempdir().expect("tmpdir");
    let staging = td.path().join("x");
    let mut config = config_in(td.path(), &["proj/hello.py"]);
    config.staging_root = staging.clone();
    config.local_path = Some(staging.join("proj"));

    let vcs = StubVcs::materializing();
    let runtime = StubRuntime::healthy().exit("run", 0, "hi\n");

    let out = Orchestrator::new(config, &vcs, &runtime)
        .run()
        .expect("run should succeed");
    assert_eq!(out, "hi\n");

    let runs = runtime.calls_starting_with("run");
    assert_eq!(runs.len(), 1, "calls: {:?}", runtime.calls());
    assert_eq!(runs[0].program, "poetry");
    assert_eq!(runs[0].args, vec!["run", "python", "proj/hello.py"]);
    assert_eq!(runs[0].cwd, staging.join("proj"));

    assert_eq!(
        vcs.clones.borrow().as_slice(),
        &[("https://example.test/proj.git".to_string(), staging.join("proj"))]
    );
    assert!(!staging.exists(), "staging root left behind after success");
}

#[test]
fn test_stages_run_in_order() {
    let td = tempfile::tempdir().expect("tmpdir");
    let vcs = StubVcs::materializing();
    let runtime = StubRuntime::healthy();

    Orchestrator::new(config_in(td.path(), &["main.py"]), &vcs, &runtime)
        .run()
        .expect("run should succeed");

    let firsts: Vec<String> = runtime
        .calls()
        .iter()
        .map(|c| c.args.join(" "))
        .collect();
    assert_eq!(firsts, vec!["--version", "install --sync", "run python main.py"]);
}

#[test]
fn test_missing_tool_short_circuits_before_clone() {
    let td = tempfile::tempdir().expect("tmpdir");
    let config = config_in(td.path(), &["main.py"]);
    let staging = config.staging_root.clone();
    let vcs = StubVcs::materializing();
    let runtime = StubRuntime::default().reply("--version", Reply::NotFound);

    let err = Orchestrator::new(config, &vcs, &runtime)
        .run()
        .expect_err("missing tool must fail");
    match err {
        ProvisionError::ToolMissing { ref tool, ref fault } => {
            assert_eq!(tool, "poetry");
            assert_eq!(fault, &ToolFault::NotFound);
        }
        other => panic!("expected ToolMissing, got {other:?}"),
    }
    assert_eq!(pungi::exit_code_for_provision_error(&err), 127);
    assert_eq!(vcs.invocations(), 0, "version control must not be touched");
    assert_eq!(runtime.calls().len(), 1);
    assert!(!staging.exists());
}

#[test]
fn test_erroring_tool_is_tool_missing_with_detail() {
    let td = tempfile::tempdir().expect("tmpdir");
    let vcs = StubVcs::materializing();
    let runtime = StubRuntime::default().exit("--version", 1, "broken install\n");

    let err = Orchestrator::new(config_in(td.path(), &["main.py"]), &vcs, &runtime)
        .run()
        .expect_err("erroring tool must fail");
    match err {
        ProvisionError::ToolMissing {
            fault: ToolFault::Errored(detail),
            ..
        } => assert!(detail.contains("broken install"), "detail: {detail}"),
        other => panic!("expected ToolMissing/Errored, got {other:?}"),
    }
    assert_eq!(vcs.invocations(), 0);
}

#[test]
fn test_sync_failure_prevents_execution() {
    let td = tempfile::tempdir().expect("tmpdir");
    let config = config_in(td.path(), &["main.py"]);
    let staging = config.staging_root.clone();
    let vcs = StubVcs::materializing();
    let runtime = StubRuntime::healthy().exit("install", 1, "SolverProblemError\n");

    let err = Orchestrator::new(config, &vcs, &runtime)
        .run()
        .expect_err("sync failure must fail the run");
    match err {
        ProvisionError::DependencySyncFailed { ref output, .. } => {
            assert_eq!(output, "SolverProblemError\n")
        }
        ref other => panic!("expected DependencySyncFailed, got {other:?}"),
    }
    assert!(runtime.calls_starting_with("run").is_empty(), "script ran after failed sync");
    assert!(!staging.exists());
}

#[test]
fn test_clone_failure_is_acquisition_failed() {
    let td = tempfile::tempdir().expect("tmpdir");
    let vcs = StubVcs::new(CloneBehavior::Fail("authentication required".to_string()));
    let runtime = StubRuntime::healthy();

    let err = Orchestrator::new(config_in(td.path(), &["main.py"]), &vcs, &runtime)
        .run()
        .expect_err("clone failure must fail the run");
    match err {
        ProvisionError::AcquisitionFailed { remote_url, reason } => {
            assert_eq!(remote_url, "https://example.test/proj.git");
            assert_eq!(reason, "authentication required");
        }
        other => panic!("expected AcquisitionFailed, got {other:?}"),
    }
    assert!(runtime.calls_starting_with("install").is_empty());
}

#[test]
fn test_script_failure_carries_output_and_cleans_up() {
    let td = tempfile::tempdir().expect("tmpdir");
    let config = config_in(td.path(), &["main.py"]);
    let staging = config.staging_root.clone();
    let vcs = StubVcs::materializing();
    let runtime = StubRuntime::healthy().exit("run", 2, "partial\nTraceback\n");

    let err = Orchestrator::new(config, &vcs, &runtime)
        .run()
        .expect_err("failing script must fail the run");
    assert!(matches!(err, ProvisionError::ExecutionFailed { code: Some(2), .. }));
    assert_eq!(err.captured_output(), Some("partial\nTraceback\n"));
    assert_eq!(pungi::exit_code_for_provision_error(&err), 2);
    assert!(!staging.exists());
}

#[test]
fn test_relocate_mode_runs_inside_checkout_and_restores_cwd() {
    let _lock = cwd_lock();
    let td = tempfile::tempdir().expect("tmpdir");
    // getcwd reports resolved paths; build the expectation from the canonical temp dir.
    let base = fs::canonicalize(td.path()).expect("canon tmpdir");
    let mut config = config_in(&base, &["main.py"]);
    config.workdir_mode = WorkdirMode::Relocate;
    let checkout = config.checkout_path().expect("checkout path");
    let vcs = StubVcs::materializing();
    let runtime = StubRuntime::healthy().exit("run", 3, "nope\n");
    let before = std::env::current_dir().expect("cwd");

    let err = Orchestrator::new(config, &vcs, &runtime)
        .run()
        .expect_err("failing script");
    assert!(matches!(err, ProvisionError::ExecutionFailed { .. }));
    assert_eq!(std::env::current_dir().expect("cwd after"), before);

    for call in runtime.calls().iter().skip(1) {
        assert_eq!(call.process_cwd, checkout, "stage did not relocate: {call:?}");
    }
}

#[test]
fn test_explicit_mode_never_moves_process_cwd() {
    let _lock = cwd_lock();
    let td = tempfile::tempdir().expect("tmpdir");
    let vcs = StubVcs::materializing();
    let runtime = StubRuntime::healthy();
    let before = std::env::current_dir().expect("cwd");

    Orchestrator::new(config_in(td.path(), &["main.py"]), &vcs, &runtime)
        .run()
        .expect("run should succeed");
    assert!(runtime.calls().iter().all(|c| c.process_cwd == before));
    assert_eq!(std::env::current_dir().expect("cwd after"), before);
}

#[test]
fn test_invalid_local_path_is_rejected_before_staging() {
    let td = tempfile::tempdir().expect("tmpdir");
    let mut config = config_in(td.path(), &["main.py"]);
    config.local_path = Some(td.path().join("outside"));
    let staging = config.staging_root.clone();
    let vcs = StubVcs::materializing();
    let runtime = StubRuntime::healthy();

    let err = Orchestrator::new(config, &vcs, &runtime)
        .run()
        .expect_err("checkout outside the staging root must be refused");
    assert!(matches!(err, ProvisionError::InvalidConfig(_)));
    assert!(!staging.exists());
    assert!(runtime.calls().is_empty());
}

#[test]
fn test_non_empty_staging_root_is_left_untouched() {
    let td = tempfile::tempdir().expect("tmpdir");
    let config = config_in(td.path(), &["main.py"]);
    fs::create_dir_all(&config.staging_root).expect("mkdir");
    let keep = config.staging_root.join("keep.txt");
    fs::write(&keep, "precious").expect("write");
    let vcs = StubVcs::materializing();
    let runtime = StubRuntime::healthy();

    let err = Orchestrator::new(config, &vcs, &runtime)
        .run()
        .expect_err("foreign staging root must be refused");
    assert!(matches!(err, ProvisionError::StagingFailed { .. }));
    assert!(keep.exists());
    assert!(runtime.calls().is_empty());
}
