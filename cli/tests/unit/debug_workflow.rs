//! Tests for the `debug_vch` application service.
//!
//! Every test drives the workflow against `FakePlatform` and asserts both
//! the outcome and the exact port calls that were made.

#![allow(clippy::expect_used)]

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vch_common::{BuildVersion, FailureKind, Step};
use vch_debug::application::services::debug_vch::{
    DebugOptions, DebugOutcome, WorkflowFailure, debug_vch,
};
use vch_debug::domain::{AuthorizedKey, DebugRequest, TargetSelector};

use crate::helpers::ED25519_KEY;
use crate::mocks::{
    Call, FakePlatform, Op, RecordingReporter, about, appliance_config, request, vch,
};

const DIAGNOSTICS_BUDGET: Duration = Duration::from_secs(120);

fn installer() -> BuildVersion {
    BuildVersion::new("1.5.0", "18000", "a1b2c3d")
}

fn by_id(id: &str) -> DebugRequest {
    request(TargetSelector::Id(id.to_string()))
}

fn key() -> AuthorizedKey {
    AuthorizedKey::parse(ED25519_KEY.as_bytes())
        .expect("parse")
        .expect("one key")
}

async fn run_with(
    platform: &FakePlatform,
    request: &DebugRequest,
    reporter: &RecordingReporter,
    cancel: &CancellationToken,
) -> Result<DebugOutcome, WorkflowFailure> {
    let installer = installer();
    debug_vch(
        platform,
        request,
        DebugOptions {
            reporter,
            installer_version: &installer,
            diagnostics_budget: DIAGNOSTICS_BUDGET,
            cancel,
        },
    )
    .await
}

async fn run(platform: &FakePlatform, request: &DebugRequest) -> Result<DebugOutcome, WorkflowFailure> {
    run_with(
        platform,
        request,
        &RecordingReporter::default(),
        &CancellationToken::new(),
    )
    .await
}

fn is_collect(call: &Call) -> bool {
    matches!(call, Call::Collect { .. })
}

fn touches_appliance(call: &Call) -> bool {
    matches!(
        call,
        Call::ReadConfig(_) | Call::Apply { .. } | Call::Inspect(_) | Call::Collect { .. }
    )
}

// ── Success paths ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn enable_ssh_by_id_reports_endpoints() {
    let platform = FakePlatform::new(vec![vch("vch-42", "vch-42")]);
    let mut req = by_id("vch-42");
    req.enable_ssh = true;
    let reporter = RecordingReporter::default();

    let outcome = run_with(&platform, &req, &reporter, &CancellationToken::new())
        .await
        .expect("success");

    assert_eq!(outcome.report.appliance_id, "vch-42");
    assert!(outcome.report.ssh_enabled);
    assert!(!outcome.report.root_password_set);
    assert_eq!(
        outcome.report.endpoints.docker_api.as_deref(),
        Some("tcp://10.0.0.5:2376")
    );
    assert_eq!(
        outcome.report.endpoints.ssh.as_deref(),
        Some("ssh://root@10.0.0.5:22")
    );
    assert_eq!(
        platform.calls(),
        vec![
            Call::Validate,
            Call::FindById("vch-42".to_string()),
            Call::ReadConfig("vch-42".to_string()),
            Call::Apply {
                id: "vch-42".to_string(),
                enable_ssh: true,
                key_digest: None,
                root_password: false,
            },
            Call::Inspect("vch-42".to_string()),
        ]
    );
    assert!(reporter.contains("VCH ID: VirtualMachine:vch-42"));
    assert!(reporter.contains("Completed successfully"));
}

#[tokio::test]
async fn key_by_compute_path_is_installed_and_stable_across_runs() {
    let platform = FakePlatform::new(vec![vch("vm-7", "vch-test"), vch("vm-8", "other")]);
    let mut req = request(TargetSelector::ComputePath {
        compute_path: "/dc1/host/cluster1".to_string(),
        display_name: "vch-test".to_string(),
    });
    req.authorized_key = Some(key());

    let first = run(&platform, &req).await.expect("first run");
    let second = run(&platform, &req).await.expect("second run");

    assert_eq!(
        first.report.endpoints.authorized_key_digest,
        Some(key().digest())
    );
    assert!(first.report.endpoints.ssh.is_some());
    assert_eq!(first.report.endpoints, second.report.endpoints);
    assert_eq!(
        platform.calls()[1],
        Call::FindByComputePath("/dc1/host/cluster1".to_string(), "vch-test".to_string())
    );
    assert_eq!(
        platform.count(|c| matches!(c, Call::Apply { key_digest: Some(_), enable_ssh: true, .. })),
        2
    );
}

#[tokio::test]
async fn no_key_leaves_installed_key_untouched() {
    let mut config = appliance_config();
    config.ssh_enabled = true;
    config.authorized_key_digest = Some("sha256:previous".to_string());
    let platform = FakePlatform::single().with_config(config);
    let mut req = by_id("vm-42");
    req.enable_ssh = true;

    let outcome = run(&platform, &req).await.expect("success");

    assert_eq!(
        platform.current_config().authorized_key_digest.as_deref(),
        Some("sha256:previous")
    );
    assert_eq!(
        outcome.report.endpoints.authorized_key_digest.as_deref(),
        Some("sha256:previous")
    );
    assert_eq!(
        platform.count(|c| matches!(c, Call::Apply { key_digest: None, .. })),
        1
    );
}

#[tokio::test]
async fn root_password_is_reported_without_echo() {
    let platform = FakePlatform::single();
    let mut req = by_id("vm-42");
    req.root_password = Some("hunter2".to_string());
    let reporter = RecordingReporter::default();

    let outcome = run_with(&platform, &req, &reporter, &CancellationToken::new())
        .await
        .expect("success");

    assert!(outcome.report.root_password_set);
    assert!(!outcome.report.ssh_enabled);
    assert!(reporter.lines().iter().all(|l| !l.contains("hunter2")));
}

#[tokio::test]
async fn newer_appliance_version_is_a_warning() {
    let mut config = appliance_config();
    config.version = Some(BuildVersion::new("1.6.0", "19000", "ffffff0"));
    let platform = FakePlatform::single().with_config(config);

    let outcome = run(&platform, &by_id("vm-42")).await.expect("success");

    assert!(
        outcome
            .warnings
            .iter()
            .any(|w| w.contains("newer than installer version"))
    );
}

// ── Failure paths ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn configure_failure_collects_diagnostics_once() {
    let platform = FakePlatform::single().failing(Op::Apply);
    let mut req = by_id("vm-42");
    req.enable_ssh = true;

    let failure = run(&platform, &req).await.expect_err("must fail");

    assert_eq!(failure.error.kind(), FailureKind::ConfigurationFailed);
    assert_eq!(platform.count(is_collect), 1);
    assert_eq!(platform.count(|c| matches!(c, Call::Inspect(_))), 0);
    assert!(platform.calls().contains(&Call::Collect {
        id: "vm-42".to_string(),
        logs: true,
    }));

    let report = failure.report();
    assert_eq!(report.summary, "Debug failed");
    assert_eq!(report.appliance_id.as_deref(), Some("vm-42"));
    assert!(report.message.contains("injected Apply failure"));
    let diagnostics = report.diagnostics.expect("bundle");
    assert_eq!(diagnostics.path, "/tmp/vch-42-diag");
}

#[tokio::test]
async fn inspect_failure_collects_diagnostics() {
    let platform = FakePlatform::single().failing(Op::Inspect);

    let failure = run(&platform, &by_id("vm-42")).await.expect_err("must fail");

    assert_eq!(failure.error.kind(), FailureKind::InspectionFailed);
    assert_eq!(failure.report().summary, "inspect failed");
    assert_eq!(platform.count(is_collect), 1);
}

#[tokio::test]
async fn collector_failure_keeps_original_error() {
    let platform = FakePlatform::single()
        .failing(Op::Apply)
        .failing(Op::Collect);
    let reporter = RecordingReporter::default();

    let failure = run_with(&platform, &by_id("vm-42"), &reporter, &CancellationToken::new())
        .await
        .expect_err("must fail");

    assert_eq!(failure.error.kind(), FailureKind::ConfigurationFailed);
    assert!(failure.diagnostics.is_none());
    assert!(reporter.contains("diagnostic collection failed"));
}

#[tokio::test]
async fn validation_failure_stops_before_resolution() {
    let platform = FakePlatform::single().failing(Op::Validate);

    let failure = run(&platform, &by_id("vm-42")).await.expect_err("must fail");

    assert_eq!(failure.error.kind(), FailureKind::ValidationFailed);
    assert_eq!(platform.calls(), vec![Call::Validate]);
    assert!(failure.diagnostics.is_none());
    assert!(failure.appliance.is_none());
}

#[tokio::test]
async fn unmatched_selector_is_a_resolution_failure() {
    let platform = FakePlatform::new(Vec::new());

    let failure = run(&platform, &by_id("vm-404")).await.expect_err("must fail");

    assert_eq!(failure.error.kind(), FailureKind::ResolutionFailed);
    assert!(failure.message().contains("no Virtual Container Host found"));
    assert_eq!(platform.count(touches_appliance), 0);
}

#[tokio::test]
async fn ambiguous_name_is_a_resolution_failure() {
    let platform = FakePlatform::new(vec![vch("vm-1", "vch-test"), vch("vm-2", "vch-test")]);
    let req = request(TargetSelector::ComputePath {
        compute_path: "/dc1/host/cluster1".to_string(),
        display_name: "vch-test".to_string(),
    });

    let failure = run(&platform, &req).await.expect_err("must fail");

    assert_eq!(failure.error.kind(), FailureKind::ResolutionFailed);
    assert!(failure.message().contains("vch-test (vm-1), vch-test (vm-2)"));
    assert_eq!(platform.count(touches_appliance), 0);
}

#[tokio::test]
async fn config_fetch_failure_is_a_resolution_failure() {
    let platform = FakePlatform::single().failing(Op::ReadConfig);

    let failure = run(&platform, &by_id("vm-42")).await.expect_err("must fail");

    assert_eq!(failure.error.kind(), FailureKind::ResolutionFailed);
    assert_eq!(failure.appliance.as_ref().map(|a| a.id.as_str()), Some("vm-42"));
    assert_eq!(platform.count(is_collect), 0);
}

#[tokio::test]
async fn old_api_version_needs_force() {
    let platform = FakePlatform::single().with_about(about("5.5.0"));
    let failure = run(&platform, &by_id("vm-42")).await.expect_err("must fail");
    assert_eq!(failure.error.kind(), FailureKind::ValidationFailed);
    assert!(failure.message().contains("--force"));

    let platform = FakePlatform::single().with_about(about("5.5.0"));
    let mut req = by_id("vm-42");
    req.force = true;
    let outcome = run(&platform, &req).await.expect("forced run succeeds");
    assert!(!outcome.warnings.is_empty());
}

#[tokio::test]
async fn zero_timeout_is_rejected_before_any_call() {
    let platform = FakePlatform::single();
    let mut req = by_id("vm-42");
    req.timeout = Duration::ZERO;

    let failure = run(&platform, &req).await.expect_err("must fail");

    assert_eq!(failure.error.kind(), FailureKind::InputError);
    assert!(platform.calls().is_empty());
}

// ── Deadline and cancellation ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn timeout_during_validation_makes_no_further_calls() {
    let platform = FakePlatform::single().slow(Op::Validate, Duration::from_secs(300));
    let mut req = by_id("vm-42");
    req.timeout = Duration::from_secs(10);

    let failure = run(&platform, &req).await.expect_err("must time out");

    assert_eq!(failure.error.kind(), FailureKind::Timeout);
    assert_eq!(failure.error.step(), Some(Step::Validate));
    assert_eq!(platform.calls(), vec![Call::Validate]);
}

#[tokio::test(start_paused = true)]
async fn timeout_during_configure_collects_diagnostics() {
    let platform = FakePlatform::single().slow(Op::Apply, Duration::from_secs(300));
    let mut req = by_id("vm-42");
    req.timeout = Duration::from_secs(60);

    let failure = run(&platform, &req).await.expect_err("must time out");

    assert_eq!(failure.error.kind(), FailureKind::Timeout);
    assert_eq!(failure.error.step(), Some(Step::Configure));
    assert_eq!(platform.count(is_collect), 1);
    assert!(failure.diagnostics.is_some());
    assert_eq!(platform.count(|c| matches!(c, Call::Inspect(_))), 0);
}

#[tokio::test(start_paused = true)]
async fn timeout_during_inspect_collects_diagnostics() {
    let platform = FakePlatform::single().slow(Op::Inspect, Duration::from_secs(300));
    let mut req = by_id("vm-42");
    req.timeout = Duration::from_secs(60);

    let failure = run(&platform, &req).await.expect_err("must time out");

    assert_eq!(failure.error.kind(), FailureKind::Timeout);
    assert_eq!(failure.error.step(), Some(Step::Inspect));
    assert_eq!(failure.report().summary, "inspect failed");
    assert_eq!(platform.count(is_collect), 1);
    assert!(failure.diagnostics.is_some());
}

#[tokio::test(start_paused = true)]
async fn interrupt_during_configure_skips_diagnostics() {
    let platform = FakePlatform::single().slow(Op::Apply, Duration::from_secs(300));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let failure = run_with(&platform, &by_id("vm-42"), &RecordingReporter::default(), &cancel)
        .await
        .expect_err("must be cancelled");

    assert_eq!(failure.error.kind(), FailureKind::Cancelled);
    assert_eq!(failure.error.step(), Some(Step::Configure));
    assert_eq!(platform.count(is_collect), 0);
}

#[tokio::test]
async fn already_cancelled_run_calls_nothing() {
    let platform = FakePlatform::single();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let failure = run_with(&platform, &by_id("vm-42"), &RecordingReporter::default(), &cancel)
        .await
        .expect_err("must be cancelled");

    assert_eq!(failure.error.kind(), FailureKind::Cancelled);
    assert!(platform.calls().is_empty());
}
