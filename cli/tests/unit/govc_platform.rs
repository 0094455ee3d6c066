//! Tests for `GovcPlatform` against a recording command runner.
//!
//! Asserts the exact `govc` argv and environment for each port, and that
//! credentials travel only in `GOVC_*` variables.

#![allow(clippy::expect_used)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vch_debug::application::ports::{
    ApplianceLocator, DebugConfigurator, DiagnosticCollector, EnvironmentValidator,
    ValidationParams,
};
use vch_debug::domain::appliance::KEY_DEBUG_LEVEL;
use vch_debug::domain::session::ApiType;
use vch_debug::domain::{
    ApplianceConfig, ApplianceHandle, AuthorizedKey, DebugChanges, DiagnosticLogs,
};
use vch_debug::infra::govc::GovcPlatform;

use crate::helpers::{ED25519_KEY, err_output, ok_output};
use crate::mocks::{InvocationLog, RecordingRunner, session, target, vch};

const VM_INFO: &[u8] = br#"{"virtualMachines":[{
    "self":{"type":"VirtualMachine","value":"vm-42"},
    "name":"vch-test",
    "config":{
        "files":{"vmPathName":"[datastore1] vch-test/vch-test.vmx"},
        "extraConfig":[{"key":"guestinfo.vice./init/version","value":"v1.5.0-18000-a1b2c3d"}]
    },
    "runtime":{"powerState":"poweredOn"}
}]}"#;

fn platform(runner: RecordingRunner) -> (GovcPlatform<RecordingRunner>, InvocationLog) {
    platform_in(runner, PathBuf::from("."))
}

fn platform_in(
    runner: RecordingRunner,
    output_dir: PathBuf,
) -> (GovcPlatform<RecordingRunner>, InvocationLog) {
    let log = runner.log();
    (GovcPlatform::new(runner, Path::new("govc"), output_dir), log)
}

fn handle() -> ApplianceHandle {
    vch("vm-42", "vch-42").handle
}

#[tokio::test]
async fn validate_passes_credentials_in_environment() {
    let about = br#"{"about":{"fullName":"VMware vCenter Server 7.0.3","apiType":"VirtualCenter","apiVersion":"7.0.3.0"}}"#;
    let (platform, log) = platform(RecordingRunner::default().respond("about", ok_output(about)));
    let target = target();

    let session = platform
        .validate(
            &ValidationParams {
                target: &target,
                insecure: true,
            },
            &CancellationToken::new(),
        )
        .await
        .expect("validate");

    assert_eq!(session.about.api_type, ApiType::VirtualCenter);
    assert!(session.insecure);

    let calls = log.all();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.program, "govc");
    assert_eq!(call.args, ["about", "-json"]);
    assert_eq!(call.env("GOVC_URL"), Some("https://vc.example.com/sdk"));
    assert_eq!(call.env("GOVC_USERNAME"), Some("admin"));
    assert_eq!(call.env("GOVC_PASSWORD"), Some("s3cret"));
    assert_eq!(call.env("GOVC_INSECURE"), Some("1"));
    assert!(call.args.iter().all(|a| !a.contains("s3cret")));
}

#[tokio::test]
async fn validate_surfaces_login_errors() {
    let (platform, _) = platform(
        RecordingRunner::default()
            .respond("about", err_output(1, b"ServerFaultCode: Cannot complete login\n")),
    );
    let target = target();

    let err = platform
        .validate(
            &ValidationParams {
                target: &target,
                insecure: true,
            },
            &CancellationToken::new(),
        )
        .await
        .expect_err("must fail");

    let message = format!("{err:#}");
    assert!(message.contains("cannot connect to vc.example.com"));
    assert!(message.contains("Cannot complete login"));
}

#[tokio::test]
async fn unknown_id_yields_no_candidates() {
    let (platform, log) = platform(RecordingRunner::default().respond(
        "vm.info",
        err_output(1, b"govc: vm 'VirtualMachine:vm-404' not found\n"),
    ));

    let found = platform
        .find_by_id(&session(), "vm-404", &CancellationToken::new())
        .await
        .expect("lookup");

    assert!(found.is_empty());
    assert_eq!(
        log.all()[0].args,
        ["vm.info", "-json", "-e", "VirtualMachine:vm-404"]
    );
}

#[tokio::test]
async fn compute_path_lookup_finds_then_reads() {
    let (platform, log) = platform(
        RecordingRunner::default()
            .respond("find", ok_output(b"VirtualMachine:vm-42\n"))
            .respond("vm.info", ok_output(VM_INFO)),
    );

    let found = platform
        .find_by_compute_path(
            &session(),
            "/dc1/host/cluster1",
            "vch-test",
            &CancellationToken::new(),
        )
        .await
        .expect("lookup");

    assert_eq!(found.len(), 1);
    assert!(found[0].is_vch);
    assert_eq!(found[0].handle.id, "vm-42");
    assert_eq!(
        log.by_subcommand("find")[0].args,
        ["find", "-i", "/dc1/host/cluster1", "-type", "m", "-name", "vch-test"]
    );
    assert_eq!(
        log.by_subcommand("vm.info")[0].args,
        ["vm.info", "-json", "-e", "VirtualMachine:vm-42"]
    );
}

#[tokio::test]
async fn empty_find_skips_vm_info() {
    let (platform, log) = platform(RecordingRunner::default().respond("find", ok_output(b"")));

    let found = platform
        .find_by_compute_path(&session(), "/dc1/host/cluster1", "vch-x", &CancellationToken::new())
        .await
        .expect("lookup");

    assert!(found.is_empty());
    assert!(log.by_subcommand("vm.info").is_empty());
}

#[tokio::test]
async fn apply_runs_guest_programs_in_order() {
    let (platform, log) = platform(RecordingRunner::default());
    let key = AuthorizedKey::parse(ED25519_KEY.as_bytes())
        .expect("parse")
        .expect("key");
    let changes = DebugChanges {
        enable_ssh: true,
        authorized_key: Some(&key),
        root_password: Some("hunter2"),
    };

    platform
        .apply(
            &session(),
            &handle(),
            &ApplianceConfig::default(),
            &changes,
            &CancellationToken::new(),
        )
        .await
        .expect("apply");

    let calls = log.all();
    let args: Vec<Vec<String>> = calls.iter().map(|c| c.args.clone()).collect();
    assert_eq!(args.len(), 4);
    assert_eq!(
        args[0],
        [
            "vm.change",
            "-vm",
            "VirtualMachine:vm-42",
            "-e",
            "guestinfo.vice./diagnostics/debug=1"
        ]
    );
    assert_eq!(
        args[1],
        [
            "guest.start",
            "-vm",
            "VirtualMachine:vm-42",
            "-l",
            "root:",
            "enable-ssh",
            ED25519_KEY
        ]
    );
    assert_eq!(args[2][5..], ["passwd", "hunter2"]);
    assert_eq!(args[3][..3], ["vm.change", "-vm", "VirtualMachine:vm-42"]);
    assert!(args[3].contains(&"guestinfo.vice./diagnostics/ssh=true".to_string()));
    assert!(args[3].contains(&format!(
        "guestinfo.vice./diagnostics/authorized_key_digest={}",
        key.digest()
    )));

    assert_eq!(calls[1].timeout, Some(Duration::from_secs(120)));
    let leaks = calls
        .iter()
        .filter(|c| c.args.iter().any(|a| a == "hunter2"))
        .count();
    assert_eq!(leaks, 1);
    assert!(
        calls
            .iter()
            .all(|c| c.envs.iter().all(|(_, v)| v != "hunter2"))
    );
}

#[tokio::test]
async fn apply_with_nothing_new_makes_no_calls() {
    let (platform, log) = platform(RecordingRunner::default());
    let config = ApplianceConfig {
        debug_level: 1,
        ..ApplianceConfig::default()
    };
    let changes = DebugChanges {
        enable_ssh: false,
        authorized_key: None,
        root_password: None,
    };

    platform
        .apply(&session(), &handle(), &config, &changes, &CancellationToken::new())
        .await
        .expect("apply");

    assert!(log.all().is_empty());
}

#[tokio::test]
async fn apply_never_lowers_a_high_debug_level() {
    let (platform, log) = platform(RecordingRunner::default());
    let guestinfo = BTreeMap::from([(KEY_DEBUG_LEVEL.to_string(), "256".to_string())]);
    let config = ApplianceConfig::from_guestinfo(&guestinfo, None, None);
    let changes = DebugChanges {
        enable_ssh: false,
        authorized_key: None,
        root_password: None,
    };

    platform
        .apply(&session(), &handle(), &config, &changes, &CancellationToken::new())
        .await
        .expect("apply");

    assert!(log.by_subcommand("vm.change").is_empty());
}

#[tokio::test]
async fn failed_guest_program_names_the_step() {
    let (platform, _) = platform(
        RecordingRunner::default()
            .respond("guest.start", err_output(1, b"ServerFaultCode: guest operations agent unavailable")),
    );
    let changes = DebugChanges {
        enable_ssh: true,
        authorized_key: None,
        root_password: None,
    };
    let config = ApplianceConfig {
        debug_level: 1,
        ..ApplianceConfig::default()
    };

    let err = platform
        .apply(&session(), &handle(), &config, &changes, &CancellationToken::new())
        .await
        .expect_err("must fail");

    let message = format!("{err:#}");
    assert!(message.starts_with("enabling SSH"));
    assert!(message.contains("guest operations agent unavailable"));
}

#[tokio::test]
async fn collect_writes_bundle_and_lists_missing_logs() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (platform, log) = platform_in(
        RecordingRunner::default()
            .respond("vm.info", ok_output(VM_INFO))
            .respond("datastore.download", err_output(1, b"file not found")),
        dir.path().to_path_buf(),
    );
    let logs = DiagnosticLogs {
        datastore: "datastore1".to_string(),
        folder: "vch-42".to_string(),
        files: vec!["vmware.log".to_string(), "tether.debug".to_string()],
    };

    let bundle = platform
        .collect(&session(), &handle(), Some(&logs), &CancellationToken::new())
        .await
        .expect("collect");

    assert!(bundle.path.starts_with(dir.path()));
    let dir_name = bundle
        .path
        .file_name()
        .expect("name")
        .to_string_lossy()
        .into_owned();
    assert!(dir_name.starts_with("vch-debug-vch-42-"));
    assert_eq!(bundle.files, ["vm-info.json"]);
    assert_eq!(bundle.missing, ["vmware.log", "tether.debug"]);
    assert!(bundle.path.join("vm-info.json").is_file());

    let downloads = log.by_subcommand("datastore.download");
    assert_eq!(downloads.len(), 2);
    assert_eq!(downloads[0].args[1..4], ["-ds", "datastore1", "vch-42/vmware.log"]);
}

#[tokio::test]
async fn collect_without_log_location_saves_vm_info_only() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (platform, log) = platform_in(
        RecordingRunner::default().respond("vm.info", ok_output(VM_INFO)),
        dir.path().to_path_buf(),
    );

    let bundle = platform
        .collect(&session(), &handle(), None, &CancellationToken::new())
        .await
        .expect("collect");

    assert_eq!(bundle.files, ["vm-info.json"]);
    assert!(bundle.missing.is_empty());
    assert!(log.by_subcommand("datastore.download").is_empty());
}
