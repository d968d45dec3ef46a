//! Integration tests for the install orchestrator and batch installer.
//!
//! Collaborators are in-memory fakes that record every call, so the tests
//! check exactly which external steps an install would run.

#![allow(clippy::unwrap_used, clippy::panic)]

use fwcat::install::{
    BatchInstaller, InstallOutcome, InstallRequest, Orchestrator, PackageBackend, PackageManager,
    RegistryBackend, RuntimeProvisioner, SetupMode, StepError, VersionControl,
};
use fwcat_core::{
    CatalogError, DefinitionFormat, ErrorKind, ResolvedCatalog, ResolvedFrameworkDefinition,
    Resolver, store_from_str,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const CATALOG: &str = r#"
[_base]
abstract = true
project = "https://github.com/example/base"

[flaml]
extends = "_base"
version = "c66f8d"
module = "flaml"
project = "https://github.com/microsoft/FLAML"

[autosklearn]
version = "0.15.0"
module = "autosklearn"

[tpot]
version = "stable"
module = "tpot"

[nosource]
version = "master"
module = "nosource"

[broken]
version = "stable"
module = "broken"

[mlj]
ecosystem = "registry"
module = "MLJ"
"#;

const REPORTED_REGISTRY_VERSION: &str = "16.2.0+511cc1082bef7a4bbb2f83ad88c1c425c932079c";

// =============================================================================
// FAKE COLLABORATORS
// =============================================================================

#[derive(Default)]
struct Calls(Mutex<Vec<String>>);

impl Calls {
    fn push(&self, call: String) {
        self.0.lock().unwrap().push(call);
    }

    fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

struct FakePackages {
    calls: Arc<Calls>,
    version: String,
    delay: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakePackages {
    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PackageManager for FakePackages {
    fn install_latest(&self, package: &str) -> Result<(), StepError> {
        self.calls.push(format!("pip latest {package}"));
        self.enter();
        if package == "broken" {
            return Err(StepError::new("pip install", "no matching distribution"));
        }
        Ok(())
    }

    fn install_pinned(&self, package: &str, version: &str) -> Result<(), StepError> {
        self.calls.push(format!("pip pinned {package}=={version}"));
        self.enter();
        Ok(())
    }

    fn install_editable(&self, path: &Path) -> Result<(), StepError> {
        self.calls.push(format!("pip editable {}", path.display()));
        Ok(())
    }

    fn installed_version(&self, module: &str) -> Result<String, StepError> {
        self.calls.push(format!("pip version {module}"));
        Ok(format!("{}\n", self.version))
    }
}

/// Fails like git does when the destination already has content.
struct FakeVcs {
    calls: Arc<Calls>,
}

impl VersionControl for FakeVcs {
    fn clone_repo(
        &self,
        url: &str,
        branch: Option<&str>,
        dest: &Path,
        shallow: bool,
        recurse_submodules: bool,
    ) -> Result<(), StepError> {
        self.calls.push(format!(
            "git clone {url} branch={} shallow={shallow} submodules={recurse_submodules}",
            branch.unwrap_or("HEAD")
        ));
        if dest.exists() {
            return Err(StepError::new("clone", "destination path already exists"));
        }
        std::fs::create_dir_all(dest).unwrap();
        std::fs::write(dest.join("CLONED"), url).unwrap();
        Ok(())
    }

    fn checkout(&self, _dest: &Path, reference: &str) -> Result<(), StepError> {
        self.calls.push(format!("git checkout {reference}"));
        Ok(())
    }
}

struct FakeRuntime {
    calls: Arc<Calls>,
}

impl RuntimeProvisioner for FakeRuntime {
    fn install_or_update_runtime(&self, channel: &str) -> Result<(), StepError> {
        self.calls.push(format!("runtime {channel}"));
        Ok(())
    }

    fn install_or_update_tool(
        &self,
        tool: &str,
        version: &str,
        _registry_url: &str,
        _install_path: &Path,
    ) -> Result<(), StepError> {
        self.calls.push(format!("tool {tool} version={version:?}"));
        Ok(())
    }

    fn installed_tool_version(
        &self,
        tool: &str,
        _install_path: &Path,
    ) -> Result<String, StepError> {
        self.calls.push(format!("tool version {tool}"));
        Ok(REPORTED_REGISTRY_VERSION.to_string())
    }
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

struct Harness {
    dir: TempDir,
    calls: Arc<Calls>,
    packages: Arc<FakePackages>,
    orchestrator: Arc<Orchestrator>,
    catalog: ResolvedCatalog,
}

impl Harness {
    fn definition(&self, name: &str) -> ResolvedFrameworkDefinition {
        self.catalog.get(name).unwrap().clone()
    }

    fn install(&self, name: &str, request: InstallRequest) -> Result<InstallOutcome, CatalogError> {
        self.orchestrator.install(&self.definition(name), &request)
    }
}

fn harness_with(version: &str, delay: Duration) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(Calls::default());
    let packages = Arc::new(FakePackages {
        calls: Arc::clone(&calls),
        version: version.to_string(),
        delay,
        active: AtomicUsize::new(0),
        max_active: AtomicUsize::new(0),
    });
    let vcs = Arc::new(FakeVcs {
        calls: Arc::clone(&calls),
    });
    let runtime = Arc::new(FakeRuntime {
        calls: Arc::clone(&calls),
    });

    let orchestrator = Orchestrator::new(
        dir.path(),
        Arc::new(PackageBackend::new(packages.clone(), vcs, None)),
        Arc::new(RegistryBackend::new(runtime, "release", "")),
    );
    let store = store_from_str(CATALOG, DefinitionFormat::Toml).unwrap();

    Harness {
        dir,
        calls,
        packages,
        orchestrator: Arc::new(orchestrator),
        catalog: Resolver::resolve(&store).unwrap(),
    }
}

fn harness(version: &str) -> Harness {
    harness_with(version, Duration::ZERO)
}

fn installed(outcome: InstallOutcome) -> String {
    match outcome {
        InstallOutcome::Installed(record) => record.version,
        other => panic!("expected a fresh install, got {other:?}"),
    }
}

// =============================================================================
// STRATEGY EXECUTION
// =============================================================================

#[test]
fn source_ref_replaces_existing_working_tree() {
    let h = harness("2.1.0");
    let tree = h.dir.path().join("flaml").join("lib").join("flaml");
    std::fs::create_dir_all(&tree).unwrap();
    std::fs::write(tree.join("stale.py"), "old").unwrap();

    let version = installed(h.install("flaml", InstallRequest::default()).unwrap());

    assert_eq!(version, "2.1.0");
    assert!(!tree.join("stale.py").exists());
    assert!(tree.join("CLONED").is_file());
    assert_eq!(
        h.calls.all(),
        vec![
            "git clone https://github.com/microsoft/FLAML branch=HEAD shallow=true submodules=true"
                .to_string(),
            "git checkout c66f8d".to_string(),
            format!("pip editable {}", tree.display()),
            "pip version flaml".to_string(),
        ]
    );
}

#[test]
fn latest_mainline_clones_without_checkout() {
    let h = harness("2.2.0.dev0");
    let request = InstallRequest::default().with_version("latest");

    installed(h.install("flaml", request).unwrap());

    let calls = h.calls.all();
    assert!(calls[0].starts_with("git clone"));
    assert!(!calls.iter().any(|c| c.starts_with("git checkout")));
    assert!(calls.iter().any(|c| c.starts_with("pip editable")));
}

#[test]
fn repo_and_package_overrides() {
    let h = harness("2.1.0");
    let request = InstallRequest {
        repo: Some("https://example.org/fork.git".into()),
        package: Some("flaml-fork".into()),
        ..InstallRequest::default()
    };

    h.install("flaml", request).unwrap();

    let calls = h.calls.all();
    assert!(calls[0].starts_with("git clone https://example.org/fork.git"));
    assert!(calls[2].ends_with(&format!("lib{}flaml-fork", std::path::MAIN_SEPARATOR)));
    assert_eq!(calls[3], "pip version flaml");
}

#[test]
fn package_must_be_a_plain_name() {
    let h = harness("2.1.0");
    installed(h.install("flaml", InstallRequest::default()).unwrap());
    let calls_before = h.calls.all().len();
    let tree = h.dir.path().join("flaml").join("lib").join("flaml");

    for package in ["..", "../..", "lib/../.."] {
        let request = InstallRequest {
            package: Some(package.into()),
            ..InstallRequest::default()
        };
        let err = h.install("flaml", request).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidName { .. }), "{package}");
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    assert_eq!(h.calls.all().len(), calls_before);
    assert!(tree.join("CLONED").is_file());
    let history = h.orchestrator.ledger().history("flaml").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].version, "2.1.0");
}

#[test]
fn stable_and_pinned_use_the_package_manager() {
    let h = harness("0.15.0");
    installed(h.install("autosklearn", InstallRequest::default()).unwrap());
    installed(h.install("tpot", InstallRequest::default()).unwrap());

    assert_eq!(
        h.calls.all(),
        vec![
            "pip pinned autosklearn==0.15.0",
            "pip version autosklearn",
            "pip latest tpot",
            "pip version tpot",
        ]
    );
}

#[test]
fn missing_source_is_a_config_error() {
    let h = harness("1.0.0");
    let err = h.install("nosource", InstallRequest::default()).unwrap_err();

    assert!(matches!(err, CatalogError::MissingSource(ref n) if n == "nosource"));
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(h.calls.all().is_empty());
}

#[test]
fn abstract_install_fails_before_any_call() {
    let h = harness("1.0.0");
    let err = h.install("_base", InstallRequest::default()).unwrap_err();

    assert!(matches!(err, CatalogError::AbstractInstall(_)));
    assert!(h.calls.all().is_empty());
    assert!(!h.dir.path().join("_base").exists());
}

#[test]
fn failed_step_is_attributed_and_not_recorded() {
    let h = harness("1.0.0");
    let err = h.install("broken", InstallRequest::default()).unwrap_err();

    match &err {
        CatalogError::InstallExecution { name, step, .. } => {
            assert_eq!(name, "broken");
            assert_eq!(step, "pip install");
        }
        other => panic!("expected InstallExecution, got {other:?}"),
    }
    assert!(h.orchestrator.ledger().history("broken").unwrap().is_empty());
}

// =============================================================================
// REGISTRY BACKEND
// =============================================================================

#[test]
fn registry_latest_records_stripped_version() {
    let h = harness("unused");
    let version = installed(h.install("mlj", InstallRequest::default()).unwrap());

    assert_eq!(version, "16.2.0");
    assert_eq!(
        h.calls.all(),
        vec!["runtime release", "tool MLJ version=\"\"", "tool version MLJ"]
    );
    let latest = h.orchestrator.ledger().latest("mlj").unwrap().unwrap();
    assert_eq!(latest.version, "16.2.0");
}

#[test]
fn registry_pinned_passes_version() {
    let h = harness("unused");
    h.install("mlj", InstallRequest::default().with_version("0.19.5"))
        .unwrap();
    assert!(h.calls.all().contains(&"tool MLJ version=\"0.19.5\"".to_string()));
}

#[test]
fn registry_rejects_stable_and_source_refs() {
    let h = harness("unused");

    for token in ["stable", "master"] {
        let err = h
            .install("mlj", InstallRequest::default().with_version(token))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StrategyUnsupported, "{token}");
    }
    assert!(h.calls.all().is_empty());
}

// =============================================================================
// SETUP MODES
// =============================================================================

#[test]
fn auto_skips_pinned_version_already_recorded() {
    let h = harness("0.15.0");
    installed(h.install("autosklearn", InstallRequest::default()).unwrap());
    let calls_after_first = h.calls.all().len();

    let second = h.install("autosklearn", InstallRequest::default()).unwrap();
    assert!(matches!(second, InstallOutcome::AlreadyCurrent(ref r) if r.version == "0.15.0"));
    assert_eq!(h.calls.all().len(), calls_after_first);

    let forced = h
        .install("autosklearn", InstallRequest::default().with_mode(SetupMode::Force))
        .unwrap();
    installed(forced);
    assert_eq!(
        h.orchestrator.ledger().history("autosklearn").unwrap().len(),
        2
    );
}

#[test]
fn source_checkout_does_not_satisfy_a_pin() {
    let h = harness("2.1.0");
    installed(h.install("flaml", InstallRequest::default()).unwrap());
    let calls_before = h.calls.all().len();

    let pinned = h
        .install("flaml", InstallRequest::default().with_version("2.1.0"))
        .unwrap();

    assert_eq!(installed(pinned), "2.1.0");
    assert_eq!(
        h.calls.all()[calls_before..],
        ["pip pinned flaml==2.1.0", "pip version flaml"]
    );
    let latest = h.orchestrator.ledger().latest("flaml").unwrap().unwrap();
    assert_eq!(latest.strategy.as_deref(), Some("pinned-release"));
    assert_eq!(latest.package.as_deref(), Some("flaml"));
}

#[test]
fn auto_reinstalls_pin_for_another_package() {
    let h = harness("0.15.0");
    installed(h.install("autosklearn", InstallRequest::default()).unwrap());

    let request = InstallRequest {
        package: Some("auto-sklearn".into()),
        ..InstallRequest::default()
    };
    installed(h.install("autosklearn", request.clone()).unwrap());
    assert!(
        h.calls
            .all()
            .contains(&"pip pinned auto-sklearn==0.15.0".to_string())
    );

    let again = h.install("autosklearn", request).unwrap();
    assert!(matches!(again, InstallOutcome::AlreadyCurrent(_)));
}

#[test]
fn auto_reinstalls_floating_strategies() {
    let h = harness("0.12.2");
    installed(h.install("tpot", InstallRequest::default()).unwrap());
    installed(h.install("tpot", InstallRequest::default()).unwrap());
    assert_eq!(h.orchestrator.ledger().history("tpot").unwrap().len(), 2);
}

#[test]
fn skip_mode_reports_ledger_state_only() {
    let h = harness("0.15.0");
    let request = InstallRequest::default().with_mode(SetupMode::Skip);

    assert_eq!(
        h.install("autosklearn", request.clone()).unwrap(),
        InstallOutcome::Skipped(None)
    );
    assert!(h.calls.all().is_empty());

    installed(h.install("autosklearn", InstallRequest::default()).unwrap());
    let skipped = h.install("autosklearn", request).unwrap();
    assert_eq!(skipped.record().map(|r| r.version.as_str()), Some("0.15.0"));
}

// =============================================================================
// BATCH INSTALLS
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn batch_failures_are_isolated() {
    let h = harness("1.0.0");
    let installer = BatchInstaller::new(Arc::clone(&h.orchestrator), 4);

    let items = ["tpot", "broken", "_base", "autosklearn"]
        .into_iter()
        .map(|n| (h.definition(n), InstallRequest::default()))
        .collect();
    let reports = installer.install_all(items).await;

    let summary: Vec<(&str, bool)> = reports
        .iter()
        .map(|r| (r.name.as_str(), r.is_success()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("tpot", true),
            ("broken", false),
            ("_base", false),
            ("autosklearn", true),
        ]
    );
    assert_eq!(h.orchestrator.ledger().history("tpot").unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_definition_installs_serialize() {
    let h = harness_with("1.0.0", Duration::from_millis(30));
    let installer = BatchInstaller::new(Arc::clone(&h.orchestrator), 4);

    let force = InstallRequest::default().with_mode(SetupMode::Force);
    let items = (0..4)
        .map(|_| (h.definition("tpot"), force.clone()))
        .collect();
    let reports = installer.install_all(items).await;

    assert!(reports.iter().all(|r| r.is_success()));
    assert_eq!(h.packages.max_active.load(Ordering::SeqCst), 1);
    assert_eq!(h.orchestrator.ledger().history("tpot").unwrap().len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_definitions_install_in_parallel() {
    let h = harness_with("1.0.0", Duration::from_millis(100));
    let installer = BatchInstaller::new(Arc::clone(&h.orchestrator), 3);

    let items = ["tpot", "autosklearn", "broken"]
        .into_iter()
        .map(|n| (h.definition(n), InstallRequest::default()))
        .collect();
    let reports = installer.install_all(items).await;

    assert_eq!(reports.iter().filter(|r| r.is_success()).count(), 2);
    assert!(h.packages.max_active.load(Ordering::SeqCst) > 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_pinned_installs_run_once_in_auto_mode() {
    let h = harness_with("0.15.0", Duration::from_millis(10));
    let installer = BatchInstaller::new(Arc::clone(&h.orchestrator), 4);

    let items = (0..3)
        .map(|_| (h.definition("autosklearn"), InstallRequest::default()))
        .collect();
    let reports = installer.install_all(items).await;

    let fresh = reports
        .iter()
        .filter(|r| matches!(r.result, Ok(InstallOutcome::Installed(_))))
        .count();
    let current = reports
        .iter()
        .filter(|r| matches!(r.result, Ok(InstallOutcome::AlreadyCurrent(_))))
        .count();
    assert_eq!((fresh, current), (1, 2));
    assert_eq!(
        h.orchestrator.ledger().history("autosklearn").unwrap().len(),
        1
    );
}
