//! # Install Orchestrator
//!
//! Brings one resolved definition into a ready-to-run state and records
//! the concrete outcome in the ledger.
//!
//! ```text
//! ResolvedFrameworkDefinition + InstallRequest
//!        │
//!        ▼
//!   abstract guard ──▶ classify() ──▶ SetupMode ──▶ backend.supports()
//!                                                        │
//!                                                        ▼
//!                       Ledger::append ◀── strip ◀── backend.execute()
//! ```
//!
//! The orchestrator is blocking. Concurrency lives in [`batch`].

pub mod backend;
pub mod batch;

pub use backend::{PackageBackend, RegistryBackend};
pub use batch::{BatchInstaller, InstallReport, summarize};

use fwcat_core::store::validate_name;
use fwcat_core::{
    CatalogError, Ecosystem, InstallStrategy, InstallationRecord, Ledger,
    ResolvedFrameworkDefinition, canonical_module, classify, strip_build_metadata,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// COLLABORATORS
// =============================================================================

/// Failure of one external step, not yet attributed to a definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{step}: {message}")]
pub struct StepError {
    pub step: String,
    pub message: String,
}

impl StepError {
    pub fn new(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            message: message.into(),
        }
    }

    /// Attach the definition being installed.
    #[must_use]
    pub fn attribute(self, name: &str) -> CatalogError {
        CatalogError::execution(name, self.step, self.message)
    }
}

/// Package manager of the host language environment.
pub trait PackageManager: Send + Sync {
    fn install_latest(&self, package: &str) -> Result<(), StepError>;
    fn install_pinned(&self, package: &str, version: &str) -> Result<(), StepError>;
    fn install_editable(&self, path: &Path) -> Result<(), StepError>;
    /// Version string reported by the installed module, verbatim.
    fn installed_version(&self, module: &str) -> Result<String, StepError>;
}

/// Version control for source installs.
pub trait VersionControl: Send + Sync {
    /// Clone `url` into `dest`. `branch = None` means the remote's default branch.
    fn clone_repo(
        &self,
        url: &str,
        branch: Option<&str>,
        dest: &Path,
        shallow: bool,
        recurse_submodules: bool,
    ) -> Result<(), StepError>;

    fn checkout(&self, dest: &Path, reference: &str) -> Result<(), StepError>;
}

/// Managed language runtime plus its package registry.
pub trait RuntimeProvisioner: Send + Sync {
    fn install_or_update_runtime(&self, channel: &str) -> Result<(), StepError>;

    /// An empty `version` installs the registry's latest.
    fn install_or_update_tool(
        &self,
        tool: &str,
        version: &str,
        registry_url: &str,
        install_path: &Path,
    ) -> Result<(), StepError>;

    fn installed_tool_version(&self, tool: &str, install_path: &Path)
    -> Result<String, StepError>;
}

// =============================================================================
// REQUEST
// =============================================================================

/// How an install treats an existing ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SetupMode {
    /// Skip a pinned release that is already the latest recorded version.
    #[default]
    Auto,
    /// Always execute.
    Force,
    /// Never install; report the ledger state.
    Skip,
}

/// Per-invocation overrides. `None` falls back to the resolved definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallRequest {
    /// Version token replacing the definition's `version`.
    pub version: Option<String>,
    /// Source location replacing the definition's `project`.
    pub repo: Option<String>,
    /// Package name replacing the definition's `module`. Must be a single
    /// path component, since it names the working tree.
    pub package: Option<String>,
    pub mode: SetupMode,
}

impl InstallRequest {
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: SetupMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Everything a backend needs about one install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    pub name: String,
    pub package: String,
    pub module: String,
    pub source: Option<String>,
    /// `<work_root>/<name>`
    pub setup_dir: PathBuf,
}

impl InstallTarget {
    /// Where source installs are cloned: `<work_root>/<name>/lib/<package>`.
    #[must_use]
    pub fn working_tree(&self) -> PathBuf {
        self.setup_dir.join("lib").join(&self.package)
    }

    /// Source location, or a ConfigError when none is known.
    pub fn require_source(&self) -> Result<&str, CatalogError> {
        self.source
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| CatalogError::MissingSource(self.name.clone()))
    }
}

// =============================================================================
// OUTCOME
// =============================================================================

/// What an install request ended up doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "record", rename_all = "snake_case")]
pub enum InstallOutcome {
    /// Freshly installed and recorded.
    Installed(InstallationRecord),
    /// The pinned version was already the latest record.
    AlreadyCurrent(InstallationRecord),
    /// Skip mode: nothing ran.
    Skipped(Option<InstallationRecord>),
}

impl InstallOutcome {
    #[must_use]
    pub fn record(&self) -> Option<&InstallationRecord> {
        match self {
            Self::Installed(r) | Self::AlreadyCurrent(r) => Some(r),
            Self::Skipped(r) => r.as_ref(),
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Installed(_) => "installed",
            Self::AlreadyCurrent(_) => "up-to-date",
            Self::Skipped(_) => "skipped",
        }
    }
}

// =============================================================================
// BACKEND SEAM
// =============================================================================

/// One installer family. Each backend matches the strategies it knows.
pub trait InstallBackend: Send + Sync {
    /// Name used in StrategyUnsupported errors and logs.
    fn name(&self) -> &'static str;

    fn supports(&self, strategy: &InstallStrategy) -> bool;

    fn execute(&self, target: &InstallTarget, strategy: &InstallStrategy)
    -> Result<(), CatalogError>;

    /// Version reported by the installed tool, build metadata included.
    fn installed_version(&self, target: &InstallTarget) -> Result<String, CatalogError>;
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

/// Runs installs against the backend selected by each definition's ecosystem.
pub struct Orchestrator {
    package: Arc<dyn InstallBackend>,
    registry: Arc<dyn InstallBackend>,
    ledger: Ledger,
    work_root: PathBuf,
}

impl Orchestrator {
    /// The ledger lives under `work_root`, next to the working trees.
    pub fn new(
        work_root: impl Into<PathBuf>,
        package: Arc<dyn InstallBackend>,
        registry: Arc<dyn InstallBackend>,
    ) -> Self {
        let work_root = work_root.into();
        Self {
            package,
            registry,
            ledger: Ledger::new(work_root.clone()),
            work_root,
        }
    }

    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[must_use]
    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    fn backend_for(&self, ecosystem: Ecosystem) -> &dyn InstallBackend {
        match ecosystem {
            Ecosystem::Package => self.package.as_ref(),
            Ecosystem::Registry => self.registry.as_ref(),
        }
    }

    /// Build the backend inputs for one definition and request.
    ///
    /// The package becomes a directory under `<work_root>/<name>/lib`, so
    /// anything that is not a plain name is rejected here, before a backend
    /// can remove or clone anything.
    pub fn target_for(
        &self,
        definition: &ResolvedFrameworkDefinition,
        request: &InstallRequest,
    ) -> Result<InstallTarget, CatalogError> {
        let package = request
            .package
            .clone()
            .unwrap_or_else(|| default_package(definition));
        validate_name(&definition.name)?;
        validate_name(&package)?;

        Ok(InstallTarget {
            name: definition.name.clone(),
            package,
            module: definition.module.clone(),
            source: request.repo.clone().or_else(|| definition.project.clone()),
            setup_dir: self.work_root.join(&definition.name),
        })
    }

    /// Install one definition.
    ///
    /// Callers must not run two installs of the same definition at once;
    /// [`BatchInstaller`] enforces that.
    pub fn install(
        &self,
        definition: &ResolvedFrameworkDefinition,
        request: &InstallRequest,
    ) -> Result<InstallOutcome, CatalogError> {
        let name = definition.name.as_str();

        if definition.is_abstract {
            return Err(CatalogError::AbstractInstall(name.to_string()));
        }

        let token = request.version.as_deref().unwrap_or(&definition.version);
        let strategy = classify(token);
        let backend = self.backend_for(definition.ecosystem);

        tracing::debug!(
            framework = name,
            strategy = %strategy,
            backend = backend.name(),
            mode = ?request.mode,
            "Classified install"
        );

        let target = self.target_for(definition, request)?;

        if request.mode == SetupMode::Skip {
            tracing::info!(framework = name, "Setup skipped");
            return Ok(InstallOutcome::Skipped(self.ledger.latest(name)?));
        }

        if !backend.supports(&strategy) {
            return Err(CatalogError::StrategyUnsupported {
                name: name.to_string(),
                strategy: strategy.to_string(),
                installer: backend.name().to_string(),
            });
        }

        if request.mode == SetupMode::Auto
            && !strategy.is_floating()
            && let Some(latest) = self.ledger.latest(name)?
            && latest.realizes(&strategy, &target.package)
        {
            tracing::info!(
                framework = name,
                version = %latest.version,
                "Pinned version already installed"
            );
            return Ok(InstallOutcome::AlreadyCurrent(latest));
        }

        tracing::info!(
            framework = name,
            strategy = %strategy,
            package = %target.package,
            "Installing"
        );
        backend.execute(&target, &strategy)?;

        let reported = backend.installed_version(&target)?;
        let version = strip_build_metadata(&reported);
        if version.is_empty() {
            return Err(CatalogError::execution(
                name,
                "version",
                format!("installed tool reported no version ({:?})", reported),
            ));
        }

        let record = self.ledger.append_record(
            name,
            InstallationRecord::now(version).with_origin(&strategy, &target.package),
        )?;
        tracing::info!(framework = name, version = %record.version, "Installed");
        Ok(InstallOutcome::Installed(record))
    }
}

/// Package installed when the request names none.
///
/// Registry package names are case-sensitive, so a registry definition that
/// kept the canonical (lower-cased) module installs its chain root's name.
fn default_package(definition: &ResolvedFrameworkDefinition) -> String {
    let root = definition
        .ancestors
        .first()
        .unwrap_or(&definition.name);
    if definition.ecosystem == Ecosystem::Registry && definition.module == canonical_module(root) {
        root.clone()
    } else {
        definition.module.clone()
    }
}

// =============================================================================
// TESTS
// =============================================================================
