//! Installer backends: one per ecosystem.
//!
//! | Strategy         | Package backend                  | Registry backend        |
//! |------------------|----------------------------------|-------------------------|
//! | StableRelease    | `install_latest`                 | unsupported             |
//! | PinnedRelease(v) | `install_pinned(v)`              | tool at `v`             |
//! | SourceRef(r)     | clone, checkout `r`, editable    | unsupported             |
//! | LatestMainline   | clone default branch, editable   | tool at registry latest |

use super::{
    InstallBackend, InstallTarget, PackageManager, RuntimeProvisioner, StepError, VersionControl,
};
use fwcat_core::{CatalogError, InstallStrategy};
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// PACKAGE BACKEND
// =============================================================================

/// Package manager plus version control.
pub struct PackageBackend {
    packages: Arc<dyn PackageManager>,
    vcs: Arc<dyn VersionControl>,
    default_branch: Option<String>,
}

impl PackageBackend {
    /// `default_branch = None` clones whatever the remote's HEAD points at.
    pub fn new(
        packages: Arc<dyn PackageManager>,
        vcs: Arc<dyn VersionControl>,
        default_branch: Option<String>,
    ) -> Self {
        Self {
            packages,
            vcs,
            default_branch,
        }
    }

    /// Fresh clone into the working tree, optional checkout, editable install.
    ///
    /// A leftover tree from an earlier or interrupted run is always removed
    /// first, so a ref never lands on top of stale files.
    fn install_from_source(
        &self,
        target: &InstallTarget,
        reference: Option<&str>,
    ) -> Result<(), CatalogError> {
        let url = target.require_source()?;
        let tree = target.working_tree();

        remove_existing(&tree)?;
        if let Some(parent) = tree.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CatalogError::IoError(format!("Cannot create '{}': {}", parent.display(), e))
            })?;
        }

        tracing::debug!(framework = %target.name, url, tree = %tree.display(), "Cloning");
        self.vcs
            .clone_repo(url, self.default_branch.as_deref(), &tree, true, true)
            .map_err(|e| e.attribute(&target.name))?;

        if let Some(reference) = reference {
            tracing::debug!(framework = %target.name, reference, "Checking out");
            self.vcs
                .checkout(&tree, reference)
                .map_err(|e| e.attribute(&target.name))?;
        }

        self.packages
            .install_editable(&tree)
            .map_err(|e| e.attribute(&target.name))
    }
}

impl InstallBackend for PackageBackend {
    fn name(&self) -> &'static str {
        "package"
    }

    fn supports(&self, _strategy: &InstallStrategy) -> bool {
        true
    }

    fn execute(
        &self,
        target: &InstallTarget,
        strategy: &InstallStrategy,
    ) -> Result<(), CatalogError> {
        let attribute = |e: StepError| e.attribute(&target.name);
        match strategy {
            InstallStrategy::StableRelease => {
                self.packages.install_latest(&target.package).map_err(attribute)
            }
            InstallStrategy::PinnedRelease(version) => self
                .packages
                .install_pinned(&target.package, version)
                .map_err(attribute),
            InstallStrategy::SourceRef(reference) => {
                self.install_from_source(target, Some(reference))
            }
            InstallStrategy::LatestMainline => self.install_from_source(target, None),
        }
    }

    fn installed_version(&self, target: &InstallTarget) -> Result<String, CatalogError> {
        self.packages
            .installed_version(&target.module)
            .map_err(|e| e.attribute(&target.name))
    }
}

fn remove_existing(path: &Path) -> Result<(), CatalogError> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(CatalogError::IoError(format!(
                "Cannot inspect '{}': {}",
                path.display(),
                e
            )));
        }
    };

    tracing::debug!(path = %path.display(), "Removing previous working tree");
    let removed = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    removed.map_err(|e| CatalogError::IoError(format!("Cannot remove '{}': {}", path.display(), e)))
}

// =============================================================================
// REGISTRY BACKEND
// =============================================================================

/// Managed runtime plus its package registry.
pub struct RegistryBackend {
    provisioner: Arc<dyn RuntimeProvisioner>,
    channel: String,
    registry_url: String,
}

impl RegistryBackend {
    pub fn new(
        provisioner: Arc<dyn RuntimeProvisioner>,
        channel: impl Into<String>,
        registry_url: impl Into<String>,
    ) -> Self {
        Self {
            provisioner,
            channel: channel.into(),
            registry_url: registry_url.into(),
        }
    }

    fn install_path(target: &InstallTarget) -> std::path::PathBuf {
        target.setup_dir.join("lib")
    }
}

impl InstallBackend for RegistryBackend {
    fn name(&self) -> &'static str {
        "registry"
    }

    fn supports(&self, strategy: &InstallStrategy) -> bool {
        matches!(
            strategy,
            InstallStrategy::LatestMainline | InstallStrategy::PinnedRelease(_)
        )
    }

    fn execute(
        &self,
        target: &InstallTarget,
        strategy: &InstallStrategy,
    ) -> Result<(), CatalogError> {
        let version = match strategy {
            InstallStrategy::LatestMainline => "",
            InstallStrategy::PinnedRelease(version) => version.as_str(),
            InstallStrategy::StableRelease | InstallStrategy::SourceRef(_) => {
                return Err(CatalogError::StrategyUnsupported {
                    name: target.name.clone(),
                    strategy: strategy.to_string(),
                    installer: self.name().to_string(),
                });
            }
        };

        let install_path = Self::install_path(target);
        std::fs::create_dir_all(&install_path).map_err(|e| {
            CatalogError::IoError(format!("Cannot create '{}': {}", install_path.display(), e))
        })?;

        self.provisioner
            .install_or_update_runtime(&self.channel)
            .map_err(|e| e.attribute(&target.name))?;
        self.provisioner
            .install_or_update_tool(&target.package, version, &self.registry_url, &install_path)
            .map_err(|e| e.attribute(&target.name))
    }

    fn installed_version(&self, target: &InstallTarget) -> Result<String, CatalogError> {
        self.provisioner
            .installed_tool_version(&target.package, &Self::install_path(target))
            .map_err(|e| e.attribute(&target.name))
    }
}
