//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::Cli;
use crate::config::Config;
use crate::exec::{GitVcs, JuliaupProvisioner, PipPackageManager};
use crate::install::{
    BatchInstaller, InstallReport, InstallRequest, Orchestrator, PackageBackend, RegistryBackend,
    SetupMode, summarize,
};
use fwcat_core::{
    CatalogError, DefinitionFormat, ResolvedCatalog, ResolvedFrameworkDefinition, Resolver,
    classify, flatten_catalog, load_layered, store_to_string,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// CONTEXT
// =============================================================================

/// Global flags, loaded lazily by the commands that need them.
#[derive(Debug, Clone)]
pub struct Context {
    pub definitions: Vec<PathBuf>,
    pub config: Option<PathBuf>,
    pub work_root: Option<PathBuf>,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            definitions: cli.definitions.clone(),
            config: cli.config.clone(),
            work_root: cli.work_root.clone(),
        }
    }

    /// Load and resolve every definition file.
    pub fn catalog(&self) -> Result<ResolvedCatalog, CatalogError> {
        let store = load_layered(&self.definitions)?;
        let catalog = Resolver::resolve(&store)?;
        tracing::debug!(
            files = self.definitions.len(),
            definitions = catalog.len(),
            "Catalog resolved"
        );
        Ok(catalog)
    }

    /// Config with every layer applied.
    pub fn config(&self, jobs: Option<usize>) -> Result<Config, CatalogError> {
        Ok(Config::load(self.config.as_deref())?
            .with_env(|key| std::env::var(key).ok())
            .with_overrides(self.work_root.clone(), jobs))
    }
}

/// Wire the process-backed collaborators into an installer.
pub fn build_installer(config: &Config) -> BatchInstaller {
    let packages = Arc::new(PipPackageManager::new(&config.python));
    let vcs = Arc::new(GitVcs::new(&config.git));
    let provisioner = Arc::new(JuliaupProvisioner::new(
        &config.registry.runtime,
        &config.registry.julia,
    ));

    let orchestrator = Orchestrator::new(
        &config.work_root,
        Arc::new(PackageBackend::new(
            packages,
            vcs,
            config.default_branch.clone(),
        )),
        Arc::new(RegistryBackend::new(
            provisioner,
            &config.registry.channel,
            &config.registry.url,
        )),
    );
    BatchInstaller::new(Arc::new(orchestrator), config.jobs)
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// LIST COMMAND
// =============================================================================

/// List definitions in name order.
pub fn cmd_list(context: &Context, json_mode: bool, all: bool) -> Result<(), CatalogError> {
    let catalog = context.catalog()?;
    let entries: Vec<&ResolvedFrameworkDefinition> = catalog
        .iter()
        .filter(|d| all || !d.is_abstract)
        .collect();

    if json_mode {
        let output: Vec<_> = entries
            .iter()
            .map(|d| {
                serde_json::json!({
                    "name": d.name,
                    "version": d.version,
                    "strategy": d.strategy().to_string(),
                    "ecosystem": d.ecosystem,
                    "abstract": d.is_abstract,
                })
            })
            .collect();
        print_json(&serde_json::Value::Array(output));
        return Ok(());
    }

    for d in entries {
        let marker = if d.is_abstract { " (abstract)" } else { "" };
        println!(
            "{:<32} {:<16} {}{}",
            d.name,
            if d.version.is_empty() { "-" } else { d.version.as_str() },
            d.strategy(),
            marker
        );
    }
    Ok(())
}

// =============================================================================
// SHOW COMMAND
// =============================================================================

/// Show one resolved definition.
pub fn cmd_show(context: &Context, json_mode: bool, name: &str) -> Result<(), CatalogError> {
    let catalog = context.catalog()?;
    let definition = catalog.lookup(name)?;

    if json_mode {
        let value = serde_json::to_value(definition)
            .map_err(|e| CatalogError::SerializationError(e.to_string()))?;
        print_json(&value);
        return Ok(());
    }

    println!("{}", definition.name);
    println!("{}", "=".repeat(definition.name.len()));
    println!("Version:     {}", definition.version);
    println!("Strategy:    {}", definition.strategy());
    println!("Ecosystem:   {}", definition.ecosystem);
    println!("Module:      {}", definition.module);
    println!("Image:       {}", definition.image.reference());
    if let Some(project) = &definition.project {
        println!("Project:     {}", project);
    }
    if let Some(description) = &definition.description {
        println!("Description: {}", description);
    }
    if !definition.setup_args.is_empty() {
        println!("Setup args:  {}", definition.setup_args);
    }
    if !definition.ancestors.is_empty() {
        println!("Extends:     {}", definition.ancestors.join(" -> "));
    }
    if definition.is_abstract {
        println!("Abstract:    yes");
    }
    if !definition.params.is_empty() {
        println!("Params:");
        for (key, value) in &definition.params {
            println!("  {} = {}", key, value);
        }
    }
    Ok(())
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Resolve the catalog; any error aborts with that error.
pub fn cmd_check(context: &Context, json_mode: bool) -> Result<(), CatalogError> {
    let catalog = context.catalog()?;
    let concrete = catalog.concrete().count();

    if json_mode {
        print_json(&serde_json::json!({
            "ok": true,
            "definitions": catalog.len(),
            "concrete": concrete,
            "abstract": catalog.len() - concrete,
        }));
    } else {
        println!(
            "OK: {} definitions ({} concrete, {} abstract)",
            catalog.len(),
            concrete,
            catalog.len() - concrete
        );
    }
    Ok(())
}

// =============================================================================
// CLASSIFY COMMAND
// =============================================================================

pub fn cmd_classify(json_mode: bool, token: &str) -> Result<(), CatalogError> {
    let strategy = classify(token);
    if json_mode {
        print_json(&serde_json::json!({
            "token": token,
            "strategy": strategy.label(),
            "target": strategy.target(),
        }));
    } else {
        println!("{}", strategy);
    }
    Ok(())
}

// =============================================================================
// SETUP / INSTALL COMMANDS
// =============================================================================

/// Install one framework.
pub async fn cmd_setup(
    context: &Context,
    json_mode: bool,
    name: &str,
    request: InstallRequest,
) -> Result<(), CatalogError> {
    let catalog = context.catalog()?;
    let definition = catalog.installable(name)?.clone();
    let installer = build_installer(&context.config(None)?);

    let report = installer.install(definition, request).await;
    print_reports(json_mode, std::slice::from_ref(&report));
    report.result.map(|_| ())
}

/// Install many frameworks. Fails if any install failed.
pub async fn cmd_install(
    context: &Context,
    json_mode: bool,
    names: &[String],
    version: Option<String>,
    mode: SetupMode,
    jobs: Option<usize>,
) -> Result<(), CatalogError> {
    let catalog = context.catalog()?;
    let definitions = select_installable(&catalog, names)?;
    let config = context.config(jobs)?;
    let installer = build_installer(&config);

    tracing::info!(
        count = definitions.len(),
        jobs = config.jobs,
        "Starting batch install"
    );

    let request = InstallRequest {
        version,
        mode,
        ..InstallRequest::default()
    };
    let items = definitions
        .into_iter()
        .map(|d| (d.clone(), request.clone()))
        .collect();

    let reports = installer.install_all(items).await;
    print_reports(json_mode, &reports);

    let failed: Vec<&str> = reports
        .iter()
        .filter(|r| !r.is_success())
        .map(|r| r.name.as_str())
        .collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(CatalogError::execution(
            failed.join(", "),
            "batch",
            format!("{} of {} installs failed", failed.len(), reports.len()),
        ))
    }
}

/// Named definitions, or every concrete one.
fn select<'a>(
    catalog: &'a ResolvedCatalog,
    names: &[String],
) -> Result<Vec<&'a ResolvedFrameworkDefinition>, CatalogError> {
    if names.is_empty() {
        return Ok(catalog.concrete().collect());
    }
    names.iter().map(|n| catalog.lookup(n)).collect()
}

/// Like [`select`], but an abstract name fails before anything is scheduled.
fn select_installable<'a>(
    catalog: &'a ResolvedCatalog,
    names: &[String],
) -> Result<Vec<&'a ResolvedFrameworkDefinition>, CatalogError> {
    if names.is_empty() {
        return Ok(catalog.concrete().collect());
    }
    names.iter().map(|n| catalog.installable(n)).collect()
}

fn print_reports(json_mode: bool, reports: &[InstallReport]) {
    if json_mode {
        print_json(&serde_json::json!({
            "results": reports.iter().map(InstallReport::to_json).collect::<Vec<_>>(),
            "summary": summarize(reports),
        }));
        return;
    }

    for report in reports {
        match &report.result {
            Ok(outcome) => {
                let version = outcome
                    .record()
                    .map(|r| r.version.as_str())
                    .unwrap_or("-");
                println!("{:<32} {:<12} {}", report.name, outcome.label(), version);
            }
            Err(e) => println!("{:<32} {:<12} {}", report.name, "FAILED", e),
        }
    }
}

// =============================================================================
// STATUS / HISTORY COMMANDS
// =============================================================================

/// Latest ledger record per framework.
pub fn cmd_status(context: &Context, json_mode: bool, names: &[String]) -> Result<(), CatalogError> {
    let catalog = context.catalog()?;
    let ledger = fwcat_core::Ledger::new(context.config(None)?.work_root);

    let mut rows = Vec::new();
    for definition in select(&catalog, names)? {
        rows.push((definition, ledger.latest(&definition.name)?));
    }

    if json_mode {
        let output: Vec<_> = rows
            .iter()
            .map(|(d, latest)| {
                serde_json::json!({
                    "name": d.name,
                    "requested": d.version,
                    "installed": latest,
                })
            })
            .collect();
        print_json(&serde_json::Value::Array(output));
        return Ok(());
    }

    for (definition, latest) in rows {
        match latest {
            Some(record) => println!(
                "{:<32} {:<16} {}",
                definition.name,
                record.version,
                record.installed_at.to_rfc3339()
            ),
            None => println!("{:<32} {:<16}", definition.name, "not installed"),
        }
    }
    Ok(())
}

/// Every ledger record of one framework, oldest first.
pub fn cmd_history(context: &Context, json_mode: bool, name: &str) -> Result<(), CatalogError> {
    let catalog = context.catalog()?;
    let definition = catalog.lookup(name)?;
    let ledger = fwcat_core::Ledger::new(context.config(None)?.work_root);
    let history = ledger.history(&definition.name)?;

    if json_mode {
        let value = serde_json::to_value(&history)
            .map_err(|e| CatalogError::SerializationError(e.to_string()))?;
        print_json(&value);
        return Ok(());
    }

    if history.is_empty() {
        println!("{}: never installed", definition.name);
    }
    for record in history {
        println!("{}  {}", record.installed_at.to_rfc3339(), record.version);
    }
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Write the flattened catalog; format follows the output extension.
pub fn cmd_export(context: &Context, output: &Path) -> Result<(), CatalogError> {
    let catalog = context.catalog()?;
    let format = DefinitionFormat::from_path(output)?;
    let text = store_to_string(&flatten_catalog(&catalog)?, format)?;

    std::fs::write(output, text).map_err(|e| {
        CatalogError::IoError(format!("Cannot write '{}': {}", output.display(), e))
    })?;

    tracing::info!(
        path = %output.display(),
        definitions = catalog.len(),
        "Exported resolved catalog"
    );
    Ok(())
}
