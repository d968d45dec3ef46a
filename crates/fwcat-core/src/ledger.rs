//! # Installation Ledger
//!
//! Durable, append-only record of what was actually installed.
//!
//! Format: one text file per definition at
//! `<root>/<name>/.setup/installed`, one line per successful install:
//!
//! ```text
//! 16.2.0\t2026-03-01T12:00:00Z\tpinned-release\tMLJ
//! ```
//!
//! The last two fields name the strategy and package that produced the
//! install. Lines are only ever appended. A line holding just a version (the
//! format written by older setup scripts) reads back with the Unix epoch as
//! its timestamp and no origin. A missing file means "never successfully
//! installed".
//!
//! Appends for different definitions touch different files and need no
//! coordination. Callers must serialize installs of the SAME definition.

use crate::primitives::{
    BUILD_METADATA_SEPARATOR, LEDGER_FIELD_SEPARATOR, LEDGER_FILE, SETUP_DIR,
};
use crate::store::validate_name;
use crate::{CatalogError, InstallStrategy};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

// =============================================================================
// RECORD
// =============================================================================

/// One realized install outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationRecord {
    /// Concrete version as reported by the installed tool, build metadata stripped.
    pub version: String,
    /// When the install completed.
    pub installed_at: DateTime<Utc>,
    /// Label of the strategy that ran. Absent on legacy lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    /// Package that was installed. Absent on legacy lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

impl InstallationRecord {
    #[must_use]
    pub fn new(version: impl Into<String>, installed_at: DateTime<Utc>) -> Self {
        Self {
            version: version.into(),
            installed_at,
            strategy: None,
            package: None,
        }
    }

    /// A record stamped with the current time.
    #[must_use]
    pub fn now(version: impl Into<String>) -> Self {
        Self::new(version, Utc::now())
    }

    #[must_use]
    pub fn with_origin(mut self, strategy: &InstallStrategy, package: impl Into<String>) -> Self {
        self.strategy = Some(strategy.label().to_string());
        self.package = Some(package.into());
        self
    }

    /// Whether this record is the outcome of running `strategy` for `package`
    /// and landed on the version the strategy asked for.
    #[must_use]
    pub fn realizes(&self, strategy: &InstallStrategy, package: &str) -> bool {
        self.strategy.as_deref() == Some(strategy.label())
            && self.package.as_deref() == Some(package)
            && strategy.target() == Some(self.version.as_str())
    }

    /// Render as one ledger line (without the trailing newline).
    #[must_use]
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "{}{}{}",
            self.version,
            LEDGER_FIELD_SEPARATOR,
            self.installed_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        if let (Some(strategy), Some(package)) = (&self.strategy, &self.package) {
            line.push(LEDGER_FIELD_SEPARATOR);
            line.push_str(strategy);
            line.push(LEDGER_FIELD_SEPARATOR);
            line.push_str(package);
        }
        line
    }

    /// Parse one ledger line. Blank lines yield `None`.
    pub fn parse_line(line: &str) -> Result<Option<Self>, CatalogError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let mut fields = line.splitn(4, LEDGER_FIELD_SEPARATOR).map(str::trim);
        let version = fields.next().unwrap_or_default();
        let stamp = fields.next();
        let strategy = fields.next().filter(|f| !f.is_empty());
        let package = fields.next().filter(|f| !f.is_empty());

        let installed_at = match stamp {
            Some(stamp) => DateTime::parse_from_rfc3339(stamp)
                .map_err(|e| {
                    CatalogError::SerializationError(format!(
                        "Bad ledger timestamp '{}': {}",
                        stamp, e
                    ))
                })?
                .with_timezone(&Utc),
            None => DateTime::<Utc>::UNIX_EPOCH,
        };

        let mut record = Self::new(version, installed_at);
        if let (Some(strategy), Some(package)) = (strategy, package) {
            record.strategy = Some(strategy.to_string());
            record.package = Some(package.to_string());
        }
        Ok(Some(record))
    }
}

/// Strip build metadata: everything from the first `+` on, then trim.
///
/// `16.2.0+511cc1082bef7a4bbb2f83ad88c1c425c932079c` becomes `16.2.0`.
#[must_use]
pub fn strip_build_metadata(reported: &str) -> &str {
    let reported = reported.trim();
    match reported.split_once(BUILD_METADATA_SEPARATOR) {
        Some((version, _)) => version.trim(),
        None => reported,
    }
}

// =============================================================================
// LEDGER
// =============================================================================

/// File-backed ledger rooted at a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    root: PathBuf,
}

impl Ledger {
    /// Create a ledger rooted at `root`. Nothing is touched on disk until
    /// the first append.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of one definition's ledger file.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, CatalogError> {
        validate_name(name)?;
        Ok(self.root.join(name).join(SETUP_DIR).join(LEDGER_FILE))
    }

    /// Append a record stamped with the current time.
    pub fn append(&self, name: &str, version: &str) -> Result<InstallationRecord, CatalogError> {
        self.append_record(name, InstallationRecord::now(version))
    }

    /// Append a prepared record.
    pub fn append_record(
        &self,
        name: &str,
        record: InstallationRecord,
    ) -> Result<InstallationRecord, CatalogError> {
        if record.version.is_empty() {
            return Err(CatalogError::SerializationError(format!(
                "Refusing to record an empty version for '{}'",
                name
            )));
        }
        let fields = [Some(&record.version), record.strategy.as_ref(), record.package.as_ref()];
        if let Some(field) = fields
            .into_iter()
            .flatten()
            .find(|f| f.contains([LEDGER_FIELD_SEPARATOR, '\n', '\r']))
        {
            return Err(CatalogError::SerializationError(format!(
                "Ledger field '{}' for '{}' contains a tab or newline",
                field.escape_debug(),
                name
            )));
        }

        let path = self.path_for(name)?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| {
                CatalogError::IoError(format!("Cannot create '{}': {}", dir.display(), e))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                CatalogError::IoError(format!("Cannot open '{}': {}", path.display(), e))
            })?;
        writeln!(file, "{}", record.to_line()).map_err(|e| {
            CatalogError::IoError(format!("Cannot append to '{}': {}", path.display(), e))
        })?;

        Ok(record)
    }

    /// Every record for a definition, oldest first.
    pub fn history(&self, name: &str) -> Result<Vec<InstallationRecord>, CatalogError> {
        let path = self.path_for(name)?;
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CatalogError::IoError(format!(
                    "Cannot read '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        let mut records = Vec::new();
        for line in text.lines() {
            if let Some(record) = InstallationRecord::parse_line(line)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// The most recent record, if any.
    pub fn latest(&self, name: &str) -> Result<Option<InstallationRecord>, CatalogError> {
        Ok(self.history(name)?.pop())
    }
}

// =============================================================================
// TESTS
// =============================================================================
