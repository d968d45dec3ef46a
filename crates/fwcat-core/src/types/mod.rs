//! # Core Type Definitions
//!
//! This module contains all core types for the fwcat catalog engine:
//! - Authored definitions (`FrameworkDefinition`, `ImageSpec`, `Ecosystem`)
//! - Resolved definitions (`ResolvedFrameworkDefinition`, `ResolvedImage`)
//! - Error types (`CatalogError`, `ErrorKind`)
//!
//! ## Determinism Guarantees
//!
//! All maps in this module are `BTreeMap`, so serialized and iterated output is
//! ordered by key regardless of the order the source document used.

use crate::primitives::DEFAULT_IMAGE_TAG;
use crate::strategy::{InstallStrategy, classify};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Opaque parameter mapping passed through to downstream consumers.
pub type Params = BTreeMap<String, serde_json::Value>;

// =============================================================================
// ECOSYSTEM
// =============================================================================

/// Which installer backend serves a definition.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    /// A general package manager plus version control (pip + git).
    #[default]
    Package,
    /// A managed runtime with its own tool registry (juliaup + Pkg).
    Registry,
}

impl Ecosystem {
    /// Stable lowercase label, identical to the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::Registry => "registry",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// AUTHORED DEFINITIONS
// =============================================================================

/// Container image coordinates as authored. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ImageSpec {
    /// Field-wise override: `self` wins wherever it is set.
    #[must_use]
    pub fn over(&self, parent: &Self) -> Self {
        Self {
            author: self.author.clone().or_else(|| parent.author.clone()),
            image: self.image.clone().or_else(|| parent.image.clone()),
            tag: self.tag.clone().or_else(|| parent.tag.clone()),
        }
    }

    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.author.is_none() && self.image.is_none() && self.tag.is_none()
    }
}

/// A framework definition exactly as authored in a definition document.
///
/// The `name` is taken from the document key and never read from the body.
/// Every other field is optional; the resolver fills the gaps from the
/// `extends` chain and then from computed defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameworkDefinition {
    #[serde(skip)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_args: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: Params,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(rename = "abstract", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_abstract: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecosystem: Option<Ecosystem>,
}

impl FrameworkDefinition {
    /// Create an empty definition with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder: set `extends`.
    #[must_use]
    pub fn extending(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    /// Builder: set `version`.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Builder: insert one `params` entry.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Builder: mark as abstract.
    #[must_use]
    pub fn as_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }
}

// =============================================================================
// RESOLVED DEFINITIONS
// =============================================================================

/// Fully populated image coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedImage {
    pub author: String,
    pub image: String,
    pub tag: String,
}

impl ResolvedImage {
    /// `author/image:tag`, with the tag mapped onto the docker tag alphabet.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("{}/{}:{}", self.author, self.image, self.docker_tag())
    }

    /// `tag` restricted to `[A-Za-z0-9_.-]`; an empty tag becomes `latest`.
    #[must_use]
    pub fn docker_tag(&self) -> String {
        let tag = self.tag.trim();
        if tag.is_empty() {
            return DEFAULT_IMAGE_TAG.to_string();
        }
        tag.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

/// A definition after inheritance and defaulting.
///
/// `ancestors` records the flattened `extends` chain, root first. It is
/// provenance only: a resolved definition carries no parent reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFrameworkDefinition {
    pub name: String,
    pub version: String,
    pub module: String,
    pub setup_args: String,
    pub params: Params,
    pub project: Option<String>,
    pub refs: Vec<String>,
    pub description: Option<String>,
    pub image: ResolvedImage,
    pub ecosystem: Ecosystem,
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    pub ancestors: Vec<String>,
}

impl ResolvedFrameworkDefinition {
    /// Classify this definition's version into an install strategy.
    #[must_use]
    pub fn strategy(&self) -> InstallStrategy {
        classify(&self.version)
    }

    /// Turn the resolved form back into an authored definition where every
    /// field is explicit and `extends` is gone.
    ///
    /// Resolving the result on its own yields `self` again (minus `ancestors`,
    /// which a standalone definition does not have).
    #[must_use]
    pub fn to_definition(&self) -> FrameworkDefinition {
        FrameworkDefinition {
            name: self.name.clone(),
            version: Some(self.version.clone()),
            module: Some(self.module.clone()),
            setup_args: Some(self.setup_args.clone()),
            params: self.params.clone(),
            project: self.project.clone(),
            refs: self.refs.clone(),
            description: self.description.clone(),
            image: Some(ImageSpec {
                author: Some(self.image.author.clone()),
                image: Some(self.image.image.clone()),
                tag: Some(self.image.tag.clone()),
            }),
            extends: None,
            is_abstract: self.is_abstract,
            ecosystem: Some(self.ecosystem),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Coarse error classification, used for exit codes and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad definitions or a bad install target. Never retried.
    Config,
    /// The selected installer cannot execute the classified strategy.
    StrategyUnsupported,
    /// An external package-manager / VCS / runtime invocation failed.
    InstallExecution,
    /// Filesystem or (de)serialization failure.
    Io,
}

/// Errors that can occur in fwcat.
///
/// - No silent failures
/// - Use `Result<T, CatalogError>` for fallible operations
/// - Every variant names the definition(s) it concerns where one exists
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A definition extends a name that is not in the store.
    #[error("Definition '{child}' extends unknown definition '{parent}'")]
    MissingParent { child: String, parent: String },

    /// The extends graph contains a cycle. Holds each member once, in chain order.
    #[error("Cyclic extends chain: {}", display_cycle(.0))]
    CyclicExtends(Vec<String>),

    /// An install was requested for an abstract definition.
    #[error("Definition '{0}' is abstract and cannot be installed")]
    AbstractInstall(String),

    /// The requested name does not exist (or is ambiguous).
    #[error("Unknown framework: {0}")]
    UnknownFramework(String),

    /// A definition name cannot be used as a catalog key.
    #[error("Invalid definition name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// The same name appears twice in one document.
    #[error("Duplicate definition name: {0}")]
    DuplicateName(String),

    /// A definition document could not be parsed.
    #[error("Invalid definition document: {0}")]
    InvalidDefinition(String),

    /// A source install has no repository to clone from.
    #[error("Definition '{0}' has no source location (set `project` or pass a repository)")]
    MissingSource(String),

    /// The installer in use has no handler for the classified strategy.
    #[error("Strategy {strategy} is not supported by the {installer} installer (definition '{name}')")]
    StrategyUnsupported {
        name: String,
        strategy: String,
        installer: String,
    },

    /// An external invocation failed.
    #[error("Install of '{name}' failed at step '{step}': {message}")]
    InstallExecution {
        name: String,
        step: String,
        message: String,
    },

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

fn display_cycle(members: &[String]) -> String {
    match members.first() {
        Some(first) => format!("{} -> {}", members.join(" -> "), first),
        None => String::new(),
    }
}

impl CatalogError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingParent { .. }
            | Self::CyclicExtends(_)
            | Self::AbstractInstall(_)
            | Self::UnknownFramework(_)
            | Self::InvalidName { .. }
            | Self::DuplicateName(_)
            | Self::InvalidDefinition(_)
            | Self::MissingSource(_) => ErrorKind::Config,
            Self::StrategyUnsupported { .. } => ErrorKind::StrategyUnsupported,
            Self::InstallExecution { .. } => ErrorKind::InstallExecution,
            Self::SerializationError(_) | Self::IoError(_) => ErrorKind::Io,
        }
    }

    /// Shorthand for an `InstallExecution` error.
    #[must_use]
    pub fn execution(
        name: impl Into<String>,
        step: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InstallExecution {
            name: name.into(),
            step: step.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
