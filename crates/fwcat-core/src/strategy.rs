//! # Version Classifier
//!
//! Maps a free-form version token to exactly one [`InstallStrategy`].
//!
//! Rules, checked in order on the trimmed token:
//! 1. `""` or `latest` → [`InstallStrategy::LatestMainline`]
//! 2. `stable` → [`InstallStrategy::StableRelease`]
//! 3. leading ASCII digit → [`InstallStrategy::PinnedRelease`]
//! 4. anything else (branch, tag, commit hash) → [`InstallStrategy::SourceRef`]
//!
//! The strategy is derived, never stored: installers match on it
//! exhaustively instead of re-parsing the raw token.

use crate::primitives::{LATEST_TOKEN, STABLE_TOKEN};
use std::fmt;

/// The install procedure selected by a version token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstallStrategy {
    /// Newest published release from the package manager.
    StableRelease,
    /// Newest mainline state: default branch head, or the registry's latest.
    LatestMainline,
    /// An exact, officially published version.
    PinnedRelease(String),
    /// An arbitrary source ref: branch, tag, short or long commit hash.
    SourceRef(String),
}

impl InstallStrategy {
    /// Short label used in logs and errors.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::StableRelease => "stable-release",
            Self::LatestMainline => "latest-mainline",
            Self::PinnedRelease(_) => "pinned-release",
            Self::SourceRef(_) => "source-ref",
        }
    }

    /// The version or ref carried by the strategy, if any.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::PinnedRelease(v) | Self::SourceRef(v) => Some(v),
            Self::StableRelease | Self::LatestMainline => None,
        }
    }

    /// Whether the realized version can differ between two runs of the same request.
    #[must_use]
    pub const fn is_floating(&self) -> bool {
        !matches!(self, Self::PinnedRelease(_))
    }
}

impl fmt::Display for InstallStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target() {
            Some(target) => write!(f, "{}({})", self.label(), target),
            None => f.write_str(self.label()),
        }
    }
}

/// Classify a version token.
#[must_use]
pub fn classify(version: &str) -> InstallStrategy {
    let token = version.trim();

    if token.is_empty() || token == LATEST_TOKEN {
        return InstallStrategy::LatestMainline;
    }
    if token == STABLE_TOKEN {
        return InstallStrategy::StableRelease;
    }
    if token.starts_with(|c: char| c.is_ascii_digit()) {
        return InstallStrategy::PinnedRelease(token.to_string());
    }
    InstallStrategy::SourceRef(token.to_string())
}

// =============================================================================
// TESTS
// =============================================================================
