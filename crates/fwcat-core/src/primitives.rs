//! # Catalog Primitives
//!
//! Hardcoded constants shared by the resolver, the classifier and the ledger.
//!
//! These are compiled into the binary and are immutable at runtime.

/// Image author used when no definition in the chain sets one.
pub const DEFAULT_IMAGE_AUTHOR: &str = "automlbenchmark";

/// Tag used in an image reference when the resolved tag is empty.
///
/// Docker refuses empty tags, so an unpinned definition is referenced as `latest`.
pub const DEFAULT_IMAGE_TAG: &str = "latest";

/// Version token selecting the newest mainline (development) state.
pub const LATEST_TOKEN: &str = "latest";

/// Version token selecting the newest published release.
pub const STABLE_TOKEN: &str = "stable";

/// Separator between a version and its build metadata (`16.2.0+511cc10`).
pub const BUILD_METADATA_SEPARATOR: char = '+';

// =============================================================================
// LEDGER LAYOUT
// =============================================================================

/// Per-definition directory holding setup state, relative to the definition root.
pub const SETUP_DIR: &str = ".setup";

/// Ledger file name inside [`SETUP_DIR`].
pub const LEDGER_FILE: &str = "installed";

/// Field separator inside one ledger line (`<version>\t<timestamp>`).
pub const LEDGER_FIELD_SEPARATOR: char = '\t';

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum size of one definition document (16 MiB).
///
/// Documents larger than this are rejected before parsing.
pub const MAX_DEFINITION_DOCUMENT_SIZE: u64 = 16 * 1024 * 1024;

/// Maximum length of a definition name.
///
/// Names become directory names, so they are kept well under path limits.
pub const MAX_NAME_LENGTH: usize = 128;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_distinct() {
        assert_ne!(LATEST_TOKEN, STABLE_TOKEN);
    }

    #[test]
    fn default_tag_is_valid_docker_tag() {
        assert!(!DEFAULT_IMAGE_TAG.is_empty());
        assert!(
            DEFAULT_IMAGE_TAG
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        );
    }
}
