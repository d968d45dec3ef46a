//! # Property-Based Tests
//!
//! Determinism and merge invariants of resolution, checked with proptest
//! over randomly generated acyclic extends forests.

use fwcat_core::{
    DefinitionStore, FrameworkDefinition, InstallStrategy, Resolver, classify, flatten_catalog,
};
use proptest::collection::vec;
use proptest::option;
use proptest::prelude::*;
use proptest::sample::Index;

/// One generated node: (parent pick, has parent, version, params).
type NodeSpec = (Index, bool, Option<String>, Vec<(String, i64)>);

fn node_specs() -> impl Strategy<Value = Vec<NodeSpec>> {
    vec(
        (
            any::<Index>(),
            any::<bool>(),
            option::of("[a-z0-9][a-z0-9.]{0,6}"),
            vec(("[a-d]", 0i64..100), 0..4),
        ),
        1..16,
    )
}

/// Node `i` may only extend a node `j < i`, so the forest is acyclic.
fn build_definitions(specs: &[NodeSpec]) -> Vec<FrameworkDefinition> {
    specs
        .iter()
        .enumerate()
        .map(|(i, (pick, has_parent, version, params))| {
            let mut definition = FrameworkDefinition::new(format!("fw{i}"));
            if *has_parent && i > 0 {
                definition.extends = Some(format!("fw{}", pick.index(i)));
            }
            definition.version = version.clone();
            for (key, value) in params {
                definition
                    .params
                    .insert(key.clone(), serde_json::json!(value));
            }
            definition
        })
        .collect()
}

fn store_of(definitions: Vec<FrameworkDefinition>) -> DefinitionStore {
    DefinitionStore::from_definitions(definitions).expect("store")
}

proptest! {
    /// Same store resolved twice, and in reversed insertion order, is identical.
    #[test]
    fn resolution_is_deterministic(specs in node_specs()) {
        let definitions = build_definitions(&specs);
        let forward = store_of(definitions.clone());
        let backward = store_of(definitions.into_iter().rev().collect());

        let first = Resolver::resolve(&forward).expect("resolve");
        let second = Resolver::resolve(&forward).expect("resolve");
        let reversed = Resolver::resolve(&backward).expect("resolve");

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&first, &reversed);
    }

    /// Explicit child values win; parent-only params survive into the child.
    #[test]
    fn child_overrides_and_parent_params_survive(specs in node_specs()) {
        let definitions = build_definitions(&specs);
        let store = store_of(definitions.clone());
        let catalog = Resolver::resolve(&store).expect("resolve");

        for definition in &definitions {
            let Some(parent_name) = &definition.extends else { continue };
            let child = catalog.get(&definition.name).expect("child");
            let parent = catalog.get(parent_name).expect("parent");

            match &definition.version {
                Some(own) => prop_assert_eq!(&child.version, own),
                None => prop_assert_eq!(&child.version, &parent.version),
            }

            for (key, value) in &parent.params {
                let expected = definition.params.get(key).unwrap_or(value);
                prop_assert_eq!(child.params.get(key), Some(expected));
            }
        }
    }

    /// Without an authored tag anywhere in the chain, the tag follows the version.
    #[test]
    fn image_tag_follows_own_version(specs in node_specs()) {
        let catalog = Resolver::resolve(&store_of(build_definitions(&specs))).expect("resolve");
        for resolved in catalog.iter() {
            prop_assert_eq!(&resolved.image.tag, &resolved.version);
            prop_assert_eq!(&resolved.image.image, &resolved.name.to_lowercase());
        }
    }

    /// Flattening a resolved catalog and resolving again changes nothing
    /// but the ancestor provenance.
    #[test]
    fn resolution_is_idempotent(specs in node_specs()) {
        let catalog = Resolver::resolve(&store_of(build_definitions(&specs))).expect("resolve");
        let again = Resolver::resolve(&flatten_catalog(&catalog).expect("flatten"))
            .expect("resolve flattened");

        prop_assert_eq!(catalog.len(), again.len());
        for resolved in catalog.iter() {
            let mut expected = resolved.clone();
            expected.ancestors.clear();
            prop_assert_eq!(again.get(&resolved.name), Some(&expected));
        }
    }

    /// Every digit-leading token is a pinned release of itself.
    #[test]
    fn digit_leading_tokens_pin(token in "[0-9][0-9a-z.+-]{0,12}") {
        prop_assert_eq!(classify(&token), InstallStrategy::PinnedRelease(token.clone()));
    }

    /// Tokens starting with a letter other than the reserved words are source refs.
    #[test]
    fn letter_leading_tokens_are_refs(token in "[a-z][a-z0-9_/-]{0,12}") {
        prop_assume!(token != "latest" && token != "stable");
        prop_assert_eq!(classify(&token), InstallStrategy::SourceRef(token.clone()));
    }
}
