use std::cmp::Ordering;

use critlink_core::artifact::LinkArtifact;
use critlink_core::code::{compare, normalize};
use critlink_core::edge::{EdgeKind, tag};
use critlink_core::graph::verify::mutual_forward_pairs;
use critlink_core::pipeline::{process, process_graph};
use critlink_core::rewrite::rewrite_artifact;
use critlink_core::universe::CodeUniverse;
use proptest::prelude::*;

use generators::*;

fn universe_of(pairs: &[(String, String)]) -> CodeUniverse {
    pairs
        .iter()
        .flat_map(|(t, s)| [t.as_str(), s.as_str()])
        .collect()
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(512))]

    #[test]
    fn compare_is_antisymmetric(a in arb_lenient_code(), b in arb_lenient_code()) {
        prop_assert_eq!(compare(&a, &b), compare(&b, &a).reverse());
    }

    #[test]
    fn compare_is_reflexive(a in arb_lenient_code()) {
        prop_assert_eq!(compare(&a, &a), Ordering::Equal);
    }

    #[test]
    fn normalize_is_idempotent(a in arb_lenient_code()) {
        let once = normalize(&a);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn tag_round_trips(code in arb_padded_code()) {
        prop_assert_eq!(normalize(&tag(&code)), code);
    }

    #[test]
    fn processed_graph_has_no_self_or_mutual_edges(pairs in arb_pairs()) {
        let processed = process(&pairs, &universe_of(&pairs)).expect("process");
        for criterion in processed.graph.iter() {
            prop_assert!(!criterion.linked.contains_key(&criterion.code));
        }
        prop_assert!(mutual_forward_pairs(&processed.graph).is_empty());
    }

    #[test]
    fn kinds_follow_the_code_order(pairs in arb_pairs()) {
        let processed = process(&pairs, &universe_of(&pairs)).expect("process");
        for criterion in processed.graph.iter() {
            for (target, kind) in &criterion.linked {
                let lower = compare(target, &criterion.code) == Ordering::Less;
                prop_assert_eq!(*kind == EdgeKind::BackReference, lower);
            }
        }
    }

    #[test]
    fn processing_is_idempotent(pairs in arb_pairs()) {
        let once = process(&pairs, &universe_of(&pairs)).expect("first");
        let twice = process_graph(&once.graph).expect("second");
        prop_assert_eq!(&once.graph, &twice.graph);
    }

    #[test]
    fn rewriting_is_byte_stable(pairs in arb_pairs()) {
        let artifact = process(&pairs, &universe_of(&pairs)).expect("process").artifact();
        let first = rewrite_artifact(&artifact).expect("first");
        let second = rewrite_artifact(&first.artifact).expect("second");
        prop_assert_eq!(&first.bytes, &second.bytes);
        prop_assert_eq!(first.bytes, artifact.to_bytes().expect("bytes"));
    }

    #[test]
    fn rewriting_an_unprocessed_artifact_converges(pairs in arb_pairs()) {
        // Raw pairs written straight out as forward links, no breaking.
        let mut artifact = LinkArtifact::default();
        for (target, source) in &pairs {
            match artifact.records.iter_mut().find(|r| r.criteria == *target) {
                Some(record) => record.linked_criteria.push(source.clone()),
                None => artifact.records.push(
                    critlink_core::artifact::LinkRecord::new(target.clone(), vec![source.clone()]),
                ),
            }
        }

        let first = rewrite_artifact(&artifact).expect("first");
        let second = rewrite_artifact(&first.artifact).expect("second");
        prop_assert_eq!(first.bytes, second.bytes);
    }
}
