//! spec.md §8 S5: the release stage's attribution check rejects an epic
//! validated and tested by its own creator, then accepts it once a
//! distinct validator and tester attest.

mod common;

use common::{error_code, Fixture};
use serde_json::Value;

/// The default lifecycle mode is `advisory` (violations logged, never
/// rejected); this scenario needs `strict` so the release gate actually
/// enforces attribution.
fn run_strict(fx: &Fixture, actor: &str, args: &[&str]) -> Value {
    let mut full = vec!["--lifecycle-mode", "strict"];
    full.extend_from_slice(args);
    fx.run_as(actor, &full)
}

const PRIOR_STAGES: &[&str] = &[
    "research",
    "consensus",
    "architecture-decision",
    "specification",
    "decomposition",
    "implementation",
    "validation",
    "testing",
];

#[test]
fn self_validated_release_is_circular_then_succeeds_with_distinct_attributors() {
    let fx = Fixture::new();
    let epic = fx.run_as("A", &["task", "create", "--title", "E1"])["result"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    for stage in PRIOR_STAGES {
        let skipped = run_strict(&fx, "A", &["lifecycle", "skip-stage", &epic, stage, "not applicable to this epic"]);
        assert!(skipped["success"].as_bool().unwrap(), "failed to skip {stage}: {skipped}");
    }

    let marked = run_strict(
        &fx,
        "A",
        &["task", "update", &epic, "--mark-implemented", "--mark-documented", "--validated", "--tested"],
    );
    assert!(marked["success"].as_bool().unwrap());
    assert_eq!(marked["result"]["validatedBy"].as_str().unwrap(), "A");
    assert_eq!(marked["result"]["testedBy"].as_str().unwrap(), "A");

    let circular = run_strict(&fx, "A", &["lifecycle", "complete-stage", &epic, "release"]);
    assert!(!circular["success"].as_bool().unwrap());
    assert_eq!(error_code(&circular), "CIRCULAR_VALIDATION");

    assert!(run_strict(&fx, "B", &["task", "update", &epic, "--validated"])["success"].as_bool().unwrap());
    assert!(run_strict(&fx, "C", &["task", "update", &epic, "--tested"])["success"].as_bool().unwrap());

    let released = run_strict(&fx, "A", &["lifecycle", "complete-stage", &epic, "release"]);
    assert!(released["success"].as_bool().unwrap(), "expected release to succeed: {released}");
}
