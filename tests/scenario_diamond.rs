//! spec.md §8 S2: a diamond-shaped dependency graph produces a
//! three-task critical path and identifies the single shared root cause as
//! the leaf blocker for the task that depends on both branches.

mod common;

use common::Fixture;

#[test]
fn diamond_reports_a_three_node_critical_path_and_single_leaf_blocker() {
    let fx = Fixture::new();

    let root = fx.create_task("Root", &[]);
    let left = fx.create_task("Left", &["--depends", &root]);
    let right = fx.create_task("Right", &["--depends", &root]);
    let depends = format!("{left},{right}");
    let tip = fx.create_task("Tip", &["--depends", &depends]);

    let critical_path = fx.run(&["critical-path"]);
    assert!(critical_path["success"].as_bool().unwrap());
    let chain = critical_path["result"]["chain"].as_array().unwrap();
    assert_eq!(chain.len(), 3, "expected a 3-node chain, got {chain:?}");

    let shown = fx.run(&["task", "show", &tip]);
    let leaf_blockers = shown["result"]["dependencies"]["leafBlockers"].as_array().unwrap();
    assert_eq!(leaf_blockers.len(), 1);
    assert_eq!(leaf_blockers[0]["id"].as_str().unwrap(), root);
}
