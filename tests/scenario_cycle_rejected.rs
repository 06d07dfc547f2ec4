//! spec.md §8 S3: an edge that would close a cycle is rejected and leaves
//! the graph exactly as it was.

mod common;

use common::{error_code, exit_code, Fixture};

#[test]
fn closing_a_cycle_is_rejected_and_leaves_state_unchanged() {
    let fx = Fixture::new();

    let t1 = fx.create_task("T1", &[]);
    let t2 = fx.create_task("T2", &[]);
    let t3 = fx.create_task("T3", &[]);

    assert!(fx.run(&["deps", "add", &t1, &t2])["success"].as_bool().unwrap());
    assert!(fx.run(&["deps", "add", &t2, &t3])["success"].as_bool().unwrap());

    let before = fx.run(&["deps", "view", &t1])["result"].clone();

    let rejected = fx.run(&["deps", "add", &t3, &t1]);
    assert!(!rejected["success"].as_bool().unwrap());
    assert_eq!(error_code(&rejected), "CIRCULAR_DEPENDENCY");
    assert!((1..10).contains(&exit_code(&rejected)));

    let after = fx.run(&["deps", "view", &t1])["result"].clone();
    assert_eq!(before, after, "rejected edge must not have mutated the graph");
}
