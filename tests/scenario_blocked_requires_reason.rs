//! spec.md §8 S4: entering `blocked` without a reason is rejected; with one
//! it succeeds and the reason is recorded as `blockedBy`.

mod common;

use common::{error_code, Fixture};

#[test]
fn blocking_without_reason_fails_and_with_reason_succeeds() {
    let fx = Fixture::new();
    let t1 = fx.create_task("T1", &[]);

    let rejected = fx.run(&["task", "transition", &t1, "blocked"]);
    assert!(!rejected["success"].as_bool().unwrap());
    assert_eq!(error_code(&rejected), "VALIDATION_ERROR");

    let accepted = fx.run(&["task", "transition", &t1, "blocked", "--reason", "Waiting for keys"]);
    assert!(accepted["success"].as_bool().unwrap(), "expected success: {accepted}");
    assert_eq!(accepted["result"]["blockedBy"].as_str().unwrap(), "Waiting for keys");
    assert_eq!(accepted["result"]["status"].as_str().unwrap(), "blocked");
}
