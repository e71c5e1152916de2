//! Unit tests for the active conversation registry.

use checkpoint_relay::orchestrator::ActiveConversations;

#[test]
fn claim_is_exclusive_until_dropped() {
    let active = ActiveConversations::new();
    let claim = active.claim("t1").expect("first claim");
    assert_eq!(claim.task_id(), "t1");
    assert!(active.contains("t1"));
    assert!(active.claim("t1").is_none());

    drop(claim);
    assert!(!active.contains("t1"));
    assert!(active.claim("t1").is_some());
}

#[test]
fn claims_are_per_task() {
    let active = ActiveConversations::new();
    let _a = active.claim("a").expect("a");
    let _b = active.claim("b").expect("b");
    assert_eq!(active.len(), 2);
    assert!(!active.is_empty());
}

#[test]
fn clones_share_state() {
    let active = ActiveConversations::new();
    let other = active.clone();
    let _claim = active.claim("t1").expect("claim");
    assert!(other.contains("t1"));
}
