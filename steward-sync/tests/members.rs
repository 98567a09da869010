mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use common::{engine, owners, FakeHost, FakeRepo};
use steward_core::ActualRepoState;

const OWNER: &str = "owner-bot";

fn set(logins: &[&str]) -> BTreeSet<String> {
    logins.iter().map(|l| l.to_string()).collect()
}

fn host() -> Arc<FakeHost> {
    let host = Arc::new(FakeHost::new());
    let mut repo = FakeRepo::with_master(OWNER);
    repo.members = set(&[OWNER, "alice", "bob"]);
    host.insert("kernel", repo);
    host
}

fn recorded(members: &[&str], owner: Option<&str>) -> ActualRepoState {
    ActualRepoState {
        available: true,
        members: set(members),
        owner: owner.map(str::to_string),
        ..ActualRepoState::default()
    }
}

#[test]
fn registered_owner_is_never_removed() {
    let host = host();
    let actual = recorded(&["alice", "bob", OWNER], Some(OWNER));

    let (members, owner) = engine(&host).sync_members("kernel", &owners(&["alice"]), &actual);

    assert_eq!(members, set(&["alice", OWNER]));
    assert_eq!(owner.as_deref(), Some(OWNER));
    assert_eq!(host.writes(), vec!["remove_member kernel bob"]);
}

#[test]
fn unknown_owner_fetches_metadata_first() {
    let host = host();
    let actual = recorded(&[], None);

    let (members, owner) =
        engine(&host).sync_members("kernel", &owners(&["alice", "Carol"]), &actual);

    assert_eq!(members, set(&["alice", "carol", OWNER]));
    assert_eq!(owner.as_deref(), Some(OWNER));
    assert_eq!(
        host.calls(),
        vec![
            "get_repo kernel",
            "add_member kernel carol push",
            "remove_member kernel bob",
        ]
    );
}

#[test]
fn metadata_failure_leaves_members_unchanged() {
    let host = host();
    host.fail("get_repo kernel");
    let actual = recorded(&["alice"], None);

    let (members, owner) = engine(&host).sync_members("kernel", &owners(&["dave"]), &actual);

    assert_eq!(members, set(&["alice"]));
    assert_eq!(owner, None);
    assert!(host.writes().is_empty());
}

#[test]
fn failed_calls_keep_the_prior_membership() {
    let host = host();
    host.fail("add_member kernel carol push");
    host.fail("remove_member kernel bob");
    let actual = recorded(&["alice", "bob", OWNER], Some(OWNER));

    let (members, _) = engine(&host).sync_members("kernel", &owners(&["alice", "carol"]), &actual);

    assert_eq!(members, set(&["alice", "bob", OWNER]));
}

#[test]
fn member_already_gone_counts_as_removed() {
    let host = host();
    let actual = recorded(&["alice", "ghost"], Some(OWNER));

    let (members, _) = engine(&host).sync_members("kernel", &owners(&["alice"]), &actual);

    assert_eq!(members, set(&["alice"]));
    assert_eq!(host.writes(), vec!["remove_member kernel ghost"]);
}

#[test]
fn adding_an_existing_member_succeeds() {
    let host = host();
    let actual = recorded(&[], Some(OWNER));

    let (members, _) = engine(&host).sync_members("kernel", &owners(&["alice"]), &actual);

    assert_eq!(members, set(&["alice"]));
    assert_eq!(host.writes(), vec!["add_member kernel alice push"]);
}
