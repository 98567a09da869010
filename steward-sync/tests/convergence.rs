//! Whole-repository reconciliation: convergence, idempotence, fail-safety.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use common::{branch, engine, owners, spec, FakeHost, FakeRepo};
use rstest::rstest;
use steward_core::{BranchKind, RepoProperties, RepositorySpec, Visibility};

const OWNER: &str = "owner-bot";

fn diverged_host() -> Arc<FakeHost> {
    let host = Arc::new(FakeHost::new());
    let mut repo = FakeRepo::with_master(OWNER);
    repo.private = true;
    repo.members = [OWNER, "mallory"].iter().map(|s| s.to_string()).collect();
    repo.branches.insert("stable".to_string(), false);
    host.insert("kernel", repo);
    host
}

fn desired() -> RepositorySpec {
    let mut next = branch("next", BranchKind::Normal);
    next.create_from = Some("stable".to_string());
    let mut kernel = spec(
        "kernel",
        vec![
            branch("master", BranchKind::Protected),
            branch("stable", BranchKind::Protected),
            next,
        ],
    );
    kernel.commentable = true;
    kernel
}

fn sorted(mut calls: Vec<String>) -> Vec<String> {
    calls.sort();
    calls
}

#[test]
fn diverged_repository_converges_in_one_pass() {
    let host = diverged_host();
    let engine = engine(&host);
    let team = owners(&["alice"]);
    let before = engine.fetch_state("kernel").expect("fetch");
    host.clear_calls();

    let after = engine.reconcile(&desired(), Some(&team), before);

    assert_eq!(
        sorted(host.writes()),
        vec![
            "add_member kernel alice push",
            "create_branch kernel next from stable",
            "protect kernel master",
            "protect kernel stable",
            "remove_member kernel mallory",
            "update_repo kernel private=false commentable=true",
        ]
    );

    let remote = host.repo("kernel").expect("repo");
    assert!(!remote.private);
    assert!(remote.commentable);
    assert_eq!(remote.branches.get("master"), Some(&true));
    assert_eq!(remote.branches.get("stable"), Some(&true));
    assert_eq!(remote.branches.get("next"), Some(&false));
    let expected_members: BTreeSet<String> =
        [OWNER, "alice"].iter().map(|s| s.to_string()).collect();
    assert_eq!(remote.members, expected_members);
    assert_eq!(after.members, expected_members);
    assert_eq!(
        after.properties,
        RepoProperties {
            private: false,
            commentable: true
        }
    );
}

#[test]
fn converged_repository_is_left_alone() {
    let host = diverged_host();
    let engine = engine(&host);
    let team = owners(&["alice"]);
    let before = engine.fetch_state("kernel").expect("fetch");
    let converged = engine.reconcile(&desired(), Some(&team), before);
    host.clear_calls();

    let again = engine.reconcile(&desired(), Some(&team), converged.clone());

    assert_eq!(again, converged);
    assert!(host.calls().is_empty(), "unexpected calls: {:?}", host.calls());
}

#[test]
fn failures_keep_prior_values_and_heal_later() {
    let host = diverged_host();
    host.fail("protect kernel master");
    host.fail("add_member kernel alice push");
    host.fail("update_repo kernel private=false commentable=true");
    let engine = engine(&host);
    let team = owners(&["alice"]);
    let before = engine.fetch_state("kernel").expect("fetch");

    let partial = engine.reconcile(&desired(), Some(&team), before);

    let master = partial
        .branches
        .iter()
        .find(|b| b.name == "master")
        .expect("master");
    assert_eq!(master.kind, BranchKind::Normal);
    assert!(!partial.members.contains("alice"));
    assert!(!partial.members.contains("mallory"));
    assert!(partial.properties.private);

    host.heal();
    let healed = engine.reconcile(&desired(), Some(&team), partial);
    assert!(healed.members.contains("alice"));
    assert!(!healed.properties.private);

    host.clear_calls();
    let quiet = engine.reconcile(&desired(), Some(&team), healed.clone());
    assert_eq!(quiet, healed);
    assert!(host.writes().is_empty());
}

#[test]
fn unclaimed_repository_keeps_only_its_owner() {
    let host = Arc::new(FakeHost::new());
    let mut repo = FakeRepo::with_master(OWNER);
    repo.members = [OWNER, "alice", "bob"].iter().map(|s| s.to_string()).collect();
    host.insert("kernel", repo);
    let engine = engine(&host);
    let before = engine.fetch_state("kernel").expect("fetch");
    host.clear_calls();

    let after = engine.reconcile(&desired(), None, before);

    assert_eq!(after.members, BTreeSet::from([OWNER.to_string()]));
    assert_eq!(after.owner.as_deref(), Some(OWNER));
    let removed: Vec<String> = sorted(host.writes())
        .into_iter()
        .filter(|c| c.contains("member"))
        .collect();
    assert_eq!(removed, vec!["remove_member kernel alice", "remove_member kernel bob"]);
}

#[rstest]
#[case::unchanged(Visibility::Public, false, false, false, 0)]
#[case::becomes_private(Visibility::Private, false, false, false, 1)]
#[case::becomes_commentable(Visibility::Public, true, false, false, 1)]
#[case::both_differ(Visibility::Public, false, true, true, 1)]
fn properties_are_patched_only_on_difference(
    #[case] visibility: Visibility,
    #[case] commentable: bool,
    #[case] actual_private: bool,
    #[case] actual_commentable: bool,
    #[case] patches: usize,
) {
    let host = diverged_host();
    let mut kernel = spec("kernel", vec![]);
    kernel.visibility = visibility;
    kernel.commentable = commentable;
    let actual = RepoProperties {
        private: actual_private,
        commentable: actual_commentable,
    };

    let out = engine(&host).sync_properties(&kernel, actual);

    assert_eq!(out, kernel.properties());
    assert_eq!(host.writes().len(), patches);
}

#[test]
fn failed_property_patch_returns_previous_value() {
    let host = diverged_host();
    host.fail("update_repo kernel private=true commentable=false");
    let mut kernel = spec("kernel", vec![]);
    kernel.visibility = Visibility::Private;
    let actual = RepoProperties::default();

    let out = engine(&host).sync_properties(&kernel, actual);

    assert_eq!(out, actual);
}
