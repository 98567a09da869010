//! In-memory hosting service with call recording and failure injection.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

use steward_core::client::{
    BranchInfo, CreateRepo, FileContent, RepoInfo, RepoPatch, ReviewerConfig, TreeEntry,
};
use steward_core::{
    BranchKind, BranchSpec, ClientError, HostingClient, RepositorySpec, Visibility,
};
use steward_sync::Reconciler;

pub const BOT: &str = "steward-bot";

#[derive(Debug, Clone, Default)]
pub struct FakeRepo {
    pub private: bool,
    pub commentable: bool,
    pub owner: String,
    pub members: BTreeSet<String>,
    /// name → protected
    pub branches: BTreeMap<String, bool>,
}

impl FakeRepo {
    pub fn with_master(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            members: [owner.to_string()].into_iter().collect(),
            branches: [("master".to_string(), false)].into_iter().collect(),
            ..Self::default()
        }
    }
}

#[derive(Default)]
pub struct FakeHost {
    repos: Mutex<BTreeMap<String, FakeRepo>>,
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

fn mutating(call: &str) -> bool {
    !(call.starts_with("get_repo")
        || call.starts_with("list_")
        || call.starts_with("get_content"))
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: &str, repo: FakeRepo) {
        self.repos.lock().unwrap().insert(name.to_string(), repo);
    }

    pub fn repo(&self, name: &str) -> Option<FakeRepo> {
        self.repos.lock().unwrap().get(name).cloned()
    }

    /// Makes every call whose record equals `call` fail with HTTP 500.
    pub fn fail(&self, call: &str) {
        self.failing.lock().unwrap().insert(call.to_string());
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded calls that would change something on the service.
    pub fn writes(&self) -> Vec<String> {
        self.calls().into_iter().filter(|c| mutating(c)).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: String) -> Result<(), ClientError> {
        let failing = self.failing.lock().unwrap().contains(&call);
        self.calls.lock().unwrap().push(call.clone());
        if failing {
            return Err(ClientError::Http {
                status: 500,
                url: format!("fake://{call}"),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn not_found(what: &str) -> ClientError {
        ClientError::NotFound {
            what: what.to_string(),
        }
    }

    fn with_repo<T>(
        &self,
        repo: &str,
        f: impl FnOnce(&mut FakeRepo) -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let mut repos = self.repos.lock().unwrap();
        let entry = repos.get_mut(repo).ok_or_else(|| Self::not_found(repo))?;
        f(entry)
    }
}

impl HostingClient for FakeHost {
    fn get_repo(&self, _org: &str, repo: &str) -> Result<RepoInfo, ClientError> {
        self.record(format!("get_repo {repo}"))?;
        self.with_repo(repo, |r| {
            Ok(RepoInfo {
                path: repo.to_string(),
                private: r.private,
                commentable: r.commentable,
                members: r.members.iter().cloned().collect(),
                owner: r.owner.clone(),
            })
        })
    }

    fn list_repos(&self, org: &str) -> Result<Vec<RepoInfo>, ClientError> {
        self.record(format!("list_repos {org}"))?;
        let repos = self.repos.lock().unwrap();
        Ok(repos
            .iter()
            .map(|(name, r)| RepoInfo {
                path: name.clone(),
                private: r.private,
                commentable: r.commentable,
                members: r.members.iter().cloned().collect(),
                owner: r.owner.clone(),
            })
            .collect())
    }

    fn create_repo(&self, _org: &str, repo: &CreateRepo) -> Result<(), ClientError> {
        self.record(format!("create_repo {}", repo.name))?;
        let mut repos = self.repos.lock().unwrap();
        if repos.contains_key(&repo.name) {
            return Err(ClientError::AlreadyExists {
                what: repo.name.clone(),
            });
        }
        let mut created = FakeRepo {
            private: repo.private,
            commentable: repo.commentable,
            ..FakeRepo::with_master(BOT)
        };
        if !repo.auto_init {
            created.branches.clear();
        }
        repos.insert(repo.name.clone(), created);
        Ok(())
    }

    fn update_repo(&self, _org: &str, repo: &str, patch: &RepoPatch) -> Result<(), ClientError> {
        let mut call = format!("update_repo {repo}");
        if let Some(path) = &patch.path {
            call.push_str(&format!(" path={path}"));
        }
        if let Some(private) = patch.private {
            call.push_str(&format!(" private={private}"));
        }
        if let Some(commentable) = patch.commentable {
            call.push_str(&format!(" commentable={commentable}"));
        }
        self.record(call)?;

        let mut repos = self.repos.lock().unwrap();
        let mut current = repos.remove(repo).ok_or_else(|| Self::not_found(repo))?;
        if let Some(private) = patch.private {
            current.private = private;
        }
        if let Some(commentable) = patch.commentable {
            current.commentable = commentable;
        }
        let target = patch.path.clone().unwrap_or_else(|| repo.to_string());
        repos.insert(target, current);
        Ok(())
    }

    fn set_repo_reviewer(
        &self,
        _org: &str,
        repo: &str,
        _reviewer: &ReviewerConfig,
    ) -> Result<(), ClientError> {
        self.record(format!("set_repo_reviewer {repo}"))?;
        self.with_repo(repo, |_| Ok(()))
    }

    fn list_branches(&self, _org: &str, repo: &str) -> Result<Vec<BranchInfo>, ClientError> {
        self.record(format!("list_branches {repo}"))?;
        self.with_repo(repo, |r| {
            Ok(r.branches
                .iter()
                .map(|(name, protected)| BranchInfo {
                    name: name.clone(),
                    protected: *protected,
                })
                .collect())
        })
    }

    fn create_branch(
        &self,
        _org: &str,
        repo: &str,
        branch: &str,
        from: &str,
    ) -> Result<(), ClientError> {
        self.record(format!("create_branch {repo} {branch} from {from}"))?;
        self.with_repo(repo, |r| {
            if r.branches.contains_key(branch) {
                return Err(ClientError::AlreadyExists {
                    what: branch.to_string(),
                });
            }
            if !r.branches.contains_key(from) {
                return Err(Self::not_found(from));
            }
            r.branches.insert(branch.to_string(), false);
            Ok(())
        })
    }

    fn set_branch_protection(&self, _org: &str, repo: &str, branch: &str) -> Result<(), ClientError> {
        self.record(format!("protect {repo} {branch}"))?;
        self.with_repo(repo, |r| match r.branches.get_mut(branch) {
            Some(protected) => {
                *protected = true;
                Ok(())
            }
            None => Err(Self::not_found(branch)),
        })
    }

    fn cancel_branch_protection(
        &self,
        _org: &str,
        repo: &str,
        branch: &str,
    ) -> Result<(), ClientError> {
        self.record(format!("unprotect {repo} {branch}"))?;
        self.with_repo(repo, |r| match r.branches.get_mut(branch) {
            Some(protected) => {
                *protected = false;
                Ok(())
            }
            None => Err(Self::not_found(branch)),
        })
    }

    fn add_member(
        &self,
        _org: &str,
        repo: &str,
        login: &str,
        permission: &str,
    ) -> Result<(), ClientError> {
        self.record(format!("add_member {repo} {login} {permission}"))?;
        self.with_repo(repo, |r| {
            r.members.insert(login.to_string());
            Ok(())
        })
    }

    fn remove_member(&self, _org: &str, repo: &str, login: &str) -> Result<(), ClientError> {
        self.record(format!("remove_member {repo} {login}"))?;
        self.with_repo(repo, |r| {
            if r.owner.eq_ignore_ascii_case(login) {
                return Err(ClientError::Http {
                    status: 400,
                    url: format!("fake://{repo}/collaborators/{login}"),
                    message: "cannot remove the repository owner".to_string(),
                });
            }
            if !r.members.remove(login) {
                return Err(Self::not_found(login));
            }
            Ok(())
        })
    }

    fn get_content(
        &self,
        _org: &str,
        _repo: &str,
        path: &str,
        _git_ref: &str,
    ) -> Result<FileContent, ClientError> {
        self.record(format!("get_content {path}"))?;
        Err(Self::not_found(path))
    }

    fn list_tree(&self, _org: &str, repo: &str, git_ref: &str) -> Result<Vec<TreeEntry>, ClientError> {
        self.record(format!("list_tree {repo} {git_ref}"))?;
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub const ORG: &str = "openeuler";

pub fn engine(host: &Arc<FakeHost>) -> Reconciler {
    Reconciler::new(host.clone(), ORG)
}

pub fn branch(name: &str, kind: BranchKind) -> BranchSpec {
    BranchSpec::new(name, kind)
}

pub fn spec(name: &str, branches: Vec<BranchSpec>) -> RepositorySpec {
    let mut spec = RepositorySpec::new(name, Visibility::Public);
    spec.branches = branches;
    spec
}

pub fn owners(logins: &[&str]) -> Vec<String> {
    logins.iter().map(|l| l.to_string()).collect()
}

pub fn names(branches: &[BranchSpec]) -> Vec<(String, BranchKind)> {
    branches.iter().map(|b| (b.name.clone(), b.kind)).collect()
}
