//! Gitee v5 JSON payloads.

use serde::{Deserialize, Serialize};
use steward_core::client::{BranchInfo, RepoInfo, TreeEntry};

#[derive(Debug, Deserialize)]
pub(crate) struct Project {
    pub path: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub can_comment: bool,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub owner: Option<User>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct User {
    pub login: String,
}

impl From<Project> for RepoInfo {
    fn from(p: Project) -> Self {
        RepoInfo {
            path: p.path,
            private: p.private,
            commentable: p.can_comment,
            members: p.members,
            owner: p.owner.map(|u| u.login).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Branch {
    pub name: String,
    #[serde(default)]
    pub protected: bool,
}

impl From<Branch> for BranchInfo {
    fn from(b: Branch) -> Self {
        BranchInfo {
            name: b.name,
            protected: b.protected,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Tree {
    #[serde(default)]
    pub tree: Vec<TreeItem>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TreeItem {
    pub path: String,
    pub sha: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Tree {
    /// File entries only; directories and submodules are dropped.
    pub fn into_blobs(self) -> Vec<TreeEntry> {
        self.tree
            .into_iter()
            .filter(|item| item.kind == "blob")
            .map(|item| TreeEntry {
                path: item.path,
                sha: item.sha,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Content {
    #[serde(default)]
    pub content: String,
    pub sha: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewRepo<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub has_issues: bool,
    pub has_wiki: bool,
    pub can_comment: bool,
    pub auto_init: bool,
    pub private: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct RepoPatchBody<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_comment: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewBranch<'a> {
    pub refs: &'a str,
    pub branch_name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct Permission<'a> {
    pub permission: &'a str,
}
