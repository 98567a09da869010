//! The hosting-API surface the controller depends on.
//!
//! Everything the engine and the desired-state store need from the git
//! hosting service goes through [`HostingClient`]. Calls are blocking; the
//! daemon runs them on worker threads.

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Permission granted to SIG owners added as repository members.
pub const MEMBER_PERMISSION: &str = "push";

/// Repository metadata as reported by the hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepoInfo {
    /// Repository path (the name used in URLs).
    pub path: String,
    pub private: bool,
    pub commentable: bool,
    pub members: Vec<String>,
    /// Login of the registered owner, who cannot be removed as a member.
    pub owner: String,
}

/// A branch and its protection flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchInfo {
    pub name: String,
    pub protected: bool,
}

/// Parameters for creating a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateRepo {
    pub name: String,
    pub description: String,
    pub private: bool,
    pub commentable: bool,
    /// Initialize the default branch with a README.
    pub auto_init: bool,
}

/// Partial update of a repository. `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RepoPatch {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commentable: Option<bool>,
}

/// Default reviewer assignment of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewerConfig {
    pub assignees: String,
    pub testers: String,
    pub assignees_number: u32,
    pub testers_number: u32,
}

impl ReviewerConfig {
    /// No reviewers and no testers. The hosting API requires the name lists
    /// to be non-empty, hence the single space.
    pub fn empty() -> Self {
        Self {
            assignees: " ".to_string(),
            testers: " ".to_string(),
            assignees_number: 0,
            testers_number: 0,
        }
    }
}

/// Raw content of a file at a ref, base64 encoded, with its blob SHA.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileContent {
    pub content: String,
    pub sha: String,
}

/// One entry of a recursive tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub sha: String,
}

/// Operations on the git hosting service.
pub trait HostingClient: Send + Sync {
    fn get_repo(&self, org: &str, repo: &str) -> Result<RepoInfo, ClientError>;

    fn list_repos(&self, org: &str) -> Result<Vec<RepoInfo>, ClientError>;

    fn create_repo(&self, org: &str, repo: &CreateRepo) -> Result<(), ClientError>;

    fn update_repo(&self, org: &str, repo: &str, patch: &RepoPatch) -> Result<(), ClientError>;

    fn set_repo_reviewer(
        &self,
        org: &str,
        repo: &str,
        reviewer: &ReviewerConfig,
    ) -> Result<(), ClientError>;

    fn list_branches(&self, org: &str, repo: &str) -> Result<Vec<BranchInfo>, ClientError>;

    fn create_branch(
        &self,
        org: &str,
        repo: &str,
        branch: &str,
        from: &str,
    ) -> Result<(), ClientError>;

    fn set_branch_protection(&self, org: &str, repo: &str, branch: &str)
        -> Result<(), ClientError>;

    fn cancel_branch_protection(
        &self,
        org: &str,
        repo: &str,
        branch: &str,
    ) -> Result<(), ClientError>;

    /// Adding an existing member succeeds.
    fn add_member(
        &self,
        org: &str,
        repo: &str,
        login: &str,
        permission: &str,
    ) -> Result<(), ClientError>;

    fn remove_member(&self, org: &str, repo: &str, login: &str) -> Result<(), ClientError>;

    fn get_content(
        &self,
        org: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<FileContent, ClientError>;

    /// Recursive listing of every file at `git_ref`.
    fn list_tree(&self, org: &str, repo: &str, git_ref: &str)
        -> Result<Vec<TreeEntry>, ClientError>;
}
