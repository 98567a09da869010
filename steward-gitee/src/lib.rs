//! # steward-gitee
//!
//! Blocking [`HostingClient`] for the Gitee v5 REST API, built on `ureq`.
//!
//! The access token travels as the `access_token` query parameter (reads,
//! deletes) or body field (writes) and is stripped from every error.

mod error;
mod wire;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use steward_core::client::{
    BranchInfo, CreateRepo, FileContent, RepoInfo, RepoPatch, ReviewerConfig, TreeEntry,
};
use steward_core::{ClientError, HostingClient};
use urlencoding::encode;

use crate::error::{classify, strip_query};

pub const DEFAULT_ENDPOINT: &str = "https://gitee.com/api/v5";

const PER_PAGE: usize = 100;
const TIMEOUT: Duration = Duration::from_secs(30);

/// Gitee API client. Cheap to share across worker threads.
pub struct GiteeClient {
    agent: ureq::Agent,
    endpoint: String,
    token: String,
}

impl GiteeClient {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(TIMEOUT)
            .user_agent(concat!("steward/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, ClientError> {
        let url = self.url(path);
        tracing::debug!(method = "GET", url = %url, "gitee request");
        let mut request = self.agent.get(&url).query("access_token", &self.token);
        for (key, value) in query {
            request = request.query(key, value);
        }
        let response = request.call().map_err(|e| call_error(&url, e))?;
        response
            .into_json::<T>()
            .map_err(|e| ClientError::Decode {
                url,
                message: e.to_string(),
            })
    }

    fn send<B: Serialize>(&self, method: &str, path: &str, body: &B) -> Result<(), ClientError> {
        let url = self.url(path);
        tracing::debug!(method = %method, url = %url, "gitee request");
        let mut payload = serde_json::to_value(body).map_err(|e| ClientError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?;
        if let Some(fields) = payload.as_object_mut() {
            fields.insert("access_token".to_string(), self.token.clone().into());
        }
        self.agent
            .request(method, &url)
            .send_json(payload)
            .map_err(|e| call_error(&url, e))?;
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), ClientError> {
        let url = self.url(path);
        tracing::debug!(method = "DELETE", url = %url, "gitee request");
        self.agent
            .delete(&url)
            .query("access_token", &self.token)
            .call()
            .map_err(|e| call_error(&url, e))?;
        Ok(())
    }
}

fn call_error(url: &str, err: ureq::Error) -> ClientError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            classify(status, url, &body)
        }
        // Display of a transport error includes the full URL, token and all.
        ureq::Error::Transport(transport) => ClientError::Transport {
            url: strip_query(url).to_string(),
            message: match transport.message() {
                Some(detail) => format!("{}: {detail}", transport.kind()),
                None => transport.kind().to_string(),
            },
        },
    }
}

/// Encodes a repository file path one segment at a time, keeping `/`.
fn file_path(path: &str) -> String {
    path.split('/')
        .map(encode)
        .collect::<Vec<_>>()
        .join("/")
}

fn repo_path(org: &str, repo: &str) -> String {
    format!("/repos/{}/{}", encode(org), encode(repo))
}

impl HostingClient for GiteeClient {
    fn get_repo(&self, org: &str, repo: &str) -> Result<RepoInfo, ClientError> {
        self.get::<wire::Project>(&repo_path(org, repo), &[])
            .map(Into::into)
    }

    fn list_repos(&self, org: &str) -> Result<Vec<RepoInfo>, ClientError> {
        let path = format!("/orgs/{}/repos", encode(org));
        let per_page = PER_PAGE.to_string();
        let mut out = Vec::new();
        for page in 1.. {
            let page = page.to_string();
            let batch: Vec<wire::Project> = self.get(
                &path,
                &[("type", "all"), ("page", &page), ("per_page", &per_page)],
            )?;
            let last = batch.len() < PER_PAGE;
            out.extend(batch.into_iter().map(RepoInfo::from));
            if last {
                break;
            }
        }
        Ok(out)
    }

    fn create_repo(&self, org: &str, repo: &CreateRepo) -> Result<(), ClientError> {
        let body = wire::NewRepo {
            name: &repo.name,
            description: &repo.description,
            has_issues: true,
            has_wiki: true,
            can_comment: repo.commentable,
            auto_init: repo.auto_init,
            private: repo.private,
        };
        self.send("POST", &format!("/orgs/{}/repos", encode(org)), &body)
    }

    fn update_repo(&self, org: &str, repo: &str, patch: &RepoPatch) -> Result<(), ClientError> {
        let body = wire::RepoPatchBody {
            name: &patch.name,
            path: patch.path.as_deref(),
            private: patch.private,
            can_comment: patch.commentable,
        };
        self.send("PATCH", &repo_path(org, repo), &body)
    }

    fn set_repo_reviewer(
        &self,
        org: &str,
        repo: &str,
        reviewer: &ReviewerConfig,
    ) -> Result<(), ClientError> {
        self.send("PUT", &format!("{}/reviewer", repo_path(org, repo)), reviewer)
    }

    fn list_branches(&self, org: &str, repo: &str) -> Result<Vec<BranchInfo>, ClientError> {
        let branches: Vec<wire::Branch> =
            self.get(&format!("{}/branches", repo_path(org, repo)), &[])?;
        Ok(branches.into_iter().map(BranchInfo::from).collect())
    }

    fn create_branch(
        &self,
        org: &str,
        repo: &str,
        branch: &str,
        from: &str,
    ) -> Result<(), ClientError> {
        let body = wire::NewBranch {
            refs: from,
            branch_name: branch,
        };
        self.send("POST", &format!("{}/branches", repo_path(org, repo)), &body)
    }

    fn set_branch_protection(&self, org: &str, repo: &str, branch: &str) -> Result<(), ClientError> {
        let path = format!(
            "{}/branches/{}/protection",
            repo_path(org, repo),
            encode(branch)
        );
        self.send("PUT", &path, &serde_json::json!({}))
    }

    fn cancel_branch_protection(
        &self,
        org: &str,
        repo: &str,
        branch: &str,
    ) -> Result<(), ClientError> {
        self.delete(&format!(
            "{}/branches/{}/protection",
            repo_path(org, repo),
            encode(branch)
        ))
    }

    fn add_member(
        &self,
        org: &str,
        repo: &str,
        login: &str,
        permission: &str,
    ) -> Result<(), ClientError> {
        let path = format!("{}/collaborators/{}", repo_path(org, repo), encode(login));
        self.send("PUT", &path, &wire::Permission { permission })
    }

    fn remove_member(&self, org: &str, repo: &str, login: &str) -> Result<(), ClientError> {
        self.delete(&format!(
            "{}/collaborators/{}",
            repo_path(org, repo),
            encode(login)
        ))
    }

    fn get_content(
        &self,
        org: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<FileContent, ClientError> {
        let url_path = format!("{}/contents/{}", repo_path(org, repo), file_path(path));
        let content: wire::Content = self.get(&url_path, &[("ref", git_ref)])?;
        Ok(FileContent {
            content: content.content,
            sha: content.sha,
        })
    }

    fn list_tree(&self, org: &str, repo: &str, git_ref: &str) -> Result<Vec<TreeEntry>, ClientError> {
        let path = format!("{}/git/trees/{}", repo_path(org, repo), encode(git_ref));
        let tree: wire::Tree = self.get(&path, &[("recursive", "1")])?;
        if tree.truncated {
            tracing::warn!(org = %org, repo = %repo, git_ref = %git_ref, "tree listing truncated; some files will not be tracked");
        }
        Ok(tree.into_blobs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segments_are_escaped() {
        assert_eq!(
            repo_path("src-openeuler", "openEuler-22.03_LTS"),
            "/repos/src-openeuler/openEuler-22.03_LTS"
        );
        assert_eq!(repo_path("openeuler", "a/b c"), "/repos/openeuler/a%2Fb%20c");
        assert_eq!(file_path("sig/Ker nel/OWNERS"), "sig/Ker%20nel/OWNERS");
        assert_eq!(file_path("sig/C++/OWNERS"), "sig/C%2B%2B/OWNERS");
    }

    #[test]
    fn endpoint_trailing_slash_is_trimmed() {
        let client = GiteeClient::new("https://gitee.com/api/v5/", "t");
        assert_eq!(client.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(
            client.url(&repo_path("openeuler", "kernel")),
            "https://gitee.com/api/v5/repos/openeuler/kernel"
        );
    }
}
