//! Where desired-state files come from.
//!
//! A [`FileSource`] lists the fingerprint of every file in a tree and fetches
//! single files. [`WatchedBranch`] reads a branch of a hosted repository
//! through the [`HostingClient`]; [`LocalTree`] reads a local checkout and
//! fingerprints files with SHA-256.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use sha2::{Digest, Sha256};

use crate::client::HostingClient;
use crate::error::{io_err, StoreError};

/// Raw bytes of a fetched file and the fingerprint they were fetched at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub content: Vec<u8>,
    pub fingerprint: String,
}

/// A tree of desired-state files addressable by path and content hash.
pub trait FileSource: Send + Sync {
    /// Path → fingerprint for every file in the tree.
    fn list_fingerprints(&self) -> Result<HashMap<String, String>, StoreError>;

    fn fetch(&self, path: &str) -> Result<FetchedFile, StoreError>;
}

/// An `org/repo/branch` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoBranch {
    pub org: String,
    pub repo: String,
    pub branch: String,
}

impl fmt::Display for RepoBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.org, self.repo, self.branch)
    }
}

// ---------------------------------------------------------------------------
// Hosted branch
// ---------------------------------------------------------------------------

/// Desired-state files living on a branch of a hosted repository.
#[derive(Clone)]
pub struct WatchedBranch {
    client: Arc<dyn HostingClient>,
    target: RepoBranch,
}

impl WatchedBranch {
    pub fn new(client: Arc<dyn HostingClient>, target: RepoBranch) -> Self {
        Self { client, target }
    }

    pub fn target(&self) -> &RepoBranch {
        &self.target
    }
}

impl FileSource for WatchedBranch {
    fn list_fingerprints(&self) -> Result<HashMap<String, String>, StoreError> {
        let t = &self.target;
        let entries = self
            .client
            .list_tree(&t.org, &t.repo, &t.branch)
            .map_err(|source| StoreError::Listing {
                target: t.to_string(),
                source,
            })?;
        Ok(entries.into_iter().map(|e| (e.path, e.sha)).collect())
    }

    fn fetch(&self, path: &str) -> Result<FetchedFile, StoreError> {
        let t = &self.target;
        let file = self
            .client
            .get_content(&t.org, &t.repo, path, &t.branch)
            .map_err(|source| StoreError::Fetch {
                path: path.to_string(),
                source,
            })?;
        Ok(FetchedFile {
            content: decode_base64(path, &file.content)?,
            fingerprint: file.sha,
        })
    }
}

/// Decodes API-provided base64, which may be wrapped across lines.
pub fn decode_base64(path: &str, content: &str) -> Result<Vec<u8>, StoreError> {
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|source| StoreError::Base64 {
            path: path.to_string(),
            source,
        })
}

// ---------------------------------------------------------------------------
// Local checkout
// ---------------------------------------------------------------------------

/// Desired-state files in a local directory (e.g. a clone of the watched
/// repository). Paths are `/`-separated and relative to `root`.
#[derive(Debug, Clone)]
pub struct LocalTree {
    root: PathBuf,
}

impl LocalTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileSource for LocalTree {
    fn list_fingerprints(&self) -> Result<HashMap<String, String>, StoreError> {
        let mut out = HashMap::new();
        for file in collect_files(&self.root)? {
            let Ok(relative) = file.strip_prefix(&self.root) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let bytes = std::fs::read(&file).map_err(|e| io_err(&file, e))?;
            out.insert(key, sha256_hex(&bytes));
        }
        Ok(out)
    }

    fn fetch(&self, path: &str) -> Result<FetchedFile, StoreError> {
        let full = self.root.join(path);
        let content = std::fs::read(&full).map_err(|e| io_err(&full, e))?;
        let fingerprint = sha256_hex(&content);
        Ok(FetchedFile {
            content,
            fingerprint,
        })
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// Every regular file under `root`, skipping `.git`.
fn collect_files(root: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut dirs = vec![root.to_path_buf()];
    let mut files = Vec::new();
    while let Some(current) = dirs.pop() {
        let entries = std::fs::read_dir(&current).map_err(|e| io_err(&current, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&current, e))?;
            let ty = entry.file_type().map_err(|e| io_err(entry.path(), e))?;
            if ty.is_dir() {
                if entry.file_name() != ".git" {
                    dirs.push(entry.path());
                }
            } else if ty.is_file() {
                files.push(entry.path());
            }
        }
    }
    files.sort();
    Ok(files)
}

// ---------------------------------------------------------------------------
// In-memory source for unit tests
// ---------------------------------------------------------------------------
