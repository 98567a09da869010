//! Domain types for desired and actual repository state.
//!
//! Desired-state documents (`RepoCatalog`, `SigCatalog`, `RepoOwners`) are
//! deserialized from YAML via serde + serde_yaml and normalized by their
//! [`Document::validate`] hook. `ActualRepoState` is the controller's view of
//! what was last applied to a repository.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tracked::Document;

/// Branch created by `auto_init` when a repository is created, and the
/// fallback source for branches that declare no `create_from`.
pub const DEFAULT_BRANCH: &str = "master";

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Repository visibility, the `type` field of a repository entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn is_private(self) -> bool {
        matches!(self, Visibility::Private)
    }
}

impl TryFrom<String> for Visibility {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            other => Err(format!(
                "unknown repository type '{other}'; expected: public, private"
            )),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

/// Protection kind of a branch. Any declared type other than `protected`
/// reads as `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum BranchKind {
    #[default]
    Normal,
    Protected,
}

impl BranchKind {
    pub fn is_protected(self) -> bool {
        matches!(self, BranchKind::Protected)
    }
}

impl From<String> for BranchKind {
    fn from(s: String) -> Self {
        if s.trim().eq_ignore_ascii_case("protected") {
            Self::Protected
        } else {
            Self::Normal
        }
    }
}

impl From<bool> for BranchKind {
    fn from(protected: bool) -> Self {
        if protected {
            Self::Protected
        } else {
            Self::Normal
        }
    }
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchKind::Normal => write!(f, "normal"),
            BranchKind::Protected => write!(f, "protected"),
        }
    }
}

// ---------------------------------------------------------------------------
// Desired state
// ---------------------------------------------------------------------------

/// A branch as declared in the repository catalog, also used as the record
/// of an actual branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: BranchKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_from: Option<String>,
}

impl BranchSpec {
    pub fn new(name: impl Into<String>, kind: BranchKind) -> Self {
        Self {
            name: name.into(),
            kind,
            create_from: None,
        }
    }

    /// Branch this one is created from; [`DEFAULT_BRANCH`] when unset.
    pub fn source(&self) -> &str {
        match self.create_from.as_deref() {
            Some(from) if !from.trim().is_empty() => from,
            _ => DEFAULT_BRANCH,
        }
    }
}

/// Role lists declared on a repository entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleMembers {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub viewers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reporters: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub developers: Vec<String>,
}

/// A repository entry of the repository catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySpec {
    pub name: String,
    #[serde(rename = "type")]
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename_from: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub commentable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protected_branches: Vec<String>,
    #[serde(default)]
    pub branches: Vec<BranchSpec>,
    #[serde(flatten)]
    pub members: RoleMembers,
}

impl RepositorySpec {
    pub fn new(name: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            name: name.into(),
            visibility,
            rename_from: None,
            description: String::new(),
            commentable: false,
            protected_branches: vec![],
            branches: vec![],
            members: RoleMembers::default(),
        }
    }

    pub fn is_private(&self) -> bool {
        self.visibility.is_private()
    }

    /// The previous name this repository should be renamed from, if any.
    pub fn rename_source(&self) -> Option<&str> {
        self.rename_from
            .as_deref()
            .map(str::trim)
            .filter(|from| !from.is_empty() && *from != self.name)
    }

    /// Desired `(private, commentable)` pair.
    pub fn properties(&self) -> RepoProperties {
        RepoProperties {
            private: self.is_private(),
            commentable: self.commentable,
        }
    }

    /// Folds `protected_branches` into `branches` as protected entries.
    ///
    /// A name present in both lists becomes a single protected branch that
    /// keeps its declared `create_from`.
    pub fn fold_protected_branches(&mut self) {
        for name in std::mem::take(&mut self.protected_branches) {
            let name = name.trim().to_string();
            if name.is_empty() {
                continue;
            }
            match self.branches.iter_mut().find(|b| b.name == name) {
                Some(branch) => branch.kind = BranchKind::Protected,
                None => self.branches.push(BranchSpec::new(name, BranchKind::Protected)),
            }
        }
    }

    fn validate(&mut self) -> Result<(), String> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err("repository entry without a name".to_string());
        }
        for branch in &mut self.branches {
            branch.name = branch.name.trim().to_string();
        }
        if let Some(branch) = self.branches.iter().find(|b| b.name.is_empty()) {
            return Err(format!(
                "repository '{}' declares a branch without a name (create_from: {:?})",
                self.name, branch.create_from
            ));
        }
        self.fold_protected_branches();
        Ok(())
    }
}

/// The repository catalog: one organization and its repositories.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepoCatalog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub community: String,
    #[serde(default)]
    pub repositories: Vec<RepositorySpec>,
}

impl RepoCatalog {
    pub fn org(&self) -> &str {
        &self.community
    }

    /// Repositories keyed by name; later duplicates win.
    pub fn by_name(&self) -> BTreeMap<&str, &RepositorySpec> {
        self.repositories
            .iter()
            .map(|repo| (repo.name.as_str(), repo))
            .collect()
    }
}

impl Document for RepoCatalog {
    fn validate(&mut self) -> Result<(), String> {
        self.community = self.community.trim().to_string();
        if self.community.is_empty() {
            return Err("missing 'community'".to_string());
        }
        for repo in &mut self.repositories {
            repo.validate()?;
        }
        Ok(())
    }
}

/// A special interest group owning a set of repositories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sig {
    pub name: String,
    #[serde(default)]
    pub repositories: Vec<String>,
}

/// Strips an `org/` prefix: `openeuler/kernel` becomes `kernel`.
pub fn bare_repo_name(name: &str) -> &str {
    let name = name.trim();
    match name.rsplit_once('/') {
        Some((_, bare)) => bare,
        None => name,
    }
}

/// The SIG catalog.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SigCatalog {
    #[serde(default)]
    pub sigs: Vec<Sig>,
}

impl SigCatalog {
    /// Repositories claimed by more than one SIG, with their claim count.
    pub fn multi_claimed(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::<String, usize>::new();
        for sig in &self.sigs {
            let unique: BTreeSet<&str> = sig.repositories.iter().map(String::as_str).collect();
            for repo in unique {
                *counts.entry(repo.to_string()).or_default() += 1;
            }
        }
        counts.retain(|_, n| *n > 1);
        counts
    }
}

impl Document for SigCatalog {
    fn validate(&mut self) -> Result<(), String> {
        for sig in &mut self.sigs {
            sig.name = sig.name.trim().to_string();
            if sig.name.is_empty() {
                return Err("sig entry without a name".to_string());
            }
            sig.repositories = sig
                .repositories
                .iter()
                .map(|r| bare_repo_name(r).to_string())
                .filter(|r| !r.is_empty())
                .collect();
        }
        Ok(())
    }
}

/// A SIG's OWNERS file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepoOwners {
    #[serde(default)]
    pub maintainers: Vec<String>,
    #[serde(default)]
    pub committers: Vec<String>,
}

impl RepoOwners {
    /// Lower-cased, de-duplicated union of maintainers and committers.
    pub fn owners(&self) -> Vec<String> {
        self.maintainers
            .iter()
            .chain(&self.committers)
            .map(|login| login.trim().to_lowercase())
            .filter(|login| !login.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl Document for RepoOwners {
    fn validate(&mut self) -> Result<(), String> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Actual state
// ---------------------------------------------------------------------------

/// Settable repository properties compared by the property sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepoProperties {
    pub private: bool,
    pub commentable: bool,
}

/// Last-synchronized view of a repository.
///
/// `owner` is `None` until the repository metadata has been fetched; an
/// empty `branches` list means the branches have not been listed yet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActualRepoState {
    pub available: bool,
    #[serde(default)]
    pub branches: Vec<BranchSpec>,
    #[serde(default)]
    pub members: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub properties: RepoProperties,
}

impl ActualRepoState {
    pub fn absent() -> Self {
        Self::default()
    }
}

/// Lower-cases member logins for set comparisons.
pub fn normalize_members<I, S>(logins: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    logins
        .into_iter()
        .map(|login| login.as_ref().trim().to_lowercase())
        .filter(|login| !login.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
