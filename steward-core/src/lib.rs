//! Steward core library: domain types, hosting-client interface,
//! desired-state store, actual-state registry, errors.
//!
//! - [`types`]: desired-state documents and actual repository state
//! - [`client`]: [`HostingClient`] and its payload types
//! - [`tracked`]: fingerprint-gated [`TrackedFile`]
//! - [`source`]: [`FileSource`] implementations
//! - [`desired`]: [`DesiredState`]
//! - [`registry`]: [`ActualStateRegistry`] and single-flight [`RepoHandle`]

pub mod client;
pub mod desired;
pub mod error;
pub mod registry;
pub mod source;
pub mod tracked;
pub mod types;

pub use client::HostingClient;
pub use desired::{CheckReport, DesiredPaths, DesiredState};
pub use error::{ClientError, StoreError};
pub use registry::{ActualStateRegistry, RepoHandle, UpdateOutcome};
pub use source::{FileSource, LocalTree, RepoBranch, WatchedBranch};
pub use tracked::{Document, TrackedFile};
pub use types::{
    ActualRepoState, BranchKind, BranchSpec, RepoCatalog, RepoOwners, RepoProperties,
    RepositorySpec, Sig, SigCatalog, Visibility, DEFAULT_BRANCH,
};
