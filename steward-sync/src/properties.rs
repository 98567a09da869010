//! Property sync.

use steward_core::client::RepoPatch;
use steward_core::{RepoProperties, RepositorySpec};

use crate::engine::Reconciler;

impl Reconciler {
    /// Patches visibility and commentability when they differ from `actual`.
    pub fn sync_properties(&self, spec: &RepositorySpec, actual: RepoProperties) -> RepoProperties {
        let desired = spec.properties();
        if desired == actual {
            return actual;
        }

        let patch = RepoPatch {
            name: spec.name.clone(),
            path: None,
            private: Some(desired.private),
            commentable: Some(desired.commentable),
        };
        match self.client.update_repo(&self.org, &spec.name, &patch) {
            Ok(()) => {
                tracing::info!(repo = %spec.name, private = desired.private, commentable = desired.commentable, "updated repository properties");
                desired
            }
            Err(err) => {
                tracing::error!(repo = %spec.name, private = desired.private, commentable = desired.commentable, error = %err, "failed to update repository properties");
                actual
            }
        }
    }
}
