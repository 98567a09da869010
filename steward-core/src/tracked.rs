//! Fingerprint-gated cache of one decoded desired-state document.

use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::source::FileSource;

/// A desired-state document kind.
///
/// `validate` runs after a successful YAML decode; it may normalize the
/// document in place and rejects documents missing required fields.
pub trait Document: DeserializeOwned {
    fn validate(&mut self) -> Result<(), String>;
}

/// A file whose decoded contents are cached by fingerprint.
///
/// The cached document is only replaced after a successful fetch and
/// decode; a failure leaves the previous document in place.
#[derive(Debug, Clone)]
pub struct TrackedFile<T> {
    path: String,
    fingerprint: String,
    doc: Option<T>,
}

impl<T: Document> TrackedFile<T> {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            fingerprint: String::new(),
            doc: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Fingerprint of the cached document; empty before the first load.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The last successfully decoded document.
    pub fn get(&self) -> Option<&T> {
        self.doc.as_ref()
    }

    /// Re-fetches and decodes the file if `fingerprint` is non-empty and
    /// differs from the cached one. Returns whether the cache changed.
    pub fn refresh(&mut self, fingerprint: &str, source: &dyn FileSource) -> Result<bool, StoreError> {
        if fingerprint.is_empty() || fingerprint == self.fingerprint {
            return Ok(false);
        }

        let fetched = source.fetch(&self.path)?;
        let mut doc: T =
            serde_yaml::from_slice(&fetched.content).map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })?;
        doc.validate().map_err(|reason| StoreError::Invalid {
            path: self.path.clone(),
            reason,
        })?;

        self.doc = Some(doc);
        self.fingerprint = fetched.fingerprint;
        Ok(true)
    }

    /// [`refresh`](Self::refresh) that logs and swallows the error.
    pub fn refresh_logged(&mut self, fingerprint: &str, source: &dyn FileSource) -> bool {
        match self.refresh(fingerprint, source) {
            Ok(changed) => {
                if changed {
                    tracing::debug!(path = %self.path, fingerprint = %self.fingerprint, "reloaded desired-state file");
                }
                changed
            }
            Err(err) => {
                tracing::error!(path = %self.path, error = %err, "failed to refresh desired-state file; keeping cached copy");
                false
            }
        }
    }
}
