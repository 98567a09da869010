//! Error types for steward-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by a [`HostingClient`](crate::client::HostingClient).
///
/// `AlreadyExists` is split out because the engine treats "the thing I tried
/// to create is already there" as success.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{what} already exists")]
    AlreadyExists { what: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("HTTP {status} from {url}: {message}")]
    Http {
        status: u16,
        url: String,
        message: String,
    },

    #[error("transport error calling {url}: {message}")]
    Transport { url: String, message: String },

    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl ClientError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, ClientError::AlreadyExists { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

/// All errors that can arise while loading desired state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Listing the fingerprinted tree of the watched branch failed.
    #[error("failed to list files of {target}: {source}")]
    Listing {
        target: String,
        #[source]
        source: ClientError,
    },

    /// Fetching a tracked file failed.
    #[error("failed to fetch {path}: {source}")]
    Fetch {
        path: String,
        #[source]
        source: ClientError,
    },

    #[error("invalid base64 content in {path}: {source}")]
    Base64 {
        path: String,
        #[source]
        source: base64::DecodeError,
    },

    /// YAML parse error; carries serde_yaml's line context.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The document parsed but violates a required-field rule.
    #[error("invalid document {path}: {reason}")]
    Invalid { path: String, reason: String },

    /// Local-tree I/O failure.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The repository catalog could not provide an organization name.
    #[error("repository catalog {path} declares no community")]
    MissingOrg { path: String },
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
