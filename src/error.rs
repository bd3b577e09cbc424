// Error taxonomy shared by the cluster adapter, the locator and the HTTP layer.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::ResourceKind;

/// Machine-readable error kind carried by error bodies and `unavailable` section markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    UnknownKind,
    InvalidIdentity,
    InvalidQuery,
    UpstreamUnavailable,
    PermissionDenied,
}

/// Failures surfaced by a [`crate::cluster::ClusterClient`].
///
/// Cloneable because one in-flight fetch result is handed to every joiner of the response cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    #[error("{kind} {namespace}/{name} was not found")]
    NotFound {
        kind: ResourceKind,
        namespace: String,
        name: String,
    },

    #[error("cluster API unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Timeout variant of an unavailable upstream.
    #[error("cluster API did not answer within {0:?}")]
    Timeout(Duration),

    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

impl ClusterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClusterError::NotFound { .. } => ErrorKind::NotFound,
            ClusterError::UpstreamUnavailable(_) | ClusterError::Timeout(_) => {
                ErrorKind::UpstreamUnavailable
            }
            ClusterError::PermissionDenied(_) => ErrorKind::PermissionDenied,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClusterError::Timeout(_))
    }
}

/// Failures resolving a kind, identity or path against the registered endpoint scheme.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorError {
    #[error("unknown resource kind '{0}'")]
    UnknownKind(String),

    #[error("'{child}' is not a child kind of '{parent}'")]
    UnknownChildKind { parent: String, child: String },

    #[error("invalid {field}: {value:?}")]
    InvalidIdentity { field: &'static str, value: String },

    #[error("path does not match the endpoint scheme: {0}")]
    UnmatchedPath(String),
}

impl LocatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LocatorError::UnknownKind(_) | LocatorError::UnknownChildKind { .. } => {
                ErrorKind::UnknownKind
            }
            LocatorError::InvalidIdentity { .. } | LocatorError::UnmatchedPath(_) => {
                ErrorKind::InvalidIdentity
            }
        }
    }
}
