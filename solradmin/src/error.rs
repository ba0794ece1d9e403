//! Cluster-specific error types

use thiserror::Error;

/// Errors that can occur while talking to the cluster or reading its topology
#[derive(Error, Debug, Clone)]
pub enum ClusterError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// `reached_server` is set when some attempt failed after the request
    /// may already have been delivered
    #[error("Giving up after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: String,
        reached_server: bool,
    },

    #[error("Unexpected admin response: {0}")]
    UnexpectedResponse(String),

    #[error("Malformed topology: {0}")]
    MalformedTopology(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Metadata read failed: {0}")]
    Metadata(String),

    #[error("Invalid node name '{0}': expected host:port_context")]
    InvalidNodeName(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl ClusterError {
    /// Get the error type as a string for metrics labeling
    pub fn error_type(&self) -> &'static str {
        match self {
            ClusterError::Connection(_) => "connection",
            ClusterError::Timeout(_) => "timeout",
            ClusterError::Transport(_) => "transport",
            ClusterError::RetriesExhausted { .. } => "retries_exhausted",
            ClusterError::UnexpectedResponse(_) => "unexpected_response",
            ClusterError::MalformedTopology(_) => "malformed_topology",
            ClusterError::CollectionNotFound(_) => "collection_not_found",
            ClusterError::Metadata(_) => "metadata",
            ClusterError::InvalidNodeName(_) => "invalid_node_name",
            ClusterError::Config(_) => "config",
            ClusterError::Serialization(_) => "serialization",
            ClusterError::Io(_) => "io",
        }
    }

    /// Transport-level failures are the only ones worth resending
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClusterError::Connection(_) | ClusterError::Timeout(_) | ClusterError::Transport(_)
        )
    }

    /// Whether the cluster may have acted on a request that returned this error.
    ///
    /// A refused connection never delivered anything; a timeout or a broken
    /// exchange may have.
    pub fn may_have_reached_server(&self) -> bool {
        match self {
            ClusterError::Timeout(_) | ClusterError::Transport(_) => true,
            ClusterError::RetriesExhausted { reached_server, .. } => *reached_server,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ClusterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClusterError::Timeout(err.to_string())
        } else if err.is_connect() {
            ClusterError::Connection(err.to_string())
        } else if err.is_builder() {
            ClusterError::Config(err.to_string())
        } else {
            ClusterError::Transport(err.to_string())
        }
    }
}

impl From<std::io::Error> for ClusterError {
    fn from(err: std::io::Error) -> Self {
        ClusterError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ClusterError {
    fn from(err: serde_json::Error) -> Self {
        ClusterError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for ClusterError {
    fn from(err: url::ParseError) -> Self {
        ClusterError::Config(format!("invalid URL: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, ClusterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ClusterError::Connection("refused".into()).is_retryable());
        assert!(ClusterError::Timeout("slow".into()).is_retryable());
        assert!(ClusterError::Transport("reset".into()).is_retryable());
        assert!(!ClusterError::MalformedTopology("bad".into()).is_retryable());
        assert!(!ClusterError::RetriesExhausted {
            attempts: 4,
            last_error: "refused".into(),
            reached_server: false,
        }
        .is_retryable());
    }

    #[test]
    fn test_delivery_uncertainty() {
        assert!(!ClusterError::Connection("refused".into()).may_have_reached_server());
        assert!(ClusterError::Timeout("slow".into()).may_have_reached_server());
        assert!(ClusterError::Transport("reset".into()).may_have_reached_server());
        assert!(ClusterError::RetriesExhausted {
            attempts: 3,
            last_error: "slow".into(),
            reached_server: true,
        }
        .may_have_reached_server());
        assert!(!ClusterError::UnexpectedResponse("bad".into()).may_have_reached_server());
    }

    #[test]
    fn test_error_type_labels() {
        assert_eq!(
            ClusterError::CollectionNotFound("c1".into()).error_type(),
            "collection_not_found"
        );
        assert_eq!(ClusterError::Io("disk".into()).error_type(), "io");
    }
}
