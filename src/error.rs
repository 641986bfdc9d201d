//! Error kinds the core distinguishes, each folded into a `tonic::Status`
//! at the RPC boundary so no internal error type crosses the wire.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("RPC call to {address} failed: {source}")]
    Transport {
        address: String,
        #[source]
        source: tonic::Status,
    },

    #[error("failed to dial {address}: {source}")]
    Dial {
        address: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("find exceeded the hop cap without locating a successor")]
    RoutingExhausted,

    #[error("startup failed: {0}")]
    Startup(String),
}

pub type NodeResult<T> = Result<T, NodeError>;

impl From<NodeError> for tonic::Status {
    fn from(err: NodeError) -> Self {
        match err {
            NodeError::NotFound(key) => tonic::Status::not_found(format!("key not found: {key}")),
            NodeError::Transport { address, source } => {
                tonic::Status::unavailable(format!("{address}: {source}"))
            }
            NodeError::Dial { address, source } => {
                tonic::Status::unavailable(format!("{address}: {source}"))
            }
            NodeError::RoutingExhausted => {
                tonic::Status::deadline_exceeded("routing exhausted the hop cap")
            }
            NodeError::Startup(msg) => tonic::Status::internal(msg),
        }
    }
}
