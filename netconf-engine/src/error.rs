use crate::message;
use crate::session::SessionState;
use core::time::Duration;
use thiserror::Error;

pub type NetconfResult<T> = Result<T, NetconfError>;

#[derive(Debug, Error)]
pub enum NetconfError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "ssh")]
    #[error(transparent)]
    Ssh(#[from] async_ssh2_lite::Error),
    #[error("malformed message: {0}")]
    MalformedMessage(#[from] quick_xml::DeError),
    #[error("channel closed by peer")]
    ChannelClosed,
    #[error("no hello received from peer within {0:?}")]
    NegotiationTimeout(Duration),
    #[error("remote procedure call failed:\n{0}")]
    RemoteOperationFailed(#[from] message::RpcReply),
    #[error("session is not connected")]
    NotConnected,
    #[error("reply message-id {actual} does not match request message-id {expected}")]
    MessageIdMismatch { expected: String, actual: String },
    #[error("invalid session transition {from:?} -> {to:?}")]
    InvalidTransition { from: SessionState, to: SessionState },
    #[error("unknown datastore {}, (expected {:?})", unknown, expected)]
    UnknownDatastore {
        expected: Vec<String>,
        unknown: String,
    },
    #[error(
        "malformed message chunk (expected {:?}, actual {:?})",
        expected,
        actual
    )]
    MalformedChunk { expected: char, actual: char },
    #[error("Invalid chunk size '{0}'")]
    InvalidChunkSize(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl NetconfError {
    pub fn new(msg: String) -> Self {
        NetconfError::Anyhow(anyhow::Error::msg(msg))
    }

    /// True when the failure means the peer or the channel is gone, as opposed
    /// to a well formed negative answer.
    pub fn is_connection_failure(&self) -> bool {
        match self {
            NetconfError::Io(_)
            | NetconfError::ChannelClosed
            | NetconfError::NegotiationTimeout(_)
            | NetconfError::NotConnected => true,
            #[cfg(feature = "ssh")]
            NetconfError::Ssh(_) => true,
            _ => false,
        }
    }
}
