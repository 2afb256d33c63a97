use crate::error::NetconfResult;
use async_trait::async_trait;

pub mod async_framer;

pub const NETCONF_1_0_TERMINATOR: &str = "]]>]]>";
pub const NETCONF_1_1_END_OF_CHUNKS: &str = "\n##\n";

/// Framing mode of a session. Hellos are always end-of-message framed,
/// chunked framing is switched on once both peers advertised base:1.1.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    #[default]
    EndOfMessage,
    Chunked,
}

/// Trait for NETCONF framer
#[async_trait]
pub trait Framer: Send {
    async fn upgrade(&mut self);
    /// Reads one complete message. Fails with `ChannelClosed` once the peer
    /// closed the stream.
    async fn read_async(&mut self) -> NetconfResult<String>;
    async fn write_async(&mut self, rpc: &str) -> NetconfResult<()>;
}
