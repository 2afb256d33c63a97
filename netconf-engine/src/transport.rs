use crate::error::NetconfResult;
use crate::framer::async_framer::AsyncFramer;
use crate::framer::Framer;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;

#[cfg(feature = "ssh")]
pub mod ssh;

/// Trait for NETCONF transport
#[async_trait]
pub trait Transport: Send {
    async fn receive(&mut self) -> NetconfResult<String>;
    async fn write(&mut self, rpc: &str) -> NetconfResult<()>;
    async fn write_and_receive(&mut self, rpc: &str) -> NetconfResult<String>;
    async fn close(&mut self) -> NetconfResult<()>;
    async fn upgrade(&mut self);
}

/// Transport over an already secured byte stream: a TCP socket to the
/// simulator, or an in-memory pipe.
pub struct StreamTransport<T> {
    framer: AsyncFramer<T>,
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> StreamTransport<T> {
    pub fn new(channel: T) -> Self {
        StreamTransport {
            framer: AsyncFramer::new(channel),
        }
    }
}

impl StreamTransport<TcpStream> {
    pub async fn connect(
        addr: &str,
        connect_timeout: core::time::Duration,
    ) -> NetconfResult<StreamTransport<TcpStream>> {
        let stream = timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connection to {} timed out", addr),
                )
            })??;
        stream.set_nodelay(true)?;
        Ok(StreamTransport::new(stream))
    }
}

#[async_trait]
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for StreamTransport<T> {
    async fn receive(&mut self) -> NetconfResult<String> {
        self.framer.read_async().await
    }

    async fn write(&mut self, rpc: &str) -> NetconfResult<()> {
        self.framer.write_async(rpc).await
    }

    async fn write_and_receive(&mut self, rpc: &str) -> NetconfResult<String> {
        self.framer.write_async(rpc).await?;
        self.framer.read_async().await
    }

    async fn close(&mut self) -> NetconfResult<()> {
        self.framer.shutdown().await
    }

    async fn upgrade(&mut self) {
        self.framer.upgrade().await;
    }
}
