use crate::error::{NetconfError, NetconfResult};
use crate::framer::{Framer, Framing, NETCONF_1_0_TERMINATOR, NETCONF_1_1_END_OF_CHUNKS};
use async_trait::async_trait;
use log::{debug, trace};
use memmem::{Searcher, TwoWaySearcher};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const READ_CHUNK_SIZE: usize = 4096;
// Largest chunk-size a 1.1 header may carry.
const MAX_CHUNK_SIZE: u64 = 4_294_967_295;

/// NETCONF message framing over any byte channel.
/// See [RFC6242](https://tools.ietf.org/html/rfc6242#section-4.1)
///
/// Bytes are accumulated in `read_buffer` and a message is only materialized
/// once its delimiter has been seen. Bytes following the delimiter stay
/// buffered as the start of the next message.
pub struct AsyncFramer<T> {
    read_buffer: Vec<u8>,
    // Offset up to which `read_buffer` is known to hold no terminator.
    scanned: usize,
    framing: Framing,

    channel: T,
}

impl<T: AsyncRead + AsyncWrite + Unpin> AsyncFramer<T> {
    pub fn new(channel: T) -> Self {
        AsyncFramer {
            read_buffer: Vec::new(),
            scanned: 0,
            framing: Framing::EndOfMessage,
            channel,
        }
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.channel
    }

    pub async fn shutdown(&mut self) -> NetconfResult<()> {
        self.channel.shutdown().await?;
        Ok(())
    }

    fn decode(&mut self) -> NetconfResult<Option<String>> {
        match self.framing {
            Framing::EndOfMessage => Ok(self.decode_end_of_message()),
            Framing::Chunked => self.decode_chunked(),
        }
    }

    fn decode_end_of_message(&mut self) -> Option<String> {
        let terminator = NETCONF_1_0_TERMINATOR.as_bytes();
        let search = TwoWaySearcher::new(terminator);
        match search.search_in(&self.read_buffer[self.scanned..]) {
            Some(offset) => {
                let pos = self.scanned + offset;
                let message = String::from_utf8_lossy(&self.read_buffer[..pos])
                    .trim_end()
                    .to_string();
                self.read_buffer.drain(..pos + terminator.len());
                self.scanned = 0;
                Some(message)
            }
            None => {
                // A terminator split across reads starts in the last few bytes.
                self.scanned = self
                    .read_buffer
                    .len()
                    .saturating_sub(terminator.len() - 1);
                None
            }
        }
    }

    fn decode_chunked(&mut self) -> NetconfResult<Option<String>> {
        let mut pos = 0;
        let mut message = Vec::new();
        loop {
            let buffer = &self.read_buffer[pos..];
            if buffer.len() < NETCONF_1_1_END_OF_CHUNKS.len() {
                return Ok(None);
            }
            if buffer[0] != b'\n' {
                return Err(NetconfError::MalformedChunk {
                    expected: '\n',
                    actual: buffer[0].into(),
                });
            }
            if buffer[1] != b'#' {
                return Err(NetconfError::MalformedChunk {
                    expected: '#',
                    actual: buffer[1].into(),
                });
            }
            if buffer[2] == b'#' {
                if buffer[3] != b'\n' {
                    return Err(NetconfError::MalformedChunk {
                        expected: '\n',
                        actual: buffer[3].into(),
                    });
                }
                let response = String::from_utf8_lossy(&message).trim_end().to_string();
                self.read_buffer.drain(..pos + NETCONF_1_1_END_OF_CHUNKS.len());
                return Ok(Some(response));
            }

            let header = &buffer[2..];
            let header_end = header.iter().position(|b| *b == b'\n');
            let digits = &header[..header_end.unwrap_or(header.len())];
            let mut chunk_size: u64 = 0;
            for digit in digits {
                if !digit.is_ascii_digit() {
                    return Err(NetconfError::MalformedChunk {
                        expected: '0',
                        actual: (*digit).into(),
                    });
                }
                chunk_size = chunk_size
                    .checked_mul(10)
                    .and_then(|size| size.checked_add(u64::from(digit - b'0')))
                    .filter(|size| *size <= MAX_CHUNK_SIZE)
                    .ok_or_else(|| {
                        NetconfError::InvalidChunkSize(String::from_utf8_lossy(digits).to_string())
                    })?;
            }
            let Some(header_end) = header_end else {
                return Ok(None);
            };
            if chunk_size == 0 {
                return Err(NetconfError::InvalidChunkSize("0".to_string()));
            }
            let chunk_size = usize::try_from(chunk_size)
                .map_err(|_| NetconfError::InvalidChunkSize(chunk_size.to_string()))?;
            let start = 2 + header_end + 1;
            if buffer.len() - start < chunk_size {
                return Ok(None);
            }
            message.extend_from_slice(&buffer[start..start + chunk_size]);
            pos += start + chunk_size;
        }
    }
}

#[async_trait]
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Framer for AsyncFramer<T> {
    async fn upgrade(&mut self) {
        debug!("Switching to chunked framing");
        self.framing = Framing::Chunked;
        self.scanned = 0;
    }

    async fn read_async(&mut self) -> NetconfResult<String> {
        let mut buffer = [0u8; READ_CHUNK_SIZE];
        loop {
            if let Some(message) = self.decode()? {
                trace!("Received:\n{}", message);
                return Ok(message);
            }
            let bytes = self.channel.read(&mut buffer).await?;
            if bytes == 0 {
                return Err(NetconfError::ChannelClosed);
            }
            self.read_buffer.extend_from_slice(&buffer[..bytes]);
        }
    }

    async fn write_async(&mut self, rpc: &str) -> NetconfResult<()> {
        trace!("Sending:\n{}", rpc);
        let bytes = rpc.as_bytes();
        let mut frame = Vec::with_capacity(bytes.len() + 16);
        match self.framing {
            Framing::Chunked => {
                frame.extend_from_slice(format!("\n#{}\n", bytes.len()).as_bytes());
                frame.extend_from_slice(bytes);
                frame.extend_from_slice(NETCONF_1_1_END_OF_CHUNKS.as_bytes());
            }
            Framing::EndOfMessage => {
                frame.extend_from_slice(bytes);
                frame.extend_from_slice(NETCONF_1_0_TERMINATOR.as_bytes());
            }
        }
        self.channel.write_all(&frame).await?;
        self.channel.flush().await?;
        Ok(())
    }
}
