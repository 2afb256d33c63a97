use crate::error::{NetconfError, NetconfResult};
use crate::framer::async_framer::AsyncFramer;
use crate::framer::Framer;
use crate::transport::Transport;
use async_ssh2_lite::{ssh2, AsyncChannel, AsyncSession, SessionConfiguration};
use async_trait::async_trait;
use core::time::Duration;
use log::{debug, warn};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// NETCONF over the SSH `netconf` subsystem of a real device.
pub struct SSHTransport {
    session: AsyncSession<TcpStream>,
    framer: AsyncFramer<AsyncChannel<TcpStream>>,
}

impl SSHTransport {
    pub async fn new_with_session(session: AsyncSession<TcpStream>) -> NetconfResult<SSHTransport> {
        open_netconf_subsystem(session).await
    }

    pub async fn new_with_user_auth(
        addr: &str,
        user_name: &str,
        password: &str,
        connect_timeout: Duration,
    ) -> NetconfResult<SSHTransport> {
        let stream = timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| NetconfError::new(format!("connection to {} timed out", addr)))??;
        let mut configuration = SessionConfiguration::new();
        configuration.set_timeout(connect_timeout.as_millis().min(u32::MAX as u128) as u32);
        let mut session = AsyncSession::new(stream, configuration)?;
        session.handshake().await?;

        debug!(target: addr, "Authenticating as '{}'", user_name);
        session.userauth_password(user_name, password).await?;
        open_netconf_subsystem(session).await
    }
}

#[async_trait]
impl Transport for SSHTransport {
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
        let channel = self.framer.get_mut();
        if let Err(err) = channel.send_eof().await {
            warn!("Failed to send eof on netconf channel: {}", err);
        }
        channel.close().await?;
        channel.wait_close().await?;
        self.session
            .disconnect(Some(ssh2::ByApplication), "Shutdown", None)
            .await?;
        Ok(())
    }

    async fn upgrade(&mut self) {
        self.framer.upgrade().await;
    }
}

async fn open_netconf_subsystem(
    session: AsyncSession<TcpStream>,
) -> NetconfResult<SSHTransport> {
    if !session.authenticated() {
        return Err(NetconfError::new("ssh session is not authenticated".to_string()));
    }
    let mut channel = session.channel_session().await?;
    channel.subsystem("netconf").await?;
    Ok(SSHTransport {
        session,
        framer: AsyncFramer::new(channel),
    })
}
