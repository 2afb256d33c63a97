use crate::connection::Connection;
use crate::datastore::{Datastore, Interface};
use crate::error::{NetconfError, NetconfResult};
use crate::session::{SessionOptions, SessionState};
use crate::transport::{StreamTransport, Transport};
use core::fmt;
use core::str::FromStr;
use core::time::Duration;
use log::{info, warn};

pub const DEFAULT_NETCONF_PORT: u16 = 830;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How the byte channel to a device is opened.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// SSH `netconf` subsystem, for real devices.
    #[default]
    Ssh,
    /// Plain TCP, for the simulator.
    Tcp,
}

impl FromStr for TransportKind {
    type Err = NetconfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ssh" => Ok(TransportKind::Ssh),
            "tcp" => Ok(TransportKind::Tcp),
            _ => Err(NetconfError::new(format!("unknown transport: {}", s))),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Ssh => f.write_str("ssh"),
            TransportKind::Tcp => f.write_str("tcp"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeviceParams {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub transport: TransportKind,
    pub connect_timeout: Duration,
}

impl DeviceParams {
    pub fn ssh(host: &str, port: u16, username: &str, password: &str) -> DeviceParams {
        DeviceParams {
            host: host.to_string(),
            port,
            username: username.to_string(),
            password: password.to_string(),
            transport: TransportKind::Ssh,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn tcp(host: &str, port: u16) -> DeviceParams {
        DeviceParams {
            transport: TransportKind::Tcp,
            ..DeviceParams::ssh(host, port, "", "")
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Controller facing handle to one device. Every data operation requires a
/// live session and fails with `NotConnected` otherwise; rpc errors from the
/// device surface as `RemoteOperationFailed`. No retries happen here.
pub struct NetconfClient {
    params: DeviceParams,
    options: SessionOptions,
    connection: Option<Connection>,
}

impl NetconfClient {
    pub fn new(params: DeviceParams) -> NetconfClient {
        NetconfClient {
            params,
            options: SessionOptions::client(),
            connection: None,
        }
    }

    pub fn with_options(mut self, options: SessionOptions) -> NetconfClient {
        self.options = options;
        self
    }

    pub fn params(&self) -> &DeviceParams {
        &self.params
    }

    pub fn state(&self) -> SessionState {
        self.connection
            .as_ref()
            .map(Connection::state)
            .unwrap_or(SessionState::Init)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.connection.as_ref().map(Connection::session_id)
    }

    /// Opens the channel configured in `DeviceParams` and negotiates.
    pub async fn connect(&mut self) -> NetconfResult<()> {
        if self.is_connected() {
            warn!(target: &self.params.host, "Already connected to device");
            return Ok(());
        }
        let address = self.params.address();
        info!(target: &self.params.host, "Connecting to {} over {}", address, self.params.transport);
        match self.params.transport {
            TransportKind::Tcp => {
                let transport =
                    StreamTransport::connect(&address, self.params.connect_timeout).await?;
                self.connect_with(transport).await
            }
            #[cfg(feature = "ssh")]
            TransportKind::Ssh => {
                let transport = crate::transport::ssh::SSHTransport::new_with_user_auth(
                    &address,
                    &self.params.username,
                    &self.params.password,
                    self.params.connect_timeout,
                )
                .await?;
                self.connect_with(transport).await
            }
            #[cfg(not(feature = "ssh"))]
            TransportKind::Ssh => Err(NetconfError::new(
                "ssh transport requires the `ssh` feature".to_string(),
            )),
        }
    }

    /// Negotiates over an already opened transport.
    pub async fn connect_with<T>(&mut self, transport: T) -> NetconfResult<()>
    where
        T: Transport + 'static,
    {
        let connection =
            Connection::with_options(transport, &self.params.host, self.options.clone()).await?;
        info!(
            target: &self.params.host,
            "Successfully connected, session-id {}",
            connection.session_id()
        );
        self.connection = Some(connection);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_ready()
    }

    fn connection(&mut self) -> NetconfResult<&mut Connection> {
        match self.connection.as_mut() {
            Some(connection) if connection.state().is_ready() => Ok(connection),
            _ => Err(NetconfError::NotConnected),
        }
    }

    pub fn get_capabilities(&self) -> NetconfResult<Vec<String>> {
        match &self.connection {
            Some(connection) => connection.capabilities(),
            None => Err(NetconfError::NotConnected),
        }
    }

    pub async fn get_config(&mut self, source: Datastore) -> NetconfResult<Vec<Interface>> {
        info!(target: &self.params.host, "Retrieving {} configuration", source);
        self.connection()?.get_config(source).await
    }

    pub async fn edit_config(&mut self, target: Datastore, config: &str) -> NetconfResult<()> {
        info!(target: &self.params.host, "Updating {} configuration", target);
        self.connection()?.edit_config(target, config).await
    }

    pub async fn commit(&mut self) -> NetconfResult<()> {
        info!(target: &self.params.host, "Committing configuration");
        self.connection()?.commit().await
    }

    /// Closes the session. The client can `connect` again afterwards.
    pub async fn close(&mut self) -> NetconfResult<()> {
        self.connection()?;
        match self.connection.take() {
            Some(mut connection) => connection.close_session().await,
            None => Err(NetconfError::NotConnected),
        }
    }
}
