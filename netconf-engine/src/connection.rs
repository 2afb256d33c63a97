use crate::datastore::{Datastore, Interface};
use crate::error::{NetconfError, NetconfResult};
use crate::message::{Hello, Rpc, RpcOperation, RpcReply};
use crate::session::{negotiate, Session, SessionOptions, SessionState};
use crate::transport::Transport;
use log::{debug, error, warn};
use quick_xml::de::from_str;

/// Client side of one NETCONF session. Requests are strictly sequential, a
/// connection never has two outstanding rpcs.
pub struct Connection {
    pub(crate) transport: Box<dyn Transport + Send + 'static>,

    session: Session,
    last_message_id: u64,
}

impl Connection {
    pub async fn new<T>(transport: T) -> NetconfResult<Connection>
    where
        T: Transport + 'static,
    {
        Connection::with_options(transport, "device", SessionOptions::client()).await
    }

    /// Performs the hello exchange; the returned connection is `Ready`.
    pub async fn with_options<T>(
        transport: T,
        peer: &str,
        options: SessionOptions,
    ) -> NetconfResult<Connection>
    where
        T: Transport + 'static,
    {
        let mut conn = Connection {
            transport: Box::from(transport),
            session: Session::new(peer),
            last_message_id: 0,
        };
        let hello = Hello::new(options.capabilities);
        let peer_hello = match negotiate(
            conn.transport.as_mut(),
            &mut conn.session,
            &hello,
            options.hello_timeout,
        )
        .await
        {
            Ok(peer_hello) => peer_hello,
            Err(err) => {
                if let Err(close_err) = conn.transport.close().await {
                    debug!(target: peer, "Error closing channel: {}", close_err);
                }
                return Err(err);
            }
        };
        conn.session.set_id(peer_hello.session_id());
        debug!(
            target: peer,
            "Started Netconf session with session-id: {}",
            conn.session.id()
        );
        Ok(conn)
    }

    pub fn session_id(&self) -> &str {
        self.session.id()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Capabilities the device advertised in its hello.
    pub fn capabilities(&self) -> NetconfResult<Vec<String>> {
        self.session.ensure_ready()?;
        Ok(self.session.capabilities().iter().cloned().collect())
    }

    fn next_message_id(&mut self) -> String {
        self.last_message_id += 1;
        self.last_message_id.to_string()
    }

    /// GetConfig implements the `<get-config>` rpc operation defined in [RFC6241 7.1].
    /// `source` is the datastore to query.
    ///
    /// [RFC6241 7.1]: https://www.rfc-editor.org/rfc/rfc6241.html#section-7.1
    pub async fn get_config(&mut self, source: Datastore) -> NetconfResult<Vec<Interface>> {
        let message_id = self.next_message_id();
        let get_config = Rpc::new(message_id, RpcOperation::new_get_config(source));
        let reply = self.run_rpc(get_config).await?;
        Ok(reply.interfaces())
    }

    /// `<edit-config>` ([RFC6241 7.2]) with `config` as the content of the
    /// `<config>` element.
    ///
    /// [RFC6241 7.2]: https://www.rfc-editor.org/rfc/rfc6241.html#section-7.2
    pub async fn edit_config(&mut self, target: Datastore, config: &str) -> NetconfResult<()> {
        let message_id = self.next_message_id();
        let edit_config = Rpc::new(message_id, RpcOperation::new_edit_config(target, config));
        self.run_rpc(edit_config).await?;
        Ok(())
    }

    pub async fn commit(&mut self) -> NetconfResult<()> {
        let message_id = self.next_message_id();
        let commit = Rpc::new(message_id, RpcOperation::Commit);
        self.run_rpc(commit).await?;
        Ok(())
    }

    /// Sends an arbitrary operation body, e.g. `<lock><target><candidate/></target></lock>`.
    pub async fn raw_rpc(&mut self, body: &str) -> NetconfResult<RpcReply> {
        let message_id = self.next_message_id();
        let rpc = Rpc::raw(&message_id, body);
        self.exchange(&message_id, &rpc).await
    }

    /// Sends `<close-session>` and releases the channel. The session is
    /// `Closed` afterwards whatever the outcome.
    pub async fn close_session(&mut self) -> NetconfResult<()> {
        let message_id = self.next_message_id();
        let close_session = Rpc::new(message_id, RpcOperation::CloseSession);
        let result = self.run_rpc(close_session).await;
        self.session.close();
        if let Err(err) = self.transport.close().await {
            debug!(target: self.session.peer(), "Error closing channel: {}", err);
        }
        result.map(|_| ())
    }

    async fn run_rpc(&mut self, rpc: Rpc) -> NetconfResult<RpcReply> {
        let message_id = rpc.message_id().to_string();
        self.exchange(&message_id, &rpc.to_string()).await
    }

    async fn exchange(&mut self, message_id: &str, rpc: &str) -> NetconfResult<RpcReply> {
        self.session.ensure_ready()?;
        debug!(target: self.session.peer(), "RPC:\n{}", rpc);
        let response = match self.transport.write_and_receive(rpc).await {
            Ok(response) => response,
            Err(err) => {
                error!(target: self.session.peer(), "Session {} lost: {}", self.session.id(), err);
                self.session.close();
                return Err(err);
            }
        };
        debug!(target: self.session.peer(), "Reply:\n{}", response);

        let reply: RpcReply = from_str(&response)?;
        if reply.get_message_id() != message_id {
            warn!(
                target: self.session.peer(),
                "Reply message-id {} does not match request {}",
                reply.get_message_id(),
                message_id
            );
            return Err(NetconfError::MessageIdMismatch {
                expected: message_id.to_string(),
                actual: reply.get_message_id().to_string(),
            });
        }
        if reply.has_errors() {
            return Err(NetconfError::RemoteOperationFailed(reply));
        }
        Ok(reply)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if !self.session.state().is_closed() {
            warn!(
                target: self.session.peer(),
                "Netconf session {} dropped without close-session",
                self.session.id()
            );
        }
    }
}
