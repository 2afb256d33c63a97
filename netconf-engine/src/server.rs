use crate::datastore::SharedConfigStore;
use crate::error::{NetconfError, NetconfResult};
use crate::message::{Hello, XML_DECLARATION};
use crate::rpc::{dispatch, RpcRequest};
use crate::session::{negotiate, Session, SessionOptions, SessionState};
use crate::transport::Transport;
use log::{debug, error, info};

/// Device role of one session: sends the hello, then answers requests
/// against the shared store until the peer closes the channel or a
/// `<close-session>` has been answered.
pub struct ServerSession<T> {
    transport: T,
    session: Session,
    session_id: u64,
    store: SharedConfigStore,
    options: SessionOptions,
}

impl<T: Transport> ServerSession<T> {
    pub fn new(
        transport: T,
        peer: &str,
        session_id: u64,
        store: SharedConfigStore,
        options: SessionOptions,
    ) -> ServerSession<T> {
        ServerSession {
            transport,
            session: Session::with_id(peer, session_id),
            session_id,
            store,
            options,
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub async fn run(mut self) -> NetconfResult<()> {
        let result = self.serve().await;
        self.session.close();
        if let Err(err) = self.transport.close().await {
            debug!(target: self.session.peer(), "Error closing channel: {}", err);
        }
        result
    }

    async fn serve(&mut self) -> NetconfResult<()> {
        let hello = Hello::with_session_id(self.options.capabilities.clone(), self.session_id);
        negotiate(
            &mut self.transport,
            &mut self.session,
            &hello,
            self.options.hello_timeout,
        )
        .await?;
        info!(target: self.session.peer(), "Session {} negotiated", self.session.id());

        loop {
            let message = match self.transport.receive().await {
                Ok(message) => message,
                Err(NetconfError::ChannelClosed) => {
                    info!(target: self.session.peer(), "Connection closed by client");
                    return Ok(());
                }
                Err(err) => {
                    error!(target: self.session.peer(), "Error receiving rpc: {}", err);
                    return Err(err);
                }
            };
            debug!(target: self.session.peer(), "RPC:\n{}", message);

            let request = RpcRequest::parse(&message);
            let reply = dispatch(&request, &self.store).await;
            self.transport
                .write(&format!("{}\n{}", XML_DECLARATION, reply))
                .await?;

            if request.is_close_session() {
                info!(target: self.session.peer(), "Session {} closed", self.session.id());
                return Ok(());
            }
        }
    }
}
