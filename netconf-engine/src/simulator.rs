use crate::datastore::SharedConfigStore;
use crate::error::NetconfResult;
use crate::server::ServerSession;
use crate::session::SessionOptions;
use crate::transport::StreamTransport;
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};

/// A NETCONF speaking stand-in for a network device. Every accepted
/// connection gets its own session task; all of them share one store.
pub struct Simulator {
    listener: TcpListener,
    store: SharedConfigStore,
    options: SessionOptions,
    next_session_id: Arc<AtomicU64>,
}

impl Simulator {
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> NetconfResult<Simulator> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Simulator {
            listener,
            store: SharedConfigStore::default(),
            options: SessionOptions::device(),
            next_session_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn with_options(mut self, options: SessionOptions) -> Simulator {
        self.options = options;
        self
    }

    pub fn with_store(mut self, store: SharedConfigStore) -> Simulator {
        self.store = store;
        self
    }

    pub fn local_addr(&self) -> NetconfResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn store(&self) -> SharedConfigStore {
        self.store.clone()
    }

    pub async fn serve(self) -> NetconfResult<()> {
        info!("NETCONF simulator listening on {}", self.local_addr()?);
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!("Failed to accept connection: {}", err);
                    continue;
                }
            };
            if let Err(err) = stream.set_nodelay(true) {
                warn!("Dropping connection from {}: {}", peer, err);
                continue;
            }
            let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
            info!("Received connection from {}, session-id {}", peer, session_id);

            let session = ServerSession::new(
                StreamTransport::new(stream),
                &peer.to_string(),
                session_id,
                self.store.clone(),
                self.options.clone(),
            );
            tokio::spawn(async move {
                if let Err(err) = session.run().await {
                    error!("Session {} with {} failed: {}", session_id, peer, err);
                }
            });
        }
    }
}
