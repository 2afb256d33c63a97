//! Session state machine shared by the client and the server role.
//!
//! `Init -> Negotiating -> Ready -> Closed`, with any state allowed to fall
//! through to `Closed`. Both roles send their hello first and then wait for
//! the peer's, so negotiation is the same code on either side.

use crate::error::{NetconfError, NetconfResult};
use crate::message::{Hello, UNKNOWN_SESSION_ID};
use crate::transport::Transport;
use crate::{
    CANDIDATE_CAP, CONFIRMED_COMMIT_CAP, IETF_INTERFACES_CAP, IETF_IP_CAP, NETCONF_BASE_10_CAP,
    NETCONF_BASE_11_CAP, WRITABLE_RUNNING_CAP,
};
use core::time::Duration;
use log::{debug, warn};
use std::collections::BTreeSet;
use tokio::time::timeout;

pub const DEFAULT_HELLO_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Channel established, nothing exchanged.
    #[default]
    Init,
    /// Local hello sent, waiting for the peer's.
    Negotiating,
    /// Steady state request/reply exchange.
    Ready,
    /// Terminal.
    Closed,
}

impl SessionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::Closed)
    }
}

/// Local hello content and negotiation bound.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub capabilities: Vec<String>,
    pub hello_timeout: Duration,
}

impl SessionOptions {
    /// Options for the controller side: base protocol versions only.
    pub fn client() -> SessionOptions {
        SessionOptions {
            capabilities: vec![
                NETCONF_BASE_10_CAP.to_string(),
                NETCONF_BASE_11_CAP.to_string(),
            ],
            hello_timeout: DEFAULT_HELLO_TIMEOUT,
        }
    }

    /// Options for a simulated device advertising candidate/running support
    /// and the interface models.
    pub fn device() -> SessionOptions {
        SessionOptions {
            capabilities: [
                NETCONF_BASE_10_CAP,
                NETCONF_BASE_11_CAP,
                WRITABLE_RUNNING_CAP,
                CANDIDATE_CAP,
                CONFIRMED_COMMIT_CAP,
                IETF_INTERFACES_CAP,
                IETF_IP_CAP,
            ]
            .iter()
            .map(|capability| capability.to_string())
            .collect(),
            hello_timeout: DEFAULT_HELLO_TIMEOUT,
        }
    }

    pub fn with_hello_timeout(mut self, hello_timeout: Duration) -> SessionOptions {
        self.hello_timeout = hello_timeout;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> SessionOptions {
        self.capabilities = capabilities;
        self
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions::client()
    }
}

#[derive(Debug)]
pub struct Session {
    id: String,
    peer: String,
    state: SessionState,
    capabilities: BTreeSet<String>,
}

impl Session {
    pub fn new(peer: &str) -> Session {
        Session {
            id: UNKNOWN_SESSION_ID.to_string(),
            peer: peer.to_string(),
            state: SessionState::Init,
            capabilities: BTreeSet::new(),
        }
    }

    pub fn with_id(peer: &str, id: u64) -> Session {
        Session {
            id: id.to_string(),
            ..Session::new(peer)
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Capabilities advertised by the peer.
    pub fn capabilities(&self) -> &BTreeSet<String> {
        &self.capabilities
    }

    pub fn transition(&mut self, to: SessionState) -> NetconfResult<()> {
        use SessionState::*;
        match (self.state, to) {
            (Init, Negotiating) | (Negotiating, Ready) => {}
            (from, Closed) if from != Closed => {}
            (from, to) => return Err(NetconfError::InvalidTransition { from, to }),
        }
        debug!(target: &self.peer, "Session {}: {:?} -> {:?}", self.id, self.state, to);
        self.state = to;
        Ok(())
    }

    pub fn close(&mut self) {
        if !self.state.is_closed() {
            let _ = self.transition(SessionState::Closed);
        }
    }

    pub fn ensure_ready(&self) -> NetconfResult<()> {
        if self.state.is_ready() {
            Ok(())
        } else {
            Err(NetconfError::NotConnected)
        }
    }

    fn established(&mut self, peer_hello: &Hello) -> NetconfResult<()> {
        self.capabilities = peer_hello.capabilities().into_iter().collect();
        self.transition(SessionState::Ready)
    }

    pub(crate) fn set_id(&mut self, id: &str) {
        self.id = id.to_string();
    }
}

/// Sends `local`, waits up to `hello_timeout` for the peer hello and moves the
/// session to `Ready`. Any failure leaves the session `Closed`.
pub async fn negotiate<T: Transport + ?Sized>(
    transport: &mut T,
    session: &mut Session,
    local: &Hello,
    hello_timeout: Duration,
) -> NetconfResult<Hello> {
    session.transition(SessionState::Negotiating)?;
    if let Err(err) = transport.write(&local.to_string()).await {
        session.close();
        return Err(err);
    }

    let response = match timeout(hello_timeout, transport.receive()).await {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            session.close();
            return Err(err);
        }
        Err(_) => {
            warn!(target: session.peer(), "No hello received within {:?}", hello_timeout);
            session.close();
            return Err(NetconfError::NegotiationTimeout(hello_timeout));
        }
    };
    debug!(target: session.peer(), "Hello:\n{}", response);

    let peer_hello = Hello::parse(&response);
    if local.has_capability(NETCONF_BASE_11_CAP) && peer_hello.has_capability(NETCONF_BASE_11_CAP)
    {
        transport.upgrade().await;
    }
    session.established(&peer_hello)?;
    Ok(peer_hello)
}
