//! # netconf-engine
//!
//! ```toml
//! netconf-engine = "^0.1.0"
//! ```
//!
//! NETCONF session engine shared by the controller (client role) and the
//! device simulator (server role).
//!
//! ## Example
//!
//! ```no_run
//! use netconf_engine::client::{DeviceParams, NetconfClient};
//! use netconf_engine::datastore::Datastore;
//!
//! # async fn run() -> netconf_engine::error::NetconfResult<()> {
//! let mut client = NetconfClient::new(DeviceParams::tcp("127.0.0.1", 8300));
//! client.connect().await?;
//! let interfaces = client.get_config(Datastore::Running).await?;
//! println!("{} interfaces", interfaces.len());
//! client.close().await?;
//! # Ok(())
//! # }
//! ```
//!
pub mod client;
pub mod connection;
pub mod datastore;
pub mod error;
pub mod framer;
pub mod message;
pub mod rpc;
pub mod server;
pub mod session;
pub mod simulator;
pub mod transport;
pub mod xml;

pub const NETCONF_URN: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";
pub const NETCONF_BASE_10_CAP: &str = "urn:ietf:params:netconf:base:1.0";
pub const NETCONF_BASE_11_CAP: &str = "urn:ietf:params:netconf:base:1.1";
pub const WRITABLE_RUNNING_CAP: &str = "urn:ietf:params:netconf:capability:writable-running:1.0";
pub const CANDIDATE_CAP: &str = "urn:ietf:params:netconf:capability:candidate:1.0";
pub const CONFIRMED_COMMIT_CAP: &str = "urn:ietf:params:netconf:capability:confirmed-commit:1.0";
pub const IETF_INTERFACES_CAP: &str =
    "urn:ietf:params:xml:ns:yang:ietf-interfaces?module=ietf-interfaces&revision=2014-05-08";
pub const IETF_IP_CAP: &str = "urn:ietf:params:xml:ns:yang:ietf-ip?module=ietf-ip&revision=2014-06-16";

pub const IETF_INTERFACES_URN: &str = "urn:ietf:params:xml:ns:yang:ietf-interfaces";
pub const IETF_IP_URN: &str = "urn:ietf:params:xml:ns:yang:ietf-ip";
pub const IANA_IF_TYPE_URN: &str = "urn:ietf:params:xml:ns:yang:iana-if-type";
