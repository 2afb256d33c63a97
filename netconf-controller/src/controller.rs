use crate::config::{DeviceEntry, Inventory};
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::{debug, error, info, warn};
use netconf_engine::client::NetconfClient;
use netconf_engine::datastore::{Datastore, Interface};
use netconf_engine::error::NetconfError;
use netconf_engine::message::interfaces_config;
use netconf_engine::session::SessionOptions;
use std::collections::BTreeMap;
use std::io;
use std::net::Ipv4Addr;
use std::path::Path;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Device '{0}' not found in inventory")]
    UnknownDevice(String),
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Inventory error: {0}")]
    Inventory(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Netconf(#[from] NetconfError),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl ControllerError {
    /// HTTP-style status for callers that expose the controller remotely.
    pub fn status_code(&self) -> u16 {
        match self {
            ControllerError::Validation(_) => 400,
            ControllerError::UnknownDevice(_) => 404,
            ControllerError::Netconf(err) if err.is_connection_failure() => 503,
            ControllerError::Netconf(NetconfError::RemoteOperationFailed(_)) => 404,
            _ => 500,
        }
    }
}

pub type ControllerResult<T> = Result<T, ControllerError>;

/// Outcome of probing one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub hostname: String,
    pub success: bool,
    pub message: String,
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    pub device: DeviceEntry,
    pub session_id: String,
    pub capabilities: Vec<String>,
    pub running: Vec<Interface>,
}

/// Owns the device inventory and opens a short-lived NETCONF session per
/// operation.
#[derive(Debug, Clone)]
pub struct Controller {
    devices: BTreeMap<String, DeviceEntry>,
    options: SessionOptions,
}

impl Controller {
    pub fn new(inventory: Inventory) -> ControllerResult<Controller> {
        Ok(Controller {
            devices: inventory.into_devices()?,
            options: SessionOptions::client(),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> ControllerResult<Controller> {
        Controller::new(Inventory::from_file(path)?)
    }

    pub fn with_options(mut self, options: SessionOptions) -> Controller {
        self.options = options;
        self
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceEntry> {
        self.devices.values()
    }

    pub fn device(&self, hostname: &str) -> ControllerResult<&DeviceEntry> {
        self.devices
            .get(hostname)
            .ok_or_else(|| ControllerError::UnknownDevice(hostname.to_string()))
    }

    fn client(&self, device: &DeviceEntry) -> ControllerResult<NetconfClient> {
        Ok(NetconfClient::new(device.params()?).with_options(self.options.clone()))
    }

    /// Connects to every device concurrently and reports which ones completed
    /// the hello exchange. Failures are reported per device, never returned.
    pub async fn discover_devices(&self) -> BTreeMap<String, Discovery> {
        let mut futures = FuturesUnordered::new();
        for device in self.devices.values() {
            let hostname = device.hostname.clone();
            let client = self.client(device);
            let handle: JoinHandle<Discovery> = tokio::spawn(async move {
                let mut client = match client {
                    Ok(client) => client,
                    Err(err) => return Discovery::failed(&hostname, &err.to_string()),
                };
                if let Err(err) = client.connect().await {
                    warn!(target: &hostname, "Discovery failed: {}", err);
                    return Discovery::failed(&hostname, &err.to_string());
                }
                let capabilities = client.get_capabilities().unwrap_or_default();
                if let Err(err) = client.close().await {
                    debug!(target: &hostname, "Close after discovery failed: {}", err);
                }
                info!(target: &hostname, "Discovered with {} capabilities", capabilities.len());
                Discovery {
                    hostname: hostname.clone(),
                    success: true,
                    message: "Connected".to_string(),
                    capabilities,
                }
            });
            futures.push(handle);
        }

        let mut results = BTreeMap::new();
        while let Some(handle) = futures.next().await {
            match handle {
                Ok(discovery) => {
                    results.insert(discovery.hostname.clone(), discovery);
                }
                Err(err) => error!("Discovery task failed: {}", err),
            }
        }
        results
    }

    /// Capabilities and running configuration of a single device.
    pub async fn device_status(&self, hostname: &str) -> ControllerResult<DeviceStatus> {
        let device = self.device(hostname)?;
        let mut client = self.client(device)?;
        client.connect().await?;

        let outcome = async {
            let capabilities = client.get_capabilities()?;
            let running = client.get_config(Datastore::Running).await?;
            Ok::<_, NetconfError>((capabilities, running))
        }
        .await;
        let session_id = client.session_id().unwrap_or_default().to_string();
        close_quietly(&mut client, hostname).await;

        let (capabilities, running) = outcome?;
        Ok(DeviceStatus {
            device: device.clone(),
            session_id,
            capabilities,
            running,
        })
    }

    /// Writes an IPv4 address to the candidate datastore and commits it.
    pub async fn configure_interface(
        &self,
        hostname: &str,
        interface: &str,
        ip: &str,
        netmask: &str,
    ) -> ControllerResult<String> {
        let device = self.device(hostname)?;
        validate_interface(interface, ip, netmask)?;
        let config = interfaces_config(&[Interface::new(interface).with_ipv4(ip, netmask)])?;

        let mut client = self.client(device)?;
        client.connect().await?;
        let outcome = async {
            client.edit_config(Datastore::Candidate, &config).await?;
            client.commit().await
        }
        .await;
        close_quietly(&mut client, hostname).await;
        outcome?;

        info!(target: hostname, "Configured {} with {}/{}", interface, ip, netmask);
        Ok(format!(
            "Interface {} on {} configured with {}/{}",
            interface, hostname, ip, netmask
        ))
    }
}

impl Discovery {
    fn failed(hostname: &str, message: &str) -> Discovery {
        Discovery {
            hostname: hostname.to_string(),
            success: false,
            message: message.to_string(),
            capabilities: Vec::new(),
        }
    }
}

async fn close_quietly(client: &mut NetconfClient, hostname: &str) {
    if client.is_connected() {
        if let Err(err) = client.close().await {
            warn!(target: hostname, "Failed to close session: {}", err);
        }
    }
}

fn validate_interface(interface: &str, ip: &str, netmask: &str) -> ControllerResult<()> {
    if interface.trim().is_empty() {
        return Err(ControllerError::Validation(
            "interface name must not be empty".to_string(),
        ));
    }
    ip.parse::<Ipv4Addr>()
        .map_err(|_| ControllerError::Validation(format!("invalid IPv4 address '{}'", ip)))?;
    let mask = netmask
        .parse::<Ipv4Addr>()
        .map_err(|_| ControllerError::Validation(format!("invalid netmask '{}'", netmask)))?;
    let bits = u32::from(mask);
    if bits.leading_ones() + bits.trailing_zeros() != 32 {
        return Err(ControllerError::Validation(format!(
            "netmask '{}' is not contiguous",
            netmask
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use netconf_engine::datastore::SharedConfigStore;
    use netconf_engine::simulator::Simulator;
    use pretty_assertions::assert_eq;
    use std::net::SocketAddr;
    use std::str::FromStr;

    async fn start_simulator() -> (SocketAddr, SharedConfigStore) {
        let simulator = Simulator::bind("127.0.0.1:0").await.unwrap();
        let addr = simulator.local_addr().unwrap();
        let store = simulator.store();
        tokio::spawn(simulator.serve());
        (addr, store)
    }

    fn controller(entries: &[(&str, SocketAddr)]) -> Controller {
        let mut yaml = String::from("devices:\n");
        for (hostname, addr) in entries {
            yaml.push_str(&format!(
                "  - {{hostname: {}, ip: {}, port: {}, transport: tcp}}\n",
                hostname,
                addr.ip(),
                addr.port()
            ));
        }
        Controller::new(Inventory::from_str(&yaml).unwrap()).unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ControllerError::Validation("x".into()).status_code(), 400);
        assert_eq!(ControllerError::UnknownDevice("x".into()).status_code(), 404);
        assert_eq!(
            ControllerError::Netconf(NetconfError::NotConnected).status_code(),
            503
        );
        assert_eq!(ControllerError::Inventory("x".into()).status_code(), 500);
    }

    #[test]
    fn test_validate_interface() {
        assert!(validate_interface("GigabitEthernet1", "10.0.0.1", "255.255.255.0").is_ok());
        assert!(validate_interface("", "10.0.0.1", "255.255.255.0").is_err());
        assert!(validate_interface("eth0", "10.0.0.300", "255.255.255.0").is_err());
        assert!(validate_interface("eth0", "10.0.0.1", "255.0.255.0").is_err());
        assert!(validate_interface("eth0", "10.0.0.1", "0.0.0.0").is_ok());
    }

    #[tokio::test]
    async fn test_unknown_device() {
        let (addr, _) = start_simulator().await;
        let controller = controller(&[("sim-1", addr)]);
        assert_eq!(controller.device_count(), 1);

        let err = controller.device_status("nope").await.unwrap_err();
        assert!(matches!(err, ControllerError::UnknownDevice(_)));
        let err = controller
            .configure_interface("nope", "eth0", "10.0.0.1", "255.255.255.0")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_unreachable_device_is_unavailable() {
        let closed = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let controller = controller(&[("gone", closed)]);

        let err = controller.device_status("gone").await.unwrap_err();
        assert!(matches!(err, ControllerError::Netconf(NetconfError::Io(_))), "{}", err);
        assert_eq!(err.status_code(), 503);

        let err = controller
            .configure_interface("gone", "eth0", "10.0.0.1", "255.255.255.0")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 503);
    }

    #[tokio::test]
    async fn test_configure_then_status() {
        let (addr, store) = start_simulator().await;
        let controller = controller(&[("sim-1", addr)]);

        let message = controller
            .configure_interface("sim-1", "GigabitEthernet1", "10.0.0.1", "255.255.255.0")
            .await
            .unwrap();
        assert!(message.contains("GigabitEthernet1"));

        let status = controller.device_status("sim-1").await.unwrap();
        assert_eq!(status.device.hostname, "sim-1");
        assert_eq!(
            status.running,
            vec![Interface::new("GigabitEthernet1").with_ipv4("10.0.0.1", "255.255.255.0")]
        );
        assert!(status
            .capabilities
            .iter()
            .any(|c| c == netconf_engine::CANDIDATE_CAP));
        assert_eq!(store.get(Datastore::Candidate).await, status.running);

        let err = controller
            .configure_interface("sim-1", "eth0", "bogus", "255.255.255.0")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_discover_devices() {
        let (addr, _) = start_simulator().await;
        let closed = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let controller = controller(&[("sim-1", addr), ("gone", closed)]);

        let results = controller.discover_devices().await;
        assert_eq!(results.len(), 2);
        assert!(results["sim-1"].success);
        assert!(!results["sim-1"].capabilities.is_empty());
        assert!(!results["gone"].success);
        assert!(results["gone"].capabilities.is_empty());
    }
}
