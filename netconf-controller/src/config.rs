use crate::commands::builtin::value_of;
use crate::controller::ControllerError;
use clap::ArgMatches;
use log::debug;
use netconf_engine::client::{DeviceParams, TransportKind, DEFAULT_NETCONF_PORT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub inner: Arc<Config>,
}

#[derive(Debug)]
pub struct Config {
    pub args: ArgMatches,
    pub inventory_path: PathBuf,
}

impl CliConfig {
    pub fn new(args: ArgMatches) -> Result<CliConfig, ControllerError> {
        let inventory_path = PathBuf::from(value_of::<String>("inventory", &args)?);
        Ok(CliConfig {
            inner: Arc::new(Config {
                args,
                inventory_path,
            }),
        })
    }
}

fn default_port() -> u16 {
    DEFAULT_NETCONF_PORT
}

fn default_transport() -> String {
    TransportKind::Ssh.to_string()
}

/// One device as listed in the inventory file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceEntry {
    pub hostname: String,
    pub ip: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_transport")]
    pub transport: String,
}

impl DeviceEntry {
    pub fn params(&self) -> Result<DeviceParams, ControllerError> {
        let transport = TransportKind::from_str(&self.transport)
            .map_err(|err| ControllerError::Inventory(format!("{}: {}", self.hostname, err)))?;
        Ok(DeviceParams {
            transport,
            ..DeviceParams::ssh(&self.ip, self.port, &self.username, &self.password)
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Inventory {
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

impl Inventory {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Inventory, ControllerError> {
        let path = path.as_ref();
        debug!("Reading inventory '{}'", path.display());
        let content = fs::read_to_string(path).map_err(|err| {
            ControllerError::Inventory(format!("cannot read '{}': {}", path.display(), err))
        })?;
        Inventory::from_str(&content)
    }

    /// Devices keyed by hostname. Duplicate hostnames and unknown transports
    /// are rejected.
    pub fn into_devices(self) -> Result<BTreeMap<String, DeviceEntry>, ControllerError> {
        let mut devices = BTreeMap::new();
        for device in self.devices {
            device.params()?;
            if devices.contains_key(&device.hostname) {
                return Err(ControllerError::Inventory(format!(
                    "duplicate hostname '{}'",
                    device.hostname
                )));
            }
            devices.insert(device.hostname.clone(), device);
        }
        Ok(devices)
    }
}

impl FromStr for Inventory {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_yaml::from_str(s).map_err(|err| ControllerError::Inventory(err.to_string()))
    }
}
