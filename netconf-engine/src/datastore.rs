use crate::error::{NetconfError, NetconfResult};
use crate::xml::Element;
use core::fmt;
use core::str::FromStr;
use log::{debug, info};
use serde_derive::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const DEFAULT_INTERFACE_TYPE: &str = "ianaift:ethernetCsmacd";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Datastore {
    Candidate,
    Running,
}

impl Datastore {
    pub fn as_str(&self) -> &'static str {
        match self {
            Datastore::Candidate => "candidate",
            Datastore::Running => "running",
        }
    }
}

impl fmt::Display for Datastore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Datastore {
    type Err = NetconfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let datastore = s.trim().to_lowercase();
        match datastore.as_str() {
            "running" => Ok(Datastore::Running),
            "candidate" => Ok(Datastore::Candidate),
            _ => Err(NetconfError::UnknownDatastore {
                expected: vec!["running".to_string(), "candidate".to_string()],
                unknown: datastore,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Address {
    pub ip: String,
    pub netmask: String,
}

/// One managed interface, keyed by `name`. No `ipv4` means no L3 config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub if_type: String,
    pub enabled: bool,
    pub ipv4: Option<Ipv4Address>,
}

impl Interface {
    pub fn new(name: &str) -> Interface {
        Interface {
            name: name.to_string(),
            if_type: DEFAULT_INTERFACE_TYPE.to_string(),
            enabled: true,
            ipv4: None,
        }
    }

    pub fn with_ipv4(mut self, ip: &str, netmask: &str) -> Interface {
        self.ipv4 = Some(Ipv4Address {
            ip: ip.to_string(),
            netmask: netmask.to_string(),
        });
        self
    }
}

/// A partial interface update as carried by `<edit-config>`. Fields left as
/// `None` keep whatever the datastore already holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceEdit {
    pub name: String,
    pub if_type: Option<String>,
    pub enabled: Option<bool>,
    pub ipv4: Option<Ipv4Address>,
}

impl InterfaceEdit {
    /// Reads every `<interface>` below `config`. Fails with a description of
    /// the missing element when any entry is incomplete.
    pub fn from_config(config: &Element) -> Result<Vec<InterfaceEdit>, String> {
        let interfaces = config.find_all("interface");
        if interfaces.is_empty() {
            return Err("missing <interface> element".to_string());
        }
        interfaces.into_iter().map(InterfaceEdit::from_element).collect()
    }

    fn from_element(interface: &Element) -> Result<InterfaceEdit, String> {
        let name = interface
            .child_text("name")
            .ok_or_else(|| "missing <name> element in <interface>".to_string())?;
        let enabled = interface
            .child_text("enabled")
            .map(|enabled| enabled.eq_ignore_ascii_case("true") || enabled == "1");
        let ipv4 = match interface.child("ipv4").and_then(|ipv4| ipv4.child("address")) {
            Some(address) => {
                let ip = address
                    .child_text("ip")
                    .ok_or_else(|| format!("missing <ip> element for interface {}", name))?;
                let netmask = address
                    .child_text("netmask")
                    .ok_or_else(|| format!("missing <netmask> element for interface {}", name))?;
                Some(Ipv4Address {
                    ip: ip.to_string(),
                    netmask: netmask.to_string(),
                })
            }
            None => None,
        };
        Ok(InterfaceEdit {
            name: name.to_string(),
            if_type: interface.child_text("type").map(str::to_string),
            enabled,
            ipv4,
        })
    }

    fn apply(self, base: Option<Interface>) -> Interface {
        let mut interface = base.unwrap_or_else(|| Interface::new(&self.name));
        if let Some(if_type) = self.if_type {
            interface.if_type = if_type;
        }
        if let Some(enabled) = self.enabled {
            interface.enabled = enabled;
        }
        if self.ipv4.is_some() {
            interface.ipv4 = self.ipv4;
        }
        interface
    }
}

/// Device side candidate and running datastores.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    candidate: BTreeMap<String, Interface>,
    running: BTreeMap<String, Interface>,
}

impl ConfigStore {
    pub fn new() -> ConfigStore {
        ConfigStore::default()
    }

    fn datastore(&self, datastore: Datastore) -> &BTreeMap<String, Interface> {
        match datastore {
            Datastore::Candidate => &self.candidate,
            Datastore::Running => &self.running,
        }
    }

    fn datastore_mut(&mut self, datastore: Datastore) -> &mut BTreeMap<String, Interface> {
        match datastore {
            Datastore::Candidate => &mut self.candidate,
            Datastore::Running => &mut self.running,
        }
    }

    /// Snapshot of a datastore, ordered by interface name.
    pub fn get(&self, datastore: Datastore) -> Vec<Interface> {
        self.datastore(datastore).values().cloned().collect()
    }

    pub fn put(&mut self, datastore: Datastore, interface: Interface) -> NetconfResult<()> {
        if interface.name.trim().is_empty() {
            return Err(NetconfError::new(
                "interface name must not be empty".to_string(),
            ));
        }
        self.datastore_mut(datastore)
            .insert(interface.name.clone(), interface);
        Ok(())
    }

    /// Merges an edit into `datastore`. Edits to candidate start from the
    /// running entry when candidate does not hold the interface yet.
    pub fn merge(&mut self, datastore: Datastore, edit: InterfaceEdit) -> NetconfResult<Interface> {
        let base = self
            .datastore(datastore)
            .get(&edit.name)
            .or_else(|| match datastore {
                Datastore::Candidate => self.running.get(&edit.name),
                Datastore::Running => None,
            })
            .cloned();
        let interface = edit.apply(base);
        self.put(datastore, interface.clone())?;
        Ok(interface)
    }

    /// Copies every candidate entry into running. Entries that only exist in
    /// running are kept. Returns the number of entries copied.
    pub fn commit(&mut self) -> usize {
        for (name, interface) in &self.candidate {
            self.running.insert(name.clone(), interface.clone());
        }
        self.candidate.len()
    }
}

/// Handle to a `ConfigStore` shared by all sessions of one device. Every
/// operation runs under the same lock.
#[derive(Debug, Default, Clone)]
pub struct SharedConfigStore {
    inner: Arc<Mutex<ConfigStore>>,
}

impl SharedConfigStore {
    pub fn new(store: ConfigStore) -> SharedConfigStore {
        SharedConfigStore {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub async fn get(&self, datastore: Datastore) -> Vec<Interface> {
        self.inner.lock().await.get(datastore)
    }

    pub async fn put(&self, datastore: Datastore, interface: Interface) -> NetconfResult<()> {
        self.inner.lock().await.put(datastore, interface)
    }

    /// Applies all edits as one unit. Edits are staged on a copy, so a failing
    /// edit leaves the store untouched.
    pub async fn edit(
        &self,
        datastore: Datastore,
        edits: Vec<InterfaceEdit>,
    ) -> NetconfResult<Vec<Interface>> {
        let mut store = self.inner.lock().await;
        let mut staged = store.clone();
        let mut applied = Vec::with_capacity(edits.len());
        for edit in edits {
            applied.push(staged.merge(datastore, edit)?);
        }
        *store = staged;
        for interface in &applied {
            match &interface.ipv4 {
                Some(ipv4) => info!(
                    "Configured interface {} with IP {}/{} in {}",
                    interface.name, ipv4.ip, ipv4.netmask, datastore
                ),
                None => info!("Configured interface {} in {}", interface.name, datastore),
            }
        }
        Ok(applied)
    }

    pub async fn commit(&self) -> usize {
        let committed = self.inner.lock().await.commit();
        debug!("Committed {} candidate interfaces to running", committed);
        committed
    }

    pub async fn snapshot(&self) -> ConfigStore {
        self.inner.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn edit(xml: &str) -> Vec<InterfaceEdit> {
        InterfaceEdit::from_config(&Element::parse(xml).unwrap()).unwrap()
    }

    #[test]
    fn test_datastore_from_str() {
        assert_eq!(Datastore::from_str("Running").unwrap(), Datastore::Running);
        assert_eq!(
            Datastore::from_str(" candidate ").unwrap(),
            Datastore::Candidate
        );
        assert!(matches!(
            Datastore::from_str("startup"),
            Err(NetconfError::UnknownDatastore { .. })
        ));
    }

    #[test]
    fn test_edit_from_config() {
        let edits = edit(
            r#"<config>
  <interfaces xmlns="urn:ietf:params:xml:ns:yang:ietf-interfaces">
    <interface>
      <name>Gi0/1</name>
      <type xmlns:ianaift="urn:ietf:params:xml:ns:yang:iana-if-type">ianaift:ethernetCsmacd</type>
      <enabled>false</enabled>
      <ipv4 xmlns="urn:ietf:params:xml:ns:yang:ietf-ip">
        <address><ip>10.0.0.1</ip><netmask>255.255.255.0</netmask></address>
      </ipv4>
    </interface>
  </interfaces>
</config>"#,
        );
        assert_eq!(
            edits,
            vec![InterfaceEdit {
                name: "Gi0/1".to_string(),
                if_type: Some("ianaift:ethernetCsmacd".to_string()),
                enabled: Some(false),
                ipv4: Some(Ipv4Address {
                    ip: "10.0.0.1".to_string(),
                    netmask: "255.255.255.0".to_string(),
                }),
            }]
        );
    }

    #[test]
    fn test_edit_requires_name_and_netmask() {
        let config = Element::parse(
            "<config><interfaces><interface><enabled>true</enabled></interface></interfaces></config>",
        )
        .unwrap();
        let err = InterfaceEdit::from_config(&config).unwrap_err();
        assert!(err.contains("<name>"), "{}", err);

        let config = Element::parse(
            "<config><interface><name>Gi0/1</name><ipv4><address><ip>10.0.0.1</ip></address></ipv4></interface></config>",
        )
        .unwrap();
        let err = InterfaceEdit::from_config(&config).unwrap_err();
        assert!(err.contains("<netmask>"), "{}", err);

        let config = Element::parse("<config/>").unwrap();
        assert!(InterfaceEdit::from_config(&config).is_err());
    }

    #[test]
    fn test_merge_preserves_unspecified_fields() {
        let mut store = ConfigStore::new();
        for edit in edit("<config><interface><name>Gi0/1</name><ipv4><address><ip>10.0.0.1</ip><netmask>255.255.255.0</netmask></address></ipv4></interface></config>") {
            store.merge(Datastore::Candidate, edit).unwrap();
        }
        for edit in edit("<config><interface><name>Gi0/1</name><enabled>false</enabled></interface></config>") {
            store.merge(Datastore::Candidate, edit).unwrap();
        }

        let candidate = store.get(Datastore::Candidate);
        assert_eq!(
            candidate,
            vec![Interface {
                enabled: false,
                ..Interface::new("Gi0/1").with_ipv4("10.0.0.1", "255.255.255.0")
            }]
        );
        assert!(store.get(Datastore::Running).is_empty());
    }

    #[test]
    fn test_candidate_merge_starts_from_running() {
        let mut store = ConfigStore::new();
        store
            .put(
                Datastore::Running,
                Interface::new("Gi0/2").with_ipv4("192.0.2.1", "255.255.255.252"),
            )
            .unwrap();
        for edit in edit("<config><interface><name>Gi0/2</name><enabled>false</enabled></interface></config>") {
            store.merge(Datastore::Candidate, edit).unwrap();
        }
        let candidate = store.get(Datastore::Candidate);
        assert_eq!(candidate[0].ipv4.as_ref().unwrap().ip, "192.0.2.1");
        assert!(!candidate[0].enabled);
        assert!(store.get(Datastore::Running)[0].enabled);
    }

    #[test]
    fn test_commit_is_idempotent_and_keeps_running_only_entries() {
        let mut store = ConfigStore::new();
        store
            .put(Datastore::Running, Interface::new("Lo0"))
            .unwrap();
        store
            .put(
                Datastore::Candidate,
                Interface::new("Gi0/1").with_ipv4("10.0.0.1", "255.255.255.0"),
            )
            .unwrap();

        assert_eq!(store.commit(), 1);
        let first = store.get(Datastore::Running);
        assert_eq!(store.commit(), 1);
        let second = store.get(Datastore::Running);

        assert_eq!(first, second);
        let names: Vec<&str> = first.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Gi0/1", "Lo0"]);
        assert_eq!(store.get(Datastore::Candidate).len(), 1);
    }

    #[test]
    fn test_put_rejects_empty_name() {
        let mut store = ConfigStore::new();
        assert!(store.put(Datastore::Running, Interface::new(" ")).is_err());
        assert!(store.get(Datastore::Running).is_empty());
    }

    #[tokio::test]
    async fn test_shared_store_failed_edit_changes_nothing() {
        let store = SharedConfigStore::default();
        let mut edits = edit("<config><interface><name>Gi0/4</name></interface></config>");
        edits.push(InterfaceEdit {
            name: String::new(),
            if_type: None,
            enabled: None,
            ipv4: None,
        });
        assert!(store.edit(Datastore::Candidate, edits).await.is_err());
        assert!(store.get(Datastore::Candidate).await.is_empty());
    }

    #[tokio::test]
    async fn test_shared_store_edit_and_commit() {
        let store = SharedConfigStore::default();
        let applied = store
            .edit(
                Datastore::Running,
                edit("<config><interface><name>Gi0/3</name></interface></config>"),
            )
            .await
            .unwrap();
        assert_eq!(applied, vec![Interface::new("Gi0/3")]);
        assert_eq!(store.get(Datastore::Running).await.len(), 1);
        assert!(store.get(Datastore::Candidate).await.is_empty());
        assert_eq!(store.commit().await, 0);
        assert_eq!(store.snapshot().await.get(Datastore::Running).len(), 1);
    }
}
