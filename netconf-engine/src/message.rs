use crate::datastore::{Datastore, Interface, Ipv4Address};
use crate::error::NetconfResult;
use crate::xml::Element;
use crate::{IANA_IF_TYPE_URN, IETF_INTERFACES_URN, IETF_IP_URN, NETCONF_URN};
use core::fmt;
use core::fmt::Display;
use quick_xml::escape::unescape;
use quick_xml::se::Serializer;
use serde_derive::{Deserialize, Serialize};

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
pub const UNKNOWN_SESSION_ID: &str = "unknown";
pub const FALLBACK_MESSAGE_ID: &str = "1";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename = "hello")]
pub struct Hello {
    #[serde(rename = "@xmlns")]
    xmlns: String,
    capabilities: Capabilities,
    #[serde(rename = "session-id", skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
}

impl Hello {
    pub fn new(capabilities: Vec<String>) -> Hello {
        Hello {
            xmlns: NETCONF_URN.to_string(),
            session_id: None,
            capabilities: Capabilities {
                capability: capabilities,
            },
        }
    }

    pub fn with_session_id(capabilities: Vec<String>, session_id: u64) -> Hello {
        Hello {
            session_id: Some(session_id.to_string()),
            ..Hello::new(capabilities)
        }
    }

    /// Best effort read of a peer hello. Capabilities that cannot be found are
    /// simply absent and a missing session id reads as `unknown`.
    pub fn parse(xml: &str) -> Hello {
        let Some(root) = Element::parse(xml) else {
            return Hello::new(Vec::new());
        };
        let capability = root
            .child("capabilities")
            .map(|capabilities| {
                capabilities
                    .children()
                    .iter()
                    .filter(|child| child.name() == "capability")
                    .map(|child| child.text().to_string())
                    .filter(|capability| !capability.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Hello {
            xmlns: NETCONF_URN.to_string(),
            capabilities: Capabilities { capability },
            session_id: root.child_text("session-id").map(str::to_string),
        }
    }

    pub fn capabilities(&self) -> Vec<String> {
        self.capabilities
            .capability
            .iter()
            .map(|capability| capability.to_string())
            .collect()
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities
            .capability
            .iter()
            .any(|cap| cap == capability)
    }

    pub fn session_id(&self) -> &str {
        self.session_id.as_deref().unwrap_or(UNKNOWN_SESSION_ID)
    }
}

impl Display for Hello {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use serde::Serialize;
        let mut buffer = String::with_capacity(512);
        let ser = Serializer::new(&mut buffer);
        self.serialize(ser).map_err(|_| fmt::Error)?;
        write!(f, "{}", buffer)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    capability: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Rpc {
    #[serde(rename = "@message-id")]
    message_id: String,
    #[serde(rename = "@xmlns")]
    xmlns: String,
    #[serde(rename = "$value")]
    operation: RpcOperation,
}

impl Rpc {
    pub fn new(message_id: impl Into<String>, operation: RpcOperation) -> Rpc {
        Rpc {
            xmlns: NETCONF_URN.to_string(),
            message_id: message_id.into(),
            operation,
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Wraps an arbitrary operation body in an `<rpc>` envelope.
    pub fn raw(message_id: &str, body: &str) -> String {
        format!(
            "<rpc message-id=\"{}\" xmlns=\"{}\">\n  {}\n</rpc>",
            message_id,
            NETCONF_URN,
            body.trim()
        )
    }
}

impl Display for Rpc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use serde::Serialize;
        let mut buffer = String::with_capacity(256);
        let mut ser = Serializer::with_root(&mut buffer, Some("rpc")).map_err(|_| fmt::Error)?;
        ser.indent(' ', 2);
        self.serialize(ser).map_err(|_| fmt::Error)?;
        match &self.operation {
            RpcOperation::EditConfig(_) => {
                write!(f, "{}", unescape(buffer.as_str()).map_err(|_| fmt::Error)?)
            }
            _ => {
                write!(f, "{}", buffer)
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RpcOperation {
    GetConfig(GetConfig),
    EditConfig(EditConfig),
    Commit,
    CloseSession,
}

impl RpcOperation {
    pub fn new_get_config(datastore: Datastore) -> RpcOperation {
        RpcOperation::GetConfig(GetConfig {
            source: Source { datastore },
        })
    }

    /// `config` is the content placed inside `<config>`.
    pub fn new_edit_config(datastore: Datastore, config: &str) -> RpcOperation {
        RpcOperation::EditConfig(EditConfig {
            target: Target { datastore },
            config: Config {
                content: config.trim().to_string(),
            },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct GetConfig {
    source: Source,
}

#[derive(Debug, Serialize)]
pub struct EditConfig {
    target: Target,
    config: Config,
}

#[derive(Debug, Serialize)]
pub struct Source {
    #[serde(rename = "$value")]
    pub datastore: Datastore,
}

#[derive(Debug, Serialize)]
pub struct Target {
    #[serde(rename = "$value")]
    pub datastore: Datastore,
}

#[derive(Debug, Serialize)]
pub struct Config {
    #[serde(rename = "$value")]
    content: String,
}

fn fallback_message_id() -> String {
    FALLBACK_MESSAGE_ID.to_string()
}

fn netconf_urn() -> String {
    NETCONF_URN.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", rename(serialize = "rpc-reply"))]
pub struct RpcReply {
    #[serde(rename = "@message-id", default = "fallback_message_id")]
    message_id: String,
    #[serde(rename = "@xmlns", skip_deserializing, default = "netconf_urn")]
    xmlns: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rpc_error: Option<Vec<RpcError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Data>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ok: Option<()>,
}

impl RpcReply {
    pub fn ok(message_id: &str) -> RpcReply {
        RpcReply {
            message_id: message_id.to_string(),
            xmlns: NETCONF_URN.to_string(),
            rpc_error: None,
            data: None,
            ok: Some(()),
        }
    }

    pub fn data(message_id: &str, interfaces: &[Interface]) -> RpcReply {
        RpcReply {
            data: Some(Data {
                interfaces: Some(Interfaces::from(interfaces)),
            }),
            ok: None,
            ..RpcReply::ok(message_id)
        }
    }

    pub fn error(message_id: &str, error: RpcError) -> RpcReply {
        RpcReply {
            rpc_error: Some(vec![error]),
            ok: None,
            ..RpcReply::ok(message_id)
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok.is_some() && self.rpc_error.is_none()
    }

    pub fn has_errors(&self) -> bool {
        self.rpc_error.is_some()
    }

    pub fn get_message_id(&self) -> &str {
        &self.message_id
    }

    pub fn errors(&self) -> &[RpcError] {
        self.rpc_error.as_deref().unwrap_or_default()
    }

    /// Interfaces carried in `<data>`, empty when the reply has none.
    pub fn interfaces(&self) -> Vec<Interface> {
        self.data
            .as_ref()
            .and_then(|data| data.interfaces.as_ref())
            .map(|interfaces| {
                interfaces
                    .interface
                    .iter()
                    .cloned()
                    .map(Interface::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Display for RpcReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use serde::Serialize;
        let mut buffer = String::with_capacity(512);
        let mut ser = Serializer::new(&mut buffer);
        ser.indent(' ', 2);
        self.serialize(ser).map_err(|_| fmt::Error)?;
        write!(f, "{}", buffer)
    }
}

impl std::error::Error for RpcReply {}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename = "rpc-error", rename_all = "kebab-case")]
pub struct RpcError {
    error_type: ErrorType,
    error_tag: ErrorTag,
    error_severity: ErrorSeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_app_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_info: Option<ErrorInfo>,
}

impl RpcError {
    fn new(error_type: ErrorType, error_tag: ErrorTag, message: &str) -> RpcError {
        RpcError {
            error_type,
            error_tag,
            error_severity: ErrorSeverity::Error,
            error_app_tag: None,
            error_path: None,
            error_message: Some(message.to_string()),
            error_info: None,
        }
    }

    pub fn operation_failed(message: &str) -> RpcError {
        RpcError::new(ErrorType::Application, ErrorTag::OperationFailed, message)
    }

    pub fn invalid_value(message: &str) -> RpcError {
        RpcError::new(ErrorType::Protocol, ErrorTag::InvalidValue, message)
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    pub fn error_tag(&self) -> ErrorTag {
        self.error_tag
    }

    pub fn message(&self) -> Option<&str> {
        self.error_message.as_deref().map(str::trim)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorType {
    Transport,
    Rpc,
    Protocol,
    #[serde(alias = "app")]
    Application,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorTag {
    InUse,
    InvalidValue,
    TooBig,
    MissingAttribute,
    BadAttribute,
    UnknownAttribute,
    MissingElement,
    BadElement,
    UnknownElement,
    UnknownNamespace,
    AccessDenied,
    LockDenied,
    ResourceDenied,
    RollbackFailed,
    DataExists,
    DataMissing,
    OperationNotSupported,
    OperationFailed,
    PartialOperation,
    MalformedMessage,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
struct ErrorInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    bad_element: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bad_attribute: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Data {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    interfaces: Option<Interfaces>,
}

fn ietf_interfaces_urn() -> String {
    IETF_INTERFACES_URN.to_string()
}

fn ietf_ip_urn() -> String {
    IETF_IP_URN.to_string()
}

/// `ietf-interfaces` container, used both in `<data>` and `<config>`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename = "interfaces")]
pub struct Interfaces {
    #[serde(rename = "@xmlns", skip_deserializing, default = "ietf_interfaces_urn")]
    xmlns: String,
    #[serde(default)]
    interface: Vec<InterfaceXml>,
}

impl From<&[Interface]> for Interfaces {
    fn from(interfaces: &[Interface]) -> Self {
        Interfaces {
            xmlns: IETF_INTERFACES_URN.to_string(),
            interface: interfaces.iter().map(InterfaceXml::from).collect(),
        }
    }
}

fn enabled_default() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InterfaceXml {
    name: String,
    #[serde(rename = "type", default)]
    if_type: InterfaceType,
    #[serde(default = "enabled_default")]
    enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    ipv4: Option<Ipv4Xml>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct InterfaceType {
    #[serde(
        rename = "@xmlns:ianaift",
        skip_deserializing,
        skip_serializing_if = "String::is_empty"
    )]
    xmlns: String,
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct Ipv4Xml {
    #[serde(rename = "@xmlns", skip_deserializing, default = "ietf_ip_urn")]
    xmlns: String,
    address: AddressXml,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct AddressXml {
    ip: String,
    netmask: String,
}

impl From<&Interface> for InterfaceXml {
    fn from(interface: &Interface) -> Self {
        let xmlns = if interface.if_type.starts_with("ianaift:") {
            IANA_IF_TYPE_URN.to_string()
        } else {
            String::new()
        };
        InterfaceXml {
            name: interface.name.clone(),
            if_type: InterfaceType {
                xmlns,
                value: interface.if_type.clone(),
            },
            enabled: interface.enabled,
            ipv4: interface.ipv4.as_ref().map(|ipv4| Ipv4Xml {
                xmlns: IETF_IP_URN.to_string(),
                address: AddressXml {
                    ip: ipv4.ip.clone(),
                    netmask: ipv4.netmask.clone(),
                },
            }),
        }
    }
}

impl From<InterfaceXml> for Interface {
    fn from(interface: InterfaceXml) -> Self {
        Interface {
            name: interface.name.trim().to_string(),
            if_type: interface.if_type.value.trim().to_string(),
            enabled: interface.enabled,
            ipv4: interface.ipv4.map(|ipv4| Ipv4Address {
                ip: ipv4.address.ip.trim().to_string(),
                netmask: ipv4.address.netmask.trim().to_string(),
            }),
        }
    }
}

/// Serializes interfaces into an `ietf-interfaces` fragment suitable as
/// `<edit-config>` content.
pub fn interfaces_config(interfaces: &[Interface]) -> NetconfResult<String> {
    Ok(quick_xml::se::to_string(&Interfaces::from(interfaces))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IETF_INTERFACES_CAP, NETCONF_BASE_10_CAP, NETCONF_BASE_11_CAP};
    use pretty_assertions::assert_eq;
    use quick_xml::de::from_str;

    #[test]
    fn test_deserialize_rpc_reply() {
        let reply = r#"
<rpc-reply message-id="67" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  <rpc-error>
    <error-type>application</error-type>
    <error-tag>operation-failed</error-tag>
    <error-severity>error</error-severity>
    <error-message>Failed to process configuration</error-message>
  </rpc-error>
  <rpc-error>
    <error-type>app</error-type>
    <error-tag>bad-element</error-tag>
    <error-severity>error</error-severity>
    <error-message>Element is not valid in the specified context.</error-message>
    <error-info>
      <bad-element>startu</bad-element>
    </error-info>
  </rpc-error>
</rpc-reply>
"#;
        let reply: RpcReply = from_str(reply).unwrap();
        assert!(reply.has_errors(), "<rpc-error> element not found");
        assert_eq!(reply.errors().len(), 2);
        assert_eq!(reply.errors()[0].error_tag(), ErrorTag::OperationFailed);
        assert_eq!(reply.errors()[1].error_type(), ErrorType::Application);
        assert_eq!(reply.get_message_id(), "67");

        let reply = r#"
<?xml version="1.0" encoding="UTF-8"?>
<rpc-reply message-id="938f1c28" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  <ok/>
</rpc-reply>
"#;
        let reply: RpcReply = from_str(reply).unwrap();
        assert!(reply.is_ok());
    }

    #[test]
    fn test_deserialize_data_reply() {
        let reply = r#"<?xml version="1.0" encoding="UTF-8"?>
<rpc-reply message-id="3" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
    <data>
        <interfaces xmlns="urn:ietf:params:xml:ns:yang:ietf-interfaces">
            <interface>
                <name>Gi0/1</name>
                <type xmlns:ianaift="urn:ietf:params:xml:ns:yang:iana-if-type">ianaift:ethernetCsmacd</type>
                <enabled>true</enabled>
                <ipv4 xmlns="urn:ietf:params:xml:ns:yang:ietf-ip">
                    <address>
                        <ip>10.0.0.1</ip>
                        <netmask>255.255.255.0</netmask>
                    </address>
                </ipv4>
            </interface>
            <interface>
                <name>Lo0</name>
                <type xmlns:ianaift="urn:ietf:params:xml:ns:yang:iana-if-type">ianaift:softwareLoopback</type>
                <enabled>false</enabled>
            </interface>
        </interfaces>
    </data>
</rpc-reply>"#;
        let reply: RpcReply = from_str(reply).unwrap();
        assert!(!reply.has_errors());
        assert!(!reply.is_ok());
        assert_eq!(
            reply.interfaces(),
            vec![
                Interface::new("Gi0/1").with_ipv4("10.0.0.1", "255.255.255.0"),
                Interface {
                    if_type: "ianaift:softwareLoopback".to_string(),
                    enabled: false,
                    ..Interface::new("Lo0")
                },
            ]
        );
    }

    #[test]
    fn test_reply_without_message_id_uses_fallback() {
        let reply: RpcReply = from_str("<rpc-reply><ok/></rpc-reply>").unwrap();
        assert_eq!(reply.get_message_id(), FALLBACK_MESSAGE_ID);
    }

    #[test]
    fn test_reply_round_trip() {
        let interfaces = vec![Interface::new("Gi0/1").with_ipv4("10.0.0.1", "255.255.255.0")];
        let reply: RpcReply = from_str(&RpcReply::data("12", &interfaces).to_string()).unwrap();
        assert_eq!(reply.get_message_id(), "12");
        assert_eq!(reply.interfaces(), interfaces);

        let reply: RpcReply = from_str(&RpcReply::data("13", &[]).to_string()).unwrap();
        assert!(reply.interfaces().is_empty());

        let reply: RpcReply = from_str(
            &RpcReply::error("14", RpcError::operation_failed("missing <name>")).to_string(),
        )
        .unwrap();
        assert_eq!(reply.errors()[0].message(), Some("missing <name>"));
        assert_eq!(reply.errors()[0].error_tag(), ErrorTag::OperationFailed);
    }

    #[test]
    fn test_serialize_ok_reply() {
        let expected = r#"
<rpc-reply message-id="5" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  <ok/>
</rpc-reply>
"#;
        assert_eq!(RpcReply::ok("5").to_string(), expected.trim());
    }

    #[test]
    fn test_serialize_hello() {
        let expected = r#"<hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><capabilities><capability>urn:ietf:params:netconf:base:1.0</capability><capability>urn:ietf:params:netconf:base:1.1</capability></capabilities><session-id>42</session-id></hello>"#;
        let hello = Hello::with_session_id(
            vec![
                NETCONF_BASE_10_CAP.to_string(),
                NETCONF_BASE_11_CAP.to_string(),
            ],
            42,
        );
        assert_eq!(hello.to_string(), expected.trim());
    }

    #[test]
    fn test_hello_round_trip() {
        let capabilities = vec![
            NETCONF_BASE_10_CAP.to_string(),
            IETF_INTERFACES_CAP.to_string(),
        ];
        let hello = Hello::parse(&Hello::with_session_id(capabilities.clone(), 7).to_string());
        assert_eq!(hello.capabilities(), capabilities);
        assert_eq!(hello.session_id(), "7");
        assert!(hello.has_capability(IETF_INTERFACES_CAP));
    }

    #[test]
    fn test_parse_hello_without_session_id() {
        let hello = Hello::parse(
            "<hello><capabilities><capability>urn:ietf:params:netconf:base:1.0</capability></capabilities></hello>",
        );
        assert_eq!(hello.session_id(), UNKNOWN_SESSION_ID);
        assert_eq!(hello.capabilities(), vec![NETCONF_BASE_10_CAP.to_string()]);

        let hello = Hello::parse("<hello><capabilities>");
        assert_eq!(hello.session_id(), UNKNOWN_SESSION_ID);
        assert!(hello.capabilities().is_empty());
    }

    #[test]
    fn test_serialize_close_session() {
        let expected = r#"
<rpc message-id="101" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  <close-session/>
</rpc>
"#;
        let close_session = Rpc::new("101", RpcOperation::CloseSession);
        assert_eq!(close_session.to_string(), expected.trim());
    }

    #[test]
    fn test_serialize_commit() {
        let expected = r#"
<rpc message-id="102" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  <commit/>
</rpc>
"#;
        let commit = Rpc::new("102", RpcOperation::Commit);
        assert_eq!(commit.to_string(), expected.trim());
    }

    #[test]
    fn test_serialize_get_config() {
        let expected = r#"
<rpc message-id="103" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  <get-config>
    <source>
      <running/>
    </source>
  </get-config>
</rpc>
"#;
        let get_config = Rpc::new("103", RpcOperation::new_get_config(Datastore::Running));
        assert_eq!(get_config.to_string(), expected.trim());
    }

    #[test]
    fn test_serialize_edit_config() {
        let config =
            interfaces_config(&[Interface::new("Gi0/1").with_ipv4("10.0.0.1", "255.255.255.0")])
                .unwrap();
        let rpc = Rpc::new(
            "104",
            RpcOperation::new_edit_config(Datastore::Candidate, &config),
        )
        .to_string();

        let parsed = Element::parse(&rpc).unwrap();
        assert_eq!(parsed.attribute("message-id"), Some("104"));
        let edit = parsed.child("edit-config").unwrap();
        assert_eq!(
            edit.child("target").unwrap().children()[0].name(),
            "candidate"
        );
        let interface = edit.find_all("interface")[0];
        assert_eq!(interface.child_text("name"), Some("Gi0/1"));
        assert_eq!(
            interface.find_all("netmask")[0].text(),
            "255.255.255.0"
        );
    }
}
