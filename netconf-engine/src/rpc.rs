//! Server side request parsing and dispatch.

use crate::datastore::{Datastore, InterfaceEdit, SharedConfigStore};
use crate::message::{RpcError, RpcReply, FALLBACK_MESSAGE_ID};
use crate::xml::Element;
use core::str::FromStr;
use log::{debug, info, warn};

const MESSAGE_ID_ATTRIBUTE: &str = "message-id=\"";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOperation {
    GetConfig { source: Option<String> },
    EditConfig { target: Option<String>, config: Option<Element> },
    Commit,
    CloseSession,
    /// Anything else, including messages that are not XML at all.
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcRequest {
    message_id: String,
    operation: RequestOperation,
}

impl RpcRequest {
    /// Never fails: a missing message-id becomes `"1"` and an unreadable body
    /// becomes `Other`.
    pub fn parse(xml: &str) -> RpcRequest {
        let Some(rpc) = Element::parse(xml) else {
            warn!("Received unparsable rpc");
            return RpcRequest {
                message_id: message_id_from_text(xml),
                operation: RequestOperation::Other(String::new()),
            };
        };
        let message_id = rpc
            .attribute("message-id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(FALLBACK_MESSAGE_ID)
            .to_string();

        let operation = match rpc.children().first() {
            Some(body) => match body.name() {
                "get-config" => RequestOperation::GetConfig {
                    source: body.child("source").and_then(datastore_name),
                },
                "edit-config" => RequestOperation::EditConfig {
                    target: body.child("target").and_then(datastore_name),
                    config: body.child("config").cloned(),
                },
                "commit" => RequestOperation::Commit,
                "close-session" => RequestOperation::CloseSession,
                other => RequestOperation::Other(other.to_string()),
            },
            None => RequestOperation::Other(rpc.name().to_string()),
        };
        RpcRequest {
            message_id,
            operation,
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn operation(&self) -> &RequestOperation {
        &self.operation
    }

    pub fn is_close_session(&self) -> bool {
        matches!(self.operation, RequestOperation::CloseSession)
    }
}

/// `<running/>` or `<running>` text form.
fn datastore_name(element: &Element) -> Option<String> {
    element
        .children()
        .first()
        .map(|child| child.name().to_string())
        .or_else(|| Some(element.text().to_string()))
        .filter(|name| !name.is_empty())
}

/// Textual fallback for messages the element parser rejected.
fn message_id_from_text(xml: &str) -> String {
    xml.find(MESSAGE_ID_ATTRIBUTE)
        .map(|start| &xml[start + MESSAGE_ID_ATTRIBUTE.len()..])
        .and_then(|rest| rest.find('"').map(|end| &rest[..end]))
        .filter(|id| !id.is_empty())
        .unwrap_or(FALLBACK_MESSAGE_ID)
        .to_string()
}

fn resolve_datastore(name: Option<&str>, default: Datastore) -> Result<Datastore, RpcError> {
    match name {
        None => Ok(default),
        Some(name) => Datastore::from_str(name)
            .map_err(|_| RpcError::invalid_value(&format!("unknown datastore {}", name))),
    }
}

/// Executes one request against the device store and builds the reply
/// carrying the request's message-id.
pub async fn dispatch(request: &RpcRequest, store: &SharedConfigStore) -> RpcReply {
    let message_id = request.message_id();
    match request.operation() {
        RequestOperation::GetConfig { source } => {
            match resolve_datastore(source.as_deref(), Datastore::Running) {
                Ok(source) => {
                    let interfaces = store.get(source).await;
                    info!(
                        "Returning {} configuration with {} interfaces",
                        source,
                        interfaces.len()
                    );
                    RpcReply::data(message_id, &interfaces)
                }
                Err(error) => RpcReply::error(message_id, error),
            }
        }
        RequestOperation::EditConfig { target, config } => {
            let target = match resolve_datastore(target.as_deref(), Datastore::Candidate) {
                Ok(target) => target,
                Err(error) => return RpcReply::error(message_id, error),
            };
            let edits = match config {
                Some(config) => InterfaceEdit::from_config(config),
                None => Err("missing <config> element".to_string()),
            };
            match edits {
                Ok(edits) => match store.edit(target, edits).await {
                    Ok(_) => RpcReply::ok(message_id),
                    Err(err) => RpcReply::error(
                        message_id,
                        RpcError::operation_failed(&err.to_string()),
                    ),
                },
                Err(reason) => {
                    warn!("Rejecting edit-config {}: {}", message_id, reason);
                    RpcReply::error(message_id, RpcError::operation_failed(&reason))
                }
            }
        }
        RequestOperation::Commit => {
            store.commit().await;
            info!("Commit {} applied", message_id);
            RpcReply::ok(message_id)
        }
        RequestOperation::CloseSession => {
            info!("Session close requested");
            RpcReply::ok(message_id)
        }
        RequestOperation::Other(operation) => {
            debug!("Acknowledging unsupported operation '{}'", operation);
            RpcReply::ok(message_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::Interface;
    use crate::message::ErrorTag;
    use pretty_assertions::assert_eq;

    const EDIT_GI01: &str = r#"<rpc message-id="21" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  <edit-config>
    <target><candidate/></target>
    <config>
      <interfaces xmlns="urn:ietf:params:xml:ns:yang:ietf-interfaces">
        <interface>
          <name>Gi0/1</name>
          <ipv4 xmlns="urn:ietf:params:xml:ns:yang:ietf-ip">
            <address><ip>10.0.0.1</ip><netmask>255.255.255.0</netmask></address>
          </ipv4>
        </interface>
      </interfaces>
    </config>
  </edit-config>
</rpc>"#;

    #[test]
    fn test_parse_operations() {
        let request = RpcRequest::parse(
            r#"<rpc message-id="9"><get-config><source><candidate/></source></get-config></rpc>"#,
        );
        assert_eq!(request.message_id(), "9");
        assert_eq!(
            request.operation(),
            &RequestOperation::GetConfig {
                source: Some("candidate".to_string())
            }
        );

        let request = RpcRequest::parse(
            r#"<rpc message-id="10"><get-config><source>running</source></get-config></rpc>"#,
        );
        assert_eq!(
            request.operation(),
            &RequestOperation::GetConfig {
                source: Some("running".to_string())
            }
        );

        assert!(RpcRequest::parse(r#"<rpc message-id="11"><close-session/></rpc>"#)
            .is_close_session());
        assert_eq!(
            RpcRequest::parse(r#"<rpc message-id="12"><commit/></rpc>"#).operation(),
            &RequestOperation::Commit
        );
        assert_eq!(
            RpcRequest::parse(r#"<rpc message-id="13"><lock/></rpc>"#).operation(),
            &RequestOperation::Other("lock".to_string())
        );
    }

    #[test]
    fn test_parse_message_id_fallbacks() {
        assert_eq!(RpcRequest::parse("<rpc><commit/></rpc>").message_id(), "1");
        assert_eq!(
            RpcRequest::parse(r#"<rpc message-id="77"><commit>"#).message_id(),
            "77"
        );
        let request = RpcRequest::parse("garbage");
        assert_eq!(request.message_id(), "1");
        assert_eq!(request.operation(), &RequestOperation::Other(String::new()));
    }

    #[tokio::test]
    async fn test_dispatch_edit_commit_get() {
        let store = SharedConfigStore::default();
        let reply = dispatch(&RpcRequest::parse(EDIT_GI01), &store).await;
        assert!(reply.is_ok());
        assert_eq!(reply.get_message_id(), "21");
        assert!(store.get(Datastore::Running).await.is_empty());

        let reply = dispatch(
            &RpcRequest::parse(r#"<rpc message-id="22"><commit/></rpc>"#),
            &store,
        )
        .await;
        assert!(reply.is_ok());

        let reply = dispatch(
            &RpcRequest::parse(
                r#"<rpc message-id="23"><get-config><source><running/></source></get-config></rpc>"#,
            ),
            &store,
        )
        .await;
        assert_eq!(reply.get_message_id(), "23");
        assert_eq!(
            reply.interfaces(),
            vec![Interface::new("Gi0/1").with_ipv4("10.0.0.1", "255.255.255.0")]
        );
    }

    #[tokio::test]
    async fn test_dispatch_edit_running_bypasses_candidate() {
        let store = SharedConfigStore::default();
        let request = EDIT_GI01.replace("<candidate/>", "<running/>");
        assert!(dispatch(&RpcRequest::parse(&request), &store).await.is_ok());
        assert_eq!(store.get(Datastore::Running).await.len(), 1);
        assert!(store.get(Datastore::Candidate).await.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_edit_without_name_fails() {
        let store = SharedConfigStore::default();
        let request = EDIT_GI01.replace("<name>Gi0/1</name>", "");
        let reply = dispatch(&RpcRequest::parse(&request), &store).await;
        assert!(reply.has_errors());
        assert_eq!(reply.get_message_id(), "21");
        assert_eq!(reply.errors()[0].error_tag(), ErrorTag::OperationFailed);
        assert!(store.get(Datastore::Candidate).await.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_unknown_datastore() {
        let store = SharedConfigStore::default();
        let reply = dispatch(
            &RpcRequest::parse(
                r#"<rpc message-id="30"><get-config><source><startup/></source></get-config></rpc>"#,
            ),
            &store,
        )
        .await;
        assert_eq!(reply.errors()[0].error_tag(), ErrorTag::InvalidValue);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_operation_is_ok() {
        let store = SharedConfigStore::default();
        let reply = dispatch(
            &RpcRequest::parse(r#"<rpc message-id="31"><get-schema/></rpc>"#),
            &store,
        )
        .await;
        assert!(reply.is_ok());
        assert_eq!(reply.get_message_id(), "31");
    }
}
