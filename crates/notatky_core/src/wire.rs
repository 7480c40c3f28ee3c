//! Client-facing JSON shape of note children.
//!
//! # Responsibility
//! - Decode client payloads (`type` tag plus `textNode`/`imageNode`) into
//!   [`ChildSpec`] values.
//! - Encode [`ChildDescriptor`] values back into the same shape.
//!
//! # Invariants
//! - Content node ids are accepted and ignored; content ids never leave
//!   the core.
//! - Every decode failure maps to `ServiceError::InvalidEntry`.

use crate::model::child::{ChildContent, ChildDescriptor, ChildId, ChildSpec, MAX_POSITION};
use crate::service::error::{ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};

/// Text payload node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTextNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: String,
}

/// Image payload node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireImageNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub image_path: String,
}

/// One child as exchanged with clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireNoteChild {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub position: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_node: Option<WireTextNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_node: Option<WireImageNode>,
}

/// Batch sync request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSyncRequest {
    pub note_children: Vec<WireNoteChild>,
}

impl TryFrom<WireNoteChild> for ChildSpec {
    type Error = ServiceError;

    fn try_from(value: WireNoteChild) -> ServiceResult<Self> {
        let id = value.id.as_deref().map(parse_child_id).transpose()?;

        let position = u32::try_from(value.position)
            .ok()
            .filter(|position| *position <= MAX_POSITION)
            .ok_or_else(|| invalid(format!("position {} is out of range", value.position)))?;

        let content = match value.kind.as_str() {
            "text" => {
                let node = value
                    .text_node
                    .ok_or_else(|| invalid("text child requires `textNode`".to_string()))?;
                ChildContent::Text(node.content)
            }
            "image" => {
                let node = value
                    .image_node
                    .ok_or_else(|| invalid("image child requires `imageNode`".to_string()))?;
                ChildContent::Image(node.image_path)
            }
            other => return Err(invalid(format!("unknown child type `{other}`"))),
        };
        content.validate().map_err(ServiceError::InvalidEntry)?;

        Ok(ChildSpec {
            id,
            content,
            position,
        })
    }
}

impl From<ChildDescriptor> for WireNoteChild {
    fn from(value: ChildDescriptor) -> Self {
        let kind = value.variant().as_str().to_string();
        let (text_node, image_node) = match value.content {
            ChildContent::Text(content) => (Some(WireTextNode { id: None, content }), None),
            ChildContent::Image(image_path) => (
                None,
                Some(WireImageNode {
                    id: None,
                    image_path,
                }),
            ),
        };
        Self {
            id: Some(value.id.to_string()),
            kind,
            position: i64::from(value.position),
            text_node,
            image_node,
        }
    }
}

/// Parses a `{ "noteChildren": [...] }` body into sync specs.
pub fn parse_sync_request(json: &str) -> ServiceResult<Vec<ChildSpec>> {
    let request: WireSyncRequest = serde_json::from_str(json)
        .map_err(|err| invalid(format!("malformed sync request: {err}")))?;
    request
        .note_children
        .into_iter()
        .map(ChildSpec::try_from)
        .collect()
}

/// Parses one child payload.
pub fn parse_child(json: &str) -> ServiceResult<ChildSpec> {
    let child: WireNoteChild = serde_json::from_str(json)
        .map_err(|err| invalid(format!("malformed child: {err}")))?;
    ChildSpec::try_from(child)
}

/// Encodes descriptors into the client shape.
pub fn to_wire(children: Vec<ChildDescriptor>) -> Vec<WireNoteChild> {
    children.into_iter().map(WireNoteChild::from).collect()
}

fn parse_child_id(value: &str) -> ServiceResult<ChildId> {
    ChildId::parse_str(value).map_err(|_| invalid(format!("malformed child id `{value}`")))
}

fn invalid(message: String) -> ServiceError {
    ServiceError::InvalidEntry(message)
}
