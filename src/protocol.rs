//! Messages exchanged between the projector and the popout window
//!
//! Every message on the wire is a JSON object with a `type` tag and the
//! `plugin` discriminator. Anything without the discriminator belongs to
//! someone else and is ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::constants::protocol::PLUGIN_ID;

const PLUGIN_FIELD: &str = "plugin";
const TYPE_FIELD: &str = "type";

const KNOWN_TYPES: &[&str] = &["show", "showHTML", "settings", "next", "prev", "requestCurrent"];

/// What a `show` message carries
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Card,
    Map,
    Html,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ProjectionMessage {
    /// Display a single image or video
    #[serde(rename = "show")]
    Show {
        #[serde(default)]
        src: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<MediaKind>,
        /// Only read when `kind` is `html`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        html: Option<String>,
        #[serde(default, rename = "playerInfo", skip_serializing_if = "Option::is_none")]
        player_info: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },

    /// Display an HTML fragment (rendered note, statblock)
    #[serde(rename = "showHTML")]
    ShowHtml {
        #[serde(default)]
        html: String,
        #[serde(default, rename = "playerInfo", skip_serializing_if = "Option::is_none")]
        player_info: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },

    /// Sync overlay defaults without touching displayed content
    #[serde(rename = "settings")]
    Settings(SettingsUpdate),

    /// Popout → projector: advance the card deck
    #[serde(rename = "next")]
    Next,

    #[serde(rename = "prev")]
    Prev,

    /// Popout → projector: sent once when the window opens
    #[serde(rename = "requestCurrent")]
    RequestCurrent,
}

/// Partial overlay settings; absent fields leave the popout's value alone
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    #[serde(default, rename = "gridSize", skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<u32>,
    #[serde(default, rename = "gridColor", skip_serializing_if = "Option::is_none")]
    pub grid_color: Option<String>,
    #[serde(default, rename = "gridOpacity", skip_serializing_if = "Option::is_none")]
    pub grid_opacity: Option<f32>,
    #[serde(default, rename = "fogRevealSize", skip_serializing_if = "Option::is_none")]
    pub fog_reveal_size: Option<u32>,
    #[serde(default, rename = "showPlayerInfo", skip_serializing_if = "Option::is_none")]
    pub show_player_info: Option<bool>,
}

impl ProjectionMessage {
    /// Wire name of the message type
    pub fn type_name(&self) -> &'static str {
        match self {
            ProjectionMessage::Show { .. } => "show",
            ProjectionMessage::ShowHtml { .. } => "showHTML",
            ProjectionMessage::Settings(_) => "settings",
            ProjectionMessage::Next => "next",
            ProjectionMessage::Prev => "prev",
            ProjectionMessage::RequestCurrent => "requestCurrent",
        }
    }

    /// True for messages that replace the displayed content
    pub fn is_projection(&self) -> bool {
        matches!(self, ProjectionMessage::Show { .. } | ProjectionMessage::ShowHtml { .. })
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("Message is not a JSON object")]
    NotAnObject,

    #[error("Message has no type")]
    MissingType,

    #[error("Unknown message type: {0}")]
    UnknownType(String),

    #[error("Malformed {kind} message: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Serialize a message with the plugin discriminator attached
pub fn encode(message: &ProjectionMessage) -> Result<String, ProtocolError> {
    let mut value = serde_json::to_value(message).map_err(ProtocolError::Json)?;
    let object = value.as_object_mut().ok_or(ProtocolError::NotAnObject)?;
    object.insert(PLUGIN_FIELD.to_string(), Value::String(PLUGIN_ID.to_string()));
    serde_json::to_string(&value).map_err(ProtocolError::Json)
}

/// Parse a message from the wire
///
/// `Ok(None)` means the message doesn't carry our discriminator and should be
/// ignored. Unknown types are rejected rather than skipped.
pub fn decode(raw: &str) -> Result<Option<ProjectionMessage>, ProtocolError> {
    let mut value: Value = serde_json::from_str(raw).map_err(ProtocolError::Json)?;
    let Some(object) = value.as_object_mut() else {
        return Ok(None);
    };

    if object.get(PLUGIN_FIELD).and_then(Value::as_str) != Some(PLUGIN_ID) {
        return Ok(None);
    }
    object.remove(PLUGIN_FIELD);

    let kind = object
        .get(TYPE_FIELD)
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?
        .to_string();
    if !KNOWN_TYPES.contains(&kind.as_str()) {
        return Err(ProtocolError::UnknownType(kind));
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| ProtocolError::Malformed { kind, source })
}
