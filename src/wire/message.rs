//! Wire message envelope and the closed message-type catalogue.
//!
//! A message is a JSON object carrying a `type` discriminator. The
//! discriminators form a closed set, [`MessageType`]; handler tables are
//! keyed by this enum so an unregisterable key cannot exist. Beyond
//! `type`, each message kind defines its own fields, kept as a plain
//! JSON object because several kinds leave their fields to the
//! application.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LinkError;

/// Peer role declared during the identity handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The request issuer.
    Front,
    /// The request executor.
    Target,
}

impl Role {
    /// Wire string for this role (the `category` field of `identity`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Target => "target",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed catalogue of wire message discriminators.
///
/// The serde snake_case names are exactly the strings on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Identity declaration sent by either side.
    Identity,
    /// Remote confirmation of an identity declaration.
    IdentityConfirm,
    /// Front → target: execute a textual request.
    Request,
    /// Target → front: request acknowledged.
    RequestConfirm,
    /// Target → front: answer to a request.
    Answer,
    /// Front → target: pin the target's clock to a fixed date.
    SetFixedTime,
    /// Target → front: fixed clock applied.
    SetFixedTimeOk,
    /// Target → front: one interaction record.
    Interaction,
    /// Target → front: a batch of interaction records.
    InteractionArray,
    /// Target → front: remove one interaction record.
    DelInteraction,
    /// Front → target: invoke an operation on the target.
    Call,
    /// Front → target: acknowledge one interaction.
    ConfirmInteraction,
    /// Front → target: acknowledge an interaction batch.
    ConfirmInteractionArray,
    /// Application-level error, either direction.
    Error,
}

impl MessageType {
    /// Wire string for this message kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::IdentityConfirm => "identity_confirm",
            Self::Request => "request",
            Self::RequestConfirm => "request_confirm",
            Self::Answer => "answer",
            Self::SetFixedTime => "set_fixed_time",
            Self::SetFixedTimeOk => "set_fixed_time_ok",
            Self::Interaction => "interaction",
            Self::InteractionArray => "interaction_array",
            Self::DelInteraction => "del_interaction",
            Self::Call => "call",
            Self::ConfirmInteraction => "confirm_interaction",
            Self::ConfirmInteractionArray => "confirm_interaction_array",
            Self::Error => "error",
        }
    }

    /// Parses a wire string into a message kind.
    ///
    /// Returns `None` for any string outside the catalogue; the caller
    /// decides how to report it.
    #[must_use]
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "identity" => Some(Self::Identity),
            "identity_confirm" => Some(Self::IdentityConfirm),
            "request" => Some(Self::Request),
            "request_confirm" => Some(Self::RequestConfirm),
            "answer" => Some(Self::Answer),
            "set_fixed_time" => Some(Self::SetFixedTime),
            "set_fixed_time_ok" => Some(Self::SetFixedTimeOk),
            "interaction" => Some(Self::Interaction),
            "interaction_array" => Some(Self::InteractionArray),
            "del_interaction" => Some(Self::DelInteraction),
            "call" => Some(Self::Call),
            "confirm_interaction" => Some(Self::ConfirmInteraction),
            "confirm_interaction_array" => Some(Self::ConfirmInteractionArray),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One wire message: a JSON object with a `type` discriminator.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    kind: MessageType,
    body: Map<String, Value>,
}

impl Message {
    /// Creates an empty message of the given kind. The `type` field is
    /// set from the kind; further fields are added with
    /// [`Message::with_field`].
    #[must_use]
    pub fn new(kind: MessageType) -> Self {
        let mut body = Map::new();
        body.insert("type".to_string(), Value::from(kind.as_str()));
        Self { kind, body }
    }

    /// Wraps an already-built JSON object whose `type` field matches
    /// `kind`.
    #[must_use]
    pub fn from_parts(kind: MessageType, body: Map<String, Value>) -> Self {
        debug_assert_eq!(
            body.get("type").and_then(Value::as_str),
            Some(kind.as_str())
        );
        Self { kind, body }
    }

    /// Adds or overwrites one field.
    #[must_use]
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.body.insert(key.to_string(), value.into());
        self
    }

    /// Message kind (the `type` discriminator).
    #[must_use]
    pub fn kind(&self) -> MessageType {
        self.kind
    }

    /// All fields, `type` included.
    #[must_use]
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// One field by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// One field by name, as a string slice.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }

    /// Serializes the message to its wire JSON text (without the frame
    /// header).
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Json`] if serialization fails; this cannot
    /// happen for messages built from JSON values.
    pub fn to_wire(&self) -> Result<String, LinkError> {
        Ok(serde_json::to_string(&self.body)?)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        let kinds = [
            MessageType::Identity,
            MessageType::IdentityConfirm,
            MessageType::Request,
            MessageType::RequestConfirm,
            MessageType::Answer,
            MessageType::SetFixedTime,
            MessageType::SetFixedTimeOk,
            MessageType::Interaction,
            MessageType::InteractionArray,
            MessageType::DelInteraction,
            MessageType::Call,
            MessageType::ConfirmInteraction,
            MessageType::ConfirmInteractionArray,
            MessageType::Error,
        ];
        for kind in kinds {
            assert_eq!(MessageType::from_wire(kind.as_str()), Some(kind));
        }
        assert_eq!(MessageType::from_wire("bogus"), None);
    }

    #[test]
    fn builder_sets_type_field() {
        let message = Message::new(MessageType::Answer).with_field("text", "ok");
        assert_eq!(message.kind(), MessageType::Answer);
        assert_eq!(message.str_field("type"), Some("answer"));
        assert_eq!(message.str_field("text"), Some("ok"));
    }

    #[test]
    fn serializes_with_sorted_keys() {
        let message = Message::new(MessageType::Request)
            .with_field("language", "en-us")
            .with_field("text", "hello");
        let Ok(wire) = message.to_wire() else {
            panic!("serialization failed");
        };
        assert_eq!(
            wire,
            r#"{"language":"en-us","text":"hello","type":"request"}"#
        );
    }

    #[test]
    fn role_wire_strings() {
        assert_eq!(Role::Front.as_str(), "front");
        assert_eq!(Role::Target.to_string(), "target");
    }
}
