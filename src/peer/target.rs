//! Target peer: the request executor.
//!
//! Composes a [`PeerLink`] with the target-facing handler set and the
//! outbound constructors for pushing and deleting interaction records.

use std::fmt;

use serde_json::{Map, Value};

use crate::config::LinkConfig;
use crate::peer::connection::{Handler, LinkHooks, PeerLink};
use crate::wire::message::{Message, MessageType, Role};

/// Handler set for the five message kinds a target peer consumes.
///
/// Every slot is optional. A `None` slot is registered as a no-op (the
/// kind is known but its messages are dropped), which is warned about at
/// registration time.
#[derive(Default)]
pub struct TargetHandlers {
    /// `identity_confirm`: the remote side confirmed our identity.
    pub identity_confirm: Option<Handler>,
    /// `call`: the front invokes an operation on this target.
    pub call: Option<Handler>,
    /// `confirm_interaction`: the front acknowledged one interaction.
    pub confirm_interaction: Option<Handler>,
    /// `confirm_interaction_array`: the front acknowledged a batch.
    pub confirm_interaction_array: Option<Handler>,
    /// `error`: application-level error pushed by the remote side.
    pub error: Option<Handler>,
}

impl fmt::Debug for TargetHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetHandlers")
            .field("identity_confirm", &self.identity_confirm.is_some())
            .field("call", &self.call.is_some())
            .field("confirm_interaction", &self.confirm_interaction.is_some())
            .field(
                "confirm_interaction_array",
                &self.confirm_interaction_array.is_some(),
            )
            .field("error", &self.error.is_some())
            .finish()
    }
}

/// The request-executing peer.
#[derive(Debug)]
pub struct TargetPeer {
    link: PeerLink,
}

impl TargetPeer {
    /// Opens a target link to the configured endpoint.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn open(config: &LinkConfig, hooks: LinkHooks) -> Self {
        Self {
            link: PeerLink::open(config, hooks),
        }
    }

    /// The underlying link, for state introspection and generic sends.
    #[must_use]
    pub fn link(&self) -> &PeerLink {
        &self.link
    }

    /// Mutable access to the underlying link, for extra registrations.
    #[must_use]
    pub fn link_mut(&mut self) -> &mut PeerLink {
        &mut self.link
    }

    /// Runs the dispatch loop until the connection finishes.
    pub async fn run(&mut self) {
        self.link.run().await;
    }

    /// Binds the target-facing message kinds to the supplied handlers.
    pub fn register_handlers(&mut self, handlers: TargetHandlers) {
        self.link
            .register(MessageType::IdentityConfirm, handlers.identity_confirm);
        self.link.register(MessageType::Call, handlers.call);
        self.link
            .register(MessageType::ConfirmInteraction, handlers.confirm_interaction);
        self.link.register(
            MessageType::ConfirmInteractionArray,
            handlers.confirm_interaction_array,
        );
        self.link.register(MessageType::Error, handlers.error);
    }

    /// Declares this peer as a target.
    pub fn identify(&self, name: &str, session_id: &str) {
        self.link.identify(Role::Target, name, session_id);
    }

    /// Pushes a batch of interaction records. The records themselves are
    /// opaque to this layer.
    pub fn send_interaction_array(&self, interactions: Vec<Value>) {
        let message =
            Message::new(MessageType::InteractionArray).with_field("interactions", interactions);
        self.link.send(&message);
    }

    /// Pushes one interaction record.
    ///
    /// The caller's object is mutated in place: its `type` field is
    /// forced to `"interaction"` before the send, and stays that way
    /// afterwards. Callers must not assume their original `type` value
    /// is preserved.
    pub fn send_interaction(&self, interaction: &mut Map<String, Value>) {
        interaction.insert("type".to_string(), Value::from("interaction"));
        let message = Message::from_parts(MessageType::Interaction, interaction.clone());
        self.link.send(&message);
    }

    /// Asks the front to remove one interaction record.
    pub fn delete_interaction(&self, id: impl Into<Value>) {
        let message = Message::new(MessageType::DelInteraction).with_field("id_interaction", id);
        self.link.send(&message);
    }
}
