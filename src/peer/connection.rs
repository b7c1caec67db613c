//! Generic peer link: lifecycle state, typed dispatch, outbound framing.
//!
//! A [`PeerLink`] sits between the transport task and the embedding
//! application. Inbound transport events drive the dispatch loop in
//! [`PeerLink::run`]; outbound sends are synchronous and fire-and-forget.
//! Handlers receive `(&PeerLink, &Message)` and may re-entrantly call
//! [`PeerLink::send`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc;

use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::transport::{self, Command, TransportEvent};
use crate::wire::framing;
use crate::wire::message::{Message, MessageType, Role};

/// Identity of the local peer as seen through the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// No identity has been declared yet.
    Unidentified,
    /// [`PeerLink::identify`] was sent; no confirmation received yet.
    NotConfirmed(Role),
    /// Category assigned by the last `identity_confirm` received. The
    /// remote side may overwrite this at any time; confirmation is
    /// informational, not a security control.
    Confirmed(String),
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unidentified => f.write_str("unidentified"),
            Self::NotConfirmed(role) => write!(f, "{role}_not_confirmed"),
            Self::Confirmed(category) => f.write_str(category),
        }
    }
}

/// Handler invoked for one inbound message kind.
pub type Handler = Box<dyn Fn(&PeerLink, &Message) + Send + Sync>;

/// Callback fired on a lifecycle transition with no payload.
pub type LifecycleHook = Box<dyn Fn(&PeerLink) + Send + Sync>;

/// Callback fired with the raw payload of the triggering event.
pub type PayloadHook = Box<dyn Fn(&PeerLink, &str) + Send + Sync>;

/// At most one callback per lifecycle event, plus the send hook.
///
/// All hooks are optional; an unset hook is simply skipped.
#[derive(Default)]
pub struct LinkHooks {
    /// Fired once the WebSocket handshake completes.
    pub on_open: Option<LifecycleHook>,
    /// Fired on a transport fault, with its description.
    pub on_error: Option<PayloadHook>,
    /// Fired for every raw inbound frame, before dispatch.
    pub on_message: Option<PayloadHook>,
    /// Fired when the connection finishes.
    pub on_close: Option<LifecycleHook>,
    /// Fired after every successful send, with the serialized payload
    /// (without the frame header).
    pub on_send: Option<PayloadHook>,
}

impl fmt::Debug for LinkHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkHooks")
            .field("on_open", &self.on_open.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_message", &self.on_message.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_send", &self.on_send.is_some())
            .finish()
    }
}

/// Scalar lifecycle state, guarded so handlers can read and send
/// re-entrantly.
#[derive(Debug)]
struct LinkState {
    connected: bool,
    identity: Identity,
    name: String,
    last_packet_sent: Option<String>,
    last_packet_received: Option<String>,
}

/// The generic framed-connection core.
///
/// Owns the transport channel endpoints, the lifecycle state and the
/// typed handler table. Role-specialized peers compose one of these; see
/// [`crate::peer::front::FrontPeer`] and
/// [`crate::peer::target::TargetPeer`].
pub struct PeerLink {
    commands: mpsc::Sender<Command>,
    events: mpsc::Receiver<TransportEvent>,
    state: Mutex<LinkState>,
    handlers: HashMap<MessageType, Option<Handler>>,
    hooks: LinkHooks,
}

impl fmt::Debug for PeerLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("PeerLink")
            .field("connected", &state.connected)
            .field("identity", &state.identity)
            .field("name", &state.name)
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

impl PeerLink {
    /// Opens a link to the configured endpoint.
    ///
    /// The connect is asynchronous: the link starts disconnected and
    /// [`PeerLink::connected`] flips to `true` once the transport task
    /// reports the open event through [`PeerLink::run`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn open(config: &LinkConfig, hooks: LinkHooks) -> Self {
        let (commands, events) = transport::spawn(config.url(), config.channel_capacity);
        Self::from_channels(commands, events, hooks)
    }

    fn from_channels(
        commands: mpsc::Sender<Command>,
        events: mpsc::Receiver<TransportEvent>,
        hooks: LinkHooks,
    ) -> Self {
        Self {
            commands,
            events,
            state: Mutex::new(LinkState {
                connected: false,
                identity: Identity::Unidentified,
                name: String::new(),
                last_packet_sent: None,
                last_packet_received: None,
            }),
            handlers: HashMap::new(),
            hooks,
        }
    }

    /// Builds a link over raw channels, without a transport task.
    #[cfg(test)]
    pub(crate) fn stub(
        hooks: LinkHooks,
    ) -> (Self, mpsc::Receiver<Command>, mpsc::Sender<TransportEvent>) {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(16);
        (
            Self::from_channels(command_tx, event_rx, hooks),
            command_rx,
            event_tx,
        )
    }

    fn state(&self) -> MutexGuard<'_, LinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serializes and frames a message, then hands it to the transport.
    ///
    /// Fire-and-forget: a failing transport write surfaces later as an
    /// error event, never as a failure of this call. On success the
    /// serialized payload is recorded as the last packet sent and the
    /// send hook fires with it.
    pub fn send(&self, message: &Message) {
        let payload = match message.to_wire() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "dropping unserializable message");
                return;
            }
        };
        let frame = match framing::frame(&payload) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "dropping oversized message");
                return;
            }
        };
        if self.commands.try_send(Command::Send(frame)).is_err() {
            tracing::warn!(kind = %message.kind(), "transport not accepting writes; message dropped");
            return;
        }
        self.state().last_packet_sent = Some(payload.clone());
        if let Some(hook) = &self.hooks.on_send {
            hook(self, &payload);
        }
    }

    /// Requests transport closure. Idempotent from the caller's
    /// perspective; the close takes effect asynchronously.
    pub fn close(&self) {
        if self.commands.try_send(Command::Close).is_err() {
            tracing::debug!("close requested on a finished link");
        }
    }

    /// Declares this peer's role and name to the remote side.
    ///
    /// Sends the `identity` message and optimistically records the
    /// not-yet-confirmed identity and the name. Fire-and-forget: nothing
    /// retries or times out if `identity_confirm` never arrives.
    pub fn identify(&self, role: Role, name: &str, session_id: &str) {
        let message = Message::new(MessageType::Identity)
            .with_field("category", role.as_str())
            .with_field("id_session", session_id)
            .with_field("name", name);
        self.send(&message);
        let mut state = self.state();
        state.identity = Identity::NotConfirmed(role);
        state.name = name.to_string();
    }

    /// Adds or overwrites the handler for one message kind; the last
    /// registration for a kind wins.
    ///
    /// A `None` handler is a registered no-op: the registration is
    /// warned about once, and matching inbound messages are then dropped
    /// silently (unlike an unregistered kind, which warns per message).
    pub fn register(&mut self, kind: MessageType, handler: Option<Handler>) {
        if handler.is_none() {
            tracing::warn!(kind = %kind, "no handler supplied; matching messages will be dropped");
        }
        self.handlers.insert(kind, handler);
    }

    /// Invokes the registered handler for `kind`, if any, with `message`.
    pub(crate) fn invoke(&self, kind: MessageType, message: &Message) {
        if let Some(Some(handler)) = self.handlers.get(&kind) {
            handler(self, message);
        }
    }

    /// Runs the dispatch loop until the connection finishes.
    ///
    /// Consumes transport events, updates lifecycle state, fires hooks
    /// and dispatches inbound frames to registered handlers. Handlers
    /// run synchronously on this loop.
    pub async fn run(&mut self) {
        while let Some(event) = self.events.recv().await {
            let finished = matches!(event, TransportEvent::Closed);
            self.handle_event(event);
            if finished {
                break;
            }
        }
    }

    /// Applies one transport event.
    pub(crate) fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => {
                self.state().connected = true;
                if let Some(hook) = &self.hooks.on_open {
                    hook(self);
                }
            }
            TransportEvent::Error(reason) => {
                self.state().connected = false;
                if let Some(hook) = &self.hooks.on_error {
                    hook(self, &reason);
                }
            }
            TransportEvent::Closed => {
                self.state().connected = false;
                if let Some(hook) = &self.hooks.on_close {
                    hook(self);
                }
            }
            TransportEvent::Frame(raw) => {
                self.state().last_packet_received = Some(raw.clone());
                if let Some(hook) = &self.hooks.on_message {
                    hook(self, &raw);
                }
                if let Err(e) = self.dispatch(&raw) {
                    // a bad frame drops only itself; the connection stays up
                    tracing::warn!(error = %e, raw = %raw, "dropping undecodable frame");
                }
            }
        }
    }

    /// Deframes, parses and dispatches one inbound frame.
    fn dispatch(&self, raw: &str) -> Result<(), LinkError> {
        let (_declared, payload) = framing::decode(raw)?;
        let value: Value = serde_json::from_str(payload)?;
        let Value::Object(body) = value else {
            return Err(LinkError::MissingType);
        };
        let Some(kind) = body.get("type").and_then(Value::as_str).map(String::from) else {
            return Err(LinkError::MissingType);
        };
        let Some(kind) = MessageType::from_wire(&kind) else {
            tracing::warn!(kind = %kind, identity = %self.identity(), raw = %raw, "unknown action");
            return Ok(());
        };
        let message = Message::from_parts(kind, body);

        // identity_confirm updates local state before normal dispatch
        if kind == MessageType::IdentityConfirm {
            match message.str_field("category") {
                Some(category) => self.state().identity = Identity::Confirmed(category.to_string()),
                None => {
                    tracing::warn!("identity_confirm without a string category; identity unchanged");
                }
            }
        }

        match self.handlers.get(&kind) {
            Some(Some(handler)) => handler(self, &message),
            Some(None) => tracing::trace!(kind = %kind, "message kind registered as ignored"),
            None => tracing::warn!(kind = %kind, identity = %self.identity(), raw = %raw, "unknown action"),
        }
        Ok(())
    }

    /// Whether the transport is currently open.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.state().connected
    }

    /// Current handshake identity.
    #[must_use]
    pub fn identity(&self) -> Identity {
        self.state().identity.clone()
    }

    /// Name declared at identify time; empty before that.
    #[must_use]
    pub fn name(&self) -> String {
        self.state().name.clone()
    }

    /// Serialized payload of the most recent outbound message, without
    /// the frame header. For introspection only.
    #[must_use]
    pub fn last_packet_sent(&self) -> Option<String> {
        self.state().last_packet_sent.clone()
    }

    /// Raw text of the most recent inbound frame, header included. For
    /// introspection only.
    #[must_use]
    pub fn last_packet_received(&self) -> Option<String> {
        self.state().last_packet_received.clone()
    }
}
