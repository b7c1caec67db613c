//! Front peer: the request issuer.
//!
//! Composes a [`PeerLink`] with the front-facing handler set and the
//! outbound constructors for requests and the virtual clock.

use std::fmt;

use crate::config::LinkConfig;
use crate::peer::connection::{Handler, LinkHooks, PeerLink};
use crate::wire::message::{Message, MessageType, Role};

/// Language tag for French requests.
pub const LANG_FR: &str = "fr-fr";

/// Language tag for US-English requests.
pub const LANG_EN: &str = "en-us";

/// Handler set for the six message kinds a front peer consumes.
///
/// Every slot is optional. A `None` slot is registered as a no-op (the
/// kind is known but its messages are dropped), which is warned about at
/// registration time.
#[derive(Default)]
pub struct FrontHandlers {
    /// `identity_confirm`: the remote side confirmed our identity.
    pub identity_confirm: Option<Handler>,
    /// `request_confirm`: the target acknowledged a request.
    pub request_confirm: Option<Handler>,
    /// `answer`: the target answered a request.
    pub answer: Option<Handler>,
    /// `set_fixed_time_ok`: the target applied the fixed clock.
    pub set_fixed_time_ok: Option<Handler>,
    /// `request`: fired for our own outbound requests (self-echo).
    pub request: Option<Handler>,
    /// `error`: application-level error pushed by the remote side.
    pub error: Option<Handler>,
}

impl fmt::Debug for FrontHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrontHandlers")
            .field("identity_confirm", &self.identity_confirm.is_some())
            .field("request_confirm", &self.request_confirm.is_some())
            .field("answer", &self.answer.is_some())
            .field("set_fixed_time_ok", &self.set_fixed_time_ok.is_some())
            .field("request", &self.request.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

/// The request-issuing peer.
#[derive(Debug)]
pub struct FrontPeer {
    link: PeerLink,
}

impl FrontPeer {
    /// Opens a front link to the configured endpoint.
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

    /// Binds the front-facing message kinds to the supplied handlers.
    pub fn register_handlers(&mut self, handlers: FrontHandlers) {
        self.link
            .register(MessageType::IdentityConfirm, handlers.identity_confirm);
        self.link
            .register(MessageType::RequestConfirm, handlers.request_confirm);
        self.link.register(MessageType::Answer, handlers.answer);
        self.link
            .register(MessageType::SetFixedTimeOk, handlers.set_fixed_time_ok);
        self.link.register(MessageType::Request, handlers.request);
        self.link.register(MessageType::Error, handlers.error);
    }

    /// Declares this peer as a front.
    pub fn identify(&self, name: &str, session_id: &str) {
        self.link.identify(Role::Front, name, session_id);
    }

    /// Sends a textual request in the given language.
    ///
    /// After the send, the locally registered `request` handler (if any)
    /// is invoked with the outbound message: the front observes its own
    /// outgoing requests through the same handler that would see inbound
    /// ones.
    pub fn send_request(&self, language: &str, text: &str) {
        let request = Message::new(MessageType::Request)
            .with_field("language", language)
            .with_field("text", text);
        self.link.send(&request);
        self.link.invoke(MessageType::Request, &request);
    }

    /// Pins the target's clock to a fixed date and time.
    ///
    /// Confirmation arrives later as an independent `set_fixed_time_ok`
    /// message routed through normal dispatch; nothing waits for it.
    /// The wire key for the seconds field is literally `seconde`.
    pub fn set_fixed_time(&self, year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) {
        let message = Message::new(MessageType::SetFixedTime)
            .with_field("year", year)
            .with_field("month", month)
            .with_field("day", day)
            .with_field("hour", hour)
            .with_field("minute", minute)
            .with_field("seconde", second);
        self.link.send(&message);
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::{Arc, Mutex};

    use futures_util::{SinkExt, StreamExt};

    use super::*;
    use crate::peer::connection::Identity;
    use crate::transport::Command;
    use crate::wire::framing;

    fn stub_front() -> (
        FrontPeer,
        tokio::sync::mpsc::Receiver<Command>,
        tokio::sync::mpsc::Sender<crate::transport::TransportEvent>,
    ) {
        let (link, commands, events) = PeerLink::stub(LinkHooks::default());
        (FrontPeer { link }, commands, events)
    }

    #[test]
    fn identify_uses_front_role() {
        let (front, _commands, _events) = stub_front();
        front.identify("console", "s-7");
        assert_eq!(front.link().identity().to_string(), "front_not_confirmed");
        assert_eq!(front.link().name(), "console");
    }

    #[test]
    fn send_request_frames_exactly_and_self_echoes() {
        let echoed = Arc::new(Mutex::new(Vec::<Message>::new()));
        let echoed_handler = Arc::clone(&echoed);
        let (mut front, mut commands, _events) = stub_front();
        front.register_handlers(FrontHandlers {
            request: Some(Box::new(move |_link, message| {
                if let Ok(mut log) = echoed_handler.lock() {
                    log.push(message.clone());
                }
            })),
            ..FrontHandlers::default()
        });

        front.send_request(LANG_EN, "hello");

        let Ok(Command::Send(frame)) = commands.try_recv() else {
            panic!("send_request must write one frame");
        };
        assert_eq!(
            frame,
            "00000052{\"language\":\"en-us\",\"text\":\"hello\",\"type\":\"request\"}"
        );

        // the self-echo is a local notification, not a second wire write
        assert!(commands.try_recv().is_err());
        let Ok(log) = echoed.lock() else {
            panic!("echo log poisoned");
        };
        assert_eq!(log.len(), 1);
        let Some(echo) = log.first() else {
            panic!("echo missing");
        };
        assert_eq!(echo.kind(), MessageType::Request);
        assert_eq!(echo.str_field("text"), Some("hello"));
    }

    #[test]
    fn set_fixed_time_uses_the_seconde_key() {
        let (front, mut commands, _events) = stub_front();
        front.set_fixed_time(1999, 12, 31, 23, 59, 58);

        let Ok(Command::Send(frame)) = commands.try_recv() else {
            panic!("set_fixed_time must write one frame");
        };
        let Ok((_, payload)) = framing::decode(&frame) else {
            panic!("frame must decode");
        };
        assert_eq!(
            payload,
            r#"{"day":31,"hour":23,"minute":59,"month":12,"seconde":58,"type":"set_fixed_time","year":1999}"#
        );
    }

    #[tokio::test]
    async fn identify_confirm_round_trip_over_loopback() {
        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("local_addr failed");
        };

        // minimal remote side: confirm the first identity it sees
        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                return;
            };
            while let Some(Ok(msg)) = ws.next().await {
                let Ok(text) = msg.to_text() else { continue };
                if text.contains("\"identity\"") {
                    let body = r#"{"type":"identity_confirm","category":"front"}"#;
                    let reply = format!("{:08}{body}", body.len());
                    if ws
                        .send(tokio_tungstenite::tungstenite::Message::text(reply))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
        });

        let config = LinkConfig::new("127.0.0.1", addr.port());
        let mut front = FrontPeer::open(&config, LinkHooks::default());
        front.register_handlers(FrontHandlers {
            identity_confirm: Some(Box::new(|link, _message| link.close())),
            ..FrontHandlers::default()
        });

        // queued until the handshake completes, then written in order
        front.identify("console", "s-1");
        front.run().await;

        assert_eq!(
            front.link().identity(),
            Identity::Confirmed("front".to_string())
        );
        assert!(!front.link().connected());
    }
}
