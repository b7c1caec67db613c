//! # framelink
//!
//! Length-framed JSON messaging peer over a WebSocket.
//!
//! Two kinds of peers share one full-duplex connection: a **front**
//! issues requests, a **target** executes them and pushes interaction
//! records back. Every wire unit is one 8-digit-length-prefixed JSON
//! message; inbound messages are dispatched to registered handlers keyed
//! by a closed message-type enumeration.
//!
//! ## Architecture
//!
//! ```text
//! Application (handlers, hooks)
//!     │
//!     ├── FrontPeer / TargetPeer (peer/)
//!     ├── PeerLink dispatch loop (peer/)
//!     │
//!     ├── Message catalogue + framing (wire/)
//!     │
//!     └── WebSocket transport task (transport)
//! ```
//!
//! The transport task exclusively owns the socket; it exchanges commands
//! and events with the dispatch loop over channels. Handlers run
//! synchronously on the dispatch loop and may re-entrantly send.

pub mod config;
pub mod error;
pub mod peer;
pub mod transport;
pub mod wire;
