//! Peer layer: generic link core and the two role specializations.
//!
//! [`PeerLink`] owns framing, lifecycle state and typed dispatch;
//! [`FrontPeer`] and [`TargetPeer`] compose a link with role-specific
//! message constructors and handler sets.

pub mod connection;
pub mod front;
pub mod target;

pub use connection::{Handler, Identity, LinkHooks, PeerLink};
pub use front::{FrontHandlers, FrontPeer};
pub use target::{TargetHandlers, TargetPeer};
