//! Wire layer: length framing and the typed message catalogue.
//!
//! Everything sent over the transport is one [`framing`] frame carrying
//! exactly one serialized [`Message`].

pub mod framing;
pub mod message;

pub use message::{Message, MessageType, Role};
