//! meshrtc is the signaling and peer-connection core of a full-mesh video
//! meeting.
//!
//! One [`Engine`](core::Engine) per meeting view joins a room over a
//! WebSocket, negotiates a peer connection with every other participant,
//! keeps every connection's outgoing tracks in step with local media and
//! reports everything through a typed [`EventBus`](event_bus::EventBus).
//!
//! Peer connections and capture devices sit behind traits so the core runs
//! against the native `webrtc` backend (feature `webrtc-rs`) or against test
//! doubles.

/// Native peer connections over the `webrtc` crate.
#[cfg(feature = "webrtc-rs")]
pub mod backend;
/// Chat history with live-caption collapsing.
pub mod chat;
/// Wall-clock helpers.
pub mod clock;
/// Handles configuration loading and management.
pub mod config;
/// Session controller, event loop and negotiation.
pub mod core;
/// Typed publish/subscribe between the core and its consumers.
pub mod event_bus;
/// Logging utilities for the application.
pub mod log;
/// Local media, capture devices and sender propagation.
pub mod media;
/// Per-peer state and the peer connection seam.
pub mod peer;
/// Signaling wire protocol.
pub mod signaling;
/// Signaling socket client.
pub mod signaling_client;
/// TLS (Transport Layer Security) utility functions.
pub mod tls_utils;

#[cfg(test)]
mod test_support;
