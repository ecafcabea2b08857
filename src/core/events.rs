use crate::peer::peer_event::PeerEvent;

/// What the signaling network thread reports.
#[derive(Debug)]
pub enum TransportEvent {
    Open,
    /// One inbound text frame, still undecoded.
    Message(String),
    Error(String),
    Closed { reason: Option<String> },
}

/// Everything the engine's poll loop consumes, in arrival order.
///
/// Each event is tagged with the generation it belongs to (socket link id,
/// or session epoch plus connection id) so stale events can be dropped.
#[derive(Debug)]
pub enum SessionEvent {
    Transport {
        link_id: u64,
        event: TransportEvent,
    },
    Peer {
        epoch: u64,
        peer_id: String,
        conn_id: u64,
        event: PeerEvent,
    },
}
