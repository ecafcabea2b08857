use std::{
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
        mpsc::{self, Receiver, Sender, TryRecvError},
    },
    thread,
};

use crate::{
    core::events::{SessionEvent, TransportEvent},
    log::LogSink,
    signaling::SignalMsg,
    signaling_client::{
        signaling_client_error::SignalingClientError, signaling_command::SignalingCommand,
        ws_link::Connector,
    },
    sink_debug, sink_info, sink_trace, sink_warn,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TransportState {
    Connecting = 0,
    Open = 1,
    Closed = 2,
}

impl TransportState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => TransportState::Connecting,
            1 => TransportState::Open,
            _ => TransportState::Closed,
        }
    }
}

/// One signaling socket, driven by its own network thread.
///
/// The thread connects, sends the introduction frame, then alternates
/// between writing queued frames and reading inbound ones. Everything it
/// observes is posted to the engine queue as [`TransportEvent`]s tagged with
/// this socket's `link_id`. It never reconnects on its own.
pub struct SignalingTransport {
    link_id: u64,
    state: Arc<AtomicU8>,
    cmd_tx: Sender<SignalingCommand>,
    log: Arc<dyn LogSink>,
}

impl SignalingTransport {
    /// Spawns the network thread for `url`. `intro` is sent right after the
    /// socket opens, before any other frame.
    ///
    /// # Errors
    /// [`SignalingClientError::Io`] if the thread cannot be spawned.
    pub fn open(
        connector: Arc<dyn Connector>,
        url: String,
        intro: String,
        events: Sender<SessionEvent>,
        link_id: u64,
        log: Arc<dyn LogSink>,
    ) -> Result<Self, SignalingClientError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<SignalingCommand>();
        let state = Arc::new(AtomicU8::new(TransportState::Connecting as u8));

        let worker = NetworkWorker {
            link_id,
            state: state.clone(),
            events,
            log: log.clone(),
        };
        thread::Builder::new()
            .name(format!("meshrtc-signaling-{link_id}"))
            .spawn(move || worker.run(connector.as_ref(), &url, &intro, &cmd_rx))?;

        Ok(Self {
            link_id,
            state,
            cmd_tx,
            log,
        })
    }

    pub fn link_id(&self) -> u64 {
        self.link_id
    }

    pub fn state(&self) -> TransportState {
        TransportState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == TransportState::Open
    }

    /// Queues `msg` if the socket is open; otherwise drops it.
    /// Returns whether it was queued. Delivery is never confirmed.
    pub fn send(&self, msg: &SignalMsg) -> bool {
        if !self.is_open() {
            sink_trace!(self.log, "[signaling] dropped {} while not open", msg.kind());
            return false;
        }
        match msg.encode() {
            Ok(text) => self.cmd_tx.send(SignalingCommand::Send(text)).is_ok(),
            Err(e) => {
                sink_warn!(self.log, "[signaling] could not encode {}: {e}", msg.kind());
                false
            }
        }
    }

    /// Sends `farewell` if open (best-effort) and closes the socket.
    pub fn disconnect(&self, farewell: Option<&SignalMsg>) {
        let farewell = farewell
            .filter(|_| self.is_open())
            .and_then(|m| m.encode().ok());
        self.state
            .store(TransportState::Closed as u8, Ordering::Release);
        let _ = self.cmd_tx.send(SignalingCommand::Disconnect { farewell });
    }
}

impl Drop for SignalingTransport {
    fn drop(&mut self) {
        if self.state() != TransportState::Closed {
            self.disconnect(None);
        }
    }
}

struct NetworkWorker {
    link_id: u64,
    state: Arc<AtomicU8>,
    events: Sender<SessionEvent>,
    log: Arc<dyn LogSink>,
}

impl NetworkWorker {
    fn emit(&self, event: TransportEvent) -> bool {
        self.events
            .send(SessionEvent::Transport {
                link_id: self.link_id,
                event,
            })
            .is_ok()
    }

    fn set_state(&self, s: TransportState) {
        self.state.store(s as u8, Ordering::Release);
    }

    fn closed(&self) -> bool {
        self.state.load(Ordering::Acquire) == TransportState::Closed as u8
    }

    fn fail(&self, err: &SignalingClientError) {
        self.set_state(TransportState::Closed);
        let reason = match err {
            SignalingClientError::Closed(r) => r.clone(),
            other => {
                self.emit(TransportEvent::Error(other.to_string()));
                Some(other.to_string())
            }
        };
        self.emit(TransportEvent::Closed { reason });
    }

    fn run(
        self,
        connector: &dyn Connector,
        url: &str,
        intro: &str,
        cmd_rx: &Receiver<SignalingCommand>,
    ) {
        sink_debug!(self.log, "[signaling] link {} connecting to {url}", self.link_id);
        let mut link = match connector.connect(url) {
            Ok(l) => l,
            Err(e) => {
                sink_warn!(self.log, "[signaling] connect to {url} failed: {e}");
                if !self.closed() {
                    self.fail(&e);
                }
                return;
            }
        };

        // A disconnect may have raced the handshake.
        if self.closed() {
            link.close();
            return;
        }

        if let Err(e) = link.send_text(intro) {
            self.fail(&e);
            return;
        }
        self.set_state(TransportState::Open);
        sink_info!(self.log, "[signaling] link {} open", self.link_id);
        if !self.emit(TransportEvent::Open) {
            link.close();
            return;
        }

        loop {
            loop {
                match cmd_rx.try_recv() {
                    Ok(SignalingCommand::Send(text)) => {
                        if let Err(e) = link.send_text(&text) {
                            sink_warn!(self.log, "[signaling] send failed: {e}");
                            self.fail(&e);
                            return;
                        }
                    }
                    Ok(SignalingCommand::Disconnect { farewell }) => {
                        if let Some(text) = farewell {
                            let _ = link.send_text(&text);
                        }
                        link.close();
                        sink_debug!(self.log, "[signaling] link {} closed by client", self.link_id);
                        return;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        link.close();
                        return;
                    }
                }
            }

            match link.recv_text() {
                Ok(Some(text)) => {
                    if !self.emit(TransportEvent::Message(text)) {
                        link.close();
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    if !self.closed() {
                        sink_info!(self.log, "[signaling] link {} lost: {e}", self.link_id);
                        self.fail(&e);
                    }
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::{
        log::NoopLogSink,
        signaling::SignalMsg,
        signaling_client::memory_link::{MemoryConnector, ServerSocket},
    };
    use std::time::{Duration, Instant};

    const WAIT: Duration = Duration::from_secs(2);

    fn next(rx: &Receiver<SessionEvent>) -> (u64, TransportEvent) {
        match rx.recv_timeout(WAIT).unwrap() {
            SessionEvent::Transport { link_id, event } => (link_id, event),
            SessionEvent::Peer { .. } => panic!("unexpected peer event"),
        }
    }

    fn recv_frame(sock: &ServerSocket) -> String {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if let Some(t) = sock.recv(Duration::from_millis(20)).unwrap() {
                return t;
            }
        }
        panic!("no frame from client");
    }

    fn intro() -> String {
        SignalMsg::Introduce {
            name: "Ana".into(),
            room_id: "r1".into(),
        }
        .encode()
        .unwrap()
    }

    #[test]
    fn sends_intro_first_then_relays_both_ways() {
        let (connector, server) = MemoryConnector::new();
        let (tx, rx) = mpsc::channel();
        let t = SignalingTransport::open(
            Arc::new(connector),
            "ws://memory/ws/meeting/r1/".into(),
            intro(),
            tx,
            7,
            Arc::new(NoopLogSink),
        )
        .unwrap();

        let sock = server.accept(WAIT).unwrap();
        assert_eq!(sock.url, "ws://memory/ws/meeting/r1/");
        assert!(matches!(next(&rx), (7, TransportEvent::Open)));
        assert_eq!(recv_frame(&sock), intro());
        assert!(t.is_open());

        assert!(t.send(&SignalMsg::ChatMessage(serde_json::json!({"text": "hi"}))));
        assert!(recv_frame(&sock).contains("chat-message"));

        assert!(sock.send(r#"{"type":"assign-id","payload":{"id":"me"}}"#));
        let (_, ev) = next(&rx);
        assert!(matches!(ev, TransportEvent::Message(m) if m.contains("assign-id")));
    }

    #[test]
    fn disconnect_sends_farewell_and_stops_sending() {
        let (connector, server) = MemoryConnector::new();
        let (tx, rx) = mpsc::channel();
        let t = SignalingTransport::open(
            Arc::new(connector),
            "ws://memory/x".into(),
            intro(),
            tx,
            1,
            Arc::new(NoopLogSink),
        )
        .unwrap();
        let sock = server.accept(WAIT).unwrap();
        assert!(matches!(next(&rx), (1, TransportEvent::Open)));
        let _ = recv_frame(&sock);

        t.disconnect(Some(&SignalMsg::Leave {
            room_id: "r1".into(),
        }));
        assert!(recv_frame(&sock).contains("leave"));
        assert_eq!(t.state(), TransportState::Closed);
        assert!(!t.send(&SignalMsg::Leave {
            room_id: "r1".into()
        }));
    }

    #[test]
    fn refused_connect_reports_error_then_closed() {
        let (connector, server) = MemoryConnector::new();
        server.set_refusing(true);
        let (tx, rx) = mpsc::channel();
        let t = SignalingTransport::open(
            Arc::new(connector),
            "ws://memory/x".into(),
            intro(),
            tx,
            3,
            Arc::new(NoopLogSink),
        )
        .unwrap();
        assert!(matches!(next(&rx), (3, TransportEvent::Error(_))));
        assert!(matches!(next(&rx), (3, TransportEvent::Closed { reason: Some(_) })));
        assert_eq!(t.state(), TransportState::Closed);
    }

    #[test]
    fn server_close_is_reported_once() {
        let (connector, server) = MemoryConnector::new();
        let (tx, rx) = mpsc::channel();
        let _t = SignalingTransport::open(
            Arc::new(connector),
            "ws://memory/x".into(),
            intro(),
            tx,
            4,
            Arc::new(NoopLogSink),
        )
        .unwrap();
        let sock = server.accept(WAIT).unwrap();
        assert!(matches!(next(&rx), (4, TransportEvent::Open)));
        sock.close();
        assert!(matches!(next(&rx), (4, TransportEvent::Closed { reason: None })));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn send_before_open_is_dropped() {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let t = SignalingTransport {
            link_id: 9,
            state: Arc::new(AtomicU8::new(TransportState::Connecting as u8)),
            cmd_tx,
            log: Arc::new(NoopLogSink),
        };
        assert!(!t.send(&SignalMsg::Leave {
            room_id: "r".into()
        }));
        assert!(cmd_rx.try_recv().is_err());
    }
}
