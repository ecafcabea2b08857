//! In-process signaling sockets for tests and offline demos.
//!
//! [`MemoryConnector::new`] returns the client-side connector and a
//! [`MemoryServer`] that accepts each connection as a [`ServerSocket`].
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
    },
    time::Duration,
};

use crate::signaling_client::{
    signaling_client_error::SignalingClientError,
    ws_link::{Connector, WsLink},
};

const POLL: Duration = Duration::from_millis(5);

struct Pipe {
    tx: Sender<String>,
    rx: Receiver<String>,
    /// Set by whichever side closes first.
    closed: Arc<AtomicBool>,
}

impl Pipe {
    fn pair() -> (Pipe, Pipe) {
        let (a_tx, a_rx) = mpsc::channel();
        let (b_tx, b_rx) = mpsc::channel();
        let closed = Arc::new(AtomicBool::new(false));
        (
            Pipe {
                tx: a_tx,
                rx: b_rx,
                closed: closed.clone(),
            },
            Pipe {
                tx: b_tx,
                rx: a_rx,
                closed,
            },
        )
    }

    fn send(&self, text: &str) -> Result<(), SignalingClientError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SignalingClientError::Closed(None));
        }
        self.tx
            .send(text.to_owned())
            .map_err(|_| SignalingClientError::Closed(None))
    }

    fn recv(&self, wait: Duration) -> Result<Option<String>, SignalingClientError> {
        match self.rx.recv_timeout(wait) {
            Ok(t) => Ok(Some(t)),
            Err(RecvTimeoutError::Timeout) if !self.closed.load(Ordering::Acquire) => Ok(None),
            Err(_) => Err(SignalingClientError::Closed(None)),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Client end handed to the transport.
pub struct MemoryLink(Pipe);

impl WsLink for MemoryLink {
    fn send_text(&mut self, text: &str) -> Result<(), SignalingClientError> {
        self.0.send(text)
    }

    fn recv_text(&mut self) -> Result<Option<String>, SignalingClientError> {
        self.0.recv(POLL)
    }

    fn close(&mut self) {
        self.0.close();
    }
}

/// Server end of one accepted connection.
pub struct ServerSocket {
    pub url: String,
    pipe: Pipe,
}

impl ServerSocket {
    /// Returns `false` once the client has closed.
    pub fn send(&self, text: &str) -> bool {
        self.pipe.send(text).is_ok()
    }

    /// `Ok(None)` on timeout; `Err` once the client has closed and every
    /// frame it sent has been read.
    ///
    /// # Errors
    /// [`SignalingClientError::Closed`] after the client closed.
    pub fn recv(&self, wait: Duration) -> Result<Option<String>, SignalingClientError> {
        self.pipe.recv(wait)
    }

    pub fn close(&self) {
        self.pipe.close();
    }

    pub fn is_closed(&self) -> bool {
        self.pipe.closed.load(Ordering::Acquire)
    }
}

#[derive(Default)]
struct Shared {
    refuse: AtomicBool,
}

pub struct MemoryConnector {
    accept_tx: Mutex<Sender<ServerSocket>>,
    shared: Arc<Shared>,
}

pub struct MemoryServer {
    accept_rx: Receiver<ServerSocket>,
    shared: Arc<Shared>,
}

impl MemoryConnector {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (MemoryConnector, MemoryServer) {
        let (accept_tx, accept_rx) = mpsc::channel();
        let shared = Arc::new(Shared::default());
        (
            MemoryConnector {
                accept_tx: Mutex::new(accept_tx),
                shared: shared.clone(),
            },
            MemoryServer { accept_rx, shared },
        )
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, url: &str) -> Result<Box<dyn WsLink>, SignalingClientError> {
        if self.shared.refuse.load(Ordering::Acquire) {
            return Err(SignalingClientError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "memory server refusing connections",
            )));
        }
        let (client, server) = Pipe::pair();
        let accept = self
            .accept_tx
            .lock()
            .map_err(|_| SignalingClientError::Disconnected)?;
        accept
            .send(ServerSocket {
                url: url.to_owned(),
                pipe: server,
            })
            .map_err(|_| SignalingClientError::Disconnected)?;
        Ok(Box::new(MemoryLink(client)))
    }
}

impl MemoryServer {
    pub fn accept(&self, wait: Duration) -> Option<ServerSocket> {
        self.accept_rx.recv_timeout(wait).ok()
    }

    /// While set, `connect` fails with `ConnectionRefused`.
    pub fn set_refusing(&self, refuse: bool) {
        self.shared.refuse.store(refuse, Ordering::Release);
    }
}
