use std::{
    io::{self, ErrorKind},
    net::TcpStream,
    path::Path,
    sync::Arc,
    time::Duration,
};

use tungstenite::{
    Message, WebSocket, client_tls_with_config, http::Uri, protocol::frame::coding::CloseCode,
    stream::MaybeTlsStream,
};

use crate::{signaling_client::signaling_client_error::SignalingClientError, tls_utils};

/// How long `recv_text` blocks before giving the network thread a chance to
/// drain outgoing commands.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// One open, text-framed signaling socket.
pub trait WsLink: Send {
    /// # Errors
    /// The socket is closed or the write failed.
    fn send_text(&mut self, text: &str) -> Result<(), SignalingClientError>;

    /// Waits briefly for the next text frame. `Ok(None)` means nothing
    /// arrived in time (or a control frame was handled).
    ///
    /// # Errors
    /// [`SignalingClientError::Closed`] when the server closed the socket,
    /// or any transport failure.
    fn recv_text(&mut self) -> Result<Option<String>, SignalingClientError>;

    /// Best-effort close handshake.
    fn close(&mut self);
}

/// Opens [`WsLink`]s. Shared with the network thread.
pub trait Connector: Send + Sync {
    /// # Errors
    /// Bad URL, connection refused, TLS or handshake failure.
    fn connect(&self, url: &str) -> Result<Box<dyn WsLink>, SignalingClientError>;
}

/// Blocking `tungstenite` client over TCP, with rustls for `wss://`.
///
/// Without a pinned CA, `wss://` is verified against the bundled webpki
/// roots.
pub struct TungsteniteConnector {
    tls: Option<Arc<rustls::ClientConfig>>,
    read_timeout: Duration,
}

impl Default for TungsteniteConnector {
    fn default() -> Self {
        Self {
            tls: None,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl TungsteniteConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trusts only the CA(s) in `ca_file` for `wss://`.
    ///
    /// # Errors
    /// [`SignalingClientError::Tls`] if the PEM cannot be loaded.
    pub fn with_ca_file(ca_file: &Path) -> Result<Self, SignalingClientError> {
        let config = tls_utils::build_signaling_client_config(ca_file)
            .map_err(|e| SignalingClientError::Tls(e.to_string()))?;
        Ok(Self {
            tls: Some(config),
            ..Self::default()
        })
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

impl Connector for TungsteniteConnector {
    fn connect(&self, url: &str) -> Result<Box<dyn WsLink>, SignalingClientError> {
        let uri: Uri = url
            .parse()
            .map_err(|_| SignalingClientError::InvalidUrl(url.to_owned()))?;
        let secure = match uri.scheme_str() {
            Some("ws") => false,
            Some("wss") => true,
            _ => return Err(SignalingClientError::InvalidUrl(url.to_owned())),
        };
        let host = uri
            .host()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']'))
            .ok_or_else(|| SignalingClientError::InvalidUrl(url.to_owned()))?;
        let port = uri.port_u16().unwrap_or(if secure { 443 } else { 80 });

        let tcp = TcpStream::connect((host, port))?;
        tcp.set_nodelay(true)?;

        let connector = self.tls.clone().map(tungstenite::Connector::Rustls);
        let (ws, _response) = client_tls_with_config(url, tcp, None, connector)
            .map_err(|e| SignalingClientError::Ws(e.to_string()))?;

        set_read_timeout(&ws, self.read_timeout)?;
        Ok(Box::new(TungsteniteLink { ws }))
    }
}

fn set_read_timeout(
    ws: &WebSocket<MaybeTlsStream<TcpStream>>,
    timeout: Duration,
) -> io::Result<()> {
    match ws.get_ref() {
        MaybeTlsStream::Plain(s) => s.set_read_timeout(Some(timeout)),
        MaybeTlsStream::Rustls(s) => s.sock.set_read_timeout(Some(timeout)),
        _ => Ok(()),
    }
}

struct TungsteniteLink {
    ws: WebSocket<MaybeTlsStream<TcpStream>>,
}

impl WsLink for TungsteniteLink {
    fn send_text(&mut self, text: &str) -> Result<(), SignalingClientError> {
        self.ws
            .send(Message::Text(text.to_owned()))
            .map_err(map_ws_error)
    }

    fn recv_text(&mut self) -> Result<Option<String>, SignalingClientError> {
        match self.ws.read() {
            Ok(Message::Text(t)) => Ok(Some(t)),
            Ok(Message::Close(frame)) => Err(SignalingClientError::Closed(
                frame
                    .filter(|f| f.code != CloseCode::Normal || !f.reason.is_empty())
                    .map(|f| format!("{}: {}", u16::from(f.code), f.reason)),
            )),
            Ok(_) => Ok(None),
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                Ok(None)
            }
            Err(e) => Err(map_ws_error(e)),
        }
    }

    fn close(&mut self) {
        let _ = self.ws.close(None);
        // Drive the close handshake a little; the server may already be gone.
        for _ in 0..4 {
            match self.ws.read() {
                Ok(_) => {}
                Err(_) => break,
            }
        }
    }
}

fn map_ws_error(e: tungstenite::Error) -> SignalingClientError {
    match e {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            SignalingClientError::Closed(None)
        }
        tungstenite::Error::Io(io) => SignalingClientError::Io(io),
        tungstenite::Error::Tls(t) => SignalingClientError::Tls(t.to_string()),
        other => SignalingClientError::Ws(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn rejects_non_ws_urls_before_dialing() {
        let c = TungsteniteConnector::new();
        assert!(matches!(
            c.connect("http://localhost:1/ws"),
            Err(SignalingClientError::InvalidUrl(_))
        ));
        assert!(matches!(
            c.connect("not a url"),
            Err(SignalingClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn missing_ca_file_is_a_tls_error() {
        assert!(matches!(
            TungsteniteConnector::with_ca_file(Path::new("/missing/ca.pem")),
            Err(SignalingClientError::Tls(_))
        ));
    }

    #[test]
    fn refused_connection_is_io() {
        // Bind then drop to get a port nothing listens on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let c = TungsteniteConnector::new();
        assert!(matches!(
            c.connect(&format!("ws://127.0.0.1:{port}/ws/meeting/r/")),
            Err(SignalingClientError::Io(_))
        ));
    }
}
