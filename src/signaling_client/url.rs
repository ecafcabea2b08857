use std::path::PathBuf;

use crate::signaling_client::signaling_client_error::SignalingClientError;

/// Where the room socket lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignalingEndpoint {
    /// Explicit server base (`ws://`, `wss://`, `http://` or `https://`).
    /// Wins over `page_origin` when set.
    pub base_url: Option<String>,
    /// Origin of the page the meeting runs in; its scheme picks ws or wss.
    pub page_origin: String,
    /// Path with a `{room}` placeholder.
    pub path_template: String,
    /// PEM CA to pin for `wss://` instead of the public roots.
    pub ca_file: Option<PathBuf>,
}

impl Default for SignalingEndpoint {
    fn default() -> Self {
        Self {
            base_url: None,
            page_origin: "http://localhost:8000".into(),
            path_template: "/ws/meeting/{room}/".into(),
            ca_file: None,
        }
    }
}

/// Builds the socket URL for `room`.
///
/// `http` maps to `ws` and `https` to `wss`; a trailing slash on the base is
/// dropped before the path is appended.
///
/// # Errors
/// [`SignalingClientError::InvalidRoomId`] unless the room id is non-empty
/// ASCII alphanumerics, `-` or `_`; [`SignalingClientError::InvalidUrl`] for
/// an unsupported scheme.
pub fn signaling_url(endpoint: &SignalingEndpoint, room: &str) -> Result<String, SignalingClientError> {
    let room_ok = !room.is_empty()
        && room
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !room_ok {
        return Err(SignalingClientError::InvalidRoomId(room.to_owned()));
    }

    let base = endpoint
        .base_url
        .as_deref()
        .filter(|b| !b.is_empty())
        .unwrap_or(&endpoint.page_origin);

    let (scheme, rest) = base
        .split_once("://")
        .ok_or_else(|| SignalingClientError::InvalidUrl(base.to_owned()))?;
    let ws_scheme = match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(SignalingClientError::InvalidUrl(base.to_owned())),
    };
    let host = rest.trim_end_matches('/');
    if host.is_empty() {
        return Err(SignalingClientError::InvalidUrl(base.to_owned()));
    }

    let path = endpoint.path_template.replace("{room}", room);
    let sep = if path.starts_with('/') { "" } else { "/" };
    Ok(format!("{ws_scheme}://{host}{sep}{path}"))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn derives_scheme_from_page_origin() {
        let mut ep = SignalingEndpoint {
            page_origin: "https://meet.example.com/".into(),
            ..SignalingEndpoint::default()
        };
        assert_eq!(
            signaling_url(&ep, "daily-42").unwrap(),
            "wss://meet.example.com/ws/meeting/daily-42/"
        );
        ep.page_origin = "http://localhost:3000".into();
        assert_eq!(
            signaling_url(&ep, "r1").unwrap(),
            "ws://localhost:3000/ws/meeting/r1/"
        );
    }

    #[test]
    fn override_wins_and_keeps_ws_scheme() {
        let ep = SignalingEndpoint {
            base_url: Some("ws://10.0.0.5:9000".into()),
            path_template: "rooms/{room}".into(),
            ..SignalingEndpoint::default()
        };
        assert_eq!(
            signaling_url(&ep, "abc").unwrap(),
            "ws://10.0.0.5:9000/rooms/abc"
        );
    }

    #[test]
    fn rejects_bad_room_ids_and_schemes() {
        let ep = SignalingEndpoint::default();
        for room in ["", "a/b", "room id", "../x"] {
            assert!(matches!(
                signaling_url(&ep, room),
                Err(SignalingClientError::InvalidRoomId(_))
            ));
        }
        let ep = SignalingEndpoint {
            base_url: Some("ftp://host".into()),
            ..SignalingEndpoint::default()
        };
        assert!(matches!(
            signaling_url(&ep, "ok"),
            Err(SignalingClientError::InvalidUrl(_))
        ));
    }
}
