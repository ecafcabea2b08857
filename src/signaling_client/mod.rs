//! Client end of the room signaling socket.
pub mod memory_link;
pub mod reconnect_policy;
pub mod signaling_client_error;
pub mod signaling_command;
pub mod transport;
pub mod url;
pub mod ws_link;

pub use reconnect_policy::ReconnectPolicy;
pub use signaling_client_error::SignalingClientError;
pub use transport::{SignalingTransport, TransportState};
pub use url::{SignalingEndpoint, signaling_url};
pub use ws_link::{Connector, TungsteniteConnector, WsLink};
