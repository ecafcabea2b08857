use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};
use webrtc::{
    api::{
        API, APIBuilder, interceptor_registry::register_default_interceptors,
        media_engine::MediaEngine,
    },
    interceptor::registry::Registry,
    peer_connection::configuration::RTCConfiguration,
};

use crate::{
    backend::webrtc_rs::{convert, webrtc_peer_connection::WebRtcPeerConnection},
    log::LogSink,
    peer::{PeerConnection, PeerConnectionFactory, PeerError, PeerEventSender},
    signaling::IceServer,
    sink_debug,
};

/// Builds [`WebRtcPeerConnection`]s that share one API instance and one
/// tokio runtime.
pub struct WebRtcFactory {
    api: API,
    rt: Arc<Runtime>,
    log: Arc<dyn LogSink>,
}

impl WebRtcFactory {
    /// Starts a two-worker runtime and registers the default codecs and
    /// interceptors.
    ///
    /// # Errors
    /// The runtime could not start or codec registration failed.
    pub fn new(log: Arc<dyn LogSink>) -> Result<Self, PeerError> {
        let rt = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("meshrtc-webrtc")
            .enable_all()
            .build()
            .map_err(|e| PeerError::backend("start_runtime", e))?;

        let mut media = MediaEngine::default();
        media
            .register_default_codecs()
            .map_err(|e| PeerError::backend("register_codecs", e))?;
        let registry = register_default_interceptors(Registry::new(), &mut media)
            .map_err(|e| PeerError::backend("register_interceptors", e))?;
        let api = APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .build();

        Ok(Self {
            api,
            rt: Arc::new(rt),
            log,
        })
    }
}

impl PeerConnectionFactory for WebRtcFactory {
    fn create(
        &self,
        peer_id: &str,
        ice_servers: &[IceServer],
        events: PeerEventSender,
    ) -> Result<Box<dyn PeerConnection>, PeerError> {
        let config = RTCConfiguration {
            ice_servers: convert::ice_servers(ice_servers),
            ..Default::default()
        };
        let pc = self
            .rt
            .block_on(self.api.new_peer_connection(config))
            .map_err(|e| PeerError::backend("new_peer_connection", e))?;
        sink_debug!(
            self.log,
            "[peer {peer_id}] native connection #{} with {} ICE server(s)",
            events.conn_id(),
            ice_servers.len()
        );
        Ok(Box::new(WebRtcPeerConnection::new(
            Arc::new(pc),
            self.rt.clone(),
            events,
            self.log.clone(),
        )))
    }
}
