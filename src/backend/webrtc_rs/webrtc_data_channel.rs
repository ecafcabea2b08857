use std::sync::Arc;

use tokio::runtime::Handle;
use webrtc::data_channel::{
    RTCDataChannel, data_channel_message::DataChannelMessage,
    data_channel_state::RTCDataChannelState,
};

use crate::peer::{DataChannel, PeerError, PeerEvent, PeerEventSender};

/// [`DataChannel`] over an `RTCDataChannel`.
pub struct WebRtcDataChannel {
    dc: Arc<RTCDataChannel>,
    rt: Handle,
    label: String,
}

impl WebRtcDataChannel {
    /// Wraps `dc` and routes its open/message/close callbacks to `events`.
    pub fn wire(dc: Arc<RTCDataChannel>, rt: Handle, events: &PeerEventSender) -> Self {
        let on_open = events.clone();
        dc.on_open(Box::new(move || {
            on_open.send(PeerEvent::DataChannelOpen);
            Box::pin(async {})
        }));

        let on_message = events.clone();
        dc.on_message(Box::new(move |msg: DataChannelMessage| {
            // Binary frames carry nothing the session understands.
            if msg.is_string {
                if let Ok(text) = String::from_utf8(msg.data.to_vec()) {
                    on_message.send(PeerEvent::DataChannelMessage(text));
                }
            }
            Box::pin(async {})
        }));

        let on_close = events.clone();
        dc.on_close(Box::new(move || {
            on_close.send(PeerEvent::DataChannelClosed);
            Box::pin(async {})
        }));

        let label = dc.label().to_owned();
        Self { dc, rt, label }
    }
}

impl DataChannel for WebRtcDataChannel {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_open(&self) -> bool {
        self.dc.ready_state() == RTCDataChannelState::Open
    }

    fn send_text(&mut self, text: &str) -> Result<(), PeerError> {
        if !self.is_open() {
            return Err(PeerError::ChannelNotOpen);
        }
        self.rt
            .block_on(self.dc.send_text(text.to_owned()))
            .map(|_| ())
            .map_err(|e| PeerError::backend("send_text", e))
    }

    fn close(&mut self) {
        if matches!(
            self.dc.ready_state(),
            RTCDataChannelState::Closing | RTCDataChannelState::Closed
        ) {
            return;
        }
        let _ = self.rt.block_on(self.dc.close());
    }
}
