use std::{cell::RefCell, rc::Rc};

use serde_json::Value;

use crate::{
    core::SessionConfig,
    event_bus::{BusEvent, EventBus, EventName, Subscription},
    signaling::CaptionEvent,
};

#[derive(Clone, Debug, PartialEq)]
pub enum ChatEntry {
    Message(Value),
    Caption(CaptionEvent),
}

/// What [`ChatHistory::ingest_caption`] did with an update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptionOutcome {
    Appended,
    /// Replaced the sender's pending interim caption.
    Collapsed,
    /// Same update already recorded (it arrived over both relay paths).
    Duplicate,
}

/// Chat log with live-caption collapsing.
///
/// Interim captions from one sender are folded into a single entry until the
/// final update lands, provided each update arrives within `window_ms` of the
/// entry it replaces.
#[derive(Debug, Default)]
pub struct ChatHistory {
    entries: Vec<ChatEntry>,
    window_ms: u64,
}

impl ChatHistory {
    pub fn new(window_ms: u64) -> Self {
        Self {
            entries: Vec::new(),
            window_ms,
        }
    }

    /// History collapsing within the session's `caption_window`.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(u64::try_from(config.caption_window.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn captions(&self) -> impl Iterator<Item = &CaptionEvent> {
        self.entries.iter().filter_map(|e| match e {
            ChatEntry::Caption(c) => Some(c),
            ChatEntry::Message(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Routes a `chat-message` payload: captions are collapsed, anything
    /// else is appended as is.
    pub fn ingest_chat(&mut self, payload: &Value) {
        match CaptionEvent::from_chat(payload) {
            Some(caption) => {
                self.ingest_caption(caption);
            }
            None => self.entries.push(ChatEntry::Message(payload.clone())),
        }
    }

    pub fn ingest_caption(&mut self, caption: CaptionEvent) -> CaptionOutcome {
        let last_from_sender = self
            .entries
            .iter()
            .rposition(|e| matches!(e, ChatEntry::Caption(c) if c.from == caption.from));

        if let Some(idx) = last_from_sender {
            if let ChatEntry::Caption(prev) = &mut self.entries[idx] {
                if *prev == caption {
                    return CaptionOutcome::Duplicate;
                }
                if !prev.is_final && caption.time.abs_diff(prev.time) <= self.window_ms {
                    *prev = caption;
                    return CaptionOutcome::Collapsed;
                }
            }
        }
        self.entries.push(ChatEntry::Caption(caption));
        CaptionOutcome::Appended
    }

    /// Feeds the history from `chat-message` and caption-bearing
    /// `dc-message` events.
    pub fn attach(history: &Rc<RefCell<ChatHistory>>, bus: &EventBus) -> Vec<Subscription> {
        let chat = history.clone();
        let from_signaling = bus.on(EventName::ChatMessage, move |ev| {
            if let BusEvent::ChatMessage(payload) = ev {
                chat.borrow_mut().ingest_chat(payload);
            }
        });
        let dc = history.clone();
        let from_channel = bus.on(EventName::DcMessage, move |ev| {
            if let BusEvent::DcMessage { text, .. } = ev {
                let caption = serde_json::from_str::<Value>(text)
                    .ok()
                    .as_ref()
                    .and_then(CaptionEvent::from_chat);
                if let Some(caption) = caption {
                    dc.borrow_mut().ingest_caption(caption);
                }
            }
        });
        vec![from_signaling, from_channel]
    }
}
