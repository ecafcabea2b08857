use serde::{Deserialize, Serialize};

use crate::signaling::types::PeerId;

/// Payload of a `host-command` frame.
///
/// Unrecognised command types decode to [`HostCommand::Unknown`] so a newer
/// server cannot break an older client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HostCommand {
    MuteAll {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
    },
    Raise {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
        #[serde(default = "raised_default")]
        raised: bool,
    },
    Reaction {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
        #[serde(default)]
        emoji: String,
    },
    /// `target` may be absent when the frame itself is addressed to the
    /// kicked participant.
    Kicked {
        #[serde(
            default,
            alias = "to",
            alias = "targetId",
            skip_serializing_if = "Option::is_none"
        )]
        target: Option<PeerId>,
    },
    EndMeeting {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
    },
    #[serde(other)]
    Unknown,
}

fn raised_default() -> bool {
    true
}

impl HostCommand {
    /// Sender carried inside the command, if any.
    pub fn sender(&self) -> Option<&str> {
        match self {
            HostCommand::MuteAll { from }
            | HostCommand::Raise { from, .. }
            | HostCommand::Reaction { from, .. }
            | HostCommand::EndMeeting { from } => from.as_deref(),
            HostCommand::Kicked { .. } | HostCommand::Unknown => None,
        }
    }

    /// Fills in a missing sender with `from`.
    pub(crate) fn with_sender(mut self, sender: &str) -> Self {
        match &mut self {
            HostCommand::MuteAll { from }
            | HostCommand::Raise { from, .. }
            | HostCommand::Reaction { from, .. }
            | HostCommand::EndMeeting { from } => {
                if from.is_none() {
                    *from = Some(sender.to_owned());
                }
            }
            HostCommand::Kicked { .. } | HostCommand::Unknown => {}
        }
        self
    }

    /// Fills in a missing kick target with the frame's addressee.
    pub(crate) fn with_addressee(mut self, to: &str) -> Self {
        if let HostCommand::Kicked { target } = &mut self {
            if target.is_none() {
                *target = Some(to.to_owned());
            }
        }
        self
    }
}
