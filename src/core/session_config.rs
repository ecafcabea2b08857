use std::{path::PathBuf, time::Duration};

use crate::{
    config::{Config, ConfigError},
    media::MediaConstraints,
    signaling::IceServer,
    signaling_client::{ReconnectPolicy, SignalingEndpoint},
};

pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// Typed session settings.
///
/// Built from the `[Signaling]`, `[ICE]`, `[Media]` and `[Session]` config
/// sections; anything missing takes the [`Default`] value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub signaling: SignalingEndpoint,
    /// Handed to every new peer connection.
    pub ice_servers: Vec<IceServer>,
    /// Camera/microphone request used by `start_local_media(None)`.
    pub default_constraints: MediaConstraints,
    /// Upper bound of the random delay before offering to a roster peer.
    pub offer_stagger_max: Duration,
    /// How long a disconnected or failed connection may recover before it
    /// is torn down.
    pub disconnect_grace: Duration,
    /// `None` disables the negotiation timeout.
    pub negotiation_timeout: Option<Duration>,
    /// Interim captions from one sender within this window collapse.
    pub caption_window: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            signaling: SignalingEndpoint::default(),
            ice_servers: vec![IceServer::stun(DEFAULT_STUN_SERVER)],
            default_constraints: MediaConstraints::default(),
            offer_stagger_max: Duration::from_millis(250),
            disconnect_grace: Duration::from_millis(3_000),
            negotiation_timeout: Some(Duration::from_secs(30)),
            caption_window: Duration::from_millis(5_000),
            reconnect: ReconnectPolicy::Never,
        }
    }
}

impl SessionConfig {
    /// # Errors
    /// [`ConfigError::InvalidValue`] for unparsable numbers or an unknown
    /// reconnect policy name.
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let mut out = Self::default();

        if let Some(base) = cfg.get_non_empty("Signaling", "base_url") {
            out.signaling.base_url = Some(base.to_owned());
        }
        if let Some(origin) = cfg.get_non_empty("Signaling", "page_origin") {
            out.signaling.page_origin = origin.to_owned();
        }
        if let Some(tpl) = cfg.get_non_empty("Signaling", "path_template") {
            out.signaling.path_template = tpl.to_owned();
        }
        out.signaling.ca_file = cfg.get_non_empty("Signaling", "ca_file").map(PathBuf::from);

        let stun = cfg.get_list("ICE", "stun_servers");
        if !stun.is_empty() {
            out.ice_servers = stun.into_iter().map(IceServer::stun).collect();
        }
        if let Some(turn) = cfg.get_non_empty("ICE", "turn_url") {
            out.ice_servers.push(IceServer {
                urls: vec![turn.to_owned()],
                username: cfg.get_non_empty("ICE", "turn_username").map(str::to_owned),
                credential: cfg
                    .get_non_empty("ICE", "turn_credential")
                    .map(str::to_owned),
            });
        }

        let width = cfg.get_parsed::<u32>("Media", "width")?.unwrap_or(1280);
        let height = cfg.get_parsed::<u32>("Media", "height")?.unwrap_or(720);
        let fps = cfg.get_parsed::<u32>("Media", "frame_rate")?.unwrap_or(30);
        out.default_constraints = MediaConstraints::preferred(width, height, fps);

        if let Some(ms) = cfg.get_parsed::<u64>("Session", "offer_stagger_max_ms")? {
            out.offer_stagger_max = Duration::from_millis(ms);
        }
        if let Some(ms) = cfg.get_parsed::<u64>("Session", "disconnect_grace_ms")? {
            out.disconnect_grace = Duration::from_millis(ms);
        }
        if let Some(ms) = cfg.get_parsed::<u64>("Session", "negotiation_timeout_ms")? {
            out.negotiation_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(ms) = cfg.get_parsed::<u64>("Session", "caption_window_ms")? {
            out.caption_window = Duration::from_millis(ms);
        }
        out.reconnect = reconnect_policy(cfg)?;
        Ok(out)
    }
}

fn reconnect_policy(cfg: &Config) -> Result<ReconnectPolicy, ConfigError> {
    let delay = Duration::from_millis(
        cfg.get_parsed::<u64>("Session", "reconnect_delay_ms")?
            .unwrap_or(1_000),
    );
    let max_delay = Duration::from_millis(
        cfg.get_parsed::<u64>("Session", "reconnect_max_delay_ms")?
            .unwrap_or(30_000),
    );
    let max_attempts = cfg
        .get_parsed::<u32>("Session", "reconnect_max_attempts")?
        .filter(|n| *n > 0);

    let kind = cfg.get_non_empty_or_default("Session", "reconnect", "never");
    match kind.to_ascii_lowercase().as_str() {
        "never" | "off" => Ok(ReconnectPolicy::Never),
        "fixed" => Ok(ReconnectPolicy::Fixed {
            delay,
            max_attempts,
        }),
        "exponential" | "backoff" => Ok(ReconnectPolicy::Exponential {
            initial: delay,
            max_delay,
            max_attempts,
        }),
        _ => Err(ConfigError::InvalidValue {
            section: "Session".into(),
            key: "reconnect".into(),
            value: kind.to_owned(),
        }),
    }
}
