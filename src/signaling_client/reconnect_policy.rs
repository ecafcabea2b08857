use std::time::Duration;

/// How long to wait before reopening the signaling socket after an
/// unexpected close. `attempt` counts from 0 and resets once a socket opens.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum ReconnectPolicy {
    #[default]
    Never,
    Fixed {
        delay: Duration,
        max_attempts: Option<u32>,
    },
    /// `initial * 2^attempt`, capped at `max_delay`.
    Exponential {
        initial: Duration,
        max_delay: Duration,
        max_attempts: Option<u32>,
    },
}

impl ReconnectPolicy {
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        match self {
            ReconnectPolicy::Never => None,
            ReconnectPolicy::Fixed {
                delay,
                max_attempts,
            } => within(attempt, *max_attempts).then_some(*delay),
            ReconnectPolicy::Exponential {
                initial,
                max_delay,
                max_attempts,
            } => within(attempt, *max_attempts).then(|| {
                let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
                initial.saturating_mul(factor).min(*max_delay)
            }),
        }
    }
}

fn within(attempt: u32, max: Option<u32>) -> bool {
    max.is_none_or(|m| attempt < m)
}
