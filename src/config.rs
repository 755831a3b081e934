//! Chat server configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::avatar::AvatarKind;
use crate::error::ChatError;
use crate::room::{DEFAULT_INTAKE_CAPACITY, DEFAULT_OUTBOUND_CAPACITY};
use crate::trace::TraceOutput;
use crate::ws::session::SessionSettings;

/// Top-level server configuration.
///
/// Loaded once at startup via [`ChatConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// Capacity of the hub's event queue.
    pub hub_intake_capacity: usize,

    /// Capacity of each session's outbound queue. When a session's queue
    /// is full, new messages for that session are dropped.
    pub outbound_queue_capacity: usize,

    /// Seconds without an inbound frame before a session is ended
    /// (0 = never).
    pub session_idle_timeout_secs: u64,

    /// Avatar strategies, tried in order.
    pub avatar_strategies: Vec<AvatarKind>,

    /// Directory scanned by the file system avatar strategy.
    pub avatar_dir: PathBuf,

    /// Where hub trace events go.
    pub trace_output: TraceOutput,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            hub_intake_capacity: DEFAULT_INTAKE_CAPACITY,
            outbound_queue_capacity: DEFAULT_OUTBOUND_CAPACITY,
            session_idle_timeout_secs: 0,
            avatar_strategies: vec![AvatarKind::Auth, AvatarKind::Gravatar],
            avatar_dir: PathBuf::from("avatars"),
            trace_output: TraceOutput::Off,
        }
    }
}

impl ChatConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set. Calls
    /// `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::InvalidConfig`] if `LISTEN_ADDR` cannot be
    /// parsed, a capacity is zero, or `AVATAR_STRATEGIES` /
    /// `TRACE_OUTPUT` names something unknown.
    pub fn from_env() -> Result<Self, ChatError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ChatConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ChatError> {
        let defaults = Self::default();

        let listen_addr = match lookup("LISTEN_ADDR") {
            Some(raw) => raw
                .parse()
                .map_err(|e| ChatError::InvalidConfig(format!("LISTEN_ADDR {raw:?}: {e}")))?,
            None => defaults.listen_addr,
        };

        let hub_intake_capacity = parse_or(&lookup, "HUB_INTAKE_CAPACITY", defaults.hub_intake_capacity);
        let outbound_queue_capacity = parse_or(
            &lookup,
            "OUTBOUND_QUEUE_CAPACITY",
            defaults.outbound_queue_capacity,
        );
        for (key, value) in [
            ("HUB_INTAKE_CAPACITY", hub_intake_capacity),
            ("OUTBOUND_QUEUE_CAPACITY", outbound_queue_capacity),
        ] {
            if value == 0 {
                return Err(ChatError::InvalidConfig(format!("{key} must be positive")));
            }
        }

        let session_idle_timeout_secs = parse_or(
            &lookup,
            "SESSION_IDLE_TIMEOUT_SECS",
            defaults.session_idle_timeout_secs,
        );

        let avatar_strategies = match lookup("AVATAR_STRATEGIES") {
            Some(raw) => raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse::<AvatarKind>)
                .collect::<Result<Vec<_>, _>>()?,
            None => defaults.avatar_strategies,
        };

        let avatar_dir = lookup("AVATAR_DIR").map_or(defaults.avatar_dir, PathBuf::from);

        let trace_output = match lookup("TRACE_OUTPUT") {
            Some(raw) => raw.parse()?,
            None => defaults.trace_output,
        };

        Ok(Self {
            listen_addr,
            hub_intake_capacity,
            outbound_queue_capacity,
            session_idle_timeout_secs,
            avatar_strategies,
            avatar_dir,
            trace_output,
        })
    }

    /// Session settings derived from this configuration.
    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            outbound_capacity: self.outbound_queue_capacity,
            idle_timeout: (self.session_idle_timeout_secs > 0)
                .then(|| Duration::from_secs(self.session_idle_timeout_secs)),
        }
    }
}

/// Parses a variable as `T`, returning `default` on missing or invalid
/// values.
fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
