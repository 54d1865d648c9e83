//! # Phone-Home Module
//!
//! Anonymous usage report sent on a fixed daily schedule while the server
//! runs.
//!
//! - [`PhoneHomeCore`] owns the schedule: one named background thread,
//!   started on the server-started signal and cancelled on the
//!   server-stopping signal, plus an administrative enable/disable/start/stop
//!   surface.
//! - [`PhoneHomeTask`] is the unit of work; [`HttpPhoneHomeTask`] sends the
//!   report over HTTP.
//!
//! The owner of the server lifecycle holds the core and calls
//! [`Lifecycle::on_start`] / [`Lifecycle::on_stop`] on it directly.

mod scheduler;
mod task;

pub use self::scheduler::{PhoneHomeCore, THREAD_NAME};
pub use self::task::{HttpPhoneHomeTask, PhoneHomeTask, ServerReport};

use crate::config::{env_bool, env_string};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://www.payara.fish/phonehome";
pub const DEFAULT_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Server lifecycle signals.
pub trait Lifecycle {
    /// The server finished starting.
    fn on_start(&self);

    /// The server is stopping.
    fn on_stop(&self);
}

/// Phone-home settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneHomeConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub interval_secs: u64,
}

impl Default for PhoneHomeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl PhoneHomeConfig {
    /// Defaults overridden by `OAS_PHONEHOME_ENABLED`,
    /// `OAS_PHONEHOME_ENDPOINT` and `OAS_PHONEHOME_INTERVAL_SECS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_bool("OAS_PHONEHOME_ENABLED") {
            config.enabled = v;
        }
        if let Some(v) = env_string("OAS_PHONEHOME_ENDPOINT") {
            config.endpoint = v;
        }
        if let Some(v) = env_string("OAS_PHONEHOME_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            config.interval_secs = v;
        }
        config
    }

    /// Interval between runs; never shorter than one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}
