use super::PhoneHomeConfig;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One phone-home run. Must not panic; failures are the task's business.
pub trait PhoneHomeTask: Send + Sync {
    fn run(&self);
}

/// What a report says about this server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerReport {
    pub version: String,
    pub os: String,
    pub arch: String,
    pub uptime_secs: u64,
    /// Stable per-machine identifier that does not reveal the host.
    pub id: String,
}

impl ServerReport {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("ver", self.version.clone()),
            ("arch", self.arch.clone()),
            ("os", self.os.clone()),
            ("uptime", self.uptime_secs.to_string()),
            ("id", self.id.clone()),
        ]
    }
}

/// Hash of host name and platform, `anon_` plus 32 hex characters.
pub(crate) fn anonymous_id() -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_default();
    let machine = format!("{}-{}-{}", host, std::env::consts::OS, std::env::consts::ARCH);
    let mut hasher = Sha256::new();
    hasher.update(machine.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    format!("anon_{}", &hash[..32])
}

/// Sends the report as a GET request to the configured endpoint.
pub struct HttpPhoneHomeTask {
    endpoint: Url,
    version: String,
    started: Instant,
    id: String,
    client: reqwest::blocking::Client,
}

impl HttpPhoneHomeTask {
    pub fn new(config: &PhoneHomeConfig, version: impl Into<String>) -> anyhow::Result<Self> {
        let endpoint = Url::parse(&config.endpoint)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            endpoint,
            version: version.into(),
            started: Instant::now(),
            id: anonymous_id(),
            client,
        })
    }

    pub fn report(&self) -> ServerReport {
        ServerReport {
            version: self.version.clone(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            uptime_secs: self.started.elapsed().as_secs(),
            id: self.id.clone(),
        }
    }

    /// Endpoint with the report encoded as query parameters.
    pub fn request_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .extend_pairs(self.report().query_pairs());
        url
    }
}

impl PhoneHomeTask for HttpPhoneHomeTask {
    fn run(&self) {
        let url = self.request_url();
        match self.client.get(url).send() {
            Ok(response) => debug!(status = %response.status(), "phone home sent"),
            Err(e) => debug!(error = %e, "phone home failed"),
        }
    }
}

impl std::fmt::Debug for HttpPhoneHomeTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPhoneHomeTask")
            .field("endpoint", &self.endpoint.as_str())
            .field("version", &self.version)
            .finish()
    }
}
