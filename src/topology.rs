//! # Server Topology Module
//!
//! Discovers the externally reachable base URLs of the running server: one
//! URL per enabled network listener, plain (`http`) listeners first, secure
//! (`https`) listeners after, each group in listener enumeration order.
//!
//! ## Resolution Rules
//!
//! - Host: canonical local host name, `localhost` when it cannot be resolved
//! - Port: the dynamically bound port when the server reports one (auto
//!   assigned port `0`, runtime overrides), the configured port otherwise
//! - Scheme: `https` when the listener's protocol has security enabled
//! - The administrative listener is skipped unless the runtime is a
//!   single-process micro instance, where it also serves the application
//! - A URL that cannot be constructed is dropped; the others still resolve

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const FALLBACK_HOST: &str = "localhost";

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("failed to enumerate network listeners: {0}")]
    Listeners(String),
}

/// How the current server process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    /// Domain administration server.
    #[default]
    Das,
    /// Clustered or standalone instance managed by a DAS.
    Instance,
    /// Single-process micro instance; the admin listener doubles as the
    /// application listener.
    Micro,
    /// Embedded in another process.
    Embedded,
}

/// A configured network listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkListener {
    pub name: String,
    /// Port from configuration; `0` means auto-assigned.
    pub port: u16,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Security flag of the listener's protocol.
    #[serde(default)]
    pub secure: bool,
}

fn default_true() -> bool {
    true
}

impl NetworkListener {
    pub fn new(name: impl Into<String>, port: u16, secure: bool) -> Self {
        Self {
            name: name.into(),
            port,
            enabled: true,
            secure,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Outcome of a dynamic port lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortResolution {
    Bound(u16),
    /// The server cannot report a bound port for this listener.
    Unavailable,
}

/// Listener configuration and runtime state of the current server.
pub trait ServerTopology: Send + Sync {
    fn network_listeners(&self) -> Result<Vec<NetworkListener>, TopologyError>;

    /// Name of the administrative listener, if one is configured.
    fn admin_listener_name(&self) -> Option<String>;

    fn runtime_mode(&self) -> RuntimeMode;

    fn real_port(&self, listener: &NetworkListener) -> PortResolution;
}

/// Local host name lookup.
pub trait HostResolver: Send + Sync {
    fn canonical_host_name(&self) -> std::io::Result<String>;
}

/// Host name of the machine, via the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHostResolver;

impl HostResolver for SystemHostResolver {
    fn canonical_host_name(&self) -> std::io::Result<String> {
        let name = hostname::get()?;
        name.into_string().map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, "host name is not UTF-8")
        })
    }
}

/// Host resolver that always answers with the same name.
#[derive(Debug, Clone)]
pub struct FixedHostResolver(pub String);

impl HostResolver for FixedHostResolver {
    fn canonical_host_name(&self) -> std::io::Result<String> {
        Ok(self.0.clone())
    }
}

/// Topology described up front, e.g. loaded from a file.
///
/// ```yaml
/// mode: micro
/// admin_listener: admin-listener
/// listeners:
///   - { name: http-listener, port: 8080 }
///   - { name: https-listener, port: 8181, secure: true }
///   - { name: admin-listener, port: 4848, secure: true }
/// bound_ports:
///   http-listener: 32001
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticTopology {
    pub mode: RuntimeMode,
    pub admin_listener: Option<String>,
    pub listeners: Vec<NetworkListener>,
    /// Ports actually bound at runtime, by listener name.
    pub bound_ports: BTreeMap<String, u16>,
}

impl StaticTopology {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        if path.extension().map(|s| s == "json").unwrap_or(false) {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(serde_yaml::from_str(&content)?)
        }
    }
}

impl ServerTopology for StaticTopology {
    fn network_listeners(&self) -> Result<Vec<NetworkListener>, TopologyError> {
        Ok(self.listeners.clone())
    }

    fn admin_listener_name(&self) -> Option<String> {
        self.admin_listener.clone()
    }

    fn runtime_mode(&self) -> RuntimeMode {
        self.mode
    }

    fn real_port(&self, listener: &NetworkListener) -> PortResolution {
        match self.bound_ports.get(&listener.name) {
            Some(port) => PortResolution::Bound(*port),
            None => PortResolution::Unavailable,
        }
    }
}

/// A resolved base URL: scheme, host, port and context path.
///
/// Backed by [`url::Url`], so a listener on the scheme's default port (80 for
/// http, 443 for https) renders without the port: `http://host/ctx` is the
/// same location as `http://host:80/ctx`. [`BaseUrl::port`] still reports
/// the listener's port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaseUrl(Url);

impl BaseUrl {
    /// Build a URL, `None` for combinations that do not form a valid URL.
    pub fn new(scheme: &str, host: &str, port: u16, context_root: &str) -> Option<Self> {
        let path = if context_root.starts_with('/') {
            context_root.to_string()
        } else {
            format!("/{context_root}")
        };
        Url::parse(&format!("{scheme}://{host}:{port}{path}"))
            .ok()
            .map(BaseUrl)
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// Effective port, including an elided default port.
    pub fn port(&self) -> Option<u16> {
        self.0.port_or_known_default()
    }

    pub fn is_secure(&self) -> bool {
        self.0.scheme() == "https"
    }

    /// URL text as written into documents. `url` elides default ports
    /// (80 for http, 443 for https).
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Resolves the server's base URLs from its topology.
#[derive(Clone)]
pub struct ServerTopologyResolver {
    topology: Arc<dyn ServerTopology>,
    hosts: Arc<dyn HostResolver>,
}

impl ServerTopologyResolver {
    pub fn new(topology: Arc<dyn ServerTopology>) -> Self {
        Self::with_host_resolver(topology, Arc::new(SystemHostResolver))
    }

    pub fn with_host_resolver(
        topology: Arc<dyn ServerTopology>,
        hosts: Arc<dyn HostResolver>,
    ) -> Self {
        Self { topology, hosts }
    }

    fn host_name(&self) -> String {
        match self.hosts.canonical_host_name() {
            Ok(name) if !name.is_empty() => name,
            Ok(_) => FALLBACK_HOST.to_string(),
            Err(e) => {
                debug!(error = %e, "host name lookup failed, using {FALLBACK_HOST}");
                FALLBACK_HOST.to_string()
            }
        }
    }

    /// Base URLs for `context_root`, plain listeners before secure ones.
    pub fn resolve_base_urls(&self, context_root: &str) -> Result<Vec<BaseUrl>, TopologyError> {
        let host = self.host_name();
        let mode = self.topology.runtime_mode();
        let admin = self.topology.admin_listener_name();

        let mut http_ports = Vec::new();
        let mut https_ports = Vec::new();
        for listener in self
            .topology
            .network_listeners()?
            .into_iter()
            .filter(|l| l.enabled)
        {
            let port = match self.topology.real_port(&listener) {
                PortResolution::Bound(port) => port,
                PortResolution::Unavailable => listener.port,
            };
            let is_admin = admin.as_deref() == Some(listener.name.as_str());
            if is_admin && mode != RuntimeMode::Micro {
                debug!(listener = %listener.name, "skipping administrative listener");
                continue;
            }
            if listener.secure {
                https_ports.push(port);
            } else {
                http_ports.push(port);
            }
        }

        let mut urls = Vec::with_capacity(http_ports.len() + https_ports.len());
        for (scheme, ports) in [("http", http_ports), ("https", https_ports)] {
            for port in ports {
                match BaseUrl::new(scheme, &host, port, context_root) {
                    Some(url) => urls.push(url),
                    None => debug!(scheme, host = %host, port, "dropping malformed base URL"),
                }
            }
        }
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_formats() {
        let url = BaseUrl::new("http", "example.com", 8080, "/ctx").unwrap();
        assert_eq!(url.as_str(), "http://example.com:8080/ctx");
        let url = BaseUrl::new("https", "example.com", 8181, "ctx").unwrap();
        assert_eq!(url.as_str(), "https://example.com:8181/ctx");
        assert!(url.is_secure());
    }

    #[test]
    fn test_base_url_rejects_bad_host() {
        assert!(BaseUrl::new("http", "bad host", 8080, "/").is_none());
    }

    #[test]
    fn test_static_topology_port_lookup() {
        let mut topo = StaticTopology::default();
        topo.bound_ports.insert("l".into(), 9000);
        assert_eq!(
            topo.real_port(&NetworkListener::new("l", 0, false)),
            PortResolution::Bound(9000)
        );
        assert_eq!(
            topo.real_port(&NetworkListener::new("other", 1, false)),
            PortResolution::Unavailable
        );
    }

    #[test]
    fn test_topology_yaml() {
        let yaml = r#"
mode: micro
admin_listener: admin-listener
listeners:
  - { name: http-listener, port: 8080 }
  - { name: admin-listener, port: 4848, secure: true, enabled: false }
"#;
        let topo: StaticTopology = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(topo.mode, RuntimeMode::Micro);
        assert!(topo.listeners[0].enabled);
        assert!(!topo.listeners[0].secure);
        assert!(!topo.listeners[1].enabled);
    }
}
