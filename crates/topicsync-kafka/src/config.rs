//! Admin client connection configuration

use crate::error::{KafkaError, Result};
use rdkafka::config::ClientConfig;
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default bootstrap server
pub const DEFAULT_SERVER: &str = "localhost:9092";

/// librdkafka debug contexts used when debug is enabled without an explicit list
pub const DEFAULT_DEBUG_CONTEXTS: &str = "broker,topic,protocol";

/// Syslog level used when debug is enabled without an explicit level
pub const DEFAULT_LOG_LEVEL: u8 = 6;

/// Syslog level forced when debug is disabled (errors only)
pub const QUIET_LOG_LEVEL: u8 = 3;

const CLOUD_HOST_MARKER: &str = "confluent.cloud";
const TLS_HINT_PORT: &str = "9092";

// ============================================================================
// Security protocol
// ============================================================================

/// Security protocol for the broker connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityProtocol {
    Plaintext,
    Ssl,
    SaslPlaintext,
    SaslSsl,
}

impl FromStr for SecurityProtocol {
    type Err = KafkaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "PLAINTEXT" => Ok(Self::Plaintext),
            "SSL" => Ok(Self::Ssl),
            "SASL_PLAINTEXT" => Ok(Self::SaslPlaintext),
            "SASL_SSL" => Ok(Self::SaslSsl),
            _ => Err(KafkaError::ConfigInvalid {
                var: "KAFKA_SECURITY_PROTOCOL".to_string(),
                reason: format!("Unknown protocol: {s}"),
            }),
        }
    }
}

impl SecurityProtocol {
    /// librdkafka property value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plaintext => "PLAINTEXT",
            Self::Ssl => "SSL",
            Self::SaslPlaintext => "SASL_PLAINTEXT",
            Self::SaslSsl => "SASL_SSL",
        }
    }
}

impl fmt::Display for SecurityProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the security protocol for a connection.
///
/// An explicit protocol always wins. Without credentials the connection is
/// plaintext. With credentials, a managed cloud endpoint or a remote host on
/// port 9092 gets `SASL_SSL`; anything else gets `SASL_PLAINTEXT`.
pub fn resolve_security_protocol(
    servers: &str,
    has_credentials: bool,
    explicit: Option<SecurityProtocol>,
) -> SecurityProtocol {
    if let Some(protocol) = explicit {
        return protocol;
    }
    if !has_credentials {
        return SecurityProtocol::Plaintext;
    }

    let tls_expected = servers
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .any(|server| {
            if server.contains(CLOUD_HOST_MARKER) {
                return true;
            }
            match server.rsplit_once(':') {
                Some((host, port)) => port == TLS_HINT_PORT && !is_local_host(host),
                None => false,
            }
        });

    if tls_expected {
        SecurityProtocol::SaslSsl
    } else {
        SecurityProtocol::SaslPlaintext
    }
}

fn is_local_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host.eq_ignore_ascii_case("localhost")
        || host.starts_with("127.")
        || host == "::1"
        || host == "0.0.0.0"
}

// ============================================================================
// Configuration
// ============================================================================

/// Connection settings for the admin client
#[derive(Debug)]
pub struct KafkaConfig {
    /// Comma-separated broker list
    pub bootstrap_servers: String,
    /// SASL PLAIN username
    pub username: Option<String>,
    /// SASL PLAIN password
    pub password: Option<SecretString>,
    /// Explicit security protocol; resolved heuristically when unset
    pub security_protocol: Option<SecurityProtocol>,
    /// librdkafka debug contexts; `None` disables client debugging
    pub debug: Option<String>,
    /// librdkafka syslog level used while debugging
    pub log_level: u8,
    /// Per-request network timeout
    pub request_timeout: Duration,
    /// Maximum age of the client's cached metadata
    pub metadata_max_age: Duration,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: DEFAULT_SERVER.to_string(),
            username: None,
            password: None,
            security_protocol: None,
            debug: None,
            log_level: DEFAULT_LOG_LEVEL,
            request_timeout: Duration::from_millis(5000),
            metadata_max_age: Duration::from_millis(30000),
        }
    }
}

impl KafkaConfig {
    /// Create a new builder
    pub fn builder() -> KafkaConfigBuilder {
        KafkaConfigBuilder::default()
    }

    /// Whether both SASL credentials are present
    pub fn has_credentials(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.is_empty())
            && self
                .password
                .as_ref()
                .is_some_and(|p| !p.expose_secret().is_empty())
    }

    /// The protocol the client will actually use
    pub fn resolved_security_protocol(&self) -> SecurityProtocol {
        resolve_security_protocol(
            &self.bootstrap_servers,
            self.has_credentials(),
            self.security_protocol,
        )
    }

    /// The librdkafka log level the client will actually use
    pub fn effective_log_level(&self) -> u8 {
        if self.debug.is_some() {
            self.log_level
        } else {
            QUIET_LOG_LEVEL
        }
    }

    /// librdkafka properties for the admin client, including credentials
    pub fn client_properties(&self) -> BTreeMap<&'static str, String> {
        let mut props = BTreeMap::new();
        props.insert("bootstrap.servers", self.bootstrap_servers.clone());
        props.insert("socket.keepalive.enable", "true".to_string());
        props.insert(
            "request.timeout.ms",
            self.request_timeout.as_millis().to_string(),
        );
        props.insert(
            "metadata.max.age.ms",
            self.metadata_max_age.as_millis().to_string(),
        );
        props.insert("log_level", self.effective_log_level().to_string());
        if let Some(ref debug) = self.debug {
            props.insert("debug", debug.clone());
        }

        let protocol = self.resolved_security_protocol();
        props.insert("security.protocol", protocol.as_str().to_string());

        if let (true, Some(username), Some(password)) =
            (self.has_credentials(), &self.username, &self.password)
        {
            props.insert("sasl.mechanisms", "PLAIN".to_string());
            props.insert("sasl.username", username.clone());
            props.insert("sasl.password", password.expose_secret().to_string());
        }

        props
    }

    /// Build an rdkafka client configuration
    pub fn to_client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        for (key, value) in self.client_properties() {
            config.set(key, value);
        }
        config
    }

    /// Human-readable connection summary; never includes the password
    pub fn summary(&self) -> ConnectionSummary<'_> {
        ConnectionSummary(self)
    }
}

/// Display adapter for [`KafkaConfig::summary`]
pub struct ConnectionSummary<'a>(&'a KafkaConfig);

impl fmt::Display for ConnectionSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.0;
        writeln!(f, "Server:            {}", config.bootstrap_servers)?;
        match (&config.username, config.has_credentials()) {
            (Some(user), true) => writeln!(f, "Authentication:    SASL/PLAIN as '{}'", user)?,
            _ => writeln!(f, "Authentication:    none")?,
        }
        writeln!(
            f,
            "Security protocol: {}",
            config.resolved_security_protocol()
        )?;
        match config.debug {
            Some(ref contexts) => write!(
                f,
                "Debug:             enabled ({}, log level {})",
                contexts,
                config.effective_log_level()
            ),
            None => write!(f, "Debug:             disabled"),
        }
    }
}

/// Builder for [`KafkaConfig`]
#[derive(Debug, Default)]
pub struct KafkaConfigBuilder {
    config: KafkaConfig,
    debug_enabled: bool,
    debug_contexts: Option<String>,
}

impl KafkaConfigBuilder {
    /// Set the bootstrap server list
    pub fn bootstrap_servers(mut self, servers: impl Into<String>) -> Self {
        self.config.bootstrap_servers = servers.into();
        self
    }

    /// Set SASL PLAIN credentials
    pub fn credentials(mut self, username: impl Into<String>, password: SecretString) -> Self {
        self.config.username = Some(username.into());
        self.config.password = Some(password);
        self
    }

    /// Force a security protocol
    pub fn security_protocol(mut self, protocol: SecurityProtocol) -> Self {
        self.config.security_protocol = Some(protocol);
        self
    }

    /// Enable or disable librdkafka debug output
    pub fn debug_enabled(mut self, enabled: bool) -> Self {
        self.debug_enabled = enabled;
        self
    }

    /// Set librdkafka debug contexts (used only when debug is enabled)
    pub fn debug_contexts(mut self, contexts: impl Into<String>) -> Self {
        self.debug_contexts = Some(contexts.into());
        self
    }

    /// Set the librdkafka syslog level (used only when debug is enabled)
    pub fn log_level(mut self, level: u8) -> Self {
        self.config.log_level = level;
        self
    }

    /// Set the per-request network timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the metadata cache age
    pub fn metadata_max_age(mut self, age: Duration) -> Self {
        self.config.metadata_max_age = age;
        self
    }

    /// Validate and build the configuration
    pub fn build(mut self) -> Result<KafkaConfig> {
        if self.config.bootstrap_servers.trim().is_empty() {
            return Err(KafkaError::ConfigInvalid {
                var: "KAFKA_SERVER".to_string(),
                reason: "bootstrap server list is empty".to_string(),
            });
        }
        if self.config.log_level > 7 {
            return Err(KafkaError::ConfigInvalid {
                var: "KAFKA_LOG_LEVEL".to_string(),
                reason: format!("syslog level must be 0-7, got {}", self.config.log_level),
            });
        }

        self.config.debug = if self.debug_enabled {
            Some(
                self.debug_contexts
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_DEBUG_CONTEXTS.to_string()),
            )
        } else {
            None
        };

        Ok(self.config)
    }
}
