//! Link configuration.
//!
//! Follows 12-factor style: settings can come from environment variables
//! (or a `.env` file via `dotenvy`), or be supplied directly with
//! [`LinkConfig::new`] when the embedder already knows the endpoint.

/// Configuration for one peer link.
///
/// A link is bound to a single `host:port` WebSocket endpoint for its
/// whole lifetime; it is not reusable after close.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Remote host name or address.
    pub host: String,

    /// Remote TCP port.
    pub port: u16,

    /// Capacity of the outbound command and inbound event channels.
    pub channel_capacity: usize,
}

impl LinkConfig {
    /// Creates a configuration for the given endpoint with default
    /// channel capacity.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            channel_capacity: 64,
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// Reads `LINK_HOST` (default `127.0.0.1`), `LINK_PORT` (default
    /// `8080`) and `LINK_CHANNEL_CAPACITY` (default `64`), falling back
    /// to the default on missing or unparseable values. Calls
    /// `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("LINK_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_env("LINK_PORT", 8080),
            channel_capacity: parse_env("LINK_CHANNEL_CAPACITY", 64),
        }
    }

    /// Renders the WebSocket URL for this endpoint.
    ///
    /// The scheme is fixed to the insecure `ws://` variant; no TLS option
    /// is exposed at this layer.
    #[must_use]
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn url_uses_insecure_scheme() {
        let cfg = LinkConfig::new("example.org", 9000);
        assert_eq!(cfg.url(), "ws://example.org:9000");
    }

    #[test]
    fn new_applies_default_capacity() {
        let cfg = LinkConfig::new("localhost", 1234);
        assert_eq!(cfg.channel_capacity, 64);
    }
}
