//! Network endpoint of the dependency gating the boot.

/// TCP endpoint probed by the readiness gate.
///
/// The host is kept as given (name or literal address) and resolved at
/// connect time, so DNS records that appear late are still picked up.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host:port` or `[v6addr]:port`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| format!("invalid endpoint '{}': unclosed '['", s))?;
            let port = tail
                .strip_prefix(':')
                .ok_or_else(|| format!("invalid endpoint '{}': missing port", s))?;
            (host, port)
        } else {
            s.rsplit_once(':')
                .ok_or_else(|| format!("invalid endpoint '{}': missing port", s))?
        };

        if host.is_empty() {
            return Err(format!("invalid endpoint '{}': empty host", s));
        }

        let port = port
            .parse::<u16>()
            .map_err(|e| format!("invalid port in '{}': {}", s, e))?;

        Ok(Self::new(host, port))
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl std::str::FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
