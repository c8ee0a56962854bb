use std::path::PathBuf;

use crate::error::TransportError;

const DEFAULT_TCP_PORT: u16 = 2375;
#[cfg(unix)]
const DEFAULT_UNIX_SOCKET: &str = "/var/run/docker.sock";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineAddr {
    Unix(PathBuf),
    Tcp { host: String, port: u16 },
}

impl EngineAddr {
    /// Accepts `unix://<path>`, a bare absolute socket path, and
    /// `tcp://` or `http://` host:port forms.
    pub fn parse(input: &str) -> Result<Self, TransportError> {
        let input = input.trim();
        if let Some(path) = input.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(TransportError::Config(format!(
                    "missing socket path in {input:?}"
                )));
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }
        if input.starts_with('/') {
            return Ok(Self::Unix(PathBuf::from(input)));
        }

        let rest = input
            .strip_prefix("tcp://")
            .or_else(|| input.strip_prefix("http://"))
            .ok_or_else(|| {
                TransportError::Config(format!("unsupported engine address {input:?}"))
            })?;
        let authority = rest.split('/').next().unwrap_or("");
        if authority.is_empty() {
            return Err(TransportError::Config(format!(
                "missing host in {input:?}"
            )));
        }

        // Bracketed IPv6 literal: the brackets are URL syntax, not part
        // of the host handed to the resolver.
        if let Some(rest) = authority.strip_prefix('[') {
            let Some((host, port_part)) = rest.split_once(']') else {
                return Err(TransportError::Config(format!(
                    "unterminated IPv6 literal in {input:?}"
                )));
            };
            if host.is_empty() {
                return Err(TransportError::Config(format!(
                    "missing host in {input:?}"
                )));
            }
            let port = match port_part.strip_prefix(':') {
                Some(port) => port.parse::<u16>().map_err(|_| {
                    TransportError::Config(format!("invalid port in {input:?}"))
                })?,
                None if port_part.is_empty() => DEFAULT_TCP_PORT,
                None => {
                    return Err(TransportError::Config(format!(
                        "invalid authority in {input:?}"
                    )));
                }
            };
            return Ok(Self::Tcp {
                host: host.to_string(),
                port,
            });
        }

        match authority.rsplit_once(':') {
            Some((host, port)) => {
                if host.is_empty() {
                    return Err(TransportError::Config(format!(
                        "missing host in {input:?}"
                    )));
                }
                let port = port.parse::<u16>().map_err(|_| {
                    TransportError::Config(format!("invalid port in {input:?}"))
                })?;
                Ok(Self::Tcp {
                    host: host.to_string(),
                    port,
                })
            }
            None => Ok(Self::Tcp {
                host: authority.to_string(),
                port: DEFAULT_TCP_PORT,
            }),
        }
    }

    /// Resolves the engine endpoint through the conventional fallback
    /// chain: `DOCKER_HOST`, then `CONTAINER_HOST`, then the platform
    /// default socket.
    pub fn from_env() -> Result<Self, TransportError> {
        for name in ["DOCKER_HOST", "CONTAINER_HOST"] {
            if let Ok(value) = std::env::var(name) {
                if !value.is_empty() {
                    return Self::parse(&value);
                }
            }
        }
        Self::default_addr()
    }

    #[cfg(unix)]
    fn default_addr() -> Result<Self, TransportError> {
        Ok(Self::Unix(PathBuf::from(DEFAULT_UNIX_SOCKET)))
    }

    #[cfg(not(unix))]
    fn default_addr() -> Result<Self, TransportError> {
        Ok(Self::Tcp {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_TCP_PORT,
        })
    }
}

impl std::fmt::Display for EngineAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
            Self::Tcp { host, port } if host.contains(':') => {
                write!(f, "tcp://[{host}]:{port}")
            }
            Self::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
        }
    }
}
