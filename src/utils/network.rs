// Network utilities - target parsing, DNS resolution, socket helpers

use crate::error::{ConnectivityCause, InspectError};
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpStream;

/// Default TLS port used when the target has none
pub const DEFAULT_TLS_PORT: u16 = 443;

/// Host and port of a certificate check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub hostname: String,
    pub port: u16,
}

impl Target {
    /// Parse `host`, `host:port`, `[v6]:port` or `https://host[:port]/...`
    pub fn parse(input: &str) -> Result<Self, InspectError> {
        let invalid = |reason: &str| InspectError::InvalidTarget {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        let authority = match trimmed.split_once("://") {
            Some((_, rest)) => rest.split(['/', '?', '#']).next().unwrap_or(rest),
            None => trimmed,
        };

        if authority.is_empty() {
            return Err(invalid("empty host"));
        }

        let (hostname, port) = if let Some(rest) = authority.strip_prefix('[') {
            // [2001:db8::1]:8443
            let (host, after) = rest
                .split_once(']')
                .ok_or_else(|| invalid("unterminated IPv6 literal"))?;
            let port = match after.strip_prefix(':') {
                Some(p) => p.parse::<u16>().map_err(|_| invalid("invalid port"))?,
                None if after.is_empty() => DEFAULT_TLS_PORT,
                None => return Err(invalid("unexpected characters after IPv6 literal")),
            };
            (host.to_string(), port)
        } else if authority.parse::<IpAddr>().is_ok() {
            // Bare IPv6 without brackets has no port
            (authority.to_string(), DEFAULT_TLS_PORT)
        } else if let Some((host, port_str)) = authority.rsplit_once(':') {
            let port = port_str
                .parse::<u16>()
                .map_err(|_| invalid("invalid port"))?;
            (host.to_string(), port)
        } else {
            (authority.to_string(), DEFAULT_TLS_PORT)
        };

        if hostname.is_empty() {
            return Err(invalid("empty host"));
        }

        Ok(Self { hostname, port })
    }

    /// IP address literal of the host, if it is one
    pub fn ip(&self) -> Option<IpAddr> {
        self.hostname.parse::<IpAddr>().ok()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ip() {
            Some(IpAddr::V6(_)) => write!(f, "[{}]:{}", self.hostname, self.port),
            _ => write!(f, "{}:{}", self.hostname, self.port),
        }
    }
}

/// Resolve hostname to IP addresses
pub async fn resolve_hostname(hostname: &str) -> Result<Vec<IpAddr>, ConnectivityCause> {
    if let Ok(ip) = hostname.parse::<IpAddr>() {
        return Ok(vec![ip]);
    }

    let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());

    let response = resolver
        .lookup_ip(hostname)
        .await
        .map_err(|e| ConnectivityCause::Dns(e.to_string()))?;

    let ips: Vec<IpAddr> = response.iter().collect();

    if ips.is_empty() {
        return Err(ConnectivityCause::Dns(format!(
            "no IP addresses found for {}",
            hostname
        )));
    }

    Ok(ips)
}

/// Connect to the first reachable resolved address, without a time bound
pub async fn connect_target(target: &Target) -> Result<TcpStream, ConnectivityCause> {
    let ips = resolve_hostname(&target.hostname).await?;
    let mut last_error = None;

    for ip in ips {
        let addr = SocketAddr::new(ip, target.port);
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!("Connect to {} failed: {}", addr, e);
                last_error = Some(format!("{}: {}", addr, e));
            }
        }
    }

    Err(ConnectivityCause::Connect(
        last_error.unwrap_or_else(|| "no addresses to connect to".to_string()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_only() {
        let target = Target::parse("example.com").unwrap();
        assert_eq!(target.hostname, "example.com");
        assert_eq!(target.port, 443);
    }

    #[test]
    fn test_parse_host_port() {
        let target = Target::parse("example.com:8443").unwrap();
        assert_eq!(target.hostname, "example.com");
        assert_eq!(target.port, 8443);
        assert_eq!(target.to_string(), "example.com:8443");
    }

    #[test]
    fn test_parse_url() {
        let target = Target::parse("https://example.com:9443/health?x=1").unwrap();
        assert_eq!(target.hostname, "example.com");
        assert_eq!(target.port, 9443);

        let target = Target::parse("https://example.org/").unwrap();
        assert_eq!(target.port, 443);
    }

    #[test]
    fn test_parse_ipv6() {
        let target = Target::parse("[::1]:8443").unwrap();
        assert_eq!(target.hostname, "::1");
        assert_eq!(target.port, 8443);
        assert_eq!(target.to_string(), "[::1]:8443");

        let bare = Target::parse("2001:db8::1").unwrap();
        assert_eq!(bare.hostname, "2001:db8::1");
        assert_eq!(bare.port, 443);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Target::parse("").is_err());
        assert!(Target::parse(":443").is_err());
        assert!(Target::parse("example.com:notaport").is_err());
        assert!(Target::parse("example.com:70000").is_err());
        assert!(Target::parse("[::1").is_err());
    }

    #[tokio::test]
    async fn test_resolve_ip_literal() {
        let ips = resolve_hostname("127.0.0.1").await.unwrap();
        assert_eq!(ips, vec!["127.0.0.1".parse::<IpAddr>().unwrap()]);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let target = Target {
            hostname: "127.0.0.1".to_string(),
            port,
        };
        let err = connect_target(&target).await.unwrap_err();
        assert!(matches!(err, ConnectivityCause::Connect(_)));
    }
}
