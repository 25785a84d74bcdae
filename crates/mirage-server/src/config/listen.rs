//! Listen address and metrics listener configuration.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};

pub const DEFAULT_LISTEN: &str = ":9090";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Address of the Prometheus listener, e.g. `:9091`.
    #[serde(default = "default_metrics_listen")]
    pub listen: String,
}

fn default_metrics_listen() -> String {
    ":9091".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen: default_metrics_listen(),
        }
    }
}

/// Parse a listen address. A bare `:port` binds every interface.
pub fn parse_listen_addr(addr: &str) -> Result<SocketAddr, anyhow::Error> {
    let addr = addr.trim();
    if let Some(port) = addr.strip_prefix(':') {
        let port: u16 = port
            .parse()
            .with_context(|| format!("invalid port in listen address `{addr}`"))?;
        return Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)));
    }

    if let Ok(socket) = addr.parse::<SocketAddr>() {
        return Ok(socket);
    }

    addr.to_socket_addrs()
        .with_context(|| format!("invalid listen address `{addr}`"))?
        .next()
        .ok_or_else(|| anyhow::anyhow!("listen address `{addr}` resolved to nothing"))
}
