//! Fast TCP liveness probing of the candidate address set.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use log::{debug, info};
use tokio::net::TcpStream;

use super::pool::run_pool;
use crate::config::AuditConfig;

/// Bounded worker pool that keeps only the addresses accepting a TCP
/// handshake on the management port.
///
/// A reachability check, not an authentication attempt: the connection is
/// dropped as soon as the handshake completes.
pub struct LivenessProber {
    port: u16,
    timeout: Duration,
    width: usize,
}

impl LivenessProber {
    /// Build a prober from the run configuration.
    pub fn new(config: &AuditConfig) -> Self {
        Self {
            port: config.management_port,
            timeout: config.liveness_timeout,
            width: config.pool_width,
        }
    }

    /// Probe every candidate and return the subset that accepted a
    /// connection, in completion order.
    pub async fn probe(&self, addresses: impl IntoIterator<Item = Ipv4Addr>) -> Vec<Ipv4Addr> {
        let candidates: Vec<Ipv4Addr> = addresses.into_iter().collect();
        info!("probing {} candidate addresses", candidates.len());

        let port = self.port;
        let timeout = self.timeout;
        let alive = run_pool(self.width, candidates, move |address| async move {
            probe_one(address, port, timeout).await.then_some(address)
        })
        .await;
        info!("{} hosts detected", alive.len());
        alive
    }
}

/// Whether `address` accepts a TCP connection on `port` within `timeout`.
async fn probe_one(address: Ipv4Addr, port: u16, timeout: Duration) -> bool {
    let target = SocketAddr::from((address, port));
    match tokio::time::timeout(timeout, TcpStream::connect(target)).await {
        Ok(Ok(stream)) => {
            drop(stream);
            debug!("{address} accepted a connection on port {port}");
            true
        }
        Ok(Err(e)) => {
            debug!("{address} refused a connection on port {port}: {e}");
            false
        }
        Err(_) => {
            debug!("{address} timed out on port {port}");
            false
        }
    }
}
