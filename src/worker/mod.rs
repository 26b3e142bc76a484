//! Worker pools and batch orchestration.
//!
//! Two bounded pools run in sequence: the liveness pool narrows the raw
//! address set to reachable hosts, then the probe pool drives one device
//! session per surviving address.

mod liveness;
mod orchestrator;
mod pool;

pub use liveness::LivenessProber;
pub use orchestrator::Orchestrator;

use std::net::Ipv4Addr;
use std::sync::Arc;

use log::{error, info};

use crate::config::AuditConfig;
use crate::report::{Aggregate, ReportSink};
use crate::session::SessionRegistry;
use crate::transport::Dial;

/// Run one complete audit batch: liveness-probe the candidates, then probe
/// every reachable device and aggregate the results.
///
/// Finding zero reachable devices is a non-fatal outcome: it is logged as
/// an error, the grace delay elapses so an operator can read it, and an
/// empty aggregate is returned. Re-entry with a fresh address set is always
/// safe; every session registered during a batch is released before the
/// batch returns.
pub async fn run_batch<D: Dial>(
    config: Arc<AuditConfig>,
    dialer: D,
    addresses: impl IntoIterator<Item = Ipv4Addr>,
    sink: Arc<dyn ReportSink>,
) -> Aggregate {
    let alive = LivenessProber::new(&config).probe(addresses).await;

    if alive.is_empty() {
        error!("no host accepted a connection, nothing to audit");
        tokio::time::sleep(config.grace_delay).await;
        return Aggregate::new();
    }

    info!("starting device probes on {} validated addresses", alive.len());
    let registry = Arc::new(SessionRegistry::new(dialer, config.clone()));
    Orchestrator::new(config, registry, sink).run(alive).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::net::TcpListener;

    use crate::report::{LogSink, Outcome};
    use crate::transport::fake::{FakeDialer, Script};

    #[tokio::test]
    async fn test_no_reachable_hosts_yields_empty_aggregate() {
        let config = Arc::new(
            AuditConfig::new("auditor", "hunter2".to_string())
                // Nothing listens on the discard port.
                .with_management_port(9)
                .with_liveness_timeout(Duration::from_millis(200))
                .with_grace_delay(Duration::ZERO),
        );

        let aggregate = run_batch(
            config,
            FakeDialer::new(),
            vec!["127.0.0.2".parse().unwrap(), "127.0.0.3".parse().unwrap()],
            Arc::new(LogSink),
        )
        .await;

        assert!(aggregate.is_empty());
    }

    #[tokio::test]
    async fn test_batch_probes_only_reachable_hosts() {
        let _ = env_logger::builder().is_test(true).try_init();

        // 127.0.0.1 listens; its loopback neighbor refuses immediately.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let config = Arc::new(
            AuditConfig::new("auditor", "hunter2".to_string())
                .with_management_port(port)
                .with_command_timeout(Duration::from_secs(2)),
        );

        let dialer = FakeDialer::new();
        dialer.device(
            "127.0.0.1",
            Script::new()
                .reply("show version", "lab-sw-01 uptime is 1 year, 2 weeks,\n")
                .reply("show int status", "gi1/0/2   desk   notconnect   10\n")
                .reply("show int gi1/0/2", "  Last input never, output never\n"),
        );

        let aggregate = run_batch(
            config,
            dialer.clone(),
            vec!["127.0.0.1".parse().unwrap(), "127.0.0.2".parse().unwrap()],
            Arc::new(LogSink),
        )
        .await;

        // The unreachable neighbor never made it past liveness.
        assert_eq!(aggregate.len(), 1);
        let result = &aggregate[&"127.0.0.1".parse::<std::net::Ipv4Addr>().unwrap()];
        assert_eq!(result.outcome, Outcome::Success);
        assert_eq!(result.display_name(), "lab-sw-01");
        assert_eq!(result.idle_ports.len(), 1);
        assert_eq!(dialer.dial_count(), 1);
    }
}
