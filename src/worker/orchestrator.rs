//! Fan-out of device probes over the validated address set.

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

use log::warn;

use super::pool::run_pool;
use crate::config::AuditConfig;
use crate::device::DeviceProbe;
use crate::report::{Aggregate, ReportSink};
use crate::session::SessionRegistry;
use crate::transport::Dial;

/// Drives one [`DeviceProbe`] per validated address on a fixed-width worker
/// pool and merges every result into a shared aggregate.
///
/// Successful results are additionally forwarded to the report sink as they
/// complete; a sink failure is downgraded to a warning. Per-device faults
/// never reach this layer (the state machine folds and logs them itself),
/// so one device cannot abort its siblings.
pub struct Orchestrator<D: Dial> {
    config: Arc<AuditConfig>,
    registry: Arc<SessionRegistry<D>>,
    sink: Arc<dyn ReportSink>,
}

impl<D: Dial> Orchestrator<D> {
    /// Create an orchestrator over an existing registry and sink.
    pub fn new(
        config: Arc<AuditConfig>,
        registry: Arc<SessionRegistry<D>>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            config,
            registry,
            sink,
        }
    }

    /// Probe every address and return the aggregate, one entry per address.
    pub async fn run(&self, addresses: Vec<Ipv4Addr>) -> Aggregate {
        let aggregate = Arc::new(Mutex::new(Aggregate::new()));

        let worker = {
            let config = self.config.clone();
            let registry = self.registry.clone();
            let sink = self.sink.clone();
            let aggregate = aggregate.clone();
            move |address: Ipv4Addr| {
                let config = config.clone();
                let registry = registry.clone();
                let sink = sink.clone();
                let aggregate = aggregate.clone();
                async move {
                    let result = DeviceProbe::new(address, config, registry).run().await;
                    if result.is_success()
                        && let Err(e) = sink.submit(&result)
                    {
                        warn!("report sink rejected {}: {e}", result.display_name());
                    }
                    aggregate.lock().unwrap().insert(address, result);
                    None::<()>
                }
            }
        };

        run_pool(self.config.pool_width, addresses, worker).await;

        match Arc::try_unwrap(aggregate) {
            Ok(aggregate) => aggregate.into_inner().unwrap(),
            Err(aggregate) => std::mem::take(&mut *aggregate.lock().unwrap()),
        }
    }
}
