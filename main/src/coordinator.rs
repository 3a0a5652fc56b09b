use crate::listener::DiscoveryListener;
use crate::listener::Listeners;
use crate::listener::SyncListener;
use crate::network::interface::InterfaceEnumerator;
use crate::network::interface::SystemInterfaceEnumerator;
use crate::probe::Probe;
use crate::probe::ProbeError;
use crate::probe::ProbeStop;
use crate::DeviceDiscovered;
use crate::DiscoveryConfig;
use std::net::Ipv4Addr;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Runs one [Probe] per local interface address and notifies listeners of
/// discovered devices.
///
/// Listeners are notified in subscription order, after the predicate given to
/// [DiscoveryCoordinator::start_with]. A session uses the listeners subscribed
/// when it started.
pub struct DiscoveryCoordinator {
    interface_enumerator: Box<dyn InterfaceEnumerator + Send>,
    config: Arc<DiscoveryConfig>,
    listeners: Vec<Arc<dyn DiscoveryListener>>,
}

impl DiscoveryCoordinator {
    pub fn new() -> Self {
        Self::with_config(SystemInterfaceEnumerator, DiscoveryConfig::default())
    }

    pub fn with_config(
        interface_enumerator: impl InterfaceEnumerator + Send + 'static,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            interface_enumerator: Box::new(interface_enumerator),
            config: Arc::new(config),
            listeners: Vec::default(),
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn subscribe(&mut self, listener: impl DiscoveryListener + 'static) -> &mut Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Subscribes a synchronous callback. Returning `true` stops the probe that
    /// reported the device.
    pub fn on_discovered<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&DeviceDiscovered) -> bool + Send + Sync + 'static,
    {
        self.subscribe(SyncListener(callback))
    }

    /// Starts probing every interface without blocking.
    ///
    /// Must be called within a Tokio runtime.
    pub fn start(
        &self,
        cancellation: CancellationToken,
    ) -> Result<DiscoverySession, DiscoveryError> {
        self.launch(None, cancellation)
    }

    /// Like [DiscoveryCoordinator::start], with `predicate` notified before every
    /// subscriber.
    pub fn start_with(
        &self,
        predicate: impl DiscoveryListener + 'static,
        cancellation: CancellationToken,
    ) -> Result<DiscoverySession, DiscoveryError> {
        let predicate: Arc<dyn DiscoveryListener> = Arc::new(predicate);
        self.launch(Some(predicate), cancellation)
    }

    fn launch(
        &self,
        predicate: Option<Arc<dyn DiscoveryListener>>,
        cancellation: CancellationToken,
    ) -> Result<DiscoverySession, DiscoveryError> {
        let addresses = self.interface_enumerator.list_discovery_addresses()?;
        let listeners: Listeners = predicate
            .into_iter()
            .chain(self.listeners.iter().cloned())
            .collect();

        let mut probes = JoinSet::new();
        for local_address in addresses {
            log::debug!("Launching a probe on {}", local_address);
            let probe = Probe::new(local_address, self.config.clone(), listeners.clone());
            let cancellation = cancellation.clone();
            probes.spawn(async move {
                ProbeReport {
                    local_address,
                    result: probe.run(cancellation).await,
                }
            });
        }

        Ok(DiscoverySession {
            probes,
            cancellation,
        })
    }
}

impl Default for DiscoveryCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Probes launched by one [DiscoveryCoordinator::start].
///
/// Dropping the session aborts the probes still running.
#[must_use = "dropping the session aborts its probes"]
pub struct DiscoverySession {
    probes: JoinSet<ProbeReport>,
    cancellation: CancellationToken,
}

impl DiscoverySession {
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Number of probes not yet reported.
    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Waits for the next probe to finish.
    pub async fn next_report(&mut self) -> Option<ProbeReport> {
        while let Some(joined) = self.probes.join_next().await {
            match joined {
                Ok(report) => {
                    if let Err(e) = &report.result {
                        log::warn!("Probe on {} failed: {}", report.local_address, e);
                    }
                    return Some(report);
                }
                Err(e) => log::error!("Probe task failed: {}", e),
            }
        }
        None
    }

    /// Waits for every probe to finish.
    pub async fn join(mut self) -> Vec<ProbeReport> {
        let mut reports = Vec::with_capacity(self.probes.len());
        while let Some(report) = self.next_report().await {
            reports.push(report);
        }
        reports
    }
}

/// Outcome of one probe.
#[derive(Debug)]
pub struct ProbeReport {
    pub local_address: Ipv4Addr,
    pub result: Result<ProbeStop, ProbeError>,
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Failed to list network interfaces")]
    InterfaceInventory(#[from] std::io::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::network::interface::MockInterfaceEnumerator;
    use crate::test::FakeDevice;
    use crate::test::ECP_RESPONSE;
    use futures_util::StreamExt;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;
    use std::time::Duration;

    fn interfaces(addresses: Vec<Ipv4Addr>) -> MockInterfaceEnumerator {
        let mut interface_enumerator = MockInterfaceEnumerator::new();
        interface_enumerator
            .expect_list_discovery_addresses()
            .returning(move || Ok(addresses.clone()));
        interface_enumerator
    }

    async fn join(session: DiscoverySession) -> Vec<ProbeReport> {
        tokio::time::timeout(Duration::from_secs(5), session.join())
            .await
            .expect("Every probe must stop")
    }

    #[tokio::test]
    async fn interface_inventory_failure() {
        crate::test::init();

        let mut interface_enumerator = MockInterfaceEnumerator::new();
        interface_enumerator
            .expect_list_discovery_addresses()
            .returning(|| Err(std::io::Error::new(std::io::ErrorKind::Other, "No inventory")));
        let coordinator =
            DiscoveryCoordinator::with_config(interface_enumerator, DiscoveryConfig::default());

        // When
        let result = coordinator.start(CancellationToken::new());

        // Then
        if let Err(DiscoveryError::InterfaceInventory(e)) = result {
            assert_eq!(e.to_string(), "No inventory");
        } else {
            panic!("Expecting `InterfaceInventory`")
        }
    }

    #[tokio::test]
    async fn no_interfaces() {
        crate::test::init();

        let coordinator =
            DiscoveryCoordinator::with_config(interfaces(vec![]), DiscoveryConfig::default());

        // When
        let session = coordinator.start(CancellationToken::new()).unwrap();

        // Then
        assert!(session.is_empty());
        assert!(join(session).await.is_empty());
    }

    #[tokio::test]
    async fn one_notification_per_interface() {
        crate::test::init();

        let device = FakeDevice::start(vec![ECP_RESPONSE]).await;
        let mut coordinator = DiscoveryCoordinator::with_config(
            interfaces(vec![Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST]),
            device.config(),
        );
        let serials = Arc::new(Mutex::new(Vec::new()));
        let serials_clone = serials.clone();
        coordinator.on_discovered(move |e| {
            serials_clone.lock().unwrap().push(e.serial_number.clone());
            true
        });

        // When
        let session = coordinator.start(CancellationToken::new()).unwrap();
        assert_eq!(session.len(), 2);
        let reports = join(session).await;

        // Then
        assert_eq!(reports.len(), 2);
        for report in reports {
            assert_eq!(report.result.unwrap(), ProbeStop::Vetoed);
        }
        assert_eq!(
            *serials.lock().unwrap(),
            vec!["uuid:roku:ecp:ABC123", "uuid:roku:ecp:ABC123"]
        );
    }

    #[tokio::test]
    async fn predicate_runs_before_subscribers() {
        crate::test::init();

        let device = FakeDevice::start(vec![ECP_RESPONSE]).await;
        let mut coordinator = DiscoveryCoordinator::with_config(
            interfaces(vec![Ipv4Addr::LOCALHOST]),
            device.config(),
        );
        let order = Arc::new(Mutex::new(Vec::new()));
        let order_by_first = order.clone();
        let order_by_second = order.clone();
        let order_by_predicate = order.clone();
        coordinator
            .on_discovered(move |e| {
                order_by_first.lock().unwrap().push(("first", e.stop_requested));
                false
            })
            .on_discovered(move |e| {
                order_by_second.lock().unwrap().push(("second", e.stop_requested));
                true
            });

        // When
        let session = coordinator
            .start_with(
                move |e: DeviceDiscovered| {
                    order_by_predicate
                        .lock()
                        .unwrap()
                        .push(("predicate", e.stop_requested));
                    async { false }
                },
                CancellationToken::new(),
            )
            .unwrap();
        let reports = join(session).await;

        // Then
        assert_eq!(reports.len(), 1);
        assert_eq!(
            *order.lock().unwrap(),
            vec![("predicate", false), ("first", false), ("second", false)]
        );
    }

    #[tokio::test]
    async fn failure_is_contained_to_its_probe() {
        crate::test::init();

        let foreign_ip = Ipv4Addr::new(192, 0, 2, 1);
        let device = FakeDevice::start(vec![ECP_RESPONSE]).await;
        let coordinator = DiscoveryCoordinator::with_config(
            interfaces(vec![foreign_ip, Ipv4Addr::LOCALHOST]),
            device.config(),
        );
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();

        // When
        let session = coordinator
            .start_with(
                move |_: DeviceDiscovered| {
                    count_clone.fetch_add(1, Ordering::SeqCst);
                    async { true }
                },
                CancellationToken::new(),
            )
            .unwrap();
        let mut reports = join(session).await;
        reports.sort_by_key(|r| r.local_address);

        // Then
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(reports[0].local_address, Ipv4Addr::LOCALHOST);
        assert_eq!(*reports[0].result.as_ref().unwrap(), ProbeStop::Vetoed);
        assert_eq!(reports[1].local_address, foreign_ip);
        if let Err(ProbeError::Bind(_)) = reports[1].result {
        } else {
            panic!("Expecting `Bind`")
        }
    }

    #[tokio::test]
    async fn cancellation_stops_every_probe() {
        crate::test::init();

        let device = FakeDevice::start(vec![]).await;
        let mut coordinator = DiscoveryCoordinator::with_config(
            interfaces(vec![Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST]),
            device.config(),
        );
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        coordinator.on_discovered(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
            false
        });
        let session = coordinator.start(CancellationToken::new()).unwrap();

        // When
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.cancel();
        let reports = join(session).await;

        // Then
        assert_eq!(reports.len(), 2);
        for report in reports {
            assert_eq!(report.result.unwrap(), ProbeStop::Cancelled);
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn shared_token_cancels_session() {
        crate::test::init();

        let device = FakeDevice::start(vec![]).await;
        let coordinator = DiscoveryCoordinator::with_config(
            interfaces(vec![Ipv4Addr::LOCALHOST]),
            device.config(),
        );
        let cancellation = CancellationToken::new();
        let mut session = coordinator.start(cancellation.clone()).unwrap();

        // When
        cancellation.cancel();
        let report = tokio::time::timeout(Duration::from_secs(5), session.next_report())
            .await
            .unwrap()
            .unwrap();

        // Then
        assert_eq!(report.result.unwrap(), ProbeStop::Cancelled);
        assert!(session.cancellation_token().is_cancelled());
        assert!(session.next_report().await.is_none());
    }

    #[tokio::test]
    async fn veto_leaves_sibling_probe_running() {
        crate::test::init();

        let vetoing_ip = Ipv4Addr::LOCALHOST;
        let sibling_ip = Ipv4Addr::new(127, 0, 0, 2);
        let device = FakeDevice::start(vec![ECP_RESPONSE, ECP_RESPONSE, ECP_RESPONSE]).await;
        let coordinator = DiscoveryCoordinator::with_config(
            interfaces(vec![vetoing_ip, sibling_ip]),
            device.config(),
        );
        let (sender, mut seen) = futures_channel::mpsc::unbounded();

        // When
        let mut session = coordinator
            .start_with(
                move |e: DeviceDiscovered| {
                    let _ = sender.unbounded_send(e.local_address);
                    async move { e.local_address == vetoing_ip }
                },
                CancellationToken::new(),
            )
            .unwrap();
        let first = tokio::time::timeout(Duration::from_secs(5), session.next_report())
            .await
            .unwrap()
            .unwrap();
        let mut addresses = Vec::new();
        while addresses.len() < 4 {
            let address = tokio::time::timeout(Duration::from_secs(5), seen.next())
                .await
                .unwrap()
                .unwrap();
            addresses.push(address);
        }
        assert_eq!(session.len(), 1);
        session.cancel();
        let rest = join(session).await;

        // Then
        assert_eq!(first.local_address, vetoing_ip);
        assert_eq!(first.result.unwrap(), ProbeStop::Vetoed);
        assert_eq!(addresses.iter().filter(|a| **a == vetoing_ip).count(), 1);
        assert_eq!(addresses.iter().filter(|a| **a == sibling_ip).count(), 3);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].local_address, sibling_ip);
        assert_eq!(*rest[0].result.as_ref().unwrap(), ProbeStop::Cancelled);
    }

    #[tokio::test]
    async fn dropping_session_aborts_probes() {
        crate::test::init();

        let device = FakeDevice::start(vec![]).await;
        let coordinator = DiscoveryCoordinator::with_config(
            interfaces(vec![Ipv4Addr::LOCALHOST]),
            device.config(),
        );
        let (sender, mut seen) = futures_channel::mpsc::unbounded::<DeviceDiscovered>();
        let session = coordinator
            .start_with(
                move |e: DeviceDiscovered| {
                    let _ = sender.unbounded_send(e);
                    async { false }
                },
                CancellationToken::new(),
            )
            .unwrap();

        // When
        drop(session);

        // Then
        let next = tokio::time::timeout(Duration::from_secs(5), seen.next())
            .await
            .expect("Aborted probes must release their listeners");
        assert!(next.is_none());
    }
}
