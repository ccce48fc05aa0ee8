//! Background health monitoring
//!
//! A [`HealthMonitor`] owns a registry of probes and one polling task. Reads
//! go through an [`ArcSwap`] snapshot, so they never wait on the poller.

use arc_swap::ArcSwap;
use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

/// Error a probe may return instead of a verdict
pub type ProbeError = Box<dyn std::error::Error + Send + Sync>;

/// Liveness check for a single dependency
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self) -> Result<bool, ProbeError>;
}

/// Probe built from an async closure
pub struct FnProbe<F> {
    f: F,
}

/// Wrap an async closure as a [`HealthProbe`]
pub fn probe_fn<F, Fut>(f: F) -> FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, ProbeError>> + Send,
{
    FnProbe { f }
}

#[async_trait]
impl<F, Fut> HealthProbe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, ProbeError>> + Send,
{
    async fn check(&self) -> Result<bool, ProbeError> {
        (self.f)().await
    }
}

/// Health monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Pause between polling rounds
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Upper bound for a single probe
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

type ProbeRegistry = Arc<RwLock<BTreeMap<String, Arc<dyn HealthProbe>>>>;
type HealthRecord = Arc<ArcSwap<HashMap<String, bool>>>;

struct Worker {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Periodic health poller for registered services
pub struct HealthMonitor {
    config: HealthConfig,
    poller: Poller,
    worker: Mutex<Option<Worker>>,
}

impl HealthMonitor {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            poller: Poller {
                probes: Arc::new(RwLock::new(BTreeMap::new())),
                health: Arc::new(ArcSwap::from_pointee(HashMap::new())),
                probe_timeout: config.probe_timeout,
            },
            config,
            worker: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Register a probe. The service reads as unhealthy until its first poll.
    pub fn register(&self, service: impl Into<String>, probe: Arc<dyn HealthProbe>) {
        let service = service.into();
        self.poller.probes.write().insert(service.clone(), probe);
        self.poller.health.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.entry(service.clone()).or_insert(false);
            next
        });
        info!(service = %service, "registered health check");
    }

    /// Spawn the polling task. Does nothing if it is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut worker = self.worker.lock();
        if worker.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let poller = self.poller.clone();
        let interval = self.config.poll_interval;
        let handle = tokio::spawn(async move { poller.run(stop_rx, interval).await });

        *worker = Some(Worker { stop_tx, handle });
        info!(interval_ms = interval.as_millis() as u64, "health monitor started");
    }

    /// Signal the polling task and wait until it has exited
    pub async fn stop(&self) {
        let worker = self.worker.lock().take();
        let Some(worker) = worker else {
            return;
        };

        let _ = worker.stop_tx.send(true);
        if let Err(e) = worker.handle.await {
            if e.is_panic() {
                error!("health monitor task panicked: {}", e);
            }
        }
        info!("health monitor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    /// Run one polling round in the caller's task
    pub async fn check_now(&self) {
        self.poller.poll_once().await;
    }

    /// Last observed health; unknown services are unhealthy
    pub fn is_healthy(&self, service: &str) -> bool {
        self.poller.health.load().get(service).copied().unwrap_or(false)
    }

    /// Copy of the whole health record
    pub fn get_all_health(&self) -> HashMap<String, bool> {
        HashMap::clone(&self.poller.health.load())
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            let _ = worker.stop_tx.send(true);
            worker.handle.abort();
        }
    }
}

#[derive(Clone)]
struct Poller {
    probes: ProbeRegistry,
    health: HealthRecord,
    probe_timeout: Duration,
}

impl Poller {
    async fn run(self, mut stop_rx: watch::Receiver<bool>, interval: Duration) {
        loop {
            if *stop_rx.borrow() {
                break;
            }
            self.poll_once().await;

            tokio::select! {
                _ = stop_rx.changed() => break,
                _ = sleep(interval) => {}
            }
        }
        debug!("health polling loop exited");
    }

    async fn poll_once(&self) {
        let probes: Vec<(String, Arc<dyn HealthProbe>)> = self
            .probes
            .read()
            .iter()
            .map(|(name, probe)| (name.clone(), Arc::clone(probe)))
            .collect();

        for (service, probe) in probes {
            let healthy = self.probe(&service, probe.as_ref()).await;
            let previous = self.health.load().get(&service).copied().unwrap_or(false);

            self.health.rcu(|current| {
                let mut next = HashMap::clone(current);
                next.insert(service.clone(), healthy);
                next
            });

            match (previous, healthy) {
                (false, true) => info!(service = %service, "service is now HEALTHY"),
                (true, false) => warn!(service = %service, "service became UNHEALTHY"),
                _ => {}
            }
        }
    }

    async fn probe(&self, service: &str, probe: &dyn HealthProbe) -> bool {
        let check = AssertUnwindSafe(probe.check()).catch_unwind();
        match timeout(self.probe_timeout, check).await {
            Ok(Ok(Ok(healthy))) => healthy,
            Ok(Ok(Err(e))) => {
                error!(service = %service, error = %e, "health check failed");
                false
            }
            Ok(Err(_)) => {
                error!(service = %service, "health check panicked");
                false
            }
            Err(_) => {
                warn!(
                    service = %service,
                    timeout_ms = self.probe_timeout.as_millis() as u64,
                    "health check timed out"
                );
                false
            }
        }
    }
}
