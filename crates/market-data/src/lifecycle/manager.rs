//! Background credential health checks and rotation.
//!
//! One [`TokenLifecycleManager`] per process owns every registered adapter together
//! with its [`Rotator`]. Each cycle probes all brokers concurrently with a cheap LTP
//! call; a failed probe triggers rotation followed by `initialize()` on the adapter.
//!
//! Every broker's check runs in its own task and every adapter or rotator call is
//! contained, so a panic only ever affects the broker that raised it.

use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::slice;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use log::{debug, error, info, warn};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};

use super::rotator::Rotator;
use super::state::{BrokerState, BrokerStatus};
use crate::broker::BrokerAdapter;
use crate::errors::GatewayError;

/// Timing of the background loop.
#[derive(Clone, Debug)]
pub struct LifecycleConfig {
    /// Time between health cycles.
    pub check_interval: Duration,
    /// Pause after a cycle that aborted.
    pub error_backoff: Duration,
    /// Upper bound of one broker's probe call.
    pub probe_timeout: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(300),
            error_backoff: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(30),
        }
    }
}

impl LifecycleConfig {
    pub fn with_check_interval(mut self, check_interval: Duration) -> Self {
        self.check_interval = check_interval;
        self
    }
}

struct ManagedBroker {
    adapter: Arc<dyn BrokerAdapter>,
    rotator: Arc<dyn Rotator>,
    status: RwLock<BrokerStatus>,
    /// Serializes rotations of this broker.
    rotation_lock: Mutex<()>,
}

impl ManagedBroker {
    fn broker_type(&self) -> &'static str {
        self.adapter.broker_type()
    }

    async fn state(&self) -> BrokerState {
        self.status.read().await.state
    }

    async fn transition(&self, next: BrokerState) {
        let mut status = self.status.write().await;
        let previous = status.state;
        if status.transition(next) {
            if previous != next {
                debug!("{}: {} -> {}", self.broker_type(), previous, next);
            }
        } else {
            warn!(
                "{}: ignoring transition {} -> {}",
                self.broker_type(),
                previous,
                next
            );
        }
    }

    async fn fail(&self, next: BrokerState, err: &GatewayError) {
        self.status.write().await.record_error(err);
        self.transition(next).await;
    }

    /// Settles the state after this broker's check task died.
    async fn abandon(&self, message: &str) {
        let mut status = self.status.write().await;
        status.record_error(message);
        let next = match status.state {
            BrokerState::Initializing | BrokerState::Rotating => BrokerState::Failed,
            BrokerState::Healthy => BrokerState::Unhealthy,
            _ => return,
        };
        if status.transition(next) {
            warn!("{}: moved to {} after {}", self.broker_type(), next, message);
        }
    }
}

/// Armed while an initialize or rotation is running. Dropping it armed (panic or
/// cancellation) moves the broker to `Failed` so the next cycle retries.
struct InProgress<'a> {
    broker: &'a ManagedBroker,
    armed: bool,
}

impl<'a> InProgress<'a> {
    fn new(broker: &'a ManagedBroker) -> Self {
        Self {
            broker,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let broker_type = self.broker.broker_type();
        match self.broker.status.try_write() {
            Ok(mut status) => {
                status.record_error(format!("{} interrupted before it settled", broker_type));
                if status.transition(BrokerState::Failed) {
                    warn!("{}: interrupted, marked {}", broker_type, BrokerState::Failed);
                }
            }
            Err(_) => error!("{}: interrupted while its status was locked", broker_type),
        }
    }
}

/// Per-broker check tasks of one cycle. Dropping the set aborts whatever still runs.
struct CheckTasks(Vec<(Arc<ManagedBroker>, JoinHandle<()>)>);

impl Drop for CheckTasks {
    fn drop(&mut self) {
        for (_, handle) in &self.0 {
            handle.abort();
        }
    }
}

/// Keeps every registered broker's credential usable.
pub struct TokenLifecycleManager {
    config: LifecycleConfig,
    brokers: BTreeMap<&'static str, Arc<ManagedBroker>>,
}

impl TokenLifecycleManager {
    pub fn new(config: LifecycleConfig) -> Self {
        Self {
            config,
            brokers: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Adds a broker. Registering the same broker type again replaces it.
    pub fn register(&mut self, adapter: Arc<dyn BrokerAdapter>, rotator: Arc<dyn Rotator>) {
        let broker_type = adapter.broker_type();
        let managed = ManagedBroker {
            adapter,
            rotator,
            status: RwLock::new(BrokerStatus::new(broker_type)),
            rotation_lock: Mutex::new(()),
        };
        if self.brokers.insert(broker_type, Arc::new(managed)).is_some() {
            warn!("Replaced lifecycle registration for {}", broker_type);
        }
    }

    pub fn broker_types(&self) -> Vec<&'static str> {
        self.brokers.keys().copied().collect()
    }

    pub fn adapter(&self, broker_type: &str) -> Option<Arc<dyn BrokerAdapter>> {
        self.brokers
            .get(broker_type)
            .map(|broker| Arc::clone(&broker.adapter))
    }

    pub async fn status(&self, broker_type: &str) -> Option<BrokerStatus> {
        match self.brokers.get(broker_type) {
            Some(broker) => Some(broker.status.read().await.clone()),
            None => None,
        }
    }

    pub async fn statuses(&self) -> Vec<BrokerStatus> {
        let mut statuses = Vec::with_capacity(self.brokers.len());
        for broker in self.brokers.values() {
            statuses.push(broker.status.read().await.clone());
        }
        statuses
    }

    /// Initializes every broker that is not yet up. Brokers are independent; one
    /// failure only marks that broker `Failed`.
    pub async fn initialize_all(&self) {
        let tasks = self.brokers.values().map(|broker| async move {
            match broker.state().await {
                BrokerState::Uninitialized | BrokerState::Failed => {
                    let _ = Self::initialize_broker(broker).await;
                }
                state => debug!("{}: already {}", broker.broker_type(), state),
            }
        });
        join_all(tasks).await;
    }

    /// Runs one health cycle over every broker. Each broker is checked in its own
    /// task; a task that dies only settles that broker's state.
    pub async fn check_all_tokens(&self) {
        let probe_timeout = self.config.probe_timeout;
        let mut tasks = CheckTasks(Vec::with_capacity(self.brokers.len()));
        for broker in self.brokers.values() {
            let task_broker = Arc::clone(broker);
            let handle = tokio::spawn(async move {
                Self::check_broker(&task_broker, probe_timeout).await;
            });
            tasks.0.push((Arc::clone(broker), handle));
        }

        for (broker, handle) in tasks.0.iter_mut() {
            if let Err(e) = handle.await {
                error!("{} health check aborted: {}", broker.broker_type(), e);
                broker
                    .abandon(&format!("health check aborted: {}", e))
                    .await;
            }
        }
    }

    /// Rotates `broker_type`'s credential and re-initializes its adapter.
    pub async fn rotate_token(&self, broker_type: &str) -> Result<(), GatewayError> {
        let broker = self
            .brokers
            .get(broker_type)
            .ok_or_else(|| GatewayError::UnknownBroker(broker_type.to_string()))?;
        Self::rotate_broker(broker).await
    }

    /// Spawns the background loop. It runs one cycle immediately, then every
    /// `check_interval`, until `shutdown` turns `true` or its sender is dropped.
    pub fn start(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Token lifecycle manager started for {:?}, checking every {:?}",
                self.broker_types(),
                self.config.check_interval
            );

            let mut ticker = interval(self.config.check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_requested(&mut shutdown) => break,
                }

                let manager = Arc::clone(&self);
                let mut cycle = tokio::spawn(async move { manager.check_all_tokens().await });

                let outcome = tokio::select! {
                    outcome = &mut cycle => outcome,
                    _ = shutdown_requested(&mut shutdown) => {
                        cycle.abort();
                        break;
                    }
                };

                if let Err(e) = outcome {
                    error!(
                        "Token health cycle aborted: {}. Retrying in {:?}",
                        e, self.config.error_backoff
                    );
                    tokio::select! {
                        _ = sleep(self.config.error_backoff) => {}
                        _ = shutdown_requested(&mut shutdown) => break,
                    }
                    ticker.reset();
                }
            }

            info!("Token lifecycle manager stopped");
        })
    }

    async fn initialize_broker(broker: &ManagedBroker) -> Result<(), GatewayError> {
        let _rotation = broker.rotation_lock.lock().await;
        broker.transition(BrokerState::Initializing).await;
        let mut guard = InProgress::new(broker);

        let result = match contained(
            broker.broker_type(),
            "initialize",
            broker.adapter.initialize(),
        )
        .await
        {
            Ok(()) => {
                broker.transition(BrokerState::Healthy).await;
                info!("{} initialized", broker.broker_type());
                Ok(())
            }
            Err(e) => {
                error!("{} failed to initialize: {}", broker.broker_type(), e);
                broker.fail(BrokerState::Failed, &e).await;
                Err(e)
            }
        };
        guard.disarm();
        result
    }

    async fn check_broker(broker: &ManagedBroker, probe_timeout: Duration) {
        let state = broker.state().await;
        match state {
            BrokerState::Uninitialized => {
                let _ = Self::initialize_broker(broker).await;
                return;
            }
            BrokerState::Initializing | BrokerState::Rotating => {
                debug!("{} is busy, skipping probe", broker.broker_type());
                return;
            }
            _ => {}
        }

        let probe = broker.adapter.probe_instrument();
        let outcome = timeout(
            probe_timeout,
            contained(
                broker.broker_type(),
                "probe",
                broker.adapter.ltp_quote(slice::from_ref(&probe)),
            ),
        )
        .await
        .unwrap_or_else(|_| {
            Err(GatewayError::Timeout {
                broker: broker.broker_type().to_string(),
            })
        });

        broker.status.write().await.last_checked = Some(Utc::now());

        // A broker whose last initialize failed has no session yet. Only a missing
        // or rejected credential warrants a rotation; anything else waits a cycle.
        let outcome = match outcome {
            Err(GatewayError::NotInitialized { .. }) if state == BrokerState::Failed => {
                info!("{} has no session, re-initializing", broker.broker_type());
                match Self::initialize_broker(broker).await {
                    Err(e @ GatewayError::AuthFailure { .. }) => Err(e),
                    _ => return,
                }
            }
            other => other,
        };

        match outcome {
            Ok(_) => {
                debug!("{} probe ok", broker.broker_type());
                broker.transition(BrokerState::Healthy).await;
            }
            Err(e) => {
                warn!("{} probe failed: {}", broker.broker_type(), e);
                broker.fail(BrokerState::Unhealthy, &e).await;
                let _ = Self::rotate_broker(broker).await;
            }
        }
    }

    async fn rotate_broker(broker: &ManagedBroker) -> Result<(), GatewayError> {
        let _rotation = broker.rotation_lock.lock().await;

        let in_progress = match broker.state().await {
            BrokerState::Uninitialized => BrokerState::Initializing,
            _ => BrokerState::Rotating,
        };
        broker.transition(in_progress).await;
        let mut guard = InProgress::new(broker);
        info!("Rotating access token for {}", broker.broker_type());

        let broker_type = broker.broker_type();
        let rotated = match contained(broker_type, "rotate", broker.rotator.rotate()).await {
            Ok(()) => contained(broker_type, "initialize", broker.adapter.initialize()).await,
            Err(e) => Err(e),
        };

        let result = match rotated {
            Ok(()) => {
                broker.status.write().await.rotations += 1;
                broker.transition(BrokerState::Healthy).await;
                info!("{} rotated and re-initialized", broker.broker_type());
                Ok(())
            }
            Err(e) => {
                error!("{} rotation failed: {}", broker.broker_type(), e);
                broker.fail(BrokerState::Failed, &e).await;
                Err(e)
            }
        };
        guard.disarm();
        result
    }
}

/// Awaits one adapter or rotator call, turning a panic into [`GatewayError::Internal`].
async fn contained<T, F>(broker_type: &str, operation: &str, call: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    AssertUnwindSafe(call)
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            Err(GatewayError::Internal {
                broker: broker_type.to_string(),
                message: format!("{} panicked: {}", operation, panic_message(panic.as_ref())),
            })
        })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload")
}

/// Resolves once shutdown is signalled. A dropped sender counts as shutdown.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
