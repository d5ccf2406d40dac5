//! Tick-driven escalation scheduler.
//!
//! The engine periodically scans every tenant's open alerts, asks the
//! resolver which tier is due, advances the alert with a conditional
//! write, and only after a successful advancement notifies and records
//! the escalation. All state lives in the injected stores: nothing is
//! kept between ticks, so a restarted engine picks up exactly where the
//! persisted `current_tier` and wall-clock age say it should.

use std::sync::Arc;
use std::sync::RwLock as StdRwLock;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use siren_core::alert::{Alert, AlertSummary, DeliveryResult, EscalationEvent};
use siren_core::bus::{EventBus, SharedEventBus, SirenEvent};
use siren_core::config::{defaults, env_vars};
use siren_core::error::{Error, Result};
use siren_core::resolver;
use siren_core::store::{AdvanceOutcome, AlertStore, EventLog, PolicyStore, TenantDirectory};
use siren_core::tenant::TenantRef;
use siren_notify::Notifier;

use crate::stats::EngineStats;

/// Slot for a background task handle.
type TaskHandle = Arc<StdRwLock<Option<JoinHandle<()>>>>;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Time between scans.
    pub tick_interval: Duration,
}

impl EngineConfig {
    /// Configuration from `SIREN_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            tick_interval: Duration::from_secs(env_vars::tick_interval_secs()),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(defaults::TICK_INTERVAL_SECS),
        }
    }
}

/// Summary of one scheduler pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickOutcome {
    pub tenants_visited: usize,
    pub alerts_scanned: usize,
    pub escalations: usize,
    pub conflicts: usize,
    pub delivery_failures: usize,
    pub skipped_errors: usize,
}

/// Everything one pass needs, owned so the loop task is `'static`.
struct TickContext {
    tenants: Arc<dyn TenantDirectory>,
    alerts: Arc<dyn AlertStore>,
    policies: Arc<dyn PolicyStore>,
    events: Arc<dyn EventLog>,
    notifier: Arc<dyn Notifier>,
    bus: SharedEventBus,
    stats: Arc<StdRwLock<EngineStats>>,
}

impl TickContext {
    /// One full scan across all tenants.
    async fn run_tick(&self) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        let tenants = match self.tenants.list_tenants().await {
            Ok(tenants) => tenants,
            Err(e) => {
                tracing::warn!(error = %e, "tenant listing failed; skipping tick");
                outcome.skipped_errors += 1;
                self.finish_tick(&outcome);
                return outcome;
            }
        };

        for tenant in tenants {
            outcome.tenants_visited += 1;
            self.process_tenant(&tenant, &mut outcome).await;
        }

        self.finish_tick(&outcome);
        outcome
    }

    fn finish_tick(&self, outcome: &TickOutcome) {
        let mut stats = self.stats.write().unwrap();
        stats.ticks_completed += 1;
        stats.alerts_scanned += outcome.alerts_scanned as u64;
        stats.conflicts += outcome.conflicts as u64;
        stats.delivery_failures += outcome.delivery_failures as u64;
        stats.skipped_errors += outcome.skipped_errors as u64;
    }

    /// Scan a tenant. A failing tenant never aborts the others.
    async fn process_tenant(&self, tenant: &TenantRef, outcome: &mut TickOutcome) {
        let alerts = match self.alerts.list_escalatable(tenant).await {
            Ok(alerts) => alerts,
            Err(e) => {
                tracing::warn!(tenant = %tenant, error = %e, "alert scan failed; skipping tenant");
                outcome.skipped_errors += 1;
                return;
            }
        };

        for alert in alerts {
            outcome.alerts_scanned += 1;
            self.process_alert(tenant, &alert, outcome).await;
        }
    }

    /// Evaluate and, if due, escalate a single alert. Every failure mode
    /// is absorbed here so one alert can never take down the pass.
    async fn process_alert(&self, tenant: &TenantRef, alert: &Alert, outcome: &mut TickOutcome) {
        let policy_id = match alert.policy_id {
            Some(id) => id,
            // list_escalatable filters these out; nothing to evaluate
            None => return,
        };

        let policy = match self.policies.get_policy(tenant, &policy_id).await {
            Ok(Some(policy)) => policy,
            Ok(None) => {
                tracing::warn!(
                    tenant = %tenant,
                    alert_id = %alert.id,
                    policy_id = %policy_id,
                    "policy missing; skipping alert"
                );
                outcome.skipped_errors += 1;
                return;
            }
            Err(e) => {
                tracing::warn!(
                    tenant = %tenant,
                    alert_id = %alert.id,
                    error = %e,
                    "policy load failed; skipping alert"
                );
                outcome.skipped_errors += 1;
                return;
            }
        };

        let age = alert.age(Utc::now());
        let tier = match resolver::next_due_tier(&policy, alert.current_tier, age) {
            Some(tier) => tier,
            None => return,
        };

        // Checked before advancing so a successful advance can always be
        // paired with an event. Validation rejects method-less tiers, but
        // stored records may predate it.
        let method = match tier.notify_via.first() {
            Some(method) => *method,
            None => {
                tracing::warn!(
                    tenant = %tenant,
                    alert_id = %alert.id,
                    tier = tier.tier_number,
                    "tier has no notify method; skipping alert"
                );
                outcome.skipped_errors += 1;
                return;
            }
        };

        match self
            .alerts
            .advance_tier(tenant, &alert.id, alert.current_tier, tier.tier_number)
            .await
        {
            Ok(AdvanceOutcome::Advanced) => {}
            Ok(AdvanceOutcome::Conflict) => {
                // another writer got there first; the next tick re-reads
                tracing::debug!(
                    tenant = %tenant,
                    alert_id = %alert.id,
                    "advancement lost to a concurrent writer"
                );
                outcome.conflicts += 1;
                return;
            }
            Ok(AdvanceOutcome::NotFound) => {
                tracing::warn!(
                    tenant = %tenant,
                    alert_id = %alert.id,
                    "alert vanished between scan and advancement"
                );
                outcome.skipped_errors += 1;
                return;
            }
            Err(e) => {
                tracing::warn!(
                    tenant = %tenant,
                    alert_id = %alert.id,
                    error = %e,
                    "advancement failed; skipping alert"
                );
                outcome.skipped_errors += 1;
                return;
            }
        }

        // State is advanced; nothing below may undo it.
        let summary = AlertSummary::for_tier(alert, tier.tier_number);
        let delivery = self.notifier.deliver(method, &tier.targets, &summary).await;
        if let DeliveryResult::Failed { reason } = &delivery {
            tracing::warn!(
                tenant = %tenant,
                alert_id = %alert.id,
                tier = tier.tier_number,
                method = %method,
                reason = %reason,
                "delivery failed"
            );
            outcome.delivery_failures += 1;
        }

        let event = EscalationEvent::escalated(alert, policy.id, tier, method, Some(delivery));
        if let Err(e) = self.events.append(event).await {
            tracing::error!(
                tenant = %tenant,
                alert_id = %alert.id,
                error = %e,
                "event append failed; alert state is already advanced"
            );
        }

        self.bus.publish(SirenEvent::escalated(
            tenant.clone(),
            alert.id,
            tier.tier_number,
            method,
        ));

        outcome.escalations += 1;
        self.stats.write().unwrap().record_escalation(tier.tier_number);

        tracing::info!(
            tenant = %tenant,
            alert_id = %alert.id,
            tier = tier.tier_number,
            method = %method,
            "alert escalated"
        );
    }
}

/// Escalation engine: the scheduler loop plus the ack listener.
pub struct EscalationEngine {
    config: EngineConfig,
    tenants: Arc<dyn TenantDirectory>,
    alerts: Arc<dyn AlertStore>,
    policies: Arc<dyn PolicyStore>,
    events: Arc<dyn EventLog>,
    notifier: Arc<dyn Notifier>,
    bus: SharedEventBus,
    stats: Arc<StdRwLock<EngineStats>>,
    running: Arc<StdRwLock<bool>>,
    shutdown: StdRwLock<Option<watch::Sender<bool>>>,
    scheduler_handle: TaskHandle,
    ack_handle: TaskHandle,
}

impl EscalationEngine {
    pub fn new(
        config: EngineConfig,
        tenants: Arc<dyn TenantDirectory>,
        alerts: Arc<dyn AlertStore>,
        policies: Arc<dyn PolicyStore>,
        events: Arc<dyn EventLog>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            tenants,
            alerts,
            policies,
            events,
            notifier,
            bus: Arc::new(EventBus::default()),
            stats: Arc::new(StdRwLock::new(EngineStats::default())),
            running: Arc::new(StdRwLock::new(false)),
            shutdown: StdRwLock::new(None),
            scheduler_handle: Arc::new(StdRwLock::new(None)),
            ack_handle: Arc::new(StdRwLock::new(None)),
        }
    }

    /// Share an event bus with the rest of the process instead of the
    /// engine's private one.
    pub fn with_event_bus(mut self, bus: SharedEventBus) -> Self {
        self.bus = bus;
        self
    }

    /// The bus this engine publishes to and listens on.
    pub fn event_bus(&self) -> SharedEventBus {
        self.bus.clone()
    }

    fn tick_context(&self) -> TickContext {
        TickContext {
            tenants: self.tenants.clone(),
            alerts: self.alerts.clone(),
            policies: self.policies.clone(),
            events: self.events.clone(),
            notifier: self.notifier.clone(),
            bus: self.bus.clone(),
            stats: self.stats.clone(),
        }
    }

    /// Start the scheduler loop and the ack listener.
    /// Returns an error if the engine is already running.
    pub fn start(&self) -> Result<()> {
        {
            let mut running = self.running.write().unwrap();
            if *running {
                return Err(Error::engine("Engine is already running"));
            }
            *running = true;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let ctx = self.tick_context();
        let interval = self.config.tick_interval;
        let mut tick_shutdown = shutdown_rx.clone();
        let scheduler = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = tick_shutdown.changed() => break,
                }

                // Awaited outside the select: a shutdown signal arriving
                // mid-pass lands after the pass completes, never inside a
                // store write.
                let outcome = ctx.run_tick().await;
                tracing::debug!(
                    scanned = outcome.alerts_scanned,
                    escalations = outcome.escalations,
                    conflicts = outcome.conflicts,
                    "tick completed"
                );
            }
            tracing::debug!("escalation loop exited");
        });
        *self.scheduler_handle.write().unwrap() = Some(scheduler);

        let mut acks = self.bus.subscribe_filtered(SirenEvent::is_acknowledgment);
        let stats = self.stats.clone();
        let mut ack_shutdown = shutdown_rx;
        let listener = tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = acks.recv() => match received {
                        Some(SirenEvent::AlertAcknowledged { tenant, alert_id, acknowledged_by, .. }) => {
                            // advisory: eligibility is re-read from the
                            // store at the top of every tick
                            tracing::info!(
                                tenant = %tenant,
                                alert_id = %alert_id,
                                by = %acknowledged_by,
                                "acknowledgment observed"
                            );
                            stats.write().unwrap().acks_observed += 1;
                        }
                        Some(_) => {}
                        None => break,
                    },
                    _ = ack_shutdown.changed() => break,
                }
            }
            tracing::debug!("ack listener exited");
        });
        *self.ack_handle.write().unwrap() = Some(listener);

        *self.shutdown.write().unwrap() = Some(shutdown_tx);

        tracing::info!(
            interval_secs = self.config.tick_interval.as_secs(),
            "escalation engine started"
        );
        Ok(())
    }

    /// Signal shutdown and wait for both background tasks to finish.
    /// Returns an error if the engine is not running.
    pub async fn stop(&self) -> Result<()> {
        {
            let running = self.running.read().unwrap();
            if !*running {
                return Err(Error::engine("Engine is not running"));
            }
        }

        if let Some(tx) = self.shutdown.write().unwrap().take() {
            let _ = tx.send(true);
        }

        let scheduler = self.scheduler_handle.write().unwrap().take();
        if let Some(handle) = scheduler {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "scheduler task failed");
            }
        }

        let listener = self.ack_handle.write().unwrap().take();
        if let Some(handle) = listener {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "ack listener task failed");
            }
        }

        *self.running.write().unwrap() = false;
        tracing::info!("escalation engine stopped");
        Ok(())
    }

    /// Whether the scheduler loop is active.
    pub fn is_running(&self) -> bool {
        *self.running.read().unwrap()
    }

    /// Run one scheduler pass immediately, without the loop.
    pub async fn run_tick(&self) -> TickOutcome {
        self.tick_context().run_tick().await
    }

    /// Snapshot of the engine counters.
    pub fn stats(&self) -> EngineStats {
        self.stats.read().unwrap().clone()
    }

    pub fn tick_interval(&self) -> Duration {
        self.config.tick_interval
    }
}
