//! Background session monitor.
//!
//! On a fixed cadence the monitor snapshots every user's ledger, recomputes
//! the remaining amount of each dose and logs it. Doses of the alert category
//! whose remaining amount sits inside the configured band raise a
//! clearance-window notice.
//!
//! Scans run inline in the monitor task, so two scans never overlap. If a
//! scan overruns the interval the missed ticks are skipped. Stopping the
//! monitor lets an in-flight scan finish before the task exits.

use crate::catalog::DefinitionLookup;
use crate::config::{AlertMode, MonitorConfig};
use crate::decay::{hours, remaining_amount};
use crate::ledger::DoseLedger;
use crate::{Error, Result, UnknownSubstancePolicy};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Observation of one dose during a scan
#[derive(Clone, Debug)]
pub struct DoseReading {
    pub user_id: String,
    pub dose_id: Uuid,
    pub substance: String,
    pub original_mg: f64,
    pub current_mg: f64,
    pub elapsed: Duration,
}

/// A dose whose remaining amount is inside the alert band
#[derive(Clone, Debug)]
pub struct ClearanceAlert {
    pub user_id: String,
    pub dose_id: Uuid,
    pub substance: String,
    pub current_mg: f64,
}

/// Everything one scan observed
#[derive(Clone, Debug, Default)]
pub struct ScanReport {
    pub readings: Vec<DoseReading>,
    pub alerts: Vec<ClearanceAlert>,
    /// Doses whose substance could not be resolved
    pub skipped: usize,
}

/// Counters accumulated across scans
#[derive(Clone, Debug, Default)]
pub struct MonitorMetrics {
    pub scan_count: usize,
    pub readings: usize,
    pub alerts: usize,
    pub skipped: usize,
}

impl MonitorMetrics {
    fn record(&mut self, report: &ScanReport) {
        self.scan_count += 1;
        self.readings += report.readings.len();
        self.alerts += report.alerts.len();
        self.skipped += report.skipped;
    }

    pub fn summary(&self) -> String {
        format!(
            "{} scans, {} readings, {} alerts, {} skipped doses",
            self.scan_count, self.readings, self.alerts, self.skipped
        )
    }
}

/// Periodic re-evaluation of every active user's stack
pub struct Monitor {
    ledger: Arc<dyn DoseLedger>,
    lookup: Arc<dyn DefinitionLookup>,
    config: MonitorConfig,
    policy: UnknownSubstancePolicy,
    /// Doses inside the alert band as of the previous scan (edge mode)
    in_band: Mutex<HashSet<Uuid>>,
    metrics: Mutex<MonitorMetrics>,
}

impl Monitor {
    /// Create a monitor that silently skips unknown substances
    pub fn new(
        ledger: Arc<dyn DoseLedger>,
        lookup: Arc<dyn DefinitionLookup>,
        config: MonitorConfig,
    ) -> Self {
        Self::with_policy(ledger, lookup, config, UnknownSubstancePolicy::Lenient)
    }

    pub fn with_policy(
        ledger: Arc<dyn DoseLedger>,
        lookup: Arc<dyn DefinitionLookup>,
        config: MonitorConfig,
        policy: UnknownSubstancePolicy,
    ) -> Self {
        Self {
            ledger,
            lookup,
            config,
            policy,
            in_band: Mutex::new(HashSet::new()),
            metrics: Mutex::new(MonitorMetrics::default()),
        }
    }

    /// Counters so far
    pub fn metrics(&self) -> MonitorMetrics {
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Scan every user as of now
    pub fn scan(&self) -> ScanReport {
        self.scan_at(Utc::now())
    }

    /// Scan every user as of `now`
    pub fn scan_at(&self, now: DateTime<Utc>) -> ScanReport {
        let sessions = self.ledger.snapshot();
        let mut report = ScanReport::default();
        let mut seen_in_band = HashSet::new();

        if sessions.is_empty() {
            tracing::debug!("Monitor heartbeat: no active sessions");
        }

        let mut users: Vec<_> = sessions.iter().filter(|(_, stack)| !stack.is_empty()).collect();
        users.sort_by(|a, b| a.0.cmp(b.0));

        let mut in_band = self.in_band.lock().unwrap_or_else(PoisonError::into_inner);
        let alert = &self.config.alert;

        for (user_id, stack) in users {
            for dose in stack {
                let def = match self.lookup.get(&dose.substance_id) {
                    Ok(def) => def,
                    Err(e) => {
                        report.skipped += 1;
                        if self.policy == UnknownSubstancePolicy::Strict {
                            tracing::error!(
                                "User [{}]: {}; abandoning remaining doses this tick",
                                user_id,
                                e
                            );
                            break;
                        }
                        continue;
                    }
                };

                let elapsed = now - dose.ingested_at;
                let current_mg = remaining_amount(dose.amount_mg, def.half_life_hours, elapsed);

                tracing::info!(
                    "User [{}]: {} | Original: {:.0}mg | Current: {:.1}mg (T+{:.0}m)",
                    user_id,
                    def.name,
                    dose.amount_mg,
                    current_mg,
                    hours(elapsed) * 60.0
                );

                if def.category == alert.category && alert.in_band(current_mg) {
                    seen_in_band.insert(dose.id);
                    let first_entry = in_band.insert(dose.id);
                    if alert.mode == AlertMode::EveryTick || first_entry {
                        tracing::warn!(
                            "User [{}]: SLEEP WINDOW OPEN: {} is low enough ({:.1}mg)",
                            user_id,
                            def.name,
                            current_mg
                        );
                        report.alerts.push(ClearanceAlert {
                            user_id: user_id.clone(),
                            dose_id: dose.id,
                            substance: def.name.clone(),
                            current_mg,
                        });
                    }
                }

                report.readings.push(DoseReading {
                    user_id: user_id.clone(),
                    dose_id: dose.id,
                    substance: def.name,
                    original_mg: dose.amount_mg,
                    current_mg,
                    elapsed,
                });
            }
        }

        // Leaving the band (or the ledger) re-arms the edge trigger
        in_band.retain(|id| seen_in_band.contains(id));
        drop(in_band);

        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(&report);

        report
    }

    /// Launch the scan loop on the current tokio runtime
    ///
    /// The first scan happens one `period` after start.
    pub fn start(self: Arc<Self>, period: std::time::Duration) -> Result<MonitorHandle> {
        if period.is_zero() {
            return Err(Error::Monitor("scan interval must be non-zero".into()));
        }
        let first_tick = Instant::now()
            .checked_add(period)
            .ok_or_else(|| Error::Monitor(format!("scan interval {:?} is out of range", period)))?;

        let token = CancellationToken::new();
        let task = tokio::spawn(Arc::clone(&self).run(first_tick, period, token.clone()));

        Ok(MonitorHandle {
            monitor: self,
            token,
            task,
        })
    }

    async fn run(
        self: Arc<Self>,
        first_tick: Instant,
        period: std::time::Duration,
        token: CancellationToken,
    ) {
        let mut ticker = interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!("Background monitor online. Scanning every {:?}", period);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::info!("Shutdown requested, stopping monitor");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.scan();
                    tracing::debug!(
                        "Scan complete: {} readings, {} alerts, {} skipped",
                        report.readings.len(),
                        report.alerts.len(),
                        report.skipped
                    );
                }
            }
        }

        tracing::info!("Monitor stopped. {}", self.metrics().summary());
    }
}

/// Handle to a running monitor
pub struct MonitorHandle {
    monitor: Arc<Monitor>,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Token that stops the monitor when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop the loop, wait for any in-flight scan, and return final counters
    pub async fn stop(self) -> Result<MonitorMetrics> {
        self.token.cancel();
        self.wait().await
    }

    /// Wait for the loop to exit (after the token is cancelled elsewhere)
    pub async fn wait(self) -> Result<MonitorMetrics> {
        self.task
            .await
            .map_err(|e| Error::Monitor(format!("monitor task failed: {}", e)))?;
        Ok(self.monitor.metrics())
    }
}
