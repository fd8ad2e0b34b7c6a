//! Overdue escalation, the periodic sweep over unpaid bills
//!
//! Two passes per run: due bills past their due date become overdue,
//! then every unresolved overdue bill gets its late payment penalty
//! recomputed from scratch against the active tariff. Re-running on
//! the same day is safe; penalties are replaced, never accumulated.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::Duration;
use tracing::{info, warn};

use crate::application::ports::TariffProvider;
use crate::application::services::notify::Notifier;
use crate::domain::error::BillingResult;
use crate::domain::ledger::LedgerProvider;
use crate::domain::tariff::calculate_penalty;
use crate::shared::shutdown::ShutdownSignal;

/// Counters for one escalation run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EscalationReport {
    /// Due bills moved to overdue.
    pub marked_overdue: usize,
    /// Overdue bills whose penalty was recomputed and persisted.
    pub penalties_updated: usize,
    /// Bills left for the next run (tariff outage, concurrent update).
    pub skipped: usize,
}

/// Service owning the overdue sweep.
///
/// Knows nothing about scheduling; [`start_escalation_task`] drives it
/// on an interval and any external scheduler can call
/// [`run_once`](EscalationService::run_once) directly.
pub struct EscalationService {
    ledgers: Arc<dyn LedgerProvider>,
    tariffs: Arc<dyn TariffProvider>,
    notifier: Notifier,
}

impl EscalationService {
    pub fn new(
        ledgers: Arc<dyn LedgerProvider>,
        tariffs: Arc<dyn TariffProvider>,
        notifier: Notifier,
    ) -> Self {
        Self {
            ledgers,
            tariffs,
            notifier,
        }
    }

    /// One full escalation pass at `now`.
    ///
    /// Per-bill failures are warned and counted as skipped; the sweep
    /// itself only fails when the ledger queries do.
    pub async fn run_once(&self, now: DateTime<Utc>) -> BillingResult<EscalationReport> {
        let mut report = EscalationReport::default();

        self.mark_overdue(now, &mut report).await?;
        self.recompute_penalties(now, &mut report).await?;

        info!(
            marked_overdue = report.marked_overdue,
            penalties_updated = report.penalties_updated,
            skipped = report.skipped,
            "Escalation sweep finished"
        );

        Ok(report)
    }

    async fn mark_overdue(
        &self,
        now: DateTime<Utc>,
        report: &mut EscalationReport,
    ) -> BillingResult<()> {
        let due = self.ledgers.bills().find_due_before(now).await?;

        for mut bill in due {
            let bill_id = bill.id.clone();
            bill.mark_overdue();

            match self.ledgers.bills().update(bill).await {
                Ok(updated) => {
                    report.marked_overdue += 1;
                    info!(bill_id = %updated.id, due_date = %updated.due_date, "Bill marked overdue");
                    self.notifier.bill_overdue(&updated).await;
                }
                Err(err) => {
                    report.skipped += 1;
                    warn!(bill_id = %bill_id, error = %err, "Failed to mark bill overdue");
                }
            }
        }

        Ok(())
    }

    async fn recompute_penalties(
        &self,
        now: DateTime<Utc>,
        report: &mut EscalationReport,
    ) -> BillingResult<()> {
        let overdue = self.ledgers.bills().find_overdue_unresolved().await?;

        for mut bill in overdue {
            let bill_id = bill.id.clone();
            let days_late = bill.days_late(now);

            let schedule = match self
                .tariffs
                .active_schedule(bill.utility_type, &bill.tariff_plan)
                .await
            {
                Ok(schedule) => schedule,
                Err(err) => {
                    report.skipped += 1;
                    warn!(bill_id = %bill_id, error = %err, "Skipping penalty recompute, tariff lookup failed");
                    continue;
                }
            };

            let penalty =
                calculate_penalty(bill.base_amount(), days_late, &schedule.overdue_penalty_slabs);
            bill.apply_penalty(penalty);

            match self.ledgers.bills().update(bill).await {
                Ok(updated) => {
                    report.penalties_updated += 1;
                    info!(
                        bill_id = %updated.id,
                        days_late,
                        penalty = %updated.penalty_amount,
                        total = %updated.total_amount,
                        "Penalty recomputed"
                    );
                    self.notifier.penalty_applied(&updated, days_late).await;
                }
                Err(err) => {
                    report.skipped += 1;
                    warn!(bill_id = %bill_id, error = %err, "Skipping penalty recompute, concurrent update");
                }
            }
        }

        Ok(())
    }
}

/// Start the escalation background task.
///
/// Sweeps every `interval_secs` (daily in production) until the
/// shutdown signal fires. The first sweep runs immediately on start.
pub fn start_escalation_task(
    escalation: Arc<EscalationService>,
    shutdown: ShutdownSignal,
    interval_secs: u64,
) {
    tokio::spawn(async move {
        info!(interval = interval_secs, "⏰ Escalation task started");

        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = escalation.run_once(Utc::now()).await {
                        warn!(error = %e, "Escalation sweep error");
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!("⏰ Escalation task shutting down");
                    break;
                }
            }
        }

        info!("⏰ Escalation task stopped");
    });
}

// ── Tests ──────────────────────────────────────────────────────
