use chrono::Utc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::services::calls::CallService;
use crate::services::invoices::InvoiceService;

/// Periodic housekeeping: overdue invoices and unanswered calls.
#[derive(Clone)]
pub struct MaintenanceTask {
    invoices: InvoiceService,
    calls: CallService,
    interval: Duration,
    ring_timeout: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub invoices_overdue: u64,
    pub calls_missed: u64,
}

impl MaintenanceTask {
    pub fn new(
        invoices: InvoiceService,
        calls: CallService,
        interval: Duration,
        ring_timeout: Duration,
    ) -> Self {
        Self {
            invoices,
            calls,
            interval,
            ring_timeout,
        }
    }

    /// One pass. Failures are logged and the other job still runs.
    pub async fn run_once(&self) -> SweepReport {
        let now = Utc::now();
        let mut report = SweepReport::default();

        match self.invoices.mark_overdue(now).await {
            Ok(n) => report.invoices_overdue = n,
            Err(e) => error!(error = %e, "Overdue invoice sweep failed"),
        }

        let timeout = chrono::Duration::from_std(self.ring_timeout)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));
        match self.calls.expire_unanswered(now, timeout).await {
            Ok(n) => report.calls_missed = n,
            Err(e) => error!(error = %e, "Unanswered call sweep failed"),
        }

        debug!(?report, "Maintenance sweep finished");
        report
    }

    pub async fn run(self) {
        info!(interval = ?self.interval, "Starting maintenance loop");
        let mut ticker = tokio::time::interval(self.interval.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }
}
