use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::sales::SaleScanReport;
use crate::watcher::Watcher;

/// Re-runs the sale scan on a cron schedule after startup.
pub struct SaleScheduler {
    scheduler: JobScheduler,
    runs: Arc<AtomicU64>,
    last_report: Arc<RwLock<Option<SaleScanReport>>>,
}

impl SaleScheduler {
    pub async fn new() -> Result<Self> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            runs: Arc::new(AtomicU64::new(0)),
            last_report: Arc::new(RwLock::new(None)),
        })
    }

    /// `cron` takes six fields, seconds first.
    pub async fn schedule_sales(&self, watcher: Arc<Watcher>, cron: &str) -> Result<Uuid> {
        let runs = Arc::clone(&self.runs);
        let last_report = Arc::clone(&self.last_report);

        let job = Job::new_async(cron, move |_uuid, _l| {
            let watcher = Arc::clone(&watcher);
            let runs = Arc::clone(&runs);
            let last_report = Arc::clone(&last_report);

            Box::pin(async move {
                tracing::debug!("Starting scheduled sale scan");
                let report = watcher.sales().check_sales().await;
                let posted = report.posted;
                *last_report.write().await = Some(report);

                let run = runs.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::info!(run, posted, "Scheduled sale scan complete");
            })
        })
        .with_context(|| format!("invalid sale schedule: {}", cron))?;

        let id = self.scheduler.add(job).await?;
        tracing::info!("Scheduled sale scan with cron: {}", cron);
        Ok(id)
    }

    pub async fn start(&self) -> Result<()> {
        self.scheduler.start().await?;
        tracing::info!("Sale scheduler started");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.scheduler.shutdown().await?;
        tracing::info!(runs = self.runs(), "Sale scheduler shutdown");
        Ok(())
    }

    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    pub async fn last_report(&self) -> Option<SaleScanReport> {
        self.last_report.read().await.clone()
    }
}
