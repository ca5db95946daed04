pub mod tasks;

use anyhow::{Context, Result};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Wrapper around tokio-cron-scheduler for background tasks
pub struct Scheduler {
    inner: JobScheduler,
}

impl Scheduler {
    /// Create a new scheduler
    pub async fn new() -> Result<Self> {
        let inner = JobScheduler::new()
            .await
            .context("Failed to create job scheduler")?;
        Ok(Self { inner })
    }

    /// Add a recurring cron job
    pub async fn add_cron_job<F>(&self, cron_expr: &str, name: &str, task: F) -> Result<()>
    where
        F: Fn() -> TaskFuture + Send + Sync + 'static,
    {
        let job_name = name.to_string();
        let job = Job::new_async(cron_expr, move |_uuid, _lock| run_named(&job_name, &task))
            .with_context(|| format!("Failed to create cron job: {}", name))?;
        self.register(job, name).await?;

        info!("Scheduled task '{}' with cron: {}", name, cron_expr);
        Ok(())
    }

    /// Add a job that repeats at a fixed interval
    pub async fn add_interval_job<F>(&self, every: Duration, name: &str, task: F) -> Result<()>
    where
        F: Fn() -> TaskFuture + Send + Sync + 'static,
    {
        let job_name = name.to_string();
        let job = Job::new_repeated_async(every, move |_uuid, _lock| run_named(&job_name, &task))
            .with_context(|| format!("Failed to create interval job: {}", name))?;
        self.register(job, name).await?;

        info!("Scheduled task '{}' every {}s", name, every.as_secs());
        Ok(())
    }

    async fn register(&self, job: Job, name: &str) -> Result<()> {
        self.inner
            .add(job)
            .await
            .with_context(|| format!("Failed to add job: {}", name))?;
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<()> {
        self.inner
            .start()
            .await
            .context("Failed to start scheduler")?;
        info!("Scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner
            .shutdown()
            .await
            .context("Failed to shutdown scheduler")?;
        info!("Scheduler stopped");
        Ok(())
    }
}

/// One run of a job: log its name, then drive the task.
fn run_named<F>(name: &str, task: &F) -> TaskFuture
where
    F: Fn() -> TaskFuture,
{
    let name = name.to_string();
    let fut = task();
    Box::pin(async move {
        info!("Running scheduled task: {}", name);
        fut.await;
    })
}
