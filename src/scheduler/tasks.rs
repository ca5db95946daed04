use std::sync::Arc;
use tracing::info;

use crate::config::MonitorConfig;
use crate::monitor::Monitor;
use crate::scheduler::Scheduler;

/// Register the periodic check cycle and the heartbeat
pub async fn register_builtin_tasks(
    scheduler: &Scheduler,
    monitor: Arc<Monitor>,
    config: &MonitorConfig,
) -> anyhow::Result<()> {
    // Heartbeat — log that the monitor is alive every hour
    scheduler
        .add_cron_job("0 0 * * * *", "heartbeat", || {
            Box::pin(async {
                info!("Heartbeat: monitor is alive");
            })
        })
        .await?;

    let check = move || {
        let monitor = monitor.clone();
        Box::pin(async move {
            monitor.run_check_cycle().await;
        }) as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
    };

    match &config.cron {
        Some(expr) => scheduler.add_cron_job(expr, "check-cycle", check).await?,
        None => {
            scheduler
                .add_interval_job(config.interval(), "check-cycle", check)
                .await?
        }
    }

    Ok(())
}
