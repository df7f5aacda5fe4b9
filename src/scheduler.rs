use crate::events::TriggerHandler;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info};

/// Start the job that flushes both stores every `interval`.
///
/// Each run calls [`TriggerHandler::on_tick`], which logs its own failures;
/// a failed flush never stops the schedule.
pub async fn start_persistence_task(
    handler: Arc<dyn TriggerHandler>,
    interval: Duration,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_repeated_async(interval, move |_uuid, _l| {
        let handler = Arc::clone(&handler);

        Box::pin(async move {
            debug!("⏰ Periodic save triggered");
            let outcome = handler.on_tick().await;
            debug!("Periodic save finished: {:?}", outcome);
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    info!("✓ Periodic save every {}s", interval.as_secs());

    Ok(scheduler)
}
