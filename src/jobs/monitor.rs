use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};

use crate::app_context::AppContext;
use crate::monitor::run_monitoring_cycle;

/// Recurring monitor timer. The stop signal is only observed between ticks,
/// so a cycle that is already underway always runs to completion.
pub(crate) fn start_monitor_job(context: AppContext, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut previous_tick = None;

        loop {
            let now = Utc::now();
            if let Some(previous) = previous_tick {
                let elapsed_secs = now.signed_duration_since(previous).num_seconds().max(0);
                let threshold_secs = (interval.as_secs() * 2) as i64;
                if elapsed_secs > threshold_secs {
                    log::warn!(
                        "monitor_loop_delayed elapsed_secs={} threshold_secs={}",
                        elapsed_secs,
                        threshold_secs
                    );
                }
            }
            previous_tick = Some(now);

            run_monitoring_cycle(&context).await;

            tokio::select! {
                _ = sleep(interval) => {}
                _ = context.monitor_stop.notified() => {
                    log::info!("monitor_job_exit reason=stop_requested");
                    return;
                }
            }
        }
    })
}
