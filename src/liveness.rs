use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::supervisor::{Notification, Supervisor};

/// Watchdog ping interval.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Periodic watchdog pings to the supervisor.
///
/// `Stopping` is only ever sent by [`Heartbeat::stop`], after the ping loop
/// has finished, so no watchdog ping can follow it.
pub struct Heartbeat {
    supervisor: Arc<dyn Supervisor>,
    done: CancellationToken,
    finished: JoinHandle<()>,
}

impl Heartbeat {
    /// Report readiness and start pinging every `interval`. The loop ends
    /// when `done` is cancelled.
    pub fn start(
        supervisor: Arc<dyn Supervisor>,
        interval: Duration,
        done: CancellationToken,
    ) -> Self {
        supervisor.notify(&Notification::Ready);
        supervisor.notify(&Notification::status("Serving requests"));

        let finished =
            tokio::spawn(ping_loop(Arc::clone(&supervisor), interval, done.clone()));

        Self {
            supervisor,
            done,
            finished,
        }
    }

    /// Close the done indicator, wait for the loop to exit, then send
    /// `Stopping`.
    pub async fn stop(self) {
        self.done.cancel();
        if let Err(e) = self.finished.await {
            tracing::warn!("heartbeat task failed: {e}");
        }
        self.supervisor.notify(&Notification::Stopping);
    }
}

async fn ping_loop(
    supervisor: Arc<dyn Supervisor>,
    interval: Duration,
    done: CancellationToken,
) {
    let mut ticks = tokio::time::interval_at(Instant::now() + interval, interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = done.cancelled() => break,
            _ = ticks.tick() => supervisor.notify(&Notification::Watchdog),
        }
    }
    tracing::debug!("heartbeat stopped");
}
