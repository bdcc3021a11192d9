use crate::detect::{Notification, RiskResult};
use crate::scheduler::{HistoryPoint, Monitor, Snapshot};
use crate::sensor::SensorReading;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Owned periodic driver for a [`Monitor`].
///
/// Must be started inside a tokio runtime. Dropping the scheduler cancels the
/// tick task; [`TickScheduler::stop`] does the same and waits for it to exit.
pub struct TickScheduler {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    view: SnapshotView,
}

impl TickScheduler {
    /// Publish the initial snapshot immediately, then tick every `period`.
    pub fn start(mut monitor: Monitor, period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let (tx, rx) = watch::channel(Arc::new(monitor.initial_snapshot()));
        let cancel = CancellationToken::new();

        let token = cancel.clone();
        let task = tokio::spawn(async move {
            run_tick_loop(monitor, period, tx, token).await;
        });

        Self {
            cancel,
            task: Some(task),
            view: SnapshotView { rx },
        }
    }

    /// A read handle on the published snapshots.
    pub fn view(&self) -> SnapshotView {
        self.view.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel the tick task and wait for it to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Tick task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Main tick loop. Late ticks are skipped rather than queued.
async fn run_tick_loop(
    mut monitor: Monitor,
    period: Duration,
    tx: watch::Sender<Arc<Snapshot>>,
    cancel: CancellationToken,
) {
    info!(period_ms = period.as_millis() as u64, "Tick scheduler started");

    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let snapshot = monitor.tick();
                tx.send_replace(Arc::new(snapshot));
            }
        }
    }

    info!(ticks = monitor.sequence(), "Tick scheduler stopped");
}

/// Cloneable, read-only access to the latest [`Snapshot`].
///
/// Each accessor reads one published snapshot. To look at several fields of
/// the same tick, take [`SnapshotView::snapshot`] once and read from that.
#[derive(Clone)]
pub struct SnapshotView {
    rx: watch::Receiver<Arc<Snapshot>>,
}

impl SnapshotView {
    /// A view that always returns `snapshot` and never changes.
    pub fn detached(snapshot: Snapshot) -> Self {
        let (_tx, rx) = watch::channel(Arc::new(snapshot));
        Self { rx }
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.rx.borrow().clone()
    }

    pub fn current_reading(&self) -> SensorReading {
        self.rx.borrow().reading.clone()
    }

    pub fn current_risk(&self) -> RiskResult {
        self.rx.borrow().risk.clone()
    }

    pub fn current_notifications(&self) -> Vec<Notification> {
        self.rx.borrow().notifications.clone()
    }

    pub fn history(&self) -> Vec<HistoryPoint> {
        self.rx.borrow().history.clone()
    }

    /// Wait for the next published snapshot. `None` once the scheduler has
    /// stopped.
    pub async fn changed(&mut self) -> Option<Arc<Snapshot>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}
