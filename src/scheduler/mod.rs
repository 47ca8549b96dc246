//! Scheduler
//!
//! Runs one cycle per timer tick on a background task. A tick that arrives
//! while the previous cycle is still running is skipped, so cycles never
//! overlap.

use crate::agent::Agent;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

/// Work driven by the scheduler
#[async_trait]
pub trait CycleRunner: Send + 'static {
    /// Run one cycle
    async fn run_cycle(&mut self);

    /// Release resources once ticking has stopped
    async fn shutdown(&mut self);
}

#[async_trait]
impl CycleRunner for Agent {
    async fn run_cycle(&mut self) {
        self.process_cycle().await;
    }

    async fn shutdown(&mut self) {
        Agent::shutdown(self).await;
    }
}

/// Tick counters reported when the scheduler stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub started: u64,
    pub skipped: u64,
}

pub struct Scheduler<R: CycleRunner> {
    runner: Arc<Mutex<R>>,
    period: Duration,
}

impl<R: CycleRunner> Scheduler<R> {
    pub fn new(runner: R, period: Duration) -> Self {
        Self {
            runner: Arc::new(Mutex::new(runner)),
            period,
        }
    }

    /// Start ticking; the first cycle runs immediately
    pub fn start(self) -> SchedulerHandle<R> {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let runner = self.runner.clone();
        let period = self.period;

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut stats = SchedulerStats::default();

            info!("[SCHEDULER] Started, period {:?}", period);

            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        stats.ticks += 1;

                        match runner.clone().try_lock_owned() {
                            Ok(mut guard) => {
                                stats.started += 1;
                                tokio::spawn(async move {
                                    guard.run_cycle().await;
                                });
                            }
                            Err(_) => {
                                stats.skipped += 1;
                                warn!("[SCHEDULER] Previous cycle still running, skipping tick");
                            }
                        }
                    }
                }
            }

            stats
        });

        SchedulerHandle {
            stop_tx,
            task,
            runner: self.runner,
        }
    }
}

/// Handle to stop a running scheduler
pub struct SchedulerHandle<R: CycleRunner> {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<SchedulerStats>,
    runner: Arc<Mutex<R>>,
}

impl<R: CycleRunner> SchedulerHandle<R> {
    /// Stop ticking, wait for the in-flight cycle, then shut the runner down
    pub async fn stop(self) -> SchedulerStats {
        let _ = self.stop_tx.send(true);

        let stats = match self.task.await {
            Ok(stats) => stats,
            Err(e) => {
                error!("[SCHEDULER] Tick task failed: {}", e);
                SchedulerStats::default()
            }
        };

        let mut runner = self.runner.lock().await;
        runner.shutdown().await;

        info!(
            "[SCHEDULER] Stopped after {} cycles ({} ticks skipped)",
            stats.started, stats.skipped
        );
        stats
    }
}
