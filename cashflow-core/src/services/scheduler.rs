//! Scheduler service - periodic recomputation of today's balance
//!
//! A long-lived loop that ticks on a fixed interval and runs one
//! `process(today)` cycle per tick, guarded so that at most one
//! scheduler-initiated cycle is ever in flight.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::services::BalanceService;

/// Periodic single-flight driver for the balance calculator.
///
/// The single-slot guard is owned by this instance - constructed once at
/// startup and handed by reference to whoever runs it, never reached
/// through ambient state.
pub struct SchedulerService {
    balance_service: Arc<BalanceService>,
    interval: Duration,
    guard: Arc<Mutex<()>>,
}

impl SchedulerService {
    pub fn new(balance_service: Arc<BalanceService>, interval: Duration) -> Self {
        Self {
            balance_service,
            interval,
            guard: Arc::new(Mutex::new(())),
        }
    }

    /// Run the tick loop until `shutdown` signals true (or its sender drops).
    ///
    /// Each tick try-acquires the guard without waiting. If a previous cycle
    /// still holds it, the tick is skipped outright - no run is queued. The
    /// shutdown signal is observed only between ticks; an in-flight cycle is
    /// awaited before this returns so a write is never abandoned midway.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first interval tick fires immediately; consume it so the first
        // cycle happens one full interval after startup, not at startup.
        ticker.tick().await;

        info!(interval_secs = self.interval.as_secs(), "scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();
                }
                changed = shutdown.changed() => {
                    match changed {
                        Ok(()) if !*shutdown.borrow() => continue,
                        _ => break,
                    }
                }
            }
        }

        // Let any in-flight cycle finish before reporting the loop stopped
        let _ = self.guard.lock().await;
        info!("scheduler stopped");
    }

    /// Start one cycle if none is running; skip the tick otherwise
    fn tick(&self) {
        let Ok(guard) = self.guard.clone().try_lock_owned() else {
            warn!("previous daily balance cycle still running, skipping this tick");
            return;
        };

        let balance_service = Arc::clone(&self.balance_service);
        tokio::spawn(async move {
            // Guard is held for the duration of the cycle, success or error
            let _guard = guard;
            let today = Utc::now().date_naive();
            match balance_service.process(today).await {
                Ok(balance) => {
                    info!(
                        date = %balance.balance_date,
                        final_balance = %balance.final_balance,
                        "scheduled daily balance cycle finished"
                    );
                }
                Err(e) => {
                    // The loop must survive any cycle failure
                    error!(error = %e, "scheduled daily balance cycle failed");
                }
            }
        });
    }
}
