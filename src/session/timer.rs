// src/session/timer.rs

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use chrono::Utc;
use tokio::{
    task::JoinHandle,
    time::{Instant, interval_at},
};

use super::{
    attempt::Tick,
    service::{ActiveAttempt, persist_finish},
};
use crate::repositories::ResultStore;

/// Owns a running countdown task. Dropping the handle stops the task.
#[derive(Debug)]
pub struct CountdownHandle {
    handle: JoinHandle<()>,
}

impl CountdownHandle {
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Ticks a timed attempt once per `period` until it finishes.
///
/// The task only holds a weak reference: once the attempt is dropped from
/// the registry the next tick finds nothing to upgrade and the task exits.
/// On expiry the result is persisted here, exactly like a manual finish.
pub(crate) fn spawn_countdown(
    active: Weak<ActiveAttempt>,
    results: Arc<dyn ResultStore>,
    period: Duration,
) -> CountdownHandle {
    let handle = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);

        loop {
            ticker.tick().await;

            let Some(active) = active.upgrade() else {
                tracing::debug!("Countdown stopped: attempt discarded");
                break;
            };

            let mut attempt = active.attempt.lock().await;
            match attempt.tick(Utc::now()) {
                Tick::Running(_) => {}
                Tick::Expired(finish) => {
                    tracing::info!("Attempt {} ran out of time", attempt.id());
                    persist_finish(results.as_ref(), &mut attempt, finish).await;
                    break;
                }
                Tick::Inactive => break,
            }
        }
    });

    CountdownHandle { handle }
}
