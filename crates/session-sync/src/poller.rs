//! Background poller
//!
//! One task per binding. It fetches on a fixed interval and exits once its
//! binding is gone or the session has finished. Dropping the handle aborts it.

use ledger_types::SessionId;
use std::{sync::Weak, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

use crate::synchronizer::SyncInner;

/// Owned handle to a running poller
pub(crate) struct PollerHandle {
    generation: u64,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Spawn a poller for `session_id` under `generation`. The first fetch
    /// happens one period from now.
    pub(crate) fn spawn(
        inner: Weak<SyncInner>,
        generation: u64,
        session_id: SessionId,
        period: Duration,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::debug!(
                "Poller started for {} every {}ms",
                session_id.short(),
                period.as_millis()
            );

            loop {
                ticker.tick().await;

                let Some(sync) = inner.upgrade() else {
                    break;
                };
                if !sync.should_poll(generation) {
                    break;
                }
                let result = sync.refresh(generation, session_id).await;
                tracing::trace!("Poll of {}: {:?}", session_id.short(), result);
            }

            tracing::debug!("Poller for {} stopped", session_id.short());
        });

        Self { generation, task }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
