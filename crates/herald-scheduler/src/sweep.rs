use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use herald_channels::{DeliveryError, Gateway};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::{
    error::Result,
    recurrence::next_occurrence,
    store::EntryStore,
    types::{EntryPatch, Recurrence, ScheduledEntry},
};

/// Periodic due-sweep: query the store for due entries, deliver each through
/// the gateway, then delete one-shots and advance recurring entries.
///
/// All collaborators are injected; the engine owns no global state. Delivery
/// is at-least-once: a crash between a successful send and the follow-up
/// store mutation re-delivers that entry on the next sweep. That window is a
/// deliberate trade-off and is not closed with a transaction.
pub struct SweepEngine {
    store: EntryStore,
    gateway: Arc<dyn Gateway>,
    tick: Duration,
    send_timeout: Duration,
}

impl SweepEngine {
    pub fn new(
        store: EntryStore,
        gateway: Arc<dyn Gateway>,
        tick: Duration,
        send_timeout: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            tick,
            send_timeout,
        }
    }

    /// Main loop. Sweeps once per tick until `shutdown` broadcasts `true`.
    ///
    /// Sweeps run inline in the select arm and missed ticks are skipped, so
    /// two sweeps never run concurrently — an entry cannot be dispatched
    /// twice within one due window by overlapping ticks.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(tick_secs = self.tick.as_secs(), gateway = self.gateway.name(), "sweep engine started");

        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.sweep(Utc::now()).await {
                        // The due query itself failed; per-entry faults are
                        // handled inside sweep and never reach here.
                        error!("due-sweep query failed: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("sweep engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One check-and-dispatch cycle at `as_of`.
    ///
    /// Each due entry is dispatched independently: one entry's failure never
    /// blocks or rolls back another's delivery.
    pub async fn sweep(&self, as_of: DateTime<Utc>) -> Result<()> {
        let due = self.store.find_due(as_of)?;
        if due.is_empty() {
            return Ok(());
        }
        debug!(count = due.len(), "entries due");
        for entry in due {
            self.dispatch(entry).await;
        }
        Ok(())
    }

    /// Deliver one entry and advance or delete it.
    ///
    /// On any delivery failure the entry is left untouched so the next sweep
    /// retries it. Store failures after a successful send are logged and
    /// skipped the same way; the sweep task itself never dies for one entry.
    async fn dispatch(&self, entry: ScheduledEntry) {
        let sent = match tokio::time::timeout(
            self.send_timeout,
            self.gateway.send(&entry.channel_id, &entry.content),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout {
                ms: self.send_timeout.as_millis() as u64,
            }),
        };

        if let Err(e) = sent {
            warn!(entry_id = %entry.id, channel_id = %entry.channel_id, error = %e,
                  "delivery failed; entry left for retry on next sweep");
            return;
        }

        match entry.recurrence {
            Recurrence::Oneshot => match self.store.delete(&entry.id) {
                Ok(_) => info!(entry_id = %entry.id, "one-shot delivered and removed"),
                Err(e) => {
                    // Delivery already happened; the entry will fire again
                    // next sweep (at-least-once).
                    error!(entry_id = %entry.id, "failed to remove delivered one-shot: {e}");
                }
            },
            ref recurrence => {
                // Advance from the stored due time, not from now, so the
                // cadence anchor does not drift with sweep lag. A very short
                // custom interval may yield next <= now; that entry is simply
                // due again on the next sweep.
                match next_occurrence(entry.due_at, recurrence) {
                    Ok(next) => {
                        let patch = EntryPatch {
                            due_at: Some(next),
                            ..EntryPatch::default()
                        };
                        match self.store.update(&entry.id, patch) {
                            Ok(_) => info!(entry_id = %entry.id, next = %next.to_rfc3339(),
                                           "entry delivered and rescheduled"),
                            Err(e) => error!(entry_id = %entry.id,
                                             "failed to reschedule delivered entry: {e}"),
                        }
                    }
                    Err(e) => {
                        error!(entry_id = %entry.id, "cannot compute next occurrence: {e}");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewEntry;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Records every send; optionally fails all sends or one channel.
    struct MockGateway {
        sends: Mutex<Vec<(String, String)>>,
        fail_all: AtomicBool,
        fail_channel: Option<String>,
    }

    impl MockGateway {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sends: Mutex::new(Vec::new()),
                fail_all: AtomicBool::new(false),
                fail_channel: None,
            })
        }

        fn failing_channel(channel_id: &str) -> Arc<Self> {
            Arc::new(Self {
                sends: Mutex::new(Vec::new()),
                fail_all: AtomicBool::new(false),
                fail_channel: Some(channel_id.to_string()),
            })
        }

        fn sends(&self) -> Vec<(String, String)> {
            self.sends.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Gateway for MockGateway {
        fn name(&self) -> &str {
            "mock"
        }

        async fn send(&self, channel_id: &str, content: &str) -> std::result::Result<(), DeliveryError> {
            if self.fail_all.load(Ordering::SeqCst)
                || self.fail_channel.as_deref() == Some(channel_id)
            {
                return Err(DeliveryError::Transport("mock outage".to_string()));
            }
            self.sends
                .lock()
                .unwrap()
                .push((channel_id.to_string(), content.to_string()));
            Ok(())
        }
    }

    fn store() -> EntryStore {
        EntryStore::new(rusqlite::Connection::open_in_memory().unwrap()).unwrap()
    }

    fn engine(store: EntryStore, gateway: Arc<dyn Gateway>) -> SweepEngine {
        SweepEngine::new(
            store,
            gateway,
            Duration::from_secs(60),
            Duration::from_secs(5),
        )
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn entry(due_at: DateTime<Utc>, channel: &str, recurrence: Recurrence) -> NewEntry {
        NewEntry {
            due_at,
            content: "the message".to_string(),
            channel_id: channel.to_string(),
            recurrence,
            created_by: "ada".to_string(),
        }
    }

    #[tokio::test]
    async fn delivered_oneshot_is_deleted() {
        let store = store();
        let gateway = MockGateway::new();
        store
            .insert(entry(at(2024, 6, 1, 9, 0), "general", Recurrence::Oneshot))
            .unwrap();

        engine(store.clone(), gateway.clone())
            .sweep(at(2024, 6, 1, 9, 5))
            .await
            .unwrap();

        assert_eq!(gateway.sends(), vec![("general".to_string(), "the message".to_string())]);
        assert!(store.list_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delivered_daily_entry_is_advanced_one_day() {
        let store = store();
        let gateway = MockGateway::new();
        let inserted = store
            .insert(entry(at(2024, 6, 1, 9, 0), "general", Recurrence::Daily))
            .unwrap();

        engine(store.clone(), gateway.clone())
            .sweep(at(2024, 6, 1, 9, 5))
            .await
            .unwrap();

        assert_eq!(gateway.sends().len(), 1);
        let after = store.get(&inserted.id).unwrap();
        // Advanced from the stored due time, not from the sweep time.
        assert_eq!(after.due_at, at(2024, 6, 2, 9, 0));
    }

    #[tokio::test]
    async fn future_entries_are_not_dispatched() {
        let store = store();
        let gateway = MockGateway::new();
        store
            .insert(entry(at(2024, 6, 1, 9, 1), "general", Recurrence::Daily))
            .unwrap();

        engine(store.clone(), gateway.clone())
            .sweep(at(2024, 6, 1, 9, 0))
            .await
            .unwrap();

        assert!(gateway.sends().is_empty());
        assert_eq!(store.list_all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_delivery_leaves_entry_untouched_then_retries() {
        let store = store();
        let gateway = MockGateway::new();
        gateway.fail_all.store(true, Ordering::SeqCst);
        let inserted = store
            .insert(entry(at(2024, 6, 1, 9, 0), "general", Recurrence::Daily))
            .unwrap();

        let engine = engine(store.clone(), gateway.clone());
        engine.sweep(at(2024, 6, 1, 9, 5)).await.unwrap();

        // Untouched: same due time, still present, nothing sent.
        assert!(gateway.sends().is_empty());
        assert_eq!(store.get(&inserted.id).unwrap().due_at, at(2024, 6, 1, 9, 0));

        // Gateway recovers; the next sweep delivers and advances.
        gateway.fail_all.store(false, Ordering::SeqCst);
        engine.sweep(at(2024, 6, 1, 9, 6)).await.unwrap();
        assert_eq!(gateway.sends().len(), 1);
        assert_eq!(store.get(&inserted.id).unwrap().due_at, at(2024, 6, 2, 9, 0));
    }

    #[tokio::test]
    async fn one_failing_entry_does_not_block_the_rest() {
        let store = store();
        let gateway = MockGateway::failing_channel("broken");
        let failing = store
            .insert(entry(at(2024, 6, 1, 8, 0), "broken", Recurrence::Oneshot))
            .unwrap();
        let healthy = store
            .insert(entry(at(2024, 6, 1, 8, 30), "general", Recurrence::Oneshot))
            .unwrap();

        engine(store.clone(), gateway.clone())
            .sweep(at(2024, 6, 1, 9, 0))
            .await
            .unwrap();

        // The healthy entry was delivered and deleted even though the
        // earlier-due broken one failed.
        assert_eq!(gateway.sends(), vec![("general".to_string(), "the message".to_string())]);
        assert!(store.get(&failing.id).is_ok());
        assert!(matches!(
            store.get(&healthy.id),
            Err(crate::error::SchedulerError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn custom_entry_is_advanced_by_its_interval() {
        let store = store();
        let gateway = MockGateway::new();
        let inserted = store
            .insert(entry(
                at(2024, 6, 1, 9, 0),
                "general",
                Recurrence::Custom { minutes: 30 },
            ))
            .unwrap();

        engine(store.clone(), gateway.clone())
            .sweep(at(2024, 6, 1, 9, 5))
            .await
            .unwrap();

        assert_eq!(store.get(&inserted.id).unwrap().due_at, at(2024, 6, 1, 9, 30));
    }

    #[tokio::test]
    async fn short_custom_interval_is_due_again_on_the_next_sweep() {
        let store = store();
        let gateway = MockGateway::new();
        store
            .insert(entry(
                at(2024, 6, 1, 9, 0),
                "general",
                Recurrence::Custom { minutes: 1 },
            ))
            .unwrap();

        let engine = engine(store.clone(), gateway.clone());
        // next = 09:01, still <= the next sweep's as_of: back-to-back delivery.
        engine.sweep(at(2024, 6, 1, 9, 5)).await.unwrap();
        engine.sweep(at(2024, 6, 1, 9, 5)).await.unwrap();
        assert_eq!(gateway.sends().len(), 2);
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let store = store();
        let gateway = MockGateway::new();
        let engine = SweepEngine::new(
            store,
            gateway,
            Duration::from_millis(10),
            Duration::from_secs(1),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(engine.run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("engine did not stop after shutdown signal")
            .unwrap();
    }
}
