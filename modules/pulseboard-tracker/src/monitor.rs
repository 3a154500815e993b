use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::tracker::SuggestionTracker;

/// Drives the refresh reconciler on a fixed interval.
///
/// One tokio task owns the loop, so cycles are serialized by construction:
/// a new cycle cannot start while the previous one is still running.
/// `stop()` is non-preemptive: an in-flight cycle completes, no further
/// cycle is scheduled.
pub struct LeaderboardMonitor {
    tracker: Arc<SuggestionTracker>,
    interval: Duration,
    state: Mutex<Option<RunningPoll>>,
}

struct RunningPoll {
    handle: JoinHandle<()>,
    shutdown: Arc<Notify>,
}

impl LeaderboardMonitor {
    pub fn new(tracker: Arc<SuggestionTracker>, interval: Duration) -> Self {
        Self {
            tracker,
            interval,
            state: Mutex::new(None),
        }
    }

    /// Start polling: one cycle immediately, then one per interval.
    /// A no-op if the monitor is already running.
    pub fn start(&self) {
        let mut state = self.state.lock().expect("monitor state lock poisoned");

        if let Some(running) = state.as_ref() {
            if !running.handle.is_finished() {
                info!("Monitor is already running");
                return;
            }
        }

        info!(
            interval_secs = self.interval.as_secs(),
            "Starting leaderboard monitor"
        );

        let shutdown = Arc::new(Notify::new());
        let handle = tokio::spawn(poll_loop(
            self.tracker.clone(),
            self.interval,
            shutdown.clone(),
        ));

        *state = Some(RunningPoll { handle, shutdown });
    }

    /// Stop polling. Idempotent; an in-flight cycle is allowed to finish.
    pub fn stop(&self) {
        let running = self.state.lock().expect("monitor state lock poisoned").take();

        if let Some(running) = running {
            running.shutdown.notify_one();
            info!("Leaderboard monitor stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.state
            .lock()
            .expect("monitor state lock poisoned")
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }
}

async fn poll_loop(tracker: Arc<SuggestionTracker>, every: Duration, shutdown: Arc<Notify>) {
    let mut ticker = tokio::time::interval(every);
    // A cycle that overruns the interval delays the next tick instead of
    // bursting to catch up.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            _ = ticker.tick() => poll_once(&tracker).await,
        }
    }
}

/// One poll cycle. Nothing here may take the loop down: an unset tracked
/// post id is the normal untracked state, and a failed refresh is logged
/// and retried on the next tick.
async fn poll_once(tracker: &SuggestionTracker) {
    let tweet_id = match tracker.tracked_tweet_id().await {
        Ok(Some(id)) => id,
        Ok(None) => return,
        Err(e) => {
            warn!(error = %e, "Failed to read tracked post id");
            return;
        }
    };

    debug!(tweet_id = %tweet_id, "Polling suggestions");

    if let Err(e) = tracker.refresh().await {
        warn!(error = %e, "Monitor poll failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{make_reply, MemoryStore, MockFeed};
    use crate::tracker::SuggestionTracker;

    const INTERVAL: Duration = Duration::from_secs(60);

    fn monitor(feed: Arc<MockFeed>, store: Arc<MemoryStore>) -> LeaderboardMonitor {
        let tracker = Arc::new(SuggestionTracker::new(feed, store, 50, 100));
        LeaderboardMonitor::new(tracker, INTERVAL)
    }

    /// Yield until the spawned loop has had a chance to run its cycle.
    async fn settle() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }

    fn tracked_feed() -> MockFeed {
        MockFeed::new()
            .with_post("p1", 0)
            .with_replies("p1", vec![make_reply("r1", "bob", 1)])
    }

    #[tokio::test(start_paused = true)]
    async fn first_cycle_runs_immediately() {
        let store = Arc::new(MemoryStore::default());
        store.set_tracked("t1");
        let feed = Arc::new(tracked_feed());
        let m = monitor(feed.clone(), store);

        m.start();
        settle().await;

        assert_eq!(feed.post_calls(), 1);
        assert!(m.is_active());
        m.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_leaves_one_active_loop() {
        let store = Arc::new(MemoryStore::default());
        store.set_tracked("t1");
        let feed = Arc::new(tracked_feed());
        let m = monitor(feed.clone(), store);

        m.start();
        m.start();
        settle().await;
        assert_eq!(feed.post_calls(), 1);

        tokio::time::sleep(INTERVAL + Duration::from_millis(10)).await;
        settle().await;
        // One immediate cycle plus one interval cycle, not doubled.
        assert_eq!(feed.post_calls(), 2);
        m.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn untracked_state_skips_cycles() {
        let store = Arc::new(MemoryStore::default());
        let feed = Arc::new(tracked_feed());
        let m = monitor(feed.clone(), store);

        m.start();
        settle().await;
        tokio::time::sleep(INTERVAL * 2).await;
        settle().await;

        assert_eq!(feed.post_calls(), 0);
        assert!(m.is_active());
        m.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn failing_cycle_does_not_kill_the_loop() {
        let store = Arc::new(MemoryStore::default());
        store.set_tracked("t1");
        let feed = Arc::new(MockFeed::new().fail_posts());
        let m = monitor(feed.clone(), store);

        m.start();
        settle().await;
        tokio::time::sleep(INTERVAL + Duration::from_millis(10)).await;
        settle().await;

        assert_eq!(feed.post_calls(), 2);
        assert!(m.is_active());
        m.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_future_cycles() {
        let store = Arc::new(MemoryStore::default());
        store.set_tracked("t1");
        let feed = Arc::new(tracked_feed());
        let m = monitor(feed.clone(), store);

        m.start();
        settle().await;
        assert_eq!(feed.post_calls(), 1);

        m.stop();
        m.stop(); // idempotent
        assert!(!m.is_active());

        tokio::time::sleep(INTERVAL * 3).await;
        settle().await;
        assert_eq!(feed.post_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_after_stop_resumes_polling() {
        let store = Arc::new(MemoryStore::default());
        store.set_tracked("t1");
        let feed = Arc::new(tracked_feed());
        let m = monitor(feed.clone(), store);

        m.start();
        settle().await;
        m.stop();

        m.start();
        settle().await;
        assert_eq!(feed.post_calls(), 2);
        m.stop();
    }
}
