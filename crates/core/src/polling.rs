//! Background refresh of the disruption and incident lists.

use std::{sync::Arc, time::Duration};

use api_types::{DisruptionPayload, IncidentPayload};
use chrono::{DateTime, Utc};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, warn};

use crate::{client::ConsoleClient, error::ConsoleFuture, store::Store};

/// Source of the list views
pub trait DisruptionFeed: Send + Sync {
    fn fetch_disruptions(&self) -> ConsoleFuture<'_, Vec<DisruptionPayload>>;
    fn fetch_incidents(&self) -> ConsoleFuture<'_, Vec<IncidentPayload>>;
}

impl DisruptionFeed for ConsoleClient {
    fn fetch_disruptions(&self) -> ConsoleFuture<'_, Vec<DisruptionPayload>> {
        Box::pin(self.disruptions())
    }

    fn fetch_incidents(&self) -> ConsoleFuture<'_, Vec<IncidentPayload>> {
        Box::pin(self.incidents())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisruptionListState {
    pub disruptions: Vec<DisruptionPayload>,
    pub incidents: Vec<IncidentPayload>,
    /// Banner text of the latest failed poll, cleared by the next success
    pub last_error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub polls: u64,
}

/// Fetches both lists once and publishes the result. A failure keeps the
/// lists already shown.
pub async fn poll_once(feed: &dyn DisruptionFeed, store: &Store<DisruptionListState>) {
    match tokio::try_join!(feed.fetch_disruptions(), feed.fetch_incidents()) {
        Ok((disruptions, incidents)) => {
            debug!(disruptions = disruptions.len(), incidents = incidents.len(), "Refreshed disruption lists");
            store.dispatch(|state| DisruptionListState {
                disruptions,
                incidents,
                last_error: None,
                last_updated: Some(Utc::now()),
                polls: state.polls + 1,
            });
        }
        Err(e) => {
            warn!("Refreshing disruption lists failed: {e}");
            store.dispatch(|state| DisruptionListState {
                last_error: Some(e.user_message()),
                polls: state.polls + 1,
                ..state.clone()
            });
        }
    }
}

/// Polls a feed on a fixed interval while the list view is visible.
///
/// Becoming visible polls straight away. The task stops when the poller is
/// dropped.
pub struct DisruptionPoller {
    visible: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DisruptionPoller {
    pub fn spawn(
        feed: Arc<dyn DisruptionFeed>,
        store: Arc<Store<DisruptionListState>>,
        interval: Duration,
    ) -> Self {
        let (visible, mut visible_rx) = watch::channel(true);

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                if !*visible_rx.borrow_and_update() {
                    if visible_rx.changed().await.is_err() {
                        break;
                    }
                    ticker.reset_immediately();
                    continue;
                }

                tokio::select! {
                    _ = ticker.tick() => poll_once(feed.as_ref(), &store).await,
                    changed = visible_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self { visible, task }
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.send_replace(visible);
    }

    pub fn is_visible(&self) -> bool {
        *self.visible.borrow()
    }
}

impl Drop for DisruptionPoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;
    use crate::error::ConsoleError;

    #[derive(Default)]
    struct MockFeed {
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    fn disruption(id: u64) -> DisruptionPayload {
        serde_json::from_value(serde_json::json!({
            "disruptionId": id,
            "impact": "DELAYS",
            "cause": "CONGESTION",
            "disruptionType": "Routes",
            "startTime": "2026-10-19T07:00:00Z",
            "header": "Delays on the Inner Link"
        }))
        .unwrap()
    }

    impl DisruptionFeed for MockFeed {
        fn fetch_disruptions(&self) -> ConsoleFuture<'_, Vec<DisruptionPayload>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as u64;
            let failing = self.failing.load(Ordering::SeqCst);
            Box::pin(async move {
                if failing {
                    return Err(ConsoleError::Api {
                        status: 502,
                        endpoint: "/disruption".into(),
                        message: String::new(),
                    });
                }
                Ok(vec![disruption(call)])
            })
        }

        fn fetch_incidents(&self) -> ConsoleFuture<'_, Vec<IncidentPayload>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    fn setup() -> (Arc<MockFeed>, Arc<Store<DisruptionListState>>) {
        (Arc::new(MockFeed::default()), Arc::new(Store::default()))
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_previous_list() {
        let (feed, store) = setup();

        poll_once(feed.as_ref(), &store).await;
        let first = store.snapshot();
        assert_eq!(first.disruptions.len(), 1);
        assert!(first.last_updated.is_some());

        feed.failing.store(true, Ordering::SeqCst);
        poll_once(feed.as_ref(), &store).await;
        let second = store.snapshot();
        assert_eq!(second.disruptions, first.disruptions);
        assert_eq!(second.last_updated, first.last_updated);
        assert!(second.last_error.as_deref().unwrap().contains("502"));
        assert_eq!(second.polls, 2);

        feed.failing.store(false, Ordering::SeqCst);
        poll_once(feed.as_ref(), &store).await;
        assert!(store.snapshot().last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_interval_while_visible() {
        let (feed, store) = setup();
        let poller = DisruptionPoller::spawn(feed.clone(), store.clone(), Duration::from_secs(30));

        time::sleep(Duration::from_millis(1)).await;
        assert_eq!(store.snapshot().polls, 1);

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(store.snapshot().polls, 2);

        poller.set_visible(false);
        assert!(!poller.is_visible());
        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(store.snapshot().polls, 2);

        // Showing the list refreshes it immediately
        poller.set_visible(true);
        time::sleep(Duration::from_millis(1)).await;
        assert_eq!(store.snapshot().polls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_the_poller_stops_it() {
        let (feed, store) = setup();
        let poller = DisruptionPoller::spawn(feed.clone(), store.clone(), Duration::from_secs(30));

        time::sleep(Duration::from_millis(1)).await;
        drop(poller);
        time::sleep(Duration::from_secs(300)).await;
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_each_refresh() {
        let (feed, store) = setup();
        let mut rx = store.subscribe();
        let _poller = DisruptionPoller::spawn(feed, store, Duration::from_secs(30));

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().disruptions[0].disruption_id, Some(api_types::DisruptionId(0)));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().polls, 2);
    }
}
