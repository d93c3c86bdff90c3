//! Learn-mode sink: "what did I just press?"
//!
//! Keeps only the most recent event. Writers never block and readers never
//! see a torn event. Subscribers of the broadcast channel get a live feed
//! for as long as they keep up.

use arc_swap::ArcSwapOption;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

use super::normalize::CanonicalEvent;

/// Capacity of the live learn-event feed
const FEED_CAPACITY: usize = 64;

pub struct LearnSink {
    last: ArcSwapOption<CanonicalEvent>,
    feed: broadcast::Sender<CanonicalEvent>,
}

impl LearnSink {
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            last: ArcSwapOption::empty(),
            feed,
        }
    }

    /// Overwrite the last-seen event and publish it to subscribers
    pub fn observe(&self, event: CanonicalEvent) {
        self.last.store(Some(Arc::new(event)));
        // No subscribers is the normal case.
        if self.feed.send(event).is_err() {
            trace!("learn feed has no subscribers");
        }
    }

    pub fn last(&self) -> Option<CanonicalEvent> {
        self.last.load().as_deref().copied()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CanonicalEvent> {
        self.feed.subscribe()
    }
}

impl Default for LearnSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_until_first_event() {
        let sink = LearnSink::new();
        assert_eq!(sink.last(), None);
    }

    #[test]
    fn test_keeps_only_latest() {
        let sink = LearnSink::new();
        sink.observe(CanonicalEvent::new(1, 7, true, 10, 100));
        sink.observe(CanonicalEvent::new(1, 36, false, 127, 200));

        let last = sink.last().unwrap();
        assert_eq!(last.key(), (1, 36, false));
        assert_eq!(last.timestamp, 200);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let sink = LearnSink::new();
        let mut rx = sink.subscribe();

        let event = CanonicalEvent::new(2, 5, true, 64, 1);
        sink.observe(event);

        assert_eq!(rx.recv().await.unwrap(), event);
    }
}
