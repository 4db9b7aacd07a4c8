//! Shared handle around a single [`Outline`]
//!
//! Every call takes the lock for the whole operation, so operations never interleave.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use super::{Outline, OutlineError};
use crate::config::OutlineConfig;
use crate::events::EventRecord;
use crate::models::{ItemId, ItemRecord};
use crate::operation::{Dispatched, Operation};
use crate::popup::ActiveEditor;

/// Capacity of the live event fan-out
const EVENT_CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct Core {
    inner: Arc<Mutex<Outline>>,
    events_tx: broadcast::Sender<EventRecord>,
}

impl Core {
    pub fn new(mut outline: Outline) -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        outline.attach_events(tx.clone());

        Self {
            inner: Arc::new(Mutex::new(outline)),
            events_tx: tx,
        }
    }

    // Runs `f` with the outline locked, recovering from a poisoned lock
    fn with_outline<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Outline) -> R,
    {
        let mut outline = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut outline)
    }

    pub fn dispatch(&self, op: Operation) -> Result<Dispatched, OutlineError> {
        self.with_outline(|outline| outline.dispatch_recorded(op))
    }

    pub fn records(&self) -> Vec<ItemRecord> {
        self.with_outline(|outline| outline.records())
    }

    pub fn record(&self, id: &ItemId) -> Option<ItemRecord> {
        self.with_outline(|outline| outline.record(id))
    }

    pub fn config(&self) -> OutlineConfig {
        self.with_outline(|outline| outline.config().clone())
    }

    pub fn active_editor(&self) -> Option<ActiveEditor> {
        self.with_outline(|outline| outline.active_editor().cloned())
    }

    pub fn last_seq(&self) -> u64 {
        self.with_outline(|outline| outline.events().last_seq())
    }

    pub fn events_since(&self, seq: u64) -> Vec<EventRecord> {
        self.with_outline(|outline| outline.events_since(seq))
    }

    /// Live feed of events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemSeed;
    use crate::outline::Outcome;

    fn core() -> Core {
        Core::new(
            Outline::with_seed(OutlineConfig::default(), 5)
                .with_items(vec![ItemSeed::new("a").with_id("a")]),
        )
    }

    #[tokio::test]
    async fn test_subscribers_see_dispatched_events() {
        let core = core();
        let mut rx = core.subscribe();
        let dispatched = core
            .dispatch(Operation::TogglePriority {
                id: ItemId::from("a"),
            })
            .unwrap();
        assert!(matches!(dispatched.outcome, Outcome::Applied(_)));

        let record = rx.recv().await.unwrap();
        assert_eq!(record.event.name(), "item:priority");
        assert_eq!(core.last_seq(), record.seq);
        assert_eq!(core.events_since(0), vec![record]);
    }

    #[test]
    fn test_clones_share_state() {
        let core = core();
        let other = core.clone();
        other
            .dispatch(Operation::Add {
                text: "b".to_string(),
                parent: None,
            })
            .unwrap();
        assert_eq!(core.records().len(), 2);
        assert!(core.record(&ItemId::from("a")).is_some());
    }
}
