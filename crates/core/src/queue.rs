// Playback queue (media list).
// One mutex guards the whole sequence; readers get closures or snapshots so
// nothing borrowed from the queue outlives the lock. Engine calls never run
// while the lock is held, and events are raised after it is released.

use crate::bridge::EventBridge;
use crate::engine::MediaEngine;
use crate::error::{Result, SessionError};
use crate::events::EventRecord;
use crate::media::MediaRef;
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;

pub struct PlaybackQueue {
    items: Mutex<Vec<MediaRef>>,
    bridge: Arc<EventBridge>,
}

fn added(media: &MediaRef, index: usize) -> EventRecord {
    EventRecord::QueueItemAdded {
        uri: media.mrl().to_string(),
        index,
    }
}

fn removed(media: &MediaRef, index: usize) -> EventRecord {
    EventRecord::QueueItemRemoved {
        uri: media.mrl().to_string(),
        index,
    }
}

impl PlaybackQueue {
    pub fn new(bridge: Arc<EventBridge>) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            bridge,
        }
    }

    fn emit(&self, events: Vec<EventRecord>) {
        for event in events {
            self.bridge.deliver(event);
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Media at `index`; the lock is held only for the lookup
    pub fn get(&self, index: usize) -> Result<MediaRef> {
        let items = self.items.lock();
        items
            .get(index)
            .cloned()
            .ok_or(SessionError::InvalidIndex {
                index,
                len: items.len(),
            })
    }

    /// Insert at `at` in `[0, len]`; `len` appends
    pub fn insert(&self, media: MediaRef, at: usize) -> Result<()> {
        let event = {
            let mut items = self.items.lock();
            if at > items.len() {
                return Err(SessionError::InvalidIndex {
                    index: at,
                    len: items.len(),
                });
            }
            let event = added(&media, at);
            items.insert(at, media);
            event
        };
        self.emit(vec![event]);
        Ok(())
    }

    /// Append and return the new index
    pub fn append(&self, media: MediaRef) -> usize {
        let (index, event) = {
            let mut items = self.items.lock();
            let index = items.len();
            let event = added(&media, index);
            items.push(media);
            (index, event)
        };
        self.emit(vec![event]);
        index
    }

    /// Remove and return the media at `index`; later items shift down
    pub fn remove_at(&self, index: usize) -> Result<MediaRef> {
        let (media, event) = {
            let mut items = self.items.lock();
            if index >= items.len() {
                return Err(SessionError::InvalidIndex {
                    index,
                    len: items.len(),
                });
            }
            let media = items.remove(index);
            let event = removed(&media, index);
            (media, event)
        };
        self.emit(vec![event]);
        Ok(media)
    }

    /// First position holding this exact item
    pub fn index_of(&self, media: &MediaRef) -> Option<usize> {
        self.items.lock().iter().position(|m| m == media)
    }

    /// Replace the item at `index` with its sub-items, in order.
    ///
    /// Returns the number of sub-items; zero means the item is not expandable
    /// and nothing changed. Sub-items go in at `index + 1`, last one first,
    /// then the container slot is removed, so the run ends up at
    /// `[index, index + K)`.
    pub fn expand(&self, index: usize, engine: &dyn MediaEngine) -> Result<usize> {
        let container = self.get(index)?;
        let sub_items = engine.sub_items(&container);
        if sub_items.is_empty() {
            debug!("Item {} has no sub-items", index);
            return Ok(0);
        }
        debug!("Found {} subitems, expanding", sub_items.len());

        let events = {
            let mut items = self.items.lock();
            // The queue may have moved while the engine was listing sub-items
            let Some(position) = items.iter().position(|m| *m == container) else {
                warn!("Item to expand was removed concurrently");
                return Ok(0);
            };

            let mut events = Vec::with_capacity(sub_items.len() + 1);
            for sub in sub_items.iter().rev() {
                events.push(added(sub, position + 1));
                items.insert(position + 1, sub.clone());
            }
            let container = items.remove(position);
            events.push(removed(&container, position));
            events
        };
        self.emit(events);
        Ok(sub_items.len())
    }

    /// Snapshot of every item's location
    pub fn mrls(&self) -> Vec<String> {
        self.items
            .lock()
            .iter()
            .map(|m| m.mrl().to_string())
            .collect()
    }

    /// Run `f` over the items with the lock held. `f` must not call back into
    /// the queue or issue engine commands.
    pub fn with_items<R>(&self, f: impl FnOnce(&[MediaRef]) -> R) -> R {
        let items = self.items.lock();
        f(&items)
    }

    /// Remove everything, raising one removal per item (highest index first)
    pub fn clear(&self) {
        let events: Vec<_> = {
            let mut items = self.items.lock();
            let drained: Vec<_> = items.drain(..).collect();
            drained
                .iter()
                .enumerate()
                .rev()
                .map(|(i, m)| removed(m, i))
                .collect()
        };
        self.emit(events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::TestObserver;
    use crate::testing::MockEngine;

    fn queue_with_observer() -> (PlaybackQueue, Arc<TestObserver>) {
        let bridge = Arc::new(EventBridge::in_process());
        let observer = Arc::new(TestObserver::new());
        bridge.set_observer(observer.clone());
        (PlaybackQueue::new(bridge), observer)
    }

    fn media(name: &str) -> MediaRef {
        MediaRef::new(format!("file:///{}", name), Vec::new())
    }

    #[test]
    fn test_insert_bounds() {
        let (queue, _) = queue_with_observer();
        queue.insert(media("a"), 0).unwrap();
        queue.insert(media("c"), 1).unwrap();
        queue.insert(media("b"), 1).unwrap();
        assert_eq!(queue.mrls(), vec!["file:///a", "file:///b", "file:///c"]);

        let err = queue.insert(media("z"), 5).unwrap_err();
        assert_eq!(err, SessionError::InvalidIndex { index: 5, len: 3 });
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_insert_then_index_of_and_remove() {
        let (queue, _) = queue_with_observer();
        queue.append(media("a"));
        queue.append(media("b"));
        let before = queue.len();

        let item = media("x");
        queue.insert(item.clone(), 1).unwrap();
        assert_eq!(queue.index_of(&item), Some(1));

        let idx = queue.index_of(&item).unwrap();
        let gone = queue.remove_at(idx).unwrap();
        assert_eq!(gone, item);
        assert_eq!(queue.len(), before);
        assert_eq!(queue.index_of(&item), None);
    }

    #[test]
    fn test_remove_out_of_bounds() {
        let (queue, observer) = queue_with_observer();
        queue.append(media("a"));
        observer.clear();
        assert!(matches!(
            queue.remove_at(1),
            Err(SessionError::InvalidIndex { index: 1, len: 1 })
        ));
        assert_eq!(observer.count(), 0);
    }

    #[test]
    fn test_mutations_raise_events() {
        let (queue, observer) = queue_with_observer();
        assert_eq!(queue.append(media("a")), 0);
        queue.insert(media("b"), 0).unwrap();
        queue.remove_at(1).unwrap();

        assert_eq!(
            observer.get_events(),
            vec![
                EventRecord::QueueItemAdded {
                    uri: "file:///a".into(),
                    index: 0
                },
                EventRecord::QueueItemAdded {
                    uri: "file:///b".into(),
                    index: 0
                },
                EventRecord::QueueItemRemoved {
                    uri: "file:///a".into(),
                    index: 1
                },
            ]
        );
    }

    #[test]
    fn test_expand_places_sub_items_in_order() {
        let (queue, observer) = queue_with_observer();
        let engine = MockEngine::new();
        engine.set_sub_items(
            "file:///list.m3u",
            &["file:///one", "file:///two", "file:///three"],
        );

        queue.append(media("head"));
        queue.append(media("list.m3u"));
        queue.append(media("tail"));
        let len = queue.len();
        observer.clear();

        let k = queue.expand(1, &engine).unwrap();
        assert_eq!(k, 3);
        assert_eq!(queue.len(), len - 1 + k);
        assert_eq!(
            queue.mrls(),
            vec![
                "file:///head",
                "file:///one",
                "file:///two",
                "file:///three",
                "file:///tail"
            ]
        );

        let events = observer.get_events();
        let adds = events
            .iter()
            .filter(|e| matches!(e, EventRecord::QueueItemAdded { .. }))
            .count();
        let removes: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, EventRecord::QueueItemRemoved { .. }))
            .collect();
        assert_eq!(adds, 3);
        assert_eq!(
            removes,
            vec![&EventRecord::QueueItemRemoved {
                uri: "file:///list.m3u".into(),
                index: 1
            }]
        );
    }

    #[test]
    fn test_expand_atom_is_noop() {
        let (queue, observer) = queue_with_observer();
        let engine = MockEngine::new();
        queue.append(media("song.ogg"));
        observer.clear();

        assert_eq!(queue.expand(0, &engine).unwrap(), 0);
        assert_eq!(queue.mrls(), vec!["file:///song.ogg"]);
        assert_eq!(observer.count(), 0);
    }

    #[test]
    fn test_expand_invalid_index() {
        let (queue, _) = queue_with_observer();
        let engine = MockEngine::new();
        assert!(queue.expand(0, &engine).is_err());
    }

    #[test]
    fn test_clear_reports_every_item() {
        let (queue, observer) = queue_with_observer();
        queue.append(media("a"));
        queue.append(media("b"));
        observer.clear();
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(observer.count(), 2);
    }

    #[test]
    fn test_with_items_reads_under_lock() {
        let (queue, _) = queue_with_observer();
        queue.append(media("a"));
        queue.append(media("b"));
        let total: usize = queue.with_items(|items| items.iter().map(|m| m.mrl().len()).sum());
        assert_eq!(total, 18);
    }
}
