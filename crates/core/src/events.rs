// Normalized event records and their key-value wire form

use crate::engine::EngineEvent;
use std::collections::BTreeMap;

/// Payload key for a position fraction or a vout count
pub const KEY_DATA: &str = "data";
/// Payload key for the location of an added/removed queue item
pub const KEY_ITEM_URI: &str = "item_uri";
/// Payload key for the index of an added/removed queue item
pub const KEY_ITEM_INDEX: &str = "item_index";

/// Event type codes understood by the client's event handler
pub mod codes {
    pub const PLAYING: i32 = 0x104;
    pub const PAUSED: i32 = 0x105;
    pub const STOPPED: i32 = 0x106;
    pub const END_REACHED: i32 = 0x109;
    pub const ENCOUNTERED_ERROR: i32 = 0x10a;
    pub const POSITION_CHANGED: i32 = 0x10c;
    pub const VOUT: i32 = 0x112;
    pub const ITEM_ADDED: i32 = 0x200;
    pub const ITEM_DELETED: i32 = 0x202;
}

/// Player state transitions reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackKind {
    Playing,
    Paused,
    Stopped,
    EndReached,
    EncounteredError,
}

impl PlaybackKind {
    pub fn code(&self) -> i32 {
        match self {
            PlaybackKind::Playing => codes::PLAYING,
            PlaybackKind::Paused => codes::PAUSED,
            PlaybackKind::Stopped => codes::STOPPED,
            PlaybackKind::EndReached => codes::END_REACHED,
            PlaybackKind::EncounteredError => codes::ENCOUNTERED_ERROR,
        }
    }
}

/// Closed set of occurrences delivered to the observer
#[derive(Debug, Clone, PartialEq)]
pub enum EventRecord {
    PositionChanged(f32),
    VoutCountChanged(i32),
    QueueItemAdded { uri: String, index: usize },
    QueueItemRemoved { uri: String, index: usize },
    PlayingStateChanged(PlaybackKind),
}

impl EventRecord {
    /// Normalize a player event. `LengthChanged` is internal to probing and
    /// has no record.
    pub fn from_engine(event: &EngineEvent) -> Option<Self> {
        let record = match event {
            EngineEvent::Playing => EventRecord::PlayingStateChanged(PlaybackKind::Playing),
            EngineEvent::Paused => EventRecord::PlayingStateChanged(PlaybackKind::Paused),
            EngineEvent::Stopped => EventRecord::PlayingStateChanged(PlaybackKind::Stopped),
            EngineEvent::EndReached => EventRecord::PlayingStateChanged(PlaybackKind::EndReached),
            EngineEvent::EncounteredError => {
                EventRecord::PlayingStateChanged(PlaybackKind::EncounteredError)
            }
            EngineEvent::PositionChanged(p) => EventRecord::PositionChanged(*p),
            EngineEvent::VoutChanged(n) => EventRecord::VoutCountChanged(*n),
            EngineEvent::LengthChanged(_) => return None,
        };
        Some(record)
    }

    pub fn event_type(&self) -> i32 {
        match self {
            EventRecord::PositionChanged(_) => codes::POSITION_CHANGED,
            EventRecord::VoutCountChanged(_) => codes::VOUT,
            EventRecord::QueueItemAdded { .. } => codes::ITEM_ADDED,
            EventRecord::QueueItemRemoved { .. } => codes::ITEM_DELETED,
            EventRecord::PlayingStateChanged(kind) => kind.code(),
        }
    }

    /// Key-value form handed to the observer
    pub fn to_payload(&self) -> EventPayload {
        let mut payload = EventPayload::new();
        match self {
            EventRecord::PositionChanged(p) => payload.put(KEY_DATA, PayloadValue::Float(*p)),
            EventRecord::VoutCountChanged(n) => payload.put(KEY_DATA, PayloadValue::Int(*n)),
            EventRecord::QueueItemAdded { uri, index }
            | EventRecord::QueueItemRemoved { uri, index } => {
                payload.put(KEY_ITEM_URI, PayloadValue::Str(uri.clone()));
                payload.put(KEY_ITEM_INDEX, PayloadValue::Int(*index as i32));
            }
            EventRecord::PlayingStateChanged(_) => {}
        }
        payload
    }

    /// Rebuild a record from its wire form, for observers written in Rust
    pub fn from_wire(event_type: i32, payload: &EventPayload) -> Option<Self> {
        let item = || -> Option<(String, usize)> {
            let uri = payload.get_str(KEY_ITEM_URI)?.to_string();
            let index = usize::try_from(payload.get_int(KEY_ITEM_INDEX)?).ok()?;
            Some((uri, index))
        };
        match event_type {
            codes::PLAYING => Some(EventRecord::PlayingStateChanged(PlaybackKind::Playing)),
            codes::PAUSED => Some(EventRecord::PlayingStateChanged(PlaybackKind::Paused)),
            codes::STOPPED => Some(EventRecord::PlayingStateChanged(PlaybackKind::Stopped)),
            codes::END_REACHED => Some(EventRecord::PlayingStateChanged(PlaybackKind::EndReached)),
            codes::ENCOUNTERED_ERROR => Some(EventRecord::PlayingStateChanged(
                PlaybackKind::EncounteredError,
            )),
            codes::POSITION_CHANGED => payload.get_float(KEY_DATA).map(EventRecord::PositionChanged),
            codes::VOUT => payload.get_int(KEY_DATA).map(EventRecord::VoutCountChanged),
            codes::ITEM_ADDED => item().map(|(uri, index)| EventRecord::QueueItemAdded { uri, index }),
            codes::ITEM_DELETED => {
                item().map(|(uri, index)| EventRecord::QueueItemRemoved { uri, index })
            }
            _ => None,
        }
    }
}

/// Loosely typed payload value
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    Int(i32),
    Float(f32),
    Str(String),
}

/// Key-value payload, the observer-facing shape of an `EventRecord`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPayload {
    entries: BTreeMap<&'static str, PayloadValue>,
}

impl EventPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: &'static str, value: PayloadValue) {
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.entries.get(key)
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.get(key)? {
            PayloadValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.get(key)? {
            PayloadValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            PayloadValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &PayloadValue)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_payload_fields() {
        let record = EventRecord::QueueItemRemoved {
            uri: "file:///list.m3u".to_string(),
            index: 3,
        };
        let payload = record.to_payload();
        assert_eq!(record.event_type(), codes::ITEM_DELETED);
        assert_eq!(payload.get_str(KEY_ITEM_URI), Some("file:///list.m3u"));
        assert_eq!(payload.get_int(KEY_ITEM_INDEX), Some(3));
        assert_eq!(
            EventRecord::from_wire(record.event_type(), &payload),
            Some(record)
        );
    }

    #[test]
    fn test_state_changes_carry_no_payload() {
        let record = EventRecord::from_engine(&EngineEvent::EndReached).unwrap();
        assert_eq!(record.event_type(), codes::END_REACHED);
        assert!(record.to_payload().is_empty());
    }

    #[test]
    fn test_length_changed_is_not_forwarded() {
        assert_eq!(EventRecord::from_engine(&EngineEvent::LengthChanged(1000)), None);
    }

    #[test]
    fn test_data_key_types() {
        let pos = EventRecord::from_engine(&EngineEvent::PositionChanged(0.25)).unwrap();
        assert_eq!(pos.to_payload().get_float(KEY_DATA), Some(0.25));
        let vout = EventRecord::from_engine(&EngineEvent::VoutChanged(2)).unwrap();
        assert_eq!(vout.to_payload().get_int(KEY_DATA), Some(2));
        // wrong type under the key is not coerced
        assert_eq!(vout.to_payload().get_float(KEY_DATA), None);
    }
}
