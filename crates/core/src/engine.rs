// Engine boundary: the capabilities the controller consumes from the
// external playback engine. Nothing here decodes or renders.

use crate::config::EngineConfig;
use crate::error::{Result, SessionError};
use crate::media::{MediaInfo, MediaRef, TrackDescription};
use log::{debug, info};
use parking_lot::Mutex;
use std::sync::Arc;

/// Event types a player's event manager can be subscribed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineEventKind {
    Playing,
    Paused,
    Stopped,
    EndReached,
    EncounteredError,
    PositionChanged,
    VoutChanged,
    LengthChanged,
}

/// Event raised by the engine on one of its own threads
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Playing,
    Paused,
    Stopped,
    EndReached,
    EncounteredError,
    PositionChanged(f32),
    VoutChanged(i32),
    LengthChanged(i64),
}

impl EngineEvent {
    pub fn kind(&self) -> EngineEventKind {
        match self {
            EngineEvent::Playing => EngineEventKind::Playing,
            EngineEvent::Paused => EngineEventKind::Paused,
            EngineEvent::Stopped => EngineEventKind::Stopped,
            EngineEvent::EndReached => EngineEventKind::EndReached,
            EngineEvent::EncounteredError => EngineEventKind::EncounteredError,
            EngineEvent::PositionChanged(_) => EngineEventKind::PositionChanged,
            EngineEvent::VoutChanged(_) => EngineEventKind::VoutChanged,
            EngineEvent::LengthChanged(_) => EngineEventKind::LengthChanged,
        }
    }
}

/// Callback attached to an engine event manager.
/// Runs on engine threads; must not block.
pub type EventSink = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

/// Token returned by `subscribe`, needed to detach again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// PCM format negotiated with a software audio sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u32,
}

/// Client-side audio output, used when the engine hands decoded samples back
/// instead of driving the device itself
pub trait AudioSink: Send + Sync {
    /// Negotiate the output format; the sink may adjust rate and channels
    fn open(&self, format: &mut AudioFormat) -> Result<()>;

    /// Queue interleaved samples
    fn play(&self, samples: &[u8], count: u32, pts: i64);

    fn pause(&self, pts: i64);

    fn close(&self);
}

/// One engine player instance.
/// Released exactly once through `release`, which consumes the handle.
pub trait EnginePlayer: Send {
    /// Bind a media; the player keeps its own reference
    fn set_media(&mut self, media: &MediaRef);

    fn play(&mut self);

    fn pause(&mut self);

    fn stop(&mut self);

    /// Release the engine player. The handle is gone afterwards.
    fn release(self: Box<Self>);

    /// Attach a callback to one event type
    fn subscribe(&mut self, kind: EngineEventKind, sink: EventSink) -> SubscriptionId;

    fn unsubscribe(&mut self, id: SubscriptionId);

    /// Route decoded audio through a client sink instead of the device
    fn set_audio_sink(&mut self, sink: Arc<dyn AudioSink>);

    fn is_playing(&self) -> bool;

    fn is_seekable(&self) -> bool;

    /// False once the engine has given up on the current media
    fn will_play(&self) -> bool;

    /// Current time in milliseconds
    fn time(&self) -> i64;

    fn set_time(&mut self, time_ms: i64);

    /// Current position as a fraction of the length
    fn position(&self) -> f32;

    fn set_position(&mut self, position: f32);

    /// Length in milliseconds
    fn length(&self) -> i64;

    fn rate(&self) -> f32;

    fn set_rate(&mut self, rate: f32);

    fn volume(&self) -> i32;

    fn set_volume(&mut self, volume: i32) -> Result<()>;

    fn audio_track_count(&self) -> i32;

    /// Selectable audio tracks, including the leading "disable" entry
    fn audio_track_descriptions(&self) -> Vec<TrackDescription>;

    fn audio_track(&self) -> i32;

    fn set_audio_track(&mut self, id: i32) -> Result<()>;

    fn video_track_count(&self) -> i32;

    fn spu_count(&self) -> i32;

    fn spu_descriptions(&self) -> Vec<TrackDescription>;

    fn spu_track(&self) -> i32;

    fn set_spu_track(&mut self, id: i32) -> Result<()>;

    fn add_subtitle_file(&mut self, path: &str) -> Result<()>;
}

/// The external engine instance
pub trait MediaEngine: Send + Sync {
    /// Open a location with engine option strings; `None` if the engine refuses
    fn open(&self, location: &str, options: &[String]) -> Option<MediaRef>;

    /// Sub-items of a container media (e.g. a playlist file); empty for atoms
    fn sub_items(&self, media: &MediaRef) -> Vec<MediaRef>;

    /// Parse streams and metadata
    fn parse(&self, media: &MediaRef) -> MediaInfo;

    /// New player; `None` if the engine refuses
    fn create_player(&self) -> Option<Box<dyn EnginePlayer>>;

    fn version(&self) -> String;

    fn compiler(&self) -> String;

    fn changeset(&self) -> String;

    /// Tear down the engine instance
    fn release(&self);
}

/// Builds an engine instance from the client configuration
pub trait EngineFactory: Send + Sync {
    fn create(&self, config: &EngineConfig) -> Option<Arc<dyn MediaEngine>>;
}

impl<F> EngineFactory for F
where
    F: Fn(&EngineConfig) -> Option<Arc<dyn MediaEngine>> + Send + Sync,
{
    fn create(&self, config: &EngineConfig) -> Option<Arc<dyn MediaEngine>> {
        self(config)
    }
}

/// Process-scoped engine instance with explicit teardown
pub struct EngineHandle {
    engine: Mutex<Option<Arc<dyn MediaEngine>>>,
}

impl EngineHandle {
    /// Create the engine; fatal to the caller if the engine refuses
    pub fn init(factory: &dyn EngineFactory, config: &EngineConfig) -> Result<Self> {
        let engine = factory.create(config).ok_or_else(|| {
            SessionError::EngineInit("Unable to instantiate engine".to_string())
        })?;
        info!("Engine initialized: {}", engine.version());
        Ok(Self::from_engine(engine))
    }

    pub fn from_engine(engine: Arc<dyn MediaEngine>) -> Self {
        Self {
            engine: Mutex::new(Some(engine)),
        }
    }

    /// Live engine, or `None` after teardown
    pub fn get(&self) -> Option<Arc<dyn MediaEngine>> {
        self.engine.lock().clone()
    }

    pub fn require(&self) -> Result<Arc<dyn MediaEngine>> {
        self.get()
            .ok_or_else(|| SessionError::EngineInit("Engine already destroyed".to_string()))
    }

    pub fn is_alive(&self) -> bool {
        self.engine.lock().is_some()
    }

    /// Release the engine; later calls are no-ops
    pub fn teardown(&self) {
        let engine = self.engine.lock().take();
        match engine {
            Some(engine) => {
                engine.release();
                info!("Engine released");
            }
            None => debug!("Engine already released"),
        }
    }
}
