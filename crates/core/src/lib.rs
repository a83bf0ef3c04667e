// Core types and traits for the cadence media-session controller

pub mod bridge;
pub mod config;
pub mod context;
pub mod controller;
pub mod engine;
pub mod error;
pub mod events;
pub mod media;
pub mod probe;
pub mod queue;
pub mod session;
pub mod state;
pub mod surface;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use bridge::{EventBridge, EventObserver, ExecutionContext, InProcessContext};
pub use config::{AudioOutput, BridgeConfig, ControllerConfig, EngineConfig, ProbeConfig};
pub use context::MediaContext;
pub use controller::MediaController;
pub use engine::{
    AudioFormat, AudioSink, EngineEvent, EngineEventKind, EngineFactory, EngineHandle,
    EnginePlayer, EventSink, MediaEngine, SubscriptionId,
};
pub use error::{Result, SessionError};
pub use events::{EventPayload, EventRecord, PayloadValue, PlaybackKind};
pub use media::{MediaInfo, MediaMeta, MediaOptions, MediaRef, TrackDescription, TrackDetails, TrackInfo, TrackKind};
pub use state::{SessionState, SessionStateContainer};
pub use surface::{SurfaceBinding, SurfaceGuard, SurfaceHandle, SurfaceOwner};
