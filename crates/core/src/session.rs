// One engine player bound to one queue position

use crate::bridge::EventBridge;
use crate::config::AudioOutput;
use crate::engine::{
    AudioSink, EngineEvent, EngineEventKind, EnginePlayer, EventSink, MediaEngine, SubscriptionId,
};
use crate::error::{Result, SessionError};
use crate::media::MediaRef;
use crate::state::{SessionState, SessionStateContainer};
use log::{debug, info, warn};
use std::sync::Arc;

/// Player events every session forwards to the bridge
pub const SESSION_EVENTS: [EngineEventKind; 7] = [
    EngineEventKind::Playing,
    EngineEventKind::Paused,
    EngineEventKind::Stopped,
    EngineEventKind::EndReached,
    EngineEventKind::VoutChanged,
    EngineEventKind::PositionChanged,
    EngineEventKind::EncounteredError,
];

/// Everything a session needs from its controller
pub struct SessionParams<'a> {
    pub engine: &'a dyn MediaEngine,
    pub bridge: Arc<EventBridge>,
    pub state: SessionStateContainer,
    pub audio_output: AudioOutput,
    pub audio_sink: Option<Arc<dyn AudioSink>>,
}

pub struct PlayerSession {
    player: Box<dyn EnginePlayer>,
    index: usize,
    media: MediaRef,
    subscriptions: Vec<SubscriptionId>,
    generation: u64,
    state: SessionStateContainer,
}

impl PlayerSession {
    /// Create a player for `media`, wire its events, bind and start playback.
    ///
    /// On failure nothing is left live and the state is `Error`.
    pub fn create(params: SessionParams<'_>, media: MediaRef, index: usize) -> Result<Self> {
        let SessionParams {
            engine,
            bridge,
            state,
            audio_output,
            audio_sink,
        } = params;

        let generation = state.begin();
        let Some(mut player) = engine.create_player() else {
            state.set_state(SessionState::Error);
            return Err(SessionError::PlayerCreation(media.mrl().to_string()));
        };

        if audio_output.is_software_mixed() {
            match audio_sink {
                Some(sink) => player.set_audio_sink(sink),
                None => warn!("Software audio output selected but no audio sink installed"),
            }
        }

        let sink: EventSink = {
            let state = state.clone();
            Arc::new(move |event: &EngineEvent| {
                state.apply_event(generation, event);
                bridge.forward(event);
            })
        };
        let subscriptions = SESSION_EVENTS
            .iter()
            .map(|kind| player.subscribe(*kind, sink.clone()))
            .collect();

        player.set_media(&media);
        player.play();
        state.transition_from(generation, SessionState::Creating, SessionState::Playing);
        info!("Session {} playing index {}: {}", generation, index, media.mrl());

        Ok(Self {
            player,
            index,
            media,
            subscriptions,
            generation,
            state,
        })
    }

    /// Stop, detach every subscription and release the player
    pub fn teardown(self) {
        let Self {
            mut player,
            index,
            subscriptions,
            generation,
            state,
            ..
        } = self;

        state.transition(generation, SessionState::Stopping);
        player.stop();
        for id in subscriptions {
            player.unsubscribe(id);
        }
        player.release();
        state.transition(generation, SessionState::Absent);
        debug!("Session {} at index {} released", generation, index);
    }

    pub fn media(&self) -> &MediaRef {
        &self.media
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn state(&self) -> SessionState {
        self.state.get_state()
    }

    /// Replay the bound media on the same player
    pub fn play(&mut self) {
        self.player.play();
    }

    pub fn pause(&mut self) {
        self.player.pause();
    }

    pub fn player_mut(&mut self) -> &mut dyn EnginePlayer {
        self.player.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::TestObserver;
    use crate::events::{EventRecord, PlaybackKind};
    use crate::testing::MockEngine;
    use std::sync::atomic::Ordering;

    struct NullSink;

    impl AudioSink for NullSink {
        fn open(&self, _format: &mut crate::engine::AudioFormat) -> Result<()> {
            Ok(())
        }
        fn play(&self, _samples: &[u8], _count: u32, _pts: i64) {}
        fn pause(&self, _pts: i64) {}
        fn close(&self) {}
    }

    fn params<'a>(
        engine: &'a MockEngine,
        bridge: &Arc<EventBridge>,
        state: &SessionStateContainer,
        audio_output: AudioOutput,
    ) -> SessionParams<'a> {
        SessionParams {
            engine,
            bridge: bridge.clone(),
            state: state.clone(),
            audio_output,
            audio_sink: Some(Arc::new(NullSink)),
        }
    }

    #[test]
    fn test_create_subscribes_binds_and_plays() {
        let engine = MockEngine::new();
        let bridge = Arc::new(EventBridge::in_process());
        let observer = Arc::new(TestObserver::new());
        bridge.set_observer(observer.clone());
        let state = SessionStateContainer::new();

        let media = MediaRef::new("file:///a.mkv", Vec::new());
        let session = PlayerSession::create(
            params(&engine, &bridge, &state, AudioOutput::AudioTrack),
            media.clone(),
            0,
        )
        .unwrap();

        let player = engine.current_player().unwrap();
        assert_eq!(player.subscription_count(), 7);
        assert_eq!(player.media_mrl().as_deref(), Some("file:///a.mkv"));
        assert!(player.playing.load(Ordering::SeqCst));
        assert!(!player.has_audio_sink.load(Ordering::SeqCst));
        assert_eq!(session.state(), SessionState::Playing);
        assert_eq!(session.media(), &media);
        assert_eq!(
            observer.get_events(),
            vec![EventRecord::PlayingStateChanged(PlaybackKind::Playing)]
        );
    }

    #[test]
    fn test_software_output_installs_sink() {
        let engine = MockEngine::new();
        let bridge = Arc::new(EventBridge::in_process());
        let state = SessionStateContainer::new();
        let _session = PlayerSession::create(
            params(&engine, &bridge, &state, AudioOutput::AudioTrackJava),
            MediaRef::new("file:///a.ogg", Vec::new()),
            0,
        )
        .unwrap();
        let player = engine.current_player().unwrap();
        assert!(player.has_audio_sink.load(Ordering::SeqCst));
    }

    #[test]
    fn test_creation_failure_sets_error() {
        let engine = MockEngine::new();
        engine.fail_player_creation(true);
        let bridge = Arc::new(EventBridge::in_process());
        let state = SessionStateContainer::new();

        let result = PlayerSession::create(
            params(&engine, &bridge, &state, AudioOutput::AudioTrack),
            MediaRef::new("file:///a.mkv", Vec::new()),
            0,
        );
        assert!(matches!(result, Err(SessionError::PlayerCreation(_))));
        assert_eq!(state.get_state(), SessionState::Error);
        assert_eq!(engine.live_players(), 0);
    }

    #[test]
    fn test_teardown_detaches_and_releases() {
        let engine = MockEngine::new();
        let bridge = Arc::new(EventBridge::in_process());
        let observer = Arc::new(TestObserver::new());
        bridge.set_observer(observer.clone());
        let state = SessionStateContainer::new();

        let session = PlayerSession::create(
            params(&engine, &bridge, &state, AudioOutput::AudioTrack),
            MediaRef::new("file:///a.mkv", Vec::new()),
            2,
        )
        .unwrap();
        let player = engine.current_player().unwrap();
        session.teardown();

        assert_eq!(player.subscription_count(), 0);
        assert!(player.released.load(Ordering::SeqCst));
        assert_eq!(engine.live_players(), 0);
        assert_eq!(state.get_state(), SessionState::Absent);

        // late callbacks from the released player reach nobody
        observer.clear();
        player.emit(EngineEvent::EndReached);
        assert_eq!(observer.count(), 0);
    }

    #[test]
    fn test_engine_events_drive_state() {
        let engine = MockEngine::new();
        let bridge = Arc::new(EventBridge::in_process());
        let state = SessionStateContainer::new();
        let mut session = PlayerSession::create(
            params(&engine, &bridge, &state, AudioOutput::AudioTrack),
            MediaRef::new("file:///a.mkv", Vec::new()),
            0,
        )
        .unwrap();

        session.pause();
        assert_eq!(session.state(), SessionState::Paused);
        engine.emit(EngineEvent::EncounteredError);
        assert_eq!(session.state(), SessionState::Error);
        session.teardown();
        assert_eq!(state.get_state(), SessionState::Absent);
    }
}
