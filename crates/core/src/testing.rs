// In-memory engine used by the unit tests. Events can be fired from any thread
// and every player creation/release is counted.

use crate::engine::{
    AudioSink, EngineEvent, EngineEventKind, EnginePlayer, EventSink, MediaEngine, SubscriptionId,
};
use crate::error::{Result, SessionError};
use crate::media::{MediaInfo, MediaRef, TrackDescription};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// What a player does on its own after `play`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayScript {
    /// Nothing beyond the synchronous `Playing` event
    Silent,
    /// Report the length after a delay
    LengthAfter(Duration),
    /// Stop trying (will_play turns false) after a delay
    GiveUpAfter(Duration),
}

pub struct PlayerShared {
    pub id: usize,
    subscribers: Mutex<Vec<(SubscriptionId, EngineEventKind, EventSink)>>,
    next_subscription: AtomicU64,
    pub media: Mutex<Option<MediaRef>>,
    pub playing: AtomicBool,
    alive: AtomicBool,
    pub released: AtomicBool,
    pub has_audio_sink: AtomicBool,
    time: AtomicI64,
    volume: AtomicI32,
    rate: Mutex<f32>,
    audio_track: AtomicI32,
    spu_track: AtomicI32,
    pub subtitle_files: Mutex<Vec<String>>,
}

impl PlayerShared {
    fn new(id: usize) -> Self {
        Self {
            id,
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            media: Mutex::new(None),
            playing: AtomicBool::new(false),
            alive: AtomicBool::new(true),
            released: AtomicBool::new(false),
            has_audio_sink: AtomicBool::new(false),
            time: AtomicI64::new(0),
            volume: AtomicI32::new(100),
            rate: Mutex::new(1.0),
            audio_track: AtomicI32::new(1),
            spu_track: AtomicI32::new(-1),
            subtitle_files: Mutex::new(Vec::new()),
        }
    }

    /// Fire an event at every matching subscriber, outside the subscriber lock
    pub fn emit(&self, event: EngineEvent) {
        let sinks: Vec<EventSink> = self
            .subscribers
            .lock()
            .iter()
            .filter(|(_, kind, _)| *kind == event.kind())
            .map(|(_, _, sink)| sink.clone())
            .collect();
        for sink in sinks {
            sink(&event);
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn media_mrl(&self) -> Option<String> {
        self.media.lock().as_ref().map(|m| m.mrl().to_string())
    }
}

struct EngineShared {
    sub_items: Mutex<HashMap<String, Vec<String>>>,
    info: Mutex<HashMap<String, MediaInfo>>,
    refused: Mutex<HashSet<String>>,
    fail_create: AtomicBool,
    script: Mutex<PlayScript>,
    video_tracks: AtomicI32,
    live: AtomicUsize,
    max_live: AtomicUsize,
    created: AtomicUsize,
    released: AtomicUsize,
    players: Mutex<Vec<Arc<PlayerShared>>>,
    opened: Mutex<Vec<MediaRef>>,
    engine_released: AtomicBool,
}

#[derive(Clone)]
pub struct MockEngine {
    shared: Arc<EngineShared>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(EngineShared {
                sub_items: Mutex::new(HashMap::new()),
                info: Mutex::new(HashMap::new()),
                refused: Mutex::new(HashSet::new()),
                fail_create: AtomicBool::new(false),
                script: Mutex::new(PlayScript::Silent),
                video_tracks: AtomicI32::new(0),
                live: AtomicUsize::new(0),
                max_live: AtomicUsize::new(0),
                created: AtomicUsize::new(0),
                released: AtomicUsize::new(0),
                players: Mutex::new(Vec::new()),
                opened: Mutex::new(Vec::new()),
                engine_released: AtomicBool::new(false),
            }),
        }
    }

    pub fn set_sub_items(&self, mrl: &str, children: &[&str]) {
        self.shared.sub_items.lock().insert(
            mrl.to_string(),
            children.iter().map(|c| c.to_string()).collect(),
        );
    }

    pub fn set_info(&self, mrl: &str, info: MediaInfo) {
        self.shared.info.lock().insert(mrl.to_string(), info);
    }

    pub fn refuse(&self, mrl: &str) {
        self.shared.refused.lock().insert(mrl.to_string());
    }

    pub fn fail_player_creation(&self, fail: bool) {
        self.shared.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_play_script(&self, script: PlayScript) {
        *self.shared.script.lock() = script;
    }

    pub fn set_video_tracks(&self, count: i32) {
        self.shared.video_tracks.store(count, Ordering::SeqCst);
    }

    pub fn live_players(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }

    pub fn max_live_players(&self) -> usize {
        self.shared.max_live.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.shared.created.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.shared.released.load(Ordering::SeqCst)
    }

    pub fn engine_released(&self) -> bool {
        self.shared.engine_released.load(Ordering::SeqCst)
    }

    pub fn players(&self) -> Vec<Arc<PlayerShared>> {
        self.shared.players.lock().clone()
    }

    /// Options passed with the latest `open` of `mrl`
    pub fn opened_options(&self, mrl: &str) -> Option<Vec<String>> {
        self.shared
            .opened
            .lock()
            .iter()
            .rev()
            .find(|m| m.mrl() == mrl)
            .map(|m| m.options().to_vec())
    }

    /// Most recently created player that is still alive
    pub fn current_player(&self) -> Option<Arc<PlayerShared>> {
        self.shared
            .players
            .lock()
            .iter()
            .rev()
            .find(|p| !p.released.load(Ordering::SeqCst))
            .cloned()
    }

    /// Fire an event as if from an engine thread on the current player
    pub fn emit(&self, event: EngineEvent) {
        if let Some(player) = self.current_player() {
            player.emit(event);
        }
    }
}

impl MediaEngine for MockEngine {
    fn open(&self, location: &str, options: &[String]) -> Option<MediaRef> {
        if self.shared.refused.lock().contains(location) {
            return None;
        }
        let media = MediaRef::new(location, options.to_vec());
        self.shared.opened.lock().push(media.clone());
        Some(media)
    }

    fn sub_items(&self, media: &MediaRef) -> Vec<MediaRef> {
        self.shared
            .sub_items
            .lock()
            .get(media.mrl())
            .map(|children| {
                children
                    .iter()
                    .map(|c| MediaRef::new(c.clone(), Vec::new()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn parse(&self, media: &MediaRef) -> MediaInfo {
        self.shared
            .info
            .lock()
            .get(media.mrl())
            .cloned()
            .unwrap_or_default()
    }

    fn create_player(&self) -> Option<Box<dyn EnginePlayer>> {
        if self.shared.fail_create.load(Ordering::SeqCst) {
            return None;
        }
        let id = self.shared.created.fetch_add(1, Ordering::SeqCst);
        let live = self.shared.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.max_live.fetch_max(live, Ordering::SeqCst);

        let player = Arc::new(PlayerShared::new(id));
        self.shared.players.lock().push(player.clone());
        Some(Box::new(MockPlayer {
            player,
            engine: self.shared.clone(),
        }))
    }

    fn version(&self) -> String {
        "mock 1.0".to_string()
    }

    fn compiler(&self) -> String {
        "rustc".to_string()
    }

    fn changeset(&self) -> String {
        "0000000".to_string()
    }

    fn release(&self) {
        self.shared.engine_released.store(true, Ordering::SeqCst);
    }
}

struct MockPlayer {
    player: Arc<PlayerShared>,
    engine: Arc<EngineShared>,
}

impl EnginePlayer for MockPlayer {
    fn set_media(&mut self, media: &MediaRef) {
        *self.player.media.lock() = Some(media.clone());
    }

    fn play(&mut self) {
        self.player.playing.store(true, Ordering::SeqCst);
        self.player.emit(EngineEvent::Playing);

        let script = *self.engine.script.lock();
        let player = self.player.clone();
        match script {
            PlayScript::Silent => {}
            PlayScript::LengthAfter(delay) => {
                thread::spawn(move || {
                    thread::sleep(delay);
                    player.emit(EngineEvent::LengthChanged(60_000));
                });
            }
            PlayScript::GiveUpAfter(delay) => {
                thread::spawn(move || {
                    thread::sleep(delay);
                    player.alive.store(false, Ordering::SeqCst);
                    player.emit(EngineEvent::EncounteredError);
                });
            }
        }
    }

    fn pause(&mut self) {
        self.player.playing.store(false, Ordering::SeqCst);
        self.player.emit(EngineEvent::Paused);
    }

    fn stop(&mut self) {
        self.player.playing.store(false, Ordering::SeqCst);
        self.player.emit(EngineEvent::Stopped);
    }

    fn release(self: Box<Self>) {
        self.player.released.store(true, Ordering::SeqCst);
        self.engine.released.fetch_add(1, Ordering::SeqCst);
        self.engine.live.fetch_sub(1, Ordering::SeqCst);
    }

    fn subscribe(&mut self, kind: EngineEventKind, sink: EventSink) -> SubscriptionId {
        let id = SubscriptionId(self.player.next_subscription.fetch_add(1, Ordering::SeqCst));
        self.player.subscribers.lock().push((id, kind, sink));
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.player.subscribers.lock().retain(|(sid, _, _)| *sid != id);
    }

    fn set_audio_sink(&mut self, _sink: Arc<dyn AudioSink>) {
        self.player.has_audio_sink.store(true, Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        self.player.playing.load(Ordering::SeqCst)
    }

    fn is_seekable(&self) -> bool {
        true
    }

    fn will_play(&self) -> bool {
        self.player.alive.load(Ordering::SeqCst)
    }

    fn time(&self) -> i64 {
        self.player.time.load(Ordering::SeqCst)
    }

    fn set_time(&mut self, time_ms: i64) {
        self.player.time.store(time_ms, Ordering::SeqCst);
    }

    fn position(&self) -> f32 {
        self.player.time.load(Ordering::SeqCst) as f32 / 60_000.0
    }

    fn set_position(&mut self, position: f32) {
        self.player
            .time
            .store((position * 60_000.0) as i64, Ordering::SeqCst);
    }

    fn length(&self) -> i64 {
        60_000
    }

    fn rate(&self) -> f32 {
        *self.player.rate.lock()
    }

    fn set_rate(&mut self, rate: f32) {
        *self.player.rate.lock() = rate;
    }

    fn volume(&self) -> i32 {
        self.player.volume.load(Ordering::SeqCst)
    }

    fn set_volume(&mut self, volume: i32) -> Result<()> {
        if !(0..=200).contains(&volume) {
            return Err(SessionError::Engine(format!("Volume out of range: {}", volume)));
        }
        self.player.volume.store(volume, Ordering::SeqCst);
        Ok(())
    }

    fn audio_track_count(&self) -> i32 {
        3
    }

    fn audio_track_descriptions(&self) -> Vec<TrackDescription> {
        vec![
            TrackDescription {
                id: -1,
                name: "Disable".to_string(),
            },
            TrackDescription {
                id: 1,
                name: "English".to_string(),
            },
            TrackDescription {
                id: 2,
                name: "Commentary".to_string(),
            },
        ]
    }

    fn audio_track(&self) -> i32 {
        self.player.audio_track.load(Ordering::SeqCst)
    }

    fn set_audio_track(&mut self, id: i32) -> Result<()> {
        self.player.audio_track.store(id, Ordering::SeqCst);
        Ok(())
    }

    fn video_track_count(&self) -> i32 {
        self.engine.video_tracks.load(Ordering::SeqCst)
    }

    fn spu_count(&self) -> i32 {
        2
    }

    fn spu_descriptions(&self) -> Vec<TrackDescription> {
        vec![
            TrackDescription {
                id: -1,
                name: "Disable".to_string(),
            },
            TrackDescription {
                id: 3,
                name: "French".to_string(),
            },
        ]
    }

    fn spu_track(&self) -> i32 {
        self.player.spu_track.load(Ordering::SeqCst)
    }

    fn set_spu_track(&mut self, id: i32) -> Result<()> {
        self.player.spu_track.store(id, Ordering::SeqCst);
        Ok(())
    }

    fn add_subtitle_file(&mut self, path: &str) -> Result<()> {
        self.player.subtitle_files.lock().push(path.to_string());
        Ok(())
    }
}
