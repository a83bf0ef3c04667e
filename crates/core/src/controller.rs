// Media-session controller: the queue plus at most one live player session

use crate::context::MediaContext;
use crate::engine::{EnginePlayer, MediaEngine};
use crate::error::{Result, SessionError};
use crate::media::{MediaInfo, MediaOptions, MediaRef, TrackDescription};
use crate::probe;
use crate::queue::PlaybackQueue;
use crate::session::{PlayerSession, SessionParams};
use crate::state::{SessionState, SessionStateContainer};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;

/// The live session and the queue position it was created for. The index
/// survives a failed creation so next/previous keep working.
#[derive(Default)]
struct Slot {
    session: Option<PlayerSession>,
    index: Option<usize>,
}

pub struct MediaController {
    context: Arc<MediaContext>,
    queue: PlaybackQueue,
    slot: Mutex<Slot>,
    state: SessionStateContainer,
}

impl MediaController {
    pub fn new(context: Arc<MediaContext>) -> Self {
        let queue = PlaybackQueue::new(context.bridge().clone());
        Self {
            context,
            queue,
            slot: Mutex::new(Slot::default()),
            state: SessionStateContainer::new(),
        }
    }

    pub fn context(&self) -> &Arc<MediaContext> {
        &self.context
    }

    pub fn queue(&self) -> &PlaybackQueue {
        &self.queue
    }

    pub fn state(&self) -> SessionState {
        self.state.get_state()
    }

    /// Queue position of the current (or last attempted) session
    pub fn current_index(&self) -> Option<usize> {
        self.slot.lock().index
    }

    fn engine(&self) -> Result<Arc<dyn MediaEngine>> {
        self.context.engine().require()
    }

    fn media_options(&self, no_video: bool) -> MediaOptions {
        MediaOptions {
            hardware_decoding: self.context.config().engine.hardware_decoding,
            no_video,
        }
    }

    /// Open a location with the configured codec options, without queueing it
    pub fn open_media(&self, location: &str, no_video: bool) -> Result<MediaRef> {
        let options = self.media_options(no_video).to_engine_options();
        self.engine()?
            .open(location, &options)
            .ok_or_else(|| SessionError::MediaOpen(location.to_string()))
    }

    /// Tear down the current session and start a new one at `index`
    pub fn play_index(&self, index: usize) -> Result<()> {
        let engine = self.engine()?;
        let media = self.queue.get(index)?;

        let mut slot = self.slot.lock();
        if let Some(previous) = slot.session.take() {
            previous.teardown();
        }
        slot.index = Some(index);

        let params = SessionParams {
            engine: engine.as_ref(),
            bridge: self.context.bridge().clone(),
            state: self.state.clone(),
            audio_output: self.context.config().engine.audio_output,
            audio_sink: self.context.audio_sink(),
        };
        match PlayerSession::create(params, media, index) {
            Ok(session) => {
                slot.session = Some(session);
                Ok(())
            }
            Err(e) => {
                error!("Could not start playback at {}: {}", index, e);
                Err(e)
            }
        }
    }

    /// Open, append and play a location; returns its queue index
    pub fn read_media(&self, location: &str, no_video: bool) -> Result<usize> {
        let media = self.open_media(location, no_video).map_err(|e| {
            error!("readMedia: Could not create the media!");
            e
        })?;
        let index = self.queue.append(media);
        self.play_index(index)?;
        Ok(index)
    }

    /// Replace the current item with its sub-items and play the first of
    /// them. `None` if there is no current item or it has no sub-items.
    pub fn expand_media(&self) -> Result<Option<usize>> {
        let Some(index) = self.current_index() else {
            return Ok(None);
        };
        let engine = self.engine()?;
        if self.queue.expand(index, engine.as_ref())? == 0 {
            return Ok(None);
        }
        self.play_index(index)?;
        Ok(Some(index))
    }

    /// Play the following item; no-op at the end of the queue
    pub fn next(&self) -> Result<()> {
        match self.current_index() {
            Some(index) if index + 1 < self.queue.len() => self.play_index(index + 1),
            _ => Ok(()),
        }
    }

    /// Play the preceding item; no-op at the start of the queue
    pub fn previous(&self) -> Result<()> {
        match self.current_index() {
            Some(index) if index > 0 => self.play_index(index - 1),
            _ => Ok(()),
        }
    }

    /// Remove a queue item. The current session keeps playing; its index
    /// moves down if an earlier item went away.
    pub fn remove_index(&self, index: usize) -> Result<()> {
        self.queue.remove_at(index)?;
        let mut slot = self.slot.lock();
        if let Some(current) = slot.index {
            if index < current {
                slot.index = Some(current - 1);
            }
        }
        Ok(())
    }

    /// Locations of every queued item
    pub fn media_list_items(&self) -> Vec<String> {
        self.queue.mrls()
    }

    fn with_player<R>(&self, f: impl FnOnce(&mut dyn EnginePlayer) -> R) -> Option<R> {
        let mut slot = self.slot.lock();
        slot.session.as_mut().map(|s| f(s.player_mut()))
    }

    fn with_player_result(&self, f: impl FnOnce(&mut dyn EnginePlayer) -> Result<()>) -> Result<()> {
        self.with_player(f).unwrap_or(Err(SessionError::NoSession))
    }

    pub fn play(&self) {
        if let Some(session) = self.slot.lock().session.as_mut() {
            session.play();
        }
    }

    pub fn pause(&self) {
        if let Some(session) = self.slot.lock().session.as_mut() {
            session.pause();
        }
    }

    /// Stop playback and release the session. The queue position is kept,
    /// so next/previous still work from it.
    pub fn stop(&self) {
        let mut slot = self.slot.lock();
        if let Some(session) = slot.session.take() {
            session.teardown();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.with_player(|p| p.is_playing()).unwrap_or(false)
    }

    pub fn is_seekable(&self) -> bool {
        self.with_player(|p| p.is_seekable()).unwrap_or(false)
    }

    pub fn time(&self) -> Option<i64> {
        self.with_player(|p| p.time())
    }

    pub fn set_time(&self, time_ms: i64) {
        self.with_player(|p| p.set_time(time_ms));
    }

    pub fn position(&self) -> Option<f32> {
        self.with_player(|p| p.position())
    }

    pub fn set_position(&self, position: f32) {
        self.with_player(|p| p.set_position(position));
    }

    pub fn length(&self) -> Option<i64> {
        self.with_player(|p| p.length())
    }

    /// Playback rate; 1.0 when nothing is playing
    pub fn rate(&self) -> f32 {
        self.with_player(|p| p.rate()).unwrap_or(1.0)
    }

    pub fn set_rate(&self, rate: f32) {
        self.with_player(|p| p.set_rate(rate));
    }

    pub fn volume(&self) -> Option<i32> {
        self.with_player(|p| p.volume())
    }

    pub fn set_volume(&self, volume: i32) -> Result<()> {
        self.with_player_result(|p| p.set_volume(volume))
    }

    pub fn audio_track_count(&self) -> Option<i32> {
        self.with_player(|p| p.audio_track_count())
    }

    /// Selectable audio tracks, without the leading "disable" entry
    pub fn audio_track_descriptions(&self) -> Option<Vec<TrackDescription>> {
        self.with_player(|p| {
            let count = (p.audio_track_count() - 1).max(0) as usize;
            p.audio_track_descriptions()
                .into_iter()
                .skip(1)
                .take(count)
                .collect()
        })
    }

    pub fn audio_track(&self) -> Option<i32> {
        self.with_player(|p| p.audio_track())
    }

    pub fn set_audio_track(&self, id: i32) -> Result<()> {
        self.with_player_result(|p| p.set_audio_track(id))
    }

    pub fn video_track_count(&self) -> Option<i32> {
        self.with_player(|p| p.video_track_count())
    }

    pub fn spu_track_count(&self) -> Option<i32> {
        self.with_player(|p| p.spu_count())
    }

    pub fn spu_track_descriptions(&self) -> Option<Vec<TrackDescription>> {
        self.with_player(|p| {
            let count = p.spu_count().max(0) as usize;
            p.spu_descriptions().into_iter().take(count).collect()
        })
    }

    pub fn spu_track(&self) -> Option<i32> {
        self.with_player(|p| p.spu_track())
    }

    pub fn set_spu_track(&self, id: i32) -> Result<()> {
        self.with_player_result(|p| p.set_spu_track(id))
    }

    pub fn add_subtitle_track(&self, path: &str) -> Result<()> {
        self.with_player_result(|p| p.add_subtitle_file(path))
    }

    /// Parse a location that is not necessarily queued
    pub fn read_tracks_info(&self, location: &str) -> Result<MediaInfo> {
        let engine = self.engine()?;
        let options = self.media_options(false).to_engine_options();
        let media = engine.open(location, &options).ok_or_else(|| {
            error!("Could not create the media!");
            SessionError::MediaOpen(location.to_string())
        })?;
        Ok(engine.parse(&media))
    }

    /// Parse the queued item at `index`
    pub fn read_tracks_info_at(&self, index: usize) -> Result<MediaInfo> {
        let media = self.queue.get(index).map_err(|e| {
            error!("Could not load get media @ position {}!", index);
            e
        })?;
        Ok(self.engine()?.parse(&media))
    }

    /// Whether a location has video, probed on a throwaway player.
    /// Does not touch the current session.
    pub fn has_video_track(&self, location: &str) -> Result<bool> {
        let engine = self.engine()?;
        let options = self.media_options(false).to_engine_options();
        probe::has_video_track(
            engine.as_ref(),
            location,
            &options,
            &self.context.config().probe,
        )
    }

    pub fn version(&self) -> Result<String> {
        Ok(self.engine()?.version())
    }

    pub fn compiler(&self) -> Result<String> {
        Ok(self.engine()?.compiler())
    }

    pub fn changeset(&self) -> Result<String> {
        Ok(self.engine()?.changeset())
    }

    /// Release the session, then the engine. Safe to call more than once.
    pub fn destroy(&self) {
        let session = {
            let mut slot = self.slot.lock();
            slot.index = None;
            slot.session.take()
        };
        match session {
            Some(session) => session.teardown(),
            None => debug!("No session to release"),
        }
        if self.context.engine().is_alive() {
            self.context.teardown();
            info!("Controller destroyed");
        } else {
            warn!("Controller already destroyed");
        }
    }
}
