// Video-track probe: play a location on a throwaway player until the engine
// reports its length, then count the video tracks.

use crate::config::ProbeConfig;
use crate::engine::{EngineEvent, EngineEventKind, EnginePlayer, EventSink, MediaEngine};
use crate::error::{Result, SessionError};
use log::{debug, error, info};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitOutcome {
    LengthKnown,
    EngineGaveUp,
    TimedOut,
}

/// Set once by the engine's length-changed callback
struct LengthMonitor {
    changed: Mutex<bool>,
    cond: Condvar,
}

impl LengthMonitor {
    fn new() -> Self {
        Self {
            changed: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    fn signal(&self) {
        *self.changed.lock() = true;
        self.cond.notify_all();
    }

    /// Wait in poll slices until the length is known, the player dies, or the
    /// deadline passes
    fn wait(&self, player: &dyn EnginePlayer, config: &ProbeConfig) -> WaitOutcome {
        let deadline = Instant::now() + config.timeout;
        let mut changed = self.changed.lock();
        loop {
            // never hold the monitor while asking the engine
            let alive = MutexGuard::unlocked(&mut changed, || player.will_play());
            if !alive {
                return WaitOutcome::EngineGaveUp;
            }
            if *changed {
                return WaitOutcome::LengthKnown;
            }
            let now = Instant::now();
            if now >= deadline {
                return WaitOutcome::TimedOut;
            }
            let slice = config.poll_interval.min(deadline - now);
            self.cond.wait_for(&mut changed, slice);
        }
    }
}

/// Whether `location` has at least one video track.
///
/// `Ok(false)` if the engine cannot open the location at all,
/// `Err(ProbeOpen)` if it gives up while trying to play it, and
/// `Err(ProbeTimeout)` if it reports nothing before the deadline.
pub fn has_video_track(
    engine: &dyn MediaEngine,
    location: &str,
    options: &[String],
    config: &ProbeConfig,
) -> Result<bool> {
    let Some(media) = engine.open(location, options) else {
        error!("Could not create the media!");
        return Ok(false);
    };
    engine.parse(&media);

    let Some(mut player) = engine.create_player() else {
        return Err(SessionError::PlayerCreation(location.to_string()));
    };

    let monitor = Arc::new(LengthMonitor::new());
    let sink: EventSink = {
        let monitor = monitor.clone();
        Arc::new(move |_event: &EngineEvent| monitor.signal())
    };
    player.set_media(&media);
    let subscription = player.subscribe(EngineEventKind::LengthChanged, sink);
    player.play();

    let started = Instant::now();
    let outcome = monitor.wait(player.as_ref(), config);
    debug!("Probe finished after {:?}: {:?}", started.elapsed(), outcome);

    let result = match outcome {
        WaitOutcome::LengthKnown => Ok(player.video_track_count()),
        WaitOutcome::EngineGaveUp => Err(SessionError::ProbeOpen(location.to_string())),
        WaitOutcome::TimedOut => Err(SessionError::ProbeTimeout),
    };

    player.unsubscribe(subscription);
    player.stop();
    player.release();

    let count = result?;
    info!("Number of video tracks: {}", count);
    Ok(count > 0)
}
