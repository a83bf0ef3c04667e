// Controller and engine configuration

use std::time::Duration;

/// Default bound on the video-track probe
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2000;

/// How often the probe re-checks engine liveness while waiting
pub const DEFAULT_PROBE_POLL_MS: u64 = 100;

/// Resolution the engine should prefer when a stream offers several
pub const PREFERRED_RESOLUTION: u32 = 360;

/// Chroma used when the client does not ask for one
pub const DEFAULT_CHROMA: &str = "RV32";

/// Highest loop-filter skip level the engine accepts
pub const MAX_DEBLOCKING: i32 = 4;

/// Audio output selected by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioOutput {
    /// Engine hands decoded samples to the client, which plays them itself
    AudioTrackJava,
    /// Engine drives the platform AudioTrack directly
    AudioTrack,
    /// Engine drives OpenSL ES directly
    OpenSles,
}

impl AudioOutput {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(AudioOutput::AudioTrackJava),
            1 => Some(AudioOutput::AudioTrack),
            2 => Some(AudioOutput::OpenSles),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            AudioOutput::AudioTrackJava => 0,
            AudioOutput::AudioTrack => 1,
            AudioOutput::OpenSles => 2,
        }
    }

    /// Whether sessions must install a software audio sink
    pub fn is_software_mixed(&self) -> bool {
        matches!(self, AudioOutput::AudioTrackJava)
    }

    fn engine_arg(&self) -> &'static str {
        match self {
            AudioOutput::OpenSles => "--aout=opensles",
            _ => "--aout=android_audiotrack",
        }
    }
}

/// Engine settings read from the client at init time
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub audio_output: AudioOutput,
    pub time_stretching: bool,
    /// Loop-filter skip level, clamped to `0..=MAX_DEBLOCKING`
    pub deblocking: i32,
    /// Surface chroma; empty means `DEFAULT_CHROMA`
    pub chroma: String,
    pub subtitles_encoding: String,
    pub verbose: bool,
    /// Open media with hardware-decoding options
    pub hardware_decoding: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            audio_output: AudioOutput::AudioTrack,
            time_stretching: false,
            deblocking: 3,
            chroma: String::new(),
            subtitles_encoding: String::new(),
            verbose: false,
            hardware_decoding: false,
        }
    }
}

impl EngineConfig {
    pub fn chroma_or_default(&self) -> &str {
        if self.chroma.is_empty() {
            DEFAULT_CHROMA
        } else {
            &self.chroma
        }
    }

    /// Argument vector for the engine instance.
    /// Only options the engine is known to accept; unknown ones abort it.
    pub fn to_args(&self) -> Vec<String> {
        let deblocking = self.deblocking.clamp(0, MAX_DEBLOCKING);
        let time_stretch = if self.time_stretching {
            "--audio-time-stretch"
        } else {
            "--no-audio-time-stretch"
        };

        [
            "-I",
            "dummy",
            "--no-osd",
            "--no-video-title-show",
            "--no-stats",
            "--no-plugins-cache",
            "--no-drop-late-frames",
            "--preferred-resolution",
        ]
        .iter()
        .map(|s| s.to_string())
        .chain([
            PREFERRED_RESOLUTION.to_string(),
            "--avcodec-fast".to_string(),
            "--avcodec-threads=0".to_string(),
            "--subsdec-encoding".to_string(),
            self.subtitles_encoding.clone(),
            time_stretch.to_string(),
            "--avcodec-skiploopfilter".to_string(),
            deblocking.to_string(),
            self.audio_output.engine_arg().to_string(),
            "--androidsurface-chroma".to_string(),
            self.chroma_or_default().to_string(),
        ])
        .collect()
    }
}

/// Bounds for the video-track probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_PROBE_POLL_MS),
        }
    }
}

/// Event delivery settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Minimum spacing between position deliveries; zero delivers all of them
    pub position_interval: Duration,
}

/// Everything the controller needs besides the engine itself
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerConfig {
    pub engine: EngineConfig,
    pub probe: ProbeConfig,
    pub bridge: BridgeConfig,
}
