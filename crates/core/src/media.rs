// Media references and track descriptions

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Caching applied when hardware decoding is on; some hardware decoders
/// buffer so many packets that the default preroll starts the clock too early.
pub const HW_CACHING_MS: u32 = 1500;

/// Codec chain forced when hardware decoding is on
pub const HW_CODEC_CHAIN: &str = "mediacodec,iomx,all";

static NEXT_MEDIA_ID: AtomicU64 = AtomicU64::new(1);

/// Codec-selection options attached to a media location when it is opened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaOptions {
    /// Prefer the platform's hardware decoders
    pub hardware_decoding: bool,
    /// Skip video output entirely (audio-only playback)
    pub no_video: bool,
}

impl MediaOptions {
    /// Engine option strings for these settings. `no_video` applies
    /// whether or not hardware decoding is on.
    pub fn to_engine_options(&self) -> Vec<String> {
        let mut options = Vec::new();
        if self.hardware_decoding {
            options.push(format!(":file-caching={}", HW_CACHING_MS));
            options.push(format!(":network-caching={}", HW_CACHING_MS));
            options.push(format!(":codec={}", HW_CODEC_CHAIN));
        }
        if self.no_video {
            options.push(":no-video".to_string());
        }
        options
    }
}

struct MediaInner {
    id: u64,
    mrl: String,
    options: Vec<String>,
}

/// Opaque reference to one playable item.
///
/// Cloning shares the same item; equality is identity, so two refs opened
/// from the same location are still distinct queue entries.
#[derive(Clone)]
pub struct MediaRef {
    inner: Arc<MediaInner>,
}

impl MediaRef {
    pub fn new(mrl: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            inner: Arc::new(MediaInner {
                id: NEXT_MEDIA_ID.fetch_add(1, Ordering::Relaxed),
                mrl: mrl.into(),
                options,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn mrl(&self) -> &str {
        &self.inner.mrl
    }

    pub fn options(&self) -> &[String] {
        &self.inner.options
    }
}

impl PartialEq for MediaRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for MediaRef {}

impl fmt::Debug for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MediaRef")
            .field("id", &self.inner.id)
            .field("mrl", &self.inner.mrl)
            .finish()
    }
}

/// Elementary stream type as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
    Text,
    Unknown,
}

impl TrackKind {
    /// Wire code used by the client's `TrackInfo.Type` field
    pub fn code(&self) -> i32 {
        match self {
            TrackKind::Unknown => -1,
            TrackKind::Audio => 0,
            TrackKind::Video => 1,
            TrackKind::Text => 2,
        }
    }
}

/// Per-kind stream details
#[derive(Debug, Clone, PartialEq)]
pub enum TrackDetails {
    Video { width: u32, height: u32, frame_rate: f32 },
    Audio { channels: u32, sample_rate: u32 },
    None,
}

/// One elementary stream of a parsed media
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub id: i32,
    pub kind: TrackKind,
    pub codec: String,
    pub language: Option<String>,
    pub details: TrackDetails,
}

/// Container-level metadata of a parsed media
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaMeta {
    pub length_ms: i64,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub artwork_url: Option<String>,
}

/// Parse result: every stream plus the metadata record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaInfo {
    pub tracks: Vec<TrackInfo>,
    pub meta: MediaMeta,
}

/// Selectable track (audio / subtitle) as offered by a live player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescription {
    pub id: i32,
    pub name: String,
}
