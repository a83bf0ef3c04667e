// Error handling for the media-session controller

use std::fmt;

/// Session controller error types
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Queue index out of range
    InvalidIndex { index: usize, len: usize },

    /// Engine instance or initial queue creation failed
    EngineInit(String),

    /// Engine refused to open a media location
    MediaOpen(String),

    /// Engine refused to create a player for the given media
    PlayerCreation(String),

    /// Track probe ran out of time before the engine reported anything
    ProbeTimeout,

    /// Engine gave up opening the probed media
    ProbeOpen(String),

    /// No observer registered for event delivery
    MissingObserver,

    /// Observer has no usable callback entry point
    MissingCallbackEntry(String),

    /// Execution context could not be attached to the calling thread
    ContextAttach(String),

    /// Command needs a live session and there is none
    NoSession,

    /// Engine rejected a transport or track command
    Engine(String),

    /// IO error
    Io(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SessionError::InvalidIndex { index, len } => {
                write!(f, "Invalid index: {} (queue length {})", index, len)
            }
            SessionError::EngineInit(msg) => write!(f, "Engine init failure: {}", msg),
            SessionError::MediaOpen(msg) => write!(f, "Could not open media: {}", msg),
            SessionError::PlayerCreation(msg) => write!(f, "Player creation failure: {}", msg),
            SessionError::ProbeTimeout => write!(f, "Probe timed out"),
            SessionError::ProbeOpen(msg) => write!(f, "Engine can't open the file: {}", msg),
            SessionError::MissingObserver => write!(f, "No observer registered"),
            SessionError::MissingCallbackEntry(msg) => {
                write!(f, "Missing callback entry point: {}", msg)
            }
            SessionError::ContextAttach(msg) => write!(f, "Context attach failed: {}", msg),
            SessionError::NoSession => write!(f, "No active session"),
            SessionError::Engine(msg) => write!(f, "Engine error: {}", msg),
            SessionError::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {}

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, SessionError>;

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Io(err.to_string())
    }
}

impl SessionError {
    /// Errors that end the controller's life rather than a single command
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::EngineInit(_))
    }
}
