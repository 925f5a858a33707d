//! Error taxonomy shared by the navigator and the playback session.

/// Failure reported by a catalog fetch, a stream resolve, or a playback step.
///
/// Errors travel as values; callers decide whether to prompt for login,
/// retry, or give up.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The remote side demands a login. State is left intact and the
    /// operation can be replayed once the user has authenticated.
    #[error("login required")]
    AuthRequired,

    /// Transient network or service failure.
    #[error("network or service error: {0}")]
    Network(String),

    /// The stream resolved but its codec cannot be played.
    #[error("unsupported media: {codec}")]
    UnsupportedMedia { codec: String },

    /// Too many consecutive resolve/play failures; auto-advance stopped.
    #[error("giving up after {attempts} consecutive playback failures")]
    ExhaustedRetries { attempts: u32 },
}

impl SessionError {
    pub fn network(msg: impl std::fmt::Display) -> Self {
        SessionError::Network(msg.to_string())
    }

    /// Whether this failure counts against the consecutive failure counter.
    pub fn counts_as_play_failure(&self) -> bool {
        matches!(
            self,
            SessionError::Network(_) | SessionError::UnsupportedMedia { .. }
        )
    }
}

impl From<anyhow::Error> for SessionError {
    fn from(e: anyhow::Error) -> Self {
        SessionError::Network(format!("{e:#}"))
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
