//! Player status and recovery rules for the HLS stream.
//!
//! Nothing here decodes media. [`PlaybackSupervisor`] consumes the events a
//! player reports and answers with the recovery the player should attempt.

use std::fmt;

use capdeck_api::{ApiRequest, Transport};
use tracing::{debug, info, warn};

/// Where the stream lives relative to the page that plays it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSources {
    pub stream: String,
    pub playlist: String,
}

impl StreamSources {
    /// `page_path` is the path of the player page; its last segment is
    /// dropped so the player works behind a path-prefixing proxy.
    pub fn new(page_path: &str) -> Self {
        let base = page_path.rsplit_once('/').map_or("", |(base, _)| base);
        Self {
            stream: format!("{base}/stream"),
            playlist: format!("{base}/stream.m3u8"),
        }
    }

    pub fn absolute(&self, origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        Self {
            stream: format!("{origin}{}", self.stream),
            playlist: format!("{origin}{}", self.playlist),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerStatus {
    Loading,
    /// Manifest parsed or metadata loaded, waiting for playback.
    Connecting(&'static str),
    Playing,
    Paused,
    Error(String),
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerStatus::Loading => f.write_str("Loading..."),
            PlayerStatus::Connecting(text) => f.write_str(text),
            PlayerStatus::Playing => f.write_str("Playing"),
            PlayerStatus::Paused => f.write_str("Paused"),
            PlayerStatus::Error(msg) => write!(f, "Error: {msg}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Media,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    None,
    RestartLoad,
    RecoverMedia,
    Destroy,
}

/// Error codes of an HTML media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaErrorCode {
    Aborted,
    Network,
    Decode,
    Unsupported,
}

impl MediaErrorCode {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(MediaErrorCode::Aborted),
            2 => Some(MediaErrorCode::Network),
            3 => Some(MediaErrorCode::Decode),
            4 => Some(MediaErrorCode::Unsupported),
            _ => None,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            MediaErrorCode::Aborted => "Playback aborted",
            MediaErrorCode::Network => "Network error",
            MediaErrorCode::Decode => "Decoding error",
            MediaErrorCode::Unsupported => "Format not supported",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    LoadStart,
    ManifestParsed,
    AutoplayBlocked,
    Metadata { width: u32, height: u32 },
    Playing,
    Pause,
    StreamError { kind: ErrorKind, fatal: bool },
    MediaError(Option<MediaErrorCode>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub title: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct PlaybackSupervisor {
    status: PlayerStatus,
    warning: Option<Warning>,
    resolution: Option<(u32, u32)>,
    destroyed: bool,
}

impl Default for PlaybackSupervisor {
    fn default() -> Self {
        Self {
            status: PlayerStatus::Loading,
            warning: None,
            resolution: None,
            destroyed: false,
        }
    }
}

impl PlaybackSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &PlayerStatus {
        &self.status
    }

    pub fn warning(&self) -> Option<&Warning> {
        self.warning.as_ref()
    }

    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.resolution
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn fail(&mut self, status: &str, title: &'static str, message: &str) {
        self.status = PlayerStatus::Error(status.to_owned());
        self.warning = Some(Warning {
            title,
            message: message.to_owned(),
        });
    }

    /// Applies `event` and returns what the player should do about it.
    pub fn handle(&mut self, event: PlayerEvent) -> Recovery {
        if self.destroyed {
            debug!("player destroyed, ignoring {event:?}");
            return Recovery::None;
        }

        match event {
            PlayerEvent::LoadStart => self.status = PlayerStatus::Loading,
            PlayerEvent::ManifestParsed => {
                self.status = PlayerStatus::Connecting("Ready to play");
                self.warning = None;
            }
            PlayerEvent::AutoplayBlocked => {
                self.status = PlayerStatus::Connecting("Click to play");
            }
            PlayerEvent::Metadata { width, height } => {
                if width > 0 && height > 0 {
                    self.resolution = Some((width, height));
                }
            }
            PlayerEvent::Playing => {
                self.status = PlayerStatus::Playing;
                self.warning = None;
            }
            PlayerEvent::Pause => self.status = PlayerStatus::Paused,
            PlayerEvent::StreamError { fatal: false, kind } => {
                debug!("non-fatal {kind:?} stream error");
            }
            PlayerEvent::StreamError { fatal: true, kind } => {
                warn!("fatal {kind:?} stream error");
                return match kind {
                    ErrorKind::Network => {
                        self.fail(
                            "Network error",
                            "Network error",
                            "A network error interrupted the stream. Reconnecting...",
                        );
                        Recovery::RestartLoad
                    }
                    ErrorKind::Media => {
                        self.fail(
                            "Media error",
                            "Media error",
                            "The stream could not be decoded. Trying to recover...",
                        );
                        Recovery::RecoverMedia
                    }
                    ErrorKind::Other => {
                        self.fail(
                            "Fatal error",
                            "Fatal error",
                            "A fatal error occurred. Reload the player.",
                        );
                        self.destroyed = true;
                        Recovery::Destroy
                    }
                };
            }
            PlayerEvent::MediaError(code) => {
                let message = code.map_or("Unknown error", MediaErrorCode::message);
                self.fail(message, "Video error", message);
            }
        }
        Recovery::None
    }
}

/// Fetches the playlist once and reports the result as a player event.
pub async fn check_playlist<T: Transport>(
    transport: &T,
    sources: &StreamSources,
) -> PlayerEvent {
    let request = ApiRequest::asset(&sources.playlist);
    match transport.send(&request).await {
        Ok(response) if response.is_success() => {
            info!("playlist {} is being served", sources.playlist);
            PlayerEvent::ManifestParsed
        }
        Ok(response) => {
            debug!("playlist answered {}", response.status);
            PlayerEvent::StreamError {
                kind: ErrorKind::Network,
                fatal: true,
            }
        }
        Err(e) => {
            debug!("playlist unreachable: {e}");
            PlayerEvent::StreamError {
                kind: ErrorKind::Network,
                fatal: true,
            }
        }
    }
}
