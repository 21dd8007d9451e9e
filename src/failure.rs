//! Classified failures of the download pipeline.
//!
//! Every way a track can fail to be delivered is one of the closed set of
//! [`FailureKind`]s. Each kind has a stable message key, which callers may
//! use to look up a localized message, and a default English message.
//!
//! Infrastructure errors ([`crate::error::Error`]) are never passed to the
//! caller as such. They are classified into a kind at the stage they occur,
//! and kept as the [`Failure`]'s source. The one exception are I/O errors on
//! the sink other than running out of space: these indicate a broken
//! environment and propagate as [`PipelineError::Fatal`].

use std::{fmt, io};

use serde::Serialize;
use thiserror::Error;

use crate::{error::Error, track::Track};

/// Closed set of failure kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// The item's track id is zero or missing.
    NotOnDeezer,
    /// The content hash is empty and no alternative was found.
    NotEncoded,
    /// The album of the track could not be fetched.
    AlbumDoesntExists,
    /// The track's metadata or content hash could not be resolved.
    NotLoggedIn,
    /// The account's subscription does not cover the bitrate.
    WrongLicense,
    /// The track may not be streamed from the session's country.
    WrongGeolocation,
    /// Neither the requested nor any allowed fallback bitrate is available.
    WrongBitrate,
    /// The requested 360 Reality Audio format is not available.
    No360RA,
    /// The stream URL is empty or the transfer failed.
    NotAvailable,
    /// The sink ran out of space.
    NoSpaceLeft,
    /// The run was cancelled.
    Canceled,
}

impl FailureKind {
    /// Stable message key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::NotOnDeezer => "notOnDeezer",
            Self::NotEncoded => "notEncoded",
            Self::AlbumDoesntExists => "albumDoesntExists",
            Self::NotLoggedIn => "notLoggedIn",
            Self::WrongLicense => "wrongLicense",
            Self::WrongGeolocation => "wrongGeolocation",
            Self::WrongBitrate => "wrongBitrate",
            Self::No360RA => "no360RA",
            Self::NotAvailable => "notAvailable",
            Self::NoSpaceLeft => "noSpaceLeft",
            Self::Canceled => "canceled",
        }
    }

    /// Default English message.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotOnDeezer => "Track not available on Deezer!",
            Self::NotEncoded => "Track not yet encoded!",
            Self::AlbumDoesntExists => "Track's album does not exist, failed to gather info.",
            Self::NotLoggedIn => "You need to login to download tracks.",
            Self::WrongLicense => "Your account can't stream the track at the desired bitrate.",
            Self::WrongGeolocation => {
                "Your account can't stream the track from your current country."
            }
            Self::WrongBitrate => "Track not found at desired bitrate.",
            Self::No360RA => "Track is not available in Reality Audio 360.",
            Self::NotAvailable => "Track not available on deezer's servers!",
            Self::NoSpaceLeft => {
                "No space left on target drive, clean up some space for the tracks"
            }
            Self::Canceled => "Download was canceled.",
        }
    }

    /// Whether this is a deliberate stop rather than an error.
    #[must_use]
    pub const fn is_cancellation(self) -> bool {
        matches!(self, Self::Canceled)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A classified failure with optional context.
#[derive(Debug)]
pub struct Failure {
    pub kind: FailureKind,

    /// The track as far as it was resolved when the failure occurred.
    pub track: Option<Box<Track>>,

    /// The infrastructure error that was classified into `kind`.
    pub source: Option<Error>,
}

impl Failure {
    #[must_use]
    pub fn new(kind: FailureKind) -> Self {
        Self {
            kind,
            track: None,
            source: None,
        }
    }

    #[must_use]
    pub fn canceled() -> Self {
        Self::new(FailureKind::Canceled)
    }

    /// Attaches the partially resolved track.
    #[must_use]
    pub fn with_track(mut self, track: &Track) -> Self {
        self.track = Some(Box::new(track.clone()));
        self
    }

    /// Attaches the underlying error.
    #[must_use]
    pub fn with_source(mut self, source: Error) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn key(&self) -> &'static str {
        self.kind.key()
    }
}

impl From<FailureKind> for Failure {
    fn from(kind: FailureKind) -> Self {
        Self::new(kind)
    }
}

/// Formats as `[{track}] {message}`, followed by the source if any.
impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(track) = &self.track {
            write!(f, "[{track}] ")?;
        }
        write!(f, "{}", self.kind)?;
        if let Some(source) = &self.source {
            write!(f, " ({source})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Outcome of one item that did not deliver.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Failure(#[from] Failure),

    /// Unclassified sink error; aborts the run.
    #[error("fatal I/O error: {0}")]
    Fatal(#[from] io::Error),
}

impl From<FailureKind> for PipelineError {
    fn from(kind: FailureKind) -> Self {
        Self::Failure(kind.into())
    }
}

/// Reason a whole run stopped.
#[derive(Debug, Error)]
pub enum RunError {
    /// There was nothing to download.
    #[error("no tracks to download")]
    Empty,

    /// A single-track run failed.
    #[error(transparent)]
    Failed(Failure),

    #[error("fatal I/O error: {0}")]
    Fatal(#[from] io::Error),
}
