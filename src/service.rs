//! The authenticated service handle the pipeline runs against.
//!
//! [`Service`] is the seam between the pipeline and Deezer. The production
//! implementation is [`crate::deezer::Deezer`]; tests substitute an
//! in-memory catalog.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use thiserror::Error;

use crate::{
    error::{Error, Result},
    format::Format,
    protocol::{
        api::{AlbumData, PlaylistData, TrackRef},
        gateway::SongData,
    },
    track::{Track, TrackId},
};

/// Body of a stream transfer.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// How to look up a track in the public catalog.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Lookup {
    Id(TrackId),
    Isrc(String),
}

/// Rejections of a media URL request.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The account's subscription does not cover the format.
    #[error("license does not allow streaming {0}")]
    WrongLicense(Format),

    /// The track may not be streamed from the session's country.
    #[error("track not available in {country}")]
    WrongGeolocation { country: String },

    #[error(transparent)]
    Other(#[from] Error),
}

#[async_trait]
pub trait Service: Send + Sync {
    /// Gateway metadata of a track, including its content hash and tokens.
    async fn track(&self, id: TrackId) -> Result<SongData>;

    /// Public catalog entry of a track, `None` if it does not exist.
    async fn track_info(&self, lookup: &Lookup) -> Result<Option<TrackRef>>;

    /// An album with its track list, `None` if it does not exist.
    async fn album(&self, id: u64) -> Result<Option<AlbumData>>;

    /// A playlist with its track list, `None` if it does not exist.
    async fn playlist(&self, id: u64) -> Result<Option<PlaylistData>>;

    /// Finds a track by its metadata.
    async fn search_track(&self, artist: &str, title: &str, album: &str)
        -> Result<Option<TrackId>>;

    /// Resolves the stream URL of `track` at `format`.
    ///
    /// `Ok(None)` means the format is not available for this track.
    async fn media_url(
        &self,
        track: &Track,
        format: Format,
    ) -> std::result::Result<Option<String>, MediaError>;

    /// Starts the transfer of a stream URL.
    async fn open(&self, url: &str) -> Result<ByteStream>;
}
