//! Public REST API types (`api.deezer.com`).
//!
//! Responses are plain JSON objects. Failures come back with status `200`
//! and an `error` object instead of the data:
//!
//! ```json
//! { "error": { "type": "DataException", "message": "no data", "code": 800 } }
//! ```

use std::fmt;

use serde::Deserialize;
use serde_with::{serde_as, DefaultOnError};

use crate::track::{lenient_id, TrackId};

/// Envelope of every public API response.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Response<T> {
    Error { error: Error },
    Data(T),
}

/// Error object of the public API.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Error {
    #[serde(rename = "type", default)]
    pub typ: String,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub code: i64,
}

impl Error {
    /// `DataException` means the object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.typ == "DataException"
    }

    /// Quota errors ask the client to slow down.
    #[must_use]
    pub fn is_quota(&self) -> bool {
        self.typ == "Exception" && self.code == 4
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.typ, self.message, self.code)
    }
}

impl std::error::Error for Error {}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ArtistRef {
    #[serde(default)]
    pub id: u64,

    #[serde(default)]
    pub name: String,
}

#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AlbumRef {
    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub id: u64,

    #[serde(default)]
    pub title: String,
}

/// Track as listed by the public API.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TrackRef {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<TrackId>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub isrc: String,

    #[serde(default)]
    pub duration: u64,

    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub artist: ArtistRef,

    /// Absent in album track lists, where the album is the context.
    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub album: Option<AlbumRef>,
}

/// Page of a track list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TrackList {
    #[serde(default)]
    pub data: Vec<TrackRef>,

    #[serde(default)]
    pub total: usize,

    /// URL of the next page.
    #[serde(default)]
    pub next: Option<String>,
}

#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AlbumData {
    pub id: u64,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub artist: ArtistRef,

    #[serde(default)]
    pub nb_tracks: usize,

    #[serde(default)]
    pub tracks: TrackList,
}

#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct PlaylistData {
    pub id: u64,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub creator: ArtistRef,

    #[serde(default)]
    pub nb_tracks: usize,

    #[serde(default)]
    pub tracks: TrackList,
}
