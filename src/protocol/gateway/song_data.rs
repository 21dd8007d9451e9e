//! Song metadata from the `song.getData` gateway method.
//!
//! # Wire Format
//!
//! ```json
//! {
//!     "SNG_ID": "3135556",
//!     "SNG_TITLE": "Harder, Better, Faster, Stronger",
//!     "VERSION": "",
//!     "ART_NAME": "Daft Punk",
//!     "ALB_ID": "302127",
//!     "ALB_TITLE": "Discovery",
//!     "MD5_ORIGIN": "51afcde9f56a132096c0496cc95eb24b",
//!     "MEDIA_VERSION": "8",
//!     "TRACK_TOKEN": "...",
//!     "DURATION": "224",
//!     "FILESIZE_MP3_128": "3585695",
//!     "FILESIZE_MP3_320": "8964236",
//!     "FILESIZE_FLAC": "26069843",
//!     "FALLBACK": { "SNG_ID": "...", ... }
//! }
//! ```
//!
//! Numbers come as strings or integers depending on the endpoint revision,
//! and unencoded formats as `"0"`, `0` or `""`. All are accepted.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{
    formats::Flexible, serde_as, DefaultOnError, DisplayFromStr, DurationSeconds, PickFirst,
};
use veil::Redact;

use super::Method;
use crate::{
    format::Format,
    track::{lenient_id, TrackId},
};

impl Method for SongData {
    const METHOD: &'static str = "song.getData";
}

/// Request body of `song.getData`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SongQuery {
    #[serde(rename = "sng_id")]
    pub id: TrackId,
}

/// Gateway song metadata.
#[serde_as]
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Redact)]
pub struct SongData {
    /// `None` when the service reports no id or an id of zero.
    #[serde(rename = "SNG_ID", default, deserialize_with = "lenient_id")]
    pub id: Option<TrackId>,

    #[serde(rename = "SNG_TITLE", default)]
    pub title: String,

    /// Version suffix such as "(Live)" or "(Remastered)".
    #[serde(rename = "VERSION", default)]
    pub version: String,

    #[serde(rename = "ART_NAME", default)]
    pub artist: String,

    #[serde(rename = "ALB_ID", default)]
    #[serde_as(as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub album_id: u64,

    #[serde(rename = "ALB_TITLE", default)]
    pub album_title: String,

    /// Content hash.
    ///
    /// Absent when the session may not see it, which means it is not logged
    /// in. Empty when the track is not encoded.
    #[serde(rename = "MD5_ORIGIN", default)]
    pub md5: Option<String>,

    #[serde(rename = "MEDIA_VERSION", default)]
    #[serde_as(as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub media_version: String,

    #[serde(rename = "TRACK_TOKEN", default)]
    #[redact]
    pub track_token: String,

    #[serde(rename = "DURATION", default)]
    #[serde_as(as = "DefaultOnError<DurationSeconds<String, Flexible>>")]
    pub duration: Duration,

    #[serde(flatten)]
    pub filesizes: FileSizes,

    /// Alternative version of the same recording.
    #[serde(rename = "FALLBACK", default)]
    #[serde_as(as = "DefaultOnError")]
    pub fallback: Option<Box<SongData>>,
}

/// Encoded file size per format in bytes, zero when not encoded.
#[serde_as]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct FileSizes {
    #[serde(rename = "FILESIZE_MP3_MISC", default)]
    #[serde_as(as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub mp3_misc: u64,

    #[serde(rename = "FILESIZE_MP3_128", default)]
    #[serde_as(as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub mp3_128: u64,

    #[serde(rename = "FILESIZE_MP3_320", default)]
    #[serde_as(as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub mp3_320: u64,

    #[serde(rename = "FILESIZE_FLAC", default)]
    #[serde_as(as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub flac: u64,

    #[serde(rename = "FILESIZE_MP4_RA1", default)]
    #[serde_as(as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub mp4_ra1: u64,

    #[serde(rename = "FILESIZE_MP4_RA2", default)]
    #[serde_as(as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub mp4_ra2: u64,

    #[serde(rename = "FILESIZE_MP4_RA3", default)]
    #[serde_as(as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub mp4_ra3: u64,
}

impl FileSizes {
    #[must_use]
    pub fn get(&self, format: Format) -> u64 {
        match format {
            Format::MP3_MISC => self.mp3_misc,
            Format::MP3_128 => self.mp3_128,
            Format::MP3_320 => self.mp3_320,
            Format::FLAC => self.flac,
            Format::MP4_RA1 => self.mp4_ra1,
            Format::MP4_RA2 => self.mp4_ra2,
            Format::MP4_RA3 => self.mp4_ra3,
        }
    }

    pub fn set(&mut self, format: Format, size: u64) {
        let field = match format {
            Format::MP3_MISC => &mut self.mp3_misc,
            Format::MP3_128 => &mut self.mp3_128,
            Format::MP3_320 => &mut self.mp3_320,
            Format::FLAC => &mut self.flac,
            Format::MP4_RA1 => &mut self.mp4_ra1,
            Format::MP4_RA2 => &mut self.mp4_ra2,
            Format::MP4_RA3 => &mut self.mp4_ra3,
        };
        *field = size;
    }
}
