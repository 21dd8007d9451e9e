//! Track identity and the resolved track descriptor.
//!
//! A [`Track`] is built once per item, right before it is streamed, from the
//! gateway's song data and the album it belongs to. Negotiation later fills
//! in the chosen [`Format`] and its URL; everything else stays as built.

use std::{collections::BTreeMap, fmt, num::NonZeroI64, str::FromStr, time::Duration};

use serde::{Deserialize, Deserializer, Serialize};
use veil::Redact;

use crate::{
    error::{Error, Result},
    format::Format,
    protocol::{
        api::{AlbumData, PlaylistData, TrackRef},
        gateway::SongData,
    },
};

/// Non-zero Deezer track identifier.
///
/// Positive ids are catalog tracks; negative ids are user uploads. Zero is
/// how the service says "not on Deezer" and cannot be represented.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TrackId(NonZeroI64);

impl TrackId {
    #[must_use]
    pub fn new(id: i64) -> Option<Self> {
        NonZeroI64::new(id).map(Self)
    }

    /// Interprets any representation the APIs use for an id.
    ///
    /// Empty, zero and non-numeric values all mean "no track".
    #[must_use]
    pub fn lenient(value: &str) -> Option<Self> {
        value.trim().parse::<i64>().ok().and_then(Self::new)
    }

    #[must_use]
    pub fn get(self) -> i64 {
        self.0.get()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TrackId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let id = s.trim().parse::<i64>()?;
        Self::new(id).ok_or_else(|| Error::invalid_argument("track id is zero"))
    }
}

/// Deserializes an id that may be a number, a string, `null` or missing.
///
/// Anything that does not denote a non-zero integer becomes `None`.
///
/// # Errors
///
/// Never fails on well-formed JSON.
pub fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<Option<TrackId>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Integer(i64),
        Float(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    let id = match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Integer(id)) => TrackId::new(id),
        #[allow(clippy::cast_possible_truncation)]
        Some(Raw::Float(id)) if id.fract() == 0.0 => TrackId::new(id as i64),
        Some(Raw::Text(id)) => TrackId::lenient(&id),
        Some(Raw::Float(_) | Raw::Other(_)) | None => None,
    };

    Ok(id)
}

/// Identity of an item as far as it is known, for events and reports.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TrackInfo {
    pub id: Option<TrackId>,
    pub title: String,
    pub artist: String,
}

impl From<&TrackRef> for TrackInfo {
    fn from(track: &TrackRef) -> Self {
        Self {
            id: track.id,
            title: track.title.clone(),
            artist: track.artist.name.clone(),
        }
    }
}

impl From<&Track> for TrackInfo {
    fn from(track: &Track) -> Self {
        Self {
            id: Some(track.id),
            title: track.title.clone(),
            artist: track.artist.clone(),
        }
    }
}

impl fmt::Display for TrackInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{id}: \"{} - {}\"", self.artist, self.title),
            None => write!(f, "\"{} - {}\"", self.artist, self.title),
        }
    }
}

/// Album context of a track.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Album {
    pub id: u64,
    pub title: String,
    pub artist: String,

    /// Bitrate the album's track was negotiated at.
    pub bitrate: Option<Format>,
}

impl From<&AlbumData> for Album {
    fn from(album: &AlbumData) -> Self {
        Self {
            id: album.id,
            title: album.title.clone(),
            artist: album.artist.name.clone(),
            bitrate: None,
        }
    }
}

/// A fully resolved track, ready for negotiation and streaming.
#[derive(Clone, PartialEq, Eq, Redact)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub album: Album,

    /// Title of the playlist the track was reached through.
    pub playlist: Option<String>,

    /// Content hash. Never empty for a built track.
    pub md5: String,
    pub media_version: String,

    #[redact]
    pub track_token: String,

    pub duration: Duration,

    /// Size of the encoded file per format. Formats that are not encoded are
    /// absent.
    pub filesizes: BTreeMap<Format, u64>,

    /// Stream URLs that negotiation resolved.
    #[redact]
    pub urls: BTreeMap<Format, String>,

    /// Alternative track the service offers when this one is not encoded.
    pub fallback_id: Option<TrackId>,

    /// Negotiated bitrate.
    pub bitrate: Option<Format>,

    /// The track was located through a metadata search rather than by id.
    pub searched: bool,
}

impl Track {
    /// Builds a track from gateway song data with a non-empty content hash.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the song has no id or no content hash.
    pub fn new(
        song: &SongData,
        album: &AlbumData,
        playlist: Option<&PlaylistData>,
    ) -> Result<Self> {
        let id = song
            .id
            .ok_or_else(|| Error::not_found("song data has no track id"))?;
        let md5 = song
            .md5
            .as_deref()
            .filter(|md5| !md5.is_empty())
            .ok_or_else(|| Error::not_found(format!("track {id} has no content hash")))?;

        let title = if song.version.is_empty() || song.title.contains(&song.version) {
            song.title.clone()
        } else {
            format!("{} {}", song.title, song.version)
        };

        let filesizes = Format::ALL
            .into_iter()
            .filter_map(|format| {
                let size = song.filesizes.get(format);
                (size > 0).then_some((format, size))
            })
            .collect();

        Ok(Self {
            id,
            title,
            artist: song.artist.clone(),
            album: Album::from(album),
            playlist: playlist.map(|playlist| playlist.title.clone()),
            md5: md5.to_owned(),
            media_version: song.media_version.clone(),
            track_token: song.track_token.clone(),
            duration: song.duration,
            filesizes,
            urls: BTreeMap::new(),
            fallback_id: song.fallback.as_ref().and_then(|fallback| fallback.id),
            bitrate: None,
            searched: false,
        })
    }

    /// Encoded size for `format`, zero if not encoded.
    #[must_use]
    pub fn filesize(&self, format: Format) -> u64 {
        self.filesizes.get(&format).copied().unwrap_or_default()
    }

    /// Records the negotiated bitrate on the track and its album.
    pub fn set_bitrate(&mut self, format: Format) {
        self.bitrate = Some(format);
        self.album.bitrate = Some(format);
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: \"{} - {}\"", self.id, self.artist, self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "lenient_id")]
        id: Option<TrackId>,
    }

    fn id_of(json: &str) -> Option<i64> {
        serde_json::from_str::<Holder>(json)
            .unwrap()
            .id
            .map(TrackId::get)
    }

    #[test]
    fn lenient_ids() {
        assert_eq!(id_of(r#"{"id": 3135556}"#), Some(3_135_556));
        assert_eq!(id_of(r#"{"id": "3135556"}"#), Some(3_135_556));
        assert_eq!(id_of(r#"{"id": -12}"#), Some(-12));
        assert_eq!(id_of(r#"{"id": 0}"#), None);
        assert_eq!(id_of(r#"{"id": "0"}"#), None);
        assert_eq!(id_of(r#"{"id": ""}"#), None);
        assert_eq!(id_of(r#"{"id": "abc"}"#), None);
        assert_eq!(id_of(r#"{"id": null}"#), None);
        assert_eq!(id_of(r#"{"id": false}"#), None);
        assert_eq!(id_of("{}"), None);
    }

    #[test]
    fn strict_parse_rejects_zero() {
        assert!("0".parse::<TrackId>().is_err());
        assert!("x".parse::<TrackId>().is_err());
        assert_eq!("42".parse::<TrackId>().unwrap().get(), 42);
    }

    #[test]
    fn builds_from_song_data() {
        let song: SongData = serde_json::from_str(
            r#"{
                "SNG_ID": "12345",
                "SNG_TITLE": "Song",
                "VERSION": "(Live)",
                "ART_NAME": "Artist",
                "ALB_ID": "302127",
                "ALB_TITLE": "Album",
                "MD5_ORIGIN": "abc123",
                "MEDIA_VERSION": "8",
                "TRACK_TOKEN": "secret-token",
                "DURATION": "215",
                "FILESIZE_MP3_128": "3440000",
                "FILESIZE_MP3_320": 0,
                "FILESIZE_FLAC": ""
            }"#,
        )
        .unwrap();
        let album: AlbumData =
            serde_json::from_str(r#"{"id": 302127, "title": "Album", "artist": {"name": "Artist"}}"#)
                .unwrap();

        let mut track = Track::new(&song, &album, None).unwrap();
        assert_eq!(track.to_string(), "12345: \"Artist - Song (Live)\"");
        assert_eq!(track.duration, Duration::from_secs(215));
        assert_eq!(track.filesize(Format::MP3_128), 3_440_000);
        assert_eq!(track.filesize(Format::MP3_320), 0);
        assert_eq!(track.filesize(Format::FLAC), 0);
        assert!(!format!("{track:?}").contains("secret-token"));

        track.set_bitrate(Format::MP3_128);
        assert_eq!(track.album.bitrate, Some(Format::MP3_128));
    }
}
