//! Static catalog of the audio formats Deezer serves.
//!
//! Every format has three identities:
//! * a numeric service code, as used by the legacy stream URLs and user
//!   settings (`3` for 320 kbps MP3, `9` for FLAC, ...)
//! * a format name, as used by the media API and the `FILESIZE_*` fields of
//!   the gateway (`"MP3_320"`, `"FLAC"`, ...)
//! * a file extension for the bytes it produces
//!
//! # Ladders
//!
//! Bitrate negotiation degrades along a ladder ordered from best to worst
//! quality. Stereo formats share [`LADDER`]; the 360 Reality Audio formats
//! live on their own [`LADDER_360`] and never mix with the stereo ladder.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Audio format and quality level.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize,
)]
#[expect(non_camel_case_types)]
#[serde(try_from = "String", into = "String")]
#[repr(u8)]
pub enum Format {
    /// MP3 of unknown or mixed bitrate (0). Used as last resort.
    MP3_MISC = 0,
    /// 128 kbps MP3 (1)
    #[default]
    MP3_128 = 1,
    /// 320 kbps MP3 (3)
    MP3_320 = 3,
    /// FLAC lossless (9)
    FLAC = 9,
    /// 360 Reality Audio, low quality (13)
    MP4_RA1 = 13,
    /// 360 Reality Audio, medium quality (14)
    MP4_RA2 = 14,
    /// 360 Reality Audio, high quality (15)
    MP4_RA3 = 15,
}

/// Stereo formats from best to worst.
pub const LADDER: [Format; 4] = [
    Format::FLAC,
    Format::MP3_320,
    Format::MP3_128,
    Format::MP3_MISC,
];

/// 360 Reality Audio formats from best to worst.
pub const LADDER_360: [Format; 3] = [Format::MP4_RA3, Format::MP4_RA2, Format::MP4_RA1];

impl Format {
    /// All formats known to the catalog.
    pub const ALL: [Format; 7] = [
        Format::MP3_MISC,
        Format::MP3_128,
        Format::MP3_320,
        Format::FLAC,
        Format::MP4_RA1,
        Format::MP4_RA2,
        Format::MP4_RA3,
    ];

    /// Numeric service code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Service format name, e.g. `"MP3_320"`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MP3_MISC => "MP3_MISC",
            Self::MP3_128 => "MP3_128",
            Self::MP3_320 => "MP3_320",
            Self::FLAC => "FLAC",
            Self::MP4_RA1 => "MP4_RA1",
            Self::MP4_RA2 => "MP4_RA2",
            Self::MP4_RA3 => "MP4_RA3",
        }
    }

    /// File extension including the leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::MP3_MISC | Self::MP3_128 | Self::MP3_320 => ".mp3",
            Self::FLAC => ".flac",
            Self::MP4_RA1 | Self::MP4_RA2 | Self::MP4_RA3 => ".mp4",
        }
    }

    /// Whether this is a 360 Reality Audio format.
    #[must_use]
    pub const fn is_360(self) -> bool {
        matches!(self, Self::MP4_RA1 | Self::MP4_RA2 | Self::MP4_RA3)
    }

    /// Whether the account needs lossless streaming rights for this format.
    #[must_use]
    pub const fn is_lossless(self) -> bool {
        matches!(self, Self::FLAC) || self.is_360()
    }

    /// Quality rank within the format's own ladder; higher is better.
    ///
    /// Ranks are only comparable between formats for which
    /// [`is_360`](Self::is_360) agrees.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::MP3_MISC | Self::MP4_RA1 => 0,
            Self::MP3_128 | Self::MP4_RA2 => 1,
            Self::MP3_320 | Self::MP4_RA3 => 2,
            Self::FLAC => 3,
        }
    }

    /// The ladder this format belongs to.
    #[must_use]
    pub fn ladder(self) -> &'static [Format] {
        if self.is_360() {
            &LADDER_360
        } else {
            &LADDER
        }
    }

    /// Formats strictly below this one on its ladder, best first.
    #[must_use]
    pub fn below(self) -> impl Iterator<Item = Format> {
        self.ladder()
            .iter()
            .copied()
            .filter(move |format| format.rank() < self.rank())
    }

    /// Looks up a format by its numeric service code.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|format| format.code() == code)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses format names, numeric codes and user-friendly aliases.
///
/// ```rust
/// use dzstream::format::Format;
///
/// assert_eq!("MP3_320".parse::<Format>()?, Format::MP3_320);
/// assert_eq!("320".parse::<Format>()?, Format::MP3_320);
/// assert_eq!("flac".parse::<Format>()?, Format::FLAC);
/// assert_eq!("9".parse::<Format>()?, Format::FLAC);
/// ```
impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(number) = s.parse::<u16>() {
            // Bare bitrates are accepted next to service codes. They do not
            // overlap: service codes stop at 15.
            let format = match number {
                128 => Some(Self::MP3_128),
                320 => Some(Self::MP3_320),
                code => u8::try_from(code).ok().and_then(Self::from_code),
            };
            return format
                .ok_or_else(|| Error::invalid_argument(format!("unknown format code {number}")));
        }

        let format = match s.to_ascii_lowercase().as_str() {
            "mp3_misc" | "misc" | "default" => Self::MP3_MISC,
            "mp3_128" | "mp3-128" | "128k" => Self::MP3_128,
            "mp3_320" | "mp3-320" | "320k" => Self::MP3_320,
            "flac" | "lossless" => Self::FLAC,
            "mp4_ra1" | "360_lq" => Self::MP4_RA1,
            "mp4_ra2" | "360_mq" => Self::MP4_RA2,
            "mp4_ra3" | "360_hq" => Self::MP4_RA3,
            _ => return Err(Error::invalid_argument(format!("unknown format {s}"))),
        };

        Ok(format)
    }
}

impl TryFrom<String> for Format {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Format> for String {
    fn from(format: Format) -> Self {
        format.name().to_owned()
    }
}
