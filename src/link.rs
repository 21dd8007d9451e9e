//! Parsing of the links accepted on the command line.
//!
//! Accepted forms:
//! * `https://www.deezer.com/[lang/]track/{id}`, likewise for `album` and
//!   `playlist`, with or without scheme and `www.`
//! * a bare numeric track id
//! * `isrc:{code}` or a bare ISRC code such as `GBAYE0601498`

use std::{fmt, str::FromStr, sync::LazyLock};

use regex_lite::Regex;

use crate::{
    error::{Error, Result},
    track::TrackId,
};

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:www\.)?deezer\.com/(?:[a-z]{2}(?:-[a-z]{2})?/)?(track|album|playlist)/(\d+)/?(?:[?#].*)?$",
    )
    .expect("invalid link pattern")
});

static ISRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}[A-Z0-9]{3}\d{7}$").expect("invalid ISRC pattern"));

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Link {
    Track(TrackId),
    Isrc(String),
    Album(u64),
    Playlist(u64),
}

impl FromStr for Link {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();

        if let Some(captures) = URL.captures(s) {
            let id = &captures[2];
            return match &captures[1] {
                "track" => id
                    .parse()
                    .map(Self::Track)
                    .map_err(|_| Error::invalid_argument(format!("invalid track id in {s}"))),
                "album" => Ok(Self::Album(id.parse()?)),
                _ => Ok(Self::Playlist(id.parse()?)),
            };
        }

        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            return s
                .parse()
                .map(Self::Track)
                .map_err(|_| Error::invalid_argument(format!("invalid track id {s}")));
        }

        let isrc = s
            .strip_prefix("isrc:")
            .or_else(|| s.strip_prefix("ISRC:"))
            .unwrap_or(s)
            .to_ascii_uppercase();
        if ISRC.is_match(&isrc) {
            return Ok(Self::Isrc(isrc));
        }

        Err(Error::invalid_argument(format!("unsupported link: {s}")))
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Track(id) => write!(f, "track/{id}"),
            Self::Isrc(isrc) => write!(f, "isrc:{isrc}"),
            Self::Album(id) => write!(f, "album/{id}"),
            Self::Playlist(id) => write!(f, "playlist/{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls() {
        let link: Link = "https://www.deezer.com/en/track/3135556".parse().unwrap();
        assert_eq!(link, Link::Track(TrackId::new(3_135_556).unwrap()));

        let link: Link = "deezer.com/album/302127?utm=x".parse().unwrap();
        assert_eq!(link, Link::Album(302_127));

        let link: Link = "https://www.deezer.com/pt-br/playlist/908622995/".parse().unwrap();
        assert_eq!(link, Link::Playlist(908_622_995));
    }

    #[test]
    fn bare_ids_and_isrcs() {
        assert_eq!(
            "12345".parse::<Link>().unwrap(),
            Link::Track(TrackId::new(12345).unwrap())
        );
        assert_eq!(
            "isrc:gbaye0601498".parse::<Link>().unwrap(),
            Link::Isrc("GBAYE0601498".to_owned())
        );
        assert_eq!(
            "USUM71703861".parse::<Link>().unwrap(),
            Link::Isrc("USUM71703861".to_owned())
        );
    }

    #[test]
    fn rejects_others() {
        assert!("0".parse::<Link>().is_err());
        assert!("https://www.deezer.com/track/0".parse::<Link>().is_err());
        assert!("https://www.deezer.com/artist/27".parse::<Link>().is_err());
        assert!("https://open.spotify.com/track/abc".parse::<Link>().is_err());
        assert!("".parse::<Link>().is_err());
    }
}
