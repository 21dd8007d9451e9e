//! Media URL endpoint types.
//!
//! `POST {URL_MEDIA}/v1/get_url` exchanges a license token and track tokens
//! for signed stream URLs at the requested formats.
//!
//! # Request
//!
//! ```json
//! {
//!     "license_token": "...",
//!     "media": [{
//!         "type": "FULL",
//!         "formats": [{ "cipher": "BF_CBC_STRIPE", "format": "MP3_320" }]
//!     }],
//!     "track_tokens": ["..."]
//! }
//! ```
//!
//! # Response
//!
//! One `data` entry per track token, holding either media sources or
//! errors:
//!
//! ```json
//! { "data": [{ "media": [{ "format": "MP3_320", "sources": [{ "url": "...", "provider": "ak" }] }] }] }
//! { "data": [{ "errors": [{ "code": 2002, "message": "Track token has no sufficient rights on requested media" }] }] }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use veil::Redact;

use crate::format::Format;

/// Error code for tracks that may not be streamed from the session's
/// country.
pub const WRONG_GEOLOCATION: i64 = 2002;

#[derive(Clone, Eq, PartialEq, Serialize, Redact, Hash)]
pub struct Request {
    #[redact]
    pub license_token: String,

    pub media: Vec<Media>,

    #[redact]
    pub track_tokens: Vec<String>,
}

impl Request {
    /// Requests the full track at a single format.
    #[must_use]
    pub fn full(license_token: &str, track_token: &str, format: Format) -> Self {
        Self {
            license_token: license_token.to_owned(),
            media: vec![Media {
                typ: Type::FULL,
                cipher_formats: vec![CipherFormat {
                    cipher: Cipher::BF_CBC_STRIPE,
                    format,
                }],
            }],
            track_tokens: vec![track_token.to_owned()],
        }
    }
}

#[derive(Clone, Default, Eq, PartialEq, Serialize, Debug, Hash)]
pub struct Media {
    #[serde(rename = "type")]
    pub typ: Type,

    #[serde(rename = "formats")]
    pub cipher_formats: Vec<CipherFormat>,
}

#[derive(
    Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize, Debug, Hash,
)]
pub enum Type {
    #[default]
    FULL,
    PREVIEW,
}

#[derive(Copy, Clone, Default, Eq, PartialEq, Serialize, Debug, Hash)]
pub struct CipherFormat {
    pub cipher: Cipher,
    pub format: Format,
}

#[derive(
    Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize, Debug, Hash,
)]
#[expect(non_camel_case_types)]
pub enum Cipher {
    #[default]
    BF_CBC_STRIPE,
    NONE,
}

#[derive(Clone, Default, Eq, PartialEq, Deserialize, Debug, Hash)]
pub struct Response {
    #[serde(default)]
    pub data: Vec<Data>,
}

impl Response {
    /// First stream URL of the first medium, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.data.iter().find_map(|data| match data {
            Data::Media { media } => media
                .iter()
                .flat_map(|medium| &medium.sources)
                .map(|source| source.url.as_str())
                .find(|url| !url.is_empty()),
            Data::Errors { .. } => None,
        })
    }

    /// First error reported for the request, if any.
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.data.iter().find_map(|data| match data {
            Data::Errors { errors } => errors.first(),
            Data::Media { .. } => None,
        })
    }
}

#[derive(Clone, Eq, PartialEq, Deserialize, Debug, Hash)]
#[serde(untagged)]
pub enum Data {
    Media { media: Vec<Medium> },
    Errors { errors: Vec<Error> },
}

#[derive(Clone, Eq, Default, PartialEq, Deserialize, Debug, Hash)]
pub struct Error {
    pub code: i64,

    #[serde(default)]
    pub message: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for Error {}

#[derive(Clone, Eq, PartialEq, Deserialize, Debug, Hash)]
pub struct Medium {
    #[serde(default)]
    pub media_type: Type,

    pub format: Option<Format>,

    #[serde(default)]
    pub sources: Vec<Source>,
}

#[derive(Clone, Eq, PartialEq, Deserialize, Redact, Hash)]
pub struct Source {
    #[redact]
    pub url: String,

    #[serde(default)]
    pub provider: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_shape() {
        let request = Request::full("lic-secret", "token", Format::FLAC);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["media"][0]["type"], "FULL");
        assert_eq!(json["media"][0]["formats"][0]["cipher"], "BF_CBC_STRIPE");
        assert_eq!(json["media"][0]["formats"][0]["format"], "FLAC");
        assert_eq!(json["track_tokens"][0], "token");
        assert_eq!(json["license_token"], "lic-secret");
        assert!(!format!("{request:?}").contains("lic-secret"));
    }

    #[test]
    fn response_with_sources() {
        let response: Response = serde_json::from_str(
            r#"{"data": [{"media": [{"media_type": "FULL", "format": "MP3_128",
                "sources": [{"url": "https://cdn.example/a", "provider": "ak"}]}]}]}"#,
        )
        .unwrap();
        assert_eq!(response.url(), Some("https://cdn.example/a"));
        assert!(response.error().is_none());
    }

    #[test]
    fn response_with_errors() {
        let response: Response = serde_json::from_str(
            r#"{"data": [{"errors": [{"code": 2002, "message": "no rights"}]}]}"#,
        )
        .unwrap();
        assert_eq!(response.url(), None);
        assert_eq!(response.error().map(|e| e.code), Some(WRONG_GEOLOCATION));
    }
}
