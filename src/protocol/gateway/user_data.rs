//! User data from the `deezer.getUserData` gateway method.
//!
//! # Wire Format
//!
//! ```json
//! {
//!     "USER": {
//!         "USER_ID": "123456789",
//!         "BLOG_NAME": "Username",
//!         "OPTIONS": {
//!             "license_token": "secret",
//!             "web_hq": true,
//!             "mobile_hq": true,
//!             "web_lossless": false,
//!             "mobile_lossless": false
//!         }
//!     },
//!     "checkForm": "api_token",
//!     "COUNTRY": "NL",
//!     "URL_MEDIA": "https://media.deezer.com"
//! }
//! ```
//!
//! Without a valid session, the same method answers with a `USER_ID` of `0`
//! and several string fields typed as integers.

use std::{ops::Deref, str::FromStr};

use serde::Deserialize;
use serde_with::{serde_as, DefaultOnError, DisplayFromStr, PickFirst};
use url::Url;
use veil::Redact;

use super::Method;

impl Method for UserData {
    const METHOD: &'static str = "deezer.getUserData";
}

/// Session and account capabilities.
#[serde_as]
#[derive(Clone, Eq, PartialEq, Deserialize, Redact, Hash)]
pub struct UserData {
    #[serde(rename = "USER")]
    pub user: User,

    /// API token to pass with every subsequent gateway call.
    #[serde(rename = "checkForm")]
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    #[redact]
    pub api_token: String,

    /// Country the session is located in.
    #[serde(rename = "COUNTRY", default)]
    #[serde_as(as = "DefaultOnError")]
    pub country: String,

    #[serde(rename = "URL_MEDIA", default)]
    #[serde_as(as = "DefaultOnError")]
    pub media_url: MediaUrl,
}

impl UserData {
    /// Whether the session is logged in to an account.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.user.id != 0
    }

    /// Whether the account may stream 320 kbps MP3.
    #[must_use]
    pub fn can_stream_hq(&self) -> bool {
        self.user.options.web_hq || self.user.options.mobile_hq
    }

    /// Whether the account may stream FLAC and 360 Reality Audio.
    #[must_use]
    pub fn can_stream_lossless(&self) -> bool {
        self.user.options.web_lossless || self.user.options.mobile_lossless
    }

    #[must_use]
    pub fn license_token(&self) -> &str {
        &self.user.options.license_token
    }
}

/// Account profile.
#[serde_as]
#[derive(Clone, Eq, PartialEq, Deserialize, Debug, Hash)]
pub struct User {
    /// Zero for anonymous sessions.
    #[serde(rename = "USER_ID")]
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub id: u64,

    #[serde(rename = "BLOG_NAME", default)]
    #[serde_as(as = "DefaultOnError")]
    pub name: String,

    #[serde(rename = "OPTIONS", default)]
    #[serde_as(as = "DefaultOnError")]
    pub options: Options,
}

/// Streaming rights of the account.
#[serde_as]
#[derive(Clone, Default, Eq, PartialEq, Deserialize, Redact, Hash)]
pub struct Options {
    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    #[redact]
    pub license_token: String,

    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub web_hq: bool,

    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub mobile_hq: bool,

    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub web_lossless: bool,

    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub mobile_lossless: bool,
}

/// Media server URL, `https://media.deezer.com` unless the session says
/// otherwise.
#[derive(Clone, Eq, PartialEq, Deserialize, Debug, Hash)]
pub struct MediaUrl(pub Url);

impl Deref for MediaUrl {
    type Target = Url;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Default for MediaUrl {
    fn default() -> Self {
        let media_url = Url::from_str("https://media.deezer.com").expect("invalid media url");
        Self(media_url)
    }
}
