//! Application configuration, run settings and secrets.
//!
//! * [`Config`] holds the application identity and credentials used to talk
//!   to Deezer.
//! * [`Settings`] holds the user preferences for bitrate negotiation.
//! * [`Secrets`] is the on-disk secrets file.
//!
//! # Secrets file
//!
//! ```toml
//! arl = "..."
//! bf_secret = "..."  # optional, 16 bytes
//! ```

use std::{fs, path::Path};

use serde::Deserialize;
use veil::Redact;

use crate::{
    arl::Arl,
    decrypt::Key,
    error::{Error, Result},
    format::Format,
};

/// Application identity and credentials.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Config {
    pub app_name: String,
    pub app_version: String,
    pub app_lang: String,

    pub user_agent: String,

    pub arl: Arl,

    /// Secret to derive per-track decryption keys from. Without it, streams
    /// are written as delivered.
    pub bf_secret: Option<Key>,
}

impl Config {
    /// Creates a configuration for the given credential.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if no valid `User-Agent` can be built
    /// from the package metadata and the OS name and version.
    pub fn with_arl(arl: Arl) -> Result<Self> {
        let app_name = env!("CARGO_PKG_NAME").to_owned();
        let app_version = env!("CARGO_PKG_VERSION").to_owned();
        let app_lang = "en".to_owned();

        // Additional `User-Agent` string checks on top of `reqwest::HeaderValue`.
        let illegal_chars = |chr| chr == '/' || chr == ';';
        if app_name.contains(illegal_chars)
            || app_version.contains(illegal_chars)
            || app_lang.chars().count() != 2
        {
            return Err(Error::invalid_argument(format!(
                "application name, version and/or language invalid (\"{app_name}\"; \"{app_version}\"; \"{app_lang}\")"
            )));
        }

        let os_name = match std::env::consts::OS {
            "macos" => "osx",
            other => other,
        };
        let os_version = sysinfo::System::os_version()
            .filter(|version| !version.is_empty() && !version.contains(illegal_chars))
            .unwrap_or_else(|| String::from("0"));

        let user_agent =
            format!("{app_name}/{app_version} (Rust; {os_name}/{os_version}; Desktop; {app_lang})");
        trace!("user agent: {user_agent}");

        Ok(Self {
            app_name,
            app_version,
            app_lang,
            user_agent,
            arl,
            bf_secret: None,
        })
    }
}

/// Preferences for bitrate negotiation.
///
/// Missing keys take their defaults and unknown keys are ignored, so a
/// settings file can be shared with other tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Bitrate to request first.
    #[serde(alias = "max_bitrate")]
    pub max_bitrate: Format,

    /// Bitrate to try once when the requested one is unavailable and
    /// `feeling_lucky` is off.
    #[serde(alias = "fallback_bitrate")]
    pub fallback_bitrate: Format,

    /// Degrade through every lower bitrate instead of a single fallback.
    #[serde(alias = "feeling_lucky")]
    pub feeling_lucky: bool,

    /// Search by metadata for tracks that are not encoded.
    #[serde(alias = "fallback_search")]
    pub fallback_search: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_bitrate: Format::MP3_320,
            fallback_bitrate: Format::MP3_128,
            feeling_lucky: false,
            fallback_search: false,
        }
    }
}

impl Settings {
    /// Loads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = read_bounded(path.as_ref(), Self::MAX_SIZE)?;
        let settings = toml::from_str(&contents)?;
        debug!("settings: {settings:?}");
        Ok(settings)
    }

    const MAX_SIZE: u64 = 64 * 1024;
}

/// Contents of the secrets file.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Redact)]
pub struct Secrets {
    #[redact]
    pub arl: Option<String>,

    #[redact]
    pub bf_secret: Option<String>,
}

impl Secrets {
    /// The file holds a couple of short values; anything larger is not a
    /// secrets file.
    const MAX_SIZE: u64 = 1024;

    /// Reads the secrets file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is too large or is not
    /// valid TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = read_bounded(path.as_ref(), Self::MAX_SIZE)?;
        toml::from_str(&contents).map_err(Into::into)
    }

    /// The validated credential.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no `arl` is set, or the parse error of an
    /// invalid one.
    pub fn arl(&self) -> Result<Arl> {
        self.arl
            .as_deref()
            .ok_or_else(|| Error::not_found("no arl in secrets file"))?
            .parse()
    }

    /// The validated decryption secret, if set.
    ///
    /// # Errors
    ///
    /// Returns `Error::OutOfRange` if the secret is not 16 bytes.
    pub fn bf_secret(&self) -> Result<Option<Key>> {
        self.bf_secret.as_deref().map(str::parse).transpose()
    }
}

fn read_bounded(path: &Path, max_size: u64) -> Result<String> {
    let size = fs::metadata(path)?.len();
    if size > max_size {
        return Err(Error::out_of_range(format!(
            "{} is {size} bytes but should be at most {max_size}",
            path.display()
        )));
    }

    fs::read_to_string(path).map_err(Into::into)
}
