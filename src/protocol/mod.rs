//! Wire types for the Deezer services.
//!
//! * [`api`] - public REST API (`api.deezer.com`): tracks, albums, playlists, search
//! * [`gateway`] - private gateway (`gw-light.php`): user data and song data
//! * [`media`] - media URL endpoint (`media.deezer.com`)

pub mod api;
pub mod gateway;
pub mod media;

use std::fmt::Debug;

use serde::Deserialize;

use crate::error::Result;

/// Parses and logs JSON responses from Deezer APIs.
///
/// Successful parses are logged at TRACE level. On failure the raw body is
/// logged to help diagnose API changes.
///
/// # Errors
///
/// Returns an error if the body is not valid JSON or does not match `T`.
pub fn json<T>(body: &str, origin: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Debug,
{
    match serde_json::from_str(body) {
        Ok(result) => {
            trace!("{origin}: {result:#?}");
            Ok(result)
        }
        Err(e) => {
            if serde_json::from_str::<serde_json::Value>(body).is_ok() {
                debug!("{origin}: unexpected response structure ({e})");
            } else {
                error!("{origin}: failed parsing response ({e})");
            }
            trace!("{body}");
            Err(e.into())
        }
    }
}
