//! Production [`Service`] backed by the Deezer gateway, public API and
//! media endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};

use crate::{
    api::Api,
    config::Config,
    credentials::CredentialCache,
    error::{Error, Result},
    format::Format,
    gateway::Gateway,
    protocol::{
        self,
        api::{AlbumData, PlaylistData, TrackRef},
        gateway::{SongData, UserData},
        media,
    },
    service::{ByteStream, Lookup, MediaError, Service},
    track::{Track, TrackId},
};

pub struct Deezer {
    gateway: Gateway,
    api: Api,
}

impl Deezer {
    /// Logs in and returns a ready service handle.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unauthenticated` if the `arl` is invalid, or the error
    /// of setting up the clients.
    pub async fn connect(config: &Config, cache: Arc<dyn CredentialCache>) -> Result<Self> {
        let mut gateway = Gateway::new(config, cache)?;
        gateway.login().await?;

        Ok(Self {
            gateway,
            api: Api::new(config)?,
        })
    }

    /// # Errors
    ///
    /// Never fails after [`connect`](Self::connect).
    pub fn user_data(&self) -> Result<&UserData> {
        self.gateway.user_data()
    }

    /// Whether the account's subscription covers `format`.
    fn is_licensed(user: &UserData, format: Format) -> bool {
        if format.is_lossless() {
            user.can_stream_lossless()
        } else if format == Format::MP3_320 {
            user.can_stream_hq()
        } else {
            true
        }
    }
}

#[async_trait]
impl Service for Deezer {
    async fn track(&self, id: TrackId) -> Result<SongData> {
        self.gateway.song_data(id).await
    }

    async fn track_info(&self, lookup: &Lookup) -> Result<Option<TrackRef>> {
        match lookup {
            Lookup::Id(id) => self.api.track(*id).await,
            Lookup::Isrc(isrc) => self.api.track_by_isrc(isrc).await,
        }
    }

    async fn album(&self, id: u64) -> Result<Option<AlbumData>> {
        self.api.album(id).await
    }

    async fn playlist(&self, id: u64) -> Result<Option<PlaylistData>> {
        self.api.playlist(id).await
    }

    async fn search_track(
        &self,
        artist: &str,
        title: &str,
        album: &str,
    ) -> Result<Option<TrackId>> {
        self.api.search_track(artist, title, album).await
    }

    async fn media_url(
        &self,
        track: &Track,
        format: Format,
    ) -> std::result::Result<Option<String>, MediaError> {
        let user = self.gateway.user_data()?;

        // Checked up front: the endpoint does not distinguish a missing
        // license from a missing format.
        if !Self::is_licensed(user, format) {
            return Err(MediaError::WrongLicense(format));
        }

        if track.track_token.is_empty() {
            debug!("{track}: no track token");
            return Ok(None);
        }

        let url = user.media_url.join("v1/get_url").map_err(Error::from)?;
        let request = media::Request::full(user.license_token(), &track.track_token, format);
        let body = serde_json::to_string(&request).map_err(Error::from)?;

        let http_client = self.gateway.http_client();
        let body = http_client
            .execute(http_client.post(url, body))
            .await?
            .error_for_status()
            .map_err(Error::from)?
            .text()
            .await
            .map_err(Error::from)?;
        let response: media::Response = protocol::json(&body, "media/get_url")?;

        if let Some(error) = response.error() {
            if error.code == media::WRONG_GEOLOCATION {
                return Err(MediaError::WrongGeolocation {
                    country: user.country.clone(),
                });
            }

            debug!("{track}: {format} not available: {error}");
            return Ok(None);
        }

        Ok(response.url().map(str::to_owned))
    }

    async fn open(&self, url: &str) -> Result<ByteStream> {
        let response = self
            .gateway
            .http_client()
            .unlimited
            .get(url)
            .send()
            .await?
            .error_for_status()?;

        if let Some(length) = response.content_length() {
            trace!("stream length: {length} bytes");
        }

        Ok(response.bytes_stream().map_err(Error::from).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(options: &str) -> UserData {
        serde_json::from_str(&format!(
            r#"{{"USER": {{"USER_ID": "1", "OPTIONS": {options}}}, "checkForm": "t"}}"#
        ))
        .unwrap()
    }

    #[test]
    fn licensing_by_format() {
        let free = user("{}");
        assert!(Deezer::is_licensed(&free, Format::MP3_128));
        assert!(Deezer::is_licensed(&free, Format::MP3_MISC));
        assert!(!Deezer::is_licensed(&free, Format::MP3_320));
        assert!(!Deezer::is_licensed(&free, Format::FLAC));
        assert!(!Deezer::is_licensed(&free, Format::MP4_RA3));

        let premium = user(r#"{"web_hq": true}"#);
        assert!(Deezer::is_licensed(&premium, Format::MP3_320));
        assert!(!Deezer::is_licensed(&premium, Format::FLAC));

        let hifi = user(r#"{"web_hq": true, "mobile_lossless": true}"#);
        assert!(Deezer::is_licensed(&hifi, Format::FLAC));
        assert!(Deezer::is_licensed(&hifi, Format::MP4_RA1));
    }
}
