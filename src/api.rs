//! Client for the public Deezer API (`api.deezer.com`).
//!
//! No authentication is needed. Objects that do not exist are reported as
//! `Ok(None)`; everything else the API rejects is an error.

use std::fmt::Debug;

use serde::Deserialize;
use url::Url;

use crate::{
    config::Config,
    error::{Error, Result},
    http::Client as HttpClient,
    protocol::{
        self,
        api::{AlbumData, PlaylistData, Response, TrackList, TrackRef},
    },
    track::TrackId,
};

pub struct Api {
    http_client: HttpClient,
    base_url: Url,
}

impl Api {
    const BASE_URL: &'static str = "https://api.deezer.com/";

    /// Upper bound on pages fetched for a single track list.
    const MAX_PAGES: usize = 100;

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http_client: HttpClient::without_cookies(config)?,
            base_url: Url::parse(Self::BASE_URL)?,
        })
    }

    /// Fetches `path` relative to the API root.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the API reports anything but
    /// a missing object.
    pub async fn get<T>(&self, path: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de> + Debug,
    {
        let url = self.base_url.join(path)?;
        self.get_url(url, path).await
    }

    async fn get_url<T>(&self, url: Url, origin: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de> + Debug,
    {
        let request = self.http_client.get(url);
        let body = self
            .http_client
            .execute(request)
            .await?
            .error_for_status()?
            .text()
            .await?;

        match protocol::json::<Response<T>>(&body, origin)? {
            Response::Data(data) => Ok(Some(data)),
            Response::Error { error } if error.is_not_found() => {
                debug!("{origin}: {error}");
                Ok(None)
            }
            Response::Error { error } if error.is_quota() => Err(Error::resource_exhausted(error)),
            Response::Error { error } => Err(Error::unavailable(error)),
        }
    }

    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn track(&self, id: TrackId) -> Result<Option<TrackRef>> {
        self.get(&format!("track/{id}")).await
    }

    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn track_by_isrc(&self, isrc: &str) -> Result<Option<TrackRef>> {
        self.get(&format!("track/isrc:{isrc}")).await
    }

    /// Fetches an album with its complete track list.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn album(&self, id: u64) -> Result<Option<AlbumData>> {
        let Some(mut album) = self.get::<AlbumData>(&format!("album/{id}")).await? else {
            return Ok(None);
        };

        self.complete(&mut album.tracks, album.nb_tracks).await?;
        Ok(Some(album))
    }

    /// Fetches a playlist with its complete track list.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn playlist(&self, id: u64) -> Result<Option<PlaylistData>> {
        let Some(mut playlist) = self.get::<PlaylistData>(&format!("playlist/{id}")).await? else {
            return Ok(None);
        };

        self.complete(&mut playlist.tracks, playlist.nb_tracks).await?;
        Ok(Some(playlist))
    }

    /// Follows `next` links until the list holds `expected` tracks.
    async fn complete(&self, tracks: &mut TrackList, expected: usize) -> Result<()> {
        let mut next = tracks.next.take();
        let mut pages = 0;

        while tracks.data.len() < expected {
            let Some(url) = next.take() else { break };
            pages += 1;
            if pages > Self::MAX_PAGES {
                warn!("track list truncated at {} of {expected} tracks", tracks.data.len());
                break;
            }

            let url = Url::parse(&url)?;
            let Some(page) = self.get_url::<TrackList>(url, "tracks").await? else {
                break;
            };
            if page.data.is_empty() {
                break;
            }

            tracks.data.extend(page.data);
            next = page.next;
        }

        Ok(())
    }

    /// Searches a track by metadata, most specific query first.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn search_track(
        &self,
        artist: &str,
        title: &str,
        album: &str,
    ) -> Result<Option<TrackId>> {
        let mut queries = Vec::with_capacity(2);
        if !album.is_empty() {
            queries.push(format!(
                "artist:\"{artist}\" track:\"{title}\" album:\"{album}\""
            ));
        }
        queries.push(format!("artist:\"{artist}\" track:\"{title}\""));

        for query in queries {
            let mut url = self.base_url.join("search/track")?;
            url.query_pairs_mut()
                .append_pair("q", &query)
                .append_pair("strict", "on");

            let found = self
                .get_url::<TrackList>(url, "search/track")
                .await?
                .and_then(|results| results.data.into_iter().find_map(|track| track.id));
            if found.is_some() {
                return Ok(found);
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_join_base() {
        let config = Config::with_arl("abcdef".parse().unwrap()).unwrap();
        let api = Api::new(&config).unwrap();
        let url = api.base_url.join("track/isrc:GBDUW0000059").unwrap();
        assert_eq!(url.as_str(), "https://api.deezer.com/track/isrc:GBDUW0000059");
    }
}
