//! Assembly of [`Track`]s from service responses.
//!
//! The builder runs right before an item is negotiated. It classifies
//! everything that makes a track undeliverable before any bitrate is
//! probed:
//!
//! * a zero or missing id is [`NotOnDeezer`](FailureKind::NotOnDeezer),
//!   without any network call
//! * unresolvable metadata or a missing content hash is
//!   [`NotLoggedIn`](FailureKind::NotLoggedIn)
//! * a missing album is [`AlbumDoesntExists`](FailureKind::AlbumDoesntExists)
//! * an empty content hash is [`NotEncoded`](FailureKind::NotEncoded),
//!   unless an alternative track is found
//!
//! Items that carry a resolved track are not fetched again. The cancel flag
//! is checked before every service call.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    config::Settings,
    container::ItemData,
    events::{Listener, Stage},
    failure::{Failure, FailureKind},
    protocol::{api::AlbumData, gateway::SongData},
    service::Service,
    track::{Track, TrackId, TrackInfo},
    uuid::Uuid,
};

pub struct Builder<'a> {
    service: &'a dyn Service,
    listener: &'a dyn Listener,
    settings: &'a Settings,
    cancel: &'a CancellationToken,
}

impl<'a> Builder<'a> {
    #[must_use]
    pub fn new(
        service: &'a dyn Service,
        listener: &'a dyn Listener,
        settings: &'a Settings,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            service,
            listener,
            settings,
            cancel,
        }
    }

    /// Builds the track of `item`.
    ///
    /// # Errors
    ///
    /// Returns a [`Failure`] classifying why the track cannot be delivered,
    /// or `Canceled` if the cancel flag is set before a service call.
    pub async fn build(&self, uuid: Uuid, item: &ItemData) -> Result<Track, Failure> {
        if let Some(track) = &item.descriptor {
            return Self::resolved(track);
        }

        let Some(id) = item.track.id else {
            return Err(FailureKind::NotOnDeezer.into());
        };

        let info = item.info();
        self.listener.stage(uuid, Stage::GetTags, &info);

        let song = self.song(id).await?;
        let album = self.album(item, &song).await?;

        let track = match song.md5.as_deref() {
            None => {
                debug!("{info}: no content hash in song data");
                return Err(FailureKind::NotLoggedIn.into());
            }
            Some("") => self.alternative(&song, &album, item).await?,
            Some(_) => Self::assemble(&song, &album, item)?,
        };

        self.listener.stage(uuid, Stage::GotTags, &TrackInfo::from(&track));
        Ok(track)
    }

    /// A track resolved ahead of the run, as long as it is encoded.
    fn resolved(track: &Track) -> Result<Track, Failure> {
        if track.md5.is_empty() {
            return Err(Failure::new(FailureKind::NotEncoded).with_track(track));
        }

        trace!("{track}: already resolved");
        Ok(track.clone())
    }

    fn check_cancel(&self) -> Result<(), Failure> {
        if self.cancel.is_cancelled() {
            return Err(Failure::canceled());
        }
        Ok(())
    }

    async fn song(&self, id: TrackId) -> Result<SongData, Failure> {
        self.check_cancel()?;
        self.service
            .track(id)
            .await
            .map_err(|e| Failure::new(FailureKind::NotLoggedIn).with_source(e))
    }

    /// The album from the item's context, or fetched by the song's album id.
    async fn album(&self, item: &ItemData, song: &SongData) -> Result<Arc<AlbumData>, Failure> {
        if let Some(album) = &item.album {
            return Ok(Arc::clone(album));
        }

        let album_id = match song.album_id {
            0 => item
                .track
                .album
                .as_ref()
                .map(|album| album.id)
                .unwrap_or_default(),
            id => id,
        };
        if album_id == 0 {
            return Err(FailureKind::AlbumDoesntExists.into());
        }

        self.check_cancel()?;
        match self.service.album(album_id).await {
            Ok(Some(album)) => Ok(Arc::new(album)),
            Ok(None) => Err(FailureKind::AlbumDoesntExists.into()),
            Err(e) => Err(Failure::new(FailureKind::AlbumDoesntExists).with_source(e)),
        }
    }

    fn assemble(song: &SongData, album: &AlbumData, item: &ItemData) -> Result<Track, Failure> {
        Track::new(song, album, item.playlist.as_deref())
            .map_err(|e| Failure::new(FailureKind::NotLoggedIn).with_source(e))
    }

    /// Resolves a track whose content hash is empty.
    ///
    /// The service's designated alternative is tried first, then, if
    /// enabled, a metadata search.
    async fn alternative(
        &self,
        song: &SongData,
        album: &AlbumData,
        item: &ItemData,
    ) -> Result<Track, Failure> {
        if let Some(fallback) = &song.fallback {
            if let Some(track) = self.fallback(fallback, album, item).await? {
                return Ok(track);
            }
        }

        if self.settings.fallback_search {
            if let Some(track) = self.search(song, album, item).await? {
                return Ok(track);
            }
        }

        Err(FailureKind::NotEncoded.into())
    }

    async fn fallback(
        &self,
        fallback: &SongData,
        album: &AlbumData,
        item: &ItemData,
    ) -> Result<Option<Track>, Failure> {
        if let Some(track) = Self::encoded(fallback, album, item) {
            debug!("{track}: using alternative version");
            return Ok(Some(track));
        }

        // The inline alternative may be abridged; fetch it in full.
        let Some(id) = fallback.id else {
            return Ok(None);
        };
        self.check_cancel()?;
        let Ok(song) = self.service.track(id).await else {
            return Ok(None);
        };

        let track = Self::encoded(&song, album, item);
        if let Some(track) = &track {
            debug!("{track}: using alternative version");
        }
        Ok(track)
    }

    async fn search(
        &self,
        song: &SongData,
        album: &AlbumData,
        item: &ItemData,
    ) -> Result<Option<Track>, Failure> {
        self.check_cancel()?;
        let found = match self
            .service
            .search_track(&song.artist, &song.title, &song.album_title)
            .await
        {
            Ok(Some(found)) if Some(found) != song.id => found,
            Ok(_) => return Ok(None),
            Err(e) => {
                debug!("search for \"{} - {}\" failed: {e}", song.artist, song.title);
                return Ok(None);
            }
        };

        self.check_cancel()?;
        let Ok(song) = self.service.track(found).await else {
            return Ok(None);
        };

        let Some(mut track) = Self::encoded(&song, album, item) else {
            return Ok(None);
        };
        track.searched = true;
        info!("{track}: found through metadata search");
        Ok(Some(track))
    }

    fn encoded(song: &SongData, album: &AlbumData, item: &ItemData) -> Option<Track> {
        if song.md5.as_deref().is_some_and(|md5| !md5.is_empty()) {
            Self::assemble(song, album, item).ok()
        } else {
            None
        }
    }
}
