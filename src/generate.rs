//! Turns parsed links into a [`Downloadable`].
//!
//! Tracks and ISRCs become single-track containers; their album is left to
//! the builder to fetch when the track is processed. Albums and playlists
//! become collections carrying the album or playlist as shared context.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    container::{Container, Content},
    error::{Error, Result},
    fanout::Downloadable,
    link::Link,
    service::{Lookup, Service},
};

/// Resolves `links`, in order.
///
/// # Errors
///
/// * `Error::Cancelled` if `cancel` is set before a link is resolved
/// * `Error::NotFound` if a link does not exist or resolves to no tracks
/// * any error of the service
pub async fn generate(
    service: &dyn Service,
    links: &[Link],
    cancel: &CancellationToken,
) -> Result<Downloadable> {
    let mut downloadables = Vec::with_capacity(links.len());

    for link in links {
        if cancel.is_cancelled() {
            return Err(Error::cancelled("resolving links was cancelled"));
        }

        let container = resolve(service, link, cancel).await?;
        if container.size() == 0 {
            return Err(Error::not_found(format!("{link} has no tracks")));
        }

        debug!("{link}: \"{}\" with {} tracks", container.title, container.size());
        downloadables.push(Downloadable::from(container));
    }

    let downloadable = if downloadables.len() == 1 {
        downloadables.swap_remove(0)
    } else {
        Downloadable::List(downloadables)
    };

    Ok(downloadable)
}

async fn resolve(service: &dyn Service, link: &Link, cancel: &CancellationToken) -> Result<Container> {
    let not_found = || Error::not_found(format!("{link} not found"));

    let container = match link {
        Link::Track(id) => {
            let track = service
                .track_info(&Lookup::Id(*id))
                .await?
                .ok_or_else(not_found)?;
            Container::single(track, None, cancel)
        }

        Link::Isrc(isrc) => {
            let track = service
                .track_info(&Lookup::Isrc(isrc.clone()))
                .await?
                .ok_or_else(not_found)?;
            Container::single(track, None, cancel)
        }

        Link::Album(id) => {
            let mut album = service.album(*id).await?.ok_or_else(not_found)?;
            let tracks = std::mem::take(&mut album.tracks.data);
            let title = format!("{} - {}", album.artist.name, album.title);
            let content = Content::Collection {
                tracks,
                album: Some(Arc::new(album)),
                playlist: None,
            };
            Container::new(title, content, cancel)
        }

        Link::Playlist(id) => {
            let mut playlist = service.playlist(*id).await?.ok_or_else(not_found)?;
            let tracks = std::mem::take(&mut playlist.tracks.data);
            let title = playlist.title.clone();
            let content = Content::Collection {
                tracks,
                album: None,
                playlist: Some(Arc::new(playlist)),
            };
            Container::new(title, content, cancel)
        }
    };

    Ok(container)
}
