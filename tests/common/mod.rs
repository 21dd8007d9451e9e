//! Test doubles shared by the integration tests: an in-memory catalog
//! implementing [`Service`], a listener that records every event, and sinks
//! that fail on write.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    io,
    pin::Pin,
    sync::{Arc, Mutex, PoisonError},
    task::{Context, Poll},
};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

use dzstream::{
    config::Settings,
    container::{Container, Content},
    decrypt::Key,
    download::Downloader,
    error::{Error, Result},
    events::{Event, Listener, Stage},
    fanout::Downloadable,
    format::Format,
    protocol::{
        api::{AlbumData, PlaylistData, TrackRef},
        gateway::SongData,
    },
    service::{ByteStream, Lookup, MediaError, Service},
    track::{Track, TrackId},
};

/// Size of the chunks streams are delivered in.
pub const CHUNK_SIZE: usize = 1000;

/// Album every catalog track belongs to.
pub const ALBUM_ID: u64 = 1;

/// Reply of the media endpoint for one track and format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Media {
    Url(String),
    Unavailable,
    WrongLicense,
    WrongGeolocation,
    Broken,
}

/// How a stream transfer goes wrong.
#[derive(Clone, Debug)]
pub enum Transfer {
    /// The CDN refuses to open the stream.
    Refused,
    /// The connection drops after the first chunk.
    Interrupted,
    /// `token` is cancelled while the second chunk is delivered.
    CancelMidway(CancellationToken),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Track(i64),
    TrackInfo(Lookup),
    Album(u64),
    Playlist(u64),
    Search(String, String),
    MediaUrl(i64, Format),
    Open(String),
}

/// In-memory catalog.
#[derive(Default)]
pub struct MockService {
    pub songs: HashMap<i64, SongData>,
    pub tracks: HashMap<i64, TrackRef>,
    pub isrcs: HashMap<String, TrackRef>,
    pub albums: HashMap<u64, AlbumData>,
    pub playlists: HashMap<u64, PlaylistData>,
    pub searches: HashMap<(String, String), TrackId>,
    pub media: HashMap<(i64, Format), Media>,
    pub streams: HashMap<String, Vec<u8>>,
    pub transfers: HashMap<String, Transfer>,
    cancel_on_track: Option<CancellationToken>,
    calls: Mutex<Vec<Call>>,
}

pub fn stream_url(id: i64, format: Format) -> String {
    format!("https://cdn.test/{id}/{format}")
}

/// Audio bytes served for a track at a format.
pub fn payload(id: i64, format: Format) -> Vec<u8> {
    format!("{id}@{format};").into_bytes().repeat(400)
}

pub fn track_ref(id: i64) -> TrackRef {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "title": format!("Title {id}"),
        "artist": {"id": 7, "name": "Artist"},
        "album": {"id": ALBUM_ID, "title": "Album"},
    }))
    .unwrap()
}

pub fn song(id: i64, md5: Option<&str>) -> SongData {
    SongData {
        id: TrackId::new(id),
        title: format!("Title {id}"),
        artist: "Artist".to_owned(),
        album_id: ALBUM_ID,
        album_title: "Album".to_owned(),
        md5: md5.map(str::to_owned),
        track_token: format!("token-{id}"),
        ..SongData::default()
    }
}

impl MockService {
    pub fn new() -> Self {
        let mut service = Self::default();
        service.albums.insert(
            ALBUM_ID,
            serde_json::from_value(serde_json::json!({
                "id": ALBUM_ID,
                "title": "Album",
                "artist": {"id": 7, "name": "Artist"},
            }))
            .unwrap(),
        );
        service
    }

    /// Adds an encoded track that is available at `formats`.
    #[must_use]
    pub fn with_track(mut self, id: i64, formats: &[Format]) -> Self {
        let mut song = song(id, Some("abc123"));
        for &format in formats {
            self.serve(&mut song, format);
        }
        self.add(song)
    }

    /// Adds `song` to the catalog as is.
    #[must_use]
    pub fn add(mut self, song: SongData) -> Self {
        let id = song.id.map_or(0, TrackId::get);
        self.tracks.insert(id, track_ref(id));
        self.songs.insert(id, song);
        self
    }

    /// Encodes `song` at `format` and serves the stream.
    pub fn serve(&mut self, song: &mut SongData, format: Format) {
        let id = song.id.map_or(0, TrackId::get);
        let bytes = payload(id, format);
        song.filesizes.set(format, bytes.len() as u64);
        self.media.insert((id, format), Media::Url(stream_url(id, format)));
        self.streams.insert(stream_url(id, format), bytes);
    }

    /// Overrides the media endpoint's reply, keeping the file size.
    #[must_use]
    pub fn with_media(mut self, id: i64, format: Format, media: Media) -> Self {
        if let Some(song) = self.songs.get_mut(&id) {
            if song.filesizes.get(format) == 0 {
                song.filesizes.set(format, 1);
            }
        }
        self.media.insert((id, format), media);
        self
    }

    /// Breaks the transfer of `id` at `format`.
    #[must_use]
    pub fn with_transfer(mut self, id: i64, format: Format, transfer: Transfer) -> Self {
        self.transfers.insert(stream_url(id, format), transfer);
        self
    }

    /// Cancels `token` whenever track metadata is fetched.
    #[must_use]
    pub fn cancel_on_track(mut self, token: &CancellationToken) -> Self {
        self.cancel_on_track = Some(token.clone());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn media_calls(&self) -> Vec<Format> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::MediaUrl(_, format) => Some(format),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

#[async_trait]
impl Service for MockService {
    async fn track(&self, id: TrackId) -> Result<SongData> {
        self.record(Call::Track(id.get()));
        if let Some(token) = &self.cancel_on_track {
            token.cancel();
        }
        self.songs
            .get(&id.get())
            .cloned()
            .ok_or_else(|| Error::not_found(format!("song {id}")))
    }

    async fn track_info(&self, lookup: &Lookup) -> Result<Option<TrackRef>> {
        self.record(Call::TrackInfo(lookup.clone()));
        Ok(match lookup {
            Lookup::Id(id) => self.tracks.get(&id.get()).cloned(),
            Lookup::Isrc(isrc) => self.isrcs.get(isrc).cloned(),
        })
    }

    async fn album(&self, id: u64) -> Result<Option<AlbumData>> {
        self.record(Call::Album(id));
        Ok(self.albums.get(&id).cloned())
    }

    async fn playlist(&self, id: u64) -> Result<Option<PlaylistData>> {
        self.record(Call::Playlist(id));
        Ok(self.playlists.get(&id).cloned())
    }

    async fn search_track(
        &self,
        artist: &str,
        title: &str,
        _album: &str,
    ) -> Result<Option<TrackId>> {
        self.record(Call::Search(artist.to_owned(), title.to_owned()));
        Ok(self
            .searches
            .get(&(artist.to_owned(), title.to_owned()))
            .copied())
    }

    async fn media_url(
        &self,
        track: &Track,
        format: Format,
    ) -> std::result::Result<Option<String>, MediaError> {
        let id = track.id.get();
        self.record(Call::MediaUrl(id, format));
        match self.media.get(&(id, format)) {
            Some(Media::Url(url)) => Ok(Some(url.clone())),
            Some(Media::Unavailable) | None => Ok(None),
            Some(Media::WrongLicense) => Err(MediaError::WrongLicense(format)),
            Some(Media::WrongGeolocation) => Err(MediaError::WrongGeolocation {
                country: "XX".to_owned(),
            }),
            Some(Media::Broken) => Err(Error::unavailable("HTTP 502").into()),
        }
    }

    async fn open(&self, url: &str) -> Result<ByteStream> {
        self.record(Call::Open(url.to_owned()));
        let bytes = self
            .streams
            .get(url)
            .ok_or_else(|| Error::not_found(format!("no stream at {url}")))?;

        let mut chunks: Vec<Result<Bytes>> = bytes
            .chunks(CHUNK_SIZE)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();

        match self.transfers.get(url).cloned() {
            None => Ok(futures_util::stream::iter(chunks).boxed()),
            Some(Transfer::Refused) => Err(Error::permission_denied("HTTP 403")),
            Some(Transfer::Interrupted) => {
                chunks.truncate(1);
                chunks.push(Err(Error::aborted("connection reset")));
                Ok(futures_util::stream::iter(chunks).boxed())
            }
            Some(Transfer::CancelMidway(token)) => Ok(futures_util::stream::iter(chunks)
                .enumerate()
                .map(move |(index, chunk)| {
                    if index == 1 {
                        token.cancel();
                    }
                    chunk
                })
                .boxed()),
        }
    }
}

/// Records every event it is notified of.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<Event>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Stage { stage, .. } => Some(stage),
                _ => None,
            })
            .collect()
    }
}

impl Listener for RecordingListener {
    fn notify(&self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Sink that fails every write with `kind`.
pub struct FailingSink {
    pub kind: io::ErrorKind,
}

impl FailingSink {
    pub fn full() -> Self {
        Self {
            kind: io::ErrorKind::StorageFull,
        }
    }

    pub fn denied() -> Self {
        Self {
            kind: io::ErrorKind::PermissionDenied,
        }
    }
}

impl AsyncWrite for FailingSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::from(self.kind)))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

pub fn settings(max_bitrate: Format, fallback_bitrate: Format, feeling_lucky: bool) -> Settings {
    Settings {
        max_bitrate,
        fallback_bitrate,
        feeling_lucky,
        fallback_search: false,
    }
}

pub fn single(id: i64, cancel: &CancellationToken) -> Downloadable {
    Container::single(track_ref(id), None, cancel).into()
}

pub fn collection(ids: &[i64], cancel: &CancellationToken) -> (Arc<Container>, Downloadable) {
    let content = Content::Collection {
        tracks: ids.iter().copied().map(track_ref).collect(),
        album: None,
        playlist: None,
    };
    let container = Arc::new(Container::new("Collection", content, cancel));
    (Arc::clone(&container), Downloadable::Container(container))
}

pub fn downloader<W>(
    service: &Arc<MockService>,
    listener: &Arc<RecordingListener>,
    settings: Settings,
    secret: Option<Key>,
    sink: W,
) -> Downloader<W>
where
    W: AsyncWrite + Unpin + Send,
{
    Downloader::new(
        Arc::clone(service) as Arc<dyn Service>,
        Arc::clone(listener) as Arc<dyn Listener>,
        settings,
        secret,
        sink,
    )
}
