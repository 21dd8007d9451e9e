//! Downloadable containers and their run-scoped progress.
//!
//! A [`Container`] is either a single track or a collection (album or
//! playlist) of tracks. Its content is read-only; the only mutable state is
//! the progress of the current run, kept behind a mutex so that tracks of
//! the same container could be processed concurrently.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio_util::sync::CancellationToken;

use crate::{
    failure::FailureKind,
    protocol::api::{AlbumData, PlaylistData, TrackRef},
    track::{Track, TrackInfo},
    uuid::Uuid,
};

/// What a container holds.
#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    /// One track, with its album if already known.
    Single {
        track: TrackRef,
        album: Option<Arc<AlbumData>>,
    },

    /// Tracks in stored order with the context they share.
    Collection {
        tracks: Vec<TrackRef>,
        album: Option<Arc<AlbumData>>,
        playlist: Option<Arc<PlaylistData>>,
    },
}

/// Per-track data handed from the fan-out to the pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemData {
    pub track: TrackRef,
    pub album: Option<Arc<AlbumData>>,
    pub playlist: Option<Arc<PlaylistData>>,

    /// Track resolved ahead of the run; the builder is skipped for it.
    pub descriptor: Option<Arc<Track>>,

    /// Zero-based position in the container.
    pub position: usize,
}

impl ItemData {
    #[must_use]
    pub fn info(&self) -> TrackInfo {
        TrackInfo::from(&self.track)
    }
}

/// Progress of a container in the current run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Progress {
    pub downloaded: usize,
    pub failed: usize,

    /// Completion in percent.
    pub percent: f64,

    /// Failed items with the message key of their failure.
    pub errors: Vec<(TrackInfo, FailureKind)>,
}

#[derive(Debug)]
pub struct Container {
    pub uuid: Uuid,
    pub title: String,
    pub content: Content,

    descriptors: BTreeMap<usize, Arc<Track>>,
    cancel: CancellationToken,
    progress: Mutex<Progress>,
}

impl Container {
    /// Creates a container that is cancelled along with `cancel`.
    #[must_use]
    pub fn new(title: impl Into<String>, content: Content, cancel: &CancellationToken) -> Self {
        Self {
            uuid: Uuid::fast_v4(),
            title: title.into(),
            content,
            descriptors: BTreeMap::new(),
            cancel: cancel.child_token(),
            progress: Mutex::new(Progress::default()),
        }
    }

    #[must_use]
    pub fn single(track: TrackRef, album: Option<Arc<AlbumData>>, cancel: &CancellationToken) -> Self {
        let title = format!("{} - {}", track.artist.name, track.title);
        Self::new(title, Content::Single { track, album }, cancel)
    }

    /// Supplies the resolved track at `position`, so that its metadata is
    /// not fetched again.
    #[must_use]
    pub fn with_descriptor(mut self, position: usize, track: Track) -> Self {
        self.descriptors.insert(position, Arc::new(track));
        self
    }

    /// Number of tracks.
    #[must_use]
    pub fn size(&self) -> usize {
        match &self.content {
            Content::Single { .. } => 1,
            Content::Collection { tracks, .. } => tracks.len(),
        }
    }

    #[must_use]
    pub fn is_single(&self) -> bool {
        matches!(self.content, Content::Single { .. })
    }

    /// Data of the track at `position`.
    #[must_use]
    pub fn item(&self, position: usize) -> Option<ItemData> {
        match &self.content {
            Content::Single { track, album } => (position == 0).then(|| ItemData {
                track: track.clone(),
                album: album.clone(),
                playlist: None,
                descriptor: self.descriptors.get(&position).cloned(),
                position,
            }),
            Content::Collection {
                tracks,
                album,
                playlist,
            } => tracks.get(position).map(|track| ItemData {
                track: track.clone(),
                album: album.clone(),
                playlist: playlist.clone(),
                descriptor: self.descriptors.get(&position).cloned(),
                position,
            }),
        }
    }

    /// Sets the cancel flag.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn lock(&self) -> MutexGuard<'_, Progress> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the progress.
    #[must_use]
    pub fn progress(&self) -> Progress {
        self.lock().clone()
    }

    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.lock().downloaded
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.lock().failed
    }

    /// Counts a delivered track. Never counts beyond the container's size;
    /// returns whether the track was counted.
    pub fn mark_downloaded(&self) -> bool {
        let size = self.size();
        let mut progress = self.lock();
        if progress.downloaded >= size {
            return false;
        }
        progress.downloaded += 1;
        true
    }

    /// Counts a failed track and records its failure.
    pub fn mark_failed(&self, item: TrackInfo, kind: FailureKind) {
        let mut progress = self.lock();
        progress.failed += 1;
        progress.errors.push((item, kind));
    }

    /// Adds one track's share to the completion and returns the new
    /// percentage.
    pub fn complete_track(&self) -> f64 {
        #[expect(clippy::cast_precision_loss)]
        let share = 100.0 / self.size().max(1) as f64;
        let mut progress = self.lock();
        progress.percent = (progress.percent + share).min(100.0);
        progress.percent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: i64) -> TrackRef {
        serde_json::from_str(&format!(r#"{{"id": {id}, "title": "T{id}", "artist": {{"name": "A"}}}}"#)).unwrap()
    }

    fn collection(n: i64) -> Container {
        let content = Content::Collection {
            tracks: (1..=n).map(track).collect(),
            album: None,
            playlist: None,
        };
        Container::new("Album", content, &CancellationToken::new())
    }

    #[test]
    fn downloaded_never_exceeds_size() {
        let container = collection(2);
        assert!(container.mark_downloaded());
        assert!(container.mark_downloaded());
        assert!(!container.mark_downloaded());
        assert_eq!(container.downloaded(), 2);
    }

    #[test]
    fn completion_adds_up_to_hundred() {
        let container = collection(4);
        for _ in 0..4 {
            container.complete_track();
        }
        assert!((container.progress().percent - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn failures_are_recorded() {
        let container = collection(3);
        let item = container.item(1).unwrap();
        container.mark_failed(item.info(), FailureKind::NotOnDeezer);
        let progress = container.progress();
        assert_eq!(progress.failed, 1);
        assert_eq!(progress.errors[0].1, FailureKind::NotOnDeezer);
    }

    #[test]
    fn items_by_position() {
        let container = collection(3);
        assert_eq!(container.item(2).unwrap().track.title, "T3");
        assert!(container.item(3).is_none());

        let single = Container::single(track(7), None, &CancellationToken::new());
        assert_eq!(single.title, "A - T7");
        assert!(single.item(0).is_some());
        assert!(single.item(1).is_none());
    }

    #[test]
    fn cancellation_follows_the_run() {
        let run = CancellationToken::new();
        let container = Container::single(track(1), None, &run);
        assert!(!container.is_cancelled());
        run.cancel();
        assert!(container.is_cancelled());
    }
}
