mod common;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use common::{settings, track_ref, Call, MockService, RecordingListener, ALBUM_ID};
use dzstream::{
    download::Outcome,
    error::ErrorKind,
    format::Format,
    generate::generate,
    link::Link,
    service::Lookup,
};

fn album_with_tracks(ids: &[i64]) -> MockService {
    let mut service = MockService::new();
    for &id in ids {
        service = service.with_track(id, &[Format::MP3_320]);
    }
    let album = service.albums.get_mut(&ALBUM_ID).unwrap();
    album.tracks.data = ids.iter().copied().map(track_ref).collect();
    album.nb_tracks = ids.len();
    service
}

#[tokio::test]
async fn album_becomes_collection_with_context() {
    let service = album_with_tracks(&[1, 2, 3]);
    let cancel = CancellationToken::new();

    let downloadable = generate(&service, &[Link::Album(ALBUM_ID)], &cancel)
        .await
        .unwrap();
    assert_eq!(downloadable.size(), 3);
    assert!(!downloadable.is_single());

    let items: Vec<_> = downloadable.fan_out().collect();
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|(_, item)| item.album.is_some()));
    assert_eq!(items[0].0.title, "Artist - Album");
}

#[tokio::test]
async fn track_link_becomes_single() {
    let service = MockService::new().with_track(5, &[Format::MP3_320]);
    let cancel = CancellationToken::new();
    let link: Link = "https://www.deezer.com/en/track/5".parse().unwrap();

    let downloadable = generate(&service, &[link], &cancel).await.unwrap();
    assert!(downloadable.is_single());
    assert_eq!(
        service.calls(),
        [Call::TrackInfo(Lookup::Id("5".parse().unwrap()))]
    );
}

#[tokio::test]
async fn unknown_links_abort_the_run() {
    let service = MockService::new().with_track(5, &[Format::MP3_320]);
    let cancel = CancellationToken::new();

    let error = generate(&service, &[Link::Track("5".parse().unwrap()), Link::Playlist(9)], &cancel)
        .await
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn empty_collections_abort_the_run() {
    let service = MockService::new();
    let cancel = CancellationToken::new();

    let error = generate(&service, &[Link::Album(ALBUM_ID)], &cancel)
        .await
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn several_links_run_in_order() {
    let service = Arc::new(album_with_tracks(&[1, 2]).with_track(7, &[Format::MP3_128]));
    let listener = Arc::new(RecordingListener::default());
    let cancel = CancellationToken::new();

    let links = [Link::Track("7".parse().unwrap()), Link::Album(ALBUM_ID)];
    let downloadable = generate(&*service, &links, &cancel).await.unwrap();
    assert_eq!(downloadable.size(), 3);

    let mut downloader = common::downloader(
        &service,
        &listener,
        settings(Format::MP3_320, Format::MP3_128, false),
        None,
        Vec::new(),
    );
    let report = downloader.run(downloadable).await.unwrap();

    assert_eq!(report.downloaded, 3);
    let ids: Vec<_> = report
        .entries
        .iter()
        .map(|entry| entry.item.id.unwrap().get())
        .collect();
    assert_eq!(ids, [7, 1, 2]);
    assert!(report
        .outcomes()
        .iter()
        .all(|outcome| matches!(outcome, Outcome::Delivered(_))));
}
