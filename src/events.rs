//! Progress events and the listeners that receive them.
//!
//! The pipeline reports its progress through a [`Listener`] passed in by the
//! caller. Events are ephemeral: they are handed to the listener and never
//! retained.
//!
//! # Listeners
//!
//! * [`NoopListener`] - drops all events
//! * [`LogListener`] - logs events through the `log` facade
//! * [`JsonListener`] - writes one JSON object per line, for supervising
//!   processes
//!
//! # Wire Format
//!
//! ```json
//! {"event":"stage","uuid":"…","stage":"getBitrate","item":{"id":3135556,"title":"…","artist":"…"}}
//! {"event":"trackComplete","uuid":"…","progress":100.0}
//! {"event":"updateQueue","uuid":"…","item":{…},"downloaded":true,"failed":false,"error":null,"searched":false,"bitrate":"MP3_320"}
//! ```

use std::{
    fmt,
    io::Write,
    sync::{Mutex, PoisonError},
};

use serde::Serialize;

use crate::{failure::FailureKind, format::Format, track::TrackInfo, uuid::Uuid};

/// Resolution stages of a single item.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    GetTags,
    GotTags,
    GetBitrate,
    /// Negotiation settled on a lower bitrate than requested.
    BitrateFallback,
    GotBitrate,
    Downloaded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GetTags => "getTags",
            Self::GotTags => "gotTags",
            Self::GetBitrate => "getBitrate",
            Self::BitrateFallback => "bitrateFallback",
            Self::GotBitrate => "gotBitrate",
            Self::Downloaded => "downloaded",
        };
        f.write_str(name)
    }
}

/// Progress event, always tagged with the container's run id.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Event {
    /// An item advanced to `stage`.
    Stage {
        uuid: Uuid,
        stage: Stage,
        item: TrackInfo,
    },

    /// A track of the container completed; `progress` is the container's
    /// completion in percent.
    TrackComplete { uuid: Uuid, progress: f64 },

    /// Final state of an item.
    UpdateQueue {
        uuid: Uuid,
        item: TrackInfo,
        downloaded: bool,
        failed: bool,
        error: Option<FailureKind>,
        searched: bool,
        bitrate: Option<Format>,
    },
}

impl Event {
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        match self {
            Self::Stage { uuid, .. }
            | Self::TrackComplete { uuid, .. }
            | Self::UpdateQueue { uuid, .. } => *uuid,
        }
    }
}

/// Receives progress events.
///
/// Implementations must not block for long: they are called inline from
/// the pipeline.
pub trait Listener: Send + Sync {
    fn notify(&self, event: &Event);

    /// Shorthand for a [`Event::Stage`] notification.
    fn stage(&self, uuid: Uuid, stage: Stage, item: &TrackInfo) {
        self.notify(&Event::Stage {
            uuid,
            stage,
            item: item.clone(),
        });
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct NoopListener;

impl Listener for NoopListener {
    fn notify(&self, _event: &Event) {}
}

/// Logs events: stages at DEBUG, outcomes at INFO or WARN.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogListener;

impl Listener for LogListener {
    fn notify(&self, event: &Event) {
        match event {
            Event::Stage {
                stage: Stage::BitrateFallback,
                item,
                ..
            } => info!("{item}: requested bitrate not available, falling back"),
            Event::Stage { uuid, stage, item } => debug!("[{uuid}] {item}: {stage}"),
            Event::TrackComplete { uuid, progress } => trace!("[{uuid}] progress {progress:.1}%"),
            Event::UpdateQueue {
                item,
                downloaded: true,
                searched,
                bitrate,
                ..
            } => {
                let bitrate = bitrate.map_or_else(|| "unknown bitrate".to_owned(), |b| b.to_string());
                info!("{item}: downloaded at {bitrate}");
                if *searched {
                    warn!("{item}: found through a metadata search; it may be a different recording");
                }
            }
            Event::UpdateQueue { item, error, .. } => match error {
                Some(FailureKind::Canceled) => info!("{item}: canceled"),
                Some(kind) => warn!("{item}: {kind}"),
                None => debug!("{item}: not downloaded"),
            },
        }
    }
}

/// Writes every event as a line of JSON.
pub struct JsonListener<W> {
    writer: Mutex<W>,
}

impl<W> JsonListener<W>
where
    W: Write + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the writer, e.g. to inspect what was written.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W> Listener for JsonListener<W>
where
    W: Write + Send,
{
    fn notify(&self, event: &Event) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let result = serde_json::to_writer(&mut *writer, event)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(writer))
            .and_then(|()| writer.flush());

        if let Err(e) = result {
            warn!("could not write progress event: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_lines() {
        let listener = JsonListener::new(Vec::new());
        let uuid = Uuid::fast_v4();
        let item = TrackInfo {
            id: "12345".parse().ok(),
            title: "Song".to_owned(),
            artist: "Artist".to_owned(),
        };

        listener.stage(uuid, Stage::GetBitrate, &item);
        listener.notify(&Event::UpdateQueue {
            uuid,
            item,
            downloaded: false,
            failed: true,
            error: Some(FailureKind::WrongBitrate),
            searched: false,
            bitrate: None,
        });

        let output = String::from_utf8(listener.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "stage");
        assert_eq!(lines[0]["stage"], "getBitrate");
        assert_eq!(lines[0]["item"]["id"], 12345);
        assert_eq!(lines[1]["event"], "updateQueue");
        assert_eq!(lines[1]["error"], "wrongBitrate");
        assert_eq!(lines[1]["uuid"], uuid.to_string());
    }

    #[test]
    fn stage_names_match_serialization() {
        for stage in [Stage::GetTags, Stage::BitrateFallback, Stage::Downloaded] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{stage}\""));
        }
    }
}
