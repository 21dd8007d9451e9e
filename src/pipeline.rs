//! Streaming of negotiated tracks into a sink.

use std::io;

use futures_util::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use veil::Redact;

use crate::{
    container::Container,
    decrypt::{Key, StripeDecryptor},
    error::Error,
    events::{Event, Listener, Stage},
    failure::{Failure, FailureKind, PipelineError},
    format::Format,
    service::Service,
    track::{Track, TrackInfo},
};

/// The format a track is streamed in and where from.
#[derive(Clone, PartialEq, Eq, Redact)]
pub struct FormatSelection {
    pub format: Format,

    #[redact]
    pub url: String,

    pub extension: &'static str,
}

impl FormatSelection {
    /// Selects the negotiated format of `track`.
    ///
    /// # Errors
    ///
    /// Returns `NotAvailable` if the track has no negotiated format or its
    /// URL is empty.
    pub fn of(track: &Track) -> Result<Self, Failure> {
        let selection = track.bitrate.and_then(|format| {
            let url = track.urls.get(&format).filter(|url| !url.is_empty())?;
            Some(Self {
                format,
                url: url.clone(),
                extension: format.extension(),
            })
        });

        selection.ok_or_else(|| Failure::new(FailureKind::NotAvailable).with_track(track))
    }
}

/// A track that reached the sink.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub format: Format,
    pub bytes: u64,
    pub searched: bool,
}

pub struct Pipeline<'a> {
    service: &'a dyn Service,
    listener: &'a dyn Listener,
    secret: Option<&'a Key>,
}

impl<'a> Pipeline<'a> {
    /// Creates a pipeline. Without a `secret`, streams are passed through
    /// as they are received.
    #[must_use]
    pub fn new(service: &'a dyn Service, listener: &'a dyn Listener, secret: Option<&'a Key>) -> Self {
        Self {
            service,
            listener,
            secret,
        }
    }

    /// Streams `track` into `sink` and records the delivery on `container`.
    ///
    /// # Errors
    ///
    /// * `Canceled` if the container is cancelled before or during the
    ///   transfer
    /// * `NotAvailable` if the track has no usable URL or the transfer fails
    /// * `NoSpaceLeft` if the sink runs out of space
    /// * [`PipelineError::Fatal`] on any other error writing to the sink
    pub async fn deliver<W>(
        &self,
        container: &Container,
        track: &Track,
        sink: &mut W,
    ) -> Result<Delivery, PipelineError>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        if container.is_cancelled() {
            return Err(Failure::canceled().with_track(track).into());
        }

        let selection = FormatSelection::of(track)?;
        let unavailable = |e: Error| {
            PipelineError::from(
                Failure::new(FailureKind::NotAvailable)
                    .with_track(track)
                    .with_source(e),
            )
        };

        let mut stream = self.service.open(&selection.url).await.map_err(unavailable)?;
        let mut decryptor = self
            .secret
            .map(|secret| StripeDecryptor::new(track.id, secret));

        let mut buffer = Vec::with_capacity(2 * StripeDecryptor::BLOCK_SIZE);
        let mut bytes = 0;

        while let Some(chunk) = stream.next().await {
            if container.is_cancelled() {
                return Err(Failure::canceled().with_track(track).into());
            }

            let chunk = chunk.map_err(unavailable)?;
            match decryptor.as_mut() {
                Some(decryptor) => decryptor.update(&chunk, &mut buffer).map_err(unavailable)?,
                None => buffer.extend_from_slice(&chunk),
            }

            bytes += write(sink, &mut buffer, track).await?;
        }

        if let Some(decryptor) = decryptor {
            decryptor.finish(&mut buffer);
            bytes += write(sink, &mut buffer, track).await?;
        }
        sink.flush().await.map_err(|e| classify(e, track))?;

        trace!("{track}: streamed {bytes} bytes as {}", selection.format);
        self.complete(container, track);

        Ok(Delivery {
            format: selection.format,
            bytes,
            searched: track.searched,
        })
    }

    fn complete(&self, container: &Container, track: &Track) {
        let uuid = container.uuid;
        let item = TrackInfo::from(track);
        self.listener.stage(uuid, Stage::Downloaded, &item);

        let progress = container.complete_track();
        self.listener.notify(&Event::TrackComplete { uuid, progress });

        container.mark_downloaded();
        self.listener.notify(&Event::UpdateQueue {
            uuid,
            item,
            downloaded: true,
            failed: false,
            error: None,
            searched: track.searched,
            bitrate: track.bitrate,
        });
    }
}

/// Writes out and clears `buffer`, returning the number of bytes written.
async fn write<W>(sink: &mut W, buffer: &mut Vec<u8>, track: &Track) -> Result<u64, PipelineError>
where
    W: AsyncWrite + Unpin + Send + ?Sized,
{
    if buffer.is_empty() {
        return Ok(0);
    }

    sink.write_all(buffer).await.map_err(|e| classify(e, track))?;
    let written = buffer.len() as u64;
    buffer.clear();
    Ok(written)
}

/// Out-of-space is a track failure; anything else on the sink is fatal.
fn classify(e: io::Error, track: &Track) -> PipelineError {
    if e.kind() == io::ErrorKind::StorageFull {
        Failure::new(FailureKind::NoSpaceLeft)
            .with_track(track)
            .with_source(e.into())
            .into()
    } else {
        PipelineError::Fatal(e)
    }
}
