//! Run driver: takes every item of a [`Downloadable`] through the builder,
//! the negotiator and the stream pipeline, in order.
//!
//! Failures of one track in a collection are recorded on its container and
//! the run moves on to the next track. A failure of a lone single-track
//! container ends the run. Cancellation is not a failure: the item is
//! reported as canceled and nothing is marked as completed.

use std::sync::Arc;

use tokio::io::AsyncWrite;

use crate::{
    builder::Builder,
    config::Settings,
    container::{Container, ItemData},
    decrypt::Key,
    events::{Event, Listener},
    failure::{Failure, FailureKind, PipelineError, RunError},
    fanout::Downloadable,
    negotiate::Negotiator,
    pipeline::{Delivery, Pipeline},
    service::Service,
    track::TrackInfo,
    uuid::Uuid,
};

/// What became of one item.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Delivered(Delivery),
    Failed(FailureKind),
    Canceled,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    /// Run id of the item's container.
    pub container: Uuid,
    pub item: TrackInfo,
    pub outcome: Outcome,
}

/// Outcomes of a run, in the order the items were processed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Report {
    pub entries: Vec<Entry>,
    pub downloaded: usize,
    pub failed: usize,
    pub canceled: usize,
}

impl Report {
    fn record(&mut self, container: Uuid, item: TrackInfo, outcome: Outcome) {
        match outcome {
            Outcome::Delivered(_) => self.downloaded += 1,
            Outcome::Failed(_) => self.failed += 1,
            Outcome::Canceled => self.canceled += 1,
        }
        self.entries.push(Entry {
            container,
            item,
            outcome,
        });
    }

    /// Outcomes only, for quick inspection.
    #[must_use]
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.entries.iter().map(|entry| entry.outcome).collect()
    }
}

pub struct Downloader<W> {
    service: Arc<dyn Service>,
    listener: Arc<dyn Listener>,
    settings: Settings,
    secret: Option<Key>,
    sink: W,
}

impl<W> Downloader<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(
        service: Arc<dyn Service>,
        listener: Arc<dyn Listener>,
        settings: Settings,
        secret: Option<Key>,
        sink: W,
    ) -> Self {
        if secret.is_none() {
            warn!("no decryption secret configured; streams will be written as received");
        }

        Self {
            service,
            listener,
            settings,
            secret,
            sink,
        }
    }

    /// Returns the sink, e.g. to inspect what was written.
    pub fn into_sink(self) -> W {
        self.sink
    }

    /// Processes every item of `downloadable`.
    ///
    /// # Errors
    ///
    /// * [`RunError::Empty`] if there are no tracks at all
    /// * [`RunError::Failed`] if `downloadable` is a single track and it
    ///   failed
    /// * [`RunError::Fatal`] on an unclassified error of the sink
    pub async fn run(&mut self, downloadable: Downloadable) -> Result<Report, RunError> {
        if downloadable.size() == 0 {
            return Err(RunError::Empty);
        }

        let single = downloadable.is_single();
        let mut report = Report::default();

        for (container, item) in downloadable.fan_out() {
            match self.process(&container, &item).await {
                Ok(delivery) => {
                    report.record(container.uuid, item.info(), Outcome::Delivered(delivery));
                }
                Err(PipelineError::Failure(failure)) if failure.kind.is_cancellation() => {
                    self.canceled(&container, &item);
                    report.record(container.uuid, item.info(), Outcome::Canceled);
                }
                Err(PipelineError::Failure(failure)) => {
                    let kind = failure.kind;
                    self.failed(&container, &item, &failure);
                    report.record(container.uuid, item.info(), Outcome::Failed(kind));

                    if single {
                        return Err(RunError::Failed(failure));
                    }
                }
                Err(PipelineError::Fatal(e)) => {
                    error!("{}: {e}", item.info());
                    return Err(RunError::Fatal(e));
                }
            }
        }

        info!(
            "{} downloaded, {} failed, {} canceled",
            report.downloaded, report.failed, report.canceled
        );
        Ok(report)
    }

    async fn process(&mut self, container: &Container, item: &ItemData) -> Result<Delivery, PipelineError> {
        if container.is_cancelled() {
            return Err(Failure::canceled().into());
        }

        let uuid = container.uuid;
        let service = &*self.service;
        let listener = &*self.listener;

        let cancel = container.cancel_token();

        let mut track = Builder::new(service, listener, &self.settings, cancel)
            .build(uuid, item)
            .await?;

        Negotiator::new(service, listener)
            .negotiate(uuid, &mut track, &self.settings, cancel)
            .await?;

        Pipeline::new(service, listener, self.secret.as_ref())
            .deliver(container, &track, &mut self.sink)
            .await
    }

    fn failed(&self, container: &Container, item: &ItemData, failure: &Failure) {
        let info = failure
            .track
            .as_deref()
            .map_or_else(|| item.info(), TrackInfo::from);

        if let Some(source) = &failure.source {
            debug!("{info}: {}: {source}", failure.key());
        }

        container.mark_failed(info.clone(), failure.kind);
        self.listener.notify(&Event::UpdateQueue {
            uuid: container.uuid,
            item: info,
            downloaded: false,
            failed: true,
            error: Some(failure.kind),
            searched: failure.track.as_ref().is_some_and(|track| track.searched),
            bitrate: None,
        });
    }

    fn canceled(&self, container: &Container, item: &ItemData) {
        self.listener.notify(&Event::UpdateQueue {
            uuid: container.uuid,
            item: item.info(),
            downloaded: false,
            failed: false,
            error: Some(FailureKind::Canceled),
            searched: false,
            bitrate: None,
        });
    }
}
