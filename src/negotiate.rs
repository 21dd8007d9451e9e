//! Bitrate negotiation.
//!
//! Negotiation walks a short list of candidate formats, best first, and
//! settles on the first one the service resolves a stream URL for. Each
//! candidate is attempted at most once. Candidates that the track has no
//! encoded file for are skipped without asking the service.
//!
//! Licensing and geolocation rejections abort negotiation immediately.

use tokio_util::sync::CancellationToken;

use crate::{
    config::Settings,
    events::{Listener, Stage},
    failure::{Failure, FailureKind},
    format::Format,
    service::{MediaError, Service},
    track::{Track, TrackInfo},
    uuid::Uuid,
};

/// Candidate formats for a request, in the order they are attempted.
///
/// * 360 Reality Audio formats are never substituted.
/// * With `best_effort`, every lower format on the requested format's
///   ladder follows.
/// * Otherwise `fallback` is attempted once, unless it equals `requested`.
#[must_use]
pub fn candidates(requested: Format, fallback: Format, best_effort: bool) -> Vec<Format> {
    let mut candidates = vec![requested];
    if requested.is_360() {
        return candidates;
    }

    if best_effort {
        candidates.extend(requested.below());
    } else if fallback != requested && !fallback.is_360() {
        candidates.push(fallback);
    }

    candidates
}

pub struct Negotiator<'a> {
    service: &'a dyn Service,
    listener: &'a dyn Listener,
}

impl<'a> Negotiator<'a> {
    #[must_use]
    pub fn new(service: &'a dyn Service, listener: &'a dyn Listener) -> Self {
        Self { service, listener }
    }

    /// Negotiates the bitrate of `track` and records it, with the resolved
    /// URL, on the track.
    ///
    /// # Errors
    ///
    /// * `Canceled` if `cancel` is set before an attempt
    /// * `WrongLicense` or `WrongGeolocation` as soon as the service rejects
    ///   a candidate for either reason
    /// * `No360RA` if a 360 Reality Audio format is not available
    /// * `WrongBitrate` if no candidate is available
    pub async fn negotiate(
        &self,
        uuid: Uuid,
        track: &mut Track,
        settings: &Settings,
        cancel: &CancellationToken,
    ) -> Result<Format, Failure> {
        let requested = settings.max_bitrate;
        let info = TrackInfo::from(&*track);
        self.listener.stage(uuid, Stage::GetBitrate, &info);

        let candidates = candidates(requested, settings.fallback_bitrate, settings.feeling_lucky);
        let mut degraded = false;

        for format in candidates {
            if cancel.is_cancelled() {
                return Err(Failure::canceled().with_track(track));
            }

            if track.filesize(format) == 0 {
                trace!("{track}: {format} not encoded");
                continue;
            }

            if format != requested && !degraded {
                degraded = true;
                self.listener.stage(uuid, Stage::BitrateFallback, &info);
            }

            match self.service.media_url(track, format).await {
                Ok(Some(url)) if !url.is_empty() => {
                    debug!("{track}: negotiated {format}");
                    track.urls.insert(format, url);
                    track.set_bitrate(format);
                    self.listener
                        .stage(uuid, Stage::GotBitrate, &TrackInfo::from(&*track));
                    return Ok(format);
                }
                Ok(_) => trace!("{track}: {format} not available"),
                Err(MediaError::WrongLicense(format)) => {
                    debug!("{track}: license does not cover {format}");
                    return Err(Failure::new(FailureKind::WrongLicense).with_track(track));
                }
                Err(MediaError::WrongGeolocation { country }) => {
                    debug!("{track}: not available in {country}");
                    return Err(Failure::new(FailureKind::WrongGeolocation).with_track(track));
                }
                Err(MediaError::Other(e)) => {
                    warn!("{track}: could not resolve {format}: {e}");
                }
            }
        }

        let kind = if requested.is_360() {
            FailureKind::No360RA
        } else {
            FailureKind::WrongBitrate
        };
        Err(Failure::new(kind).with_track(track))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_effort_follows_ladder() {
        assert_eq!(
            candidates(Format::FLAC, Format::MP3_128, true),
            [Format::FLAC, Format::MP3_320, Format::MP3_128, Format::MP3_MISC]
        );
        assert_eq!(
            candidates(Format::MP3_128, Format::MP3_320, true),
            [Format::MP3_128, Format::MP3_MISC]
        );
    }

    #[test]
    fn single_fallback_without_best_effort() {
        assert_eq!(
            candidates(Format::MP3_320, Format::MP3_128, false),
            [Format::MP3_320, Format::MP3_128]
        );
        assert_eq!(
            candidates(Format::MP3_320, Format::MP3_320, false),
            [Format::MP3_320]
        );
    }

    #[test]
    fn spatial_audio_is_never_substituted() {
        for best_effort in [false, true] {
            assert_eq!(
                candidates(Format::MP4_RA3, Format::MP3_128, best_effort),
                [Format::MP4_RA3]
            );
        }
        assert_eq!(
            candidates(Format::MP3_320, Format::MP4_RA1, false),
            [Format::MP3_320]
        );
    }

    #[test]
    fn best_effort_is_monotonic() {
        for requested in crate::format::LADDER {
            let candidates = candidates(requested, Format::MP3_128, true);
            assert!(candidates.windows(2).all(|pair| pair[0].rank() > pair[1].rank()));
            assert_eq!(candidates.last(), Some(&Format::MP3_MISC));
        }
    }
}
