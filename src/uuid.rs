//! Run identifiers with fast random generation.
//!
//! Every container gets a UUID when it is created for a run. The UUID ties
//! together log lines, progress events and per-track failures of the same
//! container, so that a listener can correlate bitrate fallbacks and queue
//! updates without keeping references to the container itself.
//!
//! Generation uses `fastrand` rather than a cryptographically secure
//! generator: run ids only need to be unique, not unpredictable.

use std::{fmt, ops::Deref, str::FromStr};

use serde::Serialize;

use crate::error::Error;

/// A wrapper around `uuid::Uuid` that serializes as its hyphenated string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Uuid(pub uuid::Uuid);

impl Deref for Uuid {
    type Target = uuid::Uuid;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Uuid {
    /// Generates a new random UUID v4 using a fast random number generator.
    #[must_use]
    pub fn fast_v4() -> Self {
        let random_bytes = fastrand::u128(..).to_ne_bytes();
        let uuid = uuid::Builder::from_random_bytes(random_bytes).into_uuid();
        Self(uuid)
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Uuid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(Self).map_err(Into::into)
    }
}

impl From<Uuid> for uuid::Uuid {
    fn from(value: Uuid) -> Self {
        *value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_v4_is_version_4() {
        let uuid = Uuid::fast_v4();
        assert_eq!(uuid.get_version_num(), 4);
        assert_ne!(uuid, Uuid::fast_v4());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        let uuid = Uuid::fast_v4();
        assert_eq!(uuid.to_string().parse::<Uuid>().unwrap(), uuid);
        assert!("not-a-uuid".parse::<Uuid>().is_err());
    }
}
