//! Reuse of logged-in sessions.
//!
//! Logging in costs a gateway round trip. A [`CredentialCache`] lets a
//! process reuse the user data of an earlier login with the same `arl`.
//! Nothing is written to disk.

use std::sync::{Mutex, PoisonError};

use crate::protocol::gateway::UserData;

/// Capability to keep user data between logins.
pub trait CredentialCache: Send + Sync {
    /// Returns the cached user data, if any.
    fn load(&self) -> Option<UserData>;

    /// Replaces the cached user data.
    fn store(&self, data: UserData);
}

/// Disabled-auth mode: reads are always empty and writes are discarded, so
/// every login goes to the gateway.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoCache;

impl CredentialCache for NoCache {
    fn load(&self) -> Option<UserData> {
        None
    }

    fn store(&self, _data: UserData) {}
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    data: Mutex<Option<UserData>>,
}

impl CredentialCache for MemoryCache {
    fn load(&self) -> Option<UserData> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, data: UserData) {
        *self.data.lock().unwrap_or_else(PoisonError::into_inner) = Some(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_data() -> UserData {
        serde_json::from_str(r#"{"USER": {"USER_ID": "1"}, "checkForm": "token"}"#).unwrap()
    }

    #[test]
    fn no_cache_forgets() {
        let cache = NoCache;
        cache.store(user_data());
        assert!(cache.load().is_none());
    }

    #[test]
    fn memory_cache_remembers() {
        let cache = MemoryCache::default();
        assert!(cache.load().is_none());
        cache.store(user_data());
        assert_eq!(cache.load(), Some(user_data()));
    }
}
