//! Gateway API types.
//!
//! The gateway is the private API behind the Deezer web player. Every call
//! names a method (`deezer.getUserData`, `song.getData`, ...) and answers
//! with an envelope holding an `error` map and the `results`.
//!
//! # Response Types
//!
//! The API returns two types of responses:
//! * Paginated lists ([`Response::Paginated`])
//! * Simple results ([`Response::Unpaginated`])
//!
//! On success `error` is an empty list; on failure it is an object mapping
//! error keys to messages, typically with empty `results`:
//!
//! ```json
//! {
//!     "error": { "DATA_ERROR": "song_not_found" },
//!     "results": {}
//! }
//! ```

pub mod song_data;
pub mod user_data;

pub use song_data::{FileSizes, SongData, SongQuery};
pub use user_data::UserData;

use std::collections::HashMap;

use serde::Deserialize;
use serde_with::{serde_as, PickFirst, Seq};

/// Defines a gateway API method identifier.
pub trait Method {
    /// The gateway API method name in dot-notation, e.g. `"song.getData"`.
    const METHOD: &'static str;
}

/// Response from a Deezer gateway API endpoint.
#[serde_as]
#[derive(Clone, PartialEq, Deserialize, Debug)]
#[serde(untagged, bound(deserialize = "T: Deserialize<'de>"))]
pub enum Response<T> {
    /// Paginated response with result counts
    Paginated {
        /// API status information
        #[serde_as(as = "PickFirst<(Seq<(_, _)>, _)>")]
        #[serde(default)]
        error: HashMap<String, serde_json::Value>,
        /// Paginated result set
        results: Paginated<T>,
    },

    /// Direct response with results array
    Unpaginated {
        /// API status information
        #[serde_as(as = "PickFirst<(Seq<(_, _)>, _)>")]
        #[serde(default)]
        error: HashMap<String, serde_json::Value>,
        /// Result items (single item or array)
        #[serde_as(as = "serde_with::OneOrMany<_>")]
        #[serde(default)]
        results: Vec<T>,
    },

    /// Error response whose `results` do not match the method's type
    Failed {
        #[serde_as(as = "PickFirst<(Seq<(_, _)>, _)>")]
        #[serde(default)]
        error: HashMap<String, serde_json::Value>,
    },
}

impl<T> Response<T> {
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.all().first()
    }

    #[must_use]
    pub fn all(&self) -> &[T] {
        match self {
            Self::Paginated { results, .. } => &results.data,
            Self::Unpaginated { results, .. } => results,
            Self::Failed { .. } => &[],
        }
    }

    /// Consumes the response and returns its first result.
    #[must_use]
    pub fn into_first(self) -> Option<T> {
        match self {
            Self::Paginated { results, .. } => results.data.into_iter().next(),
            Self::Unpaginated { results, .. } => results.into_iter().next(),
            Self::Failed { .. } => None,
        }
    }

    /// The error map, empty on success.
    #[must_use]
    pub fn errors(&self) -> &HashMap<String, serde_json::Value> {
        match self {
            Self::Paginated { error, .. }
            | Self::Unpaginated { error, .. }
            | Self::Failed { error } => error,
        }
    }

    /// Renders the error map as `KEY: message` pairs, or `None` on success.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        let errors = self.errors();
        if errors.is_empty() {
            return None;
        }

        let mut pairs: Vec<_> = errors
            .iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(message) => format!("{key}: {message}"),
                other => format!("{key}: {other}"),
            })
            .collect();
        pairs.sort();
        Some(pairs.join("; "))
    }
}

/// Paginated result set from the Deezer gateway API.
#[derive(Clone, PartialEq, Deserialize, Debug)]
pub struct Paginated<T> {
    /// Items in this page of results
    pub data: Vec<T>,
    /// Number of items in this page
    #[serde(default)]
    pub count: u64,
    /// Total number of items available
    #[serde(default)]
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Deserialize)]
    struct Item {
        name: String,
    }

    /// Parses with no bounds on `T` beyond `Deserialize`, as the gateway
    /// client does.
    fn parse<T>(body: &str) -> Response<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn results_need_only_deserialize() {
        #[derive(Debug, Deserialize)]
        struct Id(u64);

        let response: Response<Id> = parse(r#"{"error": [], "results": [7, 8]}"#);
        assert_eq!(response.all().len(), 2);
        assert_eq!(response.into_first().map(|id| id.0), Some(7));
    }

    #[test]
    fn unpaginated_single_object() {
        let response: Response<Item> =
            serde_json::from_str(r#"{"error": [], "results": {"name": "a"}}"#).unwrap();
        assert_eq!(response.first().map(|item| item.name.as_str()), Some("a"));
        assert!(response.error_message().is_none());
    }

    #[test]
    fn paginated_list() {
        let response: Response<Item> = serde_json::from_str(
            r#"{"error": {}, "results": {"data": [{"name": "a"}, {"name": "b"}], "count": 2, "total": 2}}"#,
        )
        .unwrap();
        assert_eq!(response.all().len(), 2);
    }

    #[test]
    fn error_envelope() {
        let response: Response<Item> = serde_json::from_str(
            r#"{"error": {"DATA_ERROR": "song_not_found"}, "results": {}}"#,
        )
        .unwrap();
        assert!(response.first().is_none());
        assert_eq!(
            response.error_message().as_deref(),
            Some("DATA_ERROR: song_not_found")
        );
    }
}
