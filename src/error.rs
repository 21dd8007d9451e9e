//! Infrastructure error handling for dzstream.
//!
//! Provides a unified error type for everything below the download pipeline
//! (HTTP, configuration, wire parsing), based on gRPC status codes, with
//! mapping from various underlying errors to appropriate categories.
//!
//! Domain failures of the pipeline itself (a track not being encoded, a
//! bitrate not being available, ...) are not represented here but in
//! [`crate::failure`], which keeps these errors as their source.
//!
//! # Error Categories
//!
//! * Authentication/authorization failures (401, 403)
//! * Resource state (404, 409)
//! * Client errors (400, 429)
//! * Server errors (500, 501, 503)
//! * Timeouts and cancellation (499, 504)
//!
//! # Example
//!
//! ```rust
//! use dzstream::error::{Error, ErrorKind, Result};
//!
//! fn album_title(payload: Option<&str>) -> Result<String> {
//!     let title = payload.ok_or_else(|| Error::not_found("album has no title"))?;
//!     Ok(title.to_owned())
//! }
//! ```

#![allow(clippy::enum_glob_use)]

use std::fmt;
use thiserror::Error;

/// Main error type combining error kind and details.
#[derive(Debug)]
pub struct Error {
    /// Classification of the error
    pub kind: ErrorKind,

    /// Details of the underlying error
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

/// Standard result type for dzstream operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories based on gRPC status codes.
///
/// See [gRPC status codes](https://github.com/googleapis/googleapis/blob/master/google/rpc/code.proto)
/// for the original definitions.
#[expect(clippy::module_name_repetitions)]
#[derive(Clone, Copy, Debug, Eq, Error, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u32)]
pub enum ErrorKind {
    /// HTTP Mapping: 499 Client Closed Request
    #[error("operation was cancelled")]
    Cancelled = 1,

    /// HTTP Mapping: 500 Internal Server Error
    #[error("unknown error")]
    Unknown = 2,

    /// HTTP Mapping: 400 Bad Request
    #[error("invalid argument specified")]
    InvalidArgument = 3,

    /// HTTP Mapping: 504 Gateway Timeout
    #[error("operation timed out")]
    DeadlineExceeded = 4,

    /// HTTP Mapping: 404 Not Found
    #[error("not found")]
    NotFound = 5,

    /// HTTP Mapping: 409 Conflict
    #[error("attempt to create what already exists")]
    AlreadyExists = 6,

    /// HTTP Mapping: 403 Forbidden
    #[error("permission denied")]
    PermissionDenied = 7,

    /// HTTP Mapping: 429 Too Many Requests
    #[error("resource has been exhausted")]
    ResourceExhausted = 8,

    /// HTTP Mapping: 400 Bad Request
    #[error("invalid state")]
    FailedPrecondition = 9,

    /// HTTP Mapping: 409 Conflict
    #[error("operation aborted")]
    Aborted = 10,

    /// HTTP Mapping: 400 Bad Request
    #[error("out of range")]
    OutOfRange = 11,

    /// HTTP Mapping: 501 Not Implemented
    #[error("not implemented")]
    Unimplemented = 12,

    /// HTTP Mapping: 500 Internal Server Error
    #[error("internal error")]
    Internal = 13,

    /// HTTP Mapping: 503 Service Unavailable
    #[error("service unavailable")]
    Unavailable = 14,

    /// HTTP Mapping: 500 Internal Server Error
    #[error("unrecoverable data loss or corruption")]
    DataLoss = 15,

    /// HTTP Mapping: 401 Unauthorized
    #[error("no valid authentication credentials")]
    Unauthenticated = 16,
}

/// Generates one constructor per [`ErrorKind`].
macro_rules! constructors {
    ($($(#[$doc:meta])* $name:ident => $kind:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $name<E>(error: E) -> Self
            where
                E: Into<Box<dyn std::error::Error + Send + Sync>>,
            {
                Self::new(ErrorKind::$kind, error)
            }
        )*
    };
}

impl Error {
    /// Creates a new error with specified kind and details.
    pub fn new<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind,
            error: error.into(),
        }
    }

    constructors! {
        /// A transfer or request was interrupted mid-flight.
        aborted => Aborted;
        /// Something was created twice.
        already_exists => AlreadyExists;
        /// The caller stopped the operation.
        cancelled => Cancelled;
        /// A payload or stream was truncated or corrupted.
        data_loss => DataLoss;
        /// A network operation timed out.
        deadline_exceeded => DeadlineExceeded;
        /// The session is not in a state to perform the operation, e.g. not
        /// logged in yet.
        failed_precondition => FailedPrecondition;
        /// Should not happen during normal operation.
        internal => Internal;
        /// Malformed user input or wire data.
        invalid_argument => InvalidArgument;
        /// The catalog does not know the requested object.
        not_found => NotFound;
        /// A value exceeded its allowed bounds, e.g. a secret of the wrong length.
        out_of_range => OutOfRange;
        /// The account lacks the rights for the operation.
        permission_denied => PermissionDenied;
        /// A quota or storage limit was reached.
        resource_exhausted => ResourceExhausted;
        /// The credential is missing, invalid or expired.
        unauthenticated => Unauthenticated;
        /// The service could not be reached or refused to serve.
        unavailable => Unavailable;
        /// The operation is not supported.
        unimplemented => Unimplemented;
        /// Fits no other category.
        unknown => Unknown;
    }

    /// Attempts to downcast the underlying error to a concrete type.
    #[must_use]
    pub fn downcast<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.error.downcast_ref::<E>()
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}

/// Formats the error as `"{kind}: {details}"`.
impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}: ", self.kind)?;
        self.error.fmt(fmt)
    }
}

/// Converts IO errors into appropriate error kinds.
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        match err.kind() {
            NotFound => Self::not_found(err),
            PermissionDenied => Self::permission_denied(err),
            AddrInUse | AlreadyExists => Self::already_exists(err),
            AddrNotAvailable | ConnectionRefused | NotConnected => Self::unavailable(err),
            BrokenPipe | ConnectionReset | ConnectionAborted => Self::aborted(err),
            Interrupted | WouldBlock => Self::cancelled(err),
            UnexpectedEof => Self::data_loss(err),
            TimedOut => Self::deadline_exceeded(err),
            InvalidInput | InvalidData => Self::invalid_argument(err),
            WriteZero | StorageFull => Self::resource_exhausted(err),
            _ => Self::unknown(err),
        }
    }
}

/// Converts HTTP client errors into appropriate error kinds.
///
/// Status errors are mapped by their status code, so that a `403` from the
/// CDN reads as "permission denied" rather than a generic failure.
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_body() {
            return Self::data_loss(err);
        }

        if err.is_decode() {
            return Self::invalid_argument(err);
        }

        if err.is_builder() {
            return Self::internal(err);
        }

        if err.is_connect() {
            return Self::unavailable(err);
        }

        if err.is_redirect() {
            return Self::resource_exhausted(err);
        }

        if let Some(status) = err.status() {
            return match status.as_u16() {
                401 => Self::unauthenticated(err),
                403 => Self::permission_denied(err),
                404 | 410 => Self::not_found(err),
                429 => Self::resource_exhausted(err),
                _ => Self::unavailable(err),
            };
        }

        if err.is_timeout() {
            return Self::deadline_exceeded(err);
        }

        Self::unknown(err)
    }
}

/// Converts JSON errors through IO error mapping.
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        std::io::Error::from(err).into()
    }
}

/// Converts TOML parsing errors to `InvalidArgument`.
impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::invalid_argument(e.to_string())
    }
}

/// Converts URL parsing errors to `InvalidArgument`.
impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::invalid_argument(e.to_string())
    }
}

/// Converts integer parsing errors to `InvalidArgument`.
impl From<std::num::ParseIntError> for Error {
    fn from(e: std::num::ParseIntError) -> Self {
        Self::invalid_argument(e.to_string())
    }
}

/// Converts UUID errors to `InvalidArgument`.
impl From<uuid::Error> for Error {
    fn from(e: uuid::Error) -> Self {
        Self::invalid_argument(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_kinds() {
        let err = Error::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(err.kind, ErrorKind::NotFound);

        let err = Error::from(std::io::Error::from(std::io::ErrorKind::TimedOut));
        assert_eq!(err.kind, ErrorKind::DeadlineExceeded);

        let err = Error::from(std::io::Error::from(std::io::ErrorKind::StorageFull));
        assert_eq!(err.kind, ErrorKind::ResourceExhausted);
    }

    #[test]
    fn display_shows_kind_and_details() {
        let err = Error::not_found("album 42");
        assert_eq!(err.to_string(), "not found: album 42");
    }

    #[test]
    fn constructors_set_kind() {
        assert_eq!(Error::unauthenticated("arl").kind, ErrorKind::Unauthenticated);
        assert_eq!(Error::out_of_range("key").kind, ErrorKind::OutOfRange);
    }

    #[test]
    fn downcast_reaches_underlying_error() {
        let err = Error::new(
            ErrorKind::Unknown,
            std::io::Error::other("disk on fire"),
        );
        assert!(err.downcast::<std::io::Error>().is_some());
    }
}
