//! The `arl` credential that authenticates a Deezer account.
//!
//! An `arl` is a long-lived cookie value. Anyone holding it has full access
//! to the account, so it is redacted from `Debug` output and only ever
//! leaves this process as a cookie towards `deezer.com`.

use std::{fmt, ops::Deref, str::FromStr};

use veil::Redact;

use crate::error::{Error, Result};

/// Deezer account credential.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Redact)]
#[redact(all)]
pub struct Arl(String);

impl Arl {
    /// Upper bound on the `arl` length. Real values are 192 characters; the
    /// slack accommodates format changes without letting garbage through.
    const MAX_LENGTH: usize = 512;
}

impl Deref for Arl {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Prints the raw `arl`. Only used to build the authentication cookie.
impl fmt::Display for Arl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Arl {
    type Err = Error;

    /// Parses and validates an `arl`.
    ///
    /// Surrounding whitespace is trimmed, which commonly sneaks in when
    /// copying the value from browser developer tools.
    ///
    /// # Errors
    ///
    /// * `InvalidArgument` if the `arl` is empty or contains characters
    ///   that are not allowed in a cookie value
    /// * `OutOfRange` if the `arl` is unreasonably long
    fn from_str(s: &str) -> Result<Self> {
        let arl = s.trim();
        if arl.is_empty() {
            return Err(Error::invalid_argument("arl is empty"));
        }

        let len = arl.len();
        if len > Self::MAX_LENGTH {
            return Err(Error::out_of_range(format!(
                "arl is {len} characters long but should be at most {}",
                Self::MAX_LENGTH
            )));
        }

        // Cookie values must be visible ASCII without separators.
        let illegal = |chr: char| !chr.is_ascii_graphic() || matches!(chr, ';' | ',' | '"' | '\\');
        if arl.contains(illegal) {
            return Err(Error::invalid_argument("arl contains invalid characters"));
        }

        Ok(Self(arl.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_trims() {
        let arl: Arl = "  abcdef0123456789\n".parse().unwrap();
        assert_eq!(arl.as_str(), "abcdef0123456789");
    }

    #[test]
    fn rejects_empty_and_illegal() {
        assert!("".parse::<Arl>().is_err());
        assert!("   ".parse::<Arl>().is_err());
        assert!("abc;def".parse::<Arl>().is_err());
        assert!("abc def".parse::<Arl>().is_err());
        assert!("a".repeat(513).parse::<Arl>().is_err());
    }

    #[test]
    fn debug_is_redacted() {
        let arl: Arl = "supersecretvalue".parse().unwrap();
        assert!(!format!("{arl:?}").contains("supersecretvalue"));
    }
}
