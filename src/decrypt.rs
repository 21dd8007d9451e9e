//! Stream decryption for Deezer's protected media content.
//!
//! Deezer uses a striped encryption pattern:
//! * Content is divided into 2 KiB blocks
//! * Every third block is encrypted, starting with the first
//! * Only full blocks are encrypted; a short trailing block is plain
//! * Encryption uses Blowfish in CBC mode with a fixed IV, reset per block
//!
//! Unlike a seekable decryptor, [`StripeDecryptor`] works on the byte
//! chunks as they come off the network, in order, keeping at most one
//! partial block between calls.
//!
//! # Security
//!
//! No decryption secret is included in this code. It must be provided
//! externally through the secrets file.

use std::{ops::Deref, str::FromStr};

use blowfish::{
    cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit},
    Blowfish,
};
use md5::{Digest, Md5};

use crate::{
    error::{Error, Result},
    track::TrackId,
};

/// Length of decryption keys in bytes.
pub const KEY_LENGTH: usize = 16;

/// Raw key bytes.
pub type RawKey = [u8; KEY_LENGTH];

/// Validated decryption key.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd, veil::Redact)]
#[redact(all)]
pub struct Key(RawKey);

impl FromStr for Key {
    type Err = Error;

    /// Parses a string into a decryption key.
    ///
    /// # Errors
    ///
    /// Returns `Error::OutOfRange` if the string isn't exactly 16 bytes long.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let len = s.len();
        if len != KEY_LENGTH {
            return Err(Error::out_of_range(format!(
                "key length is {len} but should be {KEY_LENGTH}",
            )));
        }

        let mut key = [0; KEY_LENGTH];
        key.copy_from_slice(s.as_bytes());

        Ok(Self(key))
    }
}

impl Deref for Key {
    type Target = RawKey;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Key {
    /// Derives the track-specific key.
    ///
    /// The hexadecimal MD5 digest of the track id is split in two halves,
    /// which are XOR-ed with each other and with the secret.
    #[must_use]
    pub fn for_track(&self, track_id: TrackId) -> Key {
        let track_hash = format!("{:x}", Md5::digest(track_id.to_string()));
        let track_hash = track_hash.as_bytes();

        let mut key = RawKey::default();
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = track_hash[i] ^ track_hash[i + KEY_LENGTH] ^ self.0[i];
        }
        Key(key)
    }
}

/// Incremental decryptor for a single striped stream.
pub struct StripeDecryptor {
    /// Track-specific key.
    key: Key,

    /// Index of the next block to be emitted.
    block: u64,

    /// Bytes of the current, not yet complete block.
    pending: Vec<u8>,
}

impl StripeDecryptor {
    /// Fixed IV for CBC decryption.
    const CBC_BF_IV: &[u8; 8] = b"\x00\x01\x02\x03\x04\x05\x06\x07";

    /// Size of each block in bytes.
    pub const BLOCK_SIZE: usize = 2 * 1024;

    /// Every this many blocks, one is encrypted.
    const STRIPE_COUNT: u64 = 3;

    /// Creates a decryptor for the track, deriving its key from `secret`.
    #[must_use]
    pub fn new(track_id: TrackId, secret: &Key) -> Self {
        Self {
            key: secret.for_track(track_id),
            block: 0,
            pending: Vec::with_capacity(Self::BLOCK_SIZE),
        }
    }

    /// Feeds a chunk of the encrypted stream and appends all bytes that can
    /// be emitted so far to `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cipher cannot be initialized from the key.
    pub fn update(&mut self, mut chunk: &[u8], out: &mut Vec<u8>) -> Result<()> {
        while !chunk.is_empty() {
            let wanted = Self::BLOCK_SIZE - self.pending.len();
            let take = wanted.min(chunk.len());
            self.pending.extend_from_slice(&chunk[..take]);
            chunk = &chunk[take..];

            if self.pending.len() == Self::BLOCK_SIZE {
                self.flush_block(out)?;
            }
        }

        Ok(())
    }

    /// Emits the trailing partial block, which is never encrypted.
    pub fn finish(mut self, out: &mut Vec<u8>) {
        out.append(&mut self.pending);
    }

    fn flush_block(&mut self, out: &mut Vec<u8>) -> Result<()> {
        if self.block % Self::STRIPE_COUNT == 0 {
            // The state of the cipher is reset on each block.
            let cipher = cbc::Decryptor::<Blowfish>::new_from_slices(&*self.key, Self::CBC_BF_IV)
                .map_err(|e| Error::invalid_argument(e.to_string()))?;

            // The block is a multiple of the cipher block size, so no padding
            // is necessary.
            cipher
                .decrypt_padded_mut::<NoPadding>(&mut self.pending)
                .map_err(|e| Error::data_loss(e.to_string()))?;
        }

        out.append(&mut self.pending);
        self.block += 1;
        Ok(())
    }
}
