use bytes::Bytes;
use data_encoding::HEXLOWER;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// The SHA2-256 digest of a block's raw bytes.
/// This is the only key the block store knows about.
#[derive(PartialEq, Eq, Hash)]
pub struct ContentHash(Bytes);

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid digest length: {0}")]
    InvalidDigestLen(usize),
}

pub const SHA256_LEN: usize = 32;

impl ContentHash {
    /// Hashes the given data.
    pub fn of(data: &[u8]) -> Self {
        let digest: [u8; SHA256_LEN] = Sha256::digest(data).into();
        Self::from(&digest)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0[..]
    }
}

impl From<ContentHash> for bytes::Bytes {
    fn from(val: ContentHash) -> Self {
        val.0
    }
}

impl TryFrom<Vec<u8>> for ContentHash {
    type Error = Error;

    // constructs a [ContentHash] from a [Vec<u8>].
    // Returns an error if the digest has the wrong length.
    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        if value.len() != SHA256_LEN {
            Err(Error::InvalidDigestLen(value.len()))
        } else {
            Ok(Self(value.into()))
        }
    }
}

impl TryFrom<&[u8]> for ContentHash {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.len() != SHA256_LEN {
            Err(Error::InvalidDigestLen(value.len()))
        } else {
            Ok(Self(Bytes::copy_from_slice(value)))
        }
    }
}

impl From<&[u8; SHA256_LEN]> for ContentHash {
    fn from(value: &[u8; SHA256_LEN]) -> Self {
        Self(value.to_vec().into())
    }
}

impl Clone for ContentHash {
    fn clone(&self) -> Self {
        Self(self.0.to_owned())
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", HEXLOWER.encode(&self.0))
    }
}

impl std::fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", HEXLOWER.encode(&self.0))
    }
}
