use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use tracing::{instrument, warn};

use crate::cids::BlockRef;
use crate::{ContentHash, Error};

mod from_addr;
mod memory;
mod simplefs;
mod sled;

#[cfg(test)]
pub mod tests;

pub use self::from_addr::from_addr;
pub use self::memory::MemoryBlockService;
pub use self::simplefs::SimpleFilesystemBlockService;
pub use self::sled::SledBlockService;

/// The base trait all BlockService services need to implement.
/// It's a plain content-addressed key-value store: blocks go in under the
/// SHA2-256 digest of their bytes, and come back out by it.
/// It knows nothing about what's inside of the blocks.
#[async_trait]
pub trait BlockService: Send + Sync {
    /// Check if the service has the block, by its content hash.
    async fn has(&self, digest: &ContentHash) -> Result<bool, Error>;

    /// Request a block from the store, by its content hash.
    /// Returns `Ok(None)` if the block is not present.
    async fn get(&self, digest: &ContentHash) -> Result<Option<Bytes>, Error>;

    /// Insert a block into the store.
    /// The digest is checked against the data before anything is persisted;
    /// on mismatch, [Error::Integrity] is returned and nothing is written.
    /// Inserting a block that's already present is a no-op.
    async fn put(&self, digest: &ContentHash, data: Bytes) -> Result<(), Error>;
}

#[async_trait]
impl<A> BlockService for A
where
    A: AsRef<dyn BlockService> + Send + Sync,
{
    async fn has(&self, digest: &ContentHash) -> Result<bool, Error> {
        self.as_ref().has(digest).await
    }

    async fn get(&self, digest: &ContentHash) -> Result<Option<Bytes>, Error> {
        self.as_ref().get(digest).await
    }

    async fn put(&self, digest: &ContentHash, data: Bytes) -> Result<(), Error> {
        self.as_ref().put(digest, data).await
    }
}

/// Checks the data hashes to the given digest.
pub(crate) fn verify(digest: &ContentHash, data: &[u8]) -> Result<(), Error> {
    let actual = ContentHash::of(data);
    if &actual != digest {
        return Err(Error::Integrity {
            expected: digest.clone(),
            actual,
        });
    }
    Ok(())
}

/// Like [verify], but for data read back from a storage medium.
/// Bytes that don't match their key are never handed out.
pub(crate) fn verify_read(digest: &ContentHash, data: &[u8]) -> Result<(), Error> {
    verify(digest, data).map_err(|e| {
        warn!(err=%e, "stored block is corrupt");
        Error::StorageError(format!("stored block {} is corrupt", digest))
    })
}

/// Loads the block a [Cid] points to.
///
/// Identity CIDs are answered from the CID itself. CIDs using a hash
/// function we don't key blocks by can't be in the store, so they're
/// reported as absent.
#[instrument(skip(block_service), fields(block.cid=%cid))]
pub async fn read_block<BS>(block_service: &BS, cid: &Cid) -> Result<Option<Bytes>, Error>
where
    BS: BlockService + ?Sized,
{
    match BlockRef::from(cid) {
        BlockRef::Stored(digest) => block_service.get(&digest).await,
        BlockRef::Inline(data) => Ok(Some(data)),
        BlockRef::Unsupported(code) => {
            warn!(multihash.code = code, "unsupported multihash, treating as absent");
            Ok(None)
        }
    }
}
