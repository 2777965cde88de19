//! Imports archives into a [BlockService].
//!
//! The archive is decoded as a whole before anything gets written, so a
//! corrupt archive never leaves partial state behind. Blocks are then
//! written with bounded concurrency, in no particular order: the store has
//! no notion of links, so children don't need to go in before parents.
use std::sync::Arc;

use bytes::Bytes;
use cid::Cid;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, instrument};

use crate::archive::{decode_archive, ArchiveError};
use crate::blockservice::BlockService;
use crate::cids::BlockRef;
use crate::{ContentHash, Error};

/// How many blocks are written to the store at the same time.
const CONCURRENT_PUTS: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("unable to decode archive: {0}")]
    Archive(#[from] ArchiveError),

    #[error("block {0} uses an unsupported hash function")]
    UnsupportedHash(Cid),

    #[error("unable to store block: {0}")]
    Store(#[from] Error),
}

/// Decodes an archive and writes all of its blocks to the [BlockService].
///
/// Returns the first root of the archive, and the number of blocks written.
/// Sections using the identity hash carry their data in the CID, so there's
/// nothing to store for them. Importing the same archive again is a no-op.
#[instrument(skip_all, fields(archive.len = data.len()), err)]
pub async fn import_archive<BS>(block_service: BS, data: Bytes) -> Result<(Cid, usize), ImportError>
where
    BS: BlockService + Clone + 'static,
{
    let archive = decode_archive(data)?;
    let root = *archive.root();

    // check all hash functions first, so we refuse before writing anything.
    let mut blocks: Vec<(ContentHash, Bytes)> = Vec::with_capacity(archive.blocks.len());
    for (cid, data) in archive.blocks {
        match BlockRef::from(&cid) {
            BlockRef::Stored(digest) => blocks.push((digest, data)),
            BlockRef::Inline(_) => continue,
            BlockRef::Unsupported(_) => return Err(ImportError::UnsupportedHash(cid)),
        }
    }

    let count = blocks.len();
    let semaphore = Arc::new(Semaphore::new(CONCURRENT_PUTS));
    let mut puts: JoinSet<Result<(), Error>> = JoinSet::new();

    for (digest, data) in blocks {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| Error::StorageError(e.to_string()))?;
        let block_service = block_service.clone();

        puts.spawn(async move {
            let _permit = permit;
            block_service.put(&digest, data).await
        });
    }

    while let Some(result) = puts.join_next().await {
        result.map_err(Error::from)??;
    }

    info!(root=%root, blocks=count, "imported archive");

    Ok((root, count))
}
