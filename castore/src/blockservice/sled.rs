use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use tracing::instrument;

use super::{verify, verify_read, BlockService};
use crate::{ContentHash, Error};

#[derive(Clone)]
pub struct SledBlockService {
    db: sled::Db,
}

impl SledBlockService {
    pub fn new<P: AsRef<Path>>(p: P) -> Result<Self, sled::Error> {
        let config = sled::Config::default()
            .use_compression(false) // is a required parameter
            .path(p);
        let db = config.open()?;

        Ok(Self { db })
    }

    pub fn new_temporary() -> Result<Self, sled::Error> {
        let config = sled::Config::default().temporary(true);
        let db = config.open()?;

        Ok(Self { db })
    }
}

#[async_trait]
impl BlockService for SledBlockService {
    #[instrument(skip(self, digest), fields(block.digest=%digest))]
    async fn has(&self, digest: &ContentHash) -> Result<bool, Error> {
        match self.db.contains_key(digest.as_slice()) {
            Ok(has) => Ok(has),
            Err(e) => Err(Error::StorageError(e.to_string())),
        }
    }

    #[instrument(skip(self, digest), fields(block.digest=%digest))]
    async fn get(&self, digest: &ContentHash) -> Result<Option<Bytes>, Error> {
        match self.db.get(digest.as_slice()) {
            Ok(None) => Ok(None),
            Ok(Some(data)) => {
                verify_read(digest, &data)?;
                Ok(Some(Bytes::copy_from_slice(&data)))
            }
            Err(e) => Err(Error::StorageError(e.to_string())),
        }
    }

    #[instrument(skip(self, digest, data), fields(block.digest=%digest, block.len=data.len()), err)]
    async fn put(&self, digest: &ContentHash, data: Bytes) -> Result<(), Error> {
        verify(digest, &data)?;

        // A single insert is atomic, readers either see all of it or nothing.
        // Identical keys always carry identical values, so overwriting is fine.
        self.db
            .insert(digest.as_slice(), data.as_ref())
            .map_err(|e| Error::StorageError(format!("unable to insert block: {}", e)))?;

        Ok(())
    }
}
