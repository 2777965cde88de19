use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::instrument;

use super::{verify, BlockService};
use crate::{ContentHash, Error};

#[derive(Clone, Default)]
pub struct MemoryBlockService {
    db: Arc<RwLock<HashMap<ContentHash, Bytes>>>,
}

#[async_trait]
impl BlockService for MemoryBlockService {
    #[instrument(skip(self, digest), fields(block.digest=%digest))]
    async fn has(&self, digest: &ContentHash) -> Result<bool, Error> {
        let db = self.db.read();
        Ok(db.contains_key(digest))
    }

    #[instrument(skip(self, digest), fields(block.digest=%digest))]
    async fn get(&self, digest: &ContentHash) -> Result<Option<Bytes>, Error> {
        let db = self.db.read();
        Ok(db.get(digest).cloned())
    }

    #[instrument(skip(self, digest, data), fields(block.digest=%digest, block.len=data.len()), err)]
    async fn put(&self, digest: &ContentHash, data: Bytes) -> Result<(), Error> {
        verify(digest, &data)?;

        // Only insert if the block doesn't already exist.
        if self.db.read().contains_key(digest) {
            return Ok(());
        }

        self.db.write().entry(digest.clone()).or_insert(data);

        Ok(())
    }
}
