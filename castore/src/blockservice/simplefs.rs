use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use bytes::Bytes;
use data_encoding::HEXLOWER;
use tokio::io::AsyncWriteExt;
use tracing::instrument;

use super::{verify, verify_read, BlockService};
use crate::{ContentHash, Error};

/// Stores blocks as individual files on a POSIX-compliant filesystem.
///
/// It takes an existing path, builds a `tmp` directory and a `blocks` directory inside of it. All
/// blocks received are staged in that `tmp` directory, then they are moved **atomically** into
/// `blocks/DIGEST[:2]/DIGEST` in a sharding style, e.g. `abcdef` gets turned into `ab/abcdef`.
/// A block only ever shows up at its final path once it's been fully written and synced.
#[derive(Clone)]
pub struct SimpleFilesystemBlockService {
    /// Where the blocks are located on a filesystem already mounted.
    path: PathBuf,
}

impl SimpleFilesystemBlockService {
    pub async fn new(path: PathBuf) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(&path).await?;
        tokio::fs::create_dir_all(path.join("tmp")).await?;
        tokio::fs::create_dir_all(path.join("blocks")).await?;

        Ok(Self { path })
    }
}

fn derive_path(root: &Path, digest: &ContentHash) -> PathBuf {
    let prefix = HEXLOWER.encode(&digest.as_slice()[..1]);
    let pathname = HEXLOWER.encode(digest.as_slice());

    root.join("blocks").join(prefix).join(pathname)
}

fn tempfile_error(e: async_tempfile::Error) -> io::Error {
    match e {
        async_tempfile::Error::Io(io_error) => io_error,
        async_tempfile::Error::InvalidFile => io::Error::new(
            io::ErrorKind::NotFound,
            "invalid or missing file specified",
        ),
        async_tempfile::Error::InvalidDirectory => io::Error::new(
            io::ErrorKind::NotFound,
            "invalid or missing directory specified",
        ),
    }
}

#[async_trait]
impl BlockService for SimpleFilesystemBlockService {
    #[instrument(skip_all, ret, err, fields(block.digest=%digest))]
    async fn has(&self, digest: &ContentHash) -> Result<bool, Error> {
        Ok(tokio::fs::try_exists(derive_path(&self.path, digest)).await?)
    }

    #[instrument(skip_all, err, fields(block.digest=%digest))]
    async fn get(&self, digest: &ContentHash) -> Result<Option<Bytes>, Error> {
        let data = match tokio::fs::read(derive_path(&self.path, digest)).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        verify_read(digest, &data)?;

        Ok(Some(data.into()))
    }

    #[instrument(skip_all, err, fields(block.digest=%digest, block.len=data.len()))]
    async fn put(&self, digest: &ContentHash, data: Bytes) -> Result<(), Error> {
        verify(digest, &data)?;

        let dst_path = derive_path(&self.path, digest);
        if tokio::fs::try_exists(&dst_path).await? {
            return Ok(());
        }

        let mut file = async_tempfile::TempFile::new_in(self.path.join("tmp"))
            .await
            .map_err(tempfile_error)?;

        file.write_all(&data).await?;
        file.flush().await?;
        file.sync_all().await?;

        if let Some(parent) = dst_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(file.file_path(), dst_path).await?;

        Ok(())
    }
}
