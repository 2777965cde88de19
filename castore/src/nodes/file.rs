use bytes::Bytes;
use cid::Cid;

use crate::proto::{self, PbLink};

/// A reference to a part of a file's contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChunk {
    cid: Cid,
    /// Number of content bytes below this link.
    size: u64,
}

impl FileChunk {
    pub fn new(cid: Cid, size: u64) -> Self {
        Self { cid, size }
    }

    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// A FileNode holds file contents: some bytes inline, followed by the
/// contents of each of its chunks, in order.
/// A chunk may point to another chunked FileNode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    data: Bytes,
    chunks: Vec<FileChunk>,
    /// The total content size, as declared by the producer.
    size: u64,
}

fn checked_sum(iter: impl IntoIterator<Item = u64>) -> Option<u64> {
    iter.into_iter().try_fold(0u64, |acc, i| acc.checked_add(i))
}

impl FileNode {
    /// A file whose contents are entirely inline.
    pub fn inline(data: Bytes) -> Self {
        Self {
            size: data.len() as u64,
            data,
            chunks: vec![],
        }
    }

    pub fn new(data: Bytes, chunks: Vec<FileChunk>) -> Self {
        let size = (data.len() as u64).saturating_add(
            checked_sum(chunks.iter().map(|c| c.size)).unwrap_or(u64::MAX),
        );
        Self { data, chunks, size }
    }

    /// Builds a FileNode from a UnixFS `File` or `Raw` payload and the links
    /// of the dag-pb node carrying it.
    /// Links and `blocksizes` are paired up by position, so they must agree
    /// in count, and a declared `filesize` must match the inline bytes plus
    /// all blocksizes.
    pub(crate) fn try_from_unixfs(unixfs: proto::Data, links: Vec<PbLink>) -> Result<Self, String> {
        if links.len() != unixfs.blocksizes.len() {
            return Err(format!(
                "{} links, but {} blocksizes",
                links.len(),
                unixfs.blocksizes.len()
            ));
        }

        let chunks = links
            .into_iter()
            .zip(unixfs.blocksizes)
            .enumerate()
            .map(|(i, (link, size))| {
                let hash = link
                    .hash
                    .ok_or_else(|| format!("chunk #{} is missing its hash", i))?;
                let cid = Cid::try_from(hash.as_ref())
                    .map_err(|e| format!("chunk #{} has an invalid cid: {}", i, e))?;
                Ok(FileChunk::new(cid, size))
            })
            .collect::<Result<Vec<_>, String>>()?;

        let data = unixfs.data.unwrap_or_default();

        let size = checked_sum(
            std::iter::once(data.len() as u64).chain(chunks.iter().map(|c| c.size)),
        )
        .ok_or_else(|| "file size exceeds u64::MAX".to_string())?;

        if let Some(filesize) = unixfs.filesize {
            if filesize != size {
                return Err(format!(
                    "filesize is {}, but data and blocksizes add up to {}",
                    filesize, size
                ));
            }
        }

        Ok(Self { data, chunks, size })
    }

    /// The bytes stored in this node itself, preceding all chunks.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// The chunks, in content order, with the number of bytes each covers.
    /// Offsets of each chunk can be derived from these.
    pub fn chunks(&self) -> &[FileChunk] {
        &self.chunks
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_chunked(&self) -> bool {
        !self.chunks.is_empty()
    }
}
