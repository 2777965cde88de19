//! This holds types describing nodes in the merkledag, and how a block's
//! bytes are interpreted as one.
mod directory;
mod file;

use bytes::Bytes;
use cid::Cid;
use prost::Message;
use tracing::instrument;

use crate::cids;
use crate::proto::{self, DataType, PbNode};
use crate::Error;

pub use directory::{Directory, DirectoryEntry, DirectoryError};
pub use file::{FileChunk, FileNode};

/// A Node is either a [Directory] or a [FileNode].
/// Nodes themselves don't have names, what gives them names is them being
/// inside a [Directory].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A listing of named links to child nodes.
    Directory(Directory),
    /// File contents, either inline, chunked, or both.
    File(FileNode),
}

/// Interprets the bytes of a block as a [Node], according to the codec of
/// the [Cid] that was used to address it.
///
/// - `raw` blocks are files with their bytes as content.
/// - `dag-pb` blocks carry a UnixFS payload, which decides whether it's a
///   directory or a (chunked) file.
///
/// Everything else is reported as [Error::MalformedNode].
#[instrument(skip(data), fields(node.cid=%cid, node.len=data.len()), err)]
pub fn decode_node(cid: &Cid, data: Bytes) -> Result<Node, Error> {
    match cid.codec() {
        cids::RAW => Ok(Node::File(FileNode::inline(data))),
        cids::DAG_PB => decode_dag_pb(cid, data),
        codec => Err(Error::malformed(cid, format!("unsupported codec 0x{:x}", codec))),
    }
}

fn decode_dag_pb(cid: &Cid, data: Bytes) -> Result<Node, Error> {
    let pb_node = PbNode::decode(data)
        .map_err(|e| Error::malformed(cid, format!("invalid dag-pb: {}", e)))?;

    let unixfs = match &pb_node.data {
        Some(data) => proto::Data::decode(data.clone())
            .map_err(|e| Error::malformed(cid, format!("invalid unixfs data: {}", e)))?,
        None => return Err(Error::malformed(cid, "missing unixfs data")),
    };

    let data_type = unixfs
        .r#type
        .and_then(|t| DataType::try_from(t).ok())
        .ok_or_else(|| Error::malformed(cid, "missing or unknown unixfs type"))?;

    match data_type {
        DataType::Directory => Directory::try_from_links(pb_node.links)
            .map(Node::Directory)
            .map_err(|e| Error::malformed(cid, e.to_string())),
        DataType::File | DataType::Raw => FileNode::try_from_unixfs(unixfs, pb_node.links)
            .map(Node::File)
            .map_err(|reason| Error::malformed(cid, reason)),
        other => Err(Error::malformed(
            cid,
            format!("unsupported unixfs type {:?}", other),
        )),
    }
}
