use cid::Cid;
use tracing::instrument;

use crate::blockservice::{read_block, BlockService};
use crate::nodes::{decode_node, Directory, FileNode, Node};
use crate::Error;

/// What a path resolves to, along with the [Cid] it was found under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    File { cid: Cid, node: FileNode },
    Directory { cid: Cid, directory: Directory },
}

impl Resolved {
    pub fn cid(&self) -> &Cid {
        match self {
            Resolved::File { cid, .. } => cid,
            Resolved::Directory { cid, .. } => cid,
        }
    }
}

/// Loads and decodes the block a [Cid] points to.
/// Returns `Ok(None)` if the block is not present.
pub async fn load_node<BS>(block_service: &BS, cid: &Cid) -> Result<Option<Node>, Error>
where
    BS: BlockService + ?Sized,
{
    match read_block(block_service, cid).await? {
        Some(data) => decode_node(cid, data).map(Some),
        None => Ok(None),
    }
}

/// This descends from a root [Cid] along the given path segments, returning
/// what's at that path, or none, if there's nothing there.
///
/// Segments are matched against directory entry names exactly. Empty
/// segments are expected to be filtered out by the caller.
/// A block missing anywhere along the way means the path can't be reached,
/// which is reported the same as the path not existing.
#[instrument(skip(block_service, segments), fields(root=%root, path=%segments.join("/")), err)]
pub async fn resolve<BS>(
    block_service: &BS,
    root: &Cid,
    segments: &[&str],
) -> Result<Option<Resolved>, Error>
where
    BS: BlockService + ?Sized,
{
    let mut cid = *root;
    let Some(mut node) = load_node(block_service, &cid).await? else {
        return Ok(None);
    };

    for segment in segments {
        let directory = match node {
            // There's still some path left, but this is no directory.
            Node::File(_) => return Ok(None),
            Node::Directory(directory) => directory,
        };

        let Some(entry) = directory.get(segment) else {
            return Ok(None);
        };

        cid = *entry.cid();
        node = match load_node(block_service, &cid).await? {
            Some(node) => node,
            None => return Ok(None),
        };
    }

    Ok(Some(match node {
        Node::File(node) => Resolved::File { cid, node },
        Node::Directory(directory) => Resolved::Directory { cid, directory },
    }))
}
