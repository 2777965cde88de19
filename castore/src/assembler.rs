use bytes::{Bytes, BytesMut};
use tracing::{debug, instrument};

use crate::blockservice::BlockService;
use crate::nodes::{FileChunk, FileNode, Node};
use crate::resolver::load_node;
use crate::Error;

/// Upper bound for preallocating the output, the declared size is not
/// trusted beyond this.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// Pushes the chunks of a file onto the stack, so they pop off in order.
fn push_chunks(stack: &mut Vec<FileChunk>, file: &FileNode) {
    stack.extend(file.chunks().iter().rev().cloned());
}

/// Reconstructs the full contents of a file.
///
/// Chunks are loaded and expanded depth-first, to whatever depth the file
/// tree has. Each chunk needs to decode as a file itself, with the size its
/// parent declared for it, so the output never grows past `file.size()`.
/// If any chunk is missing, `Ok(None)` is returned; the contents are never
/// handed out partially.
#[instrument(skip_all, fields(file.size = file.size(), file.chunks = file.chunks().len()), err)]
pub async fn assemble<BS>(block_service: &BS, file: &FileNode) -> Result<Option<Bytes>, Error>
where
    BS: BlockService + ?Sized,
{
    if !file.is_chunked() {
        return Ok(Some(file.data().clone()));
    }

    let mut buf = BytesMut::with_capacity(file.size().min(MAX_PREALLOC) as usize);
    buf.extend_from_slice(file.data());

    let mut stack = Vec::new();
    push_chunks(&mut stack, file);

    while let Some(chunk) = stack.pop() {
        let cid = chunk.cid();
        let node = match load_node(block_service, cid).await? {
            Some(Node::File(node)) => node,
            Some(Node::Directory(_)) => {
                return Err(Error::malformed(cid, "file chunk is a directory"))
            }
            None => {
                debug!(chunk.cid=%cid, "chunk not found");
                return Ok(None);
            }
        };

        if node.size() != chunk.size() {
            return Err(Error::malformed(
                cid,
                format!(
                    "chunk holds {} bytes, but its parent declares {}",
                    node.size(),
                    chunk.size()
                ),
            ));
        }

        if (buf.len() + node.data().len()) as u64 > file.size() {
            return Err(Error::malformed(
                cid,
                format!("contents exceed the declared file size of {}", file.size()),
            ));
        }

        buf.extend_from_slice(node.data());

        // an empty chunk can't contribute any bytes, no matter how many
        // children it links to.
        if node.size() > 0 {
            push_chunks(&mut stack, &node);
        }
    }

    Ok(Some(buf.freeze()))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use cid::Cid;

    use super::assemble;
    use crate::blockservice::{BlockService, MemoryBlockService};
    use crate::cids::{self, cid_for};
    use crate::fixtures::{encode_dag_pb, DagBuilder, DagFixture, BIG, BIG_FILE_SIZE};
    use crate::import::import_archive;
    use crate::nodes::{FileChunk, FileNode, Node};
    use crate::proto::{Data, DataType, PbLink};
    use crate::resolver::{load_node, resolve, Resolved};
    use crate::{ContentHash, Error};

    async fn store_of(fixture: &DagFixture) -> MemoryBlockService {
        let block_service = MemoryBlockService::default();
        import_archive(block_service.clone(), fixture.car())
            .await
            .expect("must import");
        block_service
    }

    async fn root_file(block_service: &MemoryBlockService, fixture: &DagFixture) -> FileNode {
        match load_node(block_service, &fixture.root).await {
            Ok(Some(Node::File(file))) => file,
            other => panic!("expected file, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn inline_only() {
        let block_service = MemoryBlockService::default();
        let file = FileNode::inline(Bytes::from_static(b"hello"));

        assert_eq!(
            Some(Bytes::from_static(b"hello")),
            assemble(&block_service, &file).await.expect("must succeed")
        );
    }

    #[tokio::test]
    async fn big_file() {
        let block_service = store_of(&BIG).await;

        let Some(Resolved::File { node, .. }) =
            resolve(&block_service, &BIG.root, &["big", "file"])
                .await
                .expect("must succeed")
        else {
            panic!("expected file");
        };
        assert_eq!(BIG_FILE_SIZE as u64, node.size());

        let data = assemble(&block_service, &node)
            .await
            .expect("must succeed")
            .expect("must be some");

        assert_eq!(BIG_FILE_SIZE, data.len());
        assert!(data.iter().all(|b| *b == 0));
    }

    /// Inline bytes come before chunks, and nested files expand in place.
    #[tokio::test]
    async fn ordering() {
        let mut b = DagBuilder::new();
        let a = b.raw(b"a");
        let c = b.raw(b"c");
        let inner = b.file(b"b", &[c]);
        let d = b.raw(b"d");
        let root = b.file(b"0", &[a, inner, d]);
        let fixture = b.finish(root);

        let block_service = store_of(&fixture).await;
        let file = root_file(&block_service, &fixture).await;

        assert_eq!(
            Some(Bytes::from_static(b"0abcd")),
            assemble(&block_service, &file).await.expect("must succeed")
        );
    }

    #[tokio::test]
    async fn missing_chunk() {
        let mut b = DagBuilder::new();
        let a = b.raw(b"a");
        let c = b.raw(b"c");
        let root = b.file(b"", &[a, c]);
        let fixture = b.finish(root);

        // store everything except the last chunk
        let block_service = MemoryBlockService::default();
        for (cid, data) in &fixture.blocks {
            if *cid != c {
                block_service
                    .put(&ContentHash::of(data), data.clone())
                    .await
                    .expect("must put");
            }
        }

        let file = root_file(&block_service, &fixture).await;
        assert_eq!(
            None,
            assemble(&block_service, &file).await.expect("must succeed")
        );
    }

    #[tokio::test]
    async fn directory_chunk() {
        let mut b = DagBuilder::new();
        let a = b.raw(b"a");
        let dir = b.directory(&[("a", a)]);
        let fixture = b.finish(dir);
        let block_service = store_of(&fixture).await;

        let file = FileNode::new(Bytes::new(), vec![FileChunk::new(dir, 1)]);
        assert!(matches!(
            assemble(&block_service, &file).await,
            Err(Error::MalformedNode { cid, .. }) if cid == dir
        ));
    }

    /// A chunk holding fewer bytes than its parent declares is rejected.
    #[tokio::test]
    async fn size_mismatch() {
        let block_service = MemoryBlockService::default();
        block_service
            .put(&ContentHash::of(b"a"), Bytes::from_static(b"a"))
            .await
            .expect("must put");

        let chunk_cid = cid_for(cids::RAW, b"a");
        let file = FileNode::new(Bytes::new(), vec![FileChunk::new(chunk_cid, 5)]);
        assert_eq!(5, file.size());
        assert!(matches!(
            assemble(&block_service, &file).await,
            Err(Error::MalformedNode { cid, .. }) if cid == chunk_cid
        ));
    }

    /// Encodes a file node linking `fanout` times to `child`, declaring
    /// `blocksize` bytes for each link.
    fn repeating_file(child: Cid, fanout: usize, blocksize: u64) -> (Cid, Bytes) {
        encode_dag_pb(
            vec![
                PbLink {
                    hash: Some(child.to_bytes().into()),
                    name: Some(String::new()),
                    tsize: Some(blocksize),
                };
                fanout
            ],
            Data {
                r#type: Some(DataType::File as i32),
                filesize: Some(blocksize * fanout as u64),
                blocksizes: vec![blocksize; fanout],
                ..Default::default()
            },
        )
    }

    /// A small DAG linking the same leaf over and over can't make the
    /// output grow past what the root declares.
    #[tokio::test]
    async fn repeated_links_bounded() {
        let leaf = Bytes::from(vec![0u8; 64 * 1024]);
        let leaf_cid = cid_for(cids::RAW, &leaf);
        let (mid_cid, mid) = repeating_file(leaf_cid, 64, 1);
        let (root_cid, root) = repeating_file(mid_cid, 64, 64);

        let block_service = MemoryBlockService::default();
        for data in [&leaf, &mid, &root] {
            block_service
                .put(&ContentHash::of(data), data.clone())
                .await
                .expect("must put");
        }

        let Some(Node::File(file)) = load_node(&block_service, &root_cid)
            .await
            .expect("must decode")
        else {
            panic!("expected file");
        };
        assert_eq!(64 * 64, file.size());

        assert!(matches!(
            assemble(&block_service, &file).await,
            Err(Error::MalformedNode { cid, .. }) if cid == leaf_cid
        ));
    }

    /// A parent can't declare less for a chunk than the chunk itself does.
    #[tokio::test]
    async fn chunk_larger_than_declared() {
        let (mid_cid, mid) = repeating_file(cid_for(cids::RAW, b"a"), 64, 1);

        let block_service = MemoryBlockService::default();
        block_service
            .put(&ContentHash::of(&mid), mid.clone())
            .await
            .expect("must put");

        let file = FileNode::new(Bytes::new(), vec![FileChunk::new(mid_cid, 1)]);
        assert!(matches!(
            assemble(&block_service, &file).await,
            Err(Error::MalformedNode { cid, .. }) if cid == mid_cid
        ));
    }

    /// Chunks declaring zero bytes contribute nothing, even when their
    /// children would.
    #[tokio::test]
    async fn zero_sized_chunks() {
        let leaf = Bytes::from_static(b"never read");
        let leaf_cid = cid_for(cids::RAW, &leaf);
        let (mid_cid, mid) = repeating_file(leaf_cid, 64, 0);

        let block_service = MemoryBlockService::default();
        block_service
            .put(&ContentHash::of(&mid), mid.clone())
            .await
            .expect("must put");

        let file = FileNode::new(
            Bytes::from_static(b"x"),
            vec![FileChunk::new(mid_cid, 0), FileChunk::new(mid_cid, 0)],
        );
        assert_eq!(
            Some(Bytes::from_static(b"x")),
            assemble(&block_service, &file).await.expect("must succeed")
        );
    }
}
