use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use cid::Cid;
use lazy_static::lazy_static;
use prost::Message;
use serde_cbor::Value;

use crate::cids::{self, cid_for};
use crate::proto::{Data, DataType, PbLink, PbNode};
use crate::ContentHash;

pub const HELLO_CONTENTS: &[u8] = b"Hello, World\n";
pub const CSS_CONTENTS: &[u8] = b"html { line-height: 1.15; }\n";
pub const INDEX_HTML_CONTENTS: &[u8] = b"<html><head><title>web4: Unstoppable websites on NEAR blockchain and IPFS/Filecoin.</title></head><body></body></html>\n";

/// Size of the big all-zero file.
pub const BIG_FILE_SIZE: usize = 1024 * 1024;
/// Size of each leaf the big file is split into.
pub const BIG_FILE_CHUNK_SIZE: usize = 256 * 1024;

/// Encodes a dag-pb node with the given links and UnixFS payload, returning
/// its CID and bytes.
pub fn encode_dag_pb(links: Vec<PbLink>, unixfs: Data) -> (Cid, Bytes) {
    let data: Bytes = PbNode {
        links,
        data: Some(unixfs.encode_to_vec().into()),
    }
    .encode_to_vec()
    .into();

    (cid_for(cids::DAG_PB, &data), data)
}

/// Builds up a DAG bottom-up, keeping every block produced.
#[derive(Default)]
pub struct DagBuilder {
    blocks: Vec<(Cid, Bytes)>,
    /// number of content bytes below each file cid.
    content_sizes: HashMap<Cid, u64>,
    /// cumulative block bytes below each cid.
    tsizes: HashMap<Cid, u64>,
}

impl DagBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, cid: Cid, data: Bytes, tsize: u64) {
        if !self.tsizes.contains_key(&cid) {
            self.blocks.push((cid, data));
            self.tsizes.insert(cid, tsize);
        }
    }

    /// Adds a raw leaf.
    pub fn raw(&mut self, data: &[u8]) -> Cid {
        let cid = cid_for(cids::RAW, data);
        self.content_sizes.insert(cid, data.len() as u64);
        self.push(cid, Bytes::copy_from_slice(data), data.len() as u64);
        cid
    }

    /// Adds a UnixFS file node with some inline bytes, followed by the given
    /// chunks, which must have been added to this builder before.
    pub fn file(&mut self, inline: &[u8], chunks: &[Cid]) -> Cid {
        let blocksizes: Vec<u64> = chunks.iter().map(|c| self.content_sizes[c]).collect();
        let filesize = inline.len() as u64 + blocksizes.iter().sum::<u64>();

        let links = chunks
            .iter()
            .map(|c| PbLink {
                hash: Some(c.to_bytes().into()),
                name: Some(String::new()),
                tsize: Some(self.tsizes[c]),
            })
            .collect();

        let (cid, data) = encode_dag_pb(
            links,
            Data {
                r#type: Some(DataType::File as i32),
                data: (!inline.is_empty()).then(|| Bytes::copy_from_slice(inline)),
                filesize: Some(filesize),
                blocksizes,
                ..Default::default()
            },
        );

        let tsize = data.len() as u64 + chunks.iter().map(|c| self.tsizes[c]).sum::<u64>();
        self.content_sizes.insert(cid, filesize);
        self.push(cid, data, tsize);
        cid
    }

    /// Adds a UnixFS directory node, keeping the entries in the given order.
    pub fn directory(&mut self, entries: &[(&str, Cid)]) -> Cid {
        let links = entries
            .iter()
            .map(|(name, c)| PbLink {
                hash: Some(c.to_bytes().into()),
                name: Some(name.to_string()),
                tsize: Some(self.tsizes[c]),
            })
            .collect();

        let (cid, data) = encode_dag_pb(
            links,
            Data {
                r#type: Some(DataType::Directory as i32),
                ..Default::default()
            },
        );

        let tsize = data.len() as u64 + entries.iter().map(|(_, c)| self.tsizes[c]).sum::<u64>();
        self.push(cid, data, tsize);
        cid
    }

    pub fn finish(self, root: Cid) -> DagFixture {
        DagFixture {
            root,
            blocks: self.blocks,
        }
    }
}

/// A complete DAG, with its root.
pub struct DagFixture {
    pub root: Cid,
    pub blocks: Vec<(Cid, Bytes)>,
}

impl DagFixture {
    pub fn block(&self, cid: &Cid) -> Option<&Bytes> {
        self.blocks.iter().find(|(c, _)| c == cid).map(|(_, b)| b)
    }

    pub fn root_block(&self) -> &Bytes {
        self.block(&self.root).expect("root block must be present")
    }

    /// Serializes the DAG as a CARv1 archive.
    pub fn car(&self) -> Bytes {
        encode_car_v1(&[self.root], &self.blocks)
    }

    /// Serializes the DAG as a CARv2 archive, without index.
    pub fn car_v2(&self) -> Bytes {
        encode_car_v2(&self.car())
    }
}

fn write_varint(buf: &mut Vec<u8>, n: u64) {
    let mut varint_buf = unsigned_varint::encode::u64_buffer();
    buf.extend_from_slice(unsigned_varint::encode::u64(n, &mut varint_buf));
}

fn cbor_cid(cid: &Cid) -> Value {
    // CIDs in dag-cbor are tag 42, over the binary CID prefixed with the
    // (legacy) identity multibase.
    let mut b = vec![0x00];
    b.extend_from_slice(&cid.to_bytes());
    Value::Tag(42, Box::new(Value::Bytes(b)))
}

/// Produces a CARv1 archive with the given roots and sections.
pub fn encode_car_v1(roots: &[Cid], blocks: &[(Cid, Bytes)]) -> Bytes {
    let header = Value::Map(BTreeMap::from([
        (
            Value::Text("roots".to_string()),
            Value::Array(roots.iter().map(cbor_cid).collect()),
        ),
        (Value::Text("version".to_string()), Value::Integer(1)),
    ]));
    let header = serde_cbor::to_vec(&header).expect("header must serialize");

    let mut buf = Vec::new();
    write_varint(&mut buf, header.len() as u64);
    buf.extend_from_slice(&header);

    for (cid, data) in blocks {
        let cid = cid.to_bytes();
        write_varint(&mut buf, (cid.len() + data.len()) as u64);
        buf.extend_from_slice(&cid);
        buf.extend_from_slice(data);
    }

    buf.into()
}

/// Wraps a CARv1 payload into a CARv2 container.
pub fn encode_car_v2(car_v1: &[u8]) -> Bytes {
    let mut buf = Vec::new();
    buf.extend_from_slice(&crate::archive::CAR_V2_PRAGMA);

    let data_offset = (crate::archive::CAR_V2_PRAGMA.len() + 40) as u64;
    buf.extend_from_slice(&[0u8; 16]); // characteristics
    buf.extend_from_slice(&data_offset.to_le_bytes());
    buf.extend_from_slice(&(car_v1.len() as u64).to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes()); // no index
    buf.extend_from_slice(car_v1);

    buf.into()
}

lazy_static! {
    // 2 bytes
    pub static ref BLOB_A: Bytes = vec![0x00, 0x01].into();
    pub static ref BLOB_A_DIGEST: ContentHash = ContentHash::of(&BLOB_A);

    // 1MB
    pub static ref BLOB_B: Bytes = (0..255).collect::<Vec<u8>>().repeat(4 * 1024).into();
    pub static ref BLOB_B_DIGEST: ContentHash = ContentHash::of(&BLOB_B);

    pub static ref HELLO_RAW_CID: Cid = cid_for(cids::RAW, HELLO_CONTENTS);

    /// A single dag-pb file node, with its contents inline.
    pub static ref HELLO: DagFixture = {
        let mut b = DagBuilder::new();
        let root = b.file(HELLO_CONTENTS, &[]);
        b.finish(root)
    };

    /// `big/file`, 1MiB of zeros, split over two intermediate file nodes
    /// with two raw leaves each.
    pub static ref BIG: DagFixture = {
        let mut b = DagBuilder::new();
        let leaf = b.raw(&vec![0u8; BIG_FILE_CHUNK_SIZE]);
        let half = b.file(b"", &[leaf, leaf]);
        let file = b.file(b"", &[half, half]);
        let big = b.directory(&[("file", file)]);
        let root = b.directory(&[("big", big)]);
        b.finish(root)
    };

    /// A small static site, without any index.html.
    pub static ref LITTLELINK: DagFixture = {
        let mut b = DagBuilder::new();
        let css = b.raw(CSS_CONTENTS);
        let css_dir = b.directory(&[("brand.css", css)]);
        let deploy = b.raw(b"console.log('deploy');\n");
        let png = b.raw(b"\x89PNG\r\n\x1a\n");
        let svg = b.raw(b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>\n");
        let png2x = b.raw(b"\x89PNG\r\n\x1a\n2x");
        let icon = b.raw(b"<svg/>\n");
        let icons = b.directory(&[("github.svg", icon)]);
        let images = b.directory(&[
            ("avatar.png", png),
            ("avatar.svg", svg),
            ("avatar@2x.png", png2x),
            ("icons", icons),
        ]);
        let privacy = b.raw(b"<html>privacy</html>\n");
        let wallet = b.raw(b"export {};\n");
        let root = b.directory(&[
            ("css", css_dir),
            ("deploy.js", deploy),
            ("images", images),
            ("privacy.html", privacy),
            ("web-wallet-api.js", wallet),
        ]);
        b.finish(root)
    };

    /// A site with a `dist/` directory carrying an index.html.
    pub static ref WEB4: DagFixture = {
        let mut b = DagBuilder::new();
        let index = b.raw(INDEX_HTML_CONTENTS);
        let css = b.raw(CSS_CONTENTS);
        let dist = b.directory(&[("index.html", index), ("normalize.css", css)]);
        let readme = b.file(b"# web4\n", &[]);
        let root = b.directory(&[("README.md", readme), ("dist", dist)]);
        b.finish(root)
    };
}
