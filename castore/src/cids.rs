//! Helpers to map [Cid]s onto what the block store understands.
use bytes::Bytes;
use cid::{multihash::Multihash, Cid};

use crate::ContentHash;

/// Multicodec for raw binary blocks.
pub const RAW: u64 = 0x55;
/// Multicodec for protobuf-encoded merkledag nodes.
pub const DAG_PB: u64 = 0x70;
/// Multicodec for dag-cbor, as used by archive headers.
pub const DAG_CBOR: u64 = 0x71;

/// Multihash code for SHA2-256.
pub const SHA2_256: u64 = 0x12;
/// Multihash code for the identity "hash", which carries the data inline.
pub const IDENTITY: u64 = 0x00;

/// Where the bytes of the block a [Cid] points to can be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockRef {
    /// The block lives in the block store, under this hash.
    Stored(ContentHash),
    /// The block is carried inside the CID itself.
    Inline(Bytes),
    /// The multihash function is not one we store blocks for.
    Unsupported(u64),
}

impl From<&Cid> for BlockRef {
    fn from(cid: &Cid) -> Self {
        let mh = cid.hash();
        match mh.code() {
            SHA2_256 => match ContentHash::try_from(mh.digest()) {
                Ok(digest) => BlockRef::Stored(digest),
                Err(_) => BlockRef::Unsupported(SHA2_256),
            },
            IDENTITY => BlockRef::Inline(Bytes::copy_from_slice(mh.digest())),
            code => BlockRef::Unsupported(code),
        }
    }
}

/// Produces the CIDv1 with the given codec for the given block contents,
/// hashed with SHA2-256.
pub fn cid_for(codec: u64, data: &[u8]) -> Cid {
    let digest = ContentHash::of(data);
    let mh = Multihash::<64>::wrap(SHA2_256, digest.as_slice())
        .expect("sha256 digest always fits a multihash");
    Cid::new_v1(codec, mh)
}

#[cfg(test)]
mod tests {
    use super::{cid_for, BlockRef, RAW};
    use crate::ContentHash;
    use cid::{multihash::Multihash, Cid};

    #[test]
    fn stored() {
        let cid = cid_for(RAW, b"Hello, World\n");
        assert_eq!(
            BlockRef::Stored(ContentHash::of(b"Hello, World\n")),
            BlockRef::from(&cid)
        );
    }

    #[test]
    fn inline() {
        let mh = Multihash::<64>::wrap(super::IDENTITY, b"tiny").unwrap();
        let cid = Cid::new_v1(RAW, mh);
        assert_eq!(BlockRef::Inline(b"tiny".to_vec().into()), BlockRef::from(&cid));
    }

    #[test]
    fn unsupported() {
        // blake3
        let mh = Multihash::<64>::wrap(0x1e, &[0u8; 32]).unwrap();
        let cid = Cid::new_v1(RAW, mh);
        assert_eq!(BlockRef::Unsupported(0x1e), BlockRef::from(&cid));
    }

    #[test]
    fn parses_v1_string() {
        let cid: Cid = "bafkreib3mbbrhmal34xx7loxzxc4ue36y5rg7wvc24xwryg2j2ozek3p4y"
            .parse()
            .expect("must parse");
        assert_eq!(RAW, cid.codec());
        assert!(matches!(BlockRef::from(&cid), BlockRef::Stored(_)));
    }
}
