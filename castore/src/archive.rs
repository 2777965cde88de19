//! Decoding of content-addressed archives (CAR), in both the v1 and v2
//! container formats.
//!
//! A CARv1 is a varint-prefixed dag-cbor header `{version: 1, roots: [..]}`,
//! followed by varint-prefixed sections of a binary CID and the block bytes.
//! A CARv2 starts with a fixed pragma, then a 40 byte header pointing at an
//! inner CARv1 payload (and optionally an index, which we ignore).
use std::io;
use std::ops::Range;

use bytes::Bytes;
use cid::Cid;
use serde_cbor::Value;
use tracing::instrument;

/// The first bytes of every CARv2, a CARv1 style header announcing version 2.
pub const CAR_V2_PRAGMA: [u8; 11] = [
    0x0a, 0xa1, 0x67, 0x76, 0x65, 0x72, 0x73, 0x69, 0x6f, 0x6e, 0x02,
];

const CAR_V2_HEADER_LEN: usize = 40;

/// Tag used for CIDs in dag-cbor.
const CBOR_TAG_CID: u64 = 42;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive is truncated")]
    Truncated,

    #[error("invalid varint: {0}")]
    InvalidVarint(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("unsupported archive version {0}")]
    UnsupportedVersion(i128),

    #[error("archive has no roots")]
    NoRoots,

    #[error("invalid cid at offset {offset}: {reason}")]
    InvalidCid { offset: usize, reason: String },
}

/// A fully decoded archive.
#[derive(Debug, Clone)]
pub struct Archive {
    /// The roots, as listed in the header. There's at least one.
    pub roots: Vec<Cid>,
    /// All sections, in archive order.
    pub blocks: Vec<(Cid, Bytes)>,
}

impl Archive {
    /// The first root listed in the header.
    pub fn root(&self) -> &Cid {
        &self.roots[0]
    }
}

/// Decodes a whole archive into memory. Nothing is interpreted beyond the
/// framing: block bytes are not checked against their CIDs here.
#[instrument(skip_all, fields(archive.len = data.len()), err)]
pub fn decode_archive(data: Bytes) -> Result<Archive, ArchiveError> {
    let header = read_frame(&data, 0)?;
    let (version, roots) = parse_header(&data[header.clone()])?;

    match version {
        1 => decode_sections(&data, header.end, roots),
        2 => {
            let fixed = data
                .get(header.end..header.end + CAR_V2_HEADER_LEN)
                .ok_or(ArchiveError::Truncated)?;

            // characteristics (16 bytes), data offset, data size, index offset.
            let data_offset = read_u64_le(&fixed[16..24]) as usize;
            let data_size = read_u64_le(&fixed[24..32]) as usize;

            let end = data_offset
                .checked_add(data_size)
                .filter(|end| *end <= data.len())
                .ok_or(ArchiveError::Truncated)?;
            if data_offset < header.end + CAR_V2_HEADER_LEN {
                return Err(ArchiveError::InvalidHeader(format!(
                    "data offset {} points into the header",
                    data_offset
                )));
            }

            let inner = data.slice(data_offset..end);
            let inner_header = read_frame(&inner, 0)?;
            match parse_header(&inner[inner_header.clone()])? {
                (1, roots) => decode_sections(&inner, inner_header.end, roots),
                (version, _) => Err(ArchiveError::UnsupportedVersion(version)),
            }
        }
        version => Err(ArchiveError::UnsupportedVersion(version)),
    }
}

fn read_u64_le(b: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(b);
    u64::from_le_bytes(buf)
}

/// Reads a varint length prefix at `offset`, returns the range of the frame
/// following it.
fn read_frame(data: &[u8], offset: usize) -> Result<Range<usize>, ArchiveError> {
    let (len, rest) = unsigned_varint::decode::u64(&data[offset..]).map_err(|e| match e {
        unsigned_varint::decode::Error::Insufficient => ArchiveError::Truncated,
        e => ArchiveError::InvalidVarint(e.to_string()),
    })?;

    let start = data.len() - rest.len();
    let end = usize::try_from(len)
        .ok()
        .and_then(|len| start.checked_add(len))
        .filter(|end| *end <= data.len())
        .ok_or(ArchiveError::Truncated)?;

    Ok(start..end)
}

/// Parses a dag-cbor header, returning its version and roots.
/// Roots are required for version 1 only, the CARv2 pragma has none.
fn parse_header(header: &[u8]) -> Result<(i128, Vec<Cid>), ArchiveError> {
    let value: Value =
        serde_cbor::from_slice(header).map_err(|e| ArchiveError::InvalidHeader(e.to_string()))?;

    let Value::Map(map) = value else {
        return Err(ArchiveError::InvalidHeader("not a map".to_string()));
    };

    let version = match map.get(&Value::Text("version".to_string())) {
        Some(Value::Integer(v)) => *v,
        _ => return Err(ArchiveError::InvalidHeader("missing version".to_string())),
    };

    if version != 1 {
        return Ok((version, vec![]));
    }

    let roots = match map.get(&Value::Text("roots".to_string())) {
        Some(Value::Array(roots)) => roots
            .iter()
            .map(parse_cbor_cid)
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(ArchiveError::InvalidHeader("missing roots".to_string())),
    };

    if roots.is_empty() {
        return Err(ArchiveError::NoRoots);
    }

    Ok((version, roots))
}

fn parse_cbor_cid(value: &Value) -> Result<Cid, ArchiveError> {
    let b = match value {
        Value::Tag(CBOR_TAG_CID, inner) => match inner.as_ref() {
            Value::Bytes(b) => b,
            _ => return Err(ArchiveError::InvalidHeader("cid tag without bytes".to_string())),
        },
        Value::Bytes(b) => b,
        _ => return Err(ArchiveError::InvalidHeader("root is not a cid".to_string())),
    };

    // strip the identity multibase prefix
    let b = b.strip_prefix(&[0x00]).unwrap_or(b);

    Cid::try_from(b).map_err(|e| ArchiveError::InvalidHeader(format!("invalid root: {}", e)))
}

fn decode_sections(data: &Bytes, mut offset: usize, roots: Vec<Cid>) -> Result<Archive, ArchiveError> {
    let mut blocks = Vec::new();

    while offset < data.len() {
        let section = read_frame(data, offset)?;

        let mut cursor = io::Cursor::new(&data[section.clone()]);
        let cid = Cid::read_bytes(&mut cursor).map_err(|e| ArchiveError::InvalidCid {
            offset: section.start,
            reason: e.to_string(),
        })?;
        let cid_len = cursor.position() as usize;

        blocks.push((cid, data.slice(section.start + cid_len..section.end)));
        offset = section.end;
    }

    Ok(Archive { roots, blocks })
}
