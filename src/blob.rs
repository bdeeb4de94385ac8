//! Blob framing: the fixed length prefix, `BlobHeader`, `Blob` and the
//! `OSMHeader` feature announcement.

use crate::codec::{self, WireType};
use crate::error::{new_error, ErrorKind, Result};
use byteorder::{BigEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;
use std::io::Read;
use std::ops::Range;

/// The maximum number of bytes a blob header may occupy.
pub const MAX_BLOB_HEADER_SIZE: u64 = 64 * 1024;

/// The maximum number of bytes a blob message may occupy.
pub const MAX_BLOB_MESSAGE_SIZE: u64 = 32 * 1024 * 1024;

/// Compression applied to a blob payload.
///
/// Only these two can be decoded; `lzma`, `bzip2`, `lz4` and `zstd` are
/// recognized in the wire format but rejected with
/// [`UnsupportedCompression`](crate::ErrorKind::UnsupportedCompression).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Compression {
    Raw,
    Zlib,
}

/// The content type of a blob.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum BlobType {
    OsmHeader,
    OsmData,
    Unknown(String),
}

/// The decoded `BlobHeader` message preceding every blob.
#[derive(Debug)]
pub(crate) struct BlobHead {
    pub blob_type: BlobType,
    pub datasize: u64,
}

/// The payload location and compression of a `Blob` message.
#[derive(Debug)]
pub(crate) struct BlobBody {
    /// Payload bytes relative to the start of the blob message.
    pub payload: Range<usize>,
    pub compression: Compression,
    /// Declared size of the uncompressed payload, if present.
    pub raw_size: Option<usize>,
}

/// Reads the 4-byte big-endian length prefix of the next blob header.
///
/// Returns `Ok(None)` at a clean end of file. A partial prefix means the file
/// was cut mid-frame.
pub(crate) fn read_header_len<R: Read>(reader: &mut R, file_offset: u64) -> Result<Option<u32>> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < 4 {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    match filled {
        0 => Ok(None),
        4 => {
            let mut prefix = &buf[..];
            Ok(Some(prefix.read_u32::<BigEndian>()?))
        }
        _ => Err(new_error(ErrorKind::Truncated {
            offset: file_offset,
        })),
    }
}

/// Reads exactly `len` bytes, mapping an early end of file to
/// [`Truncated`](crate::ErrorKind::Truncated).
pub(crate) fn read_message<R: Read>(reader: &mut R, len: u64, file_offset: u64) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            new_error(ErrorKind::Truncated {
                offset: file_offset,
            })
        } else {
            e.into()
        }
    })?;
    Ok(buf)
}

/// Decodes a `BlobHeader` message: field 1 is the type string, field 3 the
/// size of the following blob message.
pub(crate) fn parse_blob_head(data: &[u8]) -> Result<BlobHead> {
    let mut blob_type = BlobType::Unknown(String::new());
    let mut datasize = 0u64;
    let mut offset = 0;
    while offset < data.len() {
        let (key, next) = codec::key(data, offset)?;
        match (key.field, key.wire) {
            (1, WireType::Len) => {
                blob_type = match &data[next..next + key.len] {
                    b"OSMHeader" => BlobType::OsmHeader,
                    b"OSMData" => BlobType::OsmData,
                    other => BlobType::Unknown(String::from_utf8_lossy(other).into_owned()),
                };
            }
            (3, WireType::Varint) => {
                let (v, _) = codec::int64(data, next)?;
                datasize = v.max(0) as u64;
            }
            _ => {}
        }
        offset = next + key.len;
    }
    Ok(BlobHead {
        blob_type,
        datasize,
    })
}

/// Decodes a `Blob` message and locates its payload.
///
/// Field 1 carries raw bytes and field 3 zlib-compressed bytes; fields 4, 5,
/// 6 and 7 are other compressions this implementation refuses to decode.
pub(crate) fn parse_blob(data: &[u8]) -> Result<BlobBody> {
    let mut payload = None;
    let mut raw_size = None;
    let mut offset = 0;
    while offset < data.len() {
        let (key, next) = codec::key(data, offset)?;
        match (key.field, key.wire) {
            (1, WireType::Len) => payload = Some((next..next + key.len, Compression::Raw)),
            (2, WireType::Varint) => {
                let (v, _) = codec::int64(data, next)?;
                raw_size = Some(v.max(0) as usize);
            }
            (3, WireType::Len) => payload = Some((next..next + key.len, Compression::Zlib)),
            (4, _) => {
                return Err(new_error(ErrorKind::UnsupportedCompression { format: "lzma" }))
            }
            (5, _) => {
                return Err(new_error(ErrorKind::UnsupportedCompression {
                    format: "bzip2",
                }))
            }
            (6, _) => {
                return Err(new_error(ErrorKind::UnsupportedCompression { format: "lz4" }))
            }
            (7, _) => {
                return Err(new_error(ErrorKind::UnsupportedCompression { format: "zstd" }))
            }
            _ => {}
        }
        offset = next + key.len;
    }
    let (payload, compression) = payload.ok_or_else(|| {
        new_error(ErrorKind::Truncated { offset: 0 })
    })?;
    Ok(BlobBody {
        payload,
        compression,
        raw_size,
    })
}

/// Decompresses a blob payload.
pub(crate) fn decompress(payload: &[u8], compression: Compression, size_hint: Option<usize>) -> Result<Vec<u8>> {
    match compression {
        Compression::Raw => Ok(payload.to_vec()),
        Compression::Zlib => {
            let mut decoder = ZlibDecoder::new(payload);
            let mut data = Vec::with_capacity(size_hint.unwrap_or(payload.len() * 4));
            decoder.read_to_end(&mut data)?;
            Ok(data)
        }
    }
}

/// The decoded `OSMHeader` block.
#[derive(Debug, Default)]
pub(crate) struct HeaderBlock {
    pub required_features: Vec<String>,
    pub optional_features: Vec<String>,
}

/// Required features this reader can honor.
const KNOWN_FEATURES: [&str; 2] = ["OsmSchema-V0.6", "DenseNodes"];

/// Decodes the `OSMHeader` block (fields 4 and 5 are the required and
/// optional feature lists) and rejects unknown required features.
pub(crate) fn parse_header_block(data: &[u8]) -> Result<HeaderBlock> {
    let mut header = HeaderBlock::default();
    let mut offset = 0;
    while offset < data.len() {
        let (key, next) = codec::key(data, offset)?;
        match (key.field, key.wire) {
            (4, WireType::Len) => {
                header
                    .required_features
                    .push(String::from_utf8_lossy(&data[next..next + key.len]).into_owned());
            }
            (5, WireType::Len) => {
                header
                    .optional_features
                    .push(String::from_utf8_lossy(&data[next..next + key.len]).into_owned());
            }
            _ => {}
        }
        offset = next + key.len;
    }
    for feature in &header.required_features {
        if !KNOWN_FEATURES.contains(&feature.as_str()) {
            return Err(new_error(ErrorKind::UnsupportedFeature {
                feature: feature.clone(),
            }));
        }
    }
    Ok(header)
}
