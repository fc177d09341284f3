//! Binary encoding of a segment array.
//!
//! A blob is the error bound followed by one fixed-width record per segment,
//! with no padding and no length prefix. Keys are written as raw integer bytes
//! of the key type, reals as raw `f64` bytes.
//!
//! ## Layouts
//! - [`Layout::Compact`] (version 1): `x_start | slope | intercept`
//! - [`Layout::Ranged`] (version 2): `x_start | x_end | slope | intercept`
//!
//! ## Raw blobs
//! `gamma | record*` in the byte order of the machine that wrote it. This is
//! the historical on-disk format and carries no magic, version or checksum, so
//! the reader has to know the layout. Raw blobs are **not portable** between
//! machines of differing endianness.
//!
//! ## Framed blobs
//! `"PLRI" | version: u16 | key width: u16 | gamma | record*`, everything
//! little-endian. The header identifies the layout and key type, so framed
//! blobs decode anywhere.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::array::SegmentArray;
use crate::error::{PlrError, Result};
use crate::key::Key;
use crate::segment::Segment;

pub const MAGIC: [u8; 4] = *b"PLRI";

/// magic + version + key width
pub const HEADER_SIZE: usize = 8;

pub const GAMMA_SIZE: usize = std::mem::size_of::<f64>();

/// Which fields each segment record stores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Start key, slope and intercept.
    Compact,
    /// Start key, end key, slope and intercept.
    #[default]
    Ranged,
}

impl Layout {
    pub const fn version(self) -> u16 {
        match self {
            Layout::Compact => 1,
            Layout::Ranged => 2,
        }
    }

    pub fn from_version(version: u16) -> Result<Self> {
        match version {
            1 => Ok(Layout::Compact),
            2 => Ok(Layout::Ranged),
            _ => Err(PlrError::UnsupportedVersion(version)),
        }
    }

    /// Size in bytes of one segment record for keys of type `K`.
    pub fn record_size<K: Key>(self) -> usize {
        let keys = match self {
            Layout::Compact => 1,
            Layout::Ranged => 2,
        };
        keys * K::WIDTH + 2 * std::mem::size_of::<f64>()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ByteOrder {
    Native,
    Little,
}

impl ByteOrder {
    fn put_key<K: Key>(self, buf: &mut BytesMut, key: K) {
        match self {
            ByteOrder::Native => key.put_ne(buf),
            ByteOrder::Little => key.put_le(buf),
        }
    }

    fn put_f64(self, buf: &mut BytesMut, value: f64) {
        match self {
            ByteOrder::Native => buf.put_f64_ne(value),
            ByteOrder::Little => buf.put_f64_le(value),
        }
    }

    fn get_key<K: Key>(self, cursor: &mut &[u8]) -> K {
        match self {
            ByteOrder::Native => K::get_ne(cursor),
            ByteOrder::Little => K::get_le(cursor),
        }
    }

    fn get_f64(self, cursor: &mut &[u8]) -> f64 {
        match self {
            ByteOrder::Native => cursor.get_f64_ne(),
            ByteOrder::Little => cursor.get_f64_le(),
        }
    }
}

/// Encodes `array` as a raw blob in native byte order.
pub fn encode_raw<K: Key>(array: &SegmentArray<K>) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(encoded_len(array));
    write_records(&mut buf, array, ByteOrder::Native)?;
    Ok(buf.freeze())
}

/// Decodes a raw blob written by [`encode_raw`] on a machine of the same
/// endianness. The caller supplies the layout since raw blobs do not record it.
pub fn decode_raw<K: Key>(bytes: &[u8], layout: Layout) -> Result<SegmentArray<K>> {
    let (gamma, segments) = read_records(bytes, bytes.len(), layout, ByteOrder::Native)?;
    debug!(segments = segments.len(), gamma, ?layout, "decoded raw blob");
    Ok(SegmentArray::from_sorted(gamma, layout, segments))
}

/// Encodes `array` as a portable framed blob.
pub fn encode<K: Key>(array: &SegmentArray<K>) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + encoded_len(array));
    buf.put_slice(&MAGIC);
    buf.put_u16_le(array.layout().version());
    buf.put_u16_le(K::WIDTH as u16);
    write_records(&mut buf, array, ByteOrder::Little)?;
    Ok(buf.freeze())
}

/// Decodes a framed blob written by [`encode`].
pub fn decode<K: Key>(bytes: &[u8]) -> Result<SegmentArray<K>> {
    if bytes.len() < HEADER_SIZE || bytes[..MAGIC.len()] != MAGIC {
        return Err(PlrError::InvalidMagic);
    }

    let mut cursor = &bytes[MAGIC.len()..HEADER_SIZE];
    let layout = Layout::from_version(cursor.get_u16_le())?;
    let width = cursor.get_u16_le() as usize;
    if width != K::WIDTH {
        return Err(PlrError::KeyWidthMismatch {
            expected: K::WIDTH,
            found: width,
        });
    }

    let (gamma, segments) =
        read_records(&bytes[HEADER_SIZE..], bytes.len(), layout, ByteOrder::Little)?;
    debug!(segments = segments.len(), gamma, ?layout, "decoded blob");
    Ok(SegmentArray::from_sorted(gamma, layout, segments))
}

fn encoded_len<K: Key>(array: &SegmentArray<K>) -> usize {
    GAMMA_SIZE + array.len() * array.layout().record_size::<K>()
}

fn write_records<K: Key>(
    buf: &mut BytesMut,
    array: &SegmentArray<K>,
    order: ByteOrder,
) -> Result<()> {
    let layout = array.layout();
    order.put_f64(buf, array.gamma());

    for (index, segment) in array.iter().enumerate() {
        order.put_key(buf, segment.x_start);
        if layout == Layout::Ranged {
            let x_end = segment.x_end.ok_or(PlrError::MissingEndKey { index })?;
            order.put_key(buf, x_end);
        }
        order.put_f64(buf, segment.slope);
        order.put_f64(buf, segment.intercept);
    }

    Ok(())
}

/// Reads `gamma | record*` from `body`, rejecting a non-positive gamma, a
/// non-finite slope or intercept, and unsorted start keys. `blob_len` is only
/// used for error reporting.
fn read_records<K: Key>(
    body: &[u8],
    blob_len: usize,
    layout: Layout,
    order: ByteOrder,
) -> Result<(f64, Vec<Segment<K>>)> {
    let record = layout.record_size::<K>();
    if body.len() < GAMMA_SIZE || (body.len() - GAMMA_SIZE) % record != 0 {
        return Err(PlrError::TruncatedBlob {
            len: blob_len,
            record,
        });
    }

    let mut cursor = body;
    let gamma = order.get_f64(&mut cursor);
    if !(gamma.is_finite() && gamma > 0.0) {
        return Err(PlrError::InvalidGamma(gamma));
    }

    let mut segments: Vec<Segment<K>> = Vec::with_capacity(cursor.remaining() / record);
    while cursor.has_remaining() {
        let x_start = order.get_key::<K>(&mut cursor);
        let x_end = match layout {
            Layout::Compact => None,
            Layout::Ranged => Some(order.get_key::<K>(&mut cursor)),
        };
        let slope = order.get_f64(&mut cursor);
        let intercept = order.get_f64(&mut cursor);

        if !(slope.is_finite() && intercept.is_finite()) {
            return Err(PlrError::NonFiniteSegment {
                index: segments.len(),
            });
        }
        if let Some(prev) = segments.last() {
            if prev.x_start >= x_start {
                return Err(PlrError::UnsortedSegments {
                    index: segments.len(),
                });
            }
        }

        segments.push(Segment {
            x_start,
            x_end,
            slope,
            intercept,
        });
    }

    Ok((gamma, segments))
}
