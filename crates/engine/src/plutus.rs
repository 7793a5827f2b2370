//! Plutus Data model and CBOR codec
//!
//! Implements the subset of the on-chain data encoding the registry datum
//! uses: constructors, maps, lists, small integers and byte strings. The
//! encoder reproduces the exact byte form the ledger's own serializer emits,
//! so re-encoding an unchanged value is byte-identical to what peers compute
//! when validating the transaction:
//!
//! - constructor tags 0..=6 map to CBOR tags 121..=127, tags 7..=127 to
//!   1280..=1400, anything larger to the general tag-102 form
//! - non-empty constructor fields and lists are indefinite-length arrays,
//!   empty ones are the definite empty array
//! - maps are definite-length; integers use minimal-width heads
//! - byte strings above 64 bytes are split into indefinite 64-byte chunks
//!
//! The decoder is strict about canonical form: non-minimal integer heads,
//! indefinite maps and big-integer tags are rejected rather than normalized.

use thiserror::Error;

/// Nesting depth cap for decoding untrusted datum bytes.
const MAX_DEPTH: u32 = 64;

/// Byte strings longer than this are serialized as indefinite chunks.
const BYTES_CHUNK: usize = 64;

/// A Plutus Data value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlutusData {
    /// Tagged constructor with ordered fields
    Constr { tag: u64, fields: Vec<PlutusData> },
    /// Association list; entry order is part of the encoding
    Map(Vec<(PlutusData, PlutusData)>),
    /// Ordered list
    List(Vec<PlutusData>),
    /// Signed integer (big integers are outside the registry's domain)
    Int(i64),
    /// Raw byte string
    Bytes(Vec<u8>),
}

/// CBOR-level decode failure
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CborError {
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEof(usize),

    #[error("malformed item header at byte {0}")]
    MalformedHeader(usize),

    #[error("non-minimal integer head at byte {0}")]
    NonCanonicalInt(usize),

    #[error("unsupported item (major type {major}) at byte {at}")]
    Unsupported { major: u8, at: usize },

    #[error("unsupported semantic tag {0}")]
    UnsupportedTag(u64),

    #[error("big integers are not representable in registry data")]
    BigIntUnsupported,

    #[error("integer exceeds the 64-bit range")]
    IntOutOfRange,

    #[error("constructor payload is not a field array")]
    ExpectedFields,

    #[error("malformed byte-string chunk at byte {0}")]
    MalformedChunk(usize),

    #[error("indefinite-length map is not canonical")]
    IndefiniteMap,

    #[error("nesting exceeds the supported depth")]
    NestingTooDeep,

    #[error("trailing bytes after the top-level item")]
    TrailingBytes,
}

/// Serialize a value into canonical datum bytes.
///
/// Deterministic: equal values always produce identical bytes.
pub fn encode(data: &PlutusData) -> Vec<u8> {
    let mut out = Vec::new();
    write_item(&mut out, data);
    out
}

/// Parse a single value from datum bytes, rejecting trailing input.
pub fn decode(bytes: &[u8]) -> Result<PlutusData, CborError> {
    let mut reader = Reader { buf: bytes, pos: 0 };
    let item = reader.read_item(0)?;
    if reader.pos != bytes.len() {
        return Err(CborError::TrailingBytes);
    }
    Ok(item)
}

fn write_head(out: &mut Vec<u8>, major: u8, value: u64) {
    let m = major << 5;
    if value < 24 {
        out.push(m | value as u8);
    } else if value <= 0xff {
        out.push(m | 24);
        out.push(value as u8);
    } else if value <= 0xffff {
        out.push(m | 25);
        out.extend_from_slice(&(value as u16).to_be_bytes());
    } else if value <= 0xffff_ffff {
        out.push(m | 26);
        out.extend_from_slice(&(value as u32).to_be_bytes());
    } else {
        out.push(m | 27);
        out.extend_from_slice(&value.to_be_bytes());
    }
}

fn write_item(out: &mut Vec<u8>, data: &PlutusData) {
    match data {
        PlutusData::Int(n) => {
            if *n >= 0 {
                write_head(out, 0, *n as u64);
            } else {
                write_head(out, 1, (-1i128 - *n as i128) as u64);
            }
        }
        PlutusData::Bytes(bytes) => write_bytes(out, bytes),
        PlutusData::List(items) => write_array(out, items),
        PlutusData::Map(entries) => {
            write_head(out, 5, entries.len() as u64);
            for (key, value) in entries {
                write_item(out, key);
                write_item(out, value);
            }
        }
        PlutusData::Constr { tag, fields } => {
            if *tag <= 6 {
                write_head(out, 6, 121 + tag);
                write_array(out, fields);
            } else if *tag <= 127 {
                write_head(out, 6, 1280 + (tag - 7));
                write_array(out, fields);
            } else {
                write_head(out, 6, 102);
                write_head(out, 4, 2);
                write_head(out, 0, *tag);
                write_array(out, fields);
            }
        }
    }
}

fn write_array(out: &mut Vec<u8>, items: &[PlutusData]) {
    if items.is_empty() {
        out.push(0x80);
    } else {
        out.push(0x9f);
        for item in items {
            write_item(out, item);
        }
        out.push(0xff);
    }
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    if bytes.len() <= BYTES_CHUNK {
        write_head(out, 2, bytes.len() as u64);
        out.extend_from_slice(bytes);
    } else {
        out.push(0x5f);
        for chunk in bytes.chunks(BYTES_CHUNK) {
            write_head(out, 2, chunk.len() as u64);
            out.extend_from_slice(chunk);
        }
        out.push(0xff);
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn byte(&mut self) -> Result<u8, CborError> {
        let b = *self
            .buf
            .get(self.pos)
            .ok_or(CborError::UnexpectedEof(self.pos))?;
        self.pos += 1;
        Ok(b)
    }

    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CborError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or(CborError::UnexpectedEof(self.buf.len()))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read an item header: (major type, argument, indefinite flag).
    /// Rejects non-minimal argument widths.
    fn head(&mut self) -> Result<(u8, u64, bool), CborError> {
        let at = self.pos;
        let initial = self.byte()?;
        let major = initial >> 5;
        let ai = initial & 0x1f;
        let value = match ai {
            0..=23 => ai as u64,
            24 => {
                let v = self.byte()? as u64;
                if v < 24 {
                    return Err(CborError::NonCanonicalInt(at));
                }
                v
            }
            25 => {
                let raw = self.take(2)?;
                let v = u16::from_be_bytes([raw[0], raw[1]]) as u64;
                if v <= 0xff {
                    return Err(CborError::NonCanonicalInt(at));
                }
                v
            }
            26 => {
                let raw = self.take(4)?;
                let v = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as u64;
                if v <= 0xffff {
                    return Err(CborError::NonCanonicalInt(at));
                }
                v
            }
            27 => {
                let raw = self.take(8)?;
                let mut arr = [0u8; 8];
                arr.copy_from_slice(raw);
                let v = u64::from_be_bytes(arr);
                if v <= 0xffff_ffff {
                    return Err(CborError::NonCanonicalInt(at));
                }
                v
            }
            31 if matches!(major, 2 | 3 | 4 | 5 | 7) => return Ok((major, 0, true)),
            _ => return Err(CborError::MalformedHeader(at)),
        };
        Ok((major, value, false))
    }

    fn read_item(&mut self, depth: u32) -> Result<PlutusData, CborError> {
        if depth > MAX_DEPTH {
            return Err(CborError::NestingTooDeep);
        }
        let at = self.pos;
        let (major, value, indefinite) = self.head()?;
        match major {
            0 => {
                if value > i64::MAX as u64 {
                    return Err(CborError::IntOutOfRange);
                }
                Ok(PlutusData::Int(value as i64))
            }
            1 => {
                if value > i64::MAX as u64 {
                    return Err(CborError::IntOutOfRange);
                }
                Ok(PlutusData::Int(-1 - value as i64))
            }
            2 => {
                if indefinite {
                    let mut bytes = Vec::new();
                    loop {
                        if self.peek() == Some(0xff) {
                            self.pos += 1;
                            break;
                        }
                        let chunk_at = self.pos;
                        let (chunk_major, len, chunk_indefinite) = self.head()?;
                        if chunk_major != 2 || chunk_indefinite || len > BYTES_CHUNK as u64 {
                            return Err(CborError::MalformedChunk(chunk_at));
                        }
                        bytes.extend_from_slice(self.take(len as usize)?);
                    }
                    Ok(PlutusData::Bytes(bytes))
                } else {
                    Ok(PlutusData::Bytes(self.take(value as usize)?.to_vec()))
                }
            }
            4 => {
                let mut items = Vec::new();
                if indefinite {
                    loop {
                        if self.peek() == Some(0xff) {
                            self.pos += 1;
                            break;
                        }
                        items.push(self.read_item(depth + 1)?);
                    }
                } else {
                    for _ in 0..value {
                        items.push(self.read_item(depth + 1)?);
                    }
                }
                Ok(PlutusData::List(items))
            }
            5 => {
                if indefinite {
                    return Err(CborError::IndefiniteMap);
                }
                let mut entries = Vec::new();
                for _ in 0..value {
                    let key = self.read_item(depth + 1)?;
                    let val = self.read_item(depth + 1)?;
                    entries.push((key, val));
                }
                Ok(PlutusData::Map(entries))
            }
            6 => {
                if indefinite {
                    return Err(CborError::MalformedHeader(at));
                }
                match value {
                    121..=127 => Ok(PlutusData::Constr {
                        tag: value - 121,
                        fields: self.read_fields(depth)?,
                    }),
                    1280..=1400 => Ok(PlutusData::Constr {
                        tag: 7 + (value - 1280),
                        fields: self.read_fields(depth)?,
                    }),
                    102 => match self.read_item(depth + 1)? {
                        PlutusData::List(mut items) if items.len() == 2 => {
                            let fields = items.pop();
                            let tag = items.pop();
                            match (tag, fields) {
                                (Some(PlutusData::Int(tag)), Some(PlutusData::List(fields)))
                                    if tag >= 0 =>
                                {
                                    Ok(PlutusData::Constr {
                                        tag: tag as u64,
                                        fields,
                                    })
                                }
                                _ => Err(CborError::ExpectedFields),
                            }
                        }
                        _ => Err(CborError::ExpectedFields),
                    },
                    2 | 3 => Err(CborError::BigIntUnsupported),
                    other => Err(CborError::UnsupportedTag(other)),
                }
            }
            other => Err(CborError::Unsupported { major: other, at }),
        }
    }

    fn read_fields(&mut self, depth: u32) -> Result<Vec<PlutusData>, CborError> {
        match self.read_item(depth + 1)? {
            PlutusData::List(items) => Ok(items),
            _ => Err(CborError::ExpectedFields),
        }
    }
}
