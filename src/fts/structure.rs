//! Parsing the block directory and the keyed parameter records inside
//! parameter blocks.
use indexmap::IndexMap;

use crate::fts::bytes::{decode_latin1, ByteReader};
use crate::fts::constants::{self, ParValue, TYPE_ENUM, TYPE_I4, TYPE_R8, TYPE_SENUM, TYPE_STRING};
use crate::fts::{BlockDescriptor, FtsResult, ParamBlock};

/// One parameter record with its location metadata, as needed by the
/// writer to re-encode a value in place.
#[derive(Debug, Clone, PartialEq)]
pub struct RawParam {
    pub key: String,
    pub dtype: u16,
    pub reclen: u16,
    /// Absolute byte offset of the record (i.e. of its 4-byte key).
    pub offset: u64,
    pub value: ParValue,
}

enum RecordOutcome {
    /// An END key or a zero record length terminates the block.
    End,
    /// The record could not be decoded; it was logged and consumed.
    Skipped,
    Param(RawParam),
}

/// Read the file structure: the fixed header, then the directory of
/// `(type1, type2, length, offset)` entries, filed by canonical name in
/// the order they appear.
pub(crate) fn read_structure(
    reader: &mut ByteReader,
    events: &mut Vec<String>,
) -> FtsResult<IndexMap<String, BlockDescriptor>> {
    reader.seek_to(0)?;
    // Magic word (validated separately against the raw bytes), three unused
    // words around the directory offset, then the block count.
    let _magic = reader.read_i32()?;
    let _ = reader.read_i32()?;
    let _ = reader.read_i32()?;
    let offset1 = reader.read_i32()?;
    let _ = reader.read_i32()?;
    let numberofblocks = reader.read_i32()?;

    reader.seek_to(offset1.max(0) as u64)?;
    let mut fs = IndexMap::new();
    for _ in 0..numberofblocks.max(0) {
        let type1 = reader.read_u8()?;
        let type2 = reader.read_u8()?;
        let _reserved = reader.read_u16()?;
        let length = reader.read_i32()?;
        let offset = reader.read_i32()?;
        let name = constants::canonical_block_name(type1, type2, length);
        events.push(format!(
            "Found block {type1}, {type2} and identified as {name}"
        ));
        fs.insert(
            name,
            BlockDescriptor {
                type1,
                type2,
                length,
                offset,
            },
        );
    }
    Ok(fs)
}

/// Decode all parameter records of the block starting at `offset`,
/// keyed in record order.
///
/// Individual records that fail to decode are logged to `events` and
/// skipped; the rest of the block is still read.
pub(crate) fn read_param_block(
    reader: &mut ByteReader,
    offset: u64,
    events: &mut Vec<String>,
) -> FtsResult<ParamBlock> {
    let mut params = IndexMap::new();
    reader.seek_to(offset)?;
    loop {
        match next_param(reader, events)? {
            RecordOutcome::End => break,
            RecordOutcome::Skipped => continue,
            RecordOutcome::Param(p) => {
                params.insert(p.key, p.value);
            }
        }
    }
    Ok(params)
}

/// Like [`read_param_block`], but keeps the full record metadata
/// (dtype, record length, absolute offset) alongside each value.
pub(crate) fn read_param_block_full(
    reader: &mut ByteReader,
    offset: u64,
    events: &mut Vec<String>,
) -> FtsResult<Vec<RawParam>> {
    let mut records = vec![];
    reader.seek_to(offset)?;
    loop {
        match next_param(reader, events)? {
            RecordOutcome::End => break,
            RecordOutcome::Skipped => continue,
            RecordOutcome::Param(p) => records.push(p),
        }
    }
    Ok(records)
}

/// Read the next record at the reader's position.
///
/// Each record is a 4-byte ASCII key (cut at the first NUL), a u16 type
/// code, a u16 length in 16-bit words, and `2 * reclen` payload bytes.
fn next_param(reader: &mut ByteReader, events: &mut Vec<String>) -> FtsResult<RecordOutcome> {
    let offset = reader.position()?;
    let key_bytes = reader.read_bytes(4)?;
    let dtype = reader.read_u16()?;
    let reclen = reader.read_u16()?;
    if key_bytes.starts_with(b"END") || reclen == 0 {
        return Ok(RecordOutcome::End);
    }

    let key = decode_latin1(&key_bytes);
    let payload = reader.read_bytes(2 * reclen as usize)?;
    let value = match dtype {
        TYPE_I4 => match payload.first_chunk::<4>() {
            Some(b) => ParValue::Integer(i32::from_le_bytes(*b)),
            None => {
                events.push(format!(
                    "Parameter {key} declares an integer but only carries {} bytes, skipping",
                    payload.len()
                ));
                log::warn!("skipping undersized integer parameter {key}");
                return Ok(RecordOutcome::Skipped);
            }
        },
        TYPE_R8 => match payload.first_chunk::<8>() {
            Some(b) => ParValue::Float(f64::from_le_bytes(*b)),
            None => {
                events.push(format!(
                    "Parameter {key} declares a float but only carries {} bytes, skipping",
                    payload.len()
                ));
                log::warn!("skipping undersized float parameter {key}");
                return Ok(RecordOutcome::Skipped);
            }
        },
        TYPE_STRING | TYPE_ENUM | TYPE_SENUM => ParValue::Str(decode_latin1(&payload)),
        other => {
            events.push(format!(
                "Parameter {key} has unrecognized type {other}, skipping"
            ));
            log::warn!("skipping parameter {key} with unrecognized type {other}");
            return Ok(RecordOutcome::Skipped);
        }
    };

    Ok(RecordOutcome::Param(RawParam {
        key,
        dtype,
        reclen,
        offset,
        value,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fts::bytes::ByteSource;
    use crate::test_utils::{encode_param, end_marker};

    fn param_block_source(bytes: Vec<u8>) -> ByteSource {
        ByteSource::Memory(bytes)
    }

    #[test]
    fn test_param_block_stops_at_end() {
        let mut bytes = vec![];
        bytes.extend(encode_param("NPT", &ParValue::Integer(4)));
        bytes.extend(encode_param("FXV", &ParValue::Float(1000.0)));
        bytes.extend(end_marker());
        // Garbage after the terminator must never be reached
        bytes.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);

        let src = param_block_source(bytes);
        let mut rdr = src.reader().unwrap();
        let mut events = vec![];
        let params = read_param_block(&mut rdr, 0, &mut events).unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params["NPT"].as_integer().unwrap(), 4);
        assert_eq!(params["FXV"].as_float().unwrap(), 1000.0);
    }

    #[test]
    fn test_unknown_dtype_is_skipped_not_fatal() {
        let mut bytes = vec![];
        bytes.extend(encode_param("AQM", &ParValue::Str("SD".to_string())));
        // A record with dtype 9 and a 2-byte payload
        bytes.extend_from_slice(b"XXX\0");
        bytes.extend_from_slice(&9u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&[0xAA, 0xBB]);
        bytes.extend(encode_param("NPT", &ParValue::Integer(7)));
        bytes.extend(end_marker());

        let src = param_block_source(bytes);
        let mut rdr = src.reader().unwrap();
        let mut events = vec![];
        let params = read_param_block(&mut rdr, 0, &mut events).unwrap();
        // The bad record is dropped but the one after it still decodes
        assert_eq!(params.len(), 2);
        assert_eq!(params["AQM"].as_str().unwrap(), "SD");
        assert_eq!(params["NPT"].as_integer().unwrap(), 7);
        assert!(events.iter().any(|e| e.contains("unrecognized type 9")));
    }

    #[test]
    fn test_full_metadata_offsets() {
        let mut bytes = vec![];
        bytes.extend(encode_param("NPT", &ParValue::Integer(4)));
        bytes.extend(encode_param("AQM", &ParValue::Str("SD".to_string())));
        bytes.extend(end_marker());

        let src = param_block_source(bytes);
        let mut rdr = src.reader().unwrap();
        let mut events = vec![];
        let records = read_param_block_full(&mut rdr, 0, &mut events).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].offset, 0);
        // NPT record: 8-byte header + 4-byte payload
        assert_eq!(records[1].offset, 12);
        assert_eq!(records[1].key, "AQM");
        assert_eq!(records[1].dtype, TYPE_STRING);
    }
}
