//! Builders for synthetic OPUS files used across the test modules.
use crate::fts::constants::{ParValue, MAGIC, TYPE_I4, TYPE_R8, TYPE_STRING};

/// Encode one parameter record: 4-byte key, u16 dtype, u16 reclen,
/// then the payload.
pub(crate) fn encode_param(key: &str, value: &ParValue) -> Vec<u8> {
    let mut rec = vec![];
    let mut key_bytes = key.as_bytes().to_vec();
    key_bytes.resize(4, 0);
    rec.extend_from_slice(&key_bytes[..4]);
    match value {
        ParValue::Integer(i) => {
            rec.extend_from_slice(&TYPE_I4.to_le_bytes());
            rec.extend_from_slice(&2u16.to_le_bytes());
            rec.extend_from_slice(&i.to_le_bytes());
        }
        ParValue::Float(f) => {
            rec.extend_from_slice(&TYPE_R8.to_le_bytes());
            rec.extend_from_slice(&4u16.to_le_bytes());
            rec.extend_from_slice(&f.to_le_bytes());
        }
        ParValue::Str(s) => {
            // Room for the terminating NUL, rounded up to a whole word
            let reclen = (s.len() / 2 + 1) as u16;
            rec.extend_from_slice(&TYPE_STRING.to_le_bytes());
            rec.extend_from_slice(&reclen.to_le_bytes());
            let mut payload = s.as_bytes().to_vec();
            payload.resize(2 * reclen as usize, 0);
            rec.extend_from_slice(&payload);
        }
    }
    rec
}

/// The record terminating a parameter block.
pub(crate) fn end_marker() -> Vec<u8> {
    let mut rec = b"END\0".to_vec();
    rec.extend_from_slice(&0u16.to_le_bytes());
    rec.extend_from_slice(&0u16.to_le_bytes());
    rec
}

enum BlockPayload {
    Params(Vec<u8>),
    Data(Vec<f32>),
}

/// Assembles a structurally valid OPUS byte buffer: 24-byte file header,
/// the block payloads, then the directory.
pub(crate) struct OpusFileBuilder {
    blocks: Vec<(u8, u8, BlockPayload)>,
}

impl OpusFileBuilder {
    pub(crate) fn new() -> Self {
        Self { blocks: vec![] }
    }

    pub(crate) fn param_block(mut self, type1: u8, type2: u8, params: &[(&str, ParValue)]) -> Self {
        let mut bytes = vec![];
        for (key, value) in params {
            bytes.extend(encode_param(key, value));
        }
        bytes.extend(end_marker());
        self.blocks.push((type1, type2, BlockPayload::Params(bytes)));
        self
    }

    pub(crate) fn data_block(mut self, type1: u8, type2: u8, values: &[f64]) -> Self {
        let values = values.iter().map(|&v| v as f32).collect();
        self.blocks.push((type1, type2, BlockPayload::Data(values)));
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        // File header is 24 bytes; blocks are laid out back to back after
        // it with the directory at the end.
        let mut offsets = vec![];
        let mut region = vec![];
        for (_, _, payload) in &self.blocks {
            offsets.push(24 + region.len() as i32);
            match payload {
                BlockPayload::Params(bytes) => region.extend_from_slice(bytes),
                BlockPayload::Data(values) => {
                    for v in values {
                        region.extend_from_slice(&v.to_le_bytes());
                    }
                }
            }
        }
        let dir_offset = 24 + region.len() as i32;

        let mut out = vec![];
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&0i32.to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes());
        out.extend_from_slice(&dir_offset.to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes());
        out.extend_from_slice(&(self.blocks.len() as i32).to_le_bytes());
        out.extend_from_slice(&region);
        for ((type1, type2, payload), offset) in self.blocks.iter().zip(offsets) {
            let length = match payload {
                // Parameter block lengths count 4-byte words
                BlockPayload::Params(bytes) => (bytes.len() as i32 + 3) / 4,
                BlockPayload::Data(values) => values.len() as i32,
            };
            out.push(*type1);
            out.push(*type2);
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&length.to_le_bytes());
            out.extend_from_slice(&offset.to_le_bytes());
        }
        out
    }
}

/// The smallest useful spectrum file: one `Data Block SpSm` of four points
/// with its companion `Data Parameters SpSm` block.
pub(crate) fn minimal_spectrum_file() -> Vec<u8> {
    OpusFileBuilder::new()
        .param_block(
            23,
            4,
            &[
                ("FXV", ParValue::Float(1000.0)),
                ("LXV", ParValue::Float(1003.0)),
                ("NPT", ParValue::Integer(4)),
            ],
        )
        .data_block(7, 4, &[0.0, 1.0, 2.0, 3.0])
        .build()
}

/// A file carrying both a spectrum and a double-sided interferogram, with
/// the acquisition and instrument parameters the FFT pipeline needs.
pub(crate) fn spectrum_file_with_ifg() -> Vec<u8> {
    let ifg: Vec<f64> = (0..8).map(|i| i as f64).collect();
    OpusFileBuilder::new()
        .param_block(
            48,
            0,
            &[
                ("AQM", ParValue::Str("SD".to_string())),
                ("RES", ParValue::Float(0.9)),
            ],
        )
        .param_block(
            32,
            0,
            &[
                ("LWN", ParValue::Float(15798.0)),
                ("GFW", ParValue::Integer(1)),
                ("GBW", ParValue::Integer(1)),
            ],
        )
        .param_block(
            23,
            4,
            &[
                ("FXV", ParValue::Float(1000.0)),
                ("LXV", ParValue::Float(1003.0)),
                ("NPT", ParValue::Integer(4)),
            ],
        )
        .data_block(7, 4, &[0.0, 1.0, 2.0, 3.0])
        .param_block(31, 8, &[("NPT", ParValue::Integer(8))])
        .data_block(15, 8, &ifg)
        .build()
}

/// A double-sided interferogram file built from the given samples, for
/// exercising the full FFT pipeline.
pub(crate) fn ifg_file(ifg: &[f64], laser_wvn: f64) -> Vec<u8> {
    OpusFileBuilder::new()
        .param_block(
            48,
            0,
            &[
                ("AQM", ParValue::Str("SD".to_string())),
                ("RES", ParValue::Float(0.9)),
            ],
        )
        .param_block(
            32,
            0,
            &[
                ("LWN", ParValue::Float(laser_wvn)),
                ("GFW", ParValue::Integer(1)),
                ("GBW", ParValue::Integer(1)),
            ],
        )
        .param_block(31, 8, &[("NPT", ParValue::Integer(ifg.len() as i32))])
        .data_block(15, 8, ifg)
        .build()
}
