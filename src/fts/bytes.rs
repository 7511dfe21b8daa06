//! Byte-level access to OPUS sources.
//!
//! A [`ByteSource`] is either a path on disk or a fully in-memory buffer.
//! Disk sources are opened scoped to each read so no file handle outlives
//! the call that needed it; in-memory sources own their payload.
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::PathBuf;

use encoding::{all::ISO_8859_1, DecoderTrap, Encoding};

use crate::fts::{FtsError, FtsResult};

#[derive(Debug, Clone)]
pub enum ByteSource {
    Disk(PathBuf),
    Memory(Vec<u8>),
}

impl ByteSource {
    /// Open a cursor over the source. For disk sources this opens the file;
    /// the handle is dropped with the returned reader.
    pub fn reader(&self) -> FtsResult<ByteReader<'_>> {
        let inner = match self {
            ByteSource::Disk(p) => ReaderInner::Disk(BufReader::new(File::open(p)?)),
            ByteSource::Memory(b) => ReaderInner::Memory(Cursor::new(b.as_slice())),
        };
        Ok(ByteReader { inner })
    }

    /// The complete contents of the source as one buffer.
    pub fn read_all(&self) -> FtsResult<Vec<u8>> {
        match self {
            ByteSource::Disk(p) => Ok(std::fs::read(p)?),
            ByteSource::Memory(b) => Ok(b.clone()),
        }
    }
}

enum ReaderInner<'a> {
    Disk(BufReader<File>),
    Memory(Cursor<&'a [u8]>),
}

pub struct ByteReader<'a> {
    inner: ReaderInner<'a>,
}

impl Read for ByteReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            ReaderInner::Disk(r) => r.read(buf),
            ReaderInner::Memory(r) => r.read(buf),
        }
    }
}

impl Seek for ByteReader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match &mut self.inner {
            ReaderInner::Disk(r) => r.seek(pos),
            ReaderInner::Memory(r) => r.seek(pos),
        }
    }
}

// OPUS files are little-endian throughout, so unlike a general-purpose
// reader these do not take an endianness flag.
impl ByteReader<'_> {
    pub fn seek_to(&mut self, offset: u64) -> FtsResult<()> {
        self.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    pub fn position(&mut self) -> FtsResult<u64> {
        Ok(self.stream_position()?)
    }

    pub fn read_u8(&mut self) -> FtsResult<u8> {
        let mut buf = [0; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u16(&mut self) -> FtsResult<u16> {
        let mut buf = [0; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn read_i32(&mut self) -> FtsResult<i32> {
        let mut buf = [0; 4];
        self.read_exact(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    pub fn read_f32(&mut self) -> FtsResult<f32> {
        let mut buf = [0; 4];
        self.read_exact(&mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }

    pub fn read_f64(&mut self) -> FtsResult<f64> {
        let mut buf = [0; 8];
        self.read_exact(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }

    pub fn read_bytes(&mut self, nbytes: usize) -> FtsResult<Vec<u8>> {
        let mut buf = vec![0; nbytes];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// Decode bytes as an ISO-8859-1 string, cut off at the first NUL.
pub fn decode_latin1(bytes: &[u8]) -> String {
    let inull = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    ISO_8859_1
        .decode(&bytes[..inull], DecoderTrap::Replace)
        .unwrap_or_default()
}

/// Encode a string as ISO-8859-1 bytes, replacing unmappable characters.
pub fn encode_latin1(s: &str) -> Vec<u8> {
    use encoding::EncoderTrap;
    ISO_8859_1
        .encode(s, EncoderTrap::Replace)
        .unwrap_or_else(|_| s.bytes().collect())
}

/// Check the first four bytes of a source against the OPUS magic number.
pub fn check_magic(source: &ByteSource) -> FtsResult<bool> {
    let mut rdr = source.reader()?;
    let mut magic = [0u8; 4];
    match rdr.read_exact(&mut magic) {
        Ok(()) => Ok(magic == super::constants::MAGIC),
        // A file shorter than the magic number is not an OPUS file either
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(FtsError::Io(e)),
    }
}
