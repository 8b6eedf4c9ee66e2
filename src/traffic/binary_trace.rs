//! On-disk dependency traces.
//!
//! A trace is the 8-byte magic `BINFILE\0` followed by records of little-endian `u64` words:
//! `id, addr, op_type, delay, size, dep_count`, then `dep_count` dependency ids. Ids start at 0
//! and increase by one per record.

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use smallvec::SmallVec;

use crate::traffic::error::TraceError;
use crate::traffic::types::MemRequest;

pub const MAGIC: [u8; 8] = *b"BINFILE\0";

const WORD_BYTES: usize = 8;

/// Reads and validates [`MemRequest`] records from a binary trace.
#[derive(Debug)]
pub struct BinaryTraceReader<R> {
    inner: R,
    expected_id: u64,
}

impl BinaryTraceReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TraceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> BinaryTraceReader<R> {
    /// Wrap a stream positioned at the magic header. Fails before any record is parsed if the
    /// magic does not match.
    pub fn new(inner: R) -> Result<Self, TraceError> {
        let mut reader = Self {
            inner,
            expected_id: 0,
        };
        reader.check_magic()?;
        Ok(reader)
    }

    /// Id the next record must carry.
    pub fn expected_id(&self) -> u64 {
        self.expected_id
    }

    /// Returns `Ok(None)` only when the stream ends exactly on a record boundary.
    pub fn next_record(&mut self) -> Result<Option<MemRequest>, TraceError> {
        let Some(id) = self.read_word("id")? else {
            return Ok(None);
        };
        let addr = self.expect_word("address")?;
        let op_type = self.expect_word("op_type")?;
        let delay = self.expect_word("delay")?;
        let size = self.expect_word("size")?;
        let dep_count = self.expect_word("dependency_count")?;

        let mut deps: SmallVec<[u64; 4]> = SmallVec::new();
        for _ in 0..dep_count {
            deps.push(self.expect_word("dependency id")?);
        }

        if id != self.expected_id {
            return Err(TraceError::Sequence {
                expected: self.expected_id,
                found: id,
            });
        }
        if let Some(&dependency) = deps.iter().find(|&&dep| dep >= id) {
            return Err(TraceError::UnknownDependency { id, dependency });
        }
        self.expected_id += 1;

        Ok(Some(MemRequest::new(id, addr, op_type, delay, size, &deps)))
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn check_magic(&mut self) -> Result<(), TraceError> {
        let mut found = [0u8; WORD_BYTES];
        let n = self.fill(&mut found)?;
        if n < WORD_BYTES || found != MAGIC {
            return Err(TraceError::BadMagic { found });
        }
        Ok(())
    }

    fn expect_word(&mut self, field: &'static str) -> Result<u64, TraceError> {
        self.read_word(field)?.ok_or(TraceError::Truncated {
            expected_id: self.expected_id,
            field,
        })
    }

    // None on a clean end of input; a short word is a truncation.
    fn read_word(&mut self, field: &'static str) -> Result<Option<u64>, TraceError> {
        let mut buf = [0u8; WORD_BYTES];
        match self.fill(&mut buf)? {
            0 => Ok(None),
            WORD_BYTES => Ok(Some(u64::from_le_bytes(buf))),
            _ => Err(TraceError::Truncated {
                expected_id: self.expected_id,
                field,
            }),
        }
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<usize, TraceError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(filled)
    }
}

impl<R: Read + Seek> BinaryTraceReader<R> {
    /// Seek back to the header, re-check the magic and restart the id sequence.
    pub fn rewind(&mut self) -> Result<(), TraceError> {
        self.inner.seek(SeekFrom::Start(0))?;
        self.expected_id = 0;
        self.check_magic()
    }
}

impl<R: Read> Iterator for BinaryTraceReader<R> {
    type Item = Result<MemRequest, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Writes traces in the format [`BinaryTraceReader`] consumes.
#[derive(Debug)]
pub struct BinaryTraceWriter<W: Write> {
    inner: W,
    next_id: u64,
}

impl<W: Write> BinaryTraceWriter<W> {
    pub fn new(mut inner: W) -> io::Result<Self> {
        inner.write_all(&MAGIC)?;
        Ok(Self { inner, next_id: 0 })
    }

    /// Append a record with the next id in sequence and return that id.
    pub fn append(
        &mut self,
        addr: u64,
        op_type: u64,
        delay: u64,
        size: u64,
        deps: &[u64],
    ) -> io::Result<u64> {
        let id = self.next_id;
        self.write_raw(id, addr, op_type, delay, size, deps)?;
        Ok(id)
    }

    /// Append a record with an explicit id, without checking the sequence.
    pub fn write_raw(
        &mut self,
        id: u64,
        addr: u64,
        op_type: u64,
        delay: u64,
        size: u64,
        deps: &[u64],
    ) -> io::Result<()> {
        for word in [id, addr, op_type, delay, size, deps.len() as u64] {
            self.inner.write_all(&word.to_le_bytes())?;
        }
        for dep in deps {
            self.inner.write_all(&dep.to_le_bytes())?;
        }
        self.next_id = id.wrapping_add(1);
        Ok(())
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}
