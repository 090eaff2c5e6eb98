//! Block-buffered octet stream wrappers.
//!
//! The codec reads and writes through fixed-size block buffers. The input
//! side supports a one-way rewind within the current block, which the
//! parser uses to sniff the optional plaintext XML declaration; nothing in
//! the format requires buffering beyond a single block.

use snafu::{Backtrace, ResultExt, Snafu};
use std::io::{Read, Write};

/// The buffering block size, in octets.
pub const BLOCK_SIZE: usize = 4096;

/// Module-level error type:
/// for failures of the underlying byte source or sink.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The input stream ended in the middle of a document
    UnexpectedEndOfStream { backtrace: Backtrace },

    #[snafu(display("Could not read from the underlying source"))]
    ReadSource {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not write to the underlying sink"))]
    WriteSink {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Cannot rewind {} octets, only {} available in this block", requested, available))]
    RewindTooFar {
        requested: usize,
        available: usize,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A block-buffered reader over an arbitrary byte source.
#[derive(Debug)]
pub struct BlockReader<R> {
    source: R,
    block: Vec<u8>,
    cursor: usize,
    /// absolute position of the read cursor in the stream
    position: u64,
}

impl<R> BlockReader<R>
where
    R: Read,
{
    /// Create a reader buffering the given source.
    pub fn new(source: R) -> Self {
        BlockReader {
            source,
            block: Vec::with_capacity(BLOCK_SIZE),
            cursor: 0,
            position: 0,
        }
    }

    /// The absolute octet position of the read cursor.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read a single octet.
    pub fn read_byte(&mut self) -> Result<u8> {
        if self.cursor == self.block.len() {
            self.refill()?;
            if self.block.is_empty() {
                return UnexpectedEndOfStreamSnafu.fail();
            }
        }
        let byte = self.block[self.cursor];
        self.cursor += 1;
        self.position += 1;
        Ok(byte)
    }

    /// Read exactly `count` octets, appending them to `out`.
    ///
    /// Either all octets are delivered or the call fails with
    /// [`Error::UnexpectedEndOfStream`].
    pub fn read_into(&mut self, count: usize, out: &mut Vec<u8>) -> Result<()> {
        let mut missing = count;
        while missing > 0 {
            if self.cursor == self.block.len() {
                self.refill()?;
                if self.block.is_empty() {
                    return UnexpectedEndOfStreamSnafu.fail();
                }
            }
            let take = missing.min(self.block.len() - self.cursor);
            out.extend_from_slice(&self.block[self.cursor..self.cursor + take]);
            self.cursor += take;
            self.position += take as u64;
            missing -= take;
        }
        Ok(())
    }

    /// Move the read cursor back by `count` octets within the current block.
    pub fn rewind(&mut self, count: usize) -> Result<()> {
        snafu::ensure!(
            count <= self.cursor,
            RewindTooFarSnafu {
                requested: count,
                available: self.cursor,
            }
        );
        self.cursor -= count;
        self.position -= count as u64;
        Ok(())
    }

    fn refill(&mut self) -> Result<()> {
        self.block.clear();
        self.block.resize(BLOCK_SIZE, 0);
        self.cursor = 0;
        let filled = self.source.read(&mut self.block).context(ReadSourceSnafu)?;
        self.block.truncate(filled);
        Ok(())
    }
}

/// A block-buffered writer over an arbitrary byte sink.
#[derive(Debug)]
pub struct BlockWriter<W> {
    sink: W,
    block: Vec<u8>,
    /// absolute number of octets accepted so far
    position: u64,
}

impl<W> BlockWriter<W>
where
    W: Write,
{
    /// Create a writer buffering the given sink.
    pub fn new(sink: W) -> Self {
        BlockWriter {
            sink,
            block: Vec::with_capacity(BLOCK_SIZE),
            position: 0,
        }
    }

    /// The absolute number of octets written so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Write a single octet.
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        if self.block.len() == BLOCK_SIZE {
            self.drain()?;
        }
        self.block.push(byte);
        self.position += 1;
        Ok(())
    }

    /// Write a run of octets.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if self.block.len() + bytes.len() > BLOCK_SIZE {
            self.drain()?;
        }
        if bytes.len() >= BLOCK_SIZE {
            self.sink.write_all(bytes).context(WriteSinkSnafu)?;
        } else {
            self.block.extend_from_slice(bytes);
        }
        self.position += bytes.len() as u64;
        Ok(())
    }

    /// Deliver all buffered octets and flush the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.drain()?;
        self.sink.flush().context(WriteSinkSnafu)
    }

    /// Flush and recover the underlying sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.sink)
    }

    fn drain(&mut self) -> Result<()> {
        if !self.block.is_empty() {
            self.sink.write_all(&self.block).context(WriteSinkSnafu)?;
            self.block.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_byte_and_rewind_within_the_block() {
        let mut reader = BlockReader::new(&[1u8, 2, 3][..]);
        assert_eq!(reader.read_byte().unwrap(), 1);
        assert_eq!(reader.read_byte().unwrap(), 2);
        reader.rewind(1).unwrap();
        assert_eq!(reader.position(), 1);
        assert_eq!(reader.read_byte().unwrap(), 2);
        assert_eq!(reader.read_byte().unwrap(), 3);
        assert!(matches!(
            reader.read_byte(),
            Err(Error::UnexpectedEndOfStream { .. })
        ));
    }

    #[test]
    fn rewind_is_bounded_by_the_cursor() {
        let mut reader = BlockReader::new(&[1u8, 2][..]);
        reader.read_byte().unwrap();
        assert!(matches!(
            reader.rewind(2),
            Err(Error::RewindTooFar { .. })
        ));
    }

    #[test]
    fn read_into_delivers_all_or_fails() {
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let mut reader = BlockReader::new(&data[..]);
        let mut out = Vec::new();
        reader.read_into(9_000, &mut out).unwrap();
        assert_eq!(out, &data[..9_000]);
        out.clear();
        assert!(matches!(
            reader.read_into(2_000, &mut out),
            Err(Error::UnexpectedEndOfStream { .. })
        ));
    }

    #[test]
    fn writer_round_trips_across_block_boundaries() {
        let mut out = Vec::new();
        {
            let mut writer = BlockWriter::new(&mut out);
            writer.write_byte(0xE0).unwrap();
            let big = vec![0xAB; BLOCK_SIZE * 2 + 17];
            writer.write_bytes(&big).unwrap();
            writer.write_byte(0xF0).unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(out.len(), BLOCK_SIZE * 2 + 19);
        assert_eq!(out[0], 0xE0);
        assert_eq!(*out.last().unwrap(), 0xF0);
    }
}
