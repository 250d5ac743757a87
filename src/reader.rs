//! Sequential block reading from a loader stream.
//!
//! The reader hands out one validated header at a time and lets the caller
//! decide what to do with the payload: read it into a chunk buffer or skip
//! it. It keeps a running byte offset so format errors can point at the
//! exact position of the offending header.

use std::io::{Read, Seek, SeekFrom};

use log::debug;

use crate::error::ShrinkError;
use crate::header::{BlockHeader, HEADER_SIZE};

/// Reads a loader stream block by block.
pub struct BlockReader<R> {
    input: R,
    offset: u64,
}

impl<R: Read + Seek> BlockReader<R> {
    pub fn new(input: R) -> Self {
        BlockReader { input, offset: 0 }
    }

    /// Current byte offset into the stream.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read and validate the next block header.
    ///
    /// Returns `Ok(None)` when the stream ends before a full header; a
    /// header whose bytes do not XOR to zero is a fatal format error.
    pub fn next_header(&mut self) -> Result<Option<BlockHeader>, ShrinkError> {
        let start = self.offset;
        let mut bytes = [0u8; HEADER_SIZE];
        match self.input.read_exact(&mut bytes) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                debug!("end of input at offset 0x{:x}", start);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }
        self.offset += HEADER_SIZE as u64;

        let hdr = BlockHeader::from_bytes(&bytes);
        // the checksum passes only when the whole record XORs to zero
        if hdr.checksum() != 0 {
            return Err(ShrinkError::Format { offset: start });
        }
        Ok(Some(hdr))
    }

    /// Read an exact payload slice into `buf`.
    pub fn read_payload(&mut self, buf: &mut [u8]) -> Result<(), ShrinkError> {
        self.input.read_exact(buf)?;
        self.offset += buf.len() as u64;
        Ok(())
    }

    /// Skip a payload without retaining it (IGNORE blocks, dropped
    /// overlapping writes).
    pub fn skip_payload(&mut self, byte_count: u32) -> Result<(), ShrinkError> {
        self.input.seek(SeekFrom::Current(byte_count as i64))?;
        self.offset += byte_count as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{BFLAG_FILL, BFLAG_FINAL};
    use std::io::Cursor;

    fn stream_of(headers: &[BlockHeader]) -> Cursor<Vec<u8>> {
        let mut bytes = Vec::new();
        for hdr in headers {
            bytes.extend_from_slice(&hdr.encode());
        }
        Cursor::new(bytes)
    }

    #[test]
    fn reads_headers_until_end() {
        let fill = BlockHeader {
            flags: BFLAG_FILL,
            target_address: 0x1000,
            byte_count: 0x20,
            argument: 0xFFFF_FFFF,
            ..Default::default()
        };
        let fin = BlockHeader {
            flags: BFLAG_FINAL,
            ..Default::default()
        };
        let mut reader = BlockReader::new(stream_of(&[fill, fin]));

        let first = reader.next_header().unwrap().unwrap();
        assert!(first.is_fill());
        assert_eq!(first.target_address, 0x1000);
        assert_eq!(reader.offset(), HEADER_SIZE as u64);

        let second = reader.next_header().unwrap().unwrap();
        assert!(second.is_final());

        assert!(reader.next_header().unwrap().is_none());
    }

    #[test]
    fn bad_checksum_is_fatal_with_offset() {
        let ok = BlockHeader::default();
        let mut bytes = ok.encode().to_vec();
        let mut corrupt = ok.encode();
        corrupt[5] ^= 0x01; // flip one payload-address bit, checksum now stale
        bytes.extend_from_slice(&corrupt);

        let mut reader = BlockReader::new(Cursor::new(bytes));
        assert!(reader.next_header().is_ok());
        match reader.next_header() {
            Err(ShrinkError::Format { offset }) => assert_eq!(offset, HEADER_SIZE as u64),
            other => panic!("expected format error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn skip_payload_advances_offset() {
        let mut data = BlockHeader::default().encode().to_vec();
        data.extend_from_slice(&[0xAA; 8]);
        data.extend_from_slice(&BlockHeader::default().encode());

        let mut reader = BlockReader::new(Cursor::new(data));
        reader.next_header().unwrap().unwrap();
        reader.skip_payload(8).unwrap();
        assert_eq!(reader.offset(), HEADER_SIZE as u64 + 8);
        assert!(reader.next_header().unwrap().is_some());
    }
}
