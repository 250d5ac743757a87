//! Chunk merging, the core of the simplification.
//!
//! Each application's blocks are folded into a list of chunks, one per
//! contiguous memory region. A block whose target address touches an
//! existing chunk extends that chunk instead of becoming a block of its
//! own; small FILL blocks adjacent to literal data are unrolled into the
//! data buffer. The list is kept in discovery order, not address order:
//! the first chunk created for a region is the one that absorbs every
//! later write touching it.

use std::io::{Read, Seek};

use log::warn;

use crate::error::ShrinkError;
use crate::header::{BlockHeader, BFLAG_FILL};
use crate::reader::BlockReader;

/// Largest FILL block worth unrolling into literal data. Beyond this the
/// space cost outweighs the per-block time saved, so the block stays a
/// fill of its own.
pub const SMALLEST_FILL_BLOCK: u32 = 256;

/// One contiguous memory region accumulated from one or more blocks.
pub struct Chunk {
    /// Base address of the region; fixed at creation.
    pub address: u32,
    /// Fill pattern argument, meaningful only for fill chunks.
    pub argument: u32,
    /// Literal bytes for data chunks; `None` for fill chunks, whose
    /// pattern is replayed by the boot ROM rather than stored.
    pub data: Option<Vec<u8>>,
    /// Current extent in bytes; only ever grows.
    pub length: u32,
    /// Flags captured from the block that created the chunk.
    pub flags: u16,
}

impl Chunk {
    pub fn is_fill(&self) -> bool {
        self.flags & BFLAG_FILL != 0
    }

    /// One past the last occupied address.
    pub fn end(&self) -> u64 {
        self.address as u64 + self.length as u64
    }
}

/// Append-only, discovery-ordered list of chunks for one application.
#[derive(Default)]
pub struct ChunkList {
    pub chunks: Vec<Chunk>,
}

impl ChunkList {
    pub fn new() -> Self {
        ChunkList { chunks: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Find the first chunk, in discovery order, that the block can merge
    /// into.
    ///
    /// A block carrying any flag besides FILL never merges, nor does a
    /// FILL block too large to unroll. Fill chunks never absorb anything
    /// (fill and data stay segregated). Otherwise the block matches the
    /// first chunk whose occupied range it touches, end inclusive.
    fn find_candidate(&self, hdr: &BlockHeader) -> Option<usize> {
        if hdr.flags & !BFLAG_FILL != 0 {
            return None;
        }
        if hdr.is_fill() && hdr.byte_count > SMALLEST_FILL_BLOCK {
            return None;
        }
        self.chunks.iter().position(|c| {
            !c.is_fill()
                && hdr.target_address as u64 >= c.address as u64
                && hdr.target_address as u64 <= c.end()
        })
    }

    /// Fold one block into the list, reading its payload from `reader`
    /// when the block carries literal data.
    ///
    /// Returns `true` when the block started a new chunk, i.e. when it
    /// will count as a block in the output image.
    pub fn absorb<R: Read + Seek>(
        &mut self,
        hdr: &BlockHeader,
        reader: &mut BlockReader<R>,
    ) -> Result<bool, ShrinkError> {
        let found = self.find_candidate(hdr);
        let created = found.is_none();
        let index = match found {
            Some(index) => index,
            None => {
                self.chunks.push(Chunk {
                    address: hdr.target_address,
                    argument: hdr.argument,
                    data: None,
                    length: 0,
                    flags: hdr.flags,
                });
                self.chunks.len() - 1
            }
        };
        let chunk = &mut self.chunks[index];

        let write_end = hdr.target_address as u64 + hdr.byte_count as u64;
        if write_end > chunk.end() {
            let extension = (write_end - chunk.end()) as u32;
            let new_len = (chunk.length + extension) as usize;
            let at = (hdr.target_address - chunk.address) as usize;

            if hdr.is_fill() {
                if !chunk.is_fill() {
                    // unroll the pattern into the data buffer; a trailing
                    // remainder smaller than the pattern is dropped
                    let data = chunk.data.get_or_insert_with(Vec::new);
                    data.resize(new_len, 0);
                    let pattern = hdr.argument.to_le_bytes();
                    let mut at = at;
                    let mut remaining = hdr.byte_count as usize;
                    while remaining >= pattern.len() {
                        data[at..at + pattern.len()].copy_from_slice(&pattern);
                        at += pattern.len();
                        remaining -= pattern.len();
                    }
                }
                // a fill chunk of its own stores no bytes at all; the
                // pattern is replayed from the header at boot time
            } else {
                let data = chunk.data.get_or_insert_with(Vec::new);
                data.resize(new_len, 0);
                reader.read_payload(&mut data[at..at + hdr.byte_count as usize])?;
            }
            chunk.length += extension;
        } else if hdr.byte_count > 0 {
            // the write lands entirely inside already-written territory;
            // the bytes are dropped, which loses any differing content
            warn!(
                "memory overwrite in region 0x{:x} to 0x{:x}",
                hdr.target_address, write_end
            );
            if !hdr.is_fill() {
                reader.skip_payload(hdr.byte_count)?;
            }
        }

        Ok(created)
    }
}
