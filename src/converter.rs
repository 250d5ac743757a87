//! Conversion session: drives reader, merger and writer over one stream.
//!
//! The stream is segmented into applications at FIRST markers; each
//! application's blocks are merged into a chunk list which is written out
//! and released whenever the application ends (next FIRST, the FINAL
//! marker, end of input) or an INIT block demands that its initialization
//! call observe everything loaded so far.

use std::io::{Read, Seek, Write};

use log::debug;

use crate::chunk::ChunkList;
use crate::error::ShrinkError;
use crate::header::{flag_suffix, BlockHeader, BFLAG_FINAL, BFLAG_FIRST};
use crate::reader::BlockReader;
use crate::writer::{write_header, write_image};

/// Per-application metadata captured from the FIRST block and reused for
/// every header the writer emits.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageSettings {
    pub hdrsign: u8,
    pub bcode: u8,
    pub entry_point: u32,
}

/// Counts reported after a successful run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertStats {
    /// Input blocks processed, not counting FIRST and FINAL markers.
    pub blocks_read: u32,
    /// Chunks created, i.e. blocks in the simplified output.
    pub blocks_written: u32,
}

/// One conversion run's worth of state. Replaces what would otherwise be
/// a pile of globals: the pending chunk list, the current application's
/// settings and the block counters all live here.
#[derive(Default)]
pub struct Converter {
    settings: ImageSettings,
    pending: ChunkList,
    stats: ConvertStats,
}

impl Converter {
    pub fn new() -> Self {
        Converter::default()
    }

    /// Convert a whole loader stream, writing simplified applications to
    /// `output` as they complete.
    pub fn run<R: Read + Seek, W: Write>(
        mut self,
        input: R,
        output: &mut W,
    ) -> Result<ConvertStats, ShrinkError> {
        let mut reader = BlockReader::new(input);

        while let Some(hdr) = reader.next_header()? {
            if hdr.flags & (BFLAG_FIRST | BFLAG_FINAL) == 0 {
                println!(
                    "0x{:x} 0x{:x}{}",
                    hdr.target_address,
                    hdr.byte_count,
                    flag_suffix(hdr.flags, hdr.argument)
                );
            }

            // an application boundary writes out whatever is pending,
            // including a span left open by a missing closing marker
            if hdr.flags & (BFLAG_FIRST | BFLAG_FINAL) != 0 {
                self.flush(output)?;
            }

            if hdr.is_final() {
                break;
            }

            if hdr.is_first() {
                self.settings = ImageSettings {
                    hdrsign: hdr.hdrsign,
                    bcode: hdr.bcode,
                    entry_point: hdr.target_address,
                };
                println!(
                    "--- read 0x{:02x} entry 0x{:x}",
                    hdr.hdrsign, hdr.target_address
                );
                continue;
            }

            self.stats.blocks_read += 1;

            if hdr.is_ignore() {
                reader.skip_payload(hdr.byte_count)?;
                continue;
            }

            if self.pending.absorb(&hdr, &mut reader)? {
                self.stats.blocks_written += 1;
            }

            if hdr.is_init() {
                // the init call at this block's address must observe every
                // write made so far, so the image cannot merge across it
                self.flush(output)?;
            }
        }

        // a stream that ends without a FINAL marker still gets its pending
        // image written before the stream is closed off
        self.flush(output)?;

        let closing = BlockHeader {
            bcode: self.settings.bcode,
            flags: BFLAG_FINAL,
            hdrchk: 0,
            hdrsign: self.settings.hdrsign,
            target_address: self.settings.entry_point,
            byte_count: 0,
            argument: 0,
        };
        write_header(output, &closing)?;

        Ok(self.stats)
    }

    fn flush<W: Write>(&mut self, output: &mut W) -> Result<(), ShrinkError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        debug!(
            "flushing {} chunks for entry 0x{:x}",
            self.pending.chunks.len(),
            self.settings.entry_point
        );
        let list = std::mem::take(&mut self.pending);
        write_image(output, list, &self.settings)?;
        Ok(())
    }
}
