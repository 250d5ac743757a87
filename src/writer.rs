//! Serialization of one application's merged chunk list.

use std::io::{self, Write};

use crate::chunk::ChunkList;
use crate::converter::ImageSettings;
use crate::header::{flag_suffix, BlockHeader, BFLAG_FIRST, BFLAG_IGNORE, HEADER_SIZE};

/// Encode a header with a freshly computed checksum and write it out.
pub fn write_header<W: Write>(out: &mut W, hdr: &BlockHeader) -> io::Result<()> {
    out.write_all(&hdr.encode())
}

/// Write one complete application image: a FIRST|IGNORE descriptor header
/// whose argument is the encoded size of the whole group, then one header
/// per chunk in discovery order followed by the chunk's literal bytes when
/// it has any. Consumes the list; the chunks and their buffers are gone
/// once written.
pub fn write_image<W: Write>(
    out: &mut W,
    list: ChunkList,
    settings: &ImageSettings,
) -> io::Result<()> {
    println!(
        "--- write 0x{:02x} entry 0x{:x}",
        settings.hdrsign, settings.entry_point
    );

    // list the simplified image and total up its encoded size, counting
    // the descriptor header itself
    let mut group_size = HEADER_SIZE as u32;
    for chunk in &list.chunks {
        println!(
            "0x{:x} 0x{:x}{}",
            chunk.address,
            chunk.length,
            flag_suffix(chunk.flags, chunk.argument)
        );
        group_size += HEADER_SIZE as u32;
        if chunk.data.is_some() {
            group_size += chunk.length;
        }
    }

    let descriptor = BlockHeader {
        bcode: settings.bcode,
        flags: BFLAG_IGNORE | BFLAG_FIRST,
        hdrchk: 0,
        hdrsign: settings.hdrsign,
        target_address: settings.entry_point,
        byte_count: 0,
        argument: group_size,
    };
    write_header(out, &descriptor)?;

    for chunk in list.chunks {
        let hdr = BlockHeader {
            bcode: settings.bcode,
            flags: chunk.flags,
            hdrchk: 0,
            hdrsign: settings.hdrsign,
            target_address: chunk.address,
            byte_count: chunk.length,
            argument: chunk.argument,
        };
        write_header(out, &hdr)?;

        if let Some(data) = chunk.data {
            // not a fill chunk, so the literal bytes follow the header
            out.write_all(&data)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunk;
    use crate::header::BFLAG_FILL;

    #[test]
    fn image_layout_and_checksums() {
        let mut list = ChunkList::new();
        list.chunks.push(Chunk {
            address: 0x1000,
            argument: 0,
            data: Some(vec![0x42; 8]),
            length: 8,
            flags: 0,
        });
        list.chunks.push(Chunk {
            address: 0x4000,
            argument: 0xDEAD_BEEF,
            data: None,
            length: 0x100,
            flags: BFLAG_FILL,
        });
        let settings = ImageSettings {
            hdrsign: 0xAD,
            bcode: 0x1,
            entry_point: 0x1000,
        };

        let mut out = Vec::new();
        write_image(&mut out, list, &settings).unwrap();

        // descriptor + data header + 8 payload bytes + fill header
        assert_eq!(out.len(), HEADER_SIZE * 3 + 8);

        let descriptor =
            BlockHeader::from_bytes(&<[u8; HEADER_SIZE]>::try_from(&out[..HEADER_SIZE]).unwrap());
        assert_eq!(descriptor.flags, BFLAG_IGNORE | BFLAG_FIRST);
        assert_eq!(descriptor.target_address, 0x1000);
        assert_eq!(descriptor.byte_count, 0);
        assert_eq!(descriptor.argument, (HEADER_SIZE * 3 + 8) as u32);
        assert_eq!(descriptor.hdrsign, 0xAD);
        assert_eq!(descriptor.checksum(), 0);

        let data_hdr = BlockHeader::from_bytes(
            &<[u8; HEADER_SIZE]>::try_from(&out[HEADER_SIZE..HEADER_SIZE * 2]).unwrap(),
        );
        assert_eq!(data_hdr.target_address, 0x1000);
        assert_eq!(data_hdr.byte_count, 8);
        assert_eq!(data_hdr.checksum(), 0);
        assert_eq!(&out[HEADER_SIZE * 2..HEADER_SIZE * 2 + 8], &[0x42; 8]);

        let fill_hdr = BlockHeader::from_bytes(
            &<[u8; HEADER_SIZE]>::try_from(&out[HEADER_SIZE * 2 + 8..]).unwrap(),
        );
        assert!(fill_hdr.is_fill());
        assert_eq!(fill_hdr.byte_count, 0x100);
        assert_eq!(fill_hdr.argument, 0xDEAD_BEEF);
        assert_eq!(fill_hdr.checksum(), 0);
    }
}
