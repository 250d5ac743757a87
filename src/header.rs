//! Block header codec for the boot loader stream format.
//!
//! Every block in a loader stream starts with a fixed 16-byte header. The
//! first 32-bit word packs a 4-bit block code, 12 flag bits, an 8-bit XOR
//! checksum and an 8-bit signature byte; three more 32-bit words give the
//! target address, the byte count and a flag-dependent argument. All wire
//! fields are little-endian.

/// Size of an encoded block header on the wire.
pub const HEADER_SIZE: usize = 16;

/// Fill the target range with the 32-bit argument value.
pub const BFLAG_FILL: u16 = 0x010;
/// Call the function at the target address after loading the payload.
pub const BFLAG_INIT: u16 = 0x080;
/// Block payload is ignored by the boot ROM.
pub const BFLAG_IGNORE: u16 = 0x100;
/// First block of a new application.
pub const BFLAG_FIRST: u16 = 0x400;
/// Last block of the loader stream.
pub const BFLAG_FINAL: u16 = 0x800;

/// One decoded block header.
///
/// Ephemeral by design: headers are decoded, consumed and re-encoded one at
/// a time, never held across iterations of the conversion loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockHeader {
    /// 4-bit block code identifying the boot mode / target core.
    pub bcode: u8,
    /// 12 flag bits (`BFLAG_*`).
    pub flags: u16,
    /// Header checksum byte; the XOR of all 16 header bytes must be zero.
    pub hdrchk: u8,
    /// Signature byte identifying the DXE this block belongs to.
    pub hdrsign: u8,
    /// Memory address the payload is written to.
    pub target_address: u32,
    /// Logical payload size in bytes.
    pub byte_count: u32,
    /// Flag-dependent argument; the 4-byte pattern for FILL blocks.
    pub argument: u32,
}

impl BlockHeader {
    /// Decode a header from its 16 wire bytes. Performs no validation;
    /// checksum checking is the reader's job.
    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let code_word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        BlockHeader {
            bcode: (code_word & 0x0F) as u8,
            flags: ((code_word >> 4) & 0x0FFF) as u16,
            hdrchk: ((code_word >> 16) & 0xFF) as u8,
            hdrsign: ((code_word >> 24) & 0xFF) as u8,
            target_address: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            byte_count: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            argument: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        }
    }

    /// Serialize the header exactly as stored, including the current
    /// checksum byte.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let code_word = (self.bcode as u32 & 0x0F)
            | ((self.flags as u32 & 0x0FFF) << 4)
            | ((self.hdrchk as u32) << 16)
            | ((self.hdrsign as u32) << 24);

        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&code_word.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.target_address.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.byte_count.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.argument.to_le_bytes());
        bytes
    }

    /// XOR of all 16 encoded bytes. A header is valid only when this is
    /// zero.
    pub fn checksum(&self) -> u8 {
        self.to_bytes().iter().fold(0, |acc, b| acc ^ b)
    }

    /// Encode for output: the checksum field is zeroed, then set to the XOR
    /// of the remaining bytes so that the encoded record XORs to zero.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut hdr = *self;
        hdr.hdrchk = 0;
        hdr.hdrchk = hdr.checksum();
        hdr.to_bytes()
    }

    pub fn is_fill(&self) -> bool {
        self.flags & BFLAG_FILL != 0
    }

    pub fn is_init(&self) -> bool {
        self.flags & BFLAG_INIT != 0
    }

    pub fn is_ignore(&self) -> bool {
        self.flags & BFLAG_IGNORE != 0
    }

    pub fn is_first(&self) -> bool {
        self.flags & BFLAG_FIRST != 0
    }

    pub fn is_final(&self) -> bool {
        self.flags & BFLAG_FINAL != 0
    }
}

/// Diagnostic suffix for a block listing line, e.g. `" FILL (0x5a5a5a5a)"`.
pub fn flag_suffix(flags: u16, argument: u32) -> String {
    let mut suffix = String::new();
    if flags & BFLAG_FILL != 0 {
        suffix.push_str(&format!(" FILL (0x{:x})", argument));
    }
    if flags & BFLAG_INIT != 0 {
        suffix.push_str(" INIT");
    }
    suffix
}
