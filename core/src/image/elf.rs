//! ELF64 structural parser.
//!
//! Only what the loader needs: the file header and the program-header
//! table. Section headers are reachable as raw header fields and nothing
//! more. All multi-byte fields are little endian.

use core::mem::size_of;
use core::ptr;

use bitflags::bitflags;
use static_assertions::const_assert_eq;

use super::{ELFCLASS64, ELF_MAGIC};
use crate::error::{BootError, InvalidImageReason, Result, UnsupportedReason};

/// ELF data encoding: little endian
pub const ELFDATA2LSB: u8 = 1;

pub const ELF_HEADER_SIZE: usize = 64;
pub const PROGRAM_HEADER_SIZE: usize = 56;

pub const PT_NULL: u32 = 0;
pub const PT_LOAD: u32 = 1;
pub const PT_DYNAMIC: u32 = 2;
pub const PT_INTERP: u32 = 3;
pub const PT_NOTE: u32 = 4;
pub const PT_SHLIB: u32 = 5;
pub const PT_PHDR: u32 = 6;
pub const PT_TLS: u32 = 7;

bitflags! {
    /// `p_flags` permission bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SegmentFlags: u32 {
        const EXECUTE = 1;
        const WRITE = 2;
        const READ = 4;
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct RawHeader {
    ident: [u8; 16],
    kind: u16,
    machine: u16,
    version: u32,
    entry: u64,
    phoff: u64,
    shoff: u64,
    flags: u32,
    ehsize: u16,
    phentsize: u16,
    phnum: u16,
    shentsize: u16,
    shnum: u16,
    shstrndx: u16,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct RawProgramHeader {
    kind: u32,
    flags: u32,
    offset: u64,
    vaddr: u64,
    paddr: u64,
    filesz: u64,
    memsz: u64,
    align: u64,
}

const_assert_eq!(size_of::<RawHeader>(), ELF_HEADER_SIZE);
const_assert_eq!(size_of::<RawProgramHeader>(), PROGRAM_HEADER_SIZE);

/// Decoded ELF64 file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfHeader {
    pub class: u8,
    pub data: u8,
    pub ident_version: u8,
    pub os_abi: u8,
    pub kind: u16,
    pub machine: u16,
    pub version: u32,
    pub entry: u64,
    pub phoff: u64,
    pub shoff: u64,
    pub flags: u32,
    pub ehsize: u16,
    pub phentsize: u16,
    pub phnum: u16,
    pub shentsize: u16,
    pub shnum: u16,
    pub shstrndx: u16,
}

impl ElfHeader {
    fn from_raw(raw: RawHeader) -> Self {
        Self {
            class: raw.ident[4],
            data: raw.ident[5],
            ident_version: raw.ident[6],
            os_abi: raw.ident[7],
            kind: u16::from_le(raw.kind),
            machine: u16::from_le(raw.machine),
            version: u32::from_le(raw.version),
            entry: u64::from_le(raw.entry),
            phoff: u64::from_le(raw.phoff),
            shoff: u64::from_le(raw.shoff),
            flags: u32::from_le(raw.flags),
            ehsize: u16::from_le(raw.ehsize),
            phentsize: u16::from_le(raw.phentsize),
            phnum: u16::from_le(raw.phnum),
            shentsize: u16::from_le(raw.shentsize),
            shnum: u16::from_le(raw.shnum),
            shstrndx: u16::from_le(raw.shstrndx),
        }
    }
}

/// One program-header table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramHeader {
    pub kind: u32,
    pub flags: SegmentFlags,
    pub offset: u64,
    pub vaddr: u64,
    /// Ignored by the loader
    pub paddr: u64,
    pub filesz: u64,
    pub memsz: u64,
    pub align: u64,
}

impl ProgramHeader {
    fn from_raw(raw: RawProgramHeader) -> Self {
        Self {
            kind: u32::from_le(raw.kind),
            flags: SegmentFlags::from_bits_retain(u32::from_le(raw.flags)),
            offset: u64::from_le(raw.offset),
            vaddr: u64::from_le(raw.vaddr),
            paddr: u64::from_le(raw.paddr),
            filesz: u64::from_le(raw.filesz),
            memsz: u64::from_le(raw.memsz),
            align: u64::from_le(raw.align),
        }
    }

    pub fn is_load(&self) -> bool {
        self.kind == PT_LOAD
    }
}

/// Validated view over an ELF64 image held in memory.
#[derive(Debug, Clone, Copy)]
pub struct ElfImage<'a> {
    bytes: &'a [u8],
    header: ElfHeader,
}

impl<'a> ElfImage<'a> {
    /// Validate the header and the program-header table extent.
    ///
    /// Nothing past the table is inspected; segment contents are checked by
    /// the segment loader's planning pass.
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < ELF_HEADER_SIZE {
            return Err(InvalidImageReason::TruncatedHeader.into());
        }
        if bytes[..4] != ELF_MAGIC {
            return Err(BootError::UnrecognizedFormat);
        }

        // SAFETY: length checked above, RawHeader is plain old data
        let raw = unsafe { ptr::read_unaligned(bytes.as_ptr() as *const RawHeader) };
        let header = ElfHeader::from_raw(raw);

        if header.class != ELFCLASS64 {
            return Err(UnsupportedReason::Class(header.class).into());
        }
        if header.data != ELFDATA2LSB {
            return Err(UnsupportedReason::Endianness(header.data).into());
        }
        if header.phnum > 0 && header.phentsize as usize != PROGRAM_HEADER_SIZE {
            return Err(UnsupportedReason::ProgramHeaderSize(header.phentsize).into());
        }

        let table_len = (header.phnum as u64) * PROGRAM_HEADER_SIZE as u64;
        let table_end = header
            .phoff
            .checked_add(table_len)
            .ok_or(InvalidImageReason::ProgramHeadersOutOfBounds)?;
        if table_end > bytes.len() as u64 {
            return Err(InvalidImageReason::ProgramHeadersOutOfBounds.into());
        }

        Ok(Self { bytes, header })
    }

    pub fn header(&self) -> &ElfHeader {
        &self.header
    }

    pub fn entry(&self) -> u64 {
        self.header.entry
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Lazily decoded program headers, in table order.
    pub fn program_headers(&self) -> ProgramHeaders<'a> {
        ProgramHeaders {
            bytes: self.bytes,
            offset: self.header.phoff as usize,
            remaining: self.header.phnum as usize,
        }
    }

    /// Program headers of type LOAD, in table order.
    pub fn load_segments(&self) -> impl Iterator<Item = (usize, ProgramHeader)> + 'a {
        self.program_headers()
            .enumerate()
            .filter(|(_, ph)| ph.is_load())
    }
}

/// Iterator over the program-header table. Bounds were checked by
/// [`ElfImage::parse`].
#[derive(Debug, Clone)]
pub struct ProgramHeaders<'a> {
    bytes: &'a [u8],
    offset: usize,
    remaining: usize,
}

impl<'a> Iterator for ProgramHeaders<'a> {
    type Item = ProgramHeader;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let record = self
            .bytes
            .get(self.offset..self.offset.checked_add(PROGRAM_HEADER_SIZE)?)?;
        // SAFETY: record is exactly PROGRAM_HEADER_SIZE bytes
        let raw = unsafe { ptr::read_unaligned(record.as_ptr() as *const RawProgramHeader) };
        self.offset += PROGRAM_HEADER_SIZE;
        self.remaining -= 1;
        Some(ProgramHeader::from_raw(raw))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for ProgramHeaders<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn header(phoff: u64, phnum: u16) -> Vec<u8> {
        let mut image = vec![0u8; ELF_HEADER_SIZE];
        image[..4].copy_from_slice(&ELF_MAGIC);
        image[4] = ELFCLASS64;
        image[5] = ELFDATA2LSB;
        image[6] = 1;
        image[0x18..0x20].copy_from_slice(&0x40_0000u64.to_le_bytes());
        image[0x20..0x28].copy_from_slice(&phoff.to_le_bytes());
        image[0x34..0x36].copy_from_slice(&(ELF_HEADER_SIZE as u16).to_le_bytes());
        image[0x36..0x38].copy_from_slice(&(PROGRAM_HEADER_SIZE as u16).to_le_bytes());
        image[0x38..0x3a].copy_from_slice(&phnum.to_le_bytes());
        image
    }

    fn push_phdr(image: &mut Vec<u8>, kind: u32, flags: u32, vaddr: u64) {
        let mut record = [0u8; PROGRAM_HEADER_SIZE];
        record[0..4].copy_from_slice(&kind.to_le_bytes());
        record[4..8].copy_from_slice(&flags.to_le_bytes());
        record[16..24].copy_from_slice(&vaddr.to_le_bytes());
        image.extend_from_slice(&record);
    }

    #[test]
    fn header_fields_are_decoded() {
        let image = header(ELF_HEADER_SIZE as u64, 0);
        let elf = ElfImage::parse(&image).unwrap();
        assert_eq!(elf.entry(), 0x40_0000);
        assert_eq!(elf.header().ehsize, 64);
        assert_eq!(elf.program_headers().count(), 0);
    }

    #[test]
    fn program_headers_are_read_in_order() {
        let mut image = header(ELF_HEADER_SIZE as u64, 3);
        push_phdr(&mut image, PT_LOAD, 5, 0x40_0000);
        push_phdr(&mut image, PT_NOTE, 4, 0);
        push_phdr(&mut image, PT_LOAD, 6, 0x40_1000);

        let elf = ElfImage::parse(&image).unwrap();
        let all: Vec<_> = elf.program_headers().collect();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].flags, SegmentFlags::READ | SegmentFlags::EXECUTE);
        assert_eq!(all[1].kind, PT_NOTE);

        let loads: Vec<_> = elf.load_segments().map(|(index, ph)| (index, ph.vaddr)).collect();
        assert_eq!(loads, vec![(0, 0x40_0000), (2, 0x40_1000)]);
    }

    #[test]
    fn truncated_header() {
        let image = header(ELF_HEADER_SIZE as u64, 0);
        assert_eq!(
            ElfImage::parse(&image[..63]).unwrap_err(),
            BootError::InvalidImage(InvalidImageReason::TruncatedHeader)
        );
    }

    #[test]
    fn big_endian_is_unsupported() {
        let mut image = header(ELF_HEADER_SIZE as u64, 0);
        image[5] = 2;
        assert_eq!(
            ElfImage::parse(&image).unwrap_err(),
            BootError::UnsupportedFormat(UnsupportedReason::Endianness(2))
        );
    }

    #[test]
    fn odd_entry_size_is_unsupported() {
        let mut image = header(ELF_HEADER_SIZE as u64, 1);
        image[0x36..0x38].copy_from_slice(&64u16.to_le_bytes());
        image.extend_from_slice(&[0u8; 64]);
        assert_eq!(
            ElfImage::parse(&image).unwrap_err(),
            BootError::UnsupportedFormat(UnsupportedReason::ProgramHeaderSize(64))
        );
    }

    #[test]
    fn table_past_end_of_buffer() {
        let mut image = header(ELF_HEADER_SIZE as u64, 2);
        push_phdr(&mut image, PT_LOAD, 4, 0x1000);
        assert_eq!(
            ElfImage::parse(&image).unwrap_err(),
            BootError::InvalidImage(InvalidImageReason::ProgramHeadersOutOfBounds)
        );
    }

    #[test]
    fn table_offset_overflow() {
        let image = header(u64::MAX - 8, 1);
        assert_eq!(
            ElfImage::parse(&image).unwrap_err(),
            BootError::InvalidImage(InvalidImageReason::ProgramHeadersOutOfBounds)
        );
    }
}
